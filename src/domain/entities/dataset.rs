use serde::{Deserialize, Serialize};

/// Sheet row number of the header row; data rows start right below it.
pub const HEADER_ROW: usize = 1;
pub const FIRST_DATA_ROW: usize = HEADER_ROW + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetId(pub i64);

impl From<i64> for DatasetId {
    fn from(value: i64) -> Self {
        DatasetId(value)
    }
}

impl From<DatasetId> for i64 {
    fn from(value: DatasetId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
}

/// Presentation applied to freshly inserted rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowStyle {
    pub font_name: String,
    pub font_size: u32,
    pub alignment: HorizontalAlignment,
}

impl Default for RowStyle {
    fn default() -> Self {
        Self {
            font_name: "Calibri".to_string(),
            font_size: 11,
            alignment: HorizontalAlignment::Left,
        }
    }
}

/// Rows already present in the destination before an import. `rows[0]` is
/// sheet row [`FIRST_DATA_ROW`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DatasetSnapshot {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Sheet row number of the last used row, the header row when empty.
    pub fn last_row(&self) -> usize {
        HEADER_ROW + self.rows.len()
    }

    /// Data rows paired with their sheet row numbers.
    pub fn numbered_rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (FIRST_DATA_ROW + idx, row.as_slice()))
    }
}

pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

pub fn row_value(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}
