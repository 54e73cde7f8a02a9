use crate::domain::entities::dataset::{RowStyle, SortDirection, FIRST_DATA_ROW, HEADER_ROW};
use crate::usecase::ports::host::HostError;

/// Formatting carried by a data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFormat {
    pub style: Option<RowStyle>,
    pub highlight: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredRow {
    pub cells: Vec<String>,
    pub format: RowFormat,
}

impl StoredRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self {
            cells,
            format: RowFormat::default(),
        }
    }
}

/// Sheet-row operations over the data region of a host, shared by the
/// in-memory and SQLite hosts. `rows[0]` is sheet row 2.
pub struct Grid<'a> {
    rows: &'a mut Vec<StoredRow>,
    width: usize,
}

impl<'a> Grid<'a> {
    pub fn new(rows: &'a mut Vec<StoredRow>, width: usize) -> Self {
        Self { rows, width }
    }

    fn last_row(&self) -> usize {
        HEADER_ROW + self.rows.len()
    }

    fn index_of(&self, row: usize) -> Result<usize, HostError> {
        if row < FIRST_DATA_ROW || row > self.last_row() {
            return Err(HostError::RowOutOfRange {
                row,
                last_row: self.last_row(),
            });
        }
        Ok(row - FIRST_DATA_ROW)
    }

    /// Overwrites or extends the data region from `start_row`; a gap below
    /// the last row is filled with empty rows.
    pub fn write(&mut self, start_row: usize, block: &[Vec<String>]) -> Result<(), HostError> {
        if start_row < FIRST_DATA_ROW {
            return Err(HostError::RowOutOfRange {
                row: start_row,
                last_row: self.last_row(),
            });
        }
        let start = start_row - FIRST_DATA_ROW;
        let end = start + block.len();
        if self.rows.len() < end {
            self.rows
                .resize(end, StoredRow::new(vec![String::new(); self.width]));
        }
        for (dest, cells) in self.rows[start..end].iter_mut().zip(block) {
            let mut cells = cells.clone();
            if cells.len() < self.width {
                cells.resize(self.width, String::new());
            }
            dest.cells = cells;
        }
        Ok(())
    }

    pub fn style(&mut self, first_row: usize, count: usize, style: &RowStyle) -> Result<(), HostError> {
        if count == 0 {
            return Ok(());
        }
        let start = self.index_of(first_row)?;
        let end = self.index_of(first_row + count - 1)? + 1;
        for row in &mut self.rows[start..end] {
            row.format.style = Some(style.clone());
        }
        Ok(())
    }

    /// Stable sort: rows with equal values keep their relative order.
    pub fn sort(
        &mut self,
        first_row: usize,
        last_row: usize,
        column: usize,
        direction: SortDirection,
    ) -> Result<(), HostError> {
        if column >= self.width {
            return Err(HostError::ColumnOutOfRange {
                column,
                columns: self.width,
            });
        }
        let start = self.index_of(first_row)?;
        let end = self.index_of(last_row)? + 1;
        if start >= end {
            return Ok(());
        }
        self.rows[start..end].sort_by(|a, b| {
            let ordering = cell(a, column).cmp(cell(b, column));
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        Ok(())
    }

    pub fn delete(&mut self, row: usize) -> Result<(), HostError> {
        let idx = self.index_of(row)?;
        self.rows.remove(idx);
        Ok(())
    }

    pub fn highlight(&mut self, row: usize, color: Option<&str>) -> Result<(), HostError> {
        let idx = self.index_of(row)?;
        self.rows[idx].format.highlight = color.map(str::to_string);
        Ok(())
    }
}

fn cell(row: &StoredRow, column: usize) -> &str {
    row.cells.get(column).map(String::as_str).unwrap_or("")
}
