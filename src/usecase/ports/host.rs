use thiserror::Error;

use crate::domain::entities::dataset::{RowStyle, SortDirection};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("row {row} is outside the data region (last row {last_row})")]
    RowOutOfRange { row: usize, last_row: usize },
    #[error("column {column} is outside the header row ({columns} columns)")]
    ColumnOutOfRange { column: usize, columns: usize },
    #[error("{0}")]
    Message(String),
}

/// The destination spreadsheet. Rows are 1-based sheet rows and row 1 is the
/// header row. Writes may be buffered until [`DatasetHost::flush`].
pub trait DatasetHost: Send + Sync {
    fn read_headers(&self) -> Result<Vec<String>, HostError>;

    /// Used data region below the header row, padded to the header width.
    fn read_rows(&self) -> Result<Vec<Vec<String>>, HostError>;

    /// Writes a contiguous block starting at `start_row`.
    fn write_rows(&self, start_row: usize, rows: &[Vec<String>]) -> Result<(), HostError>;

    fn apply_style(&self, first_row: usize, row_count: usize, style: &RowStyle)
        -> Result<(), HostError>;

    /// Sorts rows `first_row..=last_row` by one column. Rows carry their
    /// formatting and highlight with them.
    fn sort_rows(
        &self,
        first_row: usize,
        last_row: usize,
        column: usize,
        direction: SortDirection,
    ) -> Result<(), HostError>;

    /// Deletes a row; every row below moves up by one.
    fn delete_row(&self, row: usize) -> Result<(), HostError>;

    fn set_highlight(&self, row: usize, color: &str) -> Result<(), HostError>;

    fn clear_highlight(&self, row: usize) -> Result<(), HostError>;

    fn flush(&self) -> Result<(), HostError>;
}
