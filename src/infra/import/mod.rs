pub mod csv;
pub mod xlsx;

use crate::domain::entities::dataset::DatasetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportResult {
    pub dataset_id: DatasetId,
    pub row_count: i64,
}

/// Pads or truncates a source row to the header width.
fn fit_row(mut row: Vec<String>, width: usize) -> Vec<String> {
    row.resize(width, String::new());
    row
}
