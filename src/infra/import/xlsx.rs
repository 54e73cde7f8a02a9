use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};

use crate::infra::import::{fit_row, ImportResult};
use crate::infra::sqlite::queries::create_dataset_from_rows;

pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(v) => v.to_string(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(v) => v.to_string(),
        Data::DateTimeIso(v) => v.to_string(),
        Data::DurationIso(v) => v.to_string(),
        Data::Error(v) => format!("{v:?}"),
        Data::Empty => String::new(),
    }
}

/// Loads one worksheet (the first when `sheet` is `None`) as a destination
/// dataset. The first row of the sheet is the header row.
pub fn import_xlsx_sheet_to_sqlite(
    db_path: &Path,
    xlsx_path: &Path,
    sheet: Option<&str>,
) -> Result<ImportResult> {
    let mut workbook = open_workbook_auto(xlsx_path)
        .with_context(|| format!("failed to open xlsx: {}", xlsx_path.display()))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .context("workbook has no sheets")?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("failed to read sheet: {sheet_name}"))?;

    let mut rows = range
        .rows()
        .map(|r| r.iter().map(cell_to_string).collect::<Vec<_>>());
    let mut headers = rows.next().unwrap_or_default();
    while headers.last().is_some_and(|header| header.trim().is_empty()) {
        headers.pop();
    }
    if headers.is_empty() {
        anyhow::bail!("sheet {sheet_name} has no header row")
    }

    let data: Vec<Vec<String>> = rows.map(|row| fit_row(row, headers.len())).collect();

    let source_path = format!("{}#{sheet_name}", xlsx_path.to_string_lossy());
    let dataset_id = create_dataset_from_rows(db_path, &sheet_name, &source_path, &headers, &data)
        .with_context(|| format!("failed to store sheet: {sheet_name}"))?;

    Ok(ImportResult {
        dataset_id: dataset_id.into(),
        row_count: data.len() as i64,
    })
}
