use std::path::Path;

use anyhow::{Context, Result};

use crate::infra::import::{fit_row, ImportResult};
use crate::infra::sqlite::queries::create_dataset_from_rows;
use crate::usecase::ports::host::DatasetHost;

/// Loads a CSV sheet as a destination dataset; the first record is the
/// header row.
pub fn import_csv_to_sqlite(db_path: &Path, csv_path: &Path) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("failed to open csv: {}", csv_path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read headers from csv: {}", csv_path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.is_empty() {
        anyhow::bail!("csv header is required")
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to parse csv record")?;
        rows.push(fit_row(
            record.iter().map(str::to_string).collect(),
            headers.len(),
        ));
    }

    let source_path = csv_path.to_string_lossy().into_owned();
    let dataset_name = csv_path
        .file_stem()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("dataset")
        .to_string();

    let dataset_id = create_dataset_from_rows(db_path, &dataset_name, &source_path, &headers, &rows)?;

    Ok(ImportResult {
        dataset_id: dataset_id.into(),
        row_count: rows.len() as i64,
    })
}

/// Writes the header row and the data region of a host to a CSV file.
pub fn export_csv(host: &dyn DatasetHost, csv_path: &Path) -> Result<usize> {
    let headers = host.read_headers()?;
    let rows = host.read_rows()?;

    let mut writer = csv::Writer::from_path(csv_path)
        .with_context(|| format!("failed to create csv: {}", csv_path.display()))?;
    writer
        .write_record(&headers)
        .context("failed to write csv header")?;
    for row in &rows {
        writer.write_record(row).context("failed to write csv record")?;
    }
    writer.flush().context("failed to flush csv")?;

    Ok(rows.len())
}
