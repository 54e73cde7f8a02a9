use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{params, OptionalExtension};

use crate::domain::entities::dataset::{HorizontalAlignment, RowStyle};
use crate::infra::grid::{RowFormat, StoredRow};
use crate::infra::sqlite::schema::{init_db, open_connection};

pub fn insert_header_names(
    tx: &rusqlite::Transaction<'_>,
    dataset_id: i64,
    headers: &[String],
) -> Result<()> {
    let mut insert_header = tx
        .prepare("INSERT INTO column_name(dataset_id, col_idx, name) VALUES (?1, ?2, ?3)")
        .context("failed to prepare header insert")?;

    for (col_idx, name) in headers.iter().enumerate() {
        insert_header
            .execute(params![dataset_id, col_idx as i64, name])
            .context("failed to insert header")?;
    }

    Ok(())
}

pub fn create_dataset_from_rows(
    db_path: &Path,
    name: &str,
    source_path: &str,
    columns: &[String],
    rows: &[Vec<String>],
) -> Result<i64> {
    init_db(db_path)?;
    let mut conn = open_connection(db_path)?;
    let tx = conn
        .transaction()
        .context("failed to start dataset create transaction")?;

    tx.execute(
        "INSERT INTO dataset(name, source_path, row_count) VALUES (?1, ?2, 0)",
        params![name, source_path],
    )
    .context("failed to insert dataset")?;
    let dataset_id = tx.last_insert_rowid();

    insert_header_names(&tx, dataset_id, columns)?;

    let mut insert_cell = tx
        .prepare("INSERT INTO cell(dataset_id, row_idx, col_idx, value) VALUES (?1, ?2, ?3, ?4)")
        .context("failed to prepare cell insert")?;
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            insert_cell
                .execute(params![dataset_id, row_idx as i64, col_idx as i64, value])
                .context("failed to insert dataset cell")?;
        }
    }
    drop(insert_cell);

    tx.execute(
        "UPDATE dataset SET row_count = ?1 WHERE id = ?2",
        params![rows.len() as i64, dataset_id],
    )
    .context("failed to update dataset row_count")?;

    tx.commit().context("failed to commit dataset create")?;
    Ok(dataset_id)
}

pub fn load_headers(db_path: &Path, dataset_id: i64) -> Result<Vec<String>> {
    let conn = open_connection(db_path)?;
    let mut stmt = conn
        .prepare(
            "SELECT name
             FROM column_name
             WHERE dataset_id = ?1
             ORDER BY col_idx ASC",
        )
        .context("failed to prepare columns query")?;
    let columns = stmt
        .query_map([dataset_id], |row| row.get::<_, String>(0))
        .context("failed to query columns")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect columns")?;
    Ok(columns)
}

/// All data rows with their formatting, padded to the header width.
pub fn load_rows(db_path: &Path, dataset_id: i64) -> Result<Vec<StoredRow>> {
    let width = load_headers(db_path, dataset_id)?.len();
    let conn = open_connection(db_path)?;

    let row_count: i64 = conn
        .query_row(
            "SELECT row_count FROM dataset WHERE id = ?1",
            [dataset_id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to query dataset row_count")?
        .with_context(|| format!("dataset #{dataset_id} does not exist"))?;

    let mut rows = vec![
        StoredRow {
            cells: vec![String::new(); width],
            format: RowFormat::default(),
        };
        row_count.max(0) as usize
    ];

    let mut cell_stmt = conn
        .prepare(
            "SELECT row_idx, col_idx, value
             FROM cell
             WHERE dataset_id = ?1
             ORDER BY row_idx ASC, col_idx ASC",
        )
        .context("failed to prepare cell query")?;
    let mut cells = cell_stmt
        .query([dataset_id])
        .context("failed to run cell query")?;
    while let Some(row) = cells.next().context("failed to read cell row")? {
        let row_idx: i64 = row.get(0).context("failed to read row_idx")?;
        let col_idx: i64 = row.get(1).context("failed to read col_idx")?;
        let value: String = row.get(2).context("failed to read value")?;

        if let Some(dest_row) = rows.get_mut(row_idx as usize) {
            let col_idx = col_idx as usize;
            if col_idx >= dest_row.cells.len() {
                dest_row.cells.resize(col_idx + 1, String::new());
            }
            dest_row.cells[col_idx] = value;
        }
    }
    drop(cells);
    drop(cell_stmt);

    let mut format_stmt = conn
        .prepare(
            "SELECT row_idx, font_name, font_size, alignment, highlight
             FROM row_format
             WHERE dataset_id = ?1",
        )
        .context("failed to prepare row format query")?;
    let formats = format_stmt
        .query_map([dataset_id], |row| {
            let row_idx: i64 = row.get(0)?;
            let font_name: Option<String> = row.get(1)?;
            let font_size: Option<i64> = row.get(2)?;
            let alignment: Option<String> = row.get(3)?;
            let highlight: Option<String> = row.get(4)?;
            let style = match (font_name, font_size) {
                (Some(font_name), Some(font_size)) => Some(RowStyle {
                    font_name,
                    font_size: font_size.max(0) as u32,
                    alignment: parse_alignment(alignment.as_deref()),
                }),
                _ => None,
            };
            Ok((row_idx, RowFormat { style, highlight }))
        })
        .context("failed to query row formats")?;

    for item in formats {
        let (row_idx, format) = item.context("failed to read row format")?;
        if let Some(dest_row) = rows.get_mut(row_idx as usize) {
            dest_row.format = format;
        }
    }

    Ok(rows)
}

/// Replaces every data row of a dataset in one transaction.
pub fn rewrite_rows(db_path: &Path, dataset_id: i64, rows: &[StoredRow]) -> Result<()> {
    let mut conn = open_connection(db_path)?;
    let tx = conn
        .transaction()
        .context("failed to start rewrite transaction")?;

    tx.execute("DELETE FROM cell WHERE dataset_id = ?1", params![dataset_id])
        .context("failed to clear existing cells")?;
    tx.execute(
        "DELETE FROM row_format WHERE dataset_id = ?1",
        params![dataset_id],
    )
    .context("failed to clear existing row formats")?;

    let mut insert_cell = tx
        .prepare("INSERT INTO cell(dataset_id, row_idx, col_idx, value) VALUES (?1, ?2, ?3, ?4)")
        .context("failed to prepare cell insert")?;
    let mut insert_format = tx
        .prepare(
            "INSERT INTO row_format(dataset_id, row_idx, font_name, font_size, alignment, highlight)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .context("failed to prepare row format insert")?;

    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.cells.iter().enumerate() {
            insert_cell
                .execute(params![dataset_id, row_idx as i64, col_idx as i64, value])
                .context("failed to insert rewritten cell")?;
        }
        if row.format != RowFormat::default() {
            let style = row.format.style.as_ref();
            insert_format
                .execute(params![
                    dataset_id,
                    row_idx as i64,
                    style.map(|s| s.font_name.as_str()),
                    style.map(|s| s.font_size as i64),
                    style.map(|s| alignment_name(s.alignment)),
                    row.format.highlight.as_deref(),
                ])
                .context("failed to insert row format")?;
        }
    }
    drop(insert_cell);
    drop(insert_format);

    tx.execute(
        "UPDATE dataset SET row_count = ?1 WHERE id = ?2",
        params![rows.len() as i64, dataset_id],
    )
    .context("failed to update dataset row_count")?;

    tx.commit().context("failed to commit dataset rewrite")?;
    Ok(())
}

pub fn load_value(db_path: &Path, key: &str) -> Result<Option<String>> {
    init_db(db_path)?;
    let conn = open_connection(db_path)?;
    conn.query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
        row.get::<_, String>(0)
    })
    .optional()
    .with_context(|| format!("failed to load stored value: {key}"))
}

pub fn store_value(db_path: &Path, key: &str, value: &str) -> Result<()> {
    init_db(db_path)?;
    let conn = open_connection(db_path)?;
    let updated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    conn.execute(
        "INSERT INTO kv_store(key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, updated_at],
    )
    .with_context(|| format!("failed to store value: {key}"))?;
    Ok(())
}

pub fn value_updated_at(db_path: &Path, key: &str) -> Result<Option<String>> {
    init_db(db_path)?;
    let conn = open_connection(db_path)?;
    conn.query_row(
        "SELECT updated_at FROM kv_store WHERE key = ?1",
        [key],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .with_context(|| format!("failed to load timestamp of stored value: {key}"))
}

pub fn delete_value(db_path: &Path, key: &str) -> Result<()> {
    init_db(db_path)?;
    let conn = open_connection(db_path)?;
    conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])
        .with_context(|| format!("failed to delete stored value: {key}"))?;
    Ok(())
}

fn alignment_name(alignment: HorizontalAlignment) -> &'static str {
    match alignment {
        HorizontalAlignment::Left => "Left",
        HorizontalAlignment::Center => "Center",
        HorizontalAlignment::Right => "Right",
    }
}

fn parse_alignment(name: Option<&str>) -> HorizontalAlignment {
    match name {
        Some("Center") => HorizontalAlignment::Center,
        Some("Right") => HorizontalAlignment::Right,
        _ => HorizontalAlignment::Left,
    }
}
