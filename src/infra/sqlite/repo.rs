use std::path::PathBuf;

use crate::domain::entities::dataset::{DatasetId, RowStyle, SortDirection};
use crate::domain::entities::mapping::{HeaderMapping, StoredMapping};
use crate::infra::codec::{decode_stored_mapping, encode_mapping};
use crate::infra::grid::{Grid, StoredRow};
use crate::infra::sqlite::queries::{
    delete_value, load_headers, load_rows, load_value, rewrite_rows, store_value, value_updated_at,
};
use crate::infra::sqlite::schema::init_db;
use crate::usecase::ports::host::{DatasetHost, HostError};
use crate::usecase::ports::store::{MappingStore, StoreError, MAPPING_STORAGE_KEY};

/// Destination dataset kept in the SQLite dataset store. Every call runs in
/// its own transaction, so writes are durable when the call returns.
pub struct SqliteHost {
    pub db_path: PathBuf,
    pub dataset_id: DatasetId,
}

impl SqliteHost {
    pub fn new(db_path: PathBuf, dataset_id: DatasetId) -> Self {
        Self {
            db_path,
            dataset_id,
        }
    }

    fn modify<F>(&self, change: F) -> Result<(), HostError>
    where
        F: FnOnce(&mut Grid<'_>) -> Result<(), HostError>,
    {
        let width = self.read_headers()?.len();
        let mut rows = load_rows(&self.db_path, self.dataset_id.0)
            .map_err(|err| HostError::Message(err.to_string()))?;
        change(&mut Grid::new(&mut rows, width))?;
        rewrite_rows(&self.db_path, self.dataset_id.0, &rows)
            .map_err(|err| HostError::Message(err.to_string()))
    }
}

impl DatasetHost for SqliteHost {
    fn read_headers(&self) -> Result<Vec<String>, HostError> {
        load_headers(&self.db_path, self.dataset_id.0)
            .map_err(|err| HostError::Message(err.to_string()))
    }

    fn read_rows(&self) -> Result<Vec<Vec<String>>, HostError> {
        let rows = load_rows(&self.db_path, self.dataset_id.0)
            .map_err(|err| HostError::Message(err.to_string()))?;
        Ok(rows.into_iter().map(|row| row.cells).collect())
    }

    fn write_rows(&self, start_row: usize, rows: &[Vec<String>]) -> Result<(), HostError> {
        self.modify(|grid| grid.write(start_row, rows))
    }

    fn apply_style(
        &self,
        first_row: usize,
        row_count: usize,
        style: &RowStyle,
    ) -> Result<(), HostError> {
        self.modify(|grid| grid.style(first_row, row_count, style))
    }

    fn sort_rows(
        &self,
        first_row: usize,
        last_row: usize,
        column: usize,
        direction: SortDirection,
    ) -> Result<(), HostError> {
        self.modify(|grid| grid.sort(first_row, last_row, column, direction))
    }

    fn delete_row(&self, row: usize) -> Result<(), HostError> {
        self.modify(|grid| grid.delete(row))
    }

    fn set_highlight(&self, row: usize, color: &str) -> Result<(), HostError> {
        self.modify(|grid| grid.highlight(row, Some(color)))
    }

    fn clear_highlight(&self, row: usize) -> Result<(), HostError> {
        self.modify(|grid| grid.highlight(row, None))
    }

    fn flush(&self) -> Result<(), HostError> {
        Ok(())
    }
}

/// Row formatting as stored, for callers rendering the dataset.
pub fn load_formatted_rows(host: &SqliteHost) -> Result<Vec<StoredRow>, HostError> {
    load_rows(&host.db_path, host.dataset_id.0).map_err(|err| HostError::Message(err.to_string()))
}

/// Header mapping kept under [`MAPPING_STORAGE_KEY`] in the dataset store.
pub struct SqliteMappingStore {
    pub db_path: PathBuf,
}

impl SqliteMappingStore {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    pub fn init(&self) -> Result<(), StoreError> {
        init_db(&self.db_path).map_err(|err| StoreError::Message(err.to_string()))
    }

    /// Local time of the last save, if any.
    pub fn last_saved_at(&self) -> Result<Option<String>, StoreError> {
        value_updated_at(&self.db_path, MAPPING_STORAGE_KEY)
            .map_err(|err| StoreError::Message(err.to_string()))
    }
}

impl MappingStore for SqliteMappingStore {
    fn load(&self) -> Result<StoredMapping, StoreError> {
        let payload = load_value(&self.db_path, MAPPING_STORAGE_KEY)
            .map_err(|err| StoreError::Message(err.to_string()))?;
        Ok(payload
            .map(|json| decode_stored_mapping(&json))
            .unwrap_or_default())
    }

    fn save(&self, mapping: &HeaderMapping) -> Result<(), StoreError> {
        let json = encode_mapping(mapping)?;
        store_value(&self.db_path, MAPPING_STORAGE_KEY, &json)
            .map_err(|err| StoreError::Message(err.to_string()))
    }

    fn reset(&self) -> Result<(), StoreError> {
        delete_value(&self.db_path, MAPPING_STORAGE_KEY)
            .map_err(|err| StoreError::Message(err.to_string()))
    }
}
