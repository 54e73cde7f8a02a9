use std::sync::{Mutex, MutexGuard};

use crate::domain::entities::dataset::{RowStyle, SortDirection};
use crate::domain::entities::mapping::{HeaderMapping, StoredMapping};
use crate::infra::codec::{decode_stored_mapping, encode_mapping};
use crate::infra::grid::{Grid, StoredRow};
use crate::usecase::ports::host::{DatasetHost, HostError};
use crate::usecase::ports::store::{MappingStore, StoreError};

#[derive(Debug, Default)]
struct Sheet {
    headers: Vec<String>,
    rows: Vec<StoredRow>,
}

/// Destination dataset held in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    sheet: Mutex<Sheet>,
}

impl MemoryHost {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            sheet: Mutex::new(Sheet {
                headers,
                rows: rows.into_iter().map(StoredRow::new).collect(),
            }),
        }
    }

    /// Data rows with their formatting.
    pub fn formatted_rows(&self) -> Result<Vec<StoredRow>, HostError> {
        Ok(self.lock()?.rows.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Sheet>, HostError> {
        self.sheet
            .lock()
            .map_err(|_| HostError::Message("in-memory sheet lock poisoned".to_string()))
    }

    fn modify<F>(&self, change: F) -> Result<(), HostError>
    where
        F: FnOnce(&mut Grid<'_>) -> Result<(), HostError>,
    {
        let mut sheet = self.lock()?;
        let sheet = &mut *sheet;
        let width = sheet.headers.len();
        change(&mut Grid::new(&mut sheet.rows, width))
    }
}

impl DatasetHost for MemoryHost {
    fn read_headers(&self) -> Result<Vec<String>, HostError> {
        Ok(self.lock()?.headers.clone())
    }

    fn read_rows(&self) -> Result<Vec<Vec<String>>, HostError> {
        let sheet = self.lock()?;
        let width = sheet.headers.len();
        Ok(sheet
            .rows
            .iter()
            .map(|row| {
                let mut cells = row.cells.clone();
                if cells.len() < width {
                    cells.resize(width, String::new());
                }
                cells
            })
            .collect())
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

/// Mapping slot kept in process memory, encoded the same way as on disk.
#[derive(Debug, Default)]
pub struct MemoryMappingStore {
    slot: Mutex<Option<String>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a raw stored payload, valid or not.
    pub fn with_payload(payload: &str) -> Self {
        Self {
            slot: Mutex::new(Some(payload.to_string())),
        }
    }

    pub fn payload(&self) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<String>>, StoreError> {
        self.slot
            .lock()
            .map_err(|_| StoreError::Message("mapping slot lock poisoned".to_string()))
    }
}

impl MappingStore for MemoryMappingStore {
    fn load(&self) -> Result<StoredMapping, StoreError> {
        Ok(self
            .lock()?
            .as_deref()
            .map(decode_stored_mapping)
            .unwrap_or_default())
    }

    fn save(&self, mapping: &HeaderMapping) -> Result<(), StoreError> {
        let json = encode_mapping(mapping)?;
        *self.lock()? = Some(json);
        Ok(())
    }

    fn reset(&self) -> Result<(), StoreError> {
        *self.lock()? = None;
        Ok(())
    }
}
