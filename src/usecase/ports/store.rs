use thiserror::Error;

use crate::domain::entities::mapping::{HeaderMapping, StoredMapping};

/// Storage key of the persisted header mapping.
pub const MAPPING_STORAGE_KEY: &str = "pmfusion-column-mapping";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0}")]
    Message(String),
}

/// Durable slot holding the last resolved header mapping.
pub trait MappingStore: Send + Sync {
    /// Previously saved non-null targets; empty when nothing was stored or
    /// the payload is unreadable.
    fn load(&self) -> Result<StoredMapping, StoreError>;

    fn save(&self, mapping: &HeaderMapping) -> Result<(), StoreError>;

    /// Clears the slot. Succeeds when it is already empty.
    fn reset(&self) -> Result<(), StoreError>;
}
