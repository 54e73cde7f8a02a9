use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{AliasCatalog, CanonicalColumn};
use crate::domain::dedup::KeyColumnSet;
use crate::domain::entities::dataset::RowStyle;

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#FFFF00";

/// Per-deployment settings of the import. Every field has a default, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Replaces the built-in alias catalog when present.
    pub catalog: Option<Vec<CanonicalColumn>>,
    pub key_columns: KeyColumnSet,
    /// Canonical column the data region is sorted by after an insert.
    pub sort_column: String,
    pub row_style: RowStyle,
    pub highlight_color: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            key_columns: KeyColumnSet::default(),
            sort_column: "Kabelnummer".to_string(),
            row_style: RowStyle::default(),
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
        }
    }
}

impl ImportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn alias_catalog(&self) -> AliasCatalog {
        match &self.catalog {
            Some(columns) => AliasCatalog::from_columns(columns.clone()),
            None => AliasCatalog::default(),
        }
    }
}
