use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::domain::entities::dataset::{row_value, DatasetSnapshot};
use crate::domain::entities::mapping::HeaderMapping;

/// Fewer resolvable key columns than this disables key-based classification.
pub const MIN_KEY_COLUMNS: usize = 2;

/// Ordered canonical columns that together identify a real-world record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyColumnSet {
    columns: Vec<String>,
}

impl KeyColumnSet {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Destination column index of every key column, via the first header
    /// mapped to it. Key columns without such a header are skipped.
    pub fn resolve(&self, headers: &[String], mapping: &HeaderMapping) -> KeyIndices {
        let indices = self
            .columns
            .iter()
            .filter_map(|column| {
                let idx = headers
                    .iter()
                    .position(|header| mapping.target(header) == Some(column.as_str()));
                if idx.is_none() {
                    debug!("key column {column:?} has no destination header");
                }
                idx
            })
            .collect();
        KeyIndices(indices)
    }
}

impl Default for KeyColumnSet {
    fn default() -> Self {
        Self::new(["Kabelnummer", "von Ort", "von km", "bis Ort", "bis km"])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIndices(pub Vec<usize>);

impl KeyIndices {
    pub fn is_usable(&self) -> bool {
        self.0.len() >= MIN_KEY_COLUMNS
    }
}

/// Trimmed, lower-cased key values of one row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey(Vec<String>);

impl CompositeKey {
    /// `None` when every key value is empty: such rows are exempt from
    /// duplicate classification.
    pub fn from_row(row: &[String], indices: &KeyIndices) -> Option<Self> {
        let values: Vec<String> = indices
            .0
            .iter()
            .map(|&idx| row_value(row, idx).trim().to_lowercase())
            .collect();
        if values.iter().all(String::is_empty) {
            None
        } else {
            Some(Self(values))
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("|"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    New,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLocation {
    /// Sheet row number in the pre-import snapshot.
    Existing(usize),
    /// Index into the candidate rows handed to the engine.
    Candidate(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: CompositeKey,
    pub members: Vec<RowLocation>,
}

impl DuplicateGroup {
    pub fn existing_rows(&self) -> Vec<usize> {
        self.members
            .iter()
            .filter_map(|member| match member {
                RowLocation::Existing(row) => Some(*row),
                RowLocation::Candidate(_) => None,
            })
            .collect()
    }

    pub fn candidate_indices(&self) -> Vec<usize> {
        self.members
            .iter()
            .filter_map(|member| match member {
                RowLocation::Candidate(idx) => Some(*idx),
                RowLocation::Existing(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    /// Rows to insert, in candidate order.
    pub new_rows: Vec<Vec<String>>,
    /// One entry per candidate.
    pub classifications: Vec<Classification>,
    pub groups: Vec<DuplicateGroup>,
    /// Key columns did not resolve; everything was classified new.
    pub degraded: bool,
}

impl DedupOutcome {
    pub fn duplicate_count(&self) -> usize {
        self.classifications
            .iter()
            .filter(|class| **class == Classification::Duplicate)
            .count()
    }
}

/// Composite-key classification of candidate rows against a snapshot.
#[derive(Debug, Clone)]
pub struct DedupEngine {
    indices: KeyIndices,
}

impl DedupEngine {
    pub fn new(indices: KeyIndices) -> Self {
        Self { indices }
    }

    pub fn for_headers(keys: &KeyColumnSet, headers: &[String], mapping: &HeaderMapping) -> Self {
        Self::new(keys.resolve(headers, mapping))
    }

    pub fn indices(&self) -> &KeyIndices {
        &self.indices
    }

    pub fn is_degraded(&self) -> bool {
        !self.indices.is_usable()
    }

    pub fn key_of(&self, row: &[String]) -> Option<CompositeKey> {
        if self.is_degraded() {
            return None;
        }
        CompositeKey::from_row(row, &self.indices)
    }

    pub fn classify(&self, existing: &DatasetSnapshot, candidates: Vec<Vec<String>>) -> DedupOutcome {
        if self.is_degraded() {
            warn!(
                "only {} key column(s) resolved, duplicate detection disabled for this import",
                self.indices.0.len()
            );
            return DedupOutcome {
                classifications: vec![Classification::New; candidates.len()],
                new_rows: candidates,
                groups: Vec::new(),
                degraded: true,
            };
        }

        let mut index: HashMap<CompositeKey, Vec<RowLocation>> = HashMap::new();
        let mut order: Vec<CompositeKey> = Vec::new();
        let mut record = |key: CompositeKey, location: RowLocation| {
            let members = index.entry(key.clone()).or_default();
            if members.is_empty() {
                order.push(key);
            }
            members.push(location);
            members.len() > 1
        };

        for (row_number, row) in existing.numbered_rows() {
            if let Some(key) = CompositeKey::from_row(row, &self.indices) {
                record(key, RowLocation::Existing(row_number));
            }
        }

        let mut new_rows = Vec::new();
        let mut classifications = Vec::with_capacity(candidates.len());
        for (idx, row) in candidates.into_iter().enumerate() {
            let seen = match CompositeKey::from_row(&row, &self.indices) {
                Some(key) => record(key, RowLocation::Candidate(idx)),
                None => false,
            };
            if seen {
                classifications.push(Classification::Duplicate);
            } else {
                classifications.push(Classification::New);
                new_rows.push(row);
            }
        }

        let groups: Vec<DuplicateGroup> = order
            .into_iter()
            .filter_map(|key| {
                let members = index.remove(&key)?;
                (members.len() > 1).then_some(DuplicateGroup { key, members })
            })
            .collect();

        debug!(
            "classified {} candidate(s): {} new, {} duplicate group(s)",
            classifications.len(),
            new_rows.len(),
            groups.len()
        );

        DedupOutcome {
            new_rows,
            classifications,
            groups,
            degraded: false,
        }
    }
}
