use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use log::debug;

use crate::domain::catalog::AliasCatalog;

/// Field arrays extracted from one source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedBatch {
    pub columns: BTreeMap<String, Vec<String>>,
}

impl ExtractedBatch {
    pub fn new(columns: BTreeMap<String, Vec<String>>) -> Self {
        Self { columns }
    }

    /// Longest column length; columns are expected to be equally long.
    pub fn record_count(&self) -> usize {
        self.columns.values().map(Vec::len).max().unwrap_or(0)
    }

    /// True when the document yielded no record with any non-empty value.
    pub fn is_blank(&self) -> bool {
        self.columns
            .values()
            .flatten()
            .all(|value| value.trim().is_empty())
    }
}

/// The session's candidate records: all batches concatenated column-wise in
/// batch order, keyed by canonical column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    columns: BTreeMap<String, Vec<String>>,
    record_count: usize,
}

impl CandidateSet {
    /// Concatenates batches, folding every field name onto its canonical
    /// column. Columns missing from a batch are padded with empty cells so
    /// record `i` of every column still belongs to the same source record.
    pub fn from_batches<I>(batches: I, catalog: &AliasCatalog) -> Self
    where
        I: IntoIterator<Item = ExtractedBatch>,
    {
        let mut columns: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut record_count = 0;

        for batch in batches {
            let rows = batch.record_count();
            let mut folded: BTreeMap<String, Vec<String>> = BTreeMap::new();

            for (field, values) in batch.columns {
                let name = catalog.canonicalize_field(&field);
                if name.is_empty() {
                    continue;
                }
                match folded.entry(name) {
                    Entry::Vacant(slot) => {
                        slot.insert(values);
                    }
                    Entry::Occupied(mut slot) => {
                        debug!("field {field:?} folds onto {:?} twice, merging cells", slot.key());
                        merge_cells(slot.get_mut(), values);
                    }
                }
            }

            for (name, mut values) in folded {
                values.resize(rows, String::new());
                let column = columns.entry(name).or_default();
                column.resize(record_count, String::new());
                column.extend(values);
            }
            record_count += rows;
        }

        for column in columns.values_mut() {
            column.resize(record_count, String::new());
        }

        Self {
            columns,
            record_count,
        }
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Cell value, empty when the column is absent or too short.
    pub fn value(&self, name: &str, index: usize) -> &str {
        self.columns
            .get(name)
            .and_then(|values| values.get(index))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

fn merge_cells(target: &mut Vec<String>, values: Vec<String>) {
    if values.len() > target.len() {
        target.resize(values.len(), String::new());
    }
    for (cell, value) in target.iter_mut().zip(values) {
        if cell.trim().is_empty() {
            *cell = value;
        }
    }
}
