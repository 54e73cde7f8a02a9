use std::collections::BTreeMap;

/// How a destination header got its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOrigin {
    Catalog,
    Stored,
    Interactive,
    /// The user was asked and chose "no mapping".
    Declined,
    /// Header cell is empty; the column is never filled.
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderResolution {
    pub target: Option<String>,
    pub origin: MappingOrigin,
}

/// Destination header -> canonical column (or unmapped), total over the
/// headers present at import time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMapping {
    entries: BTreeMap<String, HeaderResolution>,
}

impl HeaderMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, header: &str, target: Option<String>, origin: MappingOrigin) {
        self.entries
            .insert(header.to_string(), HeaderResolution { target, origin });
    }

    /// Canonical column for a header; `None` when unmapped or unknown.
    pub fn target(&self, header: &str) -> Option<&str> {
        self.entries
            .get(header)
            .and_then(|resolution| resolution.target.as_deref())
    }

    pub fn resolution(&self, header: &str) -> Option<&HeaderResolution> {
        self.entries.get(header)
    }

    pub fn contains(&self, header: &str) -> bool {
        self.entries.contains_key(header)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderResolution)> {
        self.entries
            .iter()
            .map(|(header, resolution)| (header.as_str(), resolution))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain header -> target view, the shape persisted by a mapping store.
    pub fn to_targets(&self) -> BTreeMap<String, Option<String>> {
        self.entries
            .iter()
            .map(|(header, resolution)| (header.clone(), resolution.target.clone()))
            .collect()
    }
}

/// Previously resolved header targets as loaded from a mapping store. Only
/// non-null entries survive decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredMapping {
    pub targets: BTreeMap<String, String>,
}

impl StoredMapping {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.targets.get(header).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl From<&HeaderMapping> for StoredMapping {
    fn from(mapping: &HeaderMapping) -> Self {
        let targets = mapping
            .iter()
            .filter_map(|(header, resolution)| {
                resolution
                    .target
                    .as_ref()
                    .map(|target| (header.to_string(), target.clone()))
            })
            .collect();
        Self { targets }
    }
}
