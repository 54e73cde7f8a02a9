use std::collections::BTreeMap;

/// Headers that neither the catalog nor the stored mapping could place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRequest {
    pub unresolved_headers: Vec<String>,
    pub canonical_columns: Vec<String>,
}

/// Per-header choice; a missing entry or `None` means "no mapping".
pub type MappingAnswer = BTreeMap<String, Option<String>>;

/// Blocks until the user has chosen a canonical column (or none) for every
/// unresolved header. Dismissing the prompt returns an empty answer.
pub trait MappingPrompt: Send + Sync {
    fn choose(&self, request: &MappingRequest) -> MappingAnswer;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateRowGroup {
    pub key: String,
    /// Current sheet rows sharing the key, ascending.
    pub rows: Vec<usize>,
    /// Candidates with this key that were not inserted.
    pub skipped_candidates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateRowGroup>,
    pub skipped_candidates: usize,
}

impl DuplicateReport {
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|group| group.rows.len()).sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} duplicate group(s) across {} row(s); {} imported record(s) were already present.",
            self.groups.len(),
            self.row_count(),
            self.skipped_candidates
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateDecision {
    /// Leave the dataset as is and clear the highlights.
    Keep,
    /// Keep the first row of every group, delete the others.
    Delete,
}

/// Blocks until the user has decided what to do with highlighted duplicates.
/// Dismissing the prompt counts as [`DuplicateDecision::Keep`].
pub trait DuplicatePrompt: Send + Sync {
    fn decide(&self, report: &DuplicateReport) -> DuplicateDecision;
}

/// User-facing messages outside the prompts.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}
