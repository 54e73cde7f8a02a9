use std::fmt;

use thiserror::Error;

use crate::usecase::ports::host::HostError;
use crate::usecase::ports::store::StoreError;

/// A source document the extraction step could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub document: String,
    pub detail: String,
}

impl fmt::Display for DocumentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.document, self.detail)
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("select at least one document to import")]
    NoDocuments,
    #[error("no document could be processed ({} failure(s))", failures.len())]
    NothingExtracted { failures: Vec<DocumentFailure> },
    #[error("the destination header row is empty")]
    NoHeaders,
    #[error("destination dataset: {0}")]
    Host(#[from] HostError),
    #[error("mapping store: {0}")]
    Store(#[from] StoreError),
}
