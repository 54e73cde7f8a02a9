use std::sync::Arc;

use log::{info, warn};

use crate::domain::catalog::AliasCatalog;
use crate::domain::entities::batch::CandidateSet;
use crate::usecase::error::{DocumentFailure, ImportError};
use crate::usecase::ports::extractor::{Extractor, SourceDocument};
use crate::usecase::ports::prompt::Notifier;

pub const NO_USABLE_ROWS: &str = "no usable rows found in document";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub candidates: CandidateSet,
    pub processed: usize,
    pub failures: Vec<DocumentFailure>,
}

impl ExtractionOutcome {
    pub fn failure_summary(&self) -> Option<String> {
        summarize_failures(&self.failures)
    }
}

pub struct ExtractionService {
    extractor: Arc<dyn Extractor>,
    catalog: Arc<AliasCatalog>,
    notifier: Arc<dyn Notifier>,
}

impl ExtractionService {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        catalog: Arc<AliasCatalog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            extractor,
            catalog,
            notifier,
        }
    }

    /// Sends every document to the extraction service, one after the other.
    /// A failing document is recorded and the rest still run; only when none
    /// succeeds does the whole step fail.
    pub fn extract_all(&self, documents: &[SourceDocument]) -> Result<ExtractionOutcome, ImportError> {
        if documents.is_empty() {
            self.notifier.error("Select at least one document.");
            return Err(ImportError::NoDocuments);
        }

        let mut batches = Vec::new();
        let mut failures = Vec::new();

        for (idx, document) in documents.iter().enumerate() {
            info!(
                "processing document {} of {}: {}",
                idx + 1,
                documents.len(),
                document.name
            );
            let detail = match self.extractor.extract(document) {
                Ok(batch) if batch.is_blank() => NO_USABLE_ROWS.to_string(),
                Ok(batch) => {
                    batches.push(batch);
                    continue;
                }
                Err(detail) => detail,
            };
            warn!("document {} failed: {detail}", document.name);
            failures.push(DocumentFailure {
                document: document.name.clone(),
                detail,
            });
        }

        if batches.is_empty() {
            self.notifier.error("No document could be processed.");
            return Err(ImportError::NothingExtracted { failures });
        }

        if let Some(summary) = summarize_failures(&failures) {
            self.notifier.error(&summary);
        }

        let processed = batches.len();
        let candidates = CandidateSet::from_batches(batches, &self.catalog);
        info!(
            "extracted {} record(s) from {processed} document(s)",
            candidates.record_count()
        );

        Ok(ExtractionOutcome {
            candidates,
            processed,
            failures,
        })
    }
}

fn summarize_failures(failures: &[DocumentFailure]) -> Option<String> {
    if failures.is_empty() {
        return None;
    }
    let lines: Vec<String> = failures.iter().map(|failure| format!("- {failure}")).collect();
    Some(format!(
        "The following documents could not be processed:\n{}",
        lines.join("\n")
    ))
}
