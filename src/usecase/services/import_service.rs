use std::sync::Arc;

use crate::config::ImportConfig;
use crate::domain::catalog::AliasCatalog;
use crate::domain::entities::batch::CandidateSet;
use crate::usecase::error::ImportError;
use crate::usecase::ports::extractor::{Extractor, SourceDocument};
use crate::usecase::ports::host::DatasetHost;
use crate::usecase::ports::prompt::{DuplicatePrompt, MappingPrompt, Notifier};
use crate::usecase::ports::store::MappingStore;
use crate::usecase::services::extraction_service::{ExtractionOutcome, ExtractionService};
use crate::usecase::services::mapping_resolver::MappingResolver;
use crate::usecase::services::merge_coordinator::{MergeCoordinator, MergeReport};

/// Collaborators of one import session.
pub struct ImportPorts {
    pub host: Arc<dyn DatasetHost>,
    pub store: Arc<dyn MappingStore>,
    pub extractor: Arc<dyn Extractor>,
    pub mapping_prompt: Arc<dyn MappingPrompt>,
    pub duplicate_prompt: Arc<dyn DuplicatePrompt>,
    pub notifier: Arc<dyn Notifier>,
}

/// Entry point behind the two user actions: selecting documents (extract)
/// and confirming the preview (insert).
pub struct ImportService {
    extraction: ExtractionService,
    merge: MergeCoordinator,
}

impl ImportService {
    pub fn new(config: ImportConfig, ports: ImportPorts) -> Self {
        let catalog = Arc::new(config.alias_catalog());
        let extraction = ExtractionService::new(
            ports.extractor,
            Arc::clone(&catalog),
            Arc::clone(&ports.notifier),
        );
        let resolver = MappingResolver::new(
            catalog,
            ports.store,
            ports.mapping_prompt,
            Arc::clone(&ports.notifier),
        );
        let merge = MergeCoordinator::new(
            ports.host,
            resolver,
            ports.duplicate_prompt,
            ports.notifier,
            config,
        );
        Self { extraction, merge }
    }

    pub fn catalog(&self) -> &AliasCatalog {
        self.merge.resolver().catalog()
    }

    pub fn extract(&self, documents: &[SourceDocument]) -> Result<ExtractionOutcome, ImportError> {
        self.extraction.extract_all(documents)
    }

    pub fn insert(&self, candidates: &CandidateSet) -> Result<MergeReport, ImportError> {
        self.merge.insert(candidates)
    }

    /// Extract and insert in one go, for callers without a preview step.
    pub fn import_documents(
        &self,
        documents: &[SourceDocument],
    ) -> Result<(ExtractionOutcome, MergeReport), ImportError> {
        let extracted = self.extract(documents)?;
        let report = self.insert(&extracted.candidates)?;
        Ok((extracted, report))
    }

    pub fn reset_mappings(&self) -> Result<(), ImportError> {
        self.merge.resolver().reset()
    }
}
