use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::domain::catalog::AliasCatalog;
use crate::domain::entities::batch::CandidateSet;
use crate::domain::entities::mapping::{HeaderMapping, MappingOrigin, StoredMapping};
use crate::usecase::error::ImportError;
use crate::usecase::ports::prompt::{MappingPrompt, MappingRequest, Notifier};
use crate::usecase::ports::store::MappingStore;

/// Produces a complete header mapping: catalog first, then remembered
/// choices, then the user for whatever is left.
pub struct MappingResolver {
    catalog: Arc<AliasCatalog>,
    store: Arc<dyn MappingStore>,
    prompt: Arc<dyn MappingPrompt>,
    notifier: Arc<dyn Notifier>,
}

impl MappingResolver {
    pub fn new(
        catalog: Arc<AliasCatalog>,
        store: Arc<dyn MappingStore>,
        prompt: Arc<dyn MappingPrompt>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            store,
            prompt,
            notifier,
        }
    }

    pub fn catalog(&self) -> &AliasCatalog {
        &self.catalog
    }

    /// Canonical columns offered to the user: catalog order, then fields
    /// only the extraction service knows about.
    pub fn canonical_options(&self, candidates: &CandidateSet) -> Vec<String> {
        let mut options = self.catalog.column_names();
        options.extend(
            candidates
                .column_names()
                .filter(|name| !self.catalog.contains(name))
                .map(str::to_string),
        );
        options
    }

    pub fn resolve(
        &self,
        headers: &[String],
        candidates: &CandidateSet,
    ) -> Result<HeaderMapping, ImportError> {
        let options = self.canonical_options(candidates);
        let known: BTreeSet<&str> = options.iter().map(String::as_str).collect();
        let stored = self.load_stored();

        let mut mapping = HeaderMapping::new();
        let mut pending = Vec::new();

        for header in headers {
            if mapping.contains(header) || pending.contains(header) {
                continue;
            }
            if header.trim().is_empty() {
                mapping.insert(header, None, MappingOrigin::Blank);
            } else if let Some(column) = self.catalog.resolve(header) {
                debug!("header {header:?} -> {:?} (catalog)", column.name);
                mapping.insert(header, Some(column.name.clone()), MappingOrigin::Catalog);
            } else if let Some(target) = stored.get(header).filter(|t| known.contains(t)) {
                debug!("header {header:?} -> {target:?} (stored)");
                mapping.insert(header, Some(target.to_string()), MappingOrigin::Stored);
            } else {
                pending.push(header.clone());
            }
        }

        if !pending.is_empty() {
            info!("{} header(s) need a manual mapping", pending.len());
            let request = MappingRequest {
                unresolved_headers: pending.clone(),
                canonical_columns: options.clone(),
            };
            let answer = self.prompt.choose(&request);

            for header in pending {
                let choice = answer
                    .get(&header)
                    .cloned()
                    .flatten()
                    .filter(|column| {
                        let valid = known.contains(column.as_str());
                        if !valid {
                            warn!("ignoring unknown column {column:?} chosen for {header:?}");
                        }
                        valid
                    });
                match choice {
                    Some(column) => {
                        debug!("header {header:?} -> {column:?} (user)");
                        mapping.insert(&header, Some(column), MappingOrigin::Interactive);
                    }
                    None => {
                        debug!("header {header:?} left unmapped (user)");
                        mapping.insert(&header, None, MappingOrigin::Declined);
                    }
                }
            }
        }

        self.persist(&mapping, &stored);
        Ok(mapping)
    }

    /// Forgets every remembered header mapping and tells the user.
    pub fn reset(&self) -> Result<(), ImportError> {
        self.store.reset()?;
        info!("stored column mappings cleared");
        self.notifier.info("Saved column mappings have been reset.");
        Ok(())
    }

    fn load_stored(&self) -> StoredMapping {
        match self.store.load() {
            Ok(stored) => stored,
            Err(err) => {
                warn!("could not load stored column mappings, continuing without: {err}");
                self.notifier.error(&format!(
                    "Saved column mappings could not be loaded, headers may need to be mapped again: {err}"
                ));
                StoredMapping::default()
            }
        }
    }

    // A stored target survives until reset: headers missing from this sheet
    // and headers declined this run keep their remembered column.
    fn persist(&self, mapping: &HeaderMapping, stored: &StoredMapping) {
        let mut merged = mapping.clone();
        for (header, target) in &stored.targets {
            let declined = merged
                .resolution(header)
                .is_some_and(|resolution| resolution.origin == MappingOrigin::Declined);
            if declined || !merged.contains(header) {
                merged.insert(header, Some(target.clone()), MappingOrigin::Stored);
            }
        }
        if let Err(err) = self.store.save(&merged) {
            warn!("could not save column mappings: {err}");
            self.notifier.error(&format!(
                "Column mappings could not be saved and will be asked for again next time: {err}"
            ));
        }
    }
}
