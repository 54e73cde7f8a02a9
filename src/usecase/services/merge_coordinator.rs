use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::ImportConfig;
use crate::domain::dedup::{Classification, DedupEngine, DedupOutcome, MIN_KEY_COLUMNS};
use crate::domain::entities::batch::CandidateSet;
use crate::domain::entities::dataset::{
    is_blank_row, DatasetSnapshot, SortDirection, FIRST_DATA_ROW, HEADER_ROW,
};
use crate::domain::entities::mapping::HeaderMapping;
use crate::domain::records::build_record_set;
use crate::usecase::error::ImportError;
use crate::usecase::ports::host::{DatasetHost, HostError};
use crate::usecase::ports::prompt::{
    DuplicateDecision, DuplicatePrompt, DuplicateReport, DuplicateRowGroup, Notifier,
};
use crate::usecase::services::mapping_resolver::MappingResolver;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Candidate rows left after dropping empty records.
    pub candidates: usize,
    pub inserted: usize,
    /// Candidates not inserted because their key was already present.
    pub skipped_duplicates: usize,
    pub dedup_degraded: bool,
    pub removed_blank_rows: usize,
    pub duplicate_groups: usize,
    pub decision: Option<DuplicateDecision>,
    pub removed_duplicate_rows: usize,
    /// Failure after the insert; the inserted rows stay in the dataset.
    pub cleanup_error: Option<HostError>,
}

/// Runs one insert: mapping, projection, dedup, write, sort, prune and the
/// duplicate prompt, strictly in that order.
pub struct MergeCoordinator {
    host: Arc<dyn DatasetHost>,
    resolver: MappingResolver,
    prompt: Arc<dyn DuplicatePrompt>,
    notifier: Arc<dyn Notifier>,
    config: ImportConfig,
}

impl MergeCoordinator {
    pub fn new(
        host: Arc<dyn DatasetHost>,
        resolver: MappingResolver,
        prompt: Arc<dyn DuplicatePrompt>,
        notifier: Arc<dyn Notifier>,
        config: ImportConfig,
    ) -> Self {
        Self {
            host,
            resolver,
            prompt,
            notifier,
            config,
        }
    }

    pub fn resolver(&self) -> &MappingResolver {
        &self.resolver
    }

    pub fn insert(&self, candidates: &CandidateSet) -> Result<MergeReport, ImportError> {
        match self.try_insert(candidates) {
            Ok(report) => Ok(report),
            Err(err) => {
                self.notifier.error(&format!("Import failed: {err}"));
                Err(err)
            }
        }
    }

    fn try_insert(&self, candidates: &CandidateSet) -> Result<MergeReport, ImportError> {
        let headers = self.read_headers()?;
        let mapping = self.resolver.resolve(&headers, candidates)?;
        let rows = build_record_set(&headers, &mapping, candidates);

        let snapshot = DatasetSnapshot::new(headers.clone(), self.host.read_rows()?);
        let engine = DedupEngine::for_headers(&self.config.key_columns, &headers, &mapping);
        let outcome = engine.classify(&snapshot, rows);

        let mut report = MergeReport {
            candidates: outcome.classifications.len(),
            inserted: outcome.new_rows.len(),
            skipped_duplicates: outcome.duplicate_count(),
            dedup_degraded: outcome.degraded,
            ..MergeReport::default()
        };

        let first_new_row = snapshot.last_row() + 1;
        if !outcome.new_rows.is_empty() {
            self.host.write_rows(first_new_row, &outcome.new_rows)?;
            self.host.flush()?;
            info!(
                "inserted {} row(s) starting at row {first_new_row}",
                outcome.new_rows.len()
            );
        }

        if let Err(err) = self.finish(&headers, &mapping, &engine, &outcome, first_new_row, &mut report) {
            warn!("post-insert cleanup failed: {err}");
            self.notifier.error(&format!(
                "{} row(s) were inserted, but cleaning up the sheet failed: {err}",
                report.inserted
            ));
            report.cleanup_error = Some(err);
        } else if report.dedup_degraded {
            self.notifier.info(&format!(
                "{} row(s) inserted. Duplicate detection was disabled: fewer than {MIN_KEY_COLUMNS} key columns could be matched to the sheet headers.",
                report.inserted
            ));
        } else {
            self.notifier.info(&format!(
                "{} row(s) inserted, {} duplicate record(s) skipped.",
                report.inserted, report.skipped_duplicates
            ));
        }

        Ok(report)
    }

    fn read_headers(&self) -> Result<Vec<String>, ImportError> {
        let mut headers = self.host.read_headers()?;
        while headers.last().is_some_and(|header| header.trim().is_empty()) {
            headers.pop();
        }
        if headers.is_empty() {
            return Err(ImportError::NoHeaders);
        }
        Ok(headers)
    }

    fn finish(
        &self,
        headers: &[String],
        mapping: &HeaderMapping,
        engine: &DedupEngine,
        outcome: &DedupOutcome,
        first_new_row: usize,
        report: &mut MergeReport,
    ) -> Result<(), HostError> {
        if !outcome.new_rows.is_empty() {
            self.host
                .apply_style(first_new_row, outcome.new_rows.len(), &self.config.row_style)?;
        }

        self.sort_data_region(headers, mapping)?;
        report.removed_blank_rows = self.prune_blank_rows()?;

        if outcome.groups.is_empty() {
            return Ok(());
        }
        let duplicates = self.locate_duplicates(engine, outcome)?;
        report.duplicate_groups = duplicates.groups.len();
        let (decision, removed) = self.resolve_duplicates(&duplicates)?;
        report.decision = Some(decision);
        report.removed_duplicate_rows = removed;
        Ok(())
    }

    fn sort_data_region(&self, headers: &[String], mapping: &HeaderMapping) -> Result<(), HostError> {
        let sort_column = self.config.sort_column.as_str();
        let Some(column) = headers
            .iter()
            .position(|header| mapping.target(header) == Some(sort_column))
        else {
            warn!("sort column {sort_column:?} has no destination header, rows left unsorted");
            return Ok(());
        };

        let row_count = self.host.read_rows()?.len();
        if row_count > 1 {
            self.host.sort_rows(
                FIRST_DATA_ROW,
                HEADER_ROW + row_count,
                column,
                SortDirection::Asc,
            )?;
            self.host.flush()?;
            debug!("sorted {row_count} row(s) by column {column}");
        }
        Ok(())
    }

    fn prune_blank_rows(&self) -> Result<usize, HostError> {
        let rows = self.host.read_rows()?;
        let blank: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| is_blank_row(row))
            .map(|(idx, _)| FIRST_DATA_ROW + idx)
            .collect();

        for row in blank.iter().rev() {
            self.host.delete_row(*row)?;
        }
        if !blank.is_empty() {
            self.host.flush()?;
            info!("removed {} empty row(s)", blank.len());
        }
        Ok(blank.len())
    }

    /// Rows moved during sort and prune, so groups are found again on the
    /// current sheet by their key.
    fn locate_duplicates(
        &self,
        engine: &DedupEngine,
        outcome: &DedupOutcome,
    ) -> Result<DuplicateReport, HostError> {
        let current = DatasetSnapshot::new(Vec::new(), self.host.read_rows()?);
        let keyed: Vec<_> = current
            .numbered_rows()
            .map(|(row_number, row)| (row_number, engine.key_of(row)))
            .collect();

        let groups: Vec<DuplicateRowGroup> = outcome
            .groups
            .iter()
            .map(|group| {
                let rows = keyed
                    .iter()
                    .filter(|(_, key)| key.as_ref() == Some(&group.key))
                    .map(|(row_number, _)| *row_number)
                    .collect();
                let skipped_candidates = group
                    .candidate_indices()
                    .into_iter()
                    .filter(|idx| outcome.classifications.get(*idx) == Some(&Classification::Duplicate))
                    .count();
                DuplicateRowGroup {
                    key: group.key.to_string(),
                    rows,
                    skipped_candidates,
                }
            })
            .collect();

        Ok(DuplicateReport {
            skipped_candidates: groups.iter().map(|group| group.skipped_candidates).sum(),
            groups,
        })
    }

    fn resolve_duplicates(&self, report: &DuplicateReport) -> Result<(DuplicateDecision, usize), HostError> {
        let marked: BTreeSet<usize> = report
            .groups
            .iter()
            .flat_map(|group| group.rows.iter().copied())
            .collect();

        for row in &marked {
            self.host.set_highlight(*row, &self.config.highlight_color)?;
        }
        self.host.flush()?;

        info!("{}", report.summary());
        let decision = self.prompt.decide(report);
        debug!("duplicate decision: {decision:?}");

        let removed = match decision {
            DuplicateDecision::Keep => {
                for row in &marked {
                    self.host.clear_highlight(*row)?;
                }
                0
            }
            DuplicateDecision::Delete => {
                let mut doomed = BTreeSet::new();
                for group in &report.groups {
                    if let Some((survivor, rest)) = group.rows.split_first() {
                        self.host.clear_highlight(*survivor)?;
                        doomed.extend(rest.iter().copied());
                    }
                }
                for row in doomed.iter().rev() {
                    self.host.delete_row(*row)?;
                }
                info!("deleted {} duplicate row(s)", doomed.len());
                doomed.len()
            }
        };
        self.host.flush()?;
        Ok((decision, removed))
    }
}
