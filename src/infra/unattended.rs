use log::{error, info};

use crate::usecase::ports::prompt::{
    DuplicateDecision, DuplicatePrompt, DuplicateReport, MappingAnswer, MappingPrompt,
    MappingRequest, Notifier,
};

/// Sends user messages to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }
}

/// Answers every mapping request with "no mapping", for runs without a user.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineMappings;

impl MappingPrompt for DeclineMappings {
    fn choose(&self, request: &MappingRequest) -> MappingAnswer {
        info!(
            "no user to map {} header(s), leaving them empty: {}",
            request.unresolved_headers.len(),
            request.unresolved_headers.join(", ")
        );
        MappingAnswer::new()
    }
}

/// Always gives the same answer to the duplicate prompt.
#[derive(Debug, Clone, Copy)]
pub struct FixedDuplicateDecision(pub DuplicateDecision);

impl Default for FixedDuplicateDecision {
    fn default() -> Self {
        Self(DuplicateDecision::Keep)
    }
}

impl DuplicatePrompt for FixedDuplicateDecision {
    fn decide(&self, report: &DuplicateReport) -> DuplicateDecision {
        info!("{} -> {:?}", report.summary(), self.0);
        self.0
    }
}
