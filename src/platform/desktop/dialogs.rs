use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

use crate::usecase::ports::prompt::{DuplicateDecision, DuplicatePrompt, DuplicateReport, Notifier};

/// Native message boxes for user messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DialogNotifier;

impl Notifier for DialogNotifier {
    fn info(&self, message: &str) {
        MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title("PM Fusion")
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    fn error(&self, message: &str) {
        MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title("PM Fusion")
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }
}

/// Asks whether highlighted duplicates should be deleted. Closing the box
/// keeps them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DialogDuplicatePrompt;

impl DuplicatePrompt for DialogDuplicatePrompt {
    fn decide(&self, report: &DuplicateReport) -> DuplicateDecision {
        let mut description = report.summary();
        for group in report.groups.iter().take(10) {
            let rows: Vec<String> = group.rows.iter().map(usize::to_string).collect();
            description.push_str(&format!("\n{}: rows {}", group.key, rows.join(", ")));
        }
        description.push_str("\n\nDelete all but the first row of every group?");

        let answer = MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title("Duplicates found")
            .set_description(description)
            .set_buttons(MessageButtons::YesNo)
            .show();
        if answer == MessageDialogResult::Yes {
            DuplicateDecision::Delete
        } else {
            DuplicateDecision::Keep
        }
    }
}
