//! What to do with stored todos that no longer suppress anything.
//!
//! Interactive runs (`--fix`, update mode, or clean mode outside CI) purge them
//! from the store. Everywhere else each one is surfaced as an error-severity
//! "invalid todo" violation so that stale suppressions fail the build instead
//! of piling up unnoticed.

use std::path::Path;

use crate::model::{FileReport, Severity, Violation};
use crate::todo::{relative_path, TodoRecord};

/// Rule id carried by injected invalid-todo violations.
pub const INVALID_TODO_RULE: &str = "invalid-todo-violation-rule";

/// How stale todos are handled in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    /// Append `remove` lines for them.
    Purge,
    /// Report each as an invalid-todo violation and leave the store alone.
    Report,
}

impl CleanupMode {
    /// Purge when updating, fixing, or cleaning outside CI.
    #[must_use]
    pub const fn choose(update: bool, fix: bool, clean: bool, ci: bool) -> Self {
        if update || fix || (clean && !ci) {
            Self::Purge
        } else {
            Self::Report
        }
    }
}

/// The violation reported for a stale todo.
#[must_use]
pub fn invalid_todo_violation(record: &TodoRecord) -> Violation {
    Violation {
        rule_id: Some(INVALID_TODO_RULE.to_string()),
        message: format!(
            "Todo violation passes `{}` rule. Please run `--fix` to remove this todo from the todo list.",
            record.rule_id
        ),
        severity: Severity::Error,
        line: 0,
        column: 0,
        end_line: None,
        end_column: None,
        fixable: false,
        fix: None,
        source: None,
    }
}

/// Append an invalid-todo violation for every record to the report of its
/// file, adding a report when the file has none.
#[must_use]
pub fn inject_invalid_todos(
    mut reports: Vec<FileReport>,
    stale: &[TodoRecord],
    base_dir: &Path,
) -> Vec<FileReport> {
    for record in stale {
        let violation = invalid_todo_violation(record);
        tracing::debug!(file = %record.file_path, rule = %record.rule_id, "reporting invalid todo");

        let existing = reports
            .iter_mut()
            .find(|report| relative_path(base_dir, &report.file_path) == record.file_path);
        match existing {
            Some(report) => {
                report.counts.add(violation.severity, violation.is_fixable());
                report.messages.push(violation);
            }
            None => reports.push(FileReport::new(record.file_path.clone(), vec![violation])),
        }
    }
    reports
}
