//! Time-based severity projection for suppressed violations.
//!
//! A suppressed violation is shown as `todo` until its warn date passes,
//! then as `warn`, and as `error` once its error date passes. The level is
//! derived every run, never stored.

use chrono::{DateTime, Utc};

use crate::decay::{DecayDates, ResolvedDecay};
use crate::model::{FileReport, Severity};
use crate::reconcile::ViolationRef;
use crate::todo::TodoRecord;

/// Effective severity of a todo with `dates` at time `now`.
///
/// Both comparisons are strict: at exactly the warn date a todo is still
/// suppressed.
#[must_use]
pub fn decayed_severity(dates: &DecayDates, now: DateTime<Utc>) -> Severity {
    if dates.error.is_some_and(|error| now > error) {
        Severity::Error
    } else if dates.warn.is_some_and(|warn| now > warn) {
        Severity::Warn
    } else {
        Severity::Todo
    }
}

/// Decay dates to apply to `record` this run.
///
/// With a configured policy the dates are recomputed from the record's
/// creation date, so config changes apply to existing todos. Without one the
/// dates written into the store are used.
#[must_use]
pub fn effective_dates(record: &TodoRecord, decay: &ResolvedDecay) -> DecayDates {
    if decay.is_configured() {
        decay.for_rule(&record.rule_id).dates_from(record.created)
    } else {
        record.decay
    }
}

/// Apply decayed severities to the suppressed violations, returning new
/// reports. Each violation only changes bucket; per-file totals are kept.
///
/// References that point outside `reports` are ignored.
#[must_use]
pub fn project<'a>(
    reports: &[FileReport],
    suppressed: impl IntoIterator<Item = (ViolationRef, &'a TodoRecord)>,
    decay: &ResolvedDecay,
    now: DateTime<Utc>,
) -> Vec<FileReport> {
    let mut out = reports.to_vec();

    for (at, record) in suppressed {
        let Some(report) = out.get_mut(at.file_index) else {
            continue;
        };
        let Some(violation) = report.messages.get_mut(at.violation_index) else {
            continue;
        };

        let to = decayed_severity(&effective_dates(record, decay), now);
        let from = violation.severity;
        if from == to {
            continue;
        }

        tracing::debug!(
            file = %report.file_path,
            rule = violation.rule(),
            from = from.label(),
            to = to.label(),
            "projected todo severity"
        );
        report.counts.shift(from, to, violation.is_fixable());
        violation.severity = to;
    }

    out
}
