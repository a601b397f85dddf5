//! Diff the current violations against the stored todos.
//!
//! Every error-severity violation becomes a candidate [`TodoRecord`]. Each
//! candidate is paired with at most one stored record of the same engine,
//! first by exact `TodoKey` and then, for candidates left over, by
//! `FuzzyKey` (same rule, file and snippet, any position). Each stored record
//! is consumed at most once and candidates are served in input order, so two
//! identical violations pair with two identical records and nothing is shared.
//!
//! The exact pass runs over all candidates before any fuzzy pairing, rather
//! than trying exact then fuzzy for each candidate in turn. An earlier
//! candidate that merely moved therefore cannot take the record a later
//! candidate matches exactly.
//!
//! | outcome     | meaning                                                      |
//! |-------------|--------------------------------------------------------------|
//! | `to_add`    | candidate with no stored record                              |
//! | `stable`    | candidate paired with a valid stored record                  |
//! | `to_remove` | stored record paired with a candidate but no longer valid    |
//! | `expired`   | same-engine stored record whose violation is gone            |
//!
//! Records belonging to other engines never appear in any outcome.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::decay::ResolvedDecay;
use crate::fingerprint::snippet_for;
use crate::model::{FileReport, Severity};
use crate::todo::{relative_path, TodoRecord};

/// Position of a violation inside the run's reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViolationRef {
    pub file_index: usize,
    pub violation_index: usize,
}

/// A todo record built from a current violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub record: TodoRecord,
    pub at: ViolationRef,
}

/// A stored record still backed by a current violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableTodo {
    /// The record as stored.
    pub record: TodoRecord,
    /// The record the current violation would produce.
    pub candidate: TodoRecord,
    pub at: ViolationRef,
    /// Paired by fuzzy key: the violation moved since the record was written.
    pub relocated: bool,
}

impl StableTodo {
    /// The stored record moved onto the candidate's coordinates.
    #[must_use]
    pub fn relocated_record(&self) -> TodoRecord {
        self.record.relocated_to(&self.candidate)
    }
}

/// The four-way split produced by [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub to_add: Vec<Candidate>,
    pub stable: Vec<StableTodo>,
    pub to_remove: Vec<TodoRecord>,
    pub expired: Vec<TodoRecord>,
}

impl Reconciliation {
    /// Stored records that no longer suppress anything: expired ones first,
    /// then invalid ones.
    #[must_use]
    pub fn stale(&self) -> Vec<TodoRecord> {
        self.expired.iter().chain(&self.to_remove).cloned().collect()
    }

    /// Stable todos paired by fuzzy key.
    pub fn relocations(&self) -> impl Iterator<Item = &StableTodo> {
        self.stable.iter().filter(|todo| todo.relocated)
    }
}

/// Inputs shared by every candidate of one run.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileContext<'a> {
    pub engine: &'a str,
    pub base_dir: &'a Path,
    pub decay: &'a ResolvedDecay,
    /// Creation date given to new candidates.
    pub created: DateTime<Utc>,
}

/// Build candidate records for every error-severity violation, in report
/// order. Messages without a rule id (fatal parse errors) are never
/// candidates.
#[must_use]
pub fn candidates(reports: &[FileReport], ctx: &ReconcileContext<'_>) -> Vec<Candidate> {
    let mut out = Vec::new();
    for (file_index, report) in reports.iter().enumerate() {
        let file_path = relative_path(ctx.base_dir, &report.file_path);
        for (violation_index, violation) in report.messages.iter().enumerate() {
            if violation.severity != Severity::Error {
                continue;
            }
            let snippet = snippet_for(report, violation);
            let Some(record) = TodoRecord::from_violation(
                ctx.engine,
                &file_path,
                violation,
                &snippet,
                ctx.created,
                ctx.decay.for_rule(violation.rule()),
            ) else {
                tracing::debug!(file = %report.file_path, line = violation.line, "rule-less error left as is");
                continue;
            };
            out.push(Candidate {
                record,
                at: ViolationRef {
                    file_index,
                    violation_index,
                },
            });
        }
    }
    out
}

/// Index of stored records by some key, handing each record out once.
struct Pool<K> {
    queues: HashMap<K, VecDeque<usize>>,
}

impl<K: Hash + Eq> Pool<K> {
    fn new(entries: impl Iterator<Item = (K, usize)>) -> Self {
        let mut queues: HashMap<K, VecDeque<usize>> = HashMap::new();
        for (key, index) in entries {
            queues.entry(key).or_default().push_back(index);
        }
        Self { queues }
    }

    /// First unconsumed record under `key`, marking it consumed.
    fn take(&mut self, key: &K, consumed: &mut [bool]) -> Option<usize> {
        let queue = self.queues.get_mut(key)?;
        while let Some(index) = queue.pop_front() {
            if !consumed[index] {
                consumed[index] = true;
                return Some(index);
            }
        }
        None
    }
}

/// Classify current violations against `stored`.
#[must_use]
pub fn reconcile(
    reports: &[FileReport],
    stored: &[TodoRecord],
    ctx: &ReconcileContext<'_>,
) -> Reconciliation {
    let candidates = candidates(reports, ctx);
    let engine = ctx.engine;
    let same_engine = move || {
        stored
            .iter()
            .enumerate()
            .filter(move |(_, record)| record.engine == engine)
    };

    let mut exact = Pool::new(same_engine().map(|(i, record)| (record.key(), i)));
    let mut fuzzy = Pool::new(
        same_engine().filter_map(|(i, record)| record.fuzzy_key().map(|key| (key, i))),
    );
    let mut consumed = vec![false; stored.len()];

    // (stored index, relocated) per candidate
    let mut pairing: Vec<Option<(usize, bool)>> = candidates
        .iter()
        .map(|c| exact.take(&c.record.key(), &mut consumed).map(|i| (i, false)))
        .collect();

    for (candidate, slot) in candidates.iter().zip(pairing.iter_mut()) {
        if slot.is_some() {
            continue;
        }
        if let Some(key) = candidate.record.fuzzy_key() {
            *slot = fuzzy.take(&key, &mut consumed).map(|i| (i, true));
        }
    }

    let mut out = Reconciliation::default();
    for (candidate, slot) in candidates.into_iter().zip(pairing) {
        let Some((index, relocated)) = slot else {
            tracing::debug!(
                file = %candidate.record.file_path,
                rule = %candidate.record.rule_id,
                line = candidate.record.range.start.line,
                "new violation"
            );
            out.to_add.push(candidate);
            continue;
        };

        let record = stored[index].clone();
        if record.decay.is_inverted() {
            tracing::debug!(
                file = %record.file_path,
                rule = %record.rule_id,
                "stored todo has an invalid decay schedule"
            );
            out.to_remove.push(record);
            out.to_add.push(candidate);
            continue;
        }

        tracing::debug!(
            file = %record.file_path,
            rule = %record.rule_id,
            relocated,
            "violation matches stored todo"
        );
        out.stable.push(StableTodo {
            record,
            candidate: candidate.record,
            at: candidate.at,
            relocated,
        });
    }

    for (index, record) in same_engine() {
        if !consumed[index] {
            tracing::debug!(
                file = %record.file_path,
                rule = %record.rule_id,
                "stored todo no longer matches a violation"
            );
            out.expired.push(record.clone());
        }
    }

    out
}
