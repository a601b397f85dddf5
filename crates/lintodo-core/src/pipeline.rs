//! One reconciliation run, end to end.
//!
//! ```text
//! config + overrides ──► ResolvedDecay
//! store.read() ─┐
//! reports ──────┴──► reconcile ──► one append_batch ──► project ──► cleanup ──► [compact]
//! ```
//!
//! Every configuration error surfaces before the store is written. All adds
//! and removes of a run go out in a single batch.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cleanup::{self, CleanupMode};
use crate::config::{self, ConfigError};
use crate::decay::{self, DaysToDecay, DecayError, EnvOverrides};
use crate::error::ErrorCode;
use crate::model::FileReport;
use crate::project;
use crate::reconcile::{self, ReconcileContext};
use crate::store::{CompactResult, StoreError, TodoStore};
use crate::todo::TodoRecord;

/// Everything a run needs besides the reports themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Analyzer name recorded on every todo (e.g. `eslint`).
    pub engine: String,
    /// Directory holding `.lint-todo` and the config sources.
    pub base_dir: PathBuf,
    /// Create todos for new violations and rewrite relocated ones.
    pub update: bool,
    /// Show todo-level violations in rendered output.
    pub include_todo: bool,
    pub fix: bool,
    pub clean: bool,
    /// Running unattended; disables clean-mode purging.
    pub ci: bool,
    /// Compact the store after writing.
    pub compact: bool,
    /// Current time for decay evaluation.
    pub now: DateTime<Utc>,
    /// Creation date for new todos; defaults to `now`.
    pub created_at: Option<DateTime<Utc>>,
    pub decay_overrides: EnvOverrides,
}

impl RunOptions {
    #[must_use]
    pub fn new(engine: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine: engine.into(),
            base_dir: base_dir.into(),
            update: false,
            include_todo: false,
            fix: false,
            clean: false,
            ci: false,
            compact: false,
            now: Utc::now(),
            created_at: None,
            decay_overrides: EnvOverrides::default(),
        }
    }

    #[must_use]
    pub const fn cleanup_mode(&self) -> CleanupMode {
        CleanupMode::choose(self.update, self.fix, self.clean, self.ci)
    }
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Decay(#[from] DecayError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RunError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Decay(err) => err.code(),
            Self::Config(err) => err.code(),
            Self::Store(err) => err.code(),
        }
    }
}

/// Store changes made by an update-mode run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodoInfo {
    pub added: usize,
    pub removed: usize,
    /// Todos rewritten at new coordinates.
    pub relocated: usize,
    /// Global decay schedule in force.
    pub decay: DaysToDecay,
}

/// Result of [`run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub reports: Vec<FileReport>,
    /// Present in update mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo_info: Option<TodoInfo>,
    /// Invalid-todo violations injected in report mode.
    pub invalid_todos: usize,
    /// Present when compaction ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compacted: Option<usize>,
}

impl RunOutcome {
    /// True when any error-severity violation remains.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(|report| report.counts.error_count > 0)
    }
}

/// Reconcile `reports` against the store under `options.base_dir`.
///
/// Input counts are recomputed from the messages before anything else.
///
/// # Errors
///
/// Config and decay errors before any write; store errors from reading,
/// appending or compacting.
pub fn run(mut reports: Vec<FileReport>, options: &RunOptions) -> Result<RunOutcome, RunError> {
    let config = config::load_todo_config(&options.base_dir)?;
    let decay = decay::resolve_for_engine(
        config.as_ref(),
        &options.engine,
        options.decay_overrides,
        options.update,
    )?;

    for report in &mut reports {
        report.recount();
    }

    let store = TodoStore::new(&options.base_dir);
    let stored = store.read()?;

    let ctx = ReconcileContext {
        engine: &options.engine,
        base_dir: &options.base_dir,
        decay: &decay,
        created: options.created_at.unwrap_or(options.now),
    };
    let reconciliation = reconcile::reconcile(&reports, &stored, &ctx);
    let stale = reconciliation.stale();
    let mode = options.cleanup_mode();

    tracing::debug!(
        engine = %options.engine,
        new = reconciliation.to_add.len(),
        stable = reconciliation.stable.len(),
        expired = reconciliation.expired.len(),
        invalid = reconciliation.to_remove.len(),
        ?mode,
        "reconciled"
    );

    let mut adds: Vec<TodoRecord> = Vec::new();
    let mut removes: Vec<TodoRecord> = Vec::new();
    let mut relocated = 0;

    if options.update {
        adds.extend(reconciliation.to_add.iter().map(|c| c.record.clone()));
        for todo in reconciliation.relocations() {
            removes.push(todo.record.clone());
            adds.push(todo.relocated_record());
            relocated += 1;
        }
    }
    let added = if options.update {
        reconciliation.to_add.len()
    } else {
        0
    };

    let purged = if mode == CleanupMode::Purge {
        removes.extend(stale.iter().cloned());
        stale.len()
    } else {
        0
    };

    store.append_batch(&adds, &removes)?;

    let mut suppressed: Vec<_> = reconciliation
        .stable
        .iter()
        .map(|todo| (todo.at, &todo.record))
        .collect();
    if options.update {
        suppressed.extend(reconciliation.to_add.iter().map(|c| (c.at, &c.record)));
    }
    let projected = project::project(&reports, suppressed, &decay, options.now);

    let (reports, invalid_todos) = match mode {
        CleanupMode::Purge => (projected, 0),
        CleanupMode::Report => (
            cleanup::inject_invalid_todos(projected, &stale, &options.base_dir),
            stale.len(),
        ),
    };

    let compacted = if options.compact {
        let CompactResult { compacted, .. } = store.compact()?;
        Some(compacted)
    } else {
        None
    };

    let todo_info = options.update.then_some(TodoInfo {
        added,
        removed: purged,
        relocated,
        decay: decay.global,
    });

    Ok(RunOutcome {
        reports,
        todo_info,
        invalid_todos,
        compacted,
    })
}
