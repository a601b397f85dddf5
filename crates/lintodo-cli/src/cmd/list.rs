//! `lintodo list`: show the live todos in `.lint-todo`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;
use lintodo_core::config;
use lintodo_core::decay::{self, EnvOverrides, ResolvedDecay};
use lintodo_core::project::{decayed_severity, effective_dates};
use lintodo_core::store::TodoStore;
use lintodo_core::todo::TodoRecord;
use serde::Serialize;

use crate::output::{CliError, OutputMode, render, render_error};

/// Arguments for `lintodo list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list todos recorded by this engine.
    #[arg(long)]
    pub engine: Option<String>,

    /// Only list todos for this file (path relative to the base directory).
    #[arg(long)]
    pub file: Option<String>,
}

/// One row of `lintodo list` output.
#[derive(Debug, Serialize)]
pub struct TodoRow {
    pub engine: String,
    pub rule_id: String,
    pub file_path: String,
    pub line: u32,
    pub column: u32,
    pub fingerprint: String,
    pub created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warn_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_date: Option<String>,
    /// Level as of now, under the configured decay policy.
    pub severity: &'static str,
}

fn stamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl TodoRow {
    fn new(record: &TodoRecord, decay: &ResolvedDecay, now: DateTime<Utc>) -> Self {
        let dates = effective_dates(record, decay);
        Self {
            engine: record.engine.clone(),
            rule_id: record.rule_id.clone(),
            file_path: record.file_path.clone(),
            line: record.range.start.line,
            column: record.range.start.column,
            fingerprint: record.fingerprint.to_hex(),
            created: stamp(record.created),
            warn_date: dates.warn.map(stamp),
            error_date: dates.error.map(stamp),
            severity: decayed_severity(&dates, now).label(),
        }
    }
}

/// Execute `lintodo list`.
pub fn run_list(args: &ListArgs, output: OutputMode, base_dir: &Path) -> Result<()> {
    let todo_config = match config::load_todo_config(base_dir) {
        Ok(todo_config) => todo_config,
        Err(err) => {
            render_error(output, &CliError::from_code(err.to_string(), err.code()))?;
            return Err(err).context("load todo configuration");
        }
    };
    let store = TodoStore::new(base_dir);
    let records = store.read().context("read todo store")?;
    let now = Utc::now();

    let mut policies: HashMap<&str, ResolvedDecay> = HashMap::new();
    let mut rows = Vec::new();
    for record in records
        .iter()
        .filter(|r| args.engine.as_deref().is_none_or(|engine| r.engine == engine))
        .filter(|r| args.file.as_deref().is_none_or(|file| r.file_path == file))
    {
        let decay = match policies.entry(record.engine.as_str()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let resolved = decay::resolve_for_engine(
                    todo_config.as_ref(),
                    &record.engine,
                    EnvOverrides::default(),
                    false,
                );
                match resolved {
                    Ok(resolved) => entry.insert(resolved),
                    Err(err) => {
                        render_error(output, &CliError::from_code(err.to_string(), err.code()))?;
                        return Err(err).context("resolve decay policy");
                    }
                }
            }
        };
        rows.push(TodoRow::new(record, decay, now));
    }

    render(output, &rows, |rows| format_rows(rows))
}

fn format_rows(rows: &[TodoRow]) -> String {
    if rows.is_empty() {
        return "no todos\n".to_string();
    }
    let mut text = String::new();
    for row in rows {
        let _ = writeln!(
            text,
            "{}:{}:{}  {:<7}  {}  {}",
            row.file_path, row.line, row.column, row.severity, row.rule_id, row.engine
        );
    }
    let _ = writeln!(text, "{} todo(s)", rows.len());
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lintodo_core::decay::DaysToDecay;
    use lintodo_core::model::{Range, Violation};

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid date")
    }

    fn record() -> TodoRecord {
        let violation = Violation::error("no-var", Range::new(1, 1, 1, 4), "var");
        TodoRecord::from_violation("eslint", "a.js", &violation, "var", created(), DaysToDecay::default())
            .expect("rule id")
    }

    #[test]
    fn severity_follows_configured_decay() {
        let now = created() + chrono::TimeDelta::days(30);
        let stored = TodoRow::new(&record(), &ResolvedDecay::default(), now);
        assert_eq!(stored.severity, "todo");
        assert!(stored.error_date.is_none());

        let configured = ResolvedDecay {
            global: DaysToDecay::new(Some(5), Some(10)),
            ..ResolvedDecay::default()
        };
        let row = TodoRow::new(&record(), &configured, now);
        assert_eq!(row.severity, "error");
        assert_eq!(row.error_date.as_deref(), Some("2024-01-11T00:00:00Z"));
    }

    #[test]
    fn empty_listing_says_so() {
        assert_eq!(format_rows(&[]), "no todos\n");
    }
}
