//! `lintodo check`: reconcile analyzer results against the todo store.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use lintodo_core::model::FileReport;
use lintodo_core::report::{FormatOptions, Formatter, TextFormatter};
use lintodo_core::{RunOptions, run};

use crate::env_opts::{self, EnvSwitches};
use crate::output::{CliError, OutputMode, render, render_error};

/// Arguments for `lintodo check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Analyzer results (JSON array of file reports). Reads stdin when
    /// omitted or `-`.
    pub input: Option<PathBuf>,

    /// Analyzer that produced the results.
    #[arg(long, default_value = "eslint")]
    pub engine: String,

    /// Create todos for new errors and rewrite moved ones (`UPDATE_TODO`).
    #[arg(long)]
    pub update: bool,

    /// Show todo-level violations (`INCLUDE_TODO`).
    #[arg(long)]
    pub include_todo: bool,

    /// Remove stale todos from the store.
    #[arg(long)]
    pub fix: bool,

    /// Remove stale todos unless running in CI (`CLEAN_TODO`).
    #[arg(long)]
    pub clean: bool,

    /// Compact the store after writing (`COMPACT_TODO`).
    #[arg(long)]
    pub compact: bool,

    /// Treat the run as unattended (`CI`).
    #[arg(long)]
    pub ci: bool,

    /// Evaluate decay as of this date (YYYY-MM-DD or RFC 3339).
    #[arg(long, hide = true, value_name = "DATE")]
    pub now: Option<String>,
}

impl CheckArgs {
    /// Layer the flags over the environment switches.
    pub fn run_options(&self, base_dir: &Path, env: &EnvSwitches) -> Result<RunOptions> {
        let now = match &self.now {
            Some(raw) => env_opts::parse_created_date(raw).context("invalid --now")?,
            None => Utc::now(),
        };
        Ok(RunOptions {
            update: self.update || env.update,
            include_todo: self.include_todo || env.include_todo,
            fix: self.fix,
            clean: self.clean || env.clean,
            ci: self.ci || env.ci,
            compact: self.compact || env.compact,
            now,
            created_at: env.created_at,
            decay_overrides: env.overrides,
            ..RunOptions::new(self.engine.clone(), base_dir)
        })
    }
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("read analyzer results from {}", path.display())),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("read analyzer results from stdin")?;
            Ok(buf)
        }
    }
}

/// Load file sources for reports that arrived without one, so snippets can
/// be sliced for violations lacking `source`.
fn attach_sources(reports: &mut [FileReport], base_dir: &Path) {
    for report in reports.iter_mut().filter(|r| r.source.is_none()) {
        let needs_source = report.messages.iter().any(|m| m.source.is_none());
        if !needs_source {
            continue;
        }
        let path = base_dir.join(&report.file_path);
        match fs::read_to_string(&path) {
            Ok(text) => report.source = Some(text),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "no source for snippets");
            }
        }
    }
}

/// Execute `lintodo check`.
pub fn run_check(args: &CheckArgs, output: OutputMode, base_dir: &Path) -> Result<ExitCode> {
    let env = env_opts::from_env()?;
    let options = args.run_options(base_dir, &env)?;

    let raw = read_input(args.input.as_deref())?;
    let mut reports: Vec<FileReport> = match serde_json::from_str(&raw) {
        Ok(reports) => reports,
        Err(err) => {
            render_error(
                output,
                &CliError::with_details(
                    format!("analyzer results are not valid JSON: {err}"),
                    "pass the analyzer's JSON output (an array of file reports)",
                    "invalid_input",
                ),
            )?;
            anyhow::bail!("invalid analyzer results");
        }
    };
    attach_sources(&mut reports, base_dir);

    let outcome = match run(reports, &options) {
        Ok(outcome) => outcome,
        Err(err) => {
            render_error(output, &CliError::from_code(err.to_string(), err.code()))?;
            return Err(err).context("todo reconciliation failed");
        }
    };

    tracing::info!(
        engine = %options.engine,
        files = outcome.reports.len(),
        invalid_todos = outcome.invalid_todos,
        "check finished"
    );

    let format_options = FormatOptions {
        include_todo: options.include_todo,
        update_todo: options.update,
    };
    render(output, &outcome, |outcome| {
        TextFormatter.format(outcome, &format_options)
    })?;

    Ok(if outcome.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
