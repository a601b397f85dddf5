//! Text or JSON output for `check`, `list` and `compact`.
//!
//! Results go to stdout and errors to stderr. The mode comes from `--format`,
//! then the hidden `--json` flag, then the `FORMAT` environment variable, and
//! defaults to text.

use clap::ValueEnum;
use lintodo_core::error::ErrorCode;
use serde::Serialize;
use std::io::{self, Write};

/// How command results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-readable report.
    #[default]
    Text,
    /// The serialized result, pretty-printed.
    Json,
}

impl OutputMode {
    /// Pick the mode from flags first, then the `FORMAT` value.
    pub fn resolve(format_flag: Option<Self>, json_flag: bool, format_env: Option<&str>) -> Self {
        if let Some(mode) = format_flag {
            return mode;
        }
        if json_flag {
            return Self::Json;
        }
        format_env
            .and_then(|val| Self::from_str(val.trim(), true).ok())
            .unwrap_or_default()
    }

    /// [`OutputMode::resolve`] against the process environment.
    pub fn from_cli(format_flag: Option<Self>, json_flag: bool) -> Self {
        let format_env = std::env::var("FORMAT").ok();
        Self::resolve(format_flag, json_flag, format_env.as_deref())
    }
}

/// A command failure, printed to stderr before the process exits non-zero.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// `E####` for engine errors, a short slug for CLI preconditions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
        }
    }

    /// Carry an engine error's code and hint.
    pub fn from_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

/// Write `value` as JSON, or the report `text` builds from it.
fn write_value<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text: impl FnOnce(&T) -> String,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => out.write_all(text(value).as_bytes())?,
    }
    Ok(())
}

fn write_error(mode: OutputMode, error: &CliError, out: &mut dyn Write) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *out, &serde_json::json!({ "error": error }))?;
            writeln!(out)?;
        }
        OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(suggestion) = &error.suggestion {
                writeln!(out, "  hint: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// Print a command result to stdout.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    write_value(mode, value, text, &mut io::stdout().lock())
}

/// Print a command failure to stderr.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    write_error(mode, error, &mut io::stderr().lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        live: usize,
    }

    #[test]
    fn flags_win_over_environment() {
        assert_eq!(
            OutputMode::resolve(Some(OutputMode::Text), true, Some("json")),
            OutputMode::Text
        );
        assert_eq!(OutputMode::resolve(None, true, Some("text")), OutputMode::Json);
    }

    #[test]
    fn environment_then_text_default() {
        assert_eq!(OutputMode::resolve(None, false, Some(" JSON ")), OutputMode::Json);
        assert_eq!(OutputMode::resolve(None, false, Some("bogus")), OutputMode::Text);
        assert_eq!(OutputMode::resolve(None, false, None), OutputMode::Text);
    }

    #[test]
    fn text_mode_writes_the_report() {
        let mut out = Vec::new();
        write_value(
            OutputMode::Text,
            &Sample { live: 2 },
            |s| format!("{} todo(s)\n", s.live),
            &mut out,
        )
        .expect("write");
        assert_eq!(String::from_utf8(out).expect("utf8"), "2 todo(s)\n");
    }

    #[test]
    fn json_mode_ignores_the_report() {
        let mut out = Vec::new();
        write_value(
            OutputMode::Json,
            &Sample { live: 2 },
            |_| unreachable!("text report built in JSON mode"),
            &mut out,
        )
        .expect("write");
        let json: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(json["live"], 2);
    }

    #[test]
    fn engine_error_carries_code_and_hint() {
        let err = CliError::from_code("bad config", ErrorCode::InvalidDecayConfig);
        let mut out = Vec::new();
        write_error(OutputMode::Text, &err, &mut out).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("error[E1001]: bad config\n"));
        assert!(text.contains("  hint: "));

        let mut out = Vec::new();
        write_error(OutputMode::Json, &err, &mut out).expect("write");
        let json: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(json["error"]["error_code"], "E1001");
    }
}
