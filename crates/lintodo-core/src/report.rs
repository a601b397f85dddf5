//! Rendering run results for humans.
//!
//! Renderers are injected through the [`Formatter`] trait; [`TextFormatter`]
//! is the stock stylish-table rendering.

use std::fmt::Write as _;

use crate::model::{FileReport, Severity, SeverityCounts, Violation, sum_counts};
use crate::pipeline::{RunOutcome, TodoInfo};

/// Knobs shared by all formatters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Show todo-level violations and count them in the summary.
    pub include_todo: bool,
    /// Append the todo summary line (update mode).
    pub update_todo: bool,
}

/// A renderer for run results.
pub trait Formatter {
    fn format(&self, outcome: &RunOutcome, options: &FormatOptions) -> String;
}

/// Plain-text table output with problem and todo summaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, outcome: &RunOutcome, options: &FormatOptions) -> String {
        let counts = sum_counts(&outcome.reports);
        let todo_info = outcome.todo_info.filter(|_| options.update_todo);

        let has_problems = counts.problems() > 0;
        let has_todos = options.include_todo && counts.todo_count > 0;
        if !has_problems && !has_todos && todo_info.is_none() {
            return String::new();
        }

        let mut out = String::from("\n");
        for report in &outcome.reports {
            write_report(&mut out, report, options);
        }
        write_summary(&mut out, &counts, options);
        if let Some(info) = todo_info {
            out.push_str(&todo_summary(&info));
            out.push('\n');
        }
        out
    }
}

fn visible(violation: &Violation, options: &FormatOptions) -> bool {
    violation.severity != Severity::Off
        && (violation.severity != Severity::Todo || options.include_todo)
}

fn write_report(out: &mut String, report: &FileReport, options: &FormatOptions) {
    let rows: Vec<[String; 4]> = report
        .messages
        .iter()
        .filter(|v| visible(v, options))
        .map(|v| {
            [
                format!("{}:{}", v.line, v.column),
                v.severity.label().to_string(),
                v.message.strip_suffix('.').unwrap_or(&v.message).to_string(),
                v.rule().to_string(),
            ]
        })
        .collect();
    if rows.is_empty() {
        return;
    }

    let width = |col: usize| rows.iter().map(|row| row[col].chars().count()).max().unwrap_or(0);
    let (pos_w, sev_w, msg_w) = (width(0), width(1), width(2));

    let _ = writeln!(out, "{}", report.file_path);
    for [pos, severity, message, rule] in &rows {
        let line = format!("  {pos:>pos_w$}  {severity:<sev_w$}  {message:<msg_w$}  {rule}");
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out.push('\n');
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

fn write_summary(out: &mut String, counts: &SeverityCounts, options: &FormatOptions) {
    let total = counts.problems();
    if total == 0 && !(options.include_todo && counts.todo_count > 0) {
        return;
    }

    let _ = write!(
        out,
        "\u{2716} {total} {} ({} {}, {} {}",
        pluralize("problem", total),
        counts.error_count,
        pluralize("error", counts.error_count),
        counts.warning_count,
        pluralize("warning", counts.warning_count),
    );
    if options.include_todo {
        let _ = write!(out, ", {} {}", counts.todo_count, pluralize("todo", counts.todo_count));
    }
    out.push_str(")\n");

    let fixable_todos = options.include_todo && counts.fixable_todo_count > 0;
    if counts.fixable_error_count > 0 || counts.fixable_warning_count > 0 || fixable_todos {
        let errors = counts.fixable_error_count;
        let warnings = counts.fixable_warning_count;
        let _ = if options.include_todo {
            let todos = counts.fixable_todo_count;
            write!(
                out,
                "  {errors} {}, {warnings} {}, and {todos} {}",
                pluralize("error", errors),
                pluralize("warning", warnings),
                pluralize("todo", todos),
            )
        } else {
            write!(
                out,
                "  {errors} {} and {warnings} {}",
                pluralize("error", errors),
                pluralize("warning", warnings),
            )
        };
        out.push_str(" potentially fixable with the `--fix` option.\n");
    }
    out.push('\n');
}

/// `✔ A todos created, R todos removed (warn after W, error after E days)`.
#[must_use]
pub fn todo_summary(info: &TodoInfo) -> String {
    let mut summary = format!(
        "\u{2714} {} todos created, {} todos removed",
        info.added, info.removed
    );

    let mut schedule = Vec::new();
    if let Some(warn) = info.decay.warn.filter(|days| *days > 0) {
        schedule.push(format!("warn after {warn}"));
    }
    if let Some(error) = info.decay.error.filter(|days| *days > 0) {
        schedule.push(format!("error after {error}"));
    }
    if !schedule.is_empty() {
        let _ = write!(summary, " ({} days)", schedule.join(", "));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decay::DaysToDecay;
    use crate::model::Range;

    fn outcome(messages: Vec<Violation>) -> RunOutcome {
        RunOutcome {
            reports: vec![FileReport::new("src/a.js", messages)],
            ..RunOutcome::default()
        }
    }

    fn with_severity(line: u32, severity: Severity) -> Violation {
        let mut v = Violation::error("no-var", Range::new(line, 5, line, 8), "var");
        v.message = "Unexpected var.".to_string();
        v.severity = severity;
        v
    }

    #[test]
    fn nothing_to_report_renders_empty() {
        let out = TextFormatter.format(&outcome(vec![]), &FormatOptions::default());
        assert!(out.is_empty());
    }

    #[test]
    fn todos_are_hidden_by_default() {
        let result = outcome(vec![with_severity(1, Severity::Todo)]);
        assert!(TextFormatter.format(&result, &FormatOptions::default()).is_empty());

        let shown = TextFormatter.format(
            &result,
            &FormatOptions {
                include_todo: true,
                ..FormatOptions::default()
            },
        );
        assert!(shown.contains("1:5  todo"));
        assert!(shown.contains("0 problems (0 errors, 0 warnings, 1 todo)"));
    }

    #[test]
    fn summary_pluralizes() {
        let warnings = (1..=7).map(|line| with_severity(line, Severity::Warn)).collect();
        let out = TextFormatter.format(&outcome(warnings), &FormatOptions::default());
        assert!(out.contains("\u{2716} 7 problems (0 errors, 7 warnings)"), "{out}");
        assert!(out.contains("src/a.js\n"));
        assert!(out.contains("Unexpected var  no-var"));

        let one = TextFormatter.format(&outcome(vec![with_severity(1, Severity::Error)]), &FormatOptions::default());
        assert!(one.contains("1 problem (1 error, 0 warnings)"), "{one}");
    }

    #[test]
    fn fixable_line() {
        let mut fixable = with_severity(1, Severity::Error);
        fixable.fixable = true;
        let out = TextFormatter.format(&outcome(vec![fixable]), &FormatOptions::default());
        assert!(out.contains("1 error and 0 warnings potentially fixable with the `--fix` option."));
    }

    #[test]
    fn todo_summary_lists_schedule() {
        let info = TodoInfo {
            added: 3,
            removed: 1,
            relocated: 0,
            decay: DaysToDecay::new(Some(5), Some(10)),
        };
        assert_eq!(
            todo_summary(&info),
            "\u{2714} 3 todos created, 1 todos removed (warn after 5, error after 10 days)"
        );

        let bare = TodoInfo {
            decay: DaysToDecay::default(),
            ..info
        };
        assert_eq!(todo_summary(&bare), "\u{2714} 3 todos created, 1 todos removed");
    }

    #[test]
    fn update_mode_always_prints_todo_summary() {
        let mut result = outcome(vec![with_severity(1, Severity::Todo)]);
        result.todo_info = Some(TodoInfo {
            added: 1,
            ..TodoInfo::default()
        });
        let out = TextFormatter.format(
            &result,
            &FormatOptions {
                update_todo: true,
                ..FormatOptions::default()
            },
        );
        assert!(out.contains("1 todos created, 0 todos removed"));
        assert!(!out.contains("problem"));
    }
}
