//! End-to-end reconciliation scenarios against a real store directory.
//!
//! Each test drives `lintodo_core::run` over a temp directory the way the CLI
//! does: an analyzer report in, projected reports and store changes out.

use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use lintodo_core::cleanup::INVALID_TODO_RULE;
use lintodo_core::decay::EnvOverrides;
use lintodo_core::error::ErrorCode;
use lintodo_core::model::{FileReport, Range, Severity, Violation, sum_counts};
use lintodo_core::report::{FormatOptions, Formatter, TextFormatter};
use lintodo_core::store::TodoStore;
use lintodo_core::{RunError, RunOptions, run};
use tempfile::TempDir;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).single().expect("valid date")
}

fn options(dir: &Path) -> RunOptions {
    let mut options = RunOptions::new("eslint", dir);
    options.now = now();
    options
}

fn update_options(dir: &Path) -> RunOptions {
    RunOptions {
        update: true,
        ..options(dir)
    }
}

/// A file where `no-var` fires once per `var` line.
fn source_report(dir: &Path, source: &str) -> FileReport {
    let messages = source
        .lines()
        .enumerate()
        .filter(|(_, text)| text.starts_with("var "))
        .map(|(i, text)| {
            let line = u32::try_from(i).expect("small file") + 1;
            let end = u32::try_from(text.chars().count()).expect("short line") + 1;
            let mut violation = Violation::error("no-var", Range::new(line, 1, line, end), "");
            violation.source = None;
            violation.message = "Unexpected var, use let or const instead.".to_string();
            violation
        })
        .collect();
    FileReport::new(dir.join("src/app.js").to_string_lossy(), messages).with_source(source)
}

fn write_rc(dir: &Path, body: &str) {
    fs::write(dir.join(".lint-todorc.toml"), body).expect("write rc");
}

#[test]
fn second_update_run_is_a_no_op() {
    let dir = TempDir::new().expect("temp dir");
    let source = "var a = 1;\nvar b = 2;\nlet c = 3;\n";

    let first = run(vec![source_report(dir.path(), source)], &update_options(dir.path()))
        .expect("first run");
    let info = first.todo_info.expect("update mode reports todo info");
    assert_eq!(info.added, 2);
    assert_eq!(sum_counts(&first.reports).todo_count, 2);
    assert!(!first.has_errors());

    let store = TodoStore::new(dir.path());
    let before = fs::read_to_string(store.path()).expect("read store");

    let second = run(vec![source_report(dir.path(), source)], &update_options(dir.path()))
        .expect("second run");
    let info = second.todo_info.expect("todo info");
    assert_eq!((info.added, info.removed, info.relocated), (0, 0, 0));
    assert_eq!(fs::read_to_string(store.path()).expect("read store"), before);
}

#[test]
fn backdated_todos_decay_to_warnings() {
    let dir = TempDir::new().expect("temp dir");
    write_rc(dir.path(), "[daysToDecay]\nwarn = 5\nerror = 10\n");
    let source = "var a = 1;\n".repeat(7);

    let create = RunOptions {
        created_at: Some(now() - TimeDelta::days(7)),
        ..update_options(dir.path())
    };
    run(vec![source_report(dir.path(), &source)], &create).expect("create todos");
    assert_eq!(TodoStore::new(dir.path()).read().expect("read").len(), 7);

    let outcome = run(vec![source_report(dir.path(), &source)], &options(dir.path()))
        .expect("check run");
    let counts = sum_counts(&outcome.reports);
    assert_eq!(counts.error_count, 0);
    assert_eq!(counts.warning_count, 7);

    let text = TextFormatter.format(&outcome, &FormatOptions::default());
    assert!(text.contains("7 problems (0 errors, 7 warnings)"), "{text}");
}

#[test]
fn decay_follows_config_changes() {
    let dir = TempDir::new().expect("temp dir");
    let source = "var a = 1;\n";
    run(vec![source_report(dir.path(), source)], &update_options(dir.path())).expect("create");

    let later = RunOptions {
        now: now() + TimeDelta::days(3),
        ..options(dir.path())
    };
    let outcome = run(vec![source_report(dir.path(), source)], &later).expect("check");
    assert_eq!(sum_counts(&outcome.reports).todo_count, 1);

    write_rc(dir.path(), "[daysToDecay]\nerror = 2\n");
    let outcome = run(vec![source_report(dir.path(), source)], &later).expect("check");
    assert_eq!(sum_counts(&outcome.reports).error_count, 1);
}

#[test]
fn clean_mode_purges_fixed_todo() {
    let dir = TempDir::new().expect("temp dir");
    let store = TodoStore::new(dir.path());
    run(
        vec![source_report(dir.path(), "var a = 1;\nvar b = 2;\n")],
        &update_options(dir.path()),
    )
    .expect("create");
    assert_eq!(store.line_count().expect("count"), 2);

    let clean = RunOptions {
        clean: true,
        ..options(dir.path())
    };
    let fixed = source_report(dir.path(), "var a = 1;\nlet b = 2;\n");
    let outcome = run(vec![fixed], &clean).expect("clean run");
    assert_eq!(outcome.invalid_todos, 0);
    assert_eq!(store.line_count().expect("count"), 3);

    let compacted = store.compact().expect("compact");
    assert_eq!(compacted.compacted, 1);
    assert_eq!(store.line_count().expect("count"), 1);
    assert_eq!(store.read().expect("read").len(), 1);
}

#[test]
fn ci_reports_fixed_todo_instead_of_purging() {
    let dir = TempDir::new().expect("temp dir");
    run(vec![source_report(dir.path(), "var a = 1;\n")], &update_options(dir.path()))
        .expect("create");

    let ci = RunOptions {
        clean: true,
        ci: true,
        ..options(dir.path())
    };
    let outcome = run(vec![source_report(dir.path(), "let a = 1;\n")], &ci).expect("ci run");
    assert_eq!(outcome.invalid_todos, 1);
    assert!(outcome.has_errors());

    let injected = &outcome.reports[0].messages[0];
    assert_eq!(injected.rule(), INVALID_TODO_RULE);
    assert_eq!(injected.severity, Severity::Error);
    assert!(injected.message.contains("`no-var`"));
    assert_eq!(TodoStore::new(dir.path()).read().expect("read").len(), 1);
}

#[test]
fn inserted_lines_do_not_break_suppression() {
    let dir = TempDir::new().expect("temp dir");
    run(
        vec![source_report(dir.path(), "var a = 1;\n")],
        &update_options(dir.path()),
    )
    .expect("create");

    let shifted = "// header\n// more header\nvar a = 1;\n";
    let outcome = run(vec![source_report(dir.path(), shifted)], &options(dir.path()))
        .expect("check");
    assert_eq!(sum_counts(&outcome.reports).todo_count, 1);
    assert_eq!(outcome.invalid_todos, 0);

    // Updating rewrites the todo at its new position.
    let outcome = run(vec![source_report(dir.path(), shifted)], &update_options(dir.path()))
        .expect("update");
    let info = outcome.todo_info.expect("todo info");
    assert_eq!((info.added, info.relocated), (0, 1));
    let live = TodoStore::new(dir.path()).read().expect("read");
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].range.start.line, 3);
}

#[test]
fn duplicate_violations_expire_one_at_a_time() {
    let dir = TempDir::new().expect("temp dir");
    let twice = "var a = 1;\nvar a = 1;\n";
    run(vec![source_report(dir.path(), twice)], &update_options(dir.path())).expect("create");
    let store = TodoStore::new(dir.path());
    assert_eq!(store.read().expect("read").len(), 2);

    let once = "var a = 1;\n";
    let outcome = run(vec![source_report(dir.path(), once)], &options(dir.path())).expect("check");
    assert_eq!(outcome.invalid_todos, 1);
    assert_eq!(sum_counts(&outcome.reports).todo_count, 1);
}

#[test]
fn new_violations_fail_without_update() {
    let dir = TempDir::new().expect("temp dir");
    run(vec![source_report(dir.path(), "var a = 1;\n")], &update_options(dir.path()))
        .expect("create");

    let outcome = run(
        vec![source_report(dir.path(), "var a = 1;\nvar z = 9;\n")],
        &options(dir.path()),
    )
    .expect("check");
    let counts = sum_counts(&outcome.reports);
    assert_eq!(counts.todo_count, 1);
    assert_eq!(counts.error_count, 1);
    assert_eq!(TodoStore::new(dir.path()).read().expect("read").len(), 1);
}

#[test]
fn override_without_update_fails_before_writing() {
    let dir = TempDir::new().expect("temp dir");
    let misuse = RunOptions {
        decay_overrides: EnvOverrides {
            warn: Some(1),
            error: None,
        },
        ..options(dir.path())
    };
    let err = run(vec![source_report(dir.path(), "var a = 1;\n")], &misuse)
        .expect_err("override without update");
    assert!(matches!(err, RunError::Decay(_)));
    assert_eq!(err.code(), ErrorCode::MisusedDecayOverride);
    assert!(!TodoStore::new(dir.path()).exists());
}

#[test]
fn invalid_config_fails_before_writing() {
    let dir = TempDir::new().expect("temp dir");
    write_rc(dir.path(), "[daysToDecay]\nwarn = 10\nerror = 5\n");
    let err = run(
        vec![source_report(dir.path(), "var a = 1;\n")],
        &update_options(dir.path()),
    )
    .expect_err("inverted config");
    assert_eq!(err.code(), ErrorCode::InvalidDecayConfig);
    assert!(!TodoStore::new(dir.path()).exists());
}

#[test]
fn conflicting_sources_fail_before_writing() {
    let dir = TempDir::new().expect("temp dir");
    write_rc(dir.path(), "[daysToDecay]\nwarn = 1\n");
    fs::write(
        dir.path().join("package.json"),
        r#"{"name":"app","lintTodo":{"daysToDecay":{"warn":2}}}"#,
    )
    .expect("write package.json");

    let err = run(
        vec![source_report(dir.path(), "var a = 1;\n")],
        &update_options(dir.path()),
    )
    .expect_err("two config sources");
    assert_eq!(err.code(), ErrorCode::ConflictingConfigSources);
    assert!(!TodoStore::new(dir.path()).exists());
}

#[test]
fn engines_share_a_store_without_interfering() {
    let dir = TempDir::new().expect("temp dir");
    let source = "var a = 1;\n";
    run(vec![source_report(dir.path(), source)], &update_options(dir.path())).expect("eslint");

    let other = RunOptions {
        engine: "ember-template-lint".to_string(),
        clean: true,
        ..options(dir.path())
    };
    let outcome = run(vec![], &other).expect("other engine");
    assert_eq!(outcome.invalid_todos, 0);
    assert_eq!(TodoStore::new(dir.path()).read().expect("read").len(), 1);
}

#[test]
fn compact_option_runs_after_the_batch() {
    let dir = TempDir::new().expect("temp dir");
    run(
        vec![source_report(dir.path(), "var a = 1;\nvar b = 2;\n")],
        &update_options(dir.path()),
    )
    .expect("create");

    let fix_and_compact = RunOptions {
        fix: true,
        compact: true,
        ..options(dir.path())
    };
    let outcome = run(vec![source_report(dir.path(), "var a = 1;\n")], &fix_and_compact)
        .expect("fix run");
    assert_eq!(outcome.compacted, Some(1));
    assert_eq!(TodoStore::new(dir.path()).line_count().expect("count"), 1);
}
