//! Violation model shared by the reconciler, projector and formatters.
//!
//! The shapes here are the input/output boundary with the upstream analyzer:
//! a list of [`FileReport`]s, each holding the [`Violation`]s found in one
//! file plus running per-severity counts. Serialized field names follow the
//! camelCase convention analyzers emit (`filePath`, `ruleId`, `endLine`, ...).

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Effective severity of a violation.
///
/// Serialized as the integers analyzers use (`2` error, `1` warn, `0` off),
/// extended with `-1` for the fully suppressed todo level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Todo,
    Off,
    Warn,
    Error,
}

impl Severity {
    /// Integer representation used on the wire.
    #[must_use]
    pub const fn as_i8(self) -> i8 {
        match self {
            Self::Todo => -1,
            Self::Off => 0,
            Self::Warn => 1,
            Self::Error => 2,
        }
    }

    /// Parse the wire integer. Returns `None` for unknown values.
    #[must_use]
    pub const fn from_i8(raw: i8) -> Option<Self> {
        match raw {
            -1 => Some(Self::Todo),
            0 => Some(Self::Off),
            1 => Some(Self::Warn),
            2 => Some(Self::Error),
            _ => None,
        }
    }

    /// Lowercase label used by text formatters.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Off => "off",
            Self::Warn => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SeverityVisitor;

        impl Visitor<'_> for SeverityVisitor {
            type Value = Severity;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a severity integer (-1, 0, 1 or 2)")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Severity, E> {
                i8::try_from(v)
                    .ok()
                    .and_then(Severity::from_i8)
                    .ok_or_else(|| E::custom(format!("unknown severity {v}")))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Severity, E> {
                i8::try_from(v)
                    .ok()
                    .and_then(Severity::from_i8)
                    .ok_or_else(|| E::custom(format!("unknown severity {v}")))
            }
        }

        deserializer.deserialize_i64(SeverityVisitor)
    }
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// A 1-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A source span. `start` is inclusive, `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start: Position::new(start_line, start_column),
            end: Position::new(end_line, end_column),
        }
    }
}

// ---------------------------------------------------------------------------
// Violation
// ---------------------------------------------------------------------------

/// One rule violation reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// `None` for fatal parse errors, which ESLint reports without a rule.
    pub rule_id: Option<String>,
    #[serde(default)]
    pub message: String,
    pub severity: Severity,
    pub line: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
    #[serde(default)]
    pub fixable: bool,
    /// Autofix payload as emitted by ESLint; only its presence matters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<serde_json::Value>,
    /// Exact source text spanned by the range, when the analyzer supplies it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Violation {
    /// Build an error-severity violation; mostly useful for fixtures.
    #[must_use]
    pub fn error(rule_id: impl Into<String>, range: Range, source: impl Into<String>) -> Self {
        Self {
            rule_id: Some(rule_id.into()),
            message: String::new(),
            severity: Severity::Error,
            line: range.start.line,
            column: range.start.column,
            end_line: Some(range.end.line),
            end_column: Some(range.end.column),
            fixable: false,
            fix: None,
            source: Some(source.into()),
        }
    }

    /// The rule id, or `""` for rule-less messages.
    #[must_use]
    pub fn rule(&self) -> &str {
        self.rule_id.as_deref().unwrap_or_default()
    }

    /// Flagged fixable, or carrying an autofix.
    #[must_use]
    pub const fn is_fixable(&self) -> bool {
        self.fixable || self.fix.is_some()
    }

    /// The reported span. A missing end collapses onto the start.
    #[must_use]
    pub fn range(&self) -> Range {
        Range::new(
            self.line,
            self.column,
            self.end_line.unwrap_or(self.line),
            self.end_column.unwrap_or(self.column),
        )
    }

    /// Replace the span, keeping every other field.
    #[must_use]
    pub fn with_range(mut self, range: Range) -> Self {
        self.line = range.start.line;
        self.column = range.start.column;
        self.end_line = Some(range.end.line);
        self.end_column = Some(range.end.column);
        self
    }
}

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

/// Per-severity tallies for one file (or summed over a run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityCounts {
    #[serde(default)]
    pub error_count: usize,
    #[serde(default)]
    pub warning_count: usize,
    #[serde(default)]
    pub todo_count: usize,
    #[serde(default)]
    pub fixable_error_count: usize,
    #[serde(default)]
    pub fixable_warning_count: usize,
    #[serde(default)]
    pub fixable_todo_count: usize,
}

impl SeverityCounts {
    /// Tally a list of violations from scratch.
    #[must_use]
    pub fn tally(violations: &[Violation]) -> Self {
        let mut counts = Self::default();
        for violation in violations {
            counts.add(violation.severity, violation.is_fixable());
        }
        counts
    }

    /// Count one violation into its bucket. `Off` is not counted.
    pub const fn add(&mut self, severity: Severity, fixable: bool) {
        match severity {
            Severity::Error => {
                self.error_count += 1;
                if fixable {
                    self.fixable_error_count += 1;
                }
            }
            Severity::Warn => {
                self.warning_count += 1;
                if fixable {
                    self.fixable_warning_count += 1;
                }
            }
            Severity::Todo => {
                self.todo_count += 1;
                if fixable {
                    self.fixable_todo_count += 1;
                }
            }
            Severity::Off => {}
        }
    }

    /// Remove one violation from its bucket.
    pub const fn remove(&mut self, severity: Severity, fixable: bool) {
        match severity {
            Severity::Error => {
                self.error_count = self.error_count.saturating_sub(1);
                if fixable {
                    self.fixable_error_count = self.fixable_error_count.saturating_sub(1);
                }
            }
            Severity::Warn => {
                self.warning_count = self.warning_count.saturating_sub(1);
                if fixable {
                    self.fixable_warning_count = self.fixable_warning_count.saturating_sub(1);
                }
            }
            Severity::Todo => {
                self.todo_count = self.todo_count.saturating_sub(1);
                if fixable {
                    self.fixable_todo_count = self.fixable_todo_count.saturating_sub(1);
                }
            }
            Severity::Off => {}
        }
    }

    /// Move one violation between buckets; the overall total is unchanged.
    pub const fn shift(&mut self, from: Severity, to: Severity, fixable: bool) {
        self.remove(from, fixable);
        self.add(to, fixable);
    }

    /// Every counted violation, todos included.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.error_count + self.warning_count + self.todo_count
    }

    /// Violations that surface as problems (errors and warnings).
    #[must_use]
    pub const fn problems(&self) -> usize {
        self.error_count + self.warning_count
    }

    /// Sum two tallies.
    #[must_use]
    pub const fn merged(self, other: Self) -> Self {
        Self {
            error_count: self.error_count + other.error_count,
            warning_count: self.warning_count + other.warning_count,
            todo_count: self.todo_count + other.todo_count,
            fixable_error_count: self.fixable_error_count + other.fixable_error_count,
            fixable_warning_count: self.fixable_warning_count + other.fixable_warning_count,
            fixable_todo_count: self.fixable_todo_count + other.fixable_todo_count,
        }
    }
}

// ---------------------------------------------------------------------------
// FileReport
// ---------------------------------------------------------------------------

/// All violations the analyzer found in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file_path: String,
    #[serde(default)]
    pub messages: Vec<Violation>,
    #[serde(flatten)]
    pub counts: SeverityCounts,
    /// Full file text, used to slice snippets for violations lacking one.
    #[serde(default, skip_serializing)]
    pub source: Option<String>,
}

impl FileReport {
    /// Build a report with counts tallied from `messages`.
    #[must_use]
    pub fn new(file_path: impl Into<String>, messages: Vec<Violation>) -> Self {
        let counts = SeverityCounts::tally(&messages);
        Self {
            file_path: file_path.into(),
            messages,
            counts,
            source: None,
        }
    }

    /// Attach the full file source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Recompute counts from the messages, discarding whatever was supplied.
    pub fn recount(&mut self) {
        self.counts = SeverityCounts::tally(&self.messages);
    }
}

/// Sum the counts of every report.
#[must_use]
pub fn sum_counts(reports: &[FileReport]) -> SeverityCounts {
    reports
        .iter()
        .fold(SeverityCounts::default(), |acc, report| acc.merged(report.counts))
}
