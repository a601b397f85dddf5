//! Pipe-delimited store line codec.
//!
//! # Format
//!
//! ```text
//! {op}|{engine}|{rule_id}|{start_line}|{start_col}|{end_line}|{end_col}|{fingerprint}|{content}|{created_ms}|{warn_ms}|{error_ms}|{file_path}
//! ```
//!
//! - `op` is `add` or `remove`.
//! - `fingerprint` and `content` are 64 lowercase hex characters.
//! - `warn_ms` / `error_ms` are epoch milliseconds, or empty for "never".
//! - `file_path` is last so it may contain `|`.
//! - Lines written before content digests existed omit the `content` column
//!   (12 columns). They still parse; they just cannot be fuzzy-matched.
//! - Lines starting with `#` are comments; blank lines are ignored.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::decay::DecayDates;
use crate::fingerprint::{ContentDigest, Fingerprint, HEX_LEN};
use crate::model::Range;
use crate::todo::TodoRecord;

/// Header written at the top of new store files.
pub const STORE_HEADER: &str = "# lint-todo store v1";

/// Column separator.
pub const SEPARATOR: char = '|';

/// Whether a line adds a todo or cancels an earlier add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Remove,
}

impl Op {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed store line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Entry(Op, Box<TodoRecord>),
    Comment,
    Blank,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while parsing or encoding a store line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// The first column is neither `add` nor `remove`.
    UnknownOp(String),
    /// Too few `|`-separated columns.
    FieldCount {
        /// Number of columns found.
        found: usize,
    },
    /// A line/column coordinate is not a positive integer.
    InvalidCoordinate(String),
    /// A digest column is not 64 lowercase hex characters.
    InvalidDigest(String),
    /// A timestamp column is not epoch milliseconds.
    InvalidTimestamp(String),
    /// A required text column is empty.
    EmptyField(&'static str),
    /// A field cannot be written without breaking the line format.
    Unencodable {
        /// Which field.
        field: &'static str,
        /// The offending value.
        value: String,
    },
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOp(raw) => write!(f, "unknown operation '{raw}'"),
            Self::FieldCount { found } => {
                write!(f, "expected 12 or 13 '|'-separated fields, found {found}")
            }
            Self::InvalidCoordinate(raw) => write!(f, "invalid line/column '{raw}'"),
            Self::InvalidDigest(raw) => write!(f, "invalid digest '{raw}'"),
            Self::InvalidTimestamp(raw) => write!(f, "invalid epoch-ms timestamp '{raw}'"),
            Self::EmptyField(field) => write!(f, "{field} is empty"),
            Self::Unencodable { field, value } => {
                write!(f, "{field} '{}' contains a separator or newline", value.escape_debug())
            }
        }
    }
}

impl std::error::Error for LineError {}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn check_field(field: &'static str, value: &str, forbid_separator: bool) -> Result<(), LineError> {
    let bad = value.contains('\n')
        || value.contains('\r')
        || (forbid_separator && value.contains(SEPARATOR));
    if bad {
        return Err(LineError::Unencodable {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn millis(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.timestamp_millis().to_string()).unwrap_or_default()
}

/// Serialize a record as one store line (without trailing newline).
///
/// # Errors
///
/// Returns [`LineError::Unencodable`] if the engine or rule id contains `|`,
/// or any text field contains a newline.
pub fn to_line(op: Op, record: &TodoRecord) -> Result<String, LineError> {
    check_field("engine", &record.engine, true)?;
    check_field("rule id", &record.rule_id, true)?;
    check_field("file path", &record.file_path, false)?;

    let content = record.content.map(|c| c.to_hex());
    let mut columns: Vec<String> = vec![
        op.as_str().to_string(),
        record.engine.clone(),
        record.rule_id.clone(),
        record.range.start.line.to_string(),
        record.range.start.column.to_string(),
        record.range.end.line.to_string(),
        record.range.end.column.to_string(),
        record.fingerprint.to_hex(),
    ];
    columns.extend(content);
    columns.push(record.created.timestamp_millis().to_string());
    columns.push(millis(record.decay.warn));
    columns.push(millis(record.decay.error));
    columns.push(record.file_path.clone());

    Ok(columns.join("|"))
}

/// Serialize a record as one store line with trailing newline.
///
/// # Errors
///
/// Same as [`to_line`].
pub fn write_line(op: Op, record: &TodoRecord) -> Result<String, LineError> {
    let mut line = to_line(op, record)?;
    line.push('\n');
    Ok(line)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_coordinate(raw: &str) -> Result<u32, LineError> {
    raw.parse::<u32>()
        .map_err(|_| LineError::InvalidCoordinate(raw.to_string()))
}

fn parse_millis(raw: &str) -> Result<DateTime<Utc>, LineError> {
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| LineError::InvalidTimestamp(raw.to_string()))
}

fn parse_optional_millis(raw: &str) -> Result<Option<DateTime<Utc>>, LineError> {
    if raw.is_empty() {
        Ok(None)
    } else {
        parse_millis(raw).map(Some)
    }
}

fn looks_like_digest(raw: &str) -> bool {
    raw.len() == HEX_LEN && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn non_empty<'a>(field: &'static str, raw: &'a str) -> Result<&'a str, LineError> {
    if raw.is_empty() {
        Err(LineError::EmptyField(field))
    } else {
        Ok(raw)
    }
}

/// Parse one store line.
///
/// # Errors
///
/// Returns a [`LineError`] describing the first malformed column.
pub fn parse_line(line: &str) -> Result<ParsedLine, LineError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return Ok(ParsedLine::Blank);
    }
    if line.starts_with('#') {
        return Ok(ParsedLine::Comment);
    }

    // The first nine columns never contain the separator; whatever follows
    // is either `created|warn|error|path` or `content|created|warn|error|path`.
    let head: Vec<&str> = line.splitn(10, SEPARATOR).collect();
    if head.len() < 10 {
        return Err(LineError::FieldCount { found: head.len() });
    }

    let op = match head[0] {
        "add" => Op::Add,
        "remove" => Op::Remove,
        other => return Err(LineError::UnknownOp(other.to_string())),
    };
    let engine = non_empty("engine", head[1])?;
    let rule_id = non_empty("rule id", head[2])?;
    let range = Range::new(
        parse_coordinate(head[3])?,
        parse_coordinate(head[4])?,
        parse_coordinate(head[5])?,
        parse_coordinate(head[6])?,
    );
    let fingerprint: Fingerprint = head[7]
        .parse()
        .map_err(|_| LineError::InvalidDigest(head[7].to_string()))?;

    let (content, created_raw, rest) = if looks_like_digest(head[8]) {
        let content: ContentDigest = head[8]
            .parse()
            .map_err(|_| LineError::InvalidDigest(head[8].to_string()))?;
        let (created_raw, rest) = head[9]
            .split_once(SEPARATOR)
            .ok_or(LineError::FieldCount { found: 10 })?;
        (Some(content), created_raw, rest)
    } else {
        (None, head[8], head[9])
    };

    let tail: Vec<&str> = rest.splitn(3, SEPARATOR).collect();
    if tail.len() < 3 {
        let found = 9 + usize::from(content.is_some()) + tail.len();
        return Err(LineError::FieldCount { found });
    }

    let created = parse_millis(created_raw)?;
    let decay = DecayDates {
        warn: parse_optional_millis(tail[0])?,
        error: parse_optional_millis(tail[1])?,
    };
    let file_path = non_empty("file path", tail[2])?;

    Ok(ParsedLine::Entry(
        op,
        Box::new(TodoRecord {
            engine: engine.to_string(),
            rule_id: rule_id.to_string(),
            range,
            fingerprint,
            content,
            file_path: file_path.to_string(),
            created,
            decay,
        }),
    ))
}
