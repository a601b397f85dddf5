//! Content fingerprints for todo identity.
//!
//! Two BLAKE3 digests are derived per violation:
//!
//! - [`Fingerprint`] over `{engine, ruleId, range, snippet}` is the primary
//!   identity. It matches only while the violation sits at the same coordinates.
//! - [`ContentDigest`] over `{engine, ruleId, filePath, snippet}` ignores the
//!   range. It is the fuzzy-match key that lets a todo follow its code when
//!   unrelated edits shift line numbers.
//!
//! Every field is length-prefixed before hashing so that no two distinct
//! inputs share a byte stream, whatever characters snippets contain.

use std::fmt;
use std::str::FromStr;

use crate::model::{FileReport, Range, Violation};

const FINGERPRINT_DOMAIN: &str = "lintodo:fingerprint:v1";
const CONTENT_DOMAIN: &str = "lintodo:content:v1";

/// Length of a rendered digest in hex characters.
pub const HEX_LEN: usize = 64;

/// Error returned when a hex digest cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid digest '{0}': expected {HEX_LEN} lowercase hex characters")]
pub struct DigestParseError(pub String);

macro_rules! digest_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Raw digest bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Lowercase hex rendering, always [`HEX_LEN`] characters.
            #[must_use]
            pub fn to_hex(&self) -> String {
                blake3::Hash::from(self.0).to_hex().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..12])
            }
        }

        impl FromStr for $name {
            type Err = DigestParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.len() != HEX_LEN || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
                    return Err(DigestParseError(s.to_string()));
                }
                blake3::Hash::from_hex(s)
                    .map(|hash| Self(*hash.as_bytes()))
                    .map_err(|_| DigestParseError(s.to_string()))
            }
        }
    };
}

digest_type!(
    /// Primary todo identity: digest of engine, rule, range and snippet.
    Fingerprint
);

digest_type!(
    /// Range-independent digest of engine, rule, file path and snippet.
    ContentDigest
);

fn digest(domain: &str, fields: &[&str]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain.as_bytes());
    for field in fields {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Fingerprint a violation. Range coordinates are taken as reported.
#[must_use]
pub fn fingerprint(engine: &str, rule_id: &str, range: Range, snippet: &str) -> Fingerprint {
    let coords = format!(
        "{}:{}-{}:{}",
        range.start.line, range.start.column, range.end.line, range.end.column
    );
    Fingerprint(digest(FINGERPRINT_DOMAIN, &[engine, rule_id, &coords, snippet]))
}

/// Digest a violation's content, ignoring where in the file it sits.
#[must_use]
pub fn content_digest(engine: &str, rule_id: &str, file_path: &str, snippet: &str) -> ContentDigest {
    ContentDigest(digest(CONTENT_DOMAIN, &[engine, rule_id, file_path, snippet]))
}

// ---------------------------------------------------------------------------
// Snippets
// ---------------------------------------------------------------------------

/// Slice the text spanned by `range` out of a file's source.
///
/// Lines and columns are 1-based and counted in characters; the end column is
/// exclusive. A collapsed range (start == end) yields the trimmed start line so
/// that position-only reports still have distinguishing content. Coordinates
/// beyond the source are clamped.
#[must_use]
pub fn extract_snippet(source: &str, range: Range) -> String {
    let lines: Vec<&str> = source
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let line_at = |line: u32| -> Option<&str> {
        let index = usize::try_from(line).ok()?.checked_sub(1)?;
        lines.get(index).copied()
    };

    if range.start == range.end {
        return line_at(range.start.line).map(str::trim).unwrap_or_default().to_string();
    }

    let column_index = |column: u32| usize::try_from(column.saturating_sub(1)).unwrap_or(0);
    let mut out = String::new();

    for line_no in range.start.line..=range.end.line {
        let Some(text) = line_at(line_no) else {
            break;
        };
        let chars: Vec<char> = text.chars().collect();
        let from = if line_no == range.start.line {
            column_index(range.start.column).min(chars.len())
        } else {
            0
        };
        let to = if line_no == range.end.line {
            column_index(range.end.column).min(chars.len())
        } else {
            chars.len()
        };

        if line_no != range.start.line {
            out.push('\n');
        }
        if from < to {
            out.extend(&chars[from..to]);
        }
    }

    out
}

/// The snippet for a violation: its own `source` when the analyzer supplied
/// one, otherwise sliced from the file text, otherwise empty.
#[must_use]
pub fn snippet_for(report: &FileReport, violation: &Violation) -> String {
    if let Some(snippet) = &violation.source {
        return snippet.clone();
    }
    report
        .source
        .as_deref()
        .map(|source| extract_snippet(source, violation.range()))
        .unwrap_or_default()
}
