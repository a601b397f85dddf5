//! Todo records: a suppressed violation plus its decay schedule.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::decay::{DaysToDecay, DecayDates};
use crate::fingerprint::{self, ContentDigest, Fingerprint};
use crate::model::{Range, Violation};

/// A persisted todo.
///
/// Records are immutable once written: relocation and cleanup happen by
/// appending `remove` + `add` lines, never by editing in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TodoRecord {
    /// Analyzer that produced the violation (e.g. `eslint`).
    pub engine: String,
    pub rule_id: String,
    pub range: Range,
    /// Primary identity; see [`crate::fingerprint`].
    pub fingerprint: Fingerprint,
    /// Fuzzy-match key. `None` for records read from legacy 12-column lines.
    pub content: Option<ContentDigest>,
    /// Path relative to the store's base directory, `/`-separated.
    pub file_path: String,
    pub created: DateTime<Utc>,
    pub decay: DecayDates,
}

/// Identity used to pair `remove` lines with earlier `add` lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TodoKey {
    pub file_path: String,
    pub fingerprint: Fingerprint,
}

/// Range-free identity used for fuzzy matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuzzyKey {
    pub engine: String,
    pub rule_id: String,
    pub file_path: String,
    pub content: ContentDigest,
}

impl TodoRecord {
    /// Build a candidate record for a violation found in `file_path`.
    ///
    /// Returns `None` for a violation without a rule id.
    #[must_use]
    pub fn from_violation(
        engine: &str,
        file_path: &str,
        violation: &Violation,
        snippet: &str,
        created: DateTime<Utc>,
        days: DaysToDecay,
    ) -> Option<Self> {
        let rule_id = violation.rule_id.as_deref()?;
        let range = violation.range();
        Some(Self {
            engine: engine.to_string(),
            rule_id: rule_id.to_string(),
            range,
            fingerprint: fingerprint::fingerprint(engine, rule_id, range, snippet),
            content: Some(fingerprint::content_digest(engine, rule_id, file_path, snippet)),
            file_path: file_path.to_string(),
            created,
            decay: days.dates_from(created),
        })
    }

    #[must_use]
    pub fn key(&self) -> TodoKey {
        TodoKey {
            file_path: self.file_path.clone(),
            fingerprint: self.fingerprint,
        }
    }

    /// The fuzzy-match key, when the record carries a content digest.
    #[must_use]
    pub fn fuzzy_key(&self) -> Option<FuzzyKey> {
        self.content.map(|content| FuzzyKey {
            engine: self.engine.clone(),
            rule_id: self.rule_id.clone(),
            file_path: self.file_path.clone(),
            content,
        })
    }

    /// Copy this record onto a new location, keeping its creation date and
    /// decay schedule.
    #[must_use]
    pub fn relocated_to(&self, candidate: &Self) -> Self {
        Self {
            range: candidate.range,
            fingerprint: candidate.fingerprint,
            content: candidate.content,
            ..self.clone()
        }
    }
}

/// Express `file_path` relative to `base_dir` with `/` separators.
///
/// Paths outside `base_dir` are kept as given (normalized separators).
#[must_use]
pub fn relative_path(base_dir: &Path, file_path: &str) -> String {
    let path = Path::new(file_path);
    let relative = path.strip_prefix(base_dir).unwrap_or(path);
    let normalized = relative.to_string_lossy().replace('\\', "/");
    normalized
        .strip_prefix("./")
        .map_or_else(|| normalized.clone(), str::to_string)
}
