//! Durable todo store.
//!
//! Todos live in a single append-only log, `.lint-todo`, under the base
//! directory. Every line is an `add` or a `remove` operation (see [`line`]).
//! Reading replays the log: each `remove` cancels the earliest still-live
//! `add` with the same file path and fingerprint. Compaction rewrites the log
//! keeping only live `add` lines.
//!
//! # Invariants
//!
//! - Existing lines are never edited in place. Appends go through one
//!   `O_APPEND` `write_all` per batch, so a batch lands whole or as a torn
//!   tail.
//! - A torn tail (final line without `\n`) is skipped by readers and
//!   truncated by the next writer.
//! - Any other malformed line is corruption: reads fail and name the line.
//! - Compaction writes a sibling temp file and renames it over the log.
//! - Writers hold an exclusive advisory lock on `.lint-todo.lock`.

pub mod line;
pub mod recovery;

use std::fs::{self, OpenOptions};
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ErrorCode;
use crate::lock::{LockError, StoreLock};
use crate::todo::TodoRecord;

use line::{LineError, Op, ParsedLine, STORE_HEADER};

/// Store file name, relative to the base directory.
pub const STORE_FILE: &str = ".lint-todo";

/// Lock file name, relative to the base directory.
pub const LOCK_FILE: &str = ".lint-todo.lock";

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error while reading or writing the log.
    #[error("todo store I/O error: {0}")]
    Io(#[from] io::Error),

    /// Lock acquisition failed.
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    /// A line in the middle of the log does not parse.
    #[error("corrupt todo store {} at line {line}: {reason}", .path.display())]
    Corrupt {
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        reason: LineError,
    },

    /// A record cannot be written without breaking the line format.
    #[error("cannot write todo record: {0}")]
    Unencodable(LineError),
}

impl StoreError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::StoreWriteFailed,
            Self::Lock(err) => err.code(),
            Self::Corrupt { .. } => ErrorCode::StoreCorrupt,
            Self::Unencodable(_) => ErrorCode::InternalUnexpected,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of [`TodoStore::append_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub added: usize,
    pub removed: usize,
}

/// Outcome of [`TodoStore::compact`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactResult {
    /// `add`/`remove` pairs eliminated.
    pub compacted: usize,
    /// `remove` lines that cancelled nothing and were dropped.
    pub orphan_removes: usize,
    /// Live records written back.
    pub live: usize,
}

/// Live state reconstructed from the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replay {
    /// Live records in log order.
    pub live: Vec<TodoRecord>,
    pub cancelled_pairs: usize,
    pub orphan_removes: usize,
    /// Whether a torn trailing record was skipped.
    pub torn_tail: bool,
}

/// Replay log text into live records.
///
/// # Errors
///
/// Returns `(line_number, LineError)` for the first malformed line. A final
/// line without `\n` is a torn write and is skipped unparsed. Line numbers
/// are 1-indexed.
pub fn replay(content: &str) -> Result<Replay, (usize, LineError)> {
    let complete = content.is_empty() || content.ends_with('\n');
    let total_lines = content.lines().count();

    let mut slots: Vec<Option<TodoRecord>> = Vec::new();
    let mut replay = Replay::default();

    for (i, raw) in content.lines().enumerate() {
        let line_no = i + 1;
        if !complete && line_no == total_lines {
            tracing::warn!(line = line_no, "skipping torn trailing todo record");
            replay.torn_tail = true;
            continue;
        }
        let parsed = line::parse_line(raw).map_err(|err| (line_no, err))?;

        match parsed {
            ParsedLine::Entry(Op::Add, record) => slots.push(Some(*record)),
            ParsedLine::Entry(Op::Remove, record) => {
                let key = record.key();
                let target = slots
                    .iter_mut()
                    .find(|slot| slot.as_ref().is_some_and(|live| live.key() == key));
                if let Some(slot) = target {
                    *slot = None;
                    replay.cancelled_pairs += 1;
                } else {
                    tracing::debug!(
                        line = line_no,
                        file = %record.file_path,
                        "remove line cancels no live todo"
                    );
                    replay.orphan_removes += 1;
                }
            }
            ParsedLine::Comment | ParsedLine::Blank => {}
        }
    }

    replay.live = slots.into_iter().flatten().collect();
    Ok(replay)
}

// ---------------------------------------------------------------------------
// TodoStore
// ---------------------------------------------------------------------------

/// Handle on the todo log of one base directory.
///
/// Callers must not run two reconciliation passes against the same base
/// directory at once; the write lock only keeps individual writes whole.
#[derive(Debug, Clone)]
pub struct TodoStore {
    base_dir: PathBuf,
    lock_timeout: Duration,
}

impl TodoStore {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path to the `.lint-todo` log.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.base_dir.join(STORE_FILE)
    }

    /// Path to the writer lock file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(LOCK_FILE)
    }

    /// Whether the log file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Replay the log, reporting cancellation statistics alongside the live
    /// records. A missing log replays as empty.
    ///
    /// # Errors
    ///
    /// [`StoreError::Corrupt`] naming the first malformed line (other than a
    /// torn tail); [`StoreError::Io`] when the log cannot be read.
    pub fn replay(&self) -> Result<Replay, StoreError> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(err) => return Err(StoreError::Io(err)),
        };

        replay(&content).map_err(|(line, reason)| StoreError::Corrupt { path, line, reason })
    }

    /// Live todo records in log order.
    ///
    /// # Errors
    ///
    /// Same as [`TodoStore::replay`].
    pub fn read(&self) -> Result<Vec<TodoRecord>, StoreError> {
        Ok(self.replay()?.live)
    }

    /// Append `add` lines for `to_add` and `remove` lines for `to_remove` in
    /// a single write. Nothing is written when both are empty.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unencodable`] before anything is written if a record
    /// cannot be serialized; lock and I/O errors otherwise.
    pub fn append_batch(
        &self,
        to_add: &[TodoRecord],
        to_remove: &[TodoRecord],
    ) -> Result<BatchResult, StoreError> {
        if to_add.is_empty() && to_remove.is_empty() {
            return Ok(BatchResult::default());
        }

        let mut buf = String::new();
        for record in to_add {
            buf.push_str(&line::write_line(Op::Add, record).map_err(StoreError::Unencodable)?);
        }
        for record in to_remove {
            buf.push_str(&line::write_line(Op::Remove, record).map_err(StoreError::Unencodable)?);
        }

        fs::create_dir_all(&self.base_dir)?;
        let _lock = StoreLock::acquire(&self.lock_path(), self.lock_timeout)?;

        let path = self.path();
        recovery::repair_torn_tail(&path)?;

        let needs_header = !fs::metadata(&path).is_ok_and(|meta| meta.len() > 0);
        if needs_header {
            buf.insert_str(0, &format!("{STORE_HEADER}\n"));
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(buf.as_bytes())?;
        file.flush()?;
        file.sync_data()?;

        tracing::info!(
            path = %path.display(),
            added = to_add.len(),
            removed = to_remove.len(),
            "todo batch appended"
        );

        Ok(BatchResult {
            added: to_add.len(),
            removed: to_remove.len(),
        })
    }

    /// Rewrite the log keeping only live `add` lines.
    ///
    /// A log with nothing to eliminate is left untouched.
    ///
    /// # Errors
    ///
    /// Same as [`TodoStore::replay`], plus lock and I/O errors.
    pub fn compact(&self) -> Result<CompactResult, StoreError> {
        if !self.exists() {
            return Ok(CompactResult::default());
        }

        let _lock = StoreLock::acquire(&self.lock_path(), self.lock_timeout)?;
        let replayed = self.replay()?;
        let result = CompactResult {
            compacted: replayed.cancelled_pairs,
            orphan_removes: replayed.orphan_removes,
            live: replayed.live.len(),
        };

        if result.compacted == 0 && result.orphan_removes == 0 && !replayed.torn_tail {
            return Ok(result);
        }

        let mut buf = format!("{STORE_HEADER}\n");
        for record in &replayed.live {
            buf.push_str(&line::write_line(Op::Add, record).map_err(StoreError::Unencodable)?);
        }

        let path = self.path();
        let tmp_path = path.with_extension("tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(buf.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        tracing::info!(
            path = %path.display(),
            compacted = result.compacted,
            orphan_removes = result.orphan_removes,
            live = result.live,
            "todo store compacted"
        );

        Ok(result)
    }

    /// Count of `add`/`remove` lines currently in the log (comments excluded).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the log exists but cannot be read.
    pub fn line_count(&self) -> Result<usize, StoreError> {
        let content = match fs::read_to_string(self.path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(StoreError::Io(err)),
        };
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
            .count())
    }
}
