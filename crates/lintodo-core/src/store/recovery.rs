//! Torn-write repair for the store log.
//!
//! A crash mid-append can leave a trailing partial record with no final
//! newline. Readers skip such a tail; writers truncate it before appending so
//! the next batch does not get glued onto the fragment. Every record the
//! writer emits ends in `\n`, so an unterminated final line is torn even when
//! its prefix still parses (a cut inside the trailing path column).

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

/// Truncate an incomplete trailing line (no terminating `\n`).
///
/// Returns the number of bytes removed; 0 when the file is missing, empty or
/// already ends with a newline.
///
/// # Errors
///
/// Returns an error if the file cannot be read or truncated.
pub fn repair_torn_tail(path: &Path) -> io::Result<u64> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };

    if content.is_empty() || content.last() == Some(&b'\n') {
        return Ok(0);
    }

    let truncate_to = content
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    let bytes_removed = (content.len() - truncate_to) as u64;

    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(truncate_to as u64)?;

    tracing::warn!(
        path = %path.display(),
        bytes_removed,
        "torn write repaired: truncated incomplete trailing todo record"
    );

    Ok(bytes_removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clean_file_is_untouched() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join(".lint-todo");
        fs::write(&path, "# header\nadd|x\n").expect("write");
        assert_eq!(repair_torn_tail(&path).expect("repair"), 0);
        assert_eq!(fs::read_to_string(&path).expect("read"), "# header\nadd|x\n");
    }

    #[test]
    fn partial_tail_is_truncated() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join(".lint-todo");
        fs::write(&path, "# header\nadd|x\nadd|partial").expect("write");
        assert_eq!(repair_torn_tail(&path).expect("repair"), 11);
        assert_eq!(fs::read_to_string(&path).expect("read"), "# header\nadd|x\n");
    }

    #[test]
    fn single_partial_line_truncates_to_empty() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join(".lint-todo");
        fs::write(&path, "add|par").expect("write");
        assert_eq!(repair_torn_tail(&path).expect("repair"), 7);
        assert!(fs::read(&path).expect("read").is_empty());
    }

    #[test]
    fn unterminated_line_is_truncated_even_if_it_parses() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join(".lint-todo");
        fs::write(&path, "# header\nadd|x\n# trailing comment").expect("write");
        assert_eq!(repair_torn_tail(&path).expect("repair"), 18);
        assert_eq!(fs::read_to_string(&path).expect("read"), "# header\nadd|x\n");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().expect("temp dir");
        assert_eq!(repair_torn_tail(&dir.path().join("absent")).expect("repair"), 0);
    }
}
