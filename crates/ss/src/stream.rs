//! `STREAM`'s word-paced emission loop, per spec.md §4.8.

use std::io::Write;
use std::thread;
use std::time::Duration;

use common::DocError;
use wire::ss::StatusFrame;

use crate::file_entry::FileEntry;

/// Delay between words, matching the ~100ms pace spec.md calls for.
pub const WORD_PACE: Duration = Duration::from_millis(100);

/// Streams `entry`'s words one per line to `out`, pacing each with
/// [`WORD_PACE`] and finishing with a `STOP` frame.
///
/// # Errors
///
/// `SYSTEM_ERROR` the moment a write to `out` fails; no further words are
/// emitted once that happens.
pub fn stream_to<W: Write>(entry: &FileEntry, out: &mut W, now: i64) -> Result<(), DocError> {
    let mut first = true;
    entry.stream_words(now, |word| {
        if !first {
            thread::sleep(WORD_PACE);
        }
        first = false;
        writeln!(out, "{word}")
            .map_err(|e| DocError::system_error(format!("stream write failed: {e}")))
    })?;
    writeln!(out, "{}", StatusFrame::Stop.render())
        .map_err(|e| DocError::system_error(format!("stream write failed: {e}")))?;
    out.flush()
        .map_err(|e| DocError::system_error(format!("stream flush failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_entry::DEFAULT_UNDO_CAPACITY;
    use std::sync::Arc;

    fn entry() -> (tempfile::TempDir, Arc<FileEntry>) {
        let dir = tempfile::tempdir().unwrap();
        let entry = Arc::new(FileEntry::new(
            "doc.txt",
            "Hi there. Bye!",
            dir.path().to_path_buf(),
            DEFAULT_UNDO_CAPACITY,
            crate::config::DEFAULT_MAX_CONTENT_BYTES,
        ));
        (dir, entry)
    }

    #[test]
    fn stream_emits_words_then_stop() {
        let (_dir, entry) = entry();
        let mut buf = Vec::new();
        stream_to(&entry, &mut buf, 0).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["Hi", "there.", "Bye!", "STOP"]);
    }

    struct FailingWriter;
    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("broken pipe"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn broken_write_is_system_error() {
        let (_dir, entry) = entry();
        let mut sink = FailingWriter;
        let err = stream_to(&entry, &mut sink, 0).unwrap_err();
        assert_eq!(err.code(), common::ErrorCode::SystemError);
    }
}
