//! Named on-disk checkpoints: `CHECKPOINT`, `VIEWCHECKPOINT`, `REVERT`, and
//! `LISTCHECKPOINTS`, per spec.md §4.9.

use std::fs;
use std::time::SystemTime;

use common::{DocError, ErrorCode};

use crate::file_entry::FileEntry;

/// Truncation marker appended to an oversized `VIEWCHECKPOINT` payload.
pub const TRUNCATED_MARKER: &str = "...[truncated]";

/// Checkpoint tags are restricted to this charset so they double safely as
/// filenames under the file's checkpoint directory.
fn validate_tag(tag: &str) -> Result<(), DocError> {
    let valid = !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(DocError::invalid_operation(format!(
            "checkpoint tag '{tag}' must match [A-Za-z0-9_.-]+"
        )))
    }
}

/// One entry from `LISTCHECKPOINTS`: a tag and its file modification time,
/// as Unix epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointEntry {
    /// The checkpoint's tag, with no `.chk` extension.
    pub tag: String,
    /// The checkpoint file's modification time, as Unix epoch seconds.
    pub modified: i64,
}

impl FileEntry {
    fn checkpoint_path(&self, tag: &str) -> std::path::PathBuf {
        self.checkpoint_dir().join(format!("{tag}.chk"))
    }

    /// Snapshots the file's current canonical content under `tag`.
    ///
    /// # Errors
    ///
    /// `INVALID_OPERATION` if `tag` fails validation, `FILE_EXISTS` if a
    /// checkpoint with this tag already exists, `SYSTEM_ERROR` on an
    /// underlying I/O failure.
    pub fn create_checkpoint(&self, tag: &str) -> Result<(), DocError> {
        validate_tag(tag)?;
        let dir = self.checkpoint_dir();
        fs::create_dir_all(&dir)
            .map_err(|e| DocError::system_error(format!("failed to create checkpoint dir: {e}")))?;

        let path = self.checkpoint_path(tag);
        if path.exists() {
            return Err(DocError::new(
                ErrorCode::FileExists,
                format!("checkpoint '{tag}' already exists"),
            ));
        }

        let content = self.view(self.last_access());
        fs::write(&path, content)
            .map_err(|e| DocError::system_error(format!("failed to write checkpoint: {e}")))
    }

    /// Reads back a checkpoint's bytes, truncating with [`TRUNCATED_MARKER`]
    /// if they exceed `max_bytes`.
    ///
    /// # Errors
    ///
    /// `FILE_NOT_FOUND` if no checkpoint with this tag exists.
    pub fn view_checkpoint(&self, tag: &str, max_bytes: usize) -> Result<String, DocError> {
        validate_tag(tag)?;
        let path = self.checkpoint_path(tag);
        let content = fs::read_to_string(&path)
            .map_err(|_| DocError::file_not_found(&format!("{}/checkpoints/{tag}", self.name)))?;
        if content.len() <= max_bytes {
            Ok(content)
        } else {
            let mut truncated = content[..max_bytes].to_string();
            truncated.push_str(TRUNCATED_MARKER);
            Ok(truncated)
        }
    }

    /// Restores the file to a previously taken checkpoint, pushing the
    /// pre-revert state onto the undo ring first so `UNDO` can reverse a
    /// `REVERT`.
    ///
    /// # Errors
    ///
    /// `FILE_NOT_FOUND` if no checkpoint with this tag exists.
    pub fn revert_checkpoint(&self, tag: &str) -> Result<(), DocError> {
        validate_tag(tag)?;
        let path = self.checkpoint_path(tag);
        let content = fs::read_to_string(&path)
            .map_err(|_| DocError::file_not_found(&format!("{}/checkpoints/{tag}", self.name)))?;
        self.snapshot_for_revert();
        self.replace_and_persist(&content)
    }

    /// Lists this file's checkpoints with their modification times, newest
    /// first by tag is not guaranteed; callers sort as they prefer.
    ///
    /// # Errors
    ///
    /// `SYSTEM_ERROR` on a directory-read failure; an absent checkpoint
    /// directory (no checkpoints taken yet) is reported as an empty list.
    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointEntry>, DocError> {
        let dir = self.checkpoint_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir)
            .map_err(|e| DocError::system_error(format!("failed to list checkpoints: {e}")))?;

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DocError::system_error(format!("failed to read checkpoint entry: {e}")))?;
            let path = entry.path();
            let Some(tag) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|_| path.extension().and_then(|e| e.to_str()) == Some("chk"))
            else {
                continue;
            };
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(epoch_seconds)
                .unwrap_or(0);
            out.push(CheckpointEntry { tag: tag.to_string(), modified });
        }
        Ok(out)
    }

    /// Removes the entire checkpoint directory tree, as `DELETE` requires.
    pub fn remove_checkpoints(&self) -> std::io::Result<()> {
        let dir = self.checkpoint_dir();
        if dir.exists() {
            fs::remove_dir_all(dir)
        } else {
            Ok(())
        }
    }
}

fn epoch_seconds(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
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
            "Hello world.",
            dir.path().to_path_buf(),
            DEFAULT_UNDO_CAPACITY,
            crate::config::DEFAULT_MAX_CONTENT_BYTES,
        ));
        (dir, entry)
    }

    #[test]
    fn create_then_view_round_trips() {
        let (_dir, entry) = entry();
        entry.create_checkpoint("v1").unwrap();
        assert_eq!(entry.view_checkpoint("v1", 4096).unwrap(), "Hello world.");
    }

    #[test]
    fn duplicate_tag_is_file_exists() {
        let (_dir, entry) = entry();
        entry.create_checkpoint("v1").unwrap();
        let err = entry.create_checkpoint("v1").unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileExists);
    }

    #[test]
    fn invalid_tag_is_rejected() {
        let (_dir, entry) = entry();
        let err = entry.create_checkpoint("bad tag!").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOperation);
    }

    #[test]
    fn view_missing_checkpoint_is_file_not_found() {
        let (_dir, entry) = entry();
        let err = entry.view_checkpoint("nope", 4096).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileNotFound);
    }

    #[test]
    fn view_truncates_oversized_checkpoint() {
        let (_dir, entry) = entry();
        entry.create_checkpoint("v1").unwrap();
        let rendered = entry.view_checkpoint("v1", 3).unwrap();
        assert!(rendered.ends_with(TRUNCATED_MARKER));
    }

    #[test]
    fn revert_restores_checkpoint_and_undo_reverses_it() {
        let (_dir, entry) = entry();
        entry.create_checkpoint("v1").unwrap();
        entry.replace_and_persist("Changed entirely.").unwrap();
        assert_eq!(entry.view(0), "Changed entirely.");

        entry.revert_checkpoint("v1").unwrap();
        assert_eq!(entry.view(0), "Hello world.");

        entry.undo().unwrap();
        assert_eq!(entry.view(0), "Changed entirely.");
    }

    #[test]
    fn list_checkpoints_reports_tags() {
        let (_dir, entry) = entry();
        assert!(entry.list_checkpoints().unwrap().is_empty());
        entry.create_checkpoint("v1").unwrap();
        entry.create_checkpoint("v2").unwrap();
        let mut tags: Vec<String> = entry.list_checkpoints().unwrap().into_iter().map(|c| c.tag).collect();
        tags.sort();
        assert_eq!(tags, vec!["v1".to_string(), "v2".to_string()]);
    }

    #[test]
    fn remove_checkpoints_deletes_directory_tree() {
        let (_dir, entry) = entry();
        entry.create_checkpoint("v1").unwrap();
        assert!(entry.checkpoint_dir().exists());
        entry.remove_checkpoints().unwrap();
        assert!(!entry.checkpoint_dir().exists());
    }
}
