//! The storage server's top-level file table: boot-time recovery, creation,
//! and deletion, per spec.md §4.10.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use common::{DocError, ErrorCode};
use logging::{LogContext, Logger};

use crate::file_entry::FileEntry;

/// The set of files this storage server holds, keyed by filename.
pub struct Store {
    storage_dir: PathBuf,
    undo_capacity: usize,
    max_content_bytes: usize,
    files: RwLock<HashMap<String, Arc<FileEntry>>>,
}

impl Store {
    /// Loads every regular file already present under `storage_dir`. A file
    /// that fails to read is logged and skipped rather than treated as a
    /// fatal boot error, since a single corrupted file should not take the
    /// whole server down.
    #[must_use]
    pub fn boot(storage_dir: PathBuf, undo_capacity: usize, max_content_bytes: usize, logger: &Logger) -> Self {
        let boot_ctx = LogContext::new("-", 0);
        let mut files = HashMap::new();
        match fs::read_dir(&storage_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !path.is_file() {
                        continue;
                    }
                    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                        continue;
                    };
                    match fs::read_to_string(&path) {
                        Ok(content) => {
                            let entry = Arc::new(FileEntry::new(
                                name,
                                &content,
                                storage_dir.clone(),
                                undo_capacity,
                                max_content_bytes,
                            ));
                            files.insert(name.to_string(), entry);
                        }
                        Err(e) => {
                            logger.warn(&boot_ctx, "BOOT", format!("skipping unreadable storage file '{name}': {e}"));
                        }
                    }
                }
            }
            Err(e) => {
                logger.warn(
                    &boot_ctx,
                    "BOOT",
                    format!("storage directory '{}' unavailable at boot: {e}", storage_dir.display()),
                );
            }
        }
        Self { storage_dir, undo_capacity, max_content_bytes, files: RwLock::new(files) }
    }

    /// Names of every file currently held, for `REGISTER_SS`'s file list.
    #[must_use]
    pub fn filenames(&self) -> Vec<String> {
        self.files.read().unwrap().keys().cloned().collect()
    }

    /// Looks up a file by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<FileEntry>> {
        self.files.read().unwrap().get(name).cloned()
    }

    /// Creates a brand-new, empty file.
    ///
    /// # Errors
    ///
    /// `FILE_EXISTS` if a file with this name is already held, `SYSTEM_ERROR`
    /// if writing it to disk fails.
    pub fn create(&self, name: &str) -> Result<(), DocError> {
        if !valid_filename(name) {
            return Err(DocError::invalid_operation(format!("invalid filename '{name}'")));
        }
        let mut files = self.files.write().unwrap();
        if files.contains_key(name) {
            return Err(DocError::new(ErrorCode::FileExists, format!("'{name}' already exists")));
        }
        fs::write(self.storage_dir.join(name), "")
            .map_err(|e| DocError::system_error(format!("failed to create '{name}': {e}")))?;
        files.insert(
            name.to_string(),
            Arc::new(FileEntry::new(
                name,
                "",
                self.storage_dir.clone(),
                self.undo_capacity,
                self.max_content_bytes,
            )),
        );
        Ok(())
    }

    /// Removes a file and its checkpoint directory tree.
    ///
    /// # Errors
    ///
    /// `FILE_NOT_FOUND` if no such file is held.
    pub fn delete(&self, name: &str) -> Result<(), DocError> {
        let entry = {
            let mut files = self.files.write().unwrap();
            files.remove(name).ok_or_else(|| DocError::file_not_found(name))?
        };
        let _ = entry.remove_checkpoints();
        fs::remove_file(entry.path())
            .map_err(|e| DocError::system_error(format!("failed to delete '{name}': {e}")))
    }

    /// The directory this store persists canonical file bytes under.
    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

fn valid_filename(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && name != "." && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use logging::Logger;

    fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("ss_log.txt");
        let logger = Logger::open(&log_path).unwrap();
        let store = Store::boot(dir.path().to_path_buf(), 50, 1024 * 1024, &logger);
        (dir, store)
    }

    #[test]
    fn boot_on_empty_directory_is_empty() {
        let (_dir, store) = store();
        assert!(store.filenames().is_empty());
    }

    #[test]
    fn boot_loads_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "Hello there.").unwrap();
        let logger = Logger::open(dir.path().join("ss_log.txt")).unwrap();
        let store = Store::boot(dir.path().to_path_buf(), 50, 1024 * 1024, &logger);
        assert_eq!(store.filenames(), vec!["a.txt".to_string()]);
        assert_eq!(store.get("a.txt").unwrap().view(0), "Hello there.");
    }

    #[test]
    fn create_then_delete_round_trips() {
        let (_dir, store) = store();
        store.create("new.txt").unwrap();
        assert!(store.get("new.txt").is_some());
        store.delete("new.txt").unwrap();
        assert!(store.get("new.txt").is_none());
    }

    #[test]
    fn create_duplicate_is_file_exists() {
        let (_dir, store) = store();
        store.create("new.txt").unwrap();
        let err = store.create("new.txt").unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileExists);
    }

    #[test]
    fn delete_missing_is_file_not_found() {
        let (_dir, store) = store();
        let err = store.delete("missing.txt").unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileNotFound);
    }

    #[test]
    fn create_rejects_path_separators() {
        let (_dir, store) = store();
        let err = store.create("../escape.txt").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOperation);
    }
}
