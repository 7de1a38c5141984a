//! One stored file's full runtime state: its [`Document`], the
//! `FLOCK`/`SLOCK` pair guarding it, outstanding drafts, and its undo ring.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use common::DocError;

use crate::arena::{SentenceId, SentenceMap};
use crate::document::Document;
use crate::draft::Draft;
use crate::sentence::Stats;
use crate::sentence_lock::SentenceLock;

/// Default undo ring depth, taken from `original_source/storage_server.h`'s
/// `SENTENCE_UNDO_HISTORY`.
pub const DEFAULT_UNDO_CAPACITY: usize = 50;

/// One file's runtime state.
pub struct FileEntry {
    /// The filename, relative to the storage root.
    pub name: String,
    storage_dir: PathBuf,
    flock: RwLock<()>,
    structure: Mutex<Document>,
    locks: Mutex<SentenceMap<Arc<SentenceLock>>>,
    drafts: Mutex<SentenceMap<Draft>>,
    undo_ring: Mutex<VecDeque<String>>,
    undo_capacity: usize,
    max_content_bytes: usize,
    last_access: AtomicI64,
}

impl FileEntry {
    /// Builds a file entry from already-loaded content, without touching
    /// disk (used both at boot and by `CREATE`, which persists separately).
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        content: &str,
        storage_dir: PathBuf,
        undo_capacity: usize,
        max_content_bytes: usize,
    ) -> Self {
        Self {
            name: name.into(),
            storage_dir,
            flock: RwLock::new(()),
            structure: Mutex::new(Document::from_content(content)),
            locks: Mutex::new(SentenceMap::new()),
            drafts: Mutex::new(SentenceMap::new()),
            undo_ring: Mutex::new(VecDeque::new()),
            undo_capacity,
            max_content_bytes,
            last_access: AtomicI64::new(0),
        }
    }

    /// Path to this file's canonical on-disk copy.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.storage_dir.join(&self.name)
    }

    /// Path to this file's checkpoint directory.
    #[must_use]
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.storage_dir.join("checkpoints").join(&self.name)
    }

    fn persist(&self, content: &str) -> io::Result<()> {
        fs::write(self.path(), content)
    }

    /// Current sentence count, for `WRITE_LOCK`/`STREAM` bounds checks.
    #[must_use]
    pub fn sentence_count(&self) -> usize {
        self.structure.lock().unwrap().sentence_count()
    }

    /// Current derived stats.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.structure.lock().unwrap().stats()
    }

    /// Unix epoch seconds of the last read/stream access.
    #[must_use]
    pub fn last_access(&self) -> i64 {
        self.last_access.load(Ordering::SeqCst)
    }

    fn touch(&self, now: i64) {
        self.last_access.store(now, Ordering::SeqCst);
    }

    /// Renders the whole file under a read `FLOCK`, for `VIEW`.
    #[must_use]
    pub fn view(&self, now: i64) -> String {
        let _flock = self.flock.read().unwrap();
        self.touch(now);
        self.structure.lock().unwrap().render()
    }

    /// Runs `emit` once per word under a read `FLOCK` + `SLOCK`, as
    /// `STREAM` does; `emit` receives the word with its sentence's
    /// delimiter appended when it is the sentence's last word. Stops and
    /// returns `Err` the first time `emit` does.
    pub fn stream_words<F>(&self, now: i64, mut emit: F) -> Result<(), DocError>
    where
        F: FnMut(&str) -> Result<(), DocError>,
    {
        let _flock = self.flock.read().unwrap();
        let doc = self.structure.lock().unwrap();
        self.touch(now);
        for index in 0..doc.sentence_count() {
            let Some(sentence) = doc.sentence_at(index) else {
                continue;
            };
            let last = sentence.words.len().saturating_sub(1);
            for (word_index, word) in sentence.words.iter().enumerate() {
                if word_index == last {
                    if let Some(delim) = sentence.delimiter {
                        emit(&format!("{word}{delim}"))?;
                        continue;
                    }
                }
                emit(word)?;
            }
        }
        Ok(())
    }

    /// Acquires the sentence at `position` for a `WRITE` session: installs
    /// an empty draft cloned from the live sentence and snapshots the whole
    /// file into the undo ring.
    ///
    /// # Errors
    ///
    /// `INVALID_SENTENCE` if `position` is out of range, `FILE_LOCKED` if
    /// another session already holds it.
    pub fn write_lock(self: &Arc<Self>, position: usize) -> Result<SentenceLease, DocError> {
        let (sentence_id, snapshot) = {
            let doc = self.structure.lock().unwrap();
            let id = doc.sentence_id_at(position).ok_or_else(|| {
                DocError::new(
                    common::ErrorCode::InvalidSentence,
                    format!("sentence {position} out of range"),
                )
            })?;
            let sentence = doc.sentence_by_id(id).cloned().unwrap_or_default();
            (id, sentence)
        };

        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry(sentence_id)
                .or_insert_with(|| Arc::new(SentenceLock::default()))
                .clone()
        };
        if !lock.try_acquire() {
            return Err(DocError::new(
                common::ErrorCode::FileLocked,
                format!("sentence {position} is held by another session"),
            ));
        }

        self.drafts
            .lock()
            .unwrap()
            .insert(sentence_id, Draft::from_sentence(&snapshot));
        self.push_undo_snapshot();

        Ok(SentenceLease {
            entry: self.clone(),
            sentence_id,
            lock,
            committed: false,
        })
    }

    fn push_undo_snapshot(&self) {
        let content = self.structure.lock().unwrap().render();
        let mut ring = self.undo_ring.lock().unwrap();
        if ring.len() == self.undo_capacity {
            ring.pop_front();
        }
        ring.push_back(content);
    }

    /// Pops the newest undo entry and restores it as the live document.
    ///
    /// # Errors
    ///
    /// `SYSTEM_ERROR` if the ring is empty, or if the restore fails to
    /// persist to disk.
    pub fn undo(&self) -> Result<(), DocError> {
        let content = {
            let mut ring = self.undo_ring.lock().unwrap();
            ring.pop_back()
                .ok_or_else(|| DocError::system_error("no undo history for this file"))?
        };
        let _flock = self.flock.write().unwrap();
        let mut doc = self.structure.lock().unwrap();
        doc.replace_all(&content);
        let rendered = doc.render();
        drop(doc);
        self.persist(&rendered)
            .map_err(|e| DocError::system_error(format!("failed to persist undo: {e}")))
    }

    /// Replaces the live document and persists it, used by `REVERT` after
    /// the caller has already pushed the pre-revert snapshot onto the undo
    /// ring.
    pub fn replace_and_persist(&self, content: &str) -> Result<(), DocError> {
        let _flock = self.flock.write().unwrap();
        let mut doc = self.structure.lock().unwrap();
        doc.replace_all(content);
        let rendered = doc.render();
        drop(doc);
        self.persist(&rendered)
            .map_err(|e| DocError::system_error(format!("failed to persist: {e}")))
    }

    /// Snapshots the current canonical content into the undo ring without
    /// otherwise touching the document, used before a `REVERT`.
    pub fn snapshot_for_revert(&self) {
        self.push_undo_snapshot();
    }
}

/// A held sentence lock for the duration of one `WRITE` session.
///
/// Dropping a lease (on `WRITE_UNLOCK`, after `ETIRW` commits, or when the
/// owning connection dies) discards any uncommitted draft and releases the
/// underlying [`SentenceLock`]; this is how a dead socket's lock gets freed
/// without any explicit client-id bookkeeping.
pub struct SentenceLease {
    entry: Arc<FileEntry>,
    sentence_id: SentenceId,
    lock: Arc<SentenceLock>,
    committed: bool,
}

impl SentenceLease {
    /// Tokenizes `content` and splices it into the draft at `word_index`.
    pub fn insert(&self, word_index: usize, content: &str) -> Result<(), DocError> {
        let mut drafts = self.entry.drafts.lock().unwrap();
        let draft = drafts
            .get_mut(&self.sentence_id)
            .expect("a held lease always has a draft");
        draft.insert(word_index, content)
    }

    /// Commits the draft: re-resolves the sentence's current position
    /// (another commit may have shifted it since `WRITE_LOCK`), previews the
    /// re-split draft sentences against the configured content cap, and
    /// only then splices them in, refreshes stats, and persists.
    ///
    /// # Errors
    ///
    /// `SYSTEM_ERROR` if the sentence or its draft has vanished, which
    /// cannot happen under correct use but is checked rather than panicking
    /// on a corrupted internal state. `INVALID_OPERATION` if committing
    /// would push the file past its configured content cap; the draft is
    /// left in place so the session can be retried with smaller content.
    pub fn commit(&mut self) -> Result<(), DocError> {
        let _flock = self.entry.flock.write().unwrap();
        let mut doc = self.entry.structure.lock().unwrap();
        let position = doc
            .position_of(self.sentence_id)
            .ok_or_else(|| DocError::system_error("sentence vanished before commit"))?;

        let mut sentences = {
            let drafts = self.entry.drafts.lock().unwrap();
            let draft = drafts
                .get(&self.sentence_id)
                .ok_or_else(|| DocError::system_error("no draft for committed sentence"))?;
            draft.to_sentences()
        };
        let first = sentences.remove(0);

        let preview = doc
            .preview_splice(position, &first, &sentences)
            .ok_or_else(|| DocError::system_error("sentence vanished before commit"))?;
        if preview.len() > self.entry.max_content_bytes {
            return Err(DocError::new(
                common::ErrorCode::InvalidOperation,
                format!(
                    "commit would grow '{}' to {} bytes, past the {}-byte cap",
                    self.entry.name,
                    preview.len(),
                    self.entry.max_content_bytes
                ),
            ));
        }

        doc.splice(position, first, sentences);
        let content = doc.render();
        drop(doc);

        self.entry
            .persist(&content)
            .map_err(|e| DocError::system_error(format!("failed to persist commit: {e}")))?;
        self.entry.drafts.lock().unwrap().remove(&self.sentence_id);
        self.committed = true;
        Ok(())
    }

    /// Whether [`Self::commit`] has already run.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }
}

impl Drop for SentenceLease {
    fn drop(&mut self) {
        self.entry.drafts.lock().unwrap().remove(&self.sentence_id);
        self.lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> (tempfile::TempDir, Arc<FileEntry>) {
        let dir = tempfile::tempdir().unwrap();
        let entry = Arc::new(FileEntry::new(
            "doc.txt",
            "Hello world. Second sentence.",
            dir.path().to_path_buf(),
            DEFAULT_UNDO_CAPACITY,
            crate::config::DEFAULT_MAX_CONTENT_BYTES,
        ));
        (dir, entry)
    }

    #[test]
    fn write_lock_then_commit_updates_document() {
        let (_dir, entry) = entry();
        let mut lease = entry.write_lock(0).unwrap();
        lease.insert(2, "there").unwrap();
        lease.commit().unwrap();
        assert_eq!(entry.view(0), "Hello world there. Second sentence.");
    }

    #[test]
    fn second_write_lock_on_same_sentence_is_file_locked() {
        let (_dir, entry) = entry();
        let _lease = entry.write_lock(0).unwrap();
        let err = entry.write_lock(0).unwrap_err();
        assert_eq!(err.code(), common::ErrorCode::FileLocked);
    }

    #[test]
    fn write_lock_out_of_range_is_invalid_sentence() {
        let (_dir, entry) = entry();
        let err = entry.write_lock(99).unwrap_err();
        assert_eq!(err.code(), common::ErrorCode::InvalidSentence);
    }

    #[test]
    fn dropping_lease_without_commit_discards_draft_and_releases_lock() {
        let (_dir, entry) = entry();
        {
            let lease = entry.write_lock(0).unwrap();
            drop(lease);
        }
        let lease = entry.write_lock(0).unwrap();
        drop(lease);
        assert_eq!(entry.view(0), "Hello world. Second sentence.");
    }

    #[test]
    fn undo_restores_prior_snapshot() {
        let (_dir, entry) = entry();
        let mut lease = entry.write_lock(0).unwrap();
        lease.insert(2, "there").unwrap();
        lease.commit().unwrap();
        assert!(entry.view(0).contains("there"));

        entry.undo().unwrap();
        assert_eq!(entry.view(0), "Hello world. Second sentence.");
    }

    #[test]
    fn undo_with_empty_ring_is_system_error() {
        let (_dir, entry) = entry();
        let err = entry.undo().unwrap_err();
        assert_eq!(err.code(), common::ErrorCode::SystemError);
    }

    #[test]
    fn stream_words_emits_each_word_with_delimiter_on_last() {
        let (_dir, entry) = entry();
        let mut words = Vec::new();
        entry
            .stream_words(0, |w| {
                words.push(w.to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(words, vec!["Hello", "world.", "Second", "sentence."]);
    }
}
