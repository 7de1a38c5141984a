//! The filename index: a trie of record, backed by a bounded LRU cache of
//! recently resolved handles, per spec.md §4.1.

use std::num::NonZeroUsize;
use std::sync::{Mutex, RwLock};

use common::DocError;
use lru::LruCache;

use crate::metadata::FileMetadataHandle;
use crate::trie::Trie;

/// Default LRU capacity, taken from `original_source/name_server.h`'s
/// `CACHE_SIZE`.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// The name server's filename index.
///
/// The trie is the source of truth; the cache only ever holds handles the
/// trie also knows about, so `cache.get` missing is never itself an error,
/// just a cache miss to refill from `trie.lookup`.
pub struct FilenameIndex {
    trie: RwLock<Trie<FileMetadataHandle>>,
    cache: Mutex<LruCache<String, FileMetadataHandle>>,
}

impl FilenameIndex {
    /// Builds an empty index with the given cache capacity.
    #[must_use]
    pub fn new(cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity.max(1)).unwrap();
        Self {
            trie: RwLock::new(Trie::new()),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Inserts a newly created file. Fails `FileExists` if the name is
    /// already present.
    pub fn insert(&self, name: &str, handle: FileMetadataHandle) -> Result<(), DocError> {
        let mut trie = self.trie.write().unwrap();
        if trie.get(name).is_some() {
            return Err(DocError::new(
                common::ErrorCode::FileExists,
                format!("'{name}' already exists"),
            ));
        }
        trie.insert(name, handle.clone());
        drop(trie);
        self.cache.lock().unwrap().put(name.to_string(), handle);
        Ok(())
    }

    /// Resolves `name`, checking the cache before falling back to the trie.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<FileMetadataHandle> {
        if let Some(handle) = self.cache.lock().unwrap().get(name) {
            return Some(handle.clone());
        }
        let handle = self.trie.read().unwrap().get(name).cloned()?;
        self.cache
            .lock()
            .unwrap()
            .put(name.to_string(), handle.clone());
        Some(handle)
    }

    /// Removes `name` from both the trie and the cache, returning its
    /// handle if it existed. The handle's ACL and pending requests are
    /// dropped along with it; nothing outside this index references them.
    pub fn remove(&self, name: &str) -> Option<FileMetadataHandle> {
        let removed = self.trie.write().unwrap().remove(name);
        self.cache.lock().unwrap().pop(name);
        removed
    }

    /// Lists every filename currently in the index, in byte-lexicographic
    /// order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.trie.read().unwrap().keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FileMetadata;
    use std::sync::{Arc, Mutex as StdMutex};

    fn handle(name: &str) -> FileMetadataHandle {
        Arc::new(StdMutex::new(FileMetadata::new(name, "alice", 1, 0)))
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let index = FilenameIndex::new(DEFAULT_CACHE_CAPACITY);
        index.insert("a.txt", handle("a.txt")).unwrap();
        assert!(index.lookup("a.txt").is_some());
        assert!(index.lookup("b.txt").is_none());
    }

    #[test]
    fn insert_rejects_duplicate_name() {
        let index = FilenameIndex::new(DEFAULT_CACHE_CAPACITY);
        index.insert("a.txt", handle("a.txt")).unwrap();
        let err = index.insert("a.txt", handle("a.txt")).unwrap_err();
        assert_eq!(err.code(), common::ErrorCode::FileExists);
    }

    #[test]
    fn remove_drops_from_trie_and_cache() {
        let index = FilenameIndex::new(DEFAULT_CACHE_CAPACITY);
        index.insert("a.txt", handle("a.txt")).unwrap();
        assert!(index.remove("a.txt").is_some());
        assert!(index.lookup("a.txt").is_none());
        assert!(index.remove("a.txt").is_none());
    }

    #[test]
    fn list_is_sorted_and_complete() {
        let index = FilenameIndex::new(DEFAULT_CACHE_CAPACITY);
        index.insert("b.txt", handle("b.txt")).unwrap();
        index.insert("a.txt", handle("a.txt")).unwrap();
        assert_eq!(index.list(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn cache_eviction_does_not_lose_data_backed_by_trie() {
        let index = FilenameIndex::new(1);
        index.insert("a.txt", handle("a.txt")).unwrap();
        index.insert("b.txt", handle("b.txt")).unwrap();
        // "a.txt" was evicted from the 1-entry cache but survives in the trie.
        assert!(index.lookup("a.txt").is_some());
    }
}
