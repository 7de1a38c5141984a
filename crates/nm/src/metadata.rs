//! The per-file record held behind each trie terminal: ownership, the
//! storage server that holds its content, derived stats, and its ACL.

use std::sync::{Arc, Mutex};

use crate::acl::{AccessRight, AclEntry, PendingRequest};

/// A shared handle to one file's metadata, cloned into the LRU cache and
/// held by every command handler that touches the file.
pub type FileMetadataHandle = Arc<Mutex<FileMetadata>>;

/// Everything the name server knows about a file without asking its
/// storage server, mirroring `original_source/name_server.h`'s
/// `FileMetadata` minus the raw linked-list ACL.
#[derive(Clone, Debug)]
pub struct FileMetadata {
    /// The file's name as registered in the trie.
    pub filename: String,
    /// The username that created the file; only the owner may grant
    /// access, delete the file, or manage checkpoints.
    pub owner: String,
    /// Id of the storage server currently holding this file's content.
    pub ss_id: u64,
    /// Unix epoch seconds the file was created.
    pub created: i64,
    /// Unix epoch seconds of the last committed write.
    pub last_modified: i64,
    /// Unix epoch seconds of the last read/stream access.
    pub last_access: i64,
    /// Canonical byte size, refreshed by the SS's `INFO` reply.
    pub size: u64,
    /// Total word count across every sentence.
    pub word_count: u64,
    /// Character count; always equal to `size` per the SS's canonical
    /// serialization.
    pub char_count: u64,
    /// Per-user access grants, excluding the owner (who is implicitly
    /// `Write` on everything).
    pub acl: Vec<AclEntry>,
    /// Pending `REQACCESS` requests awaiting an owner decision.
    pub requests: Vec<PendingRequest>,
}

impl FileMetadata {
    /// Builds a freshly created file's metadata: zero stats, empty ACL,
    /// `owner` fixed at creation time per spec.md's Open Questions
    /// resolution (never deferred to the first write).
    #[must_use]
    pub fn new(filename: impl Into<String>, owner: impl Into<String>, ss_id: u64, now: i64) -> Self {
        Self {
            filename: filename.into(),
            owner: owner.into(),
            ss_id,
            created: now,
            last_modified: now,
            last_access: now,
            size: 0,
            word_count: 0,
            char_count: 0,
            acl: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Resolves `user`'s effective access right: the owner always has
    /// `Write`; otherwise the ACL is scanned linearly for an entry.
    #[must_use]
    pub fn check_access(&self, user: &str) -> AccessRight {
        if user == self.owner {
            return AccessRight::Write;
        }
        self.acl
            .iter()
            .find(|entry| entry.user == user)
            .map_or(AccessRight::None, |entry| entry.right)
    }
}
