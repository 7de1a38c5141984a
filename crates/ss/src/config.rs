//! Plain configuration the `docsys-ss` binary builds from its `clap`
//! arguments and hands to [`crate::server::SsServer`].

use std::path::PathBuf;

use crate::file_entry::DEFAULT_UNDO_CAPACITY;

/// Content cap consistent with the large-file Non-goal; an `INSERT`/`CREATE`
/// that would push a file past this is rejected rather than silently
/// accepted and slowly ground through.
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 1024 * 1024;

/// Storage server startup configuration.
#[derive(Clone, Debug)]
pub struct SsConfig {
    /// Host the name server is listening on.
    pub nm_host: String,
    /// Port the name server accepts registration/forwarding on.
    pub nm_port: u16,
    /// Port this storage server accepts direct client connections on
    /// (`READ`/`STREAM`/`WRITE` redirects land here).
    pub client_port: u16,
    /// Directory holding this server's canonical files and checkpoints.
    pub storage_dir: PathBuf,
    /// Path to the append-only operation log.
    pub log_path: PathBuf,
    /// Undo ring depth, per file.
    pub undo_capacity: usize,
    /// Maximum content size accepted for a single file.
    pub max_content_bytes: usize,
}

impl Default for SsConfig {
    fn default() -> Self {
        Self {
            nm_host: "127.0.0.1".to_string(),
            nm_port: 8001,
            client_port: 9001,
            storage_dir: PathBuf::from("storage"),
            log_path: PathBuf::from("ss_log.txt"),
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
        }
    }
}
