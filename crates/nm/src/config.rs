//! Plain configuration the `docsys-nm` binary builds from its `clap`
//! arguments and hands to [`crate::server::NmServer`].

use std::path::PathBuf;

use crate::index::DEFAULT_CACHE_CAPACITY;

/// Name server startup configuration.
#[derive(Clone, Debug)]
pub struct NmConfig {
    /// TCP port to accept both SS and client connections on.
    pub port: u16,
    /// Path to the append-only operation log.
    pub log_path: PathBuf,
    /// Path to the persistent user registry.
    pub registry_path: PathBuf,
    /// Maximum entries kept in the filename LRU cache.
    pub cache_capacity: usize,
}

impl Default for NmConfig {
    fn default() -> Self {
        Self {
            port: 8001,
            log_path: PathBuf::from("nm_log.txt"),
            registry_path: PathBuf::from("nm_users.txt"),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}
