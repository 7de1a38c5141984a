#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Storage server: the sentence/word document model, per-sentence lock
//! manager, staged-draft `ETIRW` write protocol, word-paced streaming, undo
//! ring, and named checkpoints described in spec.md §4.6-4.10.
//!
//! [`server::SsServer`] owns the accept loop and the persistent NM
//! registration channel; [`ops::SsSession`] is the per-connection command
//! dispatcher built on top of [`store::Store`] and [`file_entry::FileEntry`].

pub mod arena;
pub mod checkpoint;
pub mod config;
pub mod document;
pub mod draft;
pub mod file_entry;
pub mod ops;
pub mod sentence;
pub mod sentence_lock;
pub mod server;
pub mod store;
pub mod stream;

pub use config::SsConfig;
pub use server::SsServer;
pub use store::Store;
