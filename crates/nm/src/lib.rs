#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `nm` is the name server: it owns the filename index, the ACL/access
//! request workflow, the persistent user registry, and the per-connection
//! command dispatcher that client and storage-server sockets both speak.
//! It holds no file content itself; every byte of a document lives on a
//! storage server, reached through [`ss_pool::SsPool`]'s forwarding
//! channel.
//!
//! # Design
//!
//! [`index::FilenameIndex`] pairs a generic [`trie::Trie`] (the source of
//! truth) with a bounded LRU cache of recently resolved handles. ACL and
//! access-request logic lives as methods on [`metadata::FileMetadata`]
//! itself (see [`acl`]) rather than a separate engine type, mirroring how
//! compact the original per-object operations were. [`server::NmServer`]
//! ties these together behind one `Arc`, with [`ops`] providing the
//! command table [`server::NmServer::dispatch`] matches against.
//!
//! # Errors
//!
//! Every fallible operation returns [`common::DocError`]; the dispatcher is
//! the single place that renders one into a wire response.

pub mod acl;
pub mod config;
pub mod exec;
pub mod index;
pub mod metadata;
pub mod ops;
pub mod registry;
pub mod server;
pub mod ss_pool;
pub mod trie;

pub use server::NmServer;
