#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `common` holds the one piece of vocabulary every other crate in the
//! workspace needs to agree on: the numeric response-code taxonomy shared by
//! the NM and SS wire protocols, the [`DocError`] type that pairs one of
//! those codes with a detail string, and the timestamp formatting used by
//! log lines, the user registry, and undo/checkpoint records.
//!
//! # Design
//!
//! [`error::ErrorCode`] is a `#[repr(i32)]` enum so its discriminant is the
//! exact byte that goes out on the wire (`code:message\n` on the NM side,
//! `ERROR:<text>` on the SS side, the two rendered by
//! [`error::DocError::render_nm`] and [`error::DocError::render_ss`]
//! respectively). [`timestamp`] centralizes the single
//! `strftime`-equivalent format string used across the log file, the undo
//! ring, and the persisted user registry, so the three never drift apart.
//!
//! # Invariants
//!
//! - An [`error::ErrorCode`] numeric value never changes once assigned; NM
//!   and SS both compile against this crate, so they can never disagree
//!   about what a code means.
//! - [`error::DocError`] never allocates more than the detail string it is
//!   given.
//!
//! # Errors
//!
//! This crate defines the error type other crates propagate; it has no
//! fallible operations of its own.

pub mod error;
pub mod timestamp;

pub use error::{DocError, ErrorCode};
