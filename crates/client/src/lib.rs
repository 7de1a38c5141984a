#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Interactive client library: the persistent Client↔NM control connection,
//! the throwaway Client↔SS connections a `READ`/`STREAM`/`WRITE` redirect
//! opens, the `cmd_*`-style command surface built on both, and the terminal
//! REPL `bin/docsys-client` drives.

pub mod commands;
pub mod error;
pub mod nm_session;
pub mod repl;
pub mod ss_session;

pub use commands::WriteSession;
pub use error::ClientError;
pub use nm_session::NmSession;
pub use ss_session::SsSession;
