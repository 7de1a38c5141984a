//! The one error type every client-facing operation resolves to.

use common::DocError;

/// Failure modes a client operation can surface: a transport failure talking
/// to the name server or a storage server, or a propagated [`DocError`] from
/// either side's wire protocol.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The underlying socket failed.
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
    /// The name server or storage server rejected the request, or replied
    /// with a frame this client could not parse.
    #[error("{0}")]
    Protocol(#[from] DocError),
    /// The peer closed the connection before a reply arrived.
    #[error("connection closed by peer")]
    Disconnected,
}
