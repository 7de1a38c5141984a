//! The response-code taxonomy shared by the NM and SS wire protocols.
//!
//! # Upstream reference
//!
//! The numeric values below are part of the wire protocol itself (see
//! `spec.md` §7); they must not be renumbered even if variants are added,
//! since a deployed client matches on the integer prefix of an NM response
//! line.

use std::fmt;

/// A response code shared by every NM reply and every SS `ERROR:` frame.
///
/// `Success` is the only variant with no attached detail; every other
/// variant is wrapped in a [`DocError`] together with a human-readable
/// detail string before it is rendered onto the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// The request completed normally (code 0).
    Success = 0,
    /// The requested filename is not present in the trie, or not on the SS
    /// that claims to hold it (code 1).
    FileNotFound = 1,
    /// The caller has no ACL entry for the file and is not its owner
    /// (code 2).
    Unauthorized = 2,
    /// `CREATE` or `CHECKPOINT` collided with an existing name (code 3).
    FileExists = 3,
    /// The target sentence is held by another client's WRITE session
    /// (code 4).
    FileLocked = 4,
    /// No active storage server can serve this file (code 5).
    SsNotFound = 5,
    /// A client id referenced by a request is not registered (code 6).
    ClientNotFound = 6,
    /// The request was malformed or semantically nonsensical (code 7).
    InvalidOperation = 7,
    /// Forwarding a command to a storage server failed at the transport
    /// layer; distinct from a logical `FileNotFound` (code 8).
    SsDisconnected = 8,
    /// A non-owner attempted an owner-only action (code 9).
    PermissionDenied = 9,
    /// A sentence index was out of range for the target file (code 10).
    InvalidSentence = 10,
    /// An OS failure, resource exhaustion, or other condition with no more
    /// specific code (undo-ring-empty included) (code 99).
    SystemError = 99,
}

impl ErrorCode {
    /// Returns the numeric code as sent on the wire.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns a short, stable description suitable for log lines.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::FileNotFound => "file not found",
            Self::Unauthorized => "unauthorized",
            Self::FileExists => "file exists",
            Self::FileLocked => "file locked",
            Self::SsNotFound => "no active storage server",
            Self::ClientNotFound => "client not found",
            Self::InvalidOperation => "invalid operation",
            Self::SsDisconnected => "storage server disconnected",
            Self::PermissionDenied => "permission denied",
            Self::InvalidSentence => "invalid sentence index",
            Self::SystemError => "system error",
        }
    }

    /// Maps an SS `ERROR:<text>` payload to the code the NM forwards to the
    /// client, by matching on the leading token of `text`.
    ///
    /// SS and NM share the same enum, so this only exists because the SS
    /// wire format carries the code as a word (`FILE_LOCKED`) rather than as
    /// the integer the NM protocol uses; unrecognized text maps to
    /// [`Self::SystemError`] rather than panicking, since a corrupted or
    /// future SS error string must never crash the NM.
    #[must_use]
    pub fn from_ss_tag(tag: &str) -> Self {
        match tag {
            "FILE_NOT_FOUND" => Self::FileNotFound,
            "UNAUTHORIZED" => Self::Unauthorized,
            "FILE_EXISTS" => Self::FileExists,
            "FILE_LOCKED" => Self::FileLocked,
            "INVALID_OPERATION" => Self::InvalidOperation,
            "INVALID_SENTENCE" => Self::InvalidSentence,
            _ => Self::SystemError,
        }
    }

    /// Maps a wire-level numeric code back to [`ErrorCode`], the inverse of
    /// [`Self::as_i32`]; used by a client decoding an NM `<code>:<message>`
    /// response line.
    ///
    /// Unrecognized values map to [`Self::SystemError`] rather than
    /// panicking, since a future or corrupted code must not crash a client.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::FileNotFound,
            2 => Self::Unauthorized,
            3 => Self::FileExists,
            4 => Self::FileLocked,
            5 => Self::SsNotFound,
            6 => Self::ClientNotFound,
            7 => Self::InvalidOperation,
            8 => Self::SsDisconnected,
            9 => Self::PermissionDenied,
            10 => Self::InvalidSentence,
            _ => Self::SystemError,
        }
    }

    /// The SS-side tag rendered after `ERROR:` for this code.
    #[must_use]
    pub const fn ss_tag(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::FileExists => "FILE_EXISTS",
            Self::FileLocked => "FILE_LOCKED",
            Self::SsNotFound => "SS_NOT_FOUND",
            Self::ClientNotFound => "CLIENT_NOT_FOUND",
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::SsDisconnected => "SS_DISCONNECTED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::InvalidSentence => "INVALID_SENTENCE",
            Self::SystemError => "SYSTEM_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// An error carrying a wire [`ErrorCode`] and a human-readable detail.
///
/// `DocError` is the one error type the NM and SS handlers return; every
/// fallible handler in `nm` and `ss` resolves to `Result<T, DocError>`, and
/// the connection dispatcher is the single place that calls [`Self::render`]
/// to turn it into wire bytes.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{code}: {detail}")]
pub struct DocError {
    code: ErrorCode,
    detail: String,
}

impl DocError {
    /// Builds a new error from a code and a detail message.
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// The wire code this error carries.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// The human-readable detail attached to this error.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Renders this error as an NM response line body: `<code>:<detail>`.
    #[must_use]
    pub fn render_nm(&self) -> String {
        format!("{}:{}", self.code.as_i32(), self.detail)
    }

    /// Renders this error as an SS frame: `ERROR:<tag> <detail>`.
    #[must_use]
    pub fn render_ss(&self) -> String {
        format!("ERROR:{} {}", self.code.ss_tag(), self.detail)
    }

    /// Shorthand for [`ErrorCode::FileNotFound`].
    #[must_use]
    pub fn file_not_found(name: &str) -> Self {
        Self::new(ErrorCode::FileNotFound, format!("no such file '{name}'"))
    }

    /// Shorthand for [`ErrorCode::Unauthorized`].
    #[must_use]
    pub fn unauthorized(name: &str) -> Self {
        Self::new(
            ErrorCode::Unauthorized,
            format!("no access granted for '{name}'"),
        )
    }

    /// Shorthand for [`ErrorCode::InvalidOperation`].
    #[must_use]
    pub fn invalid_operation(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidOperation, detail)
    }

    /// Shorthand for [`ErrorCode::SystemError`].
    #[must_use]
    pub fn system_error(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::SystemError, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nm_render_is_code_colon_detail() {
        let err = DocError::file_not_found("a.txt");
        assert_eq!(err.render_nm(), "1:no such file 'a.txt'");
    }

    #[test]
    fn ss_render_round_trips_through_from_ss_tag() {
        let err = DocError::new(ErrorCode::FileLocked, "sentence 0 held by c3");
        let rendered = err.render_ss();
        assert_eq!(rendered, "ERROR:FILE_LOCKED sentence 0 held by c3");
        let tag = rendered
            .strip_prefix("ERROR:")
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap();
        assert_eq!(ErrorCode::from_ss_tag(tag), ErrorCode::FileLocked);
    }

    #[test]
    fn unknown_ss_tag_maps_to_system_error() {
        assert_eq!(ErrorCode::from_ss_tag("BOGUS"), ErrorCode::SystemError);
    }

    #[test]
    fn from_i32_round_trips_as_i32() {
        for code in [
            ErrorCode::Success,
            ErrorCode::FileNotFound,
            ErrorCode::Unauthorized,
            ErrorCode::FileExists,
            ErrorCode::FileLocked,
            ErrorCode::SsNotFound,
            ErrorCode::ClientNotFound,
            ErrorCode::InvalidOperation,
            ErrorCode::SsDisconnected,
            ErrorCode::PermissionDenied,
            ErrorCode::InvalidSentence,
            ErrorCode::SystemError,
        ] {
            assert_eq!(ErrorCode::from_i32(code.as_i32()), code);
        }
    }

    #[test]
    fn unknown_i32_maps_to_system_error() {
        assert_eq!(ErrorCode::from_i32(123), ErrorCode::SystemError);
    }
}
