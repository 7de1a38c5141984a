//! The storage server's wire dialect, used both on the NM↔SS forwarding
//! channel and on direct client↔SS connections (`STREAM`, raw `READ`).
//!
//! Unlike the NM dialect, SS replies are not uniformly tagged: a status
//! reply is one of [`StatusFrame`]'s variants, but `READ` and `STREAM`
//! instead send raw payload lines with no wrapping tag at all. This module
//! only models the frames that do carry a fixed shape.

use common::{DocError, ErrorCode};

/// A tagged status reply: everything on the SS wire except raw content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusFrame {
    /// The request completed with no further payload expected.
    Success,
    /// A `WRITE_LOCK`/`WRITE` acquired the sentence lock.
    Locked,
    /// A `WRITE_UNLOCK` released the sentence lock.
    Unlocked,
    /// A stream has no more words to emit.
    Stop,
    /// The request failed; carries the same [`DocError`] the NM forwards.
    Error(DocError),
}

impl StatusFrame {
    /// Renders this frame as the line body (without the trailing newline).
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Success => "SUCCESS".to_string(),
            Self::Locked => "LOCKED".to_string(),
            Self::Unlocked => "UNLOCKED".to_string(),
            Self::Stop => "STOP".to_string(),
            Self::Error(err) => err.render_ss(),
        }
    }

    /// Parses a line previously produced by [`Self::render`].
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if `line` is not one of the recognized frame
    /// shapes; callers that expect raw payload instead of a status frame
    /// should not call this at all.
    pub fn parse(line: &str) -> Result<Self, ()> {
        match line {
            "SUCCESS" => Ok(Self::Success),
            "LOCKED" => Ok(Self::Locked),
            "UNLOCKED" => Ok(Self::Unlocked),
            "STOP" => Ok(Self::Stop),
            _ => {
                let rest = line.strip_prefix("ERROR:").ok_or(())?;
                let mut parts = rest.splitn(2, ' ');
                let tag = parts.next().unwrap_or_default();
                let detail = parts.next().unwrap_or_default();
                Ok(Self::Error(DocError::new(
                    ErrorCode::from_ss_tag(tag),
                    detail.to_string(),
                )))
            }
        }
    }
}

/// The `INFO` payload: `SIZE:<bytes> WORDS:<n> CHARS:<n>[ LAST_ACCESS:<epoch>]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfoPayload {
    /// Canonical byte size of the stored file.
    pub size: u64,
    /// Total word count across all sentences in the file.
    pub words: u64,
    /// Number of characters (equal to `size` per spec.md §4.6).
    pub chars: u64,
    /// Unix epoch seconds of the last access, if tracked.
    pub last_access: Option<i64>,
}

impl InfoPayload {
    /// Renders this payload as the line body.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("SIZE:{} WORDS:{} CHARS:{}", self.size, self.words, self.chars);
        if let Some(ts) = self.last_access {
            out.push_str(&format!(" LAST_ACCESS:{ts}"));
        }
        out
    }

    /// Parses a line previously produced by [`Self::render`].
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if any of the `SIZE`/`WORDS`/`CHARS` fields are
    /// missing or not a valid integer.
    pub fn parse(line: &str) -> Result<Self, ()> {
        let mut size = None;
        let mut words = None;
        let mut chars = None;
        let mut last_access = None;
        for token in line.split_whitespace() {
            if let Some(v) = token.strip_prefix("SIZE:") {
                size = v.parse().ok();
            } else if let Some(v) = token.strip_prefix("WORDS:") {
                words = v.parse().ok();
            } else if let Some(v) = token.strip_prefix("CHARS:") {
                chars = v.parse().ok();
            } else if let Some(v) = token.strip_prefix("LAST_ACCESS:") {
                last_access = v.parse().ok();
            }
        }
        Ok(Self {
            size: size.ok_or(())?,
            words: words.ok_or(())?,
            chars: chars.ok_or(())?,
            last_access,
        })
    }
}

/// The redirect frame an NM sends a client so it can reach an SS directly:
/// `SS_INFO <ipv4> <port>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SsInfo {
    /// The storage server's advertised IPv4 address.
    pub ip: String,
    /// The storage server's client-facing port.
    pub port: u16,
}

impl SsInfo {
    /// Renders this frame as the line body.
    #[must_use]
    pub fn render(&self) -> String {
        format!("SS_INFO {} {}", self.ip, self.port)
    }

    /// Parses a line previously produced by [`Self::render`].
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the line is not `SS_INFO <ip> <port>` with a
    /// valid port number.
    pub fn parse(line: &str) -> Result<Self, ()> {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("SS_INFO") {
            return Err(());
        }
        let ip = parts.next().ok_or(())?.to_string();
        let port = parts.next().ok_or(())?.parse().map_err(|_| ())?;
        if parts.next().is_some() {
            return Err(());
        }
        Ok(Self { ip, port })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_frame_round_trips() {
        for frame in [
            StatusFrame::Success,
            StatusFrame::Locked,
            StatusFrame::Unlocked,
            StatusFrame::Stop,
        ] {
            assert_eq!(StatusFrame::parse(&frame.render()).unwrap(), frame);
        }
    }

    #[test]
    fn status_frame_error_round_trips_tag() {
        let frame = StatusFrame::Error(DocError::new(ErrorCode::FileLocked, "sentence 2"));
        let rendered = frame.render();
        assert_eq!(rendered, "ERROR:FILE_LOCKED sentence 2");
        let parsed = StatusFrame::parse(&rendered).unwrap();
        match parsed {
            StatusFrame::Error(err) => {
                assert_eq!(err.code(), ErrorCode::FileLocked);
                assert_eq!(err.detail(), "sentence 2");
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn info_payload_round_trips_without_last_access() {
        let info = InfoPayload {
            size: 128,
            words: 4,
            chars: 128,
            last_access: None,
        };
        assert_eq!(info.render(), "SIZE:128 WORDS:4 CHARS:128");
        assert_eq!(InfoPayload::parse(&info.render()).unwrap(), info);
    }

    #[test]
    fn info_payload_round_trips_with_last_access() {
        let info = InfoPayload {
            size: 10,
            words: 1,
            chars: 10,
            last_access: Some(1_700_000_000),
        };
        let rendered = info.render();
        assert_eq!(rendered, "SIZE:10 WORDS:1 CHARS:10 LAST_ACCESS:1700000000");
        assert_eq!(InfoPayload::parse(&rendered).unwrap(), info);
    }

    #[test]
    fn ss_info_round_trips() {
        let info = SsInfo {
            ip: "10.0.0.5".to_string(),
            port: 9101,
        };
        assert_eq!(info.render(), "SS_INFO 10.0.0.5 9101");
        assert_eq!(SsInfo::parse(&info.render()).unwrap(), info);
    }

    #[test]
    fn ss_info_rejects_malformed_line() {
        assert!(SsInfo::parse("SS_INFO 10.0.0.5").is_err());
        assert!(SsInfo::parse("SOMETHING_ELSE").is_err());
    }
}
