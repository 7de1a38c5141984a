#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Append-only operation logging for the name server and storage server.
//!
//! # Overview
//!
//! Both servers hold one [`Logger`] behind an `Arc` and serialize writes to
//! its backing file through an internal mutex (`log_lock` in spec.md §5's
//! resource table). Every handler logs through [`Logger::record`] (or the
//! [`Level::Info`]/[`Level::Warn`]/[`Level::Error`] convenience methods)
//! rather than writing to the file directly, so the line format in
//! [`LogEvent::render`] is the only place that format is defined.
//!
//! # Design
//!
//! With the `tracing` feature enabled, every recorded event is also emitted
//! as a `tracing` event at the matching level, so a binary can additionally
//! attach `tracing-subscriber` for structured output without changing any
//! call site.
//!
//! # Errors
//!
//! [`Logger::record`] never panics on a write failure; a failed append is
//! itself swallowed after one attempt, since a logging failure must not take
//! down the server it is trying to diagnose.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Severity of a recorded [`LogEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// Routine, expected activity (a successful CREATE, a clean QUIT).
    Info,
    /// Recoverable trouble a human may want to know about (an SS reconnect,
    /// a denied access request).
    Warn,
    /// A propagated [`common::ErrorCode`] or unrecoverable condition.
    Error,
}

impl Level {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// One structured log line, matching spec.md §6's
/// `[YYYY-MM-DD HH:MM:SS] [LEVEL] IP=… Port=… User=… Op=… Details=…` format.
#[derive(Clone, Debug)]
pub struct LogEvent {
    /// When the event was recorded, as Unix epoch seconds.
    pub timestamp: i64,
    /// Severity of the event.
    pub level: Level,
    /// Peer IP address, or `-` when not applicable (e.g. a boot-time event).
    pub ip: String,
    /// Peer port, or `0` when not applicable.
    pub port: u16,
    /// The acting username, or `-` for unauthenticated/system events.
    pub user: String,
    /// The operation name (`CREATE`, `WRITE_LOCK`, `UNDO`, …).
    pub op: String,
    /// Free-form detail text (never contains a newline).
    pub details: String,
}

impl LogEvent {
    /// Renders this event as one append-only log line, including the
    /// trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "[{}] [{}] IP={} Port={} User={} Op={} Details={}\n",
            common::timestamp::format_log_timestamp(self.timestamp),
            self.level.as_str(),
            self.ip,
            self.port,
            self.user,
            self.op,
            self.details.replace('\n', " "),
        )
    }
}

/// A description of the peer/operation context a handler logs under.
///
/// Most handlers hold one of these for the lifetime of a connection and
/// reuse it for every event the connection produces.
#[derive(Clone, Debug, Default)]
pub struct LogContext {
    /// Peer IP address.
    pub ip: String,
    /// Peer port.
    pub port: u16,
    /// Acting username, if known at this point in the handshake.
    pub user: String,
}

impl LogContext {
    /// Creates a context for a connection whose peer is known but whose
    /// user is not yet registered.
    #[must_use]
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            user: "-".to_string(),
        }
    }

    /// Returns a copy of this context with the username filled in, once a
    /// connection identifies itself via `REGISTER_CLIENT`/`REGISTER_SS`.
    #[must_use]
    pub fn with_user(&self, user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..self.clone()
        }
    }
}

/// An append-only log sink backed by a single file, shared across every
/// connection worker via `Arc<Logger>`.
pub struct Logger {
    file: Mutex<File>,
}

impl Logger {
    /// Opens (creating if absent) the log file at `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`std::io::Error`] if the file cannot be
    /// opened.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Records one event: appends its rendered line to the log file and, on
    /// the `tracing` feature, emits a matching `tracing` event.
    pub fn record(&self, event: &LogEvent) {
        #[cfg(feature = "tracing")]
        {
            match event.level {
                Level::Info => tracing::info!(
                    ip = %event.ip, port = event.port, user = %event.user,
                    op = %event.op, details = %event.details
                ),
                Level::Warn => tracing::warn!(
                    ip = %event.ip, port = event.port, user = %event.user,
                    op = %event.op, details = %event.details
                ),
                Level::Error => tracing::error!(
                    ip = %event.ip, port = event.port, user = %event.user,
                    op = %event.op, details = %event.details
                ),
            }
        }

        let line = event.render();
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }

    /// Convenience for an [`Level::Info`] event.
    pub fn info(&self, ctx: &LogContext, op: &str, details: impl Into<String>) {
        self.record(&LogEvent {
            timestamp: common::timestamp::now_epoch(),
            level: Level::Info,
            ip: ctx.ip.clone(),
            port: ctx.port,
            user: ctx.user.clone(),
            op: op.to_string(),
            details: details.into(),
        });
    }

    /// Convenience for a [`Level::Warn`] event.
    pub fn warn(&self, ctx: &LogContext, op: &str, details: impl Into<String>) {
        self.record(&LogEvent {
            timestamp: common::timestamp::now_epoch(),
            level: Level::Warn,
            ip: ctx.ip.clone(),
            port: ctx.port,
            user: ctx.user.clone(),
            op: op.to_string(),
            details: details.into(),
        });
    }

    /// Convenience for a [`Level::Error`] event, typically constructed from
    /// a propagated [`common::DocError`].
    pub fn error(&self, ctx: &LogContext, op: &str, details: impl Into<String>) {
        self.record(&LogEvent {
            timestamp: common::timestamp::now_epoch(),
            level: Level::Error,
            ip: ctx.ip.clone(),
            port: ctx.port,
            user: ctx.user.clone(),
            op: op.to_string(),
            details: details.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn render_matches_bracketed_format() {
        let event = LogEvent {
            timestamp: 1_609_459_200,
            level: Level::Warn,
            ip: "127.0.0.1".to_string(),
            port: 5000,
            user: "alice".to_string(),
            op: "WRITE_LOCK".to_string(),
            details: "sentence 0 locked".to_string(),
        };
        assert_eq!(
            event.render(),
            "[2021-01-01 00:00:00] [WARN] IP=127.0.0.1 Port=5000 User=alice Op=WRITE_LOCK Details=sentence 0 locked\n"
        );
    }

    #[test]
    fn logger_appends_lines_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ss_log.txt");
        let logger = Logger::open(&path).unwrap();
        let ctx = LogContext::new("10.0.0.1", 4000).with_user("bob");
        logger.info(&ctx, "CREATE", "created 'hello.txt'");
        logger.error(&ctx, "DELETE", "file not found");

        let mut contents = String::new();
        File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[INFO]") && lines[0].contains("Op=CREATE"));
        assert!(lines[1].contains("[ERROR]") && lines[1].contains("Op=DELETE"));
    }

    #[test]
    fn newlines_in_details_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::open(dir.path().join("log.txt")).unwrap();
        let ctx = LogContext::new("-", 0);
        logger.info(&ctx, "BOOT", "line one\nline two");
        // The public API has no direct read-back; render() is exercised
        // independently above for the embedded-newline guarantee.
        let event = LogEvent {
            timestamp: 0,
            level: Level::Info,
            ip: "-".into(),
            port: 0,
            user: "-".into(),
            op: "BOOT".into(),
            details: "line one\nline two".into(),
        };
        assert_eq!(event.render().matches('\n').count(), 1);
    }
}
