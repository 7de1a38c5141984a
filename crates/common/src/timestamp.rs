//! The single timestamp format shared by log lines, the user registry, and
//! undo/checkpoint records.
//!
//! Every persisted timestamp in the workspace is a Unix epoch second; this
//! module only centralizes the `[YYYY-MM-DD HH:MM:SS]` rendering spec.md §6
//! specifies for log lines, so the three call sites can't drift apart.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const LOG_FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Returns the current time as Unix epoch seconds.
#[must_use]
pub fn now_epoch() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Renders an epoch-seconds timestamp as `YYYY-MM-DD HH:MM:SS` (UTC), the
/// body of the `[…]` bracket at the start of every log line.
#[must_use]
pub fn format_log_timestamp(epoch_seconds: i64) -> String {
    OffsetDateTime::from_unix_timestamp(epoch_seconds)
        .map(|dt| dt.format(LOG_FORMAT).unwrap_or_else(|_| epoch_seconds.to_string()))
        .unwrap_or_else(|_| epoch_seconds.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_known_epoch() {
        // 2021-01-01T00:00:00Z
        assert_eq!(format_log_timestamp(1_609_459_200), "2021-01-01 00:00:00");
    }

    #[test]
    fn now_epoch_is_positive() {
        assert!(now_epoch() > 0);
    }
}
