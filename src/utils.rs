/// Utility functions for time handling and formatting
use time::{format_description, OffsetDateTime};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]")
        .expect("Failed to create format description");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Whole seconds elapsed between two timestamps
///
/// Helper for the elapsed-time gates used by the trend tracker, the sample
/// store and the scan duty cycle.
pub fn seconds_since(earlier: OffsetDateTime, now: OffsetDateTime) -> i64 {
    (now - earlier).whole_seconds()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_since_counts_whole_seconds() {
        let t0 = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let t1 = OffsetDateTime::from_unix_timestamp(1_700_000_360).unwrap();
        assert_eq!(seconds_since(t0, t1), 360);
        assert_eq!(seconds_since(t1, t0), -360);
    }

    #[test]
    fn format_datetime_is_stable() {
        let dt = OffsetDateTime::from_unix_timestamp(0).unwrap();
        assert_eq!(format_datetime(&dt), "01.01.1970 - 00:00:00");
    }
}
