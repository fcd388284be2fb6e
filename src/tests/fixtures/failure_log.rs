// Shared test fixture for failure-log text.

/// 2024-01-01T00:00:00Z as it appears in the failure log.
pub const FOO_FAILED_AT: &str = "2024-01-01 00:00:00.0000000000";

pub fn failure_line(log_time: &str, pkgbase: &str, log_file: &str) -> String {
    format!("{log_time} ./.status/logs/{pkgbase}/{log_file}")
}
