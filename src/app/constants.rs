pub(crate) const LOG_TIMESTAMP_FORMAT: &str = "%m-%d %H:%M:%S";
pub(crate) const LOG_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const LOG_SEPARATOR: &str = " | ";

pub(crate) const LOG_RETENTION_DAYS: i64 = 7;
pub(crate) const LOG_MAX_ENTRIES: usize = 10_000;

pub(crate) const UNHANDLED_FAILURE_MESSAGE: &str = "Failed with unhandled exception";
pub(crate) const UNKNOWN_HOST_LABEL: &str = "unknown";
