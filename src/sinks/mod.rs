//! Sink implementations

pub mod aggregator;
pub mod analytics;
pub mod console;
pub mod syslog;

pub use aggregator::AggregatorSink;
pub use analytics::{
    build_row, AnalyticsPipeline, AnalyticsRow, ErrorReporter, RowStreamer, StreamerFactory,
    ALLOW_LIST,
};
pub use console::ConsoleSink;
pub use syslog::{SyslogSink, SyslogTarget};

pub use crate::core::Sink;

/// Hostname written into network syslog lines
pub(crate) fn resolve_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
