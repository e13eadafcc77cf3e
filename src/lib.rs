//! # logler
//!
//! A leveled, structured logging facade for backend services.
//!
//! Application code emits one [`Event`] per occurrence and the [`Client`]
//! fans it out:
//!
//! - **Console**: every event, one line, stdout or stderr by severity
//! - **Syslog / Loggly**: Info, Warn and Error events with probability
//!   `sample_rate / 100`; Emergency events always
//! - **Analytics warehouse**: allow-listed fields of events sent through
//!   [`Client::analytics`], via an external batching [`RowStreamer`]
//!
//! Logging never returns an error to the caller and never panics because a
//! sink misbehaved.

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        AnalyticsConfig, CallSite, Client, ClientBuilder, ClientOptions, Destination,
        DiagnosticCallback, Event, Facility, FieldValue, LogSampler, LoglerError, Result,
        RouterMetrics, SamplerMetrics, Severity, Sink, SyslogOptions, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::sinks::{
        AggregatorSink, AnalyticsRow, ConsoleSink, RowStreamer, StreamerFactory, SyslogSink,
    };
}

pub use crate::core::{
    AnalyticsConfig, CallSite, Client, ClientBuilder, ClientOptions, Destination,
    DiagnosticCallback, Event, Facility, FieldValue, LogSampler, LoglerError, Result,
    RouterMetrics, SamplerMetrics, Severity, Sink, SyslogOptions, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use crate::sinks::{AnalyticsRow, RowStreamer, StreamerFactory};
