//! Core router types and traits

pub mod call_site;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod sampling;
pub mod severity;
pub mod sink;

pub use call_site::CallSite;
pub use client::{Client, ClientBuilder, DiagnosticCallback, DEFAULT_SHUTDOWN_TIMEOUT};
pub use config::{
    AnalyticsConfig, ClientOptions, Destination, Facility, SyslogOptions, DEFAULT_LOGGLY_ENDPOINT,
    DEFAULT_SAMPLE_RATE,
};
pub use error::{LoglerError, Result};
pub use event::{Event, FieldValue};
pub use metrics::RouterMetrics;
pub use sampling::{LogSampler, SamplerMetrics};
pub use severity::Severity;
pub use sink::Sink;
