//! Leveled event router

use super::{
    call_site::CallSite,
    config::{AnalyticsConfig, ClientOptions},
    error::{LoglerError, Result},
    event::Event,
    metrics::RouterMetrics,
    sampling::{LogSampler, MAX_SAMPLE_RATE},
    severity::Severity,
    sink::Sink,
};
use crate::sinks::analytics::{build_row, AnalyticsPipeline, StreamerFactory};
use crate::sinks::{AggregatorSink, ConsoleSink, SyslogSink};
use std::sync::Arc;
use std::time::Duration;

/// Default time allowed for background work to stop when the client is
/// dropped without an explicit [`Client::shutdown`]
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Called with every diagnostic the client prints about itself
pub type DiagnosticCallback = Arc<dyn Fn(&LoglerError) + Send + Sync>;

/// Fans structured events out to the configured sinks
///
/// The console always receives every non-empty event. Syslog and Loggly
/// ("remote" sinks) receive Info/Warn/Error events subject to sampling and
/// Emergency events unconditionally. Analytics events go to the warehouse
/// streamer and to the console.
///
/// Logging never fails from the caller's point of view: empty events,
/// serialization errors and sink failures are reported on stderr (and to the
/// diagnostic callback) and otherwise swallowed.
///
/// # Example
///
/// ```
/// use logler::{Client, ClientOptions, SyslogOptions, Event};
///
/// let client = Client::new(
///     ClientOptions::new("billing")
///         .with_sample_rate(100)
///         .with_syslog(SyslogOptions::disabled()),
/// );
///
/// client.info(logler::call_site!(), Event::new().with_field("action", "invoice.created"));
/// logler::warn!(client, "action" => "retry", "attempt" => 2);
/// ```
pub struct Client {
    component: String,
    minimal_log: bool,
    console: Box<dyn Sink>,
    remote: Vec<Box<dyn Sink>>,
    sampler: LogSampler,
    analytics: Option<AnalyticsPipeline>,
    metrics: Arc<RouterMetrics>,
    on_diagnostic: Option<DiagnosticCallback>,
    shut_down: bool,
}

impl Client {
    /// Build a client from options, connecting the sinks they describe
    #[must_use]
    pub fn new(options: ClientOptions) -> Self {
        Self::builder().options(options).build()
    }

    pub fn trace(&self, site: CallSite, event: Event) {
        self.log(Severity::Trace, site, event);
    }

    pub fn info(&self, site: CallSite, event: Event) {
        self.log(Severity::Info, site, event);
    }

    pub fn warn(&self, site: CallSite, event: Event) {
        self.log(Severity::Warn, site, event);
    }

    pub fn error(&self, site: CallSite, event: Event) {
        self.log(Severity::Error, site, event);
    }

    pub fn emergency(&self, site: CallSite, event: Event) {
        self.log(Severity::Emergency, site, event);
    }

    /// Route `event` at `severity`, attributing it to `site`
    ///
    /// `site` is usually [`call_site!`](crate::call_site), which the
    /// severity macros supply on their own.
    pub fn log(&self, severity: Severity, site: CallSite, mut event: Event) {
        if event.is_empty() {
            self.drop_event(LoglerError::EmptyEvent);
            return;
        }

        if !self.minimal_log {
            event.annotate(&site);
        }

        let encoded = match event.to_json() {
            Ok(encoded) => encoded,
            Err(e) => {
                self.drop_event(LoglerError::other(format!(
                    "Could not marshal {:?}: {}",
                    event, e
                )));
                return;
            }
        };

        self.dispatch(self.console.as_ref(), severity, &encoded);
        self.metrics.record_routed();

        if !severity.is_remote() {
            return;
        }

        // One independent sampling decision per remote sink
        for sink in &self.remote {
            if self.sampler.should_sample(severity) {
                if self.dispatch(sink.as_ref(), severity, &encoded) {
                    self.metrics.record_remote_write();
                }
            } else {
                self.metrics.record_remote_skipped();
            }
        }
    }

    /// Send an event to the analytics warehouse
    ///
    /// Only allow-listed fields reach the warehouse row. The full event is
    /// also written to the console at Info.
    pub fn analytics(&self, event: Event) {
        if event.is_empty() {
            self.drop_event(LoglerError::EmptyEvent);
            return;
        }

        if let Some(pipeline) = &self.analytics {
            let row = build_row(&event, chrono::Utc::now());
            match pipeline.send(row) {
                Ok(()) => {
                    self.metrics.record_row_queued();
                }
                Err(e) => {
                    self.metrics.record_row_rejected();
                    self.diagnose(
                        "ERROR",
                        &LoglerError::row_rejected(pipeline.destination().to_string(), e.to_string()),
                    );
                }
            }
        }

        match event.to_json() {
            Ok(encoded) => {
                self.dispatch(self.console.as_ref(), Severity::Info, &encoded);
                self.metrics.record_routed();
            }
            Err(e) => self.drop_event(LoglerError::other(format!(
                "Could not marshal {:?}: {}",
                event, e
            ))),
        }
    }

    /// Write to one sink, isolating its errors and panics from the caller
    ///
    /// Returns `true` if the sink accepted the event.
    fn dispatch(&self, sink: &dyn Sink, severity: Severity, encoded: &str) -> bool {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            sink.write(severity, encoded)
        }));

        match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                self.metrics.record_sink_failure();
                self.diagnose(
                    "ERROR",
                    &LoglerError::sink_write(sink.name(), e.to_string()),
                );
                false
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                self.metrics.record_sink_failure();
                self.diagnose(
                    "CRITICAL",
                    &LoglerError::sink_write(
                        sink.name(),
                        format!("panicked: {}. Other sinks continue to function.", panic_msg),
                    ),
                );
                false
            }
        }
    }

    fn drop_event(&self, error: LoglerError) {
        self.metrics.record_dropped();
        self.diagnose("ERROR", &error);
    }

    fn diagnose(&self, level: &str, error: &LoglerError) {
        report(level, error, self.on_diagnostic.as_ref());
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn sample_rate(&self) -> u8 {
        self.sampler.rate()
    }

    pub fn is_minimal(&self) -> bool {
        self.minimal_log
    }

    /// Names of the remote sinks that connected at construction
    pub fn remote_sinks(&self) -> Vec<&str> {
        self.remote.iter().map(|sink| sink.name()).collect()
    }

    pub fn has_analytics(&self) -> bool {
        self.analytics.is_some()
    }

    pub fn metrics(&self) -> &RouterMetrics {
        &self.metrics
    }

    pub fn sampler(&self) -> &LogSampler {
        &self.sampler
    }

    /// Flush every sink, returning the first failure
    ///
    /// A failing sink does not stop the others from being flushed.
    pub fn flush(&self) -> Result<()> {
        let mut first_error = None;
        for sink in std::iter::once(&self.console).chain(&self.remote) {
            if let Err(e) = sink.flush() {
                let error = LoglerError::sink_write(sink.name(), format!("flush failed: {}", e));
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Stop the analytics pipeline and flush every sink
    ///
    /// Returns `true` if everything stopped within `timeout`.
    ///
    /// # Example
    ///
    /// ```
    /// use logler::{Client, ClientOptions, SyslogOptions};
    /// use std::time::Duration;
    ///
    /// let mut client = Client::new(
    ///     ClientOptions::new("worker").with_syslog(SyslogOptions::disabled()),
    /// );
    /// assert!(client.shutdown(Duration::from_secs(1)));
    /// ```
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        if self.shut_down {
            return true;
        }
        self.shut_down = true;

        let mut clean = true;
        if let Some(pipeline) = self.analytics.as_mut() {
            clean &= pipeline.shutdown(timeout);
        }

        if let Err(e) = self.flush() {
            self.diagnose("ERROR", &LoglerError::other(format!("Failed to flush during shutdown: {}", e)));
            clean = false;
        }

        clean
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGLER WARNING] Client shutting down with {} dropped events (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}

fn report(level: &str, error: &LoglerError, callback: Option<&DiagnosticCallback>) {
    eprintln!("[LOGLER {}] {}", level, error);
    if let Some(callback) = callback {
        callback(error);
    }
}

/// Builder for constructing a [`Client`]
///
/// Sinks named in the options are connected in [`build`](Self::build). A
/// sink that cannot be reached is left out and a warning is printed; the
/// client is still usable.
///
/// # Example
/// ```
/// use logler::prelude::*;
/// use std::sync::Arc;
///
/// let client = Client::builder()
///     .options(ClientOptions::new("api").with_syslog(SyslogOptions::disabled()))
///     .sample_rate(25)
///     .minimal_log(true)
///     .on_diagnostic(Arc::new(|err| {
///         let _ = err;
///     }))
///     .build();
///
/// assert_eq!(client.sample_rate(), 25);
/// assert!(client.is_minimal());
/// ```
pub struct ClientBuilder {
    options: ClientOptions,
    console: Option<Box<dyn Sink>>,
    remote: Vec<Box<dyn Sink>>,
    analytics: Option<(AnalyticsConfig, StreamerFactory)>,
    seed: Option<u64>,
    on_diagnostic: Option<DiagnosticCallback>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            options: ClientOptions::default(),
            console: None,
            remote: Vec::new(),
            analytics: None,
            seed: None,
            on_diagnostic: None,
        }
    }

    /// Replace all options at once
    #[must_use = "builder methods return a new value"]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.options.component = component.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sample_rate(mut self, rate: u8) -> Self {
        self.options.sample_rate = rate;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn minimal_log(mut self, minimal: bool) -> Self {
        self.options.minimal_log = minimal;
        self
    }

    /// Use `sink` instead of stdout/stderr
    #[must_use = "builder methods return a new value"]
    pub fn console<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.console = Some(Box::new(sink));
        self
    }

    /// Add a sampled remote sink in addition to those in the options
    #[must_use = "builder methods return a new value"]
    pub fn remote_sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.remote.push(Box::new(sink));
        self
    }

    /// Enable the analytics path
    ///
    /// `factory` builds the row streamer from `config` once the credential
    /// file has been checked.
    #[must_use = "builder methods return a new value"]
    pub fn analytics(mut self, config: AnalyticsConfig, factory: StreamerFactory) -> Self {
        self.analytics = Some((config, factory));
        self
    }

    /// Seed the sampling generator for reproducible decisions
    #[must_use = "builder methods return a new value"]
    pub fn sampling_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Receive every diagnostic the client prints about itself
    #[must_use = "builder methods return a new value"]
    pub fn on_diagnostic(mut self, callback: DiagnosticCallback) -> Self {
        self.on_diagnostic = Some(callback);
        self
    }

    /// Build the Client
    pub fn build(self) -> Client {
        let ClientBuilder {
            mut options,
            console,
            mut remote,
            analytics,
            seed,
            on_diagnostic,
        } = self;
        let warn = |error: &LoglerError| report("WARNING", error, on_diagnostic.as_ref());

        if let Err(e) = options.validate() {
            warn(&e);
            options.sample_rate = options.sample_rate.min(MAX_SAMPLE_RATE);
            options.loggly_token = options.loggly_token.filter(|t| !t.trim().is_empty());
        }

        if options.syslog.enabled {
            match SyslogSink::from_options(&options.syslog, &options.component) {
                Ok(sink) => remote.push(Box::new(sink)),
                Err(e) => warn(&e),
            }
        }

        if let Some(token) = &options.loggly_token {
            match AggregatorSink::connect(&options.loggly_endpoint, token, &options.component) {
                Ok(sink) => remote.push(Box::new(sink)),
                Err(e) => warn(&e),
            }
        }

        let analytics = analytics.and_then(|(config, factory)| {
            match AnalyticsPipeline::start(&config, factory) {
                Ok(pipeline) => Some(pipeline),
                Err(e) => {
                    warn(&LoglerError::other(format!(
                        "analytics disabled: {}. Set {}JWTCONFIG=<path_to_secret.json>",
                        e,
                        AnalyticsConfig::ENV_PREFIX
                    )));
                    None
                }
            }
        });

        let sampler = match seed {
            Some(seed) => LogSampler::with_seed(options.sample_rate, seed),
            None => LogSampler::new(options.sample_rate),
        };

        Client {
            component: options.component,
            minimal_log: options.minimal_log,
            console: console.unwrap_or_else(|| Box::new(ConsoleSink::new())),
            remote,
            sampler,
            analytics,
            metrics: Arc::new(RouterMetrics::new()),
            on_diagnostic,
            shut_down: false,
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a builder for Client
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}
