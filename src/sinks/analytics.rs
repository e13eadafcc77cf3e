//! Analytics warehouse path
//!
//! Events sent through [`Client::analytics`](crate::Client::analytics) are
//! reduced to a fixed allow-list of columns, stamped with a UTC timestamp,
//! and handed to a [`RowStreamer`]. The streamer (batching, insert workers,
//! retry) is an external component; this module only validates its
//! configuration, builds it through a caller-supplied factory and drains the
//! error channel it exposes.

use crate::core::{AnalyticsConfig, Destination, Event, LoglerError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Columns that may reach the warehouse table
pub const ALLOW_LIST: [&str; 20] = [
    "bq",
    "component",
    "appversion",
    "timestamp",
    "category",
    "action",
    "clientip",
    "ua",
    "geoip",
    "label",
    "label1",
    "label2",
    "label3",
    "label4",
    "label5",
    "label6",
    "label7",
    "label8",
    "label9",
    "label10",
];

pub const TIMESTAMP_FIELD: &str = "timestamp";

/// One warehouse row: column name to JSON value
pub type AnalyticsRow = BTreeMap<String, serde_json::Value>;

/// Builds the streamer once the configuration and credentials check out
pub type StreamerFactory =
    Box<dyn FnOnce(&AnalyticsConfig) -> Result<Arc<dyn RowStreamer>> + Send>;

/// Narrow interface to the batching warehouse client
pub trait RowStreamer: Send + Sync {
    /// Enqueue a row for `destination`. Must not wait for the insert.
    fn queue_row(&self, destination: &Destination, row: AnalyticsRow) -> Result<()>;

    /// Channel on which the streamer reports asynchronous insert failures.
    /// Called once, at client construction.
    fn take_errors(&self) -> Option<Receiver<String>> {
        None
    }

    /// Stop background workers; queued rows may be flushed or discarded
    fn stop(&self) {}
}

pub fn is_allowed(field: &str) -> bool {
    ALLOW_LIST.contains(&field)
}

/// Reduce an event to its warehouse row
///
/// Allow-listed values are stringified, everything else is dropped. The
/// `timestamp` column is always overwritten with `now`. Nothing else is added.
pub fn build_row(event: &Event, now: DateTime<Utc>) -> AnalyticsRow {
    let mut row: AnalyticsRow = event
        .fields()
        .iter()
        .filter(|(key, _)| is_allowed(key))
        .map(|(key, value)| (key.clone(), serde_json::Value::String(value.to_string())))
        .collect();

    row.insert(
        TIMESTAMP_FIELD.to_string(),
        serde_json::Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
    row
}

/// The parts of a service-account key file the streamer signs with
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Read and parse the credential file named by `WT_JWTCONFIG`
pub fn load_credentials(path: &Path) -> Result<ServiceAccountKey> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| LoglerError::credentials(&display, e.to_string()))?;
    let key: ServiceAccountKey = serde_json::from_str(&raw)
        .map_err(|e| LoglerError::credentials(&display, e.to_string()))?;
    if key.client_email.is_empty() || key.private_key.is_empty() {
        return Err(LoglerError::credentials(
            display,
            "client_email and private_key must be set",
        ));
    }
    Ok(key)
}

/// Background thread that logs every error the streamer reports
pub struct ErrorReporter {
    shutdown: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
    reported: Arc<AtomicU64>,
}

impl ErrorReporter {
    pub fn spawn(errors: Receiver<String>) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let reported = Arc::new(AtomicU64::new(0));
        let reported_clone = Arc::clone(&reported);

        let handle = thread::Builder::new()
            .name("logler-analytics-errors".to_string())
            .spawn(move || loop {
                select! {
                    recv(shutdown_rx) -> _ => break,
                    recv(errors) -> message => match message {
                        Ok(error) => {
                            eprintln!("[LOGLER ERROR] analytics insert failed: {}", error);
                            reported_clone.fetch_add(1, Ordering::Relaxed);
                        }
                        // Streamer dropped its sender; nothing more will arrive
                        Err(_) => break,
                    },
                }
            })
            .map_err(|e| {
                LoglerError::io_operation("spawning analytics error reporter", "thread spawn failed", e)
            })?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            reported,
        })
    }

    /// Errors logged so far
    pub fn reported_count(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }

    /// Signal the thread and wait up to `timeout` for it to exit
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.try_send(());
        }

        let Some(handle) = self.handle.take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!("[LOGLER ERROR] Analytics error reporter panicked: {:?}", e);
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGLER WARNING] Analytics error reporter did not finish within {:?}",
                    timeout
                );
                return false;
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for ErrorReporter {
    fn drop(&mut self) {
        self.shutdown(crate::core::DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

/// A started streamer plus its error reporter
pub struct AnalyticsPipeline {
    streamer: Arc<dyn RowStreamer>,
    destination: Destination,
    reporter: Option<ErrorReporter>,
}

impl AnalyticsPipeline {
    /// Validate `config`, check the credential file and build the streamer
    pub fn start(config: &AnalyticsConfig, factory: StreamerFactory) -> Result<Self> {
        config.validate()?;
        load_credentials(&config.credentials_path)?;

        let streamer = factory(config)?;
        let reporter = match streamer.take_errors() {
            Some(errors) => Some(ErrorReporter::spawn(errors)?),
            None => None,
        };

        Ok(Self {
            streamer,
            destination: config.destination.clone(),
            reporter,
        })
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn send(&self, row: AnalyticsRow) -> Result<()> {
        self.streamer.queue_row(&self.destination, row)
    }

    pub fn reported_errors(&self) -> u64 {
        self.reporter.as_ref().map_or(0, ErrorReporter::reported_count)
    }

    /// Stop the error reporter, then the streamer
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let reporter_ok = match self.reporter.as_mut() {
            Some(reporter) => reporter.shutdown(timeout),
            None => true,
        };
        self.streamer.stop();
        reporter_ok
    }
}
