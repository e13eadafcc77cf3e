//! Loggly aggregator sink
//!
//! Ships events to Loggly's syslog endpoint over TCP, one RFC 5424 line per
//! event, with the customer token carried as structured data:
//!
//! ```text
//! <PRI>1 2024-05-01T12:00:00.000Z host billing 4242 - [TOKEN@41058 tag="billing"] {"action":"login"}
//! ```

use super::resolve_hostname;
use crate::core::{Facility, LoglerError, Result, Severity, Sink};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Loggly's private enterprise number for structured data
pub const LOGGLY_ENTERPRISE_ID: u32 = 41058;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum time between reconnect attempts while the endpoint is down
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(10);

struct Connection {
    stream: Option<TcpStream>,
    /// Earliest time the next reconnect may be attempted
    retry_at: Option<Instant>,
}

/// Aggregator sink that streams events to Loggly
///
/// # Example
///
/// ```no_run
/// use logler::sinks::AggregatorSink;
///
/// let sink = AggregatorSink::connect("logs-01.loggly.com:514", "customer-token", "billing")
///     .expect("Failed to reach Loggly");
/// ```
pub struct AggregatorSink {
    conn: Mutex<Connection>,
    address: String,
    token: String,
    tag: String,
    hostname: String,
    reconnect_on_error: bool,
    reconnect_interval: Duration,
}

impl AggregatorSink {
    /// Connect to the aggregator
    ///
    /// # Errors
    ///
    /// Returns [`LoglerError::SinkConnection`] if the endpoint is unreachable.
    pub fn connect(address: &str, token: &str, tag: &str) -> Result<Self> {
        let stream = open(address)?;
        Ok(Self {
            conn: Mutex::new(Connection {
                stream: Some(stream),
                retry_at: None,
            }),
            address: address.to_string(),
            token: token.to_string(),
            tag: if tag.is_empty() { "logler".to_string() } else { tag.to_string() },
            hostname: resolve_hostname(),
            reconnect_on_error: true,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        })
    }

    /// Enable or disable one reconnect-and-resend attempt on a failed write
    ///
    /// Default: enabled
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    /// Wait at least `interval` between reconnect attempts
    ///
    /// Writes made while waiting fail immediately instead of blocking on a
    /// connect to a dead endpoint.
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Render one line without sending it
    pub fn format_message(&self, severity: Severity, encoded: &str) -> String {
        let priority = Facility::User.code() * 8 + severity.syslog_code();
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        format!(
            "<{}>1 {} {} {} {} - [{}@{} tag=\"{}\"] {}\n",
            priority,
            timestamp,
            self.hostname,
            self.tag,
            std::process::id(),
            self.token,
            LOGGLY_ENTERPRISE_ID,
            escape_param(&self.tag),
            encoded
        )
    }
}

impl Sink for AggregatorSink {
    fn write(&self, severity: Severity, encoded: &str) -> Result<()> {
        let message = self.format_message(severity, encoded);
        let mut conn = self.conn.lock();

        let error = match conn.stream.as_mut() {
            Some(s) => match s.write_all(message.as_bytes()) {
                Ok(()) => return Ok(()),
                Err(e) => e.to_string(),
            },
            None => "stream not connected".to_string(),
        };
        conn.stream = None;

        if !self.reconnect_on_error {
            return Err(LoglerError::sink_write("loggly", error));
        }

        let now = Instant::now();
        if conn.retry_at.is_some_and(|retry_at| now < retry_at) {
            return Err(LoglerError::sink_write(
                "loggly",
                format!("{}; waiting before the next reconnect (backoff)", error),
            ));
        }

        match open(&self.address) {
            Ok(mut fresh) => {
                conn.retry_at = None;
                fresh
                    .write_all(message.as_bytes())
                    .map_err(|err| LoglerError::sink_write("loggly", err.to_string()))?;
                conn.stream = Some(fresh);
                Ok(())
            }
            Err(reconnect_err) => {
                conn.retry_at = Some(now + self.reconnect_interval);
                Err(LoglerError::sink_write(
                    "loggly",
                    format!(
                        "Failed to send and reconnect: {} (reconnect: {})",
                        error, reconnect_err
                    ),
                ))
            }
        }
    }

    fn flush(&self) -> Result<()> {
        if let Some(stream) = self.conn.lock().stream.as_mut() {
            stream.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "loggly"
    }
}

impl Drop for AggregatorSink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn open(address: &str) -> Result<TcpStream> {
    let addr: SocketAddr = address
        .to_socket_addrs()
        .map_err(|e| LoglerError::sink_connection("loggly", address, e.to_string()))?
        .next()
        .ok_or_else(|| LoglerError::sink_connection("loggly", address, "address did not resolve"))?;

    let connect = || -> std::io::Result<TcpStream> {
        let stream = TcpStream::connect_timeout(&addr, IO_TIMEOUT)?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    };

    connect().map_err(|e| LoglerError::sink_connection("loggly", address, e.to_string()))
}

/// Escape a structured-data parameter value (RFC 5424 section 6.3.3)
fn escape_param(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    #[test]
    fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = AggregatorSink::connect(&addr, "token", "svc");
        assert!(matches!(result, Err(LoglerError::SinkConnection { .. })));
    }

    #[test]
    fn test_line_carries_token_and_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let sink = AggregatorSink::connect(&addr, "abc-123", "billing").unwrap();
        let (conn, _) = listener.accept().unwrap();

        sink.write(Severity::Error, r#"{"code":500}"#).unwrap();
        sink.flush().unwrap();

        let mut line = String::new();
        BufReader::new(conn).read_line(&mut line).unwrap();

        assert!(line.starts_with("<11>1 "), "got {}", line);
        assert!(line.contains("[abc-123@41058 tag=\"billing\"]"));
        assert!(line.ends_with("{\"code\":500}\n"));
    }

    #[test]
    fn test_write_without_stream_and_no_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let sink = AggregatorSink::connect(&addr, "t", "svc")
            .unwrap()
            .with_reconnect(false);
        sink.conn.lock().stream = None;

        assert!(matches!(
            sink.write(Severity::Info, "{}"),
            Err(LoglerError::SinkWrite { .. })
        ));
    }

    #[test]
    fn test_reconnect_backoff_skips_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let sink = AggregatorSink::connect(&addr, "t", "svc")
            .unwrap()
            .with_reconnect_interval(Duration::from_secs(60));
        drop(listener);
        sink.conn.lock().stream = None;

        let first = sink.write(Severity::Info, "{}").unwrap_err();
        assert!(first.to_string().contains("reconnect:"), "got {}", first);
        assert!(sink.conn.lock().retry_at.is_some());

        let started = Instant::now();
        let second = sink.write(Severity::Info, "{}").unwrap_err();
        assert!(second.to_string().contains("backoff"), "got {}", second);
        assert!(started.elapsed() < IO_TIMEOUT);
    }

    #[test]
    fn test_zero_interval_retries_every_write() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let sink = AggregatorSink::connect(&addr, "t", "svc")
            .unwrap()
            .with_reconnect_interval(Duration::ZERO);
        drop(listener);
        sink.conn.lock().stream = None;

        for _ in 0..2 {
            let err = sink.write(Severity::Info, "{}").unwrap_err();
            assert!(err.to_string().contains("reconnect:"), "got {}", err);
        }
    }

    #[test]
    fn test_escape_param() {
        assert_eq!(escape_param(r#"a"b]c\d"#), r#"a\"b\]c\\d"#);
        assert_eq!(escape_param("plain"), "plain");
    }
}
