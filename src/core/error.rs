//! Error types for the logging facade

pub type Result<T> = std::result::Result<T, LoglerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoglerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Event had no fields
    #[error("message log nil message")]
    EmptyEvent,

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Sink could not be reached at construction time
    #[error("Failed to connect {sink} sink to '{target}': {message}")]
    SinkConnection {
        sink: String,
        target: String,
        message: String,
    },

    /// Sink write error
    #[error("Sink '{sink}' write failed: {message}")]
    SinkWrite { sink: String, message: String },

    /// Analytics credential file could not be used
    #[error("Analytics credentials at '{path}' unusable: {message}")]
    Credentials { path: String, message: String },

    /// Row streamer refused a row
    #[error("Analytics row rejected for {destination}: {message}")]
    RowRejected {
        destination: String,
        message: String,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoglerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoglerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoglerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn sink_connection(
        sink: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LoglerError::SinkConnection {
            sink: sink.into(),
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn sink_write(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoglerError::SinkWrite {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn credentials(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoglerError::Credentials {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn row_rejected(destination: impl Into<String>, message: impl Into<String>) -> Self {
        LoglerError::RowRejected {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoglerError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoglerError::config("AnalyticsConfig", "WT_NUMSTREAMERS must be positive");
        assert!(matches!(err, LoglerError::InvalidConfiguration { .. }));

        let err = LoglerError::sink_connection("syslog", "/dev/log", "No such file");
        assert!(matches!(err, LoglerError::SinkConnection { .. }));

        let err = LoglerError::row_rejected("streamrail:bq_test.test_table", "queue closed");
        assert!(matches!(err, LoglerError::RowRejected { .. }));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(LoglerError::EmptyEvent.to_string(), "message log nil message");

        let err = LoglerError::sink_write("loggly", "broken pipe");
        assert_eq!(err.to_string(), "Sink 'loggly' write failed: broken pipe");

        let err = LoglerError::credentials("/etc/bq.json", "missing file");
        assert_eq!(
            err.to_string(),
            "Analytics credentials at '/etc/bq.json' unusable: missing file"
        );
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = LoglerError::io_operation("connecting to syslog", "socket unavailable", io_err);

        assert!(matches!(err, LoglerError::IoOperation { .. }));
        assert!(err.to_string().contains("connecting to syslog"));
        assert!(err.to_string().contains("socket unavailable"));
    }
}
