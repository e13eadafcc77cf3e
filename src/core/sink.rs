//! Sink trait for log output destinations

use super::{error::Result, severity::Severity};

/// A destination that accepts encoded events
///
/// Sinks take `&self` so the client can fan out from many threads at once;
/// a sink that owns a socket or buffer guards it internally.
pub trait Sink: Send + Sync {
    /// Write one already-encoded event at `severity`
    fn write(&self, severity: Severity, encoded: &str) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn name(&self) -> &str;
}

impl<S: Sink + ?Sized> Sink for std::sync::Arc<S> {
    fn write(&self, severity: Severity, encoded: &str) -> Result<()> {
        (**self).write(severity, encoded)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
