//! Console sink implementation

use crate::core::{Result, Severity, Sink};
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::Write;

/// Date/time layout in front of every console line
pub const CONSOLE_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Writes one line per event to stdout (Trace/Info/Warn) or stderr
/// (Error/Emergency)
///
/// Lines look like `WARNING: 2024/05/01 12:00:00 {"action":"retry"}`.
pub struct ConsoleSink {
    use_colors: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    /// Color the severity label (requires the `console` feature)
    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Render the line without writing it
    pub fn format_line(&self, severity: Severity, encoded: &str) -> String {
        let timestamp = chrono::Local::now().format(CONSOLE_TIME_FORMAT);
        format!("{}: {} {}", self.label(severity), timestamp, encoded)
    }

    #[cfg(feature = "console")]
    fn label(&self, severity: Severity) -> String {
        if self.use_colors {
            severity
                .console_label()
                .color(severity.color_code())
                .to_string()
        } else {
            severity.console_label().to_string()
        }
    }

    #[cfg(not(feature = "console"))]
    fn label(&self, severity: Severity) -> String {
        severity.console_label().to_string()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn write(&self, severity: Severity, encoded: &str) -> Result<()> {
        let line = self.format_line(severity, encoded);

        // Lock the stream so concurrent callers never interleave a line
        if severity.uses_stderr() {
            writeln!(std::io::stderr().lock(), "{}", line)?;
        } else {
            writeln!(std::io::stdout().lock(), "{}", line)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
