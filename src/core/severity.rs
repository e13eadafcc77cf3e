//! Severity definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Severity {
    Trace = 0,
    #[default]
    Info = 1,
    Warn = 2,
    Error = 3,
    Emergency = 4,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Trace,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Emergency,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Emergency => "EMERGENCY",
        }
    }

    /// Prefix written in front of every console line
    pub fn console_label(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARNING",
            Severity::Error => "ERROR",
            Severity::Emergency => "Emergency",
        }
    }

    /// RFC 5424 severity code (0 = emergency, 7 = debug)
    pub fn syslog_code(&self) -> u8 {
        match self {
            Severity::Trace => 7,
            Severity::Info => 6,
            Severity::Warn => 4,
            Severity::Error => 3,
            Severity::Emergency => 0,
        }
    }

    /// Whether console output for this severity goes to stderr
    pub fn uses_stderr(&self) -> bool {
        matches!(self, Severity::Error | Severity::Emergency)
    }

    /// Whether remote sinks ever see this severity
    pub fn is_remote(&self) -> bool {
        !matches!(self, Severity::Trace)
    }

    /// Emergency events skip sampling entirely
    pub fn bypasses_sampling(&self) -> bool {
        matches!(self, Severity::Emergency)
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            Severity::Trace => BrightBlack,
            Severity::Info => Green,
            Severity::Warn => Yellow,
            Severity::Error => Red,
            Severity::Emergency => BrightRed,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(Severity::Trace),
            "INFO" => Ok(Severity::Info),
            "WARN" | "WARNING" => Ok(Severity::Warn),
            "ERROR" | "ERR" => Ok(Severity::Error),
            "EMERGENCY" | "EMERG" => Ok(Severity::Emergency),
            _ => Err(format!("Invalid severity: '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_streams() {
        assert!(!Severity::Trace.uses_stderr());
        assert!(!Severity::Info.uses_stderr());
        assert!(!Severity::Warn.uses_stderr());
        assert!(Severity::Error.uses_stderr());
        assert!(Severity::Emergency.uses_stderr());
    }

    #[test]
    fn test_syslog_codes() {
        assert_eq!(Severity::Emergency.syslog_code(), 0);
        assert_eq!(Severity::Error.syslog_code(), 3);
        assert_eq!(Severity::Warn.syslog_code(), 4);
        assert_eq!(Severity::Info.syslog_code(), 6);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("warning".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!("emerg".parse::<Severity>(), Ok(Severity::Emergency));
        assert!("debug".parse::<Severity>().is_err());
    }

    #[test]
    fn test_only_emergency_bypasses_sampling() {
        for severity in Severity::ALL {
            assert_eq!(severity.bypasses_sampling(), severity == Severity::Emergency);
        }
    }
}
