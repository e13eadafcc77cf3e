//! Client configuration
//!
//! [`ClientOptions`] is the record a service builds (or deserializes) once at
//! startup. [`AnalyticsConfig`] holds the warehouse streaming parameters and
//! is read from `WT_`-prefixed environment variables.

use super::error::{LoglerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Sample rate used when none is configured
pub const DEFAULT_SAMPLE_RATE: u8 = 10;

/// Loggly syslog ingestion endpoint
pub const DEFAULT_LOGGLY_ENDPOINT: &str = "logs-01.loggly.com:514";

/// Syslog facility codes (RFC 5424 section 6.2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Facility {
    Kern,
    #[default]
    User,
    Mail,
    Daemon,
    Auth,
    Syslog,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

impl Facility {
    pub fn code(&self) -> u8 {
        match self {
            Facility::Kern => 0,
            Facility::User => 1,
            Facility::Mail => 2,
            Facility::Daemon => 3,
            Facility::Auth => 4,
            Facility::Syslog => 5,
            Facility::Local0 => 16,
            Facility::Local1 => 17,
            Facility::Local2 => 18,
            Facility::Local3 => 19,
            Facility::Local4 => 20,
            Facility::Local5 => 21,
            Facility::Local6 => 22,
            Facility::Local7 => 23,
        }
    }
}

/// Local syslog settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogOptions {
    pub enabled: bool,
    /// UDP `host:port`; `None` means the local unix socket
    pub address: Option<String>,
    pub facility: Facility,
}

impl Default for SyslogOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            address: None,
            facility: Facility::User,
        }
    }
}

impl SyslogOptions {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Send to a UDP syslog listener instead of the local socket
    pub fn udp(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Default::default()
        }
    }
}

/// Options recognized when constructing a [`Client`](crate::Client)
///
/// # Example
///
/// ```
/// use logler::ClientOptions;
///
/// let options: ClientOptions = serde_json::from_str(
///     r#"{"component": "billing", "sample_rate": 25, "syslog": {"enabled": false}}"#,
/// ).unwrap();
///
/// assert_eq!(options.component, "billing");
/// assert_eq!(options.sample_rate, 25);
/// assert!(!options.minimal_log);
/// assert!(!options.syslog.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub component: String,
    /// Percentage (0-100) of Info/Warn/Error events forwarded to remote sinks
    pub sample_rate: u8,
    /// Skip call-site augmentation
    pub minimal_log: bool,
    /// Loggly customer token; no aggregator sink without it
    pub loggly_token: Option<String>,
    pub loggly_endpoint: String,
    pub syslog: SyslogOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            component: String::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            minimal_log: false,
            loggly_token: None,
            loggly_endpoint: DEFAULT_LOGGLY_ENDPOINT.to_string(),
            syslog: SyslogOptions::default(),
        }
    }
}

impl ClientOptions {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_sample_rate(mut self, rate: u8) -> Self {
        self.sample_rate = rate;
        self
    }

    #[must_use]
    pub fn with_minimal_log(mut self, minimal: bool) -> Self {
        self.minimal_log = minimal;
        self
    }

    #[must_use]
    pub fn with_loggly_token(mut self, token: impl Into<String>) -> Self {
        self.loggly_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_syslog(mut self, syslog: SyslogOptions) -> Self {
        self.syslog = syslog;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate > 100 {
            return Err(LoglerError::config(
                "ClientOptions",
                format!("sample_rate must be within 0..=100, got {}", self.sample_rate),
            ));
        }
        if let Some(token) = &self.loggly_token {
            if token.trim().is_empty() {
                return Err(LoglerError::config("ClientOptions", "loggly_token is blank"));
            }
        }
        Ok(())
    }
}

/// Fully qualified warehouse table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl Destination {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl Default for Destination {
    fn default() -> Self {
        Self::new("streamrail", "bq_test", "test_table")
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.project, self.dataset, self.table)
    }
}

/// Parameters handed to the analytics row streamer
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    /// Service-account JSON key file
    pub credentials_path: PathBuf,
    /// Concurrent insert workers
    pub num_streamers: usize,
    /// Rows queued before an insert is forced
    pub max_rows: usize,
    /// Time between forced inserts
    pub max_delay: Duration,
    /// Wait between failed insert attempts
    pub sleep_before_retry: Duration,
    /// Failed attempts before rows are discarded
    pub max_retry_insert: usize,
    pub destination: Destination,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("bq-credentials.json"),
            num_streamers: 5,
            max_rows: 50,
            max_delay: Duration::from_secs(1),
            sleep_before_retry: Duration::from_secs(1),
            max_retry_insert: 10,
            destination: Destination::default(),
        }
    }
}

impl AnalyticsConfig {
    pub const ENV_PREFIX: &'static str = "WT_";

    /// Read the configuration from the process environment
    ///
    /// Unset variables keep their defaults; unparsable ones are an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary `WT_*` lookup
    ///
    /// # Example
    ///
    /// ```
    /// use logler::AnalyticsConfig;
    /// use std::collections::HashMap;
    ///
    /// let env: HashMap<&str, &str> = [("WT_MAXROWS", "500"), ("WT_BQ_TABLE", "events")].into();
    /// let config = AnalyticsConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
    ///
    /// assert_eq!(config.max_rows, 500);
    /// assert_eq!(config.num_streamers, 5);
    /// assert_eq!(config.destination.to_string(), "streamrail:bq_test.events");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(&format!("{}{}", Self::ENV_PREFIX, name));

        let config = Self {
            credentials_path: get("JWTCONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_path),
            num_streamers: parse_var(&get, "NUMSTREAMERS")?.unwrap_or(defaults.num_streamers),
            max_rows: parse_var(&get, "MAXROWS")?.unwrap_or(defaults.max_rows),
            max_delay: parse_var(&get, "MAXDELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
            sleep_before_retry: parse_var(&get, "SLEEPBEFORERETRY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.sleep_before_retry),
            max_retry_insert: parse_var(&get, "MAXRETRYINSERT")?
                .unwrap_or(defaults.max_retry_insert),
            destination: Destination {
                project: get("BQ_PROJECT").unwrap_or(defaults.destination.project),
                dataset: get("BQ_DATASET").unwrap_or(defaults.destination.dataset),
                table: get("BQ_TABLE").unwrap_or(defaults.destination.table),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_streamers == 0 {
            return Err(LoglerError::config(
                "AnalyticsConfig",
                "WT_NUMSTREAMERS must be at least 1",
            ));
        }
        if self.max_rows == 0 {
            return Err(LoglerError::config(
                "AnalyticsConfig",
                "WT_MAXROWS must be at least 1",
            ));
        }
        let destination = &self.destination;
        if destination.project.is_empty()
            || destination.dataset.is_empty()
            || destination.table.is_empty()
        {
            return Err(LoglerError::config(
                "AnalyticsConfig",
                format!("incomplete destination '{}'", destination),
            ));
        }
        Ok(())
    }
}

fn parse_var<T, G>(get: &G, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            LoglerError::config(
                "AnalyticsConfig",
                format!("{}{}='{}': {}", AnalyticsConfig::ENV_PREFIX, name, raw, e),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_client_options_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.sample_rate, DEFAULT_SAMPLE_RATE);
        assert!(options.sample_rate > 0);
        assert!(options.syslog.enabled);
        assert_eq!(options.loggly_endpoint, DEFAULT_LOGGLY_ENDPOINT);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_client_options_rejects_rate_over_100() {
        let options = ClientOptions::new("api").with_sample_rate(101);
        assert!(matches!(
            options.validate(),
            Err(LoglerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_client_options_rejects_blank_token() {
        let options = ClientOptions::new("api").with_loggly_token("  ");
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_facility_deserializes_lowercase() {
        let syslog: SyslogOptions =
            serde_json::from_str(r#"{"facility": "local3", "address": "127.0.0.1:514"}"#).unwrap();
        assert_eq!(syslog.facility, Facility::Local3);
        assert_eq!(syslog.facility.code(), 19);
        assert!(syslog.enabled);
    }

    #[test]
    fn test_analytics_defaults_from_empty_env() {
        let config = AnalyticsConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AnalyticsConfig::default());
        assert_eq!(config.destination.to_string(), "streamrail:bq_test.test_table");
    }

    #[test]
    fn test_analytics_overrides() {
        let config = AnalyticsConfig::from_lookup(lookup(&[
            ("WT_JWTCONFIG", "/certs/key.json"),
            ("WT_NUMSTREAMERS", "8"),
            ("WT_MAXDELAY_MS", "250"),
            ("WT_MAXRETRYINSERT", " 3 "),
            ("WT_BQ_PROJECT", "acme"),
        ]))
        .unwrap();

        assert_eq!(config.credentials_path, PathBuf::from("/certs/key.json"));
        assert_eq!(config.num_streamers, 8);
        assert_eq!(config.max_delay, Duration::from_millis(250));
        assert_eq!(config.max_retry_insert, 3);
        assert_eq!(config.destination.project, "acme");
    }

    #[test]
    fn test_analytics_unparsable_value() {
        let err = AnalyticsConfig::from_lookup(lookup(&[("WT_MAXROWS", "lots")])).unwrap_err();
        assert!(err.to_string().contains("WT_MAXROWS='lots'"));
    }

    #[test]
    fn test_analytics_zero_workers_rejected() {
        let result = AnalyticsConfig::from_lookup(lookup(&[("WT_NUMSTREAMERS", "0")]));
        assert!(matches!(
            result,
            Err(LoglerError::InvalidConfiguration { .. })
        ));
    }
}
