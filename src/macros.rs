//! Logging macros that record where they were called from.
//!
//! Each severity macro takes a client followed by either `key => value`
//! pairs or an [`Event`](crate::Event) expression. The macros capture
//! `file!()`, `line!()` and the enclosing function's path at compile time,
//! so the event carries `filename`, `line` and `func` (unless the client is
//! in minimal-logging mode).
//!
//! # Examples
//!
//! ```
//! use logler::prelude::*;
//! use logler::{info, error};
//!
//! let client = Client::new(ClientOptions::new("api").with_syslog(SyslogOptions::disabled()));
//!
//! info!(client, "action" => "startup", "port" => 8080);
//!
//! let event = Event::new().with_field("code", 500);
//! error!(client, event);
//! ```

/// Path of the enclosing function, e.g. `my_crate::handlers::login`.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_path {
    () => {{
        fn __here() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __type_name_of(__here);
        name.strip_suffix("::__here").unwrap_or(name)
    }};
}

/// Capture the current [`CallSite`](crate::CallSite).
///
/// ```
/// let site = logler::call_site!();
/// assert!(site.line > 0);
/// assert!(!site.function.is_empty());
/// ```
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite::new(file!(), line!(), $crate::__function_path!())
    };
}

/// Build an [`Event`](crate::Event) from `key => value` pairs.
///
/// ```
/// use logler::event;
///
/// let e = event!("user" => "alice", "admin" => false);
/// assert_eq!(e.len(), 2);
/// assert!(event!().is_empty());
/// ```
#[macro_export]
macro_rules! event {
    () => {
        $crate::Event::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Event::new()$(.with_field($key, $value))+
    };
}

/// Log at an explicit severity.
///
/// ```
/// # use logler::prelude::*;
/// # let client = Client::new(ClientOptions::new("doc").with_syslog(SyslogOptions::disabled()));
/// use logler::log;
/// log!(client, Severity::Warn, "disk" => "/var", "free_pct" => 4);
/// ```
#[macro_export]
macro_rules! log {
    ($client:expr, $severity:expr, $($key:expr => $value:expr),+ $(,)?) => {
        $client.log($severity, $crate::call_site!(), $crate::event!($($key => $value),+))
    };
    ($client:expr, $severity:expr, $event:expr) => {
        $client.log($severity, $crate::call_site!(), $event)
    };
}

/// Log a trace-level event (console only).
///
/// ```
/// # use logler::prelude::*;
/// # let client = Client::new(ClientOptions::new("doc").with_syslog(SyslogOptions::disabled()));
/// use logler::trace;
/// trace!(client, "step" => "parse");
/// ```
#[macro_export]
macro_rules! trace {
    ($client:expr, $($rest:tt)+) => {
        $crate::log!($client, $crate::Severity::Trace, $($rest)+)
    };
}

/// Log an info-level event.
///
/// ```
/// # use logler::prelude::*;
/// # let client = Client::new(ClientOptions::new("doc").with_syslog(SyslogOptions::disabled()));
/// use logler::info;
/// info!(client, "action" => "login", "user_id" => 42);
/// ```
#[macro_export]
macro_rules! info {
    ($client:expr, $($rest:tt)+) => {
        $crate::log!($client, $crate::Severity::Info, $($rest)+)
    };
}

/// Log a warning-level event.
///
/// ```
/// # use logler::prelude::*;
/// # let client = Client::new(ClientOptions::new("doc").with_syslog(SyslogOptions::disabled()));
/// use logler::warn;
/// warn!(client, "retry" => 3);
/// ```
#[macro_export]
macro_rules! warn {
    ($client:expr, $($rest:tt)+) => {
        $crate::log!($client, $crate::Severity::Warn, $($rest)+)
    };
}

/// Log an error-level event.
///
/// ```
/// # use logler::prelude::*;
/// # let client = Client::new(ClientOptions::new("doc").with_syslog(SyslogOptions::disabled()));
/// use logler::error;
/// error!(client, "code" => 500, "message" => "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($client:expr, $($rest:tt)+) => {
        $crate::log!($client, $crate::Severity::Error, $($rest)+)
    };
}

/// Log an emergency event. Remote sinks always receive it.
///
/// ```
/// # use logler::prelude::*;
/// # let client = Client::new(ClientOptions::new("doc").with_syslog(SyslogOptions::disabled()));
/// use logler::emergency;
/// emergency!(client, "reason" => "disk full");
/// ```
#[macro_export]
macro_rules! emergency {
    ($client:expr, $($rest:tt)+) => {
        $crate::log!($client, $crate::Severity::Emergency, $($rest)+)
    };
}

/// Send an event to the analytics warehouse.
///
/// ```
/// # use logler::prelude::*;
/// # let client = Client::new(ClientOptions::new("doc").with_syslog(SyslogOptions::disabled()));
/// use logler::analytics;
/// analytics!(client, "category" => "checkout", "action" => "pay", "label1" => "visa");
/// ```
#[macro_export]
macro_rules! analytics {
    ($client:expr, $($key:expr => $value:expr),+ $(,)?) => {
        $client.analytics($crate::event!($($key => $value),+))
    };
    ($client:expr, $event:expr) => {
        $client.analytics($event)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Client, ClientOptions, Event, Result, Severity, Sink, SyslogOptions};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Lines(Arc<Mutex<Vec<(Severity, String)>>>);

    impl Sink for Lines {
        fn write(&self, severity: Severity, encoded: &str) -> Result<()> {
            self.0.lock().push((severity, encoded.to_string()));
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "lines"
        }
    }

    fn client(lines: &Lines) -> Client {
        Client::builder()
            .options(ClientOptions::new("macros").with_syslog(SyslogOptions::disabled()))
            .console(lines.clone())
            .build()
    }

    #[test]
    fn test_event_macro() {
        let event = event!("a" => 1, "b" => "two",);
        assert_eq!(event, Event::new().with_field("a", 1).with_field("b", "two"));
    }

    #[test]
    fn test_severity_macros() {
        let lines = Lines::default();
        let client = client(&lines);

        trace!(client, "n" => 1);
        info!(client, "n" => 2);
        warn!(client, "n" => 3);
        error!(client, "n" => 4);
        emergency!(client, "n" => 5);
        log!(client, Severity::Warn, "n" => 6);

        let severities: Vec<Severity> = lines.0.lock().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            severities,
            vec![
                Severity::Trace,
                Severity::Info,
                Severity::Warn,
                Severity::Error,
                Severity::Emergency,
                Severity::Warn,
            ]
        );
    }

    #[test]
    fn test_macro_with_event_expression() {
        let lines = Lines::default();
        let client = client(&lines);

        let event = Event::new().with_field("prebuilt", true);
        info!(client, event);

        let (_, encoded) = lines.0.lock()[0].clone();
        assert!(encoded.contains("\"prebuilt\":true"));
        assert!(encoded.contains("\"func\":"));
    }

    #[test]
    fn test_analytics_macro_logs_to_console() {
        let lines = Lines::default();
        let client = client(&lines);

        analytics!(client, "action" => "view", "label" => "home");

        let recorded = lines.0.lock();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, Severity::Info);
    }
}
