//! Local syslog sink
//!
//! Each event goes out as one BSD-style (RFC 3164) message through the
//! `syslog` crate:
//!
//! ```text
//! <PRI>Mmm dd hh:mm:ss tag[pid]: {"action":"login",...}
//! ```
//!
//! By default the message goes to the local daemon's unix socket; a UDP
//! `host:port` can be configured instead, in which case the hostname is
//! included.

use super::resolve_hostname;
use crate::core::{Facility, LoglerError, Result, Severity, Sink, SyslogOptions};
use parking_lot::Mutex;
use std::net::ToSocketAddrs;
use syslog::{Formatter3164, Logger, LoggerBackend};

type Writer = Logger<LoggerBackend, Formatter3164>;

/// Where to find the syslog daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyslogTarget {
    /// The local daemon's unix socket
    Local,
    /// Send UDP datagrams to this address
    Udp(String),
}

impl From<&SyslogOptions> for SyslogTarget {
    fn from(options: &SyslogOptions) -> Self {
        match &options.address {
            Some(address) => SyslogTarget::Udp(address.clone()),
            None => SyslogTarget::Local,
        }
    }
}

pub struct SyslogSink {
    writer: Mutex<Option<Writer>>,
    target: SyslogTarget,
    facility: Facility,
    tag: String,
}

impl SyslogSink {
    /// Connect to the syslog daemon
    ///
    /// `tag` is the application name written before the pid; an empty tag
    /// falls back to the executable name.
    ///
    /// # Errors
    ///
    /// Returns [`LoglerError::SinkConnection`] if no daemon can be reached.
    pub fn connect(target: SyslogTarget, facility: Facility, tag: &str) -> Result<Self> {
        let tag = resolve_tag(tag);
        let writer = open(&target, facility, &tag)?;
        Ok(Self {
            writer: Mutex::new(Some(writer)),
            target,
            facility,
            tag,
        })
    }

    pub fn from_options(options: &SyslogOptions, tag: &str) -> Result<Self> {
        Self::connect(SyslogTarget::from(options), options.facility, tag)
    }

    pub fn target(&self) -> &SyslogTarget {
        &self.target
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl Sink for SyslogSink {
    fn write(&self, severity: Severity, encoded: &str) -> Result<()> {
        let mut writer = self.writer.lock();

        let error = match writer.as_mut() {
            Some(w) => match send(w, severity, encoded) {
                Ok(()) => return Ok(()),
                Err(e) => e,
            },
            None => "not connected".to_string(),
        };

        // The daemon may have restarted; reconnect once and resend
        *writer = None;
        let mut fresh = open(&self.target, self.facility, &self.tag).map_err(|reconnect_err| {
            LoglerError::sink_write(
                "syslog",
                format!("send failed: {} (reconnect: {})", error, reconnect_err),
            )
        })?;
        send(&mut fresh, severity, encoded).map_err(|e| LoglerError::sink_write("syslog", e))?;
        *writer = Some(fresh);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "syslog"
    }
}

fn send(writer: &mut Writer, severity: Severity, encoded: &str) -> std::result::Result<(), String> {
    let sent = match severity {
        Severity::Trace => writer.debug(encoded),
        Severity::Info => writer.info(encoded),
        Severity::Warn => writer.warning(encoded),
        Severity::Error => writer.err(encoded),
        Severity::Emergency => writer.emerg(encoded),
    };
    sent.map_err(|e| e.to_string())
}

fn open(target: &SyslogTarget, facility: Facility, tag: &str) -> Result<Writer> {
    let formatter = Formatter3164 {
        facility: to_syslog_facility(facility),
        hostname: None,
        process: tag.to_string(),
        pid: std::process::id(),
    };

    match target {
        SyslogTarget::Local => open_local(formatter),
        SyslogTarget::Udp(address) => open_udp(formatter, address),
    }
}

#[cfg(unix)]
fn open_local(formatter: Formatter3164) -> Result<Writer> {
    syslog::unix(formatter)
        .map_err(|e| LoglerError::sink_connection("syslog", "local socket", e.to_string()))
}

#[cfg(not(unix))]
fn open_local(_formatter: Formatter3164) -> Result<Writer> {
    Err(LoglerError::sink_connection(
        "syslog",
        "local socket",
        "local syslog socket is only available on unix; configure a UDP address",
    ))
}

fn open_udp(formatter: Formatter3164, address: &str) -> Result<Writer> {
    let addr = address
        .to_socket_addrs()
        .map_err(|e| LoglerError::sink_connection("syslog", address, e.to_string()))?
        .next()
        .ok_or_else(|| LoglerError::sink_connection("syslog", address, "address did not resolve"))?;

    let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let formatter = Formatter3164 {
        hostname: Some(resolve_hostname()),
        ..formatter
    };
    syslog::udp(formatter, bind_addr, address)
        .map_err(|e| LoglerError::sink_connection("syslog", address, e.to_string()))
}

fn to_syslog_facility(facility: Facility) -> syslog::Facility {
    match facility {
        Facility::Kern => syslog::Facility::LOG_KERN,
        Facility::User => syslog::Facility::LOG_USER,
        Facility::Mail => syslog::Facility::LOG_MAIL,
        Facility::Daemon => syslog::Facility::LOG_DAEMON,
        Facility::Auth => syslog::Facility::LOG_AUTH,
        Facility::Syslog => syslog::Facility::LOG_SYSLOG,
        Facility::Local0 => syslog::Facility::LOG_LOCAL0,
        Facility::Local1 => syslog::Facility::LOG_LOCAL1,
        Facility::Local2 => syslog::Facility::LOG_LOCAL2,
        Facility::Local3 => syslog::Facility::LOG_LOCAL3,
        Facility::Local4 => syslog::Facility::LOG_LOCAL4,
        Facility::Local5 => syslog::Facility::LOG_LOCAL5,
        Facility::Local6 => syslog::Facility::LOG_LOCAL6,
        Facility::Local7 => syslog::Facility::LOG_LOCAL7,
    }
}

fn resolve_tag(tag: &str) -> String {
    if !tag.is_empty() {
        return tag.to_string();
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "logler".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::time::Duration;

    fn udp_listener() -> (UdpSocket, String) {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    fn receive(listener: &UdpSocket) -> String {
        let mut buf = [0u8; 2048];
        let n = listener.recv(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[test]
    fn test_priority_uses_facility() {
        let (listener, addr) = udp_listener();
        let sink = SyslogSink::connect(SyslogTarget::Udp(addr), Facility::Local0, "svc").unwrap();

        sink.write(Severity::Emergency, "{}").unwrap();
        assert!(receive(&listener).starts_with("<128>"));

        sink.write(Severity::Error, "{}").unwrap();
        assert!(receive(&listener).starts_with("<131>"));

        sink.write(Severity::Info, "{}").unwrap();
        assert!(receive(&listener).starts_with("<134>"));
    }

    #[test]
    fn test_udp_datagram_layout() {
        let (listener, addr) = udp_listener();
        let sink = SyslogSink::connect(SyslogTarget::Udp(addr), Facility::User, "billing").unwrap();

        sink.write(Severity::Warn, r#"{"action":"retry"}"#).unwrap();
        let datagram = receive(&listener);

        assert!(datagram.starts_with("<12>"), "got {}", datagram);
        assert!(datagram.contains(&format!(
            " {} billing[{}]: ",
            resolve_hostname(),
            std::process::id()
        )));
        assert!(datagram.trim_end().ends_with(r#"{"action":"retry"}"#));
    }

    #[test]
    fn test_target_from_options() {
        assert_eq!(SyslogTarget::from(&SyslogOptions::default()), SyslogTarget::Local);
        assert_eq!(
            SyslogTarget::from(&SyslogOptions::udp("10.0.0.1:514")),
            SyslogTarget::Udp("10.0.0.1:514".to_string())
        );
    }

    #[test]
    fn test_unresolvable_address_fails() {
        let result = SyslogSink::connect(
            SyslogTarget::Udp("no-such-host.invalid:514".to_string()),
            Facility::User,
            "svc",
        );
        assert!(matches!(result, Err(LoglerError::SinkConnection { .. })));
    }

    #[test]
    fn test_reconnects_after_lost_writer() {
        let (listener, addr) = udp_listener();
        let sink = SyslogSink::connect(SyslogTarget::Udp(addr), Facility::User, "svc").unwrap();
        *sink.writer.lock() = None;

        sink.write(Severity::Info, r#"{"after":"reconnect"}"#).unwrap();
        assert!(receive(&listener).contains(r#"{"after":"reconnect"}"#));
        assert!(sink.writer.lock().is_some());
    }

    #[test]
    fn test_empty_tag_falls_back_to_executable() {
        assert!(!resolve_tag("").is_empty());
        assert_eq!(resolve_tag("api"), "api");
    }
}
