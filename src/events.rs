//! Scan event model and sink implementations
//!
//! The engine emits exactly one event per classification decision, in
//! processing order, plus per-probe errors and (range mode only) a final
//! summary. Sinks are injected into the engine; there is no global logging
//! singleton on this path.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Mutex;

use crate::scanner::{ProbeOutcome, ProbeResult};

/// Severity attached to an emitted event.
///
/// Timeouts and unreachable replies are classifications and stay at `Info`;
/// only genuine per-probe failures are `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

/// One classification decision or probe failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    HostResponding,
    HostDown,
    HostBlockingIcmp,
    PortOpen,
    PortClosed,
    PortFiltered,
    ProbeError,
    Summary,
}

/// A single structured scan event.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub kind: EventKind,
    pub host: Option<Ipv4Addr>,
    pub port: Option<u16>,
    pub message: String,
}

impl Event {
    fn new(
        severity: Severity,
        kind: EventKind,
        host: Option<Ipv4Addr>,
        port: Option<u16>,
        message: String,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            kind,
            host,
            port,
            message,
        }
    }

    /// Build the event for a finished probe.
    pub fn from_result(result: &ProbeResult) -> Self {
        let host = result.host;
        match &result.outcome {
            ProbeOutcome::HostResponding => Self::new(
                Severity::Info,
                EventKind::HostResponding,
                Some(host),
                None,
                format!("Host {} is responding.", host),
            ),
            ProbeOutcome::HostDown => Self::new(
                Severity::Info,
                EventKind::HostDown,
                Some(host),
                None,
                format!("Host {} is down or unresponsive.", host),
            ),
            ProbeOutcome::HostBlockingIcmp => Self::new(
                Severity::Info,
                EventKind::HostBlockingIcmp,
                Some(host),
                None,
                format!("Host {} is actively blocking ICMP traffic.", host),
            ),
            ProbeOutcome::Open => Self::new(
                Severity::Info,
                EventKind::PortOpen,
                Some(host),
                result.port,
                format!(
                    "Port {} on {} is open",
                    result.port.unwrap_or_default(),
                    host
                ),
            ),
            ProbeOutcome::Closed => Self::new(
                Severity::Info,
                EventKind::PortClosed,
                Some(host),
                result.port,
                format!(
                    "Port {} on {} is closed",
                    result.port.unwrap_or_default(),
                    host
                ),
            ),
            ProbeOutcome::Filtered => Self::new(
                Severity::Info,
                EventKind::PortFiltered,
                Some(host),
                result.port,
                format!(
                    "Port {} on {} is filtered and silently dropped",
                    result.port.unwrap_or_default(),
                    host
                ),
            ),
            ProbeOutcome::Error(reason) => {
                let message = match result.port {
                    Some(port) => format!("Error scanning port {} on {}: {}", port, host, reason),
                    None => format!("Error probing host {}: {}", host, reason),
                };
                Self::new(
                    Severity::Error,
                    EventKind::ProbeError,
                    Some(host),
                    result.port,
                    message,
                )
            }
        }
    }

    /// Final range-mode event carrying the responding-host count.
    pub fn summary(online: usize) -> Self {
        Self::new(
            Severity::Info,
            EventKind::Summary,
            None,
            None,
            format!("{} hosts are online.", online),
        )
    }
}

/// Destination for scan events.
///
/// Implementations are shared across scan workers and must serialize their
/// own writes; the engine calls `emit` once per decision.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Colored terminal sink.
pub struct ConsoleSink {
    colored: bool,
}

impl ConsoleSink {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    fn render(&self, event: &Event) -> String {
        let stamp = event.timestamp.format("%Y-%m-%d %H:%M:%S");
        if !self.colored {
            return format!("[{}] {}", stamp, event.message);
        }

        let message = match event.kind {
            EventKind::PortOpen => event.message.bright_green().to_string(),
            EventKind::HostResponding => event.message.bright_cyan().to_string(),
            EventKind::ProbeError => event.message.bright_red().to_string(),
            EventKind::HostBlockingIcmp => event.message.bright_yellow().to_string(),
            EventKind::Summary => event.message.bold().to_string(),
            _ => event.message.clone(),
        };
        format!("[{}] {}", stamp, message)
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: Event) {
        match event.severity {
            Severity::Error => eprintln!("{}", self.render(&event)),
            Severity::Info => println!("{}", self.render(&event)),
        }
    }
}

/// Writes every event as one JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&self, event: Event) {
        if let Ok(line) = serde_json::to_string(&event) {
            let mut writer = self.writer.lock().unwrap();
            if let Err(e) = writeln!(writer, "{}", line) {
                log::warn!("event sink write failed: {}", e);
            }
        }
    }
}

/// Appends formatted events to a log file.
///
/// Rotation is left to external tooling; this sink only appends.
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileSink {
    fn emit(&self, event: Event) {
        let severity = match event.severity {
            Severity::Info => "INFO",
            Severity::Error => "ERROR",
        };
        let mut file = self.file.lock().unwrap();
        if let Err(e) = writeln!(
            file,
            "{} - {} - {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            severity,
            event.message
        ) {
            log::warn!("event sink write failed: {}", e);
        }
    }
}

/// Fans one event stream out to several sinks.
pub struct MultiSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for MultiSink {
    fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcome: ProbeOutcome, port: Option<u16>) -> ProbeResult {
        ProbeResult {
            host: Ipv4Addr::new(10, 0, 0, 5),
            port,
            outcome,
        }
    }

    #[test]
    fn messages_name_host_and_port() {
        let open = Event::from_result(&result(ProbeOutcome::Open, Some(80)));
        assert_eq!(open.kind, EventKind::PortOpen);
        assert_eq!(open.message, "Port 80 on 10.0.0.5 is open");

        let down = Event::from_result(&result(ProbeOutcome::HostDown, None));
        assert_eq!(down.message, "Host 10.0.0.5 is down or unresponsive.");
    }

    #[test]
    fn probe_errors_carry_error_severity() {
        let event = Event::from_result(&result(ProbeOutcome::Error("send failed".into()), Some(443)));
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.port, Some(443));
    }

    #[test]
    fn timeouts_stay_informational() {
        let event = Event::from_result(&result(ProbeOutcome::Filtered, Some(22)));
        assert_eq!(event.severity, Severity::Info);
    }

    #[test]
    fn summary_counts_hosts() {
        let event = Event::summary(3);
        assert_eq!(event.kind, EventKind::Summary);
        assert_eq!(event.message, "3 hosts are online.");
        assert!(event.host.is_none());
    }

    #[test]
    fn json_sink_writes_one_line_per_event() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.emit(Event::summary(1));
        sink.emit(Event::from_result(&result(ProbeOutcome::Closed, Some(22))));
        let buf = sink.writer.into_inner().unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().next().unwrap().contains("\"summary\""));
    }
}
