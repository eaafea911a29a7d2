//! Diagnostic records accumulated over a guest run, and the out-of-band
//! event channel used for records that arrive after the run returned.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source tag prepended by consoles that display host records.
pub const DEFAULT_PREFIX: &str = "wasmvm - ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

/// One leveled message. Immutable once appended to a [`Diagnostics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    #[serde(rename = "@lv")]
    pub level: Level,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "@ts")]
    pub timestamp: u64,
    #[serde(rename = "msg")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl DiagnosticRecord {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: now_millis(),
            message: message.into(),
            prefix: Some(DEFAULT_PREFIX.to_string()),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Message with its source tag, as a console would print it.
    pub fn display_line(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, self.message),
            None => self.message.clone(),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The `stdout`/`stderr` pair owned by one execution context.
///
/// Both sequences are append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    stdout: Vec<DiagnosticRecord>,
    stderr: Vec<DiagnosticRecord>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_stdout(&mut self, message: impl Into<String>) {
        self.stdout.push(DiagnosticRecord::info(message));
    }

    pub fn push_stderr(&mut self, message: impl Into<String>) {
        self.stderr.push(DiagnosticRecord::error(message));
    }

    pub fn stdout(&self) -> &[DiagnosticRecord] {
        &self.stdout
    }

    pub fn stderr(&self) -> &[DiagnosticRecord] {
        &self.stderr
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

/// Events published outside the synchronous run result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// An info record produced after the capability call returned,
    /// e.g. a transaction confirmation.
    Stdout(DiagnosticRecord),
    Stderr(DiagnosticRecord),
    /// A guest write changed database contents.
    SqlChanged,
}

/// Fire-and-forget consumer of [`HostEvent`]s.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: HostEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: HostEvent) {}
}

/// Keeps every event in memory, in publish order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<HostEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn take(&self) -> Vec<HostEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl EventSink for CollectingSink {
    fn publish(&self, event: HostEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
