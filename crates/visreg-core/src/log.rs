//! Injected logging interface.
//!
//! Components receive a [`Logger`] instead of writing to a process-wide
//! logger, so a test can hand each one a [`MemorySink`] and assert on what was
//! reported. Production code uses [`TracingSink`], which forwards everything to
//! `tracing`.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic detail
    Debug,
    /// Normal progress
    Info,
    /// Something the operator should look at
    Warn,
    /// A failed operation
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Destination for log entries.
pub trait LogSink: Send + Sync {
    /// Record one entry. `component` names the emitting component.
    fn log(&self, level: LogLevel, component: &str, message: &str);
}

/// Forwards entries to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, component: &str, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(component, "{}", message),
            LogLevel::Info => tracing::info!(component, "{}", message),
            LogLevel::Warn => tracing::warn!(component, "{}", message),
            LogLevel::Error => tracing::error!(component, "{}", message),
        }
    }
}

/// A recorded log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,
    /// Emitting component
    pub component: String,
    /// Rendered message
    pub message: String,
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry recorded so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Entries at exactly `level`.
    pub fn at_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level)
            .collect()
    }

    /// Whether any entry at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.at_level(level)
            .iter()
            .any(|entry| entry.message.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, component: &str, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                component: component.to_string(),
                message: message.to_string(),
            });
        }
    }
}

/// Cloneable handle that components log through.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    component: &'static str,
}

impl Logger {
    /// Create a logger writing to `sink`.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            component: "visreg",
        }
    }

    /// Logger backed by [`TracingSink`].
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    /// Same sink, tagged with a different component name.
    pub fn for_component(&self, component: &'static str) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            component,
        }
    }

    /// Component name attached to entries.
    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Log at an explicit level.
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        self.sink.log(level, self.component, message.as_ref());
    }

    /// Log at debug level.
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    /// Log at info level.
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    /// Log at warn level.
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message);
    }

    /// Log at error level.
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}
