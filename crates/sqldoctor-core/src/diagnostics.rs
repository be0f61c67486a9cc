//! Injected diagnostic sink
//!
//! Analysis code reports soft warnings and informational signals through a
//! [`DiagnosticSink`] passed in by the caller instead of logging globally.
//! [`TracingSink`] forwards to `tracing`; [`MemorySink`] keeps events for
//! inspection in tests.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Severity of a diagnostic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warning,
}

/// A structured diagnostic event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub level: DiagnosticLevel,
    /// Stable machine-readable code, e.g. `plan.malformed`
    pub code: String,
    pub message: String,
    /// Extra key/value context
    pub fields: Vec<(String, String)>,
}

impl DiagnosticEvent {
    pub fn new(level: DiagnosticLevel, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            code: code.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn debug(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Debug, code, message)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, code, message)
    }

    /// Attach a context field
    pub fn with_field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// Look up a context field by key
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn fields_display(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Receiver for diagnostic events
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: DiagnosticEvent);
}

/// Sink that forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: DiagnosticEvent) {
        let fields = event.fields_display();
        match event.level {
            DiagnosticLevel::Debug => {
                tracing::debug!(code = %event.code, fields = %fields, "{}", event.message)
            }
            DiagnosticLevel::Info => {
                tracing::info!(code = %event.code, fields = %fields, "{}", event.message)
            }
            DiagnosticLevel::Warning => {
                tracing::warn!(code = %event.code, fields = %fields, "{}", event.message)
            }
        }
    }
}

/// Sink that records every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    /// Recorded warning-level events
    pub fn warnings(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == DiagnosticLevel::Warning)
            .cloned()
            .collect()
    }

    /// Whether an event with the given code was recorded
    pub fn has_code(&self, code: &str) -> bool {
        self.events.lock().iter().any(|e| e.code == code)
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, event: DiagnosticEvent) {
        self.events.lock().push(event);
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _event: DiagnosticEvent) {}
}

#[cfg(test)]
mod tests;
