use serde::Serialize;
use std::fmt;

/// Severity of a run log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub message: String,
    pub message_type: MessageType,
}

type Sink = Box<dyn FnMut(&LogEntry) + Send>;

/// Structured log of one run.
///
/// Entries are kept for the caller, mirrored to the `log` facade, and
/// optionally forwarded to a sink so a front end can show them live.
#[derive(Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
    warnings: usize,
    errors: usize,
    sink: Option<Sink>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: impl FnMut(&LogEntry) + Send + 'static) -> Self {
        Self {
            sink: Some(Box::new(sink)),
            ..Self::default()
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!(target: "stemsplit", "{}", message);
        self.push(message, MessageType::Info);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!(target: "stemsplit", "{}", message);
        self.warnings += 1;
        self.push(message, MessageType::Warning);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!(target: "stemsplit", "{}", message);
        self.errors += 1;
        self.push(message, MessageType::Error);
    }

    /// Per-event detail, sent to the `log` facade only
    pub fn detail(&self, message: fmt::Arguments<'_>) {
        log::debug!(target: "stemsplit", "{}", message);
    }

    fn push(&mut self, message: String, message_type: MessageType) {
        let entry = LogEntry {
            message,
            message_type,
        };
        if let Some(sink) = self.sink.as_mut() {
            sink(&entry);
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Warning entries only, in order
    pub fn warning_messages(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.message_type == MessageType::Warning)
            .map(|e| e.message.as_str())
    }
}

impl fmt::Debug for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLog")
            .field("entries", &self.entries.len())
            .field("warnings", &self.warnings)
            .field("errors", &self.errors)
            .finish()
    }
}
