use serde::Serialize;
use stemsplit_engine::{LogEntry, MessageType};

/// One run log entry as a front end receives it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggerPayload {
    pub file: String,
    pub message: String,
    pub message_type: MessageType,
}

/// Emits run log entries of one file as JSON lines on stdout
#[derive(Clone)]
pub struct Logger {
    pub file: String,
}

impl Logger {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }

    pub fn payload(&self, entry: &LogEntry) -> LoggerPayload {
        LoggerPayload {
            file: self.file.clone(),
            message: entry.message.clone(),
            message_type: entry.message_type,
        }
    }

    pub fn log(&self, entry: &LogEntry) {
        match serde_json::to_string(&self.payload(entry)) {
            Ok(line) => println!("{}", line),
            Err(e) => log::error!("Failed to encode log entry: {}", e),
        }
    }

    /// Sink for [`stemsplit_engine::RunLog::with_sink`]
    pub fn into_sink(self) -> impl FnMut(&LogEntry) + Send + 'static {
        move |entry| self.log(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let logger = Logger::new("song.mid");
        let payload = logger.payload(&LogEntry {
            message: "Rule skipped".to_string(),
            message_type: MessageType::Warning,
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "file": "song.mid",
                "message": "Rule skipped",
                "message_type": "warning"
            })
        );
    }
}
