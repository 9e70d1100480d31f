use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nimbus_core::model::AuthToken;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub created: DateTime<Utc>,
}

/// Collects the lines a task wants forwarded to its log endpoint. Every
/// recorded line is also emitted through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LogLevel, message: String) {
        if let Ok(mut records) = self.records.lock() {
            records.push(LogRecord {
                level,
                message,
                created: Utc::now(),
            });
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.push(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.push(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}", message);
        self.push(LogLevel::Error, message);
    }

    pub fn drain(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|mut records| std::mem::take(&mut *records))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
pub trait LogSink: Send + Sync {
    async fn forward(&self, url: &str, token: &AuthToken, records: &[LogRecord]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_records_in_order() {
        let capture = LogCapture::new();
        capture.info("starting");
        capture.warn("slow");
        capture.error("failed");

        let records = capture.drain();
        let levels: Vec<_> = records.iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![LogLevel::Info, LogLevel::Warn, LogLevel::Error]);
        assert_eq!(records[0].message, "starting");
        assert!(capture.is_empty());
    }

    #[test]
    fn test_clones_share_records() {
        let capture = LogCapture::new();
        let other = capture.clone();
        other.info("from clone");
        assert_eq!(capture.len(), 1);
    }

    #[test]
    fn test_record_wire_format() {
        let record = LogRecord {
            level: LogLevel::Warn,
            message: "m".to_string(),
            created: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["level"], "warn");
        assert_eq!(json["message"], "m");
    }
}
