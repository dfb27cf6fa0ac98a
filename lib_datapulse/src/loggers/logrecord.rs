use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// # LogRecord
///
/// A single diagnostic event as captured by [`super::MemorySink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Lowercase level name (`info`, `warn`, `error`, ...).
    pub level: String,
    /// The pipeline stage that emitted the event (`collect`, `process`, `readme`, ...).
    pub stage: String,
    /// Human readable message.
    pub message: String,
    /// Structured context such as the source, file path or section.
    pub extras: Value,
    /// RFC 3339 UTC timestamp of when the record was created.
    pub ts: String,
}

impl LogRecord {
    pub fn new(level: &str, stage: &str, message: &str, extras: Option<Value>) -> Self {
        Self {
            level: level.to_string(),
            stage: stage.to_string(),
            message: message.to_string(),
            extras: extras.unwrap_or(Value::Null),
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
