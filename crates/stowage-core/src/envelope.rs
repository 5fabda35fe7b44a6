//! Result envelopes reported to callers.
//!
//! An envelope carries either a human-readable message or a data payload as
//! its meaningful content, never both: data-bearing envelopes use the
//! configured default message, message-bearing envelopes carry no data.

use serde::Serialize;

/// Outcome report: code, message, optional data, and creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEnvelope<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Creation time (Unix ms).
    pub timestamp: i64,
    #[serde(skip)]
    success: bool,
}

impl<T> ResultEnvelope<T> {
    /// A success envelope whose payload is `message`.
    pub fn ok_message(code: i32, message: impl Into<String>) -> Self {
        Self::build(code, message.into(), None, true)
    }

    /// A success envelope whose payload is `data`.
    pub fn ok_data(code: i32, message: impl Into<String>, data: T) -> Self {
        Self::build(code, message.into(), Some(data), true)
    }

    /// A failure envelope.
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self::build(code, message.into(), None, false)
    }

    fn build(code: i32, message: String, data: Option<T>, success: bool) -> Self {
        Self {
            code,
            message,
            data,
            timestamp: now_millis(),
            success,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Whether the data field, rather than the message, is the payload.
    pub fn is_data_bearing(&self) -> bool {
        self.data.is_some()
    }

    /// Apply `f` to the data payload, if any.
    pub fn map_data<U>(self, f: impl FnOnce(T) -> U) -> ResultEnvelope<U> {
        ResultEnvelope {
            code: self.code,
            message: self.message,
            data: self.data.map(f),
            timestamp: self.timestamp,
            success: self.success,
        }
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
