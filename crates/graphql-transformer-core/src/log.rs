use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TransformerLogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

/// A diagnostic emitted by a plugin while transforming a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformerLog {
    pub level: TransformerLogLevel,
    pub message: String,
}

impl fmt::Display for TransformerLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Collects transformer diagnostics so the caller decides how to surface them.
///
/// Every entry is also forwarded to `tracing` at the matching level.
#[derive(Debug, Default)]
pub struct TransformerLogger {
    entries: Vec<TransformerLog>,
}

impl TransformerLogger {
    pub fn log(&mut self, level: TransformerLogLevel, message: impl Into<String>) {
        let message = message.into();

        match level {
            TransformerLogLevel::Error => tracing::error!("{message}"),
            TransformerLogLevel::Warn => tracing::warn!("{message}"),
            TransformerLogLevel::Info => tracing::info!("{message}"),
            TransformerLogLevel::Debug => tracing::debug!("{message}"),
        }

        self.entries.push(TransformerLog { level, message });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(TransformerLogLevel::Error, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(TransformerLogLevel::Warn, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(TransformerLogLevel::Info, message);
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.log(TransformerLogLevel::Debug, message);
    }

    pub fn entries(&self) -> &[TransformerLog] {
        &self.entries
    }

    /// Take every collected entry, leaving the logger empty.
    pub fn drain(&mut self) -> Vec<TransformerLog> {
        std::mem::take(&mut self.entries)
    }
}
