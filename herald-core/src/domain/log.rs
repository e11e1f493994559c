//! Log domain types

/// A log entry waiting to be forwarded to the chat
#[derive(Debug, Clone)]
pub struct ChatLogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl ChatLogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            level,
            message: message.into(),
        }
    }

    /// Renders the entry as chat text
    ///
    /// Informational entries are sent as-is; warnings and errors carry a
    /// level prefix so they stand out among review notifications.
    pub fn to_chat_text(&self) -> String {
        match self.level {
            LogLevel::Debug | LogLevel::Info => self.message.clone(),
            LogLevel::Warning | LogLevel::Error => format!("{}: {}", self.level, self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}
