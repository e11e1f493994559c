//! Chat log bridge
//!
//! Forwards selected log events to the chat so that the bot owner learns
//! about persistent failures without reading the process output.
//!
//! Only events emitted with `target: CHAT_TARGET` at INFO level or above are
//! captured. They are buffered by a tracing layer and sent periodically by a
//! background task.

use herald_core::domain::{ChatLogEntry, LogLevel};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, debug, warn};
use tracing_subscriber::layer::{Context, Layer};

use crate::service::Notifier;

/// Tracing target whose events are forwarded to the chat
pub const CHAT_TARGET: &str = "herald::chat";

/// Thread-safe buffer of log entries waiting to be sent
#[derive(Clone, Default)]
pub struct ChatLogBuffer {
    entries: Arc<Mutex<Vec<ChatLogEntry>>>,
}

impl ChatLogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a log entry to the buffer
    pub fn push(&self, entry: ChatLogEntry) {
        // A poisoned lock still holds a usable Vec; logging must not panic.
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(entry);
    }

    /// Returns all buffered entries and clears the buffer
    pub fn drain(&self) -> Vec<ChatLogEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.drain(..).collect()
    }
}

/// Tracing layer that copies chat-targeted events into a [`ChatLogBuffer`]
pub struct ChatLogLayer {
    buffer: ChatLogBuffer,
}

impl ChatLogLayer {
    pub fn new(buffer: ChatLogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S: Subscriber> Layer<S> for ChatLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() != CHAT_TARGET || *metadata.level() > Level::INFO {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.buffer
            .push(ChatLogEntry::new(to_log_level(metadata.level()), visitor.finish()));
    }
}

fn to_log_level(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warning,
        Level::INFO => LogLevel::Info,
        _ => LogLevel::Debug,
    }
}

/// Collects the `message` field and appends other fields as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Spawns a background task that forwards buffered entries to the chat
///
/// The task sends whatever is buffered on every tick and once more after
/// `shutdown` is cancelled, then exits.
pub fn spawn_log_sender(
    buffer: ChatLogBuffer,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            let stopping = tokio::select! {
                biased;
                _ = shutdown.cancelled() => true,
                _ = ticker.tick() => false,
            };

            forward_logs(&buffer, notifier.as_ref()).await;

            if stopping {
                debug!("Chat log sender stopped");
                break;
            }
        }
    })
}

/// Sends every buffered entry, returning how many were delivered
pub async fn forward_logs(buffer: &ChatLogBuffer, notifier: &dyn Notifier) -> usize {
    let mut delivered = 0;

    for entry in buffer.drain() {
        // Logged on the default target so a broken chat cannot feed itself.
        match notifier.send_text(&entry.to_chat_text()).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!("Failed to forward log entry to chat: {:#}", e),
        }
    }

    delivered
}
