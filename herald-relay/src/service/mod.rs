//! Service layer
//!
//! Services wrap the HTTP clients behind traits so the poller can be driven
//! by fakes in tests, and hold the chat log bridge.

pub mod chat_log;
mod notifier;
mod source;

// Re-export traits
pub use notifier::Notifier;
pub use source::ReviewSource;

// Re-export implementations
pub use chat_log::{CHAT_TARGET, ChatLogBuffer, ChatLogLayer};
pub use notifier::TelegramNotifier;
pub use source::DevmanReviewSource;
