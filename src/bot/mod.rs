/// Process cancellation registry
pub mod cancel;
/// Messaging client seam and message snapshots
pub mod client;
/// Shared state for wrapped messages
pub mod context;
/// Command input and flag parsing
pub mod flags;
/// Command definitions and routing
pub mod handlers;
/// Audit log channel
pub mod log_channel;
/// Decorated message with send strategies
pub mod message;
/// Telegram implementation of the client seam
pub mod telegram;

pub use context::BotContext;
pub use message::CommandMessage;
