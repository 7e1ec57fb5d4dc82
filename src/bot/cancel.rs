//! Process cancellation registry
//!
//! A `/cancel` request marks a message; the long-running command that owns
//! that message notices the mark the next time it checks. Marks are keyed
//! per chat, deduplicated, and expire if nobody consumes them.

use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// Identifies a message across chats
pub type MessageKey = (i64, i32);

/// Shared set of pending cancellation requests
#[derive(Clone)]
pub struct CancelRegistry {
    /// Moka cache storing (chat_id, message_id) -> () with automatic TTL
    pending: Cache<MessageKey, ()>,
}

impl CancelRegistry {
    /// Creates a registry whose entries expire after `ttl_secs`
    ///
    /// # Examples
    ///
    /// ```
    /// use userbot::bot::cancel::CancelRegistry;
    ///
    /// let registry = CancelRegistry::new(3600);
    /// ```
    #[must_use]
    pub fn new(ttl_secs: u64) -> Self {
        let pending = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { pending }
    }

    /// Requests cancellation of the process attached to `key`.
    /// Repeated requests for the same key collapse into one.
    pub async fn cancel(&self, key: MessageKey) {
        debug!(chat_id = key.0, message_id = key.1, "Cancellation requested");
        self.pending.insert(key, ()).await;
    }

    /// Consumes a pending request for `key`, returning whether one existed
    pub async fn take(&self, key: MessageKey) -> bool {
        self.pending.remove(&key).await.is_some()
    }

    /// Whether a request for `key` is pending, without consuming it
    #[cfg(test)]
    pub(crate) async fn is_pending(&self, key: MessageKey) -> bool {
        self.pending.contains_key(&key)
    }
}
