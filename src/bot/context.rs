//! Shared state handed to every wrapped message.

use crate::bot::cancel::CancelRegistry;
use crate::bot::client::ChatClient;
use crate::bot::log_channel::LogChannel;
use crate::config::Settings;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Client, log channel, cancellation registry and layer settings
pub struct BotContext {
    /// Messaging client
    pub client: Arc<dyn ChatClient>,
    /// Audit log destination
    pub log: LogChannel,
    /// Pending cancellation requests
    pub cancels: CancelRegistry,
    /// Delay used by [`crate::bot::message::AutoDelete::ConfigDefault`]
    pub delete_timeout: Duration,
    /// Downloads and temporary uploads
    pub download_dir: PathBuf,
    /// Users allowed to issue commands, empty admits everyone
    pub allowed_users: HashSet<i64>,
}

impl BotContext {
    /// Build the context from loaded settings
    #[must_use]
    pub fn new(client: Arc<dyn ChatClient>, settings: &Settings) -> Self {
        Self {
            log: LogChannel::new(client.clone(), settings.log_channel_id),
            cancels: CancelRegistry::new(settings.cancel_ttl_secs),
            delete_timeout: settings.msg_delete_timeout(),
            download_dir: settings.download_dir(),
            allowed_users: settings.allowed_users(),
            client,
        }
    }

    /// Whether `user_id` may issue commands
    #[must_use]
    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.contains(&user_id)
    }
}
