//! Audit log channel.

use crate::bot::client::{ChatClient, ChatKind, ChatRef, MessageData, TextOptions};
use std::sync::Arc;
use tracing::{debug, warn};

/// Secondary chat that receives copies of selected messages.
///
/// Failures are logged and swallowed: auditing never breaks a command.
#[derive(Clone)]
pub struct LogChannel {
    client: Arc<dyn ChatClient>,
    chat_id: Option<i64>,
}

impl LogChannel {
    /// Log channel posting to `chat_id`, or a no-op when `None`
    #[must_use]
    pub fn new(client: Arc<dyn ChatClient>, chat_id: Option<i64>) -> Self {
        Self { client, chat_id }
    }

    /// Whether a destination is configured
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.chat_id.is_some()
    }

    /// Forward `message` to the log chat
    pub async fn forward(&self, message: &MessageData) {
        let Some(chat_id) = self.chat_id else {
            debug!(message_id = message.id, "Log channel disabled, skipping forward");
            return;
        };

        if let Err(e) = self.client.forward_message(chat_id, message).await {
            warn!(
                "Failed to forward message {} to log channel {}: {}",
                message.id, chat_id, e
            );
        }
    }

    /// Post a plain note to the log chat
    pub async fn log(&self, text: &str) {
        let Some(chat_id) = self.chat_id else {
            debug!("Log channel disabled, skipping note");
            return;
        };

        let chat = ChatRef {
            id: chat_id,
            kind: ChatKind::Channel,
        };
        let options = TextOptions {
            disable_notification: true,
            ..TextOptions::default()
        };
        if let Err(e) = self.client.send_message(chat, text, &options).await {
            warn!("Failed to post note to log channel {}: {}", chat_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::client::MockChatClient;
    use crate::error::ChatError;

    fn sample() -> MessageData {
        MessageData {
            id: 7,
            chat: ChatRef {
                id: 1,
                kind: ChatKind::Private,
            },
            text: Some("hello".to_string()),
            photo: None,
            reply_to: None,
        }
    }

    #[tokio::test]
    async fn test_disabled_channel_is_noop() {
        let mut mock = MockChatClient::new();
        mock.expect_forward_message().never();
        mock.expect_send_message().never();

        let channel = LogChannel::new(Arc::new(mock), None);
        assert!(!channel.is_enabled());
        channel.forward(&sample()).await;
        channel.log("note").await;
    }

    #[tokio::test]
    async fn test_forward_failure_is_swallowed() {
        let mut mock = MockChatClient::new();
        mock.expect_forward_message()
            .withf(|to, msg| *to == -5 && msg.id == 7)
            .times(1)
            .returning(|_, _| Err(ChatError::Api("Forbidden: bot is not a member".into())));

        let channel = LogChannel::new(Arc::new(mock), Some(-5));
        channel.forward(&sample()).await;
    }

    #[tokio::test]
    async fn test_log_posts_silent_note() {
        let mut mock = MockChatClient::new();
        mock.expect_send_message()
            .withf(|chat, text, options| {
                chat.id == -5 && text == "started" && options.disable_notification
            })
            .times(1)
            .returning(|chat, text, _| {
                Ok(MessageData {
                    id: 1,
                    chat,
                    text: Some(text.to_string()),
                    photo: None,
                    reply_to: None,
                })
            });

        let channel = LogChannel::new(Arc::new(mock), Some(-5));
        channel.log("started").await;
    }
}
