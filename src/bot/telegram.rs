//! Resilient [`ChatClient`] over the Telegram Bot API.
//!
//! Every call goes through [`crate::utils::retry_telegram_operation`], so
//! transient network failures are retried with exponential backoff while
//! semantic API errors surface immediately.

use crate::bot::client::{ChatClient, ChatKind, ChatRef, DocumentOptions, MessageData, TextOptions};
use crate::error::ChatError;
use crate::utils::retry_telegram_operation;
use async_trait::async_trait;
use std::path::Path;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, LinkPreviewOptions, MessageId, ReplyParameters};
use tracing::debug;

impl From<&Message> for MessageData {
    fn from(msg: &Message) -> Self {
        let kind = if msg.chat.is_private() {
            ChatKind::Private
        } else if msg.chat.is_channel() {
            ChatKind::Channel
        } else {
            ChatKind::Group
        };

        Self {
            id: msg.id.0,
            chat: ChatRef {
                id: msg.chat.id.0,
                kind,
            },
            text: msg.text().or_else(|| msg.caption()).map(ToOwned::to_owned),
            photo: msg
                .photo()
                .and_then(|sizes| sizes.last())
                .map(|size| size.file.id.0.clone()),
            reply_to: msg.reply_to_message().map(|r| Box::new(Self::from(r))),
        }
    }
}

const fn disabled_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Telegram-backed chat client
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    /// Wrap a teloxide bot
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatClient for TelegramClient {
    async fn send_message(
        &self,
        chat: ChatRef,
        text: &str,
        options: &TextOptions,
    ) -> Result<MessageData, ChatError> {
        let sent = retry_telegram_operation(|| async {
            let mut req = self
                .bot
                .send_message(ChatId(chat.id), text.to_string())
                .disable_notification(options.disable_notification);
            if let Some(pm) = options.format.parse_mode() {
                req = req.parse_mode(pm);
            }
            if options.disable_web_page_preview {
                req = req.link_preview_options(disabled_preview());
            }
            if let Some(reply_to) = options.reply_to {
                req = req.reply_parameters(ReplyParameters::new(MessageId(reply_to)));
            }
            if let Some(markup) = &options.reply_markup {
                req = req.reply_markup(markup.clone());
            }
            req.await.map_err(ChatError::from)
        })
        .await?;

        Ok(MessageData::from(&sent))
    }

    async fn edit_message_text(
        &self,
        chat: ChatRef,
        message_id: i32,
        text: &str,
        options: &TextOptions,
    ) -> Result<MessageData, ChatError> {
        let edited = retry_telegram_operation(|| async {
            let mut req =
                self.bot
                    .edit_message_text(ChatId(chat.id), MessageId(message_id), text.to_string());
            if let Some(pm) = options.format.parse_mode() {
                req = req.parse_mode(pm);
            }
            if options.disable_web_page_preview {
                req = req.link_preview_options(disabled_preview());
            }
            if let Some(markup) = &options.reply_markup {
                req = req.reply_markup(markup.clone());
            }
            req.await.map_err(ChatError::from)
        })
        .await?;

        Ok(MessageData::from(&edited))
    }

    async fn delete_message(&self, chat: ChatRef, message_id: i32) -> Result<(), ChatError> {
        retry_telegram_operation(|| async {
            self.bot
                .delete_message(ChatId(chat.id), MessageId(message_id))
                .await
                .map_err(ChatError::from)
        })
        .await?;
        debug!(chat_id = chat.id, message_id, "Message deleted");
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatRef,
        path: &Path,
        options: &DocumentOptions,
    ) -> Result<MessageData, ChatError> {
        let sent = retry_telegram_operation(|| async {
            let mut file = InputFile::file(path.to_path_buf());
            if let Some(name) = &options.file_name {
                file = file.file_name(name.clone());
            }
            let mut req = self
                .bot
                .send_document(ChatId(chat.id), file)
                .disable_notification(options.disable_notification);
            if !options.caption.is_empty() {
                req = req.caption(options.caption.clone());
            }
            if let Some(reply_to) = options.reply_to {
                req = req.reply_parameters(ReplyParameters::new(MessageId(reply_to)));
            }
            req.await.map_err(ChatError::from)
        })
        .await?;

        Ok(MessageData::from(&sent))
    }

    async fn forward_message(
        &self,
        to_chat_id: i64,
        message: &MessageData,
    ) -> Result<MessageData, ChatError> {
        let forwarded = retry_telegram_operation(|| async {
            self.bot
                .forward_message(
                    ChatId(to_chat_id),
                    ChatId(message.chat.id),
                    MessageId(message.id),
                )
                .await
                .map_err(ChatError::from)
        })
        .await?;

        Ok(MessageData::from(&forwarded))
    }

    async fn download_file(&self, file_id: &str, destination: &Path) -> Result<(), ChatError> {
        let file = retry_telegram_operation(|| async {
            self.bot
                .get_file(FileId(file_id.to_string()))
                .await
                .map_err(ChatError::from)
        })
        .await?;

        retry_telegram_operation(|| async {
            let mut dst = tokio::fs::File::create(destination).await?;
            self.bot.download_file(&file.path, &mut dst).await?;
            Ok(())
        })
        .await?;

        debug!(file_id, path = %destination.display(), "File downloaded");
        Ok(())
    }
}
