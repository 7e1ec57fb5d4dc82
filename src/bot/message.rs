//! Decorated command message.
//!
//! [`CommandMessage`] wraps an incoming message with input parsing,
//! cancellation checks and send strategies that fall back when the platform
//! refuses an edit:
//!
//! | failure            | strategy                         | fallback          |
//! |--------------------|----------------------------------|-------------------|
//! | author required    | `force_edit`                     | `reply`           |
//! | text too long      | `edit_or_send_as_file`           | `send_as_file`    |
//! | not modified       | `try_to_edit`                    | no-op             |

use crate::bot::cancel::MessageKey;
use crate::bot::client::{ChatRef, DocumentOptions, MessageData, TextFormat, TextOptions};
use crate::bot::context::BotContext;
use crate::bot::flags::{self, FlagOptions, ParsedInput};
use crate::config::ERROR_MSG_DELETE_TIMEOUT_SECS;
use crate::error::ChatError;
use crate::utils::truncate_str;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use teloxide::types::InlineKeyboardMarkup;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// When a sent or edited message removes itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoDelete {
    /// Keep the message
    #[default]
    Never,
    /// Use the configured `msg_delete_timeout` (0 keeps the message)
    ConfigDefault,
    /// Delete after the given delay (zero keeps the message)
    After(Duration),
}

impl AutoDelete {
    /// Shorthand for `After(Duration::from_secs(secs))`
    #[must_use]
    pub const fn secs(secs: u64) -> Self {
        Self::After(Duration::from_secs(secs))
    }

    /// Delay to wait before deleting, if any
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use userbot::bot::message::AutoDelete;
    ///
    /// let default = Duration::from_secs(120);
    /// assert_eq!(AutoDelete::Never.resolve(default), None);
    /// assert_eq!(AutoDelete::ConfigDefault.resolve(default), Some(default));
    /// assert_eq!(AutoDelete::secs(0).resolve(default), None);
    /// ```
    #[must_use]
    pub fn resolve(self, default: Duration) -> Option<Duration> {
        let delay = match self {
            Self::Never => return None,
            Self::ConfigDefault => default,
            Self::After(delay) => delay,
        };
        (!delay.is_zero()).then_some(delay)
    }

    /// Error messages always go away; keep a positive delay, else 5 seconds
    fn for_error(self) -> Self {
        match self {
            Self::After(delay) if !delay.is_zero() => self,
            _ => Self::secs(ERROR_MSG_DELETE_TIMEOUT_SECS),
        }
    }
}

/// Options for [`CommandMessage::edit`] and its fallback variants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOptions {
    /// Auto-delete policy
    pub auto_delete: AutoDelete,
    /// Forward the result to the log channel
    pub log: bool,
    /// Entity parsing
    pub format: TextFormat,
    /// Suppress link previews
    pub disable_web_page_preview: bool,
    /// Inline keyboard attached to the message
    pub reply_markup: Option<InlineKeyboardMarkup>,
    /// How the reply is sent when a `force_*` edit falls back to replying
    pub fallback: FallbackReply,
}

/// Reply-only settings used when an edit falls back to a reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackReply {
    /// Reply to the wrapped message; defaults to true outside private chats
    pub quote: Option<bool>,
    /// Explicit reply target, overrides `quote`
    pub reply_to_message_id: Option<i32>,
    /// Send silently
    pub disable_notification: bool,
}

impl EditOptions {
    /// Default options with the given auto-delete policy
    #[must_use]
    pub fn auto_delete(auto_delete: AutoDelete) -> Self {
        Self {
            auto_delete,
            ..Self::default()
        }
    }

    /// Enable forwarding to the log channel
    #[must_use]
    pub const fn logged(mut self) -> Self {
        self.log = true;
        self
    }
}

/// Options for [`CommandMessage::reply`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyOptions {
    /// Auto-delete policy
    pub auto_delete: AutoDelete,
    /// Forward the result to the log channel
    pub log: bool,
    /// Reply to this message; defaults to true outside private chats
    pub quote: Option<bool>,
    /// Entity parsing
    pub format: TextFormat,
    /// Suppress link previews
    pub disable_web_page_preview: bool,
    /// Send silently
    pub disable_notification: bool,
    /// Explicit reply target, overrides `quote`
    pub reply_to_message_id: Option<i32>,
    /// Inline keyboard attached to the message
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl From<&EditOptions> for ReplyOptions {
    fn from(options: &EditOptions) -> Self {
        Self {
            auto_delete: options.auto_delete,
            log: options.log,
            quote: options.fallback.quote,
            format: options.format,
            disable_web_page_preview: options.disable_web_page_preview,
            disable_notification: options.fallback.disable_notification,
            reply_to_message_id: options.fallback.reply_to_message_id,
            reply_markup: options.reply_markup.clone(),
        }
    }
}

/// Options for [`CommandMessage::send_as_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOptions {
    /// File name shown to recipients
    pub filename: String,
    /// Document caption
    pub caption: String,
    /// Forward the document to the log channel
    pub log: bool,
    /// Delete the wrapped message after uploading
    pub delete_message: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            filename: "output.txt".to_string(),
            caption: String::new(),
            log: false,
            delete_message: true,
        }
    }
}

/// Result of a send strategy
pub enum Delivery {
    /// The message that was sent or edited
    Sent(CommandMessage),
    /// The message was auto-deleted after its delay
    Deleted,
    /// The edit changed nothing
    Unchanged,
}

impl Delivery {
    /// The delivered message, if it still exists
    #[must_use]
    pub fn into_message(self) -> Option<CommandMessage> {
        match self {
            Self::Sent(message) => Some(message),
            Self::Deleted | Self::Unchanged => None,
        }
    }

    /// Whether the message was auto-deleted
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }

    /// Whether the edit was a no-op
    #[must_use]
    pub const fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

/// Formats `text` as an error notice
#[must_use]
pub fn error_text(text: &str) -> String {
    format!("<b>ERROR</b>: <code>{}</code>", html_escape::encode_text(text))
}

/// Incoming message decorated with parsing and send strategies
pub struct CommandMessage {
    ctx: Arc<BotContext>,
    data: MessageData,
    flag_options: FlagOptions,
    parsed: OnceLock<ParsedInput>,
    canceled: AtomicBool,
}

impl CommandMessage {
    /// Wrap `data` with the shared context
    #[must_use]
    pub fn new(ctx: Arc<BotContext>, data: MessageData) -> Self {
        Self {
            ctx,
            data,
            flag_options: FlagOptions::default(),
            parsed: OnceLock::new(),
            canceled: AtomicBool::new(false),
        }
    }

    /// Use custom flag recognition for this command
    #[must_use]
    pub fn with_flag_options(mut self, options: FlagOptions) -> Self {
        self.flag_options = options;
        self.parsed = OnceLock::new();
        self
    }

    /// Message id
    #[must_use]
    pub const fn id(&self) -> i32 {
        self.data.id
    }

    /// Chat the message lives in
    #[must_use]
    pub const fn chat(&self) -> ChatRef {
        self.data.chat
    }

    /// Underlying snapshot
    #[must_use]
    pub const fn data(&self) -> &MessageData {
        &self.data
    }

    /// Shared context
    #[must_use]
    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    /// Text or caption
    #[must_use]
    pub fn text(&self) -> &str {
        self.data.text()
    }

    /// Registry key for this message
    #[must_use]
    pub const fn key(&self) -> MessageKey {
        (self.data.chat.id, self.data.id)
    }

    /// The replied-to message, wrapped with the same context
    #[must_use]
    pub fn reply_to_message(&self) -> Option<Self> {
        self.data
            .reply_to
            .as_deref()
            .map(|reply| Self::new(self.ctx.clone(), reply.clone()))
    }

    /// Input without the command word
    #[must_use]
    pub fn input_str(&self) -> &str {
        flags::input_str(self.text())
    }

    /// Input without the command word, or the replied message's text
    #[must_use]
    pub fn input_or_reply_str(&self) -> String {
        let input = self.input_str();
        if input.is_empty() {
            if let Some(reply) = &self.data.reply_to {
                return reply.text().trim().to_string();
            }
        }
        input.to_string()
    }

    fn parsed(&self) -> &ParsedInput {
        self.parsed.get_or_init(|| {
            let parsed = flags::parse_flags(self.input_str(), &self.flag_options);
            info!(
                "Filtered Input String => [ {}, {:?} ]",
                parsed.filtered, parsed.flags
            );
            parsed
        })
    }

    /// Input without the command word and without flags
    #[must_use]
    pub fn filtered_input_str(&self) -> &str {
        &self.parsed().filtered
    }

    /// Flags found in the input
    #[must_use]
    pub fn flags(&self) -> &HashMap<String, String> {
        &self.parsed().flags
    }

    /// Whether someone asked to cancel the process attached to this message.
    ///
    /// A pending request is consumed from the registry and remembered on this
    /// message, so later checks keep returning `true`.
    pub async fn process_is_canceled(&self) -> bool {
        if self.ctx.cancels.take(self.key()).await {
            self.canceled.store(true, Ordering::SeqCst);
        }
        self.canceled.load(Ordering::SeqCst)
    }

    /// Ask the process attached to this message to stop
    pub async fn cancel_the_process(&self) {
        self.ctx.cancels.cancel(self.key()).await;
    }

    /// Delete this message
    ///
    /// # Errors
    ///
    /// Returns the client error if deletion fails.
    pub async fn delete(&self) -> Result<(), ChatError> {
        self.ctx.client.delete_message(self.chat(), self.id()).await
    }

    fn wrap(&self, data: MessageData) -> Self {
        Self::new(self.ctx.clone(), data)
    }

    async fn deliver(
        &self,
        sent: MessageData,
        log: bool,
        auto_delete: AutoDelete,
    ) -> Result<Delivery, ChatError> {
        if log {
            self.ctx.log.forward(&sent).await;
        }

        if let Some(delay) = auto_delete.resolve(self.ctx.delete_timeout) {
            debug!(message_id = sent.id, ?delay, "Scheduled auto-delete");
            tokio::time::sleep(delay).await;
            self.ctx.client.delete_message(sent.chat, sent.id).await?;
            return Ok(Delivery::Deleted);
        }

        Ok(Delivery::Sent(self.wrap(sent)))
    }

    /// Upload `text` as a document in this chat.
    ///
    /// The document replies to the replied-to message when there is one,
    /// otherwise to this message.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written or the upload
    /// fails.
    pub async fn send_as_file(
        &self,
        text: &str,
        options: FileOptions,
    ) -> Result<CommandMessage, ChatError> {
        tokio::fs::create_dir_all(&self.ctx.download_dir).await?;
        let path = self
            .ctx
            .download_dir
            .join(format!("{}-{}", Uuid::new_v4().as_simple(), options.filename));
        tokio::fs::write(&path, text).await?;

        let reply_to = self
            .data
            .reply_to
            .as_ref()
            .map_or(self.id(), |reply| reply.id);

        info!("Uploading {} To Telegram", options.filename);

        let document = DocumentOptions {
            file_name: Some(options.filename.clone()),
            caption: options.caption.clone(),
            disable_notification: true,
            reply_to: Some(reply_to),
        };
        let result = self
            .ctx
            .client
            .send_document(self.chat(), &path, &document)
            .await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove temporary file {}: {}", path.display(), e);
        }
        let sent = result?;

        if options.log {
            self.ctx.log.forward(&sent).await;
        }

        if options.delete_message {
            self.delete().await?;
        }

        Ok(self.wrap(sent))
    }

    /// Send `text` to this chat.
    ///
    /// # Errors
    ///
    /// Returns the client error if sending or the auto-delete fails.
    pub async fn reply(&self, text: &str, options: &ReplyOptions) -> Result<Delivery, ChatError> {
        let quote = options.quote.unwrap_or(!self.chat().is_private());
        let reply_to = options
            .reply_to_message_id
            .or_else(|| quote.then_some(self.id()));

        let text_options = TextOptions {
            format: options.format,
            disable_web_page_preview: options.disable_web_page_preview,
            disable_notification: options.disable_notification,
            reply_to,
            reply_markup: options.reply_markup.clone(),
        };
        let sent = self
            .ctx
            .client
            .send_message(self.chat(), text, &text_options)
            .await?;

        self.deliver(sent, options.log, options.auto_delete).await
    }

    /// Replace this message's text.
    ///
    /// # Errors
    ///
    /// Returns the client error if the edit or the auto-delete fails.
    pub async fn edit(&self, text: &str, options: &EditOptions) -> Result<Delivery, ChatError> {
        let text_options = TextOptions {
            format: options.format,
            disable_web_page_preview: options.disable_web_page_preview,
            reply_markup: options.reply_markup.clone(),
            ..TextOptions::default()
        };
        let edited = self
            .ctx
            .client
            .edit_message_text(self.chat(), self.id(), text, &text_options)
            .await?;

        self.deliver(edited, options.log, options.auto_delete).await
    }

    /// Edit, or reply when the message belongs to someone else.
    ///
    /// # Errors
    ///
    /// Propagates every failure other than "author required".
    pub async fn force_edit(
        &self,
        text: &str,
        options: &EditOptions,
    ) -> Result<Delivery, ChatError> {
        match self.edit(text, options).await {
            Err(ChatError::AuthorRequired) => {
                debug!(message_id = self.id(), "Edit refused, replying instead");
                self.reply(text, &ReplyOptions::from(options)).await
            }
            other => other,
        }
    }

    /// Edit this message into an error notice. The notice is always
    /// auto-deleted, after 5 seconds unless a positive delay is given.
    ///
    /// # Errors
    ///
    /// Returns the client error if the edit fails.
    pub async fn err(&self, text: &str, options: &EditOptions) -> Result<Delivery, ChatError> {
        let options = EditOptions {
            auto_delete: options.auto_delete.for_error(),
            ..options.clone()
        };
        self.edit(&error_text(text), &options).await
    }

    /// [`Self::err`] with the [`Self::force_edit`] fallback.
    ///
    /// # Errors
    ///
    /// Propagates every failure other than "author required".
    pub async fn force_err(&self, text: &str, options: &EditOptions) -> Result<Delivery, ChatError> {
        let options = EditOptions {
            auto_delete: options.auto_delete.for_error(),
            ..options.clone()
        };
        self.force_edit(&error_text(text), &options).await
    }

    /// Edit, treating "not modified" as a no-op.
    ///
    /// # Errors
    ///
    /// Propagates every failure other than "not modified".
    pub async fn try_to_edit(
        &self,
        text: &str,
        options: &EditOptions,
    ) -> Result<Delivery, ChatError> {
        match self.edit(text, options).await {
            Err(ChatError::NotModified) => {
                debug!(message_id = self.id(), "Edit skipped: message not modified");
                Ok(Delivery::Unchanged)
            }
            other => other,
        }
    }

    /// Edit, or upload the text as a file when it is too long.
    ///
    /// # Errors
    ///
    /// Propagates every failure other than "too long".
    pub async fn edit_or_send_as_file(
        &self,
        text: &str,
        options: &EditOptions,
        file: FileOptions,
    ) -> Result<Delivery, ChatError> {
        match self.edit(text, options).await {
            Err(ChatError::TooLong) => {
                info!(
                    "Text too long for an edit ({} chars), sending as file: {}...",
                    text.chars().count(),
                    truncate_str(text, 32)
                );
                let file = FileOptions {
                    log: options.log,
                    ..file
                };
                self.send_as_file(text, file).await.map(Delivery::Sent)
            }
            other => other,
        }
    }

    /// Reply, or upload the text as a file when it is too long.
    ///
    /// # Errors
    ///
    /// Propagates every failure other than "too long".
    pub async fn reply_or_send_as_file(
        &self,
        text: &str,
        options: &ReplyOptions,
        file: FileOptions,
    ) -> Result<Delivery, ChatError> {
        match self.reply(text, options).await {
            Err(ChatError::TooLong) => {
                info!(
                    "Text too long for a reply ({} chars), sending as file",
                    text.chars().count()
                );
                let file = FileOptions {
                    log: options.log,
                    ..file
                };
                self.send_as_file(text, file).await.map(Delivery::Sent)
            }
            other => other,
        }
    }

    /// [`Self::edit_or_send_as_file`], replying via
    /// [`Self::reply_or_send_as_file`] when the message belongs to someone else.
    ///
    /// # Errors
    ///
    /// Propagates every failure other than "author required" and "too long".
    pub async fn force_edit_or_send_as_file(
        &self,
        text: &str,
        options: &EditOptions,
        file: FileOptions,
    ) -> Result<Delivery, ChatError> {
        match self.edit_or_send_as_file(text, options, file.clone()).await {
            Err(ChatError::AuthorRequired) => {
                self.reply_or_send_as_file(text, &ReplyOptions::from(options), file)
                    .await
            }
            other => other,
        }
    }
}
