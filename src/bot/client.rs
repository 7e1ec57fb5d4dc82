//! Transport-neutral view of the messaging client.
//!
//! The message layer only talks to [`ChatClient`]. The production
//! implementation lives in [`crate::bot::telegram`]; tests use the generated
//! `MockChatClient`.

use crate::error::ChatError;
use async_trait::async_trait;
use std::path::Path;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};

/// Kind of chat a message lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// One-to-one chat with a user
    Private,
    /// Group or supergroup
    Group,
    /// Broadcast channel
    Channel,
}

/// Chat a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatRef {
    /// Chat identifier
    pub id: i64,
    /// Chat kind
    pub kind: ChatKind,
}

impl ChatRef {
    /// Whether this is a private chat
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.kind == ChatKind::Private
    }
}

/// Snapshot of a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageData {
    /// Message identifier, unique within its chat
    pub id: i32,
    /// Chat the message was posted in
    pub chat: ChatRef,
    /// Text or caption
    pub text: Option<String>,
    /// File id of the largest photo size, if the message carries a photo
    pub photo: Option<String>,
    /// Message this one replies to
    pub reply_to: Option<Box<MessageData>>,
}

impl MessageData {
    /// Text or caption, empty when the message has neither
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// How message text is parsed by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    /// HTML entities
    #[default]
    Html,
    /// `MarkdownV2` entities
    Markdown,
    /// No entity parsing
    Plain,
}

impl TextFormat {
    /// Teloxide parse mode, `None` for plain text
    #[must_use]
    pub const fn parse_mode(self) -> Option<ParseMode> {
        match self {
            Self::Html => Some(ParseMode::Html),
            Self::Markdown => Some(ParseMode::MarkdownV2),
            Self::Plain => None,
        }
    }
}

/// Options for sending or editing a text message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOptions {
    /// Entity parsing
    pub format: TextFormat,
    /// Suppress link previews
    pub disable_web_page_preview: bool,
    /// Send silently (ignored by edits)
    pub disable_notification: bool,
    /// Message to reply to (ignored by edits)
    pub reply_to: Option<i32>,
    /// Inline keyboard attached to the message
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

/// Options for uploading a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentOptions {
    /// File name shown to recipients, defaults to the path's file name
    pub file_name: Option<String>,
    /// Caption below the document
    pub caption: String,
    /// Send silently
    pub disable_notification: bool,
    /// Message to reply to
    pub reply_to: Option<i32>,
}

/// Messaging operations the message layer relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a text message
    async fn send_message(
        &self,
        chat: ChatRef,
        text: &str,
        options: &TextOptions,
    ) -> Result<MessageData, ChatError>;

    /// Replace the text of an existing message
    async fn edit_message_text(
        &self,
        chat: ChatRef,
        message_id: i32,
        text: &str,
        options: &TextOptions,
    ) -> Result<MessageData, ChatError>;

    /// Delete a message
    async fn delete_message(&self, chat: ChatRef, message_id: i32) -> Result<(), ChatError>;

    /// Upload a local file as a document
    async fn send_document(
        &self,
        chat: ChatRef,
        path: &Path,
        options: &DocumentOptions,
    ) -> Result<MessageData, ChatError>;

    /// Forward `message` to another chat
    async fn forward_message(
        &self,
        to_chat_id: i64,
        message: &MessageData,
    ) -> Result<MessageData, ChatError>;

    /// Download a file by id into `destination`
    async fn download_file(&self, file_id: &str, destination: &Path) -> Result<(), ChatError>;
}
