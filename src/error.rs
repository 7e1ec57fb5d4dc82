//! Error type for chat client operations.
//!
//! Telegram reports most failures as a free-text description. The handful the
//! message layer reacts to are classified into dedicated variants, everything
//! else is carried through as [`ChatError::Api`].

use std::time::Duration;
use teloxide::{DownloadError, RequestError};
use thiserror::Error;

/// Errors returned by [`crate::bot::client::ChatClient`] operations.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The message can only be edited by its author
    #[error("message author required")]
    AuthorRequired,
    /// The text exceeds the platform length limit
    #[error("message is too long")]
    TooLong,
    /// The edit produced no visible change
    #[error("message is not modified")]
    NotModified,
    /// Flood control: the request may be repeated after the given delay
    #[error("Retry after {0:?}")]
    RetryAfter(Duration),
    /// Transport failure, worth retrying
    #[error("Network error: {0}")]
    Network(String),
    /// Any other API failure
    #[error("API error: {0}")]
    Api(String),
    /// Local filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Classify a Telegram error description.
    ///
    /// # Examples
    ///
    /// ```
    /// use userbot::error::ChatError;
    ///
    /// let err = ChatError::from_description("Bad Request: message is too long");
    /// assert!(matches!(err, ChatError::TooLong));
    /// ```
    #[must_use]
    pub fn from_description(description: &str) -> Self {
        let lowered = description.to_lowercase();
        if lowered.contains("message is not modified") || lowered.contains("message_not_modified") {
            Self::NotModified
        } else if lowered.contains("message is too long") || lowered.contains("message_too_long") {
            Self::TooLong
        } else if lowered.contains("message can't be edited")
            || lowered.contains("message_author_required")
            || lowered.contains("message author required")
        {
            Self::AuthorRequired
        } else {
            Self::Api(description.to_string())
        }
    }

    /// Whether the failure is transient and the request may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<RequestError> for ChatError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Api(api) => Self::from_description(&api.to_string()),
            RequestError::Network(e) => Self::Network(e.to_string()),
            RequestError::Io(e) => Self::Network(e.to_string()),
            RequestError::RetryAfter(secs) => Self::RetryAfter(secs.duration()),
            other => Self::Api(other.to_string()),
        }
    }
}

impl From<DownloadError> for ChatError {
    fn from(err: DownloadError) -> Self {
        Self::Network(err.to_string())
    }
}
