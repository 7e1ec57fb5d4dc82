//! Custom thumbnail commands: `sthumb`, `dthumb`, `vthumb`.
//!
//! A single image is cached at `<download_path>/thumb_image.jpg`. Downloads
//! land in a `.temp` sibling first and are renamed into place once complete.

use crate::bot::client::DocumentOptions;
use crate::bot::message::{AutoDelete, CommandMessage, EditOptions};
use crate::error::ChatError;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::time::Instant;
use tracing::{info, warn};

/// File name of the cached thumbnail
pub const THUMB_FILE_NAME: &str = "thumb_image.jpg";

const PROCESSING: &str = "processing ...";

/// Location of the cached thumbnail
#[derive(Debug, Clone)]
pub struct ThumbnailStore {
    path: PathBuf,
    partial: PathBuf,
}

impl ThumbnailStore {
    /// Store inside `download_dir`
    ///
    /// # Examples
    ///
    /// ```
    /// use userbot::plugins::thumbnail::ThumbnailStore;
    ///
    /// let store = ThumbnailStore::new("downloads/");
    /// assert!(store.path().ends_with("thumb_image.jpg"));
    /// ```
    #[must_use]
    pub fn new(download_dir: impl AsRef<Path>) -> Self {
        let path = download_dir.as_ref().join(THUMB_FILE_NAME);
        let partial = path.with_extension("jpg.temp");
        Self { path, partial }
    }

    /// Thumbnail path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a thumbnail is saved
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Remove the thumbnail, returning whether one existed
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn remove(&self) -> std::io::Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Where an in-progress download is written
    #[must_use]
    pub fn partial_path(&self) -> &Path {
        &self.partial
    }

    /// Move a finished download into place
    async fn commit(&self) -> std::io::Result<()> {
        tokio::fs::rename(&self.partial, &self.path).await
    }

    /// Drop an unfinished download, if any
    async fn discard(&self) {
        match tokio::fs::remove_file(&self.partial).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                warn!("Failed to discard partial thumbnail {}: {}", self.partial.display(), e);
            }
            _ => {}
        }
    }

    /// Make sure the parent directory exists
    async fn prepare(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

/// Show the progress notice and return the message later edits go to.
///
/// Editing someone else's command falls back to a reply, which then becomes
/// the status message.
async fn start_status(message: &CommandMessage) -> Result<Option<CommandMessage>, ChatError> {
    let status = message
        .force_edit(PROCESSING, &EditOptions::default())
        .await?;
    Ok(status.into_message())
}

/// `sthumb`: save the replied photo as the custom thumbnail
///
/// # Errors
///
/// Returns an error if a chat operation or the file system fails.
pub async fn save_thumbnail(message: &CommandMessage, store: &ThumbnailStore) -> Result<()> {
    let Some(status) = start_status(message).await? else {
        return Ok(());
    };

    let photo = message
        .reply_to_message()
        .and_then(|reply| reply.data().photo.clone());
    let Some(file_id) = photo else {
        status
            .edit(
                "Reply to a photo to save custom thumbnail",
                &EditOptions::auto_delete(AutoDelete::secs(3)),
            )
            .await?;
        return Ok(());
    };

    let started = Instant::now();
    if store.remove().await? {
        info!("Replacing existing thumbnail at {}", store.path().display());
    }
    store.prepare().await?;

    if status.process_is_canceled().await {
        status.err("process canceled", &EditOptions::default()).await?;
        return Ok(());
    }

    let downloaded = message
        .context()
        .client
        .download_file(&file_id, store.partial_path())
        .await;
    if let Err(e) = downloaded {
        store.discard().await;
        status
            .err(&format!("thumbnail download failed: {e}"), &EditOptions::default())
            .await?;
        return Err(e.into());
    }

    if status.process_is_canceled().await {
        store.discard().await;
        status.err("process canceled", &EditOptions::default()).await?;
        return Ok(());
    }
    store.commit().await?;

    let seconds = started.elapsed().as_secs();
    info!("Thumbnail saved to {} in {}s", store.path().display(), seconds);
    status
        .edit(
            &format!("thumbnail saved in {seconds} seconds."),
            &EditOptions::auto_delete(AutoDelete::secs(3)).logged(),
        )
        .await?;
    Ok(())
}

/// `dthumb`: delete the custom thumbnail
///
/// # Errors
///
/// Returns an error if a chat operation or the file system fails.
pub async fn clear_thumbnail(message: &CommandMessage, store: &ThumbnailStore) -> Result<()> {
    let Some(status) = start_status(message).await? else {
        return Ok(());
    };

    if store.remove().await? {
        info!("Thumbnail removed from {}", store.path().display());
    }

    status
        .edit(
            "✅ Custom thumbnail deleted successfully.",
            &EditOptions::auto_delete(AutoDelete::secs(3)).logged(),
        )
        .await?;
    Ok(())
}

/// `vthumb`: send the custom thumbnail back as a document
///
/// # Errors
///
/// Returns an error if a chat operation fails.
pub async fn view_thumbnail(message: &CommandMessage, store: &ThumbnailStore) -> Result<()> {
    let Some(status) = start_status(message).await? else {
        return Ok(());
    };

    if !store.exists().await {
        status
            .err("Custom Thumbnail Not Found!", &EditOptions::default())
            .await?;
        return Ok(());
    }

    let ctx = message.context();
    let options = DocumentOptions {
        file_name: Some(THUMB_FILE_NAME.to_string()),
        caption: String::new(),
        disable_notification: true,
        reply_to: Some(message.id()),
    };
    let sent = ctx
        .client
        .send_document(message.chat(), store.path(), &options)
        .await?;
    ctx.log.forward(&sent).await;
    status.delete().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::client::{MessageData, MockChatClient};
    use crate::bot::cancel::{CancelRegistry, MessageKey};
    use crate::bot::message::tests::{
        context, context_with_cancels, group, message, CHAT_ID, LOG_CHAT_ID,
    };
    use mockall::Sequence;

    /// Cancel from a synchronous mock callback
    fn cancel_now(registry: &CancelRegistry, key: MessageKey) {
        let registry = registry.clone();
        std::thread::spawn(move || {
            tokio::runtime::Builder::new_current_thread()
                .build()
                .expect("runtime")
                .block_on(registry.cancel(key));
        })
        .join()
        .expect("cancel thread");
    }

    fn command_replying_to(reply: Option<MessageData>) -> MessageData {
        let mut data = message(10, group(), "/sthumb");
        data.reply_to = reply.map(Box::new);
        data
    }

    fn photo_message() -> MessageData {
        let mut photo = message(9, group(), "");
        photo.photo = Some("photo-file-id".to_string());
        photo
    }

    /// Status edits succeed in place, as for a userbot-authored command
    fn expect_edits(mock: &mut MockChatClient, texts: &'static [&'static str]) {
        let mut seq = Sequence::new();
        for expected in texts {
            mock.expect_edit_message_text()
                .withf(move |_, id, text, _| *id == 10 && text == *expected)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|chat, id, text, _| Ok(message(id, chat, text)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_requires_a_photo_reply() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut mock = MockChatClient::new();
        expect_edits(
            &mut mock,
            &[PROCESSING, "Reply to a photo to save custom thumbnail"],
        );
        mock.expect_delete_message().times(1).returning(|_, _| Ok(()));
        mock.expect_download_file().never();

        let store = ThumbnailStore::new(dir.path());
        let ctx = context(mock, dir.path());
        let msg = CommandMessage::new(ctx, command_replying_to(Some(message(9, group(), "text"))));

        assert!(save_thumbnail(&msg, &store).await.is_ok());
        assert!(!store.exists().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_overwrites_existing_thumbnail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ThumbnailStore::new(dir.path().join("nested"));
        std::fs::create_dir_all(dir.path().join("nested")).expect("mkdir");
        std::fs::write(store.path(), b"old").expect("seed");

        let mut mock = MockChatClient::new();
        let mut seq = Sequence::new();
        mock.expect_edit_message_text()
            .withf(|_, _, text, _| text == PROCESSING)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|chat, id, text, _| Ok(message(id, chat, text)));
        let old_thumb = store.path().to_path_buf();
        mock.expect_download_file()
            .withf(move |file_id, path| {
                file_id == "photo-file-id"
                    && path.ends_with("thumb_image.jpg.temp")
                    && !old_thumb.exists()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, path| {
                std::fs::write(path, b"new")?;
                Ok(())
            });
        mock.expect_edit_message_text()
            .withf(|_, _, text, _| text == "thumbnail saved in 0 seconds.")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|chat, id, text, _| Ok(message(id, chat, text)));
        mock.expect_forward_message()
            .withf(|to, _| *to == LOG_CHAT_ID)
            .times(1)
            .returning(|to, msg| Ok(message(msg.id, group_with(to), "")));
        mock.expect_delete_message().times(1).returning(|_, _| Ok(()));

        let ctx = context(mock, dir.path());
        let msg = CommandMessage::new(ctx, command_replying_to(Some(photo_message())));

        assert!(save_thumbnail(&msg, &store).await.is_ok());
        assert_eq!(std::fs::read(store.path()).expect("read"), b"new");
        assert!(!store.partial_path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_download_leaves_no_thumbnail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ThumbnailStore::new(dir.path());

        let mut mock = MockChatClient::new();
        expect_edits(
            &mut mock,
            &[
                PROCESSING,
                "<b>ERROR</b>: <code>thumbnail download failed: Network error: timed out</code>",
            ],
        );
        mock.expect_download_file().times(1).returning(|_, path| {
            std::fs::write(path, b"par")?;
            Err(ChatError::Network("timed out".into()))
        });
        mock.expect_delete_message().times(1).returning(|_, _| Ok(()));

        let ctx = context(mock, dir.path());
        let msg = CommandMessage::new(ctx, command_replying_to(Some(photo_message())));

        assert!(save_thumbnail(&msg, &store).await.is_err());
        assert!(!store.exists().await);
        assert!(!store.partial_path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_download_discards_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ThumbnailStore::new(dir.path());
        let cancels = CancelRegistry::new(60);

        let mut mock = MockChatClient::new();
        expect_edits(
            &mut mock,
            &[PROCESSING, "<b>ERROR</b>: <code>process canceled</code>"],
        );
        let registry = cancels.clone();
        mock.expect_download_file().times(1).returning(move |_, path| {
            std::fs::write(path, b"img")?;
            cancel_now(&registry, (CHAT_ID, 10));
            Ok(())
        });
        mock.expect_forward_message().never();
        mock.expect_delete_message().times(1).returning(|_, _| Ok(()));

        let ctx = context_with_cancels(mock, dir.path(), cancels);
        let msg = CommandMessage::new(ctx, command_replying_to(Some(photo_message())));

        assert!(save_thumbnail(&msg, &store).await.is_ok());
        assert!(!store.exists().await);
        assert!(!store.partial_path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_honours_cancellation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ThumbnailStore::new(dir.path());

        let mut mock = MockChatClient::new();
        expect_edits(
            &mut mock,
            &[PROCESSING, "<b>ERROR</b>: <code>process canceled</code>"],
        );
        mock.expect_download_file().never();
        mock.expect_delete_message().times(1).returning(|_, _| Ok(()));

        let ctx = context(mock, dir.path());
        ctx.cancels.cancel((CHAT_ID, 10)).await;
        let msg = CommandMessage::new(ctx, command_replying_to(Some(photo_message())));

        assert!(save_thumbnail(&msg, &store).await.is_ok());
        assert!(!store.exists().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_removes_thumbnail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ThumbnailStore::new(dir.path());
        std::fs::write(store.path(), b"img").expect("seed");

        let mut mock = MockChatClient::new();
        expect_edits(
            &mut mock,
            &[PROCESSING, "✅ Custom thumbnail deleted successfully."],
        );
        mock.expect_forward_message()
            .times(1)
            .returning(|to, msg| Ok(message(msg.id, group_with(to), "")));
        mock.expect_delete_message().times(1).returning(|_, _| Ok(()));

        let ctx = context(mock, dir.path());
        let msg = CommandMessage::new(ctx, command_replying_to(None));

        assert!(clear_thumbnail(&msg, &store).await.is_ok());
        assert!(!store.exists().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_sends_document_and_cleans_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ThumbnailStore::new(dir.path());
        std::fs::write(store.path(), b"img").expect("seed");

        let mut mock = MockChatClient::new();
        expect_edits(&mut mock, &[PROCESSING]);
        mock.expect_send_document()
            .withf(|chat, path, options| {
                chat.id == CHAT_ID
                    && path.ends_with(THUMB_FILE_NAME)
                    && options.disable_notification
                    && options.reply_to == Some(10)
            })
            .times(1)
            .returning(|chat, _, _| Ok(message(11, chat, "")));
        mock.expect_forward_message()
            .withf(|to, msg| *to == LOG_CHAT_ID && msg.id == 11)
            .times(1)
            .returning(|to, msg| Ok(message(msg.id, group_with(to), "")));
        mock.expect_delete_message()
            .withf(|_, id| *id == 10)
            .times(1)
            .returning(|_, _| Ok(()));

        let ctx = context(mock, dir.path());
        let msg = CommandMessage::new(ctx, command_replying_to(None));

        assert!(view_thumbnail(&msg, &store).await.is_ok());
        assert!(store.exists().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_without_thumbnail_reports_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ThumbnailStore::new(dir.path());

        let mut mock = MockChatClient::new();
        expect_edits(
            &mut mock,
            &[PROCESSING, "<b>ERROR</b>: <code>Custom Thumbnail Not Found!</code>"],
        );
        mock.expect_send_document().never();
        mock.expect_delete_message().times(1).returning(|_, _| Ok(()));

        let ctx = context(mock, dir.path());
        let msg = CommandMessage::new(ctx, command_replying_to(None));

        assert!(view_thumbnail(&msg, &store).await.is_ok());
    }

    fn group_with(id: i64) -> crate::bot::client::ChatRef {
        crate::bot::client::ChatRef { id, ..group() }
    }
}
