use crate::bot::client::TextFormat;
use crate::bot::message::{AutoDelete, CommandMessage, EditOptions, ReplyOptions};
use crate::plugins::thumbnail::{self, ThumbnailStore};
use anyhow::Result;
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::info;

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Save the replied photo as custom thumbnail
    #[command(description = "Save thumbnail (reply to any photo).")]
    Sthumb,
    /// Delete the custom thumbnail
    #[command(description = "Delete thumbnail.")]
    Dthumb,
    /// Show the custom thumbnail
    #[command(description = "View thumbnail.")]
    Vthumb,
    /// Cancel the process attached to the replied message
    #[command(description = "Cancel the replied process.")]
    Cancel,
    /// List commands
    #[command(description = "Show this help.")]
    Help,
}

/// Route a parsed command to its handler
///
/// # Errors
///
/// Returns the handler's error.
pub async fn handle_command(
    cmd: Command,
    message: CommandMessage,
    store: &ThumbnailStore,
) -> Result<()> {
    info!(
        chat_id = message.chat().id,
        message_id = message.id(),
        "Handling {:?}",
        cmd
    );
    match cmd {
        Command::Sthumb => thumbnail::save_thumbnail(&message, store).await,
        Command::Dthumb => thumbnail::clear_thumbnail(&message, store).await,
        Command::Vthumb => thumbnail::view_thumbnail(&message, store).await,
        Command::Cancel => cancel_process(&message).await,
        Command::Help => help(&message).await,
    }
}

/// Cancel handler: flags the replied message's process as canceled
///
/// # Errors
///
/// Returns an error if the confirmation cannot be sent.
pub async fn cancel_process(message: &CommandMessage) -> Result<()> {
    let Some(target) = message.reply_to_message() else {
        message
            .force_err(
                "Reply to a running process to cancel it",
                &EditOptions::default(),
            )
            .await?;
        return Ok(());
    };

    target.cancel_the_process().await;
    info!(
        chat_id = target.chat().id,
        message_id = target.id(),
        "Process cancellation requested"
    );

    let options = ReplyOptions {
        auto_delete: AutoDelete::ConfigDefault,
        ..ReplyOptions::default()
    };
    message.reply("process canceled", &options).await?;
    Ok(())
}

async fn help(message: &CommandMessage) -> Result<()> {
    let options = ReplyOptions {
        format: TextFormat::Plain,
        ..ReplyOptions::default()
    };
    message
        .reply(&Command::descriptions().to_string(), &options)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::client::MockChatClient;
    use crate::bot::message::tests::{context, group, message, CHAT_ID};
    use crate::error::ChatError;

    #[test]
    fn test_command_parsing() {
        assert!(matches!(Command::parse("/sthumb", "bot"), Ok(Command::Sthumb)));
        assert!(matches!(Command::parse("/dthumb", "bot"), Ok(Command::Dthumb)));
        assert!(matches!(
            Command::parse("/vthumb@bot", "bot"),
            Ok(Command::Vthumb)
        ));
        assert!(Command::parse("/unknown", "bot").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_marks_replied_message() {
        let mut mock = MockChatClient::new();
        mock.expect_send_message()
            .withf(|_, text, options| text == "process canceled" && options.reply_to == Some(5))
            .times(1)
            .returning(|chat, text, _| Ok(message(6, chat, text)));
        mock.expect_delete_message()
            .withf(|_, id| *id == 6)
            .times(1)
            .returning(|_, _| Ok(()));

        let ctx = context(mock, &std::env::temp_dir());
        let mut data = message(5, group(), "/cancel");
        data.reply_to = Some(Box::new(message(3, group(), "processing ...")));
        let msg = CommandMessage::new(ctx.clone(), data);

        assert!(cancel_process(&msg).await.is_ok());
        assert!(ctx.cancels.is_pending((CHAT_ID, 3)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_without_reply_reports_error() {
        let mut mock = MockChatClient::new();
        mock.expect_edit_message_text()
            .times(1)
            .returning(|_, _, _, _| Err(ChatError::AuthorRequired));
        mock.expect_send_message()
            .withf(|_, text, _| text.starts_with("<b>ERROR</b>"))
            .times(1)
            .returning(|chat, text, _| Ok(message(6, chat, text)));
        mock.expect_delete_message().times(1).returning(|_, _| Ok(()));

        let ctx = context(mock, &std::env::temp_dir());
        let msg = CommandMessage::new(ctx.clone(), message(5, group(), "/cancel"));

        assert!(cancel_process(&msg).await.is_ok());
        assert!(!ctx.cancels.is_pending((CHAT_ID, 5)).await);
    }
}
