use crate::bot::client::{ChatClient, MessageData};
use crate::bot::handlers::{self, get_user_id_safe, Command};
use crate::bot::telegram::TelegramClient;
use crate::bot::{BotContext, CommandMessage};
use crate::config::Settings;
use crate::plugins::thumbnail::ThumbnailStore;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{debug, error, info};

/// Run the Telegram transport runtime.
pub async fn run_bot(settings: Arc<Settings>) {
    let bot = Bot::new(settings.telegram_token.clone());
    let client: Arc<dyn ChatClient> = Arc::new(TelegramClient::new(bot.clone()));
    let ctx = Arc::new(BotContext::new(client, &settings));
    let store = Arc::new(ThumbnailStore::new(settings.download_dir()));

    info!(
        "Context ready (download dir: {}, delete timeout: {}s, log channel: {}, allowed users: {})",
        settings.download_path,
        settings.msg_delete_timeout,
        if ctx.log.is_enabled() { "on" } else { "off" },
        ctx.allowed_users.len()
    );
    ctx.log.log("Userbot started").await;

    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx, store])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::filter(|msg: Message, ctx: Arc<BotContext>| {
                ctx.is_allowed(get_user_id_safe(&msg))
            })
            .filter_command::<Command>()
            .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_ignored))
}

/// Commands run in their own task so a long handler (or an auto-delete
/// delay) does not hold up later updates from the same chat, `/cancel`
/// included.
async fn handle_command(
    msg: Message,
    cmd: Command,
    ctx: Arc<BotContext>,
    store: Arc<ThumbnailStore>,
) -> Result<(), teloxide::RequestError> {
    let message = CommandMessage::new(ctx, MessageData::from(&msg));
    tokio::spawn(async move {
        if let Err(e) = handlers::handle_command(cmd, message, &store).await {
            error!("Command error: {:#}", e);
        }
    });
    respond(())
}

async fn handle_ignored(msg: Message) -> Result<(), teloxide::RequestError> {
    debug!(
        "Ignoring message {} from user {} in chat {}",
        msg.id.0,
        get_user_id_safe(&msg),
        msg.chat.id.0
    );
    respond(())
}
