//! Handlers registered in the teloxide Dispatcher.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ForceReply, ParseMode, User};
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use tracing::{debug, warn};

use sprout_agent::pipeline::{process_message, start_session};
use sprout_sessions::SessionKey;

use crate::context::TelegramAppContext;
use crate::send;
use crate::typing::TypingIndicator;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start a conversation")]
    Start,
}

/// Start command: reset the chat session and send the welcome.
///
/// The welcome goes out as HTML with the user's name as a mention link and a
/// force-reply keyboard, so the client opens the input field right away.
pub async fn handle_command<C: TelegramAppContext + 'static>(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: Arc<C>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => {
            let name = msg.from.as_ref().map(mention_html).unwrap_or_default();
            let key = SessionKey::chat(msg.chat.id.0);
            let welcome = start_session(ctx.as_ref(), key, &name);

            if let Err(e) = bot
                .send_message(msg.chat.id, welcome)
                .parse_mode(ParseMode::Html)
                .reply_markup(ForceReply::new().selective())
                .await
            {
                warn!(error = %e, session = %key, "Telegram: failed to send welcome");
            }
        }
    }
    Ok(())
}

/// Plain text messages: run one conversational turn and relay the reply.
/// The sender's mention goes into the user-message frame.
///
/// Bot senders, non-text updates and unknown commands are ignored. The turn
/// runs inline (not spawned) so a chat's messages are answered in order.
pub async fn handle_message<C: TelegramAppContext + 'static>(
    bot: Bot,
    msg: Message,
    ctx: Arc<C>,
) -> ResponseResult<()> {
    if msg.from.as_ref().map(|u| u.is_bot).unwrap_or(false) {
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };
    if text.starts_with('/') {
        debug!(chat_id = msg.chat.id.0, "ignoring unknown command");
        return Ok(());
    }
    if text.trim().is_empty() {
        return Ok(());
    }

    let key = SessionKey::chat(msg.chat.id.0);
    let sender = msg.from.as_ref().map(mention_html).unwrap_or_default();

    let typing = TypingIndicator::start(bot.clone(), msg.chat.id);
    let processed = process_message(ctx.as_ref(), key, &sender, text).await;
    drop(typing);

    send::send_text(&bot, msg.chat.id, &processed.content).await;
    Ok(())
}

/// `<a href="tg://user?id=…">Full Name</a>` with the name HTML-escaped.
pub fn mention_html(user: &User) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        user.id,
        html::escape(&user.full_name())
    )
}
