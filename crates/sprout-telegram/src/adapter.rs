//! Telegram channel adapter.
//!
//! Wraps a teloxide `Bot` + `Dispatcher` and drives the long-polling event
//! loop. Updates of one chat are handled strictly in order; different chats
//! run concurrently.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use sprout_core::config::TelegramConfig;

use crate::context::TelegramAppContext;
use crate::error::TelegramError;
use crate::handler::{handle_command, handle_message, Command};

pub struct TelegramAdapter<C: TelegramAppContext + 'static> {
    ctx: Arc<C>,
    config: TelegramConfig,
}

impl<C: TelegramAppContext + 'static> TelegramAdapter<C> {
    pub fn new(config: &TelegramConfig, ctx: Arc<C>) -> Self {
        Self {
            ctx,
            config: config.clone(),
        }
    }

    /// Connect to Telegram and drive the long-polling loop until the process
    /// receives Ctrl-C.
    ///
    /// Fails early if the token is empty or rejected by Telegram.
    pub async fn run(self) -> Result<(), TelegramError> {
        if self.config.bot_token.trim().is_empty() {
            return Err(TelegramError::NoToken);
        }
        let bot = Bot::new(&self.config.bot_token);

        let me = bot.get_me().await?;
        info!(
            username = me.username.as_deref().unwrap_or("unknown"),
            "Telegram bot connected"
        );

        if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
            warn!(error = %e, "Telegram: failed to register bot commands");
        }

        info!("Telegram: starting long-polling dispatcher");

        let handler = Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(handle_command::<C>),
            )
            .branch(dptree::endpoint(handle_message::<C>));

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![Arc::clone(&self.ctx)])
            .default_handler(|_upd| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram dispatcher stopped");
        Ok(())
    }
}
