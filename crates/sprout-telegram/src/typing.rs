//! "typing…" indicator shown while the model is working.
//!
//! Telegram clears the chat action after about 5 seconds, so it is re-sent
//! every 4 seconds until the indicator is dropped.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatAction;

const REFRESH: Duration = Duration::from_secs(4);

/// Background typing loop, aborted when this value is dropped.
pub struct TypingIndicator(tokio::task::JoinHandle<()>);

impl TypingIndicator {
    pub fn start(bot: Bot, chat_id: ChatId) -> Self {
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(REFRESH);
            loop {
                tick.tick().await;
                if bot.send_chat_action(chat_id, ChatAction::Typing).await.is_err() {
                    break;
                }
            }
        });
        Self(handle)
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        self.0.abort();
    }
}
