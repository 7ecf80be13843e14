//! Telegram client using teloxide.

use std::fmt;

use teloxide::prelude::*;
use teloxide::types::{ChatAction, ParseMode};
use tracing::debug;

/// Failure delivering a message.
#[derive(Debug)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "send failed: {}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// Telegram API client.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send plain text. Model output is never parsed as markup.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, TransportError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| TransportError(e.to_string()))
    }

    /// Send text in Telegram's HTML parse mode. Callers escape any user input.
    pub async fn send_html(&self, chat_id: i64, text: &str) -> Result<i64, TransportError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| TransportError(e.to_string()))
    }

    /// Show "typing..." in the chat. Failures are ignored.
    pub async fn send_typing(&self, chat_id: i64) {
        if let Err(e) = self.bot.send_chat_action(ChatId(chat_id), ChatAction::Typing).await {
            debug!("Typing indicator failed for {chat_id}: {e}");
        }
    }
}
