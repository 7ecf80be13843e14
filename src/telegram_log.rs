//! Tracing layer that forwards WARN and ERROR events to an admin chat.

use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::chatbot::chunker;

/// In UTF-16 code units; Telegram rejects messages over 4096.
const MAX_LOG_UNITS: usize = 4000;

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<String>,
}

impl TelegramLogLayer {
    /// Must be called inside a tokio runtime.
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                for chunk in chunker::split(&text, MAX_LOG_UNITS) {
                    // Logging here would feed back into this layer.
                    if let Err(e) = bot.send_message(chat_id, chunk.text).await {
                        eprintln!("Failed to send log to Telegram: {e}");
                        break;
                    }
                }
            }
        });

        Self { tx }
    }
}

struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message
                .push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

fn format_event(level: Level, message: &str) -> Option<String> {
    match level {
        Level::ERROR => Some(format!("❌ {message}")),
        Level::WARN => Some(format!("⚠️ {message}")),
        _ => None,
    }
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::WARN {
            return;
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        if let Some(text) = format_event(level, &visitor.message)
            && self.tx.send(text).is_err()
        {
            eprintln!("Log channel closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_warn_and_error_forwarded() {
        assert_eq!(format_event(Level::ERROR, "boom").as_deref(), Some("❌ boom"));
        assert_eq!(format_event(Level::WARN, "hmm").as_deref(), Some("⚠️ hmm"));
        assert_eq!(format_event(Level::INFO, "hi"), None);
        assert_eq!(format_event(Level::DEBUG, "dbg"), None);
    }
}
