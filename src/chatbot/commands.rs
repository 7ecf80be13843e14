//! Bot commands handled before the relay sees a message.

use crate::chatbot::turn::ConversationTurn;

/// Turns shown by `/history`.
pub const HISTORY_LIMIT: usize = 10;

/// Max chars shown per turn in `/history`.
const HISTORY_PREVIEW_CHARS: usize = 300;

/// A recognized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    History,
}

/// Command names, checked in this order.
const COMMANDS: &[(&str, Command)] = &[
    ("start", Command::Start),
    ("help", Command::Help),
    ("history", Command::History),
];

/// Match `text` against the known commands.
///
/// Accepts `start`, `/start`, `/start@my_bot` and any casing of those.
/// Arguments after the command word are ignored.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    let word = match text.strip_prefix('/') {
        Some(rest) => {
            let word = rest.split_whitespace().next()?;
            word.split('@').next().unwrap_or(word)
        }
        // Without the marker only a lone word counts: "help me with rust" is a question.
        None => text,
    };
    COMMANDS
        .iter()
        .find(|(name, _)| word.eq_ignore_ascii_case(name))
        .map(|(_, cmd)| *cmd)
}

/// Escape text for Telegram's HTML parse mode.
fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            _ => result.push(c),
        }
    }
    result
}

/// Greeting sent for `/start`, formatted as Telegram HTML.
pub fn welcome_text(first_name: Option<&str>) -> String {
    format!(
        "Hey {} 👋\n\n\
         I'm your Mini AI Chat Bot.\n\
         Just send a message and I'll help you with smart responses.\n\n\
         Try these examples:\n    \
         • Explain JWT like I'm 10\n    \
         • Write a LinkedIn message to HR for job referral\n    \
         • Give a fun tech fact\n    \
         • Solve a DSA problem\n\n\
         Type /help to learn more.",
        escape_html(first_name.filter(|n| !n.is_empty()).unwrap_or("there"))
    )
}

/// Telegram HTML.
pub const HELP_TEXT: &str = "📌 <b>Available Commands</b>\n\
/start — Reset and see introduction\n\
/help — Show this help menu\n\
/history — Show your last messages\n\n\
💡 <b>Just ask anything</b>\n\
Examples:\n\
- \"Explain Kubernetes simply\"\n\
- \"Write resume summary for frontend intern\"\n\
- \"Create Node.js API example\"\n\n\
Say \"explain in detail\" for a longer answer.";

/// Plain-text listing of the most recent turns, oldest first.
pub fn history_text(turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return "No history yet. Ask me something!".to_string();
    }
    let start = turns.len().saturating_sub(HISTORY_LIMIT);
    turns[start..]
        .iter()
        .map(|turn| {
            let preview: String = turn.text.chars().take(HISTORY_PREVIEW_CHARS).collect();
            let ellipsis = if preview.len() < turn.text.len() { "…" } else { "" };
            format!("[{}] {}: {preview}{ellipsis}", turn.timestamp.format("%Y-%m-%d %H:%M"), turn.role)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
