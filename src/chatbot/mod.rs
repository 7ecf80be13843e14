//! Chatbot module - relays Telegram messages to Gemini.

pub mod chunker;
pub mod commands;
pub mod database;
pub mod gemini;
pub mod prompt;
pub mod relay;
pub mod telegram;
pub mod turn;


pub use chunker::{split, MessageChunk, DEFAULT_CHUNK_SIZE};
pub use commands::Command;
pub use database::{Database, StorageError};
pub use gemini::{GeminiClient, ProviderError};
pub use prompt::{compose, ChatRequest, PromptMessage, PromptRole, ResponseMode};
pub use relay::{Completion, Outcome, Rejection, Relay, Transport, TurnStore, APOLOGY};
pub use telegram::{TelegramClient, TransportError};
pub use turn::{ConversationTurn, Role};
