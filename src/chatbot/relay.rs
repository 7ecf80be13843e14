//! Relay - one inbound message in, model reply out in Telegram-sized chunks.
//!
//! Every message is an independent transaction. The relay keeps no state
//! between calls; history lives only in the [`TurnStore`], and prompts are
//! single-turn.
//!
//! Order of work for a message:
//! 1. reject blank text and command tokens (no side effects)
//! 2. compose the prompt
//! 3. persist the user turn (awaited, before the model call)
//! 4. call the model once; on failure send one apology and stop
//! 5. split the reply and send the chunks one after another
//! 6. persist the assistant turn with the full reply text

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::chatbot::chunker::{self, DEFAULT_CHUNK_SIZE};
use crate::chatbot::commands::{self, Command};
use crate::chatbot::database::{Database, StorageError};
use crate::chatbot::gemini::{GeminiClient, ProviderError};
use crate::chatbot::prompt::{ChatRequest, PromptMessage};
use crate::chatbot::telegram::{TelegramClient, TransportError};
use crate::chatbot::turn::ConversationTurn;

/// The only error text a user ever sees.
pub const APOLOGY: &str =
    "⚠️ Oops! Something went wrong while processing your request.\nPlease try again in a moment.";

/// Text completion backend.
pub trait Completion: Send + Sync {
    fn generate(
        &self,
        messages: &[PromptMessage],
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// Conversation history storage.
pub trait TurnStore: Send + Sync {
    fn append_turn(
        &self,
        user_id: i64,
        turn: &ConversationTurn,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn list_turns(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<ConversationTurn>, StorageError>> + Send;
}

/// Outbound message channel.
pub trait Transport: Send + Sync {
    fn send(&self, recipient_id: i64, text: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Best effort, no guarantee of effect.
    fn send_typing_indicator(&self, recipient_id: i64) -> impl Future<Output = ()> + Send;
}

impl Completion for GeminiClient {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, ProviderError> {
        GeminiClient::generate(self, messages).await
    }
}

impl TurnStore for Database {
    async fn append_turn(&self, user_id: i64, turn: &ConversationTurn) -> Result<(), StorageError> {
        Database::append_turn(self, user_id, turn)
    }

    async fn list_turns(&self, user_id: i64) -> Result<Vec<ConversationTurn>, StorageError> {
        Database::list_turns(self, user_id)
    }
}

impl Transport for TelegramClient {
    async fn send(&self, recipient_id: i64, text: &str) -> Result<(), TransportError> {
        self.send_message(recipient_id, text).await.map(|_| ())
    }

    async fn send_typing_indicator(&self, recipient_id: i64) {
        self.send_typing(recipient_id).await;
    }
}

/// Why a message never reached the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    Command(Command),
}

/// Result of handling one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Dropped before any side effect.
    Rejected(Rejection),
    /// All chunks sent.
    Delivered { chunks: usize },
    /// A send failed; the remaining chunks were not attempted.
    PartiallyDelivered { sent: usize, total: usize },
    /// The model call failed and the apology was sent instead.
    Failed,
}

pub struct Relay<C, S, T> {
    completion: Arc<C>,
    store: Arc<S>,
    transport: Arc<T>,
    max_chunk_size: usize,
}

impl<C, S, T> Relay<C, S, T>
where
    C: Completion,
    S: TurnStore,
    T: Transport,
{
    pub fn new(completion: Arc<C>, store: Arc<S>, transport: Arc<T>) -> Self {
        Self {
            completion,
            store,
            transport,
            max_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size.max(1);
        self
    }

    /// Stored turns of one user, oldest first. Never fed back into prompts.
    pub async fn history(&self, user_id: i64) -> Result<Vec<ConversationTurn>, StorageError> {
        self.store.list_turns(user_id).await
    }

    /// Send text split to the configured chunk size, stopping at the first failure.
    pub async fn send_chunked(&self, recipient_id: i64, text: &str) -> Result<(), TransportError> {
        for chunk in chunker::split(text, self.max_chunk_size) {
            self.transport.send(recipient_id, &chunk.text).await?;
        }
        Ok(())
    }

    /// Handle one message from `sender_id`. Replies go back to the same id.
    pub async fn handle_inbound_message(&self, sender_id: i64, raw_text: &str) -> Outcome {
        if let Some(command) = commands::parse_command(raw_text) {
            debug!("Command {command:?} from {sender_id} is not relayed");
            return Outcome::Rejected(Rejection::Command(command));
        }

        let request = match ChatRequest::new(raw_text) {
            Ok(request) => request,
            Err(e) => {
                debug!("Dropping message from {sender_id}: {e}");
                return Outcome::Rejected(Rejection::Empty);
            }
        };

        let preview: String = request.user_text.chars().take(50).collect();
        info!("📨 {sender_id}: \"{preview}\" ({:?})", request.response_mode);

        // Stored history is best effort and never blocks the reply.
        let inbound = ConversationTurn::user(request.user_text.as_str());
        if let Err(e) = self.store.append_turn(sender_id, &inbound).await {
            warn!("Failed to save user turn for {sender_id}: {e}");
        }

        self.transport.send_typing_indicator(sender_id).await;

        let reply = match self.completion.generate(&request.messages()).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Completion failed for {sender_id}: {e}");
                if let Err(e) = self.transport.send(sender_id, APOLOGY).await {
                    warn!("Failed to send apology to {sender_id}: {e}");
                }
                return Outcome::Failed;
            }
        };

        let chunks = chunker::split(&reply, self.max_chunk_size);
        let total = chunks.len();
        let mut sent = 0;
        for chunk in &chunks {
            if let Err(e) = self.transport.send(sender_id, &chunk.text).await {
                warn!(
                    "Chunk {}/{total} to {sender_id} failed, skipping the rest: {e}",
                    chunk.sequence_index + 1
                );
                break;
            }
            sent += 1;
        }

        // Records what the model said, not what was delivered.
        let outbound = ConversationTurn::assistant(reply);
        if let Err(e) = self.store.append_turn(sender_id, &outbound).await {
            warn!("Failed to save assistant turn for {sender_id}: {e}");
        }

        info!("📤 {sender_id}: {sent}/{total} chunk(s) sent");
        if sent == total {
            Outcome::Delivered { chunks: total }
        } else {
            Outcome::PartiallyDelivered { sent, total }
        }
    }
}
