use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use geminichat::chatbot::commands::{self, Command, HELP_TEXT};
use geminichat::chatbot::{Database, GeminiClient, Outcome, Relay, TelegramClient};
use geminichat::config::Config;
use geminichat::telegram_log;

type BotRelay = Relay<GeminiClient, Database, TelegramClient>;

struct BotState {
    relay: BotRelay,
    telegram: Arc<TelegramClient>,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "geminichat.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "geminichat.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        let tg_layer = telegram_log::TelegramLogLayer::new(bot.clone(), log_chat_id);
        registry.with(tg_layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting geminichat...");
    info!("Loaded config from {config_path}");
    info!("Model: {}, chunk size: {}", config.model, config.max_chunk_size);

    let database = match Database::open(&config.database_path()) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open history database: {e}");
            std::process::exit(1);
        }
    };
    let gemini = match GeminiClient::new(
        config.gemini_api_key.clone(),
        config.model.clone(),
        config.request_timeout,
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create Gemini client: {e}");
            std::process::exit(1);
        }
    };

    let telegram = Arc::new(TelegramClient::new(bot.clone()));
    let relay = Relay::new(Arc::new(gemini), Arc::new(database), telegram.clone())
        .with_max_chunk_size(config.max_chunk_size);
    let state = Arc::new(BotState { relay, telegram });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shut down");
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;

    if let Some(command) = commands::parse_command(text) {
        handle_command(command, &msg, &state).await;
        return Ok(());
    }

    // Unknown slash commands are dropped silently.
    if text.trim_start().starts_with('/') {
        return Ok(());
    }

    match state.relay.handle_inbound_message(chat_id, text).await {
        Outcome::PartiallyDelivered { sent, total } => {
            warn!("Reply to {chat_id} cut short after {sent}/{total} chunks");
        }
        Outcome::Failed => warn!("Reply to {chat_id} failed, apology sent"),
        Outcome::Rejected(_) | Outcome::Delivered { .. } => {}
    }

    Ok(())
}

async fn handle_command(command: Command, msg: &Message, state: &BotState) {
    let chat_id = msg.chat.id.0;
    info!("Command {command:?} from {chat_id}");

    let result = match command {
        Command::Start => {
            let first_name = msg.from.as_ref().map(|u| u.first_name.as_str());
            state
                .telegram
                .send_html(chat_id, &commands::welcome_text(first_name))
                .await
                .map(|_| ())
        }
        Command::Help => state.telegram.send_html(chat_id, HELP_TEXT).await.map(|_| ()),
        Command::History => {
            let text = match state.relay.history(chat_id).await {
                Ok(turns) => commands::history_text(&turns),
                Err(e) => {
                    warn!("Failed to load history for {chat_id}: {e}");
                    geminichat::chatbot::APOLOGY.to_string()
                }
            };
            state.relay.send_chunked(chat_id, &text).await
        }
    };

    if let Err(e) = result {
        warn!("Failed to answer {command:?} in {chat_id}: {e}");
    }
}
