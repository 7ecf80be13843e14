use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::ChatId;

use crate::chatbot::chunker::DEFAULT_CHUNK_SIZE;
use crate::chatbot::gemini::DEFAULT_MODEL;

const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Falls back to $TELEGRAM_BOT_TOKEN
    #[serde(default)]
    telegram_bot_token: String,
    /// Falls back to $GEMINI_API_KEY
    #[serde(default)]
    gemini_api_key: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_max_chunk_size")]
    max_chunk_size: usize,
    /// Directory for the history database and logs. Defaults to current directory.
    data_dir: Option<String>,
    /// Chat that receives WARN/ERROR log lines.
    log_chat_id: Option<i64>,
    /// HTTP timeout for model calls. Unset means no timeout.
    request_timeout_secs: Option<u64>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

pub struct Config {
    pub telegram_bot_token: String,
    pub gemini_api_key: String,
    pub model: String,
    pub max_chunk_size: usize,
    /// Directory for state files (history database, logs).
    pub data_dir: PathBuf,
    pub log_chat_id: Option<ChatId>,
    pub request_timeout: Option<Duration>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// Load with a custom environment lookup, used for secrets missing from the file.
    pub fn load_with_env<P, F>(path: P, env: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let telegram_bot_token = non_empty(file.telegram_bot_token)
            .or_else(|| env(TELEGRAM_TOKEN_ENV).and_then(non_empty))
            .ok_or_else(|| ConfigError::Validation("telegram_bot_token is required".into()))?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        let gemini_api_key = non_empty(file.gemini_api_key)
            .or_else(|| env(GEMINI_KEY_ENV).and_then(non_empty))
            .ok_or_else(|| ConfigError::Validation("gemini_api_key is required".into()))?;

        if file.model.trim().is_empty() {
            return Err(ConfigError::Validation("model must not be empty".into()));
        }
        if file.max_chunk_size == 0 {
            return Err(ConfigError::Validation("max_chunk_size must be greater than 0".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token,
            gemini_api_key,
            model: file.model,
            max_chunk_size: file.max_chunk_size,
            data_dir,
            log_chat_id: file.log_chat_id.map(ChatId),
            request_timeout: file.request_timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("history.db")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config_with_defaults() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz",
            "gemini_api_key": "key"
        }"#);
        let config = Config::load_with_env(file.path(), no_env).expect("should load valid config");
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.max_chunk_size, 3500);
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert!(config.log_chat_id.is_none());
        assert!(config.request_timeout.is_none());
        assert_eq!(config.database_path(), PathBuf::from("./history.db"));
    }

    #[test]
    fn test_overrides() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABC",
            "gemini_api_key": "key",
            "model": "gemini-2.5-pro",
            "max_chunk_size": 1000,
            "data_dir": "/var/lib/bot",
            "log_chat_id": -100123,
            "request_timeout_secs": 30
        }"#);
        let config = Config::load_with_env(file.path(), no_env).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.max_chunk_size, 1000);
        assert_eq!(config.log_dir(), PathBuf::from("/var/lib/bot/logs"));
        assert_eq!(config.log_chat_id, Some(ChatId(-100123)));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_secrets_from_env() {
        let file = write_config("{}");
        let config = Config::load_with_env(file.path(), |name| match name {
            "TELEGRAM_BOT_TOKEN" => Some("42:secret".to_string()),
            "GEMINI_API_KEY" => Some("gkey".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.telegram_bot_token, "42:secret");
        assert_eq!(config.gemini_api_key, "gkey");
    }

    #[test]
    fn test_file_wins_over_env() {
        let file = write_config(r#"{"telegram_bot_token": "1:file", "gemini_api_key": "file"}"#);
        let config = Config::load_with_env(file.path(), |_| Some("2:env".to_string())).unwrap();
        assert_eq!(config.telegram_bot_token, "1:file");
        assert_eq!(config.gemini_api_key, "file");
    }

    #[test]
    fn test_missing_token() {
        let file = write_config(r#"{"gemini_api_key": "key"}"#);
        let err = assert_err(Config::load_with_env(file.path(), no_env));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_missing_gemini_key() {
        let file = write_config(r#"{"telegram_bot_token": "123:abc", "gemini_api_key": "  "}"#);
        let err = assert_err(Config::load_with_env(file.path(), no_env));
        assert!(err.to_string().contains("gemini_api_key"));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let file = write_config(r#"{"telegram_bot_token": "invalid_token_no_colon", "gemini_api_key": "k"}"#);
        let err = assert_err(Config::load_with_env(file.path(), no_env));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let file = write_config(r#"{"telegram_bot_token": "notanumber:ABCdef", "gemini_api_key": "k"}"#);
        let err = assert_err(Config::load_with_env(file.path(), no_env));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_token_format_empty_secret() {
        let file = write_config(r#"{"telegram_bot_token": "123456789:", "gemini_api_key": "k"}"#);
        let err = assert_err(Config::load_with_env(file.path(), no_env));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let file = write_config(r#"{"telegram_bot_token": "1:a", "gemini_api_key": "k", "max_chunk_size": 0}"#);
        let err = assert_err(Config::load_with_env(file.path(), no_env));
        assert!(err.to_string().contains("max_chunk_size"));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load_with_env("/nonexistent/path/config.json", no_env));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load_with_env(file.path(), no_env));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
