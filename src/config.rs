//! Configuration for the voice assistant
//!
//! Everything is environment-driven with sensible defaults; no config files.

use std::time::Duration;

use crate::chat::RetryPolicy;
use crate::history::DEFAULT_HISTORY_LIMIT;

/// Where the API credential comes from
///
/// The host decides how keys are stored; the core only asks for the current
/// value. A missing or blank key means chat requests fail fast without a
/// network attempt.
pub trait CredentialSource: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

/// Credential source backed by environment variables
///
/// Reads `ROADVOICE_API_KEY`, falling back to `OPENAI_API_KEY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        std::env::var("ROADVOICE_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
    }
}

/// Full assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub chat: ChatConfig,
    pub speech: SpeechConfig,
}

/// Chat completion endpoint configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Endpoint base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Bearer credential; `None` or blank fails fast as a missing credential
    pub api_key: Option<String>,

    /// Model identifier for chat completions
    pub model: String,

    /// Token limit for responses
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum retained conversation turns
    pub history_limit: usize,

    /// Retry/backoff policy for failed attempts
    pub retry: RetryPolicy,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Whole-request timeout per attempt
    pub request_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            history_limit: DEFAULT_HISTORY_LIMIT,
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Capture and synthesis limits
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Longest question forwarded to the chat endpoint, in characters
    pub max_question_chars: usize,

    /// Sanitized answers above this length get truncated
    pub spoken_length_cap: usize,

    /// Truncation target when the cap is exceeded
    pub spoken_truncate_to: usize,

    /// How long a capture waits for an utterance before timing out
    pub capture_window: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            max_question_chars: 500,
            spoken_length_cap: 1000,
            spoken_truncate_to: 800,
            capture_window: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Unset or unparsable variables fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let chat = ChatConfig {
            base_url: std::env::var("ROADVOICE_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: EnvCredentials.api_key(),
            model: std::env::var("ROADVOICE_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            max_tokens: env_parse("ROADVOICE_MAX_TOKENS", 150),
            temperature: env_parse("ROADVOICE_TEMPERATURE", 0.7),
            history_limit: env_parse("ROADVOICE_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT),
            ..ChatConfig::default()
        };

        let speech = SpeechConfig::default();

        tracing::debug!(
            base_url = %chat.base_url,
            model = %chat.model,
            history_limit = chat.history_limit,
            key_configured = chat.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()),
            "configuration loaded"
        );

        Self { chat, speech }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
