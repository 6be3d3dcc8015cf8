//! Chat completion client
//!
//! Sends the captured question to an OpenAI-compatible chat endpoint with
//! retries and exponential backoff, and owns the bounded conversation
//! history that rides along with every request. History is only mutated
//! after a successful round-trip, so a failed query leaves no trace.

mod retry;

pub use retry::RetryPolicy;

use std::sync::Mutex;

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::history::{ChatTurn, ConversationHistory, Role};
use crate::Result;

/// Persona instruction synthesized into every request, never stored
const SYSTEM_PROMPT: &str = "You are a helpful AI assistant designed for use \
    while driving. Keep responses concise, clear, and safe for audio \
    consumption. Avoid long lists or complex formatting. Provide direct, \
    actionable answers.";

#[derive(serde::Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(serde::Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Result of a single network attempt, consumed by the retry loop
#[derive(Debug)]
enum AttemptOutcome {
    /// Non-empty answer text
    Success(String),
    /// Worth another attempt after backoff
    RetryableFailure(ChatError),
    /// Aborts the remaining attempts immediately
    TerminalFailure(ChatError),
}

/// Client for the remote chat completion endpoint
pub struct ChatClient {
    http: reqwest::Client,
    config: ChatConfig,
    history: Mutex<ConversationHistory>,
}

impl ChatClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: ChatConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        let history = Mutex::new(ConversationHistory::new(config.history_limit));

        Ok(Self {
            http,
            config,
            history,
        })
    }

    /// Ask the assistant a question and return the trimmed answer text
    ///
    /// Retries transient failures with exponential backoff; terminal
    /// failures (rejected credential, non-429 client errors) abort
    /// immediately. On success the user/assistant exchange is appended to
    /// the conversation history; on failure the history is untouched.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ChatError`] once attempts are exhausted or
    /// a terminal failure occurs.
    pub async fn send_message(&self, user_text: &str) -> std::result::Result<String, ChatError> {
        let Some(api_key) = self
            .config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
        else {
            tracing::error!("chat request refused: API key is not configured");
            return Err(ChatError::CredentialMissing);
        };

        let mut last_failure: Option<ChatError> = None;

        for attempt in 0..self.config.retry.max_attempts {
            let delay = self.config.retry.delay_before(attempt);
            if !delay.is_zero() {
                tracing::debug!(delay_ms = delay.as_millis() as u64, attempt, "waiting before retry");
                tokio::time::sleep(delay).await;
            }

            tracing::debug!(attempt, total = self.config.retry.max_attempts, "sending chat request");

            match self.attempt(api_key, user_text).await {
                AttemptOutcome::Success(answer) => {
                    tracing::info!(attempt, answer_len = answer.len(), "chat completion succeeded");
                    let mut history = self.history.lock().unwrap();
                    history.append(ChatTurn::user(user_text));
                    history.append(ChatTurn::assistant(answer.clone()));
                    drop(history);
                    return Ok(answer);
                }
                AttemptOutcome::RetryableFailure(err) => {
                    tracing::warn!(attempt, error = %err, "chat attempt failed");
                    last_failure = Some(prefer_specific(last_failure, err));
                }
                AttemptOutcome::TerminalFailure(err) => {
                    tracing::error!(attempt, error = %err, "chat attempt failed terminally");
                    return Err(err);
                }
            }
        }

        tracing::error!("all chat attempts exhausted");
        Err(last_failure.unwrap_or_else(|| {
            ChatError::ServiceUnavailable("service unreachable after all attempts".to_string())
        }))
    }

    /// Forget the retained conversation
    pub fn clear_history(&self) {
        self.history.lock().unwrap().clear();
        tracing::info!("conversation history cleared");
    }

    /// Chronological copy of the retained turns
    #[must_use]
    pub fn history_snapshot(&self) -> Vec<ChatTurn> {
        self.history.lock().unwrap().snapshot()
    }

    /// Run one request/response round-trip and classify the outcome
    async fn attempt(&self, api_key: &str, user_text: &str) -> AttemptOutcome {
        let snapshot = self.history.lock().unwrap().snapshot();

        let mut messages = Vec::with_capacity(snapshot.len() + 2);
        messages.push(WireMessage {
            role: Role::System.as_str(),
            content: SYSTEM_PROMPT,
        });
        for turn in &snapshot {
            messages.push(WireMessage {
                role: turn.role.as_str(),
                content: &turn.content,
            });
        }
        messages.push(WireMessage {
            role: Role::User.as_str(),
            content: user_text,
        });

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let response = match self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return AttemptOutcome::RetryableFailure(classify_transport(&e)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat endpoint error");
            return classify_status(status, &body);
        }

        let parsed: ChatResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return AttemptOutcome::RetryableFailure(ChatError::MalformedResponse(
                    e.to_string(),
                ));
            }
        };

        match parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
        {
            Some(content) if !content.trim().is_empty() => {
                AttemptOutcome::Success(content.trim().to_string())
            }
            _ => AttemptOutcome::RetryableFailure(ChatError::EmptyResponse),
        }
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

/// Map a transport-level failure to an error kind; all are retryable
fn classify_transport(err: &reqwest::Error) -> ChatError {
    if err.is_timeout() {
        ChatError::Timeout(err.to_string())
    } else if err.is_connect() {
        ChatError::NoConnectivity(err.to_string())
    } else {
        ChatError::Unknown(err.to_string())
    }
}

/// Map a non-2xx HTTP status to an attempt outcome
///
/// 429 and 5xx are transient; any other client error aborts the retry
/// cycle, since repeating the identical request cannot succeed.
fn classify_status(status: reqwest::StatusCode, body: &str) -> AttemptOutcome {
    let diagnostic = format!("HTTP {status}: {body}");

    match status.as_u16() {
        401 | 403 => AttemptOutcome::TerminalFailure(ChatError::CredentialInvalid(diagnostic)),
        429 => AttemptOutcome::RetryableFailure(ChatError::RateLimited(diagnostic)),
        500..=599 => AttemptOutcome::RetryableFailure(ChatError::ServiceUnavailable(diagnostic)),
        _ => AttemptOutcome::TerminalFailure(ChatError::Unknown(diagnostic)),
    }
}

/// Keep the most informative failure across retries
///
/// A later `Unknown` never displaces an earlier specific kind.
fn prefer_specific(previous: Option<ChatError>, latest: ChatError) -> ChatError {
    match previous {
        Some(prev) if matches!(latest, ChatError::Unknown(_)) && !matches!(prev, ChatError::Unknown(_)) => prev,
        _ => latest,
    }
}
