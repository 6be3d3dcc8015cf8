//! Roadvoice - hands-free voice assistant
//!
//! Turns a spoken question into a spoken answer: capture an utterance,
//! ask a remote chat completion endpoint, speak the cleaned-up reply.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │              Host capabilities                    │
//! │  SpeechInput │ SpeechOutput │ AudioFocus arbiter  │
//! └──────────────────────┬───────────────────────────┘
//!                        │ events
//! ┌──────────────────────▼───────────────────────────┐
//! │               VoiceSession                        │
//! │  Idle → Listening → Dispatching → Speaking → Idle │
//! └──────────────────────┬───────────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────────┐
//! │   ChatClient (retries, bounded history)           │
//! │        → ResponseSanitizer → speech               │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Listening and speaking compete for a single audio resource and are
//! mutually exclusive; the session serializes every transition on one task.

pub mod chat;
pub mod config;
pub mod error;
pub mod history;
pub mod sanitize;
pub mod session;
pub mod speech;

pub use chat::{ChatClient, RetryPolicy};
pub use config::{ChatConfig, Config, CredentialSource, EnvCredentials, SpeechConfig};
pub use error::{ChatError, Error, Result};
pub use history::{ChatTurn, ConversationHistory, Role};
pub use session::{SessionHandle, SessionState, VoiceSession};
pub use speech::{AudioFocus, CaptureOutcome, SpeechInput, SpeechOutput};
