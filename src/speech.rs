//! Speech capability boundaries
//!
//! The platform speech recognizer, synthesizer and audio focus arbiter sit
//! behind narrow traits so the session logic never touches a platform API.
//! The console implementations below back the CLI: a line of input stands
//! in for a recognized utterance and synthesis prints to stdout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::Result;

/// Outcome of one capture attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// An utterance was recognized
    Recognized(String),
    /// Audio was captured but nothing was recognized
    NoMatch,
    /// No speech arrived within the capture window
    Timeout,
    /// The recognizer lacks microphone permission
    PermissionDenied,
    /// The recognizer itself failed
    TransportError(String),
}

/// Captures one spoken utterance at a time
#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// Capture a single utterance and resolve with the outcome
    async fn capture(&self) -> CaptureOutcome;

    /// Abort an in-flight capture. Safe to call when idle.
    async fn stop(&self);
}

/// Renders text as audible speech
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak `text`, resolving once synthesis completes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails or is aborted
    async fn speak(&self, text: &str) -> Result<()>;

    /// Stop ongoing synthesis. Safe to call when idle.
    async fn stop(&self);
}

/// Exclusive right to produce sound
///
/// The host arbiter may revoke a grant at any time; revocation reaches the
/// session as a focus-lost event rather than through this trait.
pub trait AudioFocus: Send + Sync {
    /// Try to take the focus token; `false` means the request was denied
    fn acquire(&self) -> bool;

    /// Return the token. Must be idempotent.
    fn release(&self);
}

/// Console-backed speech input: one line of stdin per utterance
#[derive(Debug)]
pub struct ConsoleInput {
    window: Duration,
}

impl ConsoleInput {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self { window }
    }
}

#[async_trait]
impl SpeechInput for ConsoleInput {
    async fn capture(&self) -> CaptureOutcome {
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());

        match tokio::time::timeout(self.window, reader.read_line(&mut line)).await {
            Err(_) => CaptureOutcome::Timeout,
            Ok(Err(e)) => CaptureOutcome::TransportError(e.to_string()),
            Ok(Ok(0)) => {
                // Closed stdin behaves like silence, not like a failure
                tokio::time::sleep(self.window).await;
                CaptureOutcome::Timeout
            }
            Ok(Ok(_)) => {
                let text = line.trim();
                if text.is_empty() {
                    CaptureOutcome::NoMatch
                } else {
                    CaptureOutcome::Recognized(text.to_string())
                }
            }
        }
    }

    async fn stop(&self) {
        // Nothing to abort for buffered console input
    }
}

/// Console-backed speech output: prints instead of synthesizing
#[derive(Debug, Default)]
pub struct ConsoleOutput;

#[async_trait]
impl SpeechOutput for ConsoleOutput {
    async fn speak(&self, text: &str) -> Result<()> {
        println!("assistant> {text}");
        Ok(())
    }

    async fn stop(&self) {}
}

/// Single-process focus arbiter
///
/// Always grants, since nothing else competes for audio inside the CLI.
/// Real hosts substitute the platform arbiter behind [`AudioFocus`].
#[derive(Debug, Default)]
pub struct SoloFocus {
    held: AtomicBool,
}

impl SoloFocus {
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl AudioFocus for SoloFocus {
    fn acquire(&self) -> bool {
        self.held.store(true, Ordering::SeqCst);
        true
    }

    fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
    }
}
