//! Voice session state machine
//!
//! One task owns the session state and drains a single event queue.
//! Capture, the network round-trip and synthesis run as spawned tasks that
//! report back through the same queue, so an arbiter signal or shutdown
//! stays responsive while work is in flight. Listening and speaking compete
//! for the one audio path and are never active at the same time.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::chat::ChatClient;
use crate::config::SpeechConfig;
use crate::error::ChatError;
use crate::sanitize;
use crate::speech::{AudioFocus, CaptureOutcome, SpeechInput, SpeechOutput};

/// Phases of one listen/answer cycle
///
/// `Failed` covers the time a query error is being reported aloud; the
/// session always lands back in `Idle` afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
    Dispatching,
    Speaking,
    Failed,
}

/// Events consumed by the session task
#[derive(Debug)]
pub enum SessionEvent {
    /// User asked to start listening
    Start,
    /// Speak an out-of-band notice (startup greeting and the like)
    Announce(String),
    /// Capture finished
    CaptureDone(CaptureOutcome),
    /// Network round-trip finished
    ChatDone {
        id: u64,
        result: Result<String, ChatError>,
    },
    /// Synthesis finished
    SpeakDone { result: crate::Result<()> },
    /// The audio focus arbiter revoked our grant
    FocusLost,
    /// The arbiter signalled focus is available again
    FocusRegained,
    /// Stop the session task
    Shutdown,
}

/// Cloneable handle for feeding events into a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    state: watch::Receiver<SessionState>,
    busy: watch::Receiver<bool>,
}

impl SessionHandle {
    /// Begin a listen/answer cycle
    pub fn start(&self) {
        self.send(SessionEvent::Start);
    }

    /// Speak a notice when the session is otherwise idle
    pub fn announce(&self, text: impl Into<String>) {
        self.send(SessionEvent::Announce(text.into()));
    }

    /// Forward an arbiter revocation
    pub fn focus_lost(&self) {
        self.send(SessionEvent::FocusLost);
    }

    /// Forward an arbiter regained signal
    pub fn focus_regained(&self) {
        self.send(SessionEvent::FocusRegained);
    }

    /// Stop the session task
    pub fn shutdown(&self) {
        self.send(SessionEvent::Shutdown);
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions, e.g. to wait for a cycle to finish
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Watch the busy flag: true while any capture or audio is in flight
    ///
    /// Feedback sentences play while the state already reads `Idle`, so
    /// hosts pacing interaction cycles should watch this instead of the
    /// state alone.
    #[must_use]
    pub fn watch_busy(&self) -> watch::Receiver<bool> {
        self.busy.clone()
    }

    /// Wait until nothing is captured, dispatched or spoken
    pub async fn wait_until_idle(&self) {
        let mut busy = self.busy.clone();
        while *busy.borrow_and_update() {
            if busy.changed().await.is_err() {
                return;
            }
        }
    }

    fn send(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("session task is gone, event dropped");
        }
    }
}

/// The voice session state machine
pub struct VoiceSession {
    state: SessionState,
    chat: Arc<ChatClient>,
    input: Arc<dyn SpeechInput>,
    output: Arc<dyn SpeechOutput>,
    focus: Arc<dyn AudioFocus>,
    limits: SpeechConfig,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    state_tx: watch::Sender<SessionState>,
    busy_tx: watch::Sender<bool>,
    /// Generation id for in-flight dispatches; stale completions are dropped
    dispatch_id: u64,
    capture_active: bool,
    synth_active: bool,
}

impl VoiceSession {
    /// Create a session and the handle that drives it
    #[must_use]
    pub fn new(
        chat: Arc<ChatClient>,
        input: Arc<dyn SpeechInput>,
        output: Arc<dyn SpeechOutput>,
        focus: Arc<dyn AudioFocus>,
        limits: SpeechConfig,
    ) -> (Self, SessionHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let (busy_tx, busy_rx) = watch::channel(false);

        let handle = SessionHandle {
            events: events_tx.clone(),
            state: state_rx,
            busy: busy_rx,
        };

        let session = Self {
            state: SessionState::Idle,
            chat,
            input,
            output,
            focus,
            limits,
            events_tx,
            events_rx,
            state_tx,
            busy_tx,
            dispatch_id: 0,
            capture_active: false,
            synth_active: false,
        };

        (session, handle)
    }

    /// Run the session until shutdown
    pub async fn run(mut self) {
        tracing::info!("voice session started");

        while let Some(event) = self.events_rx.recv().await {
            match event {
                SessionEvent::Shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                other => {
                    self.handle_event(other).await;
                    self.publish_busy();
                }
            }
        }

        // Wind down any in-flight audio work
        self.input.stop().await;
        self.output.stop().await;
        self.focus.release();

        tracing::info!("voice session stopped");
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Start => self.on_start(),
            SessionEvent::Announce(text) => self.on_announce(text),
            SessionEvent::CaptureDone(outcome) => self.on_capture_done(outcome),
            SessionEvent::ChatDone { id, result } => self.on_chat_done(id, result),
            SessionEvent::SpeakDone { result } => self.on_speak_done(result),
            SessionEvent::FocusLost => self.on_focus_lost().await,
            SessionEvent::FocusRegained => {
                // No-op until the next synthesis acquires fresh anyway
                tracing::debug!("audio focus available again");
            }
            SessionEvent::Shutdown => {}
        }
    }

    fn on_start(&mut self) {
        if self.state != SessionState::Idle || self.capture_active || self.synth_active {
            tracing::debug!(state = ?self.state, "start ignored: session is busy");
            return;
        }

        self.set_state(SessionState::Listening);
        self.capture_active = true;

        let input = Arc::clone(&self.input);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = input.capture().await;
            let _ = events.send(SessionEvent::CaptureDone(outcome));
        });
    }

    fn on_announce(&mut self, text: String) {
        if self.state != SessionState::Idle || self.capture_active || self.synth_active {
            tracing::debug!(state = ?self.state, "announcement dropped: session is busy");
            return;
        }

        self.begin_speech(text, SessionState::Idle);
    }

    fn on_capture_done(&mut self, outcome: CaptureOutcome) {
        self.capture_active = false;

        if self.state != SessionState::Listening {
            tracing::debug!(state = ?self.state, "stale capture result discarded");
            return;
        }

        match outcome {
            CaptureOutcome::Recognized(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    self.speak_feedback(phrases::CAPTURE_NO_MATCH);
                } else {
                    self.evaluate_question(text);
                }
            }
            CaptureOutcome::NoMatch => self.speak_feedback(phrases::CAPTURE_NO_MATCH),
            CaptureOutcome::Timeout => self.speak_feedback(phrases::CAPTURE_TIMEOUT),
            CaptureOutcome::PermissionDenied => self.speak_feedback(phrases::CAPTURE_PERMISSION),
            CaptureOutcome::TransportError(diag) => {
                tracing::warn!(error = %diag, "speech capture failed");
                self.speak_feedback(phrases::CAPTURE_FAILED);
            }
        }
    }

    /// Decide what to do with a recognized utterance
    fn evaluate_question(&mut self, text: String) {
        self.set_state(SessionState::Dispatching);

        if is_clear_history_request(&text) {
            tracing::info!("clear history requested by voice");
            self.chat.clear_history();
            self.begin_speech(phrases::HISTORY_CLEARED.to_string(), SessionState::Idle);
            return;
        }

        if text.chars().count() > self.limits.max_question_chars {
            tracing::warn!(chars = text.chars().count(), "question too long to dispatch");
            self.begin_speech(phrases::QUESTION_TOO_LONG.to_string(), SessionState::Idle);
            return;
        }

        self.dispatch_id += 1;
        let id = self.dispatch_id;
        let chat = Arc::clone(&self.chat);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = chat.send_message(&text).await;
            let _ = events.send(SessionEvent::ChatDone { id, result });
        });
    }

    fn on_chat_done(&mut self, id: u64, result: Result<String, ChatError>) {
        if self.state != SessionState::Dispatching || id != self.dispatch_id {
            tracing::debug!(state = ?self.state, "stale chat result discarded");
            return;
        }

        match result {
            Ok(answer) => {
                let spoken = sanitize::sanitize(&answer);
                if spoken.is_empty() {
                    tracing::warn!("answer was empty after cleanup, nothing to speak");
                    self.set_state(SessionState::Idle);
                    return;
                }

                let spoken = sanitize::cap_for_speech(
                    &spoken,
                    self.limits.spoken_length_cap,
                    self.limits.spoken_truncate_to,
                );
                self.begin_speech(spoken, SessionState::Speaking);
            }
            Err(err) => {
                tracing::error!(error = %err, "chat request failed");
                self.begin_speech(spoken_chat_error(&err).to_string(), SessionState::Failed);
            }
        }
    }

    fn on_speak_done(&mut self, result: crate::Result<()>) {
        self.synth_active = false;

        // Focus is released on every synthesis exit path, error included
        self.focus.release();

        if let Err(e) = result {
            tracing::warn!(error = %e, "speech synthesis failed");
        }

        self.set_state(SessionState::Idle);
    }

    /// The arbiter took the audio path away: stop everything, go idle
    async fn on_focus_lost(&mut self) {
        tracing::warn!(state = ?self.state, "audio focus revoked");

        self.focus.release();

        if self.synth_active {
            self.output.stop().await;
        }
        if self.capture_active {
            self.input.stop().await;
        }

        self.set_state(SessionState::Idle);
    }

    /// Speak a short notice and return to idle
    fn speak_feedback(&mut self, sentence: &str) {
        self.begin_speech(sentence.to_string(), SessionState::Idle);
    }

    /// Start synthesis for `text`, acquiring the audio focus fresh
    ///
    /// `state` is the reported session state while the text plays;
    /// completion always lands back in `Idle` with the focus released.
    fn begin_speech(&mut self, text: String, state: SessionState) {
        if !self.focus.acquire() {
            tracing::error!("audio focus denied, skipping synthesis");
            self.set_state(SessionState::Idle);
            return;
        }

        self.synth_active = true;
        self.set_state(state);

        let output = Arc::clone(&self.output);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = output.speak(&text).await;
            let _ = events.send(SessionEvent::SpeakDone { result });
        });
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "state transition");
            self.state = next;
            let _ = self.state_tx.send(next);
        }
    }

    fn publish_busy(&self) {
        let busy = self.state != SessionState::Idle || self.capture_active || self.synth_active;
        self.busy_tx.send_if_modified(|current| {
            if *current == busy {
                false
            } else {
                *current = busy;
                true
            }
        });
    }
}

/// Fixed speakable sentences; raw diagnostics never reach the speaker
pub mod phrases {
    pub const CAPTURE_NO_MATCH: &str = "I didn't hear anything. Please try again.";
    pub const CAPTURE_TIMEOUT: &str = "Listening timed out. Please try again.";
    pub const CAPTURE_PERMISSION: &str = "Microphone permission is required.";
    pub const CAPTURE_FAILED: &str = "Sorry, I couldn't understand. Please try again.";
    pub const QUESTION_TOO_LONG: &str =
        "That question was too long for me. Please ask a shorter one.";
    pub const HISTORY_CLEARED: &str = "Okay, I've cleared our conversation.";

    pub const CREDENTIAL_MISSING: &str = "Please set your API key in the settings.";
    pub const CREDENTIAL_INVALID: &str =
        "Your API key was rejected. Please check it in the settings.";
    pub const RATE_LIMITED: &str = "The service is busy right now. Please try again in a moment.";
    pub const SERVICE_UNAVAILABLE: &str =
        "The assistant service is temporarily unavailable. Please try again later.";
    pub const REQUEST_TIMEOUT: &str =
        "The request timed out. Please check your connection and try again.";
    pub const NO_CONNECTIVITY: &str = "No internet connection. Please check your network.";
    pub const UNUSABLE_ANSWER: &str = "I received an unusable answer. Please try asking again.";
    pub const REQUEST_FAILED: &str = "Sorry, I couldn't process your request right now.";
}

/// Map a chat failure to its fixed spoken sentence
#[must_use]
pub fn spoken_chat_error(err: &ChatError) -> &'static str {
    match err {
        ChatError::CredentialMissing => phrases::CREDENTIAL_MISSING,
        ChatError::CredentialInvalid(_) => phrases::CREDENTIAL_INVALID,
        ChatError::RateLimited(_) => phrases::RATE_LIMITED,
        ChatError::ServiceUnavailable(_) => phrases::SERVICE_UNAVAILABLE,
        ChatError::Timeout(_) => phrases::REQUEST_TIMEOUT,
        ChatError::NoConnectivity(_) => phrases::NO_CONNECTIVITY,
        ChatError::MalformedResponse(_) | ChatError::EmptyResponse => phrases::UNUSABLE_ANSWER,
        ChatError::Unknown(_) => phrases::REQUEST_FAILED,
    }
}

const CLEAR_HISTORY_PHRASES: &[&str] = &[
    "clear history",
    "clear the history",
    "clear conversation",
    "clear our conversation",
    "forget everything",
    "start over",
    "new conversation",
];

/// Case-insensitive match against the fixed clear-history phrase set
///
/// Trailing punctuation from the recognizer is ignored.
#[must_use]
pub fn is_clear_history_request(text: &str) -> bool {
    let normalized = text
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .trim_end()
        .to_lowercase();

    CLEAR_HISTORY_PHRASES.contains(&normalized.as_str())
}
