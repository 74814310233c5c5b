//! Realtime session lifecycle and inbound event routing
//!
//! The session manager owns the connection to the hosted AI service: it
//! connects, resets, and tears down, and routes inbound events to the
//! playback scheduler (audio, interruptions), the tool dispatcher (tool
//! calls), and the UI bridge (grounding citations, status, errors).

pub mod transport;
pub mod wire;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::PlaybackScheduler;
use crate::dashboard::{Citation, DashboardHistory, HISTORY_CONTEXT_LEN, UiBridge};
use crate::prompt;
use crate::tools::{self, ToolContext, ToolDispatcher};
use crate::Result;

use transport::{RealtimeConnection, RealtimeTransport, SessionEvent};
use wire::{ClientMessage, ServerMessage, SessionSetup};

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never connected
    Uninitialized,
    /// Connection in progress
    Connecting,
    /// Channel open and configured
    Open,
    /// Closed by error, peer, or teardown; recover via [`SessionManager::reset`]
    Closed,
}

/// Model, voice and language settings for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Realtime model identifier
    pub model: String,
    /// Prebuilt voice name for audio replies
    pub voice: String,
    /// Reply language code (e.g. "hi-IN")
    pub language: String,
}

/// The current connection handle: outbound sender plus its event-loop task
struct CurrentSession {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    event_loop: JoinHandle<()>,
}

/// Owns the realtime session lifecycle
pub struct SessionManager {
    transport: Arc<dyn RealtimeTransport>,
    options: SessionOptions,
    language: Arc<Mutex<String>>,
    state: Arc<Mutex<SessionState>>,
    scheduler: Option<PlaybackScheduler>,
    dispatcher: Arc<ToolDispatcher>,
    history: Arc<Mutex<DashboardHistory>>,
    ui: UiBridge,
    current: Option<CurrentSession>,
}

impl SessionManager {
    /// Create a manager; playback must be attached before connecting
    #[must_use]
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        options: SessionOptions,
        dispatcher: Arc<ToolDispatcher>,
        history: Arc<Mutex<DashboardHistory>>,
        ui: UiBridge,
    ) -> Self {
        let language = Arc::new(Mutex::new(options.language.clone()));
        Self {
            transport,
            options,
            language,
            state: Arc::new(Mutex::new(SessionState::Uninitialized)),
            scheduler: None,
            dispatcher,
            history,
            ui,
            current: None,
        }
    }

    /// Attach the playback scheduler; until this is set, [`connect`] is a
    /// no-op (there is nowhere to route audio)
    ///
    /// [`connect`]: Self::connect
    pub fn attach_playback(&mut self, scheduler: PlaybackScheduler) {
        self.scheduler = Some(scheduler);
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
            .lock()
            .map_or(SessionState::Closed, |state| *state)
    }

    /// Outbound sender of the current session, if one is open
    #[must_use]
    pub fn outbound(&self) -> Option<mpsc::UnboundedSender<ClientMessage>> {
        self.current.as_ref().map(|c| c.outbound.clone())
    }

    /// Update the reply language; takes effect on the next connect or reset
    pub fn set_language(&mut self, language: impl Into<String>) {
        let language = language.into();
        self.options.language.clone_from(&language);
        if let Ok(mut current) = self.language.lock() {
            *current = language;
        }
    }

    /// Open a session and start routing its events
    ///
    /// A no-op until the playback scheduler is attached. Connection failures
    /// are surfaced as error text, not returned.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` reserves the signature for
    /// transports that must fail fast.
    pub async fn connect(&mut self) -> Result<()> {
        let Some(scheduler) = self.scheduler.clone() else {
            tracing::debug!("connect skipped, playback not ready");
            return Ok(());
        };

        self.set_state(SessionState::Connecting);

        let language = self
            .language
            .lock()
            .map(|l| l.clone())
            .unwrap_or_else(|_| self.options.language.clone());
        let setup = SessionSetup::new(
            &self.options.model,
            prompt::build_system_instruction(&language),
            tools::declarations(),
            &self.options.voice,
            &language,
        );

        let session_id = uuid::Uuid::new_v4();
        tracing::info!(session_id = %session_id, language = %language, "session connecting");

        let connection = match self.transport.connect(setup).await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(error = %e, "session connect failed");
                self.ui.set_error(format!("Session connection error: {e}"));
                self.set_state(SessionState::Closed);
                return Ok(());
            }
        };

        let outbound = connection.outbound.clone();
        let event_loop = tokio::spawn(run_event_loop(
            connection,
            scheduler,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.history),
            Arc::clone(&self.language),
            Arc::clone(&self.state),
            self.ui.clone(),
        ));

        self.current = Some(CurrentSession {
            outbound,
            event_loop,
        });
        Ok(())
    }

    /// Close the current session, clear transient UI state, and reconnect
    ///
    /// # Errors
    ///
    /// Propagates [`connect`] errors.
    ///
    /// [`connect`]: Self::connect
    pub async fn reset(&mut self) -> Result<()> {
        self.close_current();
        self.ui.set_citations(Vec::new());
        self.ui
            .set_status("Session cleared and re-initializing...");
        self.connect().await
    }

    /// Close the current session without reconnecting; idempotent
    pub fn teardown(&mut self) {
        self.close_current();
    }

    fn close_current(&mut self) {
        if let Some(current) = self.current.take() {
            current.event_loop.abort();
            tracing::debug!("session closed");
        }
        self.set_state(SessionState::Closed);
    }

    fn set_state(&self, state: SessionState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close_current();
    }
}

/// Consume a connection's events until it closes
async fn run_event_loop(
    mut connection: RealtimeConnection,
    scheduler: PlaybackScheduler,
    dispatcher: Arc<ToolDispatcher>,
    history: Arc<Mutex<DashboardHistory>>,
    language: Arc<Mutex<String>>,
    state: Arc<Mutex<SessionState>>,
    ui: UiBridge,
) {
    while let Some(event) = connection.events.recv().await {
        match event {
            SessionEvent::Open => {
                if let Ok(mut current) = state.lock() {
                    *current = SessionState::Open;
                }
                ui.set_status("Opened");
            }
            SessionEvent::Message(message) => {
                handle_message(
                    message,
                    &connection.outbound,
                    &scheduler,
                    &dispatcher,
                    &history,
                    &language,
                    &ui,
                )
                .await;
            }
            SessionEvent::Error(error) => {
                ui.set_error(error);
                if let Ok(mut current) = state.lock() {
                    *current = SessionState::Closed;
                }
            }
            SessionEvent::Closed(reason) => {
                ui.set_status(format!("Close:{reason}"));
                if let Ok(mut current) = state.lock() {
                    *current = SessionState::Closed;
                }
                return;
            }
        }
    }

    if let Ok(mut current) = state.lock() {
        *current = SessionState::Closed;
    }
}

/// Route one server message
///
/// A message carrying a tool call is handled exactly once: after the
/// dispatcher's response is sent back, any audio or interruption fields on
/// the same message are intentionally not processed.
async fn handle_message(
    mut message: ServerMessage,
    outbound: &mpsc::UnboundedSender<ClientMessage>,
    scheduler: &PlaybackScheduler,
    dispatcher: &ToolDispatcher,
    history: &Arc<Mutex<DashboardHistory>>,
    language: &Arc<Mutex<String>>,
    ui: &UiBridge,
) {
    // Grounding citations: replaced on every message, never merged
    let citations: Vec<Citation> = message
        .grounding_sources()
        .into_iter()
        .filter_map(|web| match (&web.uri, &web.title) {
            (Some(uri), Some(title)) => Some(Citation {
                uri: uri.clone(),
                title: title.clone(),
            }),
            _ => None,
        })
        .collect();
    ui.set_citations(citations);

    if let Some(tool_call) = message.tool_call.take() {
        let ctx = ToolContext {
            language: language
                .lock()
                .map(|l| l.clone())
                .unwrap_or_else(|_| String::from("hi-IN")),
            history: history
                .lock()
                .map(|h| h.recent_context(HISTORY_CONTEXT_LEN))
                .unwrap_or_default(),
        };
        let synthesized = dispatcher.dispatch(&tool_call, &ctx).await;
        if outbound
            .send(ClientMessage::tool_response(vec![synthesized]))
            .is_err()
        {
            tracing::warn!("session closed before tool response could be sent");
        }
        return;
    }

    if let Some(blob) = message.audio_data() {
        if let Err(e) = scheduler.handle_chunk(&blob.data) {
            tracing::error!(error = %e, "dropping undecodable audio chunk");
            ui.set_error(format!("Audio playback error: {e}"));
        }
    }

    if message.interrupted() {
        scheduler.interrupt();
    }
}
