//! Daemon: component wiring and run loop
//!
//! Builds the audio graph, playback engine, provider clients, dispatcher,
//! and session, then drives a simple line-command frontend: `start`/`stop`
//! control the microphone, `reset` reconnects the session, `lang` switches
//! and persists the reply language, and crop-image requests from the
//! diagnosis tool are answered with a file path.

use std::sync::{Arc, Mutex};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::ai::GenerativeClient;
use crate::audio::{AudioGraph, CaptureController, PlaybackEngine, PlaybackScheduler};
use crate::config::Config;
use crate::dashboard::{DashboardHistory, ImageRequest, UiBridge, UiEvent};
use crate::mandi::MandiClient;
use crate::session::transport::LiveApiTransport;
use crate::session::{SessionManager, SessionOptions};
use crate::tools::ToolDispatcher;
use crate::{Error, Result};

/// The assembled gateway
pub struct Daemon {
    config: Config,
    graph: AudioGraph,
    capture: CaptureController,
    playback: PlaybackEngine,
    session: SessionManager,
    history: Arc<Mutex<DashboardHistory>>,
    ui: UiBridge,
    ui_events: mpsc::UnboundedReceiver<UiEvent>,
    image_requests: mpsc::UnboundedReceiver<ImageRequest>,
}

impl Daemon {
    /// Wire up all components and open the realtime session
    ///
    /// # Errors
    ///
    /// Returns an error when the generative API key is missing or the audio
    /// graph cannot be activated.
    pub async fn new(config: Config) -> Result<Self> {
        let generative_key = config
            .api_keys
            .generative
            .clone()
            .ok_or_else(|| Error::Config("KISAN_GENERATIVE_API_KEY is required".to_string()))?;
        let mandi_key = config.api_keys.mandi.clone().unwrap_or_default();

        let graph = AudioGraph::activate()?;
        let mut playback = PlaybackEngine::new();
        let scheduler = PlaybackScheduler::new(playback.clock(), graph.cursor());
        playback.start(graph.playback(), scheduler.clone())?;

        let (ui, ui_events, image_requests) = UiBridge::with_image_capture();
        let history = Arc::new(Mutex::new(DashboardHistory::new()));

        let mandi_client = Arc::new(MandiClient::new(
            mandi_key,
            &config.mandi.today_url,
            &config.mandi.historical_url,
        ));
        let ai_client = Arc::new(GenerativeClient::new(&generative_key));
        let dispatcher = Arc::new(ToolDispatcher::new(
            mandi_client,
            ai_client,
            Arc::clone(&history),
            ui.clone(),
        ));

        let transport = Arc::new(LiveApiTransport::new(generative_key));
        let options = SessionOptions {
            model: config.session.model.clone(),
            voice: config.session.voice.clone(),
            language: config.session.language.clone(),
        };
        let mut session =
            SessionManager::new(transport, options, dispatcher, Arc::clone(&history), ui.clone());
        session.attach_playback(scheduler);
        session.connect().await?;

        Ok(Self {
            config,
            graph,
            capture: CaptureController::new(),
            playback,
            session,
            history,
            ui,
            ui_events,
            image_requests,
        })
    }

    /// Run until interrupted or told to quit
    ///
    /// # Errors
    ///
    /// Returns an error on stdin failure.
    #[allow(clippy::too_many_lines)]
    pub async fn run(self) -> Result<()> {
        let Self {
            mut config,
            graph,
            mut capture,
            mut playback,
            mut session,
            history,
            ui,
            mut ui_events,
            mut image_requests,
        } = self;

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        let mut pending_image: Option<ImageRequest> = None;

        println!("Commands: start | stop | reset | clear | lang <code> | quit");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,

                event = ui_events.recv() => {
                    let Some(event) = event else { break };
                    render_ui_event(&event);
                }

                request = image_requests.recv() => {
                    if let Some(request) = request {
                        println!(
                            "Crop image requested for diagnosis. Enter an image file path (empty line cancels):"
                        );
                        pending_image = Some(request);
                    }
                }

                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    let line = line.trim().to_string();

                    if let Some(request) = pending_image.take() {
                        answer_image_request(request, &line);
                        continue;
                    }

                    match line.as_str() {
                        "" => {}
                        "start" => {
                            if let Err(e) =
                                capture.start(Some(graph.capture()), session.outbound(), &ui)
                            {
                                ui.set_error(format!("Error: {e}"));
                            }
                        }
                        "stop" => capture.stop(&ui),
                        "reset" => {
                            if let Err(e) = session.reset().await {
                                tracing::error!(error = %e, "session reset failed");
                            }
                        }
                        "clear" => {
                            if let Ok(mut history) = history.lock() {
                                history.clear();
                            }
                            println!("Dashboard history cleared.");
                        }
                        "quit" | "exit" => break,
                        other => {
                            if let Some(code) = other.strip_prefix("lang ") {
                                let code = code.trim();
                                match config.set_language(code) {
                                    Ok(()) => {
                                        session.set_language(code);
                                        if let Err(e) = session.reset().await {
                                            tracing::error!(error = %e, "session reset failed");
                                        }
                                        println!("Language set to {code}.");
                                    }
                                    Err(e) => {
                                        ui.set_error(format!("Could not save language: {e}"));
                                    }
                                }
                            } else {
                                println!(
                                    "Commands: start | stop | reset | clear | lang <code> | quit"
                                );
                            }
                        }
                    }
                }
            }
        }

        capture.stop(&ui);
        session.teardown();
        playback.stop();
        graph.close();
        Ok(())
    }
}

/// Answer a pending image request with a file's contents, or cancel
fn answer_image_request(request: ImageRequest, line: &str) {
    if line.is_empty() {
        request.cancel();
        println!("Image capture cancelled.");
        return;
    }

    match std::fs::read(line) {
        Ok(bytes) => {
            request.supply(STANDARD.encode(bytes));
            println!("Image sent for diagnosis.");
        }
        Err(e) => {
            eprintln!("[error] could not read {line}: {e}");
            request.cancel();
        }
    }
}

/// Print one UI event to the terminal frontend
fn render_ui_event(event: &UiEvent) {
    match event {
        UiEvent::Status(status) => println!("[status] {status}"),
        UiEvent::Error(error) => eprintln!("[error] {error}"),
        UiEvent::Loading(loading) => {
            if loading.active {
                println!(
                    "[tool] {} running...",
                    loading.tool_name.as_deref().unwrap_or("tool")
                );
            }
        }
        UiEvent::Citations(citations) => {
            if !citations.is_empty() {
                println!("[sources]");
                for citation in citations {
                    println!("  {}: {}", citation.title, citation.uri);
                }
            }
        }
        UiEvent::Dashboard(result) => {
            println!("[dashboard] {}", result.response.result.summary);
            for stat in &result.response.result.stats {
                println!("  {}: {}", stat.label, stat.value);
            }
        }
    }
}
