//! Microphone capture controller
//!
//! Pulls fixed-size mono sample blocks from the input device and forwards
//! each block, encoded, to the current realtime session. The `recording`
//! flag is updated synchronously and read inside the device callback, so no
//! block is sent after `stop()` even if a callback was already scheduled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, StreamTrait};
use tokio::sync::mpsc;

use crate::audio::codec;
use crate::audio::graph::CaptureHalf;
use crate::dashboard::UiBridge;
use crate::session::wire::ClientMessage;
use crate::{Error, Result};

/// Frames per outbound block (small for low latency)
pub const CAPTURE_BLOCK_FRAMES: usize = 256;

/// Capture lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No stream; ready to start
    Idle,
    /// Waiting on microphone acquisition
    Requesting,
    /// Stream running, blocks flowing
    Active,
}

/// Controls one microphone recording session at a time
pub struct CaptureController {
    state: CaptureState,
    recording: Arc<AtomicBool>,
    stream: Option<cpal::Stream>,
}

impl CaptureController {
    /// Create an idle controller; no device is touched until [`start`]
    ///
    /// [`start`]: Self::start
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            recording: Arc::new(AtomicBool::new(false)),
            stream: None,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> CaptureState {
        self.state
    }

    /// Whether blocks are currently being forwarded
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    /// Start capturing and forwarding blocks to the session
    ///
    /// A no-op (reporting status) when already active or when the capture
    /// half or session sender is missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Permission`] if the microphone cannot be acquired;
    /// the controller transitions back to idle.
    pub fn start(
        &mut self,
        half: Option<&CaptureHalf>,
        outbound: Option<mpsc::UnboundedSender<ClientMessage>>,
        ui: &UiBridge,
    ) -> Result<()> {
        let (Some(half), Some(outbound)) = (half, outbound) else {
            ui.set_status("Preparation for recording not complete.");
            return Ok(());
        };
        if self.state == CaptureState::Active {
            ui.set_status("Preparation for recording not complete.");
            return Ok(());
        }

        self.state = CaptureState::Requesting;
        ui.set_status("Requesting microphone access...");

        let recording = Arc::clone(&self.recording);
        let gain = half.gain();
        let mut block = Vec::with_capacity(CAPTURE_BLOCK_FRAMES);

        let stream = half
            .device
            .build_input_stream(
                &half.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Guard flag first: a callback may fire after stop()
                    if !recording.load(Ordering::Acquire) {
                        return;
                    }

                    let g = gain.lock().map(|g| *g).unwrap_or(1.0);
                    for &sample in data {
                        block.push(sample * g);
                        if block.len() == CAPTURE_BLOCK_FRAMES {
                            let blob = codec::encode_blob(&block);
                            if outbound.send(ClientMessage::realtime_input(blob)).is_err() {
                                tracing::trace!("session closed, dropping capture block");
                            }
                            block.clear();
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| {
                self.state = CaptureState::Idle;
                Error::Permission(e.to_string())
            })?;

        stream.play().map_err(|e| {
            self.state = CaptureState::Idle;
            Error::Permission(e.to_string())
        })?;

        // Flag before state so the callback observes the transition first
        self.recording.store(true, Ordering::Release);
        self.stream = Some(stream);
        self.state = CaptureState::Active;

        ui.set_status("Recording... capturing PCM blocks.");
        tracing::debug!(block_frames = CAPTURE_BLOCK_FRAMES, "capture started");
        Ok(())
    }

    /// Stop capturing; idempotent and never fails
    pub fn stop(&mut self, ui: &UiBridge) {
        if self.state == CaptureState::Idle && self.stream.is_none() {
            return;
        }

        ui.set_status("Stopping recording...");

        // Synchronous guard: stops block sends before the stream is torn down
        self.recording.store(false, Ordering::Release);

        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        self.state = CaptureState::Idle;

        ui.set_status("Recording stopped. Say start to begin again.");
        tracing::debug!("capture stopped");
    }
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}
