//! Audio graph: one capture-rate half and one playback-rate half
//!
//! Capture and playback run at different sample rates (16kHz microphone,
//! 24kHz model audio), so each half owns its own device and stream config.
//! The graph also owns the playback cursor shared between the scheduler and
//! interruption handling, and a gain handle per half as the sole attachment
//! point for other components.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for microphone capture (speech)
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Sample rate for model audio playback
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Playback-timeline cursor, in seconds; shared between the scheduler and
/// any interruption handler so both observe the same value
pub type SharedCursor = Arc<Mutex<f64>>;

/// Linear gain applied inside a stream callback
pub type SharedGain = Arc<Mutex<f32>>;

/// Capture half of the graph: input device at 16kHz mono
pub struct CaptureHalf {
    pub(crate) device: Device,
    pub(crate) config: StreamConfig,
    gain: SharedGain,
}

impl CaptureHalf {
    /// Gain handle for the capture path
    #[must_use]
    pub fn gain(&self) -> SharedGain {
        Arc::clone(&self.gain)
    }
}

/// Playback half of the graph: output device at 24kHz, mono preferred
pub struct PlaybackHalf {
    pub(crate) device: Device,
    pub(crate) config: StreamConfig,
    gain: SharedGain,
}

impl PlaybackHalf {
    /// Gain handle for the playback path
    #[must_use]
    pub fn gain(&self) -> SharedGain {
        Arc::clone(&self.gain)
    }

    /// Output channel count of the selected device config
    #[must_use]
    pub fn channels(&self) -> usize {
        usize::from(self.config.channels)
    }
}

/// Both halves plus the shared playback cursor
pub struct AudioGraph {
    capture: CaptureHalf,
    playback: PlaybackHalf,
    next_start_time: SharedCursor,
}

impl AudioGraph {
    /// Activate the graph: select devices and stream configs for both halves
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if no suitable input or output device/config
    /// is available.
    pub fn activate() -> Result<Self> {
        let host = cpal::default_host();

        let input = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let capture_config = input
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(CAPTURE_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(CAPTURE_SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable capture config found".to_string()))?
            .with_sample_rate(SampleRate(CAPTURE_SAMPLE_RATE))
            .config();

        let output = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let playback_config = output
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: stereo output, mono samples duplicated per frame
                output.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable playback config found".to_string()))?
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            input = input.name().unwrap_or_default(),
            output = output.name().unwrap_or_default(),
            capture_rate = CAPTURE_SAMPLE_RATE,
            playback_rate = PLAYBACK_SAMPLE_RATE,
            playback_channels = playback_config.channels,
            "audio graph activated"
        );

        Ok(Self {
            capture: CaptureHalf {
                device: input,
                config: capture_config,
                gain: Arc::new(Mutex::new(1.0)),
            },
            playback: PlaybackHalf {
                device: output,
                config: playback_config,
                gain: Arc::new(Mutex::new(1.0)),
            },
            next_start_time: Arc::new(Mutex::new(0.0)),
        })
    }

    /// Capture half of the graph
    #[must_use]
    pub fn capture(&self) -> &CaptureHalf {
        &self.capture
    }

    /// Playback half of the graph
    #[must_use]
    pub fn playback(&self) -> &PlaybackHalf {
        &self.playback
    }

    /// The shared playback cursor
    #[must_use]
    pub fn cursor(&self) -> SharedCursor {
        Arc::clone(&self.next_start_time)
    }

    /// Close the graph, releasing device handles
    ///
    /// Streams attached to either half must be stopped first; dropping the
    /// graph releases the devices themselves.
    pub fn close(self) {
        tracing::debug!("audio graph closed");
        drop(self);
    }
}
