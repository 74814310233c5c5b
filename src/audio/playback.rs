//! Gapless playback scheduling for inbound audio chunks
//!
//! Each inbound base64 PCM chunk is decoded and scheduled on the playback
//! timeline at `max(next_start_time, now)`; the cursor then advances by the
//! chunk's duration, so consecutive chunks play back-to-back with no gap or
//! overlap. An interruption stops every live chunk and resets the cursor to
//! zero, so the next chunk schedules relative to the current time.
//!
//! The timeline clock is injected as a trait: production uses the sample
//! counter advanced by the output stream, tests drive time by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, StreamTrait};

use crate::audio::codec;
use crate::audio::graph::{PLAYBACK_SAMPLE_RATE, PlaybackHalf, SharedCursor};
use crate::{Error, Result};

/// A monotonic playback-timeline clock, in seconds
pub trait Clock: Send + Sync {
    /// Current position on the playback timeline
    fn now(&self) -> f64;
}

/// Clock backed by a frame counter advanced by the output stream
pub struct SampleClock {
    frames: AtomicU64,
    rate: u32,
}

impl SampleClock {
    /// Create a clock at frame zero
    #[must_use]
    pub const fn new(rate: u32) -> Self {
        Self {
            frames: AtomicU64::new(0),
            rate,
        }
    }

    /// Advance the clock by rendered frames
    pub fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Release);
    }
}

impl Clock for SampleClock {
    fn now(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let frames = self.frames.load(Ordering::Acquire) as f64;
        frames / f64::from(self.rate)
    }
}

/// One chunk placed on the playback timeline
struct ScheduledChunk {
    start: f64,
    samples: Vec<f32>,
}

impl ScheduledChunk {
    fn duration(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let len = self.samples.len() as f64;
        len / f64::from(PLAYBACK_SAMPLE_RATE)
    }

    fn end(&self) -> f64 {
        self.start + self.duration()
    }
}

/// Decodes inbound chunks and schedules them gaplessly
///
/// Cheap to clone; all state is shared. The playback cursor is the graph's
/// shared cursor, mutated only here and on interruption.
#[derive(Clone)]
pub struct PlaybackScheduler {
    clock: Arc<dyn Clock>,
    next_start_time: SharedCursor,
    live: Arc<Mutex<Vec<ScheduledChunk>>>,
}

impl PlaybackScheduler {
    /// Create a scheduler over the given clock and shared cursor
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, next_start_time: SharedCursor) -> Self {
        Self {
            clock,
            next_start_time,
            live: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Decode a base64 PCM chunk and schedule it after the previous chunk
    ///
    /// Returns the scheduled start time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for a malformed chunk; the pipeline
    /// continues, nothing is scheduled.
    pub fn handle_chunk(&self, data: &str) -> Result<f64> {
        let samples = codec::decode_blob(data)?;
        #[allow(clippy::cast_precision_loss)]
        let duration = samples.len() as f64 / f64::from(PLAYBACK_SAMPLE_RATE);

        let mut cursor = self
            .next_start_time
            .lock()
            .map_err(|_| Error::Audio("playback cursor poisoned".to_string()))?;
        let start = cursor.max(self.clock.now());

        if let Ok(mut live) = self.live.lock() {
            live.push(ScheduledChunk { start, samples });
        }
        *cursor = start + duration;

        tracing::trace!(start, duration, "scheduled audio chunk");
        Ok(start)
    }

    /// Stop and discard every live chunk and reset the cursor to zero
    pub fn interrupt(&self) {
        if let Ok(mut live) = self.live.lock() {
            let dropped = live.len();
            live.clear();
            tracing::debug!(dropped, "playback interrupted");
        }
        if let Ok(mut cursor) = self.next_start_time.lock() {
            *cursor = 0.0;
        }
    }

    /// Number of chunks currently scheduled or playing
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Current cursor value
    #[must_use]
    pub fn cursor(&self) -> f64 {
        self.next_start_time.lock().map(|c| *c).unwrap_or(0.0)
    }

    /// Mix scheduled chunks into an interleaved output buffer starting at
    /// timeline position `from`, duplicating mono samples across channels
    pub fn render(&self, from: f64, out: &mut [f32], channels: usize, gain: f32) {
        let Ok(live) = self.live.lock() else {
            out.fill(0.0);
            return;
        };

        for (i, frame) in out.chunks_mut(channels).enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let t = from + i as f64 / f64::from(PLAYBACK_SAMPLE_RATE);

            let mut sample = 0.0f32;
            for chunk in live.iter() {
                if t >= chunk.start && t < chunk.end() {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let idx = ((t - chunk.start) * f64::from(PLAYBACK_SAMPLE_RATE)) as usize;
                    if let Some(s) = chunk.samples.get(idx) {
                        sample += s;
                    }
                }
            }

            for slot in frame.iter_mut() {
                *slot = sample * gain;
            }
        }
    }

    /// Remove chunks whose playback has ended naturally
    pub fn prune(&self, now: f64) {
        if let Ok(mut live) = self.live.lock() {
            live.retain(|chunk| chunk.end() > now);
        }
    }
}

/// Owns the output stream feeding the scheduler's timeline to the device
pub struct PlaybackEngine {
    clock: Arc<SampleClock>,
    stream: Option<cpal::Stream>,
}

impl PlaybackEngine {
    /// Create an engine with a fresh sample clock
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SampleClock::new(PLAYBACK_SAMPLE_RATE)),
            stream: None,
        }
    }

    /// The engine's clock, for constructing the scheduler
    #[must_use]
    pub fn clock(&self) -> Arc<SampleClock> {
        Arc::clone(&self.clock)
    }

    /// Start the output stream
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if the stream cannot be built or started.
    pub fn start(&mut self, half: &PlaybackHalf, scheduler: PlaybackScheduler) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let channels = half.channels();
        let gain = half.gain();
        let clock = Arc::clone(&self.clock);

        let stream = half
            .device
            .build_output_stream(
                &half.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    let now = clock.now();
                    let g = gain.lock().map(|g| *g).unwrap_or(1.0);
                    scheduler.render(now, data, channels, g);
                    clock.advance(frames as u64);
                    scheduler.prune(clock.now());
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("playback engine started");
        Ok(())
    }

    /// Stop the output stream
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("playback engine stopped");
        }
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}
