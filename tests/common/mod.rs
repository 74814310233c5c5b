//! Shared test helpers
//!
//! Audio components are tested without hardware: a manually driven clock
//! stands in for the output stream's sample counter.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use kisan_gateway::audio::{Clock, PLAYBACK_SAMPLE_RATE, PlaybackScheduler, SharedCursor};

/// A playback clock driven by the test
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(0.0),
        })
    }

    pub fn set(&self, now: f64) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap()
    }
}

/// A scheduler over a manual clock and a fresh shared cursor
pub fn manual_scheduler() -> (PlaybackScheduler, Arc<ManualClock>, SharedCursor) {
    let clock = ManualClock::new();
    let cursor: SharedCursor = Arc::new(Mutex::new(0.0));
    let scheduler = PlaybackScheduler::new(clock.clone(), Arc::clone(&cursor));
    (scheduler, clock, cursor)
}

/// Generate sine wave samples at the playback rate
pub fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (PLAYBACK_SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence at the playback rate
pub fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (PLAYBACK_SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}
