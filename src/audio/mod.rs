//! Audio pipeline
//!
//! Capture at 16kHz feeds the realtime session; 24kHz replies are scheduled
//! gaplessly for playback. Wire format is base64 16-bit PCM both ways.

mod capture;
pub mod codec;
mod graph;
mod playback;

pub use capture::{CAPTURE_BLOCK_FRAMES, CaptureController, CaptureState};
pub use codec::{AudioBlob, CAPTURE_MIME_TYPE, decode_blob, encode_blob};
pub use graph::{
    AudioGraph, CAPTURE_SAMPLE_RATE, CaptureHalf, PLAYBACK_SAMPLE_RATE, PlaybackHalf, SharedCursor,
    SharedGain,
};
pub use playback::{Clock, PlaybackEngine, PlaybackScheduler, SampleClock};
