//! Kisan Gateway - realtime voice assistant gateway for Indian farmers
//!
//! This library provides the core of the assistant:
//! - Duplex audio streaming (16kHz microphone capture out, 24kHz gapless
//!   playback of streamed replies)
//! - Realtime session lifecycle against a hosted multimodal AI service
//! - Tool-call dispatch (market prices, cross-region comparison, government
//!   schemes, crop-disease diagnosis) and result synthesis into one
//!   dashboard structure
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Frontend                         │
//! │   status │ dashboard │ citations │ image capture    │
//! └────────────────────┬────────────────────────────────┘
//!                      │ UiBridge
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Kisan Gateway                       │
//! │  Capture │ Playback │ Session │ Tools │ Synthesis   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              External collaborators                  │
//! │  Realtime AI session │ Mandi APIs │ Generative AI   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod ai;
pub mod audio;
pub mod config;
pub mod daemon;
pub mod dashboard;
pub mod error;
pub mod mandi;
pub mod prompt;
pub mod session;
pub mod tools;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
