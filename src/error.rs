//! Error types for the Kisan gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Kisan gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone permission or availability error
    #[error("microphone unavailable: {0}")]
    Permission(String),

    /// Audio device or stream error
    #[error("audio error: {0}")]
    Audio(String),

    /// Malformed inbound audio chunk
    #[error("audio decode error: {0}")]
    Decode(String),

    /// Realtime session transport error
    #[error("transport error: {0}")]
    Transport(String),

    /// Tool execution error
    #[error("tool error: {0}")]
    Tool(String),

    /// Generative AI service error
    #[error("generative AI error: {0}")]
    Generative(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// WebSocket error
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
