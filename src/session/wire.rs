//! Wire types for the realtime session channel
//!
//! JSON messages exchanged with the hosted realtime AI service, camelCase on
//! the wire. Outbound: session setup, microphone audio, tool responses.
//! Inbound: model audio, tool-call requests, interruption signals, grounding
//! metadata, and lifecycle frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audio::AudioBlob;
use crate::tools::SynthesizedResult;

// ---------------------------------------------------------------------------
// Outbound (client → service)
// ---------------------------------------------------------------------------

/// A message sent to the realtime service
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// Session configuration, sent once after connecting
    Setup(SetupMessage),
    /// One microphone block
    RealtimeInput(RealtimeInputMessage),
    /// Responses to a tool-call request
    ToolResponse(ToolResponseMessage),
}

impl ClientMessage {
    /// Wrap a session setup
    #[must_use]
    pub fn setup(setup: SessionSetup) -> Self {
        Self::Setup(SetupMessage { setup })
    }

    /// Wrap an encoded microphone block
    #[must_use]
    pub fn realtime_input(media: AudioBlob) -> Self {
        Self::RealtimeInput(RealtimeInputMessage {
            realtime_input: RealtimeInput { media },
        })
    }

    /// Wrap synthesized tool responses
    #[must_use]
    pub fn tool_response(function_responses: Vec<SynthesizedResult>) -> Self {
        Self::ToolResponse(ToolResponseMessage {
            tool_response: ToolResponsePayload { function_responses },
        })
    }
}

/// Envelope for [`SessionSetup`]
#[derive(Debug, Clone, Serialize)]
pub struct SetupMessage {
    pub setup: SessionSetup,
}

/// Session configuration: model, instruction, tools, voice and language
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetup {
    pub model: String,
    pub system_instruction: SystemInstruction,
    pub tools: Vec<Value>,
    pub speech_config: SpeechConfig,
    pub response_modalities: Vec<String>,
}

impl SessionSetup {
    /// Build an audio-modality setup
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        instruction: impl Into<String>,
        tools: Vec<Value>,
        voice: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: instruction.into(),
                }],
            },
            tools,
            speech_config: SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.into(),
                    },
                },
                language_code: language.into(),
            },
            response_modalities: vec!["AUDIO".to_string()],
        }
    }
}

/// System instruction as a list of text parts
#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<TextPart>,
}

/// A plain text part
#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

/// Voice and reply-language configuration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
    pub language_code: String,
}

/// Voice selection wrapper
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

/// A named prebuilt voice
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Envelope for one microphone block
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

/// One microphone block
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeInput {
    pub media: AudioBlob,
}

/// Envelope for tool responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponseMessage {
    pub tool_response: ToolResponsePayload,
}

/// Tool responses keyed by call id
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponsePayload {
    pub function_responses: Vec<SynthesizedResult>,
}

// ---------------------------------------------------------------------------
// Inbound (service → client)
// ---------------------------------------------------------------------------

/// A message received from the realtime service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub tool_call: Option<ToolCallRequest>,
    #[serde(default)]
    pub setup_complete: Option<Value>,
}

impl ServerMessage {
    /// Base64 audio of the first model-turn part, if any
    #[must_use]
    pub fn audio_data(&self) -> Option<&AudioBlob> {
        self.server_content
            .as_ref()?
            .model_turn
            .as_ref()?
            .parts
            .first()?
            .inline_data
            .as_ref()
    }

    /// Whether this message carries an interruption signal
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.server_content
            .as_ref()
            .is_some_and(|c| c.interrupted.unwrap_or(false))
    }

    /// Web sources from grounding metadata, if present
    #[must_use]
    pub fn grounding_sources(&self) -> Vec<&WebSource> {
        self.server_content
            .as_ref()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| {
                m.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Model output fields of a server message
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub interrupted: Option<bool>,
    #[serde(default)]
    pub turn_complete: Option<bool>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

/// One model turn, a list of parts
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

/// A part of a model turn: inline audio or text
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    #[serde(default)]
    pub inline_data: Option<AudioBlob>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Search-grounding metadata attached to a reply
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

/// One grounding source
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

/// A web source backing a grounded statement
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSource {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// A batch of tool-call requests arriving in one message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

/// One requested tool invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realtime_input_serializes_camel_case() {
        let msg = ClientMessage::realtime_input(AudioBlob {
            data: "AAAA".to_string(),
            mime_type: "audio/pcm;rate=16000".to_string(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["realtimeInput"]["media"]["data"], "AAAA");
        assert_eq!(
            json["realtimeInput"]["media"]["mimeType"],
            "audio/pcm;rate=16000"
        );
    }

    #[test]
    fn server_message_extracts_audio_and_interrupt() {
        let raw = serde_json::json!({
            "serverContent": {
                "modelTurn": {
                    "parts": [{"inlineData": {"data": "QQ==", "mimeType": "audio/pcm;rate=24000"}}]
                },
                "interrupted": true
            }
        });
        let msg: ServerMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.audio_data().unwrap().data, "QQ==");
        assert!(msg.interrupted());
    }

    #[test]
    fn grounding_sources_skip_missing_web() {
        let raw = serde_json::json!({
            "serverContent": {
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://example.in", "title": "Mandi"}},
                        {}
                    ]
                }
            }
        });
        let msg: ServerMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.grounding_sources().len(), 1);
    }

    #[test]
    fn tool_call_batch_deserializes() {
        let raw = serde_json::json!({
            "toolCall": {
                "functionCalls": [
                    {"id": "call-1", "name": "get_market_data", "args": {"commodityName": "Onion"}}
                ]
            }
        });
        let msg: ServerMessage = serde_json::from_value(raw).unwrap();
        let batch = msg.tool_call.unwrap();
        assert_eq!(batch.function_calls.len(), 1);
        assert_eq!(batch.function_calls[0].name, "get_market_data");
    }
}
