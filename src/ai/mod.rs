//! Generative AI client
//!
//! Tools call a text-generation service for market summaries, a
//! search-grounded variant for scheme lookup, and a vision variant with a
//! structured-output schema for disease diagnosis. All three go through the
//! same `generateContent` endpoint.

pub mod parsing;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{Error, Result};

/// Default text/vision model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body sent to the `generateContent` endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

/// A content message
#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

/// A part within a content message
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline_data(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                data: data.into(),
                mime_type: mime_type.into(),
            }),
        }
    }
}

/// Inline binary data (images)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    data: String,
    mime_type: String,
}

/// Structured-output options
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Response from the `generateContent` endpoint
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Joined text of the first candidate's parts
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the generative AI service
pub struct GenerativeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GenerativeClient {
    /// Create a client against the default endpoint and model
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Builder method: set the model identifier
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder method: set a custom base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Generate text for a prompt
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generative`] on API failure.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        self.request(GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            generation_config: None,
            tools: None,
        })
        .await
    }

    /// Generate text with web-search grounding enabled
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generative`] on API failure.
    pub async fn generate_grounded(&self, prompt: &str) -> Result<String> {
        self.request(GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            generation_config: None,
            tools: Some(vec![json!({"googleSearch": {}})]),
        })
        .await
    }

    /// Analyze an image with a structured-output schema
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generative`] on API failure.
    pub async fn generate_vision(
        &self,
        image_base64: &str,
        mime_type: &str,
        prompt: &str,
        schema: Value,
    ) -> Result<String> {
        self.request(GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::inline_data(image_base64, mime_type),
                    Part::text(prompt),
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema),
            }),
            tools: None,
        })
        .await
    }

    async fn request(&self, body: GenerateRequest) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "generateContent request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "generateContent API error");
            return Err(Error::Generative(format!("API error {status}: {body}")));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse generateContent response");
            e
        })?;

        Ok(parsed.text())
    }
}
