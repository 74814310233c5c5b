//! Crop disease diagnosis tool
//!
//! Sends a captured plant image to the vision model with a structured-output
//! schema. Any failure (transport, parse, or an answer with no disease
//! name) degrades to a fixed consult-an-officer diagnosis in the session
//! language rather than an error.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::ai::GenerativeClient;
use crate::tools::{Diagnosis, ToolContext};

const DIAGNOSIS_PROMPT: &str = "You are a multilingual crop disease diagnosis and treatment assistant.\n\nGiven an image of a diseased plant, return the following:\n1. Disease name (common and scientific)\n2. Cause: fungal, bacterial, pest, deficiency, etc.\n3. Immediate next step for the farmer\n4. Organic remedies (e.g., neem spray)\n5. Inorganic solutions (e.g., safe fungicide/pesticide)\n\nRespond in the user's chosen Indian language. Use agricultural examples from India (e.g., \"red rot in sugarcane\").\n\nAlways prioritize safety and encourage farmers to consult nearby agricultural officers if needed.";

fn data_url_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^data:image/(png|jpeg|jpg);base64,").ok())
        .as_ref()
}

/// Strip a `data:image/...;base64,` prefix, if present
#[must_use]
pub fn strip_data_url(image: &str) -> &str {
    data_url_regex().map_or(image, |re| {
        re.find(image)
            .map_or(image, |prefix| &image[prefix.end()..])
    })
}

/// Diagnose a plant image; never fails, degrading to a fixed fallback
pub async fn run(image: &str, ai: &GenerativeClient, ctx: &ToolContext) -> Diagnosis {
    tracing::info!("diagnosis tool called");

    let image_base64 = strip_data_url(image);

    let chat_context = ctx.chat_context();
    let context_block = if chat_context.is_empty() {
        String::new()
    } else {
        format!("{chat_context}\n\n")
    };
    let prompt = format!(
        "{context_block}{DIAGNOSIS_PROMPT}\nLanguage: {}\n\nReturn ONLY a valid JSON object with the following fields: diseaseName, cause, treatment (array of steps), warnings (array), language. Do not include any explanation or extra text.",
        ctx.language
    );

    match ai
        .generate_vision(image_base64, "image/png", &prompt, response_schema())
        .await
    {
        Ok(text) => serde_json::from_str::<Diagnosis>(&text)
            .ok()
            .filter(|d| !d.disease_name.is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("diagnosis reply had no usable disease name");
                fallback_diagnosis(&ctx.language)
            }),
        Err(e) => {
            tracing::error!(error = %e, "diagnosis request failed");
            fallback_diagnosis(&ctx.language)
        }
    }
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "diseaseName": {"type": "STRING"},
            "cause": {"type": "STRING"},
            "treatment": {"type": "ARRAY", "items": {"type": "STRING"}},
            "warnings": {"type": "ARRAY", "items": {"type": "STRING"}},
            "language": {"type": "STRING"},
        },
        "propertyOrdering": ["diseaseName", "cause", "treatment", "warnings", "language"],
    })
}

/// Fixed diagnosis used when the model cannot identify the disease
#[must_use]
pub fn fallback_diagnosis(language: &str) -> Diagnosis {
    let hindi = language.starts_with("hi");
    Diagnosis {
        disease_name: if hindi { "अज्ञात रोग" } else { "Unknown Disease" }.to_string(),
        cause: if hindi {
            "पहचान नहीं हो सकी।"
        } else {
            "Could not identify."
        }
        .to_string(),
        treatment: vec![
            if hindi {
                "कृपया नजदीकी कृषि अधिकारी से संपर्क करें।"
            } else {
                "Please consult your nearest agricultural officer."
            }
            .to_string(),
        ],
        warnings: Vec::new(),
        language: if language.is_empty() { "en" } else { language }.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_data_url_prefix() {
        assert_eq!(strip_data_url("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_url("data:image/jpeg;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_url("QUJD"), "QUJD");
    }

    #[test]
    fn fallback_is_localized() {
        let hi = fallback_diagnosis("hi-IN");
        assert_eq!(hi.disease_name, "अज्ञात रोग");

        let en = fallback_diagnosis("en-IN");
        assert_eq!(en.disease_name, "Unknown Disease");
        assert_eq!(
            en.treatment,
            vec!["Please consult your nearest agricultural officer.".to_string()]
        );
    }

    #[test]
    fn fallback_defaults_language_to_english() {
        assert_eq!(fallback_diagnosis("").language, "en");
    }
}
