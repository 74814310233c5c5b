//! Government scheme lookup tool
//!
//! Asks the search-grounded AI service for schemes matching a query and
//! location, requesting strict JSON. The reply is run through fenced-JSON
//! extraction since models occasionally wrap the object in a code block.

use chrono::Local;
use serde_json::Value;

use crate::ai::{GenerativeClient, parsing};
use crate::tools::{SchemesResult, ToolContext};

const FALLBACK_SUMMARY: &str =
    "The AI could not generate specific scheme information for the provided query.";

/// Validated arguments for one scheme lookup
#[derive(Debug, Clone, Default)]
pub struct SchemesArgs {
    pub query: String,
    pub location: String,
}

impl SchemesArgs {
    /// Validate raw call arguments; `query` and `location` are required
    #[must_use]
    pub fn from_args(args: Option<&Value>) -> Option<Self> {
        let args = args?;
        Some(Self {
            query: args.get("query")?.as_str()?.to_string(),
            location: args.get("location")?.as_str()?.to_string(),
        })
    }
}

/// Run the lookup; never fails, errors degrade to an error-flavored summary
pub async fn run(args: &SchemesArgs, ai: &GenerativeClient, ctx: &ToolContext) -> SchemesResult {
    tracing::info!(query = %args.query, location = %args.location, "scheme tool called");

    let prompt = build_prompt(args, ctx);

    match ai.generate_grounded(&prompt).await {
        Ok(text) => {
            let parsed = parsing::parse_model_json(&text);
            let summary = parsed
                .get("summary")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map_or_else(|| FALLBACK_SUMMARY.to_string(), str::to_string);
            let schemes = parsed
                .get("schemes")
                .cloned()
                .map(|value| serde_json::from_value(value).unwrap_or_default())
                .unwrap_or_default();
            SchemesResult { summary, schemes }
        }
        Err(e) => {
            tracing::error!(error = %e, "scheme lookup failed");
            SchemesResult {
                summary: format!(
                    "Error analyzing data with AI: Failed to connect to AI service or generate content. Details: {e}"
                ),
                schemes: Vec::new(),
            }
        }
    }
}

fn build_prompt(args: &SchemesArgs, ctx: &ToolContext) -> String {
    let chat_context = ctx.chat_context();
    let context_block = if chat_context.is_empty() {
        String::new()
    } else {
        format!("{chat_context}\n\n")
    };
    let today = Local::now().format("%d/%m/%Y");

    format!(
        r#"{context_block}You are Kisan Mitra, a multilingual AI assistant and expert agricultural advisor for Indian farmers.

Today's Date: {today}

Your task is to find and return only the most relevant Indian government agricultural schemes (Central or State-level) based on the following user query:

Query: {query}
Location: {location}

You must:
- Identify appropriate subsidy, loan, insurance, or support schemes.
- Summarize each scheme in simple, understandable language.
- Include eligibility conditions and a direct link to apply (or official info page).
- Prioritize Indian government sources like PMKSY, PMFBY, KCC, NABARD, Agri Department portals, etc.

Respond only in {language}. Use local agricultural terminology.

Output must be a valid JSON object with this structure:
{{
  "summary": "Short overall summary of what was found or suggested",
  "schemes": [
    {{
      "name": "Full scheme name in {language}",
      "summary": "Short description of what it provides",
      "eligibility": "Eligibility criteria or who it applies to",
      "applicationLink": "Direct official link to apply or view details. No extra text."
    }}
  ]
}}

Do not include any explanation, introduction, or formatting outside of the JSON response.

Respond strictly in valid JSON only."#,
        query = args.query,
        location = args.location,
        language = ctx.language,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn args_require_query_and_location() {
        assert!(SchemesArgs::from_args(Some(&json!({"query": "subsidy"}))).is_none());
        assert!(SchemesArgs::from_args(Some(&json!({"location": "Bihar"}))).is_none());

        let args = SchemesArgs::from_args(Some(&json!({
            "query": "drip irrigation subsidy",
            "location": "Maharashtra",
        })))
        .unwrap();
        assert_eq!(args.query, "drip irrigation subsidy");
        assert_eq!(args.location, "Maharashtra");
    }

    #[test]
    fn prompt_carries_query_location_and_language() {
        let args = SchemesArgs {
            query: "crop insurance".to_string(),
            location: "Punjab".to_string(),
        };
        let ctx = ToolContext {
            language: "pa-IN".to_string(),
            history: Vec::new(),
        };
        let prompt = build_prompt(&args, &ctx);
        assert!(prompt.contains("Query: crop insurance"));
        assert!(prompt.contains("Location: Punjab"));
        assert!(prompt.contains("Respond only in pa-IN."));
    }
}
