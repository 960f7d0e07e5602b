//! Landing-page spec generation through a chat completion API
//!
//! A generated spec is a page title, a short description and a list of
//! section blueprints that can be fed straight into page creation. When the
//! completion service cannot be used, a canned spec built from the prompt
//! is returned instead.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::AiConfig,
    error::{ApiError, ApiResult},
    models::{FieldMap, TemplateSection},
};

const SYSTEM_PROMPT: &str = "You design landing pages. Reply with a single JSON object \
with the keys \"title\", \"description\" and \"sections\". Each section has \"type\", \
\"name\", \"order\" and \"fields\", where fields maps field names to default values.";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSpecRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sections: Vec<TemplateSection>,
    /// Set when the spec is the canned fallback
    #[serde(default)]
    pub mock: bool,
}

#[derive(Debug, Error)]
enum CompletionError {
    #[error("no API key configured")]
    MissingKey,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned {0}")]
    Status(StatusCode),
    #[error("unusable completion: {0}")]
    Malformed(String),
}

#[derive(Clone)]
pub struct AiSpecClient {
    http: Client,
    config: AiConfig,
}

impl AiSpecClient {
    pub fn new(config: AiConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                ApiError::InternalServerError
            })?;
        Ok(Self { http, config })
    }

    /// Generate a page spec for `prompt`. Only an empty prompt is an error.
    pub async fn generate_spec(&self, prompt: &str) -> ApiResult<PageSpec> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ApiError::validation("prompt", "Prompt is required"));
        }

        match self.complete(prompt).await {
            Ok(spec) => {
                info!("Generated spec with {} sections", spec.sections.len());
                Ok(spec)
            }
            Err(e) => {
                warn!("AI spec generation unavailable ({}); serving mock spec", e);
                Ok(mock_spec(prompt))
            }
        }
    }

    async fn complete(&self, prompt: &str) -> Result<PageSpec, CompletionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingKey)?;

        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Status(status));
        }

        let completion = response.json::<Value>().await?;
        parse_completion(&completion)
    }
}

/// Pull the spec out of `choices[0].message.content`
fn parse_completion(completion: &Value) -> Result<PageSpec, CompletionError> {
    let content = completion
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| CompletionError::Malformed("missing message content".into()))?;

    let mut spec: PageSpec = serde_json::from_str(content.trim())
        .map_err(|e| CompletionError::Malformed(e.to_string()))?;
    if spec.title.trim().is_empty() {
        return Err(CompletionError::Malformed("empty title".into()));
    }
    if spec.sections.iter().any(|s| s.section_type.trim().is_empty()) {
        return Err(CompletionError::Malformed("section without type".into()));
    }

    spec.sections.sort_by_key(|s| s.order);
    spec.mock = false;
    Ok(spec)
}

fn fields(value: Value) -> FieldMap {
    match value {
        Value::Object(map) => map,
        _ => FieldMap::new(),
    }
}

fn mock_spec(prompt: &str) -> PageSpec {
    let title: String = prompt.chars().take(60).collect();
    let section = |order: i32, section_type: &str, name: &str, values: Value| TemplateSection {
        section_type: section_type.to_string(),
        name: name.to_string(),
        order,
        fields: fields(values),
        style: None,
    };

    PageSpec {
        title: title.clone(),
        description: format!("A landing page for: {prompt}"),
        sections: vec![
            section(0, "hero", "Hero", json!({
                "title": title,
                "subtitle": "Tell visitors what you offer in one sentence.",
                "ctaText": "Get started",
                "ctaLink": "#contact"
            })),
            section(1, "features", "Features", json!({
                "title": "What you get",
                "items": [
                    { "title": "First benefit", "description": "Describe it here." },
                    { "title": "Second benefit", "description": "Describe it here." },
                    { "title": "Third benefit", "description": "Describe it here." }
                ]
            })),
            section(2, "cta", "Call to action", json!({
                "title": "Ready to start?",
                "buttonText": "Contact us",
                "buttonLink": "#contact"
            })),
        ],
        mock: true,
    }
}
