//! OpenAI-compatible content generator
//!
//! Posts one chat-completions request asking for a JSON object and returns
//! the parsed object. Provider failures are classified into
//! [`GenerationCause`]s; the raw provider text only travels in
//! [`GenerationError::detail`].

use crate::config::GeneratorConfig;
use async_trait::async_trait;
use roadmap_artifact::{BusinessProfile, NarrativeField, RecommendationList};
use roadmap_core::{ContentGenerator, GenerationCause, GenerationError, Tool};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const DETAIL_LIMIT: usize = 300;

/// Chat-completions generator
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl std::fmt::Debug for OpenAiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGenerator")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiGenerator {
    /// Build a client from configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: &GeneratorConfig) -> Result<Self, reqwest::Error> {
        // The orchestrator enforces the real bound; this only stops sockets leaking.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout() + Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
        })
    }

    /// Request URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, tool: Tool, profile: &BusinessProfile) -> Result<Value, GenerationError> {
        let profile_json = serde_json::to_string(profile)
            .map_err(|e| GenerationError::unexpected(format!("cannot encode profile: {e}")))?;
        Ok(json!({
            "model": self.model,
            "response_format": {"type": "json_object"},
            "temperature": 0.4,
            "messages": [
                {"role": "system", "content": system_prompt(tool)},
                {"role": "user", "content": profile_json},
            ],
        }))
    }
}

fn system_prompt(tool: Tool) -> String {
    let narrative: Vec<&str> = NarrativeField::ALL.iter().map(|f| f.key()).collect();
    let lists: Vec<&str> = RecommendationList::ALL.iter().map(|l| l.key()).collect();
    let focus = match tool {
        Tool::BusinessCredit => "building business credit",
        Tool::FundingReadiness => "becoming ready for business funding",
    };
    format!(
        "You write credit roadmaps for small businesses focused on {focus}. \
         Reply with one JSON object. String fields: {}. \
         Array fields: {}, each item {{\"name\", \"odds\" (high|medium|low), \"rationale\", \"rank\"}}.",
        narrative.join(", "),
        lists.join(", ")
    )
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    async fn generate(&self, tool: Tool, profile: &BusinessProfile) -> Result<Value, GenerationError> {
        let Some(api_key) = &self.api_key else {
            return Err(GenerationError::new(
                GenerationCause::Auth,
                "no generator API key configured",
            ));
        };

        let body = self.request_body(tool, profile)?;
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let cause = if e.is_timeout() {
                    GenerationCause::Timeout
                } else {
                    GenerationCause::Unexpected
                };
                GenerationError::new(cause, format!("request failed: {e}"))
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::unexpected(format!("cannot read response: {e}")))?;

        if !status.is_success() {
            let cause = classify(status.as_u16(), &text);
            tracing::warn!(status = status.as_u16(), %cause, "generator request rejected");
            return Err(GenerationError::new(
                cause,
                format!("{status}: {}", truncate(&text, DETAIL_LIMIT)),
            ));
        }

        extract_content(&text)
    }
}

/// Failure class for a non-success provider response
#[must_use]
pub fn classify(status: u16, body: &str) -> GenerationCause {
    match status {
        401 | 403 => GenerationCause::Auth,
        429 if error_code(body).as_deref() == Some("insufficient_quota") => GenerationCause::Quota,
        429 => GenerationCause::RateLimited,
        _ => GenerationCause::Unexpected,
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

fn error_code(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    envelope.error.code.or(envelope.error.kind)
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the JSON object out of a chat-completions response body
///
/// # Errors
/// Returns an unexpected-cause error if the envelope or content is not the
/// expected shape, or the content is not a JSON object
pub fn extract_content(body: &str) -> Result<Value, GenerationError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::unexpected(format!("unparsable response: {e}")))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GenerationError::unexpected("response has no message content"))?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| GenerationError::unexpected(format!("content is not JSON: {e}")))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(GenerationError::unexpected("content is not a JSON object"))
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
