//! OpenAI Responses API client.
//!
//! Supports two output modes:
//! - structured (`json_schema`, strict) — the primary path
//! - `json_object` — valid JSON, unvalidated shape; the relaxed fallback the
//!   orchestrator uses when a model rejects strict schema validation
//!
//! Model output text is extracted from the `output[].content[]` message items
//! and parsed tolerantly: unparseable text yields `Value::Null` rather than an
//! error, since the raw text alone is still usable as an utterance.

use async_trait::async_trait;
use serde_json::{Value, json};
use showroom_core::completion::{
    Completion, CompletionOutcome, CompletionRequest, PromptMessage, PromptRole,
};
use showroom_core::error::CompletionError;
use tracing::{debug, warn};

/// A client for the OpenAI Responses endpoint (or any compatible proxy).
pub struct ResponsesClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ResponsesClient {
    /// Create a new client. `base_url` is the full endpoint URL.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Network(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        })
    }

    fn to_api_messages(messages: &[PromptMessage]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    PromptRole::Developer => "developer",
                    PromptRole::User => "user",
                    PromptRole::Assistant => "assistant",
                };
                json!({"role": role, "content": m.content})
            })
            .collect()
    }

    async fn create(&self, payload: Value) -> Result<Value, CompletionError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(e.to_string())
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let raw = response
            .text()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        if status != 200 {
            let details: Value = serde_json::from_str(&raw).unwrap_or_else(|_| json!({"raw": raw}));
            warn!(status, "Completion service returned error");
            return Err(CompletionError::Api {
                status,
                message: format!("completion HTTP {status}"),
                details,
            });
        }

        serde_json::from_str(&raw)
            .map_err(|e| CompletionError::Network(format!("malformed response body: {e}")))
    }

    async fn complete_with_format(
        &self,
        request: CompletionRequest,
        format: Value,
    ) -> Result<CompletionOutcome, CompletionError> {
        let payload = json!({
            "model": request.model,
            "input": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "text": {"format": format},
        });

        debug!(model = %request.model, "Sending completion request");
        let response = self.create(payload).await?;

        let text = extract_output_text(&response);
        let parsed = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        };

        Ok(CompletionOutcome {
            parsed,
            text,
            response_id: response.get("id").and_then(|v| v.as_str()).map(str::to_string),
        })
    }
}

#[async_trait]
impl Completion for ResponsesClient {
    fn name(&self) -> &str {
        "openai_responses"
    }

    async fn complete_structured(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionOutcome, CompletionError> {
        let schema = request.schema.clone().unwrap_or_else(|| json!({"type": "object"}));
        let format = json!({
            "type": "json_schema",
            "name": request.schema_name,
            "schema": schema,
            "strict": true,
        });
        self.complete_with_format(request, format).await
    }

    async fn complete_json_object(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionOutcome, CompletionError> {
        self.complete_with_format(request, json!({"type": "json_object"}))
            .await
    }
}

/// Join the `output_text` parts of every `message` output item.
fn extract_output_text(response: &Value) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(output) = response.get("output").and_then(|v| v.as_array()) {
        for item in output {
            if item.get("type").and_then(|v| v.as_str()) != Some("message") {
                continue;
            }
            if let Some(content) = item.get("content").and_then(|v| v.as_array()) {
                for c in content {
                    if c.get("type").and_then(|v| v.as_str()) == Some("output_text")
                        && let Some(text) = c.get("text").and_then(|v| v.as_str())
                        && !text.is_empty()
                    {
                        parts.push(text);
                    }
                }
            }
        }
    }
    parts.join("\n").trim().to_string()
}
