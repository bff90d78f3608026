//! Completion trait — the abstraction over the LLM completion service.
//!
//! The orchestrator calls `complete_structured` for schema-constrained output
//! and falls back to `complete_json_object` (valid JSON, unvalidated shape)
//! when the service rejects strict schema validation for the chosen model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;

/// The role of a prompt message sent to the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    /// System/developer-style instruction (persona, rules, knowledge).
    Developer,
    User,
    Assistant,
}

/// One message in a structured prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn developer(content: impl Into<String>) -> Self {
        Self { role: PromptRole::Developer, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: PromptRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: PromptRole::Assistant, content: content.into() }
    }
}

/// A completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    pub temperature: f64,
    /// JSON schema constraining the output. `None` requests plain JSON-object
    /// mode (valid JSON, unvalidated shape).
    pub schema: Option<serde_json::Value>,
    /// Name reported alongside the schema (required by the wire format).
    pub schema_name: String,
}

/// A parsed completion result.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    /// The model's output parsed as JSON; `Value::Null` when unparseable.
    pub parsed: serde_json::Value,
    /// The raw output text exactly as the model produced it.
    pub text: String,
    /// Service-assigned response id, when present.
    pub response_id: Option<String>,
}

/// The completion service collaborator.
///
/// Implementations: the OpenAI Responses client in `showroom-providers`,
/// scripted mocks in tests.
#[async_trait]
pub trait Completion: Send + Sync {
    /// A human-readable name for this service.
    fn name(&self) -> &str;

    /// Request output conforming to `request.schema` (strict validation).
    async fn complete_structured(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionOutcome, CompletionError>;

    /// Request valid JSON without schema validation — the relaxed fallback.
    async fn complete_json_object(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionOutcome, CompletionError>;
}
