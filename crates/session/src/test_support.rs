//! Shared fixtures for session tests: a scripted completion service and
//! minimal session states.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use showroom_core::agent::AgentSpec;
use showroom_core::completion::{Completion, CompletionOutcome, CompletionRequest};
use showroom_core::error::CompletionError;
use showroom_core::knowledge::{KnowledgeSnippet, KnowledgeSource};
use showroom_core::room::RoomPlan;

use crate::registry::SessionState;

pub fn agent(id: &str, expertise: &[&str]) -> AgentSpec {
    AgentSpec {
        id: id.to_string(),
        display_name: id.to_uppercase(),
        persona: format!("You are {id}."),
        expertise: expertise.iter().map(|s| s.to_string()).collect(),
        knowledge_tags: Vec::new(),
        preferred_zone_ids: Vec::new(),
        preferred_spawn_tags: Vec::new(),
        position: None,
        spawn_point_id: None,
    }
}

/// A knowledge source that never finds anything.
pub struct NoKnowledge;

impl KnowledgeSource for NoKnowledge {
    fn search(&self, _query: &str, _tags: &[String], _k: usize) -> Vec<KnowledgeSnippet> {
        Vec::new()
    }
}

pub fn session_state(session_id: &str, agent_ids: &[&str]) -> SessionState {
    let now = Utc::now();
    SessionState {
        session_id: session_id.to_string(),
        project_id: None,
        room_plan: RoomPlan::default(),
        agents: agent_ids.iter().map(|id| agent(id, &[])).collect(),
        placements: HashMap::new(),
        knowledge: Arc::new(NoKnowledge),
        history: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Which trait method a scripted call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    Structured,
    JsonObject,
}

/// A call the scripted service recorded: the mode plus the request.
pub struct RecordedCall {
    pub mode: CallMode,
    pub request: CompletionRequest,
}

/// Completion double that replays a fixed script of results, in order,
/// regardless of which mode each call uses. Records every call for
/// assertions on prompts and fallback behavior.
pub struct ScriptedCompletion {
    script: StdMutex<VecDeque<Result<CompletionOutcome, CompletionError>>>,
    calls: StdMutex<Vec<RecordedCall>>,
}

impl ScriptedCompletion {
    pub fn new(
        script: impl IntoIterator<Item = Result<CompletionOutcome, CompletionError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: StdMutex::new(script.into_iter().collect()),
            calls: StdMutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<CallMode> {
        self.calls.lock().unwrap().iter().map(|c| c.mode).collect()
    }

    pub fn recorded(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| {
                c.request
                    .messages
                    .iter()
                    .map(|m| m.content.clone())
                    .collect::<Vec<_>>()
                    .join("\n---\n")
            })
            .collect()
    }

    fn next(
        &self,
        mode: CallMode,
        request: CompletionRequest,
    ) -> Result<CompletionOutcome, CompletionError> {
        self.calls.lock().unwrap().push(RecordedCall { mode, request });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("scripted completion exhausted ({mode:?} call)"))
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete_structured(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionOutcome, CompletionError> {
        self.next(CallMode::Structured, request)
    }

    async fn complete_json_object(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionOutcome, CompletionError> {
        self.next(CallMode::JsonObject, request)
    }
}

/// A successful scripted result around an action payload.
pub fn say(text: &str) -> Result<CompletionOutcome, CompletionError> {
    action(json!({"say": text, "handoff_to": null, "handoff_reason": null, "confidence": 0.9}))
}

pub fn action(parsed: Value) -> Result<CompletionOutcome, CompletionError> {
    let text = parsed.to_string();
    Ok(CompletionOutcome {
        parsed,
        text,
        response_id: Some("resp_test".into()),
    })
}

pub fn api_error(status: u16, message: &str) -> Result<CompletionOutcome, CompletionError> {
    Err(CompletionError::Api {
        status,
        message: message.to_string(),
        details: json!({"error": {"message": message}}),
    })
}
