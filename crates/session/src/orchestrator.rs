//! The per-turn conversation state machine.
//!
//! One user turn produces one or two say events: the active agent answers,
//! and may hand the conversation to exactly one colleague, who then answers
//! in the same turn. Handoff chains never continue past that single hop.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use showroom_core::action::{NpcAction, npc_action_schema};
use showroom_core::agent::AgentSpec;
use showroom_core::completion::{Completion, CompletionRequest, PromptMessage};
use showroom_core::error::{CompletionError, SessionError};
use showroom_core::history::{ChatTurn, Role};
use tracing::{debug, warn};

use crate::history::trim_history;
use crate::prompt::{developer_prompt, forwarded_notice};
use crate::registry::SessionState;

/// Placeholder spoken when the model returns neither a say field nor any text.
const EMPTY_SAY_FALLBACK: &str = "…";

/// Tunables for one orchestrator instance, taken from the app config.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    pub temperature: f64,
    pub max_history_turns: usize,
    /// Handoff budget per user turn. Anything above zero permits the single
    /// allowed hop; zero disables handoffs entirely.
    pub max_handoffs: usize,
    pub max_snippets: usize,
}

/// One incoming user turn.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub active_agent_id: Option<String>,
    pub user_text: String,
}

/// One visible event produced by a turn.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Say {
        agent_id: String,
        text: String,
        confidence: f64,
    },
}

/// Record of the single handoff executed within a turn.
#[derive(Debug, Clone, Serialize)]
pub struct HandoffRecord {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Completion-service failure surfaced to the client inside the turn result.
#[derive(Debug, Clone, Serialize)]
pub struct TurnFault {
    pub status: u16,
    pub details: Value,
}

impl From<&CompletionError> for TurnFault {
    fn from(err: &CompletionError) -> Self {
        let details = match err {
            CompletionError::Api { details, .. } if !details.is_null() => details.clone(),
            other => Value::String(other.to_string()),
        };
        Self {
            status: err.status(),
            details,
        }
    }
}

/// The result of one user turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub session_id: String,
    pub active_agent_id: String,
    pub events: Vec<TurnEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TurnFault>,
}

/// Drives user turns against the completion service.
pub struct Orchestrator {
    completion: Arc<dyn Completion>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(completion: Arc<dyn Completion>, settings: OrchestratorSettings) -> Self {
        Self {
            completion,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Runs one user turn to completion and commits it to the transcript.
    ///
    /// The transcript is only committed when the primary agent answered: a
    /// completion failure on the primary call leaves the session unchanged so
    /// the client can simply retry. A failure during the handoff leg becomes
    /// an inline error message from the target agent — by then the user has
    /// already seen the forwarding phrase, so the turn stands.
    pub async fn run_turn(
        &self,
        session: &mut SessionState,
        input: TurnInput,
    ) -> Result<TurnOutcome, SessionError> {
        let user_text = input.user_text.trim();
        if user_text.is_empty() {
            return Err(SessionError::EmptyUserText);
        }
        let agent = session
            .resolve_agent(input.active_agent_id.as_deref())
            .cloned()
            .ok_or_else(|| SessionError::InvalidSetup("session has no agents".into()))?;

        let mut staged = session.history.clone();
        staged.push(ChatTurn::user(user_text));

        let allow_handoff = self.settings.max_handoffs > 0 && session.agents.len() > 1;
        let primary = match self
            .call_agent(session, &agent, &staged, allow_handoff, None)
            .await
        {
            Ok(action) => action,
            Err(err) => {
                warn!(agent = %agent.id, error = %err, "primary completion failed");
                return Ok(TurnOutcome {
                    session_id: session.session_id.clone(),
                    active_agent_id: agent.id.clone(),
                    events: vec![TurnEvent::Say {
                        agent_id: agent.id.clone(),
                        text: format!("[Backend] completion error: {err}"),
                        confidence: 0.0,
                    }],
                    handoff: None,
                    error: Some(TurnFault::from(&err)),
                });
            }
        };

        let mut events = vec![TurnEvent::Say {
            agent_id: agent.id.clone(),
            text: primary.say.clone(),
            confidence: primary.confidence,
        }];
        let mut committed = vec![ChatTurn::user(user_text)];
        committed.push(ChatTurn::assistant(&primary.say));
        let mut active_agent_id = agent.id.clone();
        let mut handoff = None;

        let target = primary
            .handoff_to
            .as_deref()
            .filter(|id| *id != agent.id)
            .and_then(|id| session.agent(id))
            .cloned();
        if let Some(target) = target
            && self.settings.max_handoffs > 0
        {
            debug!(from = %agent.id, to = %target.id, "executing handoff");
            staged.push(ChatTurn::assistant(&primary.say));
            let forwarded = (agent.clone(), primary.handoff_reason.clone());
            let say = match self
                .call_agent(session, &target, &staged, false, Some(&forwarded))
                .await
            {
                Ok(action) => TurnEvent::Say {
                    agent_id: target.id.clone(),
                    text: action.say.clone(),
                    confidence: action.confidence,
                },
                Err(err) => {
                    warn!(agent = %target.id, error = %err, "handoff completion failed");
                    TurnEvent::Say {
                        agent_id: target.id.clone(),
                        text: format!("[Backend] completion error during handoff: {err}"),
                        confidence: 0.0,
                    }
                }
            };
            let TurnEvent::Say { text, .. } = &say;
            committed.push(ChatTurn::assistant(text));
            events.push(say);
            handoff = Some(HandoffRecord {
                from: agent.id.clone(),
                to: target.id.clone(),
                reason: primary.handoff_reason.clone(),
            });
            active_agent_id = target.id.clone();
        }

        session.history.extend(committed);
        trim_history(&mut session.history, self.settings.max_history_turns);
        session.touch();

        Ok(TurnOutcome {
            session_id: session.session_id.clone(),
            active_agent_id,
            events,
            handoff,
            error: None,
        })
    }

    /// Invokes one agent against the staged transcript.
    ///
    /// Tries strict structured output first; when the service rejects the
    /// request itself (HTTP 400, typically a model without schema support),
    /// retries once in relaxed JSON-object mode. An empty `say` falls back to
    /// the raw output text, then to a placeholder — a turn never goes silent.
    async fn call_agent(
        &self,
        session: &SessionState,
        agent: &AgentSpec,
        staged: &[ChatTurn],
        allow_handoff: bool,
        forwarded_from: Option<&(AgentSpec, Option<String>)>,
    ) -> Result<NpcAction, CompletionError> {
        let others: Vec<&AgentSpec> = session
            .agents
            .iter()
            .filter(|a| a.id != agent.id)
            .collect();

        let last_user = staged
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
            .unwrap_or_default();
        let snippets =
            session
                .knowledge
                .search(last_user, &agent.knowledge_tags, self.settings.max_snippets);

        let mut messages = vec![PromptMessage::developer(developer_prompt(
            agent,
            &others,
            &snippets,
            allow_handoff,
        ))];
        if let Some((from, reason)) = forwarded_from {
            messages.push(PromptMessage::developer(forwarded_notice(
                from,
                reason.as_deref(),
            )));
        }
        let mut window = staged.to_vec();
        trim_history(&mut window, self.settings.max_history_turns);
        for turn in &window {
            messages.push(match turn.role {
                Role::User => PromptMessage::user(&turn.content),
                Role::Assistant => PromptMessage::assistant(&turn.content),
            });
        }

        let allowed_ids: Vec<String> = if allow_handoff {
            others.iter().map(|a| a.id.clone()).collect()
        } else {
            Vec::new()
        };
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            schema: Some(npc_action_schema(&allowed_ids)),
            schema_name: "npc_action".to_string(),
        };

        let outcome = match self.completion.complete_structured(request.clone()).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_bad_request() => {
                debug!(agent = %agent.id, "structured output rejected, retrying in JSON mode");
                let relaxed = CompletionRequest {
                    schema: None,
                    ..request
                };
                self.completion.complete_json_object(relaxed).await?
            }
            Err(err) => return Err(err),
        };

        let mut action = NpcAction::from_value(&outcome.parsed);
        if action.say.is_empty() {
            let raw = outcome.text.trim();
            action.say = if raw.is_empty() {
                EMPTY_SAY_FALLBACK.to_string()
            } else {
                raw.to_string()
            };
        }
        if !allow_handoff {
            action.handoff_to = None;
        }
        Ok(action)
    }
}
