//! The application-facing session facade.
//!
//! [`SessionService`] resolves setup documents (inline, file-path, or stored
//! project), places the roster, and owns the session and draft registries.
//! The HTTP gateway is a thin shell over this type.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use showroom_config::AppConfig;
use showroom_core::agent::{AgentSpec, Placement};
use showroom_core::completion::{Completion, CompletionRequest, PromptMessage};
use showroom_core::error::{Error, SessionError};
use showroom_core::history::{ChatTurn, Role};
use showroom_core::knowledge::KnowledgeSource;
use showroom_core::room::RoomPlan;
use showroom_knowledge::KnowledgeBase;
use showroom_placement::{assign_spawn_points, with_inferred_preferences};
use showroom_projects::ProjectStore;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::draft::{DraftReply, DraftState, draft_prompt};
use crate::history::trim_history;
use crate::orchestrator::{Orchestrator, OrchestratorSettings, TurnInput, TurnOutcome};
use crate::registry::{Registry, SessionState};

/// A session setup request. All document fields are optional; resolution
/// order is inline document, then file path, then stored project, then the
/// configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetupRequest {
    /// Client-chosen session id; a fresh UUID is assigned when absent.
    /// Reusing an id replaces that session.
    pub session_id: Option<String>,
    /// Load documents and knowledge from this stored project.
    pub project_id: Option<String>,
    pub room_plan: Option<Value>,
    pub room_plan_path: Option<String>,
    pub agents: Option<Vec<Value>>,
    /// Accepted alias for `agents`.
    pub agent_specs: Option<Vec<Value>>,
    pub agents_path: Option<String>,
}

/// One placed agent in a setup response.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSetupInfo {
    pub id: String,
    pub display_name: String,
    pub expertise: Vec<String>,
    #[serde(flatten)]
    pub placement: Placement,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupResponse {
    pub session_id: String,
    pub agents: Vec<AgentSetupInfo>,
}

/// One chat turn request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub active_agent_id: Option<String>,
    #[serde(default)]
    pub user_text: String,
}

/// Owns the registries, the project store, and the knowledge caches, and
/// drives turns through the orchestrator.
pub struct SessionService {
    config: AppConfig,
    data_root: PathBuf,
    sessions: Registry<SessionState>,
    drafts: Registry<DraftState>,
    orchestrator: Orchestrator,
    completion: Arc<dyn Completion>,
    projects: ProjectStore,
    default_knowledge: Arc<KnowledgeBase>,
    project_knowledge: RwLock<HashMap<String, Arc<KnowledgeBase>>>,
}

impl SessionService {
    /// Builds the service. `data_root` anchors every relative document path a
    /// setup request may name; nothing outside it is ever read.
    pub fn new(
        config: AppConfig,
        completion: Arc<dyn Completion>,
        data_root: PathBuf,
    ) -> Result<Self, Error> {
        let projects = ProjectStore::open(
            data_root.join(&config.projects.root),
            Some(data_root.join(&config.projects.default_room_plan_path)),
            Some(data_root.join(&config.projects.default_agents_path)),
        )?;
        let default_knowledge = Arc::new(KnowledgeBase::load(
            data_root.join(&config.knowledge.root),
            config.knowledge.chunk_chars,
        ));
        info!(knowledge = %default_knowledge.summary(), "session service ready");

        let settings = OrchestratorSettings {
            model: config.completion.model.clone(),
            temperature: config.completion.temperature,
            max_history_turns: config.session.max_history_turns,
            max_handoffs: config.session.max_handoffs,
            max_snippets: config.knowledge.max_snippets,
        };
        Ok(Self {
            orchestrator: Orchestrator::new(Arc::clone(&completion), settings),
            completion,
            config,
            data_root,
            sessions: Registry::new(),
            drafts: Registry::new(),
            projects,
            default_knowledge,
            project_knowledge: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn projects(&self) -> &ProjectStore {
        &self.projects
    }

    pub fn knowledge_summary(&self) -> String {
        self.default_knowledge.summary()
    }

    /// Creates (or replaces) a session from a setup request and places its
    /// roster in the room.
    pub async fn setup(&self, request: SetupRequest) -> Result<SetupResponse, Error> {
        let (room_plan_value, agent_values, knowledge) = self.resolve_documents(&request).await?;

        let room_plan: RoomPlan = serde_json::from_value(room_plan_value)
            .map_err(|e| SessionError::InvalidSetup(format!("room plan: {e}")))?;
        if agent_values.is_empty() {
            return Err(SessionError::InvalidSetup("no agents provided".into()).into());
        }
        let agents: Vec<AgentSpec> = agent_values
            .iter()
            .enumerate()
            .map(|(idx, value)| {
                let spec = AgentSpec::from_value(value, idx);
                with_inferred_preferences(&room_plan, &spec)
            })
            .collect();
        let placements = assign_spawn_points(&room_plan, &agents);

        let session_id = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let placed: Vec<AgentSetupInfo> = agents
            .iter()
            .filter_map(|agent| {
                placements.get(&agent.id).map(|placement| AgentSetupInfo {
                    id: agent.id.clone(),
                    display_name: agent.display_name.clone(),
                    expertise: agent.expertise.clone(),
                    placement: placement.clone(),
                })
            })
            .collect();

        let now = Utc::now();
        let state = SessionState {
            session_id: session_id.clone(),
            project_id: request.project_id.clone(),
            room_plan,
            agents,
            placements,
            knowledge,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.sessions.insert(session_id.clone(), state).await;
        info!(session_id = %session_id, agents = placed.len(), "session created");

        Ok(SetupResponse {
            session_id,
            agents: placed,
        })
    }

    /// Runs one chat turn. Turns against the same session are serialized by
    /// the session's own lock; distinct sessions proceed concurrently.
    pub async fn chat(&self, request: ChatRequest) -> Result<TurnOutcome, Error> {
        let session_id = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SessionError::MissingSessionId)?;
        let entry = self
            .sessions
            .get(session_id)
            .await
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;

        let mut session = entry.lock().await;
        let outcome = self
            .orchestrator
            .run_turn(
                &mut session,
                TurnInput {
                    active_agent_id: request.active_agent_id,
                    user_text: request.user_text,
                },
            )
            .await?;
        Ok(outcome)
    }

    /// Opens a draft conversation scoped to a stored project.
    pub async fn draft_setup(&self, project_id: &str) -> Result<String, Error> {
        // Fails early when the project does not exist.
        self.projects.get_project_details(project_id)?;
        let draft_id = Uuid::new_v4().to_string();
        self.drafts
            .insert(draft_id.clone(), DraftState::new(&draft_id, project_id))
            .await;
        debug!(draft_id = %draft_id, project_id = %project_id, "draft opened");
        Ok(draft_id)
    }

    /// Runs one draft authoring turn in relaxed JSON mode.
    pub async fn draft_chat(&self, draft_id: &str, user_text: &str) -> Result<DraftReply, Error> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(SessionError::EmptyUserText.into());
        }
        let entry = self
            .drafts
            .get(draft_id)
            .await
            .ok_or_else(|| SessionError::UnknownSession(draft_id.to_string()))?;
        let mut draft = entry.lock().await;

        let details = self.projects.get_project_details(&draft.project_id)?;
        let project_json = serde_json::to_string_pretty(&details)?;

        let mut messages = vec![PromptMessage::developer(draft_prompt(&project_json))];
        for turn in &draft.history {
            messages.push(match turn.role {
                Role::User => PromptMessage::user(&turn.content),
                Role::Assistant => PromptMessage::assistant(&turn.content),
            });
        }
        messages.push(PromptMessage::user(user_text));

        let outcome = self
            .completion
            .complete_json_object(CompletionRequest {
                model: self.config.completion.model.clone(),
                messages,
                temperature: self.config.completion.temperature,
                schema: None,
                schema_name: "draft_reply".to_string(),
            })
            .await
            .map_err(Error::from)?;

        let reply = DraftReply::from_value(draft_id, &outcome.parsed, &outcome.text);
        draft.history.push(ChatTurn::user(user_text));
        draft.history.push(ChatTurn::assistant(&reply.say));
        trim_history(&mut draft.history, self.config.session.max_history_turns);
        draft.touch();
        Ok(reply)
    }

    /// Reaps idle sessions and drafts. Returns how many entries were removed.
    /// A zero idle timeout disables reaping.
    pub async fn reap_idle(&self) -> usize {
        let secs = self.config.session.idle_timeout_secs;
        if secs == 0 {
            return 0;
        }
        let max_idle = Duration::seconds(secs as i64);
        self.sessions.reap_idle(max_idle).await + self.drafts.reap_idle(max_idle).await
    }

    /// Resolves the room plan, roster, and knowledge source for a setup
    /// request.
    async fn resolve_documents(
        &self,
        request: &SetupRequest,
    ) -> Result<(Value, Vec<Value>, Arc<dyn KnowledgeSource>), Error> {
        if let Some(project_id) = request
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let room_plan = self.projects.load_room_plan(project_id)?;
            let agents = self.projects.load_agents(project_id)?;
            let knowledge = self.project_knowledge_for(project_id).await?;
            return Ok((room_plan, agents, knowledge));
        }

        let room_plan = if let Some(inline) = &request.room_plan {
            inline.clone()
        } else if let Some(path) = &request.room_plan_path {
            self.load_json_document(path)?
        } else {
            self.load_default_document(&self.config.projects.default_room_plan_path)
                .unwrap_or_else(|| Value::Object(Default::default()))
        };

        let agents = if let Some(inline) = request.agents.as_ref().or(request.agent_specs.as_ref())
        {
            inline.clone()
        } else if let Some(path) = &request.agents_path {
            match self.load_json_document(path)? {
                Value::Array(items) => items,
                other => {
                    return Err(SessionError::InvalidSetup(format!(
                        "agents document must be a list, got {other}"
                    ))
                    .into());
                }
            }
        } else {
            match self.load_default_document(&self.config.projects.default_agents_path) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        };

        let knowledge: Arc<dyn KnowledgeSource> = self.default_knowledge.clone();
        Ok((room_plan, agents, knowledge))
    }

    /// Per-project knowledge bases are loaded once and shared across sessions.
    async fn project_knowledge_for(
        &self,
        project_id: &str,
    ) -> Result<Arc<dyn KnowledgeSource>, Error> {
        if let Some(kb) = self.project_knowledge.read().await.get(project_id) {
            let shared: Arc<dyn KnowledgeSource> = kb.clone();
            return Ok(shared);
        }
        let kb_root = self.projects.project_kb_root(project_id)?;
        let kb = Arc::new(KnowledgeBase::load(kb_root, self.config.knowledge.chunk_chars));
        let mut cache = self.project_knowledge.write().await;
        let entry = cache
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::clone(&kb));
        let shared: Arc<dyn KnowledgeSource> = entry.clone();
        Ok(shared)
    }

    /// Reads a client-named JSON document, confined to the data root.
    fn load_json_document(&self, rel: &str) -> Result<Value, Error> {
        let joined = self.data_root.join(rel);
        let canonical = joined
            .canonicalize()
            .map_err(|_| SessionError::InvalidSetup(format!("cannot read document: {rel}")))?;
        let root = self
            .data_root
            .canonicalize()
            .unwrap_or_else(|_| self.data_root.clone());
        if !canonical.starts_with(&root) {
            return Err(SessionError::PathOutsideRoot(rel.to_string()).into());
        }
        Self::read_json(&canonical)
            .map_err(|e| SessionError::InvalidSetup(format!("{rel}: {e}")).into())
    }

    /// Reads a configured default document; absence is not an error.
    fn load_default_document(&self, rel: &str) -> Option<Value> {
        let path = self.data_root.join(rel);
        Self::read_json(&path).ok()
    }

    fn read_json(path: &Path) -> Result<Value, String> {
        let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::test_support::{ScriptedCompletion, action, say};

    fn config_for(root: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.completion.api_key = Some("sk-test".into());
        // Keep everything inside the test data root.
        let _ = root;
        config
    }

    fn service_with(
        script: Vec<Result<showroom_core::completion::CompletionOutcome, showroom_core::error::CompletionError>>,
    ) -> (SessionService, Arc<ScriptedCompletion>, TempDir) {
        let dir = TempDir::new().unwrap();
        let completion = ScriptedCompletion::new(script);
        let service = SessionService::new(
            config_for(dir.path()),
            completion.clone(),
            dir.path().to_path_buf(),
        )
        .unwrap();
        (service, completion, dir)
    }

    fn inline_setup() -> SetupRequest {
        SetupRequest {
            agents: Some(vec![
                json!({"id": "host", "display_name": "Host"}),
                json!({"id": "expert", "display_name": "Expert", "expertise": ["lasers"]}),
            ]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn setup_and_chat_round_trip() {
        let (service, _, _dir) = service_with(vec![say("Hello from the booth!")]);

        let setup = service.setup(inline_setup()).await.unwrap();
        assert_eq!(setup.agents.len(), 2);
        assert!(!setup.session_id.is_empty());

        let outcome = service
            .chat(ChatRequest {
                session_id: Some(setup.session_id.clone()),
                active_agent_id: None,
                user_text: "hi".into(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.session_id, setup.session_id);
        assert_eq!(outcome.events.len(), 1);
    }

    #[tokio::test]
    async fn setup_without_agents_is_invalid() {
        let (service, _, _dir) = service_with(vec![]);
        let err = service.setup(SetupRequest::default()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::InvalidSetup(_))
        ));
    }

    #[tokio::test]
    async fn setup_accepts_agent_specs_alias() {
        let (service, _, _dir) = service_with(vec![]);
        let setup = service
            .setup(SetupRequest {
                agent_specs: Some(vec![json!({"display_name": "Solo Host"})]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(setup.agents.len(), 1);
        assert_eq!(setup.agents[0].id, "solo_host");
    }

    #[tokio::test]
    async fn chat_requires_a_known_session() {
        let (service, _, _dir) = service_with(vec![]);
        let err = service
            .chat(ChatRequest {
                session_id: None,
                active_agent_id: None,
                user_text: "hi".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::MissingSessionId)
        ));

        let err = service
            .chat(ChatRequest {
                session_id: Some("nope".into()),
                active_agent_id: None,
                user_text: "hi".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::UnknownSession(_))
        ));
    }

    #[tokio::test]
    async fn document_paths_are_confined_to_the_data_root() {
        let base = TempDir::new().unwrap();
        let data_root = base.path().join("data");
        std::fs::create_dir(&data_root).unwrap();
        std::fs::write(base.path().join("secret.json"), "{}").unwrap();

        let completion = ScriptedCompletion::new(vec![]);
        let service =
            SessionService::new(config_for(&data_root), completion, data_root.clone()).unwrap();

        let err = service
            .setup(SetupRequest {
                room_plan_path: Some("../secret.json".into()),
                agents: Some(vec![json!({"id": "host"})]),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::PathOutsideRoot(_))
        ));
    }

    #[tokio::test]
    async fn setup_from_document_paths() {
        let (service, _, dir) = service_with(vec![]);
        std::fs::write(
            dir.path().join("plan.json"),
            json!({"spawn_points": [
                {"id": "sp1", "position": {"x": 1.0, "y": 0.0, "z": 2.0}},
                {"id": "sp2", "position": {"x": 3.0, "y": 0.0, "z": 2.0}},
            ]})
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("roster.json"),
            json!([{"id": "host"}, {"id": "expert"}]).to_string(),
        )
        .unwrap();

        let setup = service
            .setup(SetupRequest {
                room_plan_path: Some("plan.json".into()),
                agents_path: Some("roster.json".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(setup.agents.len(), 2);
        assert!(setup.agents.iter().all(|a| a.placement.spawn_point_id.is_some()));
    }

    #[tokio::test]
    async fn project_setup_uses_stored_documents() {
        let (service, _, _dir) = service_with(vec![say("From the project roster.")]);
        service
            .projects()
            .create_project("Demo Fair", None, "test project")
            .unwrap();
        service
            .projects()
            .save_agents("demo_fair", &[json!({"id": "guide", "display_name": "Guide"})])
            .unwrap();

        let setup = service
            .setup(SetupRequest {
                project_id: Some("demo_fair".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(setup.agents.len(), 1);
        assert_eq!(setup.agents[0].id, "guide");

        let outcome = service
            .chat(ChatRequest {
                session_id: Some(setup.session_id),
                active_agent_id: None,
                user_text: "hello".into(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.active_agent_id, "guide");
    }

    #[tokio::test]
    async fn repeated_project_setup_shares_one_knowledge_base() {
        let (service, _, _dir) = service_with(vec![]);
        service
            .projects()
            .create_project("Demo Fair", None, "")
            .unwrap();
        service
            .projects()
            .save_agents("demo_fair", &[json!({"id": "guide"})])
            .unwrap();

        let request = SetupRequest {
            project_id: Some("demo_fair".into()),
            ..Default::default()
        };
        let first = service.setup(request.clone()).await.unwrap();
        let second = service.setup(request).await.unwrap();
        assert_ne!(first.session_id, second.session_id);

        let first_kb = {
            let entry = service.sessions.get(&first.session_id).await.unwrap();
            let state = entry.lock().await;
            Arc::as_ptr(&state.knowledge) as *const u8
        };
        let second_kb = {
            let entry = service.sessions.get(&second.session_id).await.unwrap();
            let state = entry.lock().await;
            Arc::as_ptr(&state.knowledge) as *const u8
        };
        assert_eq!(first_kb, second_kb);
    }

    #[tokio::test]
    async fn draft_flow_proposes_documents() {
        let (service, _, _dir) = service_with(vec![action(json!({
            "say": "Added a greeter.",
            "agents": [{"id": "greeter"}],
        }))]);
        service
            .projects()
            .create_project("Booth", None, "")
            .unwrap();

        let draft_id = service.draft_setup("booth").await.unwrap();
        let reply = service.draft_chat(&draft_id, "add a greeter").await.unwrap();
        assert_eq!(reply.say, "Added a greeter.");
        assert!(reply.agents.is_some());
    }

    #[tokio::test]
    async fn draft_setup_requires_an_existing_project() {
        let (service, _, _dir) = service_with(vec![]);
        assert!(service.draft_setup("missing").await.is_err());
    }

    #[tokio::test]
    async fn reaping_is_disabled_at_zero_timeout() {
        let dir = TempDir::new().unwrap();
        let mut config = config_for(dir.path());
        config.session.idle_timeout_secs = 0;
        let service = SessionService::new(
            config,
            ScriptedCompletion::new(vec![]),
            dir.path().to_path_buf(),
        )
        .unwrap();
        service.setup(inline_setup()).await.unwrap();
        assert_eq!(service.reap_idle().await, 0);
    }
}
