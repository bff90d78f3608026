//! Draft conversations: an iterative authoring chat scoped to one project.
//!
//! A draft session talks *about* a project rather than within it — the model
//! proposes revised agent rosters and room plans, which the client may then
//! persist through the project endpoints. Drafts live in their own registry
//! with the same locking and idle-reaping discipline as chat sessions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use showroom_core::history::ChatTurn;

use crate::registry::Stamped;

/// One live draft conversation.
pub struct DraftState {
    pub draft_id: String,
    pub project_id: String,
    pub history: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DraftState {
    pub fn new(draft_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            draft_id: draft_id.into(),
            project_id: project_id.into(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Stamped for DraftState {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// The assistant's reply to one draft turn: prose plus optional full-document
/// proposals. Proposals are never persisted automatically.
#[derive(Debug, Clone, Serialize)]
pub struct DraftReply {
    pub draft_id: String,
    pub say: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_plan: Option<Value>,
}

impl DraftReply {
    /// Parse the model's JSON-object output, tolerating shape drift the same
    /// way chat actions do.
    pub fn from_value(draft_id: &str, parsed: &Value, raw: &str) -> Self {
        let say = parsed
            .get("say")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| raw.trim().to_string());
        Self {
            draft_id: draft_id.to_string(),
            say,
            agents: parsed.get("agents").filter(|v| v.is_array()).cloned(),
            room_plan: parsed.get("room_plan").filter(|v| v.is_object()).cloned(),
        }
    }
}

/// Developer prompt framing a draft turn around the project's current state.
pub fn draft_prompt(project_json: &str) -> String {
    format!(
        "You are an assistant helping the user design a virtual showroom project: \
         its agent roster (NPCs) and its room plan.\n\
         Current project state as JSON:\n{project_json}\n\n\
         Discuss changes with the user. When you propose a concrete revision, \
         respond as a JSON object with:\n\
         - \"say\": a short explanation of the change,\n\
         - \"agents\": the complete revised agent list (only when you changed it),\n\
         - \"room_plan\": the complete revised room plan (only when you changed it).\n\
         Omit \"agents\" and \"room_plan\" while you are still discussing. \
         Always respond with a single JSON object."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_extracts_proposals() {
        let parsed = json!({
            "say": "Added a second host.",
            "agents": [{"id": "host"}, {"id": "host2"}],
        });
        let reply = DraftReply::from_value("d1", &parsed, "raw");
        assert_eq!(reply.say, "Added a second host.");
        assert!(reply.agents.is_some());
        assert!(reply.room_plan.is_none());
    }

    #[test]
    fn reply_falls_back_to_raw_text() {
        let reply = DraftReply::from_value("d1", &Value::Null, "I think we should talk first.");
        assert_eq!(reply.say, "I think we should talk first.");
        assert!(reply.agents.is_none());
    }

    #[test]
    fn wrong_typed_proposals_are_dropped() {
        let parsed = json!({"say": "hm", "agents": "not a list", "room_plan": []});
        let reply = DraftReply::from_value("d1", &parsed, "");
        assert!(reply.agents.is_none());
        assert!(reply.room_plan.is_none());
    }
}
