//! The structured NPC action: what an agent says plus its handoff decision.

use serde::{Deserialize, Serialize};

/// The structured result of one agent invocation.
///
/// Deserialized leniently from the completion service's output: a missing or
/// wrong-typed field falls back to its default rather than failing the turn,
/// since the relaxed JSON-object mode does not schema-validate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcAction {
    /// What the agent says out loud. Never left empty by the orchestrator.
    #[serde(default)]
    pub say: String,

    /// Id of the agent to hand the conversation to, if any.
    #[serde(default)]
    pub handoff_to: Option<String>,

    /// Why the handoff was requested.
    #[serde(default)]
    pub handoff_reason: Option<String>,

    /// Self-assessed confidence in the answer, 0..1.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

impl NpcAction {
    /// Parse a completion result, tolerating shape drift.
    ///
    /// Falls back field by field so a partially valid object still yields an
    /// action (the relaxed fallback mode returns valid JSON of any shape).
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self {
            say: value
                .get("say")
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            handoff_to: value
                .get("handoff_to")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            handoff_reason: value
                .get("handoff_reason")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            confidence: value
                .get("confidence")
                .and_then(|v| v.as_f64())
                .unwrap_or_else(default_confidence),
        }
    }
}

/// Build the strict response schema for an NPC action.
///
/// `allowed_handoff_ids` become the enum of legal handoff targets; the list is
/// deduplicated preserving first-seen order and empty ids are dropped.
/// Structured Outputs requires `additionalProperties: false` and every field
/// listed in `required`.
pub fn npc_action_schema(allowed_handoff_ids: &[String]) -> serde_json::Value {
    let mut seen = std::collections::HashSet::new();
    let ids: Vec<&String> = allowed_handoff_ids
        .iter()
        .filter(|id| !id.is_empty() && seen.insert(id.as_str()))
        .collect();

    serde_json::json!({
        "type": "object",
        "properties": {
            "say": {"type": "string"},
            "handoff_to": {
                "oneOf": [
                    {"type": "string", "enum": ids},
                    {"type": "null"},
                ]
            },
            "handoff_reason": {
                "oneOf": [
                    {"type": "string"},
                    {"type": "null"},
                ]
            },
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
        },
        "required": ["say", "handoff_to", "handoff_reason", "confidence"],
        "additionalProperties": false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_action() {
        let action = NpcAction::from_value(&json!({
            "say": "  Over to Ada.  ",
            "handoff_to": "ada",
            "handoff_reason": "math question",
            "confidence": 0.3,
        }));
        assert_eq!(action.say, "Over to Ada.");
        assert_eq!(action.handoff_to.as_deref(), Some("ada"));
        assert!((action.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn tolerates_missing_and_null_fields() {
        let action = NpcAction::from_value(&json!({"say": "hi", "handoff_to": null}));
        assert_eq!(action.say, "hi");
        assert!(action.handoff_to.is_none());
        assert!((action.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn tolerates_garbage() {
        let action = NpcAction::from_value(&json!({"say": 42, "confidence": "high"}));
        assert!(action.say.is_empty());
        assert!((action.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn schema_deduplicates_enum_ids() {
        let schema = npc_action_schema(&[
            "ada".to_string(),
            "".to_string(),
            "bob".to_string(),
            "ada".to_string(),
        ]);
        let ids = schema["properties"]["handoff_to"]["oneOf"][0]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], "ada");
        assert_eq!(ids[1], "bob");
    }

    #[test]
    fn schema_is_strict() {
        let schema = npc_action_schema(&[]);
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(schema["required"].as_array().unwrap().len(), 4);
    }
}
