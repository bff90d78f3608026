//! Agent roster and placement value objects.

use serde::{Deserialize, Serialize};

use crate::room::Vec3;
use crate::slug::slugify;

/// One roster entry: who an agent is and where it would like to stand.
///
/// Built once at session setup from loose JSON and immutable for the session's
/// lifetime. The constructor is lenient because rosters are authored by hand:
/// list fields accept a bare string, the id falls back to a slug of the
/// display name, and unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub persona: String,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default)]
    pub knowledge_tags: Vec<String>,
    #[serde(default)]
    pub preferred_zone_ids: Vec<String>,
    #[serde(default)]
    pub preferred_spawn_tags: Vec<String>,
    /// Explicit authored position: pre-assigns the agent, bypassing scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    /// Explicit authored spawn point: pre-assigns the agent if still free.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_point_id: Option<String>,
}

impl AgentSpec {
    /// Build an AgentSpec from a loose roster entry.
    ///
    /// `idx` is the entry's position in the roster, used for fallback naming.
    pub fn from_value(value: &serde_json::Value, idx: usize) -> Self {
        let display_name = value
            .get("display_name")
            .or_else(|| value.get("name"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Agent {}", idx + 1));

        let id = value
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| slugify(&display_name));

        let persona = value
            .get("persona")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        Self {
            id,
            display_name,
            persona,
            expertise: string_or_list(value.get("expertise")),
            knowledge_tags: string_or_list(value.get("knowledge_tags")),
            preferred_zone_ids: string_or_list(value.get("preferred_zone_ids")),
            preferred_spawn_tags: string_or_list(value.get("preferred_spawn_tags")),
            position: value.get("position").map(Vec3::from_value),
            spawn_point_id: value
                .get("spawn_point_id")
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
        }
    }

    /// One-line profile used in the other-agent directory of prompts.
    pub fn short_profile(&self) -> String {
        let exp = if self.expertise.is_empty() {
            "—".to_string()
        } else {
            self.expertise.join(", ")
        };
        format!("{} ({}): Expertise: {}", self.id, self.display_name, exp)
    }

    /// Specificity = how constrained the agent's placement wishes are.
    /// More specific agents choose their spawn point first.
    pub fn specificity(&self) -> usize {
        self.preferred_zone_ids.len() + self.preferred_spawn_tags.len()
    }
}

/// Coerce a roster field that may be a string, a list of strings, or absent.
fn string_or_list(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                other if !other.is_null() => Some(other.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Where an agent ended up: computed once at setup, never recomputed during
/// chat (agents do not move).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub position: Vec3,
    pub forward: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_point_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Placement {
    /// A free-standing placement (no spawn point), floor-clamped.
    pub fn free(position: Vec3) -> Self {
        Self {
            position: Vec3::new(position.x, 0.0, position.z),
            forward: Vec3::forward(),
            spawn_point_id: None,
            zone_id: None,
            tags: Vec::new(),
        }
    }

    /// A placement bound to a spawn point, floor-clamped.
    pub fn at_spawn_point(sp: &crate::room::SpawnPoint) -> Self {
        Self {
            position: Vec3::new(sp.position.x, 0.0, sp.position.z),
            forward: sp.forward,
            spawn_point_id: Some(sp.id.clone()),
            zone_id: sp.zone_id.clone(),
            tags: sp.tags.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roster_entry_with_all_fields() {
        let spec = AgentSpec::from_value(
            &json!({
                "id": "ada",
                "display_name": "Ada",
                "persona": "  Mathematician.  ",
                "expertise": ["math", "computing"],
                "knowledge_tags": "science",
                "preferred_zone_ids": ["lab"],
            }),
            0,
        );
        assert_eq!(spec.id, "ada");
        assert_eq!(spec.persona, "Mathematician.");
        assert_eq!(spec.expertise, vec!["math", "computing"]);
        assert_eq!(spec.knowledge_tags, vec!["science"]);
        assert_eq!(spec.specificity(), 1);
    }

    #[test]
    fn id_falls_back_to_slugified_name() {
        let spec = AgentSpec::from_value(&json!({"display_name": "Dr. Grace Hopper"}), 0);
        assert_eq!(spec.id, "dr_grace_hopper");
    }

    #[test]
    fn anonymous_entry_gets_indexed_name() {
        let spec = AgentSpec::from_value(&json!({}), 2);
        assert_eq!(spec.display_name, "Agent 3");
        assert!(!spec.id.is_empty());
    }

    #[test]
    fn name_field_is_a_synonym() {
        let spec = AgentSpec::from_value(&json!({"name": "Bot"}), 0);
        assert_eq!(spec.display_name, "Bot");
    }

    #[test]
    fn explicit_position_parses_leniently() {
        let spec = AgentSpec::from_value(&json!({"id": "x", "position": {"x": 1, "z": "2"}}), 0);
        assert_eq!(spec.position, Some(Vec3::new(1.0, 0.0, 2.0)));
    }

    #[test]
    fn short_profile_shows_dash_without_expertise() {
        let spec = AgentSpec::from_value(&json!({"id": "a", "display_name": "A"}), 0);
        assert!(spec.short_profile().contains("—"));
    }

    #[test]
    fn free_placement_is_floor_clamped() {
        let p = Placement::free(Vec3::new(1.0, 5.0, 2.0));
        assert_eq!(p.position.y, 0.0);
        assert_eq!(p.forward, Vec3::forward());
    }
}
