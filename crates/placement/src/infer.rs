//! Preference inference: derive implicit zone/tag preferences for an agent
//! from its persona and expertise text.
//!
//! An author who writes "Security researcher, loves the lab" should not also
//! have to spell out `preferred_zone_ids: ["lab"]`. Token overlap between the
//! agent's text and a zone's id/name/tags (or a spawn point's tags) adds the
//! zone or tag to the agent's preferences. Inferred values are unioned with
//! explicit preferences, never replacing them.

use showroom_core::{AgentSpec, RoomPlan};
use tracing::debug;

/// Minimum token length; shorter runs are noise ("a", "of", "in").
const MIN_TOKEN_LEN: usize = 3;

/// Return a copy of the agent with inferred preferences unioned in.
pub fn with_inferred_preferences(room_plan: &RoomPlan, agent: &AgentSpec) -> AgentSpec {
    let mut agent_tokens = tokenize(&agent.display_name);
    extend_tokens(&mut agent_tokens, &tokenize(&agent.persona));
    for item in agent.expertise.iter().chain(agent.knowledge_tags.iter()) {
        extend_tokens(&mut agent_tokens, &tokenize(item));
    }

    let mut out = agent.clone();

    for zone in &room_plan.zones {
        if out.preferred_zone_ids.contains(&zone.id) {
            continue;
        }
        let mut zone_tokens = tokenize(&zone.id);
        extend_tokens(&mut zone_tokens, &tokenize(&zone.name));
        for tag in &zone.tags {
            extend_tokens(&mut zone_tokens, &tokenize(tag));
        }
        if intersects(&agent_tokens, &zone_tokens) {
            debug!(agent = %agent.id, zone = %zone.id, "Inferred zone preference");
            out.preferred_zone_ids.push(zone.id.clone());
        }
    }

    for sp in &room_plan.spawn_points {
        for tag in &sp.tags {
            if out.preferred_spawn_tags.contains(tag) {
                continue;
            }
            if intersects(&agent_tokens, &tokenize(tag)) {
                debug!(agent = %agent.id, tag = %tag, "Inferred spawn tag preference");
                out.preferred_spawn_tags.push(tag.clone());
            }
        }
    }

    out
}

/// Alphanumeric runs, lowercased, length ≥ 3, deduplicated preserving
/// first-seen order.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            push_token(&mut tokens, std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        push_token(&mut tokens, current);
    }
    tokens
}

fn push_token(tokens: &mut Vec<String>, token: String) {
    if token.chars().count() >= MIN_TOKEN_LEN && !tokens.contains(&token) {
        tokens.push(token);
    }
}

fn extend_tokens(tokens: &mut Vec<String>, extra: &[String]) {
    for t in extra {
        if !tokens.contains(t) {
            tokens.push(t.clone());
        }
    }
}

fn intersects(a: &[String], b: &[String]) -> bool {
    a.iter().any(|t| b.contains(t))
}
