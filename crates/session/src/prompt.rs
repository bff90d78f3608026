use std::fmt::Write as _;

use showroom_core::agent::AgentSpec;
use showroom_core::knowledge::KnowledgeSnippet;

/// Confidence threshold below which an agent is told to consider handing off.
pub const HANDOFF_CONFIDENCE_HINT: f64 = 0.55;

/// Builds the developer message that frames one agent for one turn.
///
/// The frame covers the agent's persona, its colleagues (when a handoff is
/// permitted), any retrieved knowledge excerpts, and the structured-output
/// contract.
pub fn developer_prompt(
    agent: &AgentSpec,
    others: &[&AgentSpec],
    snippets: &[KnowledgeSnippet],
    allow_handoff: bool,
) -> String {
    let mut out = String::new();
    out.push_str("You are a virtual conversation partner (NPC) in a game engine scene.\n");
    let _ = writeln!(out, "Name: {} (id: {})", agent.display_name, agent.id);
    if !agent.persona.trim().is_empty() {
        let _ = writeln!(out, "Persona:\n{}", agent.persona.trim());
    }
    if !agent.expertise.is_empty() {
        let _ = writeln!(out, "Expertise (focus areas): {}", agent.expertise.join(", "));
    }
    out.push('\n');
    out.push_str("Communication style:\n");
    out.push_str("- Keep replies short, natural and helpful, like staff at a trade-fair booth.\n");
    out.push_str(
        "- If information is missing, ask one short follow-up question instead of guessing, \
         as long as the topic is in your area.\n",
    );
    out.push('\n');
    if allow_handoff && !others.is_empty() {
        out.push_str("Handoff rule:\n");
        let _ = writeln!(
            out,
            "- If the user's question is clearly outside your expertise, or you are unsure \
             (confidence below {HANDOFF_CONFIDENCE_HINT}), hand the conversation to the best \
             matching colleague.",
        );
        out.push_str(
            "- To do so, set 'handoff_to' to that colleague's id and keep 'say' to a short \
             forwarding phrase, not a full answer.\n",
        );
        out.push('\n');
        out.push_str("Available colleagues:\n");
        for other in others {
            let _ = writeln!(out, "- {}", other.short_profile());
        }
    } else {
        out.push_str(
            "Handoff: disabled. Answer yourself as best you can, or ask for clarification.\n",
        );
    }
    out.push('\n');
    if !snippets.is_empty() {
        out.push_str("Local knowledge excerpts (use only if relevant; never invent facts):\n");
        for snippet in snippets {
            let _ = writeln!(out, "- {} {}", snippet.citation(), snippet.text.trim());
        }
        out.push('\n');
    }
    out.push_str(
        "IMPORTANT: Respond as JSON matching the response schema exactly (structured output).",
    );
    out
}

/// Extra developer notice shown to the target of a handoff.
pub fn forwarded_notice(from: &AgentSpec, reason: Option<&str>) -> String {
    let mut out = format!(
        "The conversation was just forwarded to you by your colleague {} (id: {}).",
        from.display_name, from.id
    );
    if let Some(reason) = reason
        && !reason.trim().is_empty()
    {
        let _ = write!(out, " Reason given: {}", reason.trim());
    }
    out.push_str(" Greet the user briefly and answer their last question directly.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::agent;

    #[test]
    fn prompt_lists_colleagues_when_handoff_is_allowed() {
        let host = agent("host", &["tickets"]);
        let expert = agent("expert", &["lasers", "optics"]);
        let text = developer_prompt(&host, &[&expert], &[], true);
        assert!(text.contains("Handoff rule:"));
        assert!(text.contains("expert"));
        assert!(text.contains("lasers"));
        assert!(!text.contains("Handoff: disabled"));
    }

    #[test]
    fn prompt_disables_handoff_without_colleagues() {
        let host = agent("host", &["tickets"]);
        let text = developer_prompt(&host, &[], &[], true);
        assert!(text.contains("Handoff: disabled"));
    }

    #[test]
    fn prompt_cites_knowledge_snippets() {
        let host = agent("host", &["tickets"]);
        let snippet = KnowledgeSnippet {
            tag: "faq".into(),
            file: "opening.txt".into(),
            chunk_index: 2,
            score: 1.5,
            text: "Doors open at 9am.".into(),
        };
        let text = developer_prompt(&host, &[], &[snippet], false);
        assert!(text.contains("[faq/opening.txt#2] Doors open at 9am."));
    }

    #[test]
    fn forwarded_notice_includes_reason() {
        let host = agent("host", &[]);
        let text = forwarded_notice(&host, Some("laser question"));
        assert!(text.contains("forwarded to you"));
        assert!(text.contains("laser question"));
    }
}
