use showroom_core::history::{ChatTurn, Role};

/// Trims a transcript so that at most `max_user_turns` user turns remain.
///
/// Trimming drops whole exchanges from the front: everything before the
/// earliest retained user turn is removed, so an assistant reply is never
/// orphaned from the user message that produced it.
pub fn trim_history(history: &mut Vec<ChatTurn>, max_user_turns: usize) {
    if max_user_turns == 0 {
        history.clear();
        return;
    }
    let user_indices: Vec<usize> = history
        .iter()
        .enumerate()
        .filter(|(_, turn)| turn.role == Role::User)
        .map(|(i, _)| i)
        .collect();
    if user_indices.len() <= max_user_turns {
        return;
    }
    let cutoff = user_indices[user_indices.len() - max_user_turns];
    history.drain(..cutoff);
}
