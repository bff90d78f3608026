//! Slugification for agent ids, project ids, and knowledge file names.

/// Turn free-form display text into a filesystem- and id-safe slug.
///
/// Lowercases, keeps alphanumerics plus `_` and `-`, collapses every other
/// run of characters into a single `_`, and trims leading/trailing `_`.
/// Returns `"agent"` when nothing survives, so ids are never empty.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_sep = true;
    for c in s.trim().to_lowercase().chars() {
        if c.is_alphanumeric() || c == '-' {
            out.push(c);
            last_was_sep = false;
        } else if c == '_' || !last_was_sep {
            // collapse runs of disallowed chars (and explicit underscores)
            if !last_was_sep {
                out.push('_');
                last_was_sep = true;
            }
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "agent".to_string()
    } else {
        trimmed.to_string()
    }
}
