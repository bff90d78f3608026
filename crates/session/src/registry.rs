use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use showroom_core::agent::{AgentSpec, Placement};
use showroom_core::history::ChatTurn;
use showroom_core::knowledge::KnowledgeSource;
use showroom_core::room::RoomPlan;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Anything a [`Registry`] can age out by last-activity time.
pub trait Stamped {
    fn updated_at(&self) -> DateTime<Utc>;
}

/// One live conversation: a placed roster, its knowledge source, and the
/// shared transcript. All agents in a session see the same history.
pub struct SessionState {
    pub session_id: String,
    pub project_id: Option<String>,
    pub room_plan: RoomPlan,
    pub agents: Vec<AgentSpec>,
    pub placements: HashMap<String, Placement>,
    pub knowledge: Arc<dyn KnowledgeSource>,
    pub history: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn agent(&self, id: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Resolves the turn's speaker: the requested agent if it exists,
    /// otherwise the first agent in roster order.
    pub fn resolve_agent(&self, requested: Option<&str>) -> Option<&AgentSpec> {
        requested
            .and_then(|id| self.agent(id))
            .or_else(|| self.agents.first())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Stamped for SessionState {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Concurrent id-keyed store of live states.
///
/// The outer map is guarded by an [`RwLock`] so lookups do not contend with
/// each other; each entry carries its own [`Mutex`] so turns against the same
/// state run strictly one at a time while distinct states proceed in parallel.
pub struct Registry<S> {
    entries: RwLock<HashMap<String, Arc<Mutex<S>>>>,
}

impl<S: Stamped> Registry<S> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, id: String, state: S) -> Arc<Mutex<S>> {
        let entry = Arc::new(Mutex::new(state));
        self.entries.write().await.insert(id, Arc::clone(&entry));
        entry
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<S>>> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drops every entry whose last activity is older than `max_idle`.
    /// Returns the number of entries removed.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let deadline = Utc::now() - max_idle;
        let snapshot: Vec<(String, Arc<Mutex<S>>)> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(entry)))
            .collect();

        let mut stale = Vec::new();
        for (id, entry) in snapshot {
            let state = entry.lock().await;
            if state.updated_at() < deadline {
                stale.push(id);
            }
        }
        if stale.is_empty() {
            return 0;
        }
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for id in stale {
            if entries.remove(&id).is_some() {
                debug!(id = %id, "reaped idle entry");
                removed += 1;
            }
        }
        removed
    }
}

impl<S: Stamped> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::session_state;

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let registry = Registry::new();
        registry
            .insert("s1".into(), session_state("s1", &["host"]))
            .await;
        assert!(registry.get("s1").await.is_some());
        assert!(registry.get("missing").await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn reap_removes_only_idle_entries() {
        let registry = Registry::new();
        let mut old = session_state("old", &["host"]);
        old.updated_at = Utc::now() - Duration::hours(3);
        registry.insert("old".into(), old).await;
        registry
            .insert("fresh".into(), session_state("fresh", &["host"]))
            .await;

        let removed = registry.reap_idle(Duration::hours(1)).await;
        assert_eq!(removed, 1);
        assert!(registry.get("old").await.is_none());
        assert!(registry.get("fresh").await.is_some());
    }
}
