//! Session lifecycle and conversation orchestration.
//!
//! A session binds a room plan, a placed agent roster, a knowledge source,
//! and a shared chat transcript. The [`Orchestrator`] drives one user turn
//! through the active agent, executing at most one handoff to a colleague.
//! [`SessionService`] is the application-facing facade: it resolves setup
//! requests (inline documents, file paths, or stored projects), owns the
//! registries, and serializes turns per session.

pub mod draft;
pub mod history;
pub mod orchestrator;
pub mod prompt;
pub mod registry;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use draft::{DraftReply, DraftState};
pub use history::trim_history;
pub use orchestrator::{
    HandoffRecord, Orchestrator, OrchestratorSettings, TurnEvent, TurnFault, TurnInput,
    TurnOutcome,
};
pub use registry::{Registry, SessionState};
pub use service::{
    AgentSetupInfo, ChatRequest, SessionService, SetupRequest, SetupResponse,
};
