//! # Showroom Core
//!
//! Domain types, traits, and error definitions for the Showroom NPC backend.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator (LLM completion, knowledge retrieval) is defined as a
//! trait here. Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod action;
pub mod agent;
pub mod completion;
pub mod error;
pub mod history;
pub mod knowledge;
pub mod room;
pub mod slug;

// Re-export key types at crate root for ergonomics
pub use action::{NpcAction, npc_action_schema};
pub use agent::{AgentSpec, Placement};
pub use completion::{Completion, CompletionOutcome, CompletionRequest, PromptMessage, PromptRole};
pub use error::{CompletionError, Error, KnowledgeError, ProjectError, Result, SessionError};
pub use history::{ChatTurn, Role};
pub use knowledge::{KnowledgeSnippet, KnowledgeSource};
pub use room::{RoomPlan, SpawnPoint, Vec3, Zone};
pub use slug::slugify;
