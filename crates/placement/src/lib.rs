//! Spatial placement for Showroom agents.
//!
//! Resolves a roster of agents to non-overlapping floor positions in a room,
//! honoring authored pre-assignments, softly honoring declared zone/tag
//! preferences, avoiding obstacles, and falling back to generated circular
//! layouts when the room has no usable spawn points.
//!
//! Everything here is pure computation: no I/O, no shared state, safe to call
//! from any number of concurrent request handlers.

pub mod engine;
pub mod geometry;
pub mod infer;

pub use engine::{assign_spawn_points, find_open_position};
pub use geometry::{Obstacle, extract_obstacles};
pub use infer::with_inferred_preferences;
