//! Error types for the Showroom domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Showroom operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Session / orchestration errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Completion service errors ---
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    // --- Project store errors ---
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    // --- Knowledge base errors ---
    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Validation and lifecycle failures in the session layer.
///
/// These are client faults: the caller sent something missing or unknown.
/// They map to a 400-class response at the transport boundary.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Missing session_id — call /setup first")]
    MissingSessionId,

    #[error("Unknown session_id: {0} — call /setup again")]
    UnknownSession(String),

    #[error("user_text is empty")]
    EmptyUserText,

    #[error("Invalid setup payload: {0}")]
    InvalidSetup(String),

    #[error("Path outside the data root: {0}")]
    PathOutsideRoot(String),
}

/// Failures talking to the LLM completion service.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("Completion API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        details: serde_json::Value,
    },

    #[error("Completion network error: {0}")]
    Network(String),

    #[error("Completion request timed out: {0}")]
    Timeout(String),
}

impl CompletionError {
    /// HTTP-style status code, 0 when the request never reached the service.
    pub fn status(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            Self::Network(_) | Self::Timeout(_) => 0,
        }
    }

    /// Whether the service rejected the request itself (as opposed to an
    /// auth, rate-limit, or transport failure). The orchestrator retries
    /// exactly this class once in relaxed JSON mode, because it usually means
    /// the chosen model does not support strict schema validation.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::Api { status: 400, .. })
    }
}

/// Failures in the durable JSON project store.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Project already exists: {0}")]
    AlreadyExists(String),

    #[error("Knowledge entry not found: {tag}/{name}")]
    KnowledgeNotFound { tag: String, name: String },

    #[error("Knowledge entry already exists: {tag}/{name}")]
    KnowledgeExists { tag: String, name: String },

    #[error("Tag and name are required")]
    MissingTagOrName,

    #[error("Invalid project path")]
    InvalidPath,

    #[error("Malformed project document {path}: {message}")]
    MalformedDocument { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ProjectError {
    fn from(e: serde_json::Error) -> Self {
        ProjectError::MalformedDocument {
            path: String::new(),
            message: e.to_string(),
        }
    }
}

/// Failures in the knowledge base.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Knowledge root unreadable: {0}")]
    RootUnreadable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
