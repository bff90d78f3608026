//! Configuration loading and validation for the Showroom backend.
//!
//! Loads configuration from a TOML file (default `showroom.toml` in the
//! working directory) with an environment variable override for the API key.
//! Every field has a serde default, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;

use showroom_core::Error;

/// The root configuration structure. Maps directly to `showroom.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub projects: ProjectsConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Completion service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// API key; falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Knowledge base settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Root directory holding `<tag>/*.txt|*.md` files.
    #[serde(default = "default_kb_root")]
    pub root: String,
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    #[serde(default = "default_max_snippets")]
    pub max_snippets: usize,
}

/// Session and orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How many user turns of history are retained per session.
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
    /// Handoff gate: 0 disables handoffs, any positive value allows one hop
    /// per turn.
    #[serde(default = "default_max_handoffs")]
    pub max_handoffs: usize,
    /// Sessions idle longer than this are reaped; 0 disables reaping.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

/// Project store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Root directory holding one subdirectory per project.
    #[serde(default = "default_projects_root")]
    pub root: String,
    /// Room plan document used when a setup request supplies none.
    #[serde(default = "default_room_plan_path")]
    pub default_room_plan_path: String,
    /// Agent roster document used when a setup request supplies none.
    #[serde(default = "default_agents_path")]
    pub default_agents_path: String,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8787
}
fn default_base_url() -> String {
    "https://api.openai.com/v1/responses".into()
}
fn default_model() -> String {
    "gpt-4.1".into()
}
fn default_temperature() -> f64 {
    0.3
}
fn default_timeout_seconds() -> u64 {
    60
}
fn default_kb_root() -> String {
    "kb".into()
}
fn default_chunk_chars() -> usize {
    900
}
fn default_max_snippets() -> usize {
    4
}
fn default_max_history_turns() -> usize {
    20
}
fn default_max_handoffs() -> usize {
    1
}
fn default_idle_timeout_secs() -> u64 {
    3600
}
fn default_projects_root() -> String {
    "projects".into()
}
fn default_room_plan_path() -> String {
    "data/room_plan.example.json".into()
}
fn default_agents_path() -> String {
    "data/agents.example.json".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            root: default_kb_root(),
            chunk_chars: default_chunk_chars(),
            max_snippets: default_max_snippets(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history_turns: default_max_history_turns(),
            max_handoffs: default_max_handoffs(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            root: default_projects_root(),
            default_room_plan_path: default_room_plan_path(),
            default_agents_path: default_agents_path(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            completion: CompletionConfig::default(),
            knowledge: KnowledgeConfig::default(),
            session: SessionConfig::default(),
            projects: ProjectsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
                message: format!("cannot read {}: {e}", path.display()),
            })?;
            toml::from_str(&raw).map_err(|e| Error::Config {
                message: format!("cannot parse {}: {e}", path.display()),
            })?
        } else {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if self.completion.api_key.as_deref().unwrap_or("").trim().is_empty()
            && let Ok(key) = std::env::var("OPENAI_API_KEY")
            && !key.trim().is_empty()
        {
            tracing::info!("API key loaded from OPENAI_API_KEY");
            self.completion.api_key = Some(key.trim().to_string());
        }
    }

    /// Validate settings that would otherwise fail deep inside a request.
    pub fn validate(&self) -> Result<(), Error> {
        if self.session.max_history_turns == 0 {
            return Err(Error::Config {
                message: "session.max_history_turns must be at least 1".into(),
            });
        }
        if self.knowledge.chunk_chars < 100 {
            return Err(Error::Config {
                message: "knowledge.chunk_chars must be at least 100".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(Error::Config {
                message: "completion.temperature must be between 0.0 and 2.0".into(),
            });
        }
        Ok(())
    }

    /// The API key, if configured anywhere.
    pub fn api_key(&self) -> Option<&str> {
        self.completion
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

}
