//! Global configuration types for Spaces.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! completion model used for direct replies, the agent task backend, and
//! conversation defaults.

use serde::{Deserialize, Serialize};

use crate::event::ReplyRoute;

/// Top-level configuration for Spaces.
///
/// Loaded from `~/.spaces/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Identity used when no external identity provider supplies one.
    #[serde(default = "default_owner_id")]
    pub owner_id: String,

    /// Reply path used when a submission does not choose one.
    #[serde(default = "default_reply_route")]
    pub reply_route: ReplyRoute,

    /// Assistant welcome text for spaces that have no turns yet.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub task: TaskConfig,
}

fn default_owner_id() -> String {
    "local".to_string()
}

fn default_reply_route() -> ReplyRoute {
    ReplyRoute::Direct
}

fn default_greeting() -> String {
    "Hello! I'm Manus, your AI assistant. How can I help you today?".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            owner_id: default_owner_id(),
            reply_route: default_reply_route(),
            greeting: default_greeting(),
            model: ModelConfig::default(),
            task: TaskConfig::default(),
        }
    }
}

/// Completion model settings for the direct reply path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_model_base_url")]
    pub base_url: String,

    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,

    /// Assistant text persisted in place of a reply when the model fails.
    #[serde(default = "default_apology")]
    pub apology: String,
}

fn default_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_system_prompt() -> String {
    "You are a helpful AI assistant named Manus. Be concise, friendly, and helpful.".to_string()
}

fn default_model_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model_timeout_secs() -> u64 {
    120
}

fn default_apology() -> String {
    "I'm sorry, I couldn't generate a response at the moment. Please try again later."
        .to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
            base_url: default_model_base_url(),
            timeout_secs: default_model_timeout_secs(),
            apology: default_apology(),
        }
    }
}

/// Agent task backend and polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_task_base_url")]
    pub base_url: String,

    /// Cadence of status queries while a task is running.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Transport timeout applied to each submission and status request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Overall polling deadline; `0` disables it.
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,

    /// Name the agent uses in its thought markers.
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Phrases that mark a reasoning thought as the final answer.
    #[serde(default = "default_final_answer_markers")]
    pub final_answer_markers: Vec<String>,
}

fn default_task_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_duration_secs() -> u64 {
    1800
}

fn default_agent_name() -> String {
    "Manus".to_string()
}

fn default_final_answer_markers() -> Vec<String> {
    vec!["I now have the answer".to_string()]
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            base_url: default_task_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_duration_secs: default_max_duration_secs(),
            agent_name: default_agent_name(),
            final_answer_markers: default_final_answer_markers(),
        }
    }
}
