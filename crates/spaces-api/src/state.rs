//! Application state wiring the orchestrator to its concrete adapters.
//!
//! Core services are generic over the repository and task backend traits;
//! AppState pins them to the SQLite repository and the HTTP task backend.

use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;
use spaces_core::conversation::{Orchestrator, OrchestratorSettings};
use spaces_core::event::EventBus;
use spaces_core::llm::box_provider::BoxLlmProvider;
use spaces_core::reply::{DirectReplyInvoker, ReplySettings};
use spaces_core::space::service::TranscriptStore;
use spaces_core::task::launcher::TaskLauncher;
use spaces_infra::config::{database_url, load_global_config, resolve_data_dir};
use spaces_infra::llm::anthropic::AnthropicProvider;
use spaces_infra::sqlite::pool::DatabasePool;
use spaces_infra::sqlite::space::SqliteSpaceRepository;
use spaces_infra::task::HttpTaskBackend;
use spaces_types::config::GlobalConfig;
use spaces_types::space::CallerContext;

/// Environment variable holding the completion model API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

pub type ConcreteOrchestrator = Orchestrator<SqliteSpaceRepository, HttpTaskBackend>;

/// Shared application state used by every CLI command.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub config: GlobalConfig,
    pub caller: CallerContext,
}

impl AppState {
    /// Load config, open the database, and wire the orchestrator.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;

        let db_pool = DatabasePool::new(&database_url(&data_dir))
            .await
            .context("failed to open the spaces database")?;
        let store = Arc::new(TranscriptStore::new(SqliteSpaceRepository::new(db_pool)));

        let api_key = match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                tracing::warn!("{API_KEY_ENV} is not set; direct replies will fail");
                String::new()
            }
        };
        let provider = AnthropicProvider::new(SecretString::from(api_key), &config.model)
            .context("failed to build the completion model client")?;
        let direct = DirectReplyInvoker::new(
            BoxLlmProvider::new(provider),
            ReplySettings::from(&config.model),
        );

        let backend =
            HttpTaskBackend::new(&config.task).context("failed to build the task backend client")?;

        let orchestrator = Orchestrator::new(
            store,
            direct,
            TaskLauncher::new(backend),
            OrchestratorSettings::from(&config),
            EventBus::default(),
        );

        tracing::debug!(data_dir = %data_dir.display(), owner = %config.owner_id, "Application state ready");

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            caller: CallerContext::new(config.owner_id.clone()),
            config,
        })
    }
}
