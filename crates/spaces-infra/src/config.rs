//! Global configuration loader for Spaces.
//!
//! Reads `config.toml` from the data directory (`~/.spaces/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use spaces_types::config::GlobalConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SPACES_DATA_DIR";
/// Environment variable overriding `owner_id`.
pub const OWNER_ID_ENV: &str = "SPACES_OWNER_ID";

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`GlobalConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
///
/// `SPACES_OWNER_ID` overrides `owner_id` in every case.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let mut config = read_config_file(data_dir).await;
    if let Ok(owner) = std::env::var(OWNER_ID_ENV) {
        apply_owner_override(&mut config, &owner);
    }
    config
}

async fn read_config_file(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

fn apply_owner_override(config: &mut GlobalConfig, owner: &str) {
    let owner = owner.trim();
    if !owner.is_empty() {
        config.owner_id = owner.to_string();
    }
}

/// Resolve the data directory: `SPACES_DATA_DIR`, else `~/.spaces`, else `./.spaces`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".spaces");
    }

    PathBuf::from(".spaces")
}

/// SQLite URL of the spaces database inside `data_dir`.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}/spaces.db?mode=rwc", data_dir.display())
}
