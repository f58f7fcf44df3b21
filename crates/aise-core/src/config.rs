use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{AiseError, AiseResult};

/// Top-level configuration, built once at startup and handed to the
/// orchestrator by value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiseConfig {
    /// `[orchestrator]` table.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// `[logging]` table.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bounds enforced by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of distinct agents that may be registered.
    #[serde(default = "default_agent_pool_size")]
    pub agent_pool_size: usize,
    /// Maximum number of projects not yet completed or errored.
    #[serde(default = "default_max_concurrent_projects")]
    pub max_concurrent_projects: usize,
    /// Capacity of the message queue for external producers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Re-arm an agent (error -> idle) as soon as its failed task has been
    /// reported back to the orchestrator.
    #[serde(default)]
    pub auto_rearm: bool,
}

fn default_agent_pool_size() -> usize {
    5
}

fn default_max_concurrent_projects() -> usize {
    3
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_pool_size: default_agent_pool_size(),
            max_concurrent_projects: default_max_concurrent_projects(),
            queue_capacity: default_queue_capacity(),
            auto_rearm: false,
        }
    }
}

impl OrchestratorConfig {
    /// Reject zero-sized bounds.
    pub fn validate(&self) -> AiseResult<()> {
        if self.agent_pool_size == 0 {
            return Err(AiseError::Config("agent_pool_size must be > 0".into()));
        }
        if self.max_concurrent_projects == 0 {
            return Err(AiseError::Config(
                "max_concurrent_projects must be > 0".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(AiseError::Config("queue_capacity must be > 0".into()));
        }
        Ok(())
    }
}

/// Tracing output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AiseConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> AiseResult<Self> {
        let config: AiseConfig =
            toml::from_str(raw).map_err(|e| AiseError::Config(format!("invalid TOML: {e}")))?;
        config.orchestrator.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> AiseResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AiseError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }
}
