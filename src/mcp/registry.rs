use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::loader::{self, ConfigError};
use super::protocol::Tool;

type Snapshot = Arc<BTreeMap<String, Tool>>;

/// Tool registry backed by the tools document.
///
/// Readers clone the current snapshot under a shared lock; a reload builds the replacement map
/// without holding the lock and then swaps the `Arc` under the write lock, so `get` and
/// `list_tools` always observe one complete document.
pub struct ToolRegistry {
    config_path: PathBuf,
    snapshot: RwLock<Snapshot>,
}

impl ToolRegistry {
    /// Create a registry holding `tools`, tracking the document at `config_path`.
    pub fn with_tools(config_path: impl Into<PathBuf>, tools: BTreeMap<String, Tool>) -> Self {
        Self {
            config_path: config_path.into(),
            snapshot: RwLock::new(Arc::new(tools)),
        }
    }

    /// Build the startup registry.
    ///
    /// Never fails: an unreadable or invalid document yields the built-in tools, and a missing
    /// document additionally gets an example written in its place.
    pub fn load(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();

        let tools = if config_path.exists() {
            match loader::read_tools_config(&config_path) {
                Ok(tools) => {
                    tracing::info!(
                        path = %config_path.display(),
                        count = tools.len(),
                        "Loaded tools from config"
                    );
                    tools
                }
                Err(err) => {
                    tracing::warn!(
                        path = %config_path.display(),
                        error = %err,
                        "Failed to load tools from YAML, using defaults"
                    );
                    loader::default_tool_map()
                }
            }
        } else {
            tracing::info!(
                path = %config_path.display(),
                "Config file not found, using default tools"
            );
            match loader::write_example_config(&config_path) {
                Ok(()) => tracing::info!(
                    path = %config_path.display(),
                    "Created example configuration file"
                ),
                Err(err) => tracing::warn!(
                    path = %config_path.display(),
                    error = %err,
                    "Failed to write example configuration"
                ),
            }
            loader::default_tool_map()
        };

        Self::with_tools(config_path, tools)
    }

    /// Path of the tracked tools document
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Re-read the tools document and publish it.
    ///
    /// On error the current snapshot stays in place.
    pub async fn reload(&self) -> Result<usize, ConfigError> {
        let source = tokio::fs::read_to_string(&self.config_path)
            .await
            .map_err(|source| ConfigError::Io {
                path: self.config_path.clone(),
                source,
            })?;
        let tools = loader::parse_tools_config(&source)?;
        let count = tools.len();
        self.replace(tools).await;
        Ok(count)
    }

    /// Publish a new tool set in one swap.
    pub async fn replace(&self, tools: BTreeMap<String, Tool>) {
        let next = Arc::new(tools);
        let mut snapshot = self.snapshot.write().await;
        *snapshot = next;
    }

    /// Current snapshot; stays valid across later reloads.
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    /// Get a tool by name
    pub async fn get(&self, name: &str) -> Option<Tool> {
        self.snapshot.read().await.get(name).cloned()
    }

    /// List all available tools, ordered by name
    pub async fn list_tools(&self) -> Vec<Tool> {
        self.snapshot().await.values().cloned().collect()
    }

    pub async fn has_tool(&self, name: &str) -> bool {
        self.snapshot.read().await.contains_key(name)
    }

    pub async fn count(&self) -> usize {
        self.snapshot.read().await.len()
    }
}
