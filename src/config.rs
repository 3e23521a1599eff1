use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::controller::RecordController;
use crate::storage::backends::BackendConfigs;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordPolicy {
    #[serde(default)]
    /// Setting a tier also discards every tier derived from it.
    ///
    /// The discarded tiers lose both their cache and their stored media
    /// reference, so reads fall back to the freshly set tier and the next
    /// save persists the reference as empty. The old payloads are left in
    /// the store.
    ///
    /// Defaults to `false`.
    pub invalidate_derived: bool,

    #[serde(default = "default_true")]
    /// Marks a tier as `Loaded` once its payload has been written,
    /// so saving again without a new `set` writes nothing for it.
    ///
    /// When disabled every save re-writes every tier that has ever
    /// been set.
    ///
    /// Defaults to `true`.
    pub settle_after_save: bool,
}

impl Default for RecordPolicy {
    fn default() -> Self {
        Self {
            invalidate_derived: false,
            settle_after_save: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RuntimeConfig {
    /// The set storage backend configuration.
    pub backend: BackendConfigs,

    #[serde(default)]
    /// How records track and persist their tiers.
    ///
    /// See `config::RecordPolicy` for more.
    pub records: RecordPolicy,
}

impl RuntimeConfig {
    pub fn from_yaml(data: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&data)
    }

    /// Connects the configured backend and wraps it in a controller
    /// applying the configured record policy.
    pub async fn connect(&self) -> anyhow::Result<Arc<RecordController>> {
        let storage = self.backend.connect().await?;
        Ok(Arc::new(RecordController::new(self.records, storage)))
    }
}

const fn default_true() -> bool {
    true
}
