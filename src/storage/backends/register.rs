use std::path::PathBuf;
use std::sync::Arc;
use serde::Deserialize;

use crate::storage::template::ImageStore;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendConfigs {
    /// Keeps every row and payload in process memory.
    Memory,

    FileSystem {
        directory: PathBuf,
    }
}

impl BackendConfigs {
    pub async fn connect(&self) -> anyhow::Result<Arc<dyn ImageStore>> {
        match self {
            Self::Memory => {
                Ok(Arc::new(super::memory::MemoryBackend::new()))
            }
            Self::FileSystem { directory } => {
                Ok(Arc::new(super::filesystem::FileSystemBackend::open(directory.clone()).await?))
            }
        }
    }
}
