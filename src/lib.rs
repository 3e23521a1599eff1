#[macro_use]
extern crate tracing;

pub mod config;
pub mod controller;
pub mod record;
pub mod storage;
pub mod tier;
pub mod transform;
mod utils;


pub use config::{RecordPolicy, RuntimeConfig};
pub use controller::RecordController;
pub use record::ImageRecord;
pub use storage::backends::{BackendConfigs, FileSystemBackend, MemoryBackend};
pub use storage::template::ImageStore;
pub use storage::{ListRecord, MediaId, RecordId, StoreError};
pub use tier::{Tier, TierState};
pub use transform::{FilterTransform, TransformParams};
