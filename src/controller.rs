use std::sync::Arc;

use crate::config::RecordPolicy;
use crate::record::ImageRecord;
use crate::storage::template::ImageStore;
use crate::storage::{ListRecord, RecordId};

/// Hands out records bound to one store and one record policy.
pub struct RecordController {
    policy: RecordPolicy,
    storage: Arc<dyn ImageStore>,
}

impl RecordController {
    pub fn new(policy: RecordPolicy, storage: Arc<dyn ImageStore>) -> Self {
        Self { policy, storage }
    }

    #[inline]
    pub fn policy(&self) -> RecordPolicy {
        self.policy
    }

    #[inline]
    pub fn storage(&self) -> &Arc<dyn ImageStore> {
        &self.storage
    }

    /// A new, unsaved record with a random guid.
    pub fn create(&self) -> ImageRecord {
        ImageRecord::new(self.storage.clone()).with_policy(self.policy)
    }

    pub fn create_with_guid(&self, guid: impl Into<String>) -> ImageRecord {
        ImageRecord::with_guid(self.storage.clone(), guid).with_policy(self.policy)
    }

    pub fn reconstruct(&self, record: &ListRecord) -> ImageRecord {
        ImageRecord::from_list_record(self.storage.clone(), record).with_policy(self.policy)
    }

    pub async fn load(&self, id: RecordId) -> anyhow::Result<ImageRecord> {
        let record = ImageRecord::from_store(self.storage.clone(), id).await?;
        Ok(record.with_policy(self.policy))
    }

    pub async fn load_all(&self) -> anyhow::Result<Vec<ImageRecord>> {
        let records = ImageRecord::get_all(self.storage.clone()).await?;
        debug!("Loaded {} records", records.len());

        Ok(records
            .into_iter()
            .map(|record| record.with_policy(self.policy))
            .collect())
    }
}
