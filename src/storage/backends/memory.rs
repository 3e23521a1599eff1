use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use hashbrown::HashMap;
use tokio::sync::RwLock;

use crate::storage::template::ImageStore;
use crate::storage::{ListRecord, MediaId, RecordId, StoreError};

/// A store that lives entirely in process memory.
///
/// Rows are kept ordered by id so `all()` returns them in insertion order.
pub struct MemoryBackend {
    records: RwLock<BTreeMap<RecordId, ListRecord>>,
    media: RwLock<HashMap<MediaId, Bytes>>,
    next_record_id: AtomicU64,
    next_media_id: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            media: RwLock::new(HashMap::new()),
            next_record_id: AtomicU64::new(1),
            next_media_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl ImageStore for MemoryBackend {
    async fn retrieve_record(&self, id: RecordId) -> anyhow::Result<ListRecord> {
        debug!("Retrieving record {}", id);
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::RecordNotFound(id).into())
    }

    async fn retrieve_media(&self, media_id: MediaId) -> anyhow::Result<Bytes> {
        debug!("Retrieving media {}", media_id);
        self.media
            .read()
            .await
            .get(&media_id)
            .cloned()
            .ok_or_else(|| StoreError::MediaNotFound(media_id).into())
    }

    async fn store_media(
        &self,
        data: Bytes,
        existing: Option<MediaId>,
    ) -> anyhow::Result<MediaId> {
        let mut media = self.media.write().await;

        let media_id = match existing {
            Some(media_id) if media.contains_key(&media_id) => media_id,
            Some(media_id) => return Err(StoreError::MediaNotFound(media_id).into()),
            None => self.next_media_id.fetch_add(1, Ordering::Relaxed),
        };

        debug!("Storing media {} ({} bytes)", media_id, data.len());
        media.insert(media_id, data);

        Ok(media_id)
    }

    async fn store_record(&self, mut record: ListRecord) -> anyhow::Result<RecordId> {
        let mut records = self.records.write().await;

        let id = match record.id {
            Some(id) if records.contains_key(&id) => id,
            Some(id) => return Err(StoreError::RecordNotFound(id).into()),
            None => self.next_record_id.fetch_add(1, Ordering::Relaxed),
        };

        debug!("Storing record {} (guid: {})", id, &record.guid);
        record.id = Some(id);
        records.insert(id, record);

        Ok(id)
    }

    async fn all(&self) -> anyhow::Result<Vec<ListRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(guid: &str) -> ListRecord {
        ListRecord {
            id: None,
            guid: guid.to_string(),
            original_id: None,
            edited_id: None,
            thumbnail_id: None,
            transform: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_media_insert_then_update_in_place() -> anyhow::Result<()> {
        let store = MemoryBackend::new();

        let media_id = store.store_media(Bytes::from_static(b"first"), None).await?;
        let updated = store
            .store_media(Bytes::from_static(b"second"), Some(media_id))
            .await?;

        assert_eq!(media_id, updated);
        assert_eq!(store.retrieve_media(media_id).await?, Bytes::from_static(b"second"));

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_entries_are_not_found() {
        let store = MemoryBackend::new();

        let err = store.retrieve_record(42).await.unwrap_err();
        assert_eq!(err.downcast_ref::<StoreError>(), Some(&StoreError::RecordNotFound(42)));

        let err = store.retrieve_media(9).await.unwrap_err();
        assert_eq!(err.downcast_ref::<StoreError>(), Some(&StoreError::MediaNotFound(9)));

        let err = store
            .store_media(Bytes::from_static(b"x"), Some(3))
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<StoreError>(), Some(&StoreError::MediaNotFound(3)));
    }

    #[tokio::test]
    async fn test_all_preserves_insertion_order() -> anyhow::Result<()> {
        let store = MemoryBackend::new();
        assert!(store.all().await?.is_empty());

        let first = store.store_record(row("a")).await?;
        let second = store.store_record(row("b")).await?;

        let mut updated = store.retrieve_record(first).await?;
        updated.edited_id = Some(12);
        assert_eq!(store.store_record(updated).await?, first);

        let rows = store.all().await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, Some(first));
        assert_eq!(rows[0].edited_id, Some(12));
        assert_eq!(rows[1].id, Some(second));
        assert_eq!(rows[1].guid, "b");

        Ok(())
    }
}
