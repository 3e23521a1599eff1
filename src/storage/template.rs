use async_trait::async_trait;
use bytes::Bytes;

use crate::storage::{ListRecord, MediaId, RecordId};

#[async_trait]
pub trait ImageStore: Sync + Send + 'static {
    /// Fetches a single metadata row.
    ///
    /// Fails with `StoreError::RecordNotFound` if the row does not exist.
    async fn retrieve_record(&self, id: RecordId) -> anyhow::Result<ListRecord>;

    /// Fetches a single media payload.
    ///
    /// Fails with `StoreError::MediaNotFound` if the payload does not exist.
    async fn retrieve_media(&self, media_id: MediaId) -> anyhow::Result<Bytes>;

    /// Inserts the payload if `existing` is `None`, otherwise overwrites
    /// the payload stored under that id.
    ///
    /// Returns the id the payload now lives under.
    async fn store_media(
        &self,
        data: Bytes,
        existing: Option<MediaId>,
    ) -> anyhow::Result<MediaId>;

    /// Inserts the row if its `id` is `None`, otherwise updates it in place.
    ///
    /// Returns the id the row now lives under.
    async fn store_record(&self, record: ListRecord) -> anyhow::Result<RecordId>;

    /// A snapshot of every metadata row in ascending id order.
    async fn all(&self) -> anyhow::Result<Vec<ListRecord>>;
}
