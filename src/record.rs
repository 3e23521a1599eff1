use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use strum::IntoEnumIterator;
use tracing::instrument;
use uuid::Uuid;

use crate::config::RecordPolicy;
use crate::storage::template::ImageStore;
use crate::storage::{ListRecord, MediaId, RecordId};
use crate::tier::{Tier, TierCache, TierSlot, TierState};
use crate::transform::FilterTransform;
use crate::utils::checksum;

/// A single logical image and its original, edited and thumbnail tiers.
///
/// Tiers are read lazily from the store on first access and held in
/// memory afterwards. Reading a tier with nothing behind it presents the
/// tier it is derived from instead. Only tiers that were set since they
/// were last written are sent back to the store on `save`.
pub struct ImageRecord {
    id: Option<RecordId>,
    guid: String,
    tiers: [TierSlot; 3],
    transform: Option<FilterTransform>,
    policy: RecordPolicy,
    storage: Arc<dyn ImageStore>,
}

impl fmt::Debug for ImageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRecord")
            .field("id", &self.id)
            .field("guid", &self.guid)
            .field("tiers", &self.tiers)
            .field("transform", &self.transform)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ImageRecord {
    /// Creates a record that has never been saved with a new random guid.
    ///
    /// Every tier starts as `Changed` so anything set before the first
    /// save gets written.
    pub fn new(storage: Arc<dyn ImageStore>) -> Self {
        Self::with_guid(storage, Uuid::new_v4().to_string())
    }

    pub fn with_guid(storage: Arc<dyn ImageStore>, guid: impl Into<String>) -> Self {
        Self {
            id: None,
            guid: guid.into(),
            tiers: [TierSlot::fresh(), TierSlot::fresh(), TierSlot::fresh()],
            transform: None,
            policy: RecordPolicy::default(),
            storage,
        }
    }

    pub fn with_policy(mut self, policy: RecordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Rebuilds a record from a stored row.
    ///
    /// No media is fetched, every tier starts as `NotLoaded`.
    pub fn from_list_record(storage: Arc<dyn ImageStore>, record: &ListRecord) -> Self {
        Self {
            id: record.id,
            guid: record.guid.clone(),
            tiers: [
                TierSlot::stored(record.original_id),
                TierSlot::stored(record.edited_id),
                TierSlot::stored(record.thumbnail_id),
            ],
            transform: Some(FilterTransform::from_params(&record.transform)),
            policy: RecordPolicy::default(),
            storage,
        }
    }

    pub async fn from_store(storage: Arc<dyn ImageStore>, id: RecordId) -> anyhow::Result<Self> {
        let record = storage.retrieve_record(id).await?;
        Ok(Self::from_list_record(storage, &record))
    }

    /// Rebuilds every record in the store, in the order the store returns them.
    pub async fn get_all(storage: Arc<dyn ImageStore>) -> anyhow::Result<Vec<Self>> {
        let records = storage.all().await?;

        let result = records
            .iter()
            .map(|record| Self::from_list_record(storage.clone(), record))
            .collect();

        Ok(result)
    }

    #[inline]
    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    #[inline]
    pub fn guid(&self) -> &str {
        &self.guid
    }

    #[inline]
    pub fn policy(&self) -> RecordPolicy {
        self.policy
    }

    #[inline]
    pub fn state(&self, tier: Tier) -> TierState {
        self.slot(tier).state()
    }

    #[inline]
    pub fn media_id(&self, tier: Tier) -> Option<MediaId> {
        self.slot(tier).media_id()
    }

    /// True if any tier holds a payload that has not been written yet.
    pub fn is_dirty(&self) -> bool {
        self.tiers.iter().any(|slot| slot.pending_write().is_some())
    }

    pub fn transform(&self) -> Option<&FilterTransform> {
        self.transform.as_ref()
    }

    pub fn transform_mut(&mut self) -> Option<&mut FilterTransform> {
        self.transform.as_mut()
    }

    pub fn set_transform(&mut self, transform: Option<FilterTransform>) {
        self.transform = transform;
    }

    /// Resolves a tier, falling back through coarser tiers until one
    /// has a payload.
    ///
    /// Each tier visited is fetched from the store at most once. `None` is
    /// returned only when no tier down to `Original` has anything.
    #[instrument(skip(self), fields(guid = %self.guid), level = "debug")]
    pub async fn get(&mut self, tier: Tier) -> anyhow::Result<Option<Bytes>> {
        for tier in tier.cascade() {
            self.load(tier).await?;

            if let Some(data) = self.slot(tier).payload() {
                return Ok(Some(data.clone()));
            }
        }

        Ok(None)
    }

    pub async fn get_original(&mut self) -> anyhow::Result<Option<Bytes>> {
        self.get(Tier::Original).await
    }

    pub async fn get_edited(&mut self) -> anyhow::Result<Option<Bytes>> {
        self.get(Tier::Edited).await
    }

    pub async fn get_thumbnail(&mut self) -> anyhow::Result<Option<Bytes>> {
        self.get(Tier::Thumbnail).await
    }

    /// Replaces a tier's payload and marks it `Changed`.
    ///
    /// The stored media id is kept so the next save overwrites it in place.
    pub fn set(&mut self, tier: Tier, data: impl Into<Bytes>) {
        self.slot_mut(tier).set(data.into());

        if self.policy.invalidate_derived {
            for derived in tier.derived() {
                self.slot_mut(derived).invalidate();
            }
        }
    }

    pub fn set_original(&mut self, data: impl Into<Bytes>) {
        self.set(Tier::Original, data)
    }

    pub fn set_edited(&mut self, data: impl Into<Bytes>) {
        self.set(Tier::Edited, data)
    }

    pub fn set_thumbnail(&mut self, data: impl Into<Bytes>) {
        self.set(Tier::Thumbnail, data)
    }

    /// Writes every changed tier that has a payload, then the metadata row.
    ///
    /// Ids returned by the store are applied as each write completes. The
    /// first failing write aborts the save, anything already written stays
    /// written.
    #[instrument(skip(self), fields(guid = %self.guid), level = "debug")]
    pub async fn save(&mut self) -> anyhow::Result<()> {
        for tier in Tier::iter() {
            let slot = self.slot(tier);
            let data = match slot.pending_write() {
                Some(data) => data.clone(),
                None => continue,
            };

            debug!(
                tier = %tier,
                size = data.len(),
                checksum = checksum(&data),
                "Writing tier media"
            );
            let media_id = self.storage.store_media(data, slot.media_id()).await?;

            let settle = self.policy.settle_after_save;
            self.slot_mut(tier).written(media_id, settle);
        }

        let id = self.storage.store_record(self.to_list_record()).await?;
        self.id = Some(id);

        debug!(id, "Saved record");
        Ok(())
    }

    /// The row this record would be persisted as.
    pub fn to_list_record(&self) -> ListRecord {
        let transform = self
            .transform
            .as_ref()
            .map(FilterTransform::to_params)
            .unwrap_or_default();

        ListRecord {
            id: self.id,
            guid: self.guid.clone(),
            original_id: self.media_id(Tier::Original),
            edited_id: self.media_id(Tier::Edited),
            thumbnail_id: self.media_id(Tier::Thumbnail),
            transform,
        }
    }

    /// Fetches the tier's payload if it is persisted and not read yet.
    ///
    /// The slot is only touched once the fetch has succeeded.
    async fn load(&mut self, tier: Tier) -> anyhow::Result<()> {
        if let Some(media_id) = self.slot(tier).pending_load() {
            debug!(tier = %tier, media_id, "Loading tier media");
            let data = self.storage.retrieve_media(media_id).await?;
            self.slot_mut(tier).cache = TierCache::Loaded(data);
        }

        Ok(())
    }

    #[inline]
    fn slot(&self, tier: Tier) -> &TierSlot {
        &self.tiers[tier.index()]
    }

    #[inline]
    fn slot_mut(&mut self, tier: Tier) -> &mut TierSlot {
        &mut self.tiers[tier.index()]
    }
}
