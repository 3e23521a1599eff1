use bytes::Bytes;
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

use crate::storage::MediaId;

/// One of the three representations a record tracks.
///
/// Variants are ordered coarsest first, each tier being derived
/// from the one before it.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    Original,
    Edited,
    Thumbnail,
}

impl Tier {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// The tier presented when this one has nothing cached.
    pub fn fallback(self) -> Option<Tier> {
        match self {
            Self::Original => None,
            Self::Edited => Some(Self::Original),
            Self::Thumbnail => Some(Self::Edited),
        }
    }

    /// This tier followed by each successive fallback, ending at `Original`.
    pub fn cascade(self) -> impl Iterator<Item = Tier> {
        std::iter::successors(Some(self), |tier| tier.fallback())
    }

    /// Every tier derived (directly or transitively) from this one.
    pub fn derived(self) -> impl Iterator<Item = Tier> {
        Tier::iter().filter(move |tier| *tier > self)
    }
}

/// The lifecycle marker of a single tier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
pub enum TierState {
    /// Nothing has been read from the store yet.
    NotLoaded,

    /// The cache mirrors what the store holds.
    Loaded,

    /// The cache has been set since the last write and must be
    /// considered on save.
    Changed,
}

/// The cache of a tier paired with its lifecycle.
///
/// A payload can only exist alongside `Loaded` or `Changed`.
#[derive(Debug, Clone, PartialEq)]
pub enum TierCache {
    NotLoaded,
    Loaded(Bytes),
    Changed(Option<Bytes>),
}

impl TierCache {
    #[inline]
    pub fn state(&self) -> TierState {
        match self {
            Self::NotLoaded => TierState::NotLoaded,
            Self::Loaded(_) => TierState::Loaded,
            Self::Changed(_) => TierState::Changed,
        }
    }

    #[inline]
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Self::NotLoaded => None,
            Self::Loaded(data) => Some(data),
            Self::Changed(data) => data.as_ref(),
        }
    }
}

/// The per-tier half of a record: where the payload lives in the
/// store and what is currently held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct TierSlot {
    pub(crate) media_id: Option<MediaId>,
    pub(crate) cache: TierCache,
}

impl TierSlot {
    /// A tier of a record that has never been saved.
    pub(crate) fn fresh() -> Self {
        Self {
            media_id: None,
            cache: TierCache::Changed(None),
        }
    }

    /// A tier rebuilt from a stored row.
    pub(crate) fn stored(media_id: Option<MediaId>) -> Self {
        Self {
            media_id,
            cache: TierCache::NotLoaded,
        }
    }

    #[inline]
    pub fn media_id(&self) -> Option<MediaId> {
        self.media_id
    }

    #[inline]
    pub fn state(&self) -> TierState {
        self.cache.state()
    }

    #[inline]
    pub fn payload(&self) -> Option<&Bytes> {
        self.cache.payload()
    }

    /// The media id to fetch from, if the tier is persisted but not read yet.
    #[inline]
    pub(crate) fn pending_load(&self) -> Option<MediaId> {
        match self.cache {
            TierCache::NotLoaded => self.media_id,
            _ => None,
        }
    }

    /// The payload to write back, if any.
    #[inline]
    pub(crate) fn pending_write(&self) -> Option<&Bytes> {
        match &self.cache {
            TierCache::Changed(data) => data.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn set(&mut self, data: Bytes) {
        self.cache = TierCache::Changed(Some(data));
    }

    /// Applies the id a write was stored under.
    ///
    /// With `settle` the written payload is treated as what the store
    /// now holds, so it is not written again until the next `set`.
    pub(crate) fn written(&mut self, media_id: MediaId, settle: bool) {
        self.media_id = Some(media_id);

        if settle {
            self.cache = match std::mem::replace(&mut self.cache, TierCache::NotLoaded) {
                TierCache::Changed(Some(data)) => TierCache::Loaded(data),
                other => other,
            };
        }
    }

    /// Drops both the cache and the stored reference so reads fall
    /// through to the next tier and the next save persists `None`.
    pub(crate) fn invalidate(&mut self) {
        self.media_id = None;
        self.cache = TierCache::Changed(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_order() {
        let order: Vec<Tier> = Tier::Thumbnail.cascade().collect();
        assert_eq!(order, vec![Tier::Thumbnail, Tier::Edited, Tier::Original]);

        let order: Vec<Tier> = Tier::Original.cascade().collect();
        assert_eq!(order, vec![Tier::Original]);
    }

    #[test]
    fn test_derived_tiers() {
        let derived: Vec<Tier> = Tier::Original.derived().collect();
        assert_eq!(derived, vec![Tier::Edited, Tier::Thumbnail]);
        assert_eq!(Tier::Thumbnail.derived().count(), 0);
    }

    #[test]
    fn test_tier_names() {
        assert_eq!(Tier::Edited.to_string(), "edited");
        assert_eq!(Tier::Thumbnail.as_ref(), "thumbnail");
    }

    #[test]
    fn test_stored_slot_only_loads_when_persisted() {
        assert_eq!(TierSlot::stored(Some(4)).pending_load(), Some(4));
        assert_eq!(TierSlot::stored(None).pending_load(), None);
        assert_eq!(TierSlot::fresh().pending_load(), None);
    }

    #[test]
    fn test_fresh_slot_has_nothing_to_write() {
        let mut slot = TierSlot::fresh();
        assert_eq!(slot.state(), TierState::Changed);
        assert!(slot.pending_write().is_none());

        slot.set(Bytes::from_static(b"data"));
        assert_eq!(slot.pending_write(), Some(&Bytes::from_static(b"data")));
    }
}
