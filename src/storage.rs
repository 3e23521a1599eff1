use serde::{Deserialize, Serialize};

use crate::tier::Tier;
use crate::transform::TransformParams;

pub mod backends;
pub mod template;

/// The store assigned identity of a metadata row.
pub type RecordId = u64;

/// The store assigned identity of a binary media payload.
pub type MediaId = u64;

/// Not-found conditions raised by a store backend.
///
/// Backends return these wrapped in an `anyhow::Error`, callers that
/// care can recover them via `downcast_ref::<StoreError>()`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no record exists with id {0}")]
    RecordNotFound(RecordId),

    #[error("no media exists with id {0}")]
    MediaNotFound(MediaId),
}

/// A single metadata row as persisted by the store.
///
/// This never carries any media itself, only the ids each tier's
/// payload is stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecord {
    /// `None` until the store has inserted the row.
    pub id: Option<RecordId>,

    pub guid: String,

    pub original_id: Option<MediaId>,
    pub edited_id: Option<MediaId>,
    pub thumbnail_id: Option<MediaId>,

    #[serde(default)]
    /// The flattened transform parameters, empty if the record
    /// has no transform.
    pub transform: TransformParams,
}

impl ListRecord {
    #[inline]
    pub fn media_id(&self, tier: Tier) -> Option<MediaId> {
        match tier {
            Tier::Original => self.original_id,
            Tier::Edited => self.edited_id,
            Tier::Thumbnail => self.thumbnail_id,
        }
    }
}
