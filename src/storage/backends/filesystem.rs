use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;

use crate::storage::template::ImageStore;
use crate::storage::{ListRecord, MediaId, RecordId, StoreError};

const MEDIA_DIR: &str = "media";
const RECORDS_DIR: &str = "records";
const MEDIA_EXTENSION: &str = "bin";
const RECORD_EXTENSION: &str = "json";

/// Stores media payloads as raw files and rows as JSON documents:
///
/// ```text
/// <directory>/media/<media_id>.bin
/// <directory>/records/<record_id>.json
/// ```
pub struct FileSystemBackend {
    directory: PathBuf,
    next_record_id: AtomicU64,
    next_media_id: AtomicU64,
}

impl FileSystemBackend {
    /// Opens (creating if needed) a store rooted at `dir`.
    ///
    /// Id allocation resumes after the highest id already on disk.
    pub async fn open(dir: PathBuf) -> anyhow::Result<Self> {
        let media_dir = dir.join(MEDIA_DIR);
        let records_dir = dir.join(RECORDS_DIR);
        tokio::fs::create_dir_all(&media_dir).await?;
        tokio::fs::create_dir_all(&records_dir).await?;

        let last_media = list_ids(&media_dir, MEDIA_EXTENSION).await?.last().copied();
        let last_record = list_ids(&records_dir, RECORD_EXTENSION).await?.last().copied();

        let next_record_id = next_id(last_record, &records_dir)?;
        let next_media_id = next_id(last_media, &media_dir)?;

        info!("Opened filesystem store @ {:?}", &dir);
        Ok(Self {
            directory: dir,
            next_record_id: AtomicU64::new(next_record_id),
            next_media_id: AtomicU64::new(next_media_id),
        })
    }

    #[inline]
    fn media_path(&self, media_id: MediaId) -> PathBuf {
        self.directory
            .join(MEDIA_DIR)
            .join(format!("{}.{}", media_id, MEDIA_EXTENSION))
    }

    #[inline]
    fn record_path(&self, id: RecordId) -> PathBuf {
        self.directory
            .join(RECORDS_DIR)
            .join(format!("{}.{}", id, RECORD_EXTENSION))
    }
}

#[async_trait]
impl ImageStore for FileSystemBackend {
    async fn retrieve_record(&self, id: RecordId) -> anyhow::Result<ListRecord> {
        let path = self.record_path(id);

        debug!("Retrieving record @ {:?}", &path);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(ref e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::RecordNotFound(id).into())
            },
            Err(other) => Err(other.into()),
        }
    }

    async fn retrieve_media(&self, media_id: MediaId) -> anyhow::Result<Bytes> {
        let path = self.media_path(media_id);

        debug!("Retrieving media @ {:?}", &path);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(ref e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::MediaNotFound(media_id).into())
            },
            Err(other) => Err(other.into()),
        }
    }

    async fn store_media(
        &self,
        data: Bytes,
        existing: Option<MediaId>,
    ) -> anyhow::Result<MediaId> {
        let media_id = match existing {
            Some(media_id) => {
                ensure_exists(&self.media_path(media_id), StoreError::MediaNotFound(media_id)).await?;
                media_id
            },
            None => self.next_media_id.fetch_add(1, Ordering::Relaxed),
        };

        let path = self.media_path(media_id);
        debug!("Storing media @ {:?}", &path);
        tokio::fs::write(&path, &data).await?;

        Ok(media_id)
    }

    async fn store_record(&self, mut record: ListRecord) -> anyhow::Result<RecordId> {
        let id = match record.id {
            Some(id) => {
                ensure_exists(&self.record_path(id), StoreError::RecordNotFound(id)).await?;
                id
            },
            None => self.next_record_id.fetch_add(1, Ordering::Relaxed),
        };

        record.id = Some(id);
        let path = self.record_path(id);

        debug!("Storing record @ {:?}", &path);
        tokio::fs::write(&path, serde_json::to_vec(&record)?).await?;

        Ok(id)
    }

    async fn all(&self) -> anyhow::Result<Vec<ListRecord>> {
        let ids = list_ids(&self.directory.join(RECORDS_DIR), RECORD_EXTENSION).await?;

        futures::future::try_join_all(ids.into_iter().map(|id| self.retrieve_record(id))).await
    }
}

/// The id following the highest one on disk.
fn next_id(last: Option<u64>, dir: &Path) -> anyhow::Result<u64> {
    last.unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| anyhow!("no ids left to allocate in {:?}", dir))
}

async fn ensure_exists(path: &Path, missing: StoreError) -> anyhow::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(()),
        Err(ref e) if e.kind() == ErrorKind::NotFound => Err(missing.into()),
        Err(other) => Err(other.into()),
    }
}

/// Lists the numeric file stems with the given extension, ascending.
async fn list_ids(dir: &Path, extension: &str) -> anyhow::Result<Vec<u64>> {
    let mut ids = vec![];
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|v| v.to_str()) != Some(extension) {
            continue;
        }

        // Only canonical names, `007.json` would never be looked up as `7.json`.
        let id = path
            .file_stem()
            .and_then(|v| v.to_str())
            .and_then(|stem| stem.parse::<u64>().ok().filter(|id| id.to_string() == stem));

        if let Some(id) = id {
            ids.push(id);
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(guid: &str, original_id: Option<MediaId>) -> ListRecord {
        ListRecord {
            id: None,
            guid: guid.to_string(),
            original_id,
            edited_id: None,
            thumbnail_id: None,
            transform: [("contrast".to_string(), 0.5)].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn test_rows_and_media_survive_reopen() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;

        let (record_id, media_id) = {
            let store = FileSystemBackend::open(dir.path().to_path_buf()).await?;
            let media_id = store.store_media(Bytes::from_static(b"pixels"), None).await?;
            let record_id = store.store_record(row("abc", Some(media_id))).await?;
            (record_id, media_id)
        };

        let store = FileSystemBackend::open(dir.path().to_path_buf()).await?;
        let stored = store.retrieve_record(record_id).await?;
        assert_eq!(stored.id, Some(record_id));
        assert_eq!(stored.guid, "abc");
        assert_eq!(stored.original_id, Some(media_id));
        assert_eq!(stored.transform.get("contrast"), Some(&0.5));
        assert_eq!(store.retrieve_media(media_id).await?, Bytes::from_static(b"pixels"));

        // Allocation resumes after the existing files.
        let next = store.store_media(Bytes::from_static(b"more"), None).await?;
        assert!(next > media_id);

        Ok(())
    }

    #[tokio::test]
    async fn test_all_is_ordered_by_id() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FileSystemBackend::open(dir.path().to_path_buf()).await?;
        assert!(store.all().await?.is_empty());

        for guid in ["a", "b", "c"] {
            store.store_record(row(guid, None)).await?;
        }

        let guids: Vec<String> = store.all().await?.into_iter().map(|r| r.guid).collect();
        assert_eq!(guids, vec!["a", "b", "c"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_non_canonical_names_are_skipped() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FileSystemBackend::open(dir.path().to_path_buf()).await?;
        let id = store.store_record(row("kept", None)).await?;

        let stray = dir.path().join(RECORDS_DIR).join("007.json");
        tokio::fs::write(&stray, serde_json::to_vec(&row("stray", None))?).await?;
        tokio::fs::write(dir.path().join(RECORDS_DIR).join("notes.json"), b"{}").await?;

        let rows = store.all().await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, Some(id));
        assert_eq!(rows[0].guid, "kept");

        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted_ids_fail_to_open() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let media_dir = dir.path().join(MEDIA_DIR);
        tokio::fs::create_dir_all(&media_dir).await?;
        tokio::fs::write(media_dir.join(format!("{}.bin", u64::MAX)), b"x").await?;

        assert!(FileSystemBackend::open(dir.path().to_path_buf()).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_files_are_not_found() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FileSystemBackend::open(dir.path().to_path_buf()).await?;

        let err = store.retrieve_media(5).await.unwrap_err();
        assert_eq!(err.downcast_ref::<StoreError>(), Some(&StoreError::MediaNotFound(5)));

        let mut update = row("ghost", None);
        update.id = Some(77);
        let err = store.store_record(update).await.unwrap_err();
        assert_eq!(err.downcast_ref::<StoreError>(), Some(&StoreError::RecordNotFound(77)));

        Ok(())
    }
}
