//! JSON file-backed state store
//!
//! The whole map is rewritten on each change: serialized to a sibling
//! temp file, then renamed over the original so readers never see a
//! half-written file.

use crate::error::StoreError;
use crate::traits::PersistedStateStore;
use async_trait::async_trait;
use rejoin_types::{CommunityId, MemberId, PersistedStateRecord};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type Records = BTreeMap<CommunityId, BTreeMap<MemberId, PersistedStateRecord>>;

/// Persisted-state store backed by a single JSON file
#[derive(Debug)]
pub struct JsonFileStateStore {
    path: PathBuf,
    records: Mutex<Records>,
}

impl JsonFileStateStore {
    /// Open the store, loading existing records if the file exists
    ///
    /// # Errors
    /// - `StoreError::Io` if the file exists but cannot be read
    /// - `StoreError::Codec` if its contents are not valid JSON records
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Records::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Records::new(),
            Err(e) => return Err(StoreError::io_error(&path, e)),
        };

        tracing::debug!(
            path = %path.display(),
            communities = records.len(),
            "opened state store"
        );

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Backing file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, records: &Records) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))?;
        Ok(())
    }
}

#[async_trait]
impl PersistedStateStore for JsonFileStateStore {
    async fn find(
        &self,
        community: &CommunityId,
        member: &MemberId,
    ) -> Result<Option<PersistedStateRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records
            .get(community)
            .and_then(|members| members.get(member))
            .cloned())
    }

    async fn set(
        &self,
        community: &CommunityId,
        member: &MemberId,
        record: PersistedStateRecord,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        next.entry(community.clone())
            .or_default()
            .insert(member.clone(), record);

        // Memory only changes once the file write succeeded
        self.flush(&next).await?;
        *records = next;
        Ok(())
    }

    async fn clear(&self, community: &CommunityId, member: &MemberId) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;
        let present = records
            .get(community)
            .is_some_and(|members| members.contains_key(member));
        if !present {
            return Ok(false);
        }

        let mut next = records.clone();
        if let Some(members) = next.get_mut(community) {
            members.remove(member);
            if members.is_empty() {
                next.remove(community);
            }
        }

        self.flush(&next).await?;
        *records = next;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rejoin_types::roles;

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persisted.json");
        let g = CommunityId::from("g1");
        let m = MemberId::from("m1");
        let record = PersistedStateRecord::new()
            .with_roles(roles(["mod"]))
            .with_nickname("Al");

        {
            let store = JsonFileStateStore::open(&path).await.unwrap();
            store.set(&g, &m, record.clone()).await.unwrap();
        }

        let store = JsonFileStateStore::open(&path).await.unwrap();
        assert_eq!(store.find(&g, &m).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn clear_removes_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persisted.json");
        let g = CommunityId::from("g1");
        let m = MemberId::from("m1");

        let store = JsonFileStateStore::open(&path).await.unwrap();
        store
            .set(&g, &m, PersistedStateRecord::new().with_nickname("Al"))
            .await
            .unwrap();
        assert!(store.clear(&g, &m).await.unwrap());
        assert!(!store.clear(&g, &m).await.unwrap());

        let reopened = JsonFileStateStore::open(&path).await.unwrap();
        assert!(reopened.find(&g, &m).await.unwrap().is_none());
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), "{}");
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStateStore::open(dir.path().join("nope.json"))
            .await
            .unwrap();
        assert!(store
            .find(&"g".into(), &"m".into())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_codec_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();

        let err = JsonFileStateStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn write_failure_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("persisted.json");
        let store = JsonFileStateStore::open(&path).await.unwrap();

        // Parent directory does not exist, so the write fails
        let err = store
            .set(&"g".into(), &"m".into(), PersistedStateRecord::new().with_nickname("Al"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(store.find(&"g".into(), &"m".into()).await.unwrap().is_none());
    }
}
