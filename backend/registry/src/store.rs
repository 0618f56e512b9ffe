//! # Record Store
//!
//! Each collection is a single JSON array on disk. Mutations read the whole
//! array, change it in memory and write the whole array back.
//!
//! Mutations on one collection are serialised by a per-collection mutex, so two
//! overlapping creates inside this process can no longer drop each other's row.
//! Nothing coordinates with other processes writing the same directory, there
//! the last writer still wins.
//!
//! Writes land in a sibling `.tmp` file which is then renamed over the target,
//! so a concurrent reader sees either the old or the new array, never half of one.
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use tokio::{fs, sync::Mutex};
use tracing::debug;

use crate::error::StoreError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Centers,
    Candidates,
    Signs,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Centers,
        Collection::Candidates,
        Collection::Signs,
        Collection::Users,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Centers => "centers.json",
            Collection::Candidates => "candidates.json",
            Collection::Signs => "signs.json",
            Collection::Users => "users.json",
        }
    }
}

/// Result of a mutation closure: whether the collection must be written back.
pub enum Outcome<R> {
    Write(R),
    Skip(R),
}

pub struct RecordStore {
    root: PathBuf,
    locks: [Mutex<()>; Collection::ALL.len()],
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Default::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.file_name())
    }

    /// A collection file that does not exist yet reads as empty.
    pub async fn read_all<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, StoreError> {
        let data = match fs::read(self.path(collection)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_slice(&data)?)
    }

    pub async fn write_all<T: Serialize>(
        &self,
        collection: Collection,
        records: &[T],
    ) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).await?;

        let path = self.path(collection);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(records)?;

        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;

        debug!("Wrote {} records to {}", records.len(), path.display());

        Ok(())
    }

    /// Read-modify-write under the collection lock.
    pub async fn mutate<T, R, F>(&self, collection: Collection, f: F) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> Result<Outcome<R>, StoreError>,
    {
        let _guard = self.locks[collection as usize].lock().await;

        let mut records = self.read_all(collection).await?;

        match f(&mut records)? {
            Outcome::Write(result) => {
                self.write_all(collection, &records).await?;
                Ok(result)
            }
            Outcome::Skip(result) => Ok(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path());

        let records: Vec<Value> = store.read_all(Collection::Signs).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        std::fs::write(store.path(Collection::Users), "{not json").unwrap();

        let result: Result<Vec<Value>, _> = store.read_all(Collection::Users).await;
        assert!(matches!(result, Err(StoreError::Json(_))));
    }

    #[tokio::test]
    async fn test_write_creates_directory_and_pretty_prints() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("data");
        let store = RecordStore::new(&root);

        store
            .write_all(Collection::Centers, &[json!({"id": "1", "name": "A"})])
            .await
            .unwrap();

        let raw = std::fs::read_to_string(root.join("centers.json")).unwrap();
        assert!(raw.contains("\n  {"));
        assert!(!root.join("centers.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_skip_does_not_touch_disk() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path());

        let count = store
            .mutate(Collection::Signs, |records: &mut Vec<Value>| {
                Ok(Outcome::Skip(records.len()))
            })
            .await
            .unwrap();

        assert_eq!(count, 0);
        assert!(!store.path(Collection::Signs).exists());
    }

    #[tokio::test]
    async fn test_concurrent_mutations_keep_every_insert() {
        let dir = tempdir().unwrap();
        let store = Arc::new(RecordStore::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .mutate(Collection::Centers, move |records: &mut Vec<Value>| {
                        records.push(json!({ "id": i.to_string() }));
                        Ok(Outcome::Write(()))
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let records: Vec<Value> = store.read_all(Collection::Centers).await.unwrap();
        assert_eq!(records.len(), 16);
    }
}
