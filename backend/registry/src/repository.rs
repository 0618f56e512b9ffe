use std::{collections::HashSet, marker::PhantomData, sync::Arc};

use tracing::info;
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{Candidate, ElectionCenter, Record, Sign, User, UserDraft},
    store::{Outcome, RecordStore},
};

/// Typed CRUD over one collection of the [`RecordStore`].
pub struct Repository<T> {
    store: Arc<RecordStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Repository<T> {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub async fn list(&self) -> Result<Vec<T>, StoreError> {
        self.store.read_all(T::COLLECTION).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(self.list().await?.into_iter().find(|record| record.id() == id))
    }

    pub async fn create(&self, draft: T::Draft) -> Result<T, StoreError> {
        self.create_checked(draft, |_| Ok(())).await
    }

    /// `check` sees the snapshot the new record will be appended to.
    pub async fn create_checked<C>(&self, draft: T::Draft, check: C) -> Result<T, StoreError>
    where
        C: FnOnce(&[T]) -> Result<(), StoreError> + Send,
    {
        let record = self
            .store
            .mutate(T::COLLECTION, move |records: &mut Vec<T>| {
                check(records)?;

                let record = T::from_draft(fresh_id(records), draft);
                records.push(record.clone());

                Ok(Outcome::Write(record))
            })
            .await?;

        info!("Created {:?} record {}", T::COLLECTION, record.id());

        Ok(record)
    }

    /// `None` when no record has this id, the collection is left untouched.
    pub async fn update(&self, id: &str, patch: T::Patch) -> Result<Option<T>, StoreError> {
        self.store
            .mutate(T::COLLECTION, move |records: &mut Vec<T>| {
                match records.iter_mut().find(|record| record.id() == id) {
                    Some(record) => {
                        record.apply(patch);
                        Ok(Outcome::Write(Some(record.clone())))
                    }
                    None => Ok(Outcome::Skip(None)),
                }
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .store
            .mutate(T::COLLECTION, move |records: &mut Vec<T>| {
                let before = records.len();
                records.retain(|record| record.id() != id);

                if records.len() == before {
                    Ok(Outcome::Skip(false))
                } else {
                    Ok(Outcome::Write(true))
                }
            })
            .await?;

        if removed {
            info!("Deleted {:?} record {id}", T::COLLECTION);
        }

        Ok(removed)
    }

    /// Appends records under their existing ids, skipping ids already present.
    /// Returns `(inserted, skipped)`.
    pub async fn import(&self, incoming: Vec<T>) -> Result<(usize, usize), StoreError> {
        self.store
            .mutate(T::COLLECTION, move |records: &mut Vec<T>| {
                let mut seen: HashSet<String> =
                    records.iter().map(|record| record.id().to_string()).collect();
                let total = incoming.len();
                let mut inserted = 0;

                for record in incoming {
                    if seen.insert(record.id().to_string()) {
                        records.push(record);
                        inserted += 1;
                    }
                }

                let counts = (inserted, total - inserted);

                if inserted == 0 {
                    Ok(Outcome::Skip(counts))
                } else {
                    Ok(Outcome::Write(counts))
                }
            })
            .await
    }
}

impl Repository<ElectionCenter> {
    /// Case-insensitive match on name or area, a blank query returns everything.
    pub async fn search(&self, query: &str) -> Result<Vec<ElectionCenter>, StoreError> {
        let needle = query.trim().to_lowercase();
        let centers = self.list().await?;

        if needle.is_empty() {
            return Ok(centers);
        }

        Ok(centers
            .into_iter()
            .filter(|center| center.matches(&needle))
            .collect())
    }
}

impl Repository<Candidate> {
    pub async fn list_by_center(&self, center_id: &str) -> Result<Vec<Candidate>, StoreError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|candidate| candidate.assigned_center_id == center_id)
            .collect())
    }
}

impl Repository<User> {
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|user| user.username == username))
    }

    /// Fails with [`StoreError::DuplicateUsername`] instead of appending a second account.
    pub async fn create_user(&self, draft: UserDraft) -> Result<User, StoreError> {
        let username = draft.username.clone();

        self.create_checked(draft, move |users| {
            if users.iter().any(|user| user.username == username) {
                return Err(StoreError::DuplicateUsername(username));
            }

            Ok(())
        })
        .await
    }
}

/// The four repositories over one data directory.
#[derive(Clone)]
pub struct Registry {
    pub centers: Repository<ElectionCenter>,
    pub candidates: Repository<Candidate>,
    pub signs: Repository<Sign>,
    pub users: Repository<User>,
}

impl Registry {
    pub fn new(store: RecordStore) -> Self {
        let store = Arc::new(store);

        Self {
            centers: Repository::new(store.clone()),
            candidates: Repository::new(store.clone()),
            signs: Repository::new(store.clone()),
            users: Repository::new(store),
        }
    }
}

fn fresh_id<T: Record>(records: &[T]) -> String {
    loop {
        let id = Uuid::new_v4().to_string();

        if records.iter().all(|record| record.id() != id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tempfile::{TempDir, tempdir};

    use super::*;
    use crate::models::{CandidateDraft, CenterDraft, CenterPatch, Role, SignDraft};

    fn registry() -> (TempDir, Registry) {
        let dir = tempdir().unwrap();
        let registry = Registry::new(RecordStore::new(dir.path()));

        (dir, registry)
    }

    fn center(name: &str, area: &str) -> CenterDraft {
        CenterDraft {
            name: name.to_string(),
            area: area.to_string(),
            total_voter: 100,
            ..Default::default()
        }
    }

    fn admin(username: &str) -> UserDraft {
        UserDraft {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Admin,
        }
    }

    #[tokio::test]
    async fn test_created_ids_are_unique() {
        let (_dir, registry) = registry();

        for i in 0..20 {
            registry
                .centers
                .create(center(&format!("Center {i}"), "Dhaka"))
                .await
                .unwrap();
        }

        let centers = registry.centers.list().await.unwrap();
        let ids: HashSet<_> = centers.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn test_update_missing_id_leaves_collection_unchanged() {
        let (_dir, registry) = registry();
        registry.centers.create(center("A", "North")).await.unwrap();

        let before = registry.centers.list().await.unwrap();
        let updated = registry
            .centers
            .update(
                "nope",
                CenterPatch {
                    name: Some("B".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let after = registry.centers.list().await.unwrap();

        assert!(updated.is_none());
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let (_dir, registry) = registry();
        let created = registry.centers.create(center("A", "North")).await.unwrap();

        let updated = registry
            .centers
            .update(
                &created.id,
                CenterPatch {
                    area: Some("South".into()),
                    male_voter: Some(40),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "A");
        assert_eq!(updated.area, "South");
        assert_eq!(updated.total_voter, 100);
        assert_eq!(updated.male_voter, 40);
        assert_eq!(registry.centers.get_by_id(&created.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let (_dir, registry) = registry();
        let created = registry.centers.create(center("A", "North")).await.unwrap();

        assert!(registry.centers.delete(&created.id).await.unwrap());
        assert!(registry.centers.get_by_id(&created.id).await.unwrap().is_none());
        assert!(!registry.centers.delete(&created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let (_dir, registry) = registry();
        registry.users.create_user(admin("rahim")).await.unwrap();

        let result = registry.users.create_user(admin("rahim")).await;

        assert!(matches!(result, Err(StoreError::DuplicateUsername(name)) if name == "rahim"));
        assert_eq!(registry.users.list().await.unwrap().len(), 1);
        assert!(registry.users.get_by_username("rahim").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_candidate_without_photo_gets_avatar() {
        let (_dir, registry) = registry();

        let candidate = registry
            .candidates
            .create(CandidateDraft::new("Jane Doe", "Independent", Some(String::new()), "c1", None))
            .await
            .unwrap();

        assert!(candidate.photo_url.ends_with("?name=Jane+Doe"));
        assert_eq!(candidate.assigned_center_id, "c1");
        assert_eq!(candidate.sign_id, None);
    }

    #[tokio::test]
    async fn test_deleting_sign_keeps_dangling_reference() {
        let (_dir, registry) = registry();
        let sign = registry
            .signs
            .create(SignDraft {
                name: "Boat".into(),
                image_url: "boat.png".into(),
            })
            .await
            .unwrap();
        let candidate = registry
            .candidates
            .create(CandidateDraft::new("Karim", "Party", None, "c1", Some(sign.id.clone())))
            .await
            .unwrap();

        assert!(registry.signs.delete(&sign.id).await.unwrap());

        let stored = registry.candidates.get_by_id(&candidate.id).await.unwrap();
        assert_eq!(stored, Some(candidate));
    }

    #[tokio::test]
    async fn test_deleting_center_leaves_candidates() {
        let (_dir, registry) = registry();
        let c = registry.centers.create(center("A", "North")).await.unwrap();
        registry
            .candidates
            .create(CandidateDraft::new("Karim", "Party", None, c.id.clone(), None))
            .await
            .unwrap();

        registry.centers.delete(&c.id).await.unwrap();

        assert_eq!(registry.candidates.list_by_center(&c.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_matches_name_or_area() {
        let (_dir, registry) = registry();
        registry.centers.create(center("Mirpur High School", "Dhaka-14")).await.unwrap();
        registry.centers.create(center("Agrabad Primary", "Chattogram")).await.unwrap();

        assert_eq!(registry.centers.search("mirpur").await.unwrap().len(), 1);
        assert_eq!(registry.centers.search("CHATTO").await.unwrap().len(), 1);
        assert_eq!(registry.centers.search("  ").await.unwrap().len(), 2);
        assert!(registry.centers.search("sylhet").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_skips_known_ids() {
        let (_dir, registry) = registry();
        let existing = registry.centers.create(center("A", "North")).await.unwrap();

        let mut fresh = existing.clone();
        fresh.id = "42".into();

        let (inserted, skipped) = registry
            .centers
            .import(vec![existing.clone(), fresh.clone(), fresh])
            .await
            .unwrap();

        assert_eq!((inserted, skipped), (1, 2));
        assert_eq!(registry.centers.list().await.unwrap().len(), 2);
    }
}
