//! Profile store: holds completed profiles and hands out their ids.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::RegistrationError;

use super::model::{Profile, ProfileDraft, ProfileId, UserId};

/// Backend-agnostic profile storage.
///
/// Profiles are append-only: there is no update or delete.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Finalize a draft under the next sequential id and append it.
    ///
    /// Fails without consuming an id if the draft is incomplete.
    async fn add_profile(&self, draft: ProfileDraft) -> Result<Profile, RegistrationError>;

    /// All profiles in insertion order.
    async fn list_profiles(&self) -> Vec<Profile>;

    /// Look up the profile owned by an external user.
    async fn find_by_owner(&self, owner: &UserId) -> Option<Profile>;
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    profiles: Vec<Profile>,
}

/// In-memory store. Append and counter increment share one write lock.
#[derive(Default)]
pub struct InMemoryProfileStore {
    inner: RwLock<Inner>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn add_profile(&self, draft: ProfileDraft) -> Result<Profile, RegistrationError> {
        let mut inner = self.inner.write().await;
        let id = ProfileId(inner.next_id);
        let profile = draft.finalize(id)?;
        inner.profiles.push(profile.clone());
        inner.next_id += 1;

        info!(profile_id = %id, owner = %profile.owner, "Profile added to store");
        Ok(profile)
    }

    async fn list_profiles(&self) -> Vec<Profile> {
        self.inner.read().await.profiles.clone()
    }

    async fn find_by_owner(&self, owner: &UserId) -> Option<Profile> {
        self.inner
            .read()
            .await
            .profiles
            .iter()
            .find(|p| &p.owner == owner)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::profile::model::Gender;

    fn draft(owner: &str, name: &str) -> ProfileDraft {
        let mut d = ProfileDraft::new(UserId::from(owner), None);
        d.display_name = Some(name.into());
        d.gender = Some(Gender::Male);
        d.age = Some(30);
        d.city = Some("Perm".into());
        d.photo = Some(format!("photo-{owner}"));
        d
    }

    #[tokio::test]
    async fn ids_are_sequential_from_zero() {
        let store = InMemoryProfileStore::new();
        let a = store.add_profile(draft("1", "A")).await.unwrap();
        let b = store.add_profile(draft("2", "B")).await.unwrap();
        let c = store.add_profile(draft("3", "C")).await.unwrap();
        assert_eq!(a.id, ProfileId(0));
        assert_eq!(b.id, ProfileId(1));
        assert_eq!(c.id, ProfileId(2));
    }

    #[tokio::test]
    async fn listing_keeps_insertion_order() {
        let store = InMemoryProfileStore::new();
        for (owner, name) in [("1", "A"), ("2", "B"), ("3", "C")] {
            store.add_profile(draft(owner, name)).await.unwrap();
        }
        let names: Vec<String> = store
            .list_profiles()
            .await
            .into_iter()
            .map(|p| p.display_name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn incomplete_draft_does_not_consume_an_id() {
        let store = InMemoryProfileStore::new();
        let mut bad = draft("1", "A");
        bad.photo = None;
        assert!(store.add_profile(bad).await.is_err());
        assert!(store.list_profiles().await.is_empty());

        let ok = store.add_profile(draft("1", "A")).await.unwrap();
        assert_eq!(ok.id, ProfileId(0));
    }

    #[tokio::test]
    async fn lookup_by_owner() {
        let store = InMemoryProfileStore::new();
        store.add_profile(draft("10", "A")).await.unwrap();
        store.add_profile(draft("20", "B")).await.unwrap();

        assert_eq!(
            store.find_by_owner(&UserId::from("20")).await.unwrap().display_name,
            "B"
        );
        assert_eq!(
            store.find_by_owner(&UserId::from("10")).await.unwrap().id,
            ProfileId(0)
        );
        assert!(store.find_by_owner(&UserId::from("30")).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_adds_never_duplicate_ids() {
        let store = Arc::new(InMemoryProfileStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .add_profile(draft(&i.to_string(), "X"))
                    .await
                    .unwrap()
                    .id
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap().0);
        }
        ids.sort_unstable();
        assert_eq!(ids, (0..32).collect::<Vec<u64>>());
    }
}
