//! Profile selection: decides which profile a requester sees next.
//!
//! Order of preference:
//! 1. the requester's liked queue (FIFO, each entry used once),
//! 2. the first stored profile the requester has not viewed yet,
//! 3. once everything is viewed, forget the history and restart from the
//!    first stored profile.
//!
//! Selection is deterministic; there is no randomness involved.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::SelectionError;

use super::model::{Profile, ProfileId, UserId};
use super::store::ProfileStore;

/// Per-requester selection memory.
#[derive(Debug, Default, Clone)]
pub struct SelectionState {
    /// Profiles shown since the last exhaustion reset.
    pub viewed: HashSet<ProfileId>,
    /// Profiles to surface before anything else.
    pub liked: VecDeque<Profile>,
    /// Last profile returned.
    pub current: Option<Profile>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn show(&mut self, profile: Profile) -> Profile {
        self.viewed.insert(profile.id);
        self.current = Some(profile.clone());
        profile
    }
}

/// Pick the next profile for one requester from `profiles` (insertion order).
pub fn get_next_profile(
    state: &mut SelectionState,
    profiles: &[Profile],
) -> Result<Profile, SelectionError> {
    // Liked entries skip the viewed check but are still recorded as viewed.
    if let Some(profile) = state.liked.pop_front() {
        debug!(profile_id = %profile.id, "Serving liked profile");
        return Ok(state.show(profile));
    }

    if let Some(profile) = profiles.iter().find(|p| !state.viewed.contains(&p.id)) {
        return Ok(state.show(profile.clone()));
    }

    let first = profiles.first().ok_or(SelectionError::EmptyStore)?;
    debug!(
        viewed = state.viewed.len(),
        "Every profile viewed, restarting from the first"
    );
    state.viewed.clear();
    Ok(state.show(first.clone()))
}

/// Queue `profile` for priority display. No de-duplication.
pub fn add_liked(state: &mut SelectionState, profile: Profile) {
    state.liked.push_back(profile);
}

/// Owns every requester's `SelectionState`.
///
/// Each requester's state sits behind its own mutex so concurrent requests
/// for the same requester serialize while different requesters never block
/// each other.
#[derive(Default)]
pub struct ProfileSelector {
    states: RwLock<HashMap<UserId, Arc<Mutex<SelectionState>>>>,
}

impl ProfileSelector {
    pub fn new() -> Self {
        Self::default()
    }

    async fn state_for(&self, requester: &UserId) -> Arc<Mutex<SelectionState>> {
        if let Some(state) = self.states.read().await.get(requester) {
            return Arc::clone(state);
        }
        let mut states = self.states.write().await;
        Arc::clone(states.entry(requester.clone()).or_default())
    }

    /// Next profile for `requester`, read from `store`.
    pub async fn next_profile(
        &self,
        requester: &UserId,
        store: &dyn ProfileStore,
    ) -> Result<Profile, SelectionError> {
        let state = self.state_for(requester).await;
        let mut state = state.lock().await;
        let profiles = store.list_profiles().await;
        get_next_profile(&mut state, &profiles)
    }

    /// Put `profile` at the back of `requester`'s liked queue.
    pub async fn add_liked(&self, requester: &UserId, profile: Profile) {
        let state = self.state_for(requester).await;
        add_liked(&mut *state.lock().await, profile);
    }

    /// The profile most recently shown to `requester`, if any.
    pub async fn current(&self, requester: &UserId) -> Option<Profile> {
        let state = self.state_for(requester).await;
        let state = state.lock().await;
        state.current.clone()
    }

    /// Snapshot of `requester`'s selection state.
    pub async fn snapshot(&self, requester: &UserId) -> SelectionState {
        let state = self.state_for(requester).await;
        let state = state.lock().await;
        state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::model::{Gender, ProfileDraft};
    use crate::profile::store::InMemoryProfileStore;

    fn profile(id: u64, name: &str) -> Profile {
        let mut d = ProfileDraft::new(UserId::from(format!("owner-{id}")), None);
        d.display_name = Some(name.into());
        d.gender = Some(Gender::Other);
        d.age = Some(20);
        d.city = Some("Omsk".into());
        d.photo = Some(format!("photo-{id}"));
        d.finalize(ProfileId(id)).unwrap()
    }

    fn abc() -> Vec<Profile> {
        vec![profile(0, "A"), profile(1, "B"), profile(2, "C")]
    }

    fn next_name(state: &mut SelectionState, profiles: &[Profile]) -> String {
        get_next_profile(state, profiles).unwrap().display_name
    }

    #[test]
    fn round_robin_then_restart_from_first() {
        let profiles = abc();
        let mut state = SelectionState::new();
        assert_eq!(next_name(&mut state, &profiles), "A");
        assert_eq!(next_name(&mut state, &profiles), "B");
        assert_eq!(next_name(&mut state, &profiles), "C");
        assert_eq!(state.viewed.len(), 3);

        assert_eq!(next_name(&mut state, &profiles), "A");
        assert_eq!(state.viewed.len(), 1);
        assert!(state.viewed.contains(&ProfileId(0)));
    }

    #[test]
    fn liked_queue_drains_first() {
        let profiles = abc();
        let mut state = SelectionState::new();
        add_liked(&mut state, profiles[1].clone());

        assert_eq!(next_name(&mut state, &profiles), "B");
        assert!(state.liked.is_empty());
        assert_eq!(state.viewed, HashSet::from([ProfileId(1)]));

        // Falls through to store order, skipping the viewed B.
        assert_eq!(next_name(&mut state, &profiles), "A");
        assert_eq!(next_name(&mut state, &profiles), "C");
    }

    #[test]
    fn liked_profile_bypasses_viewed_check() {
        let profiles = abc();
        let mut state = SelectionState::new();
        assert_eq!(next_name(&mut state, &profiles), "A");

        add_liked(&mut state, profiles[0].clone());
        assert_eq!(next_name(&mut state, &profiles), "A");
    }

    #[test]
    fn liked_queue_keeps_duplicates_in_fifo_order() {
        let profiles = abc();
        let mut state = SelectionState::new();
        add_liked(&mut state, profiles[2].clone());
        add_liked(&mut state, profiles[0].clone());
        add_liked(&mut state, profiles[2].clone());

        assert_eq!(next_name(&mut state, &profiles), "C");
        assert_eq!(next_name(&mut state, &profiles), "A");
        assert_eq!(next_name(&mut state, &profiles), "C");
        assert!(state.liked.is_empty());
    }

    #[test]
    fn never_repeats_within_a_cycle() {
        let profiles: Vec<Profile> = (0..6).map(|i| profile(i, "P")).collect();
        let mut state = SelectionState::new();
        let mut seen = HashSet::new();
        for _ in 0..profiles.len() {
            let p = get_next_profile(&mut state, &profiles).unwrap();
            assert!(seen.insert(p.id), "profile {} shown twice", p.id);
        }
    }

    #[test]
    fn current_tracks_last_returned() {
        let profiles = abc();
        let mut state = SelectionState::new();
        assert!(state.current.is_none());
        get_next_profile(&mut state, &profiles).unwrap();
        get_next_profile(&mut state, &profiles).unwrap();
        assert_eq!(state.current.as_ref().unwrap().display_name, "B");
    }

    #[test]
    fn empty_store_is_an_error() {
        let mut state = SelectionState::new();
        assert_eq!(
            get_next_profile(&mut state, &[]),
            Err(SelectionError::EmptyStore)
        );
    }

    #[test]
    fn liked_profile_served_even_with_empty_store() {
        let mut state = SelectionState::new();
        add_liked(&mut state, profile(9, "Z"));
        assert_eq!(next_name(&mut state, &[]), "Z");
        assert_eq!(
            get_next_profile(&mut state, &[]),
            Err(SelectionError::EmptyStore)
        );
    }

    #[tokio::test]
    async fn selector_keeps_requesters_independent() {
        let store = InMemoryProfileStore::new();
        for name in ["A", "B"] {
            let mut d = ProfileDraft::new(UserId::from(name), None);
            d.display_name = Some(name.into());
            d.gender = Some(Gender::Female);
            d.age = Some(25);
            d.city = Some("Kazan".into());
            d.photo = Some("p".into());
            store.add_profile(d).await.unwrap();
        }

        let selector = ProfileSelector::new();
        let r1 = UserId::from("r1");
        let r2 = UserId::from("r2");

        let a = selector.next_profile(&r1, &store).await.unwrap();
        assert_eq!(a.display_name, "A");
        let b = selector.next_profile(&r1, &store).await.unwrap();
        assert_eq!(b.display_name, "B");

        // r2 starts its own cycle.
        let first = selector.next_profile(&r2, &store).await.unwrap();
        assert_eq!(first.display_name, "A");

        selector.add_liked(&r2, b.clone()).await;
        assert_eq!(selector.next_profile(&r2, &store).await.unwrap(), b);
        assert_eq!(selector.current(&r2).await, Some(b));
        assert_eq!(selector.snapshot(&r1).await.viewed.len(), 2);
    }

    #[tokio::test]
    async fn selector_empty_store() {
        let store = InMemoryProfileStore::new();
        let selector = ProfileSelector::new();
        let err = selector
            .next_profile(&UserId::from("r"), &store)
            .await
            .unwrap_err();
        assert_eq!(err, SelectionError::EmptyStore);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_pop_each_liked_entry_once() {
        const N: u64 = 16;
        let store = Arc::new(InMemoryProfileStore::new());
        let mut d = ProfileDraft::new(UserId::from("stored"), None);
        d.display_name = Some("S".into());
        d.gender = Some(Gender::Male);
        d.age = Some(30);
        d.city = Some("Tula".into());
        d.photo = Some("p".into());
        store.add_profile(d).await.unwrap();

        let selector = Arc::new(ProfileSelector::new());
        let requester = UserId::from("r");
        for i in 0..N {
            selector.add_liked(&requester, profile(100 + i, "L")).await;
        }

        let mut handles = Vec::new();
        for _ in 0..N {
            let selector = Arc::clone(&selector);
            let store = Arc::clone(&store);
            let requester = requester.clone();
            handles.push(tokio::spawn(async move {
                selector
                    .next_profile(&requester, &*store)
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
        assert_eq!(ids, (100..100 + N).collect::<Vec<u64>>());
        assert!(selector.snapshot(&requester).await.liked.is_empty());
    }
}
