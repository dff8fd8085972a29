//! Registration sessions: per-user in-progress profiles.
//!
//! Sessions are created on first contact and removed when the form
//! completes. Nothing expires them: a user who walks away mid-form keeps a
//! session for the lifetime of the process. `stale_sessions` exists so an
//! operator can see how many there are.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::profile::{ProfileDraft, UserId};

use super::state::RegistrationStep;

/// One user's progress through the registration form.
#[derive(Debug, Clone)]
pub struct RegistrationSession {
    pub draft: ProfileDraft,
    pub step: RegistrationStep,
    pub started_at: DateTime<Utc>,
}

impl RegistrationSession {
    pub fn new(owner: UserId, display_handle: Option<String>) -> Self {
        Self {
            draft: ProfileDraft::new(owner, display_handle),
            step: RegistrationStep::FIRST,
            started_at: Utc::now(),
        }
    }

    /// Move to the next step. Returns an error if already at the terminal step.
    pub fn advance(&mut self) -> Result<RegistrationStep, String> {
        let next = self
            .step
            .next()
            .ok_or_else(|| "Already at terminal step".to_string())?;
        if !self.step.can_transition_to(next) {
            return Err(format!("Cannot transition from {} to {}", self.step, next));
        }
        self.step = next;
        Ok(next)
    }

    pub fn is_completed(&self) -> bool {
        self.step.is_terminal()
    }
}

/// Exclusive access to one user's session.
pub type SessionGuard = OwnedMutexGuard<RegistrationSession>;

/// Result of looking a user up in the session table.
#[derive(Debug)]
pub enum SessionLookup {
    Found(SessionGuard),
    NotFound,
}

/// Keyed table of live sessions, at most one per user.
///
/// The table lock is held only to find, insert, or remove an entry. Each
/// session has its own lock, so a slow event for one user never holds up
/// another's.
#[derive(Default)]
pub struct SessionTable {
    sessions: Mutex<HashMap<UserId, Arc<Mutex<RegistrationSession>>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the session for `user_id`, if one exists.
    pub async fn lookup(&self, user_id: &UserId) -> SessionLookup {
        let entry = self.sessions.lock().await.get(user_id).cloned();
        match entry {
            Some(session) => SessionLookup::Found(session.lock_owned().await),
            None => SessionLookup::NotFound,
        }
    }

    /// Create a session unless one exists. Returns whether one was created.
    pub async fn start(&self, user_id: &UserId, display_handle: Option<String>) -> bool {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(user_id) {
            return false;
        }
        let session = RegistrationSession::new(user_id.clone(), display_handle);
        sessions.insert(user_id.clone(), Arc::new(Mutex::new(session)));
        true
    }

    pub async fn remove(&self, user_id: &UserId) -> bool {
        self.sessions.lock().await.remove(user_id).is_some()
    }

    pub async fn contains(&self, user_id: &UserId) -> bool {
        self.sessions.lock().await.contains_key(user_id)
    }

    /// Current step for `user_id`, if registering.
    pub async fn step_of(&self, user_id: &UserId) -> Option<RegistrationStep> {
        self.get(user_id).await.map(|s| s.step)
    }

    /// Copy of the session for `user_id`, if registering.
    pub async fn get(&self, user_id: &UserId) -> Option<RegistrationSession> {
        match self.lookup(user_id).await {
            SessionLookup::Found(session) => Some((*session).clone()),
            SessionLookup::NotFound => None,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Users whose session started more than `older_than` ago.
    pub async fn stale_sessions(&self, older_than: Duration) -> Vec<UserId> {
        let cutoff = Utc::now() - older_than;
        let entries: Vec<(UserId, Arc<Mutex<RegistrationSession>>)> = self
            .sessions
            .lock()
            .await
            .iter()
            .map(|(id, s)| (id.clone(), Arc::clone(s)))
            .collect();

        let mut stale = Vec::new();
        for (id, session) in entries {
            if session.lock().await.started_at < cutoff {
                stale.push(id);
            }
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_advance_walks_all_steps() {
        let mut session = RegistrationSession::new(UserId::from("u"), None);
        assert_eq!(session.step, RegistrationStep::Name);
        for _ in 0..5 {
            session.advance().unwrap();
        }
        assert!(session.is_completed());
        assert!(session.advance().is_err());
    }

    #[tokio::test]
    async fn start_is_idempotent_per_user() {
        let table = SessionTable::new();
        let user = UserId::from("u1");
        assert!(table.start(&user, Some("first".into())).await);
        match table.lookup(&user).await {
            SessionLookup::Found(mut session) => {
                session.advance().unwrap();
            }
            SessionLookup::NotFound => panic!("session should exist"),
        }

        assert!(!table.start(&user, Some("second".into())).await);
        let again = table.get(&user).await.unwrap();
        assert_eq!(again.step, RegistrationStep::Gender);
        assert_eq!(again.draft.display_handle.as_deref(), Some("first"));
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn lookup_and_remove() {
        let table = SessionTable::new();
        let user = UserId::from("u1");
        assert!(matches!(table.lookup(&user).await, SessionLookup::NotFound));
        table.start(&user, None).await;
        assert!(matches!(table.lookup(&user).await, SessionLookup::Found(_)));
        assert!(table.remove(&user).await);
        assert!(!table.remove(&user).await);
        assert!(matches!(table.lookup(&user).await, SessionLookup::NotFound));
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn held_session_does_not_block_other_users() {
        let table = SessionTable::new();
        let (a, b) = (UserId::from("a"), UserId::from("b"));
        table.start(&a, None).await;
        table.start(&b, None).await;

        let _held = match table.lookup(&a).await {
            SessionLookup::Found(session) => session,
            SessionLookup::NotFound => panic!("session should exist"),
        };
        let other = tokio::time::timeout(std::time::Duration::from_secs(1), table.lookup(&b)).await;
        assert!(matches!(other, Ok(SessionLookup::Found(_))));
        assert!(table.contains(&a).await);
    }

    #[tokio::test]
    async fn stale_sessions_filters_by_age() {
        let table = SessionTable::new();
        table.start(&UserId::from("fresh"), None).await;
        table.start(&UserId::from("old"), None).await;
        if let SessionLookup::Found(mut session) = table.lookup(&UserId::from("old")).await {
            session.started_at = Utc::now() - Duration::hours(48);
        }
        let stale = table.stale_sessions(Duration::hours(24)).await;
        assert_eq!(stale, vec![UserId::from("old")]);
        assert_eq!(table.step_of(&UserId::from("fresh")).await, Some(RegistrationStep::Name));
        assert!(table.get(&UserId::from("nobody")).await.is_none());
    }
}
