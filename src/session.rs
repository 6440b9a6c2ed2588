//! Session store: in-memory drafts keyed by user id.
//!
//! Drafts live only in process memory. There is no expiry: an abandoned
//! draft stays until the user finalizes or the process restarts.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::scoring::{SessionDraft, Selection};

/// Where a user is in the daily flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No draft, or a draft with nothing picked yet.
    Idle,
    /// A draft exists with at least one selection.
    Selecting,
}

/// Per-user drafts behind an async lock.
#[derive(Default)]
pub struct SessionStore {
    drafts: RwLock<HashMap<i64, SessionDraft>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the user's draft, creating a zeroed one if none exists.
    pub async fn get_or_create(&self, user_id: i64) -> SessionDraft {
        let mut drafts = self.drafts.write().await;
        *drafts.entry(user_id).or_insert_with(|| {
            debug!(user_id, "Opened new draft");
            SessionDraft::default()
        })
    }

    /// Apply a selection to the user's draft and return the updated draft.
    pub async fn set_category(&self, user_id: i64, selection: Selection) -> SessionDraft {
        let mut drafts = self.drafts.write().await;
        let draft = drafts.entry(user_id).or_default();
        draft.set(selection);
        *draft
    }

    /// The user's draft without creating one.
    pub async fn peek(&self, user_id: i64) -> Option<SessionDraft> {
        self.drafts.read().await.get(&user_id).copied()
    }

    /// Remove and return the user's draft. Absent drafts yield the zero draft.
    pub async fn pop(&self, user_id: i64) -> SessionDraft {
        self.drafts
            .write()
            .await
            .remove(&user_id)
            .unwrap_or_default()
    }

    /// `Selecting` once at least one category is picked.
    pub async fn phase(&self, user_id: i64) -> SessionPhase {
        match self.drafts.read().await.get(&user_id) {
            Some(draft) if draft.chosen_count() > 0 => SessionPhase::Selecting,
            _ => SessionPhase::Idle,
        }
    }

    /// Number of open drafts.
    pub async fn len(&self) -> usize {
        self.drafts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.drafts.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{Category, SleepOption, WorkoutOption};

    #[tokio::test]
    async fn get_or_create_returns_zero_draft() {
        let store = SessionStore::new();
        assert_eq!(store.phase(1).await, SessionPhase::Idle);

        let draft = store.get_or_create(1).await;
        assert_eq!(draft, SessionDraft::default());
        assert_eq!(store.len().await, 1);
        // An empty draft is not a selection yet.
        assert_eq!(store.phase(1).await, SessionPhase::Idle);

        store
            .set_category(1, Selection::Sleep(SleepOption::SevenPlus))
            .await;
        assert_eq!(store.phase(1).await, SessionPhase::Selecting);
    }

    #[tokio::test]
    async fn set_category_overwrites() {
        let store = SessionStore::new();
        store
            .set_category(7, Selection::Sleep(SleepOption::SevenPlus))
            .await;
        let draft = store
            .set_category(7, Selection::Sleep(SleepOption::SixToSeven))
            .await;

        assert_eq!(draft.score(Category::Sleep), 15);
        assert_eq!(store.get_or_create(7).await, draft);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = SessionStore::new();
        store
            .set_category(1, Selection::Workout(WorkoutOption::Full))
            .await;
        store
            .set_category(2, Selection::Workout(WorkoutOption::Short))
            .await;

        assert_eq!(store.peek(1).await.unwrap().total(), 25);
        assert_eq!(store.peek(2).await.unwrap().total(), 12);
        assert!(store.peek(3).await.is_none());
    }

    #[tokio::test]
    async fn pop_removes_and_defaults() {
        let store = SessionStore::new();
        store
            .set_category(5, Selection::Sleep(SleepOption::SevenPlus))
            .await;

        let popped = store.pop(5).await;
        assert_eq!(popped.total(), 30);
        assert_eq!(store.phase(5).await, SessionPhase::Idle);

        let again = store.pop(5).await;
        assert_eq!(again, SessionDraft::default());
        assert!(store.is_empty().await);
    }
}
