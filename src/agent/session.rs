//! Per-identity conversation state.

use super::transcript::Transcript;
use crate::tools::TodoList;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Sessions kept when no capacity is given.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// One user's conversation: transcript and task list.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    /// Identity the session belongs to.
    pub owner: String,
    pub transcript: Transcript,
    pub todo: TodoList,
}

impl Session {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            transcript: Transcript::new(),
            todo: TodoList::new(),
        }
    }

    /// Forget the conversation. The task list is kept.
    pub fn reset(&mut self) {
        self.transcript.clear();
    }
}

#[derive(Debug)]
struct Entry {
    session: Arc<Mutex<Session>>,
    last_used: Instant,
}

/// Sessions keyed by identity, bounded by a capacity.
///
/// Each session sits behind its own mutex, so a user's turns run one at a
/// time while different users proceed concurrently. When the store is full
/// the least recently used session is dropped.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding at most `capacity` sessions (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// The session for `owner`, created on first use.
    pub async fn get_or_create(&self, owner: &str) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        if let Some(entry) = sessions.get_mut(owner) {
            entry.last_used = now;
            return entry.session.clone();
        }

        if sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                debug!("Session store full, dropping session for {}", key);
                sessions.remove(&key);
            }
        }

        debug!("Creating session for {}", owner);
        let session = Arc::new(Mutex::new(Session::new(owner)));
        sessions.insert(
            owner.to_string(),
            Entry {
                session: session.clone(),
                last_used: now,
            },
        );
        session
    }

    /// Clear the transcript of `owner`'s session. Returns false if there is none.
    pub async fn reset(&self, owner: &str) -> bool {
        let session = match self.sessions.lock().await.get(owner) {
            Some(entry) => entry.session.clone(),
            None => return false,
        };
        session.lock().await.reset();
        true
    }

    pub async fn remove(&self, owner: &str) -> bool {
        self.sessions.lock().await.remove(owner).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
