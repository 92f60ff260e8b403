//! In-memory session store.
//!
//! The store only maps ids to sessions. Each session sits behind its own
//! mutex so that every mutation on it runs to completion before the next.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use super::types::{Session, SessionId};

/// Error type for session store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Session already exists: {0}")]
    Duplicate(SessionId),
}

/// Result type for session store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A session guarded for exclusive mutation.
pub type SharedSession = Arc<Mutex<Session>>;

/// Shared reference to a session store
pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Lock a shared session, mapping poisoning to [`StoreError::LockPoisoned`].
pub fn lock_session(session: &SharedSession) -> StoreResult<MutexGuard<'_, Session>> {
    session.lock().map_err(|_| StoreError::LockPoisoned)
}

/// Mapping from session id to session.
///
/// The negotiation and phase logic only ever see a `&mut Session`, so a
/// persistent backend can implement this trait without touching them.
pub trait SessionStore: Send + Sync {
    /// Register a new session. Ids are never reused.
    fn insert(&self, session: Session) -> StoreResult<SharedSession>;

    fn get(&self, session_id: &str) -> StoreResult<Option<SharedSession>>;

    fn ids(&self) -> StoreResult<Vec<SessionId>>;

    fn len(&self) -> StoreResult<usize> {
        Ok(self.ids()?.len())
    }
}

/// Process-lifetime store, empty on startup.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedSessionStore {
        Arc::new(self)
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, session: Session) -> StoreResult<SharedSession> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::LockPoisoned)?;
        if sessions.contains_key(&session.id) {
            return Err(StoreError::Duplicate(session.id));
        }
        let id = session.id.clone();
        let shared = Arc::new(Mutex::new(session));
        sessions.insert(id, Arc::clone(&shared));
        Ok(shared)
    }

    fn get(&self, session_id: &str) -> StoreResult<Option<SharedSession>> {
        let sessions = self.sessions.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(sessions.get(session_id).cloned())
    }

    fn ids(&self) -> StoreResult<Vec<SessionId>> {
        let sessions = self.sessions.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut ids: Vec<_> = sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn len(&self) -> StoreResult<usize> {
        let sessions = self.sessions.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(sessions.len())
    }
}
