use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use tracing::{debug, instrument};

use crate::types::{Session, SessionKey};

/// In-memory store of per-chat sessions.
///
/// Sessions live for the life of the process; nothing is persisted. Guards
/// returned by this type lock one shard of the map and must not be held
/// across an `.await`.
pub struct SessionManager {
    sessions: DashMap<SessionKey, Session>,
    max_stored_turns: Option<usize>,
}

impl SessionManager {
    pub fn new(max_stored_turns: Option<usize>) -> Self {
        Self {
            sessions: DashMap::new(),
            max_stored_turns,
        }
    }

    /// Return the session for `key`, creating an ungreeted, empty one if needed.
    #[instrument(skip(self), fields(key = %key))]
    pub fn get_or_create(&self, key: SessionKey) -> RefMut<'_, SessionKey, Session> {
        let max = self.max_stored_turns;
        self.sessions.entry(key).or_insert_with(|| {
            debug!("session created");
            Session::new(key, max)
        })
    }

    /// Explicit start: the session becomes greeted with an empty history,
    /// whether or not it existed before.
    #[instrument(skip(self), fields(key = %key))]
    pub fn start(&self, key: SessionKey) -> RefMut<'_, SessionKey, Session> {
        let mut session = self.get_or_create(key);
        debug!(
            created_at = %session.created_at(),
            last_activity = %session.last_activity(),
            dropped_turns = session.len(),
            "session restarted"
        );
        session.restart();
        session
    }

    /// Snapshot of a session, if one exists.
    pub fn get(&self, key: SessionKey) -> Option<Session> {
        self.sessions.get(&key).map(|s| s.clone())
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(None)
    }
}
