//! Which names are online, and through which connection.
//!
//! The registry lives as long as the listener and is never persisted. A name
//! is marked online by a successful `register` or `login` and released when
//! the connection that claimed it closes. A later login from another
//! connection takes the name over.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

pub type SessionId = Uuid;

#[derive(Default)]
struct Inner {
    /// name -> session currently holding it
    online: BTreeMap<String, SessionId>,
    /// session -> peer label, for every open connection
    sessions: HashMap<SessionId, String>,
}

#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn open_session(&self, peer: &str) -> SessionId {
        let id = Uuid::new_v4();
        self.inner().sessions.insert(id, peer.to_string());
        id
    }

    pub fn mark_online(&self, session: SessionId, name: &str) {
        self.inner().online.insert(name.to_string(), session);
    }

    /// Forget the session and release every name it still holds. Returns the
    /// released names.
    pub fn close_session(&self, session: SessionId) -> Vec<String> {
        let mut inner = self.inner();
        inner.sessions.remove(&session);
        let released: Vec<String> = inner
            .online
            .iter()
            .filter(|(_, holder)| **holder == session)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &released {
            inner.online.remove(name);
        }
        released
    }

    /// Online names in name order.
    pub fn online(&self) -> Vec<String> {
        self.inner().online.keys().cloned().collect()
    }

    pub fn is_online(&self, name: &str) -> bool {
        self.inner().online.contains_key(name)
    }

    pub fn session_count(&self) -> usize {
        self.inner().sessions.len()
    }
}
