//! Per-user session registry
//!
//! Sessions never share an index or a conversation; each key owns exactly
//! one [`SessionController`].

use std::collections::HashMap;

use tracing::debug;
use vizrag_core::SessionKey;

use crate::session::SessionController;

type SessionFactory = Box<dyn Fn() -> SessionController + Send + Sync>;

pub struct SessionRegistry {
    factory: SessionFactory,
    sessions: HashMap<SessionKey, SessionController>,
}

impl SessionRegistry {
    /// `factory` builds a fresh, empty controller for every new session
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> SessionController + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            sessions: HashMap::new(),
        }
    }

    pub fn create(&mut self) -> SessionKey {
        let key = SessionKey::new();
        self.sessions.insert(key, (self.factory)());
        debug!(session = %key, "session created");
        key
    }

    pub fn get(&self, key: &SessionKey) -> Option<&SessionController> {
        self.sessions.get(key)
    }

    pub fn get_mut(&mut self, key: &SessionKey) -> Option<&mut SessionController> {
        self.sessions.get_mut(key)
    }

    /// Drop a session together with its index
    pub fn remove(&mut self, key: &SessionKey) -> Option<SessionController> {
        let removed = self.sessions.remove(key);
        if removed.is_some() {
            debug!(session = %key, "session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
