//! In-memory registry of live chat sessions.

use crate::models::ChatSession;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Sessions keyed by id. Each entry carries its own lock so at most one
/// turn runs against a given session at a time; nothing is shared between
/// sessions.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, Arc<Mutex<ChatSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh session and return a snapshot of its initial state.
    pub fn create(&self) -> ChatSession {
        let session = ChatSession::new();
        let snapshot = session.clone();
        self.sessions
            .insert(session.session_id.clone(), Arc::new(Mutex::new(session)));
        snapshot
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<Mutex<ChatSession>>> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
