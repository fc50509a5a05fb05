use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use carport_core::BlockStore;
use carport_store_memory::MemoryStore;

use crate::session::PublishSession;

/// Map from campaign id to its [`PublishSession`].
///
/// Owned by the service instance that drives publishing, not a process
/// global, so tests can instantiate isolated registries. Sessions are
/// created lazily on first use and removed only after a successful
/// finalize: a campaign that never finalizes keeps its session (and
/// tree) resident for the life of the registry. That leak is accepted,
/// not papered over with an eviction policy.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<PublishSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `campaign_id`, creating it with a fresh
    /// in-memory content store if none exists.
    ///
    /// The registry lock is held only for the map access, never during
    /// I/O.
    pub fn get_or_create(&self, campaign_id: &str) -> Arc<PublishSession> {
        let mut sessions = self.sessions.lock().expect("session registry lock poisoned");
        sessions
            .entry(campaign_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(campaign_id, "creating publish session");
                let store: Arc<dyn BlockStore> = Arc::new(MemoryStore::new());
                Arc::new(PublishSession::new(campaign_id.to_string(), store))
            })
            .clone()
    }

    /// Drops the session for `campaign_id`, if any.
    pub fn remove(&self, campaign_id: &str) {
        let mut sessions = self.sessions.lock().expect("session registry lock poisoned");
        sessions.remove(campaign_id);
    }

    pub fn contains(&self, campaign_id: &str) -> bool {
        let sessions = self.sessions.lock().expect("session registry lock poisoned");
        sessions.contains_key(campaign_id)
    }

    pub fn len(&self) -> usize {
        let sessions = self.sessions.lock().expect("session registry lock poisoned");
        sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
