//! Per-session appliance state
//!
//! Each browser session owns one oven. The HTTP layer resolves a session
//! id, loads that session's [`ApplianceState`], runs one operation and
//! saves the result. Sessions idle for longer than the configured TTL are
//! forgotten and load as a fresh idle oven.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::appliance::ApplianceState;

/// Storage for appliance state keyed by session id
pub trait StateStore: Send + Sync {
    /// State for `session_id`, or a fresh idle oven
    fn load(&self, session_id: &str, now: i64) -> ApplianceState;

    /// Replace the state for `session_id`
    fn save(&self, session_id: &str, state: ApplianceState, now: i64);
}

struct Entry {
    state: ApplianceState,
    touched_at: i64,
}

/// In-memory store; contents are lost when the process exits
pub struct MemoryStateStore {
    sessions: RwLock<HashMap<String, Entry>>,
    idle_ttl: i64, // seconds
}

impl MemoryStateStore {
    pub fn new(idle_ttl: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl: i64::try_from(idle_ttl).unwrap_or(i64::MAX),
        }
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, entry: &Entry, now: i64) -> bool {
        now.saturating_sub(entry.touched_at) > self.idle_ttl
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, session_id: &str, now: i64) -> ApplianceState {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        match sessions.get(session_id) {
            Some(entry) if !self.expired(entry, now) => entry.state.clone(),
            _ => ApplianceState::default(),
        }
    }

    fn save(&self, session_id: &str, state: ApplianceState, now: i64) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());

        let before = sessions.len();
        sessions.retain(|_, entry| !self.expired(entry, now));
        if sessions.len() < before {
            tracing::debug!("Dropped {} idle sessions", before - sessions.len());
        }

        sessions.insert(
            session_id.to_string(),
            Entry {
                state,
                touched_at: now,
            },
        );
    }
}
