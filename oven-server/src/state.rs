//! Shared server state

use std::sync::Arc;

use oven_core::{AuthService, ProgramCatalog, StateStore};

/// Source of the current Unix time in seconds
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Shared application state
pub struct AppState {
    /// Credential checks and token validation
    pub auth: AuthService,

    /// Heating program catalog
    pub catalog: ProgramCatalog,

    /// Appliance state per session
    pub store: Arc<dyn StateStore>,

    clock: Clock,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(auth: AuthService, catalog: ProgramCatalog, store: Arc<dyn StateStore>) -> Self {
        Self::with_clock(auth, catalog, store, Arc::new(|| chrono::Utc::now().timestamp()))
    }

    pub fn with_clock(
        auth: AuthService,
        catalog: ProgramCatalog,
        store: Arc<dyn StateStore>,
        clock: Clock,
    ) -> Self {
        Self {
            auth,
            catalog,
            store,
            clock,
        }
    }

    /// Current time as seen by the appliance
    pub fn now(&self) -> i64 {
        (self.clock)()
    }
}
