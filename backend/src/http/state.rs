//! Application state for the HTTP server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::middleware::OriginPolicy;
use super::session::{NoSessionResolver, SessionResolver};
use crate::db::repository::FullRepository;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn FullRepository>,
    pub sessions: Arc<dyn SessionResolver>,
    pub origins: Arc<OriginPolicy>,
    /// Serve `/api/users/debug`
    pub debug_endpoints: bool,
    pub started_at: Instant,
}

impl AppState {
    /// State with no session resolver, the default origin policy and debug
    /// endpoints switched off.
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self {
            repository,
            sessions: Arc::new(NoSessionResolver),
            origins: Arc::new(OriginPolicy::default()),
            debug_endpoints: false,
            started_at: Instant::now(),
        }
    }

    pub fn with_sessions(mut self, resolver: impl SessionResolver + 'static) -> Self {
        self.sessions = Arc::new(resolver);
        self
    }

    pub fn with_origins(mut self, policy: OriginPolicy) -> Self {
        self.origins = Arc::new(policy);
        self
    }

    pub fn with_debug_endpoints(mut self, enabled: bool) -> Self {
        self.debug_endpoints = enabled;
        self
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
