use intake_config::Config;
use std::sync::Arc;

use crate::admission::AdmissionService;
use crate::db::IdentityStore;
use crate::rate_limit::RateLimiter;

/// Application context containing shared dependencies.
/// Built once in `main` (or by a test) and handed to the router as state.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<dyn IdentityStore>,
    pub admission: AdmissionService,
    pub rate_limiter: RateLimiter,
}

impl AppContext {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn IdentityStore>,
        admission: AdmissionService,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            config,
            store,
            admission,
            rate_limiter,
        }
    }
}
