use std::sync::Arc;
use std::time::Duration;

use crate::rate_limit::RateLimiter;
use crate::route_class::RouteClass;
use crate::session::SessionDecoder;

// App's shared state - everything a request handler needs. Built once at
// startup and injected, so tests can assemble their own instances with a
// fresh limiter and whatever session decoder they want.
pub struct AppState {
    pub client: reqwest::Client,
    pub upstream_url: String,
    pub limiter: RateLimiter,
    pub sessions: Arc<dyn SessionDecoder>,
    pub auth_limit: u32,
    pub general_limit: u32,
    pub rate_window: Duration,
}

impl AppState {
    // Budget for a route class
    pub fn limit_for(&self, class: RouteClass) -> u32 {
        match class {
            RouteClass::Auth => self.auth_limit,
            RouteClass::General => self.general_limit,
        }
    }
}
