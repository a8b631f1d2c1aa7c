//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::application::StorefrontService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StorefrontService>,
    /// Deadline applied to every request.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<StorefrontService>, request_timeout: Duration) -> Self {
        Self { service, request_timeout }
    }
}
