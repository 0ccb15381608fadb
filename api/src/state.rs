//! Application state

use std::sync::Arc;

use crate::config::AppConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: Arc::new(config.clone()),
        }
    }
}
