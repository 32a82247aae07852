//! Application state management

use super::ServerConfig;
use crate::inference::ClassifierService;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub service: Arc<ClassifierService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig, service: Arc<ClassifierService>) -> Self {
        Self {
            config,
            service,
            started_at: Utc::now(),
        }
    }
}
