//! Application state.

use std::sync::Arc;

use malfit_queue::{Intake, JobStore, WorkQueue};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn JobStore>,
    pub intake: Intake,
}

impl AppState {
    pub fn new(config: ApiConfig, store: Arc<dyn JobStore>, queue: Arc<dyn WorkQueue>) -> Self {
        let intake = Intake::new(Arc::clone(&store), queue);
        Self {
            config,
            store,
            intake,
        }
    }
}
