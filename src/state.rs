use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::Store;

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        Self { store, config }
    }
}
