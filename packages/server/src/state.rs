use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub config: AppConfig,
}
