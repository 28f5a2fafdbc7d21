use std::sync::Arc;

use backend_domain::ports::{DetectionRepository, EntityStateRepository, EventRepository};
use backend_domain::{PopulationBaselines, RuntimeConfig};

use crate::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub event_repo: Arc<dyn EventRepository>,
    pub state_repo: Arc<dyn EntityStateRepository>,
    pub detection_repo: Arc<dyn DetectionRepository>,
    pub baselines: Arc<PopulationBaselines>,
    pub metrics: Arc<Metrics>,
}
