use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use backend_domain::ports::BaselineRepository;
use backend_domain::PopulationBaselines;

/// Loads population baselines from a TOML file with one table per metric:
///
/// ```toml
/// [accuracy]
/// mean = 0.31
/// std_dev = 0.12
/// ```
#[derive(Debug, Clone, Default)]
pub struct BaselineFileRepository;

impl BaselineFileRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BaselineRepository for BaselineFileRepository {
    async fn load_baselines(&self, path: &str) -> Result<PopulationBaselines> {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading baselines file {path}"))?;
        let baselines: PopulationBaselines =
            toml::from_str(&raw).with_context(|| format!("parsing baselines file {path}"))?;
        info!(path, metrics = baselines.len(), "loaded population baselines");
        Ok(baselines)
    }
}
