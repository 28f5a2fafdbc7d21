use std::sync::Arc;

use anyhow::Result;
use clickhouse::Client;
use tracing::warn;

use backend_application::{AppState, Metrics};
use backend_domain::ports::BaselineRepository;
use backend_domain::PopulationBaselines;
use backend_infrastructure::{AppConfig, BaselineFileRepository, ClickhouseRepo};

pub struct AppContext {
    pub state: AppState,
}

impl AppContext {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::load().await?;
        let runtime_config = config.to_runtime_config();
        let db_config = config.to_db_config();

        let mut clickhouse = Client::default()
            .with_url(&db_config.clickhouse_url)
            .with_database(&db_config.clickhouse_database);
        if let Some(user) = &db_config.clickhouse_user {
            clickhouse = clickhouse.with_user(user);
        }
        if let Some(password) = &db_config.clickhouse_password {
            clickhouse = clickhouse.with_password(password);
        }

        let repo = Arc::new(ClickhouseRepo::new(
            clickhouse,
            db_config.clickhouse_database.clone(),
            runtime_config.event_ttl_days,
        ));
        repo.create_schema().await?;

        // A bad baselines file degrades to self-baseline scoring rather
        // than blocking startup.
        let baselines = match &runtime_config.baselines_path {
            Some(path) => BaselineFileRepository::new()
                .load_baselines(path)
                .await
                .unwrap_or_else(|err| {
                    warn!("ignoring baselines file {}: {}", path, err);
                    PopulationBaselines::default()
                }),
            None => PopulationBaselines::default(),
        };

        let state = AppState {
            config: runtime_config,
            event_repo: repo.clone(),
            state_repo: repo.clone(),
            detection_repo: repo,
            baselines: Arc::new(baselines),
            metrics: Arc::new(Metrics::default()),
        };

        Ok(Self { state })
    }
}
