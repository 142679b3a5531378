use std::sync::Arc;

use anyhow::Context;

use shopdesk_ai::{AggregatorConfig, AnthropicModel, DisabledModel, InsightsAggregator, LanguageModel};
use shopdesk_store::{InMemoryShopRepository, ShopRepository, ShopSnapshotReader};

use crate::config::AppConfig;

/// Shared application services, built once at startup.
pub struct AppServices {
    pub repo: Arc<dyn ShopRepository>,
    pub insights: Arc<InsightsAggregator>,
}

impl AppServices {
    /// Wire the aggregator to read shop data through `repo`.
    pub fn new(repo: Arc<dyn ShopRepository>, model: Arc<dyn LanguageModel>, config: AggregatorConfig) -> Self {
        let source = Arc::new(ShopSnapshotReader::new(repo.clone()));
        let insights = Arc::new(InsightsAggregator::new(source, model, config));
        Self { repo, insights }
    }

    pub fn in_memory(model: Arc<dyn LanguageModel>, config: AggregatorConfig) -> Self {
        Self::new(Arc::new(InMemoryShopRepository::new()), model, config)
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let model: Arc<dyn LanguageModel> = match &config.model {
        Some(model_config) => {
            let model = AnthropicModel::new(model_config.clone()).context("failed to build language model client")?;
            tracing::info!(model = model_config.model.as_str(), "language model configured");
            Arc::new(model)
        }
        None => Arc::new(DisabledModel),
    };

    let repo = build_repository(config).await?;
    Ok(AppServices::new(repo, model, config.insights.clone()))
}

async fn build_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn ShopRepository>> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::info!("DATABASE_URL not set; using in-memory repository");
        return Ok(Arc::new(InMemoryShopRepository::new()));
    };

    #[cfg(feature = "postgres")]
    {
        let repo = shopdesk_store::PostgresShopRepository::connect(url)
            .await
            .context("failed to connect to Postgres")?;
        tracing::info!("using Postgres repository");
        Ok(Arc::new(repo))
    }

    #[cfg(not(feature = "postgres"))]
    {
        let _ = url;
        tracing::warn!("DATABASE_URL set but postgres feature not enabled, falling back to in-memory");
        Ok(Arc::new(InMemoryShopRepository::new()))
    }
}
