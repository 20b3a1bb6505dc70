use std::sync::Arc;

use barista_agent::{HttpRetriever, ModelGateway, PipelineController};
use barista_core::config::{AppConfig, ConfigError, LoadOptions};
use barista_core::{DataError, GatewayError, MenuCatalog, RecommendationTables};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub pipeline: Arc<PipelineController>,
    pub readiness: Readiness,
}

/// Static-data counts captured at startup, reported by the health endpoint.
#[derive(Clone, Copy, Debug)]
pub struct Readiness {
    pub menu_items: usize,
    pub association_rules: usize,
    pub popularity_entries: usize,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("static data load failed: {0}")]
    Data(#[from] DataError),
    #[error("model gateway construction failed: {0}")]
    Gateway(#[from] GatewayError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let catalog = Arc::new(MenuCatalog::from_path(&config.data.menu_path)?);
    let tables = Arc::new(RecommendationTables::from_paths(
        &config.data.rules_path,
        &config.data.popularity_path,
    )?);

    let readiness = Readiness {
        menu_items: catalog.len(),
        association_rules: tables.rule_count(),
        popularity_entries: tables.popularity_count(),
    };
    info!(
        event_name = "system.bootstrap.data_loaded",
        correlation_id = "bootstrap",
        menu_items = readiness.menu_items,
        association_rules = readiness.association_rules,
        popularity_entries = readiness.popularity_entries,
        "static data loaded"
    );

    let gateway = Arc::new(ModelGateway::from_config(&config.llm)?);
    let retriever = Arc::new(HttpRetriever::from_config(&config.retrieval)?);
    let pipeline = Arc::new(PipelineController::new(
        gateway,
        retriever,
        catalog,
        tables,
        config.retrieval.top_k,
    ));

    Ok(Application { config, pipeline, readiness })
}
