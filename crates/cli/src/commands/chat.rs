use std::sync::Arc;

use barista_agent::{HttpRetriever, ModelGateway, PipelineController};
use barista_core::config::{AppConfig, LoadOptions};
use barista_core::{ConversationTurn, Memory, MenuCatalog, RecommendationTables};

use super::CommandResult;

/// One-shot turn through the live pipeline. The memory printed at the end is
/// what a follow-up invocation should pass back via `--memory`.
pub fn run(message: &str, memory_json: Option<&str>) -> CommandResult {
    let memory: Memory = match memory_json {
        Some(raw) => match serde_json::from_str(raw) {
            Ok(memory) => memory,
            Err(error) => return CommandResult::failure(format!("invalid --memory JSON: {error}")),
        },
        None => Memory::default(),
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure(format!("config validation failed: {error}")),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(format!("failed to initialize async runtime: {error}"))
        }
    };

    let pipeline = match build_pipeline(&config) {
        Ok(pipeline) => pipeline,
        Err(message) => return CommandResult::failure(message),
    };

    let turns = vec![ConversationTurn::user(message)];
    let reply = runtime.block_on(pipeline.process(&turns, &memory));

    let memory_out = serde_json::to_string(&reply.memory)
        .unwrap_or_else(|_| "{}".to_string());
    CommandResult::success(format!("{}\n\nmemory: {memory_out}", reply.message))
}

fn build_pipeline(config: &AppConfig) -> Result<PipelineController, String> {
    let catalog = MenuCatalog::from_path(&config.data.menu_path)
        .map_err(|error| format!("menu load failed: {error}"))?;
    let tables =
        RecommendationTables::from_paths(&config.data.rules_path, &config.data.popularity_path)
            .map_err(|error| format!("recommendation tables load failed: {error}"))?;
    let gateway = ModelGateway::from_config(&config.llm)
        .map_err(|error| format!("model gateway setup failed: {error}"))?;
    let retriever = HttpRetriever::from_config(&config.retrieval)
        .map_err(|error| format!("retriever setup failed: {error}"))?;

    Ok(PipelineController::new(
        Arc::new(gateway),
        Arc::new(retriever),
        Arc::new(catalog),
        Arc::new(tables),
        config.retrieval.top_k,
    ))
}
