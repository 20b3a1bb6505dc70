use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use barista_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |field: &str, env_var: &str| {
        field_source(field, env_var, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "llm.provider",
        &format!("{:?}", config.llm.provider),
        source("llm.provider", "BARISTA_LLM_PROVIDER"),
    ));
    lines.push(render_line("llm.model", &config.llm.model, source("llm.model", "BARISTA_LLM_MODEL")));
    lines.push(render_line(
        "llm.embedding_model",
        &config.llm.embedding_model,
        source("llm.embedding_model", "BARISTA_LLM_EMBEDDING_MODEL"),
    ));
    lines.push(render_line(
        "llm.base_url",
        config.llm.base_url.as_deref().unwrap_or("<unset>"),
        source("llm.base_url", "BARISTA_LLM_BASE_URL"),
    ));
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line("llm.api_key", llm_api_key, source("llm.api_key", "BARISTA_LLM_API_KEY")));
    lines.push(render_line(
        "llm.max_retries",
        &config.llm.max_retries.to_string(),
        source("llm.max_retries", "BARISTA_LLM_MAX_RETRIES"),
    ));
    lines.push(render_line(
        "llm.max_repair_attempts",
        &config.llm.max_repair_attempts.to_string(),
        source("llm.max_repair_attempts", "BARISTA_LLM_MAX_REPAIR_ATTEMPTS"),
    ));

    lines.push(render_line(
        "retrieval.base_url",
        &config.retrieval.base_url,
        source("retrieval.base_url", "BARISTA_RETRIEVAL_BASE_URL"),
    ));
    lines.push(render_line(
        "retrieval.collection",
        &config.retrieval.collection,
        source("retrieval.collection", "BARISTA_RETRIEVAL_COLLECTION"),
    ));
    lines.push(render_line(
        "retrieval.top_k",
        &config.retrieval.top_k.to_string(),
        source("retrieval.top_k", "BARISTA_RETRIEVAL_TOP_K"),
    ));

    lines.push(render_line(
        "data.menu_path",
        &config.data.menu_path.display().to_string(),
        source("data.menu_path", "BARISTA_DATA_MENU_PATH"),
    ));
    lines.push(render_line(
        "data.rules_path",
        &config.data.rules_path.display().to_string(),
        source("data.rules_path", "BARISTA_DATA_RULES_PATH"),
    ));
    lines.push(render_line(
        "data.popularity_path",
        &config.data.popularity_path.display().to_string(),
        source("data.popularity_path", "BARISTA_DATA_POPULARITY_PATH"),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", "BARISTA_SERVER_BIND_ADDRESS"),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", "BARISTA_SERVER_PORT"),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "BARISTA_LOG_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "BARISTA_LOG_FORMAT"),
    ));

    lines.join("\n")
}

fn render_line(field: &str, value: &str, source: String) -> String {
    format!("  {field} = {value}  [{source}]")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("barista.toml"), PathBuf::from("config/barista.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

/// Attribute a field to env, file, or default, in the same precedence the
/// loader applies.
fn field_source(
    field: &str,
    env_var: &str,
    file_doc: Option<&Value>,
    file_path: Option<&Path>,
) -> String {
    if env::var(env_var).map(|value| !value.trim().is_empty()).unwrap_or(false) {
        return format!("env:{env_var}");
    }

    if let (Some(doc), Some(path)) = (file_doc, file_path) {
        if field_present(doc, field) {
            return format!("file:{}", path.display());
        }
    }

    "default".to_string()
}

fn field_present(doc: &Value, dotted_field: &str) -> bool {
    let mut current = doc;
    for part in dotted_field.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}
