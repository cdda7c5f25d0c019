use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bespoke_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_key = if config.rules_engine.has_api_key() { "<redacted>" } else { "<unset>" };
    let fields: Vec<(&str, &str, String)> = vec![
        ("database.url", "BESPOKE_DATABASE_URL", config.database.url.clone()),
        (
            "database.max_connections",
            "BESPOKE_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            "BESPOKE_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        (
            "rules_engine.base_url",
            "BESPOKE_RULES_ENGINE_BASE_URL",
            config.rules_engine.base_url.clone(),
        ),
        (
            "rules_engine.project_slug",
            "BESPOKE_RULES_ENGINE_PROJECT_SLUG",
            config.rules_engine.project_slug.clone(),
        ),
        (
            "rules_engine.timeout_secs",
            "BESPOKE_RULES_ENGINE_TIMEOUT_SECS",
            config.rules_engine.timeout_secs.to_string(),
        ),
        ("rules_engine.api_key", "BESPOKE_RULES_ENGINE_API_KEY", api_key.to_string()),
        (
            "catalog_cache.ttl_secs",
            "BESPOKE_CATALOG_CACHE_TTL_SECS",
            config.catalog_cache.ttl_secs.to_string(),
        ),
        (
            "server.bind_address",
            "BESPOKE_SERVER_BIND_ADDRESS",
            config.server.bind_address.clone(),
        ),
        ("server.port", "BESPOKE_SERVER_PORT", config.server.port.to_string()),
        (
            "server.graceful_shutdown_secs",
            "BESPOKE_SERVER_GRACEFUL_SHUTDOWN_SECS",
            config.server.graceful_shutdown_secs.to_string(),
        ),
        ("logging.level", "BESPOKE_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "BESPOKE_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_key, value) in fields {
        let source = field_source(
            key_path,
            Some(env_key),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("bespoke.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/bespoke.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn nested_key_paths_are_found_in_the_file_document() {
        let doc: toml::Value = "[rules_engine]\nbase_url = \"https://rules.example\"\n"
            .parse()
            .expect("toml document");

        assert!(contains_path(&doc, "rules_engine.base_url"));
        assert!(!contains_path(&doc, "rules_engine.api_key"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
