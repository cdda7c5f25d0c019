use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub rules_engine: RulesEngineConfig,
    pub catalog_cache: CatalogCacheConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RulesEngineConfig {
    pub base_url: String,
    pub project_slug: String,
    pub timeout_secs: u64,
    pub api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct CatalogCacheConfig {
    pub ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub rules_engine_base_url: Option<String>,
    pub rules_engine_project_slug: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://bespoke.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            rules_engine: RulesEngineConfig {
                base_url: "http://localhost:8090".to_string(),
                project_slug: "default".to_string(),
                timeout_secs: 10,
                api_key: None,
            },
            catalog_cache: CatalogCacheConfig { ttl_secs: 300 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl RulesEngineConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bespoke.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(rules_engine) = patch.rules_engine {
            if let Some(base_url) = rules_engine.base_url {
                self.rules_engine.base_url = base_url;
            }
            if let Some(project_slug) = rules_engine.project_slug {
                self.rules_engine.project_slug = project_slug;
            }
            if let Some(timeout_secs) = rules_engine.timeout_secs {
                self.rules_engine.timeout_secs = timeout_secs;
            }
            if let Some(api_key_value) = rules_engine.api_key {
                self.rules_engine.api_key = Some(secret_value(api_key_value));
            }
        }

        if let Some(catalog_cache) = patch.catalog_cache {
            if let Some(ttl_secs) = catalog_cache.ttl_secs {
                self.catalog_cache.ttl_secs = ttl_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BESPOKE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BESPOKE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("BESPOKE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BESPOKE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("BESPOKE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BESPOKE_RULES_ENGINE_BASE_URL") {
            self.rules_engine.base_url = value;
        }
        if let Some(value) = read_env("BESPOKE_RULES_ENGINE_PROJECT_SLUG") {
            self.rules_engine.project_slug = value;
        }
        if let Some(value) = read_env("BESPOKE_RULES_ENGINE_TIMEOUT_SECS") {
            self.rules_engine.timeout_secs =
                parse_u64("BESPOKE_RULES_ENGINE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("BESPOKE_RULES_ENGINE_API_KEY") {
            self.rules_engine.api_key = Some(secret_value(value));
        }

        if let Some(value) = read_env("BESPOKE_CATALOG_CACHE_TTL_SECS") {
            self.catalog_cache.ttl_secs = parse_u64("BESPOKE_CATALOG_CACHE_TTL_SECS", &value)?;
        }

        if let Some(value) = read_env("BESPOKE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BESPOKE_SERVER_PORT") {
            self.server.port = parse_u16("BESPOKE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("BESPOKE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("BESPOKE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("BESPOKE_LOGGING_LEVEL").or_else(|| read_env("BESPOKE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BESPOKE_LOGGING_FORMAT").or_else(|| read_env("BESPOKE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(base_url) = overrides.rules_engine_base_url {
            self.rules_engine.base_url = base_url;
        }
        if let Some(project_slug) = overrides.rules_engine_project_slug {
            self.rules_engine.project_slug = project_slug;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_rules_engine(&self.rules_engine)?;
        validate_catalog_cache(&self.catalog_cache)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("bespoke.toml"), PathBuf::from("config/bespoke.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_rules_engine(rules_engine: &RulesEngineConfig) -> Result<(), ConfigError> {
    let base_url = rules_engine.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "rules_engine.base_url must start with http:// or https://".to_string(),
        ));
    }

    let slug = rules_engine.project_slug.trim();
    if slug.is_empty() || slug.contains('/') {
        return Err(ConfigError::Validation(
            "rules_engine.project_slug must be a non-empty path segment".to_string(),
        ));
    }

    if rules_engine.timeout_secs == 0 || rules_engine.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "rules_engine.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if let Some(api_key) = &rules_engine.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "rules_engine.api_key is set but empty; remove it or provide a token".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_catalog_cache(catalog_cache: &CatalogCacheConfig) -> Result<(), ConfigError> {
    if catalog_cache.ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "catalog_cache.ttl_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    rules_engine: Option<RulesEnginePatch>,
    catalog_cache: Option<CatalogCachePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RulesEnginePatch {
    base_url: Option<String>,
    project_slug: Option<String>,
    timeout_secs: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogCachePatch {
    ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid_without_any_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist/bespoke.toml".into()),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.catalog_cache.ttl_secs == 300, "catalog cache should default to 5 minutes")?;
        ensure(config.rules_engine.timeout_secs == 10, "rules engine timeout should default to 10s")?;
        ensure(!config.rules_engine.has_api_key(), "api key should be absent by default")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_RULES_ENGINE_HOST", "rules.internal:9000");
        env::set_var("TEST_RULES_ENGINE_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("bespoke.toml");
            fs::write(
                &path,
                r#"
[rules_engine]
base_url = "http://${TEST_RULES_ENGINE_HOST}"
project_slug = "shutters"
api_key = "${TEST_RULES_ENGINE_TOKEN}"

[catalog_cache]
ttl_secs = 60
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.rules_engine.base_url == "http://rules.internal:9000",
                "base url should be interpolated from environment",
            )?;
            ensure(config.rules_engine.project_slug == "shutters", "slug should come from file")?;
            ensure(
                config.rules_engine.api_key.as_ref().map(|key| key.expose_secret().to_owned())
                    == Some("token-from-env".to_owned()),
                "api key should be interpolated from environment",
            )?;
            ensure(config.catalog_cache.ttl_secs == 60, "cache ttl should come from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_RULES_ENGINE_HOST", "TEST_RULES_ENGINE_TOKEN"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("bespoke.toml");
        fs::write(&path, "[rules_engine]\nbase_url = \"${BESPOKE_TEST_UNSET_HOST}\"\n")
            .map_err(|err| err.to_string())?;

        let error =
            match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            {
                Ok(_) => return Err("expected interpolation failure".to_string()),
                Err(error) => error,
            };
        ensure(
            matches!(error, ConfigError::MissingEnvInterpolation { ref var } if var == "BESPOKE_TEST_UNSET_HOST"),
            "error should name the missing variable",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BESPOKE_LOG_LEVEL", "warn");
        env::set_var("BESPOKE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["BESPOKE_LOG_LEVEL", "BESPOKE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BESPOKE_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("BESPOKE_RULES_ENGINE_PROJECT_SLUG", "from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("bespoke.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[rules_engine]
project_slug = "from-file"
timeout_secs = 20

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.rules_engine.project_slug == "from-env",
                "env slug should win over file and defaults",
            )?;
            ensure(config.rules_engine.timeout_secs == 20, "file timeout should win over default")?;
            Ok(())
        })();

        clear_vars(&["BESPOKE_DATABASE_URL", "BESPOKE_RULES_ENGINE_PROJECT_SLUG"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BESPOKE_RULES_ENGINE_TIMEOUT_SECS", "600");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("rules_engine.timeout_secs")
            );
            ensure(has_message, "validation failure should mention rules_engine.timeout_secs")
        })();

        clear_vars(&["BESPOKE_RULES_ENGINE_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BESPOKE_SERVER_PORT", "eighty");
        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected invalid override error".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "BESPOKE_SERVER_PORT", "error should name the variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["BESPOKE_SERVER_PORT"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BESPOKE_RULES_ENGINE_API_KEY", "rules-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(config.rules_engine.has_api_key(), "api key should be loaded from env")?;
            ensure(
                !debug.contains("rules-secret-value"),
                "debug output should not contain the rules engine api key",
            )?;
            Ok(())
        })();

        clear_vars(&["BESPOKE_RULES_ENGINE_API_KEY"]);
        result
    }
}
