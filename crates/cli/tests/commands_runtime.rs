use std::env;
use std::sync::{Mutex, OnceLock};

use bespoke_cli::commands::{config, doctor, migrate, seed};
use serde_json::Value;

const MEMORY_DB: [(&str, &str); 2] =
    [("BESPOKE_DATABASE_URL", "sqlite::memory:"), ("BESPOKE_DATABASE_MAX_CONNECTIONS", "1")];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&MEMORY_DB, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_rules_engine_url() {
    with_env(
        &[
            ("BESPOKE_DATABASE_URL", "sqlite::memory:"),
            ("BESPOKE_RULES_ENGINE_BASE_URL", "rules.internal:8090"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 2, "expected config validation failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "config_validation");
            assert!(payload["message"].as_str().unwrap_or("").contains("rules_engine.base_url"));
        },
    );
}

#[test]
fn seed_loads_and_verifies_the_demo_catalog() {
    with_env(&MEMORY_DB, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.starts_with("demo catalog loaded: 1 product families, 2 product types"));
    });
}

#[test]
fn seed_is_idempotent_against_the_same_database() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("bespoke.db").display());

    with_env(&[("BESPOKE_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);

        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn doctor_reports_missing_catalog_on_an_empty_database() {
    with_env(&MEMORY_DB, || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        let checks = payload["checks"].as_array().expect("checks");
        let status_of = |name: &str| {
            checks
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .unwrap_or(Value::Null)
        };
        assert_eq!(status_of("config_validation"), "pass");
        assert_eq!(status_of("rules_engine_endpoint"), "pass");
        assert_eq!(status_of("database_connectivity"), "pass");
        assert_eq!(status_of("catalog_readiness"), "fail");
    });
}

#[test]
fn doctor_passes_once_the_catalog_is_seeded() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("bespoke.db").display());

    with_env(&[("BESPOKE_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);

        let result = doctor::run(false);
        assert_eq!(result.exit_code, 0, "{}", result.output);
        assert!(result.output.starts_with("doctor: all readiness checks passed"));
        assert!(result.output.contains("- [ok] catalog_readiness: 2 active product type(s) available"));
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("BESPOKE_SERVER_PORT", "not-a-port")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        let checks = payload["checks"].as_array().expect("checks");
        assert_eq!(checks[0]["status"], "fail");
        assert!(checks[1..].iter().all(|check| check["status"] == "skipped"));
    });
}

#[test]
fn config_redacts_the_rules_engine_api_key() {
    with_env(
        &[
            ("BESPOKE_RULES_ENGINE_API_KEY", "super-secret-token"),
            ("BESPOKE_RULES_ENGINE_PROJECT_SLUG", "shutters"),
        ],
        || {
            let output = config::run();

            assert!(!output.contains("super-secret-token"));
            assert!(output.contains(
                "- rules_engine.api_key = <redacted> (source: env (BESPOKE_RULES_ENGINE_API_KEY))"
            ));
            assert!(output.contains(
                "- rules_engine.project_slug = shutters (source: env (BESPOKE_RULES_ENGINE_PROJECT_SLUG))"
            ));
            assert!(output.contains("- catalog_cache.ttl_secs = 300 (source: default)"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BESPOKE_DATABASE_URL",
        "BESPOKE_DATABASE_MAX_CONNECTIONS",
        "BESPOKE_DATABASE_TIMEOUT_SECS",
        "BESPOKE_RULES_ENGINE_BASE_URL",
        "BESPOKE_RULES_ENGINE_PROJECT_SLUG",
        "BESPOKE_RULES_ENGINE_TIMEOUT_SECS",
        "BESPOKE_RULES_ENGINE_API_KEY",
        "BESPOKE_CATALOG_CACHE_TTL_SECS",
        "BESPOKE_SERVER_BIND_ADDRESS",
        "BESPOKE_SERVER_PORT",
        "BESPOKE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "BESPOKE_LOGGING_LEVEL",
        "BESPOKE_LOGGING_FORMAT",
        "BESPOKE_LOG_LEVEL",
        "BESPOKE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
