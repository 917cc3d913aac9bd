use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use deskbot_cli::commands::{ingest, seed};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn seed_loads_and_verifies_the_sample_dataset() {
    with_env(&[("DESKBOT_DATABASE_URL", "sqlite::memory:?cache=shared")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected successful seed run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("5 contracts"));
        assert!(message.contains("7 modules"));
        assert!(message.contains("16 module purchases"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_env(&[("DESKBOT_DATABASE_URL", "sqlite::memory:?cache=shared")], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn ingest_builds_an_index_from_the_corpus() {
    let corpus = TempDir::new().expect("tempdir");
    let index = TempDir::new().expect("tempdir");
    fs::write(
        corpus.path().join("export.txt"),
        "To export a report, open the Reports page and press Export.",
    )
    .expect("write corpus file");

    let corpus_dir = corpus.path().to_string_lossy().to_string();
    let persist_path = index.path().join("index.json").to_string_lossy().to_string();

    with_env(
        &[
            ("DESKBOT_DOCUMENTS_CORPUS_DIR", corpus_dir.as_str()),
            ("DESKBOT_VECTOR_STORE_PERSIST_PATH", persist_path.as_str()),
        ],
        || {
            let result = ingest::run();
            assert_eq!(result.exit_code, 0, "expected successful ingest run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "ingest");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("indexed 1 documents"));
        },
    );

    assert!(index.path().join("index.json").exists(), "ingest should persist the index");
}

#[test]
fn ingest_fails_cleanly_when_the_corpus_is_missing() {
    let missing = TempDir::new().expect("tempdir").path().join("absent");
    let corpus_dir = missing.to_string_lossy().to_string();

    with_env(&[("DESKBOT_DOCUMENTS_CORPUS_DIR", corpus_dir.as_str())], || {
        let result = ingest::run();
        assert_eq!(result.exit_code, 5, "expected index build failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ingest");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "index_build");
    });
}

#[test]
fn doctor_emits_a_structured_json_report() {
    with_env(&[], || {
        let output = deskbot_cli::commands::doctor::run(true);
        let payload: Value =
            serde_json::from_str(&output).expect("doctor output should be valid JSON");

        assert!(payload["overall_status"].is_string());
        assert!(payload["summary"].is_string());
        let checks = payload["checks"].as_array().expect("checks array");
        assert_eq!(checks.len(), 4);
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "pass");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "DESKBOT_DATABASE_URL",
        "DESKBOT_DATABASE_MAX_CONNECTIONS",
        "DESKBOT_DATABASE_TIMEOUT_SECS",
        "DESKBOT_LLM_PROVIDER",
        "DESKBOT_LLM_API_KEY",
        "DESKBOT_LLM_BASE_URL",
        "DESKBOT_LLM_MODEL",
        "DESKBOT_LLM_TIMEOUT_SECS",
        "DESKBOT_EMBEDDING_KIND",
        "DESKBOT_EMBEDDING_BASE_URL",
        "DESKBOT_EMBEDDING_API_KEY",
        "DESKBOT_EMBEDDING_MODEL",
        "DESKBOT_VECTOR_STORE_KIND",
        "DESKBOT_VECTOR_STORE_PERSIST_PATH",
        "DESKBOT_DOCUMENTS_CORPUS_DIR",
        "DESKBOT_SERVER_BIND_ADDRESS",
        "DESKBOT_SERVER_PORT",
        "DESKBOT_LOGGING_LEVEL",
        "DESKBOT_LOGGING_FORMAT",
        "DESKBOT_LOG_LEVEL",
        "DESKBOT_LOG_FORMAT",
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
