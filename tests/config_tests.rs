//! Configuration loading tests

use classgate::config::{FailurePolicy, LogFormat, load_config_from_str};

const MINIMAL_CONFIG: &str = r#"
[backend]
url = "https://school.supabase.co"
anon_key = "anon"
"#;

const FULL_CONFIG: &str = r#"
[backend]
url = "https://school.supabase.co/"
anon_key = "anon"
timeout_secs = 15
max_retries = 4
verify_ssl = false

[auth]
persist_session = false
session_file = "/tmp/classgate-session.json"
refresh_margin_secs = 120

[freshness]
fetch_timeout_secs = 5
revalidate_interval_secs = 60
on_fetch_failure = "keep_cached"

[routes]
login = "/signin"
pending = "/waiting"
teacher_home = "/teacher"
student_home = "/student/profile"

[logging]
level = "debug"
format = "json"
"#;

#[test]
fn test_minimal_config() {
    let config = load_config_from_str(MINIMAL_CONFIG).unwrap();

    assert_eq!(config.backend.url, "https://school.supabase.co");
    assert_eq!(config.backend.anon_key, Some("anon".to_string()));
    assert_eq!(config.freshness.on_fetch_failure, FailurePolicy::FailClosed);
}

#[test]
fn test_full_config() {
    let config = load_config_from_str(FULL_CONFIG).unwrap();

    // Backend
    assert_eq!(config.backend.timeout_secs, 15);
    assert_eq!(config.backend.max_retries, 4);
    assert!(!config.backend.verify_ssl);

    // Auth
    assert!(!config.auth.persist_session);
    assert_eq!(config.auth.session_file, "/tmp/classgate-session.json");
    assert_eq!(config.auth.refresh_margin_secs, 120);

    // Freshness
    assert_eq!(config.freshness.fetch_timeout_secs, 5);
    assert_eq!(config.freshness.revalidate_interval_secs, 60);
    assert_eq!(config.freshness.on_fetch_failure, FailurePolicy::KeepCached);

    // Routes
    assert_eq!(config.routes.login, "/signin");
    assert_eq!(config.routes.pending, "/waiting");
    assert_eq!(config.routes.teacher_home, "/teacher");
    assert_eq!(config.routes.student_home, "/student/profile");

    // Logging
    assert_eq!(config.logging.level, "debug");
    assert!(matches!(config.logging.format, LogFormat::Json));
}

#[test]
fn test_config_defaults() {
    let config = load_config_from_str(MINIMAL_CONFIG).unwrap();

    assert_eq!(config.backend.timeout_secs, 30);
    assert_eq!(config.backend.max_retries, 2);
    assert!(config.backend.verify_ssl);
    assert!(config.auth.persist_session);
    assert_eq!(config.freshness.fetch_timeout_secs, 10);
    assert_eq!(config.routes.login, "/login");
    assert_eq!(config.routes.pending, "/pending");
    assert_eq!(config.routes.teacher_home, "/teacher/students");
    assert_eq!(config.routes.student_home, "/student/calendar");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_unknown_failure_policy_rejected() {
    let config_str = r#"
[backend]
url = "https://school.supabase.co"

[freshness]
on_fetch_failure = "retry_forever"
"#;

    assert!(load_config_from_str(config_str).is_err());
}

#[test]
fn test_zero_fetch_timeout_rejected() {
    let config_str = r#"
[freshness]
fetch_timeout_secs = 0
"#;

    assert!(load_config_from_str(config_str).is_err());
}

#[test]
fn test_excessive_retries_rejected() {
    let config_str = r#"
[backend]
url = "https://school.supabase.co"
anon_key = "anon"
max_retries = 100
"#;

    let err = load_config_from_str(config_str).unwrap_err();
    assert!(err.to_string().contains("max_retries"));
}

#[test]
#[serial_test::serial]
fn test_env_var_priority_classgate_over_supabase_url() {
    use classgate::config::load_config;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("test-config.toml");
    fs::write(
        &config_path,
        r#"
[backend]
anon_key = "anon"
"#,
    )
    .unwrap();

    unsafe {
        env::set_var("CLASSGATE__BACKEND__URL", "https://priority.supabase.co");
        env::set_var("SUPABASE_URL", "https://fallback.supabase.co");
    }

    let config = load_config(Some(config_path.to_str().unwrap())).unwrap();

    // CLASSGATE__BACKEND__URL should take precedence
    assert_eq!(config.backend.url, "https://priority.supabase.co");

    unsafe {
        env::remove_var("CLASSGATE__BACKEND__URL");
        env::remove_var("SUPABASE_URL");
    }
}

#[test]
#[serial_test::serial]
fn test_env_var_supabase_url_fallback() {
    use classgate::config::load_config;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("test-config.toml");
    fs::write(
        &config_path,
        r#"
[backend]
url = "https://file.supabase.co"
anon_key = "anon"
"#,
    )
    .unwrap();

    unsafe {
        env::remove_var("CLASSGATE__BACKEND__URL");
        env::set_var("SUPABASE_URL", "https://env.supabase.co");
    }

    let config = load_config(Some(config_path.to_str().unwrap())).unwrap();

    // SUPABASE_URL should replace the file value when no prefixed var is set
    assert_eq!(config.backend.url, "https://env.supabase.co");

    unsafe {
        env::remove_var("SUPABASE_URL");
    }
}

#[test]
#[serial_test::serial]
fn test_env_var_anon_key_fallback() {
    use classgate::config::load_config;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("test-config.toml");
    fs::write(
        &config_path,
        r#"
[backend]
url = "https://school.supabase.co"
"#,
    )
    .unwrap();

    unsafe {
        env::set_var("SUPABASE_ANON_KEY", "env-anon-key");
    }

    let config = load_config(Some(config_path.to_str().unwrap())).unwrap();
    assert_eq!(config.backend.anon_key, Some("env-anon-key".to_string()));

    unsafe {
        env::remove_var("SUPABASE_ANON_KEY");
    }
}

#[test]
#[serial_test::serial]
fn test_missing_anon_key_is_rejected() {
    use classgate::config::load_config;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("test-config.toml");
    fs::write(
        &config_path,
        r#"
[backend]
url = "https://school.supabase.co"
"#,
    )
    .unwrap();

    unsafe {
        env::remove_var("SUPABASE_ANON_KEY");
        env::remove_var("CLASSGATE__BACKEND__ANON_KEY");
    }

    assert!(load_config(Some(config_path.to_str().unwrap())).is_err());
}

#[test]
fn test_missing_config_file_is_an_error() {
    use classgate::config::load_config;

    assert!(load_config(Some("/nonexistent/classgate.toml")).is_err());
}
