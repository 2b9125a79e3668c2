//! Integration tests for cfredir-config
//!
//! These tests verify the config loading pipeline with real file system operations.

use cfredir_config::testing::TestEnvironment;
use cfredir_config::{Config, ConfigError};

#[test]
fn test_load_global_config_from_file() {
    let env = TestEnvironment::new().unwrap();
    let path = env
        .write_config(
            r#"
[redirect]
enabled = false
app_dir = "Acme"
user_data_dir = "Profiles"

[logging]
level = "trace"
"#,
        )
        .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert!(!config.redirect.enabled);
    assert_eq!(config.redirect.segments().unwrap(), ["Acme", "Profiles"]);
    assert_eq!(config.logging.level, "trace");
}

#[test]
fn test_missing_sections_fall_back_to_defaults() {
    let env = TestEnvironment::new().unwrap();
    let path = env.write_config("[logging]\nlevel = \"info\"\n").unwrap();

    let config = Config::load_from(&path).unwrap();
    assert!(config.redirect.enabled);
    assert_eq!(config.redirect.app_dir, "Cfredir");
    assert_eq!(config.redirect.user_data_dir, "User Data");
}

#[test]
fn test_malformed_toml_is_an_error() {
    let env = TestEnvironment::new().unwrap();
    let path = env.write_config("[redirect\nenabled = ").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let env = TestEnvironment::new().unwrap();
    let err = Config::load_from(&env.home.join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_default_toml_parses_back() {
    let config: Config = toml::from_str(&Config::default_toml()).unwrap();
    assert_eq!(config.redirect.app_dir, Config::default().redirect.app_dir);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_protected_root_composition_in_environment() {
    let env = TestEnvironment::new().unwrap();
    let path = env
        .write_config("[redirect]\napp_dir = \"Acme\"\nuser_data_dir = \"UserData\"\n")
        .unwrap();
    let config = Config::load_from(&path).unwrap();

    let root = env.protected_root(&config.redirect).unwrap();
    assert_eq!(root, env.local_app_data.join("Acme").join("UserData"));
}

#[test]
fn test_invalid_segment_from_file_is_rejected() {
    let env = TestEnvironment::new().unwrap();
    let path = env
        .write_config("[redirect]\napp_dir = \"..\"\n")
        .unwrap();
    let config = Config::load_from(&path).unwrap();

    assert!(config.redirect.segments().is_err());
    assert!(env.protected_root(&config.redirect).is_err());
}

fn env_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }
}

#[test]
fn test_env_overrides_file_when_layered() {
    let env = TestEnvironment::new().unwrap();
    let path = env.write_config("[redirect]\nenabled = true\n").unwrap();

    let config =
        Config::load_layered(Some(&path), env_from(&[("CFREDIR_ENABLED", "0")])).unwrap();
    assert!(!config.redirect.enabled);
}

#[test]
fn test_missing_global_file_uses_defaults_and_env() {
    let env = TestEnvironment::new().unwrap();
    let config = Config::load_layered(
        Some(&env.config_path()),
        env_from(&[("CFREDIR_APP_DIR", "Acme")]),
    )
    .unwrap();
    assert!(config.redirect.enabled);
    assert_eq!(config.redirect.app_dir, "Acme");
}

#[test]
fn test_malformed_file_still_honors_kill_switch() {
    let env = TestEnvironment::new().unwrap();
    let path = env.write_config("[redirect\nenabled = ").unwrap();

    assert!(Config::load_layered(Some(&path), env_from(&[])).is_err());
    let config = Config::load_or_disabled(Some(&path), env_from(&[("CFREDIR_ENABLED", "0")]));
    assert!(!config.redirect.enabled);
}

#[test]
fn test_malformed_file_disables_redirection() {
    let env = TestEnvironment::new().unwrap();
    let path = env.write_config("[redirect\nenabled = ").unwrap();

    let config = Config::load_or_disabled(Some(&path), env_from(&[]));
    assert!(!config.redirect.enabled);
    assert_eq!(config.redirect.app_dir, "Cfredir");
}

#[test]
fn test_malformed_file_applies_remaining_overrides() {
    let env = TestEnvironment::new().unwrap();
    let path = env.write_config("not toml at all = = =").unwrap();

    let config = Config::load_or_disabled(
        Some(&path),
        env_from(&[
            ("CFREDIR_ENABLED", "1"),
            ("CFREDIR_USER_DATA_DIR", "Profiles"),
            ("CFREDIR_LOG", "debug"),
        ]),
    );
    assert!(config.redirect.enabled);
    assert_eq!(config.redirect.user_data_dir, "Profiles");
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_valid_file_loads_normally_when_failing_closed() {
    let env = TestEnvironment::new().unwrap();
    let path = env
        .write_config("[redirect]\napp_dir = \"Acme\"\n")
        .unwrap();

    let config = Config::load_or_disabled(Some(&path), env_from(&[]));
    assert!(config.redirect.enabled);
    assert_eq!(config.redirect.app_dir, "Acme");
}
