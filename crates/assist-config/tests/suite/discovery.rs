use std::ffi::OsString;
use std::sync::Mutex;

use assist_config::{
    discover_config_path, load_for_workspace, AssistConfig, ConfigError, ASSIST_CONFIG_ENV_VAR,
};
use assist_metadata::MergePolicy;
use tempfile::tempdir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

struct EnvVarGuard {
    key: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: impl Into<OsString>) -> Self {
        let prev = std::env::var_os(key);
        std::env::set_var(key, value.into());
        Self { key, prev }
    }

    fn unset(key: &'static str) -> Self {
        let prev = std::env::var_os(key);
        std::env::remove_var(key);
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

#[test]
fn discovers_spring_assist_toml_in_workspace_root() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");
    let _env = EnvVarGuard::unset(ASSIST_CONFIG_ENV_VAR);

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("spring-assist.toml");
    std::fs::write(&config_path, "[metadata]\nmerge_policy = \"first-wins\"\n").unwrap();
    std::fs::write(dir.path().join(".spring-assist.toml"), "").unwrap();

    let discovered = discover_config_path(dir.path())
        .expect("spring-assist.toml should be discovered when present in workspace root");
    assert_eq!(discovered, config_path.canonicalize().unwrap_or(config_path));
}

#[test]
fn dotfile_is_the_fallback() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");
    let _env = EnvVarGuard::unset(ASSIST_CONFIG_ENV_VAR);

    let dir = tempdir().unwrap();
    let config_path = dir.path().join(".spring-assist.toml");
    std::fs::write(&config_path, "[index]\ndebounce_ms = 10\n").unwrap();

    let (config, path) = load_for_workspace(dir.path()).unwrap();
    assert_eq!(config.index.debounce_ms, 10);
    assert_eq!(path, Some(config_path.canonicalize().unwrap_or(config_path)));
}

#[test]
fn env_override_wins_over_workspace_file() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");

    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("spring-assist.toml"), "").unwrap();
    let override_path = dir.path().join("override.toml");
    std::fs::write(
        &override_path,
        "[metadata]\nmerge_policy = \"first-wins\"\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let _env = EnvVarGuard::set(ASSIST_CONFIG_ENV_VAR, "override.toml");

    let (config, path) = load_for_workspace(dir.path()).unwrap();
    assert_eq!(config.metadata.merge_policy, MergePolicy::FirstWins);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        path.expect("load_for_workspace should return the resolved config path"),
        override_path.canonicalize().unwrap_or(override_path)
    );
}

#[test]
fn missing_config_returns_defaults() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");
    let _env = EnvVarGuard::unset(ASSIST_CONFIG_ENV_VAR);

    let dir = tempdir().unwrap();
    let (config, path) = load_for_workspace(dir.path()).unwrap();
    assert_eq!(path, None);
    assert_eq!(config, AssistConfig::default());
}

#[test]
fn missing_override_file_is_an_io_error() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");

    let dir = tempdir().unwrap();
    let _env = EnvVarGuard::set(ASSIST_CONFIG_ENV_VAR, dir.path().join("absent.toml"));

    let err = load_for_workspace(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "{err}");
}

#[test]
fn semantic_errors_are_reported_together() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("spring-assist.toml");
    std::fs::write(
        &path,
        "[metadata]\nmetadata_file_names = []\ninclude_additional_metadata = false\n[index]\nbackground_threads = 500\n",
    )
    .unwrap();

    let err = AssistConfig::load_from_path(&path).unwrap_err();
    match err {
        ConfigError::Invalid(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected validation failure, got {other}"),
    }
}
