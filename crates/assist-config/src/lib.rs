//! `spring-assist.toml` loading and logging bootstrap.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use assist_metadata::{MergePolicy, ADDITIONAL_METADATA_FILE_NAME, METADATA_FILE_NAME};
use assist_scheduler::SchedulerConfig;
use parking_lot::ReentrantMutex;
use serde::Deserialize;
use thiserror::Error;

mod logging;
mod validation;

pub use logging::{init_tracing, LoggingConfig};
pub use validation::ConfigValidationError;

/// Workspace configuration.
///
/// ```toml
/// [logging]
/// level = "debug"
/// json = false
///
/// [metadata]
/// merge_policy = "first-wins"
/// include_additional_metadata = true
///
/// [index]
/// background_threads = 2
/// debounce_ms = 200
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// How metadata files are found and merged.
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Background rebuild settings.
    #[serde(default)]
    pub index: IndexConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataConfig {
    /// Which declaration wins when two files describe the same property.
    #[serde(default)]
    pub merge_policy: MergePolicy,

    /// File names looked up under `META-INF/` of every classpath root.
    #[serde(default = "MetadataConfig::default_file_names")]
    pub metadata_file_names: Vec<String>,

    /// Also pick up `additional-spring-configuration-metadata.json`.
    #[serde(default = "MetadataConfig::default_include_additional")]
    pub include_additional_metadata: bool,
}

impl MetadataConfig {
    fn default_file_names() -> Vec<String> {
        vec![METADATA_FILE_NAME.to_string()]
    }

    fn default_include_additional() -> bool {
        true
    }

    /// Configured file names plus the additional-metadata file when enabled,
    /// without duplicates.
    pub fn effective_file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.metadata_file_names.len() + 1);
        for name in &self.metadata_file_names {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        if self.include_additional_metadata
            && !names.iter().any(|name| name == ADDITIONAL_METADATA_FILE_NAME)
        {
            names.push(ADDITIONAL_METADATA_FILE_NAME.to_string());
        }
        names
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::default(),
            metadata_file_names: Self::default_file_names(),
            include_additional_metadata: Self::default_include_additional(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Worker threads for rebuilds. `0` picks a default from the host.
    #[serde(default)]
    pub background_threads: usize,

    /// Quiet period before a burst of dependency changes triggers a rebuild.
    #[serde(default = "IndexConfig::default_debounce_ms")]
    pub debounce_ms: u64,
}

impl IndexConfig {
    fn default_debounce_ms() -> u64 {
        200
    }

    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        let mut config = SchedulerConfig::default();
        if self.background_threads > 0 {
            config.background_threads = self.background_threads;
        }
        config
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            background_threads: 0,
            debounce_ms: Self::default_debounce_ms(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid config: {}", format_validation_errors(.0))]
    Invalid(Vec<ConfigValidationError>),
}

fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Redact quoted user values from a TOML error message; keys and schema names stay.
fn sanitize_toml_error_message(message: &str) -> String {
    static QUOTED_STRING_RE: OnceLock<regex::Regex> = OnceLock::new();
    static SINGLE_QUOTED_STRING_RE: OnceLock<regex::Regex> = OnceLock::new();

    let re = QUOTED_STRING_RE.get_or_init(|| {
        regex::Regex::new(r#""(?:\\.|[^"\\])*""#).expect("quoted-string regex should compile")
    });
    let out = re.replace_all(message, r#""<redacted>""#);

    let re_single = SINGLE_QUOTED_STRING_RE.get_or_init(|| {
        regex::Regex::new(r#"'(?:\\.|[^'\\])*'"#)
            .expect("single-quoted-string regex should compile")
    });
    let mut out = re_single.replace_all(&out, "'<redacted>'").into_owned();

    // serde wraps user-controlled field names and variants in backticks:
    // "unknown variant `x`, expected `a` or `b`". Schema names after
    // ", expected" are kept.
    let start = ["unknown field `", "unknown variant `"]
        .iter()
        .filter_map(|pattern| out.find(pattern).map(|pos| pos + pattern.len() - 1))
        .min();
    if let Some(start) = start {
        let after_start = &out[start + 1..];
        let end_rel = after_start
            .find("`, expected")
            .or_else(|| after_start.find('`'));
        if let Some(end_rel) = end_rel {
            out.replace_range(start + 1..start + 1 + end_rel, "<redacted>");
        }
    }

    out
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a source snippet; keep only the message.
        ConfigError::Toml(sanitize_toml_error_message(err.message()))
    }
}

impl AssistConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: AssistConfig = toml::from_str(text)?;
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }
        Ok(config)
    }
}

pub const ASSIST_CONFIG_ENV_VAR: &str = "SPRING_ASSIST_CONFIG";

static CONFIG_ENV_LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();

fn config_env_lock() -> &'static ReentrantMutex<()> {
    CONFIG_ENV_LOCK.get_or_init(|| ReentrantMutex::new(()))
}

/// Run `f` while holding the lock that guards [`ASSIST_CONFIG_ENV_VAR`] reads.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = config_env_lock().lock();
    f()
}

/// Find the config file for a workspace root.
///
/// Search order:
/// 1) `SPRING_ASSIST_CONFIG` (absolute or relative to `workspace_root`)
/// 2) `spring-assist.toml`
/// 3) `.spring-assist.toml`
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    let _guard = config_env_lock().lock();
    if let Some(value) = std::env::var_os(ASSIST_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            workspace_root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["spring-assist.toml", ".spring-assist.toml"]
        .into_iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Load the configuration for a workspace root; defaults and `None` when no
/// file is present.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(AssistConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(workspace_root) else {
        return Ok((AssistConfig::default(), None));
    };

    let config = AssistConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}
