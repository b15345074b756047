//! Layered configuration for step helpers.
//!
//! Values merge in order: built-in defaults, then a TOML file, then
//! `STEPCORE_*` environment variables. The file is `stepcore.toml` in the
//! project root unless `STEPCORE_CONFIG_PATH` names another one. Builder
//! methods override individual values afterwards, which is how tests
//! usually configure a context.

use std::{env, str::FromStr, time::Duration};

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::declarative::{LayerComposition, MergeLayer, from_value, merge_value};
use ortho_config::figment::{Figment, providers::Env};
use ortho_config::uncased::Uncased;
use ortho_config::{MergeComposer, OrthoMergeExt, OrthoResult, sanitize_value};
use serde::{Deserialize, Serialize};
use tracing::{debug, level_filters::LevelFilter};

use crate::{
    command::{CommandRunner, DEFAULT_MAX_OUTPUT_BYTES},
    error::ConfigError,
    files::{self, FileError},
    template::{ComparisonMode, DEFAULT_MAX_PASSES},
    value::NumberFormat,
};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "STEPCORE_CONFIG_PATH";
/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "STEPCORE_";
/// Configuration file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "stepcore.toml";
/// Locale name selecting the operating system's number format.
pub const SYSTEM_LOCALE: &str = "system";

/// Settings shared by every step helper in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    project_root: Option<Utf8PathBuf>,
    feature_dir: Option<Utf8PathBuf>,
    artifact_dir: Option<Utf8PathBuf>,
    max_passes: usize,
    comparison_mode: ComparisonMode,
    number_locale: Option<String>,
    command_timeout_secs: Option<u64>,
    max_output_bytes: u64,
    log_level: String,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            project_root: None,
            feature_dir: None,
            artifact_dir: None,
            max_passes: DEFAULT_MAX_PASSES,
            comparison_mode: ComparisonMode::Literal,
            number_locale: None,
            command_timeout_secs: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            log_level: "info".to_owned(),
        }
    }
}

impl StepConfig {
    /// Load configuration for the project containing the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the project root cannot be found, a
    /// layer cannot be read or merged, or a merged value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let root = files::project_root()?;
        Self::load_for(&root)
    }

    /// Load configuration for the project rooted at `project_root`.
    ///
    /// # Errors
    ///
    /// See [`StepConfig::load`].
    pub fn load_for(project_root: &Utf8Path) -> Result<Self, ConfigError> {
        let file = config_file_path(project_root);
        let mut config = merge_layers(file.as_deref())?;
        if config.project_root.is_none() {
            config.project_root = Some(project_root.to_owned());
        }
        config.validate()?;
        debug!(?config, "loaded step configuration");
        Ok(config)
    }

    /// Check merged values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.max_passes > 0, "max_passes", "must be positive")?;
        ensure(self.max_output_bytes > 0, "max_output_bytes", "must be positive")?;
        parse_level(&self.log_level)?;
        Ok(())
    }

    /// Override the project root.
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Set the directory of the running feature file.
    #[must_use]
    pub fn with_feature_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.feature_dir = Some(dir.into());
        self
    }

    /// Override where evaluated templates are saved.
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Override the substitution pass limit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `passes` is zero.
    pub fn with_max_passes(mut self, passes: usize) -> Result<Self, ConfigError> {
        ensure(passes > 0, "max_passes", "must be positive")?;
        self.max_passes = passes;
        Ok(self)
    }

    /// Select the template comparison mode.
    #[must_use]
    pub const fn with_comparison_mode(mut self, mode: ComparisonMode) -> Self {
        self.comparison_mode = mode;
        self
    }

    /// Read numbers with the separators of `locale`, or of the OS locale
    /// when `locale` is `"system"`.
    #[must_use]
    pub fn with_number_locale(mut self, locale: impl Into<String>) -> Self {
        self.number_locale = Some(locale.into());
        self
    }

    /// Default timeout for commands that do not set their own.
    #[must_use]
    pub const fn with_command_timeout_secs(mut self, secs: u64) -> Self {
        self.command_timeout_secs = Some(secs);
        self
    }

    /// Override the per-pipe command output budget.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `max_bytes` is zero.
    pub fn with_max_output_bytes(mut self, max_bytes: u64) -> Result<Self, ConfigError> {
        ensure(max_bytes > 0, "max_output_bytes", "must be positive")?;
        self.max_output_bytes = max_bytes;
        Ok(self)
    }

    /// Override the log level.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown level names.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Result<Self, ConfigError> {
        let name = level.into();
        parse_level(&name)?;
        self.log_level = name;
        Ok(self)
    }

    /// Project root, discovering it from the current directory when unset.
    ///
    /// # Errors
    ///
    /// Fails when the current directory cannot be determined.
    pub fn project_root(&self) -> Result<Utf8PathBuf, FileError> {
        self.project_root
            .as_ref()
            .map_or_else(files::project_root, |root| Ok(root.clone()))
    }

    /// Directory of the running feature file, if known.
    #[must_use]
    pub fn feature_dir(&self) -> Option<&Utf8Path> {
        self.feature_dir.as_deref()
    }

    /// Artefact directory, defaulting to the system temporary directory.
    ///
    /// # Errors
    ///
    /// Fails when the temporary directory is not valid UTF-8.
    pub fn artifact_dir(&self) -> Result<Utf8PathBuf, FileError> {
        match &self.artifact_dir {
            Some(dir) => Ok(dir.clone()),
            None => Utf8PathBuf::from_path_buf(env::temp_dir())
                .map_err(|path| FileError::NonUtf8Path { path }),
        }
    }

    /// Substitution pass limit.
    #[must_use]
    pub const fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Template comparison mode.
    #[must_use]
    pub const fn comparison_mode(&self) -> ComparisonMode {
        self.comparison_mode
    }

    /// Number format selected by `number_locale`.
    #[must_use]
    pub fn number_format(&self) -> NumberFormat {
        match self.number_locale.as_deref() {
            None => NumberFormat::default(),
            Some(locale) if locale.eq_ignore_ascii_case(SYSTEM_LOCALE) => NumberFormat::system(),
            Some(locale) => NumberFormat::from_locale(locale),
        }
    }

    /// Default command timeout.
    #[must_use]
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Per-pipe command output budget.
    #[must_use]
    pub const fn max_output_bytes(&self) -> u64 {
        self.max_output_bytes
    }

    /// Command runner honouring the configured limits.
    #[must_use]
    pub fn command_runner(&self) -> CommandRunner {
        CommandRunner::new(self.max_output_bytes).with_default_timeout(self.command_timeout())
    }

    /// Configured log level.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown level names.
    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        parse_level(&self.log_level)
    }
}

fn ensure(condition: bool, field: &'static str, reason: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: reason.to_owned(),
        })
    }
}

fn parse_level(name: &str) -> Result<LevelFilter, ConfigError> {
    LevelFilter::from_str(name).map_err(|_| ConfigError::Invalid {
        field: "log_level",
        reason: format!("unknown level '{name}'"),
    })
}

/// `STEPCORE_CONFIG_PATH` when set, else `stepcore.toml` in the project root
/// if it exists.
fn config_file_path(project_root: &Utf8Path) -> Option<Utf8PathBuf> {
    if let Ok(explicit) = env::var(CONFIG_ENV_VAR)
        && !explicit.trim().is_empty()
    {
        return Some(Utf8PathBuf::from(explicit));
    }
    let candidate = project_root.join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

fn file_layer(path: &Utf8Path) -> Result<serde_json::Value, ConfigError> {
    let text = files::read_to_string(path)?;
    toml::from_str::<serde_json::Value>(&text).map_err(|err| ConfigError::Parse {
        path: path.to_owned(),
        message: err.to_string(),
    })
}

/// Return the prefixed environment provider for configuration overrides.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).filter(|key| !key.as_str().eq_ignore_ascii_case("config_path"))
}

fn merge_layers(file: Option<&Utf8Path>) -> Result<StepConfig, ConfigError> {
    let mut errors = Vec::new();
    let mut composer = MergeComposer::with_capacity(3);

    match sanitize_value(&StepConfig::default()) {
        Ok(value) => composer.push_defaults(value),
        Err(err) => errors.push(err),
    }

    if let Some(path) = file {
        let value = file_layer(path)?;
        debug!(%path, "merging configuration file");
        composer.push_file(value, Some(path.to_owned()));
    }

    let provider = env_provider().map(|key| Uncased::new(key.as_str().to_ascii_lowercase()));
    match Figment::from(provider)
        .extract::<serde_json::Value>()
        .into_ortho_merge()
    {
        Ok(value) => composer.push_environment(value),
        Err(err) => errors.push(err),
    }

    let composition = LayerComposition::new(composer.layers(), errors);
    composition
        .into_merge_result(merge_into_config)
        .map_err(|source| ConfigError::Merge { source })
}

fn merge_into_config(layers: Vec<MergeLayer<'static>>) -> OrthoResult<StepConfig> {
    let mut merged = serde_json::Value::Object(serde_json::Map::new());
    for layer in layers {
        merge_value(&mut merged, layer.into_value());
    }
    from_value(merged)
}
