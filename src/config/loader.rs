//! Configuration Loader
//!
//! Environment-aware layered loading. Later layers override earlier ones:
//!
//! 1. built-in defaults ([`PlanConfig::default`])
//! 2. `<config_dir>/tasker-plan.toml`
//! 3. `<config_dir>/tasker-plan.<environment>.toml`
//! 4. `TASKER_PLAN__<SECTION>__<FIELD>` environment variables

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::PlanConfig;
use crate::constants::system;

/// Loaded configuration plus the context it was resolved from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: PlanConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from(system::CONFIG_DIRECTORY));
        let config = Self::load_layers(&config_directory, environment, None)?;

        info!(
            environment = %environment,
            config_directory = %config_directory.display(),
            worker_threads = config.execution.worker_threads,
            max_concurrent_items = config.execution.max_concurrent_items,
            failure_policy = ?config.execution.failure_policy,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, e.g. one assembled in code
    pub fn from_config(config: PlanConfig) -> ConfigResult<ConfigManager> {
        config.validate()?;
        Ok(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory: PathBuf::from(system::CONFIG_DIRECTORY),
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Get the detected environment name
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment from environment variables
    pub(crate) fn detect_environment() -> String {
        env::var("TASKER_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    /// Merge every layer and validate the result.
    ///
    /// `env_vars` replaces the process environment when given, so tests can
    /// exercise the variable layer without touching global state.
    fn load_layers(
        config_directory: &Path,
        environment: &str,
        env_vars: Option<config::Map<String, String>>,
    ) -> ConfigResult<PlanConfig> {
        let base_file = config_directory.join(format!("{}.toml", system::CONFIG_FILE_STEM));
        let env_file =
            config_directory.join(format!("{}.{environment}.toml", system::CONFIG_FILE_STEM));

        debug!(
            base_file = %base_file.display(),
            env_file = %env_file.display(),
            "Resolving configuration layers"
        );

        let builder = Self::with_defaults(Config::builder(), &PlanConfig::default())?
            .add_source(File::from(base_file).format(FileFormat::Toml).required(false))
            .add_source(File::from(env_file).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(system::CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env_vars),
            );

        let config: PlanConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn with_defaults(
        builder: ConfigBuilder<config::builder::DefaultState>,
        defaults: &PlanConfig,
    ) -> ConfigResult<ConfigBuilder<config::builder::DefaultState>> {
        let execution = &defaults.execution;
        let failure_policy = serde_json::to_value(execution.failure_policy)
            .ok()
            .and_then(|value| value.as_str().map(str::to_string))
            .ok_or_else(|| {
                ConfigurationError::Deserialization("failure policy has no string form".to_string())
            })?;

        Ok(builder
            .set_default("execution.worker_threads", execution.worker_threads as i64)?
            .set_default(
                "execution.max_concurrent_items",
                execution.max_concurrent_items as i64,
            )?
            .set_default("execution.failure_policy", failure_policy)?
            .set_default("execution.idle_wait_ms", execution.idle_wait_ms as i64)?
            .set_default(
                "execution.stall_warning_after_ms",
                execution.stall_warning_after_ms as i64,
            )?
            .set_default(
                "diagnostics.max_items_listed",
                defaults.diagnostics.max_items_listed as i64,
            )?
            .set_default(
                "diagnostics.event_channel_capacity",
                defaults.diagnostics.event_channel_capacity as i64,
            )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailurePolicy;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_config_dir() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("tasker-plan.toml"),
            r#"
[execution]
worker_threads = 6
max_concurrent_items = 3
idle_wait_ms = 20

[diagnostics]
max_items_listed = 10
"#,
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("tasker-plan.test.toml"),
            r#"
[execution]
failure_policy = "continue_on_failure"
max_concurrent_items = 2
"#,
        )
        .unwrap();
        temp_dir
    }

    fn no_env() -> Option<config::Map<String, String>> {
        Some(config::Map::new())
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigManager::load_layers(temp_dir.path(), "development", no_env()).unwrap();
        assert_eq!(config, PlanConfig::default());
    }

    #[test]
    fn test_base_file_overrides_defaults() {
        let temp_dir = setup_test_config_dir();
        let config = ConfigManager::load_layers(temp_dir.path(), "production", no_env()).unwrap();
        assert_eq!(config.execution.worker_threads, 6);
        assert_eq!(config.execution.max_concurrent_items, 3);
        assert_eq!(config.execution.idle_wait_ms, 20);
        assert_eq!(config.execution.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.diagnostics.max_items_listed, 10);
    }

    #[test]
    fn test_environment_specific_overrides() {
        let temp_dir = setup_test_config_dir();
        let config = ConfigManager::load_layers(temp_dir.path(), "test", no_env()).unwrap();
        assert_eq!(config.execution.worker_threads, 6);
        assert_eq!(config.execution.max_concurrent_items, 2);
        assert_eq!(
            config.execution.failure_policy,
            FailurePolicy::ContinueOnFailure
        );
    }

    #[test]
    fn test_environment_variables_override_files() {
        let temp_dir = setup_test_config_dir();
        let mut vars = config::Map::new();
        vars.insert(
            "TASKER_PLAN__EXECUTION__WORKER_THREADS".to_string(),
            "9".to_string(),
        );
        let config = ConfigManager::load_layers(temp_dir.path(), "test", Some(vars)).unwrap();
        assert_eq!(config.execution.worker_threads, 9);
        assert_eq!(config.execution.max_concurrent_items, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("tasker-plan.toml"),
            "[execution]\nworker_threads = 0\n",
        )
        .unwrap();
        let err = ConfigManager::load_layers(temp_dir.path(), "test", no_env()).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("tasker-plan.toml"),
            "[execution]\nfailure_policy = \"sometimes\"\n",
        )
        .unwrap();
        assert!(ConfigManager::load_layers(temp_dir.path(), "test", no_env()).is_err());
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = PlanConfig::default();
        config.execution.max_concurrent_items = 0;
        assert!(ConfigManager::from_config(config).is_err());

        let manager = ConfigManager::from_config(PlanConfig::default()).unwrap();
        assert_eq!(manager.config_directory(), Path::new("config"));
    }
}
