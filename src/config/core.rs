use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::Serialize;
use std::path::Path;

use super::settings::Settings;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "AUTO_CONCURRENCY_";

/// Base name of the repository config file
const REPO_CONFIG_BASE: &str = "auto-concurrency";

pub struct AppConfig {
    figment: Figment,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_with(None, None::<&()>)
    }

    /// Layer defaults, user config, repository config, an explicit config file,
    /// environment variables and CLI overrides (highest priority last)
    pub fn load_with<T: Serialize>(
        custom_config: Option<&str>,
        cli_overrides: Option<T>,
    ) -> Result<Self> {
        tracing::trace!("CONFIG LOAD: Starting");

        let user_base = Self::user_config_base_path();
        let mut figment = Figment::new()
            .merge(Toml::string(DEFAULT_CONFIG))
            .merge(Toml::file(format!("{user_base}.toml")))
            .merge(Json::file(format!("{user_base}.json")))
            .merge(Yaml::file(format!("{user_base}.yaml")))
            .merge(Yaml::file(format!("{user_base}.yml")))
            .merge(Toml::file(format!("{REPO_CONFIG_BASE}.toml")))
            .merge(Json::file(format!("{REPO_CONFIG_BASE}.json")))
            .merge(Yaml::file(format!("{REPO_CONFIG_BASE}.yaml")))
            .merge(Yaml::file(format!("{REPO_CONFIG_BASE}.yml")));

        if let Some(path) = custom_config {
            if !Path::new(path).exists() {
                bail!("Config file not found: {path}");
            }
            figment = match Path::new(path).extension().and_then(|e| e.to_str()) {
                Some("json") => figment.merge(Json::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(overrides) = cli_overrides {
            tracing::trace!("CONFIG LOAD: Applying CLI overrides");
            figment = figment.merge(Serialized::defaults(overrides));
        }

        Ok(AppConfig { figment })
    }

    /// Typed view of the merged configuration
    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .context("Failed to parse merged configuration")
    }

    /// Get a nested object/section as JSON
    pub fn get_section(&self, path: &str) -> Result<serde_json::Value> {
        Ok(self.figment.extract_inner(path)?)
    }

    /// Get the full merged configuration as a structured value
    pub fn get_full_config(&self) -> Result<serde_json::Value> {
        Ok(self.figment.extract()?)
    }

    fn user_config_base_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{home}/.config/auto-concurrency/config"),
            Err(_) => "~/.config/auto-concurrency/config".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use crate::models::GroupingMode;
    use crate::strategy::{StrategyChoice, WorkerRequest};
    use std::io::Write;

    #[test]
    fn test_config_loads_defaults() {
        let config = AppConfig::load().expect("Should load default config");
        let full = config.get_full_config().unwrap();
        assert!(full.get("concurrency").is_some());
        assert!(full.get("backend").is_some());

        let section = config.get_section("concurrency").unwrap();
        assert!(section.get("workers").is_some());
    }

    #[test]
    fn test_missing_custom_config_is_an_error() {
        let config = AppConfig::load_with(Some("non_existent.toml"), None::<&()>);
        assert!(config.is_err());
    }

    #[test]
    fn test_custom_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[concurrency]\nworkers = 3\nstrategy = \"threaded\"\ngrouping = \"package\""
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let settings = AppConfig::load_with(Some(path), None::<&()>)
            .unwrap()
            .settings()
            .unwrap();
        let overrides = settings.strategy_override().unwrap();
        assert_eq!(overrides.requested_workers, Some(WorkerRequest::Count(3)));
        assert_eq!(overrides.strategy, StrategyChoice::ForceThreaded);
        assert_eq!(overrides.grouping, GroupingMode::Package);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut cli = ConfigOverrides::default();
        cli.concurrency.workers = Some("6".to_string());
        cli.concurrency.grouping = Some("file".to_string());

        let settings = AppConfig::load_with(None, Some(cli)).unwrap().settings().unwrap();
        let overrides = settings.strategy_override().unwrap();
        assert_eq!(overrides.requested_workers, Some(WorkerRequest::Count(6)));
        assert_eq!(overrides.grouping, GroupingMode::File);
    }
}
