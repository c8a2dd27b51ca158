//! Layered configuration: defaults, then the JSON file named by
//! `TUTORD_CONFIG`, then `TUTORD_WEEKS`.

use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const CONFIG_ENV: &str = "TUTORD_CONFIG";
pub const ENV_PREFIX: &str = "TUTORD_";
pub const MAX_WEEKS: usize = 52;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("config file {0} does not exist")]
    MissingFile(PathBuf),

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Length of every attendance record.
    pub weeks: usize,
    /// `tracing` filter used when `TUTORD_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weeks: 13,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load and validate from every source, highest priority last:
    /// defaults, the `TUTORD_CONFIG` file, `TUTORD_WEEKS`.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Config = Self::figment()?.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Provider chain behind [`Config::load`].
    pub fn figment() -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) {
            // Figment treats a missing file as empty; a named file must exist.
            if !path.exists() {
                return Err(ConfigError::MissingFile(path));
            }
            figment = figment.merge(Json::file(path));
        }

        // Only `weeks` comes from the environment; TUTORD_LOG is read by the
        // tracing filter and TUTORD_CONFIG names the file.
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).only(&["weeks"])))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weeks == 0 || self.weeks > MAX_WEEKS {
            return Err(ConfigError::InvalidValue {
                field: "weeks".to_string(),
                reason: format!("must be between 1 and {MAX_WEEKS}, got {}", self.weeks),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_sources() {
        Jail::expect_with(|_jail| {
            let config = Config::load().expect("load defaults");
            assert_eq!(config, Config::default());
            assert_eq!(config.weeks, 13);
            assert_eq!(config.log_filter, "warn");
            Ok(())
        });
    }

    #[test]
    fn reads_config_file_with_partial_fields() {
        Jail::expect_with(|jail| {
            jail.create_file("tutord.json", r#"{ "logFilter": "debug" }"#)?;
            jail.set_env(CONFIG_ENV, "tutord.json");

            let config = Config::load().expect("load file");
            assert_eq!(config.weeks, 13);
            assert_eq!(config.log_filter, "debug");
            Ok(())
        });
    }

    #[test]
    fn env_weeks_beats_file() {
        Jail::expect_with(|jail| {
            jail.create_file("tutord.json", r#"{ "weeks": 12, "logFilter": "info" }"#)?;
            jail.set_env(CONFIG_ENV, "tutord.json");
            jail.set_env("TUTORD_WEEKS", "6");

            let config = Config::load().expect("load");
            assert_eq!(config.weeks, 6);
            assert_eq!(config.log_filter, "info");
            Ok(())
        });
    }

    #[test]
    fn log_env_does_not_leak_into_config() {
        Jail::expect_with(|jail| {
            jail.set_env("TUTORD_LOG", "trace");
            let config = Config::load().expect("load");
            assert_eq!(config.log_filter, "warn");
            Ok(())
        });
    }

    #[test]
    fn rejects_bad_values() {
        Jail::expect_with(|jail| {
            jail.set_env("TUTORD_WEEKS", "53");
            assert!(matches!(
                Config::load(),
                Err(ConfigError::InvalidValue { ref field, .. }) if field == "weeks"
            ));

            jail.set_env("TUTORD_WEEKS", "0");
            assert!(matches!(Config::load(), Err(ConfigError::InvalidValue { .. })));

            jail.set_env("TUTORD_WEEKS", "many");
            assert!(matches!(Config::load(), Err(ConfigError::Figment(_))));
            Ok(())
        });
    }

    #[test]
    fn named_file_must_exist() {
        Jail::expect_with(|jail| {
            jail.set_env(CONFIG_ENV, "missing.json");
            assert!(matches!(Config::load(), Err(ConfigError::MissingFile(_))));

            jail.create_file("broken.json", "{ not json")?;
            jail.set_env(CONFIG_ENV, "broken.json");
            assert!(matches!(Config::load(), Err(ConfigError::Figment(_))));
            Ok(())
        });
    }
}
