use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{ErrorKind::Validation, Result};

pub const DEFAULT_CONFIG_FILE: &str = "ac2.config.yaml";
pub const ENV_PREFIX: &str = "AC2_";

/// Input limits checked before anything reaches the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub max_name_length: usize,
    pub max_title_length: usize,
    pub max_description_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_length: 1000,
            max_title_length: 200,
            max_description_length: 10_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// In-memory store when unset.
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
    #[serde(flatten)]
    pub limits: Limits,
    pub recently_published_limit: usize,
    pub deadline_sweep_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8000,
            data_dir: None,
            log_level: "info".to_owned(),
            limits: Limits::default(),
            recently_published_limit: 10,
            deadline_sweep_secs: 60,
        }
    }
}

/// Values given on the command line, applied last.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl ServerConfig {
    /// defaults, then the YAML file, then `AC2_*` variables, then the CLI
    pub fn figment(config_file: &Path, overrides: &CliOverrides) -> Figment {
        Figment::from(Serialized::defaults(ServerConfig::default()))
            .merge(Yaml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
    }

    pub fn load(config_file: Option<&Path>, overrides: &CliOverrides) -> Result<Self> {
        let config_file = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let config: ServerConfig = Self::figment(config_file, overrides).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.level()?;
        if self.deadline_sweep_secs == 0 {
            return Err(Validation("deadline_sweep_secs must be at least 1".to_owned()).into());
        }
        if self.recently_published_limit == 0 {
            return Err(Validation("recently_published_limit must be at least 1".to_owned()).into());
        }
        Ok(())
    }

    pub fn level(&self) -> Result<Level> {
        self.log_level
            .parse()
            .map_err(|_| Validation(format!("Unknown log level '{}'", self.log_level)).into())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
