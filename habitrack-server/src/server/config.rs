use crate::analytics::BackfillPolicy;
use chrono_tz::Tz;
use habitrack_shared::domain::HabitSeed;
use serde::Deserialize;
use std::path::PathBuf;
use std::{env, fs, path::Path};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Habits inserted on startup when the database has none.
    #[serde(default)]
    pub habits: Vec<HabitSeed>,
    #[serde(default)]
    pub backfill: BackfillPolicy,
    /// IANA name used to decide what "today" is; UTC when unset.
    pub timezone: Option<String>,
    /// Directory served for non-API paths (the web frontend).
    pub static_dir: Option<PathBuf>,
    pub dev_cors_origin: Option<String>,
    pub listen_port: Option<u16>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Timezone(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Yaml(e) => write!(f, "YAML error: {}", e),
            ConfigError::Timezone(tz) => write!(f, "unknown timezone: {}", tz),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        ConfigError::Yaml(value)
    }
}

impl AppConfig {
    /// Reads `CONFIG_PATH`, or `config.yaml` when unset. A missing default
    /// file yields the built-in defaults; an explicit path must exist.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var("CONFIG_PATH") {
            Ok(path) => Self::load_from_path(path),
            Err(_) if !Path::new(DEFAULT_CONFIG_PATH).exists() => {
                tracing::info!(path = DEFAULT_CONFIG_PATH, "config not found; using defaults");
                Ok(Self::default())
            }
            Err(_) => Self::load_from_path(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = serde_yaml::from_str(text)?;
        cfg.tz()?;
        Ok(cfg)
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        match &self.timezone {
            None => Ok(Tz::UTC),
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::Timezone(name.clone())),
        }
    }
}
