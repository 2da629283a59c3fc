use crate::error::AppError;
use crate::filtering::FilterCriterion;
use crate::sorting::SortSpec;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub const CONFIG_FILE: &str = "tarefas.json";
pub const ENV_API_URL: &str = "TAREFAS_API_URL";
pub const ENV_ACCESS_TOKEN: &str = "TAREFAS_ACCESS_TOKEN";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: bool,
    pub console: bool,
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
            console: false,
            directory: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub access_token: Option<String>,
    pub timeout_ms: u64,
    pub sort: SortSpec,
    pub filter: FilterCriterion,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            access_token: None,
            timeout_ms: 10_000,
            sort: SortSpec::default(),
            filter: FilterCriterion::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Reads `path` if it exists (defaults otherwise), then applies the
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let mut config = if path.exists() {
            let data = fs::read_to_string(path)?;
            serde_json::from_str(&data)
                .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.access_token = Some(token);
        }
    }

    /// Writes a default config into `dir`. Returns `false` when one is
    /// already there.
    pub fn init(dir: &Path) -> Result<bool, AppError> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Ok(false);
        }
        fs::create_dir_all(dir)?;
        fs::write(&config_path, serde_json::to_string_pretty(&Config::default())?)?;
        Ok(true)
    }
}
