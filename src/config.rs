use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::SodarError;

pub const DEFAULT_CONFIG_FILE: &str = ".sodar-sync.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub global: GlobalSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GlobalSection {
    #[serde(default)]
    pub sodar_server_url: Option<String>,
    #[serde(default)]
    pub sodar_api_token: Option<String>,
    #[serde(default)]
    pub sodar_api_key: Option<String>,
}

/// Values given on the command line (or through the environment).
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub verbose: bool,
    pub sodar_server_url: Option<String>,
    pub sodar_api_token: Option<String>,
}

/// Settings shared by all commands. Built once and passed down explicitly.
#[derive(Clone)]
pub struct CommonConfig {
    pub verbose: bool,
    pub sodar_server_url: String,
    pub sodar_api_token: String,
    /// Legacy API key, only read from the config file.
    pub sodar_api_key: Option<String>,
}

impl fmt::Debug for CommonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommonConfig")
            .field("verbose", &self.verbose)
            .field("sodar_server_url", &self.sodar_server_url)
            .field("sodar_api_token", &redact(&self.sodar_api_token))
            .field("sodar_api_key", &self.sodar_api_key.as_deref().map(redact))
            .finish()
    }
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    let hidden = secret.chars().count().saturating_sub(4);
    format!("{visible}{}", "*".repeat(hidden))
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_path() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.home_dir().join(DEFAULT_CONFIG_FILE))
    }

    /// Reads the config file. An explicit path must exist; the default one may be absent.
    pub fn load(path: Option<&Path>) -> Result<ConfigFile, SodarError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(ConfigFile::default()),
            },
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| SodarError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| SodarError::ConfigParse(err.to_string()))
    }

    pub fn resolve(
        path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<CommonConfig, SodarError> {
        let file = Self::load(path)?;
        Self::resolve_config(file, overrides)
    }

    pub fn resolve_config(
        file: ConfigFile,
        overrides: ConfigOverrides,
    ) -> Result<CommonConfig, SodarError> {
        let global = file.global;
        let sodar_server_url = overrides
            .sodar_server_url
            .or(global.sodar_server_url)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| SodarError::MissingConfig("sodar_server_url".to_string()))?;
        let sodar_api_token = overrides
            .sodar_api_token
            .or(global.sodar_api_token)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| SodarError::MissingConfig("sodar_api_token".to_string()))?;

        Ok(CommonConfig {
            verbose: overrides.verbose,
            sodar_server_url,
            sodar_api_token,
            sodar_api_key: global.sodar_api_key,
        })
    }
}
