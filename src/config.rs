//! User configuration (`kryptopit/config.toml` in the platform config dir).
//!
//! Every field is optional in the file; a missing file means defaults.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::importers::DEFAULT_MAX_FILE_SIZE;
use crate::pricing::{
    ConfiguredSource, NbpClient, RateResolver, DEFAULT_LOOKBACK_DAYS, DEFAULT_NBP_API_URL,
};

const CONFIG_FILENAME: &str = "config.toml";
const OFFLINE_ENV: &str = "KRYPTOPIT_OFFLINE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub nbp_api_url: String,
    pub request_timeout_secs: u64,
    pub lookback_days: i64,
    pub max_file_size_bytes: u64,
    /// Never contact NBP; every foreign amount uses the approximate table
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nbp_api_url: DEFAULT_NBP_API_URL.to_string(),
            request_timeout_secs: 10,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            offline: false,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match get_config_path() {
            Ok(path) => Self::load_from(&path)?,
            Err(e) => {
                debug!("No config directory ({}); using defaults", e);
                Self::default()
            }
        };
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {:?}; using defaults", path);
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {:?}", path))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("Invalid config at {:?}", path))?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(OFFLINE_ENV) {
            self.offline = !matches!(value.trim(), "" | "0" | "false");
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn rate_source(&self) -> Result<ConfiguredSource> {
        if self.offline {
            info!("Offline mode: using approximate rates only");
            return Ok(ConfiguredSource::Offline);
        }
        let client = NbpClient::new(&self.nbp_api_url, self.request_timeout())?;
        Ok(ConfiguredSource::Nbp(client))
    }

    /// Resolver over the process-wide rate cache
    pub fn rate_resolver(&self) -> Result<RateResolver<ConfiguredSource>> {
        Ok(RateResolver::new(self.rate_source()?).with_lookback_days(self.lookback_days))
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dir_spec::config_home)
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("kryptopit").join(CONFIG_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.lookback_days, 7);
        assert_eq!(config.max_file_size_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "offline = true\nrequest_timeout_secs = 3\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.offline);
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.nbp_api_url, DEFAULT_NBP_API_URL);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "offline = \"maybe\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_offline_selects_offline_source() {
        let config = Config {
            offline: true,
            ..Config::default()
        };
        assert!(matches!(
            config.rate_source().unwrap(),
            ConfiguredSource::Offline
        ));
    }
}
