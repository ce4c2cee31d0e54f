use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use alloy::primitives::Address;
use dxmm_core::{AccessControl, AgentConfig, AuctionIndex, CycleSettings};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "dxmm.toml";
const CONFIG_DIR_NAME: &str = "dxmm";

#[derive(Debug, Deserialize, PartialEq)]
pub struct DxmmConfig {
    pub agent: AgentSection,
    pub roles: RolesSection,
    #[serde(default)]
    pub cycle: CycleSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct AgentSection {
    pub exchange: Address,
    pub token: Address,
    pub numeraire: Address,
    pub price_feed: Address,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct RolesSection {
    pub admin: Address,
    #[serde(default)]
    pub operators: Vec<Address>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CycleSection {
    pub poll_interval_secs: u64,
    pub read_timeout_secs: u64,
    pub claim_scan_limit: u64,
    pub claim_cursor_start: u64,
    pub confirmations: u64,
}

impl Default for CycleSection {
    fn default() -> Self {
        let settings = CycleSettings::default();
        Self {
            poll_interval_secs: settings.poll_interval.as_secs(),
            read_timeout_secs: settings.read_timeout.as_secs(),
            claim_scan_limit: settings.claim_scan_limit,
            claim_cursor_start: settings.claim_cursor_start.as_u64(),
            confirmations: settings.confirmations,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse toml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config at {path}: {source}")]
    Invalid {
        path: PathBuf,
        source: dxmm_core::ConfigError,
    },
}

impl DxmmConfig {
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            exchange: self.agent.exchange,
            token: self.agent.token,
            numeraire: self.agent.numeraire,
            price_feed: self.agent.price_feed,
        }
    }

    pub fn access_control(&self) -> Result<AccessControl, dxmm_core::ConfigError> {
        AccessControl::new(self.roles.admin, self.roles.operators.iter().copied())
    }

    pub fn cycle_settings(&self) -> CycleSettings {
        CycleSettings {
            poll_interval: Duration::from_secs(self.cycle.poll_interval_secs),
            read_timeout: Duration::from_secs(self.cycle.read_timeout_secs),
            claim_scan_limit: self.cycle.claim_scan_limit,
            claim_cursor_start: AuctionIndex::new(self.cycle.claim_cursor_start),
            confirmations: self.cycle.confirmations,
        }
    }
}

/// `path` as given, unless it is the default name and only the copy in the
/// platform config dir exists.
pub fn resolve_config_path(path: &Path) -> PathBuf {
    if path.exists() || path != Path::new(DEFAULT_CONFIG_PATH) {
        return path.to_path_buf();
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(DEFAULT_CONFIG_PATH))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

pub fn load_config(path: impl AsRef<Path>) -> Result<DxmmConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: DxmmConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let invalid = |source| ConfigError::Invalid {
        path: path.to_path_buf(),
        source,
    };
    config.agent_config().validate().map_err(invalid)?;
    config.access_control().map_err(invalid)?;

    Ok(config)
}
