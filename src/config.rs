use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "storj-dashboard.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub nodes: BTreeMap<String, NodeConfig>,
  #[serde(rename = "earningscalculator")]
  pub earnings: EarningsConfig,
}

/// `["<log file or rotation dir>", "<storage db dir>"]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(PathBuf, PathBuf)")]
pub struct NodeConfig {
  pub log_path: PathBuf,
  pub db_path: PathBuf,
}

impl From<(PathBuf, PathBuf)> for NodeConfig {
  fn from((log_path, db_path): (PathBuf, PathBuf)) -> Self {
    Self { log_path, db_path }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EarningsConfig {
  pub path: PathBuf,
  #[serde(default = "default_interpreter")]
  pub interpreter: Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_interpreter() -> Option<String> {
  Some("python3".into())
}

fn default_timeout_secs() -> u64 {
  300
}

impl Config {
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| match source.kind() {
      ErrorKind::NotFound => ConfigError::NotFound { path: path.to_path_buf() },
      _ => ConfigError::Read { path: path.to_path_buf(), source },
    })?;
    Self::from_json(&raw).map_err(|err| match err {
      ConfigError::Invalid { source, .. } => ConfigError::Invalid { path: path.to_path_buf(), source },
      other => other,
    })
  }

  pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
    let config: Config = serde_json::from_str(raw).map_err(|source| ConfigError::Invalid {
      path: PathBuf::new(),
      source,
    })?;
    if config.nodes.is_empty() {
      return Err(ConfigError::NoNodes);
    }
    Ok(config)
  }
}
