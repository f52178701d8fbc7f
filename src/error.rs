use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failures that make a node's snapshot impossible to build. The run stops on the first one.
#[derive(Debug, Error)]
pub enum NodeError {
  #[error("node {node}: cannot read log location {}", path.display())]
  LogLocation {
    node: String,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("node {node}: log directory {} contains no log files", path.display())]
  EmptyLogDirectory { node: String, path: PathBuf },

  #[error("node {node}: could not run earnings calculator {program}")]
  EarningsSpawn {
    node: String,
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("node {node}: earnings calculator exited with {status}: {stderr}")]
  EarningsFailed { node: String, status: ExitStatus, stderr: String },

  #[error("node {node}: earnings calculator did not finish within {secs}s")]
  EarningsTimeout { node: String, secs: u64 },

  #[error("node {node}: log scan task failed")]
  ScanAborted {
    node: String,
    #[source]
    source: tokio::task::JoinError,
  },
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("the file '{}' was not found, please check the path and try again", path.display())]
  NotFound { path: PathBuf },

  #[error("could not read config file '{}'", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("the file '{}' is not a valid config file", path.display())]
  Invalid {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("config lists no nodes")]
  NoNodes,
}
