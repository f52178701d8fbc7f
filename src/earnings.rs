//! Runs the external earnings calculator for a node and scrapes its report.

use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::EarningsConfig;
use crate::error::NodeError;
use crate::models::Financials;

const CURRENT_TOTAL_LABEL: &str = "Total\t\t\t\t\t";
const ESTIMATED_TOTAL_LABEL: &str = "Estimated total";
const DISK_USED_LABEL: &str = "Disk Current Total";
const UNPAID_DATA_LABEL: &str = "Total Unpaid Data <─";
const DEVIATION_LABEL: &str = "Disk Last Report deviates";

static PERCENTAGE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(\d+\.\d+)%").expect("percentage pattern"));

impl Financials {
  /// Picks the labelled lines out of an earnings report. Labels that never show up
  /// leave their field unset.
  pub fn parse(report: &str) -> Self {
    let mut financials = Financials::default();
    for line in report.lines() {
      // "Disk Current Total" also carries the tab run, so anchor at line start
      if line.starts_with(CURRENT_TOTAL_LABEL) {
        financials.current_total = last_tokens(line, 1);
      }
      if line.contains(ESTIMATED_TOTAL_LABEL) {
        financials.estimated_total = last_tokens(line, 1);
      }
      if line.contains(DISK_USED_LABEL) {
        financials.disk_used = last_tokens(line, 2);
      }
      if line.contains(UNPAID_DATA_LABEL) {
        financials.unpaid_data = last_tokens(line, 2);
      }
      if line.contains(DEVIATION_LABEL) {
        financials.deviation_percentage = PERCENTAGE
          .captures(line)
          .and_then(|c| c[1].parse::<f64>().ok())
          .map(|pct| format!("{:.2}", pct));
      }
    }
    financials
  }
}

fn last_tokens(line: &str, count: usize) -> Option<String> {
  let tokens: Vec<&str> = line.split_whitespace().collect();
  if tokens.len() < count {
    return None;
  }
  Some(tokens[tokens.len() - count..].join(" "))
}

/// Runs the calculator against `db_path` and returns its stdout.
pub async fn run_generator(node: &str, config: &EarningsConfig, db_path: &Path) -> Result<String, NodeError> {
  let mut command = match config.interpreter.as_deref().filter(|i| !i.is_empty()) {
    Some(interpreter) => {
      let mut command = Command::new(interpreter);
      command.arg(&config.path);
      command
    }
    None => Command::new(&config.path),
  };
  command
    .arg(db_path)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  info!("Running earnings calculator for {}", node);
  let child = command.spawn().map_err(|source| NodeError::EarningsSpawn {
    node: node.to_string(),
    program: config.path.display().to_string(),
    source,
  })?;

  let output = match timeout(Duration::from_secs(config.timeout_secs), child.wait_with_output()).await {
    Ok(result) => result.map_err(|source| NodeError::EarningsSpawn {
      node: node.to_string(),
      program: config.path.display().to_string(),
      source,
    })?,
    Err(_) => {
      return Err(NodeError::EarningsTimeout { node: node.to_string(), secs: config.timeout_secs });
    }
  };

  if !output.status.success() {
    return Err(NodeError::EarningsFailed {
      node: node.to_string(),
      status: output.status,
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
  if stdout.trim().is_empty() {
    warn!("Earnings calculator printed nothing for {}", node);
  }
  Ok(stdout)
}
