use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::{Config, EarningsConfig, NodeConfig};
use crate::earnings::run_generator;
use crate::error::NodeError;
use crate::log_reader::{scan_node_log, LogSource};
use crate::models::{Financials, NodeSnapshot};

/// Log scan plus earnings report for one node.
pub async fn process_node(
  name: &str,
  node: &NodeConfig,
  earnings: &EarningsConfig,
  now: DateTime<Utc>,
) -> Result<NodeSnapshot, NodeError> {
  let source = LogSource::resolve(name, &node.log_path)?;

  let scan_name = name.to_string();
  let (state, stats) = tokio::task::spawn_blocking(move || scan_node_log(&scan_name, &source, now))
    .await
    .map_err(|source| NodeError::ScanAborted { node: name.to_string(), source })??;

  let report = run_generator(name, earnings, &node.db_path).await?;
  let financials = Financials::parse(&report);
  info!(
    "Node {}: up={:?} uptime={} events={} estimated_total={}",
    name,
    state.is_up(),
    state.label(),
    stats.events,
    financials.estimated_total.as_deref().unwrap_or("-")
  );

  Ok(state.into_snapshot(name, financials))
}

/// Every configured node, in name order. The first fatal node error ends the run.
pub async fn collect_fleet(config: &Config, now: DateTime<Utc>) -> Result<Vec<NodeSnapshot>, NodeError> {
  let mut snapshots = Vec::with_capacity(config.nodes.len());
  for (name, node) in &config.nodes {
    snapshots.push(process_node(name, node, &config.earnings, now).await?);
  }
  Ok(snapshots)
}
