use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use storjwatch::{
  aggregate::FleetSummary,
  config::{Config, DEFAULT_CONFIG_FILE},
  init_tracing,
  models::NodeSnapshot,
  node_processing::collect_fleet,
  report::{render_node, render_summary},
};

/// Provides a terminal dashboard for storj nodes.
#[derive(Parser)]
#[command(name = "storjwatch", about)]
struct Cli {
  /// Path to config file.
  #[arg(env = "STORJWATCH_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
  config_file: PathBuf,

  /// Print snapshots and summary as JSON instead of boxes.
  #[arg(long)]
  json: bool,

  /// Logging verbosity (trace, debug, info, warn, error).
  #[arg(long, default_value = "info")]
  log_level: String,
}

#[derive(Serialize)]
struct FleetReport<'a> {
  nodes: &'a [NodeSnapshot],
  summary: &'a FleetSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(&cli.log_level);

  run(&cli).await
}

async fn run(cli: &Cli) -> Result<()> {
  let config = Config::from_file(&cli.config_file)?;
  let nodes = collect_fleet(&config, Utc::now())
    .await
    .context("could not collect node status")?;
  let summary = FleetSummary::from_nodes(&nodes);

  if cli.json {
    let report = FleetReport { nodes: &nodes, summary: &summary };
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  let colored = std::io::stdout().is_terminal();
  for node in &nodes {
    print!("{}", render_node(node, colored));
  }
  print!("{}", render_summary(&summary));
  Ok(())
}
