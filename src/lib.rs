pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod earnings;
pub mod error;
pub mod log_reader;
pub mod models;
pub mod node_processing;
pub mod node_state;
pub mod report;
pub mod timestamp;

use tracing_subscriber::EnvFilter;

/// Logs go to stderr so they never mix with the report on stdout. `RUST_LOG` wins over
/// `default_level`.
pub fn init_tracing(default_level: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}
