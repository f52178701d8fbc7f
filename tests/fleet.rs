use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{TimeZone, Utc};
use storjwatch::aggregate::FleetSummary;
use storjwatch::config::{Config, EarningsConfig, NodeConfig};
use storjwatch::error::NodeError;
use storjwatch::models::{MaintenanceKind, Satellite, TaskStatus};
use storjwatch::node_processing::{collect_fleet, process_node};
use tempfile::TempDir;

const SL: &str = "1wFTAgs9DP5RSnCqKV1eLf6N9wtk4EAtmN5DpSxcs8EjT69tGE";
const EU1: &str = "12L9ZFwhzVpuEKMUNUqkaTLGzwY9G24tbiigLiXpmZWKwmcNDDs";

const REPORT_SCRIPT: &str = r#"
echo "Total						     1.00 TBm	  2.00 TB		\$   3.25"
echo "Estimated total by end of month					     2.00 TBm	  4.00 TB		\$   6.50"
echo "Disk Current Total								  1.50 TB"
echo "Total Unpaid Data <─										   250.00 GB"
echo "Disk Last Report deviates 1.5% from Disk Average"
"#;

fn earnings(dir: &Path, script: &str, timeout_secs: u64) -> EarningsConfig {
  let path = dir.join("earnings.sh");
  fs::write(&path, script).unwrap();
  EarningsConfig { path, interpreter: Some("sh".to_string()), timeout_secs }
}

fn line(ts: &str, logger: &str, msg: &str, sat: &str) -> String {
  format!("{}\tINFO\t{}\t{}\t{{\"satelliteID\": \"{}\"}}\n", ts, logger, msg, sat)
}

fn write_node_a(dir: &Path) -> PathBuf {
  let logs = dir.join("node-a");
  fs::create_dir(&logs).unwrap();

  let older = logs.join("node.log.1");
  fs::write(
    &older,
    format!(
      "2024-06-01T00:00:00Z\tINFO\tConfiguration loaded\t{{}}\n{}",
      line("2024-06-01T01:00:00Z", "lazyfilewalker.used-space-filewalker", "subprocess started", EU1)
    ),
  )
  .unwrap();
  fs::File::options()
    .write(true)
    .open(&older)
    .unwrap()
    .set_modified(SystemTime::now() - Duration::from_secs(7200))
    .unwrap();

  let newest = [
    line("2024-06-05T00:00:00Z", "lazyfilewalker.gc-filewalker", "subprocess started", EU1),
    "2024-06-08T00:00:00Z\tINFO\tConfiguration loaded\t{}\n".to_string(),
    line("2024-06-09T00:00:00Z", "lazyfilewalker.gc-filewalker", "subprocess started", SL),
    line("2024-06-09T10:00:00Z", "lazyfilewalker.trash-cleanup-filewalker", "subprocess started", EU1),
    line("2024-06-09T11:00:00Z", "lazyfilewalker.trash-cleanup-filewalker", "subprocess finished successfully", EU1),
  ]
  .concat();
  fs::write(logs.join("node.log"), newest).unwrap();
  logs
}

fn write_node_b(dir: &Path) -> PathBuf {
  let log = dir.join("node-b.log");
  let content = [
    "2024-06-01T00:00:00Z\tINFO\tConfiguration loaded\t{}\n".to_string(),
    line("2024-06-02T00:00:00Z", "lazyfilewalker.gc-filewalker", "subprocess started", SL),
    "2024-06-03T00:00:00Z\tINFO\tGot a signal from the OS: \"terminated\"\n".to_string(),
  ]
  .concat();
  fs::write(&log, content).unwrap();
  log
}

#[tokio::test]
async fn builds_fleet_snapshot() {
  let dir = TempDir::new().unwrap();
  let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();

  let mut nodes = BTreeMap::new();
  nodes.insert(
    "a".to_string(),
    NodeConfig { log_path: write_node_a(dir.path()), db_path: dir.path().join("a-db") },
  );
  nodes.insert(
    "b".to_string(),
    NodeConfig { log_path: write_node_b(dir.path()), db_path: dir.path().join("b-db") },
  );
  let config = Config { nodes, earnings: earnings(dir.path(), REPORT_SCRIPT, 30) };

  let snapshots = collect_fleet(&config, now).await.unwrap();
  assert_eq!(snapshots.len(), 2);

  let a = &snapshots[0];
  assert_eq!(a.name, "a");
  assert_eq!(a.is_up, Some(true));
  assert_eq!(a.uptime_label, "2d 12h");
  assert_eq!(a.tasks[(MaintenanceKind::GarbageCollectionFilewalker, Satellite::SL)], TaskStatus::Running);
  assert_eq!(
    a.tasks[(MaintenanceKind::TrashCleanupFilewalker, Satellite::EU1)].to_string(),
    "1d 1h ago"
  );
  // from the previous lifetime and the older rotation, both out of reach
  assert_eq!(a.tasks[(MaintenanceKind::GarbageCollectionFilewalker, Satellite::EU1)], TaskStatus::Unknown);
  assert_eq!(a.tasks[(MaintenanceKind::UsedSpaceFilewalker, Satellite::EU1)], TaskStatus::Unknown);
  assert_eq!(a.financials.estimated_total.as_deref(), Some("6.50"));
  assert_eq!(a.financials.current_total.as_deref(), Some("3.25"));
  assert_eq!(a.financials.deviation_percentage.as_deref(), Some("1.50"));

  let b = &snapshots[1];
  assert_eq!(b.is_up, Some(false));
  assert_eq!(b.uptime_label, "offline");
  assert!(b.tasks.iter().all(|(_, _, s)| *s == TaskStatus::Offline));

  let summary = FleetSummary::from_nodes(&snapshots);
  assert_eq!(summary.running[(MaintenanceKind::GarbageCollectionFilewalker, Satellite::SL)], 1);
  assert_eq!(summary.nodes_up, 1);
  assert!((summary.estimated_total - 13.0).abs() < 1e-9);
  assert!((summary.disk_used_tb - 3.0).abs() < 1e-9);
  assert!((summary.unpaid_data_tb - 0.5).abs() < 1e-9);

  let json = serde_json::to_value(&snapshots[0]).unwrap();
  assert_eq!(json["tasks"]["GCF"]["SL"], "running");
  assert_eq!(json["financials"]["disk_used"], "1.50 TB");
}

#[tokio::test]
async fn missing_log_aborts_with_node_name() {
  let dir = TempDir::new().unwrap();
  let mut nodes = BTreeMap::new();
  nodes.insert(
    "ghost".to_string(),
    NodeConfig { log_path: dir.path().join("nope.log"), db_path: dir.path().join("db") },
  );
  let config = Config { nodes, earnings: earnings(dir.path(), REPORT_SCRIPT, 30) };

  let err = collect_fleet(&config, Utc::now()).await.unwrap_err();
  assert!(matches!(err, NodeError::LogLocation { .. }));
  assert!(err.to_string().contains("ghost"));
}

#[tokio::test]
async fn failing_generator_is_fatal() {
  let dir = TempDir::new().unwrap();
  let node = NodeConfig { log_path: write_node_b(dir.path()), db_path: dir.path().join("db") };
  let config = earnings(dir.path(), "echo broken >&2\nexit 3\n", 30);

  let err = process_node("b", &node, &config, Utc::now()).await.unwrap_err();
  match err {
    NodeError::EarningsFailed { node, stderr, status } => {
      assert_eq!(node, "b");
      assert_eq!(stderr, "broken");
      assert_eq!(status.code(), Some(3));
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn slow_generator_times_out() {
  let dir = TempDir::new().unwrap();
  let node = NodeConfig { log_path: write_node_b(dir.path()), db_path: dir.path().join("db") };
  let config = earnings(dir.path(), "sleep 5\n", 1);

  let err = process_node("b", &node, &config, Utc::now()).await.unwrap_err();
  assert!(matches!(err, NodeError::EarningsTimeout { secs: 1, .. }));
}

#[tokio::test]
async fn silent_generator_leaves_fields_unset() {
  let dir = TempDir::new().unwrap();
  let node = NodeConfig { log_path: write_node_b(dir.path()), db_path: dir.path().join("db") };
  let config = earnings(dir.path(), "exit 0\n", 30);

  let snapshot = process_node("b", &node, &config, Utc::now()).await.unwrap();
  assert_eq!(snapshot.financials, Default::default());
}

#[tokio::test]
async fn unknown_generator_path_is_fatal() {
  let dir = TempDir::new().unwrap();
  let node = NodeConfig { log_path: write_node_b(dir.path()), db_path: dir.path().join("db") };
  let config = EarningsConfig {
    path: dir.path().join("missing-calculator"),
    interpreter: None,
    timeout_secs: 30,
  };

  let err = process_node("b", &node, &config, Utc::now()).await.unwrap_err();
  assert!(matches!(err, NodeError::EarningsSpawn { .. }));
}
