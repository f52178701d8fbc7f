//! Feeds a node's log lines through the classifier into its [`NodeState`].
//!
//! A single log file is read front to back. A directory is treated as a set of rotated
//! files: newest file first, each file scanned from its last line backwards, stopping as
//! soon as the node state has settled on its latest lifecycle event.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::classifier::classify;
use crate::error::NodeError;
use crate::node_state::{NodeState, ScanOrder};

// Compressed rotations can't be scanned line by line.
const SKIPPED_EXTENSIONS: [&str; 3] = ["gz", "zst", "xz"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
  File(PathBuf),
  Rotated(PathBuf),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
  pub files_read: usize,
  pub bytes_read: u64,
  pub lines_scanned: usize,
  pub events: usize,
  pub stopped_early: bool,
}

impl LogSource {
  pub fn resolve(node: &str, path: &Path) -> Result<Self, NodeError> {
    let meta = fs::metadata(path).map_err(|source| NodeError::LogLocation {
      node: node.to_string(),
      path: path.to_path_buf(),
      source,
    })?;
    if meta.is_dir() {
      Ok(LogSource::Rotated(path.to_path_buf()))
    } else {
      Ok(LogSource::File(path.to_path_buf()))
    }
  }

  pub fn order(&self) -> ScanOrder {
    match self {
      LogSource::File(_) => ScanOrder::OldestFirst,
      LogSource::Rotated(_) => ScanOrder::NewestFirst,
    }
  }

  pub fn path(&self) -> &Path {
    match self {
      LogSource::File(path) | LogSource::Rotated(path) => path,
    }
  }
}

/// Scans `source` into a fresh state built for its scan order.
pub fn scan_node_log(node: &str, source: &LogSource, now: DateTime<Utc>) -> Result<(NodeState, ScanStats), NodeError> {
  let mut state = NodeState::new(source.order());
  info!("Reading log of {} from {}", node, source.path().display());

  let stats = match source {
    LogSource::File(path) => scan_forward(node, path, &mut state, now)?,
    LogSource::Rotated(dir) => scan_rotated(node, dir, &mut state, now)?,
  };

  info!(
    "Read log of {}: {:.1} MB in {} file(s), {} lines, {} events{}",
    node,
    stats.bytes_read as f64 / (1024.0 * 1024.0),
    stats.files_read,
    stats.lines_scanned,
    stats.events,
    if stats.stopped_early { ", stopped at latest lifecycle event" } else { "" }
  );
  Ok((state, stats))
}

fn scan_forward(node: &str, path: &Path, state: &mut NodeState, now: DateTime<Utc>) -> Result<ScanStats, NodeError> {
  let io_err = |source: std::io::Error| NodeError::LogLocation {
    node: node.to_string(),
    path: path.to_path_buf(),
    source,
  };
  let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
  let mut stats = ScanStats { files_read: 1, ..Default::default() };
  let mut buf = Vec::new();

  loop {
    buf.clear();
    let read = reader.read_until(b'\n', &mut buf).map_err(io_err)?;
    if read == 0 {
      break;
    }
    stats.bytes_read += read as u64;
    stats.lines_scanned += 1;

    let line = String::from_utf8_lossy(&buf);
    if let Some(event) = classify(&line, now) {
      stats.events += 1;
      state.apply(event, now);
    }
  }
  Ok(stats)
}

fn scan_rotated(node: &str, dir: &Path, state: &mut NodeState, now: DateTime<Utc>) -> Result<ScanStats, NodeError> {
  let files = rotated_files(node, dir)?;
  if files.is_empty() {
    return Err(NodeError::EmptyLogDirectory { node: node.to_string(), path: dir.to_path_buf() });
  }

  let mut stats = ScanStats::default();
  let total = files.len();
  for (i, path) in files.iter().enumerate() {
    let bytes = fs::read(path).map_err(|source| NodeError::LogLocation {
      node: node.to_string(),
      path: path.clone(),
      source,
    })?;
    stats.files_read += 1;
    stats.bytes_read += bytes.len() as u64;
    debug!("{}: scanning {} backwards", node, path.display());

    let text = String::from_utf8_lossy(&bytes);
    let mut lines = text.lines().rev();
    for line in lines.by_ref() {
      stats.lines_scanned += 1;
      if let Some(event) = classify(line, now) {
        stats.events += 1;
        state.apply(event, now);
        if state.is_settled() {
          break;
        }
      }
    }

    if state.is_settled() {
      stats.stopped_early = lines.next().is_some() || i + 1 < total;
      break;
    }
  }
  Ok(stats)
}

/// Rotated logs in `dir`, most recently modified first. Equal mtimes fall back to the
/// file name, descending, which keeps `node.log.2` ahead of `node.log.1`.
///
/// Only regular files with a `.log` name component count (`node.log`, `node.log.3`,
/// `node.log-20240601`). Anything else in the directory is left alone, as are
/// compressed rotations.
pub fn rotated_files(node: &str, dir: &Path) -> Result<Vec<PathBuf>, NodeError> {
  let io_err = |source: std::io::Error| NodeError::LogLocation {
    node: node.to_string(),
    path: dir.to_path_buf(),
    source,
  };

  let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
  for entry in fs::read_dir(dir).map_err(io_err)? {
    let entry = entry.map_err(io_err)?;
    let meta = entry.metadata().map_err(io_err)?;
    let path = entry.path();
    if !meta.is_file() || !is_log_name(&path) {
      continue;
    }
    let compressed = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| SKIPPED_EXTENSIONS.contains(&ext));
    if compressed {
      debug!("{}: skipping compressed rotation {}", node, path.display());
      continue;
    }
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    files.push((modified, path));
  }

  files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
  Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn is_log_name(path: &Path) -> bool {
  path
    .file_name()
    .and_then(|name| name.to_str())
    .is_some_and(|name| name.split('.').skip(1).any(|part| part.starts_with("log")))
}
