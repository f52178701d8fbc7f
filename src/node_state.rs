//! Per-node filewalker status, folded from classified log events.
//!
//! The reader feeds events either oldest-first (one growing log file) or newest-first
//! (rotated directory, scanned backwards). In both directions the newest task event of
//! the newest process lifetime decides a cell:
//!
//! * oldest-first: later events overwrite, `NodeStarted` wipes the grid. Task events
//!   after a `NodeStopped` are dropped until the next `NodeStarted`.
//! * newest-first: the first event per cell latches it, and the first lifecycle event
//!   settles the node. Anything fed after that belongs to an older lifetime.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::models::{Event, Financials, MaintenanceKind, NodeSnapshot, Satellite, TaskGrid, TaskStatus};
use crate::timestamp::{age_since, format_age};

pub const OFFLINE_LABEL: &str = "offline";
pub const UNKNOWN_LABEL: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
  OldestFirst,
  NewestFirst,
}

#[derive(Debug, Clone)]
pub struct NodeState {
  order: ScanOrder,
  tasks: TaskGrid<TaskStatus>,
  resolved: TaskGrid<bool>,
  is_up: Option<bool>,
  label: String,
  stopped: bool,
  settled: bool,
}

impl NodeState {
  pub fn new(order: ScanOrder) -> Self {
    Self {
      order,
      tasks: TaskGrid::filled(TaskStatus::Unknown),
      resolved: TaskGrid::filled(false),
      is_up: None,
      label: UNKNOWN_LABEL.to_string(),
      stopped: false,
      settled: false,
    }
  }

  pub fn tasks(&self) -> &TaskGrid<TaskStatus> {
    &self.tasks
  }

  pub fn is_up(&self) -> Option<bool> {
    self.is_up
  }

  /// Uptime as `"{d}d {h}h"`, `"offline"`, or `"unknown"` before any lifecycle event.
  pub fn label(&self) -> &str {
    &self.label
  }

  /// Newest-first scans are complete once the latest lifecycle event was seen.
  pub fn is_settled(&self) -> bool {
    self.settled
  }

  pub fn apply(&mut self, event: Event, now: DateTime<Utc>) {
    if self.settled {
      trace!("ignoring {:?} from an older lifetime", event);
      return;
    }

    match event {
      Event::NodeStarted { at } => {
        if self.order == ScanOrder::OldestFirst {
          self.tasks.fill(TaskStatus::Unknown);
          self.resolved.fill(false);
        }
        self.is_up = Some(true);
        self.stopped = false;
        self.label = format_age(age_since(at, now));
        self.settle();
      }
      Event::NodeStopped { .. } => {
        self.tasks.fill(TaskStatus::Offline);
        self.is_up = Some(false);
        self.stopped = true;
        self.label = OFFLINE_LABEL.to_string();
        self.settle();
      }
      Event::TaskStarted { kind, satellite } => {
        self.resolve((kind, satellite), TaskStatus::Running);
      }
      Event::TaskFinished { kind, satellite, at } => {
        self.resolve((kind, satellite), TaskStatus::Completed { age: age_since(at, now) });
      }
    }
  }

  pub fn into_snapshot(self, name: impl Into<String>, financials: Financials) -> NodeSnapshot {
    NodeSnapshot {
      name: name.into(),
      is_up: self.is_up,
      uptime_label: self.label,
      tasks: self.tasks,
      financials,
    }
  }

  fn resolve(&mut self, cell: (MaintenanceKind, Satellite), status: TaskStatus) {
    if self.stopped {
      trace!("ignoring task event for {:?} on a stopped node", cell);
      return;
    }
    if self.order == ScanOrder::NewestFirst && self.resolved[cell] {
      return;
    }
    self.tasks[cell] = status;
    self.resolved[cell] = true;
  }

  fn settle(&mut self) {
    if self.order == ScanOrder::NewestFirst {
      self.settled = true;
    }
  }
}
