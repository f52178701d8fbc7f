use std::fmt;
use std::ops::{Index, IndexMut};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp::format_age;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Satellite {
  SL,
  AP1,
  EU1,
  US1,
}

impl Satellite {
  pub const ALL: [Satellite; 4] = [Satellite::SL, Satellite::AP1, Satellite::EU1, Satellite::US1];

  pub fn id(self) -> &'static str {
    match self {
      Satellite::SL => "1wFTAgs9DP5RSnCqKV1eLf6N9wtk4EAtmN5DpSxcs8EjT69tGE",
      Satellite::AP1 => "121RTSDpyNZVcEU84Ticf2L1ntiuUimbWgfATz21tuvgk3vzoA6",
      Satellite::EU1 => "12L9ZFwhzVpuEKMUNUqkaTLGzwY9G24tbiigLiXpmZWKwmcNDDs",
      Satellite::US1 => "12EayRS2V1kEsWESU9QMRseFhdxYxKicsiFmxrsLZHeLUtdps3S",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Satellite::SL => "SL",
      Satellite::AP1 => "AP1",
      Satellite::EU1 => "EU1",
      Satellite::US1 => "US1",
    }
  }

  fn index(self) -> usize {
    self as usize
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaintenanceKind {
  GarbageCollectionFilewalker,
  TrashCleanupFilewalker,
  UsedSpaceFilewalker,
}

impl MaintenanceKind {
  pub const ALL: [MaintenanceKind; 3] = [
    MaintenanceKind::GarbageCollectionFilewalker,
    MaintenanceKind::TrashCleanupFilewalker,
    MaintenanceKind::UsedSpaceFilewalker,
  ];

  pub fn short_name(self) -> &'static str {
    match self {
      MaintenanceKind::GarbageCollectionFilewalker => "GCF",
      MaintenanceKind::TrashCleanupFilewalker => "TCF",
      MaintenanceKind::UsedSpaceFilewalker => "USF",
    }
  }

  fn index(self) -> usize {
    self as usize
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  NodeStarted { at: DateTime<Utc> },
  NodeStopped { at: DateTime<Utc> },
  TaskStarted { kind: MaintenanceKind, satellite: Satellite },
  TaskFinished { kind: MaintenanceKind, satellite: Satellite, at: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatus {
  #[default]
  Unknown,
  Running,
  Completed { age: Duration },
  Offline,
}

impl TaskStatus {
  pub fn is_running(&self) -> bool {
    matches!(self, TaskStatus::Running)
  }
}

impl fmt::Display for TaskStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TaskStatus::Unknown => f.write_str("unknown"),
      TaskStatus::Running => f.write_str("running"),
      TaskStatus::Completed { age } => write!(f, "{} ago", format_age(*age)),
      TaskStatus::Offline => f.write_str("offline"),
    }
  }
}

impl Serialize for TaskStatus {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// Fixed kind x satellite table. Every cell always holds a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskGrid<T> {
  cells: [[T; 4]; 3],
}

impl<T: Copy> TaskGrid<T> {
  pub fn filled(value: T) -> Self {
    Self { cells: [[value; 4]; 3] }
  }

  pub fn fill(&mut self, value: T) {
    self.cells = [[value; 4]; 3];
  }

  pub fn iter(&self) -> impl Iterator<Item = (MaintenanceKind, Satellite, &T)> + '_ {
    MaintenanceKind::ALL.into_iter().flat_map(move |kind| {
      Satellite::ALL
        .into_iter()
        .map(move |sat| (kind, sat, &self.cells[kind.index()][sat.index()]))
    })
  }
}

impl<T> Index<(MaintenanceKind, Satellite)> for TaskGrid<T> {
  type Output = T;

  fn index(&self, (kind, sat): (MaintenanceKind, Satellite)) -> &T {
    &self.cells[kind.index()][sat.index()]
  }
}

impl<T> IndexMut<(MaintenanceKind, Satellite)> for TaskGrid<T> {
  fn index_mut(&mut self, (kind, sat): (MaintenanceKind, Satellite)) -> &mut T {
    &mut self.cells[kind.index()][sat.index()]
  }
}

// Serialized as {"GCF": {"SL": ..}, ..} so JSON consumers don't depend on array order.
impl<T: Serialize + Copy> Serialize for TaskGrid<T> {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;

    let mut outer = serializer.serialize_map(Some(MaintenanceKind::ALL.len()))?;
    for kind in MaintenanceKind::ALL {
      let row: std::collections::BTreeMap<&str, T> = Satellite::ALL
        .into_iter()
        .map(|sat| (sat.label(), self[(kind, sat)]))
        .collect();
      outer.serialize_entry(kind.short_name(), &row)?;
    }
    outer.end()
  }
}

/// Figures scraped from the earnings report. Kept as the generator printed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Financials {
  pub current_total: Option<String>,
  pub estimated_total: Option<String>,
  pub disk_used: Option<String>,
  pub unpaid_data: Option<String>,
  pub deviation_percentage: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
  pub name: String,
  pub is_up: Option<bool>,
  pub uptime_label: String,
  pub tasks: TaskGrid<TaskStatus>,
  pub financials: Financials,
}
