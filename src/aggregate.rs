//! Fleet-wide summary over all node snapshots.

use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::models::{NodeSnapshot, TaskGrid};

#[derive(Debug, Clone, Serialize)]
pub struct FleetSummary {
  pub nodes: usize,
  pub nodes_up: usize,
  pub estimated_total: f64,
  pub current_total: f64,
  pub disk_used_tb: f64,
  pub unpaid_data_tb: f64,
  pub running: TaskGrid<u32>,
}

impl FleetSummary {
  pub fn from_nodes(nodes: &[NodeSnapshot]) -> Self {
    let mut running = TaskGrid::filled(0u32);
    for node in nodes {
      for (kind, sat, status) in node.tasks.iter() {
        if status.is_running() {
          running[(kind, sat)] += 1;
        }
      }
    }

    Self {
      nodes: nodes.len(),
      nodes_up: nodes.iter().filter(|n| n.is_up == Some(true)).count(),
      estimated_total: sum_amounts(nodes.iter().map(|n| n.financials.estimated_total.as_deref())),
      current_total: sum_amounts(nodes.iter().map(|n| n.financials.current_total.as_deref())),
      disk_used_tb: sum_in(ByteUnit::TB, nodes.iter().map(|n| n.financials.disk_used.as_deref())),
      unpaid_data_tb: sum_in(ByteUnit::TB, nodes.iter().map(|n| n.financials.unpaid_data.as_deref())),
      running,
    }
  }
}

fn sum_amounts<'a>(values: impl Iterator<Item = Option<&'a str>>) -> f64 {
  values
    .flatten()
    .filter_map(|v| {
      let parsed = v.trim().trim_start_matches('$').trim().parse::<f64>().ok();
      if parsed.is_none() {
        debug!("skipping unparseable amount {:?}", v);
      }
      parsed
    })
    .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteUnit {
  B,
  KB,
  MB,
  GB,
  TB,
  PB,
  KiB,
  MiB,
  GiB,
  TiB,
  PiB,
}

impl ByteUnit {
  pub fn bytes(self) -> f64 {
    match self {
      ByteUnit::B => 1.0,
      ByteUnit::KB => 1e3,
      ByteUnit::MB => 1e6,
      ByteUnit::GB => 1e9,
      ByteUnit::TB => 1e12,
      ByteUnit::PB => 1e15,
      ByteUnit::KiB => 1024.0,
      ByteUnit::MiB => 1024.0 * 1024.0,
      ByteUnit::GiB => 1024.0 * 1024.0 * 1024.0,
      ByteUnit::TiB => 1024.0 * 1024.0 * 1024.0 * 1024.0,
      ByteUnit::PiB => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
    }
  }
}

impl FromStr for ByteUnit {
  type Err = ();

  fn from_str(s: &str) -> Result<Self, ()> {
    // "TBm" is TB-month in the earnings report
    let s = s.strip_suffix('m').unwrap_or(s);
    let unit = match s.to_ascii_lowercase().as_str() {
      "b" => ByteUnit::B,
      "kb" => ByteUnit::KB,
      "mb" => ByteUnit::MB,
      "gb" => ByteUnit::GB,
      "tb" => ByteUnit::TB,
      "pb" => ByteUnit::PB,
      "kib" => ByteUnit::KiB,
      "mib" => ByteUnit::MiB,
      "gib" => ByteUnit::GiB,
      "tib" => ByteUnit::TiB,
      "pib" => ByteUnit::PiB,
      _ => return Err(()),
    };
    Ok(unit)
  }
}

/// A number with a byte unit, as printed by the earnings report ("7.23 TB").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ByteQuantity {
  pub value: f64,
  pub unit: ByteUnit,
}

impl ByteQuantity {
  pub fn parse(s: &str) -> Option<Self> {
    let s = s.trim();
    let split = s
      .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
      .unwrap_or(s.len());
    let value = s[..split].parse::<f64>().ok()?;
    let unit = s[split..].trim().parse::<ByteUnit>().ok()?;
    Some(Self { value, unit })
  }

  pub fn in_unit(&self, unit: ByteUnit) -> f64 {
    self.value * self.unit.bytes() / unit.bytes()
  }
}

/// Sums mixed-unit quantities into `unit`, skipping values that don't parse.
pub fn sum_in<'a>(unit: ByteUnit, values: impl Iterator<Item = Option<&'a str>>) -> f64 {
  values
    .flatten()
    .filter_map(|v| {
      let parsed = ByteQuantity::parse(v);
      if parsed.is_none() {
        debug!("skipping unparseable quantity {:?}", v);
      }
      parsed
    })
    .map(|q| q.in_unit(unit))
    .sum()
}
