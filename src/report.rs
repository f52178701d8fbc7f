//! Plain-text node and fleet boxes for the non-interactive binary.

use crossterm::style::Stylize;

use crate::aggregate::FleetSummary;
use crate::models::{MaintenanceKind, NodeSnapshot, Satellite, TaskGrid, TaskStatus};

const COLUMN_WIDTHS: [usize; 3] = [12, 12, 11];

const FILEWALKER_TOP: &str = "┌─────────────── FILEWALKER ────────────────┐";
const FILEWALKER_BLANK: &str = "│                                           │";
const FILEWALKER_HEAD_1: &str = "│       GARBAGE     TRASH       USED SPACE  │";
const FILEWALKER_HEAD_2: &str = "│       COLLECTOR   CLEANUP     FILEWALKER  │";
const FILEWALKER_BOTTOM: &str = "└───────────────────────────────────────────┘";

pub fn render_node(node: &NodeSnapshot, colored: bool) -> String {
  let f = &node.financials;
  let value = |v: &Option<String>| v.clone().unwrap_or_default();

  let status = match node.is_up {
    Some(true) => format!("up {}", node.uptime_label),
    _ => node.uptime_label.clone(),
  };
  let deviation = match &f.deviation_percentage {
    Some(pct) => {
      let text = format!("{:>28}", format!(" Report Deviation: {} % ", pct));
      if colored { text.red().to_string() } else { text }
    }
    None => " ".repeat(28),
  };

  let left = vec![
    "┌───── NODE MAIN STATS ──────┐".to_string(),
    "│                            │".to_string(),
    format!("│ Current Total: {:>9} $ │", value(&f.current_total)),
    format!("│ Estimated Total: {:>7} $ │", value(&f.estimated_total)),
    "│                            │".to_string(),
    format!("│ Disk Used: {:>15} │", value(&f.disk_used)),
    format!("│ Unpaid Data: {:>13} │", value(&f.unpaid_data)),
    format!("│ Status: {:>18} │", status),
    format!("│{}│", deviation),
    "│                            │".to_string(),
    "└────────────────────────────┘".to_string(),
  ];
  let right = filewalker_box(&node.tasks, |status| status_cell(status, colored));

  let mut out = format!("\n\n═══ {} - Detailed information\n\n", node.name);
  out.push_str(&side_by_side(&left, &right));
  out
}

pub fn render_summary(summary: &FleetSummary) -> String {
  let left = vec![
    "┌───── NODE MAIN STATS ─────┐".to_string(),
    "│                           │".to_string(),
    format!("│ Estimated total: $ {:>6.2} │", summary.estimated_total),
    format!("│ Nodes up: {:>15} │", format!("{}/{}", summary.nodes_up, summary.nodes)),
    "│                           │".to_string(),
    format!("│ Disk used: {:>11.2} TB │", summary.disk_used_tb),
    format!("│ Unpaid data: {:>9.2} TB │", summary.unpaid_data_tb),
    "│                           │".to_string(),
    "└───────────────────────────┘".to_string(),
  ];
  let right = filewalker_box(&summary.running, |count| format!("{} running", count));

  let mut out = String::from("\n\n═══════════════════════════ All Nodes - Summary ══════════════════════════\n\n");
  out.push_str(&side_by_side(&left, &right));
  out
}

fn status_cell(status: &TaskStatus, colored: bool) -> String {
  let text = status.to_string();
  if !colored {
    return text;
  }
  match status {
    TaskStatus::Running => text.red().to_string(),
    TaskStatus::Unknown => text.yellow().to_string(),
    TaskStatus::Offline => text.dark_grey().to_string(),
    TaskStatus::Completed { .. } => text.green().to_string(),
  }
}

fn filewalker_box<T>(grid: &TaskGrid<T>, cell: impl Fn(&T) -> String) -> Vec<String> {
  let mut lines = vec![
    FILEWALKER_TOP.to_string(),
    FILEWALKER_BLANK.to_string(),
    FILEWALKER_HEAD_1.to_string(),
    FILEWALKER_HEAD_2.to_string(),
    FILEWALKER_BLANK.to_string(),
  ];
  for sat in Satellite::ALL {
    let mut row = format!("│  {:>3}  ", sat.label());
    for (kind, width) in MaintenanceKind::ALL.into_iter().zip(COLUMN_WIDTHS) {
      let text = cell(&grid[(kind, sat)]);
      row.push_str(&text);
      row.push_str(&" ".repeat(width.saturating_sub(visible_len(&text))));
    }
    row.push_str(" │");
    lines.push(row);
  }
  lines.push(FILEWALKER_BLANK.to_string());
  lines.push(FILEWALKER_BOTTOM.to_string());
  lines
}

fn side_by_side(left: &[String], right: &[String]) -> String {
  let left_width = left.first().map_or(0, |l| visible_len(l));
  let rows = left.len().max(right.len());
  let mut out = String::new();
  for i in 0..rows {
    match left.get(i) {
      Some(l) => out.push_str(l),
      None => out.push_str(&" ".repeat(left_width)),
    }
    if let Some(r) = right.get(i) {
      out.push_str(r);
    }
    out.push('\n');
  }
  out
}

/// Character count with ANSI escape sequences removed.
pub fn visible_len(s: &str) -> usize {
  let mut len = 0;
  let mut chars = s.chars();
  while let Some(c) = chars.next() {
    if c == '\u{1b}' {
      for c in chars.by_ref() {
        if c.is_ascii_alphabetic() {
          break;
        }
      }
    } else {
      len += 1;
    }
  }
  len
}
