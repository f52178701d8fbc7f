//! Maps raw storage node log lines to lifecycle and filewalker events.
//!
//! Matching is fragment based. A line has to name one filewalker family, one of the
//! start/finish markers and a full satellite id to count as a task event.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::trace;

use crate::models::{Event, MaintenanceKind, Satellite};
use crate::timestamp::parse_line_timestamp;

pub const STARTED_MARKER: &str = "Configuration loaded";
pub const STOPPED_MARKER: &str = "Got a signal from the OS";

// Checked in order, first family that matches owns the line.
const FAMILIES: [(MaintenanceKind, &[&str]); 3] = [
  (MaintenanceKind::TrashCleanupFilewalker, &["trash-cleanup-filewalker", "emptying trash"]),
  (MaintenanceKind::GarbageCollectionFilewalker, &["gc-filewalker", "Retain request", "during retain"]),
  (MaintenanceKind::UsedSpaceFilewalker, &["used-space-filewalker"]),
];

static START_MARKER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)\b(started|prepared)\b").expect("start marker pattern"));
static FINISH_MARKER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)\b(finished|completed|moved)\b").expect("finish marker pattern"));

pub fn classify(line: &str, now: DateTime<Utc>) -> Option<Event> {
  if line.contains(STARTED_MARKER) {
    return match parse_line_timestamp(line) {
      Some(at) => Some(Event::NodeStarted { at }),
      None => {
        trace!("start marker without a readable timestamp: {}", line.trim_end());
        None
      }
    };
  }
  if line.contains(STOPPED_MARKER) {
    return Some(Event::NodeStopped { at: now });
  }

  let kind = family_of(line)?;
  let satellite = satellite_in(line)?;

  if FINISH_MARKER.is_match(line) {
    match parse_line_timestamp(line) {
      Some(at) => Some(Event::TaskFinished { kind, satellite, at }),
      None => {
        trace!("finished {:?} without a readable timestamp", kind);
        None
      }
    }
  } else if START_MARKER.is_match(line) {
    Some(Event::TaskStarted { kind, satellite })
  } else {
    None
  }
}

fn family_of(line: &str) -> Option<MaintenanceKind> {
  FAMILIES
    .iter()
    .find(|(_, fragments)| fragments.iter().any(|f| line.contains(f)))
    .map(|(kind, _)| *kind)
}

/// The satellite whose id shows up first in the line.
pub fn satellite_in(line: &str) -> Option<Satellite> {
  Satellite::ALL
    .into_iter()
    .filter_map(|sat| line.find(sat.id()).map(|pos| (pos, sat)))
    .min_by_key(|(pos, _)| *pos)
    .map(|(_, sat)| sat)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  const SL: &str = "1wFTAgs9DP5RSnCqKV1eLf6N9wtk4EAtmN5DpSxcs8EjT69tGE";
  const US1: &str = "12EayRS2V1kEsWESU9QMRseFhdxYxKicsiFmxrsLZHeLUtdps3S";

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
  }

  #[test]
  fn configuration_loaded_starts_node() {
    let line = "2024-06-01T12:00:00Z\tINFO\tConfiguration loaded\t{\"Process\": \"storagenode\"}";
    assert_eq!(
      classify(line, now()),
      Some(Event::NodeStarted { at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() })
    );
  }

  #[test]
  fn os_signal_stops_node_at_detection_time() {
    let line = "2024-06-01T12:00:00Z\tINFO\tGot a signal from the OS: \"terminated\"";
    assert_eq!(classify(line, now()), Some(Event::NodeStopped { at: now() }));
  }

  #[test]
  fn lazy_filewalker_subprocess_lines() {
    let started = format!(
      "2024-06-02T08:00:00Z\tINFO\tlazyfilewalker.gc-filewalker\tsubprocess started\t{{\"satelliteID\": \"{}\"}}",
      SL
    );
    assert_eq!(
      classify(&started, now()),
      Some(Event::TaskStarted { kind: MaintenanceKind::GarbageCollectionFilewalker, satellite: Satellite::SL })
    );

    let finished = format!(
      "2024-06-02T09:30:00Z\tINFO\tlazyfilewalker.used-space-filewalker\tsubprocess finished successfully\t{{\"satelliteID\": \"{}\"}}",
      US1
    );
    assert_eq!(
      classify(&finished, now()),
      Some(Event::TaskFinished {
        kind: MaintenanceKind::UsedSpaceFilewalker,
        satellite: Satellite::US1,
        at: Utc.with_ymd_and_hms(2024, 6, 2, 9, 30, 0).unwrap(),
      })
    );
  }

  #[test]
  fn retain_and_trash_families() {
    let prepared = format!("2024-06-02T08:00:00Z\tINFO\tretain\tPrepared to run a Retain request.\t{{\"Satellite ID\": \"{}\"}}", SL);
    assert!(matches!(
      classify(&prepared, now()),
      Some(Event::TaskStarted { kind: MaintenanceKind::GarbageCollectionFilewalker, .. })
    ));

    let moved = format!("2024-06-02T08:10:00Z\tINFO\tretain\tMoved pieces to trash during retain\t{{\"Satellite ID\": \"{}\"}}", SL);
    assert!(matches!(
      classify(&moved, now()),
      Some(Event::TaskFinished { kind: MaintenanceKind::GarbageCollectionFilewalker, .. })
    ));

    let trash = format!("2024-06-02T08:00:00Z\tINFO\tpieces:trash\temptying trash finished\t{{\"Satellite ID\": \"{}\"}}", US1);
    assert!(matches!(
      classify(&trash, now()),
      Some(Event::TaskFinished { kind: MaintenanceKind::TrashCleanupFilewalker, satellite: Satellite::US1, .. })
    ));
  }

  #[test]
  fn unrelated_lines_yield_nothing() {
    let lines = vec![
      String::new(),
      "garbage".to_string(),
      "2024-06-02T08:00:00Z\tINFO\tpiecestore\tuploaded\t{\"Piece ID\": \"ABC\"}".to_string(),
      // marker and family but no satellite
      "2024-06-02T08:00:00Z\tINFO\tlazyfilewalker.gc-filewalker\tsubprocess started".to_string(),
      // satellite and marker but no family
      format!("2024-06-02T08:00:00Z\tINFO\tpiecestore\tdownload started\t{{\"Satellite ID\": \"{}\"}}", SL),
      // family and satellite but no marker
      format!("2024-06-02T08:00:00Z\tINFO\tlazyfilewalker.gc-filewalker\tsubprocess exited with status\t{{\"satelliteID\": \"{}\"}}", SL),
    ];
    for line in &lines {
      assert_eq!(classify(line, now()), None, "{}", line);
    }
  }

  #[test]
  fn partial_satellite_id_does_not_match() {
    let truncated = &SL[..SL.len() - 1];
    let line = format!("2024-06-02T08:00:00Z\tINFO\tlazyfilewalker.gc-filewalker\tsubprocess started\t{}", truncated);
    assert_eq!(classify(&line, now()), None);
  }

  #[test]
  fn finished_without_timestamp_is_a_miss() {
    let line = format!("INFO\tlazyfilewalker.gc-filewalker\tsubprocess finished successfully\t{}", SL);
    assert_eq!(classify(&line, now()), None);
  }

  #[test]
  fn earliest_satellite_wins() {
    let line = format!("2024-06-02T08:00:00Z gc-filewalker started {} {}", US1, SL);
    assert_eq!(
      classify(&line, now()),
      Some(Event::TaskStarted { kind: MaintenanceKind::GarbageCollectionFilewalker, satellite: Satellite::US1 })
    );
  }

  #[test]
  fn finish_marker_beats_start_marker() {
    let line = format!("2024-06-02T08:00:00Z gc-filewalker started earlier, now completed {}", SL);
    assert!(matches!(classify(&line, now()), Some(Event::TaskFinished { .. })));
  }
}
