//! Log timestamp normalization and relative age labels.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Long enough for `2024-06-01T12:00:00.000000000+02:00`.
pub const PREFIX_LEN: usize = 35;

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses the timestamp a log line starts with. Offsets are honoured when present,
/// otherwise the wall time is taken as UTC.
pub fn parse_line_timestamp(line: &str) -> Option<DateTime<Utc>> {
  let prefix = leading_token(line);
  if prefix.is_empty() {
    return None;
  }

  if let Ok(ts) = DateTime::parse_from_rfc3339(prefix) {
    return Some(ts.with_timezone(&Utc));
  }
  for format in OFFSET_FORMATS {
    if let Ok(ts) = DateTime::parse_from_str(prefix, format) {
      return Some(ts.with_timezone(&Utc));
    }
  }

  let naive = strip_offset(prefix);
  NAIVE_FORMATS
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
    .map(|ts| ts.and_utc())
}

/// `"{days}d {hours}h"`; negative spans render as zero.
pub fn format_age(age: Duration) -> String {
  let age = age.max(Duration::zero());
  let days = age.num_days();
  let hours = (age - Duration::days(days)).num_hours();
  format!("{}d {}h", days, hours)
}

pub fn age_since(at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
  (now - at).max(Duration::zero())
}

fn leading_token(line: &str) -> &str {
  let head = match line.char_indices().nth(PREFIX_LEN) {
    Some((i, _)) => &line[..i],
    None => line,
  };
  // "2024-06-01 12:00:00" keeps its time part
  let skip = if head.as_bytes().get(10) == Some(&b' ') { 11 } else { 0 };
  let end = head[skip..]
    .find(char::is_whitespace)
    .map_or(head.len(), |i| skip + i);
  &head[..end]
}

// `2024-06-01T12:00:00.5Z` -> `2024-06-01T12:00:00.5`, also drops a broken offset tail.
fn strip_offset(prefix: &str) -> &str {
  let date_len = "2024-06-01".len();
  match prefix.get(date_len..) {
    Some(rest) => {
      let cut = rest
        .find(|c: char| c == 'Z' || c == 'z' || c == '+' || c == '-')
        .map_or(prefix.len(), |i| date_len + i);
      &prefix[..cut]
    }
    None => prefix,
  }
}
