//! Streaming per-session counters: how lines decomposed and how many callbacks ran.

use crate::types::{ExtractorKind, ParsedLine, RunStats};

/// Count one decomposed line.
pub fn record_line(stats: &mut RunStats, parsed: &ParsedLine, truncated: bool) {
  stats.lines += 1;
  if truncated {
    stats.truncated += 1;
  }
  match (parsed.extractor, parsed.program.is_some()) {
    (ExtractorKind::None, _) => stats.unparsed += 1,
    (_, true) => stats.structured += 1,
    (_, false) => stats.date_only += 1,
  }
}

pub fn record_callbacks(stats: &mut RunStats, invoked: usize) {
  stats.callbacks += invoked as u64;
}

/// Add `other` into `total`.
pub fn merge(total: &mut RunStats, other: &RunStats) {
  total.lines += other.lines;
  total.structured += other.structured;
  total.date_only += other.date_only;
  total.unparsed += other.unparsed;
  total.truncated += other.truncated;
  total.callbacks += other.callbacks;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::normalize::LineDecomposer;
  use crate::types::RawLine;

  fn line(text: &str) -> ParsedLine {
    LineDecomposer::new().decompose(RawLine::new("s", text), 2024)
  }

  #[test]
  fn classifies_each_kind() {
    let mut stats = RunStats::default();
    record_line(&mut stats, &line("2024-01-01T00:00:00+00:00 h app: m"), false);
    record_line(&mut stats, &line("Jan  1 00:00:00 h app: m"), false);
    record_line(&mut stats, &line("???"), true);
    assert_eq!(stats.lines, 3);
    assert_eq!(stats.structured, 1);
    assert_eq!(stats.date_only, 1);
    assert_eq!(stats.unparsed, 1);
    assert_eq!(stats.truncated, 1);
  }

  #[test]
  fn merge_sums_fields() {
    let mut a = RunStats {
      lines: 2,
      callbacks: 1,
      ..RunStats::default()
    };
    let b = RunStats {
      lines: 3,
      unparsed: 3,
      callbacks: 4,
      ..RunStats::default()
    };
    merge(&mut a, &b);
    assert_eq!(a.lines, 5);
    assert_eq!(a.unparsed, 3);
    assert_eq!(a.callbacks, 5);
  }

  #[test]
  fn callbacks_accumulate() {
    let mut stats = RunStats::default();
    record_callbacks(&mut stats, 2);
    record_callbacks(&mut stats, 0);
    assert_eq!(stats.callbacks, 2);
  }
}
