//! Normalize raw lines into canonical ParsedLine models.

use crate::extract::{Iso8601Extractor, LegacyDateExtractor, TimestampExtractor};
use crate::types::{ParsedLine, RawLine};

/// Ordered set of extractors; the first one that recognizes a line wins.
pub struct LineDecomposer {
  extractors: Vec<Box<dyn TimestampExtractor>>,
}

impl Default for LineDecomposer {
  fn default() -> Self {
    Self::new()
  }
}

impl LineDecomposer {
  /// Structured ISO 8601 first, legacy `Mon DD` second.
  pub fn new() -> Self {
    Self::with_extractors(vec![
      Box::new(Iso8601Extractor),
      Box::new(LegacyDateExtractor),
    ])
  }

  pub fn with_extractors(extractors: Vec<Box<dyn TimestampExtractor>>) -> Self {
    Self { extractors }
  }

  /// Decompose one line. Never fails: anything not recognized comes back with
  /// empty structural fields and the whole text as `message`.
  ///
  /// `year` fills in formats that omit it and must come from the caller.
  pub fn decompose(&self, mut raw: RawLine, year: i32) -> ParsedLine {
    let trimmed_len = raw.text.trim_end_matches(&['\r', '\n'][..]).len();
    raw.text.truncate(trimmed_len);

    for extractor in &self.extractors {
      if let Some(m) = extractor.match_line(&raw.text) {
        return ParsedLine {
          timestamp: Some(m.timestamp),
          date: Some(m.timestamp.date_naive()),
          time: Some(m.time),
          host: Some(m.host),
          program: Some(m.program),
          pid: m.pid,
          message: m.message,
          extractor: extractor.kind(),
          raw,
        };
      }
      if extractor.is_structured() {
        // Structured formats are all-or-nothing; a failed line match is not
        // salvaged through the date alone.
        continue;
      }
      if let Some(d) = extractor.match_date(&raw.text, year) {
        return ParsedLine {
          timestamp: d.timestamp,
          date: Some(d.date),
          time: d.time,
          host: None,
          program: None,
          pid: None,
          message: raw.text.clone(),
          extractor: extractor.kind(),
          raw,
        };
      }
    }

    tracing::debug!(source = %raw.source_id, "unrecognized line format");
    ParsedLine::unparsed(raw)
  }
}

/// Cut `text` to at most `max_bytes`, backing off to a char boundary.
/// Returns whether anything was removed.
pub fn truncate_line(text: &mut String, max_bytes: usize) -> bool {
  if text.len() <= max_bytes {
    return false;
  }
  let mut cut = max_bytes;
  while !text.is_char_boundary(cut) {
    cut -= 1;
  }
  text.truncate(cut);
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::extract::{DateMatch, StructuredMatch};
  use crate::types::ExtractorKind;
  use chrono::NaiveDate;

  fn decompose(text: &str, year: i32) -> ParsedLine {
    LineDecomposer::new().decompose(RawLine::new("syslog", text), year)
  }

  #[test]
  fn structured_line_fills_all_fields() {
    let line = "2024-01-01T00:00:05+00:00 host1 cron[123]: (CRON) INFO (Running @reboot jobs)";
    let p = decompose(line, 1999);
    assert_eq!(p.extractor, ExtractorKind::Iso8601);
    assert_eq!(p.host.as_deref(), Some("host1"));
    assert_eq!(p.program.as_deref(), Some("cron"));
    assert_eq!(p.pid.as_deref(), Some("123"));
    assert_eq!(p.time.as_deref(), Some("00:00:05"));
    assert_eq!(p.date, NaiveDate::from_ymd_opt(2024, 1, 1));
    assert_eq!(p.raw.text, line);
  }

  #[test]
  fn structured_fields_reconstruct_line_tail() {
    let line = "2024-06-01T10:11:12-07:00 web-01 nginx/worker[42]: GET /index.html 200";
    let p = decompose(line, 2024);
    let rebuilt = format!(
      "{} {}[{}]: {}",
      p.host.as_deref().unwrap(),
      p.program.as_deref().unwrap(),
      p.pid.as_deref().unwrap(),
      p.message
    );
    assert!(line.ends_with(&rebuilt));
  }

  #[test]
  fn legacy_line_gets_date_only() {
    let p = decompose("Mar  5 10:00:00 host cron[1]: hello", 2024);
    assert_eq!(p.extractor, ExtractorKind::LegacyDate);
    assert_eq!(p.date, NaiveDate::from_ymd_opt(2024, 3, 5));
    assert_eq!(p.timestamp, None);
    assert_eq!(p.program, None);
    assert_eq!(p.host, None);
    assert_eq!(p.message, "Mar  5 10:00:00 host cron[1]: hello");
  }

  #[test]
  fn garbage_line_degrades_to_raw_message() {
    let p = decompose("%%% not a log line", 2024);
    assert_eq!(p.extractor, ExtractorKind::None);
    assert_eq!(p.timestamp, None);
    assert_eq!(p.date, None);
    assert_eq!(p.program, None);
    assert_eq!(p.message, "%%% not a log line");
  }

  #[test]
  fn iso_prefix_without_structure_is_not_salvaged() {
    let p = decompose("2024-01-01T00:00:05+00:00 only-a-host", 2024);
    assert_eq!(p.extractor, ExtractorKind::None);
    assert_eq!(p.timestamp, None);
    assert_eq!(p.message, "2024-01-01T00:00:05+00:00 only-a-host");
  }

  #[test]
  fn line_terminators_are_stripped() {
    let p = decompose("2024-01-01T00:00:05+00:00 h app: msg\r\n", 2024);
    assert_eq!(p.message, "msg");
    assert_eq!(p.raw.text, "2024-01-01T00:00:05+00:00 h app: msg");
  }

  struct AlwaysDate;

  impl TimestampExtractor for AlwaysDate {
    fn kind(&self) -> ExtractorKind {
      ExtractorKind::LegacyDate
    }

    fn match_date(&self, _line: &str, year: i32) -> Option<DateMatch> {
      Some(DateMatch {
        date: NaiveDate::from_ymd_opt(year, 1, 1)?,
        time: None,
        timestamp: None,
      })
    }
  }

  struct NeverLine;

  impl TimestampExtractor for NeverLine {
    fn kind(&self) -> ExtractorKind {
      ExtractorKind::Iso8601
    }

    fn match_date(&self, _line: &str, _year: i32) -> Option<DateMatch> {
      None
    }

    fn match_line(&self, _line: &str) -> Option<StructuredMatch> {
      None
    }
  }

  #[test]
  fn first_matching_extractor_wins() {
    let d = LineDecomposer::with_extractors(vec![Box::new(AlwaysDate), Box::new(Iso8601Extractor)]);
    let p = d.decompose(
      RawLine::new("s", "2024-01-01T00:00:05+00:00 host1 cron[1]: x"),
      2030,
    );
    assert_eq!(p.extractor, ExtractorKind::LegacyDate);
    assert_eq!(p.date, NaiveDate::from_ymd_opt(2030, 1, 1));
    assert_eq!(p.program, None);
  }

  #[test]
  fn falls_through_to_later_extractors() {
    let d = LineDecomposer::with_extractors(vec![Box::new(NeverLine), Box::new(AlwaysDate)]);
    let p = d.decompose(RawLine::new("s", "whatever"), 2001);
    assert_eq!(p.date, NaiveDate::from_ymd_opt(2001, 1, 1));
  }

  #[test]
  fn truncate_respects_char_boundaries() {
    let mut s = "héllo".to_string();
    assert!(truncate_line(&mut s, 2));
    assert_eq!(s, "h");
    let mut short = "abc".to_string();
    assert!(!truncate_line(&mut short, 3));
    assert_eq!(short, "abc");
  }
}
