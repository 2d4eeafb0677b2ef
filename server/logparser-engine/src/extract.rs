//! Timestamp extractors: recognize the date/time portion of a syslog line and,
//! for fully structured formats, the whole line's fields.
//!
//! Two strategies are provided:
//! - [`Iso8601Extractor`]: `YYYY-MM-DDThh:mm:ss±hh:mm HOST PROGRAM[PID]: MESSAGE`
//!   (the RFC 3339 flavour written by rsyslog's high-precision templates).
//! - [`LegacyDateExtractor`]: classic BSD syslog `Mon DD ` prefix, no year,
//!   no structural decomposition.
//!
//! Extractors are stateless and shareable across worker threads.

use chrono::{DateTime, FixedOffset, Month, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ExtractorKind;

static ISO_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"^(?P<date>\d+-\d+-\d+)T(?P<time>\d\d:\d\d:\d\d)(?P<frac>\.\d+)?(?P<offset>[-+][0-9]+:[0-9]+) (?P<host>[-_.0-9a-zA-Z]+) (?P<app>[-_./0-9a-zA-Z]+)(?:\[(?P<pid>[0-9]+)\])?: (?P<msg>.*)$",
  )
  .unwrap()
});

static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?P<date>\d+-\d+-\d+)T(?P<time>\d\d:\d\d:\d\d)(?P<frac>\.\d+)?(?P<offset>[-+][0-9]+:[0-9]+)")
    .unwrap()
});

static LEGACY_DATE_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(?P<month>[A-Za-z]+) +(?P<day>[0-9]+) ").unwrap());

/// Date portion recognized at the start of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct DateMatch {
  pub date: NaiveDate,
  /// Time-of-day literal, when the format carries one.
  pub time: Option<String>,
  /// Absolute instant, when date, time and offset are all known.
  pub timestamp: Option<DateTime<FixedOffset>>,
}

/// All fields of a fully structured line.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredMatch {
  pub timestamp: DateTime<FixedOffset>,
  pub time: String,
  pub host: String,
  pub program: String,
  pub pid: Option<String>,
  pub message: String,
}

/// A strategy for recognizing one timestamp format.
pub trait TimestampExtractor: Send + Sync {
  fn kind(&self) -> ExtractorKind;

  /// Structured formats are matched whole or not at all.
  fn is_structured(&self) -> bool {
    false
  }

  /// Match the leading date/time token. `year` is used only by formats that
  /// omit the year.
  ///
  /// [`LineDecomposer`](crate::normalize::LineDecomposer) only calls this on
  /// non-structured extractors; structured ones still answer it for callers
  /// that want the leading timestamp without decomposing the line.
  fn match_date(&self, line: &str, year: i32) -> Option<DateMatch>;

  /// Decompose the whole line. Date-only formats return `None`.
  fn match_line(&self, _line: &str) -> Option<StructuredMatch> {
    None
  }
}

/// Convert a `±hh:mm` offset into `±hhmm`.
///
/// Returns `None` for anything that is not exactly a sign, two digits, a colon
/// and two digits.
pub fn normalize_offset(offset: &str) -> Option<String> {
  let b = offset.as_bytes();
  let well_formed = b.len() == 6
    && (b[0] == b'+' || b[0] == b'-')
    && b[1].is_ascii_digit()
    && b[2].is_ascii_digit()
    && b[3] == b':'
    && b[4].is_ascii_digit()
    && b[5].is_ascii_digit();
  if !well_formed {
    return None;
  }
  Some(format!("{}{}", &offset[..3], &offset[4..]))
}

/// Build an absolute instant from the regex groups of an ISO 8601 timestamp.
fn to_datetime(date: &str, time: &str, frac: &str, offset: &str) -> Option<DateTime<FixedOffset>> {
  let offset = match normalize_offset(offset) {
    Some(o) => o,
    None => {
      tracing::debug!(offset, "malformed timezone offset");
      return None;
    }
  };
  let text = format!("{}T{}{}{}", date, time, frac, offset);
  let format = if frac.is_empty() {
    "%Y-%m-%dT%H:%M:%S%z"
  } else {
    "%Y-%m-%dT%H:%M:%S%.f%z"
  };
  DateTime::parse_from_str(&text, format).ok()
}

/// Structured RFC 3339-style extractor.
#[derive(Debug, Default, Clone, Copy)]
pub struct Iso8601Extractor;

impl TimestampExtractor for Iso8601Extractor {
  fn kind(&self) -> ExtractorKind {
    ExtractorKind::Iso8601
  }

  fn is_structured(&self) -> bool {
    true
  }

  // Not reached from the decomposer, which takes the whole line or nothing.
  fn match_date(&self, line: &str, _year: i32) -> Option<DateMatch> {
    let caps = ISO_DATE_REGEX.captures(line)?;
    let frac = caps.name("frac").map_or("", |m| m.as_str());
    let timestamp = to_datetime(&caps["date"], &caps["time"], frac, &caps["offset"])?;
    Some(DateMatch {
      date: timestamp.date_naive(),
      time: Some(caps["time"].to_string()),
      timestamp: Some(timestamp),
    })
  }

  fn match_line(&self, line: &str) -> Option<StructuredMatch> {
    let caps = ISO_LINE_REGEX.captures(line)?;
    let frac = caps.name("frac").map_or("", |m| m.as_str());
    let timestamp = to_datetime(&caps["date"], &caps["time"], frac, &caps["offset"])?;
    Some(StructuredMatch {
      timestamp,
      time: caps["time"].to_string(),
      host: caps["host"].to_string(),
      program: caps["app"].to_string(),
      pid: caps.name("pid").map(|m| m.as_str().to_string()),
      message: caps["msg"].to_string(),
    })
  }
}

/// Legacy BSD syslog extractor: `Mon DD ` with the year supplied by the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyDateExtractor;

impl TimestampExtractor for LegacyDateExtractor {
  fn kind(&self) -> ExtractorKind {
    ExtractorKind::LegacyDate
  }

  fn match_date(&self, line: &str, year: i32) -> Option<DateMatch> {
    let caps = LEGACY_DATE_REGEX.captures(line)?;
    let month: Month = caps["month"].parse().ok()?;
    let day: u32 = caps["day"].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month.number_from_month(), day)?;
    Some(DateMatch {
      date,
      time: None,
      timestamp: None,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  const REBOOT_LINE: &str =
    "2024-01-01T00:00:05+00:00 host1 cron[123]: (CRON) INFO (Running @reboot jobs)";

  #[test_case("+01:00", Some("+0100"))]
  #[test_case("-08:00", Some("-0800"))]
  #[test_case("+0100", None)]
  #[test_case("+1:00", None)]
  #[test_case("+01:0a", None)]
  #[test_case("01:000", None)]
  fn normalize_offset_cases(input: &str, expected: Option<&str>) {
    assert_eq!(normalize_offset(input).as_deref(), expected);
  }

  #[test]
  fn iso_line_splits_fields() {
    let m = Iso8601Extractor.match_line(REBOOT_LINE).unwrap();
    assert_eq!(m.time, "00:00:05");
    assert_eq!(m.host, "host1");
    assert_eq!(m.program, "cron");
    assert_eq!(m.pid.as_deref(), Some("123"));
    assert_eq!(m.message, "(CRON) INFO (Running @reboot jobs)");
    assert_eq!(m.timestamp.to_rfc3339(), "2024-01-01T00:00:05+00:00");
  }

  #[test]
  fn iso_line_without_pid() {
    let m = Iso8601Extractor
      .match_line("2024-05-06T07:08:09+02:00 box kernel: Linux version 6.1")
      .unwrap();
    assert_eq!(m.program, "kernel");
    assert_eq!(m.pid, None);
    assert_eq!(m.message, "Linux version 6.1");
  }

  #[test]
  fn iso_line_keeps_trailing_text_in_message() {
    let m = Iso8601Extractor
      .match_line("2024-05-06T07:08:09+02:00 box app[1]: a: b [c] :: d")
      .unwrap();
    assert_eq!(m.message, "a: b [c] :: d");
  }

  #[test]
  fn iso_line_with_fraction() {
    let m = Iso8601Extractor
      .match_line("2024-05-06T07:08:09.123456-05:00 box sshd[77]: Accepted publickey")
      .unwrap();
    assert_eq!(m.time, "07:08:09");
    assert_eq!(m.timestamp.timestamp_subsec_micros(), 123456);
    assert_eq!(m.timestamp.offset().local_minus_utc(), -5 * 3600);
  }

  #[test]
  fn iso_line_must_match_at_start() {
    assert!(Iso8601Extractor.match_line(&format!(" {}", REBOOT_LINE)).is_none());
    assert!(Iso8601Extractor.match_line("2024-01-01T00:00:05+00:00 host1").is_none());
  }

  #[test]
  fn iso_malformed_offset_is_unparseable() {
    assert!(Iso8601Extractor
      .match_line("2024-01-01T00:00:05+1:00 host1 cron[1]: x")
      .is_none());
    assert!(Iso8601Extractor
      .match_date("2024-01-01T00:00:05+100:00 tail", 2000)
      .is_none());
  }

  #[test]
  fn iso_invalid_calendar_date_is_unparseable() {
    assert!(Iso8601Extractor
      .match_line("2023-02-30T00:00:05+00:00 host1 cron[1]: x")
      .is_none());
  }

  #[test]
  fn colon_offset_equals_plain_offset_instant() {
    let with_colon = Iso8601Extractor
      .match_date("2024-03-10T12:00:00+01:00", 1970)
      .unwrap();
    let plain = DateTime::parse_from_str("2024-03-10T12:00:00+0100", "%Y-%m-%dT%H:%M:%S%z").unwrap();
    assert_eq!(with_colon.timestamp, Some(plain));
  }

  #[test]
  fn iso_date_ignores_year_argument() {
    let m = Iso8601Extractor.match_date(REBOOT_LINE, 1999).unwrap();
    assert_eq!(m.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(m.time.as_deref(), Some("00:00:05"));
  }

  #[test_case("Mar  5 10:00:00 host x", 2024, 3, 5)]
  #[test_case("Dec 31 23:59:59 host x", 2023, 12, 31)]
  #[test_case("jan 1 anything", 2025, 1, 1)]
  #[test_case("Feb 29 leap", 2024, 2, 29)]
  fn legacy_date_uses_supplied_year(line: &str, year: i32, month: u32, day: u32) {
    let m = LegacyDateExtractor.match_date(line, year).unwrap();
    assert_eq!(m.date, NaiveDate::from_ymd_opt(year, month, day).unwrap());
    assert_eq!(m.time, None);
    assert_eq!(m.timestamp, None);
  }

  #[test_case("Feb 29 not a leap year", 2023)]
  #[test_case("Foo 12 bar", 2024)]
  #[test_case("Mar 5", 2024)]
  #[test_case("2024-01-01T00:00:05+00:00 host", 2024)]
  #[test_case("", 2024)]
  fn legacy_date_rejects(line: &str, year: i32) {
    assert!(LegacyDateExtractor.match_date(line, year).is_none());
  }

  #[test]
  fn legacy_never_decomposes() {
    assert!(LegacyDateExtractor
      .match_line("Mar  5 10:00:00 host cron[1]: hello")
      .is_none());
  }
}
