//! Core types for the log parser engine (line models + findings contracts).

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input lines
// ---------------------------------------------------------------------------

/// One text line as supplied by a log source, consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
  pub source_id: String,
  pub text: String,
}

impl RawLine {
  pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
    Self {
      source_id: source_id.into(),
      text: text.into(),
    }
  }
}

// ---------------------------------------------------------------------------
// Decomposed lines
// ---------------------------------------------------------------------------

/// Which extractor produced a `ParsedLine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
  Iso8601,
  LegacyDate,
  None,
}

/// Canonical line after decomposition. Never mutated after creation.
///
/// `timestamp` is only set when an absolute instant is known (date, time and
/// offset). A legacy date-only match fills `date` and leaves `timestamp` empty.
/// When the structure is unknown, `host`/`program`/`pid` are `None` and
/// `message` holds the full raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
  pub timestamp: Option<DateTime<FixedOffset>>,
  pub date: Option<NaiveDate>,
  /// Time-of-day literal exactly as matched (`hh:mm:ss`).
  pub time: Option<String>,
  pub host: Option<String>,
  pub program: Option<String>,
  pub pid: Option<String>,
  pub message: String,
  pub extractor: ExtractorKind,
  pub raw: RawLine,
}

impl ParsedLine {
  /// A line whose structure and date are both unknown.
  pub fn unparsed(raw: RawLine) -> Self {
    Self {
      timestamp: None,
      date: None,
      time: None,
      host: None,
      program: None,
      pid: None,
      message: raw.text.clone(),
      extractor: ExtractorKind::None,
      raw,
    }
  }

  /// Borrowed view handed to module callbacks. `None` when no program is known.
  pub fn event(&self) -> Option<Event<'_>> {
    let program = self.program.as_deref()?;
    Some(Event {
      source: &self.raw.source_id,
      timestamp: self.timestamp,
      time: self.time.as_deref(),
      host: self.host.as_deref(),
      program,
      pid: self.pid.as_deref(),
      message: &self.message,
    })
  }
}

/// Fields delivered to a matching rule's callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event<'a> {
  pub source: &'a str,
  pub timestamp: Option<DateTime<FixedOffset>>,
  pub time: Option<&'a str>,
  pub host: Option<&'a str>,
  pub program: &'a str,
  pub pid: Option<&'a str>,
  pub message: &'a str,
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
  Info,
  Warning,
  Error,
  Critical,
}

/// A leveled diagnostic produced by a module at finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
  pub level: Level,
  pub category: String,
  pub title: String,
  pub text: String,
}

impl Message {
  pub fn new(
    level: Level,
    category: impl Into<String>,
    title: impl Into<String>,
    text: impl Into<String>,
  ) -> Self {
    Self {
      level,
      category: category.into(),
      title: title.into(),
      text: text.into(),
    }
  }
}

/// Point-in-time copy of everything a run has collected.
///
/// Facts are keyed by dotted name; each value list keeps append order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
  pub messages: Vec<Message>,
  pub facts: BTreeMap<String, Vec<String>>,
}

impl Snapshot {
  pub fn is_empty(&self) -> bool {
    self.messages.is_empty() && self.facts.is_empty()
  }

  pub fn fact(&self, key: &str) -> &[String] {
    self.facts.get(key).map(Vec::as_slice).unwrap_or(&[])
  }
}

// ---------------------------------------------------------------------------
// Run counters
// ---------------------------------------------------------------------------

/// Per-session line and dispatch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
  pub lines: u64,
  pub structured: u64,
  pub date_only: u64,
  pub unparsed: u64,
  pub truncated: u64,
  pub callbacks: u64,
}

// ---------------------------------------------------------------------------
// Output types (JSON contract — what the binary emits)
// ---------------------------------------------------------------------------

/// Result of a complete run over one or more sources.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
  #[serde(flatten)]
  pub snapshot: Snapshot,
  pub stats: RunStats,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub aborted: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub failed: Vec<SourceFailure>,
}

/// A source that could not be opened or read to the end. Its findings are
/// dropped; lines read before the error still count in `stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
  pub source: String,
  pub error: String,
}

/// Structured error output for fatal failures.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}
