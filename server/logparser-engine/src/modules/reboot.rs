//! Reboot detection from cron's `@reboot` job banner.

use crate::findings::FindingsAggregator;
use crate::module::{AnalysisModule, MatchRule};
use crate::types::{Event, Level};

/// Fact key holding one entry per detected reboot, in arrival order.
pub const REBOOTS_FACT: &str = "system.reboots";

/// Fact value for a reboot whose line carried no time at all.
pub const UNKNOWN_TIME: &str = "unknown";

/// Counts system reboots on hosts that run `@reboot` cron jobs.
#[derive(Debug, Default)]
pub struct RebootModule {
  reboots: Vec<String>,
}

impl RebootModule {
  pub const NAME: &'static str = "reboot";

  fn system_reboot(&mut self, event: &Event<'_>) {
    let when = event
      .time
      .map(str::to_string)
      .or_else(|| event.timestamp.map(|t| t.to_rfc3339()))
      .unwrap_or_else(|| UNKNOWN_TIME.to_string());
    self.reboots.push(when);
  }
}

impl AnalysisModule for RebootModule {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn registration(&self) -> Vec<MatchRule<Self>> {
    vec![MatchRule::new(
      "cron",
      "(CRON) INFO (Running @reboot jobs)",
      Self::system_reboot,
    )]
  }

  fn start(&mut self) {
    self.reboots.clear();
  }

  fn finish(&mut self, findings: &FindingsAggregator) {
    if self.reboots.is_empty() {
      return;
    }
    findings.message(
      Level::Warning,
      "System",
      "Reboot and startup",
      format!("System is rebooted; count='{}'", self.reboots.len()),
    );
    for when in self.reboots.drain(..) {
      findings.add_fact_value(REBOOTS_FACT, when);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::DateTime;

  fn cron_event<'a>(time: Option<&'a str>, message: &'a str) -> Event<'a> {
    Event {
      source: "syslog",
      timestamp: DateTime::parse_from_rfc3339("2024-01-01T00:00:05+00:00").ok(),
      time,
      host: Some("host1"),
      program: "cron",
      pid: Some("123"),
      message,
    }
  }

  #[test]
  fn no_reboots_no_findings() {
    let mut m = RebootModule::default();
    let findings = FindingsAggregator::new();
    m.start();
    m.finish(&findings);
    assert!(findings.snapshot().is_empty());
  }

  #[test]
  fn reboots_become_warning_and_facts() {
    let mut m = RebootModule::default();
    let findings = FindingsAggregator::new();
    m.start();
    m.system_reboot(&cron_event(Some("00:00:05"), "(CRON) INFO (Running @reboot jobs)"));
    m.system_reboot(&cron_event(Some("08:15:00"), "(CRON) INFO (Running @reboot jobs)"));
    m.finish(&findings);

    let snap = findings.snapshot();
    assert_eq!(snap.messages.len(), 1);
    assert_eq!(snap.messages[0].level, Level::Warning);
    assert_eq!(snap.messages[0].category, "System");
    assert_eq!(snap.messages[0].title, "Reboot and startup");
    assert_eq!(snap.messages[0].text, "System is rebooted; count='2'");
    assert_eq!(snap.fact(REBOOTS_FACT), ["00:00:05", "08:15:00"]);
  }

  #[test]
  fn falls_back_to_full_timestamp_without_time_literal() {
    let mut m = RebootModule::default();
    let findings = FindingsAggregator::new();
    m.start();
    m.system_reboot(&cron_event(None, "(CRON) INFO (Running @reboot jobs)"));
    m.finish(&findings);
    assert_eq!(findings.snapshot().fact(REBOOTS_FACT), ["2024-01-01T00:00:05+00:00"]);
  }

  #[test]
  fn undated_reboot_is_still_counted() {
    let mut m = RebootModule::default();
    let findings = FindingsAggregator::new();
    m.start();
    m.system_reboot(&cron_event(Some("00:00:05"), "(CRON) INFO (Running @reboot jobs)"));
    m.system_reboot(&Event {
      timestamp: None,
      ..cron_event(None, "(CRON) INFO (Running @reboot jobs)")
    });
    m.finish(&findings);

    let snap = findings.snapshot();
    assert_eq!(snap.messages[0].text, "System is rebooted; count='2'");
    assert_eq!(snap.fact(REBOOTS_FACT), ["00:00:05", UNKNOWN_TIME]);
  }

  #[test]
  fn registers_single_cron_rule() {
    let rules = RebootModule::default().registration();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].program, "cron");
    assert_eq!(rules[0].message_substring, "(CRON) INFO (Running @reboot jobs)");
  }
}
