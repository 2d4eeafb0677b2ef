//! Analysis module contract.
//!
//! A module declares its interest as a list of [`MatchRule`]s, each binding a
//! `(program, message substring)` filter to one of its own methods. The engine
//! drives it through `start -> callbacks* -> finish`; only `finish` writes to
//! the findings aggregator.

use std::fmt;

use crate::error::EngineError;
use crate::findings::FindingsAggregator;
use crate::types::Event;

/// Method invoked for every line matching a rule.
pub type Callback<M> = fn(&mut M, &Event<'_>);

/// A declarative filter owned by one module.
pub struct MatchRule<M> {
  /// Exact, case-sensitive program name.
  pub program: String,
  /// Literal substring looked up in the message.
  pub message_substring: String,
  pub callback: Callback<M>,
}

impl<M> MatchRule<M> {
  pub fn new(program: impl Into<String>, message_substring: impl Into<String>, callback: Callback<M>) -> Self {
    Self {
      program: program.into(),
      message_substring: message_substring.into(),
      callback,
    }
  }
}

/// The filter half of a rule, without the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFilter {
  pub program: String,
  pub message_substring: String,
}

pub trait AnalysisModule: Send + 'static {
  /// Stable name used in configuration and error reports.
  fn name(&self) -> &'static str;

  /// Rules this module wants registered. Must return the same rules, in the
  /// same order, for every instance.
  fn registration(&self) -> Vec<MatchRule<Self>>
  where
    Self: Sized;

  /// Reset accumulator state before the first event.
  fn start(&mut self);

  /// Flush derived messages and facts.
  fn finish(&mut self, findings: &FindingsAggregator);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  Created,
  Started,
  Finished,
}

impl fmt::Display for Lifecycle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Lifecycle::Created => "created",
      Lifecycle::Started => "started",
      Lifecycle::Finished => "finished",
    };
    f.write_str(s)
  }
}

/// A module with its callbacks bound, behind a lifecycle check.
pub trait ModuleInstance: Send {
  fn name(&self) -> &str;
  fn state(&self) -> Lifecycle;
  fn start(&mut self) -> Result<(), EngineError>;
  /// Invoke the callback of the module's `rule`-th registered rule.
  fn deliver(&mut self, rule: usize, event: &Event<'_>) -> Result<(), EngineError>;
  fn finish(&mut self, findings: &FindingsAggregator) -> Result<(), EngineError>;
}

struct Bound<M: AnalysisModule> {
  module: M,
  callbacks: Vec<Callback<M>>,
  state: Lifecycle,
}

/// Split a module's registration into rule filters and a bound instance.
pub fn bind<M: AnalysisModule>(module: M) -> (Box<dyn ModuleInstance>, Vec<RuleFilter>) {
  let (filters, callbacks): (Vec<_>, Vec<_>) = module
    .registration()
    .into_iter()
    .map(|r| {
      (
        RuleFilter {
          program: r.program,
          message_substring: r.message_substring,
        },
        r.callback,
      )
    })
    .unzip();

  let bound = Bound {
    module,
    callbacks,
    state: Lifecycle::Created,
  };
  (Box::new(bound), filters)
}

impl<M: AnalysisModule> ModuleInstance for Bound<M> {
  fn name(&self) -> &str {
    self.module.name()
  }

  fn state(&self) -> Lifecycle {
    self.state
  }

  fn start(&mut self) -> Result<(), EngineError> {
    if self.state != Lifecycle::Created {
      return Err(EngineError::lifecycle(self.module.name(), self.state, "start"));
    }
    self.module.start();
    self.state = Lifecycle::Started;
    Ok(())
  }

  fn deliver(&mut self, rule: usize, event: &Event<'_>) -> Result<(), EngineError> {
    if self.state != Lifecycle::Started {
      return Err(EngineError::lifecycle(self.module.name(), self.state, "receive events"));
    }
    let callback = self
      .callbacks
      .get(rule)
      .copied()
      .ok_or_else(|| EngineError::invalid_rule(self.module.name(), &format!("no rule #{}", rule)))?;
    callback(&mut self.module, event);
    Ok(())
  }

  fn finish(&mut self, findings: &FindingsAggregator) -> Result<(), EngineError> {
    if self.state != Lifecycle::Started {
      return Err(EngineError::lifecycle(self.module.name(), self.state, "finish"));
    }
    self.module.finish(findings);
    self.state = Lifecycle::Finished;
    Ok(())
  }
}
