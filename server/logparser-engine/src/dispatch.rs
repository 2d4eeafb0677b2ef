//! Route parsed lines to the callbacks of matching rules.

use crate::error::EngineError;
use crate::module::ModuleInstance;
use crate::registry::{ModuleRegistry, RuleRef};
use crate::types::ParsedLine;

/// Stateless router over a frozen registry.
#[derive(Clone, Copy)]
pub struct Dispatcher<'r> {
  registry: &'r ModuleRegistry,
}

impl<'r> Dispatcher<'r> {
  pub fn new(registry: &'r ModuleRegistry) -> Self {
    Self { registry }
  }

  /// Rules matching `parsed`, in registration order.
  ///
  /// Rules are anchored to a program, so a line without one matches nothing.
  pub fn matching<'a>(&self, parsed: &'a ParsedLine) -> impl Iterator<Item = &'r RuleRef> + 'a
  where
    'r: 'a,
  {
    let rules = match parsed.program.as_deref() {
      Some(program) => self.registry.rules_for(program),
      None => &[],
    };
    rules
      .iter()
      .filter(move |r| parsed.message.contains(r.message_substring.as_str()))
  }

  /// Invoke every matching callback once. `modules` must come from
  /// `registry.instantiate()`. Returns the number of callbacks invoked.
  pub fn dispatch(
    &self,
    parsed: &ParsedLine,
    modules: &mut [Box<dyn ModuleInstance>],
  ) -> Result<usize, EngineError> {
    let event = match parsed.event() {
      Some(e) => e,
      None => return Ok(0),
    };

    let mut invoked = 0;
    for rule in self.matching(parsed) {
      let module = modules.get_mut(rule.module).ok_or_else(|| {
        EngineError::invalid_rule("?", &format!("no module in slot {}", rule.module))
      })?;
      tracing::trace!(module = module.name(), program = event.program, "rule matched");
      module.deliver(rule.rule, &event)?;
      invoked += 1;
    }
    Ok(invoked)
  }
}
