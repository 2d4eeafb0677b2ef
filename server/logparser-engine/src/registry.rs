//! Module registry: collects every module's rules, validates them, and freezes
//! into an immutable program -> rules index shared by all dispatch workers.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::module::{bind, AnalysisModule, ModuleInstance, RuleFilter};

type Factory = Box<dyn Fn() -> (Box<dyn ModuleInstance>, Vec<RuleFilter>) + Send + Sync>;

/// A registered rule, resolved to its owning module slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRef {
  /// Index of the module in registration order.
  pub module: usize,
  /// Index of the rule within that module's registration.
  pub rule: usize,
  pub message_substring: String,
}

struct Entry {
  name: String,
  filters: Vec<RuleFilter>,
  factory: Factory,
}

/// Mutable registration phase. Consumed by [`RegistryBuilder::freeze`].
#[derive(Default)]
pub struct RegistryBuilder {
  entries: Vec<Entry>,
}

impl RegistryBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a module type. `factory` builds a fresh instance for each run;
  /// one instance is built right away to read the module's rules.
  pub fn register<M, F>(&mut self, factory: F) -> &mut Self
  where
    M: AnalysisModule,
    F: Fn() -> M + Send + Sync + 'static,
  {
    let (probe, filters) = bind(factory());
    let name = probe.name().to_string();
    self.entries.push(Entry {
      name,
      filters,
      factory: Box::new(move || bind(factory())),
    });
    self
  }

  /// Validate every rule and build the lookup index.
  ///
  /// Fails on an empty program name, a program name containing whitespace,
  /// or two modules sharing a name.
  pub fn freeze(self) -> Result<ModuleRegistry, EngineError> {
    let mut by_program: HashMap<String, Vec<RuleRef>> = HashMap::new();
    let mut names = Vec::with_capacity(self.entries.len());
    let mut factories = Vec::with_capacity(self.entries.len());

    for (module, entry) in self.entries.into_iter().enumerate() {
      if names.contains(&entry.name) {
        return Err(EngineError::DuplicateModule(entry.name));
      }
      for (rule, filter) in entry.filters.into_iter().enumerate() {
        if filter.program.is_empty() {
          return Err(EngineError::invalid_rule(&entry.name, "empty program"));
        }
        if filter.program.chars().any(char::is_whitespace) {
          return Err(EngineError::invalid_rule(
            &entry.name,
            &format!("program '{}' contains whitespace", filter.program),
          ));
        }
        by_program.entry(filter.program).or_default().push(RuleRef {
          module,
          rule,
          message_substring: filter.message_substring,
        });
      }
      names.push(entry.name);
      factories.push(entry.factory);
    }

    tracing::debug!(
      modules = names.len(),
      programs = by_program.len(),
      "module registry frozen"
    );

    Ok(ModuleRegistry {
      names,
      factories,
      by_program,
    })
  }
}

/// Frozen rule index. Read-only; safe to share across threads.
pub struct ModuleRegistry {
  names: Vec<String>,
  factories: Vec<Factory>,
  by_program: HashMap<String, Vec<RuleRef>>,
}

impl ModuleRegistry {
  /// All rules anchored to `program`, in registration order.
  pub fn rules_for(&self, program: &str) -> &[RuleRef] {
    self.by_program.get(program).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn module_names(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn rule_count(&self) -> usize {
    self.by_program.values().map(Vec::len).sum()
  }

  /// Fresh module instances, indexed like `RuleRef::module`.
  pub fn instantiate(&self) -> Vec<Box<dyn ModuleInstance>> {
    self.factories.iter().map(|f| f().0).collect()
  }
}
