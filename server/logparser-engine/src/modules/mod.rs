//! Built-in analysis modules and the name -> module catalog used by configuration.

pub mod reboot;

pub use reboot::RebootModule;

use crate::error::EngineError;
use crate::registry::RegistryBuilder;

/// Names accepted in `Config::modules`.
pub const BUILTIN: &[&str] = &[RebootModule::NAME];

/// Register the built-in modules named in `names`, or all of them when `names`
/// is empty. Names are registered in the order given.
pub fn register_builtin(builder: &mut RegistryBuilder, names: &[String]) -> Result<(), EngineError> {
  let selected: Vec<&str> = if names.is_empty() {
    BUILTIN.to_vec()
  } else {
    names.iter().map(|n| n.trim()).collect()
  };

  for name in selected {
    match name {
      RebootModule::NAME => {
        builder.register(RebootModule::default);
      }
      other => return Err(EngineError::UnknownModule(other.to_string())),
    }
  }
  Ok(())
}
