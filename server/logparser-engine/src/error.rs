//! Structured error types for the log parser engine.
//!
//! Per-line problems never show up here: an unparseable line degrades to a
//! `ParsedLine` with empty structural fields. These errors cover contract
//! violations (bad rules, lifecycle misuse) and configuration/I/O failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("invalid rule in module '{module}': {reason}")]
  InvalidRule { module: String, reason: String },

  #[error("module '{0}' registered twice")]
  DuplicateModule(String),

  #[error("unknown module '{0}'")]
  UnknownModule(String),

  #[error("lifecycle: module '{module}' is {state}, cannot {operation}")]
  Lifecycle {
    module: String,
    state: String,
    operation: String,
  },

  #[error("config: {0}")]
  Config(String),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  #[error("toml: {0}")]
  Toml(#[from] toml::de::Error),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn invalid_rule(module: &str, reason: &str) -> Self {
    Self::InvalidRule {
      module: module.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn lifecycle(module: &str, state: impl std::fmt::Display, operation: &str) -> Self {
    Self::Lifecycle {
      module: module.to_string(),
      state: state.to_string(),
      operation: operation.to_string(),
    }
  }

  pub fn config(msg: impl Into<String>) -> Self {
    Self::Config(msg.into())
  }
}
