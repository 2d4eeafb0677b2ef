//! Engine configuration with sane defaults.
//!
//! Priority: environment variables > TOML file > defaults.

use std::path::Path;

use serde::Deserialize;

use crate::error::EngineError;

/// Default cap on a single line (1 MiB).
pub const DEFAULT_MAX_LINE_BYTES: usize = 1_048_576;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Year assumed for legacy `Mon DD` dates. `None` leaves the choice to the
  /// caller (see [`Config::resolved_year`]).
  pub current_year: Option<i32>,
  /// Built-in modules to enable; empty enables all.
  pub modules: Vec<String>,
  /// Process multiple sources on worker threads.
  pub parallel: bool,
  /// Longer lines are cut before decomposition.
  pub max_line_bytes: usize,
  /// Default tracing filter when `RUST_LOG` is unset.
  pub log_filter: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      current_year: None,
      modules: Vec::new(),
      parallel: true,
      max_line_bytes: DEFAULT_MAX_LINE_BYTES,
      log_filter: "logparser_engine=info".to_string(),
    }
  }
}

impl Config {
  /// Load from the file named by `LOGPARSER_CONFIG_FILE` (if it exists), then
  /// apply environment overrides.
  pub fn load() -> Result<Self, EngineError> {
    let mut config = match std::env::var("LOGPARSER_CONFIG_FILE") {
      Ok(path) if Path::new(&path).exists() => {
        tracing::info!("Loading configuration from: {}", path);
        Self::from_file(&path)?
      }
      Ok(path) => {
        tracing::info!("Config file not found at {}, using defaults", path);
        Self::default()
      }
      Err(_) => Self::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
    let contents = std::fs::read_to_string(path)?;
    Self::from_toml_str(&contents)
  }

  pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
    Ok(toml::from_str(s)?)
  }

  /// Apply `LOGPARSER_*` overrides read through `lookup`.
  pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), EngineError>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(year) = lookup("LOGPARSER_CURRENT_YEAR") {
      let year = year
        .trim()
        .parse()
        .map_err(|_| EngineError::config(format!("LOGPARSER_CURRENT_YEAR: not a year: {}", year)))?;
      self.current_year = Some(year);
    }
    if let Some(modules) = lookup("LOGPARSER_MODULES") {
      self.modules = modules
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    }
    if let Some(parallel) = lookup("LOGPARSER_PARALLEL") {
      self.parallel = parallel
        .trim()
        .parse()
        .map_err(|_| EngineError::config(format!("LOGPARSER_PARALLEL: expected true|false, got {}", parallel)))?;
    }
    Ok(())
  }

  pub fn validate(&self) -> Result<(), EngineError> {
    if let Some(year) = self.current_year {
      if !(1..=9999).contains(&year) {
        return Err(EngineError::config(format!("current_year out of range: {}", year)));
      }
    }
    if self.max_line_bytes == 0 {
      return Err(EngineError::config("max_line_bytes must be > 0"));
    }
    Ok(())
  }

  /// Configured year, or `fallback` when none is set.
  pub fn resolved_year(&self, fallback: i32) -> i32 {
    self.current_year.unwrap_or(fallback)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn defaults() {
    let c = Config::default();
    assert_eq!(c.current_year, None);
    assert!(c.modules.is_empty());
    assert!(c.parallel);
    assert_eq!(c.max_line_bytes, DEFAULT_MAX_LINE_BYTES);
    assert!(c.validate().is_ok());
  }

  #[test]
  fn partial_toml_keeps_defaults() {
    let c = Config::from_toml_str("current_year = 2021\nmodules = [\"reboot\"]\n").unwrap();
    assert_eq!(c.current_year, Some(2021));
    assert_eq!(c.modules, ["reboot"]);
    assert!(c.parallel);
  }

  #[test]
  fn bad_toml_is_an_error() {
    assert!(matches!(
      Config::from_toml_str("parallel = \"sometimes\""),
      Err(EngineError::Toml(_))
    ));
  }

  #[test]
  fn env_overrides_file_values() {
    let env: HashMap<&str, &str> = [
      ("LOGPARSER_CURRENT_YEAR", "2019"),
      ("LOGPARSER_MODULES", "reboot, , other"),
      ("LOGPARSER_PARALLEL", "false"),
    ]
    .into_iter()
    .collect();
    let mut c = Config::from_toml_str("current_year = 2021").unwrap();
    c.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(c.current_year, Some(2019));
    assert_eq!(c.modules, ["reboot", "other"]);
    assert!(!c.parallel);
  }

  #[test]
  fn bad_env_year_is_an_error() {
    let mut c = Config::default();
    let err = c
      .apply_env(|k| (k == "LOGPARSER_CURRENT_YEAR").then(|| "next".to_string()))
      .unwrap_err();
    assert!(err.to_string().contains("LOGPARSER_CURRENT_YEAR"));
  }

  #[test]
  fn validate_rejects_out_of_range() {
    let c = Config {
      current_year: Some(0),
      ..Config::default()
    };
    assert!(c.validate().is_err());
    let c = Config {
      max_line_bytes: 0,
      ..Config::default()
    };
    assert!(c.validate().is_err());
  }

  #[test]
  fn resolved_year_prefers_configured() {
    let c = Config {
      current_year: Some(2020),
      ..Config::default()
    };
    assert_eq!(c.resolved_year(2030), 2020);
    assert_eq!(Config::default().resolved_year(2030), 2030);
  }
}
