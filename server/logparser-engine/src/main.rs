//! Binary entrypoint: read syslog files (or stdin), write one JSON report to stdout.
//!
//! Usage:
//!   logparser-engine [FILE...]    # each FILE is one source; none (or "-") means stdin
//!
//! Output is a single RunReport object (messages, facts, stats, aborted and
//! failed sources) or an ErrorOutput when the run cannot start. Diagnostics go
//! to stderr through `tracing`.
//!
//! Exit status: 0 on success, 1 when a source failed or the run could not
//! start, 130 when interrupted. The first Ctrl-C stops every source at its next
//! line and still reports; a source blocked on an idle stdin only notices at
//! that next line, so a second Ctrl-C exits at once.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Datelike;
use logparser_engine::types::ErrorOutput;
use logparser_engine::{CancelToken, Config, Engine, EngineError, Input};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const INTERRUPTED: u8 = 130;

fn init_logging(default_filter: &str) {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .init();
}

/// Sources named on the command line; files are opened by the worker that
/// runs them.
fn inputs(paths: &[String]) -> Vec<(String, Input)> {
  if paths.is_empty() {
    return vec![("-".to_string(), Input::Stdin)];
  }
  paths
    .iter()
    .map(|p| {
      let input = if p == "-" {
        Input::Stdin
      } else {
        Input::File(PathBuf::from(p))
      };
      (p.clone(), input)
    })
    .collect()
}

fn write_json<W: Write, T: serde::Serialize>(mut out: W, value: &T) -> Result<(), EngineError> {
  serde_json::to_writer(&mut out, value)?;
  writeln!(out)?;
  out.flush()?;
  Ok(())
}

fn emit<T: serde::Serialize>(value: &T) -> Result<(), EngineError> {
  let stdout = io::stdout();
  write_json(io::BufWriter::new(stdout.lock()), value)
}

fn fail(err: ErrorOutput) -> ExitCode {
  if let Err(e) = emit(&err) {
    tracing::error!("cannot write error report: {}", e);
  }
  ExitCode::FAILURE
}

fn main() -> ExitCode {
  let config = match Config::load() {
    Ok(c) => c,
    Err(e) => {
      init_logging(&Config::default().log_filter);
      tracing::error!("{}", e);
      return fail(ErrorOutput::new(e.to_string()).with_field("config"));
    }
  };
  init_logging(&config.log_filter);

  // The wall clock is only consulted here; the engine takes the year as input.
  let engine = match Engine::new(config, chrono::Local::now().year()) {
    Ok(e) => e,
    Err(e) => {
      let err = match &e {
        EngineError::UnknownModule(_) => ErrorOutput::new(e.to_string()).with_field("modules"),
        _ => ErrorOutput::new(e.to_string()),
      };
      return fail(err);
    }
  };

  let cancel = CancelToken::new();
  let handler_token = cancel.clone();
  let installed = ctrlc::set_handler(move || {
    if handler_token.cancel() {
      std::process::exit(i32::from(INTERRUPTED));
    }
    tracing::warn!("interrupted; stopping at the next line (Ctrl-C again to exit now)");
  });
  if let Err(e) = installed {
    tracing::warn!("cannot install Ctrl-C handler: {}", e);
  }

  let paths: Vec<String> = std::env::args().skip(1).collect();
  match engine.run_sources(inputs(&paths), &cancel) {
    Ok(report) => {
      if let Err(e) = emit(&report) {
        tracing::error!("cannot write report: {}", e);
        return ExitCode::FAILURE;
      }
      if !report.failed.is_empty() {
        ExitCode::FAILURE
      } else if !report.aborted.is_empty() {
        ExitCode::from(INTERRUPTED)
      } else {
        ExitCode::SUCCESS
      }
    }
    Err(e) => fail(ErrorOutput::new(e.to_string())),
  }
}
