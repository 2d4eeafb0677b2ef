//! Core engine: owns the frozen registry and drives one session per log source.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::EngineError;
use crate::findings::FindingsAggregator;
use crate::module::ModuleInstance;
use crate::modules;
use crate::normalize::{self, LineDecomposer};
use crate::registry::{ModuleRegistry, RegistryBuilder};
use crate::source::{Line, OpenSource, SourceLine};
use crate::stats;
use crate::types::*;

/// Cooperative cancellation flag, checked once per line.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  /// Trip the flag. Returns whether it was already tripped.
  pub fn cancel(&self) -> bool {
    self.0.swap(true, Ordering::SeqCst)
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// How a single source ended.
#[derive(Debug, Clone)]
pub enum SourceOutcome {
  Completed { snapshot: Snapshot, stats: RunStats },
  /// Cancelled between lines; module state was discarded unflushed.
  Aborted { stats: RunStats },
  /// The source could not be opened or read to the end; module state was
  /// discarded unflushed.
  Failed { stats: RunStats, error: String },
}

/// The log normalization and dispatch engine. Immutable once built and
/// shareable across worker threads.
pub struct Engine {
  config: Config,
  registry: ModuleRegistry,
  decomposer: LineDecomposer,
  year: i32,
}

impl Engine {
  /// Build an engine with the built-in modules selected by `config`.
  ///
  /// `fallback_year` is used for legacy dates unless `config.current_year`
  /// pins one.
  pub fn new(config: Config, fallback_year: i32) -> Result<Self, EngineError> {
    config.validate()?;
    let mut builder = RegistryBuilder::new();
    modules::register_builtin(&mut builder, &config.modules)?;
    let registry = builder.freeze()?;
    Ok(Self::with_registry(config, registry, fallback_year))
  }

  /// Build an engine around a caller-assembled registry.
  pub fn with_registry(config: Config, registry: ModuleRegistry, fallback_year: i32) -> Self {
    let year = config.resolved_year(fallback_year);
    Self {
      config,
      registry,
      decomposer: LineDecomposer::new(),
      year,
    }
  }

  pub fn with_defaults(year: i32) -> Result<Self, EngineError> {
    Self::new(Config::default(), year)
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn registry(&self) -> &ModuleRegistry {
    &self.registry
  }

  pub fn year(&self) -> i32 {
    self.year
  }

  /// Decompose a line with this engine's extractors and year.
  pub fn decompose(&self, raw: RawLine) -> ParsedLine {
    self.decomposer.decompose(raw, self.year)
  }

  /// A new session with fresh module instances.
  pub fn session(&self, source_id: impl Into<String>) -> Session<'_> {
    Session {
      engine: self,
      source_id: source_id.into(),
      modules: self.registry.instantiate(),
      stats: RunStats::default(),
    }
  }

  /// Open and run one source to completion, cancellation, or a read error.
  ///
  /// Only contract violations are returned as errors; an unreadable source
  /// comes back as [`SourceOutcome::Failed`].
  pub fn run_source<S: OpenSource>(
    &self,
    source_id: &str,
    source: S,
    cancel: &CancelToken,
  ) -> Result<SourceOutcome, EngineError> {
    let mut session = self.session(source_id);
    session.start()?;
    let lines = match source.open(self.config.max_line_bytes) {
      Ok(lines) => lines,
      Err(e) => return Ok(session.fail(e)),
    };
    for item in lines {
      if cancel.is_cancelled() {
        return Ok(session.abort());
      }
      match item.into_line() {
        Ok(line) => {
          session.process_line(line)?;
        }
        Err(e) => return Ok(session.fail(e)),
      }
    }
    if cancel.is_cancelled() {
      return Ok(session.abort());
    }
    let (snapshot, stats) = session.finish()?;
    Ok(SourceOutcome::Completed { snapshot, stats })
  }

  /// Run several sources, each with its own module instances, and merge the
  /// results in source order. Sources are opened by the worker that runs
  /// them, on the rayon pool when `config.parallel` is set and there is more
  /// than one.
  pub fn run_sources<S: OpenSource>(
    &self,
    sources: Vec<(String, S)>,
    cancel: &CancelToken,
  ) -> Result<RunReport, EngineError> {
    let ids: Vec<String> = sources.iter().map(|(id, _)| id.clone()).collect();
    tracing::info!(sources = ids.len(), modules = self.registry.len(), year = self.year, "run started");

    let run = |(id, source): (String, S)| self.run_source(&id, source, cancel);
    let outcomes: Vec<Result<SourceOutcome, EngineError>> = if self.config.parallel && sources.len() > 1 {
      sources.into_par_iter().map(run).collect()
    } else {
      sources.into_iter().map(run).collect()
    };

    let merged = FindingsAggregator::new();
    let mut report = RunReport::default();
    for (id, outcome) in ids.into_iter().zip(outcomes) {
      match outcome? {
        SourceOutcome::Completed { snapshot, stats: s } => {
          merged.absorb(snapshot);
          stats::merge(&mut report.stats, &s);
        }
        SourceOutcome::Aborted { stats: s } => {
          stats::merge(&mut report.stats, &s);
          report.aborted.push(id);
        }
        SourceOutcome::Failed { stats: s, error } => {
          stats::merge(&mut report.stats, &s);
          report.failed.push(SourceFailure { source: id, error });
        }
      }
    }
    report.snapshot = merged.into_snapshot();

    tracing::info!(
      lines = report.stats.lines,
      structured = report.stats.structured,
      date_only = report.stats.date_only,
      unparsed = report.stats.unparsed,
      callbacks = report.stats.callbacks,
      messages = report.snapshot.messages.len(),
      aborted = report.aborted.len(),
      failed = report.failed.len(),
      "run finished"
    );
    Ok(report)
  }
}

/// One pass over one source: fresh modules, one line at a time.
pub struct Session<'e> {
  engine: &'e Engine,
  source_id: String,
  modules: Vec<Box<dyn ModuleInstance>>,
  stats: RunStats,
}

impl<'e> Session<'e> {
  pub fn source_id(&self) -> &str {
    &self.source_id
  }

  pub fn stats(&self) -> &RunStats {
    &self.stats
  }

  /// Start every module. Must be called once, before the first line.
  pub fn start(&mut self) -> Result<(), EngineError> {
    for module in &mut self.modules {
      module.start()?;
    }
    tracing::debug!(source = %self.source_id, modules = self.modules.len(), "session started");
    Ok(())
  }

  /// Decompose and dispatch one line. Returns the number of callbacks invoked.
  pub fn process_line(&mut self, line: impl Into<Line>) -> Result<usize, EngineError> {
    let Line { mut text, truncated } = line.into();
    let truncated = normalize::truncate_line(&mut text, self.engine.config.max_line_bytes) || truncated;
    if truncated {
      tracing::debug!(source = %self.source_id, "line truncated");
    }
    let parsed = self.engine.decompose(RawLine::new(self.source_id.as_str(), text));
    stats::record_line(&mut self.stats, &parsed, truncated);

    let invoked = Dispatcher::new(&self.engine.registry).dispatch(&parsed, &mut self.modules)?;
    stats::record_callbacks(&mut self.stats, invoked);
    Ok(invoked)
  }

  /// Finish every module and return what they emitted.
  pub fn finish(mut self) -> Result<(Snapshot, RunStats), EngineError> {
    let findings = FindingsAggregator::new();
    for module in &mut self.modules {
      module.finish(&findings)?;
    }
    let stats = self.stats;
    tracing::info!(
      source = %self.source_id,
      lines = stats.lines,
      unparsed = stats.unparsed,
      callbacks = stats.callbacks,
      "source finished"
    );
    Ok((findings.into_snapshot(), stats))
  }

  /// Drop module state without flushing it.
  pub fn abort(self) -> SourceOutcome {
    tracing::warn!(source = %self.source_id, lines = self.stats.lines, "source aborted, findings discarded");
    SourceOutcome::Aborted { stats: self.stats }
  }

  /// Drop module state after a read error, without flushing it.
  pub fn fail(self, error: io::Error) -> SourceOutcome {
    tracing::error!(source = %self.source_id, lines = self.stats.lines, "read failed, findings discarded: {}", error);
    SourceOutcome::Failed {
      stats: self.stats,
      error: error.to_string(),
    }
  }
}
