//! Syslog normalization and rule-based dispatch engine.
//!
//! Reads raw text lines from heterogeneous syslog producers, canonicalizes
//! their timestamp and structural fields, and routes each line to analysis
//! modules through declarative `(program, message substring)` rules. Modules
//! accumulate state over a single streaming pass and emit leveled messages and
//! named fact series when the pass finishes.
//!
//! Pipeline: source bytes -> [`LineReader`] -> raw line -> [`LineDecomposer`]
//! -> [`ParsedLine`] -> [`Dispatcher`] (queries [`ModuleRegistry`]) -> module
//! callbacks -> [`FindingsAggregator`].
//!
//! No DB, no network; the year for legacy dates is always supplied by the caller.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod extract;
pub mod findings;
pub mod module;
pub mod modules;
pub mod normalize;
pub mod registry;
pub mod source;
pub mod stats;
pub mod types;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use engine::{CancelToken, Engine, Session, SourceOutcome};
pub use error::EngineError;
pub use findings::FindingsAggregator;
pub use module::{AnalysisModule, MatchRule};
pub use normalize::LineDecomposer;
pub use registry::{ModuleRegistry, RegistryBuilder};
pub use source::{Input, Line, LineReader};
pub use types::{Event, Level, Message, ParsedLine, RawLine, RunReport, Snapshot, SourceFailure};
