//! # lib_datapulse
//!
//! Library side of the datapulse pipeline: fetch snapshots from public APIs,
//! persist them as timestamped files, derive simple aggregates and rewrite the
//! tables of a status document in place.
//!
//! The stages are plain functions over a [`configs::Settings`] value and an
//! explicit [`loggers::DiagnosticSink`], so the binaries in the `datapulse`
//! crate stay thin and every stage can be driven from tests.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Command line, environment and file based configuration.
pub mod configs;
/// The library-wide error type.
pub mod error;
/// Subscriber bootstrap and the diagnostic sinks handed to each stage.
pub mod loggers;
/// Orchestration of collect, process and update.
pub mod pipeline;
/// Conversion of raw captures into processed tables and the run summary.
pub mod process;
/// Status document rendering and section rewriting.
pub mod readme;
/// Scalar values and row records shared by every stage.
pub mod records;
/// HTTP retrieval.
pub mod retrieve;
/// Upstream data sources.
pub mod sources;
/// The timestamped file store and its delimited-text codec.
pub mod store;

pub use configs::{Config, Settings};
pub use error::{PipelineError, Result};
pub use loggers::{DiagnosticSink, MemorySink, TracingSink};
