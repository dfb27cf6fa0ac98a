/// Defines the data structure for buffered log records.
pub mod logrecord;
/// The diagnostic sink every stage receives instead of touching global state.
pub mod sink;
/// Installs the `tracing` subscriber (console plus rolling JSON file).
pub mod subscriber;

pub use logrecord::LogRecord;
pub use sink::{DiagnosticSink, MemorySink, TracingSink};
pub use subscriber::setup_logging;
