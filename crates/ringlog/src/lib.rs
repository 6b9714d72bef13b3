//! Asynchronous JSON logging pipeline built on [`ringcore`]'s ring buffer
//! and worker pool: a lock-free primary path with a queued fallback,
//! synchronous auxiliary sinks, and graceful, timeout-bounded shutdown.

mod context;
mod error;
mod file_sink;
mod level;
mod path;
mod record;
mod sink;
mod source;

pub use context::Context;
pub use error::FileSinkError;
pub use file_sink::FileSink;
pub use level::{debug_enabled, set_debug, set_trace, trace_enabled, Level};
pub use path::{validate_path, PathError};
pub use record::{LogRecord, Meta, MetaValue};
pub use sink::{Sink, StderrSink, StdoutSink};
pub use source::Source;
