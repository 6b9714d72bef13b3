//! [`Source`] binds a tag, a [`Sink`], and a [`Context`] into the call-site
//! API (`trace`, `debug`, `info`, `warning`, `error`, `fatal`, `panic`).

use crate::context::Context;
use crate::level::Level;
use crate::record::{LogRecord, Meta};
use crate::sink::Sink;

/// A named emitter bound to one sink. Cloning a `Source<S>` requires `S:
/// Clone`; sinks that are shared (like a pooled `FileSink`) are typically
/// wrapped in an `Arc` first.
#[derive(Debug, Clone)]
pub struct Source<S: Sink> {
    tag: String,
    sink: S,
    ctx: Context,
}

impl<S: Sink> Source<S> {
    pub fn new(tag: impl Into<String>, sink: S, ctx: Context) -> Self {
        Self {
            tag: tag.into(),
            sink,
            ctx,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn build(&self, level: Level, message: String, error: Option<String>, meta: Option<Meta>) -> LogRecord {
        LogRecord::new(
            level,
            self.ctx.service(),
            self.ctx.instance(),
            self.tag.clone(),
            message,
            error,
            meta,
        )
    }

    pub fn trace(&self, message: impl Into<String>, meta: Option<Meta>) {
        self.sink.log(&self.build(Level::Trace, message.into(), None, meta));
    }

    pub fn debug(&self, message: impl Into<String>, meta: Option<Meta>) {
        self.sink.log(&self.build(Level::Debug, message.into(), None, meta));
    }

    pub fn info(&self, message: impl Into<String>, meta: Option<Meta>) {
        self.sink.log(&self.build(Level::Info, message.into(), None, meta));
    }

    pub fn warning(&self, message: impl Into<String>, meta: Option<Meta>) {
        self.sink
            .log(&self.build(Level::Warning, message.into(), None, meta));
    }

    pub fn error(&self, message: impl Into<String>, err: impl std::fmt::Display, meta: Option<Meta>) {
        self.sink.log(&self.build(
            Level::Error,
            message.into(),
            Some(err.to_string()),
            meta,
        ));
    }

    pub fn fatal(&self, message: impl Into<String>, err: impl std::fmt::Display, meta: Option<Meta>) {
        self.sink.log(&self.build(
            Level::Fatal,
            message.into(),
            Some(err.to_string()),
            meta,
        ));
    }

    pub fn panic(&self, message: impl Into<String>, err: impl std::fmt::Display, meta: Option<Meta>) {
        self.sink.log(&self.build(
            Level::Panic,
            message.into(),
            Some(err.to_string()),
            meta,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::StdoutSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CountingSink(Arc<AtomicUsize>);

    impl Sink for CountingSink {
        fn write(&self, _record: &LogRecord) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn log(&self, record: &LogRecord) {
            if crate::level::passes_level_gate(record.raw_level) {
                self.write(record);
            }
        }
    }

    #[test]
    fn info_call_reaches_sink_when_gate_open() {
        crate::level::set_debug(true);
        let counter = CountingSink::default();
        let src = Source::new("TEST", counter.clone(), Context::new("svc", "1"));
        src.info("hello", None);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stdout_source_builds_without_panicking() {
        let src = Source::new("TEST", StdoutSink, Context::new("svc", "1"));
        src.info("hello", None);
        src.warning("careful", None);
    }
}
