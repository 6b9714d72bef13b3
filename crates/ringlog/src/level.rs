//! Strictly ordered log levels and the global, hot-path gate flags.

use std::sync::atomic::{AtomicBool, Ordering};

/// Strictly ordered log severity. `Fatal` and `Panic` are "critical": after
/// dispatch, the calling thread terminates the process or panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
    Panic,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Panic => "PANIC",
        }
    }

    /// ANSI SGR color code used by the colorized stdout sink.
    pub(crate) fn ansi_color(self) -> &'static str {
        match self {
            Level::Trace => "90",   // bright black
            Level::Debug => "36",   // cyan
            Level::Info => "32",    // green
            Level::Warning => "33", // yellow
            Level::Error => "31",   // red
            Level::Fatal => "35",   // magenta
            Level::Panic => "41",   // red background
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static TRACE_ENABLED: AtomicBool = AtomicBool::new(false);

/// Sets the global `Debug` gate.
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Release);
}

pub fn debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Acquire)
}

/// Sets the global `Trace` gate.
pub fn set_trace(enabled: bool) {
    TRACE_ENABLED.store(enabled, Ordering::Release);
}

pub fn trace_enabled() -> bool {
    TRACE_ENABLED.load(Ordering::Acquire)
}

/// Whether a record at `level` is admitted given the current gate state.
/// Only `Debug` and `Trace` are ever gated; every other level always passes.
pub fn passes_level_gate(level: Level) -> bool {
    match level {
        Level::Debug => debug_enabled(),
        Level::Trace => trace_enabled(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_strictly_ordered() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Fatal);
        assert!(Level::Fatal < Level::Panic);
    }

    #[test]
    fn only_debug_and_trace_are_gated() {
        set_debug(false);
        set_trace(false);
        assert!(!passes_level_gate(Level::Debug));
        assert!(!passes_level_gate(Level::Trace));
        assert!(passes_level_gate(Level::Info));
        assert!(passes_level_gate(Level::Error));
        set_debug(true);
        assert!(passes_level_gate(Level::Debug));
        set_debug(false);
    }
}
