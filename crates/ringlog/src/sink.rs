//! The [`Sink`] trait and the two synchronous auxiliary sinks (stdout and
//! stderr).

use crate::level::{passes_level_gate, Level};
use crate::record::LogRecord;
use std::sync::Arc;

/// Something that can receive a [`LogRecord`].
///
/// `log` is the public entrypoint: it applies level gating and, for
/// critical levels, terminates the process after dispatch. `write` is the
/// side-effect-free primitive used for fan-out — when one sink forwards a
/// record to another, it calls the other's `write`, never its `log`, so
/// fan-out can never re-trigger gating or critical handling.
pub trait Sink: Send + Sync {
    fn log(&self, record: &LogRecord);
    fn write(&self, record: &LogRecord);
}

impl<T: Sink + ?Sized> Sink for Arc<T> {
    fn log(&self, record: &LogRecord) {
        (**self).log(record);
    }
    fn write(&self, record: &LogRecord) {
        (**self).write(record);
    }
}

const WELL_KNOWN_META_KEYS: [&str; 5] = ["addr", "method", "path", "user_agent", "request_id"];

/// Extracts the well-known string-valued meta keys, in fixed order, joined
/// by single spaces and wrapped in `" (...)"`. Empty if none are present.
pub(crate) fn meta_suffix(meta: &Option<crate::record::Meta>) -> String {
    let Some(meta) = meta else {
        return String::new();
    };
    let parts: Vec<&str> = WELL_KNOWN_META_KEYS
        .iter()
        .filter_map(|key| meta.get(*key).and_then(|v| v.as_str()))
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(" "))
    }
}

/// Terminates the process for a critical-level record. Must only be called
/// for `level >= Level::Fatal`.
pub(crate) fn handle_critical(record: &LogRecord) -> ! {
    match record.raw_level {
        Level::Panic => panic!(
            "{}\n{}",
            record.message,
            record.error.as_deref().unwrap_or_default()
        ),
        _ => std::process::exit(1),
    }
}

fn format_line(record: &LogRecord) -> String {
    let mut line = format!(
        "[{}: {}] {}",
        record.source.as_deref().unwrap_or(""),
        record.level,
        record.message
    );
    if record.raw_level >= Level::Error {
        line.push_str(&format!(": {}", record.error.as_deref().unwrap_or("")));
    }
    line.push_str(&meta_suffix(&record.meta));
    line
}

/// Synchronous stdout sink. Colorizes the level by ANSI escape, varying by
/// severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write(&self, record: &LogRecord) {
        let colored_level = format!(
            "\x1b[{}m{}\x1b[0m",
            record.raw_level.ansi_color(),
            record.level
        );
        let mut line = format!(
            "[{}: {}] {}",
            record.source.as_deref().unwrap_or(""),
            colored_level,
            record.message
        );
        if record.raw_level >= Level::Error {
            line.push_str(&format!(": {}", record.error.as_deref().unwrap_or("")));
        }
        line.push_str(&meta_suffix(&record.meta));
        println!("{line}");
    }

    fn log(&self, record: &LogRecord) {
        if !passes_level_gate(record.raw_level) {
            return;
        }
        self.write(record);
        if record.raw_level >= Level::Fatal {
            handle_critical(record);
        }
    }
}

/// Synchronous stderr sink. Hard-codes red, regardless of level.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl Sink for StderrSink {
    fn write(&self, record: &LogRecord) {
        eprintln!("\x1b[31m{}\x1b[0m", format_line(record));
    }

    fn log(&self, record: &LogRecord) {
        if !passes_level_gate(record.raw_level) {
            return;
        }
        self.write(record);
        if record.raw_level >= Level::Fatal {
            handle_critical(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MetaValue;
    use std::collections::HashMap;

    #[test]
    fn meta_suffix_orders_by_well_known_keys_not_insertion() {
        let mut meta = HashMap::new();
        meta.insert("request_id".to_string(), MetaValue::from("r1"));
        meta.insert("addr".to_string(), MetaValue::from("1.2.3.4"));
        assert_eq!(meta_suffix(&Some(meta)), " (1.2.3.4 r1)");
    }

    #[test]
    fn meta_suffix_is_empty_without_well_known_keys() {
        let mut meta = HashMap::new();
        meta.insert("unrelated".to_string(), MetaValue::from("x"));
        assert_eq!(meta_suffix(&Some(meta)), "");
        assert_eq!(meta_suffix(&None), "");
    }
}
