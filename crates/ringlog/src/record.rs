//! The immutable [`LogRecord`] value and its JSON wire schema.

use crate::level::Level;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// A typed metadata value. Metadata keys map to one of these rather than an
/// arbitrary JSON value, so a malformed meta entry is caught at the call
/// site instead of surfacing only once serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl MetaValue {
    pub(crate) fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Str(s)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

/// String-keyed metadata attached to a [`LogRecord`]. Insertion order is
/// irrelevant to callers; iteration order when rendering an auxiliary-sink
/// suffix instead follows a fixed well-known-key list (see `sink.rs`).
pub type Meta = HashMap<String, MetaValue>;

/// An immutable record produced by one logging call. Ownership passes from
/// the call site into the ring buffer (or fallback queue) and from there to
/// whatever consumes it; nothing mutates a record after construction.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub instance: String,
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "msg")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    /// Not part of the wire schema; kept for level-gated dispatch after the
    /// record has already been built.
    #[serde(skip)]
    pub raw_level: Level,
}

impl LogRecord {
    /// Builds a record. `error` is only retained for `level >= Error` —
    /// lower-severity calls must not carry an error payload, per the
    /// component contract.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        level: Level,
        service: impl Into<String>,
        instance: impl Into<String>,
        source: impl Into<String>,
        message: impl Into<String>,
        error: Option<String>,
        meta: Option<Meta>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            service: service.into(),
            instance: instance.into(),
            level: level.as_str().to_string(),
            source: Some(source.into()),
            message: message.into(),
            error: if level >= Level::Error { error } else { None },
            meta,
            raw_level: level,
        }
    }
}
