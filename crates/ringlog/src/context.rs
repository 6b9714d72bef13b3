//! Process-scope identity, constructed once at startup and threaded
//! explicitly through every sink/source factory — replacing the source's
//! package-level mutable `serviceName`/`serviceInstance` globals.

use std::sync::Arc;

#[derive(Debug)]
struct ContextInner {
    service: String,
    instance: String,
}

/// Cheaply cloneable process identity attached to every [`crate::LogRecord`]
/// built through a [`crate::Source`].
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Builds a context. Surrounding whitespace is trimmed; an empty value
    /// after trimming falls back to `"undefined"`, matching the source's
    /// behavior for unset service identity.
    pub fn new(service: impl AsRef<str>, instance: impl AsRef<str>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                service: normalize(service.as_ref()),
                instance: normalize(instance.as_ref()),
            }),
        }
    }

    pub fn service(&self) -> &str {
        &self.inner.service
    }

    pub fn instance(&self) -> &str {
        &self.inner.instance
    }
}

fn normalize(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        "undefined".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_identity_falls_back_to_undefined() {
        let ctx = Context::new("   ", "");
        assert_eq!(ctx.service(), "undefined");
        assert_eq!(ctx.instance(), "undefined");
    }

    #[test]
    fn identity_is_trimmed() {
        let ctx = Context::new("  files  ", " 1 ");
        assert_eq!(ctx.service(), "files");
        assert_eq!(ctx.instance(), "1");
    }
}
