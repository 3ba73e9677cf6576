//! Structured compile diagnostics
//!
//! Malformed filter input degrades to an empty fragment instead of aborting
//! the statement. Each degradation is recorded here and returned alongside
//! the compiled SQL, so callers and tests can observe exactly what was
//! dropped; every record is also mirrored to `tracing` at warn level.

use serde::Serialize;
use std::fmt;

/// One degraded-compile event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Diagnostic {
    /// A filter key failed the identifier-safety pattern and was skipped
    UnsafeKey { key: String },
    /// A filter value carried an unrecognized operator encoding
    MalformedPredicate { key: String, detail: String },
    /// An unrecognized `_`-prefixed condition key
    UnknownSpecialKey { key: String },
    /// A non-scalar value was dropped from a SET/VALUES list
    SkippedValue { key: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnsafeKey { key } => write!(f, "{} is not safe", key),
            Diagnostic::MalformedPredicate { key, detail } => {
                write!(f, "malformed predicate for `{}`: {}", key, detail)
            }
            Diagnostic::UnknownSpecialKey { key } => {
                write!(f, "unknown special condition key `{}`", key)
            }
            Diagnostic::SkippedValue { key } => {
                write!(f, "non-scalar value for `{}` skipped", key)
            }
        }
    }
}

/// Record a diagnostic: push to the per-compile sink and mirror to tracing.
pub(crate) fn record(sink: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    tracing::warn!("{}", diagnostic);
    sink.push(diagnostic);
}
