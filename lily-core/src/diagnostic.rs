//! Diagnostics collected during analysis.
//!
//! Analysis never aborts on the first problem: every error is recorded
//! here, counted, and the pass continues with best-effort types.

use core::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::error::SemaError;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A single structured diagnostic handed to the external reporting layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Taxonomy entry, absent for plain warnings such as naming lints.
    pub kind: Option<SemaError>,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(kind: SemaError, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: kind.to_string(),
            kind: Some(kind),
            span,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            kind: None,
            message: message.into(),
            span,
        }
    }

    pub fn code(&self) -> &'static str {
        match &self.kind {
            Some(kind) => kind.code(),
            None => "lint",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] at {}: {}",
            self.severity,
            self.code(),
            self.span,
            self.message
        )
    }
}

/// Running list of diagnostics with error/warning counters.
///
/// Counters use relaxed atomics so that a parallel driver can share
/// them without stronger ordering.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    errors: AtomicUsize,
    warnings: AtomicUsize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.errors.fetch_add(1, Ordering::Relaxed),
            Severity::Warning => self.warnings.fetch_add(1, Ordering::Relaxed),
        };
        self.items.push(diagnostic);
    }

    pub fn report(&mut self, kind: SemaError, span: Span) {
        tracing::debug!(code = kind.code(), %span, "{kind}");
        self.push(Diagnostic::error(kind, span));
    }

    pub fn warn(&mut self, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::warning(message, span));
    }

    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Errors whose taxonomy entry matches `pred`, in report order.
    pub fn errors_matching<'a>(
        &'a self,
        pred: impl Fn(&SemaError) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.items
            .iter()
            .filter(move |d| d.kind.as_ref().is_some_and(&pred))
    }
}
