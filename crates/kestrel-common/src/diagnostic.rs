//! The diagnostic side channel.
//!
//! Checking never aborts on a user mistake. Instead every problem becomes a
//! [`Diagnostic`] carrying a [`Severity`], a message and the source range it
//! refers to. Rendering is left to the consumer (terminal, JSON, LSP).

use std::fmt;

use rowan::TextRange;
use serde::{Serialize, Serializer};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Note,
    Hint,
    Warning,
    Error,
    /// A bug in the compiler or in one of its collaborators.
    InternalError,
}

impl Severity {
    /// Lowercase label used as the diagnostic prefix, e.g. `error:`.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::InternalError => "internal error",
        }
    }

    /// Whether a diagnostic of this severity fails the compilation.
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error | Severity::InternalError)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable error code, e.g. `E0004`.
    pub code: Option<&'static str>,
    pub message: String,
    #[serde(serialize_with = "serialize_range")]
    pub range: TextRange,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, range: TextRange) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            range,
        }
    }

    pub fn error(message: impl Into<String>, range: TextRange) -> Self {
        Self::new(Severity::Error, message, range)
    }

    pub fn note(message: impl Into<String>, range: TextRange) -> Self {
        Self::new(Severity::Note, message, range)
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{}[{}]: {}", self.severity, code, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

#[derive(Serialize)]
struct RangeRepr {
    start: u32,
    end: u32,
}

fn serialize_range<S: Serializer>(range: &TextRange, serializer: S) -> Result<S::Ok, S::Error> {
    RangeRepr {
        start: range.start().into(),
        end: range.end().into(),
    }
    .serialize(serializer)
}

/// Whether any diagnostic in `diagnostics` fails the compilation.
pub fn has_errors<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) -> bool {
    diagnostics.into_iter().any(|d| d.severity.is_error())
}
