//! Turning type errors into diagnostics, and rendering them.
//!
//! Every [`TypeError`] maps to a [`Diagnostic`] with a stable code. The
//! terminal rendering goes through ariadne; tooling gets JSON.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use kestrel_common::diagnostic::{Diagnostic, Severity};
use rowan::TextRange;

use crate::error::{InternalError, TypeError};

/// Rendering options.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Emit ANSI colors.
    pub color: bool,
    /// Name shown in the report header.
    pub filename: String,
}

impl RenderConfig {
    /// Colorless output, for deterministic snapshots and logs.
    pub fn colorless(filename: impl Into<String>) -> Self {
        RenderConfig {
            color: false,
            filename: filename.into(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig::colorless("<input>")
    }
}

// ── Error Codes ────────────────────────────────────────────────────────

/// The stable code of each error kind.
pub fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::Undefined { .. } => "E0001",
        TypeError::NoType { .. } => "E0002",
        TypeError::UnknownBuiltIn { .. } => "E0003",
        TypeError::BlockBuiltInArgs { .. } => "E0004",
        TypeError::BuiltInFailed { .. } => "E0005",
        TypeError::Args { .. } => "E0006",
        TypeError::NotAFunction { .. } => "E0007",
        TypeError::ExpectedOneArgument { .. } => "E0008",
        TypeError::IndexNotI32 { .. } => "E0009",
        TypeError::NotIndexable { .. } => "E0010",
        TypeError::ExpectedIntegerLiteral { .. } | TypeError::IndexOutOfRange { .. } => "E0011",
        TypeError::SlicesNotImplemented { .. } => "E0012",
        TypeError::ArraySizeUnknown { .. }
        | TypeError::ArraySizeNotInteger { .. }
        | TypeError::ArraySizeOutOfRange { .. } => "E0013",
        TypeError::IntegerOutOfRange { .. } => "E0014",
        TypeError::ExpectedType { .. } | TypeError::ExpectedExpression { .. } => "E0015",
        TypeError::OperatorUndefined { .. } => "E0016",
        TypeError::OperandMismatch { .. }
        | TypeError::ElementMismatch { .. }
        | TypeError::BranchMismatch { .. }
        | TypeError::Mismatch { .. } => "E0017",
        TypeError::NotAReference { .. } => "E0018",
        TypeError::ConditionNotBool { .. } => "E0019",
        TypeError::WhileBodyNotUnit { .. } => "E0020",
        TypeError::MissingTypeOrValue { .. } => "E0021",
        TypeError::NotConstant { .. } => "E0022",
        TypeError::Redeclared { .. } | TypeError::PreviousDeclaration { .. } => "E0023",
        TypeError::DuplicateField { .. } | TypeError::DuplicateVariant { .. } => "E0024",
        TypeError::NoMember { .. } => "E0025",
        TypeError::UnknownModule { .. } => "E0026",
        TypeError::ImportCycle { .. } => "E0027",
    }
}

pub fn to_diagnostic(err: &TypeError) -> Diagnostic {
    let severity = if err.is_note() {
        Severity::Note
    } else {
        Severity::Error
    };
    Diagnostic::new(severity, err.to_string(), err.range()).with_code(error_code(err))
}

/// An internal error as a diagnostic. It has no meaningful location, so it
/// points at the start of the file.
pub fn internal_diagnostic(err: &InternalError) -> Diagnostic {
    Diagnostic::new(
        Severity::InternalError,
        err.to_string(),
        TextRange::empty(0.into()),
    )
}

// ── Rendering ──────────────────────────────────────────────────────────

fn text_range_to_range(range: TextRange) -> Range<usize> {
    let start: usize = range.start().into();
    let end: usize = range.end().into();
    start..end
}

/// The report kind for a severity. Custom kinds always carry their color,
/// so colorless output falls back to ariadne's built-in kinds, whose colors
/// follow `Config::with_color`.
fn report_kind(severity: Severity, color: bool) -> ReportKind<'static> {
    match (severity, color) {
        (Severity::Error, _) => ReportKind::Error,
        (Severity::Warning, _) => ReportKind::Warning,
        (Severity::Note, true) => ReportKind::Custom("note", Color::Blue),
        (Severity::Hint, true) => ReportKind::Custom("hint", Color::Cyan),
        (Severity::InternalError, true) => ReportKind::Custom("internal error", Color::Magenta),
        (Severity::Note | Severity::Hint, false) => ReportKind::Advice,
        (Severity::InternalError, false) => ReportKind::Error,
    }
}

/// Render one diagnostic against the source text it refers to.
pub fn render_diagnostic(diag: &Diagnostic, source: &str, config: &RenderConfig) -> String {
    let source_len = source.len();

    // ariadne needs a non-empty span inside the source.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };

    let filename = config.filename.as_str();
    let span = clamp(text_range_to_range(diag.range));
    let color = if diag.severity.is_error() {
        Color::Red
    } else {
        Color::Blue
    };

    let mut builder = Report::build(
        report_kind(diag.severity, config.color),
        (filename, span.clone()),
    )
    // The config must be set before labels are added for their colors to
    // follow it.
    .with_config(Config::default().with_color(config.color))
    .with_message(&diag.message)
    .with_label(
        Label::new((filename, span))
            .with_message(&diag.message)
            .with_color(color),
    );
    if let Some(code) = diag.code {
        builder = builder.with_code(code);
    }

    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = builder
        .finish()
        .write((filename, Source::from(source)), &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Render every diagnostic, separated the way a terminal shows them.
pub fn render_all(diags: &[Diagnostic], source: &str, config: &RenderConfig) -> String {
    diags
        .iter()
        .map(|d| render_diagnostic(d, source, config))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Diagnostics as a JSON array, for editors and other tools.
pub fn render_json(diags: &[Diagnostic]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(diags)
}
