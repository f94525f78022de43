//! errdata Error Handling
//!
//! Two families of failures live here:
//! - [`TemplateError`]: problems found while parsing or validating a format
//!   string. Carries the format string and a span so `miette` can point at
//!   the offending directive.
//! - [`DataError`]: the umbrella returned by every fallible operation of the
//!   crate (template problems, projection failures, merge conflicts).
//!
//! Usage errors (bad flags, malformed record schemas, odd key/value lists)
//! are not represented here. They are programmer bugs and panic.

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::value::{Value, ValueKind};

// ============================================================================
// SPANS
// ============================================================================

/// Byte range inside a format string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn join(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::from(span.start..span.end)
    }
}

// ============================================================================
// TEMPLATE ERRORS
// ============================================================================

/// The check that produced a [`TemplateError`].
///
/// Stages escalate: a template that passes `OwnParameters` has also passed
/// `Syntax` and `Parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Syntax,
    OwnParameters,
    PassedParameters,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Stage::Parse => "parse error",
            Stage::Syntax => "syntax error",
            Stage::OwnParameters => "own-parameter error",
            Stage::PassedParameters => "passed-parameter error",
        };
        f.write_str(text)
    }
}

/// What went wrong in a format string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateErrorKind {
    // Parse errors - structure of the token stream
    #[error("unexpected '{{' outside of a directive")]
    UnexpectedOpenBrace,
    #[error("unmatched '}}'")]
    UnmatchedCloseBrace,
    #[error("missing closing '}}' for a conditional")]
    MissingCloseBrace,
    #[error("expected a format verb or '{{' after '{directive}', found {found}")]
    ExpectedVerb { directive: char, found: String },
    #[error("expected a condition after '{directive}!', found {found}")]
    ExpectedCondition { directive: char, found: String },
    #[error("expected '{{' after the {after}, found {found}")]
    ExpectedOpenBrace { after: &'static str, found: String },
    #[error("expected a field name, found {found}")]
    ExpectedFieldName { found: String },
    #[error("expected '}}' after the field name, found {found}")]
    ExpectedCloseBrace { found: String },

    // Syntax errors - content of directives
    #[error("format verb '{verb}' must not contain '%'")]
    VerbContainsPercent { verb: String },
    #[error("'{name}' is not a valid field name")]
    InvalidFieldName { name: String },
    #[error("unknown condition '{condition}'")]
    UnknownCondition { condition: String },

    // Parameter errors
    #[error("field '{name}' is not among the error's own parameters")]
    MissingOwnField { name: String },
    #[error("'%w' is used but the error wraps no cause")]
    WrapWithoutCause,
    #[error("field '{name}' is not among the passed parameters")]
    MissingPassedField { name: String },
    #[error("'$w' is used but the cause does not support interpolation")]
    CauseNotInterpolatable,
}

impl TemplateErrorKind {
    pub fn stage(&self) -> Stage {
        use TemplateErrorKind::*;
        match self {
            UnexpectedOpenBrace
            | UnmatchedCloseBrace
            | MissingCloseBrace
            | ExpectedVerb { .. }
            | ExpectedCondition { .. }
            | ExpectedOpenBrace { .. }
            | ExpectedFieldName { .. }
            | ExpectedCloseBrace { .. } => Stage::Parse,

            VerbContainsPercent { .. } | InvalidFieldName { .. } | UnknownCondition { .. } => {
                Stage::Syntax
            }

            MissingOwnField { .. } | WrapWithoutCause => Stage::OwnParameters,

            MissingPassedField { .. } | CauseNotInterpolatable => Stage::PassedParameters,
        }
    }

    /// Suffix of the diagnostic code, `errdata::template::<suffix>`.
    pub const fn code_suffix(&self) -> &'static str {
        use TemplateErrorKind::*;
        match self {
            UnexpectedOpenBrace => "unexpected_open_brace",
            UnmatchedCloseBrace => "unmatched_close_brace",
            MissingCloseBrace => "missing_close_brace",
            ExpectedVerb { .. } => "expected_verb",
            ExpectedCondition { .. } => "expected_condition",
            ExpectedOpenBrace { .. } => "expected_open_brace",
            ExpectedFieldName { .. } => "expected_field_name",
            ExpectedCloseBrace { .. } => "expected_close_brace",
            VerbContainsPercent { .. } => "verb_contains_percent",
            InvalidFieldName { .. } => "invalid_field_name",
            UnknownCondition { .. } => "unknown_condition",
            MissingOwnField { .. } => "missing_own_field",
            WrapWithoutCause => "wrap_without_cause",
            MissingPassedField { .. } => "missing_passed_field",
            CauseNotInterpolatable => "cause_not_interpolatable",
        }
    }

    fn label(&self) -> &'static str {
        match self.stage() {
            Stage::Parse => "malformed here",
            Stage::Syntax => "invalid directive",
            Stage::OwnParameters | Stage::PassedParameters => "cannot be resolved",
        }
    }

    fn help(&self) -> Option<&'static str> {
        use TemplateErrorKind::*;
        match self {
            UnexpectedOpenBrace | UnmatchedCloseBrace => {
                Some("escape literal braces as '\\{' and '\\}'")
            }
            ExpectedVerb { .. } => Some("write '%%' or '\\%' for a literal percent sign"),
            InvalidFieldName { .. } => Some(
                "field names start with a letter and continue with letters, digits or '_'; \
                 'm', 'map', 'params' and 'parameters' select the whole map",
            ),
            UnknownCondition { .. } => {
                Some("conditions are 'm=0', 'm>0', 'EmptyMap' or 'NonEmptyMap'")
            }
            CauseNotInterpolatable => Some("use '%w' to include the cause's plain message"),
            _ => None,
        }
    }
}

/// A problem in a format string, located by byte span.
#[derive(Debug, Clone)]
pub struct TemplateError {
    kind: TemplateErrorKind,
    format: Arc<str>,
    src: Arc<NamedSource<String>>,
    span: Span,
}

impl TemplateError {
    pub(crate) fn new(kind: TemplateErrorKind, format: &str, span: Span) -> Self {
        Self {
            kind,
            format: Arc::from(format),
            src: Arc::new(NamedSource::new("format string", format.to_string())),
            span,
        }
    }

    pub fn kind(&self) -> &TemplateErrorKind {
        &self.kind
    }

    pub fn stage(&self) -> Stage {
        self.kind.stage()
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The format string the error refers to.
    pub fn format_string(&self) -> &str {
        &self.format
    }
}

impl PartialEq for TemplateError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.span == other.span && self.format == other.format
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template {}: {}", self.stage(), self.kind)
    }
}

impl std::error::Error for TemplateError {}

impl Diagnostic for TemplateError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!(
            "errdata::template::{}",
            self.kind.code_suffix()
        )))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.kind.label().to_string()),
            SourceSpan::from(self.span),
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.src)
    }
}

// ============================================================================
// DATA ERRORS
// ============================================================================

/// Failure of a fallible errdata operation.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum DataError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error("field '{name}' ({expected}) is not present in the error's data")]
    #[diagnostic(
        code(errdata::data::missing_field),
        help("attach the field when building the error, or project with Flag::MissingDataAsZero")
    )]
    MissingField { name: String, expected: ValueKind },

    #[error("field '{name}' holds a {found} value where {expected} is required")]
    #[diagnostic(code(errdata::data::type_mismatch))]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("conflicting values for '{name}': {existing} from the cause, {incoming} from the new data")]
    #[diagnostic(
        code(errdata::data::merge_conflict),
        help("pass Flag::PreferPreviousData or Flag::ReplacePreviousData to resolve conflicts")
    )]
    MergeConflict {
        name: String,
        existing: Value,
        incoming: Value,
    },
}

impl DataError {
    /// The template error, if this failure came from a format string.
    pub fn as_template_error(&self) -> Option<&TemplateError> {
        match self {
            DataError::Template(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_is_derived_from_kind() {
        assert_eq!(TemplateErrorKind::UnmatchedCloseBrace.stage(), Stage::Parse);
        assert_eq!(
            TemplateErrorKind::UnknownCondition {
                condition: "x".into()
            }
            .stage(),
            Stage::Syntax
        );
        assert_eq!(
            TemplateErrorKind::WrapWithoutCause.stage(),
            Stage::OwnParameters
        );
        assert_eq!(
            TemplateErrorKind::CauseNotInterpolatable.stage(),
            Stage::PassedParameters
        );
    }

    #[test]
    fn template_error_reports_code_and_label() {
        let err = TemplateError::new(TemplateErrorKind::UnmatchedCloseBrace, "a}b", Span::new(1, 2));
        assert_eq!(err.to_string(), "template parse error: unmatched '}'");
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("errdata::template::unmatched_close_brace"));
        let labels: Vec<_> = err.labels().into_iter().flatten().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].offset(), 1);
        assert_eq!(err.format_string(), "a}b");
    }

    #[test]
    fn data_error_wraps_template_error_transparently() {
        let err = TemplateError::new(TemplateErrorKind::WrapWithoutCause, "%w", Span::new(0, 2));
        let data: DataError = err.clone().into();
        assert_eq!(data.to_string(), err.to_string());
        assert_eq!(data.as_template_error(), Some(&err));
    }
}
