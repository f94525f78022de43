//! Errors that carry data.
//!
//! [`AnnotatedError`] is the concrete error type placed in cause chains: a
//! parameter map, a parsed message template and an optional cause. Its
//! message is rendered from the template on every `Display`.
//!
//! [`ErrorWithData<T>`] is the typed handle returned by the constructors. It
//! shares the `AnnotatedError` and additionally holds the record `T`
//! projected from the error's parameters at construction time. Converting
//! it into an [`AnyError`] keeps the same allocation, so identity checks and
//! downcasts see the `AnnotatedError` itself.

use std::error::Error;
use std::fmt;
use std::io;
use std::ops::Deref;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::chain::data_link;
use crate::errors::{DataError, TemplateError};
use crate::flags::{merge_policy, Flag, MissingData};
use crate::incomparable::{make_incomparable, unbox, Incomparable};
use crate::params::ParamMap;
use crate::record::{check_schema, Record};
use crate::template::Template;

/// A shared, type-erased error, as stored in cause chains.
pub type AnyError = Arc<dyn Error + Send + Sync + 'static>;

// ============================================================================
// INTERPOLATION CAPABILITY
// ============================================================================

/// An error that can render its message against parameters passed down by
/// the error that wraps it. This is what `$w` requires of a cause.
pub trait Interpolate {
    fn interpolate(&self, passed: &ParamMap) -> String;
}

/// The interpolation capability of `err`, looking through an
/// [`Incomparable`] box.
pub fn as_interpolate<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a dyn Interpolate> {
    unbox(err)
        .downcast_ref::<AnnotatedError>()
        .map(|annotated| annotated as &dyn Interpolate)
}

// ============================================================================
// CAUSES
// ============================================================================

/// Values accepted as the cause of a new error.
pub trait IntoCause {
    fn into_cause(self) -> AnyError;
}

impl IntoCause for AnyError {
    fn into_cause(self) -> AnyError {
        self
    }
}

impl IntoCause for &AnyError {
    fn into_cause(self) -> AnyError {
        Arc::clone(self)
    }
}

impl<T> IntoCause for ErrorWithData<T> {
    fn into_cause(self) -> AnyError {
        self.inner
    }
}

impl<T> IntoCause for &ErrorWithData<T> {
    fn into_cause(self) -> AnyError {
        Arc::clone(&self.inner) as AnyError
    }
}

impl IntoCause for AnnotatedError {
    fn into_cause(self) -> AnyError {
        Arc::new(self)
    }
}

impl IntoCause for Incomparable {
    fn into_cause(self) -> AnyError {
        Arc::new(self)
    }
}

impl IntoCause for io::Error {
    fn into_cause(self) -> AnyError {
        Arc::new(self)
    }
}

impl IntoCause for Box<dyn Error + Send + Sync> {
    fn into_cause(self) -> AnyError {
        Arc::from(self)
    }
}

/// Converts `err` into a shareable cause.
pub fn cause<E: IntoCause>(err: E) -> AnyError {
    err.into_cause()
}

// ============================================================================
// ANNOTATED ERROR
// ============================================================================

/// An error with a parameter map and a templated message.
#[derive(Clone)]
pub struct AnnotatedError {
    params: ParamMap,
    template: Arc<Template>,
    cause: Option<AnyError>,
}

impl AnnotatedError {
    /// The error's own parameters, including those inherited from its cause.
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn format_string(&self) -> &str {
        self.template.format_string()
    }

    pub fn cause(&self) -> Option<&AnyError> {
        self.cause.as_ref()
    }

    /// The parse error of the message template, if it is malformed. The
    /// same problem is also embedded in the rendered message.
    pub fn template_error(&self) -> Option<&TemplateError> {
        self.template.parse_error()
    }

    /// Validates the message template as it would be rendered with `passed`
    /// as the inherited parameters.
    pub fn check_message(&self, passed: &ParamMap) -> Result<(), TemplateError> {
        self.template
            .verify_passed(&self.params, passed, self.cause_ref())
    }

    fn cause_ref(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn Error + 'static))
    }

    pub(crate) fn from_parts(
        cause: Option<AnyError>,
        template: Arc<Template>,
        params: ParamMap,
    ) -> Self {
        Self {
            params,
            template,
            cause,
        }
    }
}

impl Interpolate for AnnotatedError {
    fn interpolate(&self, passed: &ParamMap) -> String {
        self.template.render(&self.params, passed, self.cause_ref())
    }
}

impl fmt::Display for AnnotatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.interpolate(&self.params))
    }
}

impl fmt::Debug for AnnotatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotatedError")
            .field("message", &self.to_string())
            .field("format", &self.format_string())
            .field("params", &self.params)
            .field("cause", &self.cause)
            .finish()
    }
}

impl Error for AnnotatedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause_ref()
    }
}

/// Format used when the caller passes an empty one.
pub(crate) fn default_format(cause: &AnyError) -> &'static str {
    let cause: &(dyn Error + 'static) = &**cause;
    if as_interpolate(cause).is_some() {
        "$w"
    } else {
        "%w"
    }
}

// ============================================================================
// TYPED HANDLE
// ============================================================================

/// An error whose data is guaranteed to populate the record `T`.
///
/// # Examples
///
/// ```rust
/// use errdata::{ErrorWithData, Flag};
///
/// errdata::record! {
///     #[derive(Debug, Clone, PartialEq, Default)]
///     pub struct Shortfall {
///         pub wanted: u32,
///         pub got: u32,
///     }
/// }
///
/// let err = ErrorWithData::new("wanted %d{wanted}, got %d{got}", Shortfall { wanted: 4, got: 1 });
/// assert_eq!(err.to_string(), "wanted 4, got 1");
/// assert_eq!(err.data().got, 1);
///
/// let outer = ErrorWithData::wrap(err, "reading header: %w", (), &[Flag::ReplacePreviousData]);
/// assert_eq!(outer.to_string(), "reading header: wanted 4, got 1");
/// assert_eq!(errdata::get_field(&*outer, "wanted"), Some(4u32.into()));
/// ```
pub struct ErrorWithData<T> {
    inner: Arc<AnnotatedError>,
    data: Arc<T>,
}

/// An error that promises no particular fields.
pub type ErrorWithParams = ErrorWithData<()>;

struct Request<'a> {
    caller: &'static str,
    cause: Option<AnyError>,
    format: &'a str,
    params: ParamMap,
    flags: &'a [Flag],
    /// Template problems are returned instead of logged.
    eager: bool,
}

fn construct<T: Record>(request: Request<'_>) -> Result<ErrorWithData<T>, DataError> {
    let Request {
        caller,
        cause,
        format,
        mut params,
        flags,
        eager,
    } = request;

    check_schema::<T>(caller);
    let policy = merge_policy(caller, flags);

    let format = match (format.is_empty(), &cause) {
        (true, None) => panic!("{caller}: an empty format string requires a cause"),
        (true, Some(cause)) => default_format(cause),
        (false, _) => format,
    };

    if let Some(previous) = cause.as_deref().and_then(|c| data_link(c)) {
        params.merge_previous(previous.params(), policy)?;
    }

    let template = Template::cached(format);
    let cause_ref = cause.as_deref().map(|c| c as &(dyn Error + 'static));
    if let Err(err) = template.verify_own(&params, cause_ref) {
        if eager {
            return Err(err.into());
        }
        warn!(%caller, error = %err, "error message template will not render cleanly");
    }

    let data = T::from_params(&params, MissingData::IsError)?;
    debug!(%caller, fields = params.len(), "constructed annotated error");
    Ok(ErrorWithData {
        inner: Arc::new(AnnotatedError::from_parts(cause, template, params)),
        data: Arc::new(data),
    })
}

fn or_panic<T>(caller: &str, result: Result<T, DataError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{caller}: {err}"),
    }
}

impl<T: Record> ErrorWithData<T> {
    /// Creates an error without a cause.
    ///
    /// # Panics
    ///
    /// Panics if `format` is empty or `T`'s schema is malformed. Template
    /// problems do not panic; they are logged and show up in the message.
    pub fn new(format: &str, data: T) -> Self {
        let request = Request {
            caller: "ErrorWithData::new",
            cause: None,
            format,
            params: data.into_params(),
            flags: &[],
            eager: false,
        };
        or_panic("ErrorWithData::new", construct(request))
    }

    /// Like [`new`](Self::new), but validates the template against the
    /// error's own parameters and returns the first problem.
    pub fn try_new(format: &str, data: T) -> Result<Self, DataError> {
        construct(Request {
            caller: "ErrorWithData::try_new",
            cause: None,
            format,
            params: data.into_params(),
            flags: &[],
            eager: true,
        })
    }

    /// Creates an error wrapping `cause`. The cause's data is merged
    /// underneath `data` according to `flags`. An empty `format` renders
    /// the cause's message.
    ///
    /// # Panics
    ///
    /// Panics on a flag outside [`CONSTRUCT_FLAGS`](crate::flags::CONSTRUCT_FLAGS),
    /// on a merge conflict under [`Flag::ErrorOnConflict`], and when the
    /// merged data no longer populates `T`.
    pub fn wrap(cause: impl IntoCause, format: &str, data: T, flags: &[Flag]) -> Self {
        let request = Request {
            caller: "ErrorWithData::wrap",
            cause: Some(cause.into_cause()),
            format,
            params: data.into_params(),
            flags,
            eager: false,
        };
        or_panic("ErrorWithData::wrap", construct(request))
    }

    pub fn try_wrap(
        cause: impl IntoCause,
        format: &str,
        data: T,
        flags: &[Flag],
    ) -> Result<Self, DataError> {
        construct(Request {
            caller: "ErrorWithData::try_wrap",
            cause: Some(cause.into_cause()),
            format,
            params: data.into_params(),
            flags,
            eager: true,
        })
    }
}

impl ErrorWithParams {
    /// Creates an untyped error from a parameter map.
    pub fn with_params(format: &str, params: ParamMap) -> Self {
        let request = Request {
            caller: "ErrorWithParams::with_params",
            cause: None,
            format,
            params,
            flags: &[],
            eager: false,
        };
        or_panic("ErrorWithParams::with_params", construct(request))
    }

    pub fn try_with_params(format: &str, params: ParamMap) -> Result<Self, DataError> {
        construct(Request {
            caller: "ErrorWithParams::try_with_params",
            cause: None,
            format,
            params,
            flags: &[],
            eager: true,
        })
    }

    /// Creates an untyped error wrapping `cause`.
    pub fn wrap_with_params(
        cause: impl IntoCause,
        format: &str,
        params: ParamMap,
        flags: &[Flag],
    ) -> Self {
        let request = Request {
            caller: "ErrorWithParams::wrap_with_params",
            cause: Some(cause.into_cause()),
            format,
            params,
            flags,
            eager: false,
        };
        or_panic("ErrorWithParams::wrap_with_params", construct(request))
    }

    pub fn try_wrap_with_params(
        cause: impl IntoCause,
        format: &str,
        params: ParamMap,
        flags: &[Flag],
    ) -> Result<Self, DataError> {
        construct(Request {
            caller: "ErrorWithParams::try_wrap_with_params",
            cause: Some(cause.into_cause()),
            format,
            params,
            flags,
            eager: true,
        })
    }

    /// Wraps an already assembled error without merging or validation.
    pub(crate) fn from_annotated(inner: AnnotatedError) -> Self {
        Self {
            inner: Arc::new(inner),
            data: Arc::new(()),
        }
    }
}

impl<T> ErrorWithData<T> {
    /// The record projected when the error was built.
    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn untyped(&self) -> &AnnotatedError {
        &self.inner
    }

    /// The error as a chain link, for the query functions in
    /// [`chain`](crate::chain).
    pub fn as_error(&self) -> &(dyn Error + 'static) {
        &*self.inner
    }

    pub fn into_error(self) -> AnyError {
        self.inner
    }
}

impl<T> Clone for ErrorWithData<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            data: Arc::clone(&self.data),
        }
    }
}

impl<T> Deref for ErrorWithData<T> {
    type Target = AnnotatedError;

    fn deref(&self) -> &AnnotatedError {
        &self.inner
    }
}

impl<T> fmt::Display for ErrorWithData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl<T> fmt::Debug for ErrorWithData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl<T> From<ErrorWithData<T>> for AnyError {
    fn from(err: ErrorWithData<T>) -> Self {
        err.into_error()
    }
}

/// The box forwards to the shared error, so identity checks still find it.
impl<T> From<ErrorWithData<T>> for Box<dyn Error + Send + Sync> {
    fn from(err: ErrorWithData<T>) -> Self {
        Box::new(make_incomparable(err))
    }
}
