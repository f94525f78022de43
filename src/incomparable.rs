//! The comparability boundary.
//!
//! [`Incomparable`] boxes an error so it can be stored or passed around
//! without anyone comparing it by value. It implements neither `PartialEq`
//! nor `Eq`; identity is asked for explicitly through
//! [`Incomparable::same_identity_as`] or [`is`](crate::chain::is), both of
//! which see through the box.
//!
//! ```compile_fail
//! use std::io;
//! let a = errdata::make_incomparable(io::Error::new(io::ErrorKind::Other, "x"));
//! let b = a.clone();
//! let _ = a == b;
//! ```

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::annotated::{AnyError, IntoCause};

/// An error that forwards its message and source to the error it boxes.
///
/// Boxing is idempotent: the boxed error is never itself an `Incomparable`.
#[derive(Clone)]
pub struct Incomparable {
    inner: AnyError,
}

impl Incomparable {
    /// The boxed error.
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.inner
    }

    pub fn into_inner(self) -> AnyError {
        self.inner
    }

    /// Whether `other`, unboxed, is the very error held by this box.
    pub fn same_identity_as(&self, other: &(dyn Error + 'static)) -> bool {
        same_identity(self.inner(), other)
    }
}

/// Boxes `err`, collapsing an existing box instead of nesting it.
pub fn make_incomparable(err: impl IntoCause) -> Incomparable {
    let err = err.into_cause();
    match err.downcast_ref::<Incomparable>() {
        Some(boxed) => boxed.clone(),
        None => Incomparable { inner: err },
    }
}

/// The error inside an [`Incomparable`] box, or `err` itself.
pub fn unbox<'a>(err: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    if let Some(boxed) = err.downcast_ref::<Incomparable>() {
        let inner: &'a (dyn Error + Send + Sync + 'static) = &*boxed.inner;
        return inner;
    }
    err
}

/// Whether `a` and `b` are the same error value once unboxed.
pub fn same_identity(a: &(dyn Error + 'static), b: &(dyn Error + 'static)) -> bool {
    let a = unbox(a) as *const dyn Error as *const ();
    let b = unbox(b) as *const dyn Error as *const ();
    std::ptr::eq(a, b)
}

impl fmt::Display for Incomparable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl fmt::Debug for Incomparable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Incomparable").field(&self.inner).finish()
    }
}

impl Error for Incomparable {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source()
    }
}

impl From<Incomparable> for AnyError {
    fn from(boxed: Incomparable) -> Self {
        Arc::new(boxed)
    }
}
