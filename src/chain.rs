//! Queries and modifications over a cause chain.
//!
//! A chain is an error followed by its `source()` links. Links boxed in an
//! [`Incomparable`](crate::Incomparable) are looked through. The first
//! [`AnnotatedError`] in the chain is the *data link*: because every
//! annotated error merges its cause's data underneath its own, the data link
//! holds the complete parameter view of the chain.
//!
//! Functions that "modify" an error never touch it; they return a new error
//! wrapping the original.

use std::error::Error;
use std::iter;

use tracing::debug;

use crate::annotated::{
    default_format, AnnotatedError, ErrorWithData, ErrorWithParams, IntoCause,
};
use crate::errors::DataError;
use crate::flags::{project_options, Flag};
use crate::incomparable::{same_identity, unbox};
use crate::params::ParamMap;
use crate::record::{check_schema, Record};
use crate::template::Template;
use crate::value::Value;

/// `err` followed by each `source()` link.
pub fn chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    iter::successors(Some(err), |&link: &&'a (dyn Error + 'static)| link.source())
}

/// The first annotated error in the chain of `err`.
pub fn data_link<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a AnnotatedError> {
    chain(err).find_map(|link| unbox(link).downcast_ref::<AnnotatedError>())
}

// ============================================================================
// QUERIES
// ============================================================================

/// The value of field `name`, or `None` if no link carries it.
pub fn get_field(err: &(dyn Error + 'static), name: &str) -> Option<Value> {
    data_link(err).and_then(|link| link.params().get(name).cloned())
}

pub fn has_field(err: &(dyn Error + 'static), name: &str) -> bool {
    data_link(err).is_some_and(|link| link.params().contains(name))
}

/// All data carried by the chain of `err`. Empty for plain errors.
pub fn get_all_fields(err: &(dyn Error + 'static)) -> ParamMap {
    data_link(err)
        .map(|link| link.params().clone())
        .unwrap_or_default()
}

/// Projects the chain's data onto the record `T`.
///
/// Accepts [`PROJECT_FLAGS`](crate::flags::PROJECT_FLAGS). With
/// [`Flag::PanicOnInconsistency`] a failed projection panics instead of
/// returning the error.
pub fn project<T: Record>(err: &(dyn Error + 'static), flags: &[Flag]) -> Result<T, DataError> {
    let options = project_options("project", flags);
    check_schema::<T>("project");
    let params = get_all_fields(err);
    match T::from_params(&params, options.missing) {
        Ok(record) => Ok(record),
        Err(failure) if options.panic => panic!("project: {failure}"),
        Err(failure) => {
            debug!(error = %failure, "projection failed");
            Err(failure)
        }
    }
}

/// Whether `target` is `err` or one of its causes, by identity.
pub fn is(err: &(dyn Error + 'static), target: &(dyn Error + 'static)) -> bool {
    chain(err).any(|link| same_identity(link, target))
}

/// The first link of type `E` in the chain of `err`.
pub fn find_cause<'a, E: Error + 'static>(err: &'a (dyn Error + 'static)) -> Option<&'a E> {
    chain(err).find_map(|link| unbox(link).downcast_ref::<E>())
}

// ============================================================================
// MODIFICATIONS
// ============================================================================

/// Wraps `err` with the fields of `data`. Existing fields are replaced
/// unless `flags` say otherwise.
pub fn add_data<T: Record>(err: impl IntoCause, data: T, flags: &[Flag]) -> ErrorWithData<T> {
    ErrorWithData::wrap(err, "", data, flags)
}

pub fn try_add_data<T: Record>(
    err: impl IntoCause,
    data: T,
    flags: &[Flag],
) -> Result<ErrorWithData<T>, DataError> {
    ErrorWithData::try_wrap(err, "", data, flags)
}

/// Wraps `err` with one additional field.
pub fn add_param(err: impl IntoCause, name: &str, value: impl Into<Value>) -> ErrorWithParams {
    ErrorWithParams::wrap_with_params(err, "", ParamMap::new().with(name, value), &[])
}

/// Wraps `err` in an error whose data lacks `name`. The original error and
/// its causes keep their data.
pub fn delete_field(err: impl IntoCause, name: &str) -> ErrorWithParams {
    let cause = err.into_cause();
    let mut params = get_all_fields(&*cause);
    params.remove(name);
    let template = Template::cached(default_format(&cause));
    ErrorWithParams::from_annotated(AnnotatedError::from_parts(Some(cause), template, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotated::{cause, AnyError};
    use crate::incomparable::make_incomparable;
    use std::io;
    use std::sync::Arc;

    crate::record! {
        #[derive(Debug, Clone, PartialEq, Default)]
        #[allow(non_snake_case)]
        pub struct Sizes {
            pub Data1: i64,
            pub Data2: String,
        }
    }

    fn eof() -> AnyError {
        cause(io::Error::from(io::ErrorKind::UnexpectedEof))
    }

    #[test]
    fn plain_errors_carry_no_data() {
        let plain = io::Error::new(io::ErrorKind::Other, "x");
        assert_eq!(get_field(&plain, "A"), None);
        assert!(!has_field(&plain, "A"));
        assert!(get_all_fields(&plain).is_empty());
    }

    #[test]
    fn chain_lists_every_link() {
        let base = eof();
        let wrapped = add_param(Arc::clone(&base), "A", 1i32);
        let links: Vec<_> = chain(wrapped.as_error()).collect();
        assert_eq!(links.len(), 2);
        assert!(is(wrapped.as_error(), &*base));
        assert!(find_cause::<io::Error>(wrapped.as_error()).is_some());
    }

    #[test]
    fn data_is_found_through_foreign_links() {
        let inner = add_param(eof(), "Offset", 12u64);
        let boxed = make_incomparable(inner);
        assert_eq!(get_field(&boxed, "Offset"), Some(Value::Uint(12)));
    }

    #[test]
    fn delete_field_shadows_only_at_the_new_link() {
        let base = add_param(eof(), "Data2", "x");
        let deleted = delete_field(base.clone(), "Data2");
        assert_eq!(get_field(deleted.as_error(), "Data2"), None);
        assert_eq!(get_field(base.as_error(), "Data2"), Some(Value::from("x")));
        assert_eq!(deleted.to_string(), base.to_string());
    }

    #[test]
    fn projection_honours_missing_data_flags() {
        let err = add_param(eof(), "Data1", 5i32);
        let failure = project::<Sizes>(err.as_error(), &[]).unwrap_err();
        assert!(matches!(failure, DataError::MissingField { ref name, .. } if name == "Data2"));

        let sizes = project::<Sizes>(err.as_error(), &[Flag::MissingDataAsZero]).unwrap();
        assert_eq!(sizes, Sizes { Data1: 5, Data2: String::new() });
    }

    #[test]
    #[should_panic(expected = "project:")]
    fn projection_can_panic() {
        let err = add_param(eof(), "Data1", "not a number");
        let _ = project::<Sizes>(err.as_error(), &[Flag::PanicOnInconsistency]);
    }

    #[test]
    fn add_data_returns_typed_handle() {
        let err = add_data(
            eof(),
            Sizes {
                Data1: 1,
                Data2: "two".into(),
            },
            &[],
        );
        assert_eq!(err.data().Data2, "two");
        assert_eq!(err.to_string(), "unexpected end of file");
    }

    #[test]
    fn try_add_data_reports_conflicts() {
        let first = add_param(eof(), "Data1", 1i64);
        let result = try_add_data(
            first,
            Sizes {
                Data1: 2,
                Data2: "b".into(),
            },
            &[Flag::ErrorOnConflict],
        );
        assert!(matches!(result, Err(DataError::MergeConflict { .. })));
    }
}
