//! Typed records: the static schema used to project an error's parameter
//! map onto a Rust struct.
//!
//! A [`Record`] lists its fields as `(name, kind)` pairs and knows how to
//! flatten itself into a [`ParamMap`] and how to rebuild itself from one.
//! The [`record!`](crate::record!) macro writes both halves for a plain
//! struct whose fields are all `pub` and implement [`FieldValue`].

use std::collections::HashSet;

use crate::errors::DataError;
use crate::flags::MissingData;
use crate::params::ParamMap;
use crate::template::ast::{is_map_selector, is_valid_field_name};
use crate::value::{FieldValue, ValueKind};

/// One field of a record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: ValueKind,
}

/// A struct whose fields can be attached to, and projected from, an error.
pub trait Record: Sized {
    fn fields() -> &'static [FieldSpec];

    fn into_params(self) -> ParamMap;

    fn from_params(params: &ParamMap, missing: MissingData) -> Result<Self, DataError>;
}

/// The empty record. Errors typed with `()` promise no particular fields.
impl Record for () {
    fn fields() -> &'static [FieldSpec] {
        &[]
    }

    fn into_params(self) -> ParamMap {
        ParamMap::new()
    }

    fn from_params(_params: &ParamMap, _missing: MissingData) -> Result<Self, DataError> {
        Ok(())
    }
}

/// Reads one field for [`Record::from_params`].
pub fn project_field<V: FieldValue>(
    params: &ParamMap,
    name: &str,
    missing: MissingData,
) -> Result<V, DataError> {
    match params.get(name) {
        Some(value) => V::from_value(value).ok_or_else(|| DataError::TypeMismatch {
            name: name.to_string(),
            expected: V::KIND,
            found: value.kind(),
        }),
        None => match missing {
            MissingData::AsZero => Ok(V::default()),
            MissingData::IsError => Err(DataError::MissingField {
                name: name.to_string(),
                expected: V::KIND,
            }),
        },
    }
}

/// Checks that every field of `T` is addressable from a format string.
///
/// # Panics
///
/// Panics on a field name that is not a public identifier, collides with a
/// whole-map selector, or appears twice.
pub(crate) fn check_schema<T: Record>(caller: &str) {
    let mut seen = HashSet::new();
    for field in T::fields() {
        if !is_valid_field_name(field.name) {
            panic!(
                "{caller}: record field '{}' is not addressable; field names must be public identifiers",
                field.name
            );
        }
        if is_map_selector(field.name) {
            panic!(
                "{caller}: record field '{}' collides with a whole-map selector",
                field.name
            );
        }
        if !seen.insert(field.name) {
            panic!("{caller}: record field '{}' appears twice", field.name);
        }
    }
}

/// Declares a struct together with its [`Record`] implementation.
///
/// Every field must be `pub` and its type must implement
/// [`FieldValue`](crate::FieldValue).
///
/// ```rust
/// errdata::record! {
///     #[derive(Debug, Clone, PartialEq, Default)]
///     pub struct ReadFailure {
///         pub bytes_read: usize,
///         pub partial: bool,
///     }
/// }
///
/// use errdata::Record;
/// let params = ReadFailure { bytes_read: 3, partial: true }.into_params();
/// assert_eq!(params.len(), 2);
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            fn fields() -> &'static [$crate::FieldSpec] {
                const FIELDS: &[$crate::FieldSpec] = &[
                    $(
                        $crate::FieldSpec {
                            name: stringify!($field),
                            kind: <$ty as $crate::FieldValue>::KIND,
                        },
                    )*
                ];
                FIELDS
            }

            #[allow(unused_mut)]
            fn into_params(self) -> $crate::ParamMap {
                let mut params = $crate::ParamMap::new();
                $(
                    params.insert(
                        stringify!($field),
                        <$ty as $crate::FieldValue>::into_value(self.$field),
                    );
                )*
                params
            }

            #[allow(unused_variables)]
            fn from_params(
                params: &$crate::ParamMap,
                missing: $crate::MissingData,
            ) -> ::std::result::Result<Self, $crate::DataError> {
                Ok(Self {
                    $(
                        $field: $crate::record::project_field::<$ty>(
                            params,
                            stringify!($field),
                            missing,
                        )?,
                    )*
                })
            }
        }
    };
}
