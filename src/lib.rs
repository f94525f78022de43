//! errdata: errors that carry key/value data and render their messages from
//! a small interpolation language.
//!
//! ```rust
//! use std::io;
//! use errdata::{cause, get_all_fields, is, params, ErrorWithParams};
//!
//! let eof = cause(io::Error::from(io::ErrorKind::UnexpectedEof));
//! let first = ErrorWithParams::wrap_with_params(eof.clone(), "", params! { "Data1" => 5, "Data2" => 6 }, &[]);
//! let second = ErrorWithParams::wrap_with_params(first, "", params! { "Data2" => "arg2" }, &[]);
//!
//! let fields = get_all_fields(second.as_error());
//! assert_eq!(fields.len(), 2);
//! assert_eq!(fields.get("Data2"), Some(&"arg2".into()));
//! assert!(is(second.as_error(), &*eof));
//! ```

pub use crate::annotated::{
    as_interpolate, cause, AnnotatedError, AnyError, ErrorWithData, ErrorWithParams, IntoCause,
    Interpolate,
};
pub use crate::chain::{
    add_data, add_param, chain, data_link, delete_field, find_cause, get_all_fields, get_field,
    has_field, is, project, try_add_data,
};
pub use crate::errors::{DataError, Span, Stage, TemplateError, TemplateErrorKind};
pub use crate::flags::{Flag, MergePolicy, MissingData};
pub use crate::incomparable::{make_incomparable, same_identity, unbox, Incomparable};
pub use crate::params::ParamMap;
pub use crate::record::{FieldSpec, Record};
pub use crate::template::Template;
pub use crate::value::{FieldValue, Value, ValueKind};

pub mod annotated;
pub mod chain;
pub mod cli;
pub mod errors;
pub mod flags;
pub mod incomparable;
pub mod params;
pub mod record;
pub mod template;
pub mod value;
pub mod wire;
