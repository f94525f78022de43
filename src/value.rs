use serde::{Deserialize, Serialize};
use std::fmt;

use crate::params::ParamMap;

/// A dynamically typed parameter value attached to an error.
///
/// # Examples
///
/// ```rust
/// use errdata::{Value, ValueKind};
/// let v = Value::from(128u8);
/// assert_eq!(v.kind(), ValueKind::Uint);
/// assert_eq!(v.to_string(), "128");
/// assert!(Value::default().is_nil());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(ParamMap),
    Bytes(Vec<u8>),
}

/// Type tag of a [`Value`], used to check projections onto typed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Nil,
    Bool,
    Int,
    Uint,
    Float,
    Str,
    List,
    Map,
    Bytes,
    /// Accepts any value.
    Any,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Nil => "nil",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Uint => "uint",
            ValueKind::Float => "float",
            ValueKind::Str => "string",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Bytes => "bytes",
            ValueKind::Any => "any",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Uint(_) => ValueKind::Uint,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The value as a signed integer, if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Uint(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// The value as an unsigned integer, if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Display formatting helpers
    // ------------------------------------------------------------------------

    fn fmt_seq<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Uint(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => Value::fmt_seq(f, items),
            Value::Map(map) => write!(f, "{}", map),
            Value::Bytes(bytes) => Value::fmt_seq(f, bytes),
        }
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

/// A Rust type that can be stored in a [`ParamMap`] and projected back out.
///
/// `KIND` is the type tag recorded in a record's schema. `from_value`
/// returns `None` when the stored value cannot be assigned to `Self`.
pub trait FieldValue: Sized + Default {
    const KIND: ValueKind;

    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! int_field_value {
    ($kind:ident, $variant:ident, $wide:ty, $widen:ident, $($ty:ty),+) => {
        $(
            impl FieldValue for $ty {
                const KIND: ValueKind = ValueKind::$kind;

                fn into_value(self) -> Value {
                    Value::$variant(self as $wide)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    value.$widen().and_then(|wide| <$ty>::try_from(wide).ok())
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    v.into_value()
                }
            }
        )+
    };
}

int_field_value!(Int, Int, i64, as_i64, i8, i16, i32, i64, isize);
int_field_value!(Uint, Uint, u64, as_u64, u8, u16, u32, u64, usize);

macro_rules! plain_field_value {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl FieldValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn into_value(self) -> Value {
                Value::$variant(self.into())
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone().into()),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                v.into_value()
            }
        }
    };
}

plain_field_value!(bool, Bool, Bool);
plain_field_value!(f64, Float, Float);
plain_field_value!(String, Str, Str);
plain_field_value!(Vec<u8>, Bytes, Bytes);
plain_field_value!(Vec<Value>, List, List);
plain_field_value!(ParamMap, Map, Map);

impl FieldValue for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x as f32),
            _ => None,
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        v.into_value()
    }
}

impl FieldValue for Value {
    const KIND: ValueKind = ValueKind::Any;

    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

/// `None` is stored as [`Value::Nil`]; a nil value projects to `None`.
impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Nil,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Nil => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FieldValue> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.into_value()
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}
