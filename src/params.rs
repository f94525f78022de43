//! Parameter maps: the named data an error carries.
//!
//! A [`ParamMap`] is an ordered, persistent map from field name to [`Value`].
//! Cloning is cheap (structural sharing through `im::OrdMap`) and a clone is
//! semantically a copy: changing a derived error's map never touches the map
//! of the error it was derived from.

use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::errors::DataError;
use crate::flags::MergePolicy;
use crate::value::Value;

/// Named data attached to an error. Keys are case-sensitive.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamMap(OrdMap<String, Value>);

impl ParamMap {
    pub fn new() -> Self {
        Self(OrdMap::new())
    }

    /// Builds a map from a flat `key, value, key, value, ...` list.
    ///
    /// # Panics
    ///
    /// Panics if the list has odd length or a key position holds anything
    /// other than a string. Both are caller bugs.
    pub fn from_flat(args: impl IntoIterator<Item = Value>) -> Self {
        let args: Vec<Value> = args.into_iter().collect();
        if args.len() % 2 != 0 {
            panic!(
                "ParamMap::from_flat: expected key/value pairs, got an odd number of arguments ({})",
                args.len()
            );
        }
        let mut map = Self::new();
        let mut iter = args.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            match key {
                Value::Str(key) => {
                    map.insert(key, value);
                }
                other => panic!(
                    "ParamMap::from_flat: parameter names must be strings, got {} '{}'",
                    other.kind(),
                    other
                ),
            }
        }
        map
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Inserts or replaces an entry, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merges `previous` (the cause's data) underneath `self` (the new data).
    pub(crate) fn merge_previous(
        &mut self,
        previous: &ParamMap,
        policy: MergePolicy,
    ) -> Result<(), DataError> {
        for (name, old) in previous.iter() {
            match (self.get(name), policy) {
                (None, _) => {
                    self.insert(name.clone(), old.clone());
                }
                (Some(_), MergePolicy::Replace) => {}
                (Some(_), MergePolicy::KeepPrevious) => {
                    self.insert(name.clone(), old.clone());
                }
                (Some(new), MergePolicy::ErrorOnConflict) => {
                    if new != old {
                        debug!(field = %name, "merge conflict between cause data and new data");
                        return Err(DataError::MergeConflict {
                            name: name.clone(),
                            existing: old.clone(),
                            incoming: new.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl fmt::Display for ParamMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}

/// Builds a [`ParamMap`] from `name => value` pairs.
///
/// ```rust
/// let map = errdata::params! { "Data1" => 5, "Data2" => "six" };
/// assert_eq!(map.len(), 2);
/// assert_eq!(map.to_string(), "{Data1: 5, Data2: six}");
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::ParamMap::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::ParamMap::new();
        $( map.insert($name, $value); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_pairs_keys_with_values() {
        let map = ParamMap::from_flat(vec![
            Value::from("A"),
            Value::from(1u8),
            Value::from("B"),
            Value::from("two"),
        ]);
        assert_eq!(map.get("A"), Some(&Value::Uint(1)));
        assert_eq!(map.get("B"), Some(&Value::Str("two".into())));
    }

    #[test]
    #[should_panic(expected = "odd number of arguments")]
    fn from_flat_rejects_odd_length() {
        ParamMap::from_flat(vec![Value::from("A")]);
    }

    #[test]
    #[should_panic(expected = "parameter names must be strings")]
    fn from_flat_rejects_non_string_key() {
        ParamMap::from_flat(vec![Value::from(1i32), Value::from(2i32)]);
    }

    #[test]
    fn clones_are_independent() {
        let base = ParamMap::new().with("A", 1i32);
        let mut derived = base.clone();
        derived.insert("A", 2i32);
        derived.remove("A");
        assert_eq!(base.get("A"), Some(&Value::Int(1)));
        assert!(derived.is_empty());
    }

    #[test]
    fn merge_policies() {
        let previous = ParamMap::new().with("A", 1i32).with("B", 2i32);

        let mut replace = ParamMap::new().with("B", 20i32);
        replace.merge_previous(&previous, MergePolicy::Replace).unwrap();
        assert_eq!(replace.get("A"), Some(&Value::Int(1)));
        assert_eq!(replace.get("B"), Some(&Value::Int(20)));

        let mut keep = ParamMap::new().with("B", 20i32);
        keep.merge_previous(&previous, MergePolicy::KeepPrevious).unwrap();
        assert_eq!(keep.get("B"), Some(&Value::Int(2)));

        let mut same = ParamMap::new().with("B", 2i32);
        assert!(same.merge_previous(&previous, MergePolicy::ErrorOnConflict).is_ok());

        let mut conflict = ParamMap::new().with("B", 20i32);
        let err = conflict
            .merge_previous(&previous, MergePolicy::ErrorOnConflict)
            .unwrap_err();
        assert!(matches!(err, DataError::MergeConflict { ref name, .. } if name == "B"));
    }
}
