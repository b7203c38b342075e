//! Attribute sets carried by insert and retain operations.
//!
//! An attribute set is a small ordered map from attribute name to a JSON
//! value. Inside a change delta, a `null` value marks the attribute for
//! removal; document content never stores nulls, they are dropped the
//! moment a change is composed onto it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

/// An ordered attribute map (`name -> JSON value`).
///
/// Ordering is deterministic so serialization and comparison are stable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes(BTreeMap<SmolStr, Value>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<SmolStr>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Value)> {
        self.0.iter()
    }

    /// `Some(self)` unless empty. Operations store `None` instead of an
    /// empty set so that "no attributes" has exactly one representation.
    pub fn into_option(self) -> Option<Attributes> {
        if self.is_empty() { None } else { Some(self) }
    }

    /// Merge `applied` over `self`, later values winning.
    ///
    /// `keep_nulls` decides what happens to removal markers in the result:
    /// a change composed onto another change keeps them (the removal still
    /// has to happen later), a change composed onto real content drops them.
    pub fn compose(&self, applied: &Attributes, keep_nulls: bool) -> Attributes {
        let mut out = self.0.clone();
        for (key, value) in &applied.0 {
            out.insert(key.clone(), value.clone());
        }
        if !keep_nulls {
            out.retain(|_, value| !value.is_null());
        }
        Attributes(out)
    }

    /// The attribute change that turns `self` into `target`.
    ///
    /// Keys present in `self` but absent from `target` come out as `null`
    /// removal markers.
    pub fn diff(&self, target: &Attributes) -> Attributes {
        let mut out = BTreeMap::new();
        for key in self.0.keys().chain(target.0.keys()) {
            if self.0.get(key) != target.0.get(key) {
                out.insert(
                    key.clone(),
                    target.0.get(key).cloned().unwrap_or(Value::Null),
                );
            }
        }
        Attributes(out)
    }

    /// [`compose`](Self::compose) lifted over the optional sets operations
    /// actually carry.
    pub fn compose_opt(
        base: Option<&Attributes>,
        applied: Option<&Attributes>,
        keep_nulls: bool,
    ) -> Option<Attributes> {
        let base = base.cloned().unwrap_or_default();
        let applied = applied.cloned().unwrap_or_default();
        base.compose(&applied, keep_nulls).into_option()
    }

    /// [`diff`](Self::diff) lifted over optional sets.
    pub fn diff_opt(base: Option<&Attributes>, target: Option<&Attributes>) -> Option<Attributes> {
        let base = base.cloned().unwrap_or_default();
        let target = target.cloned().unwrap_or_default();
        base.diff(&target).into_option()
    }
}

impl<K: Into<SmolStr>> FromIterator<(K, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Attributes(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs<const N: usize>(pairs: [(&str, Value); N]) -> Attributes {
        Attributes::from_iter(pairs)
    }

    #[test]
    fn test_compose_overwrites() {
        let base = attrs([("bold", json!(true)), ("size", json!(12))]);
        let applied = attrs([("size", json!(14)), ("italic", json!(true))]);

        let out = base.compose(&applied, false);
        assert_eq!(out.get("bold"), Some(&json!(true)));
        assert_eq!(out.get("size"), Some(&json!(14)));
        assert_eq!(out.get("italic"), Some(&json!(true)));
    }

    #[test]
    fn test_compose_null_handling() {
        let base = attrs([("bold", json!(true))]);
        let removal = attrs([("bold", Value::Null)]);

        // Onto content: the removal takes effect and disappears.
        let onto_content = base.compose(&removal, false);
        assert!(onto_content.is_empty());

        // Onto another change: the marker must survive.
        let onto_change = base.compose(&removal, true);
        assert_eq!(onto_change.get("bold"), Some(&Value::Null));
    }

    #[test]
    fn test_diff_produces_removal_markers() {
        let base = attrs([("bold", json!(true)), ("size", json!(12))]);
        let target = attrs([("size", json!(12)), ("italic", json!(true))]);

        let out = base.diff(&target);
        assert_eq!(out.get("bold"), Some(&Value::Null));
        assert_eq!(out.get("italic"), Some(&json!(true)));
        assert!(!out.contains_key("size"));
    }

    #[test]
    fn test_diff_equal_sets_is_empty() {
        let a = attrs([("bold", json!(true))]);
        assert!(a.diff(&a.clone()).is_empty());
        assert_eq!(Attributes::diff_opt(Some(&a), Some(&a)), None);
    }

    #[test]
    fn test_into_option_collapses_empty() {
        assert_eq!(Attributes::new().into_option(), None);
        assert!(attrs([("bold", json!(true))]).into_option().is_some());
    }

    #[test]
    fn test_compose_opt_missing_sides() {
        let a = attrs([("bold", json!(true))]);
        assert_eq!(Attributes::compose_opt(None, None, true), None);
        assert_eq!(
            Attributes::compose_opt(Some(&a), None, false),
            Some(a.clone())
        );
        assert_eq!(Attributes::compose_opt(None, Some(&a), false), Some(a));
    }
}
