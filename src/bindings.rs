use std::collections::btree_map::{self, BTreeMap};
use std::ops::Index;

use crate::Value;

/// Names captured by a successful [`Pattern`](crate::Pattern) match.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bindings {
    names: BTreeMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.names.iter()
    }

    /// Takes a bound value out, leaving the rest in place.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.names.remove(name)
    }

    /// Consumes the bindings, keeping only the value bound to `name`.
    pub fn into_value(mut self, name: &str) -> Option<Value> {
        self.names.remove(name)
    }

    /// Binds `name`, or checks it against an earlier binding of the same
    /// name. Returns false when the two disagree.
    pub(crate) fn bind(&mut self, name: &str, value: &Value) -> bool {
        match self.names.get(name) {
            Some(bound) => bound == value,
            None => {
                self.names.insert(name.to_owned(), value.clone());
                true
            }
        }
    }
}

impl Index<&str> for Bindings {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.names.get(name) {
            Some(value) => value,
            None => panic!("no binding named `{}`", name),
        }
    }
}

impl IntoIterator for Bindings {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.into_iter()
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebinding_requires_equal_values() {
        let mut b = Bindings::new();
        assert!(b.bind("x", &Value::Int(1)));
        assert!(b.bind("x", &Value::Int(1)));
        assert!(!b.bind("x", &Value::Int(2)));
        assert_eq!(b.len(), 1);
        assert_eq!(b["x"], Value::Int(1));
    }

    #[test]
    fn into_value_keeps_one_binding() {
        let mut b = Bindings::new();
        b.bind("x", &Value::Int(1));
        b.bind("y", &Value::from("two"));
        assert_eq!(b.clone().into_value("y"), Some(Value::from("two")));
        assert_eq!(b.into_value("z"), None);
    }

    #[test]
    #[should_panic(expected = "no binding named `y`")]
    fn index_missing_panics() {
        let _ = &Bindings::new()["y"];
    }
}
