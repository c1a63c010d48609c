use std::fmt::Debug;

use crate::Value;

/// Raised when a piped value fails to match a strict stage.
///
/// Carries the offending value so a caller at the end of a chain can
/// recover the last value that did not match.
///
/// ```
/// use pit::{MismatchError, Value};
///
/// let err = MismatchError::new("(:ok, n)", Value::atom("error"), ":error".into(), false);
/// assert_eq!(
///     err.to_string(),
///     "expected piped value to match `(:ok, n)` but got `:error`"
/// );
/// assert_eq!(err.into_value(), Value::atom("error"));
/// ```
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct MismatchError<V: Debug = Value> {
    pub message: String,
    /// The pattern as it was written.
    pub pattern: String,
    pub value: V,
    pub tag: Option<String>,
    pub negated: bool,
}

impl<V: Debug> MismatchError<V> {
    /// `repr` is the rendering of `value` used in the message.
    pub fn new(pattern: impl Into<String>, value: V, repr: String, negated: bool) -> Self {
        let pattern = pattern.into();
        let verb = if negated { "did not expect" } else { "expected" };
        Self {
            message: format!("{} piped value to match `{}` but got `{}`", verb, pattern, repr),
            pattern,
            value,
            tag: None,
            negated,
        }
    }

    /// Renders `value` with its `Debug` form. This is what `pit!` uses.
    pub fn debug(pattern: impl Into<String>, value: V, negated: bool) -> Self {
        let repr = format!("{:?}", value);
        Self::new(pattern, value, repr, negated)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn into_tagged(self) -> (Option<String>, V) {
        (self.tag, self.value)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

/// Errors building a [`Stage`](crate::Stage).
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("negated pattern `{0}` cannot derive a value")]
    NegatedDerive(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negated_message() {
        let v = Value::record([("tag", Value::from("error"))]);
        let err = MismatchError::new("{tag: \"error\"}", v.clone(), v.to_string(), true);
        assert_eq!(
            err.message,
            r#"did not expect piped value to match `{tag: "error"}` but got `{tag: "error"}`"#
        );
        assert!(err.is_negated());
    }

    #[test]
    fn debug_repr_for_typed_values() {
        let err = MismatchError::debug("Some(_)", None::<i32>, false).with_tag("lookup");
        assert_eq!(err.to_string(), "expected piped value to match `Some(_)` but got `None`");
        assert_eq!(err.into_tagged(), (Some("lookup".to_owned()), None));
    }
}
