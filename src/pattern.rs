use std::fmt;

use crate::value::{Value, ValueKind};
use crate::Bindings;

/// A structural description a [`Value`] is tested against.
///
/// ```
/// use pit::{Pattern, Value};
///
/// // {tag: "ok", value: n}
/// let pattern = Pattern::record([
///     ("tag", Pattern::literal("ok")),
///     ("value", Pattern::capture("n")),
/// ]);
/// let input = Value::record([("tag", Value::from("ok")), ("value", Value::from(11))]);
///
/// let bindings = pattern.matches(&input).unwrap();
/// assert_eq!(bindings["n"], Value::Int(11));
/// assert_eq!(pattern.to_string(), r#"{tag: "ok", value: n}"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// `_`
    Wildcard,
    Literal(Value),
    /// Binds the whole value to a name.
    Capture(String),
    /// `name @ pattern`
    Alias(String, Box<Pattern>),
    Tuple(Vec<Pattern>),
    /// `[a, b]`, or `[a, b, ..rest]` when `rest` is set.
    List {
        items: Vec<Pattern>,
        rest: Option<String>,
    },
    /// Partial: only the listed keys must exist and match.
    Record(Vec<(String, Pattern)>),
    /// A tuple whose first element is the atom `tag`.
    Variant(String, Vec<Pattern>),
    Kind(ValueKind),
    /// First alternative that matches wins.
    Any(Vec<Pattern>),
}

impl Pattern {
    pub fn capture(name: impl Into<String>) -> Self {
        Pattern::Capture(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Pattern::Literal(value.into())
    }

    pub fn alias(name: impl Into<String>, pattern: Pattern) -> Self {
        Pattern::Alias(name.into(), Box::new(pattern))
    }

    pub fn tuple<I: IntoIterator<Item = Pattern>>(items: I) -> Self {
        Pattern::Tuple(items.into_iter().collect())
    }

    pub fn list<I: IntoIterator<Item = Pattern>>(items: I) -> Self {
        Pattern::List { items: items.into_iter().collect(), rest: None }
    }

    pub fn list_with_rest<I: IntoIterator<Item = Pattern>>(items: I, rest: impl Into<String>) -> Self {
        Pattern::List { items: items.into_iter().collect(), rest: Some(rest.into()) }
    }

    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Pattern)>,
    {
        Pattern::Record(fields.into_iter().map(|(k, p)| (k.into(), p)).collect())
    }

    pub fn variant<I: IntoIterator<Item = Pattern>>(tag: impl Into<String>, items: I) -> Self {
        Pattern::Variant(tag.into(), items.into_iter().collect())
    }

    pub fn kind(kind: ValueKind) -> Self {
        Pattern::Kind(kind)
    }

    pub fn any<I: IntoIterator<Item = Pattern>>(alternatives: I) -> Self {
        Pattern::Any(alternatives.into_iter().collect())
    }

    /// A lone capture: matches anything and names the whole value.
    pub fn is_bare(&self) -> bool {
        matches!(self, Pattern::Capture(_))
    }

    /// Destructures `value`, returning the captured names on success.
    pub fn matches(&self, value: &Value) -> Option<Bindings> {
        let mut bindings = Bindings::new();
        self.match_into(value, &mut bindings).then_some(bindings)
    }

    fn match_into(&self, value: &Value, bindings: &mut Bindings) -> bool {
        match self {
            Pattern::Wildcard => true,
            Pattern::Literal(expected) => expected == value,
            Pattern::Capture(name) => bindings.bind(name, value),
            Pattern::Alias(name, inner) => {
                inner.match_into(value, bindings) && bindings.bind(name, value)
            }
            Pattern::Tuple(items) => match value {
                Value::Tuple(values) => match_all(items, values, bindings),
                _ => false,
            },
            Pattern::List { items, rest } => match value {
                Value::List(values) => match rest {
                    None => match_all(items, values, bindings),
                    Some(rest) => {
                        values.len() >= items.len()
                            && match_all(items, &values[..items.len()], bindings)
                            && bindings.bind(rest, &Value::List(values[items.len()..].to_vec()))
                    }
                },
                _ => false,
            },
            Pattern::Record(fields) => match value {
                Value::Record(values) => fields.iter().all(|(key, pattern)| {
                    values
                        .get(key)
                        .is_some_and(|v| pattern.match_into(v, bindings))
                }),
                _ => false,
            },
            Pattern::Variant(tag, items) => match value {
                Value::Tuple(values) => match values.split_first() {
                    Some((Value::Atom(head), tail)) => {
                        head == tag && match_all(items, tail, bindings)
                    }
                    _ => false,
                },
                _ => false,
            },
            Pattern::Kind(kind) => value.kind() == *kind,
            Pattern::Any(alternatives) => alternatives.iter().any(|alt| {
                // Each alternative starts from the bindings made so far.
                let mut attempt = bindings.clone();
                if alt.match_into(value, &mut attempt) {
                    *bindings = attempt;
                    true
                } else {
                    false
                }
            }),
        }
    }
}

fn match_all(patterns: &[Pattern], values: &[Value], bindings: &mut Bindings) -> bool {
    patterns.len() == values.len()
        && patterns
            .iter()
            .zip(values)
            .all(|(p, v)| p.match_into(v, bindings))
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Pattern]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Wildcard => f.write_str("_"),
            Pattern::Literal(value) => write!(f, "{}", value),
            Pattern::Capture(name) => f.write_str(name),
            Pattern::Alias(name, inner) => write!(f, "{} @ {}", name, inner),
            Pattern::Tuple(items) => {
                f.write_str("(")?;
                write_joined(f, items)?;
                f.write_str(")")
            }
            Pattern::List { items, rest } => {
                f.write_str("[")?;
                write_joined(f, items)?;
                if let Some(rest) = rest {
                    if !items.is_empty() {
                        f.write_str(", ")?;
                    }
                    write!(f, "..{}", rest)?;
                }
                f.write_str("]")
            }
            Pattern::Record(fields) => {
                f.write_str("{")?;
                for (i, (key, pattern)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, pattern)?;
                }
                f.write_str("}")
            }
            Pattern::Variant(tag, items) => {
                write!(f, "(:{}", tag)?;
                for item in items {
                    write!(f, ", {}", item)?;
                }
                f.write_str(")")
            }
            Pattern::Kind(kind) => write!(f, "{}()", kind.name()),
            Pattern::Any(alternatives) => {
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", alt)?;
                }
                Ok(())
            }
        }
    }
}

impl From<Value> for Pattern {
    fn from(value: Value) -> Self {
        Pattern::Literal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(v: Value) -> Value {
        Value::tuple([Value::atom("ok"), v])
    }

    #[test]
    fn variant_checks_the_leading_atom() {
        let p = Pattern::variant("ok", [Pattern::capture("x")]);
        assert_eq!(p.matches(&ok(Value::Int(3))).unwrap()["x"], Value::Int(3));
        assert!(p.matches(&Value::tuple([Value::atom("error"), Value::Int(3)])).is_none());
        assert!(p.matches(&Value::tuple([Value::from("ok"), Value::Int(3)])).is_none());
        assert_eq!(p.to_string(), "(:ok, x)");
    }

    #[test]
    fn repeated_capture_must_agree() {
        let p = Pattern::tuple([Pattern::capture("x"), Pattern::capture("x")]);
        assert!(p.matches(&Value::tuple([Value::Int(1), Value::Int(1)])).is_some());
        assert!(p.matches(&Value::tuple([Value::Int(1), Value::Int(2)])).is_none());
    }

    #[test]
    fn list_rest_binds_the_tail() {
        let p = Pattern::list_with_rest([Pattern::capture("head")], "tail");
        let b = p
            .matches(&Value::list([Value::Int(1), Value::Int(2), Value::Int(3)]))
            .unwrap();
        assert_eq!(b["head"], Value::Int(1));
        assert_eq!(b["tail"], Value::list([Value::Int(2), Value::Int(3)]));
        assert!(p.matches(&Value::list([])).is_none());
        assert_eq!(p.to_string(), "[head, ..tail]");
    }

    #[test]
    fn record_match_is_partial() {
        let p = Pattern::record([("tag", Pattern::literal("error"))]);
        let v = Value::record([("tag", Value::from("error")), ("value", Value::Int(22))]);
        assert!(p.matches(&v).unwrap().is_empty());
        assert!(p.matches(&Value::record([("value", Value::Int(22))])).is_none());
    }

    #[test]
    fn alternatives_do_not_leak_bindings() {
        let p = Pattern::any([
            Pattern::tuple([Pattern::capture("a"), Pattern::literal(0)]),
            Pattern::tuple([Pattern::Wildcard, Pattern::capture("b")]),
        ]);
        let b = p.matches(&Value::tuple([Value::Int(5), Value::Int(7)])).unwrap();
        assert!(!b.contains("a"));
        assert_eq!(b["b"], Value::Int(7));
    }

    #[test]
    fn alias_binds_whole_and_parts() {
        let p = Pattern::alias("whole", Pattern::variant("ok", [Pattern::capture("n")]));
        let b = p.matches(&ok(Value::Int(4))).unwrap();
        assert_eq!(b["whole"], ok(Value::Int(4)));
        assert_eq!(b["n"], Value::Int(4));
        assert_eq!(p.to_string(), "whole @ (:ok, n)");
    }

    #[test]
    fn kind_tests_the_value_kind() {
        let p = Pattern::kind(ValueKind::Str);
        assert!(p.matches(&Value::from("hi")).is_some());
        assert!(p.matches(&Value::Int(1)).is_none());
        assert_eq!(p.to_string(), "string()");
    }
}
