//! Stage specifications and the evaluator that runs them.
//!
//! A [`Stage`] pairs a [`Pattern`] with an optional guard, an optional
//! transform and a set of [`Options`] saying what happens on mismatch.
//! [`evaluate`] applies one stage to one value:
//!
//! ```
//! use pit::{evaluate, Pattern, Stage, Value};
//!
//! // n * 2 <- {tag: "ok", value: n}
//! let double = Stage::matching(Pattern::record([
//!         ("tag", Pattern::literal("ok")),
//!         ("value", Pattern::capture("n")),
//!     ]))
//!     .derive(|b| Value::from(b["n"].as_int().unwrap_or_default() * 2))
//!     .build()?;
//!
//! let ok = Value::record([("tag", Value::from("ok")), ("value", Value::from(11))]);
//! assert_eq!(evaluate(ok, &double)?, Value::Int(22));
//!
//! // Lenient stages hand back what they could not match.
//! let error = Value::record([("tag", Value::from("error"))]);
//! assert_eq!(evaluate(error.clone(), &double)?, error);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::sync::Arc;

use log::{debug, trace};

use crate::{Bindings, MismatchError, Pattern, StageError, Value};

pub type Guard = Arc<dyn Fn(&Bindings) -> bool + Send + Sync>;
pub type Transform = Arc<dyn Fn(Bindings) -> Value + Send + Sync>;
pub type RouteFn = Arc<dyn Fn(Value) -> Result<Value, MismatchError> + Send + Sync>;

/// Where a value goes after a stage decides its outcome.
#[derive(Clone)]
pub enum Route {
    /// Pass the value through unchanged.
    Identity,
    Stage(Arc<Stage>),
    Func(RouteFn),
}

impl Route {
    pub fn stage(stage: Stage) -> Self {
        Route::Stage(Arc::new(stage))
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, MismatchError> + Send + Sync + 'static,
    {
        Route::Func(Arc::new(f))
    }

    /// Wraps an infallible function.
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Route::Func(Arc::new(move |v| Ok(f(v))))
    }

    pub fn apply(&self, value: Value) -> Result<Value, MismatchError> {
        match self {
            Route::Identity => Ok(value),
            Route::Stage(stage) => stage.evaluate(value),
            Route::Func(f) => f(value),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Identity => f.write_str("Identity"),
            Route::Stage(stage) => f.debug_tuple("Stage").field(stage).finish(),
            Route::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<Stage> for Route {
    fn from(stage: Stage) -> Self {
        Route::stage(stage)
    }
}

/// What a stage does besides matching.
///
/// On mismatch the first configured policy wins: `on_mismatch`, then
/// `mismatch_default`, then raising when `strict`, then passing the input
/// through.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub on_success: Option<Route>,
    pub on_mismatch: Option<Route>,
    pub mismatch_default: Option<Value>,
    pub strict: bool,
}

impl Options {
    pub fn strict() -> Self {
        Self { strict: true, ..Self::default() }
    }

    pub fn with_on_success(mut self, route: impl Into<Route>) -> Self {
        self.on_success = Some(route.into());
        self
    }

    pub fn with_on_mismatch(mut self, route: impl Into<Route>) -> Self {
        self.on_mismatch = Some(route.into());
        self
    }

    pub fn with_mismatch_default(mut self, value: impl Into<Value>) -> Self {
        self.mismatch_default = Some(value.into());
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StageForm {
    /// `transform <- pattern`
    Derive,
    /// `not pattern`
    Negated,
    /// A lone capture; never mismatches.
    Bare,
    /// A plain pattern; yields the input unchanged.
    GuardOnly,
}

/// Result of testing a value against a stage, after negation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Matched(Bindings),
    Mismatched,
}

impl Outcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Matched(_))
    }
}

/// An immutable stage specification. Build one with [`Stage::matching`].
#[derive(Clone)]
pub struct Stage {
    pattern: Pattern,
    negated: bool,
    guard: Option<Guard>,
    guard_source: Option<String>,
    transform: Option<Transform>,
    source: Option<String>,
    tag: Option<String>,
    options: Options,
}

impl Stage {
    pub fn matching(pattern: impl Into<Pattern>) -> StageBuilder {
        StageBuilder::new(pattern.into())
    }

    /// A bare stage naming the whole value.
    pub fn bind(name: impl Into<String>) -> StageBuilder {
        StageBuilder::new(Pattern::capture(name))
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn form(&self) -> StageForm {
        if self.negated {
            StageForm::Negated
        } else if self.transform.is_some() {
            StageForm::Derive
        } else if self.pattern.is_bare() && self.guard.is_none() {
            StageForm::Bare
        } else {
            StageForm::GuardOnly
        }
    }

    /// The pattern as it appears in diagnostics, guard included.
    pub fn describe(&self) -> String {
        let pattern = match &self.source {
            Some(source) => source.clone(),
            None => self.pattern.to_string(),
        };
        match &self.guard_source {
            Some(guard) => format!("{} when {}", pattern, guard),
            None => pattern,
        }
    }

    /// Matches `input` and applies the guard, then flips for negated stages.
    pub fn check(&self, input: &Value) -> Outcome {
        let matched = self
            .pattern
            .matches(input)
            .filter(|bindings| self.guard.as_ref().map_or(true, |guard| guard(bindings)));
        match (matched, self.negated) {
            (Some(bindings), false) => Outcome::Matched(bindings),
            (None, true) => Outcome::Matched(Bindings::new()),
            _ => Outcome::Mismatched,
        }
    }

    pub fn evaluate(&self, input: Value) -> Result<Value, MismatchError> {
        self.evaluate_with(input, &self.options)
    }

    /// Evaluates with `options` in place of the stage's own.
    pub fn evaluate_with(&self, input: Value, options: &Options) -> Result<Value, MismatchError> {
        match self.check(&input) {
            Outcome::Matched(bindings) => {
                trace!("piped value matched `{}`", self.describe());
                let output = match &self.transform {
                    Some(transform) => transform(bindings),
                    None => input,
                };
                match &options.on_success {
                    Some(route) => route.apply(output),
                    None => Ok(output),
                }
            }
            Outcome::Mismatched => self.mismatch(input, options),
        }
    }

    fn mismatch(&self, input: Value, options: &Options) -> Result<Value, MismatchError> {
        if let Some(route) = &options.on_mismatch {
            debug!("piped value did not match `{}`, routing it", self.describe());
            return route.apply(input);
        }
        if let Some(default) = &options.mismatch_default {
            debug!("piped value did not match `{}`, substituting {}", self.describe(), default);
            return Ok(default.clone());
        }
        if !options.strict {
            return Ok(input);
        }
        if let Some(tag) = &self.tag {
            debug!("piped value did not match `{}`, tagging it :{}", self.describe(), tag);
            return Ok(Value::tuple([Value::atom(tag.as_str()), input]));
        }
        let repr = input.to_string();
        let err = MismatchError::new(self.describe(), input, repr, self.negated);
        debug!("{}", err);
        Err(err)
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("pattern", &self.describe())
            .field("form", &self.form())
            .field("tag", &self.tag)
            .field("options", &self.options)
            .finish()
    }
}

/// Assembles a [`Stage`].
#[derive(Clone)]
pub struct StageBuilder {
    stage: Stage,
}

impl StageBuilder {
    fn new(pattern: Pattern) -> Self {
        Self {
            stage: Stage {
                pattern,
                negated: false,
                guard: None,
                guard_source: None,
                transform: None,
                source: None,
                tag: None,
                options: Options::default(),
            },
        }
    }

    /// Inverts the outcome: the stage matches values the pattern rejects.
    pub fn negate(mut self) -> Self {
        self.stage.negated = !self.stage.negated;
        self
    }

    pub fn guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&Bindings) -> bool + Send + Sync + 'static,
    {
        self.stage.guard = Some(Arc::new(guard));
        self
    }

    /// Like [`guard`](Self::guard), with a source text for diagnostics.
    pub fn guard_described<F>(mut self, source: impl Into<String>, guard: F) -> Self
    where
        F: Fn(&Bindings) -> bool + Send + Sync + 'static,
    {
        self.stage.guard_source = Some(source.into());
        self.guard(guard)
    }

    pub fn derive<F>(mut self, transform: F) -> Self
    where
        F: Fn(Bindings) -> Value + Send + Sync + 'static,
    {
        self.stage.transform = Some(Arc::new(transform));
        self
    }

    /// Overrides the pattern text shown in mismatch messages.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.stage.source = Some(source.into());
        self
    }

    /// On a raising mismatch, yield `(:tag, value)` instead.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.stage.tag = Some(tag.into());
        self
    }

    pub fn then(mut self, route: impl Into<Route>) -> Self {
        self.stage.options.on_success = Some(route.into());
        self
    }

    pub fn or_else(mut self, route: impl Into<Route>) -> Self {
        self.stage.options.on_mismatch = Some(route.into());
        self
    }

    pub fn else_value(mut self, value: impl Into<Value>) -> Self {
        self.stage.options.mismatch_default = Some(value.into());
        self
    }

    pub fn strict(mut self) -> Self {
        self.stage.options.strict = true;
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.stage.options = options;
        self
    }

    pub fn build(self) -> Result<Stage, StageError> {
        if self.stage.negated && self.stage.transform.is_some() {
            return Err(StageError::NegatedDerive(self.stage.describe()));
        }
        Ok(self.stage)
    }
}

/// Runs `input` through `stage` with the stage's own options.
pub fn evaluate(input: Value, stage: &Stage) -> Result<Value, MismatchError> {
    stage.evaluate(input)
}

/// Like [`evaluate`], but raises on mismatch unless a route or default is
/// configured.
///
/// ```
/// use pit::{evaluate_strict, Pattern, Stage, Value};
///
/// let stage = Stage::matching(Pattern::variant("ok", [Pattern::Wildcard])).build()?;
/// let err = evaluate_strict(Value::atom("error"), &stage).unwrap_err();
/// assert_eq!(err.value, Value::atom("error"));
/// assert_eq!(err.message, "expected piped value to match `(:ok, _)` but got `:error`");
/// # Ok::<(), pit::StageError>(())
/// ```
pub fn evaluate_strict(input: Value, stage: &Stage) -> Result<Value, MismatchError> {
    let options = stage.options.clone().with_strict(true);
    stage.evaluate_with(input, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(v: impl Into<Value>) -> Value {
        Value::record([("tag", Value::from("ok")), ("value", v.into())])
    }

    fn ok_n() -> Pattern {
        Pattern::record([("tag", Pattern::literal("ok")), ("value", Pattern::capture("n"))])
    }

    #[test]
    fn forms() {
        let derive = Stage::matching(ok_n()).derive(|b| b["n"].clone()).build().unwrap();
        assert_eq!(derive.form(), StageForm::Derive);
        assert_eq!(Stage::matching(ok_n()).negate().build().unwrap().form(), StageForm::Negated);
        assert_eq!(Stage::bind("x").build().unwrap().form(), StageForm::Bare);
        assert_eq!(Stage::matching(ok_n()).build().unwrap().form(), StageForm::GuardOnly);
        assert_eq!(
            Stage::bind("x").guard(|_| true).build().unwrap().form(),
            StageForm::GuardOnly
        );
    }

    #[test]
    fn negated_derive_is_rejected() {
        let err = Stage::matching(ok_n())
            .negate()
            .derive(|b| b["n"].clone())
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"negated pattern `{tag: "ok", value: n}` cannot derive a value"#
        );
    }

    #[test]
    fn double_negation_restores() {
        let stage = Stage::matching(ok_n()).negate().negate().build().unwrap();
        assert!(!stage.is_negated());
    }

    #[test]
    fn bare_stage_never_mismatches() {
        let stage = Stage::bind("x").strict().build().unwrap();
        for v in [Value::Nil, Value::from("s"), ok(1)] {
            assert_eq!(stage.evaluate(v.clone()).unwrap(), v);
        }
    }

    #[test]
    fn guard_text_in_message() {
        let stage = Stage::matching(ok_n())
            .guard_described("is_number(n)", |b| b["n"].is_number())
            .strict()
            .build()
            .unwrap();
        let err = stage.evaluate(ok("hi")).unwrap_err();
        assert_eq!(
            err.message,
            r#"expected piped value to match `{tag: "ok", value: n} when is_number(n)` but got `{tag: "ok", value: "hi"}`"#
        );
    }

    #[test]
    fn source_overrides_rendering() {
        let stage = Stage::matching(ok_n()).source("%{tag: :ok, value: n}").strict().build().unwrap();
        let err = stage.evaluate(Value::Nil).unwrap_err();
        assert_eq!(err.pattern, "%{tag: :ok, value: n}");
    }

    #[test]
    fn tag_replaces_raise_only() {
        let strict = Stage::matching(ok_n()).tag("parse").strict().build().unwrap();
        assert_eq!(
            strict.evaluate(Value::Int(3)).unwrap(),
            Value::tuple([Value::atom("parse"), Value::Int(3)])
        );

        let lenient = Stage::matching(ok_n()).tag("parse").build().unwrap();
        assert_eq!(lenient.evaluate(Value::Int(3)).unwrap(), Value::Int(3));
    }

    #[test]
    fn success_route_skips_mismatches() {
        let stage = Stage::matching(ok_n())
            .derive(|b| b["n"].clone())
            .then(Route::map(|v| Value::from(v.as_int().unwrap_or_default() + 100)))
            .else_value(0)
            .build()
            .unwrap();
        assert_eq!(stage.evaluate(ok(1)).unwrap(), Value::Int(101));
        assert_eq!(stage.evaluate(Value::Nil).unwrap(), Value::Int(0));
    }

    #[test]
    fn evaluate_with_overrides_options() {
        let stage = Stage::matching(ok_n()).strict().build().unwrap();
        let out = stage
            .evaluate_with(Value::Nil, &Options::default().with_mismatch_default("fallback"))
            .unwrap();
        assert_eq!(out, Value::from("fallback"));
    }
}
