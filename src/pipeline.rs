use std::fmt::Debug;

use log::trace;

use crate::{MismatchError, Stage, Value};

/// Stages run in order, each fed the previous one's output.
///
/// ```
/// use pit::{Pattern, Pipeline, Recover, Stage, Value};
///
/// let unwrap_ok = Stage::matching(Pattern::variant("ok", [Pattern::capture("x")]))
///     .derive(|mut b| b.take("x").unwrap_or_default())
///     .strict()
///     .build()?;
/// let pipeline = Pipeline::new().stage(unwrap_ok.clone()).stage(unwrap_ok);
///
/// let nested = Value::tuple([Value::atom("ok"), Value::tuple([Value::atom("ok"), Value::Int(1)])]);
/// assert_eq!(pipeline.run(nested)?, Value::Int(1));
///
/// // The second stage fails; recovery hands back what it was given.
/// let shallow = Value::tuple([Value::atom("ok"), Value::Int(2)]);
/// assert_eq!(pipeline.run(shallow).recover(), Value::Int(2));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stops at the first stage that raises.
    pub fn run(&self, input: Value) -> Result<Value, MismatchError> {
        self.stages.iter().enumerate().try_fold(input, |value, (i, stage)| {
            trace!("pipeline stage {} of {}", i + 1, self.stages.len());
            stage.evaluate(value)
        })
    }

    pub fn run_recovering(&self, input: Value) -> Value {
        self.run(input).recover()
    }
}

impl FromIterator<Stage> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self { stages: iter.into_iter().collect() }
    }
}

/// Terminal recovery for chains of strict stages.
pub trait Recover<V> {
    /// The output, or the value that failed to match.
    fn recover(self) -> V;

    /// Like [`recover`](Recover::recover), with the failing stage's tag.
    fn recover_tagged(self) -> (Option<String>, V);
}

impl<V: Debug> Recover<V> for Result<V, MismatchError<V>> {
    fn recover(self) -> V {
        self.unwrap_or_else(MismatchError::into_value)
    }

    fn recover_tagged(self) -> (Option<String>, V) {
        match self {
            Ok(value) => (None, value),
            Err(err) => err.into_tagged(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pattern;

    #[test]
    fn empty_pipeline_is_identity() {
        assert_eq!(Pipeline::new().run(Value::Int(7)).unwrap(), Value::Int(7));
    }

    #[test]
    fn recover_tagged_reports_the_error_tag() {
        let err: Result<Value, MismatchError> =
            Err(MismatchError::new("_", Value::Nil, "nil".into(), false).with_tag("load"));
        assert_eq!(err.recover_tagged(), (Some("load".to_owned()), Value::Nil));
    }

    #[test]
    fn collects_from_stages() {
        let p: Pipeline = (0..3)
            .map(|_| Stage::matching(Pattern::Wildcard).build().unwrap())
            .collect();
        assert_eq!(p.len(), 3);
    }
}
