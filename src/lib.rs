//! # `pit` – Pattern-Guarded Pipe Stages
//!
//! `pit` lets a value flowing through a chain of transformations be
//! transformed only when it matches a pattern. What happens otherwise is up
//! to you: pass the value through untouched, substitute a default, divert it
//! into another stage, or fail with a [`MismatchError`] that carries the
//! value for later recovery.
//!
//! There are two ways in:
//! - the [`pit!`] macro, which compiles a stage down to a native `match`
//!   over your own types;
//! - [`Stage`] and [`evaluate`], which run a stage built at runtime against a
//!   dynamic [`Value`].
//!
//! ## The `pit!` macro
//!
//! ```text
//! pit!( INPUT =>  [not] PATTERN [if GUARD] [=> TRANSFORM] [, OPTIONS] )  // lenient
//! pit!( INPUT =>! [not] PATTERN [if GUARD] [=> TRANSFORM] [, OPTIONS] )  // strict, Result
//! pit!( INPUT =>? [not] PATTERN [if GUARD] [=> TRANSFORM] [, OPTIONS] )  // strict, then `?`
//! ```
//!
//! | Option               | On                | Behavior                                   |
//! |----------------------|-------------------|--------------------------------------------|
//! | `do: ROUTE`          | match             | Pipe the stage output through `ROUTE`      |
//! | `else: ROUTE`        | mismatch          | Pipe the input through `ROUTE`             |
//! | `else_value: EXPR`   | mismatch          | Evaluate to `EXPR`                         |
//! | `tag: EXPR`          | raised mismatch   | Label the [`MismatchError`]                |
//! | `crate: PATH`        | always            | Path to this crate, default `::pit`        |
//!
//! A `ROUTE` is any of: `...` (pass through), `func`, `func(a, (), b)`,
//! `.method(args)`, `|x| closure`, `(Type)`, `(Type?)`, `(as Type)`.
//!
//! On mismatch `else` wins over `else_value`, which wins over raising, which
//! wins over passing the input through.
//!
//! Strict expansions name items of this crate as `::pit::...`. A crate that
//! depends on `pit` under another name passes that name with `crate:`.
//!
//! ### Derive a value
//!
//! ```
//! use pit::pit;
//!
//! let doubled = pit!(Ok::<i32, String>(11) => Ok(n) if n > 0 => n * 2, else_value: 0);
//! assert_eq!(doubled, 22);
//! ```
//!
//! ### Guard only
//!
//! Without `=> TRANSFORM` the input comes back unchanged. The pattern is
//! matched by reference, but captured names in the guard read like values.
//!
//! ```
//! use pit::pit;
//!
//! let name = String::from("ferris");
//! let checked = pit!(name =>! s if s.len() > 3);
//! assert_eq!(checked.unwrap(), "ferris");
//!
//! let short = pit!(String::from("rs") =>! s if s.len() > 3);
//! assert_eq!(short.unwrap_err().value, "rs");
//! ```
//!
//! ### Negated patterns
//!
//! ```
//! use pit::pit;
//!
//! let res: Result<u8, &str> = Ok(3);
//! assert_eq!(pit!(res =>! not Err(_)), Ok(Ok(3)));
//!
//! let err = pit!(Err::<u8, &str>("boom") =>! not Err(_)).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "did not expect piped value to match `Err(_)` but got `Err(\"boom\")`"
//! );
//! ```
//!
//! ### Routing and recovery
//!
//! ```
//! use pit::{pit, Recover};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Reply { Ok(i64), Error(i64) }
//!
//! let bumped = pit!(Reply::Error(22) => Reply::Ok(n) => n,
//!     else: |r| pit!(r => Reply::Error(x) => x + 1, else_value: 0));
//! assert_eq!(bumped, 23);
//!
//! fn positive(n: i64) -> Result<i64, pit::MismatchError<i64>> {
//!     let n = pit!(n =>? x if x > 0, tag: "positive");
//!     Ok(n * 10)
//! }
//! assert_eq!(positive(4).recover_tagged(), (None, 40));
//! assert_eq!(positive(-3).recover_tagged(), (Some("positive".into()), -3));
//! ```
//!
//! ## Runtime stages
//!
//! ```
//! use pit::{Pattern, Stage, Value};
//!
//! let stage = Stage::matching(Pattern::record([("tag", Pattern::literal("error"))]))
//!     .negate()
//!     .strict()
//!     .build()?;
//!
//! let cool = Value::record([("tag", Value::from("cool")), ("value", Value::from(22))]);
//! assert_eq!(stage.evaluate(cool.clone())?, cool);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub(crate) mod bindings;
pub(crate) mod error;
pub(crate) mod pattern;
pub(crate) mod pipeline;
pub mod stage;
pub(crate) mod value;

pub use bindings::Bindings;
pub use error::{MismatchError, StageError};
pub use pattern::Pattern;
pub use pipeline::{Pipeline, Recover};
pub use stage::{evaluate, evaluate_strict, Options, Outcome, Route, Stage, StageBuilder, StageForm};
pub use value::{Value, ValueKind};

/// Runs a piped value through a pattern-guarded stage.
///
/// See the [crate documentation](crate) for the grammar.
pub use pit_macros::pit;

#[doc(hidden)]
pub mod __private {
    use std::fmt::Debug;
    use std::marker::PhantomData;

    use crate::MismatchError;

    pub type Marker<V> = PhantomData<fn() -> V>;

    /// Captures the input type of a strict stage.
    pub fn marker<V>(_: &V) -> Marker<V> {
        PhantomData
    }

    pub fn ok<V: Debug, T>(_: Marker<V>, value: T) -> Result<T, MismatchError<V>> {
        Ok(value)
    }
}
