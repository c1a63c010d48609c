//! # `pit-macros` – the `pit!` procedural macro
//!
//! This crate holds the code generator behind `pit!`. Use it through the
//! `pit` crate, which re-exports the macro together with the
//! `MismatchError` type the expansion refers to.
//!
//! A stage is written as a pipe, a pattern and options:
//!
//! | Operator | Mode    | Expression type                         |
//! |----------|---------|-----------------------------------------|
//! | `=> `    | Lenient | the output value                        |
//! | `=>!`    | Strict  | `Result<Output, MismatchError<Input>>`  |
//! | `=>?`    | Try     | the output value, after applying `?`    |
//!
//! The pattern may be prefixed with `not`, followed by `if GUARD`, and
//! followed by `=> TRANSFORM`. Options come after a comma:
//!
//! | Option             | Operation                                         |
//! |--------------------|---------------------------------------------------|
//! | `do: ROUTE`        | Pipe the stage output through `ROUTE`             |
//! | `else: ROUTE`      | Pipe a mismatched input through `ROUTE`           |
//! | `else_value: EXPR` | Use `EXPR` for a mismatched input                 |
//! | `tag: EXPR`        | Label the raised `MismatchError` (strict only)    |
//! | `crate: PATH`      | Reach the `pit` crate through `PATH`              |
//!
//! A `ROUTE` is one of:
//!
//! | Syntax                 | Operation                                       |
//! |------------------------|-------------------------------------------------|
//! | `func` or `func()`     | Call the function with the value                |
//! | `func(arg1, (), arg3)` | Substitute `()` with the value                  |
//! | `.method(args)`        | Call a method on the value                      |
//! | `\|x\| expr`           | Apply a closure                                 |
//! | `(Type)`               | `Type::from(value)`                             |
//! | `(Type?)`              | `Type::try_from(value)`                         |
//! | `(as Type)`            | Convert using `as`                              |
//! | `...`                  | Pass the value as-is                            |
//!
//! ## Expansion
//!
//! `pit!(input =>! Some(n) if n > 0 => n * 2, else_value: 0)` becomes,
//! roughly:
//!
//! ```text
//! {
//!     let input = input;
//!     let output = match input {
//!         Some(n) if n > 0 => Ok(n * 2),
//!         mismatch => Ok(0),
//!     };
//!     output
//! }
//! ```
//!
//! Without a transform the pattern is matched through a reference and the
//! input itself is returned; uses of the bound names in the guard are
//! dereferenced so the guard is written as it would be for owned values.

extern crate proc_macro;
pub(crate) mod stage;
pub(crate) mod utils;

use proc_macro::TokenStream;
use syn::parse_macro_input;

use crate::stage::MacroInput;

#[proc_macro]
pub fn pit(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as MacroInput);

    match input.run() {
        Ok(expr) => quote::quote! { #expr }.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
