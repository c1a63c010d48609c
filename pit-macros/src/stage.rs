use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::ext::IdentExt;
use syn::parse::*;
use syn::spanned::Spanned;
use syn::*;

use crate::utils::*;

macro_rules! stage_const {
    (strict) => { Token![!] };
    (try) => { Token![?] };
}

/// How a stage reports a mismatch it cannot otherwise resolve.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub enum StageMode {
    // =>
    Lenient,
    // =>!
    Strict,
    // =>?
    Try,
}

impl StageMode {
    fn raises(self) -> bool {
        self != StageMode::Lenient
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteOp {
    NoOp,
    FnCall(ExprCall),
    MethodCall(ExprCall),
    Closure(ExprClosure),
    TypeFrom(ExprPath),
    TypeTryFrom(ExprPath),
    TypeAs(Type),
}

impl Parse for RouteOp {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.peek(Token![...]) {
            input.parse::<Token![...]>()?;
            return Ok(RouteOp::NoOp);
        }

        let lookahead = input.lookahead1();

        // Method call
        if lookahead.peek(Token![.]) {
            let _: Token![.] = input.parse()?;
            Ok(Self::MethodCall(parse_reduced_fn(input)?))
        }
        // Type conversion
        else if lookahead.peek(syn::token::Paren) {
            let inside;
            parenthesized!(inside in input);
            let inside_lookahead = inside.lookahead1();
            if inside_lookahead.peek(Token![as]) {
                let _: Token![as] = inside.parse()?;
                Ok(Self::TypeAs(inside.parse()?))
            }
            else if inside_lookahead.peek(syn::Ident) {
                let ty: ExprPath = inside.parse()?;

                if inside.peek(Token![?]) {
                    let _: Token![?] = inside.parse()?;
                    Ok(Self::TypeTryFrom(ty))
                }
                else {
                    Ok(Self::TypeFrom(ty))
                }
            }
            else {
                Err(inside_lookahead.error())
            }
        }
        else if lookahead.peek(syn::Ident) {
            Ok(Self::FnCall(parse_reduced_fn(input)?))
        }
        else if lookahead.peek(Token![|]) || lookahead.peek(Token![move]) {
            Ok(Self::Closure(input.parse()?))
        }
        else {
            Err(lookahead.error())
        }
    }
}

#[derive(Default)]
struct StageOptions {
    on_success: Option<RouteOp>,
    on_mismatch: Option<RouteOp>,
    mismatch_default: Option<Expr>,
    tag: Option<(Ident, Expr)>,
    krate: Option<Path>,
}

impl StageOptions {
    fn parse_one(&mut self, input: ParseStream) -> Result<()> {
        // `do` and `else` are keywords
        let key = Ident::parse_any(input)?;
        input.parse::<Token![:]>()?;

        let duplicate = || Error::new(key.span(), format!("`{}` given more than once", key));
        match key.to_string().as_str() {
            "do" => {
                if self.on_success.replace(input.parse()?).is_some() {
                    return Err(duplicate());
                }
            },
            "else" => {
                if self.on_mismatch.replace(input.parse()?).is_some() {
                    return Err(duplicate());
                }
            },
            "else_value" => {
                if self.mismatch_default.replace(input.parse()?).is_some() {
                    return Err(duplicate());
                }
            },
            "tag" => {
                if self.tag.replace((key.clone(), input.parse()?)).is_some() {
                    return Err(duplicate());
                }
            },
            "crate" => {
                if self.krate.replace(input.call(Path::parse_mod_style)?).is_some() {
                    return Err(duplicate());
                }
            },
            other => {
                return Err(Error::new(
                    key.span(),
                    format!(
                        "unknown option `{}`, expected one of `do`, `else`, `else_value`, `tag`, `crate`",
                        other
                    ),
                ));
            },
        }
        Ok(())
    }
}

pub struct MacroInput {
    initial:   Expr,
    mode:      StageMode,
    negated:   bool,
    pattern:   Pat,
    guard:     Option<Expr>,
    transform: Option<Expr>,
    options:   StageOptions,
}

/// `not` starts a negated pattern unless it is itself the whole pattern.
fn peek_not(input: ParseStream) -> bool {
    let fork = input.fork();
    match fork.call(Ident::parse_any) {
        Ok(ident) if ident == "not" => {
            !(fork.is_empty()
                || fork.peek(Token![,])
                || fork.peek(Token![if])
                || fork.peek(Token![=>])
                || fork.peek(Token![@])
                || fork.peek(Token![|]))
        },
        _ => false,
    }
}

impl Parse for MacroInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let initial: Expr = input.parse()?;
        input.parse::<Token![=>]>()?;

        let mode = if input.peek(stage_const!(strict)) {
            input.parse::<stage_const!(strict)>()?;
            StageMode::Strict
        }
        else if input.peek(stage_const!(try)) {
            input.parse::<stage_const!(try)>()?;
            StageMode::Try
        }
        else {
            StageMode::Lenient
        };

        let negated = peek_not(input);
        if negated {
            input.call(Ident::parse_any)?;
        }

        let pattern = Pat::parse_multi_with_leading_vert(input)?;

        let guard = if input.peek(Token![if]) {
            input.parse::<Token![if]>()?;
            Some(input.parse()?)
        }
        else {
            None
        };

        let transform = if input.peek(Token![=>]) {
            let arrow = input.parse::<Token![=>]>()?;
            if negated {
                return Err(Error::new(arrow.span(), "a negated pattern cannot derive a value"));
            }
            Some(input.parse()?)
        }
        else {
            None
        };

        let mut options = StageOptions::default();
        while input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            if input.is_empty() {
                break;
            }
            options.parse_one(input)?;
        }

        if !input.is_empty() {
            return Err(input.error("expected `,` or the end of the stage"));
        }

        if let (Some((key, _)), false) = (&options.tag, mode.raises()) {
            return Err(Error::new(
                key.span(),
                "`tag` labels raised mismatches; use `=>!` or `=>?`",
            ));
        }

        Ok(Self { initial, mode, negated, pattern, guard, transform, options })
    }
}

impl MacroInput {
    /// Path the expansion reaches the runtime crate through.
    fn krate(&self) -> Path {
        match &self.options.krate {
            Some(path) => path.clone(),
            None => parse_quote!(::pit),
        }
    }

    /// Text of the pattern as written, shown in mismatch messages.
    fn describe(&self) -> String {
        let pattern = render_tokens(self.pattern.to_token_stream());
        match &self.guard {
            Some(guard) => format!("{} if {}", pattern, render_tokens(guard.to_token_stream())),
            None => pattern,
        }
    }

    /// Strict stages build `Ok` through the input marker, so the error type
    /// is known even when no branch can raise.
    fn wrap_ok(&self, expr: Expr) -> Expr {
        if self.mode.raises() {
            let krate = self.krate();
            let marker = hidden_ident("__pit_marker");
            parse_quote!(#krate::__private::ok(#marker, #expr))
        }
        else {
            expr
        }
    }

    fn success(&mut self, output: Expr) -> Result<Expr> {
        let output = match self.options.on_success.take() {
            Some(route) => apply_op(route, output)?,
            None => output,
        };
        Ok(self.wrap_ok(output))
    }

    /// Precedence: `else`, then `else_value`, then raising, then the
    /// input itself.
    fn fallback(&mut self, mismatched: Ident) -> Result<Expr> {
        let value = ident_expr(mismatched);
        if let Some(route) = self.options.on_mismatch.take() {
            let routed = apply_op(route, value)?;
            return Ok(self.wrap_ok(routed));
        }
        if let Some(default) = self.options.mismatch_default.take() {
            return Ok(self.wrap_ok(default));
        }
        if self.mode.raises() {
            let krate = self.krate();
            let text = self.describe();
            let negated = self.negated;
            let mut err: Expr = parse_quote!(
                #krate::MismatchError::debug(#text, #value, #negated)
            );
            if let Some((_, tag)) = self.options.tag.take() {
                err = call_method_expr(err, create_ident("with_tag"), [tag]);
            }
            return Ok(parse_quote!(::core::result::Result::Err(#err)));
        }
        Ok(value)
    }

    pub fn run(mut self) -> Result<Expr> {
        let input = hidden_ident("__pit_input");
        let output = hidden_ident("__pit_output");
        let mismatched = hidden_ident("__pit_mismatch");
        let initial = self.initial.clone();
        let pattern = self.pattern.clone();

        let body: TokenStream = match self.transform.take() {
            // Matched by value: the transform owns the bindings.
            Some(transform) => {
                let guard = self.guard.as_ref().map(|g| quote!(if #g));
                let success = self.success(transform)?;
                let fallback = self.fallback(mismatched.clone())?;
                quote! {
                    #[allow(unreachable_patterns)]
                    let #output = match #input {
                        #pattern #guard => #success,
                        #mismatched => #fallback,
                    };
                }
            },
            // Matched by reference: the input itself is the result.
            None => {
                let matched = hidden_ident("__pit_matched");
                let guard = self.guard.clone().map(|mut g| {
                    deref_bindings(&mut g, &pattern_bindings(&pattern));
                    quote!(if #g)
                });
                let hit = if self.negated { quote!(!#matched) } else { quote!(#matched) };
                let success = self.success(ident_expr(input.clone()))?;
                let fallback = self.fallback(mismatched.clone())?;
                quote! {
                    #[allow(unreachable_patterns, unused_variables)]
                    let #matched = match &#input {
                        #pattern #guard => true,
                        _ => false,
                    };
                    let #output = if #hit {
                        #success
                    } else {
                        let #mismatched = #input;
                        #fallback
                    };
                }
            },
        };

        let result = match self.mode {
            StageMode::Try => quote!(#output?),
            _ => quote!(#output),
        };
        let krate = self.krate();
        let marker = self.mode.raises().then(|| {
            let marker = hidden_ident("__pit_marker");
            quote!(let #marker = #krate::__private::marker(&#input);)
        });

        parse2(quote! {
            {
                let #input = #initial;
                #marker
                #body
                #result
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(src: &str) -> Result<String> {
        let input: MacroInput = parse_str(src)?;
        Ok(input.run()?.to_token_stream().to_string())
    }

    fn error(src: &str) -> String {
        match parse_str::<MacroInput>(src) {
            Ok(_) => panic!("`{}` parsed", src),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn parses_the_full_form() {
        let input: MacroInput = parse_str(
            "value =>! Ok(n) if n > 0 => n * 2, do: |v| v + 1, else: ..., else_value: 0, tag: \"t\","
        ).unwrap();
        assert_eq!(input.mode, StageMode::Strict);
        assert!(!input.negated);
        assert!(input.guard.is_some());
        assert!(input.transform.is_some());
        assert!(matches!(input.options.on_success, Some(RouteOp::Closure(_))));
        assert_eq!(input.options.on_mismatch, Some(RouteOp::NoOp));
        assert!(input.options.mismatch_default.is_some());
        assert!(input.options.tag.is_some());
        assert_eq!(input.describe(), "Ok(n) if n > 0");
    }

    #[test]
    fn parses_routes() {
        let route = |s: &str| parse_str::<RouteOp>(s).unwrap();
        assert!(matches!(route("..."), RouteOp::NoOp));
        assert!(matches!(route(".to_string()"), RouteOp::MethodCall(_)));
        assert!(matches!(route("format_it(\"{}\", ())"), RouteOp::FnCall(_)));
        assert!(matches!(route("(String)"), RouteOp::TypeFrom(_)));
        assert!(matches!(route("(u8?)"), RouteOp::TypeTryFrom(_)));
        assert!(matches!(route("(as f64)"), RouteOp::TypeAs(_)));
        assert!(matches!(route("move |x| x"), RouteOp::Closure(_)));
    }

    #[test]
    fn not_is_a_keyword_only_before_a_pattern() {
        let negated: MacroInput = parse_str("v => not Err(_)").unwrap();
        assert!(negated.negated);
        assert_eq!(negated.describe(), "Err(_)");

        let bound: MacroInput = parse_str("v => not if not > 1").unwrap();
        assert!(!bound.negated);
        assert_eq!(bound.describe(), "not if not > 1");
    }

    #[test]
    fn modes() {
        let mode = |s: &str| parse_str::<MacroInput>(s).unwrap().mode;
        assert_eq!(mode("v => x"), StageMode::Lenient);
        assert_eq!(mode("v =>! x"), StageMode::Strict);
        assert_eq!(mode("v =>? x"), StageMode::Try);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(error("v => not Err(e) => e"), "a negated pattern cannot derive a value");
        assert!(error("v => x, otherwise: 1").starts_with("unknown option `otherwise`"));
        assert_eq!(error("v => x, else_value: 1, else_value: 2"), "`else_value` given more than once");
        assert_eq!(error("v => x, tag: \"t\""), "`tag` labels raised mismatches; use `=>!` or `=>?`");
    }

    #[test]
    fn derive_form_matches_by_value() {
        let out = expand("v => Some(n) => n + 1, else_value: 0").unwrap();
        assert!(out.contains("match __pit_input"));
        assert!(!out.contains("match & __pit_input"));
        assert!(out.contains("Some (n) => n + 1"));
        assert!(out.contains("__pit_mismatch => 0"));
    }

    #[test]
    fn guard_form_matches_by_reference() {
        let out = expand("v =>! Some(n) if n > 0").unwrap();
        assert!(out.contains("match & __pit_input"));
        assert!(out.contains("if (* n) > 0"));
        assert!(out.contains(":: pit :: MismatchError :: debug (\"Some(n) if n > 0\" , __pit_mismatch , false)"));
    }

    #[test]
    fn negated_form_flips_the_test() {
        let out = expand("v =>! not None").unwrap();
        assert!(out.contains("if ! __pit_matched"));
        assert!(out.contains("(\"None\" , __pit_mismatch , true)"));
    }

    #[test]
    fn strict_ok_goes_through_the_marker() {
        let out = expand("v =>! Some(n) => n, else_value: 0").unwrap();
        assert!(out.contains("let __pit_marker = :: pit :: __private :: marker (& __pit_input) ;"));
        assert!(out.contains(":: pit :: __private :: ok (__pit_marker , n)"));
        assert!(out.contains(":: pit :: __private :: ok (__pit_marker , 0)"));

        let lenient = expand("v => Some(n) => n, else_value: 0").unwrap();
        assert!(!lenient.contains("__pit_marker"));
    }

    #[test]
    fn crate_path_can_be_overridden() {
        let out = expand("v =>! Some(n) if n > 1, crate: ::renamed::inner").unwrap();
        assert!(out.contains(":: renamed :: inner :: __private :: marker"));
        assert!(out.contains(":: renamed :: inner :: MismatchError :: debug"));
        assert!(!out.contains(":: pit ::"));

        assert!(error("v =>! x, crate: a, crate: b").starts_with("`crate` given more than once"));
    }

    #[test]
    fn try_mode_propagates() {
        let out = expand("v =>? Some(_), tag: \"lookup\"").unwrap();
        assert!(out.contains(". with_tag (\"lookup\")"));
        assert!(out.contains("__pit_output ?"));
    }

    #[test]
    fn routes_feed_their_side() {
        let out = expand("v => Ok(n) => n, do: .to_string(), else: fallback(1, ())").unwrap();
        assert!(out.contains("n . to_string ()"));
        assert!(out.contains("fallback (1 , __pit_mismatch)"));
    }
}
