use std::collections::HashSet;

use parse::ParseStream;
use proc_macro2::{Delimiter, Ident, Spacing, TokenStream, TokenTree};
use punctuated::Punctuated;
use spanned::Spanned;
use syn::visit::Visit;
use syn::visit_mut::VisitMut;
use syn::*;
use token::Comma;

use crate::stage::RouteOp;

pub fn call_expr<I: IntoIterator<Item=Expr>, C: Into<Expr>>(call: C, args: I) -> Expr {
    let fn_call = ExprCall {
        attrs: vec![],
        func: Box::new(call.into()),
        paren_token: Default::default(),
        args: Punctuated::from_iter(args),
    };
    fn_call.into()
}

pub fn call_method_expr<I: IntoIterator<Item=Expr>>(receiver: Expr, fun: Ident, args: I) -> Expr {
    ExprMethodCall {
        attrs:       vec![],
        receiver:    Box::new(receiver),
        method:      fun,
        turbofish:   None,
        args:        Punctuated::from_iter(args),
        paren_token: Default::default(),
        dot_token:   Default::default(),
    }.into()
}

pub fn paren_expr(expr: Expr) -> Expr {
    ExprParen {
        attrs:       vec![],
        paren_token: Default::default(),
        expr:        Box::new(expr),
    }.into()
}

pub fn create_ident(value: &str) -> Ident {
    Ident::new(value, proc_macro2::Span::call_site())
}

/// Identifiers the expansion introduces. They are invisible to user code.
pub fn hidden_ident(value: &str) -> Ident {
    Ident::new(value, proc_macro2::Span::mixed_site())
}

pub fn ident_expr(ident: Ident) -> Expr {
    path_to_expr(Path::from(ident))
}

/// Parenthesizes `expr` unless it already binds tighter than a method call.
pub fn atomic_expr(expr: Expr) -> Expr {
    match expr {
        Expr::Path(_) | Expr::Lit(_) | Expr::Paren(_) | Expr::Tuple(_) | Expr::Array(_)
        | Expr::Call(_) | Expr::MethodCall(_) | Expr::Field(_) | Expr::Index(_)
        | Expr::Macro(_) | Expr::Block(_) | Expr::Try(_) => expr,
        _ => paren_expr(expr),
    }
}

pub fn path_to_expr(path: Path) -> Expr {
    Expr::Path(ExprPath {
        attrs: vec![],
        qself: None,
        path,
    })
}

pub fn add_to_path(path: &mut Path, ident: &str) {
    path.segments.push(PathSegment::from(create_ident(ident)));
}

pub fn replace_empty_paren_closure(v: &Expr) -> bool {
    match v {
        Expr::Tuple(e) => e.elems.is_empty(),
        _ => false,
    }
}

pub fn substitute_args(
    args: &mut Punctuated<Expr, Comma>,
    sub: Expr,
    which: fn(&Expr) -> bool,
) {
    match args.iter_mut().find(|arg| which(arg)) {
        Some(slot) => *slot = sub,
        None => args.insert(0, sub),
    }
}

pub fn try_get_call_ident(expr: &ExprCall) -> Result<Ident> {
    match expr.func.as_ref() {
        Expr::Path(path) => {
            path
                .path
                .get_ident()
                .cloned()
                .ok_or(Error::new(expr.func.span(), "Expected ident"))
        },
        _ => Err(Error::new(expr.func.span(), "not a function")),
    }
}

pub fn parse_reduced_fn(input: ParseStream) -> Result<ExprCall> {
    let path: Path = input.parse()?;
    let args = if input.peek(syn::token::Paren) {
        let args;
        parenthesized!(args in input);
        Punctuated::<Expr, Token![,]>::parse_terminated(&args)?
    }
    else {
        Default::default()
    };

    Ok(ExprCall {
        attrs: vec![],
        func: Box::new(path_to_expr(path)),
        paren_token: Default::default(),
        args,
    })
}

/// Feeds `expr` into a route.
pub fn apply_op(route: RouteOp, expr: Expr) -> Result<Expr> {
    use RouteOp::*;
    match route {
        NoOp => Ok(expr),
        FnCall(mut call) => {
            substitute_args(
                &mut call.args,
                expr,
                replace_empty_paren_closure
            );
            Ok(call.into())
        },
        MethodCall(call) => {
            let ident = try_get_call_ident(&call)?;
            Ok(call_method_expr(atomic_expr(expr), ident, call.args))
        },
        Closure(call) => {
            Ok(call_expr(paren_expr(call.into()), [expr]))
        },
        TypeFrom(mut ty) => {
            add_to_path(&mut ty.path, "from");
            Ok(call_expr(path_to_expr(ty.path), vec![expr]))
        },
        TypeTryFrom(mut ty) => {
            add_to_path(&mut ty.path, "try_from");
            Ok(call_expr(path_to_expr(ty.path), vec![expr]))
        },
        TypeAs(ty) => {
            let as_call = ExprCast {
                attrs:    vec![],
                expr:     Box::new(atomic_expr(expr)),
                as_token: Default::default(),
                ty:       Box::new(ty),
            };
            Ok(Expr::Cast(as_call))
        },
    }
}

/// Names a pattern binds to references when matched through one.
/// Capitalized identifiers are taken to be unit variants or constants, not
/// bindings. Names under a `&` pattern or declared `ref` are left out: the
/// first already bind values, the second bind references either way.
pub fn pattern_bindings(pat: &Pat) -> HashSet<Ident> {
    struct Collector(HashSet<Ident>);

    impl<'ast> Visit<'ast> for Collector {
        fn visit_pat_ident(&mut self, node: &'ast PatIdent) {
            let name = node.ident.to_string();
            if node.by_ref.is_none() && name.starts_with(|c: char| c.is_lowercase() || c == '_') {
                self.0.insert(node.ident.clone());
            }
            visit::visit_pat_ident(self, node);
        }

        fn visit_pat_reference(&mut self, _: &'ast PatReference) {}
    }

    let mut collector = Collector(HashSet::new());
    collector.visit_pat(pat);
    collector.0
}

/// Every name a pattern introduces, whatever its binding mode.
fn shadowing_names(pat: &Pat) -> HashSet<Ident> {
    struct Collector(HashSet<Ident>);

    impl<'ast> Visit<'ast> for Collector {
        fn visit_pat_ident(&mut self, node: &'ast PatIdent) {
            self.0.insert(node.ident.clone());
            visit::visit_pat_ident(self, node);
        }
    }

    let mut collector = Collector(HashSet::new());
    collector.visit_pat(pat);
    collector.0
}

/// Rewrites uses of `names` in a guard to `(*name)`.
///
/// A pattern matched through a reference binds references; after this the
/// guard reads the same as it would against an owned value.
pub fn deref_bindings(guard: &mut Expr, names: &HashSet<Ident>) {
    struct Deref<'a>(&'a HashSet<Ident>);

    impl Deref<'_> {
        fn bound(&self, expr: &Expr) -> Option<Ident> {
            match expr {
                Expr::Path(p) if p.qself.is_none() => {
                    p.path.get_ident().filter(|i| self.0.contains(*i)).cloned()
                },
                _ => None,
            }
        }
    }

    impl VisitMut for Deref<'_> {
        fn visit_expr_mut(&mut self, node: &mut Expr) {
            match self.bound(node) {
                Some(ident) => *node = parse_quote!((*#ident)),
                None => visit_mut::visit_expr_mut(self, node),
            }
        }

        fn visit_field_value_mut(&mut self, node: &mut FieldValue) {
            // `Foo { x }` must be spelled out once `x` is rewritten.
            if node.colon_token.is_none() && self.bound(&node.expr).is_some() {
                node.colon_token = Some(Default::default());
            }
            visit_mut::visit_field_value_mut(self, node);
        }

        fn visit_expr_closure_mut(&mut self, node: &mut ExprClosure) {
            let shadowed: HashSet<Ident> = node.inputs.iter().flat_map(shadowing_names).collect();
            let captured: HashSet<Ident> = self.0.difference(&shadowed).cloned().collect();
            Deref(&captured).visit_expr_mut(&mut node.body);
        }
    }

    Deref(names).visit_expr_mut(guard);
}

/// Prints tokens the way they would be written by hand, for messages.
pub fn render_tokens(tokens: TokenStream) -> String {
    let mut out = String::new();
    render_into(tokens, &mut out);
    out
}

#[derive(Clone, PartialEq)]
enum Prev {
    Start,
    Operand,
    // glued punctuation so far, and whether it stands in unary position
    Punct(String, bool),
    PunctDone(String, bool),
}

fn render_into(tokens: TokenStream, out: &mut String) {
    let mut prev = Prev::Start;
    for tree in tokens {
        let space = match (&prev, &tree) {
            (Prev::Start, _) => false,
            // joint punctuation, or a lifetime tick
            (Prev::Punct(..), _) => false,
            (Prev::PunctDone(seq, _), TokenTree::Punct(p)) if seq == "," && p.as_char() == '.' => true,
            (_, TokenTree::Punct(p)) if matches!(p.as_char(), ',' | ';' | '.' | '?') => false,
            (_, TokenTree::Punct(p)) if p.as_char() == ':' => false,
            // macro bang
            (Prev::Operand, TokenTree::Punct(p)) if p.as_char() == '!' && p.spacing() == Spacing::Alone => false,
            (Prev::PunctDone(seq, unary), _) => {
                let glued = matches!(seq.as_str(), "." | ".." | "..=" | "::" | "'" | "!")
                    || (*unary && matches!(seq.as_str(), "&" | "-" | "*"));
                !glued
            },
            (Prev::Operand, TokenTree::Group(g)) => g.delimiter() == Delimiter::Brace,
            _ => true,
        };
        if space {
            out.push(' ');
        }

        prev = match tree {
            TokenTree::Ident(ident) => {
                out.push_str(&ident.to_string());
                Prev::Operand
            },
            TokenTree::Literal(lit) => {
                out.push_str(&lit.to_string());
                Prev::Operand
            },
            TokenTree::Group(group) => {
                let (open, close) = match group.delimiter() {
                    Delimiter::Parenthesis => ("(", ")"),
                    Delimiter::Bracket => ("[", "]"),
                    Delimiter::Brace => ("{ ", " }"),
                    Delimiter::None => ("", ""),
                };
                if group.delimiter() == Delimiter::Brace && group.stream().is_empty() {
                    out.push_str("{}");
                } else {
                    out.push_str(open);
                    render_into(group.stream(), out);
                    out.push_str(close);
                }
                Prev::Operand
            },
            TokenTree::Punct(punct) => {
                let (mut seq, unary) = match prev {
                    Prev::Punct(seq, unary) => (seq, unary),
                    Prev::Operand => (String::new(), false),
                    _ => (String::new(), true),
                };
                seq.push(punct.as_char());
                match punct.spacing() {
                    Spacing::Joint => Prev::Punct(seq, unary),
                    Spacing::Alone => Prev::PunctDone(seq, unary),
                }
            },
        };
        if let Prev::Punct(seq, _) | Prev::PunctDone(seq, _) = &prev {
            if let Some(c) = seq.chars().last() {
                out.push(c);
            }
        }
    }
}
