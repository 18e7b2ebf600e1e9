//! Generic expression traversal.
//!
//! A [`Folder`] rebuilds an expression bottom-up. Hooks default to the
//! identity; implementors override only the node kinds they rewrite.
//! [`Folder::fold_arg`] writes into an output list so a single argument may
//! expand into several (variadic splicing) or none.

use crate::expr::{Arg, Call, Expr};
use crate::value::Value;

pub trait Folder {
    type Error;

    fn fold_literal(&mut self, value: &Value) -> Result<Expr, Self::Error> {
        Ok(Expr::Literal(value.clone()))
    }

    fn fold_symbol(&mut self, name: &str) -> Result<Expr, Self::Error> {
        Ok(Expr::Symbol(name.to_string()))
    }

    fn fold_ellipsis(&mut self) -> Result<Expr, Self::Error> {
        Ok(Expr::Ellipsis)
    }

    fn fold_call(&mut self, call: &Call) -> Result<Expr, Self::Error> {
        walk_call(self, call)
    }

    fn fold_arg(&mut self, arg: &Arg, out: &mut Vec<Arg>) -> Result<(), Self::Error> {
        out.push(Arg {
            name: arg.name.clone(),
            value: fold_expr(self, &arg.value)?,
        });
        Ok(())
    }
}

pub fn fold_expr<F: Folder + ?Sized>(folder: &mut F, expr: &Expr) -> Result<Expr, F::Error> {
    match expr {
        Expr::Literal(v) => folder.fold_literal(v),
        Expr::Symbol(name) => folder.fold_symbol(name),
        Expr::Ellipsis => folder.fold_ellipsis(),
        Expr::Call(call) => folder.fold_call(call),
    }
}

/// Default recursion into a call: operator first, then each argument in order.
pub fn walk_call<F: Folder + ?Sized>(folder: &mut F, call: &Call) -> Result<Expr, F::Error> {
    let op = fold_expr(folder, &call.op)?;
    let mut args = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        folder.fold_arg(arg, &mut args)?;
    }
    Ok(Expr::call(op, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;

    struct Rename;

    impl Folder for Rename {
        type Error = Infallible;

        fn fold_symbol(&mut self, name: &str) -> Result<Expr, Infallible> {
            Ok(Expr::sym(if name == "a" { "b" } else { name }))
        }
    }

    struct DropEllipsis;

    impl Folder for DropEllipsis {
        type Error = Infallible;

        fn fold_arg(&mut self, arg: &Arg, out: &mut Vec<Arg>) -> Result<(), Infallible> {
            if arg.value != Expr::Ellipsis {
                out.push(Arg {
                    name: arg.name.clone(),
                    value: fold_expr(self, &arg.value)?,
                });
            }
            Ok(())
        }
    }

    #[test]
    fn identity_fold_preserves_expression() {
        struct Id;
        impl Folder for Id {
            type Error = Infallible;
        }
        let e = Expr::call(
            Expr::sym("f"),
            vec![
                Arg::named("n", Expr::lit(Value::int(1))),
                Arg::positional(Expr::Ellipsis),
            ],
        );
        assert_eq!(fold_expr(&mut Id, &e).unwrap(), e);
    }

    #[test]
    fn symbols_are_rewritten_everywhere_including_operator() {
        let e = Expr::call(Expr::sym("a"), vec![Arg::positional(Expr::sym("a"))]);
        let out = fold_expr(&mut Rename, &e).unwrap();
        assert_eq!(
            out,
            Expr::call(Expr::sym("b"), vec![Arg::positional(Expr::sym("b"))])
        );
    }

    #[test]
    fn fold_arg_can_remove_arguments() {
        let e = Expr::apply("g", [Expr::sym("x"), Expr::Ellipsis, Expr::sym("y")]);
        let out = fold_expr(&mut DropEllipsis, &e).unwrap();
        assert_eq!(out, Expr::apply("g", [Expr::sym("x"), Expr::sym("y")]));
    }
}
