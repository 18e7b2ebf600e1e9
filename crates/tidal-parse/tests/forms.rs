use pretty_assertions::assert_eq;
use tidal_ast::{Arg, Expr, Value};
use tidal_parse::{parse_arg, parse_expr, parse_program};

#[test]
fn function_literal_encodes_formals_as_arguments() {
    let e = parse_expr("function(x, y = 2, ...) x + y").unwrap();
    assert_eq!(
        e,
        Expr::call(
            Expr::sym("function"),
            vec![
                Arg::positional(Expr::sym("x")),
                Arg::named("y", Expr::lit(Value::double(2.0))),
                Arg::positional(Expr::Ellipsis),
                Arg::positional(Expr::apply("+", [Expr::sym("x"), Expr::sym("y")])),
            ]
        )
    );
}

#[test]
fn backslash_lambda_is_a_function() {
    let e = parse_expr("\\(x) x").unwrap();
    assert!(e.call_to("function").is_some());
}

#[test]
fn repeated_formals_are_rejected() {
    let err = parse_expr("function(x, x) x").unwrap_err().to_string();
    assert!(err.contains("repeated formal argument 'x'"), "{}", err);
}

#[test]
fn assignment_is_right_associative() {
    let e = parse_expr("a <- b <- 1").unwrap();
    assert_eq!(
        e,
        Expr::apply(
            "<-",
            [
                Expr::sym("a"),
                Expr::apply("<-", [Expr::sym("b"), Expr::lit(Value::double(1.0))]),
            ]
        )
    );
}

#[test]
fn string_assignment_target_becomes_symbol() {
    let e = parse_expr("\"a\" <- 1").unwrap();
    assert_eq!(e.to_string(), "a <- 1");
}

#[test]
fn if_else_inside_block_across_lines() {
    let e = parse_expr("{\n  if (x > 1) \"big\"\n  else \"small\"\n}").unwrap();
    assert_eq!(e.to_string(), "{ if (x > 1) \"big\" else \"small\" }");
}

#[test]
fn program_splits_on_newlines_and_semicolons() {
    let prog = parse_program("<mem>", "a <- 1; b <- 2\n\n# comment\na + b\n").unwrap();
    assert_eq!(prog.len(), 3);
    assert_eq!(prog[2].to_string(), "a + b");
}

#[test]
fn block_bodies_span_lines() {
    let prog = parse_program(
        "<mem>",
        "f <- function(x) {\n  y <- x * 2\n  y + 1\n}\nf(3)\n",
    )
    .unwrap();
    assert_eq!(prog.len(), 2);
    assert_eq!(prog[0].to_string(), "f <- function(x) { y <- x * 2; y + 1 }");
}

#[test]
fn parse_arg_reads_optional_name() {
    let a = parse_arg("x2 = x * x").unwrap();
    assert_eq!(a.name.as_deref(), Some("x2"));
    let a = parse_arg("x == 4").unwrap();
    assert_eq!(a.name, None);
    assert_eq!(a.value.to_string(), "x == 4");
}

#[test]
fn missing_value_literals() {
    assert_eq!(parse_expr("NA").unwrap(), Expr::lit(Value::Logical(vec![None])));
    assert_eq!(parse_expr("NULL").unwrap(), Expr::lit(Value::Null));
    assert_eq!(parse_expr("7L").unwrap(), Expr::lit(Value::int(7)));
}
