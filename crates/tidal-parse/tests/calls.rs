use pretty_assertions::assert_eq;
use tidal_ast::{Arg, Expr, Value};
use tidal_parse::parse_expr;

fn num(v: f64) -> Expr {
    Expr::lit(Value::double(v))
}

#[test]
fn call_binds_tighter_than_infix() {
    // (f(1)) + 2
    let e = parse_expr("f(1) + 2").unwrap();
    assert_eq!(
        e,
        Expr::apply("+", [Expr::apply("f", [num(1.0)]), num(2.0)])
    );
    // f((1 + 2))
    let e = parse_expr("f(1 + 2)").unwrap();
    assert_eq!(e, Expr::apply("f", [Expr::apply("+", [num(1.0), num(2.0)])]));
}

#[test]
fn named_arguments_keep_their_names() {
    let e = parse_expr("mean(x, na.rm = TRUE)").unwrap();
    assert_eq!(
        e,
        Expr::call(
            Expr::sym("mean"),
            vec![
                Arg::positional(Expr::sym("x")),
                Arg::named("na.rm", Expr::lit(Value::lgl(true))),
            ]
        )
    );
}

#[test]
fn ellipsis_is_its_own_node() {
    let e = parse_expr("g(a, ...)").unwrap();
    assert_eq!(e, Expr::apply("g", [Expr::sym("a"), Expr::Ellipsis]));
}

#[test]
fn chained_calls() {
    let e = parse_expr("f(g(1), h(2, 3))").unwrap();
    let call = e.as_call().expect("top-level call");
    assert!(call.args[0].value.call_to("g").is_some());
    assert!(call.args[1].value.call_to("h").is_some());
}

#[test]
fn calling_a_call_result() {
    let e = parse_expr("make()(1)").unwrap();
    let call = e.as_call().expect("outer call");
    assert!(call.op.call_to("make").is_some());
}

#[test]
fn newlines_inside_parentheses_are_ignored() {
    let e = parse_expr("f(a,\n  b = 2\n)").unwrap();
    assert_eq!(e.to_string(), "f(a, b = 2)");
}

#[test]
fn parentheses_are_preserved_as_written() {
    let e = parse_expr("(a + b) * c").unwrap();
    let call = e.call_to("*").expect("product");
    assert!(call.args[0].value.call_to("(").is_some());
    assert_eq!(e.to_string(), "(a + b) * c");
}
