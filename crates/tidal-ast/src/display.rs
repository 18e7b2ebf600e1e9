// Surface-syntax rendering of expressions and values, for diagnostics and
// the CLI. Precedences mirror the parser's binding powers.

use std::fmt::{self, Display, Formatter, Write};

use crate::expr::{Arg, Call, Expr};
use crate::value::{Closure, Formal, Value};

const RESERVED: &[&str] = &[
    "if", "else", "function", "TRUE", "FALSE", "NULL", "NA", "Inf", "NaN",
];

fn binary_prec(op: &str) -> Option<(u8, bool)> {
    // (precedence, right-associative)
    Some(match op {
        "<-" => (1, true),
        "||" | "|" => (2, false),
        "&&" | "&" => (3, false),
        "==" | "!=" | "<" | "<=" | ">" | ">=" => (5, false),
        "+" | "-" => (6, false),
        "*" | "/" => (7, false),
        "%%" => (8, false),
        "^" => (10, true),
        "$" => (11, false),
        _ => return None,
    })
}

fn unary_prec(op: &str) -> Option<u8> {
    match op {
        "!" => Some(4),
        "-" => Some(9),
        _ => None,
    }
}

const ATOM: u8 = u8::MAX;

fn is_syntactic(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '.') {
        return false;
    }
    if first == '.' && name[1..].starts_with(|c: char| c.is_ascii_digit()) {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_') && !RESERVED.contains(&name)
}

fn write_symbol(f: &mut Formatter<'_>, name: &str) -> fmt::Result {
    if is_syntactic(name) {
        f.write_str(name)
    } else {
        write!(f, "`{}`", name.replace('`', "\\`"))
    }
}

/// Precedence of the node as printed; atoms and ordinary calls bind tightest.
fn prec_of(expr: &Expr) -> u8 {
    let Some(call) = expr.as_call() else {
        return ATOM;
    };
    let Some(op) = call.op_name() else {
        return ATOM;
    };
    if is_binary(call) {
        return binary_prec(op).map(|(p, _)| p).unwrap_or(ATOM);
    }
    if is_unary(call) {
        return unary_prec(op).unwrap_or(ATOM);
    }
    match op {
        "if" | "function" => 0,
        _ => ATOM,
    }
}

fn unnamed(args: &[Arg]) -> bool {
    args.iter().all(|a| a.name.is_none())
}

fn is_binary(call: &Call) -> bool {
    call.args.len() == 2
        && unnamed(&call.args)
        && call.op_name().and_then(binary_prec).is_some()
}

fn is_unary(call: &Call) -> bool {
    call.args.len() == 1 && unnamed(&call.args) && call.op_name().and_then(unary_prec).is_some()
}

fn write_operand(f: &mut Formatter<'_>, expr: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

fn write_args(f: &mut Formatter<'_>, args: &[Arg]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if let Some(name) = &arg.name {
            write_symbol(f, name)?;
            f.write_str(" = ")?;
        }
        write!(f, "{}", arg.value)?;
    }
    Ok(())
}

fn write_call(f: &mut Formatter<'_>, call: &Call) -> fmt::Result {
    let op = call.op_name();

    if is_binary(call) {
        let op = op.unwrap_or_default();
        let (prec, right) = binary_prec(op).unwrap_or((ATOM, false));
        let (lhs, rhs) = (&call.args[0].value, &call.args[1].value);
        let lp = prec_of(lhs);
        let rp = prec_of(rhs);
        write_operand(f, lhs, lp < prec || (lp == prec && right))?;
        match op {
            "^" | "$" => f.write_str(op)?,
            _ => write!(f, " {} ", op)?,
        }
        // `function` and `if` extend to the right, so they never need parens there
        let open_ended = rp == 0;
        return write_operand(f, rhs, !open_ended && (rp < prec || (rp == prec && !right)));
    }

    if is_unary(call) {
        let op = op.unwrap_or_default();
        let prec = unary_prec(op).unwrap_or(ATOM);
        let inner = &call.args[0].value;
        f.write_str(op)?;
        return write_operand(f, inner, prec_of(inner) < prec);
    }

    match op {
        Some("(") if call.args.len() == 1 => write!(f, "({})", call.args[0].value),
        Some("{") => {
            if call.args.is_empty() {
                return f.write_str("{}");
            }
            f.write_str("{ ")?;
            for (i, arg) in call.args.iter().enumerate() {
                if i > 0 {
                    f.write_str("; ")?;
                }
                write!(f, "{}", arg.value)?;
            }
            f.write_str(" }")
        }
        Some("if") if (2..=3).contains(&call.args.len()) => {
            write!(f, "if ({}) {}", call.args[0].value, call.args[1].value)?;
            if let Some(alt) = call.args.get(2) {
                write!(f, " else {}", alt.value)?;
            }
            Ok(())
        }
        Some("function") if !call.args.is_empty() => {
            let last = call.args.len() - 1;
            f.write_str("function(")?;
            write_args(f, &call.args[..last])?;
            write!(f, ") {}", call.args[last].value)
        }
        _ => {
            if prec_of(&call.op) < ATOM || matches!(call.op, Expr::Literal(_)) {
                write!(f, "({})", call.op)?;
            } else {
                write!(f, "{}", call.op)?;
            }
            f.write_char('(')?;
            write_args(f, &call.args)?;
            f.write_char(')')
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Symbol(name) => write_symbol(f, name),
            Expr::Ellipsis => f.write_str("..."),
            Expr::Call(call) => write_call(f, call),
        }
    }
}

fn fmt_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        (if d > 0.0 { "Inf" } else { "-Inf" }).to_string()
    } else if d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{}", d as i64)
    } else {
        format!("{}", d)
    }
}

fn fmt_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn write_vector<T>(
    f: &mut Formatter<'_>,
    empty: &str,
    items: &[Option<T>],
    one: impl Fn(&T) -> String,
) -> fmt::Result {
    let render = |x: &Option<T>| x.as_ref().map(&one).unwrap_or_else(|| "NA".to_string());
    match items {
        [] => write!(f, "{}(0)", empty),
        [x] => f.write_str(&render(x)),
        xs => {
            let parts: Vec<String> = xs.iter().map(render).collect();
            write!(f, "c({})", parts.join(", "))
        }
    }
}

fn write_closure(f: &mut Formatter<'_>, closure: &Closure) -> fmt::Result {
    f.write_str("function(")?;
    for (i, formal) in closure.formals.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        match formal {
            Formal::Param { name, default } => {
                write_symbol(f, name)?;
                if let Some(d) = default {
                    write!(f, " = {}", d)?;
                }
            }
            Formal::Dots => f.write_str("...")?,
        }
    }
    write!(f, ") {}", closure.body)
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Logical(v) => write_vector(f, "logical", v, |b| {
                (if *b { "TRUE" } else { "FALSE" }).to_string()
            }),
            Value::Int(v) => write_vector(f, "integer", v, |i| format!("{}L", i)),
            Value::Double(v) => write_vector(f, "double", v, |d| fmt_double(*d)),
            Value::Str(v) => write_vector(f, "character", v, |s| fmt_str(s)),
            Value::Lang(e) => write!(f, "{}", e),
            Value::Closure(c) => write_closure(f, c),
            Value::Builtin(name) => write!(f, "<builtin:{}>", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(op: &str, a: Expr, b: Expr) -> Expr {
        Expr::apply(op, [a, b])
    }

    #[test]
    fn infix_calls_render_with_minimal_parens() {
        let e = bin(
            "*",
            bin("+", Expr::sym("a"), Expr::sym("b")),
            Expr::sym("c"),
        );
        assert_eq!(e.to_string(), "(a + b) * c");
        let e = bin(
            "+",
            Expr::sym("a"),
            bin("*", Expr::sym("b"), Expr::sym("c")),
        );
        assert_eq!(e.to_string(), "a + b * c");
        let e = bin("-", Expr::sym("a"), bin("-", Expr::sym("b"), Expr::sym("c")));
        assert_eq!(e.to_string(), "a - (b - c)");
    }

    #[test]
    fn named_args_and_ellipsis() {
        let e = Expr::call(
            Expr::sym("mean"),
            vec![
                Arg::positional(Expr::sym("x")),
                Arg::named("na.rm", Expr::lit(Value::lgl(true))),
                Arg::positional(Expr::Ellipsis),
            ],
        );
        assert_eq!(e.to_string(), "mean(x, na.rm = TRUE, ...)");
    }

    #[test]
    fn non_syntactic_symbols_are_backticked() {
        assert_eq!(Expr::sym("my col").to_string(), "`my col`");
        assert_eq!(Expr::sym("if").to_string(), "`if`");
        assert_eq!(Expr::sym(".data").to_string(), ".data");
    }

    #[test]
    fn vectors_render_like_constructors() {
        assert_eq!(Value::doubles([1.0, 4.5]).to_string(), "c(1, 4.5)");
        assert_eq!(Value::Int(vec![Some(1), None]).to_string(), "c(1L, NA)");
        assert_eq!(Value::Str(vec![]).to_string(), "character(0)");
        assert_eq!(Value::str("a\"b").to_string(), "\"a\\\"b\"");
    }

    #[test]
    fn special_forms_render_in_surface_syntax() {
        let f = Expr::call(
            Expr::sym("function"),
            vec![
                Arg::positional(Expr::sym("x")),
                Arg::named("y", Expr::lit(Value::double(2.0))),
                Arg::positional(Expr::Ellipsis),
                Arg::positional(bin("+", Expr::sym("x"), Expr::sym("y"))),
            ],
        );
        assert_eq!(f.to_string(), "function(x, y = 2, ...) x + y");
        let block = Expr::apply("{", [Expr::sym("a"), Expr::sym("b")]);
        assert_eq!(block.to_string(), "{ a; b }");
    }
}
