//! Builtin native functions: vectorized arithmetic, comparison, logic and
//! a handful of reductions.
//!
//! Binary operations recycle the shorter operand when its length divides the
//! longer one. Missing elements propagate, except where three-valued logic
//! settles the answer (`FALSE & NA` is `FALSE`).

use tidal_ast::Value;

use crate::error::NativeError;
use crate::registry::{ArgValue, Registry};

pub(crate) fn install(reg: &mut Registry) {
    reg.register("+", builtin_add);
    reg.register("-", builtin_sub);
    reg.register("*", builtin_mul);
    reg.register("/", builtin_div);
    reg.register("^", builtin_pow);
    reg.register("%%", builtin_mod);
    reg.register("==", builtin_eq);
    reg.register("!=", builtin_ne);
    reg.register("<", builtin_lt);
    reg.register("<=", builtin_le);
    reg.register(">", builtin_gt);
    reg.register(">=", builtin_ge);
    reg.register("&", builtin_and);
    reg.register("|", builtin_or);
    reg.register("!", builtin_not);
    reg.register("c", builtin_c);
    reg.register("length", builtin_length);
    reg.register("sum", builtin_sum);
    reg.register("mean", builtin_mean);
    reg.register("min", builtin_min);
    reg.register("max", builtin_max);
    reg.register("abs", builtin_abs);
    reg.register("sqrt", builtin_sqrt);
    reg.register("is.na", builtin_is_na);
    reg.register("desc", builtin_desc);
    reg.register("ifelse", builtin_ifelse);
    reg.register("paste", builtin_paste);
}

// ---------------------------------------------------------------------------
// Coercion helpers
// ---------------------------------------------------------------------------

enum Num {
    Int(Vec<Option<i64>>),
    Dbl(Vec<Option<f64>>),
}

fn as_num(v: &Value) -> Result<Num, NativeError> {
    match v {
        Value::Logical(xs) => Ok(Num::Int(
            xs.iter().map(|b| b.map(|b| b as i64)).collect(),
        )),
        Value::Int(xs) => Ok(Num::Int(xs.clone())),
        Value::Double(xs) => Ok(Num::Dbl(xs.clone())),
        Value::Null => Ok(Num::Int(Vec::new())),
        other => Err(NativeError::Type(format!(
            "non-numeric argument of type {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn as_doubles(v: &Value) -> Result<Vec<Option<f64>>, NativeError> {
    Ok(match as_num(v)? {
        Num::Int(xs) => xs.iter().map(|x| x.map(|x| x as f64)).collect(),
        Num::Dbl(xs) => xs,
    })
}

fn as_logicals(v: &Value) -> Result<Vec<Option<bool>>, NativeError> {
    match v {
        Value::Logical(xs) => Ok(xs.clone()),
        Value::Int(xs) => Ok(xs.iter().map(|x| x.map(|x| x != 0)).collect()),
        Value::Double(xs) => Ok(xs
            .iter()
            .map(|x| x.filter(|d| !d.is_nan()).map(|d| d != 0.0))
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(NativeError::Type(format!(
            "operations are possible only for numeric or logical types, not {}",
            other.type_name()
        ))),
    }
}

fn fmt_num(d: f64) -> String {
    Value::double(d).to_string()
}

fn as_strings(v: &Value) -> Result<Vec<Option<String>>, NativeError> {
    match v {
        Value::Str(xs) => Ok(xs.clone()),
        Value::Logical(xs) => Ok(xs
            .iter()
            .map(|b| b.map(|b| if b { "TRUE" } else { "FALSE" }.to_string()))
            .collect()),
        Value::Int(xs) => Ok(xs.iter().map(|x| x.map(|x| x.to_string())).collect()),
        Value::Double(xs) => Ok(xs.iter().map(|x| x.map(fmt_num)).collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(NativeError::Type(format!(
            "cannot coerce type {} to character",
            other.type_name()
        ))),
    }
}

fn common_len(a: usize, b: usize) -> Result<usize, NativeError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }
    let (lo, hi) = (a.min(b), a.max(b));
    if hi % lo != 0 {
        return Err(NativeError::Length { left: a, right: b });
    }
    Ok(hi)
}

fn zip_with<A: Copy, B: Copy, R>(
    a: &[Option<A>],
    b: &[Option<B>],
    f: impl Fn(A, B) -> Option<R>,
) -> Result<Vec<Option<R>>, NativeError> {
    let n = common_len(a.len(), b.len())?;
    Ok((0..n)
        .map(|i| match (a[i % a.len()], b[i % b.len()]) {
            (Some(x), Some(y)) => f(x, y),
            _ => None,
        })
        .collect())
}

fn positional(args: &[ArgValue], expected: usize) -> Result<Vec<&Value>, NativeError> {
    if args.len() != expected {
        return Err(NativeError::Arity {
            expected,
            found: args.len(),
        });
    }
    Ok(args.iter().map(|a| &a.value).collect())
}

/// Split off `na.rm = <lgl>` from reduction arguments.
fn reduction_args(args: &[ArgValue]) -> Result<(Vec<&Value>, bool), NativeError> {
    let mut values = Vec::new();
    let mut na_rm = false;
    for arg in args {
        match arg.name.as_deref() {
            Some("na.rm") => {
                na_rm = matches!(as_logicals(&arg.value)?.first(), Some(Some(true)));
            }
            Some(other) => {
                return Err(NativeError::Type(format!("unused argument '{}'", other)))
            }
            None => values.push(&arg.value),
        }
    }
    Ok((values, na_rm))
}

/// Combine values into one vector of their highest common type
/// (logical < integer < double < character). `NULL`s vanish.
pub(crate) fn combine(values: &[&Value]) -> Result<Value, NativeError> {
    let rank = |v: &Value| match v {
        Value::Null => Ok(0),
        Value::Logical(_) => Ok(1),
        Value::Int(_) => Ok(2),
        Value::Double(_) => Ok(3),
        Value::Str(_) => Ok(4),
        other => Err(NativeError::Type(format!(
            "cannot combine value of type {}",
            other.type_name()
        ))),
    };
    let mut top = 0;
    for v in values {
        top = top.max(rank(v)?);
    }
    Ok(match top {
        0 => Value::Null,
        1 => Value::Logical(
            values
                .iter()
                .map(|v| as_logicals(v))
                .collect::<Result<Vec<_>, _>>()?
                .concat(),
        ),
        2 => {
            let mut out = Vec::new();
            for v in values {
                if let Num::Int(xs) = as_num(v)? {
                    out.extend(xs);
                }
            }
            Value::Int(out)
        }
        3 => Value::Double(
            values
                .iter()
                .map(|v| as_doubles(v))
                .collect::<Result<Vec<_>, _>>()?
                .concat(),
        ),
        _ => Value::Str(
            values
                .iter()
                .map(|v| as_strings(v))
                .collect::<Result<Vec<_>, _>>()?
                .concat(),
        ),
    })
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

fn arith(
    args: &[ArgValue],
    int_op: fn(i64, i64) -> Option<i64>,
    dbl_op: fn(f64, f64) -> f64,
) -> Result<Value, NativeError> {
    let v = positional(args, 2)?;
    match (as_num(v[0])?, as_num(v[1])?) {
        (Num::Int(a), Num::Int(b)) => Ok(Value::Int(zip_with(&a, &b, int_op)?)),
        _ => {
            let a = as_doubles(v[0])?;
            let b = as_doubles(v[1])?;
            Ok(Value::Double(zip_with(&a, &b, |x, y| Some(dbl_op(x, y)))?))
        }
    }
}

fn builtin_add(args: &[ArgValue]) -> Result<Value, NativeError> {
    if args.len() == 1 {
        return match as_num(&args[0].value)? {
            Num::Int(xs) => Ok(Value::Int(xs)),
            Num::Dbl(xs) => Ok(Value::Double(xs)),
        };
    }
    arith(args, i64::checked_add, |x, y| x + y)
}

fn builtin_sub(args: &[ArgValue]) -> Result<Value, NativeError> {
    if args.len() == 1 {
        return negate(&args[0].value);
    }
    arith(args, i64::checked_sub, |x, y| x - y)
}

fn builtin_mul(args: &[ArgValue]) -> Result<Value, NativeError> {
    arith(args, i64::checked_mul, |x, y| x * y)
}

fn builtin_div(args: &[ArgValue]) -> Result<Value, NativeError> {
    let v = positional(args, 2)?;
    let (a, b) = (as_doubles(v[0])?, as_doubles(v[1])?);
    Ok(Value::Double(zip_with(&a, &b, |x, y| Some(x / y))?))
}

fn builtin_pow(args: &[ArgValue]) -> Result<Value, NativeError> {
    let v = positional(args, 2)?;
    let (a, b) = (as_doubles(v[0])?, as_doubles(v[1])?);
    Ok(Value::Double(zip_with(&a, &b, |x, y| Some(x.powf(y)))?))
}

// Result takes the sign of the divisor.
fn builtin_mod(args: &[ArgValue]) -> Result<Value, NativeError> {
    arith(
        args,
        |x, y| {
            if y == 0 {
                None
            } else {
                Some(((x % y) + y) % y)
            }
        },
        |x, y| x - (x / y).floor() * y,
    )
}

fn negate(v: &Value) -> Result<Value, NativeError> {
    Ok(match as_num(v)? {
        Num::Int(xs) => Value::Int(xs.iter().map(|x| x.and_then(i64::checked_neg)).collect()),
        Num::Dbl(xs) => Value::Double(xs.iter().map(|x| x.map(|d| -d)).collect()),
    })
}

fn builtin_desc(args: &[ArgValue]) -> Result<Value, NativeError> {
    let v = positional(args, 1)?;
    negate(v[0])
}

fn builtin_abs(args: &[ArgValue]) -> Result<Value, NativeError> {
    let v = positional(args, 1)?;
    Ok(match as_num(v[0])? {
        Num::Int(xs) => Value::Int(xs.iter().map(|x| x.and_then(i64::checked_abs)).collect()),
        Num::Dbl(xs) => Value::Double(xs.iter().map(|x| x.map(f64::abs)).collect()),
    })
}

fn builtin_sqrt(args: &[ArgValue]) -> Result<Value, NativeError> {
    let v = positional(args, 1)?;
    Ok(Value::Double(
        as_doubles(v[0])?.iter().map(|x| x.map(f64::sqrt)).collect(),
    ))
}

// ---------------------------------------------------------------------------
// Comparison and logic
// ---------------------------------------------------------------------------

fn compare(
    args: &[ArgValue],
    keep: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, NativeError> {
    let v = positional(args, 2)?;
    if matches!(v[0], Value::Str(_)) || matches!(v[1], Value::Str(_)) {
        let a = as_strings(v[0])?;
        let b = as_strings(v[1])?;
        let n = common_len(a.len(), b.len())?;
        let out = (0..n)
            .map(|i| match (&a[i % a.len()], &b[i % b.len()]) {
                (Some(x), Some(y)) => Some(keep(x.cmp(y))),
                _ => None,
            })
            .collect();
        return Ok(Value::Logical(out));
    }
    let a = as_doubles(v[0])?;
    let b = as_doubles(v[1])?;
    Ok(Value::Logical(zip_with(&a, &b, |x, y| {
        x.partial_cmp(&y).map(keep)
    })?))
}

fn builtin_eq(args: &[ArgValue]) -> Result<Value, NativeError> {
    compare(args, |o| o.is_eq())
}

fn builtin_ne(args: &[ArgValue]) -> Result<Value, NativeError> {
    compare(args, |o| o.is_ne())
}

fn builtin_lt(args: &[ArgValue]) -> Result<Value, NativeError> {
    compare(args, |o| o.is_lt())
}

fn builtin_le(args: &[ArgValue]) -> Result<Value, NativeError> {
    compare(args, |o| o.is_le())
}

fn builtin_gt(args: &[ArgValue]) -> Result<Value, NativeError> {
    compare(args, |o| o.is_gt())
}

fn builtin_ge(args: &[ArgValue]) -> Result<Value, NativeError> {
    compare(args, |o| o.is_ge())
}

fn logic(args: &[ArgValue], dominant: bool) -> Result<Value, NativeError> {
    let v = positional(args, 2)?;
    let a = as_logicals(v[0])?;
    let b = as_logicals(v[1])?;
    let n = common_len(a.len(), b.len())?;
    let out = (0..n)
        .map(|i| match (a[i % a.len()], b[i % b.len()]) {
            (Some(x), _) if x == dominant => Some(dominant),
            (_, Some(y)) if y == dominant => Some(dominant),
            (Some(_), Some(_)) => Some(!dominant),
            _ => None,
        })
        .collect();
    Ok(Value::Logical(out))
}

fn builtin_and(args: &[ArgValue]) -> Result<Value, NativeError> {
    logic(args, false)
}

fn builtin_or(args: &[ArgValue]) -> Result<Value, NativeError> {
    logic(args, true)
}

fn builtin_not(args: &[ArgValue]) -> Result<Value, NativeError> {
    let v = positional(args, 1)?;
    Ok(Value::Logical(
        as_logicals(v[0])?.iter().map(|b| b.map(|b| !b)).collect(),
    ))
}

fn builtin_is_na(args: &[ArgValue]) -> Result<Value, NativeError> {
    let v = positional(args, 1)?;
    let out = match v[0] {
        Value::Logical(xs) => xs.iter().map(|x| Some(x.is_none())).collect(),
        Value::Int(xs) => xs.iter().map(|x| Some(x.is_none())).collect(),
        Value::Double(xs) => xs
            .iter()
            .map(|x| Some(x.map_or(true, f64::is_nan)))
            .collect(),
        Value::Str(xs) => xs.iter().map(|x| Some(x.is_none())).collect(),
        Value::Null => Vec::new(),
        _ => vec![Some(false)],
    };
    Ok(Value::Logical(out))
}

fn builtin_ifelse(args: &[ArgValue]) -> Result<Value, NativeError> {
    let v = positional(args, 3)?;
    let test = as_logicals(v[0])?;
    let n = test.len();
    if n == 0 {
        return Ok(Value::Logical(Vec::new()));
    }
    let both = combine(&[v[1], v[2]])?;
    let (yes_len, no_len) = (v[1].len(), v[2].len());
    if yes_len == 0 || no_len == 0 {
        return Err(NativeError::Length {
            left: yes_len,
            right: no_len,
        });
    }
    let rows: Vec<usize> = test
        .iter()
        .enumerate()
        .map(|(i, t)| match t {
            Some(true) => i % yes_len,
            Some(false) => yes_len + i % no_len,
            // one past the end picks a missing element
            None => yes_len + no_len,
        })
        .collect();
    Ok(both.take(&rows))
}

// ---------------------------------------------------------------------------
// Construction and reductions
// ---------------------------------------------------------------------------

fn builtin_c(args: &[ArgValue]) -> Result<Value, NativeError> {
    let values: Vec<&Value> = args.iter().map(|a| &a.value).collect();
    combine(&values)
}

fn builtin_length(args: &[ArgValue]) -> Result<Value, NativeError> {
    let v = positional(args, 1)?;
    Ok(Value::int(v[0].len() as i64))
}

fn builtin_sum(args: &[ArgValue]) -> Result<Value, NativeError> {
    let (values, na_rm) = reduction_args(args)?;
    let all = combine(&values)?;
    match as_num(&all)? {
        Num::Int(xs) => {
            let mut total: i64 = 0;
            for x in xs {
                match x {
                    Some(x) => match total.checked_add(x) {
                        Some(t) => total = t,
                        None => return Ok(Value::Int(vec![None])),
                    },
                    None if na_rm => {}
                    None => return Ok(Value::Int(vec![None])),
                }
            }
            Ok(Value::int(total))
        }
        Num::Dbl(xs) => {
            let mut total = 0.0;
            for x in xs {
                match x {
                    Some(x) => total += x,
                    None if na_rm => {}
                    None => return Ok(Value::Double(vec![None])),
                }
            }
            Ok(Value::double(total))
        }
    }
}

fn present(values: &[&Value], na_rm: bool) -> Result<Option<Vec<f64>>, NativeError> {
    let all = combine(values)?;
    let mut out = Vec::new();
    for x in as_doubles(&all)? {
        match x {
            Some(x) => out.push(x),
            None if na_rm => {}
            None => return Ok(None),
        }
    }
    Ok(Some(out))
}

fn builtin_mean(args: &[ArgValue]) -> Result<Value, NativeError> {
    let (values, na_rm) = reduction_args(args)?;
    let Some(xs) = present(&values, na_rm)? else {
        return Ok(Value::Double(vec![None]));
    };
    if xs.is_empty() {
        return Ok(Value::double(f64::NAN));
    }
    Ok(Value::double(xs.iter().sum::<f64>() / xs.len() as f64))
}

fn extreme(args: &[ArgValue], pick_max: bool) -> Result<Value, NativeError> {
    let (values, na_rm) = reduction_args(args)?;
    let all = combine(&values)?;
    let ints = matches!(all, Value::Int(_) | Value::Logical(_));
    let Some(xs) = present(&[&all], na_rm)? else {
        return Ok(if ints {
            Value::Int(vec![None])
        } else {
            Value::Double(vec![None])
        });
    };
    let folded = xs.iter().copied().fold(None, |acc: Option<f64>, x| {
        Some(match acc {
            None => x,
            Some(a) if pick_max => a.max(x),
            Some(a) => a.min(x),
        })
    });
    match folded {
        Some(x) if ints => Ok(Value::int(x as i64)),
        Some(x) => Ok(Value::double(x)),
        None => Ok(Value::double(if pick_max {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        })),
    }
}

fn builtin_min(args: &[ArgValue]) -> Result<Value, NativeError> {
    extreme(args, false)
}

fn builtin_max(args: &[ArgValue]) -> Result<Value, NativeError> {
    extreme(args, true)
}

fn builtin_paste(args: &[ArgValue]) -> Result<Value, NativeError> {
    let mut sep = " ".to_string();
    let mut parts = Vec::new();
    for arg in args {
        match arg.name.as_deref() {
            Some("sep") => match as_strings(&arg.value)?.first() {
                Some(Some(s)) => sep = s.clone(),
                _ => return Err(NativeError::Type("invalid separator".into())),
            },
            _ => parts.push(as_strings(&arg.value)?),
        }
    }
    if parts.iter().any(Vec::is_empty) {
        return Ok(Value::Str(Vec::new()));
    }
    let n = parts.iter().map(Vec::len).max().unwrap_or(0);
    let out = (0..n)
        .map(|i| {
            let pieces: Vec<String> = parts
                .iter()
                .map(|p| p[i % p.len()].clone().unwrap_or_else(|| "NA".to_string()))
                .collect();
            Some(pieces.join(&sep))
        })
        .collect();
    Ok(Value::Str(out))
}
