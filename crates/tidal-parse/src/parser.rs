use crate::lexer::Lexer;
use crate::token::{Tok, TokKind};
use anyhow::{bail, Result};
use tidal_ast::{Arg, Expr, Value};

/// Maximum nesting depth; keeps pathological input from overflowing the stack.
pub const MAX_NESTING_DEPTH: u32 = 256;

/// Parse a program: expressions separated by newlines or `;`.
pub fn parse_program(_file: &str, src: &str) -> Result<Vec<Expr>> {
    let mut p = Parser::new(src);
    p.parse_program()
}

/// Parse exactly one expression (surrounding blank lines allowed).
pub fn parse_expr(src: &str) -> Result<Expr> {
    let mut p = Parser::new(src);
    p.skip_newlines();
    let e = p.parse_expr_bp(0)?;
    p.skip_newlines();
    p.expect_eof()?;
    Ok(e)
}

/// Parse a single, optionally named, argument: `x2 = x * x` or `x > 1`.
pub fn parse_arg(src: &str) -> Result<Arg> {
    let mut p = Parser::new(src);
    p.skip_newlines();
    let arg = p.parse_arg()?;
    p.skip_newlines();
    p.expect_eof()?;
    Ok(arg)
}

#[derive(Clone, Copy, PartialEq)]
enum Nest {
    Paren,
    Brace,
}

struct Parser<'a> {
    lex: Lexer<'a>,
    cur: Tok,
    nxt: Tok,
    nest: Vec<Nest>,
    depth: u32,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        let mut lex = Lexer::new(src);
        let cur = lex.next_tok();
        let nxt = lex.next_tok();
        Self {
            lex,
            cur,
            nxt,
            nest: Vec::new(),
            depth: 0,
        }
    }

    fn advance(&mut self) {
        self.cur = std::mem::replace(&mut self.nxt, self.lex.next_tok());
    }

    // Inside parentheses newlines carry no meaning and are dropped here.
    fn bump(&mut self) {
        self.advance();
        while self.cur.kind == TokKind::Newline && self.nest.last() == Some(&Nest::Paren) {
            self.advance();
        }
    }

    fn at(&self, k: &TokKind) -> bool {
        std::mem::discriminant(&self.cur.kind) == std::mem::discriminant(k)
    }

    fn expect(&mut self, k: TokKind) -> Result<Tok> {
        if self.at(&k) {
            let t = self.cur.clone();
            self.bump();
            Ok(t)
        } else {
            bail!(
                "expected {:?}, found {:?} at offset {}",
                k,
                self.cur.kind,
                self.cur.span.start
            )
        }
    }

    fn expect_eof(&self) -> Result<()> {
        if let TokKind::Error(msg) = &self.cur.kind {
            bail!("{} at offset {}", msg, self.cur.span.start);
        }
        if !matches!(self.cur.kind, TokKind::Eof) {
            bail!(
                "unexpected trailing input {:?} at offset {}",
                self.cur.kind,
                self.cur.span.start
            );
        }
        Ok(())
    }

    fn skip_newlines(&mut self) {
        while matches!(self.cur.kind, TokKind::Newline) {
            self.advance();
        }
    }

    fn open(&mut self, nest: Nest, tok: TokKind) -> Result<()> {
        if !self.at(&tok) {
            bail!(
                "expected {:?}, found {:?} at offset {}",
                tok,
                self.cur.kind,
                self.cur.span.start
            );
        }
        self.nest.push(nest);
        self.bump();
        Ok(())
    }

    fn close(&mut self, tok: TokKind) -> Result<()> {
        if !self.at(&tok) {
            bail!(
                "expected {:?}, found {:?} at offset {}",
                tok,
                self.cur.kind,
                self.cur.span.start
            );
        }
        self.nest.pop();
        self.bump();
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            bail!(
                "nesting depth limit exceeded (limit: {})",
                MAX_NESTING_DEPTH
            );
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // ======= programs / statements =======

    fn parse_program(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = Vec::new();
        loop {
            while matches!(self.cur.kind, TokKind::Newline | TokKind::Semicolon) {
                self.advance();
            }
            if matches!(self.cur.kind, TokKind::Eof) {
                break;
            }
            exprs.push(self.parse_expr_bp(0)?);
            match self.cur.kind {
                TokKind::Newline | TokKind::Semicolon | TokKind::Eof => {}
                _ => bail!(
                    "expected newline or ';' after expression, found {:?} at offset {}",
                    self.cur.kind,
                    self.cur.span.start
                ),
            }
        }
        Ok(exprs)
    }

    /// Parse a block: `{ expr (sep expr)* }` into a `{` call.
    fn parse_block(&mut self) -> Result<Expr> {
        self.open(Nest::Brace, TokKind::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            while matches!(self.cur.kind, TokKind::Newline | TokKind::Semicolon) {
                self.advance();
            }
            if matches!(self.cur.kind, TokKind::RBrace) {
                break;
            }
            stmts.push(self.parse_expr_bp(0)?);
            match self.cur.kind {
                TokKind::Newline | TokKind::Semicolon | TokKind::RBrace => {}
                _ => bail!(
                    "expected newline, ';' or '}}' in block, found {:?} at offset {}",
                    self.cur.kind,
                    self.cur.span.start
                ),
            }
        }
        self.close(TokKind::RBrace)?;
        Ok(Expr::apply("{", stmts))
    }

    /// `if (cond) expr [else expr]`
    fn parse_if(&mut self) -> Result<Expr> {
        self.expect(TokKind::KwIf)?;
        self.open(Nest::Paren, TokKind::LParen)?;
        let cond = self.parse_expr_bp(0)?;
        self.close(TokKind::RParen)?;
        self.skip_newlines();
        let then_ = self.parse_expr_bp(0)?;

        // allow a single line break before `else`
        if matches!(self.cur.kind, TokKind::Newline) && matches!(self.nxt.kind, TokKind::KwElse) {
            self.advance();
        }
        let mut parts = vec![cond, then_];
        if matches!(self.cur.kind, TokKind::KwElse) {
            self.bump();
            self.skip_newlines();
            parts.push(self.parse_expr_bp(0)?);
        }
        Ok(Expr::apply("if", parts))
    }

    /// `function(x, y = default, ...) body`
    ///
    /// Formals become arguments of a `function` call: bare names are
    /// positional symbols, defaults are named arguments, `...` is the
    /// ellipsis; the body is the final argument.
    fn parse_function(&mut self) -> Result<Expr> {
        self.expect(TokKind::KwFunction)?;
        self.open(Nest::Paren, TokKind::LParen)?;
        let mut args = Vec::new();
        let mut seen: Vec<String> = Vec::new();
        if !matches!(self.cur.kind, TokKind::RParen) {
            loop {
                let (name, arg) = match self.cur.kind.clone() {
                    TokKind::Ellipsis => {
                        self.bump();
                        ("...".to_string(), Arg::positional(Expr::Ellipsis))
                    }
                    TokKind::Ident(name) => {
                        self.bump();
                        if matches!(self.cur.kind, TokKind::Eq) {
                            self.bump();
                            let default = self.parse_expr_bp(0)?;
                            (name.clone(), Arg::named(name, default))
                        } else {
                            (name.clone(), Arg::positional(Expr::Symbol(name)))
                        }
                    }
                    other => bail!(
                        "expected parameter name, found {:?} at offset {}",
                        other,
                        self.cur.span.start
                    ),
                };
                if seen.contains(&name) {
                    bail!("repeated formal argument '{}'", name);
                }
                seen.push(name);
                args.push(arg);
                if matches!(self.cur.kind, TokKind::Comma) {
                    self.bump();
                    continue;
                }
                break;
            }
        }
        self.close(TokKind::RParen)?;
        self.skip_newlines();
        let body = self.parse_expr_bp(0)?;
        args.push(Arg::positional(body));
        Ok(Expr::call(Expr::sym("function"), args))
    }

    // ======= expressions (Pratt parser) =======
    //
    // Precedence (low -> high):
    //   1-2:  <-          (right)
    //   4:    || |
    //   6:    && &
    //   8:    prefix !
    //   10:   == != < <= > >=
    //   12:   + -
    //   14:   * /
    //   16:   %%
    //   18:   prefix -
    //   20-21: ^          (right)
    //   23:   $
    // call application binds tightest.

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        self.enter()?;
        let result = self.parse_expr_bp_inner(min_bp);
        self.leave();
        result
    }

    fn parse_expr_bp_inner(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let (op, lbp, rbp) = match self.cur.kind {
                TokKind::LArrow => ("<-", 2, 1),
                TokKind::OrOr => ("||", 4, 5),
                TokKind::Or => ("|", 4, 5),
                TokKind::AndAnd => ("&&", 6, 7),
                TokKind::And => ("&", 6, 7),
                TokKind::EqEq => ("==", 10, 11),
                TokKind::BangEq => ("!=", 10, 11),
                TokKind::Lt => ("<", 10, 11),
                TokKind::Le => ("<=", 10, 11),
                TokKind::Gt => (">", 10, 11),
                TokKind::Ge => (">=", 10, 11),
                TokKind::Plus => ("+", 12, 13),
                TokKind::Minus => ("-", 12, 13),
                TokKind::Star => ("*", 14, 15),
                TokKind::Slash => ("/", 14, 15),
                TokKind::PercentPercent => ("%%", 16, 17),
                TokKind::Caret => ("^", 21, 20),
                TokKind::Dollar => {
                    if 23 < min_bp {
                        break;
                    }
                    self.bump();
                    let field = match self.cur.kind.clone() {
                        TokKind::Ident(name) | TokKind::Str(name) => name,
                        other => bail!(
                            "expected name after '$', found {:?} at offset {}",
                            other,
                            self.cur.span.start
                        ),
                    };
                    self.bump();
                    lhs = Expr::apply("$", [lhs, Expr::Symbol(field)]);
                    continue;
                }
                // call application (tightest)
                TokKind::LParen => {
                    let args = self.parse_call_args()?;
                    lhs = Expr::call(lhs, args);
                    continue;
                }
                _ => break,
            };

            if lbp < min_bp {
                break;
            }
            if op == "<-" && !matches!(lhs, Expr::Symbol(_) | Expr::Literal(Value::Str(_))) {
                bail!("invalid assignment target: {}", lhs);
            }
            self.bump(); // consume operator
            self.skip_newlines();
            let rhs = self.parse_expr_bp(rbp)?;
            let lhs_target = match lhs {
                // "x" <- 1 assigns to x
                Expr::Literal(Value::Str(ref s)) if op == "<-" => match s.as_slice() {
                    [Some(name)] => Expr::Symbol(name.clone()),
                    _ => bail!("invalid assignment target: {}", lhs),
                },
                other => other,
            };
            lhs = Expr::apply(op, [lhs_target, rhs]);
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        // Snapshot current token to avoid borrow issues when bumping
        let tok_kind = self.cur.kind.clone();
        let tok_span = self.cur.span;

        match tok_kind {
            // unary prefix
            TokKind::Bang => {
                self.bump();
                let inner = self.parse_expr_bp(8)?;
                Ok(Expr::apply("!", [inner]))
            }
            TokKind::Minus => {
                self.bump();
                let inner = self.parse_expr_bp(18)?;
                Ok(Expr::apply("-", [inner]))
            }
            TokKind::Plus => {
                self.bump();
                let inner = self.parse_expr_bp(18)?;
                Ok(Expr::apply("+", [inner]))
            }

            // primaries
            TokKind::Int(v) => {
                self.bump();
                Ok(Expr::lit(Value::int(v)))
            }
            TokKind::Num(v) => {
                self.bump();
                Ok(Expr::lit(Value::double(v)))
            }
            TokKind::Str(s) => {
                self.bump();
                Ok(Expr::lit(Value::str(s)))
            }
            TokKind::KwTrue => {
                self.bump();
                Ok(Expr::lit(Value::lgl(true)))
            }
            TokKind::KwFalse => {
                self.bump();
                Ok(Expr::lit(Value::lgl(false)))
            }
            TokKind::KwNull => {
                self.bump();
                Ok(Expr::lit(Value::Null))
            }
            TokKind::KwNa => {
                self.bump();
                Ok(Expr::lit(Value::Logical(vec![None])))
            }
            TokKind::KwInf => {
                self.bump();
                Ok(Expr::lit(Value::double(f64::INFINITY)))
            }
            TokKind::KwNaN => {
                self.bump();
                Ok(Expr::lit(Value::double(f64::NAN)))
            }
            TokKind::Ellipsis => {
                self.bump();
                Ok(Expr::Ellipsis)
            }
            TokKind::Ident(name) => {
                self.bump();
                Ok(Expr::Symbol(name))
            }

            // `(e)` is kept as a call so quoting returns exactly what was written
            TokKind::LParen => {
                self.open(Nest::Paren, TokKind::LParen)?;
                let inner = self.parse_expr_bp(0)?;
                self.close(TokKind::RParen)?;
                Ok(Expr::apply("(", [inner]))
            }

            TokKind::LBrace => self.parse_block(),
            TokKind::KwIf => self.parse_if(),
            TokKind::KwFunction => self.parse_function(),

            TokKind::Error(msg) => bail!("{} at offset {}", msg, tok_span.start),
            _ => bail!(
                "unexpected token in expression: {:?} at offset {}",
                tok_kind,
                tok_span.start
            ),
        }
    }

    fn parse_arg(&mut self) -> Result<Arg> {
        let name = match (&self.cur.kind, &self.nxt.kind) {
            (TokKind::Ident(n) | TokKind::Str(n), TokKind::Eq) => Some(n.clone()),
            _ => None,
        };
        if let Some(name) = name {
            self.bump(); // name
            self.bump(); // '='
            let value = self.parse_expr_bp(0)?;
            return Ok(Arg::named(name, value));
        }
        Ok(Arg::positional(self.parse_expr_bp(0)?))
    }

    fn parse_call_args(&mut self) -> Result<Vec<Arg>> {
        self.open(Nest::Paren, TokKind::LParen)?; // we are at '('
        let mut args = Vec::new();
        if !matches!(self.cur.kind, TokKind::RParen) {
            loop {
                args.push(self.parse_arg()?);
                if matches!(self.cur.kind, TokKind::Comma) {
                    self.bump();
                    continue;
                }
                break;
            }
        }
        self.close(TokKind::RParen)?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_binds_tighter_than_arithmetic() {
        let e = parse_expr(".data$x * 2").unwrap();
        assert_eq!(
            e,
            Expr::apply(
                "*",
                [
                    Expr::apply("$", [Expr::sym(".data"), Expr::sym("x")]),
                    Expr::lit(Value::double(2.0)),
                ]
            )
        );
    }

    #[test]
    fn unary_minus_is_looser_than_power() {
        let e = parse_expr("-2^2").unwrap();
        assert_eq!(
            e,
            Expr::apply(
                "-",
                [Expr::apply(
                    "^",
                    [Expr::lit(Value::double(2.0)), Expr::lit(Value::double(2.0))]
                )]
            )
        );
    }

    #[test]
    fn depth_counter_resets_between_siblings() {
        let src = (0..300).map(|_| "1").collect::<Vec<_>>().join(" + ");
        assert!(parse_expr(&src).is_ok());
    }
}
