use crate::token::{Span, Tok, TokKind};

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn bump(&mut self) -> Option<u8> {
        if self.pos >= self.src.len() {
            None
        } else {
            let b = self.src[self.pos];
            self.pos += 1;
            Some(b)
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }
    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn span(&self, start: usize) -> Span {
        Span {
            start: start as u32,
            end: self.pos as u32,
        }
    }

    fn tok(&self, kind: TokKind, start: usize) -> Tok {
        Tok {
            kind,
            span: self.span(start),
        }
    }

    // Newlines are significant (statement separators), so only spaces, tabs
    // and carriage returns are skipped here.
    fn skip_ws_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
                self.bump();
            }
            // line comment: #
            if self.peek() == Some(b'#') {
                while let Some(b) = self.peek() {
                    if b == b'\n' {
                        break;
                    }
                    self.bump();
                }
                continue;
            }
            break;
        }
    }

    /// Read a quoted run up to `close`, handling backslash escapes.
    fn quoted(&mut self, close: u8) -> Option<String> {
        let mut bytes = Vec::new();
        loop {
            let b = self.bump()?;
            if b == close {
                return Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            if b == b'\\' {
                let esc = self.bump()?;
                let real = match esc {
                    b'n' => b'\n',
                    b't' => b'\t',
                    b'r' => b'\r',
                    b'0' => b'\0',
                    other => other,
                };
                bytes.push(real);
            } else {
                bytes.push(b);
            }
        }
    }

    fn number(&mut self, start: usize) -> Tok {
        let mut dot = self.src[start] == b'.';
        let mut exp = false;
        while let Some(p) = self.peek() {
            match p {
                b'0'..=b'9' => {
                    self.bump();
                }
                b'.' if !dot && !exp => {
                    dot = true;
                    self.bump();
                }
                b'e' | b'E' if !exp => {
                    exp = true;
                    self.bump();
                    if matches!(self.peek(), Some(b'+' | b'-')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        // `5L` is an integer literal; everything else is a double.
        if self.peek() == Some(b'L') && !dot && !exp {
            self.bump();
            return match text.parse::<i64>() {
                Ok(v) => self.tok(TokKind::Int(v), start),
                Err(_) => self.tok(
                    TokKind::Error(format!("integer literal out of range: {}L", text)),
                    start,
                ),
            };
        }
        match text.parse::<f64>() {
            Ok(v) => self.tok(TokKind::Num(v), start),
            Err(_) => self.tok(
                TokKind::Error(format!("malformed number: {}", text)),
                start,
            ),
        }
    }

    pub fn next_tok(&mut self) -> Tok {
        self.skip_ws_and_comments();
        let start = self.pos;
        let Some(b) = self.bump() else {
            return self.tok(TokKind::Eof, start);
        };
        let c = b as char;

        // multi-char operators first
        let two = match (c, self.peek().map(|p| p as char)) {
            ('&', Some('&')) => Some(TokKind::AndAnd),
            ('|', Some('|')) => Some(TokKind::OrOr),
            ('=', Some('=')) => Some(TokKind::EqEq),
            ('!', Some('=')) => Some(TokKind::BangEq),
            ('<', Some('=')) => Some(TokKind::Le),
            ('>', Some('=')) => Some(TokKind::Ge),
            ('%', Some('%')) => Some(TokKind::PercentPercent),
            ('<', Some('-')) => Some(TokKind::LArrow),
            _ => None,
        };
        if let Some(k) = two {
            self.bump();
            return self.tok(k, start);
        }

        if c == '.' && self.peek() == Some(b'.') && self.peek2() == Some(b'.') {
            self.bump();
            self.bump();
            return self.tok(TokKind::Ellipsis, start);
        }

        // 1-char punctuation/operators
        let single = match c {
            '\n' => Some(TokKind::Newline),
            '(' => Some(TokKind::LParen),
            ')' => Some(TokKind::RParen),
            '{' => Some(TokKind::LBrace),
            '}' => Some(TokKind::RBrace),
            ',' => Some(TokKind::Comma),
            ';' => Some(TokKind::Semicolon),
            '$' => Some(TokKind::Dollar),
            '+' => Some(TokKind::Plus),
            '-' => Some(TokKind::Minus),
            '*' => Some(TokKind::Star),
            '/' => Some(TokKind::Slash),
            '^' => Some(TokKind::Caret),
            '=' => Some(TokKind::Eq),
            '<' => Some(TokKind::Lt),
            '>' => Some(TokKind::Gt),
            '&' => Some(TokKind::And),
            '|' => Some(TokKind::Or),
            '!' => Some(TokKind::Bang),
            '\\' => Some(TokKind::KwFunction),
            _ => None,
        };
        if let Some(k) = single {
            return self.tok(k, start);
        }

        // strings, both quote styles
        if c == '"' || c == '\'' {
            return match self.quoted(b) {
                Some(s) => self.tok(TokKind::Str(s), start),
                None => self.tok(TokKind::Error("unterminated string".into()), start),
            };
        }

        // `non syntactic` names
        if c == '`' {
            return match self.quoted(b'`') {
                Some(s) if !s.is_empty() => self.tok(TokKind::Ident(s), start),
                Some(_) => self.tok(TokKind::Error("empty backquoted name".into()), start),
                None => self.tok(TokKind::Error("unterminated backquote".into()), start),
            };
        }

        // number (int/double), including `.5`
        if c.is_ascii_digit() || (c == '.' && matches!(self.peek(), Some(b'0'..=b'9'))) {
            return self.number(start);
        }

        // ident / keywords
        if c.is_ascii_alphabetic() || c == '.' {
            while let Some(p) = self.peek() {
                if p.is_ascii_alphanumeric() || p == b'_' || p == b'.' {
                    self.bump();
                } else {
                    break;
                }
            }
            let s = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
            let kind = match s.as_str() {
                "function" => TokKind::KwFunction,
                "if" => TokKind::KwIf,
                "else" => TokKind::KwElse,
                "TRUE" => TokKind::KwTrue,
                "FALSE" => TokKind::KwFalse,
                "NULL" => TokKind::KwNull,
                "NA" => TokKind::KwNa,
                "Inf" => TokKind::KwInf,
                "NaN" => TokKind::KwNaN,
                _ => TokKind::Ident(s),
            };
            return self.tok(kind, start);
        }

        self.tok(TokKind::Error(format!("unexpected character '{}'", c)), start)
    }
}
