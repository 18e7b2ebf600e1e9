#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    // trivia / eof / error
    Eof,
    Newline,
    /// Error token (unterminated string, stray character)
    Error(String),
    // punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dollar,
    Ellipsis, // ...
    // assignment
    Eq,     // = (argument names only)
    LArrow, // <-
    // arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    PercentPercent, // %%
    // equality
    EqEq,
    BangEq,
    // relational
    Lt,
    Le,
    Gt,
    Ge,
    // logical
    And,
    AndAnd,
    Or,
    OrOr,
    Bang,
    // idents / keywords
    Ident(String),
    KwFunction, // `function` or `\`
    KwIf,
    KwElse,
    KwTrue,
    KwFalse,
    KwNull,
    KwNa,
    KwInf,
    KwNaN,
    // literals
    Int(i64),
    Num(f64),
    Str(String),
}

#[derive(Debug, Clone)]
pub struct Tok {
    pub kind: TokKind,
    pub span: Span,
}
