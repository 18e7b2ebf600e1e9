use tidal_parse::{parse_expr, parse_program};

#[test]
fn trailing_tokens_are_an_error() {
    let err = parse_expr("a b").unwrap_err().to_string();
    assert!(err.contains("unexpected trailing input"), "{}", err);
}

#[test]
fn unclosed_call_is_an_error() {
    let err = parse_expr("f(1, 2").unwrap_err().to_string();
    assert!(err.contains("expected RParen"), "{}", err);
}

#[test]
fn unterminated_string_reports_offset() {
    let err = parse_expr("x == \"abc").unwrap_err().to_string();
    assert!(err.contains("unterminated string at offset 5"), "{}", err);
}

#[test]
fn assignment_to_call_is_rejected() {
    let err = parse_expr("f(x) <- 1").unwrap_err().to_string();
    assert!(err.contains("invalid assignment target"), "{}", err);
}

#[test]
fn two_expressions_on_one_line_need_a_separator() {
    let err = parse_program("<mem>", "a <- 1 b").unwrap_err().to_string();
    assert!(err.contains("expected newline or ';'"), "{}", err);
}

#[test]
fn dollar_requires_a_name() {
    let err = parse_expr(".data$1").unwrap_err().to_string();
    assert!(err.contains("expected name after '$'"), "{}", err);
}
