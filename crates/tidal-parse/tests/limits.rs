//! Tests for parser nesting limits.

use tidal_parse::{parse_expr, MAX_NESTING_DEPTH};

/// Moderate nesting works; depth tracking must not break normal code.
#[test]
fn moderate_nesting_parses() {
    let src = format!("{}1{}", "(".repeat(50), ")".repeat(50));
    assert!(parse_expr(&src).is_ok(), "50 nested parens should work");
}

#[test]
fn excessive_nesting_is_rejected() {
    let n = MAX_NESTING_DEPTH as usize + 10;
    let src = format!("{}1{}", "(".repeat(n), ")".repeat(n));
    let err = parse_expr(&src).unwrap_err().to_string();
    assert!(err.contains("nesting depth limit exceeded"), "{}", err);
}

#[test]
fn limit_is_reasonable() {
    assert!(MAX_NESTING_DEPTH >= 128);
}
