//! Lexer tests using rstest for parameterization.

use rstest::rstest;
use shellac_kernel::lexer::{tokenize, LexerError, Token};

/// Format a Token into a compact test string.
fn format_token(token: &Token) -> String {
    match token {
        Token::Word(w) => format!("WORD({})", w),
        Token::And => "AND".to_string(),
        Token::Or => "OR".to_string(),
        Token::Semi => "SEMI".to_string(),
        Token::Amp => "AMP".to_string(),
        Token::Pipe => "PIPE".to_string(),
        Token::DanglingEscape => "DANGLING".to_string(),
    }
}

fn run_lexer_test(input: &str, expected: &[&str]) {
    let tokens = tokenize(input).unwrap_or_else(|errs| {
        panic!("lexer failed for {:?}: {:?}", input, errs);
    });
    let actual: Vec<String> = tokens.iter().map(|t| format_token(&t.token)).collect();
    assert_eq!(actual, expected, "input: {:?}", input);
}

fn run_lexer_error_test(input: &str) {
    assert!(tokenize(input).is_err(), "expected lexer error for {:?}", input);
}

// =============================================================================
// Words
// =============================================================================

#[rstest]
#[case::bare("deploy", &["WORD(deploy)"])]
#[case::two_words("deploy status", &["WORD(deploy)", "WORD(status)"])]
#[case::option("-layers", &["WORD(-layers)"])]
#[case::negative("-5", &["WORD(-5)"])]
#[case::question("?", &["WORD(?)"])]
#[case::tabs("a\tb", &["WORD(a)", "WORD(b)"])]
#[case::unicode("gâteau", &["WORD(gâteau)"])]
fn lexer_words(#[case] input: &str, #[case] expected: &[&str]) {
    run_lexer_test(input, expected);
}

// =============================================================================
// Quoting
// =============================================================================

#[rstest]
#[case::double("\"a b\"", &["WORD(a b)"])]
#[case::single("'a b'", &["WORD(a b)"])]
#[case::single_keeps_double("'say \"hi\"'", &["WORD(say \"hi\")"])]
#[case::double_keeps_single("\"it's\"", &["WORD(it's)"])]
#[case::escaped_quote(r#""a\"b""#, &["WORD(a\"b)"])]
#[case::escaped_space(r"a\ b", &["WORD(a b)"])]
#[case::mixed(r#"x"y z"'w'"#, &["WORD(xy zw)"])]
#[case::empty_double("\"\"", &["WORD()"])]
#[case::operators_in_quotes("'a && b || c ; d'", &["WORD(a && b || c ; d)"])]
fn lexer_quoting(#[case] input: &str, #[case] expected: &[&str]) {
    run_lexer_test(input, expected);
}

#[rstest]
#[case::open_double("\"abc", LexerError::UnterminatedString)]
#[case::open_single("'abc", LexerError::UnterminatedString)]
#[case::open_after_command("say \"hello", LexerError::UnterminatedString)]
#[case::open_single_after_command("say 'hello", LexerError::UnterminatedString)]
#[case::open_after_word("abc\"def", LexerError::UnterminatedString)]
#[case::open_swallows_operators("a && say 'b || c", LexerError::UnterminatedString)]
#[case::dangling_escape("abc\\", LexerError::DanglingEscape)]
fn lexer_quoting_errors(#[case] input: &str, #[case] expected: LexerError) {
    run_lexer_error_test(input);
    let errs = tokenize(input).expect_err("should fail");
    assert!(
        errs.iter().any(|e| e.token == expected),
        "input {:?} gave {:?}",
        input,
        errs
    );
}

// =============================================================================
// Operators
// =============================================================================

#[rstest]
#[case::semi("a; b", &["WORD(a)", "SEMI", "WORD(b)"])]
#[case::and("a && b", &["WORD(a)", "AND", "WORD(b)"])]
#[case::or("a || b", &["WORD(a)", "OR", "WORD(b)"])]
#[case::tight("a&&b", &["WORD(a)", "AND", "WORD(b)"])]
#[case::amp("a &", &["WORD(a)", "AMP"])]
#[case::pipe("a | b", &["WORD(a)", "PIPE", "WORD(b)"])]
#[case::triple_amp("a &&& b", &["WORD(a)", "AND", "AMP", "WORD(b)"])]
#[case::escaped_semi(r"a\; b", &["WORD(a;)", "WORD(b)"])]
fn lexer_operators(#[case] input: &str, #[case] expected: &[&str]) {
    run_lexer_test(input, expected);
}
