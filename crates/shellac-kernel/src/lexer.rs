//! Lexer for shellac command lines.
//!
//! Converts a raw input line into words and chain operators using the logos
//! lexer generator. Quoting is resolved here: a word token carries its final
//! text with quotes removed and escapes applied, so nothing downstream ever
//! sees a quote character that the user meant as syntax.
//!
//! # Quoting
//!
//! - `'single'` quotes are literal, no escapes.
//! - `"double"` quotes honour `\"` and `\\`; any other backslash is kept.
//! - Outside quotes a backslash escapes the next character.
//!
//! Quoted regions are never split on whitespace and never treated as
//! operators, so `say "a && b"` is one command with one argument.

use logos::{Logos, Span};
use std::fmt;

/// A token with its span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Default, thiserror::Error)]
pub enum LexerError {
    #[default]
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("dangling escape at end of line")]
    DanglingEscape,
}

/// Tokens of a command line.
///
/// `&` and `|` are recognised only so the parser can reject them with a
/// useful message; shellac has no pipelines or shell-style backgrounding.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexerError)]
#[logos(skip r"\s+")]
pub enum Token {
    #[token("&&")]
    And,

    #[token("||")]
    Or,

    #[token(";")]
    Semi,

    #[token("&")]
    Amp,

    #[token("|")]
    Pipe,

    /// A word, possibly stitched together from quoted and unquoted pieces.
    ///
    /// A quote left open at the end of the line is still taken as part of
    /// the word so `unquote` can report it as unterminated.
    #[regex(r#"(([^\s;&|'"\\]|\\.|'[^']*'|"([^"\\]|\\.)*")+('[^']*|"([^"\\]|\\.)*)?)|'[^']*|"([^"\\]|\\.)*"#, lex_word)]
    Word(String),

    /// A backslash with nothing after it. Always an error.
    #[token("\\", lex_dangling_escape)]
    DanglingEscape,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Semi => write!(f, ";"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Word(w) => write!(f, "{}", w),
            Token::DanglingEscape => write!(f, "\\"),
        }
    }
}

impl Token {
    /// True for the three chain operators.
    pub fn is_chain_operator(&self) -> bool {
        matches!(self, Token::And | Token::Or | Token::Semi)
    }
}

/// Lex a word, stripping quotes and applying escapes.
fn lex_word(lex: &mut logos::Lexer<Token>) -> Result<String, LexerError> {
    unquote(lex.slice())
}

fn lex_dangling_escape(_lex: &mut logos::Lexer<Token>) -> Result<(), LexerError> {
    Err(LexerError::DanglingEscape)
}

/// Resolve quoting in a raw word.
///
/// Fails on a quote the word left open.
pub fn unquote(raw: &str) -> Result<String, LexerError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(next) => out.push(next),
                None => return Err(LexerError::DanglingEscape),
            },
            '\'' => loop {
                match chars.next() {
                    Some('\'') => break,
                    Some(c) => out.push(c),
                    None => return Err(LexerError::UnterminatedString),
                }
            },
            '"' => loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(c @ ('"' | '\\')) => out.push(c),
                        Some(c) => {
                            out.push('\\');
                            out.push(c);
                        }
                        None => return Err(LexerError::UnterminatedString),
                    },
                    Some(c) => out.push(c),
                    None => return Err(LexerError::UnterminatedString),
                }
            },
            c => out.push(c),
        }
    }

    Ok(out)
}

/// Tokenize a command line.
///
/// Returns every error found rather than stopping at the first one.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, Vec<Spanned<LexerError>>> {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, span) in lexer.spanned() {
        match result {
            Ok(token) => tokens.push(Spanned::new(token, span)),
            Err(err) => errors.push(Spanned::new(err, span)),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

/// Split a line into words only, ignoring chain operators.
///
/// Used by completion, which only cares about the words typed so far.
pub fn split_words(source: &str) -> Result<Vec<String>, LexerError> {
    let tokens = tokenize(source).map_err(|mut errs| errs.remove(0).token)?;
    Ok(tokens
        .into_iter()
        .filter_map(|t| match t.token {
            Token::Word(w) => Some(w),
            _ => None,
        })
        .collect())
}
