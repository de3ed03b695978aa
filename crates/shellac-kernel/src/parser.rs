//! Parser for shellac command lines.
//!
//! Turns the lexer's token stream into an ordered list of [`ChainLink`]s.
//! Uses chumsky for the grammar:
//!
//! ```text
//! line    := (command (op command)* ";"?)?
//! command := WORD+
//! op      := ";" | "&&" | "||"
//! ```

use crate::lexer::{self, Token};
use chumsky::{input::ValueInput, prelude::*};

/// Span type used throughout the parser.
pub type Span = SimpleSpan;

/// Operator trailing a chain link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOp {
    /// `;`: run the next link regardless of status.
    Sequence,
    /// `&&`: run the next link only on success.
    And,
    /// `||`: run the next link only on failure.
    Or,
    /// Last link of the line.
    None,
}

impl std::fmt::Display for ChainOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainOp::Sequence => write!(f, ";"),
            ChainOp::And => write!(f, "&&"),
            ChainOp::Or => write!(f, "||"),
            ChainOp::None => Ok(()),
        }
    }
}

/// One command invocation and the operator that follows it.
///
/// `words` holds the command name tokens followed by the raw argument
/// tokens; where the name ends is only known once the registry has looked
/// at them.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLink {
    pub words: Vec<String>,
    pub op: ChainOp,
    pub span: Span,
}

impl ChainLink {
    /// The link's words re-joined for display (job listings, log lines).
    pub fn display_words(&self) -> String {
        self.words
            .iter()
            .map(|w| {
                if w.is_empty() || w.chars().any(|c| c.is_whitespace() || ";&|'\"\\".contains(c)) {
                    format!("{:?}", w)
                } else {
                    w.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parse error with location and context.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at {span:?}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

/// Parse a command line into chain links.
///
/// An empty or whitespace-only line is an empty chain.
pub fn parse(source: &str) -> Result<Vec<ChainLink>, Vec<ParseError>> {
    let tokens = lexer::tokenize(source).map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                span: (e.span.start..e.span.end).into(),
                message: format!("lexer error: {}", e.token),
            })
            .collect::<Vec<_>>()
    })?;

    let tokens: Vec<(Token, Span)> = tokens
        .into_iter()
        .map(|spanned| (spanned.token, (spanned.span.start..spanned.span.end).into()))
        .collect();

    let end_span: Span = (source.len()..source.len()).into();

    let parser = line_parser();
    let result = parser.parse(tokens.as_slice().map(end_span, |(t, s)| (t, s)));

    result.into_result().map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                span: *e.span(),
                message: describe(&e),
            })
            .collect()
    })
}

/// Friendlier wording for the mistakes people actually make.
fn describe(err: &Rich<'_, Token, Span>) -> String {
    match err.found() {
        Some(Token::Amp) => "'&' is not supported, use '&&' or the -background flag".to_string(),
        Some(Token::Pipe) => "pipes are not supported, use '||' for fallbacks".to_string(),
        Some(op) if op.is_chain_operator() => format!("missing command before '{}'", op),
        None => "missing command at end of line".to_string(),
        _ => err.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Parser Combinators - generic over input type
// ═══════════════════════════════════════════════════════════════════════════

fn line_parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Vec<ChainLink>, extra::Err<Rich<'tokens, Token, Span>>>
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    let command = command_parser();

    command
        .clone()
        .then(
            operator_parser()
                .then(command)
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(just(Token::Semi).or_not())
        .map(|(first, rest)| link_up(first, rest))
        .or_not()
        .map(Option::unwrap_or_default)
        .then_ignore(end())
}

/// One or more words, with the span they cover.
fn command_parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, (Vec<String>, Span), extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! { Token::Word(w) => w }
        .repeated()
        .at_least(1)
        .collect::<Vec<_>>()
        .map_with(|words, e| (words, e.span()))
}

fn operator_parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, ChainOp, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    choice((
        just(Token::Semi).to(ChainOp::Sequence),
        just(Token::And).to(ChainOp::And),
        just(Token::Or).to(ChainOp::Or),
    ))
}

/// Pair each command with the operator that follows it.
fn link_up(first: (Vec<String>, Span), rest: Vec<(ChainOp, (Vec<String>, Span))>) -> Vec<ChainLink> {
    let mut links = Vec::with_capacity(rest.len() + 1);
    let (mut words, mut span) = first;

    for (op, (next_words, next_span)) in rest {
        links.push(ChainLink { words, op, span });
        words = next_words;
        span = next_span;
    }
    links.push(ChainLink { words, op: ChainOp::None, span });
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn render(source: &str) -> String {
        let links = parse(source).expect("should parse");
        links
            .iter()
            .map(|l| match l.op {
                ChainOp::None => format!("[{}]", l.words.join(" | ")),
                op => format!("[{}] {}", l.words.join(" | "), op),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn empty_line_is_empty_chain() {
        assert_eq!(parse("").expect("should parse"), vec![]);
        assert_eq!(parse("   \t ").expect("should parse"), vec![]);
    }

    #[test]
    fn single_command_has_no_operator() {
        let links = parse("deploy status").expect("should parse");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].words, vec!["deploy", "status"]);
        assert_eq!(links[0].op, ChainOp::None);
    }

    #[test]
    fn mixed_chain() {
        assert_snapshot!(render("a 1; b && c -x '2 3' || d"), @r"
        [a | 1] ;
        [b] &&
        [c | -x | 2 3] ||
        [d]
        ");
    }

    #[test]
    fn trailing_semicolon_is_allowed() {
        let links = parse("a ;").expect("should parse");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].op, ChainOp::None);
    }

    #[test]
    fn spans_point_at_commands() {
        let links = parse("ab c && d").expect("should parse");
        assert_eq!(links[0].span, Span::from(0..4));
        assert_eq!(links[1].span, Span::from(8..9));
    }

    #[test]
    fn leading_operator_is_an_error() {
        let errs = parse("&& a").expect_err("should fail");
        assert_eq!(errs[0].message, "missing command before '&&'");
    }

    #[test]
    fn doubled_operator_is_an_error() {
        assert!(parse("a && && b").is_err());
        assert!(parse("a ;; b").is_err());
    }

    #[test]
    fn dangling_and_is_an_error() {
        let errs = parse("a &&").expect_err("should fail");
        assert!(errs[0].message.starts_with("missing command"));
    }

    #[test]
    fn single_ampersand_is_rejected() {
        let errs = parse("deploy &").expect_err("should fail");
        assert!(errs[0].message.contains("-background"));
    }

    #[test]
    fn pipe_is_rejected() {
        let errs = parse("a | b").expect_err("should fail");
        assert!(errs[0].message.contains("pipes are not supported"));
    }

    #[test]
    fn unbalanced_quote_aborts_whole_line() {
        let errs = parse(r#"ok && say "oops"#).expect_err("should fail");
        assert!(errs[0].message.contains("unterminated string"));
    }

    #[test]
    fn display_words_requotes() {
        let links = parse(r#"say "a b" plain ''"#).expect("should parse");
        assert_eq!(links[0].display_words(), r#"say "a b" plain """#);
    }
}
