//! Parser tests using rstest for parameterization and insta for snapshots.

use insta::assert_snapshot;
use rstest::rstest;
use shellac_kernel::parser::{parse, ChainLink};

fn render(links: &[ChainLink]) -> String {
    links
        .iter()
        .map(|link| {
            let words = link
                .words
                .iter()
                .map(|w| format!("{:?}", w))
                .collect::<Vec<_>>()
                .join(" ");
            format!("({}) {:?}", words, link.op)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run a parser test that expects successful parsing and compare with snapshot.
fn parse_and_render(input: &str) -> String {
    let links = parse(input).unwrap_or_else(|errors| {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        panic!("Parse error for {:?}: {}", input, error_msg);
    });
    render(&links)
}

#[test]
fn parser_single_command() {
    assert_snapshot!(parse_and_render("cake make -layers 3 -flavor vanilla"), @r#"("cake" "make" "-layers" "3" "-flavor" "vanilla") None"#);
}

#[test]
fn parser_chain_of_three() {
    assert_snapshot!(parse_and_render("success && failure || success"), @r#"
    ("success") And
    ("failure") Or
    ("success") None
    "#);
}

#[test]
fn parser_sequence_with_quotes() {
    assert_snapshot!(parse_and_render(r#"say "one; two" ; say 'three && four'"#), @r#"
    ("say" "one; two") Sequence
    ("say" "three && four") None
    "#);
}

#[test]
fn parser_background_flag_is_just_a_word() {
    assert_snapshot!(parse_and_render("deploy -background && deploy status"), @r#"
    ("deploy" "-background") And
    ("deploy" "status") None
    "#);
}

#[rstest]
#[case::empty("")]
#[case::spaces("    ")]
fn parser_empty_lines(#[case] input: &str) {
    assert_eq!(parse(input).expect("should parse"), vec![]);
}

#[rstest]
#[case::leading_and("&& a")]
#[case::leading_semi("; a")]
#[case::trailing_or("a ||")]
#[case::double_and("a && && b")]
#[case::double_semi("a ;; b")]
#[case::lone_amp("a & b")]
#[case::pipe("a | b")]
#[case::unbalanced("a 'b")]
fn parser_errors(#[case] input: &str) {
    assert!(parse(input).is_err(), "expected parse error for {:?}", input);
}
