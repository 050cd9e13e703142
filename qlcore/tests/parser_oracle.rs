//! Cross-check: the chart parser and the naive all-derivations parser must
//! agree on every fixture formula.
use qlcore::grammar::{Grammar, GrammarCaps};
use qlcore::messages::MessageSink;
use qlcore::parser::BottomUpParser;
use qlcore::tests_utils::Fixture;
use qlformal::prelude::*;

fn tree_sets_equal(a: &[ParseTree], b: &[ParseTree]) -> bool {
    a.len() == b.len()
        && a.iter().all(|x| b.iter().any(|y| x.structurally_eq(y)))
        && b.iter().all(|y| a.iter().any(|x| y.structurally_eq(x)))
}

fn cross_check(fx: &mut Fixture, formulas: &[&str]) {
    let mut earley = Grammar::new(GrammarCaps::default());
    let mut oracle =
        Grammar::with_parser(GrammarCaps::default(), Box::new(BottomUpParser::new()));
    let mut sink = MessageSink::default();

    for text in formulas {
        let f = fx.formula(text);
        let a = earley
            .parse_formula(&mut fx.syms, &fx.stmts, &f, u32::MAX, 16, &mut sink)
            .unwrap_or_default();
        let b = oracle
            .parse_formula(&mut fx.syms, &fx.stmts, &f, u32::MAX, 16, &mut sink)
            .unwrap_or_default();
        assert!(
            tree_sets_equal(&a, &b),
            "parsers disagree on {text:?}: chart found {} trees, oracle {}",
            a.len(),
            b.len()
        );
        assert!(!a.is_empty(), "expected at least one derivation for {text:?}");
    }
}

#[test]
fn parsers_agree_on_the_propositional_fixture() {
    let mut fx = Fixture::propositional();
    cross_check(
        &mut fx,
        &[
            "wff ( ph -> ps )",
            "wff -. ph",
            "wff ( -. ph -> -. -. ps )",
            "wff ( ( ph -> ps ) -> ( ps -> ch ) )",
            "wff ( ph -> ( ps -> ( ch -> ph ) ) )",
        ],
    );
}

#[test]
fn parsers_agree_on_overloaded_notation() {
    let mut fx = Fixture::propositional();
    fx.axiom("wi2", "wff ( ph -> ps )", &["wph", "wps"]);
    cross_check(
        &mut fx,
        &["wff ( ph -> ps )", "wff ( ( ph -> ps ) -> ch )"],
    );
}

#[test]
fn parsers_agree_on_coercions_and_nulls() {
    let mut fx = Fixture::new();
    fx.consts(&["|-", "wff", "class", "setvar", "=", "term", "+"])
        .vars(&["x", "y", "A"]);
    fx.var_hyp("vx", "setvar", "x");
    fx.var_hyp("vy", "setvar", "y");
    fx.var_hyp("cA", "class", "A");
    fx.axiom("cv", "class x", &["vx"]);
    fx.axiom("wceq", "wff A = x", &["cA", "vx"]);

    cross_check(&mut fx, &["wff A = x", "wff x = y", "wff x = x"]);
}

#[test]
fn parsers_agree_that_garbage_does_not_parse() {
    let mut fx = Fixture::propositional();
    let mut earley = Grammar::new(GrammarCaps::default());
    let mut oracle =
        Grammar::with_parser(GrammarCaps::default(), Box::new(BottomUpParser::new()));
    let mut sink = MessageSink::default();

    for text in ["wff ( ph ->", "wff ph ps", "wff -> ph"] {
        let f = fx.formula(text);
        assert!(
            earley
                .parse_formula(&mut fx.syms, &fx.stmts, &f, u32::MAX, 4, &mut sink)
                .is_err(),
            "chart accepted {text:?}"
        );
        assert!(
            oracle
                .parse_formula(&mut fx.syms, &fx.stmts, &f, u32::MAX, 4, &mut sink)
                .is_err(),
            "oracle accepted {text:?}"
        );
    }
}
