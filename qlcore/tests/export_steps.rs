use qlcore::error::VerifyError;
use qlcore::grammar::{Grammar, GrammarCaps};
use qlcore::messages::MessageSink;
use qlcore::tests_utils::Fixture;
use qlcore::verify::export::export_steps;

/// Classification flags and cached trees come from a grammar build; export
/// runs downstream of it.
fn build_grammar(fx: &mut Fixture) {
    let mut g = Grammar::new(GrammarCaps::default());
    let mut sink = MessageSink::default();
    g.parse_all_formulas(&mut fx.syms, &mut fx.stmts, &mut sink);
    assert!(!sink.has_errors(), "{:?}", sink.errors());
}

#[test]
fn identity_proof_exports_five_visible_steps() {
    let mut fx = Fixture::propositional();
    build_grammar(&mut fx);
    let id = fx.stmt("id");
    let steps = export_steps(&fx.syms, &fx.stmts, id).expect("id exports");

    let labels: Vec<&str> = steps.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["ax-1", "ax-1", "ax-2", "ax-mp", "ax-mp"]);
    assert_eq!(steps.len(), 5, "syntax-building steps are not exported");

    // Hypothesis-free assertions discharge nothing.
    assert!(steps[0].refs.is_empty());
    assert!(steps[1].refs.is_empty());
    assert!(steps[2].refs.is_empty());
    // The first modus ponens discharges steps 2 and 3, the second steps 1
    // and 4, each in min/maj order.
    assert_eq!(steps[3].refs, vec![2, 3]);
    assert_eq!(steps[4].refs, vec![1, 4]);

    // The final visible step carries the theorem's formula, and the
    // justifying assertion's cached tree rides along.
    assert_eq!(steps[4].formula, fx.stmts[id].formula);
    assert_eq!(steps[4].nbr, 5);
    assert!(steps[4].tree.is_some());
}

#[test]
fn logical_hypotheses_export_as_visible_steps() {
    let mut fx = Fixture::propositional();
    fx.log_hyp("mpu.1", "|- ph");
    fx.log_hyp("mpu.2", "|- ( ph -> ps )");
    fx.theorem(
        "mpu",
        "|- ps",
        &["wph", "wps", "mpu.1", "mpu.2"],
        &["wph", "wps", "mpu.1", "mpu.2", "ax-mp"],
    );
    build_grammar(&mut fx);

    let mpu = fx.stmt("mpu");
    let steps = export_steps(&fx.syms, &fx.stmts, mpu).expect("mpu exports");
    let labels: Vec<&str> = steps.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["mpu.1", "mpu.2", "ax-mp"]);
    assert_eq!(steps[2].refs, vec![1, 2]);
}

#[test]
fn incomplete_proofs_do_not_export() {
    let mut fx = Fixture::propositional();
    build_grammar(&mut fx);
    let id = fx.stmt("id");
    fx.stmts[id].proof[10] = None;

    let err = export_steps(&fx.syms, &fx.stmts, id).unwrap_err();
    assert!(
        matches!(err, VerifyError::IncompleteStep { step: 11, .. }),
        "got {err}"
    );
}
