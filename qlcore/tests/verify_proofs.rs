use qlcore::error::VerifyError;
use qlcore::grammar::{Grammar, GrammarCaps};
use qlcore::messages::MessageSink;
use qlcore::tests_utils::Fixture;
use qlcore::verify::{DjPolicy, ProofVerifier, VerifyCaps};

fn verifier() -> ProofVerifier {
    ProofVerifier::new(VerifyCaps::default())
}

/// The propositional fixture plus a theorem carrying its own logical
/// hypotheses, replayed through modus ponens.
fn fixture_with_mp_use() -> Fixture {
    let mut fx = Fixture::propositional();
    fx.log_hyp("mpu.1", "|- ph");
    fx.log_hyp("mpu.2", "|- ( ph -> ps )");
    fx.theorem(
        "mpu",
        "|- ps",
        &["wph", "wps", "mpu.1", "mpu.2"],
        &["wph", "wps", "mpu.1", "mpu.2", "ax-mp"],
    );
    fx
}

#[test]
fn modus_ponens_replay_succeeds() {
    let fx = fixture_with_mp_use();
    let mut v = verifier();
    let mpu = fx.stmt("mpu");
    v.verify_proof(&fx.syms, &fx.stmts, mpu, &mut DjPolicy::Raise)
        .expect("hypotheses push, ax-mp pops and substitutes");
}

#[test]
fn omitting_a_hypothesis_underflows_at_the_assertion_step() {
    let mut fx = fixture_with_mp_use();
    let mpu = fx.stmt("mpu");
    fx.stmts[mpu].proof = ["wph", "wps", "mpu.1", "ax-mp"]
        .iter()
        .map(|l| Some(fx.stmts.lookup(l).unwrap()))
        .collect();

    let mut v = verifier();
    let err = v
        .verify_proof(&fx.syms, &fx.stmts, mpu, &mut DjPolicy::Raise)
        .unwrap_err();
    match err {
        VerifyError::StackUnderflow { step, label, .. } => {
            assert_eq!(step, 4);
            assert_eq!(label, "ax-mp");
        }
        other => panic!("expected stack underflow, got {other}"),
    }
}

#[test]
fn incomplete_step_fails_with_its_number() {
    let mut fx = fixture_with_mp_use();
    let mpu = fx.stmt("mpu");
    fx.stmts[mpu].proof[2] = None;

    let mut v = verifier();
    let err = v
        .verify_proof(&fx.syms, &fx.stmts, mpu, &mut DjPolicy::Raise)
        .unwrap_err();
    assert!(
        matches!(err, VerifyError::IncompleteStep { step: 3, .. }),
        "got {err}"
    );
}

#[test]
fn classic_identity_proof_replays_to_one_stack_entry() {
    let fx = Fixture::propositional();
    let mut v = verifier();
    let id = fx.stmt("id");
    v.verify_proof(&fx.syms, &fx.stmts, id, &mut DjPolicy::Raise)
        .expect("the ax-1/ax-2/ax-mp derivation of id is valid");
}

#[test]
fn truncated_proof_leaves_extra_stack_entries() {
    let mut fx = Fixture::propositional();
    let id = fx.stmt("id");
    fx.stmts[id].proof.pop();

    let mut v = verifier();
    let err = v
        .verify_proof(&fx.syms, &fx.stmts, id, &mut DjPolicy::Raise)
        .unwrap_err();
    assert!(
        matches!(err, VerifyError::FinalStackSize { entries: 4, .. }),
        "got {err}"
    );
}

#[test]
fn swapped_hypotheses_fail_the_logical_hypothesis_check() {
    let mut fx = fixture_with_mp_use();
    let mpu = fx.stmt("mpu");
    fx.stmts[mpu].proof = ["wph", "wps", "mpu.2", "mpu.1", "ax-mp"]
        .iter()
        .map(|l| Some(fx.stmts.lookup(l).unwrap()))
        .collect();

    let mut v = verifier();
    let err = v
        .verify_proof(&fx.syms, &fx.stmts, mpu, &mut DjPolicy::Raise)
        .unwrap_err();
    assert!(
        matches!(err, VerifyError::LogHypMismatch { step: 5, .. }),
        "got {err}"
    );
}

#[test]
fn corrupting_a_syntax_step_is_detected() {
    let mut fx = Fixture::propositional();
    let id = fx.stmt("id");
    // Step 9 should push "wff ph" for ax-1's first argument; push "wff ps"
    // instead.
    fx.stmts[id].proof[8] = Some(fx.stmt("wps"));

    let mut v = verifier();
    let err = v
        .verify_proof(&fx.syms, &fx.stmts, id, &mut DjPolicy::Raise)
        .unwrap_err();
    // The corruption surfaces where the substituted conclusion stops
    // matching: mpu's min hypothesis at the first ax-mp.
    assert!(
        matches!(err, VerifyError::LogHypMismatch { .. } | VerifyError::FinalFormulaMismatch { .. }),
        "got {err}"
    );
}

#[test]
fn hypothesis_outside_the_frame_is_unresolved() {
    let mut fx = fixture_with_mp_use();
    // "min" belongs to ax-mp's frame, not to this theorem's.
    fx.theorem("bad", "|- ph", &["wph"], &["min"]);

    let mut v = verifier();
    let bad = fx.stmt("bad");
    let err = v
        .verify_proof(&fx.syms, &fx.stmts, bad, &mut DjPolicy::Raise)
        .unwrap_err();
    assert!(
        matches!(err, VerifyError::UnresolvedLabel { step: 1, .. }),
        "got {err}"
    );
}

#[test]
fn forward_assertion_references_are_unresolved() {
    let mut fx = Fixture::propositional();
    fx.theorem("early", "|- ( ph -> ph )", &["wph"], &["wph"]);
    fx.theorem("late", "|- ( ph -> ph )", &["wph"], &["wph"]);
    let early = fx.stmt("early");
    let late = fx.stmt("late");
    fx.stmts[early].proof = vec![Some(late)];

    let mut v = verifier();
    let err = v
        .verify_proof(&fx.syms, &fx.stmts, early, &mut DjPolicy::Raise)
        .unwrap_err();
    assert!(
        matches!(err, VerifyError::UnresolvedLabel { step: 1, .. }),
        "got {err}"
    );
}

#[test]
fn verify_all_reports_failures_and_continues() {
    let mut fx = fixture_with_mp_use();
    let mpu = fx.stmt("mpu");
    fx.stmts[mpu].proof[2] = None;
    // A second, valid theorem after the broken one.
    fx.theorem(
        "mpu2",
        "|- ps",
        &["wph", "wps", "mpu.1", "mpu.2"],
        &["wph", "wps", "mpu.1", "mpu.2", "ax-mp"],
    );

    let mut v = verifier();
    let mut sink = MessageSink::default();
    v.verify_all(&fx.syms, &fx.stmts, &mut sink)
        .expect("no capacity exhaustion");
    // Only the broken theorem reports; id and mpu2 verify.
    assert_eq!(sink.error_count(), 1, "{:?}", sink.errors());
    assert!(sink.errors()[0].text.contains("incomplete"));
    assert_eq!(sink.errors()[0].pos.label, "mpu");
}

#[test]
fn grammar_derived_trees_self_verify_expression_only() {
    let mut fx = Fixture::propositional();
    let mut g = Grammar::new(GrammarCaps::default());
    let mut sink = MessageSink::default();

    let id = fx.stmt("id");
    let tree = g
        .parse_one_statement(&mut fx.syms, &mut fx.stmts, id, &mut sink)
        .expect("id's formula parses");

    let mut v = verifier();
    let target = fx.stmts[id].formula.clone();
    v.verify_derivation(&fx.syms, &fx.stmts, &tree, &target, "id")
        .expect("replaying the tree's RPN rebuilds the expression");
}
