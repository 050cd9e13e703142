use qlcore::error::VerifyError;
use qlcore::tests_utils::Fixture;
use qlcore::verify::{DjPolicy, ProofVerifier, VerifyCaps};

fn verifier() -> ProofVerifier {
    ProofVerifier::new(VerifyCaps::default())
}

/// The propositional fixture plus an axiom constraining its two variables
/// to stay disjoint under substitution.
fn dj_fixture() -> Fixture {
    let mut fx = Fixture::propositional();
    fx.axiom_dj("dj-ax", "|- ( ph -> ps )", &["wph", "wps"], &[("ph", "ps")]);
    fx
}

#[test]
fn substituting_one_variable_into_both_members_fails() {
    let mut fx = dj_fixture();
    fx.theorem("thdj", "|- ( ch -> ch )", &["wch"], &["wch", "wch", "dj-ax"]);

    let mut v = verifier();
    let thdj = fx.stmt("thdj");
    let err = v
        .verify_proof(&fx.syms, &fx.stmts, thdj, &mut DjPolicy::Raise)
        .unwrap_err();
    match err {
        VerifyError::DjVarsViolation { step, var1, var2, .. } => {
            assert_eq!(step, 3);
            assert_eq!(var1, "ch");
            assert_eq!(var2, "ch");
        }
        other => panic!("expected a disjoint-variable violation, got {other}"),
    }
}

#[test]
fn covering_declaration_in_the_target_frame_passes() {
    let mut fx = dj_fixture();
    fx.theorem_dj(
        "thok",
        "|- ( ps -> ch )",
        &["wps", "wch"],
        &[("ps", "ch")],
        &["wps", "wch", "dj-ax"],
    );

    let mut v = verifier();
    let thok = fx.stmt("thok");
    v.verify_proof(&fx.syms, &fx.stmts, thok, &mut DjPolicy::Raise)
        .expect("the induced pair is declared disjoint by the theorem");
}

#[test]
fn missing_covering_declaration_fails_naming_both_variables() {
    let mut fx = dj_fixture();
    fx.theorem(
        "thmiss",
        "|- ( ps -> ch )",
        &["wps", "wch"],
        &["wps", "wch", "dj-ax"],
    );

    let mut v = verifier();
    let thmiss = fx.stmt("thmiss");
    let err = v
        .verify_proof(&fx.syms, &fx.stmts, thmiss, &mut DjPolicy::Raise)
        .unwrap_err();
    match err {
        VerifyError::DjVarsViolation { var1, var2, .. } => {
            assert_eq!((var1.as_str(), var2.as_str()), ("ps", "ch"));
        }
        other => panic!("expected a disjoint-variable violation, got {other}"),
    }
}

#[test]
fn transitive_sharing_through_nested_substitution_fails() {
    let mut fx = dj_fixture();
    // ph := ( ps -> ch ), ps := ch: the substituted sequences share "ch"
    // even though the declared pair (ps, ch) is covered.
    fx.theorem_dj(
        "thtrans",
        "|- ( ( ps -> ch ) -> ch )",
        &["wps", "wch"],
        &[("ps", "ch")],
        &["wps", "wch", "wi", "wch", "dj-ax"],
    );

    let mut v = verifier();
    let thtrans = fx.stmt("thtrans");
    let err = v
        .verify_proof(&fx.syms, &fx.stmts, thtrans, &mut DjPolicy::Raise)
        .unwrap_err();
    match err {
        VerifyError::DjVarsViolation { var1, var2, .. } => {
            assert_eq!((var1.as_str(), var2.as_str()), ("ch", "ch"));
        }
        other => panic!("expected a disjoint-variable violation, got {other}"),
    }
}

#[test]
fn partial_covering_still_fails_on_the_uncovered_pair() {
    let mut fx = dj_fixture();
    // ph := ( ps -> ch ), ps := ph. Cross pairs: (ps, ph) declared,
    // (ch, ph) not.
    fx.theorem_dj(
        "thpart",
        "|- ( ( ps -> ch ) -> ph )",
        &["wph", "wps", "wch"],
        &[("ps", "ph")],
        &["wps", "wch", "wi", "wph", "dj-ax"],
    );

    let mut v = verifier();
    let thpart = fx.stmt("thpart");
    let err = v
        .verify_proof(&fx.syms, &fx.stmts, thpart, &mut DjPolicy::Raise)
        .unwrap_err();
    match err {
        VerifyError::DjVarsViolation { var1, var2, .. } => {
            assert_eq!((var1.as_str(), var2.as_str()), ("ch", "ph"));
        }
        other => panic!("expected a disjoint-variable violation, got {other}"),
    }
}

#[test]
fn ignore_policy_skips_the_checks() {
    let mut fx = dj_fixture();
    fx.theorem("thdj", "|- ( ch -> ch )", &["wch"], &["wch", "wch", "dj-ax"]);

    let mut v = verifier();
    let thdj = fx.stmt("thdj");
    v.verify_proof(&fx.syms, &fx.stmts, thdj, &mut DjPolicy::Ignore)
        .expect("violations are silently ignored");
}

#[test]
fn collect_policy_records_violations_and_completes() {
    let mut fx = dj_fixture();
    fx.theorem("thdj", "|- ( ch -> ch )", &["wch"], &["wch", "wch", "dj-ax"]);

    let mut v = verifier();
    let thdj = fx.stmt("thdj");
    let mut violations = Vec::new();
    v.verify_proof(
        &fx.syms,
        &fx.stmts,
        thdj,
        &mut DjPolicy::Collect(&mut violations),
    )
    .expect("replay completes under the collecting policy");
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].step, 3);
    assert_eq!(violations[0].label, "dj-ax");
    assert_eq!(violations[0].var1, fx.sym("ch"));
    assert_eq!(violations[0].var2, fx.sym("ch"));
}

#[test]
fn work_variables_are_exempt_from_hard_failure() {
    let mut fx = Fixture::propositional();
    fx.vars(&["&W1"]);
    fx.var_hyp("w1", "wff", "&W1");
    fx.axiom_dj("dj-ax", "|- ( ph -> ps )", &["wph", "wps"], &[("ph", "ps")]);
    fx.theorem("thwork", "|- ( &W1 -> &W1 )", &["w1"], &["w1", "w1", "dj-ax"]);

    let mut v = verifier();
    let thwork = fx.stmt("thwork");
    v.verify_proof(&fx.syms, &fx.stmts, thwork, &mut DjPolicy::Raise)
        .expect("work variables do not hard-fail");

    // Collecting still records them for the interactive caller.
    let mut violations = Vec::new();
    v.verify_proof(
        &fx.syms,
        &fx.stmts,
        thwork,
        &mut DjPolicy::Collect(&mut violations),
    )
    .expect("replay completes");
    assert_eq!(violations.len(), 1);
}
