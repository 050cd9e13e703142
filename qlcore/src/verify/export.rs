//! Export of human-readable derivations.
//!
//! Builds a labeled list of only the externally visible derivation steps of
//! a proof — those whose formula carries a provable type code — skipping the
//! syntax-building steps. An explicit last-in-first-out structure of
//! undischarged visible steps, matched by logical-hypothesis order, records
//! which prior steps each new step discharges.
use qlformal::prelude::*;

use crate::error::VerifyError;

/// One visible derivation step for a proof-authoring front end.
#[derive(Clone, Debug)]
pub struct DerivationStep {
    /// 1-based visible step number.
    pub nbr: usize,
    /// Label of the justifying statement.
    pub label: String,
    /// The step's (substituted) formula.
    pub formula: Formula,
    /// Visible step numbers discharged by this step, in the justifying
    /// assertion's logical-hypothesis order.
    pub refs: Vec<usize>,
    /// Cached parse tree of the referenced statement, when available.
    pub tree: Option<ParseTree>,
}

/// Replay `theorem`'s proof and collect its visible steps.
///
/// The proof is assumed verifiable; replay failures surface as the same
/// error kinds [`crate::verify::ProofVerifier`] reports.
pub fn export_steps(
    syms: &SymbolTable,
    stmts: &StatementTable,
    theorem: StmtId,
) -> Result<Vec<DerivationStep>, VerifyError> {
    let t = &stmts[theorem];
    let label = &t.label;

    let mut stack: Vec<Formula> = Vec::new();
    let mut lifo: Vec<usize> = Vec::new();
    let mut out: Vec<DerivationStep> = Vec::new();

    for (i, entry) in t.proof.iter().enumerate() {
        let step = i + 1;
        let Some(sid) = *entry else {
            return Err(VerifyError::IncompleteStep {
                theorem: label.clone(),
                step,
            });
        };
        let s = &stmts[sid];
        let visible = syms[s.formula.typ()]
            .flags
            .contains(GrammarFlags::PROVABLE_TYP);

        if s.is_hyp() {
            if visible {
                let nbr = out.len() + 1;
                out.push(DerivationStep {
                    nbr,
                    label: s.label.clone(),
                    formula: s.formula.clone(),
                    refs: Vec::new(),
                    tree: s.tree().cloned(),
                });
                lifo.push(nbr);
            }
            stack.push(s.formula.clone());
            continue;
        }

        let n = s.mand.hyps.len();
        if stack.len() < n {
            return Err(VerifyError::StackUnderflow {
                theorem: label.clone(),
                step,
                label: s.label.clone(),
            });
        }
        let base = stack.len() - n;

        let mut subst: Vec<(SymbolId, &[SymbolId])> = Vec::with_capacity(n);
        let mut log_hyp_count = 0usize;
        for (j, &h) in s.mand.hyps.iter().enumerate() {
            let hs = &stmts[h];
            if hs.kind.is_var_hyp() {
                let var = hs.var().expect("variable hypothesis declares a variable");
                subst.push((var, stack[base + j].expr()));
            } else {
                log_hyp_count += 1;
            }
        }
        let formula = s.formula.substitute(&subst, syms);
        drop(subst);

        if visible {
            // Discharge the most recent undischarged visible steps, one per
            // logical hypothesis; popping reverses back into hypothesis
            // order.
            let mut refs = Vec::with_capacity(log_hyp_count);
            for _ in 0..log_hyp_count {
                let Some(r) = lifo.pop() else {
                    return Err(VerifyError::StackUnderflow {
                        theorem: label.clone(),
                        step,
                        label: s.label.clone(),
                    });
                };
                refs.push(r);
            }
            refs.reverse();

            let nbr = out.len() + 1;
            out.push(DerivationStep {
                nbr,
                label: s.label.clone(),
                formula: formula.clone(),
                refs,
                tree: s.tree().cloned(),
            });
            lifo.push(nbr);
        }

        stack.truncate(base);
        stack.push(formula);
    }

    if stack.len() != 1 {
        return Err(VerifyError::FinalStackSize {
            theorem: label.clone(),
            entries: stack.len(),
        });
    }
    Ok(out)
}
