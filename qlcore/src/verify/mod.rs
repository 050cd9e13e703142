//! Proof replay.
//!
//! Role
//! - Replay an ordered proof against a formula stack: hypotheses push,
//!   assertions pop their mandatory hypotheses, bind a substitution map and
//!   push their substituted conclusion.
//! - Enforce disjoint-variable constraints under three caller-selectable
//!   policies, with placeholder work variables exempt from hard failure.
//! - Mirror the parser's resource handling: preallocated scratch grown by
//!   explicit checks and bounded retry.
use log::debug;
use qlformal::prelude::*;
use strum::EnumIs;

use crate::error::{CapacityError, VerifyError};
use crate::messages::{MessageSink, SourcePos};

pub mod export;

/// Capacity heuristics and retry bounds for the verifier's scratch.
#[derive(Clone, Debug)]
pub struct VerifyCaps {
    /// Initial proof-stack capacity.
    pub init_stack: usize,
    /// Ceiling on any single substituted formula's symbol count.
    pub init_work: usize,
    /// Grow-and-retry rounds before giving up with a capacity error.
    pub max_retries: u32,
    /// Label prefix marking placeholder work variables, exempt from hard
    /// disjoint-variable failure.
    pub work_var_prefix: String,
}

impl Default for VerifyCaps {
    fn default() -> Self {
        Self {
            init_stack: 32,
            init_work: 256,
            max_retries: 6,
            work_var_prefix: "&W".to_string(),
        }
    }
}

/// A disjoint-variable violation collected under [`DjPolicy::Collect`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DjViolation {
    /// 1-based proof step.
    pub step: usize,
    /// Label of the assertion whose constraint was violated.
    pub label: String,
    pub var1: SymbolId,
    pub var2: SymbolId,
}

/// What to do when a substitution violates a disjoint-variable constraint.
#[derive(Debug, EnumIs)]
pub enum DjPolicy<'a> {
    /// Fail the proof immediately.
    Raise,
    /// Skip the checks entirely.
    Ignore,
    /// Record every violation and keep replaying. The list is cleared at
    /// the start of each verification.
    Collect(&'a mut Vec<DjViolation>),
}

enum RunErr {
    Overflow(&'static str),
    Fail(VerifyError),
}

impl From<VerifyError> for RunErr {
    fn from(e: VerifyError) -> Self {
        RunErr::Fail(e)
    }
}

/// The proof-replay engine. Scratch state is owned per instance and
/// mutated in place per call; one instance is not safe for concurrent
/// calls.
pub struct ProofVerifier {
    caps: VerifyCaps,
    stack_cap: usize,
    work_cap: usize,
    stack: Vec<Formula>,
}

impl ProofVerifier {
    pub fn new(caps: VerifyCaps) -> Self {
        let stack_cap = caps.init_stack;
        let work_cap = caps.init_work;
        Self {
            caps,
            stack_cap,
            work_cap,
            stack: Vec::new(),
        }
    }

    /// Replay `theorem`'s proof and confirm it derives the theorem's
    /// formula. Propagation is immediate: the first failure aborts this
    /// proof.
    pub fn verify_proof(
        &mut self,
        syms: &SymbolTable,
        stmts: &StatementTable,
        theorem: StmtId,
        policy: &mut DjPolicy<'_>,
    ) -> Result<(), VerifyError> {
        let t = &stmts[theorem];
        let proof = t.proof.clone();
        self.replay(
            syms,
            stmts,
            &proof,
            &t.formula,
            &t.label,
            t.seq,
            Some((&t.mand, &t.opt)),
            false,
            policy,
        )
    }

    /// Replay a grammar-derived tree's reverse-Polish flattening as if it
    /// were a proof, checking the result against `target` with
    /// expression-only equality (the replayed type code is the syntax
    /// type, not the provable one).
    pub fn verify_derivation(
        &mut self,
        syms: &SymbolTable,
        stmts: &StatementTable,
        tree: &ParseTree,
        target: &Formula,
        label: &str,
    ) -> Result<(), VerifyError> {
        let proof: Vec<Option<StmtId>> = tree.rpn().into_iter().map(Some).collect();
        self.replay(
            syms,
            stmts,
            &proof,
            target,
            label,
            u32::MAX,
            None,
            true,
            &mut DjPolicy::Ignore,
        )
    }

    /// Verify every theorem in sequence order, reporting failures to the
    /// sink and continuing until the error ceiling is reached. Capacity
    /// exhaustion is fatal and stops the run.
    pub fn verify_all(
        &mut self,
        syms: &SymbolTable,
        stmts: &StatementTable,
        sink: &mut MessageSink,
    ) -> Result<(), CapacityError> {
        let ids: Vec<StmtId> = stmts
            .iter()
            .filter(|s| s.kind.is_theorem())
            .map(|s| s.id)
            .collect();
        for id in ids {
            if !sink.error_space_left() {
                debug!("verify_all stopping early, error ceiling reached");
                return Ok(());
            }
            match self.verify_proof(syms, stmts, id, &mut DjPolicy::Raise) {
                Ok(()) => {}
                Err(VerifyError::Capacity(c)) => return Err(c),
                Err(err) => {
                    sink.error(SourcePos::label(&stmts[id].label), err.to_string());
                }
            }
        }
        Ok(())
    }

    /// Grow-and-retry wrapper around one replay run.
    #[allow(clippy::too_many_arguments)]
    fn replay(
        &mut self,
        syms: &SymbolTable,
        stmts: &StatementTable,
        proof: &[Option<StmtId>],
        target: &Formula,
        label: &str,
        seq_ceiling: u32,
        frames: Option<(&MandFrame, &OptFrame)>,
        expr_only: bool,
        policy: &mut DjPolicy<'_>,
    ) -> Result<(), VerifyError> {
        let mut retries = 0u32;
        loop {
            if let DjPolicy::Collect(list) = policy {
                list.clear();
            }
            match self.run_once(
                syms,
                stmts,
                proof,
                target,
                label,
                seq_ceiling,
                frames,
                expr_only,
                policy,
            ) {
                Ok(()) => return Ok(()),
                Err(RunErr::Fail(err)) => return Err(err),
                Err(RunErr::Overflow(what)) => {
                    if retries >= self.caps.max_retries {
                        return Err(CapacityError {
                            what,
                            retries,
                            ceiling: match what {
                                "verifier stack" => self.stack_cap,
                                _ => self.work_cap,
                            },
                        }
                        .into());
                    }
                    match what {
                        "verifier stack" => self.stack_cap *= 2,
                        _ => self.work_cap *= 2,
                    }
                    retries += 1;
                    debug!(
                        "verifier scratch overflow, retry {retries} (stack {}, work {})",
                        self.stack_cap, self.work_cap
                    );
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_once(
        &mut self,
        syms: &SymbolTable,
        stmts: &StatementTable,
        proof: &[Option<StmtId>],
        target: &Formula,
        label: &str,
        seq_ceiling: u32,
        frames: Option<(&MandFrame, &OptFrame)>,
        expr_only: bool,
        policy: &mut DjPolicy<'_>,
    ) -> Result<(), RunErr> {
        self.stack.clear();

        for (i, entry) in proof.iter().enumerate() {
            let step = i + 1;
            let Some(sid) = *entry else {
                return Err(VerifyError::IncompleteStep {
                    theorem: label.to_string(),
                    step,
                }
                .into());
            };
            let s = &stmts[sid];

            if s.is_hyp() {
                if let Some((mand, opt)) = frames {
                    if !mand.hyps.contains(&sid) && !opt.hyps.contains(&sid) {
                        return Err(VerifyError::UnresolvedLabel {
                            theorem: label.to_string(),
                            step,
                            label: s.label.clone(),
                        }
                        .into());
                    }
                }
                self.push(s.formula.clone())?;
                continue;
            }

            // Assertion reference: no forward references past the target.
            if s.seq >= seq_ceiling {
                return Err(VerifyError::UnresolvedLabel {
                    theorem: label.to_string(),
                    step,
                    label: s.label.clone(),
                }
                .into());
            }

            let n = s.mand.hyps.len();
            if n == 0 {
                self.push(s.formula.clone())?;
                continue;
            }
            if self.stack.len() < n {
                return Err(VerifyError::StackUnderflow {
                    theorem: label.to_string(),
                    step,
                    label: s.label.clone(),
                }
                .into());
            }
            let base = self.stack.len() - n;

            // Bind each mandatory variable hypothesis to its stack entry.
            let mut subst: Vec<(SymbolId, &[SymbolId])> = Vec::with_capacity(n);
            for (j, &h) in s.mand.hyps.iter().enumerate() {
                let hs = &stmts[h];
                if !hs.kind.is_var_hyp() {
                    continue;
                }
                let stack_entry = &self.stack[base + j];
                if stack_entry.typ() != hs.formula.typ() {
                    return Err(VerifyError::HypTypMismatch {
                        theorem: label.to_string(),
                        step,
                        label: s.label.clone(),
                        hyp: hs.label.clone(),
                        expected: syms[hs.formula.typ()].token.clone(),
                        found: syms[stack_entry.typ()].token.clone(),
                    }
                    .into());
                }
                let var = hs.var().expect("variable hypothesis declares a variable");
                subst.push((var, stack_entry.expr()));
            }

            // Check each mandatory logical hypothesis under the
            // accumulated substitution.
            for (j, &h) in s.mand.hyps.iter().enumerate() {
                let hs = &stmts[h];
                if !hs.kind.is_log_hyp() {
                    continue;
                }
                let substituted = hs.formula.substitute(&subst, syms);
                self.check_work(&substituted)?;
                if substituted != self.stack[base + j] {
                    return Err(VerifyError::LogHypMismatch {
                        theorem: label.to_string(),
                        step,
                        label: s.label.clone(),
                        hyp: hs.label.clone(),
                    }
                    .into());
                }
            }

            if !s.mand.djvars.is_empty() && !policy.is_ignore() {
                self.check_djvars(syms, s, &subst, frames, step, label, policy)?;
            }

            let result = s.formula.substitute(&subst, syms);
            self.check_work(&result)?;
            drop(subst);
            self.stack.truncate(base);
            self.push(result)?;
        }

        if self.stack.len() != 1 {
            return Err(VerifyError::FinalStackSize {
                theorem: label.to_string(),
                entries: self.stack.len(),
            }
            .into());
        }
        let matches = if expr_only {
            self.stack[0].eq_expr(target)
        } else {
            self.stack[0] == *target
        };
        if !matches {
            return Err(VerifyError::FinalFormulaMismatch {
                theorem: label.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// For every constrained pair of the assertion's variables: the two
    /// substituted sequences must share no variable, and every cross-pair
    /// of substituted variables must itself be declared disjoint in the
    /// target's mandatory+optional frames.
    #[allow(clippy::too_many_arguments)]
    fn check_djvars(
        &self,
        syms: &SymbolTable,
        assertion: &Statement,
        subst: &[(SymbolId, &[SymbolId])],
        frames: Option<(&MandFrame, &OptFrame)>,
        step: usize,
        theorem_label: &str,
        policy: &mut DjPolicy<'_>,
    ) -> Result<(), RunErr> {
        for pair in assertion.mand.djvars.iter() {
            let sa = subst.iter().find(|(v, _)| *v == pair.lo()).map(|(_, e)| *e);
            let sb = subst.iter().find(|(v, _)| *v == pair.hi()).map(|(_, e)| *e);
            let (Some(sa), Some(sb)) = (sa, sb) else {
                continue;
            };
            for &x in sa.iter().filter(|&&x| syms[x].kind.is_var()) {
                for &y in sb.iter().filter(|&&y| syms[y].kind.is_var()) {
                    let violated = if x == y {
                        true
                    } else {
                        let declared = frames.is_some_and(|(mand, opt)| {
                            mand.is_disjoint(x, y) || opt.is_disjoint(x, y)
                        });
                        !declared
                    };
                    if !violated {
                        continue;
                    }
                    let is_work = syms[x].token.starts_with(&self.caps.work_var_prefix)
                        || syms[y].token.starts_with(&self.caps.work_var_prefix);
                    match policy {
                        DjPolicy::Raise => {
                            if is_work {
                                continue;
                            }
                            return Err(VerifyError::DjVarsViolation {
                                theorem: theorem_label.to_string(),
                                step,
                                label: assertion.label.clone(),
                                var1: syms[x].token.clone(),
                                var2: syms[y].token.clone(),
                            }
                            .into());
                        }
                        DjPolicy::Collect(list) => {
                            list.push(DjViolation {
                                step,
                                label: assertion.label.clone(),
                                var1: x,
                                var2: y,
                            });
                        }
                        DjPolicy::Ignore => {}
                    }
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, formula: Formula) -> Result<(), RunErr> {
        if self.stack.len() >= self.stack_cap {
            return Err(RunErr::Overflow("verifier stack"));
        }
        self.stack.push(formula);
        Ok(())
    }

    fn check_work(&self, formula: &Formula) -> Result<(), RunErr> {
        if formula.len() > self.work_cap {
            return Err(RunErr::Overflow("verifier work buffer"));
        }
        Ok(())
    }
}
