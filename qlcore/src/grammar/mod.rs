//! Grammar construction and parse entry points.
//!
//! Role
//! - Classify every constant's type role from the statement table, validate
//!   the syntax axioms, and derive the disambiguated rule set.
//! - Close the rule set combinatorially over nulls-permitted and
//!   type-conversion derivations: one notation rule per concrete
//!   permutation of argument types, earliest-registered variant winning and
//!   structural duplicates dropped.
//! - Serve parse requests lazily: rule derivation runs on first use after
//!   construction or invalidation, and parse trees are cached on their
//!   statements until the next invalidation.
use std::collections::VecDeque;

use log::{debug, info};
use qlformal::prelude::*;
use strum::EnumIs;

use crate::error::{GrammarError, ParseError};
use crate::messages::{MessageSink, SourcePos};
use crate::parser::{EarleyParser, FormulaParser, ParseSym, ParserCaps, RuleCtx};

pub mod rules;

use rules::{BuildNode, GrammarRule, RuleSet, RuleSym};

/// How ambiguity discovered while parsing is treated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, EnumIs)]
pub enum AmbiguityMode {
    /// Ambiguity is informational: the first tree by rule priority is kept.
    #[default]
    Basic,
    /// Additionally prove every syntax axiom unambiguous after rule
    /// derivation; a second derivation of an axiom's own formula is fatal.
    Exhaustive,
}

/// Construction-time configuration.
#[derive(Clone, Debug)]
pub struct GrammarCaps {
    /// Tokens of the type codes tagging provable assertions.
    pub provable_typs: Vec<String>,
    /// Tokens of the type codes tagging logical statements; paired with
    /// `provable_typs` by position when retargeting a provable formula's
    /// parse.
    pub logic_typs: Vec<String>,
    pub ambiguity: AmbiguityMode,
    /// Trees requested per statement parse; two suffices to detect
    /// ambiguity.
    pub max_parse_trees: usize,
    /// Ceiling on the rule table during combinatorial expansion.
    pub max_rules: usize,
    pub parser: ParserCaps,
}

impl Default for GrammarCaps {
    fn default() -> Self {
        Self {
            provable_typs: vec!["|-".to_string()],
            logic_typs: vec!["wff".to_string()],
            ambiguity: AmbiguityMode::default(),
            max_parse_trees: 2,
            max_rules: 4096,
            parser: ParserCaps::default(),
        }
    }
}

#[derive(Debug)]
struct GrammarState {
    rules: RuleSet,
    /// Provable type code mapped to the logic type its expressions parse
    /// as.
    provable_pairs: Vec<(TypeCode, TypeCode)>,
}

/// The grammar engine: derived rules plus the pluggable parsing strategy.
///
/// `state` is `None` between construction/invalidation and the next entry
/// point call; every entry point rebuilds it on demand. A single instance
/// mutates shared classification flags and its parser scratch in place, so
/// it is not safe for concurrent calls.
pub struct Grammar {
    caps: GrammarCaps,
    parser: Box<dyn FormulaParser>,
    state: Option<GrammarState>,
}

impl Grammar {
    pub fn new(caps: GrammarCaps) -> Self {
        let parser = Box::new(EarleyParser::new(caps.parser.clone()));
        Self {
            caps,
            parser,
            state: None,
        }
    }

    /// Swap in an alternative parsing strategy; used by tests to run an
    /// oracle against the production parser.
    pub fn with_parser(caps: GrammarCaps, parser: Box<dyn FormulaParser>) -> Self {
        Self {
            caps,
            parser,
            state: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Drop the derived rule set and every cached parse tree. The next
    /// entry point call rebuilds both.
    pub fn invalidate(&mut self, stmts: &mut StatementTable) {
        self.state = None;
        stmts.clear_trees();
    }

    /// Parse every statement formula, attaching trees, continuing past
    /// per-statement failures up to the sink's error ceiling.
    pub fn parse_all_formulas(
        &mut self,
        syms: &mut SymbolTable,
        stmts: &mut StatementTable,
        sink: &mut MessageSink,
    ) {
        if !self.ensure_initialized(syms, stmts, sink) {
            return;
        }
        let ids: Vec<StmtId> = stmts.ids().collect();
        for id in ids {
            if !sink.error_space_left() {
                debug!("parse_all_formulas stopping early, error ceiling reached");
                return;
            }
            if stmts[id].tree().is_some() {
                continue;
            }
            self.parse_one_statement(syms, stmts, id, sink);
        }
    }

    /// Parse one statement's formula and cache the tree on it.
    ///
    /// Variable hypotheses and syntax axioms short-circuit to their trivial
    /// tree; everything else goes through the parser with a sequence
    /// ceiling equal to the statement's own sequence number. Failures are
    /// reported to the sink and leave the statement without a tree.
    pub fn parse_one_statement(
        &mut self,
        syms: &mut SymbolTable,
        stmts: &mut StatementTable,
        id: StmtId,
        sink: &mut MessageSink,
    ) -> Option<ParseTree> {
        if !self.ensure_initialized(syms, stmts, sink) {
            return None;
        }
        if let Some(tree) = stmts[id].tree() {
            return Some(tree.clone());
        }

        let stmt = &stmts[id];
        let tree = if stmt.kind.is_var_hyp() {
            ParseTree::new(ParseNode::leaf(id))
        } else if stmt.is_syntax_axiom(syms) {
            let leaves = stmt.mand.hyps.iter().map(|&h| ParseNode::leaf(h)).collect();
            ParseTree::new(ParseNode::new(id, leaves))
        } else {
            let label = stmt.label.clone();
            let formula = stmt.formula.clone();
            let max_seq = stmt.seq;
            match self.parse_formula(syms, stmts, &formula, max_seq, self.caps.max_parse_trees, sink)
            {
                Ok(mut trees) => {
                    if trees.len() > 1 {
                        let first = &stmts[trees[0].root.stmt].label;
                        let second = &stmts[trees[1].root.stmt].label;
                        sink.info(
                            SourcePos::label(&label),
                            format!(
                                "formula is grammatically ambiguous: derivations rooted at '{first}' and '{second}' both apply; keeping '{first}'"
                            ),
                        );
                    }
                    trees.swap_remove(0)
                }
                Err(ParseError::Stalled { position }) => {
                    sink.error(
                        SourcePos::at(&label, position),
                        "formula has no grammatical parse",
                    );
                    return None;
                }
                Err(err) => {
                    sink.error(SourcePos::label(&label), err.to_string());
                    return None;
                }
            }
        };

        stmts[id].set_tree(tree.clone());
        Some(tree)
    }

    /// Parse an arbitrary formula under an explicit sequence ceiling,
    /// returning up to `want` structurally distinct trees. Pass
    /// `u32::MAX` as the ceiling for whole-grammar re-verification.
    pub fn parse_formula(
        &mut self,
        syms: &mut SymbolTable,
        stmts: &StatementTable,
        formula: &Formula,
        max_seq: u32,
        want: usize,
        sink: &mut MessageSink,
    ) -> Result<Vec<ParseTree>, ParseError> {
        if self.state.is_none() && !self.initialize(syms, stmts, sink) {
            return Err(ParseError::Uninitialized);
        }
        let Self { caps, parser, state } = self;
        let state = state.as_ref().expect("initialized above");

        let target = target_typ(caps, state, formula.typ());
        let expr = resolve_vars(syms, stmts, formula, sink)?;
        let ctx = RuleCtx {
            rules: &state.rules,
            syms,
            stmts,
        };
        parser.parse(&ctx, target, &expr, max_seq, want)
    }

    fn ensure_initialized(
        &mut self,
        syms: &mut SymbolTable,
        stmts: &StatementTable,
        sink: &mut MessageSink,
    ) -> bool {
        self.state.is_some() || self.initialize(syms, stmts, sink)
    }

    /// Rule derivation: classification, validation, base rules,
    /// combinatorial expansion, FIRST/gimme tables, and (in exhaustive
    /// mode) the ambiguity self-check. On any error the grammar stays
    /// uninitialized.
    fn initialize(
        &mut self,
        syms: &mut SymbolTable,
        stmts: &StatementTable,
        sink: &mut MessageSink,
    ) -> bool {
        let mut errors = 0usize;
        let mut report = |sink: &mut MessageSink, pos: SourcePos, err: GrammarError| {
            errors += 1;
            sink.error(pos, err.to_string());
        };

        for sym in syms.iter_mut() {
            sym.flags = GrammarFlags::empty();
        }

        // Declared provable/logic type codes, paired by position.
        let mut provable_pairs: Vec<(TypeCode, TypeCode)> = Vec::new();
        for (i, tok) in self.caps.provable_typs.iter().enumerate() {
            let Some(pid) = syms.lookup(tok) else { continue };
            syms[pid].flags |= GrammarFlags::PROVABLE_TYP | GrammarFlags::GRAMMATICAL;
            let logic_tok = self
                .caps
                .logic_typs
                .get(i)
                .or_else(|| self.caps.logic_typs.last());
            if let Some(lid) = logic_tok.and_then(|t| syms.lookup(t)) {
                provable_pairs.push((pid, lid));
            }
        }
        for tok in self.caps.logic_typs.iter() {
            if let Some(lid) = syms.lookup(tok) {
                syms[lid].flags |= GrammarFlags::LOGIC_TYP | GrammarFlags::GRAMMATICAL;
            }
        }

        // Pass 1: classify formula heads.
        for stmt in stmts.iter() {
            let typ = stmt.formula.typ();
            syms[typ].flags |= GrammarFlags::GRAMMATICAL;
            match stmt.kind {
                StmtKind::VarHyp => {
                    if syms[typ].flags.contains(GrammarFlags::PROVABLE_TYP) {
                        report(
                            sink,
                            SourcePos::label(&stmt.label),
                            GrammarError::VarHypProvableTyp {
                                label: stmt.label.clone(),
                                typ: syms[typ].token.clone(),
                            },
                        );
                    }
                    syms[typ].flags |= GrammarFlags::VAR_HYP_TYP;
                }
                StmtKind::Axiom => {
                    if !syms[typ].flags.contains(GrammarFlags::PROVABLE_TYP) {
                        syms[typ].flags |= GrammarFlags::SYNTAX_AXIOM_TYP;
                    }
                }
                StmtKind::LogHyp | StmtKind::Theorem => {}
            }
        }

        // Role exclusivity: the provable role never doubles as any other.
        for sym in syms.iter() {
            if sym.flags.contains(GrammarFlags::PROVABLE_TYP)
                && sym.flags.intersects(
                    GrammarFlags::VAR_HYP_TYP
                        | GrammarFlags::SYNTAX_AXIOM_TYP
                        | GrammarFlags::LOGIC_TYP,
                )
            {
                report(
                    sink,
                    SourcePos::label(&sym.token),
                    GrammarError::ConflictingTypRoles {
                        typ: sym.token.clone(),
                    },
                );
            }
        }

        // Pass 2: a type code may never appear as an ordinary constant.
        for stmt in stmts.iter() {
            for &s in stmt.formula.expr() {
                if syms[s].kind.is_const() && syms[s].is_grammatical() {
                    report(
                        sink,
                        SourcePos::label(&stmt.label),
                        GrammarError::TypCodeUsedAsConstant {
                            label: stmt.label.clone(),
                            typ: syms[s].token.clone(),
                        },
                    );
                }
            }
        }

        if errors > 0 {
            debug!("grammar classification failed with {errors} errors");
            return false;
        }

        // Base rule derivation in sequence order, with combinatorial
        // expansion interleaved through the work queue.
        let mut rules = RuleSet::default();
        let mut queue: VecDeque<usize> = VecDeque::new();
        for stmt in stmts.iter() {
            if !stmt.kind.is_axiom() || !stmt.is_syntax_axiom(syms) {
                continue;
            }
            let Some(base) = self.base_rule(syms, stmts, stmt, sink, &mut errors) else {
                continue;
            };
            if let Some(idx) = rules.register(base, false) {
                queue.push_back(idx);
            }
            if !self.expand(&mut rules, &mut queue, sink, &mut errors) {
                return false;
            }
        }
        if errors > 0 {
            debug!("grammar rule derivation failed with {errors} errors");
            return false;
        }

        rules.compute_first();
        rules.compute_gimme();
        info!(
            "grammar initialized: {} rules ({} gimme constants)",
            rules.len(),
            rules.gimme.len()
        );
        self.state = Some(GrammarState {
            rules,
            provable_pairs,
        });

        if self.caps.ambiguity.is_exhaustive() && !self.prove_unambiguous(syms, stmts, sink) {
            self.state = None;
            return false;
        }
        true
    }

    /// Turn one syntax axiom into its base rule, validating as we go.
    fn base_rule(
        &self,
        syms: &SymbolTable,
        stmts: &StatementTable,
        stmt: &Statement,
        sink: &mut MessageSink,
        errors: &mut usize,
    ) -> Option<GrammarRule> {
        let mut fail = |sink: &mut MessageSink, err: GrammarError| {
            *errors += 1;
            sink.error(SourcePos::label(&stmt.label), err.to_string());
        };

        if !stmt.mand.djvars.is_empty() {
            fail(
                sink,
                GrammarError::DjVarsOnSyntaxAxiom {
                    label: stmt.label.clone(),
                },
            );
            return None;
        }

        // Each mandatory hypothesis must be a variable hypothesis matching
        // exactly one variable occurrence in the formula.
        let occurrences: Vec<SymbolId> = stmt
            .formula
            .expr()
            .iter()
            .copied()
            .filter(|&s| syms[s].kind.is_var())
            .collect();
        let distinct = stmt.formula.distinct_vars(syms);
        let hyps_ok = stmt.mand.hyps.iter().all(|&h| stmts[h].kind.is_var_hyp());
        if !hyps_ok
            || occurrences.len() != distinct.len()
            || stmt.mand.hyps.len() != occurrences.len()
        {
            fail(
                sink,
                GrammarError::HypCountMismatch {
                    label: stmt.label.clone(),
                    hyps: stmt.mand.hyps.len(),
                    occurrences: occurrences.len(),
                },
            );
            return None;
        }

        let result_typ = stmt.formula.typ();
        let mut expr: Vec<RuleSym> = Vec::with_capacity(stmt.formula.expr().len());
        for &s in stmt.formula.expr() {
            if syms[s].kind.is_var() {
                let hyp = stmt
                    .mand
                    .hyps
                    .iter()
                    .copied()
                    .find(|&h| stmts[h].var() == Some(s));
                let Some(hyp) = hyp else {
                    fail(
                        sink,
                        GrammarError::HypCountMismatch {
                            label: stmt.label.clone(),
                            hyps: stmt.mand.hyps.len(),
                            occurrences: occurrences.len(),
                        },
                    );
                    return None;
                };
                expr.push(RuleSym::Typ(stmts[hyp].formula.typ()));
            } else {
                expr.push(RuleSym::Const(s));
            }
        }

        // Template children follow the mandatory hypothesis order, mapping
        // each hypothesis onto the slot of its variable's occurrence.
        let children: Vec<BuildNode> = stmt
            .mand
            .hyps
            .iter()
            .map(|&h| {
                let var = stmts[h].var().expect("validated as a variable hypothesis");
                let slot = occurrences
                    .iter()
                    .position(|&v| v == var)
                    .expect("every hypothesis variable occurs in the formula");
                BuildNode::Slot(slot)
            })
            .collect();

        Some(GrammarRule {
            rule_nbr: 0,
            max_seq: stmt.seq,
            kind: RuleSet::kind_of(&expr, result_typ),
            result_typ,
            n_slots: occurrences.len(),
            expr,
            template: BuildNode::Node(stmt.id, children),
            base_stmt: stmt.id,
        })
    }

    /// Drain the expansion work queue, closing the rule set under
    /// nulls-dropping and conversion-widening. Earliest-registered rules
    /// win; structural duplicates are dropped at registration.
    fn expand(
        &self,
        rules: &mut RuleSet,
        queue: &mut VecDeque<usize>,
        sink: &mut MessageSink,
        errors: &mut usize,
    ) -> bool {
        while let Some(ri) = queue.pop_front() {
            if rules.len() >= self.caps.max_rules {
                *errors += 1;
                sink.error(
                    SourcePos::label("grammar"),
                    GrammarError::RuleTableOverflow {
                        ceiling: self.caps.max_rules,
                    }
                    .to_string(),
                );
                return false;
            }

            // (a) the new rule's own slots against existing nulls and
            // conversions.
            let slots: Vec<(usize, TypeCode)> = rules.rules[ri].slot_typs().collect();
            for &(slot, t) in slots.iter() {
                if let Some(&ni) = rules.nulls.get(&t) {
                    let derived = rules.derive_null_drop(ri, slot, ni);
                    if let Some(idx) = rules.register(derived, true) {
                        queue.push_back(idx);
                    }
                }
                let convs: Vec<usize> = rules
                    .conv_list
                    .iter()
                    .copied()
                    .filter(|&ci| ci != ri && rules.rules[ci].result_typ == t)
                    .collect();
                for ci in convs {
                    let derived = rules.derive_widen(ri, slot, ci);
                    if let Some(idx) = rules.register(derived, true) {
                        queue.push_back(idx);
                    }
                }
            }

            // (b)/(c) the new rule as filler/widener for every existing
            // rule's slots.
            let kind = rules.rules[ri].kind;
            let produced = rules.rules[ri].result_typ;
            if kind.is_nulls_permitted() || kind.is_type_conversion() {
                let parents: Vec<(usize, usize)> = (0..rules.len())
                    .flat_map(|pi| {
                        rules.rules[pi]
                            .slot_typs()
                            .filter(|&(_, t)| t == produced)
                            .map(move |(slot, _)| (pi, slot))
                            .collect::<Vec<_>>()
                    })
                    .filter(|&(pi, _)| pi != ri)
                    .collect();
                for (pi, slot) in parents {
                    let derived = if kind.is_nulls_permitted() {
                        rules.derive_null_drop(pi, slot, ri)
                    } else {
                        rules.derive_widen(pi, slot, ri)
                    };
                    if let Some(idx) = rules.register(derived, true) {
                        queue.push_back(idx);
                    }
                }
            }
        }
        true
    }

    /// Exhaustive ambiguity proof: every syntax axiom's own formula, parsed
    /// against the grammar built up to and including itself, must admit
    /// exactly one derivation.
    fn prove_unambiguous(
        &mut self,
        syms: &mut SymbolTable,
        stmts: &StatementTable,
        sink: &mut MessageSink,
    ) -> bool {
        let mut ok = true;
        let axioms: Vec<StmtId> = stmts
            .iter()
            .filter(|s| s.kind.is_axiom() && s.is_syntax_axiom(syms))
            .map(|s| s.id)
            .collect();
        for id in axioms {
            let (label, formula, max_seq) = {
                let stmt = &stmts[id];
                (stmt.label.clone(), stmt.formula.clone(), stmt.seq)
            };
            match self.parse_formula(syms, stmts, &formula, max_seq, 2, sink) {
                Ok(trees) if trees.len() > 1 => {
                    ok = false;
                    sink.error(
                        SourcePos::label(&label),
                        GrammarError::AmbiguousSyntaxAxiom { label: label.clone() }.to_string(),
                    );
                }
                Ok(_) => {}
                Err(ParseError::Stalled { position }) => {
                    ok = false;
                    sink.error(
                        SourcePos::at(&label, position),
                        "syntax axiom's own formula has no grammatical parse",
                    );
                }
                Err(err) => {
                    ok = false;
                    sink.error(SourcePos::label(&label), err.to_string());
                }
            }
        }
        ok
    }
}

/// Map a provable type code to the logic type its expressions parse as;
/// other type codes parse as themselves.
fn target_typ(caps: &GrammarCaps, state: &GrammarState, typ: TypeCode) -> TypeCode {
    let _ = caps;
    state
        .provable_pairs
        .iter()
        .find(|(p, _)| *p == typ)
        .map(|&(_, l)| l)
        .unwrap_or(typ)
}

/// Replace each variable with its active variable hypothesis, producing the
/// pre-resolved token sequence the parser consumes.
fn resolve_vars(
    syms: &SymbolTable,
    stmts: &StatementTable,
    formula: &Formula,
    sink: &mut MessageSink,
) -> Result<Vec<ParseSym>, ParseError> {
    let mut out = Vec::with_capacity(formula.expr().len());
    for (i, &s) in formula.expr().iter().enumerate() {
        let sym = &syms[s];
        match sym.kind {
            SymbolKind::Const => out.push(ParseSym::Const(s)),
            SymbolKind::Var => match sym.active_hyp {
                Some(h) => out.push(ParseSym::Hyp(h, stmts[h].formula.typ())),
                None => {
                    sink.error(
                        SourcePos::at(&sym.token, i),
                        GrammarError::UnresolvedVar {
                            label: sym.token.clone(),
                            token: sym.token.clone(),
                        }
                        .to_string(),
                    );
                    return Err(ParseError::Stalled { position: i });
                }
            },
        }
    }
    Ok(out)
}
