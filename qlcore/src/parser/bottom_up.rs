//! Naive all-derivations parser used as a cross-check oracle in tests.
//!
//! Enumerates every split of the input over every usable rule by plain
//! memoized recursion. Exponentially slower than the chart parser on large
//! inputs, but independently simple enough to trust.
use std::collections::{HashMap, HashSet};

use qlformal::prelude::*;

use crate::error::ParseError;
use crate::grammar::rules::RuleSym;

use super::{FormulaParser, ParseSym, RuleCtx};

/// Per-span cap on retained derivations; keeps degenerate cyclic grammars
/// from exploding the oracle.
const SPAN_CAP: usize = 16;

#[derive(Default)]
pub struct BottomUpParser {
    memo: HashMap<(TypeCode, usize, usize), Vec<ParseNode>>,
    active: HashSet<(TypeCode, usize, usize)>,
}

impl BottomUpParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every derivation of `typ` over `expr[lo..hi]`, in rule-priority then
    /// split order.
    fn derive(
        &mut self,
        ctx: &RuleCtx<'_>,
        typ: TypeCode,
        expr: &[ParseSym],
        lo: usize,
        hi: usize,
        max_seq: u32,
    ) -> Vec<ParseNode> {
        let key = (typ, lo, hi);
        if let Some(hit) = self.memo.get(&key) {
            return hit.clone();
        }
        if !self.active.insert(key) {
            return Vec::new();
        }

        let mut out: Vec<ParseNode> = Vec::new();
        if hi - lo == 1 {
            if let ParseSym::Hyp(h, u) = expr[lo] {
                if u == typ {
                    out.push(ParseNode::leaf(h));
                }
            }
        }

        let indices: &[usize] = ctx.rules.by_typ.get(&typ).map_or(&[], |v| v.as_slice());
        for &ri in indices {
            let rule = &ctx.rules.rules[ri];
            if rule.max_seq > max_seq {
                continue;
            }
            for children in self.all_matches(ctx, &rule.expr, 0, expr, lo, hi, max_seq) {
                let node = rule.build(children);
                if !out.iter().any(|n| n.structurally_eq(&node)) {
                    out.push(node);
                }
                if out.len() >= SPAN_CAP {
                    break;
                }
            }
        }

        self.active.remove(&key);
        self.memo.insert(key, out.clone());
        out
    }

    /// Every way to bind `rule_expr[k..]` onto `expr[pos..hi]`, as ordered
    /// child vectors.
    #[allow(clippy::too_many_arguments)]
    fn all_matches(
        &mut self,
        ctx: &RuleCtx<'_>,
        rule_expr: &[RuleSym],
        k: usize,
        expr: &[ParseSym],
        pos: usize,
        hi: usize,
        max_seq: u32,
    ) -> Vec<Vec<ParseNode>> {
        let Some(&sym) = rule_expr.get(k) else {
            return if pos == hi { vec![Vec::new()] } else { Vec::new() };
        };
        match sym {
            RuleSym::Const(c) => {
                if pos < hi && expr[pos] == ParseSym::Const(c) {
                    self.all_matches(ctx, rule_expr, k + 1, expr, pos + 1, hi, max_seq)
                } else {
                    Vec::new()
                }
            }
            RuleSym::Typ(t) => {
                let mut out = Vec::new();
                for end in pos + 1..=hi {
                    let subs = self.derive(ctx, t, expr, pos, end, max_seq);
                    if subs.is_empty() {
                        continue;
                    }
                    let rests = self.all_matches(ctx, rule_expr, k + 1, expr, end, hi, max_seq);
                    for sub in subs.iter() {
                        for rest in rests.iter() {
                            let mut children = Vec::with_capacity(1 + rest.len());
                            children.push(sub.clone());
                            children.extend(rest.iter().cloned());
                            out.push(children);
                        }
                    }
                }
                out
            }
        }
    }
}

impl FormulaParser for BottomUpParser {
    fn parse(
        &mut self,
        ctx: &RuleCtx<'_>,
        target: TypeCode,
        expr: &[ParseSym],
        max_seq: u32,
        want: usize,
    ) -> Result<Vec<ParseTree>, ParseError> {
        self.memo.clear();
        self.active.clear();

        if expr.is_empty() {
            let Some(&ri) = ctx.rules.nulls.get(&target) else {
                return Err(ParseError::Stalled { position: 0 });
            };
            let rule = &ctx.rules.rules[ri];
            if rule.max_seq > max_seq {
                return Err(ParseError::Stalled { position: 0 });
            }
            return Ok(vec![ParseTree::new(rule.build(Vec::new()))]);
        }

        let roots = self.derive(ctx, target, expr, 0, expr.len(), max_seq);
        if roots.is_empty() {
            return Err(ParseError::Stalled { position: 0 });
        }
        Ok(roots
            .into_iter()
            .take(want.max(1))
            .map(ParseTree::new)
            .collect())
    }
}
