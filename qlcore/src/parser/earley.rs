//! Earley chart parser specialized for pre-resolved variables.
//!
//! Role
//! - Predict/scan/complete over item sets indexed by input position, with
//!   prediction filtered through precomputed FIRST sets per type code.
//! - Pre-resolve "gimme" constants (length-one constants with a unique
//!   single-constant rule) into completed items before the chart runs.
//! - Bypass the chart entirely for empty input (nulls-permitted) and
//!   single-variable input (identity or coercion).
//! - Extract trees by a backtracking matcher that reconciles literal filler
//!   constants between hypothesis subranges; same-span alternative
//!   derivations are kept as ordered sets on each node and enumerated via a
//!   Cartesian-product walk, so ambiguity is demonstrated without
//!   re-running the chart.
//!
//! Scratch state is owned by the parser instance and grown by explicit
//! capacity checks: an overflow aborts the chart, doubles the relevant
//! capacity and re-runs the same parse, bounded by a hard retry ceiling.
use std::collections::{HashMap, HashSet};

use either::Either;
use log::debug;
use qlformal::prelude::*;

use crate::error::{CapacityError, ParseError};
use crate::grammar::rules::{GrammarRule, RuleSym};

use super::{FormulaParser, ParseSym, RuleCtx};

/// Capacity heuristics and retry bounds for the parser's scratch arrays.
#[derive(Clone, Debug)]
pub struct ParserCaps {
    /// Initial per-position item-set capacity.
    pub item_cap: usize,
    /// Initial per-position completed-item capacity.
    pub completed_cap: usize,
    /// Grow-and-retry rounds before giving up with a capacity error.
    pub max_retries: u32,
}

impl Default for ParserCaps {
    fn default() -> Self {
        Self {
            item_cap: 64,
            completed_cap: 64,
            max_retries: 6,
        }
    }
}

/// Transient parser state: a dotted rule with its origin position.
/// Lives only inside one parse call's scratch arrays.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Item {
    rule: u32,
    from: u32,
    dot: u32,
}

/// A recognized derivation: `rule` spans `[from, end)` where `end` is the
/// index of the completed list holding the entry.
#[derive(Copy, Clone, Debug)]
struct Completed {
    rule: u32,
    from: u32,
}

/// Overflow signals from one chart run; each grows a different capacity.
enum Overflow {
    Items,
    Completed,
}

#[derive(Default)]
struct Chart {
    /// Item sets indexed by input position.
    sets: Vec<Vec<Item>>,
    item_seen: Vec<HashSet<(u32, u32, u32)>>,
    /// Completed items keyed by end position, deduplicated by
    /// (rule, from, end) so no duplicate trees can be extracted.
    completed: Vec<Vec<Completed>>,
    completed_seen: HashSet<(u32, u32, u32)>,
    /// Completed items re-indexed by start position, for extraction.
    by_start: Vec<Vec<(u32, u32)>>,
    /// Type codes already predicted per position.
    predicted: Vec<HashSet<TypeCode>>,
    /// Furthest position that held any chart activity.
    furthest: usize,
}

impl Chart {
    fn reset(&mut self, n: usize) {
        self.sets.resize_with(n + 1, Vec::new);
        self.item_seen.resize_with(n + 1, HashSet::new);
        self.completed.resize_with(n + 1, Vec::new);
        self.by_start.resize_with(n + 1, Vec::new);
        self.predicted.resize_with(n + 1, HashSet::new);
        for i in 0..=n {
            self.sets[i].clear();
            self.item_seen[i].clear();
            self.completed[i].clear();
            self.by_start[i].clear();
            self.predicted[i].clear();
        }
        self.completed_seen.clear();
        self.furthest = 0;
    }
}

/// The production parsing strategy.
pub struct EarleyParser {
    caps: ParserCaps,
    item_cap: usize,
    completed_cap: usize,
    chart: Chart,
}

impl EarleyParser {
    pub fn new(caps: ParserCaps) -> Self {
        let item_cap = caps.item_cap;
        let completed_cap = caps.completed_cap;
        Self {
            caps,
            item_cap,
            completed_cap,
            chart: Chart::default(),
        }
    }

    fn usable(rule: &GrammarRule, max_seq: u32) -> bool {
        rule.max_seq <= max_seq
    }

    /// Empty input: only a nulls-permitted rule for the target applies.
    fn parse_empty(
        &self,
        ctx: &RuleCtx<'_>,
        target: TypeCode,
        max_seq: u32,
    ) -> Result<Vec<ParseTree>, ParseError> {
        if let Some(&ri) = ctx.rules.nulls.get(&target) {
            let rule = &ctx.rules.rules[ri];
            if Self::usable(rule, max_seq) {
                return Ok(vec![ParseTree::new(rule.build(Vec::new()))]);
            }
        }
        Err(ParseError::Stalled { position: 0 })
    }

    /// Single pre-resolved variable: identity, or a materialized coercion.
    fn parse_single_hyp(
        &self,
        ctx: &RuleCtx<'_>,
        target: TypeCode,
        hyp: StmtId,
        typ: TypeCode,
        max_seq: u32,
    ) -> Result<Vec<ParseTree>, ParseError> {
        if typ == target {
            return Ok(vec![ParseTree::new(ParseNode::leaf(hyp))]);
        }
        if let Some(&ci) = ctx.rules.conversions.get(&(typ, target)) {
            let rule = &ctx.rules.rules[ci];
            if Self::usable(rule, max_seq) {
                return Ok(vec![ParseTree::new(rule.build(vec![ParseNode::leaf(hyp)]))]);
            }
        }
        Err(ParseError::Stalled { position: 0 })
    }

    fn add_item(&mut self, pos: usize, item: Item) -> Result<(), Overflow> {
        if !self.chart.item_seen[pos].insert((item.rule, item.from, item.dot)) {
            return Ok(());
        }
        if self.chart.sets[pos].len() >= self.item_cap {
            return Err(Overflow::Items);
        }
        self.chart.sets[pos].push(item);
        self.chart.furthest = self.chart.furthest.max(pos);
        Ok(())
    }

    fn add_completed(&mut self, rule: u32, from: usize, to: usize) -> Result<(), Overflow> {
        if !self
            .chart
            .completed_seen
            .insert((rule, from as u32, to as u32))
        {
            return Ok(());
        }
        if self.chart.completed[to].len() >= self.completed_cap {
            return Err(Overflow::Completed);
        }
        self.chart.completed[to].push(Completed {
            rule,
            from: from as u32,
        });
        self.chart.by_start[from].push((rule, to as u32));
        self.chart.furthest = self.chart.furthest.max(to);
        Ok(())
    }

    /// Predict every usable rule for `typ` at `pos`, filtered through the
    /// FIRST set of the rule's leading element against the input token.
    /// Gimme rules are skipped: their completion is pre-seeded.
    fn predict(
        &mut self,
        ctx: &RuleCtx<'_>,
        typ: TypeCode,
        pos: usize,
        tok: ParseSym,
        max_seq: u32,
    ) -> Result<(), Overflow> {
        if !self.chart.predicted[pos].insert(typ) {
            return Ok(());
        }
        let Some(indices) = ctx.rules.by_typ.get(&typ) else {
            return Ok(());
        };
        for &ri in indices {
            let rule = &ctx.rules.rules[ri];
            if !Self::usable(rule, max_seq) {
                continue;
            }
            if let [RuleSym::Const(c)] = rule.expr[..] {
                if ctx.rules.gimme.get(&c) == Some(&ri) {
                    continue;
                }
            }
            let viable = match (rule.expr[0], tok) {
                (RuleSym::Const(c0), ParseSym::Const(c)) => c0 == c,
                (RuleSym::Const(_), ParseSym::Hyp(..)) => false,
                (RuleSym::Typ(u), ParseSym::Const(c)) => ctx
                    .rules
                    .first_of(u)
                    .is_some_and(|f| f.consts.contains(&c)),
                (RuleSym::Typ(u), ParseSym::Hyp(_, v)) => ctx
                    .rules
                    .first_of(u)
                    .is_some_and(|f| f.typs.contains(&v)),
            };
            if viable {
                self.add_item(
                    pos,
                    Item {
                        rule: ri as u32,
                        from: pos as u32,
                        dot: 0,
                    },
                )?;
            }
        }
        Ok(())
    }

    /// One full chart run over the input. Returns the candidate completed
    /// items spanning the whole input with the target result type, ordered
    /// by rule priority.
    fn run_chart(
        &mut self,
        ctx: &RuleCtx<'_>,
        target: TypeCode,
        expr: &[ParseSym],
        max_seq: u32,
    ) -> Result<Vec<u32>, Overflow> {
        let n = expr.len();
        self.chart.reset(n);

        // Gimme pre-resolution: a length-one constant whose only possible
        // derivation is its unique rule becomes a completed item up front,
        // skipping a predict/complete cycle. Legal because type codes never
        // occur as literal constants.
        for (i, tok) in expr.iter().enumerate() {
            if let ParseSym::Const(c) = tok {
                if let Some(&ri) = ctx.rules.gimme.get(c) {
                    if Self::usable(&ctx.rules.rules[ri], max_seq) {
                        self.add_completed(ri as u32, i, i + 1)?;
                    }
                }
            }
        }

        self.predict(ctx, target, 0, expr[0], max_seq)?;

        for i in 0..=n {
            let mut item_ix = 0usize;
            let mut comp_ix = 0usize;
            loop {
                if comp_ix < self.chart.completed[i].len() {
                    let done = self.chart.completed[i][comp_ix];
                    comp_ix += 1;
                    let result_typ = ctx.rules.rules[done.rule as usize].result_typ;
                    let origin = done.from as usize;
                    // Advance every item waiting on this type at the origin.
                    for wix in 0..self.chart.sets[origin].len() {
                        let waiter = self.chart.sets[origin][wix];
                        let wrule = &ctx.rules.rules[waiter.rule as usize];
                        if wrule.expr.get(waiter.dot as usize) == Some(&RuleSym::Typ(result_typ)) {
                            self.add_item(
                                i,
                                Item {
                                    rule: waiter.rule,
                                    from: waiter.from,
                                    dot: waiter.dot + 1,
                                },
                            )?;
                        }
                    }
                    continue;
                }
                if item_ix < self.chart.sets[i].len() {
                    let item = self.chart.sets[i][item_ix];
                    item_ix += 1;
                    let rule = &ctx.rules.rules[item.rule as usize];
                    match rule.expr.get(item.dot as usize) {
                        None => {
                            self.add_completed(item.rule, item.from as usize, i)?;
                        }
                        Some(&RuleSym::Const(c)) => {
                            if i < n && expr[i] == ParseSym::Const(c) {
                                self.add_item(
                                    i + 1,
                                    Item {
                                        rule: item.rule,
                                        from: item.from,
                                        dot: item.dot + 1,
                                    },
                                )?;
                            }
                        }
                        Some(&RuleSym::Typ(t)) => {
                            if i < n {
                                if let ParseSym::Hyp(_, u) = expr[i] {
                                    if u == t {
                                        self.add_item(
                                            i + 1,
                                            Item {
                                                rule: item.rule,
                                                from: item.from,
                                                dot: item.dot + 1,
                                            },
                                        )?;
                                    }
                                }
                                self.predict(ctx, t, i, expr[i], max_seq)?;
                            }
                        }
                    }
                    continue;
                }
                break;
            }
        }

        let mut candidates: Vec<u32> = self.chart.completed[n]
            .iter()
            .filter(|c| c.from == 0 && ctx.rules.rules[c.rule as usize].result_typ == target)
            .map(|c| c.rule)
            .collect();
        candidates.sort_by_key(|&r| ctx.rules.rules[r as usize].rule_nbr);
        Ok(candidates)
    }
}

/// Tree extraction state: memoized per completed item, with an in-progress
/// marker breaking derivation cycles (unit-rule chains). Results touched by
/// an in-progress hit are not memoized, so a later retry sees the full
/// picture.
struct Extraction {
    memo: HashMap<(u32, u32, u32), Option<ParseNode>>,
    in_progress: HashSet<(u32, u32, u32)>,
}

impl EarleyParser {
    fn extract(
        &self,
        ctx: &RuleCtx<'_>,
        expr: &[ParseSym],
        rule: u32,
        from: usize,
        to: usize,
        ext: &mut Extraction,
        tainted: &mut bool,
    ) -> Option<ParseNode> {
        let key = (rule, from as u32, to as u32);
        if let Some(cached) = ext.memo.get(&key) {
            return cached.clone();
        }
        if ext.in_progress.contains(&key) {
            *tainted = true;
            return None;
        }
        ext.in_progress.insert(key);

        let r = &ctx.rules.rules[rule as usize];
        let mut children: Vec<ParseNode> = Vec::with_capacity(r.n_slots);
        let mut local_taint = false;
        let ok = self.match_expr(ctx, expr, r, 0, from, to, &mut children, ext, &mut local_taint);
        let node = ok.then(|| r.build(children));

        ext.in_progress.remove(&key);
        if !local_taint {
            ext.memo.insert(key, node.clone());
        } else {
            *tainted = true;
        }
        node
    }

    /// Backtracking matcher: map the rule's hypothesis slots onto contiguous
    /// input subranges, reconciling exact literal constants between slots.
    /// The first viable split wins; other derivations of the same chosen
    /// span are attached to the child as ordered alternatives.
    #[allow(clippy::too_many_arguments)]
    fn match_expr(
        &self,
        ctx: &RuleCtx<'_>,
        expr: &[ParseSym],
        rule: &GrammarRule,
        k: usize,
        pos: usize,
        to: usize,
        children: &mut Vec<ParseNode>,
        ext: &mut Extraction,
        tainted: &mut bool,
    ) -> bool {
        let Some(&sym) = rule.expr.get(k) else {
            return pos == to;
        };
        match sym {
            RuleSym::Const(c) => {
                pos < to
                    && expr[pos] == ParseSym::Const(c)
                    && self.match_expr(ctx, expr, rule, k + 1, pos + 1, to, children, ext, tainted)
            }
            RuleSym::Typ(t) => {
                // Candidate sub-derivations for this slot: the direct
                // pre-resolved hypothesis, or any completed item starting
                // here. Ordered by (end, direct-hypothesis-first, rule
                // priority) so results are deterministic.
                let mut options: Vec<(usize, Either<StmtId, u32>)> = Vec::new();
                if pos < to {
                    if let ParseSym::Hyp(h, u) = expr[pos] {
                        if u == t {
                            options.push((pos + 1, Either::Left(h)));
                        }
                    }
                }
                for &(r2, end) in self.chart.by_start[pos].iter() {
                    let end = end as usize;
                    if end <= to && ctx.rules.rules[r2 as usize].result_typ == t {
                        options.push((end, Either::Right(r2)));
                    }
                }
                options.sort_by_key(|&(end, src)| {
                    (
                        end,
                        src.map_either(|_| 0u32, |r| 1 + ctx.rules.rules[r as usize].rule_nbr)
                            .into_inner(),
                    )
                });

                for (opt_ix, &(end, src)) in options.iter().enumerate() {
                    let child = match src {
                        Either::Left(h) => Some(ParseNode::leaf(h)),
                        Either::Right(r2) => self.extract(ctx, expr, r2, pos, end, ext, tainted),
                    };
                    let Some(child) = child else { continue };

                    let idx = children.len();
                    children.push(child);
                    if self.match_expr(ctx, expr, rule, k + 1, end, to, children, ext, tainted) {
                        // Same-span alternatives preserve the sibling
                        // match, so they can be attached without
                        // re-checking the remaining slots.
                        for (alt_ix, &(alt_end, alt_src)) in options.iter().enumerate() {
                            if alt_ix == opt_ix || alt_end != end {
                                continue;
                            }
                            let alt = match alt_src {
                                Either::Left(h) => Some(ParseNode::leaf(h)),
                                Either::Right(r2) => {
                                    self.extract(ctx, expr, r2, pos, end, ext, tainted)
                                }
                            };
                            if let Some(alt) = alt {
                                children[idx].alternatives.push(alt);
                            }
                        }
                        return true;
                    }
                    children.pop();
                }
                false
            }
        }
    }
}

impl FormulaParser for EarleyParser {
    fn parse(
        &mut self,
        ctx: &RuleCtx<'_>,
        target: TypeCode,
        expr: &[ParseSym],
        max_seq: u32,
        want: usize,
    ) -> Result<Vec<ParseTree>, ParseError> {
        if expr.is_empty() {
            return self.parse_empty(ctx, target, max_seq);
        }
        if let [ParseSym::Hyp(h, t)] = expr[..] {
            return self.parse_single_hyp(ctx, target, h, t, max_seq);
        }

        let mut retries = 0u32;
        let candidates = loop {
            match self.run_chart(ctx, target, expr, max_seq) {
                Ok(candidates) => break candidates,
                Err(overflow) => {
                    if retries >= self.caps.max_retries {
                        let (what, ceiling) = match overflow {
                            Overflow::Items => ("parser item sets", self.item_cap),
                            Overflow::Completed => {
                                ("parser completed-item sets", self.completed_cap)
                            }
                        };
                        return Err(CapacityError {
                            what,
                            retries,
                            ceiling,
                        }
                        .into());
                    }
                    match overflow {
                        Overflow::Items => self.item_cap *= 2,
                        Overflow::Completed => self.completed_cap *= 2,
                    }
                    retries += 1;
                    debug!(
                        "parser scratch overflow, retry {retries} (items {}, completed {})",
                        self.item_cap, self.completed_cap
                    );
                }
            }
        };

        if candidates.is_empty() {
            return Err(ParseError::Stalled {
                position: self.chart.furthest.min(expr.len().saturating_sub(1)),
            });
        }

        let mut ext = Extraction {
            memo: HashMap::new(),
            in_progress: HashSet::new(),
        };
        let mut trees: Vec<ParseTree> = Vec::new();
        for rule in candidates {
            let mut tainted = false;
            let Some(root) =
                self.extract(ctx, expr, rule, 0, expr.len(), &mut ext, &mut tainted)
            else {
                continue;
            };
            for variant in root.expand(want.max(1)) {
                if trees.iter().any(|t| t.root.structurally_eq(&variant)) {
                    continue;
                }
                trees.push(ParseTree::new(variant));
                if trees.len() >= want.max(1) {
                    return Ok(trees);
                }
            }
        }

        if trees.is_empty() {
            return Err(ParseError::Stalled {
                position: self.chart.furthest.min(expr.len().saturating_sub(1)),
            });
        }
        Ok(trees)
    }
}
