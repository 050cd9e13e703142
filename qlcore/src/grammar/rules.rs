//! Grammar rules derived from syntax axioms.
//!
//! Role
//! - The three rule variants (notation, nulls-permitted, type conversion)
//!   with their rule-format expressions and result-builder templates.
//! - The registration store: registration-order priority, structural
//!   deduplication with earliest-rule-wins, and the indexes the parser
//!   consumes (rules by result type, nulls/conversion lookup, gimme map,
//!   FIRST sets).
use std::collections::{HashMap, HashSet};

use qlformal::prelude::*;
use strum::EnumIs;

/// One element of a rule-format expression: a literal constant or a
/// hypothesis position carrying the type it must derive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RuleSym {
    Const(SymbolId),
    Typ(TypeCode),
}

impl RuleSym {
    pub fn as_typ(self) -> Option<TypeCode> {
        match self {
            RuleSym::Typ(t) => Some(t),
            RuleSym::Const(_) => None,
        }
    }
}

/// The grammar-rule variants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIs)]
pub enum RuleKind {
    /// Ordinary production with at least one expression element.
    Notation,
    /// Empty production: the type derives the empty symbol sequence.
    NullsPermitted,
    /// Single-hypothesis coercion from one type code to another.
    TypeConversion,
}

/// Result-builder template: how a matched rule assembles its parse node.
///
/// `Slot(i)` is the i-th hypothesis subtree matched by the parser, in
/// rule-format-expression order. Fixed `Node`s appear on derived rules,
/// where combinatorial expansion baked a nulls or conversion derivation
/// into the tree shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildNode {
    Slot(usize),
    Node(StmtId, Vec<BuildNode>),
}

impl BuildNode {
    /// Instantiate the template, consuming the matched subtrees.
    pub fn instantiate(&self, slots: &mut [Option<ParseNode>]) -> ParseNode {
        match self {
            BuildNode::Slot(i) => slots[*i]
                .take()
                .expect("rule template references each slot exactly once"),
            BuildNode::Node(stmt, children) => ParseNode::new(
                *stmt,
                children.iter().map(|c| c.instantiate(slots)).collect(),
            ),
        }
    }

    /// Replace `Slot(slot)` with `repl` and shift every slot index above it
    /// down by the number of slots `repl` consumes less one.
    fn graft(&self, slot: usize, repl: &BuildNode, repl_slots: usize) -> BuildNode {
        match self {
            BuildNode::Slot(i) if *i == slot => repl.clone(),
            BuildNode::Slot(i) if *i > slot => {
                // repl_slots == 0 drops a slot, repl_slots == 1 keeps the count.
                BuildNode::Slot(*i + repl_slots - 1)
            }
            BuildNode::Slot(i) => BuildNode::Slot(*i),
            BuildNode::Node(stmt, children) => BuildNode::Node(
                *stmt,
                children
                    .iter()
                    .map(|c| c.graft(slot, repl, repl_slots))
                    .collect(),
            ),
        }
    }
}

/// A derived grammar rule.
#[derive(Clone, Debug)]
pub struct GrammarRule {
    /// Registration-order priority; earlier-registered rules win ties.
    pub rule_nbr: u32,
    /// Origin sequence ceiling: the rule may only serve parses whose
    /// ceiling is at or above this value.
    pub max_seq: u32,
    pub kind: RuleKind,
    pub result_typ: TypeCode,
    /// Rule-format expression the parser matches against input.
    pub expr: Vec<RuleSym>,
    /// Result builder; `Slot` indexes follow `expr`'s `Typ` order.
    pub template: BuildNode,
    pub n_slots: usize,
    /// The syntax axiom this rule descends from, for diagnostics.
    pub base_stmt: StmtId,
}

impl GrammarRule {
    /// Positions and types of the hypothesis slots in `expr`.
    pub fn slot_typs(&self) -> impl Iterator<Item = (usize, TypeCode)> + '_ {
        self.expr
            .iter()
            .filter_map(|s| s.as_typ())
            .enumerate()
    }

    /// Build the parse node for this rule from matched subtrees, one per
    /// slot in expression order.
    pub fn build(&self, children: Vec<ParseNode>) -> ParseNode {
        debug_assert_eq!(children.len(), self.n_slots);
        let mut slots: Vec<Option<ParseNode>> = children.into_iter().map(Some).collect();
        self.template.instantiate(&mut slots)
    }
}

/// FIRST-set entry for one type code: terminals and type codes that can
/// begin some derivation of it.
#[derive(Clone, Debug, Default)]
pub struct FirstSet {
    pub consts: HashSet<SymbolId>,
    pub typs: HashSet<TypeCode>,
}

/// The registration store built once per grammar (re)build.
#[derive(Debug, Default)]
pub struct RuleSet {
    pub rules: Vec<GrammarRule>,
    /// Chart rules (non-empty expression) grouped by result type.
    pub by_typ: HashMap<TypeCode, Vec<usize>>,
    /// Nulls-permitted rule per type, lowest rule_nbr.
    pub nulls: HashMap<TypeCode, usize>,
    /// Type-conversion rule per (from, to) pair, lowest rule_nbr.
    pub conversions: HashMap<(TypeCode, TypeCode), usize>,
    /// Conversion rules in registration order, for deterministic expansion.
    pub conv_list: Vec<usize>,
    /// Structural dedup index: (result type, expression) of every rule.
    seen: HashSet<(TypeCode, Vec<RuleSym>)>,
    pub first: HashMap<TypeCode, FirstSet>,
    /// Length-one constant whose only derivation in the whole grammar is a
    /// single rule; pre-resolvable before the chart runs.
    pub gimme: HashMap<SymbolId, usize>,
}

impl RuleSet {
    /// Register a rule. Rules derived by combinatorial expansion
    /// (`dedup = true`) are dropped when a structurally identical rule
    /// exists — the earlier registration wins. Base rules always register:
    /// two syntax axioms with the same rule format are a genuine grammar
    /// ambiguity that parsing must be able to demonstrate.
    pub fn register(&mut self, mut rule: GrammarRule, dedup: bool) -> Option<usize> {
        let key = (rule.result_typ, rule.expr.clone());
        if !self.seen.insert(key) && dedup {
            return None;
        }
        let idx = self.rules.len();
        rule.rule_nbr = idx as u32;

        match rule.kind {
            RuleKind::NullsPermitted => {
                self.nulls.entry(rule.result_typ).or_insert(idx);
            }
            RuleKind::TypeConversion => {
                let from = rule.expr[0]
                    .as_typ()
                    .expect("conversion expression is a single hypothesis");
                self.conversions.entry((from, rule.result_typ)).or_insert(idx);
                self.conv_list.push(idx);
            }
            RuleKind::Notation => {}
        }
        if !rule.expr.is_empty() {
            self.by_typ.entry(rule.result_typ).or_default().push(idx);
        }

        self.rules.push(rule);
        Some(idx)
    }

    /// Classify a candidate expression into a rule kind.
    pub fn kind_of(expr: &[RuleSym], result_typ: TypeCode) -> RuleKind {
        match expr {
            [] => RuleKind::NullsPermitted,
            [RuleSym::Typ(t)] if *t != result_typ => RuleKind::TypeConversion,
            _ => RuleKind::Notation,
        }
    }

    /// Derive the rule obtained by filling hypothesis slot `slot` of
    /// `parent` with `filler`'s derivation (a nulls-permitted rule: the
    /// slot disappears from the expression).
    pub fn derive_null_drop(&self, parent: usize, slot: usize, filler: usize) -> GrammarRule {
        let p = &self.rules[parent];
        let f = &self.rules[filler];
        debug_assert!(f.kind.is_nulls_permitted());

        let expr = Self::expr_without_slot(&p.expr, slot);
        let template = p.template.graft(slot, &f.template, 0);
        GrammarRule {
            rule_nbr: 0,
            max_seq: p.max_seq.max(f.max_seq),
            kind: Self::kind_of(&expr, p.result_typ),
            result_typ: p.result_typ,
            expr,
            template,
            n_slots: p.n_slots - 1,
            base_stmt: p.base_stmt,
        }
    }

    /// Derive the rule obtained by widening hypothesis slot `slot` of
    /// `parent` through conversion rule `conv` (the slot's type becomes the
    /// conversion's source type; the matched subtree is wrapped in the
    /// conversion's derivation).
    pub fn derive_widen(&self, parent: usize, slot: usize, conv: usize) -> GrammarRule {
        let p = &self.rules[parent];
        let c = &self.rules[conv];
        let from = c.expr[0]
            .as_typ()
            .expect("conversion expression is a single hypothesis");

        let mut expr = p.expr.clone();
        let mut seen = 0usize;
        for s in expr.iter_mut() {
            if s.as_typ().is_some() {
                if seen == slot {
                    *s = RuleSym::Typ(from);
                    break;
                }
                seen += 1;
            }
        }

        // The conversion's template consumes one slot; renumber it onto the
        // grafted position before substitution.
        let wrapped = c.template.graft(0, &BuildNode::Slot(slot), 1);
        let template = p.template.graft(slot, &wrapped, 1);
        GrammarRule {
            rule_nbr: 0,
            max_seq: p.max_seq.max(c.max_seq),
            kind: Self::kind_of(&expr, p.result_typ),
            result_typ: p.result_typ,
            expr,
            template,
            n_slots: p.n_slots,
            base_stmt: p.base_stmt,
        }
    }

    fn expr_without_slot(expr: &[RuleSym], slot: usize) -> Vec<RuleSym> {
        let mut seen = 0usize;
        let mut out = Vec::with_capacity(expr.len() - 1);
        for &s in expr {
            if s.as_typ().is_some() {
                if seen == slot {
                    seen += 1;
                    continue;
                }
                seen += 1;
            }
            out.push(s);
        }
        out
    }

    /// Compute FIRST sets by fixed-point closure over the chart rules.
    pub fn compute_first(&mut self) {
        let mut first: HashMap<TypeCode, FirstSet> = HashMap::new();
        for typ in self.by_typ.keys().copied() {
            first.entry(typ).or_default().typs.insert(typ);
        }
        for rule in self.rules.iter().filter(|r| !r.expr.is_empty()) {
            let entry = first.entry(rule.result_typ).or_default();
            entry.typs.insert(rule.result_typ);
            match rule.expr[0] {
                RuleSym::Const(c) => {
                    entry.consts.insert(c);
                }
                RuleSym::Typ(t) => {
                    entry.typs.insert(t);
                }
            }
        }

        loop {
            let mut changed = false;
            let typs: Vec<TypeCode> = first.keys().copied().collect();
            for t in typs {
                let inner: Vec<TypeCode> = first[&t].typs.iter().copied().collect();
                let mut add_consts: Vec<SymbolId> = Vec::new();
                let mut add_typs: Vec<TypeCode> = Vec::new();
                for u in inner {
                    if u == t {
                        continue;
                    }
                    if let Some(fu) = first.get(&u) {
                        add_consts.extend(fu.consts.iter().copied());
                        add_typs.extend(fu.typs.iter().copied());
                    }
                }
                let entry = first.get_mut(&t).expect("seeded above");
                for c in add_consts {
                    changed |= entry.consts.insert(c);
                }
                for u in add_typs {
                    changed |= entry.typs.insert(u);
                }
            }
            if !changed {
                break;
            }
        }
        self.first = first;
    }

    /// Compute the gimme map: constants whose only derivation anywhere in
    /// the grammar is a single one-constant rule.
    pub fn compute_gimme(&mut self) {
        let mut seen: HashMap<SymbolId, Option<usize>> = HashMap::new();
        for (idx, rule) in self.rules.iter().enumerate() {
            if let [RuleSym::Const(c)] = rule.expr[..] {
                seen.entry(c)
                    .and_modify(|e| *e = None)
                    .or_insert(Some(idx));
            }
        }
        self.gimme = seen
            .into_iter()
            .filter_map(|(c, idx)| idx.map(|i| (c, i)))
            .collect();
    }

    pub fn first_of(&self, typ: TypeCode) -> Option<&FirstSet> {
        self.first.get(&typ)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typ(raw: u32) -> TypeCode {
        SymbolId::from_raw(raw)
    }

    fn stmt(raw: u32) -> StmtId {
        StmtId::from_raw(raw)
    }

    fn notation(result: TypeCode, expr: Vec<RuleSym>, base: StmtId) -> GrammarRule {
        let n_slots = expr.iter().filter(|s| s.as_typ().is_some()).count();
        GrammarRule {
            rule_nbr: 0,
            max_seq: 10,
            kind: RuleSet::kind_of(&expr, result),
            result_typ: result,
            expr,
            template: BuildNode::Node(base, (0..n_slots).map(BuildNode::Slot).collect()),
            n_slots,
            base_stmt: base,
        }
    }

    #[test]
    fn null_drop_removes_the_slot_and_renumbers() {
        let t = typ(0);
        let mut rules = RuleSet::default();
        let plus = rules
            .register(
                notation(
                    t,
                    vec![RuleSym::Typ(t), RuleSym::Const(SymbolId::from_raw(9)), RuleSym::Typ(t)],
                    stmt(1),
                ),
                false,
            )
            .unwrap();
        let nulls = rules
            .register(notation(t, Vec::new(), stmt(2)), false)
            .unwrap();

        let derived = rules.derive_null_drop(plus, 0, nulls);
        assert_eq!(derived.n_slots, 1);
        assert_eq!(
            derived.expr,
            vec![RuleSym::Const(SymbolId::from_raw(9)), RuleSym::Typ(t)]
        );
        // The dropped slot is baked in as the nulls node; the surviving
        // slot is renumbered to 0.
        assert_eq!(
            derived.template,
            BuildNode::Node(
                stmt(1),
                vec![BuildNode::Node(stmt(2), vec![]), BuildNode::Slot(0)]
            )
        );
    }

    #[test]
    fn widen_wraps_the_slot_in_the_conversion_node() {
        let (a, b) = (typ(0), typ(1));
        let mut rules = RuleSet::default();
        let eq = rules
            .register(
                notation(
                    b,
                    vec![RuleSym::Typ(b), RuleSym::Const(SymbolId::from_raw(9)), RuleSym::Typ(b)],
                    stmt(1),
                ),
                false,
            )
            .unwrap();
        let conv = rules
            .register(notation(b, vec![RuleSym::Typ(a)], stmt(2)), false)
            .unwrap();
        assert!(rules.rules[conv].kind.is_type_conversion());

        let derived = rules.derive_widen(eq, 1, conv);
        assert_eq!(derived.n_slots, 2);
        assert_eq!(
            derived.expr,
            vec![RuleSym::Typ(b), RuleSym::Const(SymbolId::from_raw(9)), RuleSym::Typ(a)]
        );
        assert_eq!(
            derived.template,
            BuildNode::Node(
                stmt(1),
                vec![
                    BuildNode::Slot(0),
                    BuildNode::Node(stmt(2), vec![BuildNode::Slot(1)])
                ]
            )
        );
    }

    #[test]
    fn duplicate_derived_rules_are_dropped_but_base_rules_register() {
        let t = typ(0);
        let mut rules = RuleSet::default();
        let expr = vec![RuleSym::Const(SymbolId::from_raw(9)), RuleSym::Typ(t)];
        assert!(rules.register(notation(t, expr.clone(), stmt(1)), false).is_some());
        assert!(
            rules.register(notation(t, expr.clone(), stmt(2)), false).is_some(),
            "an independently declared identical notation is kept"
        );
        assert!(
            rules.register(notation(t, expr, stmt(3)), true).is_none(),
            "an expansion-derived duplicate is dropped"
        );
    }
}
