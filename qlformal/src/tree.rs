//! Parse nodes and trees.
//!
//! Role
//! - Record how a formula was derived from grammar rules.
//! - Keep, per node, a small ordered set of alternative subtrees so callers
//!   can enumerate further complete trees of an ambiguous parse without
//!   re-running the chart.
//! - Cache derived metrics (max depth, two-level signature) on first use.
//!
//! Trees are immutable once built; the metric cache is interior-mutable and
//! single-threaded like the rest of the engine.
use std::cell::Cell;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::statement::StmtId;

/// One derivation step: the producing statement plus the subtrees bound to
/// its hypothesis slots.
#[derive(Clone, Debug)]
pub struct ParseNode {
    pub stmt: StmtId,
    pub children: Vec<ParseNode>,
    /// Alternative derivations of the same input span, ordered by rule
    /// priority. Empty on unambiguous nodes and on enumerated output.
    pub alternatives: Vec<ParseNode>,
}

impl ParseNode {
    pub fn leaf(stmt: StmtId) -> Self {
        Self {
            stmt,
            children: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    pub fn new(stmt: StmtId, children: Vec<ParseNode>) -> Self {
        Self {
            stmt,
            children,
            alternatives: Vec::new(),
        }
    }

    /// Structural equality over (statement, children), ignoring the
    /// alternative sets: two derivations are the same tree regardless of
    /// what other derivations were discovered alongside them.
    pub fn structurally_eq(&self, other: &ParseNode) -> bool {
        if self.stmt != other.stmt || self.children.len() != other.children.len() {
            return false;
        }
        self.children
            .iter()
            .zip(other.children.iter())
            .all(|(a, b)| a.structurally_eq(b))
    }

    /// All variants of this node with alternatives resolved, primary
    /// derivation first, capped at `max`.
    ///
    /// Option order is the registration order of the alternatives; child
    /// combinations cycle rightmost-fastest, so enumeration is
    /// deterministic.
    pub fn expand(&self, max: usize) -> Vec<ParseNode> {
        let mut out = Vec::new();
        if max == 0 {
            return out;
        }

        let mut options: Vec<&ParseNode> = Vec::with_capacity(1 + self.alternatives.len());
        options.push(self);
        options.extend(self.alternatives.iter());

        'options: for opt in options {
            let expanded: Vec<Vec<ParseNode>> =
                opt.children.iter().map(|c| c.expand(max)).collect();

            // Odometer over child variants, rightmost digit fastest.
            let mut digits = vec![0usize; expanded.len()];
            loop {
                let children: Vec<ParseNode> = digits
                    .iter()
                    .zip(expanded.iter())
                    .map(|(&d, variants)| variants[d].clone())
                    .collect();
                out.push(ParseNode::new(opt.stmt, children));
                if out.len() >= max {
                    break 'options;
                }

                let mut pos = expanded.len();
                loop {
                    if pos == 0 {
                        break;
                    }
                    pos -= 1;
                    digits[pos] += 1;
                    if digits[pos] < expanded[pos].len() {
                        break;
                    }
                    digits[pos] = 0;
                }
                if digits.iter().all(|&d| d == 0) {
                    break;
                }
            }
        }
        out
    }
}

#[derive(Copy, Clone, Debug)]
struct TreeMetrics {
    max_depth: u32,
    level_two_sig: u64,
}

/// An immutable derivation tree attached to a statement after parsing.
#[derive(Clone, Debug)]
pub struct ParseTree {
    pub root: ParseNode,
    metrics: Cell<Option<TreeMetrics>>,
}

impl ParseTree {
    pub fn new(root: ParseNode) -> Self {
        Self {
            root,
            metrics: Cell::new(None),
        }
    }

    pub fn structurally_eq(&self, other: &ParseTree) -> bool {
        self.root.structurally_eq(&other.root)
    }

    /// Depth of the deepest node, counting the root as 1.
    pub fn max_depth(&self) -> u32 {
        self.metrics().max_depth
    }

    /// A two-level structural signature: hashes the root statement and the
    /// statements of its direct children. Cheap discriminator for
    /// unification lookup by front ends.
    pub fn level_two_sig(&self) -> u64 {
        self.metrics().level_two_sig
    }

    fn metrics(&self) -> TreeMetrics {
        if let Some(m) = self.metrics.get() {
            return m;
        }

        let mut max_depth = 0u32;
        let mut stack: Vec<(&ParseNode, u32)> = vec![(&self.root, 1)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            for child in node.children.iter() {
                stack.push((child, depth + 1));
            }
        }

        let mut hasher = DefaultHasher::new();
        self.root.stmt.hash(&mut hasher);
        for child in self.root.children.iter() {
            child.stmt.hash(&mut hasher);
        }
        let m = TreeMetrics {
            max_depth,
            level_two_sig: hasher.finish(),
        };
        self.metrics.set(Some(m));
        m
    }

    /// Postorder flattening: the reverse-Polish statement sequence that
    /// replays this derivation as a proof.
    pub fn rpn(&self) -> Vec<StmtId> {
        let mut out = Vec::new();
        fn walk(node: &ParseNode, out: &mut Vec<StmtId>) {
            for child in node.children.iter() {
                walk(child, out);
            }
            out.push(node.stmt);
        }
        walk(&self.root, &mut out);
        out
    }
}
