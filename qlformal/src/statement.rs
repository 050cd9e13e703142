//! Statements: hypotheses, axioms and theorems of a loaded database.
//!
//! Role
//! - Variant records keyed by label and global sequence number.
//! - Carry the mandatory/optional frames and the per-statement parse-tree
//!   cache slot the grammar fills in.
use strum::{EnumDiscriminants, EnumIs};

use crate::formula::Formula;
use crate::frame::{MandFrame, OptFrame};
use crate::symbol::{GrammarFlags, SymbolId};
use crate::table::SymbolTable;
use crate::tree::ParseTree;

/// Identifier for a statement registered in the statement table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(u32);

impl StmtId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u32 {
        self.0
    }

    pub const fn as_index(self) -> usize {
        self.0 as usize
    }
}

/// The statement variants of the proof language.
///
/// The syntax/logical split of axioms is a property of the axiom's type
/// code and is resolved by the grammar's classification pass; see
/// [`Statement::is_syntax_axiom`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIs, EnumDiscriminants)]
pub enum StmtKind {
    /// Declares a variable's type: `typ var`.
    VarHyp,
    /// A logical premise in scope for a later assertion.
    LogHyp,
    /// An assertion accepted without proof; defines a grammar production
    /// when its type code is not provable.
    Axiom,
    /// An assertion carrying a proof to replay.
    Theorem,
}

/// A labeled statement with its formula, frames and proof.
///
/// `proof` is only meaningful on theorems; a `None` entry is an incomplete
/// step. The parse-tree slot is filled once by the grammar and reused until
/// invalidation.
#[derive(Clone, Debug)]
pub struct Statement {
    pub id: StmtId,
    pub label: String,
    /// Global declaration order; rules and assertions may only be used to
    /// parse/verify statements with an equal-or-greater sequence number.
    pub seq: u32,
    pub kind: StmtKind,
    pub formula: Formula,
    pub mand: MandFrame,
    pub opt: OptFrame,
    pub proof: Vec<Option<StmtId>>,
    tree: Option<ParseTree>,
}

impl Statement {
    pub fn new(
        id: StmtId,
        label: impl Into<String>,
        seq: u32,
        kind: StmtKind,
        formula: Formula,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            seq,
            kind,
            formula,
            mand: MandFrame::default(),
            opt: OptFrame::default(),
            proof: Vec::new(),
            tree: None,
        }
    }

    /// For variable hypotheses: the declared variable.
    pub fn var(&self) -> Option<SymbolId> {
        if self.kind.is_var_hyp() {
            self.formula.expr().first().copied()
        } else {
            None
        }
    }

    /// Whether this axiom defines a grammar production, i.e. its type code
    /// is not classified as provable. Meaningful after a grammar build.
    pub fn is_syntax_axiom(&self, syms: &SymbolTable) -> bool {
        self.kind.is_axiom()
            && !syms[self.formula.typ()]
                .flags
                .contains(GrammarFlags::PROVABLE_TYP)
    }

    /// Whether this statement pushes a formula during proof replay without
    /// consuming stack entries.
    pub fn is_hyp(&self) -> bool {
        matches!(self.kind, StmtKind::VarHyp | StmtKind::LogHyp)
    }

    pub fn tree(&self) -> Option<&ParseTree> {
        self.tree.as_ref()
    }

    pub fn set_tree(&mut self, tree: ParseTree) {
        self.tree = Some(tree);
    }

    /// Drop the cached tree; called on grammar invalidation.
    pub fn clear_tree(&mut self) {
        self.tree = None;
    }
}
