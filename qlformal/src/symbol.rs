//! Symbols and their grammatical classification.
//!
//! Role
//! - Provide compact identifiers for the constants and variables of a loaded
//!   database.
//! - Carry the per-constant classification flags the grammar recomputes on
//!   every (re)build.
use bitflags::bitflags;
use strum::EnumIs;

use crate::statement::StmtId;

/// Identifier for a symbol registered in the symbol table.
///
/// Ids are dense indices into the owning [`SymbolTable`](crate::table::SymbolTable).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
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

/// A constant acting as the "kind" tag of a formula.
///
/// Type codes are ordinary constants until the grammar classifies them; the
/// alias keeps signatures honest about which ids are expected to be
/// grammatical.
pub type TypeCode = SymbolId;

bitflags! {
    /// Classification flags attached to constants, recomputed on each
    /// grammar (re)build.
    ///
    /// The four role flags are mutually exclusive per constant except
    /// `SYNTAX_AXIOM_TYP` with `VAR_HYP_TYP`; the grammar validates this
    /// during rule derivation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GrammarFlags: u8 {
        /// Constant is used as a type code somewhere in the database.
        const GRAMMATICAL = 1 << 0;

        /// Type code of at least one variable hypothesis.
        const VAR_HYP_TYP = 1 << 1;

        /// Type code of at least one syntax axiom.
        const SYNTAX_AXIOM_TYP = 1 << 2;

        /// Type code declared as tagging provable assertions.
        const PROVABLE_TYP = 1 << 3;

        /// Type code declared as tagging logical statements.
        const LOGIC_TYP = 1 << 4;
    }
}

/// Kinds of symbols recognised by the checker.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIs)]
pub enum SymbolKind {
    /// A terminal of the grammar.
    Const,
    /// A placeholder substituted during proof replay.
    Var,
}

/// A constant or variable declared by the database.
///
/// `flags` is only meaningful on constants and is owned by the grammar:
/// every rule derivation resets and recomputes it. `active_hyp` is only
/// meaningful on variables and is resolved by the external loader to the
/// variable hypothesis in scope.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub id: SymbolId,
    pub token: String,
    pub kind: SymbolKind,
    pub flags: GrammarFlags,
    pub active_hyp: Option<StmtId>,
}

impl Symbol {
    pub fn new_const(id: SymbolId, token: impl Into<String>) -> Self {
        Self {
            id,
            token: token.into(),
            kind: SymbolKind::Const,
            flags: GrammarFlags::empty(),
            active_hyp: None,
        }
    }

    pub fn new_var(id: SymbolId, token: impl Into<String>) -> Self {
        Self {
            id,
            token: token.into(),
            kind: SymbolKind::Var,
            flags: GrammarFlags::empty(),
            active_hyp: None,
        }
    }

    /// Whether this constant is classified as a type code.
    #[inline]
    pub fn is_grammatical(&self) -> bool {
        self.flags.contains(GrammarFlags::GRAMMATICAL)
    }
}
