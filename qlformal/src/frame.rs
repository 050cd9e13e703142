//! Hypothesis frames and disjoint-variable constraints.
use smallvec::SmallVec;

use crate::statement::StmtId;
use crate::symbol::SymbolId;

/// An unordered pair of variables required to stay disjoint under
/// substitution. Stored normalized so `(a, b)` and `(b, a)` compare equal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DjVars {
    lo: SymbolId,
    hi: SymbolId,
}

impl DjVars {
    pub fn new(a: SymbolId, b: SymbolId) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    pub fn lo(&self) -> SymbolId {
        self.lo
    }

    pub fn hi(&self) -> SymbolId {
        self.hi
    }
}

/// The mandatory hypothesis frame of an assertion: the ordered hypotheses
/// a use of the assertion must discharge, plus its disjoint-variable
/// constraints.
///
/// Immutable once attached to a statement.
#[derive(Clone, Debug, Default)]
pub struct MandFrame {
    pub hyps: SmallVec<StmtId, 4>,
    pub djvars: Vec<DjVars>,
}

impl MandFrame {
    pub fn new(hyps: impl IntoIterator<Item = StmtId>) -> Self {
        Self {
            hyps: hyps.into_iter().collect(),
            djvars: Vec::new(),
        }
    }

    pub fn with_djvars(mut self, pairs: impl IntoIterator<Item = (SymbolId, SymbolId)>) -> Self {
        self.djvars
            .extend(pairs.into_iter().map(|(a, b)| DjVars::new(a, b)));
        self
    }

    pub fn is_disjoint(&self, a: SymbolId, b: SymbolId) -> bool {
        self.djvars.contains(&DjVars::new(a, b))
    }
}

/// The optional frame of a theorem: hypotheses and constraints available
/// to its proof but not part of the assertion's own signature.
#[derive(Clone, Debug, Default)]
pub struct OptFrame {
    pub hyps: SmallVec<StmtId, 4>,
    pub djvars: Vec<DjVars>,
}

impl OptFrame {
    pub fn with_djvars(mut self, pairs: impl IntoIterator<Item = (SymbolId, SymbolId)>) -> Self {
        self.djvars
            .extend(pairs.into_iter().map(|(a, b)| DjVars::new(a, b)));
        self
    }

    pub fn is_disjoint(&self, a: SymbolId, b: SymbolId) -> bool {
        self.djvars.contains(&DjVars::new(a, b))
    }
}
