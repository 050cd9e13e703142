//! Formulas: a type code followed by an ordered symbol sequence.
//!
//! Role
//! - Structural and expression-only equality used by the verifier.
//! - Variable substitution, the single rewriting primitive of proof replay.
//!
//! The leading type code is never substituted; only the expression part is
//! rewritten.
use smallvec::SmallVec;

use crate::symbol::{SymbolId, SymbolKind, TypeCode};
use crate::table::SymbolTable;

/// Inline capacity for formula expressions before spilling to the heap.
/// Most database formulas are short.
pub const FORMULA_INLINE: usize = 8;

/// A type code plus the expression symbols following it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Formula {
    typ: TypeCode,
    expr: SmallVec<SymbolId, FORMULA_INLINE>,
}

impl Formula {
    pub fn new(typ: TypeCode, expr: impl IntoIterator<Item = SymbolId>) -> Self {
        Self {
            typ,
            expr: expr.into_iter().collect(),
        }
    }

    /// The leading type code.
    #[inline]
    pub fn typ(&self) -> TypeCode {
        self.typ
    }

    /// The symbols after the type code.
    #[inline]
    pub fn expr(&self) -> &[SymbolId] {
        &self.expr
    }

    /// Total length including the type code.
    #[inline]
    pub fn len(&self) -> usize {
        self.expr.len() + 1
    }

    #[inline]
    pub fn is_empty_expr(&self) -> bool {
        self.expr.is_empty()
    }

    /// Expression-only equality, ignoring the leading type code.
    ///
    /// Used when self-verifying a grammar-derived tree as if it were a
    /// proof: the replayed type code is the syntax type, not the provable
    /// one.
    pub fn eq_expr(&self, other: &Formula) -> bool {
        self.expr == other.expr
    }

    /// Distinct variables occurring in the expression, in first-occurrence
    /// order.
    pub fn distinct_vars(&self, syms: &SymbolTable) -> Vec<SymbolId> {
        let mut out = Vec::new();
        for &s in self.expr.iter() {
            if syms[s].kind == SymbolKind::Var && !out.contains(&s) {
                out.push(s);
            }
        }
        out
    }

    /// Whether `var` occurs in the expression.
    pub fn contains(&self, var: SymbolId) -> bool {
        self.expr.contains(&var)
    }

    /// Apply a substitution to the expression, keeping the type code.
    ///
    /// `pairs` maps a variable to its replacement symbol sequence; variables
    /// without an entry are copied through unchanged. Lookup is a linear
    /// scan, mandatory frames are small.
    pub fn substitute(&self, pairs: &[(SymbolId, &[SymbolId])], syms: &SymbolTable) -> Formula {
        let mut expr: SmallVec<SymbolId, FORMULA_INLINE> =
            SmallVec::with_capacity(self.expr.len());
        for &s in self.expr.iter() {
            match self.lookup(pairs, s, syms) {
                Some(repl) => expr.extend_from_slice(repl),
                None => expr.push(s),
            }
        }
        Formula { typ: self.typ, expr }
    }

    /// Substitute into a raw output buffer, for callers that manage their
    /// own scratch.
    pub fn substitute_into(
        &self,
        pairs: &[(SymbolId, &[SymbolId])],
        syms: &SymbolTable,
        out: &mut Vec<SymbolId>,
    ) {
        for &s in self.expr.iter() {
            match self.lookup(pairs, s, syms) {
                Some(repl) => out.extend_from_slice(repl),
                None => out.push(s),
            }
        }
    }

    fn lookup<'a>(
        &self,
        pairs: &[(SymbolId, &'a [SymbolId])],
        s: SymbolId,
        syms: &SymbolTable,
    ) -> Option<&'a [SymbolId]> {
        if syms[s].kind != SymbolKind::Var {
            return None;
        }
        pairs.iter().find(|(v, _)| *v == s).map(|(_, repl)| *repl)
    }

    /// Render through the symbol table, for diagnostics.
    pub fn display(&self, syms: &SymbolTable) -> String {
        let mut out = String::from(syms[self.typ].token.as_str());
        for &s in self.expr.iter() {
            out.push(' ');
            out.push_str(&syms[s].token);
        }
        out
    }
}
