//! Pluggable formula-parsing strategies.
//!
//! The grammar delegates to a [`FormulaParser`] behind a trait object so an
//! alternative implementation (the naive [`BottomUpParser`]) can serve as a
//! cross-check oracle against the production [`EarleyParser`].
use qlformal::prelude::*;

use crate::error::ParseError;
use crate::grammar::rules::RuleSet;

mod bottom_up;
mod earley;

pub use bottom_up::BottomUpParser;
pub use earley::{EarleyParser, ParserCaps};

/// One pre-resolved input token: variables have already been replaced by
/// their active variable hypothesis, so the parser only ever sees terminals
/// and typed placeholders.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParseSym {
    Const(SymbolId),
    /// A variable resolved to its hypothesis, acting as a terminal of the
    /// hypothesis' type.
    Hyp(StmtId, TypeCode),
}

impl ParseSym {
    pub fn as_const(self) -> Option<SymbolId> {
        match self {
            ParseSym::Const(c) => Some(c),
            ParseSym::Hyp(..) => None,
        }
    }
}

/// Borrowed grammar context for one parse call.
#[derive(Copy, Clone)]
pub struct RuleCtx<'a> {
    pub rules: &'a RuleSet,
    pub syms: &'a SymbolTable,
    pub stmts: &'a StatementTable,
}

/// A parsing strategy: given a target type, a variable-resolved symbol
/// sequence and a sequence ceiling, return up to `want` structurally
/// distinct parse trees.
///
/// Contract
/// - Returned trees are deduplicated and ordered by rule priority; parsing
///   the same input twice yields the same order.
/// - No returned tree references a rule whose origin sequence number
///   exceeds `max_seq`.
/// - An empty result is expressed as [`ParseError::Stalled`], carrying the
///   furthest input position that made progress.
pub trait FormulaParser {
    fn parse(
        &mut self,
        ctx: &RuleCtx<'_>,
        target: TypeCode,
        expr: &[ParseSym],
        max_seq: u32,
        want: usize,
    ) -> Result<Vec<ParseTree>, ParseError>;
}
