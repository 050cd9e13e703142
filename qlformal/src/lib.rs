//! Qlformal: the data model of the Quill proof checker.
//!
//! This crate holds the structured tables an external loader produces from a
//! source database — symbols with their grammatical classification flags,
//! labeled statements with formulas and hypothesis frames — together with
//! the parse trees the grammar engine attaches back onto statements.
//!
//! It contains no engine logic: grammar construction, parsing and proof
//! replay live in `qlcore` and operate over these types.
//!
//! Shape
//!  - [`symbol`] / [`table`]: interned constants and variables, dense id
//!    indexing, label lookup.
//!  - [`formula`]: a type code plus symbol sequence with structural and
//!    expression-only equality and variable substitution.
//!  - [`statement`] / [`frame`]: the statement variants, mandatory/optional
//!    frames and disjoint-variable pairs.
//!  - [`tree`]: immutable parse trees with per-node alternative sets and
//!    cached depth/signature metrics.

pub mod formula;
pub mod frame;
pub mod statement;
pub mod symbol;
pub mod table;
pub mod tree;

pub mod prelude {
    pub use crate::formula::Formula;
    pub use crate::frame::{DjVars, MandFrame, OptFrame};
    pub use crate::statement::{Statement, StmtId, StmtKind};
    pub use crate::symbol::{GrammarFlags, Symbol, SymbolId, SymbolKind, TypeCode};
    pub use crate::table::{StatementTable, SymbolTable};
    pub use crate::tree::{ParseNode, ParseTree};
}
