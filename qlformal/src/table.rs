//! Symbol and statement tables.
//!
//! Role
//! - Dense, sequence-ordered storage handed to the engine by the external
//!   loader.
//! - Label/token lookup for proof references and diagnostics.
//!
//! The tables own their entries; the grammar borrows them mutably to reset
//! classification flags and attach parse trees.
use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use crate::formula::Formula;
use crate::statement::{Statement, StmtId, StmtKind};
use crate::symbol::{Symbol, SymbolId};

/// Gap between consecutive sequence numbers, leaving room for the external
/// merge/insert subsystem to interleave statements.
const SEQ_STRIDE: u32 = 10;

#[derive(Debug, Default)]
pub struct SymbolTable {
    syms: Vec<Symbol>,
    by_token: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_const(&mut self, token: &str) -> SymbolId {
        self.add(token, Symbol::new_const)
    }

    pub fn add_var(&mut self, token: &str) -> SymbolId {
        self.add(token, Symbol::new_var)
    }

    fn add(&mut self, token: &str, make: impl FnOnce(SymbolId, String) -> Symbol) -> SymbolId {
        debug_assert!(
            !self.by_token.contains_key(token),
            "duplicate symbol token {token:?}"
        );
        let id = SymbolId::from_raw(self.syms.len() as u32);
        self.syms.push(make(id, token.to_string()));
        self.by_token.insert(token.to_string(), id);
        id
    }

    pub fn lookup(&self, token: &str) -> Option<SymbolId> {
        self.by_token.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.syms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.syms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.syms.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Symbol> {
        self.syms.iter_mut()
    }
}

impl Index<SymbolId> for SymbolTable {
    type Output = Symbol;

    fn index(&self, id: SymbolId) -> &Symbol {
        &self.syms[id.as_index()]
    }
}

impl IndexMut<SymbolId> for SymbolTable {
    fn index_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.syms[id.as_index()]
    }
}

/// Statements in declaration order, with label lookup.
#[derive(Debug, Default)]
pub struct StatementTable {
    stmts: Vec<Statement>,
    by_label: HashMap<String, StmtId>,
    next_seq: u32,
}

impl StatementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement, assigning the next sequence number.
    pub fn add(&mut self, label: &str, kind: StmtKind, formula: Formula) -> StmtId {
        debug_assert!(
            !self.by_label.contains_key(label),
            "duplicate statement label {label:?}"
        );
        let id = StmtId::from_raw(self.stmts.len() as u32);
        self.next_seq += SEQ_STRIDE;
        self.stmts
            .push(Statement::new(id, label, self.next_seq, kind, formula));
        self.by_label.insert(label.to_string(), id);
        id
    }

    pub fn lookup(&self, label: &str) -> Option<StmtId> {
        self.by_label.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// Statements in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.stmts.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = StmtId> {
        (0..self.stmts.len() as u32).map(StmtId::from_raw)
    }

    /// Drop every cached parse tree; called on grammar invalidation.
    pub fn clear_trees(&mut self) {
        for s in self.stmts.iter_mut() {
            s.clear_tree();
        }
    }
}

impl Index<StmtId> for StatementTable {
    type Output = Statement;

    fn index(&self, id: StmtId) -> &Statement {
        &self.stmts[id.as_index()]
    }
}

impl IndexMut<StmtId> for StatementTable {
    fn index_mut(&mut self, id: StmtId) -> &mut Statement {
        &mut self.stmts[id.as_index()]
    }
}
