//! Fixture databases for tests.
//!
//! Builds symbol/statement tables the way the external loader would, from
//! whitespace-separated formula strings. Not part of the public API.
use qlformal::prelude::*;

/// A hand-built database: symbol and statement tables plus the helpers
/// tests use to reference entries by label.
pub struct Fixture {
    pub syms: SymbolTable,
    pub stmts: StatementTable,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            syms: SymbolTable::new(),
            stmts: StatementTable::new(),
        }
    }

    pub fn consts(&mut self, tokens: &[&str]) -> &mut Self {
        for t in tokens {
            self.syms.add_const(t);
        }
        self
    }

    pub fn vars(&mut self, tokens: &[&str]) -> &mut Self {
        for t in tokens {
            self.syms.add_var(t);
        }
        self
    }

    /// Parse "typ sym sym ..." into a formula over interned symbols.
    pub fn formula(&self, text: &str) -> Formula {
        let mut it = text.split_whitespace();
        let typ = self.sym(it.next().expect("formula text has a type code"));
        Formula::new(typ, it.map(|t| self.sym(t)))
    }

    pub fn sym(&self, token: &str) -> SymbolId {
        self.syms
            .lookup(token)
            .unwrap_or_else(|| panic!("unknown symbol token {token:?}"))
    }

    pub fn stmt(&self, label: &str) -> StmtId {
        self.stmts
            .lookup(label)
            .unwrap_or_else(|| panic!("unknown statement label {label:?}"))
    }

    /// Add a variable hypothesis and mark its variable active.
    pub fn var_hyp(&mut self, label: &str, typ: &str, var: &str) -> StmtId {
        let f = self.formula(&format!("{typ} {var}"));
        let vid = self.sym(var);
        let id = self.stmts.add(label, StmtKind::VarHyp, f);
        self.syms[vid].active_hyp = Some(id);
        id
    }

    pub fn log_hyp(&mut self, label: &str, text: &str) -> StmtId {
        let f = self.formula(text);
        self.stmts.add(label, StmtKind::LogHyp, f)
    }

    pub fn axiom(&mut self, label: &str, text: &str, hyps: &[&str]) -> StmtId {
        let f = self.formula(text);
        let hyps: Vec<StmtId> = hyps.iter().map(|h| self.stmt(h)).collect();
        let id = self.stmts.add(label, StmtKind::Axiom, f);
        self.stmts[id].mand = MandFrame::new(hyps);
        id
    }

    pub fn axiom_dj(
        &mut self,
        label: &str,
        text: &str,
        hyps: &[&str],
        djvars: &[(&str, &str)],
    ) -> StmtId {
        let id = self.axiom(label, text, hyps);
        let pairs: Vec<(SymbolId, SymbolId)> = djvars
            .iter()
            .map(|&(a, b)| (self.sym(a), self.sym(b)))
            .collect();
        let mand = std::mem::take(&mut self.stmts[id].mand);
        self.stmts[id].mand = mand.with_djvars(pairs);
        id
    }

    /// Add a theorem with its mandatory frame and proof. A "?" proof entry
    /// is an incomplete step.
    pub fn theorem(&mut self, label: &str, text: &str, hyps: &[&str], proof: &[&str]) -> StmtId {
        let f = self.formula(text);
        let hyps: Vec<StmtId> = hyps.iter().map(|h| self.stmt(h)).collect();
        let entries: Vec<Option<StmtId>> = proof
            .iter()
            .map(|p| (*p != "?").then(|| self.stmt(p)))
            .collect();
        let id = self.stmts.add(label, StmtKind::Theorem, f);
        self.stmts[id].mand = MandFrame::new(hyps);
        self.stmts[id].proof = entries;
        id
    }

    pub fn theorem_dj(
        &mut self,
        label: &str,
        text: &str,
        hyps: &[&str],
        djvars: &[(&str, &str)],
        proof: &[&str],
    ) -> StmtId {
        let id = self.theorem(label, text, hyps, proof);
        let pairs: Vec<(SymbolId, SymbolId)> = djvars
            .iter()
            .map(|&(a, b)| (self.sym(a), self.sym(b)))
            .collect();
        let mand = std::mem::take(&mut self.stmts[id].mand);
        self.stmts[id].mand = mand.with_djvars(pairs);
        id
    }

    /// The propositional-calculus fixture most tests run on: implication
    /// and negation notation, ax-1, ax-2 and modus ponens, plus the classic
    /// proof of `|- ( ph -> ph )`.
    pub fn propositional() -> Fixture {
        let mut fx = Fixture::new();
        fx.consts(&["|-", "wff", "(", ")", "->", "-."])
            .vars(&["ph", "ps", "ch"]);

        fx.var_hyp("wph", "wff", "ph");
        fx.var_hyp("wps", "wff", "ps");
        fx.var_hyp("wch", "wff", "ch");
        fx.axiom("wi", "wff ( ph -> ps )", &["wph", "wps"]);
        fx.axiom("wn", "wff -. ph", &["wph"]);
        fx.axiom("ax-1", "|- ( ph -> ( ps -> ph ) )", &["wph", "wps"]);
        fx.axiom(
            "ax-2",
            "|- ( ( ph -> ( ps -> ch ) ) -> ( ( ph -> ps ) -> ( ph -> ch ) ) )",
            &["wph", "wps", "wch"],
        );
        fx.log_hyp("min", "|- ph");
        fx.log_hyp("maj", "|- ( ph -> ps )");
        fx.axiom("ax-mp", "|- ps", &["wph", "wps", "min", "maj"]);

        fx.theorem("id", "|- ( ph -> ph )", &["wph"], &ID_PROOF);
        fx
    }
}

/// The classic derivation of `|- ( ph -> ph )` from ax-1, ax-2 and modus
/// ponens, in reverse-Polish label order.
pub const ID_PROOF: [&str; 40] = [
    "wph", "wph", "wph", "wi", "wi", // wff ( ph -> ( ph -> ph ) )
    "wph", "wph", "wi", // wff ( ph -> ph )
    "wph", "wph", "ax-1", // |- ( ph -> ( ph -> ph ) )
    "wph", "wph", "wph", "wi", "wph", "wi", "wi", // wff ( ph -> ( ( ph -> ph ) -> ph ) )
    "wph", "wph", "wph", "wi", "wi", "wph", "wph", "wi",
    "wi", // wff ( ( ph -> ( ph -> ph ) ) -> ( ph -> ph ) )
    "wph", "wph", "wph", "wi", "ax-1", // |- ( ph -> ( ( ph -> ph ) -> ph ) )
    "wph", "wph", "wph", "wi", "wph", "ax-2", // |- ( ... -> ( ... -> ( ph -> ph ) ) )
    "ax-mp", "ax-mp",
];
