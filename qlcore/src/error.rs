//! Error taxonomy of the engine.
//!
//! Grammar construction, parsing, proof replay and scratch sizing fail in
//! structurally different ways and carry different context; each concern
//! gets its own `thiserror` enum. Capacity exhaustion is deliberately not a
//! data error: it signals a sizing problem, never an invalid formula or
//! proof.
use thiserror::Error;

/// Scratch-array growth exceeded its hard ceiling.
///
/// Fatal and non-recoverable for the call that raised it; the engine never
/// converts this into a parse or verification failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("scratch capacity for {what} exhausted after {retries} grow-and-retry rounds (ceiling {ceiling})")]
pub struct CapacityError {
    pub what: &'static str,
    pub retries: u32,
    pub ceiling: usize,
}

/// A malformed syntax axiom or classification conflict discovered while
/// deriving grammar rules. The grammar stays uninitialized until the
/// database is corrected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("type code '{typ}' occurs as an ordinary constant in the formula of '{label}'")]
    TypCodeUsedAsConstant { label: String, typ: String },

    #[error("syntax axiom '{label}' carries disjoint-variable constraints")]
    DjVarsOnSyntaxAxiom { label: String },

    #[error(
        "syntax axiom '{label}' has {hyps} mandatory hypotheses but its formula holds {occurrences} variable occurrences"
    )]
    HypCountMismatch {
        label: String,
        hyps: usize,
        occurrences: usize,
    },

    #[error("variable hypothesis '{label}' is typed with provable type code '{typ}'")]
    VarHypProvableTyp { label: String, typ: String },

    #[error("type code '{typ}' carries conflicting grammatical roles")]
    ConflictingTypRoles { typ: String },

    #[error("variable '{token}' in '{label}' has no active variable hypothesis")]
    UnresolvedVar { label: String, token: String },

    #[error("grammar rule table exceeded {ceiling} rules during combinatorial expansion")]
    RuleTableOverflow { ceiling: usize },

    #[error(
        "syntax axiom '{label}' admits a second derivation under exhaustive ambiguity checking"
    )]
    AmbiguousSyntaxAxiom { label: String },
}

/// No derivation was found for a formula within the sequence ceiling.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The chart stopped making progress; `position` is the furthest
    /// expression offset any item reached, for diagnostics.
    #[error("no derivation found; progress stalled at expression position {position}")]
    Stalled { position: usize },

    /// Rule derivation failed earlier; the construction errors are in the
    /// message sink and no parsing proceeds until they are corrected.
    #[error("grammar is not initialized")]
    Uninitialized,

    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

/// Proof replay failed. Every variant names the theorem, the 1-based step
/// number and (where one exists) the step's label; propagation is immediate
/// per proof, while whole-table verification continues with the next
/// statement.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("theorem '{theorem}' step {step}: incomplete proof step")]
    IncompleteStep { theorem: String, step: usize },

    #[error("theorem '{theorem}' step {step}: label '{label}' is not a frame hypothesis or prior assertion")]
    UnresolvedLabel {
        theorem: String,
        step: usize,
        label: String,
    },

    #[error("theorem '{theorem}' step {step} ('{label}'): proof stack underflow")]
    StackUnderflow {
        theorem: String,
        step: usize,
        label: String,
    },

    #[error(
        "theorem '{theorem}' step {step} ('{label}'): hypothesis '{hyp}' expects type '{expected}' but the stack entry is typed '{found}'"
    )]
    HypTypMismatch {
        theorem: String,
        step: usize,
        label: String,
        hyp: String,
        expected: String,
        found: String,
    },

    #[error(
        "theorem '{theorem}' step {step} ('{label}'): substituted logical hypothesis '{hyp}' does not match its stack entry"
    )]
    LogHypMismatch {
        theorem: String,
        step: usize,
        label: String,
        hyp: String,
    },

    #[error(
        "theorem '{theorem}' step {step} ('{label}'): disjoint-variable violation between '{var1}' and '{var2}'"
    )]
    DjVarsViolation {
        theorem: String,
        step: usize,
        label: String,
        var1: String,
        var2: String,
    },

    #[error("theorem '{theorem}': proof left {entries} stack entries, expected exactly one")]
    FinalStackSize { theorem: String, entries: usize },

    #[error("theorem '{theorem}': final stack entry does not equal the theorem's formula")]
    FinalFormulaMismatch { theorem: String },

    #[error(transparent)]
    Capacity(#[from] CapacityError),
}
