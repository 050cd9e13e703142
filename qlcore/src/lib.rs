//! Qlcore: grammar construction, parsing and proof replay for the Quill
//! proof checker.
//!
//! The crate exposes a small surface so front ends can derive a grammar
//! from a loaded database, parse statement formulas into trees, and replay
//! proofs, without depending on any loader or command layer. Most consumers
//! interact with [`grammar::Grammar`] and [`verify::ProofVerifier`].
//!
//! The engine is single-threaded and CPU-bound: one instance per loaded
//! database, scratch state mutated in place per call, no I/O.

pub mod error;
pub mod grammar;
pub mod messages;
pub mod parser;
#[cfg(any(test, feature = "test-utils"))]
pub mod tests_utils;
pub mod verify;
