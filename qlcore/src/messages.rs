//! Bounded error/information sink.
//!
//! Role
//! - Accumulate (source position, message) pairs on behalf of the hosting
//!   front end; the engine only writes into it and never terminates the
//!   process.
//! - Enforce message-count ceilings so a badly broken database cannot flood
//!   the caller.
use std::fmt;

use log::warn;

/// Where a message points: a statement label plus an optional step or
/// symbol offset. File offsets belong to the external loader, not to this
/// core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcePos {
    pub label: String,
    pub offset: Option<usize>,
}

impl SourcePos {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            offset: None,
        }
    }

    pub fn at(label: impl Into<String>, offset: usize) -> Self {
        Self {
            label: label.into(),
            offset: Some(offset),
        }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(off) => write!(f, "{}+{}", self.label, off),
            None => write!(f, "{}", self.label),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Message {
    pub pos: SourcePos,
    pub text: String,
}

/// Default ceilings, sized for interactive use.
pub const DEFAULT_MAX_ERRORS: usize = 64;
pub const DEFAULT_MAX_INFOS: usize = 256;

/// Accumulates errors and informational messages up to fixed ceilings.
#[derive(Debug)]
pub struct MessageSink {
    errors: Vec<Message>,
    infos: Vec<Message>,
    max_errors: usize,
    max_infos: usize,
    dropped: usize,
}

impl Default for MessageSink {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ERRORS, DEFAULT_MAX_INFOS)
    }
}

impl MessageSink {
    pub fn new(max_errors: usize, max_infos: usize) -> Self {
        Self {
            errors: Vec::new(),
            infos: Vec::new(),
            max_errors,
            max_infos,
            dropped: 0,
        }
    }

    /// Record an error. Returns false once the ceiling is reached; callers
    /// use this to stop processing further statements.
    pub fn error(&mut self, pos: SourcePos, text: impl Into<String>) -> bool {
        if self.errors.len() >= self.max_errors {
            if self.dropped == 0 {
                warn!("message sink error ceiling ({}) reached, dropping further errors", self.max_errors);
            }
            self.dropped += 1;
            return false;
        }
        self.errors.push(Message {
            pos,
            text: text.into(),
        });
        true
    }

    pub fn info(&mut self, pos: SourcePos, text: impl Into<String>) {
        if self.infos.len() < self.max_infos {
            self.infos.push(Message {
                pos,
                text: text.into(),
            });
        }
    }

    /// Whether another error can still be recorded.
    pub fn error_space_left(&self) -> bool {
        self.errors.len() < self.max_errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[Message] {
        &self.errors
    }

    pub fn infos(&self) -> &[Message] {
        &self.infos
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
        self.infos.clear();
        self.dropped = 0;
    }
}
