//! Typed error surface. Grammar errors are raised eagerly at `build_gfg`;
//! parse rejection is never an exception, only a typed return value.
//! Follows the `thiserror` derive style used throughout the retrieved
//! pack (e.g. `ForestError` in the dokearley example) rather than hand
//! written `Display`/`Error` impls.

use thiserror::Error;

/// Raised while compiling a [`crate::grammar::Grammar`] into a GFG.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// A non-terminal is reachable from the start symbol but has no
    /// alternatives recorded for it (it is neither a terminal nor a
    /// grammar key with productions).
    #[error("unknown symbol `{0}`: reachable from the start symbol but no alternatives were ever added for it")]
    UnknownSymbol(String),

    /// The start symbol itself has no productions.
    #[error("start symbol `{0}` has no productions")]
    MissingStart(String),
}

/// Raised by the scan transition in strict mode when a lexer produces a
/// token kind that matches no scan-edge label anywhere in the GFG.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("unrecognised token kind `{0}` at input position {1}")]
    UnrecognisedKind(String, usize),
}

/// A typed, non-exceptional rejection. Returned, never thrown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseReject;

impl std::fmt::Display for ParseReject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "input rejected: not a member of the grammar's language")
    }
}

impl std::error::Error for ParseReject {}

pub type GrammarResult<T> = Result<T, GrammarError>;
