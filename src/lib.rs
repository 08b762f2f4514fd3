//! A Grammar Flow Graph recognizer and parser: build a GFG from a
//! context-free grammar, recognize input against it with an Earley-style
//! Sigma-set sweep, and extract either one concrete parse tree or a full
//! ambiguity-preserving SPPF, top-down after the fact or bottom-up online.

/// Dense arena storage addressed by newtype indices, shared by the GFG
/// node table and the SPPF node table.
pub mod arena;
/// Error types returned across the crate's public boundary.
pub mod error;
/// The context-free grammar model: terminals, non-terminals, alternatives.
pub mod grammar;
/// The Grammar Flow Graph itself: node table and builder.
pub mod gfg;
/// The lexer/token contract parsing is built on.
pub mod lexer;
/// The Sigma-set recognizer: the ε-closure/scan sweep over the GFG.
pub mod sigma;
/// The Shared Packed Parse Forest node types, shared by both SPPF builders.
pub mod sppf;
/// Parse-result extraction: single tree, top-down forest, online forest.
pub mod extract;
/// The trees module, which contains tree data structures
pub mod trees;

pub use error::{GrammarError, GrammarResult, ParseReject, TokenError};
pub use gfg::{build_gfg, Gfg};
pub use grammar::Grammar;
pub use lexer::{Lexer, Token, VecLexer};
pub use sigma::{recognize, recognize_or_reject, ParseLimits};

pub use extract::single_tree::parse_one;
pub use extract::sppf_bottom_up::parse_forest_online;
pub use extract::sppf_top_down::{parse_forest, Forest};
