//! An interpretive parsing expression grammar engine.
//!
//! Patterns are built from small combinators and matched directly against
//! text. Besides the usual PEG operators the engine supports captures,
//! back-captures that refer to text matched earlier in the same attempt,
//! and named capture stacks. Back-captures and stack changes are rolled
//! back whenever the pattern that made them fails.
//!
//! # Example
//!
//! ```rust
//! use pegmatch::{any, back_capture, back_ref, capture, repeat, set, seq, Capture};
//!
//! // A string quoted with either ' or ", closed by the same quote.
//! let quoted = seq([
//!     back_capture("q", set("\"'")),
//!     capture(repeat(any(1).except(back_ref("q")), 0)),
//!     back_ref("q"),
//! ]);
//!
//! let m = quoted.matches("'Matched quoted string'").unwrap().unwrap();
//! assert_eq!(m.captures, [Capture::from("Matched quoted string")]);
//!
//! assert!(quoted.matches("'mismatched\"").unwrap().is_none());
//! ```

mod capture;
mod context;
pub mod debug;
mod error;
mod match_result;
mod matchable;
pub mod pattern;
mod stack;
pub mod tokenizer;

pub use capture::Capture;
pub use context::{Context, DEFAULT_MAX_DEPTH, MatchConfig};
pub use debug::{DebugFilter, DebugOptions, DebugSink, LogSink, MatchEvent, Phase};
pub use error::{MatchError, PatternError};
pub use match_result::MatchResult;
pub use matchable::MatchableString;
pub use pattern::{
    CharSet, FnOutcome, Pattern, RepeatCount, always, any, back_capture, back_capture_at,
    back_ref, bind_references, boolean, capture, choice, class, column, constant, count,
    fewer_than, func, group, group_non_empty, line, lit, lookahead, never, not, position, range,
    reference, repeat, rule_map, select, select_or, seq, set, sol, eol, stack_capture,
    stack_expect, stack_match, stack_match_at, stack_pop, stack_size, stack_size_is, wrap,
};
pub use stack::{Checkpoint, StackTable};
pub use tokenizer::{Grammar, Rule, Token, Tokenizer, Tokens};
