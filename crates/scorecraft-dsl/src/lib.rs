//! Score compiler for the scorecraft live-coding music engine.
//!
//! Turns a textual score script into a validated [`Program`] the sequencer
//! and voice engine can run directly — no further name resolution or range
//! checking happens downstream. A script declares synths, patterns, and
//! sequences, then wires them into tracks with `play`/`playseq`; see
//! [`parser::parse_script`] for the one-pass command grammar.
//!
//! # Example
//!
//! ```
//! use scorecraft_dsl::parse_script;
//!
//! let script = "\
//!     tempo 120
//!     synth k kick
//!     pattern p (C1 . C1 .)
//!     play p k
//! ";
//! let program = parse_script(script).unwrap();
//! assert_eq!(program.tracks.len(), 1);
//! ```
//!
//! # Modules
//!
//! - [`error`]: parse error types
//! - [`lexer`]: line/token splitting
//! - [`note`]: pitch parsing and maqam/mode cents tables
//! - [`pattern`]: pattern-body compilation (bracket-list and space-separated forms)
//! - [`program`]: the compiled [`Program`] data model
//! - [`parser`]: command dispatch

pub mod error;
pub mod lexer;
pub mod note;
pub mod parser;
pub mod pattern;
pub mod program;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use parser::parse_script;
pub use program::{
    DroneDef, ModDef, ModDest, ModSource, OrnamentMode, PatternDef, PatternStep, Program,
    SequenceDef, SequenceStep, SynthDef, SynthType, TrackDef,
};
