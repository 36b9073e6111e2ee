//! Error types for the score compiler.

use std::fmt;
use thiserror::Error;

/// The cause of a parse failure, independent of the line it occurred on.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseErrorKind {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("unknown option '{0}' for '{1}'")]
    UnknownOption(String, String),
    #[error("missing argument for '{0}'")]
    MissingArgument(String),
    #[error("value out of range for '{0}': {1}")]
    OutOfRange(String, String),
    #[error("invalid range '{0}' for 'only'")]
    InvalidRange(String),
    #[error("invalid note token '{0}'")]
    InvalidNote(String),
    #[error("invalid degree token '{0}'")]
    InvalidDegree(String),
    #[error("too many {0} (max {1})")]
    CapacityExceeded(&'static str, usize),
    #[error("undefined pattern '{0}'")]
    UndefinedPattern(String),
    #[error("undefined sequence '{0}'")]
    UndefinedSequence(String),
    #[error("undefined synth '{0}'")]
    UndefinedSynth(String),
    #[error("no 'play' or 'playseq' command found in script")]
    NoPlayCommand,
}

/// A parse error tied to the 1-based source line it occurred on.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
