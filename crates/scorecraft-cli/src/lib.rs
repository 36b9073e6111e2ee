//! scorecraft CLI library.
//!
//! Thin wiring around [`scorecraft_engine::Engine`]: everything here is
//! presentation (argument parsing, colored terminal output, exit codes),
//! never synthesis or sequencing logic — that all lives in
//! `scorecraft-engine` and `scorecraft-dsl`.

pub mod cli_args;
pub mod commands;
