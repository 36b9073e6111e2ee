//! scorecraft — command-line interface for the live-coding music engine.
//!
//! Compiles and renders score scripts (see the `scorecraft-dsl` and
//! `scorecraft-engine` crates for the actual compiler and sequencer).

use clap::Parser;
use std::process::ExitCode;

use scorecraft_cli::cli_args::{Cli, Commands};
use scorecraft_cli::commands;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            script,
            out,
            seconds,
            sample_rate,
            buffer_frames,
        } => commands::render::run(&script, &out, seconds, sample_rate, buffer_frames),
        Commands::Check { script } => commands::check::run(&script),
        Commands::Info { script } => commands::info::run(&script),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
