//! `check` command implementation: compiles a script and reports the
//! first parse or reference error, if any, without rendering anything.

use colored::Colorize;
use std::process::ExitCode;

use scorecraft_engine::Engine;

use super::read_script;

pub fn run(script_path: &str) -> anyhow::Result<ExitCode> {
    let script = read_script(script_path)?;

    let mut engine = Engine::new();
    match engine.play_script(&script) {
        Ok(()) => {
            let tracks = engine.program().map(|p| p.tracks.len()).unwrap_or(0);
            println!(
                "{} {} ({} track{})",
                "ok:".green().bold(),
                script_path,
                tracks,
                if tracks == 1 { "" } else { "s" }
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(message) => {
            eprintln!("{} {}", "error:".red().bold(), message);
            Ok(ExitCode::FAILURE)
        }
    }
}
