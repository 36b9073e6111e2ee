//! `render` command implementation: compiles a script and renders it
//! offline to a WAV file.

use colored::Colorize;
use std::process::ExitCode;
use std::time::Instant;

use scorecraft_engine::Engine;

use super::read_script;

#[allow(clippy::too_many_arguments)]
pub fn run(
    script_path: &str,
    out: &str,
    seconds: f64,
    sample_rate: u32,
    buffer_frames: u32,
) -> anyhow::Result<ExitCode> {
    let script = read_script(script_path)?;

    println!(
        "{} {} {} {}",
        "Rendering:".cyan().bold(),
        script_path,
        "->".dimmed(),
        out
    );

    let start = Instant::now();
    match Engine::render_to_wav(&script, out, seconds, sample_rate, buffer_frames) {
        Ok(()) => {
            let elapsed = start.elapsed();
            println!(
                "{} {} ({:.1}s audio, {} Hz, {:.2}s wall-clock)",
                "Wrote".green().bold(),
                out,
                seconds,
                sample_rate,
                elapsed.as_secs_f64()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(message) => {
            eprintln!("{} {}", "error:".red().bold(), message);
            Ok(ExitCode::FAILURE)
        }
    }
}
