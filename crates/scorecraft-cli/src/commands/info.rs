//! `info` command implementation: compiles a script and prints a summary
//! of the resulting program — useful for sanity-checking a script's
//! shape without rendering any audio.

use colored::Colorize;
use std::process::ExitCode;

use scorecraft_engine::Engine;

use super::read_script;

pub fn run(script_path: &str) -> anyhow::Result<ExitCode> {
    let script = read_script(script_path)?;

    let mut engine = Engine::new();
    if let Err(message) = engine.play_script(&script) {
        eprintln!("{} {}", "error:".red().bold(), message);
        return Ok(ExitCode::FAILURE);
    }

    let program = engine.program().expect("play_script succeeded");

    println!("{}", script_path.bold());
    println!("  tempo:        {:.1} bpm", program.tempo);
    println!("  master amp:   {:.2}", program.master_amp);
    println!(
        "  time sig:     {}/{} (enforce: {})",
        program.time_sig_num, program.time_sig_den, program.time_sig_enforce
    );
    println!("  synths:       {}", program.synths.len());
    for synth in &program.synths {
        println!("    - {} ({:?})", synth.name, synth.synth_type);
    }
    println!("  patterns:     {}", program.patterns.len());
    for pattern in &program.patterns {
        println!("    - {} ({} steps)", pattern.name, pattern.steps.len());
    }
    println!("  sequences:    {}", program.sequences.len());
    for sequence in &program.sequences {
        println!("    - {} ({} steps)", sequence.name, sequence.steps.len());
    }
    println!("  drones:       {}", program.drones.len());
    println!("  tracks:       {}", program.tracks.len());
    for track in &program.tracks {
        let kind = if track.is_sequence { "playseq" } else { "play" };
        println!("    - {} {} on {}", kind, track.pattern, track.synth);
    }

    Ok(ExitCode::SUCCESS)
}
