//! Command-line argument definitions.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "scorecraft",
    version,
    about = "Compile and render scorecraft live-coding music scripts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a script and render it offline to a WAV file.
    Render {
        /// Path to the score script.
        script: String,
        /// Output WAV path.
        #[arg(short, long, default_value = "out.wav")]
        out: String,
        /// Duration to render, in seconds.
        #[arg(long, default_value_t = 4.0)]
        seconds: f64,
        /// Output sample rate, clamped to [8000, 192000].
        #[arg(long, default_value_t = 48_000)]
        sample_rate: u32,
        /// Render block size in frames, clamped to [64, 2048].
        #[arg(long, default_value_t = 256)]
        buffer_frames: u32,
    },
    /// Compile a script and report success or the first parse/reference error.
    Check {
        /// Path to the score script.
        script: String,
    },
    /// Compile a script and print a summary of its compiled program.
    Info {
        /// Path to the score script.
        script: String,
    },
}
