//! Error types for the sequencer and render pipeline.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while building or rendering an [`crate::engine::Engine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Sample rate outside a sane audio range.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// A render was requested for zero or negative duration.
    #[error("invalid render duration: {0} seconds")]
    InvalidDuration(f64),

    /// A compiled program has no tracks at all, so there's nothing to render.
    #[error("program has no tracks to play")]
    EmptyProgram,

    /// Propagated from writing the rendered buffer out as a WAV file.
    #[error("WAV write error: {0}")]
    Wav(#[from] hound::Error),

    /// I/O error unrelated to the WAV encoder itself (e.g. creating the
    /// output file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The script failed to compile; carries the compiler's own
    /// `Line N: <cause>` message verbatim.
    #[error("{0}")]
    Parse(#[from] scorecraft_dsl::ParseError),

    /// A `play`/`playseq` track names a synth that isn't declared anywhere
    /// in the program. Checked when the runtime is built, not by the
    /// compiler itself (see the crate-level docs on build-runtime-time
    /// validation).
    #[error("track references undefined synth '{0}'")]
    UndefinedSynth(String),

    /// A `play` track (or a `sequence` step) names a pattern that isn't
    /// declared anywhere in the program.
    #[error("track references undefined pattern '{0}'")]
    UndefinedPattern(String),

    /// A `playseq` track names a sequence that isn't declared anywhere in
    /// the program.
    #[error("track references undefined sequence '{0}'")]
    UndefinedSequence(String),

    /// The audio driver adapter failed to start.
    #[error("audio driver failed to start: {0}")]
    DriverFailed(String),
}
