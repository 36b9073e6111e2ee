//! Sequencer and voice engine for the scorecraft live-coding music system.
//!
//! [`Engine`] owns the compiled [`Program`], a [`TrackRuntime`] per track,
//! and a fixed [`VoicePool`]. It exposes a pull-based render callback the
//! platform audio layer (or, offline, [`Engine::render_to_wav`]) drives one
//! block at a time — see `§4.8`/`§5` of the design for the concurrency
//! contract this crate assumes: a new [`Program`] is only ever installed
//! while the driver is stopped, so there is no lock-free swap to get
//! wrong.
//!
//! # Build-runtime-time validation
//!
//! The score compiler ([`scorecraft_dsl`]) resolves synth/pattern/sequence
//! *declarations* but does not check that a `play`/`playseq` track's
//! references exist — that happens here, in [`Engine::play_script`], when
//! the compiled [`Program`] is turned into live [`TrackRuntime`]s. A
//! dangling reference is a hard error and leaves whatever program was
//! previously installed untouched (unlike the reference implementation,
//! which installs the new program before validating the runtime and so
//! can lose the old one on a bad script — see `DESIGN.md`).
//!
//! # Modules
//!
//! - [`envelope`]: the four-stage ADSR used by every voice
//! - [`filter`]: one-pole and state-variable filters
//! - [`rng`]: the exact-bit generators voices and tracks seed from
//! - [`pool`]: the fixed 32-voice allocator
//! - [`voice`]: oscillators, the Karplus-Strong delay line, per-sample render
//! - [`track`]: per-track transforms and sequence/tempo-section advance

pub mod envelope;
pub mod error;
pub mod filter;
pub mod pool;
pub mod rng;
pub mod track;
pub mod voice;

pub use error::{EngineError, EngineResult};
pub use pool::{VoicePool, MAX_VOICES};
pub use track::{effective_pattern_length, TrackRuntime};
pub use voice::Voice;

use scorecraft_dsl::{parse_script, Program};

/// A platform collaborator that turns rendered frames into sound or
/// silence — device I/O, in the real implementation. The engine core
/// never depends on a concrete driver; swapping one out never touches
/// [`Engine`] itself.
pub trait AudioDriver {
    /// Called once the engine has a [`Program`] installed and is ready to
    /// have frames pulled from it.
    fn start(&mut self) -> Result<(), String>;
    /// Called before a new program is installed and on [`Engine::stop`].
    /// Must not return until any in-flight render has completed.
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// The default driver: no device, no output, just a running flag. Good
/// enough for embedding contexts that only ever call
/// [`Engine::render_to_wav`], and the one the engine is constructed with
/// until a real adapter is plugged in.
#[derive(Debug, Default)]
pub struct NullAudioDriver {
    running: bool,
}

impl AudioDriver for NullAudioDriver {
    fn start(&mut self) -> Result<(), String> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// The four scalars + clip flag `get_meter_ex` reads back, updated once
/// per rendered block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Meter {
    pub rms_l: f32,
    pub rms_r: f32,
    pub peak_l: f32,
    pub peak_r: f32,
    pub clip: bool,
}

const DEFAULT_SAMPLE_RATE: u32 = 48_000;
const DEFAULT_BUFFER_FRAMES: u32 = 256;
const DEFAULT_BIT_DEPTH: u8 = 32;
const DRONE_GATE_SECONDS: f32 = 60.0;

/// Owns the installed [`Program`], its [`TrackRuntime`]s, and the voice
/// pool; drives rendering and exposes the control-thread surface listed in
/// `§4.8`. Unlike the reference implementation's process-wide singleton,
/// this is a plain value a caller constructs, owns, and (optionally) wires
/// to a concrete [`AudioDriver`].
pub struct Engine {
    program: Option<Program>,
    tracks: Vec<TrackRuntime>,
    pool: VoicePool,

    sample_rate: u32,
    buffer_frames: u32,
    bit_depth: u8,

    tempo_section: usize,
    pattern_epoch: u64,
    meter: Meter,

    driver: Box<dyn AudioDriver>,
    output_device: Option<String>,
}

impl Engine {
    /// Constructs an engine with the defaults `init()` would apply:
    /// sr 48000, 256-frame buffer, 32-bit output, no program loaded yet.
    pub fn new() -> Self {
        Self {
            program: None,
            tracks: Vec::new(),
            pool: VoicePool::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            bit_depth: DEFAULT_BIT_DEPTH,
            tempo_section: 1,
            pattern_epoch: 0,
            meter: Meter::default(),
            driver: Box::new(NullAudioDriver::default()),
            output_device: None,
        }
    }

    /// Resets all engine state to its just-constructed defaults. Distinct
    /// from `new()` only in that it can be called again mid-session to
    /// drop whatever program is currently installed.
    pub fn init(&mut self) {
        self.driver.stop();
        *self = Self::new();
    }

    /// Swaps in a concrete driver (device output, a test double, ...).
    /// The previous driver is stopped first.
    pub fn set_driver(&mut self, driver: Box<dyn AudioDriver>) {
        self.driver.stop();
        self.driver = driver;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    /// Compiles `script`, builds a scratch runtime from it, and only once
    /// both succeed stops the driver, installs the new program and
    /// runtime, resets the voice pool, note-ons the drones, and restarts
    /// the driver. A failure at either stage leaves the previously
    /// installed program (if any) completely untouched.
    pub fn play_script(&mut self, script: &str) -> Result<(), String> {
        let program = parse_script(script).map_err(EngineError::Parse).map_err(|e| e.to_string())?;
        let tracks = build_tracks(&program, self.sample_rate).map_err(|e| e.to_string())?;

        self.driver.stop();

        self.program = Some(program);
        self.tracks = tracks;
        self.pool = VoicePool::new();
        self.tempo_section = 1;
        self.pattern_epoch = 0;
        self.meter = Meter::default();
        self.retune_all_tracks();
        self.trigger_drones();

        self.driver.start().map_err(|e| EngineError::DriverFailed(e).to_string())?;
        Ok(())
    }

    /// Stops the driver synchronously; any in-flight render completes
    /// before this returns (guaranteed by the driver implementation, not
    /// by this method).
    pub fn stop(&mut self) {
        self.driver.stop();
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_running()
    }

    pub fn get_tempo(&self) -> f32 {
        self.program.as_ref().map(|p| p.tempo).unwrap_or(0.0)
    }

    pub fn get_pattern_epoch(&self) -> u64 {
        self.pattern_epoch
    }

    pub fn get_meter(&self) -> (f32, f32) {
        (self.meter.peak_l, self.meter.peak_r)
    }

    pub fn get_meter_ex(&self) -> Meter {
        self.meter
    }

    /// Clamped to `[0, 4]`; takes effect on the next rendered sample.
    pub fn set_master(&mut self, amp: f32) {
        if let Some(program) = &mut self.program {
            program.master_amp = amp.clamp(0.0, 4.0);
        }
    }

    pub fn set_output_device(&mut self, id: &str) {
        self.output_device = Some(id.to_string());
    }

    pub fn output_device(&self) -> Option<&str> {
        self.output_device.as_deref()
    }

    /// Clamped to `[8000, 192000]`. Changing sample rate does not itself
    /// retune in-flight tracks; call this before `play_script`.
    pub fn set_sample_rate(&mut self, sr: u32) {
        self.sample_rate = sr.clamp(8_000, 192_000);
    }

    /// Clamped to `[64, 2048]`.
    pub fn set_buffer_frames(&mut self, n: u32) {
        self.buffer_frames = n.clamp(64, 2_048);
    }

    pub fn buffer_frames(&self) -> u32 {
        self.buffer_frames
    }

    /// Clamps to the nearest of `{16, 24, 32}`.
    pub fn set_bit_depth(&mut self, b: u8) {
        self.bit_depth = match b {
            0..=16 => 16,
            17..=24 => 24,
            _ => 32,
        };
    }

    fn base_samples_per_step(&self) -> i64 {
        let tempo = self.get_tempo();
        if tempo <= 0.0 {
            return 1;
        }
        ((self.sample_rate as f32 * 60.0 / tempo / 4.0).round() as i64).max(1)
    }

    fn retune_all_tracks(&mut self) {
        let Some(program) = &self.program else { return };
        let base = self.base_samples_per_step();
        for track in &mut self.tracks {
            track.update_tempo(program, self.tempo_section, base);
        }
    }

    fn trigger_drones(&mut self) {
        let Some(program) = &self.program else { return };
        let sr = self.sample_rate as f32;
        let gate = (DRONE_GATE_SECONDS * sr) as i64;
        for drone in &program.drones {
            let synth = &program.synths[drone.synth_index];
            let freq = scorecraft_dsl::note::midi_to_freq(drone.midi);
            self.pool.note_on(synth, freq, sr, gate, 1.0, 0, false);
        }
    }

    /// Advances every track by one sample, renders and sums all voices,
    /// applies master amp and bit-depth quantization, and returns a mono
    /// mix duplicated onto both channels (matching the reference mixer,
    /// which never pans). Does not update the block meter — callers that
    /// want metering should go through [`Engine::render_block`].
    pub fn render_frame(&mut self) -> (f32, f32) {
        let Some(program) = &self.program else { return (0.0, 0.0) };
        let sr = self.sample_rate as f32;

        let mut leader_section = None;
        for track in &mut self.tracks {
            let outcome = track.tick_frame(program, &mut self.pool, sr, self.tempo_section);
            if outcome.sequence_advanced && track.is_tempo_leader {
                if let Some(seq_idx) = track.sequence_idx {
                    let count = program.sequences[seq_idx].steps.len().max(1);
                    leader_section = Some((track.seq_pos as usize % count) + 1);
                }
            }
        }

        if let Some(section) = leader_section {
            self.tempo_section = section;
            self.pattern_epoch = self.pattern_epoch.wrapping_add(1);
            let base = self.base_samples_per_step();
            for track in &mut self.tracks {
                track.update_tempo(program, self.tempo_section, base);
            }
        }

        let mix = self.pool.render(sr) * program.master_amp;
        let mix = quantize(mix, self.bit_depth);
        (mix, mix)
    }

    /// Renders `frame_count` stereo frames (interleaved L,R,L,R,...),
    /// updating the block meter (peak + RMS per channel, clip flag) over
    /// exactly this block.
    pub fn render_block(&mut self, frame_count: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(frame_count * 2);
        let (mut sum_sq_l, mut sum_sq_r) = (0.0f32, 0.0f32);
        let (mut peak_l, mut peak_r) = (0.0f32, 0.0f32);
        let mut clip = false;

        for _ in 0..frame_count {
            let (l, r) = self.render_frame();
            if l.abs() > 1.0 || r.abs() > 1.0 {
                clip = true;
            }
            sum_sq_l += l * l;
            sum_sq_r += r * r;
            peak_l = peak_l.max(l.abs());
            peak_r = peak_r.max(r.abs());
            out.push(l);
            out.push(r);
        }

        let n = frame_count.max(1) as f32;
        self.meter = Meter {
            rms_l: (sum_sq_l / n).sqrt(),
            rms_r: (sum_sq_r / n).sqrt(),
            peak_l,
            peak_r,
            clip,
        };
        out
    }

    /// Offline render: runs the same block-render routine in a tight loop
    /// on the calling thread until `ceil(seconds * sr)` frames have been
    /// produced, writing interleaved stereo float32 PCM to `path`. Does
    /// not touch whatever program/driver state this engine already had
    /// installed beyond the lifetime of this call.
    pub fn render_to_wav(
        script: &str,
        path: &str,
        seconds: f64,
        sample_rate: u32,
        buffer_frames: u32,
    ) -> Result<(), String> {
        if seconds <= 0.0 {
            return Err(EngineError::InvalidDuration(seconds).to_string());
        }

        let mut engine = Engine::new();
        engine.set_sample_rate(sample_rate);
        engine.set_buffer_frames(buffer_frames);
        engine.play_script(script)?;

        let total_frames = (seconds * engine.sample_rate() as f64).ceil() as u64;
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: engine.sample_rate(),
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)
            .map_err(|e| EngineError::Wav(e).to_string())?;

        let mut remaining = total_frames;
        let block = engine.buffer_frames() as u64;
        while remaining > 0 {
            let this_block = remaining.min(block) as usize;
            let frames = engine.render_block(this_block);
            for sample in frames {
                writer
                    .write_sample(sample)
                    .map_err(|e| EngineError::Wav(e).to_string())?;
            }
            remaining -= this_block as u64;
        }

        writer.finalize().map_err(|e| EngineError::Wav(e).to_string())?;
        engine.stop();
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// `floor(x * K) / K` with `K = 32767` (16-bit) or `8388607` (24-bit); a
/// quantizer applied in the mix path, not a format conversion — the file
/// format stays float32 PCM regardless of bit depth.
fn quantize(x: f32, bit_depth: u8) -> f32 {
    let k = match bit_depth {
        16 => 32_767.0,
        24 => 8_388_607.0,
        _ => return x,
    };
    (x * k).floor() / k
}

/// Builds one [`TrackRuntime`] per [`scorecraft_dsl::TrackDef`], resolving
/// and validating every name reference a track carries. The first track
/// found that references a non-empty sequence becomes the tempo leader.
fn build_tracks(program: &Program, sample_rate: u32) -> Result<Vec<TrackRuntime>, EngineError> {
    let base_samples_per_step =
        ((sample_rate as f32 * 60.0 / program.tempo.max(0.001) / 4.0).round() as i64).max(1);

    let mut tracks = Vec::with_capacity(program.tracks.len());
    let mut leader_assigned = false;

    for (i, def) in program.tracks.iter().enumerate() {
        let synth_idx = program
            .find_synth(&def.synth)
            .ok_or_else(|| EngineError::UndefinedSynth(def.synth.clone()))?;

        let (pattern_idx, sequence_idx) = if def.is_sequence {
            let seq_idx = program
                .find_sequence(&def.pattern)
                .ok_or_else(|| EngineError::UndefinedSequence(def.pattern.clone()))?;
            for step in &program.sequences[seq_idx].steps {
                if program.find_pattern(&step.pattern).is_none() {
                    return Err(EngineError::UndefinedPattern(step.pattern.clone()));
                }
            }
            (None, Some(seq_idx))
        } else {
            let pat_idx = program
                .find_pattern(&def.pattern)
                .ok_or_else(|| EngineError::UndefinedPattern(def.pattern.clone()))?;
            (Some(pat_idx), None)
        };

        let mut runtime =
            TrackRuntime::build(def, i, pattern_idx, synth_idx, sequence_idx, base_samples_per_step);

        if !leader_assigned {
            if let Some(seq_idx) = sequence_idx {
                if !program.sequences[seq_idx].steps.is_empty() {
                    runtime.is_tempo_leader = true;
                    leader_assigned = true;
                }
            }
        }

        tracks.push(runtime);
    }

    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "\
        tempo 120
        synth s saw
        pattern p (60 . 67 .)
        play p s
    ";

    #[test]
    fn play_script_installs_a_program_and_starts_running() {
        let mut engine = Engine::new();
        engine.play_script(SCRIPT).unwrap();
        assert!(engine.is_running());
        assert_eq!(engine.get_tempo(), 240.0); // default tempo_scale 2.0
    }

    #[test]
    fn undefined_synth_reference_is_rejected_and_old_program_survives() {
        let mut engine = Engine::new();
        engine.play_script(SCRIPT).unwrap();
        let err = engine.play_script("pattern p (60)\nplay p ghost\n");
        assert!(err.is_err());
        assert!(engine.program().is_some());
        assert_eq!(engine.get_tempo(), 240.0);
    }

    #[test]
    fn rendering_produces_nonzero_signal() {
        let mut engine = Engine::new();
        engine.play_script(SCRIPT).unwrap();
        let frames = engine.render_block(48_000);
        assert!(frames.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn sequence_advance_increments_pattern_epoch() {
        let script = "\
            synth k kick
            pattern a (C1)
            pattern b (C1)
            sequence s (a*2 b)
            playseq s k
        ";
        let mut engine = Engine::new();
        engine.play_script(script).unwrap();
        let before = engine.get_pattern_epoch();
        for _ in 0..engine.sample_rate() * 2 {
            engine.render_frame();
        }
        assert!(engine.get_pattern_epoch() > before);
    }

    #[test]
    fn set_master_clamps_to_valid_range() {
        let mut engine = Engine::new();
        engine.play_script(SCRIPT).unwrap();
        engine.set_master(10.0);
        assert_eq!(engine.program().unwrap().master_amp, 4.0);
        engine.set_master(-1.0);
        assert_eq!(engine.program().unwrap().master_amp, 0.0);
    }

    #[test]
    fn sample_rate_and_buffer_frames_clamp() {
        let mut engine = Engine::new();
        engine.set_sample_rate(1);
        assert_eq!(engine.sample_rate(), 8_000);
        engine.set_sample_rate(1_000_000);
        assert_eq!(engine.sample_rate(), 192_000);
        engine.set_buffer_frames(1);
        assert_eq!(engine.buffer_frames(), 64);
        engine.set_buffer_frames(1_000_000);
        assert_eq!(engine.buffer_frames(), 2_048);
    }

    #[test]
    fn bit_depth_quantizes_to_requested_resolution() {
        assert_eq!(quantize(0.5, 32), 0.5);
        let q16 = quantize(0.123_456_7, 16);
        assert_ne!(q16, 0.123_456_7);
        assert!((q16 - 0.123_456_7).abs() < 0.001);
    }

    #[test]
    fn render_to_wav_writes_requested_frame_count() {
        let dir = std::env::temp_dir();
        let path = dir.join("scorecraft_engine_test_render.wav");
        let path_str = path.to_str().unwrap();
        Engine::render_to_wav(SCRIPT, path_str, 1.0, 48_000, 256).unwrap();

        let reader = hound::WavReader::open(path_str).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(reader.len() as u64, 48_000 * 2);
        std::fs::remove_file(path_str).ok();
    }
}
