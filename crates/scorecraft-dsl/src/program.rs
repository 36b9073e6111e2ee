//! The validated program produced by compiling a score script.
//!
//! Every struct here mirrors a fixed-capacity table in the reference
//! compiler: scripts are bounded by [`MAX_NAME`], [`MAX_PATTERN_STEPS`],
//! [`MAX_SYNTHS`] and friends, and exceeding a bound is a parse error
//! rather than a silent truncation.

use std::collections::HashMap;

pub const MAX_NAME: usize = 32;
pub const MAX_PATTERN_STEPS: usize = 128;
pub const MAX_PATTERNS: usize = 64;
pub const MAX_SYNTHS: usize = 32;
pub const MAX_TRACKS: usize = 128;
pub const MAX_SEQUENCES: usize = 8;
pub const MAX_SEQUENCE_STEPS: usize = 32;
pub const MAX_DRONES: usize = 4;
pub const MAX_MODS_PER_SYNTH: usize = 32;
pub const MAX_SECTIONS: usize = 14;

/// Oscillator/percussion/physical-model voice type a synth definition selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthType {
    Sine,
    Saw,
    Supersaw,
    Square,
    Tri,
    Noise,
    Pulse,
    Fm,
    Fm2,
    Ring,
    Acid,
    Kick,
    Kick808,
    Kick909,
    Snare,
    Snare808,
    Snare909,
    Clap,
    Clap909,
    HatClosed,
    HatOpen,
    Hat808,
    Hat909,
    Tom,
    Rim,
    Glitch,
    Metal,
    Bitperc,
    Comb,
    PmString,
    PmBell,
    PmPipe,
    PmKick,
    PmSnare,
    PmHat,
    PmClap,
    PmTom,
}

/// Resolves a `synth <name> <type>` keyword (including its synonyms) to a
/// [`SynthType`]. Returns `None` for anything unrecognized.
pub fn parse_synth_type(token: &str) -> Option<SynthType> {
    Some(match token {
        "sine" => SynthType::Sine,
        "saw" => SynthType::Saw,
        "supersaw" => SynthType::Supersaw,
        "square" => SynthType::Square,
        "tri" | "triangle" => SynthType::Tri,
        "noise" => SynthType::Noise,
        "pulse" => SynthType::Pulse,
        "fm" => SynthType::Fm,
        "fm2" => SynthType::Fm2,
        "ring" => SynthType::Ring,
        "acid" => SynthType::Acid,
        "kick" => SynthType::Kick,
        "kick808" => SynthType::Kick808,
        "kick909" => SynthType::Kick909,
        "snare" => SynthType::Snare,
        "snare808" => SynthType::Snare808,
        "snare909" => SynthType::Snare909,
        "clap" => SynthType::Clap,
        "clap909" => SynthType::Clap909,
        "hatc" | "hat_c" | "hat-closed" => SynthType::HatClosed,
        "hato" | "hat_o" | "hat-open" => SynthType::HatOpen,
        "hat808" => SynthType::Hat808,
        "hat909" => SynthType::Hat909,
        "tom" => SynthType::Tom,
        "rim" | "rimshot" => SynthType::Rim,
        "glitch" => SynthType::Glitch,
        "metal" => SynthType::Metal,
        "bitperc" | "bit" => SynthType::Bitperc,
        "comb" | "res" | "resonator" => SynthType::Comb,
        "pm_string" | "pmstring" => SynthType::PmString,
        "pm_bell" | "pmbell" => SynthType::PmBell,
        "pm_pipe" | "pmpipe" => SynthType::PmPipe,
        "pm_kick" | "pmkick" => SynthType::PmKick,
        "pm_snare" | "pmsnare" => SynthType::PmSnare,
        "pm_hat" | "pmhat" => SynthType::PmHat,
        "pm_clap" | "pmclap" => SynthType::PmClap,
        "pm_tom" | "pmtom" => SynthType::PmTom,
        _ => return None,
    })
}

impl SynthType {
    /// Physical-model (delay-line) variants, including the plain comb synth.
    pub fn is_delay_line(self) -> bool {
        matches!(
            self,
            SynthType::Comb
                | SynthType::PmString
                | SynthType::PmBell
                | SynthType::PmPipe
                | SynthType::PmKick
                | SynthType::PmSnare
                | SynthType::PmHat
                | SynthType::PmClap
                | SynthType::PmTom
        )
    }

    /// Physical-model drum voices specifically (excludes `comb`/`pm_string`/`pm_bell`/`pm_pipe`).
    pub fn is_pm_drum(self) -> bool {
        matches!(
            self,
            SynthType::PmKick
                | SynthType::PmSnare
                | SynthType::PmHat
                | SynthType::PmClap
                | SynthType::PmTom
        )
    }
}

/// Modulation source a `mod` command reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModSource {
    Lfo,
    Env,
    Noise,
    SampleHold,
    Ring,
    Sync,
}

/// Modulation destination a `mod` command writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModDest {
    Amp,
    Cutoff,
    Res,
    Pan,
    Pitch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModDef {
    pub source: ModSource,
    pub dest: ModDest,
    pub rate: f32,
    pub depth: f32,
    pub offset: f32,
    pub lag_ms: f32,
    pub slew_ms: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthDef {
    pub name: String,
    pub synth_type: SynthType,
    pub amp: f32,
    pub cutoff: f32,
    pub res: f32,
    pub atk: f32,
    pub dec: f32,
    pub sus: f32,
    pub rel: f32,
    pub comb_feedback: f32,
    pub comb_damp: f32,
    pub comb_excite: f32,
    pub mods: Vec<ModDef>,
}

impl SynthDef {
    /// Defaults applied to a freshly declared synth, before any `set` overrides.
    pub fn new(name: String, synth_type: SynthType) -> Self {
        Self {
            name,
            synth_type,
            amp: 0.5,
            cutoff: 18_000.0,
            res: 0.1,
            atk: 0.01,
            dec: 0.1,
            sus: 0.6,
            rel: 0.2,
            comb_feedback: 0.85,
            comb_damp: 0.2,
            comb_excite: 0.7,
            mods: Vec::new(),
        }
    }
}

/// One step of a compiled pattern. `note < 0` marks a rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternStep {
    pub note: i32,
    pub cents: f32,
    pub degree: i32,
    pub degree_octave: i32,
    pub degree_micro: i32,
    pub degree_valid: bool,
    /// Per-step glide override in ms; negative means "use the track's `slide`".
    pub slide_ms: f32,
    pub accent: bool,
}

impl PatternStep {
    pub fn rest() -> Self {
        Self {
            note: -1,
            cents: 0.0,
            degree: 0,
            degree_octave: 0,
            degree_micro: 0,
            degree_valid: false,
            slide_ms: -1.0,
            accent: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternDef {
    pub name: String,
    pub steps: Vec<PatternStep>,
}

impl PatternDef {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceStep {
    pub pattern: String,
    pub repeat: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDef {
    pub name: String,
    pub steps: Vec<SequenceStep>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DroneDef {
    pub synth_index: usize,
    pub midi: f32,
}

/// Ornament direction for grace notes inserted around a scale-degree step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrnamentMode {
    Down,
    Up,
    Alternating,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackDef {
    /// Name of the pattern, or of the sequence when `is_sequence` is set.
    pub pattern: String,
    pub synth: String,
    pub is_sequence: bool,
    pub seq_start: i32,
    pub seq_end: i32,
    pub rate: f32,
    pub hurry: f32,
    pub fast: u32,
    pub slow: u32,
    pub every: u32,
    pub density: f32,
    pub rev: bool,
    pub palindrome: bool,
    pub iter: u32,
    pub chunk: u32,
    pub stut: u32,
    pub slide_ms: f32,
    pub ornament_prob: f32,
    pub ornament_mode: OrnamentMode,
    pub accent_prob: f32,
}

impl TrackDef {
    pub fn new(pattern: String, synth: String) -> Self {
        Self {
            pattern,
            synth,
            is_sequence: false,
            seq_start: 0,
            seq_end: -1,
            rate: 1.0,
            hurry: 1.0,
            fast: 1,
            slow: 1,
            every: 1,
            density: 1.0,
            rev: false,
            palindrome: false,
            iter: 1,
            chunk: 0,
            stut: 1,
            slide_ms: 0.0,
            ornament_prob: 0.0,
            ornament_mode: OrnamentMode::Down,
            accent_prob: 0.0,
        }
    }
}

/// A fully parsed, validated score: everything `render`/`play` needs, with
/// no dangling name references (those are resolved eagerly by the parser).
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub tempo: f32,
    pub master_amp: f32,
    pub root_midi: f32,
    pub maqam_offsets: [f32; 7],
    pub tempo_scale: f32,
    /// Indexed 1..=14 (index 0 unused, matching the reference section numbering).
    pub tempo_map: [f32; MAX_SECTIONS + 1],
    pub time_sig_num: u32,
    pub time_sig_den: u32,
    pub time_sig_num_map: [u32; MAX_SECTIONS + 1],
    pub time_sig_den_map: [u32; MAX_SECTIONS + 1],
    pub time_sig_enforce: bool,

    pub synths: Vec<SynthDef>,
    pub patterns: Vec<PatternDef>,
    pub sequences: Vec<SequenceDef>,
    pub drones: Vec<DroneDef>,
    pub tracks: Vec<TrackDef>,
}

impl Program {
    /// Default program state before any command runs: tempo 120 (scaled by
    /// `tempo_scale` 2.0 before use), master amp 0.8, root C4 (MIDI 60),
    /// major/ionian cents table, flat tempo map, 4/4 in every section with
    /// enforcement *off* until a script turns it on explicitly.
    pub fn new() -> Self {
        Self {
            tempo: 120.0,
            master_amp: 0.8,
            root_midi: 60.0,
            maqam_offsets: [0.0, 200.0, 400.0, 500.0, 700.0, 900.0, 1100.0],
            tempo_scale: 2.0,
            tempo_map: [1.0; MAX_SECTIONS + 1],
            time_sig_num: 4,
            time_sig_den: 4,
            time_sig_num_map: [4; MAX_SECTIONS + 1],
            time_sig_den_map: [4; MAX_SECTIONS + 1],
            time_sig_enforce: false,
            synths: Vec::new(),
            patterns: Vec::new(),
            sequences: Vec::new(),
            drones: Vec::new(),
            tracks: Vec::new(),
        }
    }

    pub fn find_synth(&self, name: &str) -> Option<usize> {
        self.synths.iter().position(|s| s.name == name)
    }

    pub fn find_pattern(&self, name: &str) -> Option<usize> {
        self.patterns.iter().position(|p| p.name == name)
    }

    pub fn find_sequence(&self, name: &str) -> Option<usize> {
        self.sequences.iter().position(|s| s.name == name)
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps the named tempo-map / timesig-map section aliases used by
/// `tempo_map`/`timesig_map` commands onto the 1..=14 section indices.
pub fn section_aliases() -> &'static HashMap<&'static str, &'static [u32]> {
    use std::sync::OnceLock;
    static MAP: OnceLock<HashMap<&'static str, &'static [u32]>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut m: HashMap<&'static str, &'static [u32]> = HashMap::new();
        m.insert("intro", &[1]);
        m.insert("verse", &[2, 4]);
        m.insert("chorus", &[3, 5]);
        m.insert("bridge", &[6]);
        m.insert("final", &[7]);
        m
    })
}
