//! A single polyphonic voice: oscillator, envelope, filter chain, and (for
//! delay-line types) a Karplus-Strong-style comb buffer.
//!
//! One [`Voice`] is reused across notes — `note_on` re-initializes it in
//! place rather than allocating a fresh one, so the pool in [`crate::pool`]
//! never touches the heap once warmed up.

use scorecraft_dsl::{ModDef, ModDest, ModSource, SynthDef, SynthType};

use crate::envelope::{AdsrEnvelope, EnvelopeStage};
use crate::filter::{OnePoleHighPass, OnePoleLowPass, StateVariableFilter};
use crate::rng::VoiceRng;

const COMB_MAX_SAMPLES: usize = 4096;

/// Live state for one `ModDef` attached to a voice's synth, rebuilt on every
/// `note_on` from `synth.mods`. `depth`/`offset` are already expressed in the
/// destination's own units (Hz for `cutoff`, semitones for `pitch`, a 0..1
/// multiplier delta for `amp`/`res`/`pan`) — there's no further scaling.
#[derive(Debug, Clone, Copy)]
struct ModRuntime {
    def: ModDef,
    phase: f32,
    held: f32,
    hold_remaining: f32,
    smoothed: f32,
    rng: VoiceRng,
}

impl ModRuntime {
    fn new(def: ModDef, seed: u32) -> Self {
        Self { def, phase: 0.0, held: 0.0, hold_remaining: 0.0, smoothed: 0.0, rng: VoiceRng::new(seed) }
    }

    /// Raw, unsmoothed source value. LFO/Ring/Sync/Noise/S&H land in
    /// `[-1, 1]`; Env tracks the envelope's current `[0, 1]` level directly.
    fn raw_source(&mut self, sample_rate: f32, env_level: f32) -> f32 {
        let rate = self.def.rate.max(0.001);
        match self.def.source {
            ModSource::Lfo => {
                self.phase += 2.0 * std::f32::consts::PI * rate / sample_rate;
                if self.phase >= 2.0 * std::f32::consts::PI {
                    self.phase -= 2.0 * std::f32::consts::PI;
                }
                self.phase.sin()
            }
            ModSource::Env => env_level,
            ModSource::Noise => self.rng.next_bipolar(),
            ModSource::SampleHold => {
                self.hold_remaining -= 1.0;
                if self.hold_remaining <= 0.0 {
                    self.held = self.rng.next_bipolar();
                    self.hold_remaining = sample_rate / rate;
                }
                self.held
            }
            ModSource::Ring => {
                self.phase += 2.0 * std::f32::consts::PI * rate / sample_rate;
                if self.phase >= 2.0 * std::f32::consts::PI {
                    self.phase -= 2.0 * std::f32::consts::PI;
                }
                self.phase.sin() * (self.phase * 1.5).sin()
            }
            ModSource::Sync => {
                self.phase += rate / sample_rate;
                if self.phase >= 1.0 {
                    self.phase -= 1.0;
                }
                2.0 * self.phase - 1.0
            }
        }
    }

    /// `lag_ms`/`slew_ms` both read as a smoothing time constant — the
    /// reference distinguishes "time before motion starts" from "time to
    /// ramp", which a per-sample one-pole can't express separately, so both
    /// just extend how sluggish the smoothing is.
    fn next(&mut self, sample_rate: f32, env_level: f32) -> f32 {
        let raw = self.raw_source(sample_rate, env_level);
        let tau_ms = (self.def.lag_ms + self.def.slew_ms).max(0.0);
        if tau_ms <= 0.0 {
            self.smoothed = raw;
        } else {
            let alpha = (-1.0 / (tau_ms * 0.001 * sample_rate)).exp();
            self.smoothed = alpha * self.smoothed + (1.0 - alpha) * raw;
        }
        self.def.offset + self.def.depth * self.smoothed
    }
}

/// Accumulated per-destination modulation for one sample, summed across
/// every `ModDef` on the voice's synth.
#[derive(Debug, Clone, Copy, Default)]
struct ModOutputs {
    amp: f32,
    cutoff: f32,
    res: f32,
    pan: f32,
    pitch_semitones: f32,
}

/// One detuning voice of the supersaw stack, in semitones of detune and
/// relative gain. Not present in the reference engine — `supersaw` is an
/// accepted synth keyword there with no oscillator case, so it renders
/// silence; here it gets the classic 7-saw unison stack instead.
const SUPERSAW_DETUNE_CENTS: [f32; 7] = [-24.0, -16.0, -8.0, 0.0, 8.0, 16.0, 24.0];

fn saw(phase: f32) -> f32 {
    let x = phase / (2.0 * std::f32::consts::PI);
    2.0 * (x - (x + 0.5).floor())
}

/// A live, sounding note. Persists across notes; fields not reset by
/// `note_on` (notably the comb buffer) are left stale until the next
/// delay-line note overwrites them.
#[derive(Debug, Clone)]
pub struct Voice {
    pub active: bool,
    pub synth_type: SynthType,
    freq: f32,
    target_freq: f32,
    glide_step: f32,
    glide_samples: i32,
    phase: f32,
    age: u64,
    pitch_env: f32,
    pitch_decay: f32,
    hp_state: OnePoleHighPass,
    svf: StateVariableFilter,
    envelope: AdsrEnvelope,
    cutoff: f32,
    filter_state: OnePoleLowPass,
    rng: VoiceRng,
    amp: f32,
    res: f32,
    accent: f32,
    comb_buf: Vec<f32>,
    comb_idx: usize,
    comb_len: usize,
    comb_feedback: f32,
    comb_damp: f32,
    comb_state: f32,
    crush_hold: f32,
    crush_count: i32,
    mods: Vec<ModRuntime>,
    /// Last computed pan modulation. Held for inspection/metering only — the
    /// engine's render callback sums every voice to a single mono signal and
    /// duplicates it across both output channels (§4.8), so a per-voice pan
    /// has no audible effect in this engine.
    pub pan: f32,
}

impl Voice {
    /// Reseeds this voice's noise generator. Called once per pool slot at
    /// construction; `note_on` only XORs the seed with the note frequency; it
    /// never resets it outright, so each voice's noise stream keeps drifting
    /// across however many notes it has played.
    pub fn seed(&mut self, seed: u32) {
        self.rng = VoiceRng::new(seed);
    }

    pub fn silent() -> Self {
        Self {
            active: false,
            synth_type: SynthType::Sine,
            freq: 0.0,
            target_freq: 0.0,
            glide_step: 0.0,
            glide_samples: 0,
            phase: 0.0,
            age: 0,
            pitch_env: 0.0,
            pitch_decay: 0.0,
            hp_state: OnePoleHighPass::new(),
            svf: StateVariableFilter::new(),
            envelope: AdsrEnvelope::silent(),
            cutoff: 0.0,
            filter_state: OnePoleLowPass::new(),
            rng: VoiceRng::new(1),
            amp: 0.0,
            res: 0.0,
            accent: 0.0,
            comb_buf: Vec::new(),
            comb_idx: 0,
            comb_len: 0,
            comb_feedback: 0.0,
            comb_damp: 0.0,
            comb_state: 0.0,
            crush_hold: 0.0,
            crush_count: 0,
            mods: Vec::new(),
            pan: 0.0,
        }
    }

    /// Starts a new note on this (possibly already-used) voice slot.
    ///
    /// `amp_scale` is 1.0 for ordinary steps, 0.5 for ornament grace notes.
    /// `gate_samples` is when Sustain forces itself into Release; for most
    /// calls it's `0.9 * samples_per_step` (`0.2` for grace notes, `0.8` for
    /// stutter retriggers).
    pub fn note_on(
        &mut self,
        synth: &SynthDef,
        freq: f32,
        sample_rate: f32,
        gate_samples: i64,
        amp_scale: f32,
        glide_samples: i32,
        accent: bool,
    ) {
        self.active = true;
        self.synth_type = synth.synth_type;
        self.age = 0;
        self.pitch_env = 1.0;
        self.pitch_decay = 1.0 / (0.03 * sample_rate);
        self.hp_state = OnePoleHighPass::new();
        self.svf = StateVariableFilter::new();

        if glide_samples > 0 {
            self.target_freq = freq;
            self.glide_samples = glide_samples;
            self.glide_step = (freq - self.freq) / glide_samples as f32;
        } else {
            self.target_freq = freq;
            self.glide_samples = 0;
            self.glide_step = 0.0;
            self.freq = freq;
        }

        if matches!(
            self.synth_type,
            SynthType::HatClosed | SynthType::HatOpen | SynthType::Hat808 | SynthType::Hat909
        ) {
            self.freq = if self.synth_type == SynthType::Hat808 { 7000.0 } else { 9000.0 };
            self.target_freq = self.freq;
            self.glide_samples = 0;
            self.glide_step = 0.0;
        }

        self.phase = 0.0;
        self.cutoff = synth.cutoff;
        self.filter_state = OnePoleLowPass::new();
        self.rng.0 ^= (freq * 1000.0) as u32;
        self.res = synth.res;
        self.accent = if accent { 1.0 } else { 0.0 };
        self.crush_hold = 0.0;
        self.crush_count = 0;

        self.amp = if self.synth_type == SynthType::Comb {
            synth.comb_excite * amp_scale
        } else {
            synth.amp * amp_scale
        };

        if self.synth_type.is_delay_line() {
            self.setup_delay_line(synth, freq, sample_rate);
        }

        let (mut atk, mut dec, mut sus, mut rel) = (synth.atk, synth.dec, synth.sus, synth.rel);
        self.apply_drum_envelope_overrides(sample_rate, &mut atk, &mut dec, &mut sus, &mut rel);

        if self.accent > 0.5 && self.synth_type == SynthType::Acid {
            dec *= 0.7;
            rel *= 0.7;
            self.amp *= 1.15;
        }

        self.envelope = AdsrEnvelope::trigger(atk, dec, sus, rel, sample_rate, gate_samples);

        let base_seed = self.rng.0;
        self.mods = synth
            .mods
            .iter()
            .enumerate()
            .map(|(i, def)| ModRuntime::new(*def, base_seed ^ (i as u32 + 1).wrapping_mul(2_654_435_761)))
            .collect();
        self.pan = 0.0;
    }

    /// Sums every `ModDef` on this voice's synth into one set of per-destination
    /// deltas for the current sample, advancing each mod's internal LFO/S&H state.
    fn mod_outputs(&mut self, sample_rate: f32) -> ModOutputs {
        let env_level = self.envelope.level;
        let mut out = ModOutputs::default();
        for m in &mut self.mods {
            let v = m.next(sample_rate, env_level);
            match m.def.dest {
                ModDest::Amp => out.amp += v,
                ModDest::Cutoff => out.cutoff += v,
                ModDest::Res => out.res += v,
                ModDest::Pan => out.pan += v,
                ModDest::Pitch => out.pitch_semitones += v,
            }
        }
        out
    }

    fn setup_delay_line(&mut self, synth: &SynthDef, freq: f32, sample_rate: f32) {
        let amp_gain = match self.synth_type {
            SynthType::PmKick => 1.9,
            SynthType::PmTom => 1.7,
            SynthType::PmHat => 1.8,
            SynthType::PmSnare | SynthType::PmClap => 1.6,
            _ => 1.5,
        };
        self.amp *= amp_gain;

        let pinned_freq = match self.synth_type {
            SynthType::PmKick => Some(60.0),
            SynthType::PmSnare => Some(180.0),
            SynthType::PmHat => Some(9000.0),
            SynthType::PmClap => Some(240.0),
            SynthType::PmTom => Some(120.0),
            _ => None,
        };
        if let Some(f) = pinned_freq {
            self.freq = f;
            self.target_freq = f;
            self.glide_samples = 0;
            self.glide_step = 0.0;
        }

        let len_freq = match self.synth_type {
            SynthType::PmKick => 55.0,
            SynthType::PmSnare => 180.0,
            SynthType::PmHat => 7000.0,
            SynthType::PmClap => 260.0,
            SynthType::PmTom => 120.0,
            _ => freq.max(40.0),
        };
        let len = ((sample_rate / len_freq) as i64).clamp(8, COMB_MAX_SAMPLES as i64) as usize;
        self.comb_len = len;
        self.comb_idx = 0;

        let (mut feedback, mut damp) = match self.synth_type {
            SynthType::PmString => (0.88, 0.18),
            SynthType::PmBell => (0.94, 0.12),
            SynthType::PmPipe => (0.96, 0.06),
            SynthType::PmKick => (0.95, 0.06),
            SynthType::PmSnare => (0.88, 0.28),
            SynthType::PmHat => (0.75, 0.6),
            SynthType::PmClap => (0.86, 0.3),
            SynthType::PmTom => (0.92, 0.12),
            _ => (synth.comb_feedback, synth.comb_damp),
        };
        // Wood: every delay-line voice gets a touch less feedback, a touch more damp.
        feedback = (feedback * 0.93).max(0.5);
        damp = (damp + 0.08).min(0.85);
        if matches!(self.synth_type, SynthType::PmBell | SynthType::PmPipe) {
            feedback = (feedback * 0.9).max(0.5);
            damp = (damp + 0.1).min(0.9);
        }
        self.comb_feedback = feedback;
        self.comb_damp = damp;
        self.comb_state = 0.0;
        self.comb_buf.clear();
        self.comb_buf.resize(len, 0.0);
    }

    fn apply_drum_envelope_overrides(&mut self, sample_rate: f32, atk: &mut f32, dec: &mut f32, sus: &mut f32, rel: &mut f32) {
        match self.synth_type {
            SynthType::Kick | SynthType::Kick808 | SynthType::Kick909 => {
                *atk = 0.001;
                *dec = if self.synth_type == SynthType::Kick909 { 0.18 } else { 0.26 };
                *sus = 0.0;
                *rel = 0.05;
                self.pitch_decay = 1.0 / (if self.synth_type == SynthType::Kick909 { 0.03 } else { 0.045 } * sample_rate);
            }
            SynthType::Tom => {
                *atk = 0.001;
                *dec = 0.18;
                *sus = 0.0;
                *rel = 0.05;
                self.pitch_decay = 1.0 / (0.06 * sample_rate);
            }
            SynthType::Snare | SynthType::Snare808 | SynthType::Snare909 => {
                *atk = 0.001;
                *dec = if self.synth_type == SynthType::Snare909 { 0.045 } else { 0.06 };
                *sus = 0.0;
                *rel = 0.03;
            }
            SynthType::Clap | SynthType::Clap909 => {
                *atk = 0.001;
                *dec = if self.synth_type == SynthType::Clap909 { 0.06 } else { 0.07 };
                *sus = 0.0;
                *rel = 0.04;
            }
            SynthType::HatClosed | SynthType::Hat808 => {
                *atk = 0.001;
                *dec = 0.018;
                *sus = 0.0;
                *rel = 0.012;
            }
            SynthType::HatOpen | SynthType::Hat909 => {
                *atk = 0.001;
                *dec = 0.07;
                *sus = 0.0;
                *rel = 0.045;
            }
            SynthType::Rim | SynthType::Glitch | SynthType::Bitperc => {
                *atk = 0.001;
                *dec = 0.03;
                *sus = 0.0;
                *rel = 0.02;
            }
            SynthType::Metal => {
                *atk = 0.002;
                *dec = 0.12;
                *sus = 0.0;
                *rel = 0.06;
            }
            SynthType::PmKick => {
                *atk = 0.001;
                *dec = 0.2;
                *sus = 0.0;
                *rel = 0.08;
                self.pitch_decay = 1.0 / (0.05 * sample_rate);
            }
            SynthType::PmSnare => {
                *atk = 0.001;
                *dec = 0.07;
                *sus = 0.0;
                *rel = 0.04;
            }
            SynthType::PmHat => {
                *atk = 0.001;
                *dec = 0.03;
                *sus = 0.0;
                *rel = 0.02;
            }
            SynthType::PmClap => {
                *atk = 0.001;
                *dec = 0.06;
                *sus = 0.0;
                *rel = 0.04;
            }
            SynthType::PmTom => {
                *atk = 0.001;
                *dec = 0.14;
                *sus = 0.0;
                *rel = 0.06;
            }
            SynthType::Comb | SynthType::PmString | SynthType::PmBell | SynthType::PmPipe => {
                *atk = 0.001;
                *dec = 0.4;
                *sus = 0.0;
                *rel = 0.2;
            }
            _ => {}
        }
    }

    fn osc_sample(&mut self) -> f32 {
        match self.synth_type {
            SynthType::Sine => self.phase.sin(),
            SynthType::Saw => saw(self.phase),
            SynthType::Supersaw => {
                let mut sum = 0.0;
                for cents in SUPERSAW_DETUNE_CENTS {
                    let ratio = 2.0f32.powf(cents / 1200.0);
                    sum += saw(self.phase * ratio);
                }
                sum / SUPERSAW_DETUNE_CENTS.len() as f32
            }
            SynthType::Square => {
                if self.phase < std::f32::consts::PI {
                    1.0
                } else {
                    -1.0
                }
            }
            SynthType::Tri => {
                let s = saw(self.phase);
                2.0 * s.abs() - 1.0
            }
            SynthType::Noise => self.rng.next_bipolar(),
            SynthType::Pulse => {
                let duty = 0.3;
                if self.phase < std::f32::consts::PI * 2.0 * duty {
                    1.0
                } else {
                    -1.0
                }
            }
            SynthType::Fm => {
                let modl = (self.phase * 2.0).sin();
                (self.phase + modl * 2.5).sin()
            }
            SynthType::Fm2 => {
                let mod1 = (self.phase * 3.0).sin();
                let mod2 = (self.phase * 7.0 + mod1 * 2.0).sin();
                (self.phase + mod2 * 3.0).sin()
            }
            SynthType::Ring => self.phase.sin() * saw(self.phase),
            SynthType::Acid => saw(self.phase),
            SynthType::Kick | SynthType::Kick808 | SynthType::Kick909 => {
                let drop = 1.0 + self.pitch_env * 4.2;
                (self.phase * drop).sin()
            }
            SynthType::Tom => {
                let drop = 1.0 + self.pitch_env * 1.5;
                (self.phase * drop).sin()
            }
            SynthType::Snare | SynthType::Snare808 | SynthType::Snare909 | SynthType::Clap | SynthType::Clap909 | SynthType::Rim => {
                self.rng.next_bipolar()
            }
            SynthType::HatClosed | SynthType::HatOpen | SynthType::Hat808 | SynthType::Hat909 => {
                let n = self.rng.next_bipolar();
                let m1 = (self.phase * 2.2).sin();
                let m2 = (self.phase * 3.4).sin();
                let m3 = (self.phase * 5.1).sin();
                let m4 = (self.phase * 8.0).sin();
                n * 0.5 + (m1 + m2 + m3 + m4) * 0.1
            }
            SynthType::Glitch => {
                let n = glitch_bipolar(&mut self.rng);
                let stepped = (n * 6.0).floor() / 6.0;
                stepped * ((self.phase * 4.0).sin() * 0.6 + 0.4)
            }
            SynthType::Metal => {
                let a = (self.phase * 2.0).sin();
                let b = (self.phase * 3.0 + a * 1.5).sin();
                let c = (self.phase * 5.0 + b * 1.2).sin();
                (a + b + c) * 0.33
            }
            SynthType::Bitperc => {
                let n = self.rng.next_bipolar();
                (n * 8.0).floor() / 8.0
            }
            SynthType::Comb
            | SynthType::PmString
            | SynthType::PmBell
            | SynthType::PmPipe
            | SynthType::PmKick
            | SynthType::PmSnare
            | SynthType::PmHat
            | SynthType::PmClap
            | SynthType::PmTom => self.comb_sample(),
        }
    }

    fn comb_sample(&mut self) -> f32 {
        let mut input = 0.0;
        if self.age < 96 {
            let excite = 1.0 - self.age as f32 / 96.0;
            input = match self.synth_type {
                SynthType::PmBell => (self.phase * 6.0).sin() * self.amp * excite,
                SynthType::PmKick => (self.phase * 1.1).sin() * self.amp * (0.8 + excite),
                SynthType::PmSnare => self.rng.next_bipolar() * self.amp * (0.7 + excite),
                SynthType::PmHat => {
                    let n = self.rng.next_bipolar();
                    let m1 = (self.phase * 2.8).sin();
                    let m2 = (self.phase * 5.3).sin();
                    let m3 = (self.phase * 9.1).sin();
                    (n * 0.65 + (m1 + m2 + m3) * 0.14) * self.amp * (0.7 + excite)
                }
                SynthType::PmClap => {
                    let n = self.rng.next_bipolar();
                    let m1 = (self.phase * 3.6).sin();
                    let m2 = (self.phase * 6.7).sin();
                    (n * 0.55 + (m1 + m2) * 0.16) * self.amp * (0.7 + excite)
                }
                SynthType::PmTom => (self.phase * 1.6).sin() * self.amp * (0.7 + excite),
                SynthType::PmPipe => (self.phase * 2.0).sin() * self.amp * excite,
                _ => self.rng.next_bipolar() * self.amp * excite,
            };
        }
        let y = self.comb_buf[self.comb_idx];
        self.comb_state = (1.0 - self.comb_damp) * y + self.comb_damp * self.comb_state;
        self.comb_buf[self.comb_idx] = input + self.comb_state * self.comb_feedback;
        self.comb_idx = (self.comb_idx + 1) % self.comb_len;
        self.comb_state
    }

    /// Advances this voice by one sample and returns its output.
    pub fn render(&mut self, sample_rate: f32) -> f32 {
        if !self.active {
            return 0.0;
        }

        let env = self.envelope.next_sample();
        if self.envelope.stage == EnvelopeStage::Off {
            self.active = false;
            return 0.0;
        }

        if self.glide_samples > 0 {
            self.freq += self.glide_step;
            self.glide_samples -= 1;
        }
        if self.pitch_env > 0.0 {
            self.pitch_env = (self.pitch_env - self.pitch_decay).max(0.0);
        }

        let mo = if self.mods.is_empty() { ModOutputs::default() } else { self.mod_outputs(sample_rate) };
        self.pan = mo.pan;

        let sample = self.osc_sample();

        let modulated_freq = self.freq * 2.0f32.powf(mo.pitch_semitones / 12.0);
        let phase_inc = 2.0 * std::f32::consts::PI * modulated_freq / sample_rate;
        self.phase += phase_inc;
        if self.phase >= 2.0 * std::f32::consts::PI {
            self.phase -= 2.0 * std::f32::consts::PI;
        }

        let processed = self.filter_chain(sample, sample_rate, mo.cutoff, mo.res);
        self.age += 1;
        processed * env * self.amp * (1.0 + mo.amp).max(0.0)
    }

    fn filter_chain(&mut self, sample: f32, sample_rate: f32, cutoff_mod: f32, res_mod: f32) -> f32 {
        let mut processed = sample;
        let base_cutoff = self.cutoff;
        let base_res = self.res;
        self.cutoff = (self.cutoff + cutoff_mod).max(20.0);
        self.res = (self.res + res_mod).clamp(0.0, 0.97);

        if matches!(
            self.synth_type,
            SynthType::HatClosed
                | SynthType::HatOpen
                | SynthType::Hat808
                | SynthType::Hat909
                | SynthType::PmHat
                | SynthType::PmSnare
                | SynthType::PmClap
                | SynthType::Rim
                | SynthType::Snare
                | SynthType::Snare808
                | SynthType::Snare909
                | SynthType::Clap
                | SynthType::Clap909
                | SynthType::Bitperc
        ) {
            processed = self.hp_state.process(processed, 1200.0, sample_rate);
        }

        processed = if self.synth_type == SynthType::Acid {
            let env_depth = 2600.0 + self.accent * 800.0;
            let cutoff = self.cutoff + self.envelope.level * env_depth + self.accent * 200.0;
            let res = (self.res + self.accent * 0.1).min(0.97);
            let once = self.svf.process(processed, cutoff, res, sample_rate);
            let twice = self.svf.process(once, cutoff, res, sample_rate);
            (twice * (2.0 + self.accent * 0.55)).tanh()
        } else if matches!(
            self.synth_type,
            SynthType::Snare | SynthType::Snare808 | SynthType::Snare909 | SynthType::PmSnare
        ) {
            let band = self.filter_state.process(processed, 2400.0, sample_rate);
            let tone = (self.phase * 0.5).sin();
            band * 0.55 + tone * 0.45
        } else if matches!(self.synth_type, SynthType::Clap | SynthType::Clap909 | SynthType::PmClap) {
            let band = self.filter_state.process(processed, 2800.0, sample_rate);
            let t = self.age as f32 / sample_rate;
            let gate = if t < 0.006 || (t > 0.012 && t < 0.02) || (t > 0.026 && t < 0.034) {
                1.0
            } else {
                0.2
            };
            band * gate
        } else if matches!(
            self.synth_type,
            SynthType::HatClosed | SynthType::HatOpen | SynthType::Hat808 | SynthType::Hat909 | SynthType::PmHat
        ) {
            self.filter_state.process(processed, 9000.0, sample_rate)
        } else {
            self.filter_state.process(processed, self.cutoff, sample_rate)
        };

        if self.synth_type.is_delay_line() {
            processed = (processed * 1.6).tanh();
            processed = match self.synth_type {
                SynthType::PmKick | SynthType::PmTom => self.filter_state.process(processed, 1800.0, sample_rate),
                SynthType::PmSnare | SynthType::PmClap => {
                    let hp = self.hp_state.process(processed, 800.0, sample_rate);
                    self.filter_state.process(hp, 3800.0, sample_rate)
                }
                SynthType::PmHat => {
                    let hp = self.hp_state.process(processed, 5000.0, sample_rate);
                    self.filter_state.process(hp, 12000.0, sample_rate)
                }
                _ => {
                    let hp = self.hp_state.process(processed, 400.0, sample_rate);
                    self.filter_state.process(hp, 3800.0, sample_rate)
                }
            };

            let t_ms = self.age as f32 / sample_rate * 1000.0;
            let transient = 1.0 + 0.45 * (-t_ms / 12.0).exp();
            processed *= transient;

            let hold = if self.synth_type.is_pm_drum() { 2 } else { 3 };
            if self.crush_count <= 0 {
                self.crush_hold = processed;
                self.crush_count = hold;
            }
            processed = self.crush_hold;
            self.crush_count -= 1;

            if self.synth_type.is_pm_drum() {
                processed = (processed * 128.0).floor() / 128.0;
            }
        }

        self.cutoff = base_cutoff;
        self.res = base_res;
        processed
    }
}

fn glitch_bipolar(rng: &mut VoiceRng) -> f32 {
    // The glitch oscillator uses the glibc-rand LCG constants, not the
    // shared VoiceRng ones, so it doesn't correlate with any noise voice
    // playing alongside it. Kept here rather than in `rng.rs`'s GlitchRng
    // type because a glitch voice's RNG state lives in the same `u32` slot
    // as every other voice's noise state.
    rng.0 = rng.0.wrapping_mul(1_103_515_245).wrapping_add(12_345);
    ((rng.0 >> 8) as f32 / 8_388_608.0) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth(t: SynthType) -> SynthDef {
        SynthDef::new("t".into(), t)
    }

    #[test]
    fn sine_voice_renders_bounded_and_then_silences() {
        let mut v = Voice::silent();
        v.note_on(&synth(SynthType::Sine), 440.0, 48_000.0, 2000, 1.0, 0, false);
        let mut saw_nonzero = false;
        for _ in 0..20_000 {
            let s = v.render(48_000.0);
            assert!(s.is_finite());
            if s != 0.0 {
                saw_nonzero = true;
            }
        }
        assert!(saw_nonzero);
        assert!(!v.active);
    }

    #[test]
    fn kick_voice_pitch_sweeps_down_from_note_on() {
        let mut v = Voice::silent();
        v.note_on(&synth(SynthType::Kick), 55.0, 48_000.0, 10_000, 1.0, 0, false);
        let early = v.pitch_env;
        for _ in 0..1000 {
            v.render(48_000.0);
        }
        assert!(v.pitch_env < early);
    }

    #[test]
    fn pm_string_note_fills_comb_buffer_with_finite_values() {
        let mut v = Voice::silent();
        v.note_on(&synth(SynthType::PmString), 220.0, 48_000.0, 20_000, 1.0, 0, false);
        for _ in 0..5000 {
            let s = v.render(48_000.0);
            assert!(s.is_finite());
        }
    }

    #[test]
    fn glide_ramps_frequency_linearly() {
        let mut v = Voice::silent();
        v.note_on(&synth(SynthType::Sine), 220.0, 48_000.0, 48_000, 1.0, 480, false);
        v.note_on(&synth(SynthType::Sine), 440.0, 48_000.0, 48_000, 1.0, 480, false);
        assert_eq!(v.glide_samples, 480);
        assert!((v.glide_step - (440.0 - 220.0) / 480.0).abs() < 1e-3);
    }

    #[test]
    fn lfo_cutoff_mod_stays_finite_and_moves_cutoff() {
        let mut s = synth(SynthType::Saw);
        s.mods.push(ModDef {
            source: ModSource::Lfo,
            dest: ModDest::Cutoff,
            rate: 5.0,
            depth: 3000.0,
            offset: 0.0,
            lag_ms: 0.0,
            slew_ms: 0.0,
        });
        let mut v = Voice::silent();
        v.note_on(&s, 220.0, 48_000.0, 48_000, 1.0, 0, false);
        for _ in 0..2000 {
            let out = v.render(48_000.0);
            assert!(out.is_finite());
        }
        // the mod must not have permanently drifted the synth's base cutoff
        assert!((v.cutoff - s.cutoff).abs() < 1e-3);
    }

    #[test]
    fn pitch_mod_bends_frequency_without_touching_base_freq() {
        let mut s = synth(SynthType::Sine);
        s.mods.push(ModDef {
            source: ModSource::Sync,
            dest: ModDest::Pitch,
            rate: 2.0,
            depth: 12.0,
            offset: 0.0,
            lag_ms: 0.0,
            slew_ms: 0.0,
        });
        let mut v = Voice::silent();
        v.note_on(&s, 440.0, 48_000.0, 48_000, 1.0, 0, false);
        for _ in 0..100 {
            v.render(48_000.0);
        }
        assert!((v.freq - 440.0).abs() < 1e-3);
    }

    #[test]
    fn sample_hold_mod_holds_between_updates() {
        let mut s = synth(SynthType::Sine);
        s.mods.push(ModDef {
            source: ModSource::SampleHold,
            dest: ModDest::Amp,
            rate: 2.0,
            depth: 0.3,
            offset: 0.0,
            lag_ms: 0.0,
            slew_ms: 0.0,
        });
        let mut v = Voice::silent();
        v.note_on(&s, 220.0, 48_000.0, 48_000, 1.0, 0, false);
        for _ in 0..500 {
            let out = v.render(48_000.0);
            assert!(out.is_finite());
        }
    }

    #[test]
    fn acid_accent_shortens_decay_and_boosts_amp() {
        let mut v = Voice::silent();
        let s = synth(SynthType::Acid);
        v.note_on(&s, 110.0, 48_000.0, 48_000, 1.0, 0, true);
        let accented_amp = v.amp;
        let mut v2 = Voice::silent();
        v2.note_on(&s, 110.0, 48_000.0, 48_000, 1.0, 0, false);
        assert!(accented_amp > v2.amp);
    }
}
