//! Per-track scheduling: pattern/sequence position, the musical transforms
//! (`rate`/`hurry`/`fast`/`slow`, `every`, `density`, `rev`, `palindrome`,
//! `iter`, `chunk`, `stut`, ornaments, accents), and advancing through a
//! `playseq` sequence.

use scorecraft_dsl::{OrnamentMode, PatternDef, Program, TrackDef};

use crate::pool::VoicePool;
use crate::rng::{track_seed, TrackRng};

/// How long (in bar-rounded steps) a pattern is once `timesig_enforce` pads
/// it out to a whole number of bars for the section currently playing.
pub fn effective_pattern_length(program: &Program, pattern: &PatternDef, tempo_section: usize) -> usize {
    let len = pattern.len();
    if len == 0 {
        return 0;
    }
    if !program.time_sig_enforce {
        return len;
    }
    let section = if (1..=14).contains(&tempo_section) { tempo_section } else { 1 };
    let num = program.time_sig_num_map[section];
    let den = program.time_sig_den_map[section];
    if num == 0 || den == 0 || 16 % den != 0 {
        return len;
    }
    let steps_per_beat = 16 / den;
    let bar_steps = (num * steps_per_beat) as usize;
    if bar_steps == 0 {
        return len;
    }
    let rem = len % bar_steps;
    if rem == 0 {
        len
    } else {
        len + (bar_steps - rem)
    }
}

#[derive(Debug, Clone)]
pub struct TrackRuntime {
    pub pattern_idx: Option<usize>,
    pub synth_idx: usize,
    pub sequence_idx: Option<usize>,

    pub step_index: u32,
    pub samples_until_step: i64,
    pub samples_per_step: i64,

    pub every: u32,
    pub rev: bool,
    pub palindrome: bool,
    pub iter: u32,
    pub chunk: u32,
    pub stut: u32,
    pub density: f32,
    rng: TrackRng,

    stut_remaining: u32,
    stut_samples_until: i64,
    stut_samples_per: i64,
    stut_freq: f32,

    pub seq_index: usize,
    seq_repeat_done: u32,
    pub seq_pos: i32,
    pub seq_start: i32,
    pub seq_end: i32,

    pub slide_ms: f32,
    pub ornament_prob: f32,
    pub ornament_mode: OrnamentMode,
    ornament_alt: bool,
    pub accent_prob: f32,

    pub base_rate: f32,
    pub is_tempo_leader: bool,
}

/// Outcome of [`TrackRuntime::schedule_step`], for the engine to react to
/// (a sequence that just advanced bumps the shared pattern epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOutcome {
    pub sequence_advanced: bool,
}

impl TrackRuntime {
    pub fn build(def: &TrackDef, index: usize, pattern_idx: Option<usize>, synth_idx: usize, sequence_idx: Option<usize>, base_samples_per_step: i64) -> Self {
        let mut mult = def.rate * def.hurry;
        if def.fast > 1 {
            mult *= def.fast as f32;
        }
        if def.slow > 1 {
            mult /= def.slow as f32;
        }
        if mult <= 0.001 {
            mult = 0.001;
        }
        let samples_per_step = ((base_samples_per_step as f32 / mult) as i64).max(1);

        Self {
            pattern_idx,
            synth_idx,
            sequence_idx,
            step_index: 0,
            samples_until_step: 0,
            samples_per_step,
            every: def.every,
            rev: def.rev,
            palindrome: def.palindrome,
            iter: def.iter,
            chunk: def.chunk,
            stut: def.stut,
            density: def.density,
            rng: TrackRng::new(track_seed(index)),
            stut_remaining: 0,
            stut_samples_until: 0,
            stut_samples_per: 0,
            stut_freq: 0.0,
            seq_index: 0,
            seq_repeat_done: 0,
            seq_pos: 0,
            seq_start: def.seq_start,
            seq_end: def.seq_end,
            slide_ms: def.slide_ms,
            ornament_prob: def.ornament_prob,
            ornament_mode: def.ornament_mode,
            ornament_alt: false,
            accent_prob: def.accent_prob,
            base_rate: mult,
            is_tempo_leader: false,
        }
    }

    /// Recomputes `samples_per_step` for the current tempo-map section.
    pub fn update_tempo(&mut self, program: &Program, tempo_section: usize, base_samples_per_step: i64) {
        if !(1..=14).contains(&tempo_section) {
            return;
        }
        let map = if program.tempo_map[tempo_section] > 0.0 {
            program.tempo_map[tempo_section]
        } else {
            1.0
        };
        let mult = self.base_rate * map;
        self.samples_per_step = ((base_samples_per_step as f32 / mult) as i64).max(1);
    }

    fn pattern<'p>(&self, program: &'p Program) -> Option<&'p PatternDef> {
        self.pattern_idx.map(|i| &program.patterns[i])
    }

    /// The pattern this track is currently pointed at: its own pattern, or
    /// (for `playseq` tracks) whatever the active sequence step names.
    ///
    /// This resolves the pattern unconditionally, regardless of the `only`
    /// window — the window only decides whether a note gets triggered
    /// (`active_for_sequence`), never whether the cursor can advance. A
    /// track sitting outside its window still needs `L_eff` to roll its
    /// step clock and sequence cursor forward in step.
    fn current_pattern<'p>(&self, program: &'p Program) -> Option<&'p PatternDef> {
        let seq_idx = self.sequence_idx?;
        let seq = &program.sequences[seq_idx];
        if seq.steps.is_empty() {
            return self.pattern(program);
        }
        let step = &seq.steps[self.seq_index];
        program.find_pattern(&step.pattern).map(|i| &program.patterns[i])
    }

    fn cycle_steps(&self, program: &Program, pattern: &PatternDef, tempo_section: usize) -> usize {
        let mut len = effective_pattern_length(program, pattern, tempo_section);
        if self.palindrome && len > 1 {
            len = len * 2 - 2;
        }
        if self.iter > 1 {
            len *= self.iter as usize;
        }
        len
    }

    fn active_for_sequence(&self) -> bool {
        if self.sequence_idx.is_none() {
            return true;
        }
        if self.seq_start <= 0 || self.seq_end < 0 {
            return true;
        }
        let start = self.seq_start - 1;
        let end = self.seq_end - 1;
        self.seq_pos >= start && self.seq_pos <= end
    }

    fn advance_sequence(&mut self, program: &Program) -> bool {
        let Some(seq_idx) = self.sequence_idx else { return false };
        let seq = &program.sequences[seq_idx];
        if seq.steps.is_empty() {
            return false;
        }
        let repeat = seq.steps[self.seq_index].repeat.max(1);
        self.seq_repeat_done += 1;
        if self.seq_repeat_done < repeat {
            return false;
        }
        self.seq_repeat_done = 0;
        self.seq_index = (self.seq_index + 1) % seq.steps.len();
        self.seq_pos = (self.seq_pos + 1) % seq.steps.len() as i32;
        true
    }

    /// Advances this track by one step boundary: decides whether to trigger
    /// a note (and any ornament grace note / stutter retrigger), fires it
    /// into `pool`, and steps the pattern/sequence position forward.
    pub fn schedule_step(
        &mut self,
        program: &Program,
        pool: &mut VoicePool,
        sample_rate: f32,
        tempo_section: usize,
    ) -> StepOutcome {
        if !self.active_for_sequence() {
            if self.sequence_idx.is_some() {
                if let Some(pattern) = self.current_pattern(program) {
                    let cycle_steps = self.cycle_steps(program, pattern, tempo_section);
                    if cycle_steps > 0 {
                        self.step_index += 1;
                        if self.step_index as usize >= cycle_steps {
                            self.step_index = 0;
                            let advanced = self.advance_sequence(program);
                            return StepOutcome { sequence_advanced: advanced };
                        }
                    }
                }
            }
            return StepOutcome::default();
        }

        let Some(pattern) = self.current_pattern(program) else {
            return StepOutcome::default();
        };
        if pattern.is_empty() {
            return StepOutcome::default();
        }

        let effective_len = effective_pattern_length(program, pattern, tempo_section);
        if effective_len == 0 {
            return StepOutcome::default();
        }

        let step = self.step_index as usize;
        let base_step = if self.iter > 1 { step / self.iter as usize } else { step };

        let mut idx = if self.palindrome && effective_len > 1 {
            let pal_len = effective_len * 2 - 2;
            let p = base_step % pal_len;
            if p >= effective_len {
                pal_len - p
            } else {
                p
            }
        } else {
            base_step % effective_len
        };

        if self.rev {
            idx = (effective_len - 1) - idx;
        }

        if self.chunk > 0 {
            let chunk_count = self.chunk.max(1) as usize;
            let chunk_size = effective_len.div_ceil(chunk_count);
            let cycle = (base_step / effective_len) % chunk_count;
            let chunk_start = cycle * chunk_size;
            let chunk_end = chunk_start + chunk_size - 1;
            if idx < chunk_start || idx > chunk_end {
                self.step_index += 1;
                return StepOutcome::default();
            }
        }

        let mut do_play = !(self.every > 1 && step % self.every as usize != 0);

        if do_play && self.density < 1.0 && self.rng.next_unit() > self.density {
            do_play = false;
        }

        if do_play && idx < pattern.len() {
            self.trigger_step(program, pattern, idx, pool, sample_rate);
        }

        self.step_index += 1;

        let mut outcome = StepOutcome::default();
        let cycle_steps = self.cycle_steps(program, pattern, tempo_section);
        if cycle_steps > 0 && self.step_index as usize >= cycle_steps {
            self.step_index = 0;
            if self.sequence_idx.is_some() {
                outcome.sequence_advanced = self.advance_sequence(program);
            }
        }
        outcome
    }

    fn trigger_step(&mut self, program: &Program, pattern: &PatternDef, idx: usize, pool: &mut VoicePool, sample_rate: f32) {
        let step = &pattern.steps[idx];
        if step.note < 0 {
            return;
        }
        let midi = step.note as f32 + step.cents / 100.0;
        let freq = scorecraft_dsl::note::midi_to_freq(midi);

        let slide_ms = if step.slide_ms >= 0.0 { step.slide_ms } else { self.slide_ms };
        let glide_samples = if slide_ms > 0.0 {
            (sample_rate * (slide_ms / 1000.0)) as i32
        } else {
            0
        };

        let mut accent = step.accent;
        if !accent && self.accent_prob > 0.0 && self.rng.next_unit() <= self.accent_prob {
            accent = true;
        }

        let synth = &program.synths[self.synth_idx];
        let gate = (self.samples_per_step as f32 * 0.9) as i64;
        pool.note_on(synth, freq, sample_rate, gate, 1.0, glide_samples, accent);

        if self.ornament_prob > 0.0 && step.degree_valid && self.rng.next_unit() <= self.ornament_prob {
            self.trigger_ornament(program, step, pool, sample_rate);
        }

        if self.stut > 1 {
            self.stut_remaining = self.stut - 1;
            self.stut_samples_per = (self.samples_per_step / self.stut as i64).max(1);
            self.stut_samples_until = self.stut_samples_per;
            self.stut_freq = freq;
        } else {
            self.stut_remaining = 0;
        }
    }

    fn trigger_ornament(&mut self, program: &Program, step: &scorecraft_dsl::PatternStep, pool: &mut VoicePool, sample_rate: f32) {
        let deg = step.degree;
        let mut oct = step.degree_octave;
        let micro = step.degree_micro;

        let grace_dir = match self.ornament_mode {
            OrnamentMode::Down => -1,
            OrnamentMode::Up => 1,
            OrnamentMode::Alternating => {
                let dir = if self.ornament_alt { 1 } else { -1 };
                self.ornament_alt = !self.ornament_alt;
                dir
            }
        };

        let mut grace_deg = deg + grace_dir;
        if grace_deg < 1 {
            grace_deg = 7;
            oct -= 1;
        } else if grace_deg > 7 {
            grace_deg = 1;
            oct += 1;
        }

        let grace_cents = program.maqam_offsets[(grace_deg - 1) as usize] + micro as f32 * 50.0;
        let grace_midi = program.root_midi + oct as f32 * 12.0 + grace_cents / 100.0;
        let grace_freq = scorecraft_dsl::note::midi_to_freq(grace_midi);

        let synth = &program.synths[self.synth_idx];
        let gate = (self.samples_per_step as f32 * 0.2) as i64;
        pool.note_on(synth, grace_freq, sample_rate, gate, 0.5, 0, false);
    }

    /// Call once per output frame: ticks the step clock and any in-flight
    /// stutter retrigger.
    pub fn tick_frame(&mut self, program: &Program, pool: &mut VoicePool, sample_rate: f32, tempo_section: usize) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        if self.samples_until_step <= 0 {
            outcome = self.schedule_step(program, pool, sample_rate, tempo_section);
            self.samples_until_step = self.samples_per_step;
        }
        self.samples_until_step -= 1;

        if self.stut_remaining > 0 {
            self.stut_samples_until -= 1;
            if self.stut_samples_until <= 0 {
                let synth = &program.synths[self.synth_idx];
                let gate = (self.stut_samples_per as f32 * 0.8) as i64;
                pool.note_on(synth, self.stut_freq, sample_rate, gate, 1.0, 0, false);
                self.stut_remaining -= 1;
                self.stut_samples_until = self.stut_samples_per;
            }
        }

        outcome
    }
}
