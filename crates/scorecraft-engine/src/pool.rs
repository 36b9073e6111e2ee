//! Fixed-size voice pool.
//!
//! 32 voices, first-free linear scan, silent drop when every voice is busy.
//! No stealing, no priority — a note that can't find a free voice simply
//! doesn't sound, exactly like the reference engine.

use scorecraft_dsl::SynthDef;

use crate::voice::Voice;

pub const MAX_VOICES: usize = 32;

#[derive(Debug, Clone)]
pub struct VoicePool {
    voices: Vec<Voice>,
}

impl VoicePool {
    pub fn new() -> Self {
        let voices = (0..MAX_VOICES)
            .map(|i| {
                let mut v = Voice::silent();
                v.seed(0x1234_5678u32.wrapping_add((i as u32).wrapping_mul(1117)));
                v
            })
            .collect();
        Self { voices }
    }

    /// Finds the first inactive voice and starts a note on it. Does nothing
    /// if every voice is already active.
    #[allow(clippy::too_many_arguments)]
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
        if let Some(voice) = self.voices.iter_mut().find(|v| !v.active) {
            voice.note_on(synth, freq, sample_rate, gate_samples, amp_scale, glide_samples, accent);
        }
    }

    /// Renders one sample from every active voice and sums them.
    pub fn render(&mut self, sample_rate: f32) -> f32 {
        self.voices.iter_mut().map(|v| v.render(sample_rate)).sum()
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorecraft_dsl::SynthType;

    #[test]
    fn exhausting_the_pool_silently_drops_further_notes() {
        let mut pool = VoicePool::new();
        let synth = SynthDef::new("s".into(), SynthType::Sine);
        for _ in 0..MAX_VOICES + 4 {
            pool.note_on(&synth, 440.0, 48_000.0, 48_000, 1.0, 0, false);
        }
        assert_eq!(pool.voices.iter().filter(|v| v.active).count(), MAX_VOICES);
    }

    #[test]
    fn render_sums_all_active_voices() {
        let mut pool = VoicePool::new();
        let synth = SynthDef::new("s".into(), SynthType::Sine);
        pool.note_on(&synth, 440.0, 48_000.0, 48_000, 1.0, 0, false);
        pool.note_on(&synth, 880.0, 48_000.0, 48_000, 1.0, 0, false);
        let s = pool.render(48_000.0);
        assert!(s.is_finite());
    }
}
