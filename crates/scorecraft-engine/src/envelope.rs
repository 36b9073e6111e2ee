//! ADSR envelope generator.
//!
//! Increment-based, not time-based: attack/decay/release rates are
//! precomputed once at note-on as "how much to add/subtract per sample",
//! so `next_sample` is a single add-and-compare with no per-sample
//! division. Gate length (in samples) drives the Sustain→Release
//! transition; there's no explicit note-off call.

/// Where an envelope is in its Attack-Decay-Sustain-Release-Off cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Off,
}

/// An ADSR envelope whose attack/decay/release are expressed as per-sample
/// increments rather than seconds, computed from `atk`/`dec`/`rel` once per
/// note via [`AdsrEnvelope::trigger`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrEnvelope {
    pub stage: EnvelopeStage,
    pub level: f32,
    pub sustain: f32,
    atk_inc: f32,
    dec_inc: f32,
    rel_inc: f32,
    gate_samples: i64,
}

impl AdsrEnvelope {
    pub fn silent() -> Self {
        Self {
            stage: EnvelopeStage::Off,
            level: 0.0,
            sustain: 0.0,
            atk_inc: 1.0,
            dec_inc: 1.0,
            rel_inc: 1.0,
            gate_samples: 0,
        }
    }

    /// Starts a new note. `atk`/`dec`/`rel` are in seconds, `sustain` is a
    /// level in `[0, 1]`, and `gate_samples` is how long the gate stays high
    /// before the envelope is forced into Release.
    ///
    /// A stage whose time is effectively zero (`<= 0.0001s`) gets an
    /// increment of `1.0`, reaching its target in a single sample rather
    /// than dividing by (near-)zero.
    pub fn trigger(atk: f32, dec: f32, sustain: f32, rel: f32, sample_rate: f32, gate_samples: i64) -> Self {
        let atk_inc = if atk <= 0.0001 { 1.0 } else { 1.0 / (atk * sample_rate) };
        let dec_inc = if dec <= 0.0001 {
            1.0
        } else {
            (1.0 - sustain) / (dec * sample_rate)
        };
        let rel_inc = if rel <= 0.0001 { 1.0 } else { 1.0 / (rel * sample_rate) };
        Self {
            stage: EnvelopeStage::Attack,
            level: 0.0,
            sustain,
            atk_inc,
            dec_inc,
            rel_inc,
            gate_samples,
        }
    }

    /// Advances the envelope by one sample and returns the new level.
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Attack => {
                self.level += self.atk_inc;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                self.level -= self.dec_inc;
                if self.level <= self.sustain {
                    self.level = self.sustain;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {
                if self.gate_samples <= 0 {
                    self.stage = EnvelopeStage::Release;
                }
            }
            EnvelopeStage::Release => {
                self.level -= self.rel_inc;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Off;
                }
            }
            EnvelopeStage::Off => {}
        }
        self.gate_samples -= 1;
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Off
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_reaches_unity_then_decays_to_sustain() {
        let mut env = AdsrEnvelope::trigger(0.01, 0.1, 0.5, 0.2, 48_000.0, 100_000);
        let mut peaked = false;
        for _ in 0..48_000 {
            let l = env.next_sample();
            if l >= 0.999 {
                peaked = true;
            }
        }
        assert!(peaked);
        assert_eq!(env.stage, EnvelopeStage::Sustain);
        assert!((env.level - 0.5).abs() < 1e-4);
    }

    #[test]
    fn gate_closing_forces_release() {
        let mut env = AdsrEnvelope::trigger(0.001, 0.001, 0.0, 0.05, 48_000.0, 10);
        for _ in 0..5000 {
            env.next_sample();
        }
        assert_eq!(env.stage, EnvelopeStage::Off);
        assert!(!env.is_active());
    }

    #[test]
    fn near_zero_attack_reaches_unity_in_one_sample() {
        let mut env = AdsrEnvelope::trigger(0.0, 0.1, 0.5, 0.2, 48_000.0, 1000);
        env.next_sample();
        assert_eq!(env.stage, EnvelopeStage::Decay);
    }
}
