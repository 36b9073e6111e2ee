//! Exact-bit pseudorandom generators.
//!
//! Nothing here is cryptographic or even statistically rigorous — these are
//! the specific bit-for-bit generators the reference engine's voices and
//! track schedulers use, kept intentionally small so two runs of the same
//! script always render identical audio.

/// Linear congruential generator used by noise-bearing oscillators
/// (`noise`, the snare/clap/hat family, and delay-line excitation).
/// `state` is reseeded once per voice at note-on by XOR-ing in the note
/// frequency, so voices playing different pitches diverge immediately.
#[derive(Debug, Clone, Copy)]
pub struct VoiceRng(pub u32);

impl VoiceRng {
    pub fn new(seed: u32) -> Self {
        Self(seed)
    }

    /// One step of `state = state * 1664525 + 1013904223`, mapped to `[-1, 1)`.
    pub fn next_bipolar(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1664525).wrapping_add(1013904223);
        ((self.0 >> 8) as f32 / 8_388_608.0) - 1.0
    }
}

/// A second, distinct LCG (`* 1103515245 + 12345`, the classic glibc `rand`
/// constants) used only by the `glitch` oscillator, kept separate so it
/// doesn't correlate with [`VoiceRng`] even when seeded identically.
#[derive(Debug, Clone, Copy)]
pub struct GlitchRng(pub u32);

impl GlitchRng {
    pub fn new(seed: u32) -> Self {
        Self(seed)
    }

    pub fn next_bipolar(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1103515245).wrapping_add(12345);
        ((self.0 >> 8) as f32 / 8_388_608.0) - 1.0
    }
}

/// xorshift32, used by track runtimes for density/accent/ornament coin
/// flips. Each track gets its own stream, seeded deterministically from its
/// position in the program (see [`track_seed`]).
#[derive(Debug, Clone, Copy)]
pub struct TrackRng(pub u32);

impl TrackRng {
    pub fn new(seed: u32) -> Self {
        Self(if seed == 0 { 1 } else { seed })
    }

    /// One step of the shift-13/17-right/5 xorshift, mapped to `[0, 1)`.
    pub fn next_unit(&mut self) -> f32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        (self.0 & 0xFF_FFFF) as f32 / 16_777_215.0
    }
}

/// Deterministic per-track seed: `0x9E3779B9 + index * 2654435761`, the
/// same Weyl/Knuth-multiplicative spread the reference engine uses to keep
/// adjacent tracks' RNG streams decorrelated.
pub fn track_seed(index: usize) -> u32 {
    0x9E37_79B9u32.wrapping_add((index as u32).wrapping_mul(2_654_435_761))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_rng_is_deterministic() {
        let mut a = VoiceRng::new(7);
        let mut b = VoiceRng::new(7);
        for _ in 0..50 {
            assert_eq!(a.next_bipolar(), b.next_bipolar());
        }
    }

    #[test]
    fn track_rng_values_stay_in_unit_range() {
        let mut r = TrackRng::new(track_seed(3));
        for _ in 0..1000 {
            let v = r.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn track_seeds_differ_by_index() {
        assert_ne!(track_seed(0), track_seed(1));
        assert_ne!(track_seed(1), track_seed(2));
    }

    #[test]
    fn glitch_rng_differs_from_voice_rng_with_same_seed() {
        let mut g = GlitchRng::new(42);
        let mut v = VoiceRng::new(42);
        let gs: Vec<f32> = (0..10).map(|_| g.next_bipolar()).collect();
        let vs: Vec<f32> = (0..10).map(|_| v.next_bipolar()).collect();
        assert_ne!(gs, vs);
    }
}
