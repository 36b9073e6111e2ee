//! Per-voice filters.
//!
//! All three are cheap single-state filters, chosen for how directly they
//! map to a `Voice`'s per-sample `process` call rather than for textbook
//! flatness. Coefficients are recomputed every call instead of cached,
//! since `cutoff` and `resonance` can be envelope- or LFO-modulated from
//! one sample to the next (see the acid voice).

/// A trapezoidal-integrator state-variable filter, run in lowpass mode.
/// Holds two state samples (`lp`/`bp`) that belong to a single voice;
/// two instances stacked back to back give a steeper rolloff at some cost
/// in stability headroom, which is how the acid voice gets its 303 edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateVariableFilter {
    pub lp: f32,
    pub bp: f32,
}

impl StateVariableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `cutoff_hz` is clamped to 45% of the sample rate to keep `f` inside
    /// the filter's stable range; `resonance` in `[0, 1)` trades q for
    /// self-oscillation headroom.
    pub fn process(&mut self, input: f32, cutoff_hz: f32, resonance: f32, sample_rate: f32) -> f32 {
        let f = 2.0 * (std::f32::consts::PI * cutoff_hz.min(sample_rate * 0.45) / sample_rate).sin();
        let q = (1.0 - resonance).max(0.1);
        self.lp += f * self.bp;
        let hp = input - self.lp - q * self.bp;
        self.bp += f * hp;
        self.lp
    }
}

/// A one-pole exponential lowpass: `state = (1-a)*input + a*state`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePoleLowPass {
    pub state: f32,
}

impl OnePoleLowPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, input: f32, cutoff_hz: f32, sample_rate: f32) -> f32 {
        let alpha = (-2.0 * std::f32::consts::PI * cutoff_hz.min(sample_rate * 0.45) / sample_rate).exp();
        self.state = (1.0 - alpha) * input + alpha * self.state;
        self.state
    }
}

/// A one-pole highpass built by subtracting a lowpass from its input.
/// Shares the same state variable a lowpass would use, since that's all
/// it is underneath.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePoleHighPass {
    lp: OnePoleLowPass,
}

impl OnePoleHighPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, input: f32, cutoff_hz: f32, sample_rate: f32) -> f32 {
        let lp = self.lp.process(input, cutoff_hz, sample_rate);
        input - lp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_pole_lowpass_settles_to_dc_input() {
        let mut f = OnePoleLowPass::new();
        let mut last = 0.0;
        for _ in 0..10_000 {
            last = f.process(1.0, 500.0, 48_000.0);
        }
        assert!((last - 1.0).abs() < 1e-3);
    }

    #[test]
    fn one_pole_highpass_blocks_dc() {
        let mut f = OnePoleHighPass::new();
        let mut last = 0.0;
        for _ in 0..10_000 {
            last = f.process(1.0, 500.0, 48_000.0);
        }
        assert!(last.abs() < 1e-3);
    }

    #[test]
    fn svf_is_stable_for_in_range_cutoff() {
        let mut f = StateVariableFilter::new();
        for i in 0..48_000 {
            let input = if i % 2 == 0 { 1.0 } else { -1.0 };
            let out = f.process(input, 1200.0, 0.5, 48_000.0);
            assert!(out.is_finite());
        }
    }
}
