//! Properties of the per-track scheduler that don't need real audio output:
//! step-clock math, sequence cursor advance, and the fixed voice pool size.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use scorecraft_dsl::{parse_script, PatternDef, PatternStep, Program, SynthDef, SynthType, TrackDef};
use scorecraft_engine::{effective_pattern_length, TrackRuntime, VoicePool, MAX_VOICES};

const BASE_SAMPLES_PER_STEP: i64 = 1_000;

fn runtime_for(program: &Program, track: &TrackDef) -> TrackRuntime {
    let synth_idx = program.find_synth(&track.synth).unwrap();
    let (pattern_idx, sequence_idx) = if track.is_sequence {
        (None, program.find_sequence(&track.pattern))
    } else {
        (program.find_pattern(&track.pattern), None)
    };
    TrackRuntime::build(track, 0, pattern_idx, synth_idx, sequence_idx, BASE_SAMPLES_PER_STEP)
}

#[test]
fn voice_pool_is_fixed_at_thirty_two() {
    assert_eq!(MAX_VOICES, 32);
}

#[test]
fn samples_per_step_reacts_to_rate_hurry_fast_slow() {
    let mut program = Program::new();
    program.synths.push(SynthDef::new("s".into(), SynthType::Sine));
    program.patterns.push(PatternDef { name: "p".into(), steps: vec![PatternStep::rest()] });

    let mut plain = TrackDef::new("p".into(), "s".into());
    let base = runtime_for(&program, &plain).samples_per_step;
    assert_eq!(base, BASE_SAMPLES_PER_STEP);

    plain.rate = 2.0;
    let doubled = runtime_for(&program, &plain);
    assert_eq!(doubled.samples_per_step, BASE_SAMPLES_PER_STEP / 2);

    let mut slowed = TrackDef::new("p".into(), "s".into());
    slowed.slow = 2;
    let slow = runtime_for(&program, &slowed);
    assert_eq!(slow.samples_per_step, BASE_SAMPLES_PER_STEP * 2);

    let mut fasted = TrackDef::new("p".into(), "s".into());
    fasted.fast = 4;
    let fast = runtime_for(&program, &fasted);
    assert_eq!(fast.samples_per_step, BASE_SAMPLES_PER_STEP / 4);
}

#[test]
fn effective_pattern_length_only_pads_when_enforced() {
    let mut program = Program::new();
    program.time_sig_num = 3;
    program.time_sig_den = 4;
    for s in program.time_sig_num_map.iter_mut() {
        *s = 3;
    }
    for s in program.time_sig_den_map.iter_mut() {
        *s = 4;
    }
    let five_steps = PatternDef { name: "p".into(), steps: vec![PatternStep::rest(); 5] };

    program.time_sig_enforce = false;
    assert_eq!(effective_pattern_length(&program, &five_steps, 1), 5);

    program.time_sig_enforce = true;
    // 3/4 => 12 sixteenth-note steps per bar; 5 pads up to 12.
    assert_eq!(effective_pattern_length(&program, &five_steps, 1), 12);
}

#[test]
fn step_clock_wraps_once_per_cycle_and_palindrome_doubles_it() {
    let mut program = Program::new();
    program.synths.push(SynthDef::new("s".into(), SynthType::Sine));
    program.patterns.push(PatternDef {
        name: "p".into(),
        steps: vec![PatternStep { note: 60, ..PatternStep::rest() }; 4],
    });
    let mut pool = VoicePool::new();

    let plain_def = TrackDef::new("p".into(), "s".into());
    let mut plain = runtime_for(&program, &plain_def);
    let mut wraps = 0;
    for _ in 0..12 {
        plain.schedule_step(&program, &mut pool, 48_000.0, 1);
        if plain.step_index == 0 {
            wraps += 1;
        }
    }
    assert_eq!(wraps, 3); // cycle length 4, twelve steps => three wraps

    let mut pal_def = TrackDef::new("p".into(), "s".into());
    pal_def.palindrome = true;
    let mut pal = runtime_for(&program, &pal_def);
    let mut pal_wraps = 0;
    for _ in 0..12 {
        pal.schedule_step(&program, &mut pool, 48_000.0, 1);
        if pal.step_index == 0 {
            pal_wraps += 1;
        }
    }
    assert_eq!(pal_wraps, 2); // cycle length 4*2-2=6, twelve steps => two wraps
}

#[test]
fn iter_multiplies_the_cycle_length() {
    let mut program = Program::new();
    program.synths.push(SynthDef::new("s".into(), SynthType::Sine));
    program.patterns.push(PatternDef {
        name: "p".into(),
        steps: vec![PatternStep { note: 60, ..PatternStep::rest() }; 2],
    });
    let mut pool = VoicePool::new();

    let mut def = TrackDef::new("p".into(), "s".into());
    def.iter = 3;
    let mut track = runtime_for(&program, &def);
    let mut wraps = 0;
    for _ in 0..12 {
        track.schedule_step(&program, &mut pool, 48_000.0, 1);
        if track.step_index == 0 {
            wraps += 1;
        }
    }
    // cycle length 2*3=6, twelve steps => two wraps.
    assert_eq!(wraps, 2);
}

#[test]
fn density_zero_still_advances_the_step_clock() {
    // A muted step is still a step: the scheduler must not stall just
    // because every trigger decision came back negative.
    let mut program = Program::new();
    program.synths.push(SynthDef::new("s".into(), SynthType::Sine));
    program.patterns.push(PatternDef {
        name: "p".into(),
        steps: vec![PatternStep { note: 60, ..PatternStep::rest() }; 4],
    });
    let mut pool = VoicePool::new();

    let mut def = TrackDef::new("p".into(), "s".into());
    def.density = 0.0;
    let mut track = runtime_for(&program, &def);
    for i in 1..=20u32 {
        track.schedule_step(&program, &mut pool, 48_000.0, 1);
        assert_eq!(track.step_index, i % 4);
    }
}

#[test]
fn sequence_advances_once_per_step_transition_regardless_of_repeat_count() {
    let program = parse_script(
        "\
        synth k kick
        pattern a (C1)
        pattern b (C1)
        sequence s (a*2 b)
        playseq s k
        ",
    )
    .unwrap();
    let mut pool = VoicePool::new();
    let mut track = runtime_for(&program, &program.tracks[0]);

    // One lap over (a*2 b) is three pattern cycles (a, a, b) but only two
    // genuine step transitions (a -> b, b -> a). The cursor rolls back to
    // (seq_index, seq_repeat_done) == (0, 0) after Sigma repeat = 3 cycles.
    let mut advances = 0;
    for cycle in 1..=9 {
        let outcome = track.schedule_step(&program, &mut pool, 48_000.0, 1);
        if outcome.sequence_advanced {
            advances += 1;
        }
        if cycle % 3 == 0 {
            assert_eq!(track.seq_index, 0);
        }
    }
    assert_eq!(advances, 6); // three laps * two transitions per lap
}

#[test]
fn only_window_keeps_the_cursor_advancing_while_muted() {
    let program = parse_script(
        "\
        synth k kick
        pattern a (C1)
        pattern b (C1)
        pattern c (C1)
        sequence s (a b c)
        playseq s k only 2-2
        ",
    )
    .unwrap();
    let mut pool = VoicePool::new();
    let mut track = runtime_for(&program, &program.tracks[0]);
    assert_eq!(track.seq_start, 2);
    assert_eq!(track.seq_end, 2);

    let mut positions = Vec::new();
    for _ in 0..6 {
        track.schedule_step(&program, &mut pool, 48_000.0, 1);
        positions.push(track.seq_pos);
    }
    // The cursor keeps moving through every step of the sequence even
    // though only step 2 ("b") is actually audible.
    assert!(positions.contains(&0));
    assert!(positions.contains(&1));
    assert!(positions.contains(&2));
}

proptest! {
    // §8 invariant #4: effective pattern length is never shorter than the raw
    // length, and is a whole multiple of the section's bar length whenever
    // enforcement is on and the meter's denominator divides 16.
    #[test]
    fn effective_length_never_shrinks_and_rounds_to_a_bar(
        raw_len in 1usize..64,
        num in 1u32..16,
        den_pow in 0u32..6, // 1,2,4,8,16,32
        enforce in any::<bool>(),
    ) {
        let den = 1u32 << den_pow;
        let mut program = Program::new();
        for s in program.time_sig_num_map.iter_mut() {
            *s = num;
        }
        for s in program.time_sig_den_map.iter_mut() {
            *s = den;
        }
        program.time_sig_enforce = enforce;

        let pattern = PatternDef { name: "p".into(), steps: vec![PatternStep::rest(); raw_len] };
        let eff = effective_pattern_length(&program, &pattern, 1);

        prop_assert!(eff >= raw_len);
        if enforce && 16 % den == 0 {
            let bar_steps = (num * (16 / den)) as usize;
            prop_assert_eq!(eff % bar_steps, 0);
        } else {
            prop_assert_eq!(eff, raw_len);
        }
    }
}
