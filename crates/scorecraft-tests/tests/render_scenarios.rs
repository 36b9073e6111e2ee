//! End-to-end rendering scenarios driven entirely through
//! [`scorecraft_engine::Engine`]'s public surface: no audio device, no
//! toolchain assumptions beyond what `hound` can read back from disk.

use pretty_assertions::assert_eq;
use scorecraft_engine::Engine;

fn rms(frames: &[f32]) -> f32 {
    if frames.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = frames.iter().map(|s| s * s).sum();
    (sum_sq / frames.len() as f32).sqrt()
}

#[test]
fn a_steady_tone_produces_nonzero_signal_over_one_second() {
    let mut engine = Engine::new();
    engine
        .play_script(
            "\
            tempo 120
            synth s sine
            pattern p (C4 C4 C4 C4)
            play p s
            ",
        )
        .unwrap();

    let frames = engine.render_block(engine.sample_rate() as usize);
    assert!(frames.iter().any(|&s| s != 0.0));
    assert!(engine.get_meter_ex().rms_l > 0.0);
}

#[test]
fn a_struck_pattern_carries_more_energy_than_the_same_pattern_all_rests() {
    let mut struck = Engine::new();
    struck
        .play_script(
            "\
            tempo 120
            synth k kick
            pattern p (C1 . C1 .)
            play p k
            ",
        )
        .unwrap();
    let struck_frames = struck.render_block(struck.sample_rate() as usize / 2);

    let mut silent = Engine::new();
    silent
        .play_script(
            "\
            tempo 120
            synth k kick
            pattern p (. . . .)
            play p k
            ",
        )
        .unwrap();
    let silent_frames = silent.render_block(silent.sample_rate() as usize / 2);

    assert!(rms(&struck_frames) > rms(&silent_frames));
    assert_eq!(rms(&silent_frames), 0.0);
}

#[test]
fn stuttering_a_single_hit_carries_more_energy_than_a_plain_hit() {
    let mut plain = Engine::new();
    plain
        .play_script(
            "\
            tempo 120
            synth s saw
            pattern p (C3 . . .)
            play p s
            ",
        )
        .unwrap();
    let plain_frames = plain.render_block(plain.sample_rate() as usize / 4);

    let mut stuttered = Engine::new();
    stuttered
        .play_script(
            "\
            tempo 120
            synth s saw
            pattern p (C3 . . .)
            play p s stut 4
            ",
        )
        .unwrap();
    let stut_frames = stuttered.render_block(stuttered.sample_rate() as usize / 4);

    assert!(rms(&stut_frames) > rms(&plain_frames));
}

#[test]
fn no_sample_exceeds_unit_amplitude_under_default_mastering() {
    let mut engine = Engine::new();
    engine
        .play_script(
            "\
            tempo 120
            synth s supersaw
            pattern p (C2 D2 E2 F2)
            play p s
            ",
        )
        .unwrap();
    let frames = engine.render_block(engine.sample_rate() as usize);
    assert!(frames.iter().all(|s| s.abs() <= 1.0));
    assert!(!engine.get_meter_ex().clip);
}

#[test]
fn offline_wav_matches_requested_duration_and_peak_is_in_unit_interval() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("scorecraft_render_scenarios_test.wav");
    let path_str = path.to_str().unwrap();

    Engine::render_to_wav(
        "tempo 120\nsynth s sine\npattern p (A4)\nplay p s\n",
        path_str,
        1.0,
        48_000,
        256,
    )
    .unwrap();

    let mut reader = hound::WavReader::open(path_str).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 48_000);
    assert_eq!(reader.len() as u64, 48_000 * 2);

    let peak = reader
        .samples::<f32>()
        .map(|s| s.unwrap().abs())
        .fold(0.0f32, f32::max);
    assert!(peak > 0.0 && peak <= 1.0);
}

#[test]
fn an_undefined_reference_is_rejected_before_any_render_happens() {
    let mut engine = Engine::new();
    let err = engine.play_script("pattern p (C4)\nplay p ghost\n");
    assert!(err.is_err());
    assert!(engine.program().is_none());
}
