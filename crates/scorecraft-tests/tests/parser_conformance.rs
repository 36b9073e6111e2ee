//! Round-trip and boundary conformance for the score compiler, against
//! the concrete examples the design calls out.

use pretty_assertions::assert_eq;
use scorecraft_dsl::{parse_script, ParseErrorKind};

#[test]
fn tempo_and_tempo_scale_compose_into_internal_tempo() {
    // §8.6: tempo 120 * tempo_scale 2.0 => internal tempo 240.
    let program = parse_script(
        "\
        tempo 120
        tempo_scale 2.0
        synth s sine
        pattern p (C4)
        play p s
        ",
    )
    .unwrap();
    assert_eq!(program.tempo, 240.0);

    let base_samples_per_step = (48_000.0_f32 * 60.0 / program.tempo / 4.0).round() as i64;
    assert_eq!(base_samples_per_step, 3000);
}

#[test]
fn degree_token_with_octave_and_quarter_tone_resolves_correctly() {
    // §8.7: "3'+" with root C4 (MIDI 60) in major yields 64 + 12 + 0.5 semitones.
    let program = parse_script(
        "\
        root C4
        maqam major
        synth s sine
        pattern p (3'+)
        play p s
        ",
    )
    .unwrap();
    let step = program.patterns[0].steps[0];
    assert_eq!(step.note, 76);
    assert!((step.cents - 50.0).abs() < 1e-4);
}

#[test]
fn bracket_list_with_repeat_count_tiles_the_base_list() {
    // §8.8: `[60, 62, 64] 3` => length 9, notes repeating three times.
    let program = parse_script(
        "\
        synth s sine
        pattern p [60, 62, 64] 3
        play p s
        ",
    )
    .unwrap();
    let notes: Vec<i32> = program.patterns[0].steps.iter().map(|s| s.note).collect();
    assert_eq!(notes, vec![60, 62, 64, 60, 62, 64, 60, 62, 64]);
}

#[test]
fn pattern_pads_to_whole_bar_when_timesig_enforced() {
    let program = parse_script(
        "\
        timesig 4/4
        timesig_enforce on
        synth s sine
        pattern p (C4 C4 C4 C4 C4)
        play p s
        ",
    )
    .unwrap();
    // 5 steps padded up to the next multiple of 16 (4 beats * 16/4 steps/beat).
    assert_eq!(program.patterns[0].steps.len(), 16);
}

#[test]
fn bracket_list_never_reads_scale_degrees() {
    let program = parse_script(
        "\
        synth s sine
        pattern p [1 2 3]
        play p s
        ",
    )
    .unwrap();
    let steps = &program.patterns[0].steps;
    assert!(!steps[0].degree_valid);
    assert_eq!(steps[0].note, 1); // read as a raw MIDI number, not scale degree 1
}

#[test]
fn unknown_command_is_a_syntax_error_with_line_number() {
    let err = parse_script("tempo 120\nnotacommand foo\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, ParseErrorKind::UnknownCommand(_)));
}

#[test]
fn out_of_range_tempo_is_rejected() {
    let err = parse_script("tempo 999\n").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::OutOfRange(_, _)));
}

#[test]
fn script_without_a_play_command_is_rejected() {
    let err = parse_script("synth s sine\npattern p (C4)\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::NoPlayCommand);
}

#[test]
fn accent_mask_overwrites_only_the_steps_it_names() {
    let program = parse_script(
        "\
        synth s sine
        pattern p (C4 C4 C4 C4)
        accent p 1 0 1
        play p s
        ",
    )
    .unwrap();
    let steps = &program.patterns[0].steps;
    assert!(steps[0].accent);
    assert!(!steps[1].accent);
    assert!(steps[2].accent);
    assert!(!steps[3].accent); // unspecified, keeps default false
}

#[test]
fn tempo_map_named_aliases_fan_out_to_their_sections() {
    let program = parse_script(
        "\
        tempo_map verse=1.5
        synth s sine
        pattern p (C4)
        play p s
        ",
    )
    .unwrap();
    // "verse" aliases sections 2 and 4.
    assert_eq!(program.tempo_map[2], 1.5);
    assert_eq!(program.tempo_map[4], 1.5);
    assert_eq!(program.tempo_map[3], 1.0);
}

#[test]
fn play_track_options_parse_rate_density_and_only_window() {
    let program = parse_script(
        "\
        synth s sine
        pattern p (C4 C4 C4 C4)
        play p s rate 2 density 0.5 only 2-3
        ",
    )
    .unwrap();
    let t = &program.tracks[0];
    assert_eq!(t.rate, 2.0);
    assert_eq!(t.density, 0.5);
    assert_eq!(t.seq_start, 2);
    assert_eq!(t.seq_end, 3);
}
