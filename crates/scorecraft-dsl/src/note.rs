//! Pitch parsing: scientific note names, raw MIDI numbers, scale degrees,
//! and the maqam/mode cents tables scale degrees are resolved against.

/// Result of parsing one token of a scale-degree pattern (the space-separated
/// form only — the bracket-list form never reaches this parser).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeToken {
    pub degree: i32,
    pub octave_offset: i32,
    pub micro: i32,
    pub midi: f32,
}

/// Parses a scientific-pitch or raw-MIDI token: `[A-G](#|b)?-?\d+` or a bare
/// (possibly negative) integer. Returns `None` for anything else.
///
/// Octave numbering follows the MIDI convention where C4 (middle C) is note
/// 60: `midi = (octave + 1) * 12 + semitone`.
pub fn parse_note_name(token: &str) -> Option<i32> {
    let bytes = token.as_bytes();
    if bytes.is_empty() {
        return None;
    }

    if bytes[0].is_ascii_digit() || (bytes[0] == b'-' && bytes.len() > 1 && bytes[1].is_ascii_digit()) {
        return token.parse::<i32>().ok();
    }

    let semitone = match bytes[0].to_ascii_uppercase() {
        b'C' => 0,
        b'D' => 2,
        b'E' => 4,
        b'F' => 5,
        b'G' => 7,
        b'A' => 9,
        b'B' => 11,
        _ => return None,
    };

    let mut index = 1;
    let mut semitone = semitone;
    if let Some(&b) = bytes.get(index) {
        if b == b'#' {
            semitone += 1;
            index += 1;
        } else if b == b'b' || b == b'B' {
            semitone -= 1;
            index += 1;
        }
    }

    let rest = &token[index..];
    if rest.is_empty() {
        return None;
    }
    let first = rest.as_bytes()[0];
    if !first.is_ascii_digit() && first != b'-' {
        return None;
    }
    let octave: i32 = rest.parse().ok()?;
    Some((octave + 1) * 12 + semitone)
}

/// Parses a scale-degree token (`r`/`R` for root, `1`-`7` for a scale degree,
/// `.`/`-` for a rest), applying octave marks (`'` up a full octave each,
/// `,` down a full octave each — apostrophes are consumed before commas, they
/// are not interleaved) and a trailing `+`/`-` quarter-tone (50 cents) shift.
///
/// `root_midi` and `maqam_offsets` resolve the degree to an absolute pitch;
/// returns `None` for a rest token, and `Err` for anything malformed.
pub fn parse_degree_token(
    token: &str,
    root_midi: f32,
    maqam_offsets: &[f32; 7],
) -> Result<Option<DegreeToken>, ()> {
    if token == "." || token == "-" {
        return Ok(None);
    }

    let chars: Vec<char> = token.chars().collect();
    if chars.is_empty() {
        return Err(());
    }

    let (degree, mut index) = if chars[0] == 'r' || chars[0] == 'R' {
        (1i32, 1usize)
    } else {
        let d = chars[0].to_digit(10).ok_or(())? as i32;
        if !(1..=7).contains(&d) {
            return Err(());
        }
        (d, 1usize)
    };

    let mut octave_offset = 0i32;
    while index < chars.len() && chars[index] == '\'' {
        octave_offset += 12;
        index += 1;
    }
    while index < chars.len() && chars[index] == ',' {
        octave_offset -= 12;
        index += 1;
    }

    let mut cents = maqam_offsets[(degree - 1) as usize];
    let mut micro = 0i32;
    if index < chars.len() {
        match chars[index] {
            '+' => {
                cents += 50.0;
                micro = 1;
                index += 1;
            }
            '-' => {
                cents -= 50.0;
                micro = -1;
                index += 1;
            }
            _ => {}
        }
    }

    if index != chars.len() {
        return Err(());
    }

    let midi = root_midi + octave_offset as f32 + cents / 100.0;
    Ok(Some(DegreeToken {
        degree,
        octave_offset: octave_offset / 12,
        micro,
        midi,
    }))
}

/// Looks up a maqam/mode's 7-degree cents-from-root table by name. Unknown
/// names intentionally return `None` — the caller leaves the previous table
/// untouched, matching the reference compiler's silent no-op.
pub fn maqam_cents(name: &str) -> Option<[f32; 7]> {
    let t = match name {
        "rast" => [0.0, 200.0, 350.0, 500.0, 700.0, 900.0, 1100.0],
        "bayati" => [0.0, 150.0, 300.0, 500.0, 700.0, 850.0, 1000.0],
        "hijaz" => [0.0, 100.0, 400.0, 500.0, 700.0, 800.0, 1100.0],
        "nahawand" => [0.0, 200.0, 300.0, 500.0, 700.0, 800.0, 1000.0],
        "saba" => [0.0, 150.0, 300.0, 400.0, 700.0, 900.0, 1000.0],
        "kurd" => [0.0, 100.0, 300.0, 500.0, 700.0, 800.0, 1000.0],
        "lydian" => [0.0, 200.0, 400.0, 600.0, 700.0, 900.0, 1100.0],
        "major" | "ionian" => [0.0, 200.0, 400.0, 500.0, 700.0, 900.0, 1100.0],
        "minor" | "aeolian" => [0.0, 200.0, 300.0, 500.0, 700.0, 800.0, 1000.0],
        "dorian" => [0.0, 200.0, 300.0, 500.0, 700.0, 900.0, 1000.0],
        "phrygian" => [0.0, 100.0, 300.0, 500.0, 700.0, 800.0, 1000.0],
        "mixolydian" => [0.0, 200.0, 400.0, 500.0, 700.0, 900.0, 1000.0],
        "locrian" => [0.0, 100.0, 300.0, 500.0, 600.0, 800.0, 1000.0],
        "harmonic_minor" | "harmonic-minor" => [0.0, 200.0, 300.0, 500.0, 700.0, 800.0, 1100.0],
        "melodic_minor" | "melodic-minor" => [0.0, 200.0, 300.0, 500.0, 700.0, 900.0, 1100.0],
        "pentatonic_major" | "pentatonic-major" | "pentatonic" => {
            [0.0, 200.0, 400.0, 700.0, 900.0, 1200.0, 1400.0]
        }
        "pentatonic_minor" | "pentatonic-minor" => {
            [0.0, 300.0, 500.0, 700.0, 1000.0, 1200.0, 1400.0]
        }
        "blues" | "blues_minor" | "blues-minor" => {
            [0.0, 300.0, 500.0, 600.0, 700.0, 1000.0, 1200.0]
        }
        "blues_major" | "blues-major" => [0.0, 200.0, 300.0, 400.0, 700.0, 900.0, 1200.0],
        "whole_tone" | "whole-tone" => [0.0, 200.0, 400.0, 600.0, 800.0, 1000.0, 1200.0],
        "octatonic" | "octatonic_wh" | "octatonic-wh" => {
            [0.0, 200.0, 300.0, 500.0, 600.0, 800.0, 900.0]
        }
        "octatonic_hw" | "octatonic-hw" => [0.0, 100.0, 300.0, 400.0, 600.0, 700.0, 900.0],
        _ => return None,
    };
    Some(t)
}

/// `midi = note + cents/100` converted to Hz using equal temperament, A4 = 440 Hz.
pub fn midi_to_freq(midi: f32) -> f32 {
    440.0 * 2f32.powf((midi - 69.0) / 12.0)
}
