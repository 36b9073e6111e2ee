//! Compiles a pattern body string — the text inside `pattern name (...)` —
//! into a flat list of [`PatternStep`]s.
//!
//! Two distinct token grammars exist. If the body contains a `[...]`
//! bracket list anywhere, the whole body is a bracket-list pattern: a
//! whitespace/comma-separated token list inside the brackets, optionally
//! followed by a repeat count (or the literal `inf`, which is **not**
//! actually infinite — it is treated as a repeat of 1). Tokens in this form
//! are rests or named/MIDI notes only; scale degrees are never recognized
//! here. Otherwise the body is the space-separated form: each
//! whitespace/comma-separated token is a rest, a scale degree, or a
//! named/MIDI note, tried in that order.

use crate::error::{ParseErrorKind, ParseResult};
use crate::note::{parse_degree_token, parse_note_name};
use crate::program::{PatternDef, PatternStep};

struct SplitToken<'a> {
    base: &'a str,
    accent: bool,
    slide_ms: f32,
}

/// Splits a `!`/`~`-suffixed token into its base note, accent flag, and
/// glide override. `!` marks an accent; `~<ms>` overrides the glide time for
/// this step only. If both appear, whichever comes first in the string wins
/// for where the base token ends.
fn split_token_slide(token: &str) -> SplitToken<'_> {
    let excl = token.find('!');
    let tilde = token.find('~');

    let mut accent = false;
    let mut len = token.len();
    if let Some(e) = excl {
        accent = true;
        len = e;
    }
    if let Some(t) = tilde {
        if excl.is_none() || t < excl.unwrap() {
            len = t;
        }
    }
    let base = &token[..len];

    let slide_ms = match tilde {
        None => -1.0,
        Some(t) => {
            let v: f32 = token[t + 1..].parse().unwrap_or(0.0);
            v.max(0.0)
        }
    };

    SplitToken {
        base,
        accent,
        slide_ms,
    }
}

fn split_tokens(body: &str) -> Vec<&str> {
    body.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect()
}

/// The bracket-list form: `[tok tok tok] <repeat|inf>`.
fn parse_pattern_list(body: &str, line: usize) -> ParseResult<Vec<PatternStep>> {
    let open = body.find('[').unwrap();
    let close = body[open..]
        .find(']')
        .map(|i| open + i)
        .ok_or_else(|| crate::error::ParseError::new(line, ParseErrorKind::InvalidNote(body.to_string())))?;

    let list = &body[open + 1..close];
    let trailer = body[close + 1..].trim();

    let repeat: u32 = if trailer.is_empty() {
        1
    } else if trailer.eq_ignore_ascii_case("inf") {
        1
    } else {
        trailer
            .parse()
            .ok()
            .filter(|&n: &u32| n >= 1)
            .unwrap_or(1)
    };

    let mut base = Vec::new();
    for raw in split_tokens(list) {
        let split = split_token_slide(raw);
        let step = if split.base == "." || split.base == "-" {
            PatternStep::rest()
        } else {
            let note = parse_note_name(split.base).ok_or_else(|| {
                crate::error::ParseError::new(line, ParseErrorKind::InvalidNote(split.base.to_string()))
            })?;
            PatternStep {
                note,
                cents: 0.0,
                degree: 0,
                degree_octave: 0,
                degree_micro: 0,
                degree_valid: false,
                slide_ms: split.slide_ms,
                accent: split.accent,
            }
        };
        base.push(step);
    }

    let mut steps = Vec::with_capacity(base.len() * repeat as usize);
    for _ in 0..repeat {
        steps.extend_from_slice(&base);
    }
    Ok(steps)
}

/// The space-separated form: rest, scale degree, or named/MIDI note per token.
fn parse_pattern_sequence(
    body: &str,
    root_midi: f32,
    maqam_offsets: &[f32; 7],
    line: usize,
) -> ParseResult<Vec<PatternStep>> {
    let mut steps = Vec::new();
    for raw in split_tokens(body) {
        let split = split_token_slide(raw);
        if split.base == "." || split.base == "-" {
            steps.push(PatternStep::rest());
            continue;
        }

        if let Ok(Some(d)) = parse_degree_token(split.base, root_midi, maqam_offsets) {
            steps.push(PatternStep {
                note: d.midi.floor() as i32,
                cents: (d.midi - d.midi.floor()) * 100.0,
                degree: d.degree,
                degree_octave: d.octave_offset,
                degree_micro: d.micro,
                degree_valid: true,
                slide_ms: split.slide_ms,
                accent: split.accent,
            });
            continue;
        }

        if let Some(note) = parse_note_name(split.base) {
            steps.push(PatternStep {
                note,
                cents: 0.0,
                degree: 0,
                degree_octave: 0,
                degree_micro: 0,
                degree_valid: false,
                slide_ms: split.slide_ms,
                accent: split.accent,
            });
            continue;
        }

        return Err(crate::error::ParseError::new(
            line,
            ParseErrorKind::InvalidNote(split.base.to_string()),
        ));
    }
    Ok(steps)
}

/// Dispatches on whether `body` contains a `[` anywhere: if so, the whole
/// body is the bracket-list form (scale degrees are unreachable); otherwise
/// it's the space-separated form.
pub fn parse_pattern(
    body: &str,
    root_midi: f32,
    maqam_offsets: &[f32; 7],
    line: usize,
) -> ParseResult<Vec<PatternStep>> {
    if body.contains('[') {
        parse_pattern_list(body, line)
    } else {
        parse_pattern_sequence(body, root_midi, maqam_offsets, line)
    }
}

/// Pads a pattern with trailing rests to the next whole bar, using the
/// program's *global* time signature (not the per-section map the runtime
/// consults later) — matching the reference compiler's parse-time padding.
pub fn pad_pattern_to_timesig(
    pattern: &mut PatternDef,
    time_sig_num: u32,
    time_sig_den: u32,
    enforce: bool,
) {
    if !enforce || time_sig_den == 0 || 16 % time_sig_den != 0 {
        return;
    }
    let steps_per_beat = 16 / time_sig_den;
    let bar_steps = time_sig_num * steps_per_beat;
    if bar_steps == 0 {
        return;
    }
    let len = pattern.steps.len() as u32;
    let rem = len % bar_steps;
    if rem == 0 {
        return;
    }
    let pad = bar_steps - rem;
    for _ in 0..pad {
        pattern.steps.push(PatternStep::rest());
    }
}
