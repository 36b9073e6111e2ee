//! Compiles a score script into a validated [`Program`].
//!
//! Mirrors the reference compiler's one-pass, line-oriented command
//! dispatch: each non-blank line is tokenized, the first token selects a
//! command, and the command consumes however many further tokens it needs.
//! There's no lookahead across lines and no two-pass resolution — names
//! (synths, patterns, sequences) must be declared before they're referenced.

use crate::error::{ParseError, ParseErrorKind, ParseResult};
use crate::lexer::{lines, tokenize};
use crate::note::{maqam_cents, parse_note_name, parse_degree_token};
use crate::pattern::{pad_pattern_to_timesig, parse_pattern};
use crate::program::*;

/// Compiles `script` into a [`Program`], or the first [`ParseError`] hit.
pub fn parse_script(script: &str) -> ParseResult<Program> {
    let mut program = Program::new();

    for line in lines(script) {
        let tokens = tokenize(line.text);
        let mut cur = Cursor::new(&tokens, line.number);
        let Some(cmd) = cur.next() else { continue };

        match cmd.as_str() {
            "tempo" => cmd_tempo(&mut cur, &mut program)?,
            "master" | "master_amp" => cmd_master(&mut cur, &mut program)?,
            "tempo_scale" => cmd_tempo_scale(&mut cur, &mut program)?,
            "tempo_map" => cmd_tempo_map(&mut cur, &mut program)?,
            "timesig" | "time_signature" => cmd_timesig(&mut cur, &mut program)?,
            "timesig_enforce" => cmd_timesig_enforce(&mut cur, &mut program)?,
            "timesig_map" => cmd_timesig_map(&mut cur, &mut program)?,
            "root" => cmd_root(&mut cur, &mut program)?,
            "maqam" => cmd_maqam(&mut cur, &mut program)?,
            "drone" => cmd_drone(&mut cur, &mut program)?,
            "amp" => cmd_amp(&mut cur, &mut program)?,
            "synth" => cmd_synth(&mut cur, &mut program)?,
            "set" => cmd_set(&mut cur, &mut program)?,
            "mod" => cmd_mod(&mut cur, &mut program)?,
            "pattern" => cmd_pattern(&mut cur, &mut program)?,
            "accent" => cmd_accent(&mut cur, &mut program)?,
            "sequence" => cmd_sequence(&mut cur, &mut program)?,
            "play" => cmd_play(&mut cur, &mut program)?,
            "playseq" => cmd_playseq(&mut cur, &mut program)?,
            other => return Err(cur.err(ParseErrorKind::UnknownCommand(other.to_string()))),
        }
    }

    if program.tracks.is_empty() {
        return Err(ParseError::new(0, ParseErrorKind::NoPlayCommand));
    }

    Ok(program)
}

/// A read-once cursor over one line's tokens, tracking the source line for
/// error reporting.
struct Cursor<'a> {
    tokens: &'a [String],
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [String], line: usize) -> Self {
        Self { tokens, pos: 0, line }
    }

    fn next(&mut self) -> Option<&'a str> {
        let t = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(t.as_str())
    }

    fn require(&mut self, cmd: &str) -> ParseResult<&'a str> {
        self.next()
            .ok_or_else(|| ParseError::new(self.line, ParseErrorKind::MissingArgument(cmd.to_string())))
    }

    fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.line, kind)
    }
}

fn parse_f32(cur: &Cursor, cmd: &str, token: &str) -> ParseResult<f32> {
    token
        .parse()
        .map_err(|_| cur.err(ParseErrorKind::OutOfRange(cmd.to_string(), token.to_string())))
}

fn parse_u32(cur: &Cursor, cmd: &str, token: &str) -> ParseResult<u32> {
    token
        .parse()
        .map_err(|_| cur.err(ParseErrorKind::OutOfRange(cmd.to_string(), token.to_string())))
}

fn parse_i32(cur: &Cursor, cmd: &str, token: &str) -> ParseResult<i32> {
    token
        .parse()
        .map_err(|_| cur.err(ParseErrorKind::OutOfRange(cmd.to_string(), token.to_string())))
}

fn in_range(cur: &Cursor, cmd: &str, v: f32, lo: f32, hi: f32) -> ParseResult<f32> {
    if v < lo || v > hi {
        Err(cur.err(ParseErrorKind::OutOfRange(cmd.to_string(), v.to_string())))
    } else {
        Ok(v)
    }
}

fn cmd_tempo(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let tok = cur.require("tempo")?;
    let bpm = parse_f32(cur, "tempo", tok)?;
    let bpm = in_range(cur, "tempo", bpm, 20.0, 300.0)?;
    program.tempo = bpm * program.tempo_scale;
    Ok(())
}

fn cmd_master(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let tok = cur.require("master")?;
    let amp = parse_f32(cur, "master", tok)?;
    program.master_amp = in_range(cur, "master", amp, 0.0, 4.0)?;
    Ok(())
}

fn cmd_tempo_scale(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let tok = cur.require("tempo_scale")?;
    let scale = parse_f32(cur, "tempo_scale", tok)?;
    if scale <= 0.0 || scale > 8.0 {
        return Err(cur.err(ParseErrorKind::OutOfRange("tempo_scale".into(), tok.to_string())));
    }
    program.tempo_scale = scale;
    Ok(())
}

/// Resolves a `tempo_map`/`timesig_map` key to the section indices it writes.
/// Named aliases fan out to 1 or 2 sections (looked up in
/// [`crate::program::section_aliases`]); a bare `1`-`14` index writes one.
fn resolve_section_key(cur: &Cursor, cmd: &str, key: &str) -> ParseResult<Vec<usize>> {
    if let Some(sections) = crate::program::section_aliases().get(key) {
        return Ok(sections.iter().map(|&s| s as usize).collect());
    }
    if key.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        let idx: i32 = key
            .parse()
            .map_err(|_| cur.err(ParseErrorKind::UnknownOption(key.to_string(), cmd.to_string())))?;
        if !(1..=14).contains(&idx) {
            return Err(cur.err(ParseErrorKind::OutOfRange(cmd.to_string(), key.to_string())));
        }
        return Ok(vec![idx as usize]);
    }
    Err(cur.err(ParseErrorKind::UnknownOption(key.to_string(), cmd.to_string())))
}

fn cmd_tempo_map(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let list = cur.require("tempo_map")?;
    for entry in list.split(|c: char| c.is_whitespace() || c == ',').filter(|s| !s.is_empty()) {
        let (key, val) = entry
            .split_once('=')
            .ok_or_else(|| cur.err(ParseErrorKind::MissingArgument("tempo_map key=value".into())))?;
        let v = parse_f32(cur, "tempo_map", val)?;
        if v <= 0.0 || v > 4.0 {
            return Err(cur.err(ParseErrorKind::OutOfRange("tempo_map".into(), val.to_string())));
        }
        for idx in resolve_section_key(cur, "tempo_map", key)? {
            program.tempo_map[idx] = v;
        }
    }
    Ok(())
}

fn parse_timesig_token(cur: &Cursor, token: &str) -> ParseResult<(u32, u32)> {
    let (num_s, den_s) = token
        .split_once('/')
        .ok_or_else(|| cur.err(ParseErrorKind::InvalidNote(token.to_string())))?;
    let num: u32 = num_s.parse().unwrap_or(0);
    let den: u32 = den_s.parse().unwrap_or(0);
    if !(1..=32).contains(&num) {
        return Err(cur.err(ParseErrorKind::OutOfRange("timesig".into(), token.to_string())));
    }
    if ![1, 2, 4, 8, 16, 32].contains(&den) {
        return Err(cur.err(ParseErrorKind::OutOfRange("timesig".into(), token.to_string())));
    }
    Ok((num, den))
}

fn cmd_timesig(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let first = cur.require("timesig")?;
    let (num, den) = if first.contains('/') {
        parse_timesig_token(cur, first)?
    } else {
        let second = cur.require("timesig")?;
        parse_timesig_token(cur, &format!("{first}/{second}"))?
    };
    program.time_sig_num = num;
    program.time_sig_den = den;
    for i in 1..=MAX_SECTIONS {
        program.time_sig_num_map[i] = num;
        program.time_sig_den_map[i] = den;
    }
    Ok(())
}

fn cmd_timesig_enforce(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let tok = cur.require("timesig_enforce")?;
    program.time_sig_enforce = match tok {
        "on" | "true" | "1" => true,
        "off" | "false" | "0" => false,
        _ => return Err(cur.err(ParseErrorKind::UnknownOption(tok.to_string(), "timesig_enforce".into()))),
    };
    Ok(())
}

fn cmd_timesig_map(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let list = cur.require("timesig_map")?;
    for entry in list.split(|c: char| c.is_whitespace() || c == ',').filter(|s| !s.is_empty()) {
        let (key, val) = entry
            .split_once('=')
            .ok_or_else(|| cur.err(ParseErrorKind::MissingArgument("timesig_map key=value".into())))?;
        let (num, den) = parse_timesig_token(cur, val)?;
        for idx in resolve_section_key(cur, "timesig_map", key)? {
            program.time_sig_num_map[idx] = num;
            program.time_sig_den_map[idx] = den;
        }
    }
    Ok(())
}

fn cmd_root(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let tok = cur.require("root")?;
    let midi = parse_note_name(tok).ok_or_else(|| cur.err(ParseErrorKind::InvalidNote(tok.to_string())))?;
    program.root_midi = midi as f32;
    Ok(())
}

fn cmd_maqam(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let tok = cur.require("maqam")?;
    if let Some(table) = maqam_cents(tok) {
        program.maqam_offsets = table;
    }
    Ok(())
}

fn cmd_drone(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    if program.drones.len() >= MAX_DRONES {
        return Err(cur.err(ParseErrorKind::CapacityExceeded("drones", MAX_DRONES)));
    }
    let synth = cur.require("drone")?.to_string();
    let note = cur.require("drone")?;
    let midi = match parse_degree_token(note, program.root_midi, &program.maqam_offsets) {
        Ok(Some(d)) => d.midi,
        _ => parse_note_name(note)
            .map(|m| m as f32)
            .ok_or_else(|| cur.err(ParseErrorKind::InvalidNote(note.to_string())))?,
    };
    let synth_index = program
        .find_synth(&synth)
        .ok_or_else(|| cur.err(ParseErrorKind::UndefinedSynth(synth.clone())))?;
    program.drones.push(DroneDef { synth_index, midi });
    Ok(())
}

fn cmd_amp(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let tok = cur.require("amp")?;
    program.master_amp = parse_f32(cur, "amp", tok)?;
    Ok(())
}

fn cmd_synth(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    if program.synths.len() >= MAX_SYNTHS {
        return Err(cur.err(ParseErrorKind::CapacityExceeded("synths", MAX_SYNTHS)));
    }
    let name = cur.require("synth")?.to_string();
    let type_token = cur.require("synth")?;
    let synth_type = parse_synth_type(type_token)
        .ok_or_else(|| cur.err(ParseErrorKind::UnknownOption(type_token.to_string(), "synth".into())))?;
    program.synths.push(SynthDef::new(name, synth_type));
    Ok(())
}

fn cmd_set(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let name = cur.require("set")?.to_string();
    let param = cur.require("set")?.to_string();
    let value_tok = cur.require("set")?;
    let value = parse_f32(cur, "set", value_tok)?;
    let idx = program
        .find_synth(&name)
        .ok_or_else(|| cur.err(ParseErrorKind::UndefinedSynth(name.clone())))?;
    let synth = &mut program.synths[idx];
    match param.as_str() {
        "amp" => synth.amp = value,
        "cutoff" => synth.cutoff = value,
        "res" => synth.res = value,
        "atk" => synth.atk = value,
        "dec" => synth.dec = value,
        "sus" => synth.sus = value,
        "rel" => synth.rel = value,
        "feedback" => synth.comb_feedback = value,
        "damp" => synth.comb_damp = value,
        "excite" => synth.comb_excite = value,
        _ => return Err(cur.err(ParseErrorKind::UnknownOption(param, "set".into()))),
    }
    Ok(())
}

fn cmd_mod(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let synth_name = cur.require("mod")?.to_string();
    let dest_tok = cur.require("mod")?;
    let dest = match dest_tok {
        "amp" => ModDest::Amp,
        "cutoff" => ModDest::Cutoff,
        "res" => ModDest::Res,
        "pan" => ModDest::Pan,
        "pitch" => ModDest::Pitch,
        _ => return Err(cur.err(ParseErrorKind::UnknownOption(dest_tok.to_string(), "mod dest".into()))),
    };
    let src_tok = cur.require("mod")?;
    let source = match src_tok {
        "lfo" => ModSource::Lfo,
        "env" => ModSource::Env,
        "noise" => ModSource::Noise,
        "sample_hold" | "s&h" => ModSource::SampleHold,
        "ring" => ModSource::Ring,
        "sync" => ModSource::Sync,
        _ => return Err(cur.err(ParseErrorKind::UnknownOption(src_tok.to_string(), "mod source".into()))),
    };
    let rate = parse_f32(cur, "mod", cur.require("mod")?)?;
    let depth = parse_f32(cur, "mod", cur.require("mod")?)?;
    let mut offset = 0.0;
    let mut lag_ms = 0.0;
    let mut slew_ms = 0.0;
    if let Some(t) = cur.next() {
        offset = parse_f32(cur, "mod", t)?;
        if let Some(t) = cur.next() {
            lag_ms = parse_f32(cur, "mod", t)?;
            if let Some(t) = cur.next() {
                slew_ms = parse_f32(cur, "mod", t)?;
            }
        }
    }

    let idx = program
        .find_synth(&synth_name)
        .ok_or_else(|| cur.err(ParseErrorKind::UndefinedSynth(synth_name.clone())))?;
    let synth = &mut program.synths[idx];
    if synth.mods.len() >= MAX_MODS_PER_SYNTH {
        return Err(cur.err(ParseErrorKind::CapacityExceeded("mods", MAX_MODS_PER_SYNTH)));
    }
    synth.mods.push(ModDef {
        source,
        dest,
        rate,
        depth,
        offset,
        lag_ms,
        slew_ms,
    });
    Ok(())
}

fn cmd_pattern(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    if program.patterns.len() >= MAX_PATTERNS {
        return Err(cur.err(ParseErrorKind::CapacityExceeded("patterns", MAX_PATTERNS)));
    }
    let name = cur.require("pattern")?.to_string();
    // The body may arrive as one token (wrapped in quotes or parens by the
    // lexer) or as several raw tokens when a bracket list is written bare,
    // e.g. `pattern p [60, 62, 64] 3`. Rejoin so both spellings reach
    // `parse_pattern` as a single string.
    let mut body = cur.require("pattern")?.to_string();
    while let Some(tok) = cur.next() {
        body.push(' ');
        body.push_str(tok);
    }
    let steps = parse_pattern(&body, program.root_midi, &program.maqam_offsets, cur.line)?;
    if steps.len() > MAX_PATTERN_STEPS {
        return Err(cur.err(ParseErrorKind::CapacityExceeded("pattern steps", MAX_PATTERN_STEPS)));
    }
    let mut pattern = PatternDef { name, steps };
    pad_pattern_to_timesig(&mut pattern, program.time_sig_num, program.time_sig_den, program.time_sig_enforce);
    if pattern.steps.len() > MAX_PATTERN_STEPS {
        return Err(cur.err(ParseErrorKind::CapacityExceeded("pattern steps", MAX_PATTERN_STEPS)));
    }
    program.patterns.push(pattern);
    Ok(())
}

fn cmd_accent(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    let name = cur.require("accent")?.to_string();
    // As with `pattern`, the mask may be one grouped token or several bare
    // ones (`accent p 1 0 1`); rejoin before splitting it back apart.
    let mut mask = cur.require("accent")?.to_string();
    while let Some(tok) = cur.next() {
        mask.push(' ');
        mask.push_str(tok);
    }
    let idx = program
        .find_pattern(&name)
        .ok_or_else(|| cur.err(ParseErrorKind::UndefinedPattern(name.clone())))?;
    let tokens: Vec<&str> = mask.split(|c: char| c.is_whitespace() || c == ',').filter(|s| !s.is_empty()).collect();
    let pattern = &mut program.patterns[idx];
    for (i, tok) in tokens.iter().enumerate().take(pattern.steps.len()) {
        pattern.steps[i].accent = matches!(*tok, "1" | "!" | "acc");
    }
    Ok(())
}

fn cmd_sequence(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    if program.sequences.len() >= MAX_SEQUENCES {
        return Err(cur.err(ParseErrorKind::CapacityExceeded("sequences", MAX_SEQUENCES)));
    }
    let name = cur.require("sequence")?.to_string();
    let mut list = cur.require("sequence")?.to_string();
    while let Some(tok) = cur.next() {
        list.push(' ');
        list.push_str(tok);
    }
    let mut steps = Vec::new();
    for tok in list.split(|c: char| c.is_whitespace() || c == ',').filter(|s| !s.is_empty()) {
        if steps.len() >= MAX_SEQUENCE_STEPS {
            return Err(cur.err(ParseErrorKind::CapacityExceeded("sequence steps", MAX_SEQUENCE_STEPS)));
        }
        let (pat, repeat) = match tok.split_once('*') {
            Some((p, r)) => (p, r.parse::<u32>().unwrap_or(1).max(1)),
            None => (tok, 1),
        };
        steps.push(SequenceStep { pattern: pat.to_string(), repeat });
    }
    if steps.is_empty() {
        return Err(cur.err(ParseErrorKind::MissingArgument("sequence".into())));
    }
    program.sequences.push(SequenceDef { name, steps });
    Ok(())
}

/// Shared tail-option loop for `play`/`playseq`. The reference compiler has
/// an `only` branch duplicated verbatim right after the first one; since
/// both arms do the same thing, collapsing to a single `only` arm changes
/// nothing observable.
fn parse_track_options(cur: &mut Cursor, track: &mut TrackDef) -> ParseResult<()> {
    while let Some(token) = cur.next() {
        match token {
            "rev" => track.rev = true,
            "palindrome" => track.palindrome = true,
            "only" => {
                let range = cur.require("only")?;
                let (start, end) = range
                    .split_once('-')
                    .and_then(|(a, b)| Some((a.parse::<i32>().ok()?, b.parse::<i32>().ok()?)))
                    .ok_or_else(|| cur.err(ParseErrorKind::InvalidRange(range.to_string())))?;
                track.seq_start = start;
                track.seq_end = end;
            }
            "orn" | "ornament" => {
                let value = cur.require(token)?;
                let v: f32 = parse_f32(cur, token, value)?;
                track.ornament_prob = v.clamp(0.0, 1.0);
                if let Some(mode) = cur.next() {
                    match mode {
                        "up" => track.ornament_mode = OrnamentMode::Up,
                        "down" => track.ornament_mode = OrnamentMode::Down,
                        "alt" => track.ornament_mode = OrnamentMode::Alternating,
                        _ => cur.pos -= 1,
                    }
                }
            }
            "rate" | "hurry" | "fast" | "slow" | "every" | "density" | "iter" | "chunk" | "stut" | "slide"
            | "acc" => {
                let value = cur.require(token)?;
                match token {
                    "rate" => {
                        track.rate = parse_f32(cur, token, value)?;
                        if track.rate <= 0.0 {
                            return Err(cur.err(ParseErrorKind::OutOfRange("rate".into(), value.to_string())));
                        }
                    }
                    "hurry" => {
                        track.hurry = parse_f32(cur, token, value)?;
                        if track.hurry <= 0.0 {
                            return Err(cur.err(ParseErrorKind::OutOfRange("hurry".into(), value.to_string())));
                        }
                    }
                    "fast" => {
                        track.fast = parse_u32(cur, token, value)?;
                        if track.fast < 1 {
                            return Err(cur.err(ParseErrorKind::OutOfRange("fast".into(), value.to_string())));
                        }
                    }
                    "slow" => {
                        track.slow = parse_u32(cur, token, value)?;
                        if track.slow < 1 {
                            return Err(cur.err(ParseErrorKind::OutOfRange("slow".into(), value.to_string())));
                        }
                    }
                    "every" => {
                        track.every = parse_u32(cur, token, value)?;
                        if track.every < 1 {
                            return Err(cur.err(ParseErrorKind::OutOfRange("every".into(), value.to_string())));
                        }
                    }
                    "density" => {
                        track.density = parse_f32(cur, token, value)?.clamp(0.0, 1.0);
                    }
                    "iter" => {
                        track.iter = parse_u32(cur, token, value)?;
                        if track.iter < 1 {
                            return Err(cur.err(ParseErrorKind::OutOfRange("iter".into(), value.to_string())));
                        }
                    }
                    "chunk" => {
                        let v = parse_i32(cur, token, value)?;
                        if v < 0 {
                            return Err(cur.err(ParseErrorKind::OutOfRange("chunk".into(), value.to_string())));
                        }
                        track.chunk = v as u32;
                    }
                    "stut" => {
                        track.stut = parse_u32(cur, token, value)?;
                        if track.stut < 1 {
                            return Err(cur.err(ParseErrorKind::OutOfRange("stut".into(), value.to_string())));
                        }
                    }
                    "slide" => {
                        track.slide_ms = parse_f32(cur, token, value)?;
                        if track.slide_ms < 0.0 {
                            return Err(cur.err(ParseErrorKind::OutOfRange("slide".into(), value.to_string())));
                        }
                    }
                    "acc" => {
                        track.accent_prob = parse_f32(cur, token, value)?.clamp(0.0, 1.0);
                    }
                    _ => unreachable!(),
                }
            }
            other => return Err(cur.err(ParseErrorKind::UnknownOption(other.to_string(), "play".into()))),
        }
    }
    Ok(())
}

fn cmd_play(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    if program.tracks.len() >= MAX_TRACKS {
        return Err(cur.err(ParseErrorKind::CapacityExceeded("tracks", MAX_TRACKS)));
    }
    let pattern = cur.require("play")?.to_string();
    let synth = cur.require("play")?.to_string();
    let mut track = TrackDef::new(pattern, synth);
    parse_track_options(cur, &mut track)?;
    program.tracks.push(track);
    Ok(())
}

fn cmd_playseq(cur: &mut Cursor, program: &mut Program) -> ParseResult<()> {
    if program.tracks.len() >= MAX_TRACKS {
        return Err(cur.err(ParseErrorKind::CapacityExceeded("tracks", MAX_TRACKS)));
    }
    let seq = cur.require("playseq")?.to_string();
    let synth = cur.require("playseq")?.to_string();
    let mut track = TrackDef::new(seq, synth);
    track.is_sequence = true;
    parse_track_options(cur, &mut track)?;
    program.tracks.push(track);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_script() {
        let script = "tempo 120\nsynth k kick\npattern p (C1 . C1 .)\nplay p k\n";
        let program = parse_script(script).unwrap();
        assert_eq!(program.tempo, 240.0); // default tempo_scale is 2.0
        assert_eq!(program.synths.len(), 1);
        assert_eq!(program.patterns[0].steps.len(), 4);
        assert_eq!(program.tracks.len(), 1);
    }

    #[test]
    fn rejects_script_with_no_play_command() {
        let script = "tempo 120\n";
        let err = parse_script(script).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NoPlayCommand);
    }

    #[test]
    fn rejects_unknown_command() {
        let err = parse_script("bogus 1\n").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnknownCommand(_)));
    }

    #[test]
    fn rejects_reference_to_undefined_synth() {
        let script = "pattern p (C4)\nplay p ghost\n";
        let err = parse_script(script).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UndefinedSynth(_)));
    }

    #[test]
    fn track_options_parse_rate_and_only_range() {
        let script = "synth k kick\npattern p (C1 C1 C1 C1)\nplay p k rate 2 only 2-3\n";
        let program = parse_script(script).unwrap();
        let t = &program.tracks[0];
        assert_eq!(t.rate, 2.0);
        assert_eq!(t.seq_start, 2);
        assert_eq!(t.seq_end, 3);
    }

    #[test]
    fn playseq_marks_track_as_sequence() {
        let script = "synth k kick\npattern a (C1)\npattern b (C2)\nsequence s (a b*2)\nplayseq s k\n";
        let program = parse_script(script).unwrap();
        assert!(program.tracks[0].is_sequence);
        assert_eq!(program.sequences[0].steps[1].repeat, 2);
    }

    #[test]
    fn maqam_command_overwrites_cents_table() {
        let script = "maqam hijaz\nsynth k kick\npattern p (C1)\nplay p k\n";
        let program = parse_script(script).unwrap();
        assert_eq!(program.maqam_offsets, [0.0, 100.0, 400.0, 500.0, 700.0, 800.0, 1100.0]);
    }

    #[test]
    fn unknown_maqam_name_leaves_table_untouched() {
        let script = "maqam not-a-real-mode\nsynth k kick\npattern p (C1)\nplay p k\n";
        let program = parse_script(script).unwrap();
        assert_eq!(program.maqam_offsets, Program::new().maqam_offsets);
    }

    #[test]
    fn accent_mask_sets_accent_flags() {
        let script = "synth k kick\npattern p (C1 C1 C1 C1)\naccent p 1 0 1 0\nplay p k\n";
        let program = parse_script(script).unwrap();
        let steps = &program.patterns[0].steps;
        assert!(steps[0].accent);
        assert!(!steps[1].accent);
        assert!(steps[2].accent);
    }
}
