//! Chord names: parsing symbols into chords and inferring the shortest name for a chord
//!
//! Grammar, in order:
//!
//! ```text
//! [octave] root [quality | "[" offsets "]"] modifier* ["/" bass]
//! ```
//!
//! * `octave` is an optional signed integer (`4C`, `+3Fm`, `-2G7`), default 4
//! * `root` is a letter or an upper-case Roman numeral read in C major
//!   (`IVmaj7` is `Fmaj7`), followed by sharps or flats
//! * `quality` is a template symbol or alias (`m7`, `maj9`, `ø`, ...), default major
//! * `modifier` is one of `addN`, `noN`, `sus2`, `sus4`, `invN` or an alteration
//!   such as `b9` or `#11`, optionally wrapped in parentheses: `C7(no5)`

use tracing::debug;

use crate::chord::Chord;
use crate::error::{ChordalError, Result};
use crate::intervals::IntervalSet;
use crate::knowledge::{degree_family, family_of, ChordQuality};
use crate::pitch::{Degree, Note, Spelling, DEFAULT_OCTAVE};

// ============================================================================
// Parsing
// ============================================================================

/// Parses a chord name
pub fn parse(name: &str) -> Result<Chord> {
    let text = name.trim();
    let invalid = |why: &str| ChordalError::InvalidChord(format!("{name:?}: {why}"));

    let (octave, rest) = split_octave(text).ok_or_else(|| invalid("malformed octave prefix"))?;
    let (spelling, rest) = Spelling::parse_prefix(rest).ok_or_else(|| invalid("missing or malformed root note"))?;
    let root = Note::try_new(spelling, octave).map_err(|_| invalid("octave out of range"))?;

    let (body, bass) = match rest.find('/') {
        Some(i) if !rest.starts_with("6/9") || i != 1 => split_bass(rest, i),
        _ => split_bass_after_six_nine(rest),
    };

    let (intervals, inversion) = parse_body(body).ok_or_else(|| invalid("unrecognized chord suffix"))?;

    let mut chord = Chord::new(root, intervals).with_inversion(inversion);
    if let Some(bass) = bass {
        let bass: Spelling = bass.parse().map_err(|_| invalid("malformed slash bass"))?;
        chord = chord.with_bass(Note::new(bass, octave));
    }
    Ok(chord.with_name(text))
}

fn split_bass(rest: &str, slash: usize) -> (&str, Option<&str>) {
    (&rest[..slash], Some(&rest[slash + 1..]))
}

/// `6/9` is a quality, not a slash chord; look for a bass after it
fn split_bass_after_six_nine(rest: &str) -> (&str, Option<&str>) {
    match rest.get(3..).and_then(|tail| tail.find('/')) {
        Some(i) => split_bass(rest, i + 3),
        None => (rest, None),
    }
}

fn split_octave(text: &str) -> Option<(i32, &str)> {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let digits = unsigned.len() - unsigned.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let sign_len = text.len() - unsigned.len();
    if digits == 0 {
        return if sign_len == 0 { Some((DEFAULT_OCTAVE, text)) } else { None };
    }
    let octave = text[..sign_len + digits].parse().ok()?;
    Some((octave, &text[sign_len + digits..]))
}

/// Quality and modifiers. Tries every quality token that prefixes the text,
/// longest first, then the implicit major; the first reading that consumes
/// everything wins.
fn parse_body(body: &str) -> Option<(IntervalSet, usize)> {
    if let Some(raw) = body.strip_prefix('[') {
        let end = raw.find(']')?;
        let semitones = raw[..end]
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<i32>().ok())
            .collect::<Option<Vec<_>>>()?;
        let base = IntervalSet::from_semitones(&semitones).ok()?;
        return apply_modifiers(base, &raw[end + 1..]);
    }

    let mut candidates: Vec<(&str, ChordQuality)> = ChordQuality::tokens()
        .filter(|(token, _)| body.starts_with(token))
        .collect();
    candidates.sort_by_key(|(token, _)| std::cmp::Reverse(token.len()));

    candidates
        .into_iter()
        .map(|(token, quality)| (&body[token.len()..], quality))
        .chain(std::iter::once((body, ChordQuality::Major)))
        .find_map(|(modifiers, quality)| {
            let base = IntervalSet::from_semitones(quality.intervals()).ok()?;
            apply_modifiers(base, modifiers)
        })
}

fn apply_modifiers(mut set: IntervalSet, mut text: &str) -> Option<(IntervalSet, usize)> {
    let mut inversion = 0;
    let mut open = false;

    while !text.is_empty() {
        if let Some(rest) = text.strip_prefix('(') {
            if open {
                return None;
            }
            open = true;
            text = rest;
        } else if let Some(rest) = text.strip_prefix(')') {
            if !open {
                return None;
            }
            open = false;
            text = rest;
        } else if let Some(rest) = text.strip_prefix("add") {
            let (degree, rest) = take_degree(rest)?;
            set = set.add_semitone(degree.semitones()).ok()?;
            text = rest;
        } else if let Some(rest) = text.strip_prefix("no") {
            let (number, rest) = take_number(rest)?;
            set = remove_family(&set, number)?;
            text = rest;
        } else if let Some(rest) = text.strip_prefix("sus") {
            let (number, rest) = take_number(rest)?;
            let suspended = match number {
                2 => 2,
                4 => 5,
                _ => return None,
            };
            set = without(&set, &[3, 4]).add_semitone(suspended).ok()?;
            text = rest;
        } else if let Some(rest) = text.strip_prefix("inv") {
            let (number, rest) = take_number(rest)?;
            inversion = number as usize;
            text = rest;
        } else if text.starts_with(['b', '#']) {
            let (degree, rest) = take_degree(text)?;
            set = alter(&set, degree)?;
            text = rest;
        } else {
            return None;
        }
    }

    if open {
        return None;
    }
    Some((set, inversion))
}

fn take_number(text: &str) -> Option<(u8, &str)> {
    let end = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    if end == 0 {
        return None;
    }
    Some((text[..end].parse().ok()?, &text[end..]))
}

fn take_degree(text: &str) -> Option<(Degree, &str)> {
    let accidentals = text.len() - text.trim_start_matches(['b', '#']).len();
    let (_, rest) = take_number(&text[accidentals..])?;
    let end = text.len() - rest.len();
    Some((text[..end].parse().ok()?, rest))
}

fn without(set: &IntervalSet, semitones: &[i32]) -> IntervalSet {
    let kept: Vec<i32> = set.offsets().iter().copied().filter(|s| !semitones.contains(s)).collect();
    IntervalSet::from_semitones(&kept).unwrap_or_default()
}

fn remove_family(set: &IntervalSet, number: u8) -> Option<IntervalSet> {
    let family = degree_family(number);
    if family.is_empty() {
        return None;
    }
    Some(without(set, family))
}

fn has_family(set: &IntervalSet, number: u8) -> bool {
    degree_family(number).iter().any(|&s| set.contains(s))
}

/// Replaces every variant of the degree with the altered tone. Altering an 11th
/// or 13th fills in the lower extensions the chord does not have yet.
fn alter(set: &IntervalSet, degree: Degree) -> Option<IntervalSet> {
    let number = degree.number();
    if degree.accidental() == 0 || !matches!(number, 5 | 9 | 11 | 13) {
        return None;
    }
    let mut altered = without(set, degree_family(number));
    for lower in [9u8, 11] {
        if lower < number && number >= 11 && !has_family(&altered, lower) {
            altered = altered.add_semitone(degree_family(lower)[0]).ok()?;
        }
    }
    altered.add_semitone(degree.semitones()).ok()
}

// ============================================================================
// Name inference
// ============================================================================

/// A template plus the modifier tokens turning it into the chord. Each token
/// carries the extension number it appends (0 for removals and suspensions).
#[derive(Debug, Clone)]
struct Candidate {
    quality: ChordQuality,
    tokens: Vec<(String, u8)>,
}

impl Candidate {
    fn score(&self) -> (usize, u32, usize) {
        let extensions = self.tokens.iter().map(|(_, n)| *n as u32).sum();
        (self.tokens.len(), extensions, self.quality.rank())
    }

    fn suffix(&self, implicit_zero: bool) -> String {
        let mut suffix = String::new();
        if !(implicit_zero && self.quality == ChordQuality::Major) {
            suffix.push_str(self.quality.symbol());
        }
        for (token, _) in &self.tokens {
            suffix.push_str(token);
        }
        suffix
    }
}

/// Shortest conventional name that parses back to the same root, intervals,
/// inversion and bass. `implicit_zero` writes a bare major triad as just the root.
pub fn infer_name(chord: &Chord, implicit_zero: bool) -> String {
    let root = chord.root().name();
    let mut tail = String::new();
    if chord.inversion() > 0 {
        tail.push_str(&format!("inv{}", chord.inversion()));
    }
    if let Some(bass) = chord.bass() {
        tail.push('/');
        tail.push_str(&bass.name());
    }

    let mut candidates: Vec<Candidate> = ChordQuality::ALL
        .iter()
        .flat_map(|&quality| candidates_for(quality, chord.intervals()))
        .collect();
    candidates.sort_by_key(Candidate::score);

    for candidate in &candidates {
        let mut spellings = vec![candidate.suffix(implicit_zero)];
        if implicit_zero && candidate.quality == ChordQuality::Major {
            spellings.push(candidate.suffix(false));
        }
        for suffix in spellings {
            let name = format!("{root}{suffix}{tail}");
            if names_chord(&name, chord) {
                return name;
            }
        }
    }

    let raw: Vec<String> = chord.intervals().offsets().iter().map(i32::to_string).collect();
    let name = format!("{root}[{}]{tail}", raw.join(","));
    debug!(%name, "no template names chord, using raw offsets");
    name
}

fn names_chord(name: &str, chord: &Chord) -> bool {
    parse(name).is_ok_and(|parsed| {
        parsed.root().pitch_class() == chord.root().pitch_class()
            && parsed.intervals() == chord.intervals()
            && parsed.inversion() == chord.inversion()
            && parsed.bass().map(|b| b.pitch_class()) == chord.bass().map(|b| b.pitch_class())
    })
}

/// Modifier readings of `set` relative to one template: a compact one using
/// suspensions, alterations and removals, and one that only adds tones.
fn candidates_for(quality: ChordQuality, set: &IntervalSet) -> Vec<Candidate> {
    let template = quality.intervals();
    let missing: Vec<i32> = template.iter().copied().filter(|s| !set.contains(*s)).collect();
    let extra: Vec<i32> = set.offsets().iter().copied().filter(|s| !template.contains(s)).collect();

    let mut out = Vec::new();
    if let Some(tokens) = compact_tokens(&missing, &extra) {
        out.push(Candidate { quality, tokens });
    }
    if !extra.is_empty() {
        if let Some(mut tokens) = removal_tokens(&missing) {
            if let Some(adds) = add_tokens(&extra) {
                tokens.extend(adds);
                out.push(Candidate { quality, tokens });
            }
        }
    }
    out
}

fn compact_tokens(missing: &[i32], extra: &[i32]) -> Option<Vec<(String, u8)>> {
    let mut missing = missing.to_vec();
    let mut extra = extra.to_vec();
    let mut tokens = Vec::new();

    let third = missing.iter().position(|&s| s == 3 || s == 4);
    let suspension = extra.iter().position(|&s| s == 2 || s == 5);
    if let (Some(t), Some(s)) = (third, suspension) {
        let number = if extra[s] == 2 { 2 } else { 4 };
        tokens.push((format!("sus{number}"), 0));
        missing.remove(t);
        extra.remove(s);
    }

    for (natural, number) in [(7, 5u8), (14, 9), (17, 11), (21, 13)] {
        let Some(m) = missing.iter().position(|&s| s == natural) else { continue };
        for (shift, symbol) in [(-1, "b"), (1, "#")] {
            if let Some(e) = extra.iter().position(|&s| s == natural + shift) {
                tokens.push((format!("{symbol}{number}"), number));
                missing.remove(m);
                extra.remove(e);
                break;
            }
        }
    }

    tokens.extend(removal_tokens(&missing)?);

    for &s in &extra {
        match s {
            13 => tokens.push(("b9".to_string(), 9)),
            15 => tokens.push(("#9".to_string(), 9)),
            _ => tokens.extend(add_tokens(&[s])?),
        }
    }
    Some(tokens)
}

fn removal_tokens(missing: &[i32]) -> Option<Vec<(String, u8)>> {
    let mut numbers: Vec<u8> = missing.iter().map(|&s| family_of(s)).collect::<Option<_>>()?;
    numbers.sort_unstable();
    numbers.dedup();
    Some(numbers.into_iter().map(|n| (format!("no{n}"), 0)).collect())
}

fn add_tokens(extra: &[i32]) -> Option<Vec<(String, u8)>> {
    extra
        .iter()
        .map(|&s| {
            let degree = Degree::options_for_semitone(s, 1).into_iter().next()?;
            Some((format!("add{degree}"), degree.number()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(name: &str) -> Vec<i32> {
        parse(name).unwrap().intervals().offsets().to_vec()
    }

    fn name_of(root: &str, semitones: &[i32]) -> String {
        let chord = Chord::from_semitones(root.parse().unwrap(), semitones).unwrap();
        infer_name(&chord, true)
    }

    #[test]
    fn test_parse_fm7() {
        let chord = parse("Fm7").unwrap();
        assert_eq!(chord.root().name(), "F");
        assert_eq!(chord.intervals().semitones(), vec![0, 3, 7, 10]);
        assert_eq!(infer_name(&chord, true), "Fm7");
    }

    #[test]
    fn test_parse_qualities_and_aliases() {
        let cases: &[(&str, &[i32])] = &[
            ("C", &[4, 7]),
            ("Cmajor", &[4, 7]),
            ("Cminor", &[3, 7]),
            ("C-", &[3, 7]),
            ("Cm", &[3, 7]),
            ("Csus2", &[2, 7]),
            ("Csus4", &[5, 7]),
            ("C7sus4", &[5, 7, 10]),
            ("Cmajor7", &[4, 7, 11]),
            ("Cm7b5", &[3, 6, 10]),
            ("Cmin7b5", &[3, 6, 10]),
            ("Cø", &[3, 6, 10]),
            ("Co", &[3, 6, 9]),
            ("C69", &[4, 7, 9, 14]),
            ("C6/9", &[4, 7, 9, 14]),
            ("C13", &[4, 7, 10, 14, 17, 21]),
            ("Cn", &[]),
            ("Cnote", &[]),
            ("C5", &[7]),
        ];
        for (name, expected) in cases {
            assert_eq!(offsets(name), *expected, "{name}");
        }
    }

    #[test]
    fn test_parse_modifiers() {
        let cases: &[(&str, &[i32])] = &[
            ("Caugsus2", &[2, 8]),
            ("C7#9", &[4, 7, 10, 15]),
            ("C7b9", &[4, 7, 10, 13]),
            ("C7b11", &[4, 7, 10, 14, 16]),
            ("C7#11", &[4, 7, 10, 14, 18]),
            ("C7b13", &[4, 7, 10, 14, 17, 20]),
            ("C7#13", &[4, 7, 10, 14, 17, 22]),
            ("Caddb9", &[4, 7, 13]),
            ("Cadd#9", &[4, 7, 15]),
            ("Cadd11", &[4, 7, 17]),
            ("Cadd#11", &[4, 7, 18]),
            ("Cadd13", &[4, 7, 21]),
            ("C7(no5)", &[4, 10]),
            ("C7no3", &[7, 10]),
            ("Cno5", &[4]),
            ("Cm7sus4", &[5, 7, 10]),
            ("C13b11#9no5no7", &[4, 15, 16, 21]),
            ("C[3,7,10]", &[3, 7, 10]),
            ("C[]", &[]),
        ];
        for (name, expected) in cases {
            assert_eq!(offsets(name), *expected, "{name}");
        }
    }

    #[test]
    fn test_parse_root_octave_and_bass() {
        let chord = parse("+3Fm").unwrap();
        assert_eq!(chord.root().midi(), 53);
        assert_eq!(parse("-1C").unwrap().root().midi(), 0);
        assert_eq!(parse("Db7").unwrap().root().midi(), 61);

        let slash = parse("C/E").unwrap();
        assert_eq!(slash.bass().map(|b| b.midi()), Some(52));
        assert_eq!(slash.intervals().offsets(), &[4, 7]);

        let six_nine = parse("C6/9/G").unwrap();
        assert_eq!(six_nine.intervals().offsets(), &[4, 7, 9, 14]);
        assert_eq!(six_nine.bass().map(|b| b.name()), Some("G".to_string()));

        assert_eq!(parse("C/C").unwrap().bass(), None);
    }

    #[test]
    fn test_parse_inversion() {
        assert_eq!(parse("Cinv1").unwrap().inversion(), 1);
        assert_eq!(parse("Cinv4").unwrap().inversion(), 1);
        assert_eq!(parse("Cinv3").unwrap().inversion(), 0);
        assert_eq!(parse("Cmaj7inv2").unwrap().midi(), vec![67, 71, 72, 76]);
    }

    #[test]
    fn test_parse_errors() {
        for name in [
            "", "H7", "Cxyz", "C/", "C/H", "C7/E/G", "C(no5", "Cno5)", "Cadd", "Cno1", "Csus3",
            "C[1,a]", "C[-3]", "+C", "Cb99", "Cinv",
        ] {
            assert!(matches!(parse(name), Err(ChordalError::InvalidChord(_))), "{name:?}");
        }
    }

    #[test]
    fn test_parse_roman_numeral_roots() {
        assert_eq!(parse("IVmaj7").unwrap().midi(), parse("Fmaj7").unwrap().midi());
        assert_eq!(parse("VIIm7b5").unwrap().midi(), parse("Bm7b5").unwrap().midi());
        assert_eq!(parse("V7/II").unwrap().bass(), parse("G7/D").unwrap().bass());
        assert_eq!(parse("IIIbm").unwrap().root().midi(), 63);
        assert_eq!(parse("3VI").unwrap().root().midi(), 57);
        assert_eq!(parse("VI").unwrap().name(), "VI");
        assert!(parse("VIII").is_err());
    }

    #[test]
    fn test_parse_rejects_oversized_input() {
        assert!(matches!(parse("999999999C"), Err(ChordalError::InvalidChord(_))));
        assert!(matches!(parse("99999999999C"), Err(ChordalError::InvalidChord(_))));
        assert!(matches!(parse("11C"), Err(ChordalError::InvalidChord(_))));
        assert!(matches!(parse(&format!("C{}", "b".repeat(129))), Err(ChordalError::InvalidChord(_))));
        assert!(matches!(parse(&format!("C7{}9", "b".repeat(200))), Err(ChordalError::InvalidChord(_))));
        assert!(matches!(parse(&format!("C/E{}", "b".repeat(129))), Err(ChordalError::InvalidChord(_))));
        assert_eq!(parse("-10C").unwrap().root().midi(), -108);
    }

    #[test]
    fn test_infer_exact_templates() {
        assert_eq!(name_of("C", &[4, 7]), "C");
        assert_eq!(name_of("C", &[3, 7]), "Cm");
        assert_eq!(name_of("B", &[3, 6, 10]), "Bm7b5");
        assert_eq!(name_of("C", &[4, 7, 9, 14]), "C69");
        assert_eq!(name_of("C", &[3, 6, 9]), "Cdim7");
        assert_eq!(name_of("C", &[4, 8, 11]), "Caugmaj7");
        assert_eq!(name_of("C", &[5, 7, 10]), "C7sus4");
        assert_eq!(name_of("C", &[]), "Cn");
        assert_eq!(name_of("C", &[7]), "C5");
        assert_eq!(name_of("A", &[4, 7, 10, 14, 17, 21]), "A13");
    }

    #[test]
    fn test_infer_with_modifiers() {
        assert_eq!(name_of("C", &[4, 7, 10, 13]), "C7b9");
        assert_eq!(name_of("C", &[4, 7, 10, 15]), "C7#9");
        assert_eq!(name_of("C", &[4, 10]), "C7no5");
        assert_eq!(name_of("C", &[4, 7, 17]), "Cadd11");
        assert_eq!(name_of("C", &[4, 6, 10]), "C7b5");
        assert_eq!(name_of("C", &[4]), "Cno5");
    }

    #[test]
    fn test_infer_implicit_zero() {
        let chord = parse("C").unwrap();
        assert_eq!(infer_name(&chord, true), "C");
        assert_eq!(infer_name(&chord, false), "Cmaj");
        let flat_five = Chord::from_semitones("C".parse().unwrap(), &[4, 6]).unwrap();
        assert_eq!(infer_name(&flat_five, true), "Cmajb5");
    }

    #[test]
    fn test_infer_raw_fallback() {
        let chord = Chord::from_semitones("C".parse().unwrap(), &[1, 2, 3, 30]).unwrap();
        let name = infer_name(&chord, true);
        assert_eq!(name, "C[1,2,3,30]");
        assert_eq!(parse(&name).unwrap(), chord);
    }

    #[test]
    fn test_infer_inversion_and_bass() {
        assert_eq!(infer_name(&parse("Cmaj7inv2").unwrap(), true), "Cmaj7inv2");
        assert_eq!(infer_name(&parse("Am/G").unwrap(), true), "Am/G");
        assert_eq!(infer_name(&parse("Bb7/Ab").unwrap(), true), "Bb7/Ab");
    }

    #[test]
    fn test_round_trip_over_templates_and_roots() {
        for quality in ChordQuality::ALL {
            for midi in 48..60 {
                let chord = Chord::from_semitones(Note::from_midi(midi), quality.intervals()).unwrap();
                for implicit_zero in [true, false] {
                    let name = infer_name(&chord, implicit_zero);
                    assert_eq!(parse(&name).unwrap(), chord, "{name}");
                }
            }
        }
    }

    #[test]
    fn test_round_trip_arbitrary_sets() {
        let sets: &[&[i32]] = &[
            &[1],
            &[3, 5, 10, 13],
            &[2, 8],
            &[4, 15, 16, 21],
            &[6, 7],
            &[2, 4, 5, 7, 9, 11],
            &[11],
            &[12, 16],
        ];
        for semitones in sets {
            let chord = Chord::from_semitones(Note::from_midi(62), semitones).unwrap();
            let name = infer_name(&chord, true);
            assert_eq!(parse(&name).unwrap(), chord, "{name}");
        }
    }
}
