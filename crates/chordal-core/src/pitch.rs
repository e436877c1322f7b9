//! Absolute pitches, note spelling and scale degrees

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Sub;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChordalError, Result};

/// MIDI note number of A4
pub const A4_MIDI: i32 = 69;
/// Concert pitch of A4 in Hz
pub const A4_HZ: f64 = 440.0;
/// Octave assumed when a note or chord name carries none
pub const DEFAULT_OCTAVE: i32 = 4;
/// Written octaves accepted when parsing
pub const MIN_OCTAVE: i32 = -10;
pub const MAX_OCTAVE: i32 = 10;
/// Longest run of sharps or flats accepted when parsing
pub const MAX_ACCIDENTALS: usize = 4;

/// Semitones from the root for each degree of the major scale
pub const MAJOR_SCALE_OFFSETS: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

const SHARP_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
/// Longest numerals first so `VII` is not read as `V`
const ROMAN_NUMERALS: [(&str, Letter); 7] = [
    ("VII", Letter::B),
    ("III", Letter::E),
    ("II", Letter::D),
    ("IV", Letter::F),
    ("VI", Letter::A),
    ("I", Letter::C),
    ("V", Letter::G),
];
const FLAT_NAMES: [&str; 12] = ["C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B"];

// ============================================================================
// Letters and spelling
// ============================================================================

/// Natural note letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Semitones above C
    pub fn semitone(self) -> i32 {
        MAJOR_SCALE_OFFSETS[self as usize]
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            'E' => Some(Self::E),
            'F' => Some(Self::F),
            'G' => Some(Self::G),
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            _ => None,
        }
    }

    /// Reads a leading upper-case Roman numeral as a degree of C major
    /// (`I` = C, `IV` = F, `VII` = B) and returns the rest
    pub fn parse_roman_prefix(text: &str) -> Option<(Self, &str)> {
        ROMAN_NUMERALS
            .iter()
            .find_map(|&(numeral, letter)| text.strip_prefix(numeral).map(|rest| (letter, rest)))
    }

    pub fn as_char(self) -> char {
        match self {
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
            Self::F => 'F',
            Self::G => 'G',
            Self::A => 'A',
            Self::B => 'B',
        }
    }
}

/// How a pitch class is written: a letter plus sharps (positive) or flats (negative)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spelling {
    pub letter: Letter,
    pub accidental: i8,
}

impl Spelling {
    pub fn new(letter: Letter, accidental: i8) -> Self {
        Self { letter, accidental }
    }

    pub fn pitch_class(self) -> u8 {
        (self.letter.semitone() + self.accidental as i32).rem_euclid(12) as u8
    }

    /// Conventional spelling of a pitch class, using at most one accidental
    pub fn for_pitch_class(pitch_class: u8, prefer_sharp: bool) -> Self {
        let pc = pitch_class % 12;
        let natural = Letter::ALL.iter().find(|l| l.semitone() == pc as i32);
        if let Some(&letter) = natural {
            return Self::new(letter, 0);
        }
        if prefer_sharp {
            let letter = Letter::ALL
                .iter()
                .copied()
                .find(|l| l.semitone() == pc as i32 - 1)
                .unwrap_or(Letter::C);
            Self::new(letter, 1)
        } else {
            let letter = Letter::ALL
                .iter()
                .copied()
                .find(|l| l.semitone() == pc as i32 + 1)
                .unwrap_or(Letter::B);
            Self::new(letter, -1)
        }
    }

    /// Parses a leading note spelling (letter or Roman numeral followed by a
    /// `#`/`b` run) and returns the rest
    pub fn parse_prefix(text: &str) -> Option<(Self, &str)> {
        let (letter, rest) = match text.chars().next().and_then(Letter::from_char) {
            Some(letter) => (letter, &text[1..]),
            None => Letter::parse_roman_prefix(text)?,
        };
        let (symbol, sign) = if rest.starts_with('#') { ('#', 1) } else { ('b', -1) };
        let count = rest.len() - rest.trim_start_matches(symbol).len();
        if count > MAX_ACCIDENTALS {
            return None;
        }
        Some((Self::new(letter, sign * count as i8), &rest[count..]))
    }

    fn prefers_sharp(self) -> bool {
        self.accidental >= 0
    }
}

impl fmt::Display for Spelling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter.as_char())?;
        let symbol = if self.accidental > 0 { "#" } else { "b" };
        for _ in 0..self.accidental.unsigned_abs() {
            f.write_str(symbol)?;
        }
        Ok(())
    }
}

impl FromStr for Spelling {
    type Err = ChordalError;

    fn from_str(s: &str) -> Result<Self> {
        match Self::parse_prefix(s) {
            Some((spelling, "")) => Ok(spelling),
            _ => Err(ChordalError::InvalidNote(s.to_string())),
        }
    }
}

// ============================================================================
// Note
// ============================================================================

/// An absolute pitch. Identity (equality, ordering, hashing) is the MIDI note
/// number alone, so enharmonic spellings of the same pitch compare equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Note {
    midi: i32,
    spelling: Spelling,
}

impl Note {
    /// A spelled note in a written octave; `B#4` is the same pitch as `C5`
    pub fn new(spelling: Spelling, octave: i32) -> Self {
        let midi = 12 * (octave + 1) + spelling.letter.semitone() + spelling.accidental as i32;
        Self { midi, spelling }
    }

    /// Like [`Note::new`], rejecting octaves outside `MIN_OCTAVE..=MAX_OCTAVE`
    pub fn try_new(spelling: Spelling, octave: i32) -> Result<Self> {
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
            return Err(ChordalError::InvalidNote(format!("{spelling}{octave}: octave out of range")));
        }
        Ok(Self::new(spelling, octave))
    }

    pub fn from_pitch_class(pitch_class: u8, octave: i32) -> Result<Self> {
        if pitch_class > 11 {
            return Err(ChordalError::InvalidNote(format!("pitch class {pitch_class}")));
        }
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
            return Err(ChordalError::InvalidNote(format!("octave {octave} out of range")));
        }
        Ok(Self::from_midi(12 * (octave + 1) + pitch_class as i32))
    }

    /// Note from an absolute semitone index (MIDI numbering, 60 = C4), spelled with sharps
    pub fn from_midi(midi: i32) -> Self {
        Self::from_midi_spelled(midi, true)
    }

    pub fn from_midi_spelled(midi: i32, prefer_sharp: bool) -> Self {
        let pc = midi.rem_euclid(12) as u8;
        Self { midi, spelling: Spelling::for_pitch_class(pc, prefer_sharp) }
    }

    /// Parses a spelled note with an optional octave, e.g. `C#4`, `Db`, `Bb-1`
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || ChordalError::InvalidNote(text.to_string());
        let (spelling, rest) = Spelling::parse_prefix(text).ok_or_else(invalid)?;
        let octave = if rest.is_empty() {
            DEFAULT_OCTAVE
        } else {
            rest.parse::<i32>().map_err(|_| invalid())?
        };
        Self::try_new(spelling, octave).map_err(|_| invalid())
    }

    pub fn midi(&self) -> i32 {
        self.midi
    }

    pub fn pitch_class(&self) -> u8 {
        self.midi.rem_euclid(12) as u8
    }

    /// Octave of the sounding pitch (C-based)
    pub fn octave(&self) -> i32 {
        self.midi.div_euclid(12) - 1
    }

    /// Octave as written with this note's spelling (`B#4` is written in octave 4)
    pub fn written_octave(&self) -> i32 {
        (self.midi - self.spelling.letter.semitone() - self.spelling.accidental as i32).div_euclid(12) - 1
    }

    pub fn spelling(&self) -> Spelling {
        self.spelling
    }

    /// Spelled name without octave
    pub fn name(&self) -> String {
        self.spelling.to_string()
    }

    pub fn pitch_class_name(&self, prefer_sharp: bool) -> &'static str {
        let pc = self.pitch_class() as usize;
        if prefer_sharp { SHARP_NAMES[pc] } else { FLAT_NAMES[pc] }
    }

    /// Same pitch, different spelling
    pub fn respelled(&self, spelling: Spelling) -> Result<Self> {
        if spelling.pitch_class() != self.pitch_class() {
            return Err(ChordalError::InvalidNote(format!("{spelling} is not a spelling of {self}")));
        }
        Ok(Self { midi: self.midi, spelling })
    }

    /// The closest note with this spelling that lies strictly below `other`
    pub fn placed_below(&self, other: &Note) -> Self {
        let gap = (other.midi - self.midi).rem_euclid(12);
        let gap = if gap == 0 { 12 } else { gap };
        Self { midi: other.midi - gap, spelling: self.spelling }
    }

    /// Shift by a signed number of semitones. Sharp/flat preference of the spelling is kept.
    pub fn transpose(&self, semitones: i32) -> Self {
        if semitones == 0 {
            return *self;
        }
        Self::from_midi_spelled(self.midi + semitones, self.spelling.prefers_sharp())
    }

    /// Shift by a scale degree measured against the major scale
    pub fn transpose_degree(&self, degree: Degree, down: bool) -> Self {
        let shift = degree.semitones();
        self.transpose(if down { -shift } else { shift })
    }

    /// Equal-tempered frequency relative to A4 = 440 Hz
    pub fn frequency_hz(&self) -> f64 {
        A4_HZ * 2f64.powf((self.midi - A4_MIDI) as f64 / 12.0)
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.midi == other.midi
    }
}

impl Eq for Note {}

impl Hash for Note {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.midi.hash(state);
    }
}

impl PartialOrd for Note {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Note {
    fn cmp(&self, other: &Self) -> Ordering {
        self.midi.cmp(&other.midi)
    }
}

impl Sub for Note {
    type Output = i32;

    /// Semitones between two notes
    fn sub(self, other: Self) -> i32 {
        self.midi - other.midi
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.spelling, self.written_octave())
    }
}

impl FromStr for Note {
    type Err = ChordalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ============================================================================
// Scale degrees
// ============================================================================

/// A scale degree (1..=13) with an explicit accidental, e.g. `b9` or `#11`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Degree {
    number: u8,
    accidental: i8,
}

impl Degree {
    pub const MAX: u8 = 13;

    pub fn new(number: u8, accidental: i8) -> Result<Self> {
        if !(1..=Self::MAX).contains(&number) {
            return Err(ChordalError::InvalidDegree(format!("degree {number} out of range 1..={}", Self::MAX)));
        }
        Ok(Self { number, accidental })
    }

    pub fn natural(number: u8) -> Result<Self> {
        Self::new(number, 0)
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn accidental(&self) -> i8 {
        self.accidental
    }

    /// Semitones above the root; degrees above 7 are counted in the next octave
    pub fn semitones(&self) -> i32 {
        let (base, octave) = if self.number > 7 { (self.number - 7, 12) } else { (self.number, 0) };
        MAJOR_SCALE_OFFSETS[(base - 1) as usize] + octave + self.accidental as i32
    }

    /// Degree spellings reaching `semitone`, most reasonable first:
    /// fewer accidentals first, flats before sharps at equal count.
    pub fn options_for_semitone(semitone: i32, max_accidentals: u8) -> Vec<Degree> {
        let mut options: Vec<(u8, Degree)> = Vec::new();
        for number in 1..=Self::MAX {
            let natural = Degree { number, accidental: 0 }.semitones();
            for n in 0..=max_accidentals {
                let acc = n as i8;
                if semitone == natural - acc as i32 {
                    options.push((n * 2, Degree { number, accidental: -acc }));
                }
                if n > 0 && semitone == natural + acc as i32 {
                    options.push((n * 2 + 1, Degree { number, accidental: acc }));
                }
            }
        }
        options.sort_by_key(|(priority, _)| *priority);
        options.into_iter().map(|(_, degree)| degree).collect()
    }
}

impl fmt::Display for Degree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = if self.accidental > 0 { "#" } else { "b" };
        for _ in 0..self.accidental.unsigned_abs() {
            f.write_str(symbol)?;
        }
        write!(f, "{}", self.number)
    }
}

impl FromStr for Degree {
    type Err = ChordalError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ChordalError::InvalidDegree(s.to_string());
        let flats = s.chars().take_while(|&c| c == 'b').count();
        let sharps = s.chars().take_while(|&c| c == '#').count();
        if flats + sharps > MAX_ACCIDENTALS {
            return Err(invalid());
        }
        let digits = &s[flats + sharps..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let number: u8 = digits.parse().map_err(|_| invalid())?;
        let accidental = sharps as i8 - flats as i8;
        Self::new(number, accidental).map_err(|_| invalid())
    }
}
