//! Chord: a root, an interval set, an optional slash bass and an inversion

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChordalError, Result};
use crate::intervals::{IntervalSet, RemovalPolicy};
use crate::knowledge::ChordQuality;
use crate::naming;
use crate::pitch::{Degree, Note};

/// A chord value. Equality and hashing look at the root pitch class, the
/// interval set and the bass pitch class; octave, inversion and the name hint
/// only shape voicing and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chord {
    root: Note,
    intervals: IntervalSet,
    bass: Option<Note>,
    #[serde(default)]
    inversion: usize,
    #[serde(default)]
    name: Option<String>,
}

impl Chord {
    pub fn new(root: Note, intervals: IntervalSet) -> Self {
        Self { root, intervals, bass: None, inversion: 0, name: None }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        naming::parse(name)
    }

    pub fn from_semitones(root: Note, semitones: &[i32]) -> Result<Self> {
        Ok(Self::new(root, IntervalSet::from_semitones(semitones)?))
    }

    pub fn from_degrees(root: Note, degrees: &[Degree]) -> Result<Self> {
        Ok(Self::new(root, IntervalSet::from_degrees(degrees)?))
    }

    /// Offsets may reach below the root: the lowest negative offset becomes
    /// the bass, other negative offsets fold up into the chord by octaves.
    pub fn from_root_and_semitones(root: Note, semitones: &[i32]) -> Result<Self> {
        let lowest = semitones.iter().copied().min().unwrap_or(0);
        let folded: Vec<i32> = semitones
            .iter()
            .filter(|&&s| s >= 0 || s != lowest)
            .map(|&s| if s < 0 { s.rem_euclid(12) } else { s })
            .collect();
        let chord = Self::from_semitones(root, &folded)?;
        if lowest < 0 {
            Ok(chord.with_bass(root.transpose(lowest)))
        } else {
            Ok(chord)
        }
    }

    /// Best reading of a set of sounding MIDI pitches. A root among the pitch
    /// classes that gives an exact template wins, tried from the lowest pitch
    /// upwards; otherwise the lowest pitch is the root. When the chosen root
    /// is not the lowest pitch, the lowest pitch becomes the bass.
    pub fn from_midi(pitches: &[i32]) -> Result<Self> {
        let sorted: BTreeSet<i32> = pitches.iter().copied().collect();
        let Some(&lowest) = sorted.first() else {
            return Err(ChordalError::InvalidChord("no pitches".to_string()));
        };

        let mut roots: Vec<i32> = Vec::new();
        for &p in &sorted {
            if !roots.iter().any(|r| (r - p).rem_euclid(12) == 0) {
                roots.push(p);
            }
        }

        let exact = roots.iter().find_map(|&root| {
            let spread = IntervalSet::from_semitones(&offsets_above(root, &sorted, false)).ok()?;
            let compact = IntervalSet::from_semitones(&offsets_above(root, &sorted, true)).ok()?;
            [spread, compact]
                .into_iter()
                .find(|set| ChordQuality::ALL.iter().any(|q| q.intervals() == set.offsets()))
                .map(|set| (root, set))
        });

        let (root, intervals) = match exact {
            Some(found) => found,
            None => (lowest, IntervalSet::from_semitones(&offsets_above(lowest, &sorted, false))?),
        };
        let chord = Self::new(Note::from_midi(root), intervals);
        if root != lowest {
            Ok(chord.with_bass(Note::from_midi(lowest)))
        } else {
            Ok(chord)
        }
    }

    /// Adds a slash bass, placed below the root. A bass with the root's pitch class is dropped.
    pub fn with_bass(mut self, bass: Note) -> Self {
        self.bass = if bass.pitch_class() == self.root.pitch_class() {
            None
        } else {
            Some(bass.placed_below(&self.root))
        };
        self.name = None;
        self
    }

    pub fn without_bass(mut self) -> Self {
        self.bass = None;
        self.name = None;
        self
    }

    /// Inversion, taken modulo the number of chord tones
    pub fn with_inversion(mut self, inversion: usize) -> Self {
        self.inversion = inversion % self.intervals.tone_count();
        self.name = None;
        self
    }

    /// Display name hint, returned by `name()` instead of an inferred name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn root(&self) -> Note {
        self.root
    }

    pub fn intervals(&self) -> &IntervalSet {
        &self.intervals
    }

    pub fn bass(&self) -> Option<Note> {
        self.bass
    }

    pub fn inversion(&self) -> usize {
        self.inversion
    }

    pub fn name_hint(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The name hint if one is set, otherwise the inferred name
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => naming::infer_name(self, true),
        }
    }

    /// Sounding pitches: the voiced chord tones above the root plus the bass, ascending
    pub fn midi(&self) -> Vec<i32> {
        let root = self.root.midi();
        let mut pitches: Vec<i32> = self.intervals.voiced(self.inversion).into_iter().map(|s| root + s).collect();
        if let Some(bass) = self.bass {
            pitches.push(bass.midi());
        }
        pitches.sort_unstable();
        pitches.dedup();
        pitches
    }

    pub fn notes(&self) -> Vec<Note> {
        self.midi().into_iter().map(Note::from_midi).collect()
    }

    pub fn interval_sequence(&self) -> Vec<i32> {
        self.intervals.interval_sequence()
    }

    /// Root and bass move together; the name hint is dropped
    pub fn transpose(&self, semitones: i32) -> Self {
        Self {
            root: self.root.transpose(semitones),
            intervals: self.intervals.clone(),
            bass: self.bass.map(|b| b.transpose(semitones)),
            inversion: self.inversion,
            name: None,
        }
    }

    /// Moves the voicing `n` inversions. With `recalculate_names` the name is
    /// inferred again (and carries an `invN` suffix); otherwise the current
    /// name is kept and only the sounding pitches change.
    pub fn rotate(&self, n: i32, recalculate_names: bool) -> Self {
        let count = self.intervals.tone_count() as i64;
        let inversion = (self.inversion as i64 + n as i64).rem_euclid(count) as usize;
        let name = if recalculate_names { None } else { Some(self.name()) };
        Self { inversion, name, ..self.clone() }
    }

    pub fn add_semitone(&self, semitone: i32) -> Result<Self> {
        Ok(Self::new(self.root, self.intervals.add_semitone(semitone)?).keep_bass(self.bass))
    }

    pub fn remove_semitone(&self, semitone: i32, policy: RemovalPolicy) -> Result<Self> {
        Ok(Self::new(self.root, self.intervals.remove_semitone(semitone, policy)?).keep_bass(self.bass))
    }

    fn keep_bass(mut self, bass: Option<Note>) -> Self {
        self.bass = bass;
        self
    }
}

/// Offsets of `pitches` above `root`. Pitches below the root fold up by
/// octaves; `compact` folds everything into a single octave.
fn offsets_above(root: i32, pitches: &BTreeSet<i32>, compact: bool) -> Vec<i32> {
    pitches
        .iter()
        .map(|&p| {
            let offset = p - root;
            if compact || offset < 0 { offset.rem_euclid(12) } else { offset }
        })
        .collect()
}

impl PartialEq for Chord {
    fn eq(&self, other: &Self) -> bool {
        self.root.pitch_class() == other.root.pitch_class()
            && self.intervals == other.intervals
            && self.bass.map(|b| b.pitch_class()) == other.bass.map(|b| b.pitch_class())
    }
}

impl Eq for Chord {}

impl Hash for Chord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.pitch_class().hash(state);
        self.intervals.hash(state);
        self.bass.map(|b| b.pitch_class()).hash(state);
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Chord {
    type Err = ChordalError;

    fn from_str(s: &str) -> Result<Self> {
        naming::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord(name: &str) -> Chord {
        name.parse().unwrap()
    }

    fn note(name: &str) -> Note {
        name.parse().unwrap()
    }

    #[test]
    fn test_equality_ignores_octave_spelling_and_inversion() {
        assert_eq!(chord("C#m"), chord("Dbm"));
        assert_eq!(chord("3C7"), chord("C7"));
        assert_eq!(chord("Cinv1"), chord("C"));
        assert_ne!(chord("C"), chord("C/E"));
        assert_ne!(chord("C"), chord("Cm"));
        assert_eq!(chord("C/E"), chord("C/Fb"));
    }

    #[test]
    fn test_constructors() {
        let c = note("C4");
        let from_degrees = Chord::from_degrees(c, &["1".parse().unwrap(), "b3".parse().unwrap(), "5".parse().unwrap()]).unwrap();
        assert_eq!(from_degrees, chord("Cm"));
        assert_eq!(Chord::from_semitones(c, &[0, 4, 7, 10]).unwrap(), chord("C7"));
        assert_eq!(IntervalSet::from_semitones(&[4, 7]).unwrap().with_root(c), chord("C"));
        assert!(Chord::from_semitones(c, &[-5, 4]).is_err());
    }

    #[test]
    fn test_from_root_and_semitones() {
        let c = note("C4");
        let slash = Chord::from_root_and_semitones(c, &[-8, 0, 4, 7]).unwrap();
        assert_eq!(slash, chord("C/E"));
        assert_eq!(slash.bass().map(|b| b.midi()), Some(52));

        let folded = Chord::from_root_and_semitones(c, &[-10, -5, 0, 4]).unwrap();
        assert_eq!(folded.intervals().offsets(), &[4, 7]);
        assert_eq!(folded.bass().map(|b| b.pitch_class()), Some(2));

        assert_eq!(Chord::from_root_and_semitones(c, &[0, 3, 7]).unwrap(), chord("Cm"));
    }

    #[test]
    fn test_midi() {
        assert_eq!(chord("C").midi(), vec![60, 64, 67]);
        assert_eq!(chord("Cinv1").midi(), vec![64, 67, 72]);
        assert_eq!(chord("Cinv2").midi(), vec![67, 72, 76]);
        assert_eq!(chord("C/E").midi(), vec![52, 60, 64, 67]);
        assert_eq!(chord("3G7").midi(), vec![55, 59, 62, 65]);
        assert_eq!(chord("Cn").midi(), vec![60]);
    }

    #[test]
    fn test_from_midi() {
        assert_eq!(Chord::from_midi(&[60, 64, 67]).unwrap(), chord("C"));
        assert_eq!(Chord::from_midi(&[67, 71, 74, 77]).unwrap(), chord("G7"));
        assert_eq!(Chord::from_midi(&[64, 67, 72]).unwrap(), chord("C/E"));
        assert_eq!(Chord::from_midi(&[60, 64, 67, 74]).unwrap(), chord("Cadd9"));
        assert_eq!(Chord::from_midi(&[60, 72]).unwrap(), chord("Cn"));
        assert_eq!(Chord::from_midi(&[60, 61, 62]).unwrap(), chord("C[1,2]"));
        assert!(matches!(Chord::from_midi(&[]), Err(ChordalError::InvalidChord(_))));
    }

    #[test]
    fn test_transpose_group_law() {
        let original = chord("Am7/G");
        for a in [-14, -1, 0, 3, 12] {
            for b in [-5, 0, 7, 25] {
                assert_eq!(original.transpose(a).transpose(b), original.transpose(a + b));
            }
        }
        assert_eq!(original.transpose(0), original);
        assert_eq!(chord("C").transpose(2), chord("D"));
        assert_eq!(chord("C/E").transpose(2).bass().map(|b| b.name()), Some("F#".to_string()));
        assert_eq!(chord("Fm7").transpose(-12).root().midi(), 53);
    }

    #[test]
    fn test_rotate_recalculates_name() {
        let c = chord("Cmaj7");
        let rotated = c.rotate(2, true);
        assert_eq!(rotated.inversion(), 2);
        assert_eq!(rotated.name(), "Cmaj7inv2");
        assert_eq!(rotated.midi(), vec![67, 71, 72, 76]);
        assert_eq!(c.rotate(4, true).inversion(), 0);
        assert_eq!(c.rotate(-1, true).inversion(), 3);
    }

    #[test]
    fn test_rotate_keeps_name() {
        let rotated = chord("Cmaj7").rotate(1, false);
        assert_eq!(rotated.name(), "Cmaj7");
        assert_eq!(rotated.midi(), vec![64, 67, 71, 72]);
        let plain = Chord::from_semitones(note("C4"), &[3, 7]).unwrap().rotate(1, false);
        assert_eq!(plain.name(), "Cm");
    }

    #[test]
    fn test_name_prefers_hint() {
        assert_eq!(chord("Cmajor7").name(), "Cmajor7");
        assert_eq!(chord("Cmajor7").transpose(0).name(), "Cmaj7");
        assert_eq!(chord("Cmajor7").to_string(), "Cmajor7");
    }

    #[test]
    fn test_add_and_remove_semitone() {
        let c7 = chord("C7/E");
        let c9 = c7.add_semitone(14).unwrap();
        assert_eq!(c9, chord("C9/E"));
        assert_eq!(c9.name(), "C9/E");
        assert!(c7.remove_semitone(2, RemovalPolicy::Strict).is_err());
        assert_eq!(c7.remove_semitone(2, RemovalPolicy::Lenient).unwrap(), c7);
        assert_eq!(c7.remove_semitone(10, RemovalPolicy::Strict).unwrap(), chord("C/E"));
    }

    #[test]
    fn test_interval_sequence() {
        assert_eq!(chord("Cm7").interval_sequence(), vec![3, 4, 3]);
    }
}
