//! Chord structure as a set of semitone offsets from an implicit root

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chord::Chord;
use crate::error::{ChordalError, Result};
use crate::pitch::{Degree, Note};

/// What `remove_semitone` does when the offset is not in the set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Removing an absent offset is an `InvalidChord` error
    #[default]
    Strict,
    /// Removing an absent offset leaves the set unchanged
    Lenient,
}

/// Sorted, deduplicated, strictly positive semitone offsets. The root (0) is
/// implicit and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct IntervalSet {
    offsets: Vec<i32>,
}

impl IntervalSet {
    /// The empty set: a lone root
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from offsets relative to the root. Zero is dropped; negative offsets are rejected.
    pub fn from_semitones(semitones: &[i32]) -> Result<Self> {
        if let Some(negative) = semitones.iter().find(|&&s| s < 0) {
            return Err(ChordalError::InvalidChord(format!(
                "negative offset {negative} in {semitones:?}"
            )));
        }
        Ok(Self::from_nonnegative(semitones.iter().copied()))
    }

    pub fn from_degrees(degrees: &[Degree]) -> Result<Self> {
        let semitones: Vec<i32> = degrees.iter().map(Degree::semitones).collect();
        Self::from_semitones(&semitones)
    }

    fn from_nonnegative(semitones: impl IntoIterator<Item = i32>) -> Self {
        let mut offsets: Vec<i32> = semitones.into_iter().filter(|&s| s > 0).collect();
        offsets.sort_unstable();
        offsets.dedup();
        Self { offsets }
    }

    /// Stored offsets, without the implicit root
    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    /// All tones including the root, ascending
    pub fn semitones(&self) -> Vec<i32> {
        std::iter::once(0).chain(self.offsets.iter().copied()).collect()
    }

    /// Number of stored offsets
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Number of tones including the root
    pub fn tone_count(&self) -> usize {
        self.offsets.len() + 1
    }

    pub fn contains(&self, semitone: i32) -> bool {
        semitone == 0 || self.offsets.binary_search(&semitone).is_ok()
    }

    /// Distances between consecutive tones, starting from the root
    pub fn interval_sequence(&self) -> Vec<i32> {
        self.semitones().windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn add_semitone(&self, semitone: i32) -> Result<Self> {
        if semitone < 0 {
            return Err(ChordalError::InvalidChord(format!("cannot add negative offset {semitone}")));
        }
        Ok(Self::from_nonnegative(self.offsets.iter().copied().chain([semitone])))
    }

    pub fn remove_semitone(&self, semitone: i32, policy: RemovalPolicy) -> Result<Self> {
        if !self.offsets.contains(&semitone) {
            return match policy {
                RemovalPolicy::Strict => Err(ChordalError::InvalidChord(format!(
                    "offset {semitone} is not in {self}"
                ))),
                RemovalPolicy::Lenient => Ok(self.clone()),
            };
        }
        let offsets = self.offsets.iter().copied().filter(|&s| s != semitone).collect();
        Ok(Self { offsets })
    }

    /// Rotates the voicing `n` steps. A positive step lifts the lowest tone above
    /// the highest by whole octaves, a negative step drops the highest tone below
    /// the lowest; the result is re-normalized so the new lowest tone is 0.
    pub fn rotate_semitones(&self, n: i32) -> Self {
        let mut tones = self.semitones();
        for _ in 0..n.unsigned_abs() {
            if n > 0 {
                rotate_up(&mut tones);
            } else {
                rotate_down(&mut tones);
            }
        }
        let lowest = tones.first().copied().unwrap_or(0);
        Self::from_nonnegative(tones.into_iter().map(|t| t - lowest))
    }

    /// Tones of the given inversion relative to the root, without re-normalizing
    pub fn voiced(&self, inversion: usize) -> Vec<i32> {
        let mut tones = self.semitones();
        for _ in 0..inversion % tones.len() {
            rotate_up(&mut tones);
        }
        tones
    }

    pub fn with_root(&self, root: Note) -> Chord {
        Chord::new(root, self.clone())
    }
}

/// Smallest whole number of octaves that is larger than `span`
fn octaves_above(span: i32) -> i32 {
    12 * (span.div_euclid(12) + 1)
}

fn rotate_up(tones: &mut Vec<i32>) {
    if tones.len() < 2 {
        return;
    }
    let lowest = tones.remove(0);
    let highest = tones[tones.len() - 1];
    tones.push(lowest + octaves_above(highest - lowest));
}

fn rotate_down(tones: &mut Vec<i32>) {
    if tones.len() < 2 {
        return;
    }
    let Some(highest) = tones.pop() else { return };
    let lowest = tones[0];
    tones.insert(0, highest - octaves_above(highest - lowest));
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.offsets.iter().map(i32::to_string).collect();
        write!(f, "[{}]", parts.join(","))
    }
}

impl TryFrom<Vec<i32>> for IntervalSet {
    type Error = ChordalError;

    fn try_from(semitones: Vec<i32>) -> Result<Self> {
        Self::from_semitones(&semitones)
    }
}

impl From<IntervalSet> for Vec<i32> {
    fn from(set: IntervalSet) -> Self {
        set.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::ChordQuality;

    fn set(semitones: &[i32]) -> IntervalSet {
        IntervalSet::from_semitones(semitones).unwrap()
    }

    #[test]
    fn test_normalization() {
        let s = set(&[7, 0, 4, 7]);
        assert_eq!(s.offsets(), &[4, 7]);
        assert_eq!(s.semitones(), vec![0, 4, 7]);
        assert_eq!(s.tone_count(), 3);
        assert!(s.contains(0));
        assert!(!s.contains(3));
        assert!(IntervalSet::from_semitones(&[4, -3]).is_err());
    }

    #[test]
    fn test_from_degrees() {
        let degrees: Vec<Degree> = ["1", "b3", "5", "b7"].iter().map(|d| d.parse().unwrap()).collect();
        assert_eq!(IntervalSet::from_degrees(&degrees).unwrap(), set(&[3, 7, 10]));
    }

    #[test]
    fn test_interval_sequence() {
        assert_eq!(set(&[4, 7, 11]).interval_sequence(), vec![4, 3, 4]);
        assert!(IntervalSet::new().interval_sequence().is_empty());
    }

    #[test]
    fn test_add_and_remove() {
        let s = set(&[4, 7]);
        assert_eq!(s.add_semitone(10).unwrap(), set(&[4, 7, 10]));
        assert_eq!(s.add_semitone(0).unwrap(), s);
        assert_eq!(s.remove_semitone(7, RemovalPolicy::Strict).unwrap(), set(&[4]));
    }

    #[test]
    fn test_remove_absent_strict() {
        let s = set(&[4, 7]);
        assert!(matches!(
            s.remove_semitone(3, RemovalPolicy::Strict),
            Err(ChordalError::InvalidChord(_))
        ));
    }

    #[test]
    fn test_remove_absent_lenient() {
        let s = set(&[4, 7]);
        assert_eq!(s.remove_semitone(3, RemovalPolicy::Lenient).unwrap(), s);
    }

    #[test]
    fn test_rotation() {
        let major = set(&[4, 7]);
        assert_eq!(major.rotate_semitones(1), set(&[3, 8]));
        assert_eq!(major.rotate_semitones(2), set(&[5, 9]));
        assert_eq!(major.rotate_semitones(-1), set(&[5, 9]));
        assert_eq!(set(&[4, 7, 14]).rotate_semitones(1), set(&[3, 10, 20]));
    }

    #[test]
    fn test_inversion_cycle_for_every_template() {
        for quality in ChordQuality::ALL {
            let s = set(quality.intervals());
            let steps = s.tone_count() as i32;
            let mut rotated = s.clone();
            for _ in 0..steps {
                rotated = rotated.rotate_semitones(1);
            }
            assert_eq!(rotated, s, "{}", quality.symbol());
            assert_eq!(s.rotate_semitones(steps), s);
            assert_eq!(s.rotate_semitones(3).rotate_semitones(-3), s);
        }
    }

    #[test]
    fn test_voiced() {
        let major = set(&[4, 7]);
        assert_eq!(major.voiced(0), vec![0, 4, 7]);
        assert_eq!(major.voiced(1), vec![4, 7, 12]);
        assert_eq!(major.voiced(2), vec![7, 12, 16]);
        assert_eq!(major.voiced(3), vec![0, 4, 7]);
        assert_eq!(IntervalSet::new().voiced(1), vec![0]);
    }

    #[test]
    fn test_serde_rejects_negative_offsets() {
        let s: IntervalSet = serde_json::from_str("[7,4]").unwrap();
        assert_eq!(s, set(&[4, 7]));
        assert!(serde_json::from_str::<IntervalSet>("[-1]").is_err());
    }
}
