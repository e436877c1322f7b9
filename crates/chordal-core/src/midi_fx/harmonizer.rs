//! Harmonizer effect

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{flatten_sorted, impl_midi_fx_boilerplate};
use crate::error::{ChordalError, Result};
use crate::midi::NoteEvent;
use crate::pitch::{Letter, Spelling, MAJOR_SCALE_OFFSETS};

/// Highest scale degree a harmony voice may sit on
pub const MAX_HARMONY_DEGREE: u8 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonizerSettings {
    /// Semitones above the root, ascending, starting at 0
    pub scale: Vec<u8>,
    /// Scale degrees stacked on each note, counted from the note itself (1 = the note)
    pub degrees: Vec<u8>,
    #[serde(serialize_with = "spelling_to_str", deserialize_with = "spelling_from_str")]
    pub root: Spelling,
}

impl Default for HarmonizerSettings {
    fn default() -> Self {
        Self {
            scale: MAJOR_SCALE_OFFSETS.iter().map(|&s| s as u8).collect(),
            degrees: vec![1, 3, 5],
            root: Spelling::new(Letter::C, 0),
        }
    }
}

impl HarmonizerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.scale.first() != Some(&0) {
            return Err(ChordalError::InvalidSettings("harmonizer scale must start at 0".to_string()));
        }
        if self.scale.windows(2).any(|w| w[0] >= w[1]) || self.scale.iter().any(|&s| s > 11) {
            return Err(ChordalError::InvalidSettings(format!(
                "harmonizer scale {:?} must ascend strictly within 0..=11",
                self.scale
            )));
        }
        if self.degrees.is_empty() {
            return Err(ChordalError::InvalidSettings("harmonizer needs at least one degree".to_string()));
        }
        if let Some(degree) = self.degrees.iter().find(|d| !(1..=MAX_HARMONY_DEGREE).contains(*d)) {
            return Err(ChordalError::InvalidSettings(format!(
                "harmonizer degree {degree} outside 1..={MAX_HARMONY_DEGREE}"
            )));
        }
        Ok(())
    }

    /// Pitches of the harmony built on `pitch`. A note off the scale is
    /// harmonized from the scale tone just below it.
    fn voices(&self, pitch: i32) -> Vec<i32> {
        let above_root = (pitch - self.root.pitch_class() as i32).rem_euclid(12);
        let position = self.scale.iter().rposition(|&s| s as i32 <= above_root).unwrap_or(0);
        let octave_root = pitch - above_root;
        let len = self.scale.len();
        self.degrees
            .iter()
            .map(|&degree| {
                let step = position + degree as usize - 1;
                octave_root + self.scale[step % len] as i32 + 12 * (step / len) as i32
            })
            .collect()
    }
}

fn spelling_to_str<S: Serializer>(spelling: &Spelling, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(spelling)
}

fn spelling_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Spelling, D::Error> {
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
}

/// Stacks scale tones on every note, in the key given by `root` and `scale`.
/// The source note is kept; a voice already sounding in the same strike is
/// not added again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HarmonizerSettings", into = "HarmonizerSettings")]
pub struct Harmonizer {
    settings: HarmonizerSettings,
}

impl Harmonizer {
    fn apply_impl(&self, events: Vec<NoteEvent>) -> Vec<NoteEvent> {
        let key = |e: &NoteEvent| (e.group, e.start.to_bits(), e.pitch());
        let mut sounding: HashSet<(usize, u64, i32)> = events.iter().map(key).collect();

        let mut voices = Vec::new();
        for event in &events {
            for pitch in self.settings.voices(event.pitch()) {
                let voice = event.with_pitch(pitch);
                if sounding.insert(key(&voice)) {
                    voices.push(voice);
                }
            }
        }

        flatten_sorted(vec![events, voices])
    }
}

impl_midi_fx_boilerplate!(Harmonizer, HarmonizerSettings, "Harmonizer");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi_fx::MidiFx;
    use crate::pitch::Note;

    fn events(pitches: &[i32]) -> Vec<NoteEvent> {
        pitches.iter().map(|&p| NoteEvent::new(Note::from_midi(p), 0.0, 1.0, 100)).collect()
    }

    fn pitches(events: &[NoteEvent]) -> Vec<i32> {
        events.iter().map(NoteEvent::pitch).collect()
    }

    fn sevenths() -> Harmonizer {
        Harmonizer::new(HarmonizerSettings { degrees: vec![1, 3, 5, 7], ..Default::default() }).unwrap()
    }

    #[test]
    fn test_diatonic_sevenths_in_c_major() {
        let fx = sevenths();
        assert_eq!(pitches(&fx.apply(events(&[65]))), vec![65, 69, 72, 76]);
        assert_eq!(pitches(&fx.apply(events(&[67]))), vec![67, 71, 74, 77]);
        assert_eq!(pitches(&fx.apply(events(&[64]))), vec![64, 67, 71, 74]);
        assert_eq!(pitches(&fx.apply(events(&[57]))), vec![57, 60, 64, 67]);
    }

    #[test]
    fn test_off_scale_note_uses_tone_below() {
        let fx = Harmonizer::new(HarmonizerSettings { degrees: vec![3], ..Default::default() }).unwrap();
        assert_eq!(pitches(&fx.apply(events(&[61]))), vec![61, 64]);
    }

    #[test]
    fn test_other_root_and_scale() {
        let dorian = HarmonizerSettings {
            scale: vec![0, 2, 3, 5, 7, 9, 10],
            degrees: vec![1, 3, 5],
            root: "D".parse().unwrap(),
        };
        let fx = Harmonizer::new(dorian).unwrap();
        assert_eq!(pitches(&fx.apply(events(&[62]))), vec![62, 65, 69]);
        assert_eq!(pitches(&fx.apply(events(&[60]))), vec![60, 64, 67]);

        let pentatonic = HarmonizerSettings { scale: vec![0, 2, 4, 7, 9], degrees: vec![2, 6], ..Default::default() };
        assert_eq!(pitches(&Harmonizer::new(pentatonic).unwrap().apply(events(&[67]))), vec![67, 69, 79]);
    }

    #[test]
    fn test_shared_voices_not_duplicated() {
        let out = sevenths().apply(events(&[60, 64]));
        assert_eq!(pitches(&out), vec![60, 64, 67, 71, 74]);

        let mut input = events(&[60]);
        input.push(NoteEvent { group: 1, start: 1.0, ..input[0] });
        assert_eq!(sevenths().apply(input).len(), 8);
    }

    #[test]
    fn test_settings_validation() {
        let bad = [
            HarmonizerSettings { scale: Vec::new(), ..Default::default() },
            HarmonizerSettings { scale: vec![2, 4, 7], ..Default::default() },
            HarmonizerSettings { scale: vec![0, 4, 4], ..Default::default() },
            HarmonizerSettings { scale: vec![0, 7, 12], ..Default::default() },
            HarmonizerSettings { degrees: Vec::new(), ..Default::default() },
            HarmonizerSettings { degrees: vec![0], ..Default::default() },
            HarmonizerSettings { degrees: vec![MAX_HARMONY_DEGREE + 1], ..Default::default() },
        ];
        for settings in bad {
            assert!(matches!(Harmonizer::new(settings), Err(ChordalError::InvalidSettings(_))));
        }
    }

    #[test]
    fn test_settings_from_json() {
        let fx: Harmonizer = serde_json::from_str(r#"{"root": "Eb", "degrees": [1, 3]}"#).unwrap();
        assert_eq!(fx.settings().root, Spelling::new(Letter::E, -1));
        assert_eq!(fx.settings().scale, vec![0, 2, 4, 5, 7, 9, 11]);
        assert_eq!(serde_json::to_value(&fx).unwrap()["root"], "Eb");

        assert!(serde_json::from_str::<Harmonizer>(r#"{"root": "H"}"#).is_err());
        assert!(serde_json::from_str::<Harmonizer>(r#"{"degrees": []}"#).is_err());
    }
}
