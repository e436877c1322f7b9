//! Arpeggiator effect

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{chord_groups, flatten_sorted, impl_midi_fx_boilerplate};
use crate::error::{ChordalError, Result};
use crate::midi::NoteEvent;

/// Order in which chord tones are played
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArpPattern {
    #[default]
    Up,
    Down,
    UpDown,
    DownUp,
    /// Explicit steps of tone indices, lowest tone = 0. Negative indices count
    /// from the top (-1 = highest); indices past either end wrap by octaves.
    /// An empty step is a rest.
    Steps(Vec<Vec<i32>>),
}

impl ArpPattern {
    /// Tone indices sounding at `step` for a chord of `tones` notes
    fn indices(&self, step: usize, tones: usize) -> Vec<i32> {
        let n = tones as i32;
        let up_down = |step: usize| {
            let period = (2 * tones).saturating_sub(2).max(1);
            let i = (step % period) as i32;
            if i < n { i } else { period as i32 - i }
        };
        match self {
            Self::Up => vec![(step % tones) as i32],
            Self::Down => vec![n - 1 - (step % tones) as i32],
            Self::UpDown => vec![up_down(step)],
            Self::DownUp => vec![n - 1 - up_down(step)],
            Self::Steps(steps) => steps[step % steps.len()].clone(),
        }
    }
}

/// Fastest accepted rate, in steps per beat
pub const MAX_RATE: f64 = 64.0;
/// Largest tone index magnitude accepted in a step pattern
pub const MAX_STEP_INDEX: i32 = 127;
/// Steps generated for one chord at most; the last one is held to the end of the window
const MAX_STEPS_PER_CHORD: usize = 1 << 16;

/// Pitch for a tone index, wrapping out-of-range indices by octaves
fn resolve(sorted: &[i32], index: i32) -> i32 {
    let n = sorted.len() as i32;
    let index = if index < 0 { index + n } else { index };
    sorted[index.rem_euclid(n) as usize] + 12 * index.div_euclid(n)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArpeggiatorSettings {
    pub pattern: ArpPattern,
    /// Steps per beat
    pub rate: f64,
    /// Maximum random delay added to each onset, in beats
    pub jitter: f64,
    /// Hold a tone that is repeated in consecutive steps instead of striking it again
    pub sticky: bool,
    pub seed: u64,
}

impl Default for ArpeggiatorSettings {
    fn default() -> Self {
        Self { pattern: ArpPattern::Up, rate: 4.0, jitter: 0.0, sticky: false, seed: 0 }
    }
}

impl ArpeggiatorSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.rate.is_finite() || self.rate <= 0.0 || self.rate > MAX_RATE {
            return Err(ChordalError::InvalidSettings(format!(
                "arpeggiator rate must be in (0, {MAX_RATE}], got {}",
                self.rate
            )));
        }
        if !self.jitter.is_finite() || self.jitter < 0.0 || self.jitter >= 1.0 / self.rate {
            return Err(ChordalError::InvalidSettings(format!(
                "arpeggiator jitter must be in [0, {}), got {}",
                1.0 / self.rate,
                self.jitter
            )));
        }
        if let ArpPattern::Steps(steps) = &self.pattern {
            if steps.is_empty() {
                return Err(ChordalError::InvalidSettings("arpeggiator step pattern is empty".to_string()));
            }
            if let Some(index) = steps.iter().flatten().find(|i| !(-MAX_STEP_INDEX..=MAX_STEP_INDEX).contains(*i)) {
                return Err(ChordalError::InvalidSettings(format!(
                    "arpeggiator step index {index} is outside -{MAX_STEP_INDEX}..={MAX_STEP_INDEX}"
                )));
            }
        }
        Ok(())
    }
}

/// Replaces each chord-hold group with a run of shorter notes that fills the
/// group's window. Each step lasts until the next onset; the last step ends
/// with the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArpeggiatorSettings", into = "ArpeggiatorSettings")]
pub struct Arpeggiator {
    settings: ArpeggiatorSettings,
}

impl Arpeggiator {
    fn apply_impl(&self, events: Vec<NoteEvent>) -> Vec<NoteEvent> {
        let mut rng = fastrand::Rng::with_seed(self.settings.seed);
        let groups = chord_groups(events)
            .into_iter()
            .map(|group| self.arpeggiate(group, &mut rng))
            .collect();
        flatten_sorted(groups)
    }

    fn arpeggiate(&self, mut group: Vec<NoteEvent>, rng: &mut fastrand::Rng) -> Vec<NoteEvent> {
        group.sort_by_key(NoteEvent::pitch);
        group.dedup_by_key(|e| e.pitch());
        let sorted: Vec<i32> = group.iter().map(NoteEvent::pitch).collect();
        let by_pitch: HashMap<i32, NoteEvent> = group.iter().map(|e| (e.pitch(), *e)).collect();

        let start = group[0].start;
        let end = group[0].end();
        let step = 1.0 / self.settings.rate;
        let steps = ((group[0].duration * self.settings.rate - 1e-9).ceil() as usize).clamp(1, MAX_STEPS_PER_CHORD);

        let onsets: Vec<f64> = (0..steps)
            .map(|k| {
                let nominal = start + k as f64 * step;
                let slot_end = (nominal + step).min(end);
                let delay = (rng.f64() * self.settings.jitter).min((slot_end - nominal) * 0.5);
                nominal + delay
            })
            .collect();

        let mut out: Vec<NoteEvent> = Vec::new();
        let mut held: HashMap<i32, usize> = HashMap::new();
        for (k, &onset) in onsets.iter().enumerate() {
            let step_end = onsets.get(k + 1).copied().unwrap_or(end);
            let mut now_held = HashMap::new();
            for index in self.settings.pattern.indices(k, sorted.len()) {
                let pitch = resolve(&sorted, index);
                if now_held.contains_key(&pitch) {
                    continue;
                }
                if let Some(&i) = held.get(&pitch).filter(|_| self.settings.sticky) {
                    out[i].duration = step_end - out[i].start;
                    now_held.insert(pitch, i);
                    continue;
                }
                let source = by_pitch.get(&pitch).copied().unwrap_or(group[0]);
                out.push(NoteEvent { start: onset, duration: step_end - onset, ..source }.with_pitch(pitch));
                now_held.insert(pitch, out.len() - 1);
            }
            held = now_held;
        }
        out
    }
}

impl_midi_fx_boilerplate!(Arpeggiator, ArpeggiatorSettings, "Arpeggiator");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi_fx::MidiFx;
    use crate::pitch::Note;

    fn chord(pitches: &[i32], start: f64, duration: f64) -> Vec<NoteEvent> {
        pitches.iter().map(|&p| NoteEvent::new(Note::from_midi(p), start, duration, 90)).collect()
    }

    fn arp(settings: ArpeggiatorSettings) -> Arpeggiator {
        Arpeggiator::new(settings).unwrap()
    }

    fn pitches(events: &[NoteEvent]) -> Vec<i32> {
        events.iter().map(NoteEvent::pitch).collect()
    }

    #[test]
    fn test_up_three_notes_at_rate_three() {
        let fx = arp(ArpeggiatorSettings { rate: 3.0, ..Default::default() });
        let out = fx.apply(chord(&[67, 60, 64], 0.0, 1.0));
        assert_eq!(pitches(&out), vec![60, 64, 67]);
        for (k, e) in out.iter().enumerate() {
            assert!((e.start - k as f64 / 3.0).abs() < 1e-9);
            assert!((e.duration - 1.0 / 3.0).abs() < 1e-9);
            assert_eq!(e.velocity, 90);
        }
        assert!((out[2].end() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_patterns() {
        let notes = chord(&[60, 64, 67], 0.0, 2.0);
        let run = |pattern| pitches(&arp(ArpeggiatorSettings { pattern, rate: 3.0, ..Default::default() }).apply(notes.clone()));
        assert_eq!(run(ArpPattern::Up), vec![60, 64, 67, 60, 64, 67]);
        assert_eq!(run(ArpPattern::Down), vec![67, 64, 60, 67, 64, 60]);
        assert_eq!(run(ArpPattern::UpDown), vec![60, 64, 67, 64, 60, 64]);
        assert_eq!(run(ArpPattern::DownUp), vec![67, 64, 60, 64, 67, 64]);
    }

    #[test]
    fn test_step_pattern_with_negative_and_wrapping_indices() {
        let pattern = ArpPattern::Steps(vec![vec![0], vec![-1], vec![3], vec![], vec![0, 2]]);
        let out = arp(ArpeggiatorSettings { pattern, rate: 5.0, ..Default::default() }).apply(chord(&[60, 64, 67], 0.0, 1.0));
        assert_eq!(pitches(&out), vec![60, 67, 72, 60, 67]);
        assert!((out[2].duration - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_sticky_holds_repeated_tones() {
        let pattern = ArpPattern::Steps(vec![vec![0, 1], vec![0, 2]]);
        let settings = ArpeggiatorSettings { pattern, rate: 2.0, sticky: true, ..Default::default() };
        let out = arp(settings.clone()).apply(chord(&[60, 64, 67], 0.0, 1.0));
        assert_eq!(pitches(&out), vec![60, 64, 67]);
        assert!((out[0].duration - 1.0).abs() < 1e-9);

        let restruck = arp(ArpeggiatorSettings { sticky: false, ..settings }).apply(chord(&[60, 64, 67], 0.0, 1.0));
        assert_eq!(pitches(&restruck), vec![60, 64, 60, 67]);
    }

    #[test]
    fn test_partial_last_step_ends_with_window() {
        let out = arp(ArpeggiatorSettings { rate: 2.0, ..Default::default() }).apply(chord(&[60, 64], 1.0, 1.25));
        assert_eq!(pitches(&out), vec![60, 64, 60]);
        assert!((out[2].start - 2.0).abs() < 1e-9);
        assert!((out[2].end() - 2.25).abs() < 1e-9);
    }

    #[test]
    fn test_jitter_is_seeded_and_bounded() {
        let settings = ArpeggiatorSettings { rate: 4.0, jitter: 0.05, seed: 7, ..Default::default() };
        let notes = chord(&[60, 64, 67, 71], 0.0, 2.0);
        let a = arp(settings.clone()).apply(notes.clone());
        let b = arp(settings).apply(notes);
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        let total: f64 = a.iter().map(|e| e.duration).sum();
        assert!((total - (2.0 - a[0].start)).abs() < 1e-9);
        for (k, e) in a.iter().enumerate() {
            let nominal = k as f64 * 0.25;
            assert!(e.start >= nominal && e.start < nominal + 0.05 + 1e-12);
        }
    }

    #[test]
    fn test_groups_arpeggiated_independently() {
        let mut notes = chord(&[60, 64], 0.0, 1.0);
        notes.extend(chord(&[62, 65], 1.0, 1.0).into_iter().map(|e| NoteEvent { group: 1, ..e }));
        let out = arp(ArpeggiatorSettings { rate: 2.0, ..Default::default() }).apply(notes);
        assert_eq!(pitches(&out), vec![60, 64, 62, 65]);
        assert_eq!(out.iter().map(|e| e.group).collect::<Vec<_>>(), vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_settings_validation() {
        let bad = [
            ArpeggiatorSettings { rate: 0.0, ..Default::default() },
            ArpeggiatorSettings { rate: -2.0, ..Default::default() },
            ArpeggiatorSettings { rate: 4.0, jitter: 0.25, ..Default::default() },
            ArpeggiatorSettings { jitter: -0.01, ..Default::default() },
            ArpeggiatorSettings { pattern: ArpPattern::Steps(Vec::new()), ..Default::default() },
            ArpeggiatorSettings { rate: 1.0e12, ..Default::default() },
            ArpeggiatorSettings { rate: MAX_RATE * 2.0, ..Default::default() },
            ArpeggiatorSettings { pattern: ArpPattern::Steps(vec![vec![0], vec![i32::MAX]]), ..Default::default() },
            ArpeggiatorSettings { pattern: ArpPattern::Steps(vec![vec![i32::MIN]]), ..Default::default() },
            ArpeggiatorSettings { pattern: ArpPattern::Steps(vec![vec![MAX_STEP_INDEX + 1]]), ..Default::default() },
        ];
        for settings in bad {
            assert!(matches!(Arpeggiator::new(settings), Err(ChordalError::InvalidSettings(_))));
        }

        let fastest = ArpeggiatorSettings { rate: MAX_RATE, ..Default::default() };
        assert!(Arpeggiator::new(fastest).is_ok());
    }

    #[test]
    fn test_extreme_step_indices_stay_in_range() {
        let pattern = ArpPattern::Steps(vec![vec![MAX_STEP_INDEX], vec![-MAX_STEP_INDEX]]);
        let out = arp(ArpeggiatorSettings { pattern, rate: 2.0, ..Default::default() }).apply(chord(&[60, 64, 67], 0.0, 1.0));
        assert_eq!(pitches(&out), vec![64 + 12 * 42, 67 - 12 * 42]);
    }

    #[test]
    fn test_long_chord_step_count_is_capped() {
        let out = arp(ArpeggiatorSettings { rate: MAX_RATE, ..Default::default() }).apply(chord(&[60], 0.0, 1.0e9));
        assert_eq!(out.len(), MAX_STEPS_PER_CHORD);
        assert!((out[out.len() - 1].end() - 1.0e9).abs() < 1e-3);
    }
}
