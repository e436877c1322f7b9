//! Spreader (strum) effect

use serde::{Deserialize, Serialize};

use super::{chord_groups, flatten_sorted, impl_midi_fx_boilerplate};
use crate::error::{ChordalError, Result};
use crate::midi::NoteEvent;

/// Onsets never move later than this share of the group's duration
pub const MAX_SPREAD_FRACTION: f64 = 0.5;

/// Order in which the tones of a chord are struck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrumDirection {
    /// Lowest tone first
    #[default]
    Up,
    /// Highest tone first
    Down,
    /// Up and down on alternating chords
    Alternate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreaderSettings {
    /// Delay between consecutive tones, in beats
    pub amount: f64,
    /// Maximum random deviation of each onset, in beats
    pub jitter: f64,
    pub direction: StrumDirection,
    pub seed: u64,
}

impl Default for SpreaderSettings {
    fn default() -> Self {
        Self { amount: 0.05, jitter: 0.0, direction: StrumDirection::Up, seed: 0 }
    }
}

impl SpreaderSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(ChordalError::InvalidSettings(format!("spreader amount must be >= 0, got {}", self.amount)));
        }
        if !self.jitter.is_finite() || self.jitter < 0.0 {
            return Err(ChordalError::InvalidSettings(format!("spreader jitter must be >= 0, got {}", self.jitter)));
        }
        Ok(())
    }
}

/// Staggers the onsets inside each chord-hold group like a strum. Tone `k` in
/// strum order is delayed by `k * amount` plus seeded jitter in
/// `[-jitter, jitter]`. Delays stay inside the group's window, keep the strum
/// order and every note still ends with its group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpreaderSettings", into = "SpreaderSettings")]
pub struct Spreader {
    settings: SpreaderSettings,
}

impl Spreader {
    fn apply_impl(&self, events: Vec<NoteEvent>) -> Vec<NoteEvent> {
        let mut rng = fastrand::Rng::with_seed(self.settings.seed);
        let groups = chord_groups(events)
            .into_iter()
            .enumerate()
            .map(|(i, group)| {
                let downward = match self.settings.direction {
                    StrumDirection::Up => false,
                    StrumDirection::Down => true,
                    StrumDirection::Alternate => i % 2 == 1,
                };
                self.spread(group, downward, &mut rng)
            })
            .collect();
        flatten_sorted(groups)
    }

    fn spread(&self, mut group: Vec<NoteEvent>, downward: bool, rng: &mut fastrand::Rng) -> Vec<NoteEvent> {
        group.sort_by_key(NoteEvent::pitch);
        if downward {
            group.reverse();
        }

        let start = group[0].start;
        let end = group[0].end();
        let limit = group[0].duration * MAX_SPREAD_FRACTION;
        let steps = group.len().saturating_sub(1) as f64;
        let amount = if steps * self.settings.amount > limit { limit / steps } else { self.settings.amount };

        let mut offsets: Vec<f64> = (0..group.len())
            .map(|k| {
                let jitter = self.settings.jitter * (rng.f64() * 2.0 - 1.0);
                (k as f64 * amount + jitter).clamp(0.0, limit)
            })
            .collect();
        offsets.sort_by(f64::total_cmp);

        group
            .into_iter()
            .zip(offsets)
            .map(|(event, offset)| {
                let onset = start + offset;
                NoteEvent { start: onset, duration: end - onset, ..event }
            })
            .collect()
    }
}

impl_midi_fx_boilerplate!(Spreader, SpreaderSettings, "Spreader");
