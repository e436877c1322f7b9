//! Doubler effect

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{flatten_sorted, impl_midi_fx_boilerplate};
use crate::error::{ChordalError, Result};
use crate::midi::NoteEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoublerSettings {
    /// Pitch offset of each copy, in semitones
    pub interval: i32,
    /// Number of copies, stacked at `interval`, `2 * interval`, ...
    pub copies: u8,
    /// Channel for the copies; `None` keeps the source channel
    pub channel: Option<u8>,
}

impl Default for DoublerSettings {
    fn default() -> Self {
        Self { interval: 12, copies: 1, channel: None }
    }
}

impl DoublerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(ChordalError::InvalidSettings("doubler interval must not be 0".to_string()));
        }
        if !(1..=8).contains(&self.copies) {
            return Err(ChordalError::InvalidSettings(format!("doubler copies {} outside 1..=8", self.copies)));
        }
        if let Some(channel) = self.channel.filter(|&c| c > 15) {
            return Err(ChordalError::InvalidSettings(format!("doubler channel {channel} outside 0..=15")));
        }
        Ok(())
    }
}

/// Adds shifted copies of every note at the same time. A copy is skipped when
/// its pitch already sounds in the same strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DoublerSettings", into = "DoublerSettings")]
pub struct Doubler {
    settings: DoublerSettings,
}

impl Doubler {
    fn apply_impl(&self, events: Vec<NoteEvent>) -> Vec<NoteEvent> {
        let key = |e: &NoteEvent| (e.group, e.start.to_bits(), e.pitch());
        let mut sounding: HashSet<(usize, u64, i32)> = events.iter().map(key).collect();

        let mut copies = Vec::new();
        for event in &events {
            for k in 1..=self.settings.copies as i32 {
                let mut copy = event.with_pitch(event.pitch() + k * self.settings.interval);
                if let Some(channel) = self.settings.channel {
                    copy.channel = channel;
                }
                if sounding.insert(key(&copy)) {
                    copies.push(copy);
                }
            }
        }

        flatten_sorted(vec![events, copies])
    }
}

impl_midi_fx_boilerplate!(Doubler, DoublerSettings, "Doubler");
