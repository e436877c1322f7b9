//! Transposer effect

use serde::{Deserialize, Serialize};

use super::{flatten_sorted, impl_midi_fx_boilerplate};
use crate::error::{ChordalError, Result};
use crate::midi::NoteEvent;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransposerSettings {
    pub semitones: i32,
}

impl TransposerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.semitones.abs() > 127 {
            return Err(ChordalError::InvalidSettings(format!("transposer shift {} outside -127..=127", self.semitones)));
        }
        Ok(())
    }
}

/// Shifts every note by a fixed number of semitones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransposerSettings", into = "TransposerSettings")]
pub struct Transposer {
    settings: TransposerSettings,
}

impl Transposer {
    fn apply_impl(&self, events: Vec<NoteEvent>) -> Vec<NoteEvent> {
        let shifted = events
            .into_iter()
            .map(|e| e.with_pitch(e.pitch() + self.settings.semitones))
            .collect();
        flatten_sorted(vec![shifted])
    }
}

impl_midi_fx_boilerplate!(Transposer, TransposerSettings, "Transposer");
