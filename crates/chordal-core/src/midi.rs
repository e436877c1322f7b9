//! Progression to timed note events

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChordalError, Result};
use crate::midi_fx::MidiFxChain;
use crate::pitch::Note;
use crate::progression::Progression;

/// General MIDI program number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instrument(pub u8);

impl Instrument {
    pub const ACOUSTIC_GRAND_PIANO: Self = Self(0);
    pub const BRIGHT_ACOUSTIC_PIANO: Self = Self(1);
    pub const ELECTRIC_PIANO: Self = Self(4);
    pub const NYLON_GUITAR: Self = Self(24);
    pub const STEEL_GUITAR: Self = Self(25);
    pub const STRING_ENSEMBLE: Self = Self(48);
    pub const CHOIR_AAHS: Self = Self(52);
    pub const VOICE_OOHS: Self = Self(53);

    pub fn program(&self) -> u8 {
        self.0
    }
}

impl Default for Instrument {
    fn default() -> Self {
        Self::BRIGHT_ACOUSTIC_PIANO
    }
}

/// Slowest tempo whose microseconds per beat fit a MIDI tempo event (24 bits)
pub const MIN_TEMPO: u32 = 4;
pub const MAX_TEMPO: u32 = 1000;

/// Options for turning a progression into note events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConversionSettings {
    /// Beats per minute
    pub tempo: u32,
    pub beats_per_chord: f64,
    pub instrument: Instrument,
    pub velocity: u8,
    /// How many times the whole progression is played
    pub repeat: u32,
}

impl Default for MidiConversionSettings {
    fn default() -> Self {
        Self {
            tempo: 120,
            beats_per_chord: 2.0,
            instrument: Instrument::default(),
            velocity: 100,
            repeat: 1,
        }
    }
}

impl MidiConversionSettings {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&self.tempo) {
            return Err(ChordalError::InvalidSettings(format!(
                "tempo must be between {MIN_TEMPO} and {MAX_TEMPO} BPM, got {}",
                self.tempo
            )));
        }
        if !self.beats_per_chord.is_finite() || self.beats_per_chord <= 0.0 {
            return Err(ChordalError::InvalidSettings(format!(
                "beats_per_chord must be positive, got {}",
                self.beats_per_chord
            )));
        }
        if self.velocity > 127 {
            return Err(ChordalError::InvalidSettings(format!("velocity {} exceeds 127", self.velocity)));
        }
        if self.instrument.0 > 127 {
            return Err(ChordalError::InvalidSettings(format!("instrument {} exceeds 127", self.instrument.0)));
        }
        if self.repeat == 0 {
            return Err(ChordalError::InvalidSettings("repeat must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.tempo as f64
    }
}

/// One sounding note. Times are in beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub note: Note,
    pub start: f64,
    pub duration: f64,
    pub velocity: u8,
    #[serde(default)]
    pub channel: u8,
    /// Ordinal of the chord strike this note came from
    #[serde(default)]
    pub group: usize,
}

impl NoteEvent {
    pub fn new(note: Note, start: f64, duration: f64, velocity: u8) -> Self {
        Self { note, start, duration, velocity, channel: 0, group: 0 }
    }

    pub fn pitch(&self) -> i32 {
        self.note.midi()
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn with_pitch(mut self, pitch: i32) -> Self {
        self.note = Note::from_midi(pitch);
        self
    }
}

/// Orders events by start time, then pitch, then channel
pub fn sort_events(events: &mut [NoteEvent]) {
    events.sort_by(|a, b| {
        a.start
            .total_cmp(&b.start)
            .then(a.pitch().cmp(&b.pitch()))
            .then(a.channel.cmp(&b.channel))
    });
}

/// Expands every chord into one event per sounding pitch. Chords follow each
/// other without gaps; `repeat` plays the whole progression again after it ends.
pub fn to_midi(progression: &Progression, settings: &MidiConversionSettings) -> Result<Vec<NoteEvent>> {
    settings.validate()?;

    let mut events = Vec::new();
    let mut start = 0.0;
    let mut group = 0;
    for _ in 0..settings.repeat {
        for entry in progression.entries() {
            let duration = entry.duration.unwrap_or(settings.beats_per_chord);
            for pitch in entry.chord.midi() {
                events.push(NoteEvent {
                    note: Note::from_midi(pitch),
                    start,
                    duration,
                    velocity: settings.velocity,
                    channel: 0,
                    group,
                });
            }
            start += duration;
            group += 1;
        }
    }
    sort_events(&mut events);
    debug!(chords = group, events = events.len(), "progression expanded");
    Ok(events)
}

/// Converts and runs the events through an effect chain
pub fn render(progression: &Progression, settings: &MidiConversionSettings, chain: &MidiFxChain) -> Result<Vec<NoteEvent>> {
    let events = to_midi(progression, settings)?;
    Ok(chain.apply(events))
}
