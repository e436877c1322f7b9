//! chordal-core: Notes, chords, progressions and MIDI note events

mod chord;
mod error;
pub mod grouping;
mod intervals;
pub mod knowledge;
pub mod midi;
pub mod midi_fx;
pub mod naming;
mod pitch;
mod progression;
pub mod song;

pub use chord::Chord;
pub use error::{ChordalError, Result};
pub use grouping::{group_notes_to_chords, PlayedNote, MIN_SEPARATION};
pub use intervals::{IntervalSet, RemovalPolicy};
pub use knowledge::{ChordQuality, REPETITION_SYMBOL};
pub use midi::{
    render, sort_events, to_midi, Instrument, MidiConversionSettings, NoteEvent, MAX_TEMPO, MIN_TEMPO,
};
pub use midi_fx::{
    ArpPattern, Arpeggiator, ArpeggiatorSettings, Doubler, DoublerSettings, Harmonizer, HarmonizerSettings,
    MidiEffect, MidiFx, MidiFxChain, Spreader, SpreaderSettings, StrumDirection, Transposer, TransposerSettings,
};
pub use naming::{infer_name, parse};
pub use pitch::{
    Degree, Letter, Note, Spelling, A4_HZ, A4_MIDI, DEFAULT_OCTAVE, MAX_ACCIDENTALS, MAX_OCTAVE, MIN_OCTAVE,
};
pub use progression::{Progression, ProgressionEntry, TextLayout};
pub use song::{Song, SongSection};
