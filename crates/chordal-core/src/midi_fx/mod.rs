//! Note event effects: doubling, harmonizing, arpeggiation, strumming and transposition

mod arpeggiator;
mod doubler;
mod harmonizer;
mod spreader;
mod transposer;

pub use arpeggiator::{ArpPattern, Arpeggiator, ArpeggiatorSettings, MAX_RATE, MAX_STEP_INDEX};
pub use doubler::{Doubler, DoublerSettings};
pub use harmonizer::{Harmonizer, HarmonizerSettings, MAX_HARMONY_DEGREE};
pub use spreader::{Spreader, SpreaderSettings, StrumDirection, MAX_SPREAD_FRACTION};
pub use transposer::{Transposer, TransposerSettings};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::midi::{sort_events, NoteEvent};

/// An event stream transform. Effects never fail on well-formed input and
/// map an empty stream to an empty stream.
pub trait MidiFx: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, events: Vec<NoteEvent>) -> Vec<NoteEvent>;
}

/// Implements construction, settings access and `MidiFx` for an effect struct
/// holding a validated `settings` field.
/// Usage: `impl_midi_fx_boilerplate!(StructName, SettingsType, "Display Name");`
macro_rules! impl_midi_fx_boilerplate {
    ($ty:ident, $settings:ty, $name:expr) => {
        impl $ty {
            pub fn new(settings: $settings) -> $crate::error::Result<Self> {
                settings.validate()?;
                Ok(Self { settings })
            }

            pub fn settings(&self) -> &$settings {
                &self.settings
            }

            /// Replaces the settings. Invalid settings are rejected and leave the effect unchanged.
            pub fn set_settings(&mut self, settings: $settings) -> $crate::error::Result<()> {
                settings.validate()?;
                self.settings = settings;
                Ok(())
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self { settings: <$settings>::default() }
            }
        }

        impl super::MidiFx for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn apply(&self, events: Vec<$crate::midi::NoteEvent>) -> Vec<$crate::midi::NoteEvent> {
                if events.is_empty() {
                    return events;
                }
                self.apply_impl(events)
            }
        }

        impl TryFrom<$settings> for $ty {
            type Error = $crate::error::ChordalError;

            fn try_from(settings: $settings) -> $crate::error::Result<Self> {
                Self::new(settings)
            }
        }

        impl From<$ty> for $settings {
            fn from(fx: $ty) -> Self {
                fx.settings
            }
        }
    };
}

pub(crate) use impl_midi_fx_boilerplate;

/// Enum wrapper for all effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MidiEffect {
    Doubler(Doubler),
    Harmonizer(Harmonizer),
    Arpeggiator(Arpeggiator),
    Spreader(Spreader),
    Transposer(Transposer),
}

impl MidiEffect {
    pub fn name(&self) -> &str {
        match self {
            Self::Doubler(fx) => fx.name(),
            Self::Harmonizer(fx) => fx.name(),
            Self::Arpeggiator(fx) => fx.name(),
            Self::Spreader(fx) => fx.name(),
            Self::Transposer(fx) => fx.name(),
        }
    }

    pub fn apply(&self, events: Vec<NoteEvent>) -> Vec<NoteEvent> {
        match self {
            Self::Doubler(fx) => fx.apply(events),
            Self::Harmonizer(fx) => fx.apply(events),
            Self::Arpeggiator(fx) => fx.apply(events),
            Self::Spreader(fx) => fx.apply(events),
            Self::Transposer(fx) => fx.apply(events),
        }
    }
}

impl From<Doubler> for MidiEffect {
    fn from(fx: Doubler) -> Self {
        Self::Doubler(fx)
    }
}

impl From<Harmonizer> for MidiEffect {
    fn from(fx: Harmonizer) -> Self {
        Self::Harmonizer(fx)
    }
}

impl From<Arpeggiator> for MidiEffect {
    fn from(fx: Arpeggiator) -> Self {
        Self::Arpeggiator(fx)
    }
}

impl From<Spreader> for MidiEffect {
    fn from(fx: Spreader) -> Self {
        Self::Spreader(fx)
    }
}

impl From<Transposer> for MidiEffect {
    fn from(fx: Transposer) -> Self {
        Self::Transposer(fx)
    }
}

/// Effects applied strictly in order, each one fed the previous one's output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MidiFxChain {
    pub effects: Vec<MidiEffect>,
}

impl MidiFxChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(effects: impl IntoIterator<Item = MidiEffect>) -> Self {
        Self { effects: effects.into_iter().collect() }
    }

    pub fn push(&mut self, effect: impl Into<MidiEffect>) {
        self.effects.push(effect.into());
    }

    pub fn apply(&self, mut events: Vec<NoteEvent>) -> Vec<NoteEvent> {
        for effect in &self.effects {
            let before = events.len();
            events = effect.apply(events);
            debug!(effect = effect.name(), before, after = events.len(), "effect applied");
        }
        events
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Splits events into chord-hold groups: events of the same strike that share
/// start and duration. Groups come out in order of first appearance.
pub(crate) fn chord_groups(events: Vec<NoteEvent>) -> Vec<Vec<NoteEvent>> {
    let mut index: HashMap<(usize, u64, u64), usize> = HashMap::new();
    let mut groups: Vec<Vec<NoteEvent>> = Vec::new();
    for event in events {
        let key = (event.group, event.start.to_bits(), event.duration.to_bits());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(event);
    }
    groups
}

/// Joins groups back into one sorted stream
pub(crate) fn flatten_sorted(groups: Vec<Vec<NoteEvent>>) -> Vec<NoteEvent> {
    let mut events: Vec<NoteEvent> = groups.into_iter().flatten().collect();
    sort_events(&mut events);
    events
}
