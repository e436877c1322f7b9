//! Standard MIDI File export and import using the midly crate

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fs;
use std::path::Path;

use chordal_core::{MidiConversionSettings, NoteEvent, PlayedNote, Progression};
use midly::{Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Result, ServiceError};

/// Microseconds per quarter note when a file has no tempo event (120 BPM)
const DEFAULT_TEMPO_US: u32 = 500_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiExportOptions {
    /// Pulses per quarter note
    pub ppq: u16,
    pub track_name: String,
}

impl Default for MidiExportOptions {
    fn default() -> Self {
        Self { ppq: 480, track_name: "Chords".to_string() }
    }
}

// ============================================================================
// Export
// ============================================================================

/// A note placed on the tick grid
#[derive(Debug, Clone, Copy)]
struct TickNote {
    channel: u8,
    key: u8,
    velocity: u8,
    on: u32,
    off: u32,
}

/// Encodes note events as a two-track Standard MIDI File: a tempo track and a
/// note track starting with a program change for every channel in use.
/// A note still sounding when the same key is struck again is cut just before
/// the new strike.
pub fn export_midi(events: &[NoteEvent], settings: &MidiConversionSettings, options: &MidiExportOptions) -> Result<Vec<u8>> {
    settings.validate()?;
    if options.ppq == 0 || options.ppq > 0x7FFF {
        return Err(ServiceError::Midi(format!("ppq {} outside 1..=32767", options.ppq)));
    }

    let header = Header { format: midly::Format::Parallel, timing: Timing::Metrical(options.ppq.into()) };

    let mut meta_track = Track::new();
    meta_track.push(TrackEvent { delta: 0.into(), kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo_us(settings.tempo).into())) });
    meta_track.push(TrackEvent { delta: 0.into(), kind: TrackEventKind::Meta(MetaMessage::EndOfTrack) });

    let notes = place_notes(events, options.ppq);
    let note_track = note_track(&notes, settings, options);

    let smf = Smf { header, tracks: vec![meta_track, note_track] };
    let mut bytes = Vec::new();
    smf.write(&mut bytes).map_err(|e| ServiceError::Midi(format!("failed to write MIDI: {e}")))?;

    debug!(notes = notes.len(), bytes = bytes.len(), "encoded MIDI file");
    Ok(bytes)
}

/// Encodes and writes a MIDI file
pub fn save_midi(
    path: impl AsRef<Path>,
    events: &[NoteEvent],
    settings: &MidiConversionSettings,
    options: &MidiExportOptions,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = export_midi(events, settings, options)?;
    fs::write(path, &bytes)?;
    info!(path = %path.display(), events = events.len(), "wrote MIDI file");
    Ok(())
}

fn tempo_us(bpm: u32) -> u32 {
    60_000_000 / bpm.max(1)
}

fn beats_to_ticks(beats: f64, ppq: u16) -> u32 {
    (beats * ppq as f64).round().max(0.0) as u32
}

fn clamp_key(pitch: i32) -> u8 {
    if !(0..=127).contains(&pitch) {
        warn!(pitch, "pitch outside MIDI range, clamped");
    }
    pitch.clamp(0, 127) as u8
}

fn place_notes(events: &[NoteEvent], ppq: u16) -> Vec<TickNote> {
    let mut notes: Vec<TickNote> = events
        .iter()
        .map(|e| TickNote {
            channel: e.channel.min(15),
            key: clamp_key(e.pitch()),
            velocity: e.velocity.clamp(1, 127),
            on: beats_to_ticks(e.start, ppq),
            off: beats_to_ticks(e.end(), ppq),
        })
        .collect();
    notes.sort_by_key(|n| (n.on, n.channel, n.key));

    let mut sounding: HashMap<(u8, u8), usize> = HashMap::new();
    for i in 0..notes.len() {
        let key = (notes[i].channel, notes[i].key);
        if let Some(&prev) = sounding.get(&key) {
            if notes[prev].off > notes[i].on {
                debug!(key = notes[i].key, tick = notes[i].on, "cut overlapping note");
                notes[prev].off = notes[i].on;
            }
        }
        sounding.insert(key, i);
    }

    notes.retain(|n| n.off > n.on);
    notes
}

fn note_track<'a>(notes: &[TickNote], settings: &MidiConversionSettings, options: &'a MidiExportOptions) -> Track<'a> {
    let mut track = Track::new();
    track.push(TrackEvent { delta: 0.into(), kind: TrackEventKind::Meta(MetaMessage::TrackName(options.track_name.as_bytes())) });

    let channels: BTreeSet<u8> = notes.iter().map(|n| n.channel).chain([0]).collect();
    for channel in channels {
        track.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::ProgramChange { program: settings.instrument.program().into() },
            },
        });
    }

    // Note-offs sort before note-ons on the same tick
    let mut timed: Vec<(u32, bool, TrackEventKind<'a>)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        timed.push((
            note.on,
            true,
            TrackEventKind::Midi {
                channel: note.channel.into(),
                message: MidiMessage::NoteOn { key: note.key.into(), vel: note.velocity.into() },
            },
        ));
        timed.push((
            note.off,
            false,
            TrackEventKind::Midi {
                channel: note.channel.into(),
                message: MidiMessage::NoteOff { key: note.key.into(), vel: 0.into() },
            },
        ));
    }
    timed.sort_by_key(|(tick, is_on, _)| (*tick, *is_on));

    let mut last_tick = 0;
    for (tick, _, kind) in timed {
        track.push(TrackEvent { delta: (tick - last_tick).into(), kind });
        last_tick = tick;
    }
    track.push(TrackEvent { delta: 0.into(), kind: TrackEventKind::Meta(MetaMessage::EndOfTrack) });
    track
}

// ============================================================================
// Import
// ============================================================================

/// Decodes the notes of every track. Times are in seconds, taken from the
/// first tempo event (120 BPM when there is none). A note-on with velocity 0
/// ends a note; notes never ended close at the end of their track.
pub fn import_notes(bytes: &[u8]) -> Result<Vec<PlayedNote>> {
    let smf = Smf::parse(bytes)?;

    let tempo = smf
        .tracks
        .iter()
        .flatten()
        .find_map(|event| match event.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(t)) => Some(t.as_int()),
            _ => None,
        })
        .unwrap_or(DEFAULT_TEMPO_US);

    let (per_tick, ticks_per_unit) = match smf.header.timing {
        Timing::Metrical(ppq) => (tempo as f64, 1_000_000.0 * ppq.as_int() as f64),
        Timing::Timecode(fps, subframe) => (1.0, fps.as_f32() as f64 * subframe as f64),
    };
    let seconds = |ticks: u64| ticks as f64 * per_tick / ticks_per_unit;

    let mut notes = Vec::new();
    for track in &smf.tracks {
        let mut tick: u64 = 0;
        let mut pending: HashMap<(u8, u8), VecDeque<(u64, u8)>> = HashMap::new();
        let close = |key: u8, start: u64, velocity: u8, end: u64| PlayedNote {
            time: seconds(start),
            pitch: key as i32,
            duration: seconds(end - start),
            velocity,
        };

        for event in track {
            tick += event.delta.as_int() as u64;
            let TrackEventKind::Midi { channel, message } = event.kind else {
                continue;
            };
            let (key, on) = match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => (key.as_int(), Some(vel.as_int())),
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => (key.as_int(), None),
                _ => continue,
            };
            let slot = pending.entry((channel.as_int(), key)).or_default();
            match on {
                Some(velocity) => slot.push_back((tick, velocity)),
                None => {
                    if let Some((start, velocity)) = slot.pop_front() {
                        notes.push(close(key, start, velocity, tick));
                    }
                }
            }
        }

        for ((_, key), slot) in pending {
            notes.extend(slot.into_iter().map(|(start, velocity)| close(key, start, velocity, tick)));
        }
    }

    notes.sort_by(|a, b| a.time.total_cmp(&b.time).then(a.pitch.cmp(&b.pitch)));
    debug!(notes = notes.len(), tempo, "decoded MIDI file");
    Ok(notes)
}

/// Rebuilds a progression from the notes of a MIDI file
pub fn progression_from_midi_bytes(bytes: &[u8]) -> Result<Progression> {
    let notes = import_notes(bytes)?;
    Ok(Progression::from_played_notes(&notes)?)
}

/// Reads a MIDI file and groups its notes back into chords
pub fn load_progression(path: impl AsRef<Path>) -> Result<Progression> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let progression = progression_from_midi_bytes(&bytes)?;
    info!(path = %path.display(), chords = progression.len(), "read MIDI file");
    Ok(progression)
}
