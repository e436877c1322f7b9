//! Chord progressions and their text / grid layouts

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chord::Chord;
use crate::error::{ChordalError, Result};
use crate::grouping::{group_notes_to_chords, PlayedNote, MIN_SEPARATION};
use crate::knowledge::REPETITION_SYMBOL;
use crate::midi::{self, MidiConversionSettings, NoteEvent};

/// Column layout used when writing a progression as text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextLayout {
    pub chords_per_row: usize,
    /// Spaces between the widest name and the next column
    pub column_spacing: usize,
    pub newline: String,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self { chords_per_row: 4, column_spacing: 2, newline: "\n".to_string() }
    }
}

/// One chord of a progression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionEntry {
    pub chord: Chord,
    /// Length in beats; `None` uses the conversion's beats-per-chord
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Chords in musical order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    entries: Vec<ProgressionEntry>,
}

impl Progression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chords(chords: impl IntoIterator<Item = Chord>) -> Self {
        Self {
            entries: chords.into_iter().map(|chord| ProgressionEntry { chord, duration: None }).collect(),
        }
    }

    /// Parses whitespace-separated chord names. `--` repeats the previous chord.
    pub fn from_string(text: &str) -> Result<Self> {
        Self::from_tokens(text.split_whitespace())
    }

    fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut progression = Self::new();
        for token in tokens {
            if token == REPETITION_SYMBOL {
                let previous = progression.entries.last().cloned().ok_or_else(|| {
                    ChordalError::InvalidProgression(format!(
                        "{REPETITION_SYMBOL} before any chord has been given"
                    ))
                })?;
                progression.entries.push(previous);
            } else {
                progression.push(token.parse()?);
            }
        }
        Ok(progression)
    }

    /// Reads a grid of optional cell texts, left to right then top to bottom.
    /// An empty cell followed by a chord in the same row holds the previous
    /// chord, like `--`. Blanks before the first chord and at the end of a row
    /// are padding and skipped.
    pub fn from_cells<S: AsRef<str>>(rows: &[Vec<Option<S>>]) -> Result<Self> {
        let mut tokens: Vec<&str> = Vec::new();
        for row in rows {
            let cells: Vec<&str> = row
                .iter()
                .map(|cell| cell.as_ref().map_or("", |c| c.as_ref().trim()))
                .collect();
            let used = cells.iter().rposition(|c| !c.is_empty()).map_or(0, |last| last + 1);
            for &cell in &cells[..used] {
                match cell {
                    "" if tokens.is_empty() => {}
                    "" => tokens.push(REPETITION_SYMBOL),
                    _ => tokens.push(cell),
                }
            }
        }
        Self::from_tokens(tokens)
    }

    /// Reconstructs chords from played notes (times in seconds)
    pub fn from_played_notes(notes: &[PlayedNote]) -> Result<Self> {
        let groups = group_notes_to_chords(notes, MIN_SEPARATION)?;
        let chords = groups
            .iter()
            .map(|group| {
                let pitches: Vec<i32> = group.iter().map(|n| n.pitch).collect();
                Chord::from_midi(&pitches)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_chords(chords))
    }

    pub fn push(&mut self, chord: Chord) {
        self.entries.push(ProgressionEntry { chord, duration: None });
    }

    /// Adds a chord held for an explicit number of beats
    pub fn push_with_duration(&mut self, chord: Chord, beats: f64) -> Result<()> {
        if !beats.is_finite() || beats <= 0.0 {
            return Err(ChordalError::InvalidProgression(format!(
                "duration must be a positive number of beats, got {beats}"
            )));
        }
        self.entries.push(ProgressionEntry { chord, duration: Some(beats) });
        Ok(())
    }

    /// Appends every entry of `other`, keeping their durations
    pub fn append(&mut self, other: &Progression) {
        self.entries.extend(other.entries.iter().cloned());
    }

    pub fn entries(&self) -> &[ProgressionEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chord> {
        self.entries.iter().map(|e| &e.chord)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every chord moved by the same interval; durations are kept
    pub fn transpose(&self, semitones: i32) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|e| ProgressionEntry { chord: e.chord.transpose(semitones), duration: e.duration })
                .collect(),
        }
    }

    /// Distinct chords
    pub fn chords(&self) -> HashSet<Chord> {
        self.iter().cloned().collect()
    }

    /// Sounding pitches of each chord
    pub fn midi(&self) -> Vec<Vec<i32>> {
        self.iter().map(Chord::midi).collect()
    }

    pub fn to_midi(&self, settings: &MidiConversionSettings) -> Result<Vec<NoteEvent>> {
        midi::to_midi(self, settings)
    }

    /// Names to write, with `--` for a chord named like the one before it
    fn display_names(&self) -> Vec<String> {
        let mut previous: Option<String> = None;
        self.iter()
            .map(|chord| {
                let name = chord.name();
                let shown = if previous.as_deref() == Some(name.as_str()) {
                    REPETITION_SYMBOL.to_string()
                } else {
                    name.clone()
                };
                previous = Some(name);
                shown
            })
            .collect()
    }

    /// Fixed-width columns, `chords_per_row` names per line
    pub fn to_string_with(&self, layout: &TextLayout) -> String {
        if self.is_empty() {
            return String::new();
        }
        let names = self.display_names();
        let width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0) + layout.column_spacing;

        let mut out = String::new();
        for row in names.chunks(layout.chords_per_row.max(1)) {
            let line: String = row.iter().map(|name| format!("{name:<width$}")).collect();
            out.push_str(line.trim_end());
            out.push_str(&layout.newline);
        }
        out
    }

    /// Grid of cells, `chords_per_row` per row, with `--` repetitions
    pub fn to_cells(&self, chords_per_row: usize) -> Vec<Vec<Option<String>>> {
        self.display_names()
            .chunks(chords_per_row.max(1))
            .map(|row| row.iter().cloned().map(Some).collect())
            .collect()
    }
}

impl fmt::Display for Progression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(&TextLayout::default()))
    }
}

impl FromStr for Progression {
    type Err = ChordalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

impl FromIterator<Chord> for Progression {
    fn from_iter<I: IntoIterator<Item = Chord>>(iter: I) -> Self {
        Self::from_chords(iter)
    }
}
