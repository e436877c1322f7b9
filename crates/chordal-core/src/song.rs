//! Songs made of named progression sections

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::progression::{Progression, TextLayout};

/// A named part of a song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongSection {
    /// Section name shown as a header ("Intro", "Verse", ...)
    pub name: String,
    /// Chords played in this section
    pub progression: Progression,
}

impl SongSection {
    pub fn new(name: impl Into<String>, progression: Progression) -> Self {
        Self { name: name.into(), progression }
    }
}

/// Sections in playback order. A section played twice in a row appears twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub sections: Vec<SongSection>,
}

impl Song {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_section(&mut self, section: SongSection) {
        self.sections.push(section);
    }

    /// The whole song as one progression
    pub fn progression(&self) -> Progression {
        let mut progression = Progression::new();
        for section in &self.sections {
            progression.append(&section.progression);
        }
        progression
    }

    /// Each run of identical consecutive sections is written once with a
    /// `Name (xN)` header, underlined with `=`. Blocks are separated by a blank line.
    pub fn to_string_with(&self, layout: &TextLayout) -> String {
        let mut blocks: Vec<(&SongSection, usize)> = Vec::new();
        for section in &self.sections {
            match blocks.last_mut() {
                Some((last, count)) if *last == section => *count += 1,
                _ => blocks.push((section, 1)),
            }
        }

        blocks
            .iter()
            .map(|(section, count)| {
                let header = if *count > 1 { format!("{} (x{count})", section.name) } else { section.name.clone() };
                let underline = "=".repeat(header.chars().count());
                format!(
                    "{header}{nl}{underline}{nl}{body}",
                    nl = layout.newline,
                    body = section.progression.to_string_with(layout)
                )
            })
            .collect::<Vec<_>>()
            .join(&layout.newline)
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(&TextLayout::default()))
    }
}
