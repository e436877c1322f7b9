//! Static chord vocabulary: quality templates, aliases and degree families

use serde::{Deserialize, Serialize};

/// Token that repeats the previous chord in a text progression
pub const REPETITION_SYMBOL: &str = "--";

// ============================================================================
// Chord qualities
// ============================================================================

/// Chord quality templates, declared in naming preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordQuality {
    Major,
    Minor,
    Dominant7,
    Major7,
    Minor7,
    HalfDiminished7,
    Diminished,
    Diminished7,
    Augmented,
    Sus4,
    Sus2,
    Power,
    Note,
    Sixth,
    Minor6,
    SixNine,
    Add9,
    MinorAdd9,
    Dominant9,
    Major9,
    Minor9,
    Dominant7Sus4,
    Dominant7Sus2,
    MinorMajor7,
    Augmented7,
    AugmentedMajor7,
    Dominant11,
    Major11,
    Minor11,
    Dominant13,
    Major13,
    Minor13,
}

impl ChordQuality {
    pub const ALL: [ChordQuality; 32] = [
        Self::Major,
        Self::Minor,
        Self::Dominant7,
        Self::Major7,
        Self::Minor7,
        Self::HalfDiminished7,
        Self::Diminished,
        Self::Diminished7,
        Self::Augmented,
        Self::Sus4,
        Self::Sus2,
        Self::Power,
        Self::Note,
        Self::Sixth,
        Self::Minor6,
        Self::SixNine,
        Self::Add9,
        Self::MinorAdd9,
        Self::Dominant9,
        Self::Major9,
        Self::Minor9,
        Self::Dominant7Sus4,
        Self::Dominant7Sus2,
        Self::MinorMajor7,
        Self::Augmented7,
        Self::AugmentedMajor7,
        Self::Dominant11,
        Self::Major11,
        Self::Minor11,
        Self::Dominant13,
        Self::Major13,
        Self::Minor13,
    ];

    /// Semitone offsets above the root (root excluded)
    pub fn intervals(&self) -> &'static [i32] {
        match self {
            Self::Major => &[4, 7],
            Self::Minor => &[3, 7],
            Self::Dominant7 => &[4, 7, 10],
            Self::Major7 => &[4, 7, 11],
            Self::Minor7 => &[3, 7, 10],
            Self::HalfDiminished7 => &[3, 6, 10],
            Self::Diminished => &[3, 6],
            Self::Diminished7 => &[3, 6, 9],
            Self::Augmented => &[4, 8],
            Self::Sus4 => &[5, 7],
            Self::Sus2 => &[2, 7],
            Self::Power => &[7],
            Self::Note => &[],
            Self::Sixth => &[4, 7, 9],
            Self::Minor6 => &[3, 7, 9],
            Self::SixNine => &[4, 7, 9, 14],
            Self::Add9 => &[4, 7, 14],
            Self::MinorAdd9 => &[3, 7, 14],
            Self::Dominant9 => &[4, 7, 10, 14],
            Self::Major9 => &[4, 7, 11, 14],
            Self::Minor9 => &[3, 7, 10, 14],
            Self::Dominant7Sus4 => &[5, 7, 10],
            Self::Dominant7Sus2 => &[2, 7, 10],
            Self::MinorMajor7 => &[3, 7, 11],
            Self::Augmented7 => &[4, 8, 10],
            Self::AugmentedMajor7 => &[4, 8, 11],
            Self::Dominant11 => &[4, 7, 10, 14, 17],
            Self::Major11 => &[4, 7, 11, 14, 17],
            Self::Minor11 => &[3, 7, 10, 14, 17],
            Self::Dominant13 => &[4, 7, 10, 14, 17, 21],
            Self::Major13 => &[4, 7, 11, 14, 17, 21],
            Self::Minor13 => &[3, 7, 10, 14, 17, 21],
        }
    }

    /// Canonical symbol written after the root
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Major => "maj",
            Self::Minor => "m",
            Self::Dominant7 => "7",
            Self::Major7 => "maj7",
            Self::Minor7 => "m7",
            Self::HalfDiminished7 => "m7b5",
            Self::Diminished => "dim",
            Self::Diminished7 => "dim7",
            Self::Augmented => "aug",
            Self::Sus4 => "sus4",
            Self::Sus2 => "sus2",
            Self::Power => "5",
            Self::Note => "n",
            Self::Sixth => "6",
            Self::Minor6 => "m6",
            Self::SixNine => "69",
            Self::Add9 => "add9",
            Self::MinorAdd9 => "madd9",
            Self::Dominant9 => "9",
            Self::Major9 => "maj9",
            Self::Minor9 => "m9",
            Self::Dominant7Sus4 => "7sus4",
            Self::Dominant7Sus2 => "7sus2",
            Self::MinorMajor7 => "mmaj7",
            Self::Augmented7 => "aug7",
            Self::AugmentedMajor7 => "augmaj7",
            Self::Dominant11 => "11",
            Self::Major11 => "maj11",
            Self::Minor11 => "m11",
            Self::Dominant13 => "13",
            Self::Major13 => "maj13",
            Self::Minor13 => "m13",
        }
    }

    /// Position in the preference order
    pub fn rank(&self) -> usize {
        *self as usize
    }

    /// Quality whose symbol or alias is exactly `token`
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|q| q.symbol() == token)
            .or_else(|| ALIASES.iter().find(|(alias, _)| *alias == token).map(|(_, q)| *q))
    }

    /// Every symbol and alias, paired with the quality it names
    pub fn tokens() -> impl Iterator<Item = (&'static str, ChordQuality)> {
        Self::ALL
            .iter()
            .map(|q| (q.symbol(), *q))
            .chain(ALIASES.iter().copied())
    }
}

/// Alternative spellings accepted by the parser; never produced by naming
pub const ALIASES: &[(&str, ChordQuality)] = &[
    ("major", ChordQuality::Major),
    ("M", ChordQuality::Major),
    ("min", ChordQuality::Minor),
    ("minor", ChordQuality::Minor),
    ("-", ChordQuality::Minor),
    ("dom", ChordQuality::Dominant7),
    ("dom7", ChordQuality::Dominant7),
    ("major7", ChordQuality::Major7),
    ("M7", ChordQuality::Major7),
    ("min7", ChordQuality::Minor7),
    ("-7", ChordQuality::Minor7),
    ("min7b5", ChordQuality::HalfDiminished7),
    ("ø", ChordQuality::HalfDiminished7),
    ("o", ChordQuality::Diminished7),
    ("+", ChordQuality::Augmented),
    ("note", ChordQuality::Note),
    ("sus", ChordQuality::Sus4),
    ("6/9", ChordQuality::SixNine),
    ("minmaj7", ChordQuality::MinorMajor7),
];

// ============================================================================
// Degree families
// ============================================================================

/// Offsets that count as a variant of a chord degree, for `noN` and alterations.
/// The first entry of a family is its natural offset when it has one.
pub fn degree_family(number: u8) -> &'static [i32] {
    match number {
        2 => &[2],
        3 => &[4, 3],
        4 => &[5],
        5 => &[7, 6, 8],
        6 => &[9],
        7 => &[10, 11],
        9 => &[14, 13, 15],
        11 => &[17, 16, 18],
        13 => &[21, 20, 22],
        _ => &[],
    }
}

/// Chord degree an offset belongs to, if any
pub fn family_of(semitone: i32) -> Option<u8> {
    [3u8, 5, 7, 9, 11, 13, 2, 4, 6]
        .into_iter()
        .find(|&n| degree_family(n).contains(&semitone))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_templates_are_distinct() {
        let mut seen = HashSet::new();
        for q in ChordQuality::ALL {
            assert!(seen.insert(q.intervals()), "duplicate template for {}", q.symbol());
            assert!(q.intervals().windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_rank_matches_declaration_order() {
        for (i, q) in ChordQuality::ALL.iter().enumerate() {
            assert_eq!(q.rank(), i);
        }
    }

    #[test]
    fn test_tokens() {
        assert_eq!(ChordQuality::from_token("m7b5"), Some(ChordQuality::HalfDiminished7));
        assert_eq!(ChordQuality::from_token("ø"), Some(ChordQuality::HalfDiminished7));
        assert_eq!(ChordQuality::from_token("-"), Some(ChordQuality::Minor));
        assert_eq!(ChordQuality::from_token("xyz"), None);
        let symbols: HashSet<_> = ChordQuality::ALL.iter().map(|q| q.symbol()).collect();
        for (alias, _) in ALIASES {
            assert!(!symbols.contains(alias), "alias {alias} shadows a symbol");
        }
    }

    #[test]
    fn test_families() {
        assert_eq!(family_of(3), Some(3));
        assert_eq!(family_of(4), Some(3));
        assert_eq!(family_of(6), Some(5));
        assert_eq!(family_of(11), Some(7));
        assert_eq!(family_of(15), Some(9));
        assert_eq!(family_of(2), Some(2));
        assert_eq!(family_of(12), None);
    }
}
