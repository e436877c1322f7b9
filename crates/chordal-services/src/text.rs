//! Plain-text progression files

use std::fs;
use std::path::Path;

use chordal_core::{Progression, TextLayout};
use tracing::info;

/// Reads whitespace-separated chord names, `--` repeating the previous chord
pub fn read_progression(path: impl AsRef<Path>) -> crate::Result<Progression> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let progression = Progression::from_string(&text)?;
    info!(path = %path.display(), chords = progression.len(), "read progression");
    Ok(progression)
}

/// Writes the progression in fixed-width columns
pub fn write_progression(path: impl AsRef<Path>, progression: &Progression, layout: &TextLayout) -> crate::Result<()> {
    let path = path.as_ref();
    fs::write(path, progression.to_string_with(layout))?;
    info!(path = %path.display(), chords = progression.len(), "wrote progression");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceError;
    use chordal_core::ChordalError;

    const SONG: &str = "C Fm C G7 C E7 Am G G G G G";

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.txt");
        let progression: Progression = SONG.parse().unwrap();

        write_progression(&path, &progression, &TextLayout::default()).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "C   Fm  C   G7\nC   E7  Am  G\n--  --  --  --\n"
        );
        assert_eq!(read_progression(&path).unwrap(), progression);
    }

    #[test]
    fn test_custom_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.txt");
        let layout = TextLayout { chords_per_row: 8, column_spacing: 1, ..Default::default() };
        write_progression(&path, &SONG.parse().unwrap(), &layout).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "C  Fm C  G7 C  E7 Am G\n-- -- -- --\n"
        );
    }

    #[test]
    fn test_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_progression(dir.path().join("missing.txt")), Err(ServiceError::Io(_))));

        let path = dir.path().join("bad.txt");
        fs::write(&path, "C Hm7").unwrap();
        assert!(matches!(read_progression(&path), Err(ServiceError::Chord(ChordalError::InvalidChord(_)))));
    }
}
