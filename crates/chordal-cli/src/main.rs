//! chordal: chord progression converter

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chordal_core::{render, Chord, Note, Progression};
use chordal_services::{
    default_config_path, load_progression, read_progression, read_xlsx, save_midi, write_progression, write_xlsx,
    RenderConfig,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chordal", about = "Chord names, progressions and MIDI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a progression between text, workbooks, MIDI and JSON note events
    Convert {
        /// A .txt, .xlsx or .mid file, or chord names such as "C Fm -- G7"
        input: String,

        /// Output file: .txt, .xlsx, .mid or .json
        output: PathBuf,

        /// Render config (defaults to <config dir>/chordal/config.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Tempo in BPM
        #[arg(long)]
        tempo: Option<u32>,

        #[arg(long)]
        beats_per_chord: Option<f64>,

        /// General MIDI program number
        #[arg(long)]
        instrument: Option<u8>,

        #[arg(long)]
        velocity: Option<u8>,

        /// Times the progression is played
        #[arg(long)]
        repeat: Option<u32>,

        /// Semitones to transpose by before rendering
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        transpose: i32,
    },

    /// Show the notes of a chord name
    Show {
        chord: String,
    },

    /// Name the chord formed by MIDI pitches or note names ("60 64 67", "E3 C4 G4")
    Name {
        #[arg(required = true, allow_hyphen_values = true)]
        notes: Vec<String>,
    },

    /// Write the default render config to the config dir
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("chordal=info".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Convert { input, output, config, tempo, beats_per_chord, instrument, velocity, repeat, transpose } => {
            let mut config = load_config(config.as_deref())?;
            let midi = &mut config.midi;
            midi.tempo = tempo.unwrap_or(midi.tempo);
            midi.beats_per_chord = beats_per_chord.unwrap_or(midi.beats_per_chord);
            midi.instrument.0 = instrument.unwrap_or(midi.instrument.0);
            midi.velocity = velocity.unwrap_or(midi.velocity);
            midi.repeat = repeat.unwrap_or(midi.repeat);
            config.midi.validate().context("invalid conversion settings")?;

            let progression = read_input(&input)?.transpose(transpose);
            write_output(&progression, &output, &config)?;
        }
        Command::Show { chord } => {
            let chord: Chord = chord.parse()?;
            println!("{}", chord.name());
            println!("  root:      {}", chord.root());
            if let Some(bass) = chord.bass() {
                println!("  bass:      {bass}");
            }
            println!("  intervals: {}", chord.intervals());
            let notes: Vec<String> = chord.notes().iter().map(Note::to_string).collect();
            println!("  notes:     {}", notes.join(" "));
            println!("  midi:      {:?}", chord.midi());
        }
        Command::Name { notes } => {
            let pitches = notes.iter().map(|n| parse_pitch(n)).collect::<Result<Vec<_>>>()?;
            println!("{}", Chord::from_midi(&pitches)?.name());
        }
        Command::InitConfig { force } => {
            let path = default_config_path(dirs::config_dir());
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            RenderConfig::default().save(&path)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RenderConfig> {
    if let Some(path) = path {
        return RenderConfig::load(path).with_context(|| format!("failed to load config {}", path.display()));
    }
    let default = default_config_path(dirs::config_dir());
    if default.exists() {
        return RenderConfig::load(&default).with_context(|| format!("failed to load config {}", default.display()));
    }
    Ok(RenderConfig::default())
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase())
}

fn read_input(input: &str) -> Result<Progression> {
    let path = Path::new(input);
    let progression = match extension(path).as_deref() {
        Some("txt") => read_progression(path).with_context(|| format!("failed to read {input}"))?,
        Some("xlsx") => read_xlsx(path).with_context(|| format!("failed to read {input}"))?,
        Some("mid" | "midi") => load_progression(path).with_context(|| format!("failed to read {input}"))?,
        _ => Progression::from_string(input).context("failed to parse progression")?,
    };
    if progression.is_empty() {
        bail!("progression is empty");
    }
    Ok(progression)
}

fn write_output(progression: &Progression, output: &Path, config: &RenderConfig) -> Result<()> {
    match extension(output).as_deref() {
        Some("txt") => write_progression(output, progression, &config.layout)?,
        Some("xlsx") => write_xlsx(output, progression, config.layout.chords_per_row)?,
        Some("mid" | "midi") => {
            let events = render(progression, &config.midi, &config.effects)?;
            save_midi(output, &events, &config.midi, &config.export)?;
        }
        Some("json") => {
            let events = render(progression, &config.midi, &config.effects)?;
            fs::write(output, serde_json::to_string_pretty(&events)?)
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
        _ => bail!("unsupported output {} (expected .txt, .xlsx, .mid or .json)", output.display()),
    }
    tracing::info!(chords = progression.len(), output = %output.display(), "converted");
    Ok(())
}

/// A MIDI number or a note name with an optional octave
fn parse_pitch(text: &str) -> Result<i32> {
    if let Ok(midi) = text.parse::<i32>() {
        return Ok(midi);
    }
    Ok(Note::parse(text)?.midi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pitch() {
        assert_eq!(parse_pitch("60").unwrap(), 60);
        assert_eq!(parse_pitch("A4").unwrap(), 69);
        assert_eq!(parse_pitch("C").unwrap(), 60);
        assert!(parse_pitch("H2").is_err());
    }

    #[test]
    fn test_read_input_from_names() {
        let progression = read_input("C Fm -- G7").unwrap();
        assert_eq!(progression.len(), 4);
        assert!(read_input("   ").is_err());
    }

    #[test]
    fn test_xlsx_convert_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.xlsx");
        let progression = read_input("C Fm -- G7 C").unwrap();

        write_output(&progression, &path, &RenderConfig::default()).unwrap();
        assert_eq!(read_input(path.to_str().unwrap()).unwrap(), progression);
        assert!(write_output(&progression, &dir.path().join("song.ods"), &RenderConfig::default()).is_err());
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::parse_from(["chordal", "convert", "C G7", "out.mid", "--tempo", "90", "--transpose", "-2"]);
        let Command::Convert { input, tempo, transpose, .. } = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(input, "C G7");
        assert_eq!(tempo, Some(90));
        assert_eq!(transpose, -2);
    }
}
