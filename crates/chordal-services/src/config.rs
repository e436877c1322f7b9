//! Render configuration loaded from TOML

use std::fs;
use std::path::{Path, PathBuf};

use chordal_core::{MidiConversionSettings, MidiFxChain, TextLayout};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::midi_file::MidiExportOptions;
use crate::Result;

/// Everything needed to render a progression. Every section is optional.
///
/// ```toml
/// [midi]
/// tempo = 90
/// beats_per_chord = 4.0
///
/// [layout]
/// chords_per_row = 8
///
/// [[effects]]
/// type = "arpeggiator"
/// pattern = "up_down"
/// rate = 4.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub midi: MidiConversionSettings,
    pub layout: TextLayout,
    pub export: MidiExportOptions,
    /// Applied in order to the converted events
    pub effects: MidiFxChain,
}

impl RenderConfig {
    /// Parses and validates a configuration
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.midi.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_toml_str(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), effects = config.effects.len(), "loaded config");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        info!(path = %path.display(), "saved config");
        Ok(())
    }
}

/// `<config dir>/chordal/config.toml`
pub fn default_config_path(config_dir: Option<PathBuf>) -> PathBuf {
    config_dir.unwrap_or_else(|| PathBuf::from(".")).join("chordal").join("config.toml")
}
