//! chordal-services: Progression text and workbook files, Standard MIDI Files and render configuration

pub mod config;
mod error;
pub mod midi_file;
pub mod text;
pub mod xlsx;

pub use config::{default_config_path, RenderConfig};
pub use error::{Result, ServiceError};
pub use midi_file::{export_midi, import_notes, load_progression, progression_from_midi_bytes, save_midi, MidiExportOptions};
pub use text::{read_progression, write_progression};
pub use xlsx::{read_xlsx, write_xlsx};
