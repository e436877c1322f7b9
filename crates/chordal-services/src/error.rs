//! Error types for chordal-services

use chordal_core::ChordalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Chord(#[from] ChordalError),
    #[error("MIDI error: {0}")]
    Midi(String),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),
}

impl From<midly::Error> for ServiceError {
    fn from(e: midly::Error) -> Self {
        Self::Midi(e.to_string())
    }
}

impl From<calamine::XlsxError> for ServiceError {
    fn from(e: calamine::XlsxError) -> Self {
        Self::Spreadsheet(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ServiceError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        Self::Spreadsheet(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
