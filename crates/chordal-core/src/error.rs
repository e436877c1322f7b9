//! Error types for chordal

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordalError {
    #[error("Invalid chord: {0}")]
    InvalidChord(String),
    #[error("Invalid scale degree: {0}")]
    InvalidDegree(String),
    #[error("Invalid note: {0}")]
    InvalidNote(String),
    #[error("Invalid progression: {0}")]
    InvalidProgression(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

pub type Result<T> = std::result::Result<T, ChordalError>;
