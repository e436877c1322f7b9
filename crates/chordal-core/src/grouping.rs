//! Grouping played notes into chords by onset density

use serde::{Deserialize, Serialize};

use crate::error::{ChordalError, Result};

/// Notes whose onsets are closer than this (seconds) belong to one chord
pub const MIN_SEPARATION: f64 = 0.1;

/// Share of the weakest note density still counted as inside a chord
const THRESHOLD_FACTOR: f64 = 0.95;

/// Upper bound on density samples for one grouping pass
const MAX_BUCKETS: usize = 1_000_000;

/// A note as played: onset and duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayedNote {
    pub time: f64,
    pub pitch: i32,
    pub duration: f64,
    pub velocity: u8,
}

/// Gaussian density kernel with a width of `min_separation`
pub fn gaussian_kernel(distance: f64, min_separation: f64) -> f64 {
    (-(distance / min_separation).powi(2)).exp()
}

/// Groups notes into chords with the Gaussian kernel
pub fn group_notes_to_chords(notes: &[PlayedNote], min_separation: f64) -> Result<Vec<Vec<PlayedNote>>> {
    group_notes_to_chords_with(notes, min_separation, |d| gaussian_kernel(d, min_separation))
}

/// Groups notes into chords by kernel density estimation.
///
/// Onset density is sampled in buckets of `min_separation` seconds. The
/// threshold is just under the weakest density found at any note's bucket, so
/// every note lands in a chord; runs of buckets above it form one chord.
///
/// `min_separation` must be finite and positive, and note times and durations
/// finite.
pub fn group_notes_to_chords_with<K>(
    notes: &[PlayedNote],
    min_separation: f64,
    kernel: K,
) -> Result<Vec<Vec<PlayedNote>>>
where
    K: Fn(f64) -> f64,
{
    if !min_separation.is_finite() || min_separation <= 0.0 {
        return Err(ChordalError::InvalidSettings(format!(
            "min_separation must be a positive number of seconds, got {min_separation}"
        )));
    }
    if let Some(bad) = notes.iter().find(|n| !n.time.is_finite() || !n.duration.is_finite()) {
        return Err(ChordalError::InvalidSettings(format!(
            "note {} has a non-finite time or duration",
            bad.pitch
        )));
    }
    if notes.is_empty() {
        return Ok(Vec::new());
    }

    let mut notes = notes.to_vec();
    notes.sort_by(|a, b| a.time.total_cmp(&b.time));

    let min_time = notes[0].time;
    let last = notes[notes.len() - 1];
    if last.time - min_time <= min_separation {
        return Ok(vec![notes]);
    }

    let span = last.time + last.duration - min_time;
    let buckets_needed = (span / min_separation).ceil();
    if buckets_needed > MAX_BUCKETS as f64 {
        return Err(ChordalError::InvalidSettings(format!(
            "{span}s of notes at a separation of {min_separation}s needs more than {MAX_BUCKETS} samples"
        )));
    }
    let bucket_count = (buckets_needed as usize).max(1);
    let density: Vec<f64> = (0..bucket_count)
        .map(|i| {
            let t = min_time + i as f64 * min_separation;
            notes.iter().map(|n| kernel((n.time - t).abs())).sum()
        })
        .collect();

    let mut buckets: Vec<Vec<PlayedNote>> = vec![Vec::new(); bucket_count];
    let mut threshold = f64::INFINITY;
    for note in &notes {
        let bucket = (((note.time - min_time) / min_separation) as usize).min(bucket_count - 1);
        buckets[bucket].push(*note);
        threshold = threshold.min(density[bucket]);
    }
    threshold *= THRESHOLD_FACTOR;

    let mut chords = Vec::new();
    let mut current: Vec<PlayedNote> = Vec::new();
    for (bucket, value) in buckets.into_iter().zip(density) {
        if value > threshold {
            current.extend(bucket);
        } else if !current.is_empty() {
            chords.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chords.push(current);
    }
    Ok(chords)
}
