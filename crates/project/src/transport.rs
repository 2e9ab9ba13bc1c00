use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_BPM: f64 = 40.0;
pub const MAX_BPM: f64 = 420.0;
pub const MAX_BEATS_PER_BAR: u32 = 16;
pub const BEAT_UNITS: [u32; 4] = [2, 4, 8, 16];

#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    pub bpm: f64,
    pub beats_per_bar: u32,
    pub beat_unit: u32,
    /// When set, time-stretched audio follows the tempo.
    pub musical_mode: bool,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            beats_per_bar: 4,
            beat_unit: 4,
            musical_mode: false,
        }
    }
}

pub fn validate_bpm(bpm: f64) -> Result<(), ValidationError> {
    if bpm.is_finite() && (MIN_BPM..=MAX_BPM).contains(&bpm) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTempo(bpm))
    }
}

pub fn validate_beats_per_bar(beats_per_bar: u32) -> Result<(), ValidationError> {
    if (1..=MAX_BEATS_PER_BAR).contains(&beats_per_bar) {
        Ok(())
    } else {
        Err(ValidationError::InvalidBeatsPerBar(beats_per_bar))
    }
}

pub fn validate_beat_unit(beat_unit: u32) -> Result<(), ValidationError> {
    if BEAT_UNITS.contains(&beat_unit) {
        Ok(())
    } else {
        Err(ValidationError::InvalidBeatUnit(beat_unit))
    }
}
