use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConsistencyError, EditError},
    graph::GraphEdit,
    ids::{RegionId, TrackId},
    region::RegionContent,
    track::{Lanes, Tracklist},
    transport::{Transport, validate_beat_unit, validate_beats_per_bar, validate_bpm},
};

use super::Undoable;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TransportEditRequest {
    TempoChange(f64),
    BeatsPerBarChange(u32),
    BeatUnitChange(u32),
}

/// Stretch ratio of one musical-mode audio region across a tempo change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionStretch {
    pub track: TrackId,
    pub region: RegionId,
    pub ratio_before: f64,
    pub ratio_after: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TransportEdit {
    TempoChange {
        value_before: f64,
        value_after: f64,
        /// Filled in by the first do.
        rescaled: Vec<RegionStretch>,
    },
    BeatsPerBarChange {
        value_before: u32,
        value_after: u32,
    },
    BeatUnitChange {
        value_before: u32,
        value_after: u32,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportEditAction {
    edit: TransportEdit,
    /// Musical mode as it was when the edit was made. Later toggles don't
    /// change what this edit does.
    musical_mode: bool,
    already_applied: bool,
}

impl TransportEditAction {
    pub fn new(world: &World, request: TransportEditRequest) -> Result<Self, EditError> {
        let transport = world
            .get_resource::<Transport>()
            .ok_or(ConsistencyError::MissingResource("Transport"))?;

        let edit = match request {
            TransportEditRequest::TempoChange(bpm) => {
                validate_bpm(bpm)?;
                TransportEdit::TempoChange {
                    value_before: transport.bpm,
                    value_after: bpm,
                    rescaled: Vec::new(),
                }
            }
            TransportEditRequest::BeatsPerBarChange(beats_per_bar) => {
                validate_beats_per_bar(beats_per_bar)?;
                TransportEdit::BeatsPerBarChange {
                    value_before: transport.beats_per_bar,
                    value_after: beats_per_bar,
                }
            }
            TransportEditRequest::BeatUnitChange(beat_unit) => {
                validate_beat_unit(beat_unit)?;
                TransportEdit::BeatUnitChange {
                    value_before: transport.beat_unit,
                    value_after: beat_unit,
                }
            }
        };

        Ok(Self {
            edit,
            musical_mode: transport.musical_mode,
            already_applied: false,
        })
    }

    pub fn edit(&self) -> &TransportEdit {
        &self.edit
    }
}

/// Musical-mode audio regions keep their length in ticks, so their stretch
/// ratio scales with the inverse of the tempo change.
fn plan_rescale(world: &World, bpm_before: f64, bpm_after: f64) -> Vec<RegionStretch> {
    let Some(tracklist) = world.get_resource::<Tracklist>() else {
        return Vec::new();
    };

    let mut rescaled = Vec::new();
    for (track, entity) in tracklist.iter() {
        let Some(lanes) = world.get::<Lanes>(entity) else {
            continue;
        };
        for region in &lanes.regions {
            if let RegionContent::Audio {
                stretch_ratio,
                musical: true,
                ..
            } = region.content
            {
                rescaled.push(RegionStretch {
                    track,
                    region: region.id,
                    ratio_before: stretch_ratio,
                    ratio_after: stretch_ratio * bpm_before / bpm_after,
                });
            }
        }
    }
    rescaled
}

fn set_stretch_ratios(
    edit: &mut GraphEdit,
    rescaled: &[RegionStretch],
    ratio: impl Fn(&RegionStretch) -> f64,
) -> Result<(), EditError> {
    for stretch in rescaled {
        let region = edit
            .track(stretch.track)?
            .lanes
            .region_mut(stretch.region)
            .ok_or(ConsistencyError::MissingRegion(stretch.region))?;
        region.set_stretch_ratio(ratio(stretch));
    }
    Ok(())
}

impl Undoable for TransportEditAction {
    fn apply(&mut self, world: &mut World) -> Result<(), EditError> {
        let musical_mode = self.musical_mode;
        let first = !self.already_applied;

        match &mut self.edit {
            TransportEdit::TempoChange {
                value_before,
                value_after,
                rescaled,
            } => {
                let planned = if first && musical_mode {
                    plan_rescale(world, *value_before, *value_after)
                } else {
                    rescaled.clone()
                };

                let mut edit = GraphEdit::new(world);
                edit.transport_mut()?.bpm = *value_after;
                set_stretch_ratios(&mut edit, &planned, |stretch| stretch.ratio_after)?;
                edit.commit()?;

                *rescaled = planned;
            }
            TransportEdit::BeatsPerBarChange { value_after, .. } => {
                let mut edit = GraphEdit::new(world);
                edit.transport_mut()?.beats_per_bar = *value_after;
                edit.commit()?;
            }
            TransportEdit::BeatUnitChange { value_after, .. } => {
                let mut edit = GraphEdit::new(world);
                edit.transport_mut()?.beat_unit = *value_after;
                edit.commit()?;
            }
        }

        self.already_applied = true;
        Ok(())
    }

    fn undo(&mut self, world: &mut World) -> Result<(), EditError> {
        if !self.already_applied {
            return Err(ConsistencyError::NotApplied.into());
        }

        let mut edit = GraphEdit::new(world);
        match &self.edit {
            TransportEdit::TempoChange {
                value_before,
                rescaled,
                ..
            } => {
                edit.transport_mut()?.bpm = *value_before;
                set_stretch_ratios(&mut edit, rescaled, |stretch| stretch.ratio_before)?;
            }
            TransportEdit::BeatsPerBarChange { value_before, .. } => {
                edit.transport_mut()?.beats_per_bar = *value_before;
            }
            TransportEdit::BeatUnitChange { value_before, .. } => {
                edit.transport_mut()?.beat_unit = *value_before;
            }
        }
        edit.commit()?;
        Ok(())
    }

    fn describe(&self) -> String {
        match self.edit {
            TransportEdit::TempoChange { .. } => "Change Tempo".to_owned(),
            TransportEdit::BeatsPerBarChange { .. } => "Change Beats Per Bar".to_owned(),
            TransportEdit::BeatUnitChange { .. } => "Change Beat Unit".to_owned(),
        }
    }

    fn already_applied(&self) -> bool {
        self.already_applied
    }
}
