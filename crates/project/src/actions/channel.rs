use bevy_ecs::{name::Name, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConsistencyError, EditError, ValidationError},
    ids::TrackId,
    routing::recalculate_processing_schedule,
    track::{ChannelButton, ChannelState, Tracklist},
};

use super::Undoable;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ChannelEditRequest {
    Rename {
        track: TrackId,
        name: String,
    },
    SetGain {
        track: TrackId,
        gain: f32,
    },
    SetButton {
        track: TrackId,
        button: ChannelButton,
        value: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ChannelEdit {
    Rename { before: String, after: String },
    SetGain { before: f32, after: f32 },
    SetButton { button: ChannelButton, before: bool, after: bool },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelEditAction {
    track: TrackId,
    edit: ChannelEdit,
    already_applied: bool,
}

fn find_entity(world: &World, track: TrackId) -> Result<Entity, ValidationError> {
    world
        .get_resource::<Tracklist>()
        .and_then(|tracklist| tracklist.entity(track))
        .ok_or(ValidationError::TrackNotFound(track))
}

impl ChannelEditAction {
    pub fn new(world: &World, request: ChannelEditRequest) -> Result<Self, EditError> {
        let (track, edit) = match request {
            ChannelEditRequest::Rename { track, name } => {
                let entity = find_entity(world, track)?;
                let before = world
                    .get::<Name>(entity)
                    .ok_or(ConsistencyError::MissingComponent {
                        track,
                        component: "Name",
                    })?
                    .as_str()
                    .to_owned();
                (track, ChannelEdit::Rename { before, after: name })
            }
            ChannelEditRequest::SetGain { track, gain } => {
                if !gain.is_finite() || gain < 0.0 {
                    return Err(ValidationError::InvalidGain(gain).into());
                }
                let state = channel_state(world, track)?;
                (
                    track,
                    ChannelEdit::SetGain {
                        before: state.gain_value,
                        after: gain,
                    },
                )
            }
            ChannelEditRequest::SetButton {
                track,
                button,
                value,
            } => {
                let state = channel_state(world, track)?;
                (
                    track,
                    ChannelEdit::SetButton {
                        button,
                        before: state.get_button(button),
                        after: value,
                    },
                )
            }
        };

        Ok(Self {
            track,
            edit,
            already_applied: false,
        })
    }

    fn set(&self, world: &mut World, forward: bool) -> Result<(), EditError> {
        let entity = find_entity(world, self.track)?;
        let missing = |component: &'static str| ConsistencyError::MissingComponent {
            track: self.track,
            component,
        };

        match &self.edit {
            ChannelEdit::Rename { before, after } => {
                let mut name = world.get_mut::<Name>(entity).ok_or(missing("Name"))?;
                name.set(if forward { after.clone() } else { before.clone() });
            }
            ChannelEdit::SetGain { before, after } => {
                let mut state = world
                    .get_mut::<ChannelState>(entity)
                    .ok_or(missing("ChannelState"))?;
                state.gain_value = if forward { *after } else { *before };
            }
            ChannelEdit::SetButton {
                button,
                before,
                after,
            } => {
                let mut state = world
                    .get_mut::<ChannelState>(entity)
                    .ok_or(missing("ChannelState"))?;
                state.set_button(*button, if forward { *after } else { *before });
            }
        }

        recalculate_processing_schedule(world)?;
        Ok(())
    }
}

fn channel_state(world: &World, track: TrackId) -> Result<&ChannelState, EditError> {
    let entity = find_entity(world, track)?;
    Ok(world
        .get::<ChannelState>(entity)
        .ok_or(ConsistencyError::MissingComponent {
            track,
            component: "ChannelState",
        })?)
}

impl Undoable for ChannelEditAction {
    fn apply(&mut self, world: &mut World) -> Result<(), EditError> {
        self.set(world, true)?;
        self.already_applied = true;
        Ok(())
    }

    fn undo(&mut self, world: &mut World) -> Result<(), EditError> {
        if !self.already_applied {
            return Err(ConsistencyError::NotApplied.into());
        }
        self.set(world, false)
    }

    fn describe(&self) -> String {
        match &self.edit {
            ChannelEdit::Rename { after, .. } => format!("Rename Track to {after}"),
            ChannelEdit::SetGain { .. } => "Change Fader".to_owned(),
            ChannelEdit::SetButton { button, after, .. } => {
                let verb = match (*button, *after) {
                    (ChannelButton::Mute, true) => "Mute",
                    (ChannelButton::Mute, false) => "Unmute",
                    (ChannelButton::Solo, true) => "Solo",
                    (ChannelButton::Solo, false) => "Unsolo",
                    (ChannelButton::Arm, true) => "Arm",
                    (ChannelButton::Arm, false) => "Disarm",
                };
                format!("{verb} Track")
            }
        }
    }

    fn already_applied(&self) -> bool {
        self.already_applied
    }
}
