use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConsistencyError, EditError, ValidationError},
    graph::GraphEdit,
    ids::{ClipId, TrackId},
    ports::PortOwner,
    routing::world_track_views,
    snapshot::TrackSnapshot,
    track::{TrackKind, Tracklist},
};

use super::{Undoable, mixer::ConnectionHistory};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TracklistEditRequest {
    /// Adds an empty track routed to master, at `position` or at the end.
    Create {
        name: String,
        kind: TrackKind,
        position: Option<usize>,
    },
    Delete {
        track: TrackId,
    },
    Move {
        track: TrackId,
        position: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TracklistEdit {
    Create {
        track: TrackId,
        name: String,
        kind: TrackKind,
        position: usize,
    },
    Delete {
        position: usize,
        snapshot: TrackSnapshot,
        /// Tracks that fed the deleted one; they take over its output.
        rerouted: Vec<TrackId>,
    },
    Move {
        track: TrackId,
        from: usize,
        to: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TracklistEditAction {
    edit: TracklistEdit,
    connections: ConnectionHistory,
    already_applied: bool,
}

impl TracklistEditAction {
    pub fn new(world: &World, request: TracklistEditRequest) -> Result<Self, EditError> {
        let tracklist = world
            .get_resource::<Tracklist>()
            .ok_or(ConsistencyError::MissingResource("Tracklist"))?;
        let len = tracklist.len();

        let edit = match request {
            TracklistEditRequest::Create {
                name,
                kind,
                position,
            } => {
                if kind == TrackKind::Master && tracklist.master().is_some() {
                    return Err(ValidationError::DuplicateMaster.into());
                }
                let position = position.unwrap_or(len);
                if position > len {
                    return Err(ValidationError::TrackPositionOutOfRange { position, len }.into());
                }
                TracklistEdit::Create {
                    track: TrackId::new(),
                    name,
                    kind,
                    position,
                }
            }
            TracklistEditRequest::Delete { track } => {
                let position = tracklist
                    .position(track)
                    .ok_or(ValidationError::TrackNotFound(track))?;
                if tracklist.master() == Some(track) {
                    return Err(ValidationError::MasterTrackLocked.into());
                }
                let rerouted = world_track_views(world)?
                    .iter()
                    .filter(|view| view.output == Some(track))
                    .map(|view| view.id)
                    .collect();
                TracklistEdit::Delete {
                    position,
                    snapshot: TrackSnapshot::capture(world, track)?,
                    rerouted,
                }
            }
            TracklistEditRequest::Move { track, position } => {
                let from = tracklist
                    .position(track)
                    .ok_or(ValidationError::TrackNotFound(track))?;
                if position >= len {
                    return Err(ValidationError::TrackPositionOutOfRange { position, len }.into());
                }
                TracklistEdit::Move {
                    track,
                    from,
                    to: position,
                }
            }
        };

        Ok(Self {
            edit,
            connections: ConnectionHistory::capture(world),
            already_applied: false,
        })
    }

    pub fn edit(&self) -> &TracklistEdit {
        &self.edit
    }

    /// The track a create action adds; the same id on every redo.
    pub fn created_track(&self) -> Option<TrackId> {
        match &self.edit {
            TracklistEdit::Create { track, .. } => Some(*track),
            TracklistEdit::Delete { .. } | TracklistEdit::Move { .. } => None,
        }
    }

    pub(crate) fn references_clip(&self, clip: ClipId) -> bool {
        match &self.edit {
            TracklistEdit::Delete { snapshot, .. } => snapshot
                .lanes
                .regions
                .iter()
                .any(|region| region.clip() == Some(clip)),
            TracklistEdit::Create { .. } | TracklistEdit::Move { .. } => false,
        }
    }

    fn forward(&self, edit: &mut GraphEdit) -> Result<(), EditError> {
        match &self.edit {
            TracklistEdit::Create {
                track,
                name,
                kind,
                position,
            } => {
                edit.add_track(*track, name, *kind);
                edit.move_track(*track, *position)
            }
            TracklistEdit::Delete {
                snapshot,
                rerouted,
                ..
            } => {
                let id = snapshot.track.id;
                for feeder in rerouted {
                    edit.track(*feeder)?.set_output(snapshot.track.output);
                }
                let connections = edit.connections_mut();
                connections.remove_owner(&PortOwner::Track(id));
                for (_, _, plugin) in snapshot.channel.plugins() {
                    connections.remove_owner(&PortOwner::Plugin(plugin.id));
                }
                edit.remove_track(id)
            }
            TracklistEdit::Move { track, to, .. } => edit.move_track(*track, *to),
        }
    }

    fn backward(&self, edit: &mut GraphEdit) -> Result<(), EditError> {
        match &self.edit {
            TracklistEdit::Create { track, .. } => edit.remove_track(*track),
            TracklistEdit::Delete {
                position,
                snapshot,
                rerouted,
            } => {
                edit.restore_track(snapshot.clone(), *position);
                for feeder in rerouted {
                    edit.track(*feeder)?.set_output(Some(snapshot.track.id));
                }
                Ok(())
            }
            TracklistEdit::Move { track, from, .. } => edit.move_track(*track, *from),
        }
    }
}

impl Undoable for TracklistEditAction {
    fn apply(&mut self, world: &mut World) -> Result<(), EditError> {
        let mut edit = GraphEdit::new(world);
        self.forward(&mut edit)?;
        self.connections.replay(&mut edit);
        edit.commit()?;

        self.connections.record(world);
        self.already_applied = true;
        Ok(())
    }

    fn undo(&mut self, world: &mut World) -> Result<(), EditError> {
        if !self.already_applied {
            return Err(ConsistencyError::NotApplied.into());
        }
        let mut edit = GraphEdit::new(world);
        self.backward(&mut edit)?;
        self.connections.restore(&mut edit);
        edit.commit()?;
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.edit {
            TracklistEdit::Create { name, .. } => format!("Create Track {name}"),
            TracklistEdit::Delete { snapshot, .. } => format!("Delete Track {}", snapshot.name),
            TracklistEdit::Move { .. } => "Move Track".to_owned(),
        }
    }

    fn already_applied(&self) -> bool {
        self.already_applied
    }
}
