use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{error::EditError, ids::ClipId};

mod channel;
mod duplicate;
mod mixer;
mod port_connection;
mod tracklist;
mod transport;

pub use channel::{ChannelEdit, ChannelEditAction, ChannelEditRequest};
pub use duplicate::{DuplicateSelectionAction, DuplicateSelectionRequest, SelectedObject};
pub use mixer::{
    ChangeBypassStatus, ChangeLoadBehavior, ConnectionHistory, CreatePlugins, DeletePlugins,
    DisplacedPlugins, MixerEdit, MixerEditAction, MixerEditRequest, NewChannel, RelocatePlugins,
};
pub use port_connection::{PortConnectionAction, PortConnectionEdit, PortConnectionRequest};
pub use tracklist::{TracklistEdit, TracklistEditAction, TracklistEditRequest};
pub use transport::{RegionStretch, TransportEdit, TransportEditAction, TransportEditRequest};

/// A reversible edit. `apply` runs as the initial do and again on every
/// redo; the first call records whatever redo needs to reproduce it
/// exactly. Either call leaves the project untouched when it fails.
pub trait Undoable {
    fn apply(&mut self, world: &mut World) -> Result<(), EditError>;

    fn undo(&mut self, world: &mut World) -> Result<(), EditError>;

    fn describe(&self) -> String;

    /// False until the first successful `apply`, true from then on.
    fn already_applied(&self) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Mixer,
    Transport,
    DuplicateSelection,
    PortConnection,
    Channel,
    Tracklist,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EditRequest {
    Mixer(MixerEditRequest),
    Transport(TransportEditRequest),
    DuplicateSelection(DuplicateSelectionRequest),
    PortConnection(PortConnectionRequest),
    Channel(ChannelEditRequest),
    Tracklist(TracklistEditRequest),
}

impl From<MixerEditRequest> for EditRequest {
    fn from(request: MixerEditRequest) -> Self {
        EditRequest::Mixer(request)
    }
}

impl From<TransportEditRequest> for EditRequest {
    fn from(request: TransportEditRequest) -> Self {
        EditRequest::Transport(request)
    }
}

impl From<DuplicateSelectionRequest> for EditRequest {
    fn from(request: DuplicateSelectionRequest) -> Self {
        EditRequest::DuplicateSelection(request)
    }
}

impl From<PortConnectionRequest> for EditRequest {
    fn from(request: PortConnectionRequest) -> Self {
        EditRequest::PortConnection(request)
    }
}

impl From<ChannelEditRequest> for EditRequest {
    fn from(request: ChannelEditRequest) -> Self {
        EditRequest::Channel(request)
    }
}

impl From<TracklistEditRequest> for EditRequest {
    fn from(request: TracklistEditRequest) -> Self {
        EditRequest::Tracklist(request)
    }
}

/// Every kind of edit the history can hold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ActionVariant {
    Mixer(MixerEditAction),
    Transport(TransportEditAction),
    DuplicateSelection(DuplicateSelectionAction),
    PortConnection(PortConnectionAction),
    Channel(ChannelEditAction),
    Tracklist(TracklistEditAction),
}

impl ActionVariant {
    /// Builds the action for `request`, capturing its before-state. The
    /// project is not modified.
    pub fn from_request(world: &World, request: EditRequest) -> Result<Self, EditError> {
        Ok(match request {
            EditRequest::Mixer(request) => {
                ActionVariant::Mixer(MixerEditAction::new(world, request)?)
            }
            EditRequest::Transport(request) => {
                ActionVariant::Transport(TransportEditAction::new(world, request)?)
            }
            EditRequest::DuplicateSelection(request) => {
                ActionVariant::DuplicateSelection(DuplicateSelectionAction::new(world, request)?)
            }
            EditRequest::PortConnection(request) => {
                ActionVariant::PortConnection(PortConnectionAction::new(world, request)?)
            }
            EditRequest::Channel(request) => {
                ActionVariant::Channel(ChannelEditAction::new(world, request)?)
            }
            EditRequest::Tracklist(request) => {
                ActionVariant::Tracklist(TracklistEditAction::new(world, request)?)
            }
        })
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ActionVariant::Mixer(_) => ActionKind::Mixer,
            ActionVariant::Transport(_) => ActionKind::Transport,
            ActionVariant::DuplicateSelection(_) => ActionKind::DuplicateSelection,
            ActionVariant::PortConnection(_) => ActionKind::PortConnection,
            ActionVariant::Channel(_) => ActionKind::Channel,
            ActionVariant::Tracklist(_) => ActionKind::Tracklist,
        }
    }

    fn undoable(&self) -> &dyn Undoable {
        match self {
            ActionVariant::Mixer(action) => action,
            ActionVariant::Transport(action) => action,
            ActionVariant::DuplicateSelection(action) => action,
            ActionVariant::PortConnection(action) => action,
            ActionVariant::Channel(action) => action,
            ActionVariant::Tracklist(action) => action,
        }
    }

    fn undoable_mut(&mut self) -> &mut dyn Undoable {
        match self {
            ActionVariant::Mixer(action) => action,
            ActionVariant::Transport(action) => action,
            ActionVariant::DuplicateSelection(action) => action,
            ActionVariant::PortConnection(action) => action,
            ActionVariant::Channel(action) => action,
            ActionVariant::Tracklist(action) => action,
        }
    }

    pub fn already_applied(&self) -> bool {
        self.undoable().already_applied()
    }

    pub fn apply(&mut self, world: &mut World) -> Result<(), EditError> {
        self.undoable_mut().apply(world)
    }

    pub fn undo(&mut self, world: &mut World) -> Result<(), EditError> {
        self.undoable_mut().undo(world)
    }

    pub fn describe(&self) -> String {
        self.undoable().describe()
    }

    /// Whether this action keeps a snapshot that refers to `clip`, which
    /// must then stay in the clip pool.
    pub fn references_clip(&self, clip: ClipId) -> bool {
        match self {
            ActionVariant::DuplicateSelection(action) => action.references_clip(clip),
            ActionVariant::Tracklist(action) => action.references_clip(clip),
            ActionVariant::Mixer(_)
            | ActionVariant::Transport(_)
            | ActionVariant::PortConnection(_)
            | ActionVariant::Channel(_) => false,
        }
    }

    /// Drops the action together with every snapshot it owns.
    pub fn dispose(self) {
        log::trace!("disposing {:?} action \"{}\"", self.kind(), self.describe());
    }
}
