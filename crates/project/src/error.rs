use audio_graph::AudioGraphError;
use thiserror::Error;

use crate::{
    ids::{NoteId, PluginId, RegionId, SlotAddress, SlotKind, TrackId},
    ports::PortId,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("invalid edit: {0}")]
    Validation(#[from] ValidationError),
    #[error("plugin instantiation failed: {0}")]
    Instantiation(#[from] InstantiationError),
    #[error("project doesn't match edit history: {0}")]
    Consistency(#[from] ConsistencyError),
}

impl EditError {
    /// Replaying history must never hit a validation failure; if it does the
    /// graph has drifted from what the history recorded.
    pub(crate) fn into_replay_error(self) -> EditError {
        match self {
            EditError::Validation(error) => ConsistencyError::Replay(error).into(),
            other => other,
        }
    }
}

/// Rejected before anything was touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("track {0} doesn't exist")]
    TrackNotFound(TrackId),
    #[error("{address} is out of range ({available} slots)")]
    SlotOutOfRange {
        address: SlotAddress,
        available: usize,
    },
    #[error("{kind} slot {slot} of a new channel is out of range ({available} slots)")]
    NewChannelSlotOutOfRange {
        kind: SlotKind,
        slot: usize,
        available: usize,
    },
    #[error("{0} is empty")]
    EmptySlot(SlotAddress),
    #[error("{0} is already occupied")]
    SlotOccupied(SlotAddress),
    #[error("nothing is selected")]
    NothingSelected,
    #[error("{requested} plugins requested, at most {limit} allowed")]
    PluginLimitExceeded { requested: usize, limit: usize },
    #[error("routing would contain a cycle")]
    CyclicConnection,
    #[error("{0} BPM is outside the supported tempo range")]
    InvalidTempo(f64),
    #[error("{0} beats per bar is not supported")]
    InvalidBeatsPerBar(u32),
    #[error("beat unit {0} is not supported")]
    InvalidBeatUnit(u32),
    #[error("region {0} doesn't exist")]
    RegionNotFound(RegionId),
    #[error("note {0} doesn't exist")]
    NoteNotFound(NoteId),
    #[error("pitch {0} is outside 0..=127")]
    PitchOutOfRange(i32),
    #[error("position {0} is before the start of the timeline")]
    NegativePosition(i64),
    #[error("port {0} doesn't exist")]
    UnknownPort(PortId),
    #[error("{src} can't feed {dest}")]
    PortDirection { src: PortId, dest: PortId },
    #[error("{src} is already connected to {dest}")]
    ConnectionExists { src: PortId, dest: PortId },
    #[error("{src} isn't connected to {dest}")]
    ConnectionNotFound { src: PortId, dest: PortId },
    #[error("connection from {src} to {dest} is locked")]
    ConnectionLocked { src: PortId, dest: PortId },
    #[error("track position {position} is out of range ({len} tracks)")]
    TrackPositionOutOfRange { position: usize, len: usize },
    #[error("the project already has a master track")]
    DuplicateMaster,
    #[error("the master track can't be deleted")]
    MasterTrackLocked,
    #[error("gain {0} is not a valid gain value")]
    InvalidGain(f32),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("couldn't instantiate {plugin}: {reason}")]
pub struct InstantiationError {
    pub plugin: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsistencyError {
    #[error("action hasn't been applied")]
    NotApplied,
    #[error("action has already been applied")]
    AlreadyApplied,
    #[error("missing resource {0}")]
    MissingResource(&'static str),
    #[error("track {track} has no {component}")]
    MissingComponent {
        track: TrackId,
        component: &'static str,
    },
    #[error("expected plugin {expected} at {address}")]
    PluginMismatch {
        address: SlotAddress,
        expected: PluginId,
    },
    #[error("edit targets a new channel that was never recorded")]
    MissingNewChannel,
    #[error("recorded region {0} is missing")]
    MissingRegion(RegionId),
    #[error("recorded note {0} is missing")]
    MissingNote(NoteId),
    #[error("replay rejected: {0}")]
    Replay(ValidationError),
    #[error("couldn't schedule graph: {0}")]
    Schedule(AudioGraphError),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("malformed history: {0}")]
    Json(#[from] serde_json::Error),
    #[error("history has no action at stack index {0}")]
    MissingIndex(usize),
    #[error("history has more than one action at stack index {0}")]
    DuplicateIndex(usize),
    #[error("history holds {len} actions but capacity is {capacity}")]
    CapacityExceeded { len: usize, capacity: usize },
}
