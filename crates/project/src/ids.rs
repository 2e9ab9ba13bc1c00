use std::{cmp::Ordering, fmt, marker::PhantomData};

use derivative::Derivative;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{plugin::Plugin, region::MidiNote, region::Region, track::Track};

/// A stable identifier that survives undo, redo and persistence. The type
/// parameter only keeps ids of different things apart.
#[derive(Derivative, Serialize, Deserialize)]
#[derivative(
    Copy(bound = ""),
    Clone(bound = ""),
    Eq(bound = ""),
    PartialEq(bound = ""),
    Hash(bound = "")
)]
#[serde(transparent)]
pub struct Id<T> {
    uuid: Uuid,
    #[serde(skip)]
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _phantom: PhantomData,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uuid.cmp(&other.uuid)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.uuid.simple())
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first group is plenty to tell ids apart in log output.
        let simple = self.uuid.simple().to_string();
        f.write_str(&simple[..8])
    }
}

pub type TrackId = Id<Track>;
pub type PluginId = Id<Plugin>;
pub type RegionId = Id<Region>;
pub type NoteId = Id<MidiNote>;

/// Marker for audio clips held by the clip pool.
pub struct Clip;
pub type ClipId = Id<Clip>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SlotKind {
    MidiFx,
    Instrument,
    Insert,
    Modulator,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlotKind::MidiFx => "MIDI FX",
            SlotKind::Instrument => "instrument",
            SlotKind::Insert => "insert",
            SlotKind::Modulator => "modulator",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotAddress {
    pub track: TrackId,
    pub kind: SlotKind,
    pub slot: usize,
}

impl SlotAddress {
    pub fn new(track: TrackId, kind: SlotKind, slot: usize) -> Self {
        Self { track, kind, slot }
    }
}

impl fmt::Display for SlotAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} slot {} of track {}", self.kind, self.slot, self.track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_copyable() {
        let a = TrackId::new();
        let b = a;

        assert_eq!(a, b);
        assert_ne!(a, TrackId::new());
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = PluginId::new();

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(format!("\"{}\"", id.uuid()), json);

        let back: PluginId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
