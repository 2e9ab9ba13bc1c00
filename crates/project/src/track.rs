use bevy_ecs::{name::Name, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    automation::AutomationTracklist,
    config::EditorConfig,
    error::ValidationError,
    ids::{PluginId, RegionId, SlotAddress, SlotKind, TrackId},
    plugin::Plugin,
    region::Region,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Instrument,
    Audio,
    AudioBus,
    Midi,
    Master,
}

#[derive(Component, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
    /// Track whose input this track's output feeds.
    pub output: Option<TrackId>,
}

#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    pub gain_value: f32,
    pub muted: bool,
    pub soloed: bool,
    pub armed: bool,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            gain_value: 1.0,
            muted: false,
            soloed: false,
            armed: false,
        }
    }
}

impl ChannelState {
    pub fn get_button(&self, button: ChannelButton) -> bool {
        match button {
            ChannelButton::Mute => self.muted,
            ChannelButton::Solo => self.soloed,
            ChannelButton::Arm => self.armed,
        }
    }

    pub fn set_button(&mut self, button: ChannelButton, value: bool) {
        match button {
            ChannelButton::Mute => self.muted = value,
            ChannelButton::Solo => self.soloed = value,
            ChannelButton::Arm => self.armed = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelButton {
    Mute,
    Solo,
    Arm,
}

/// The plugin slots of a track's mixer strip.
#[derive(Component, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    midi_fx: Vec<Option<Plugin>>,
    instrument: Vec<Option<Plugin>>,
    inserts: Vec<Option<Plugin>>,
    modulators: Vec<Option<Plugin>>,
}

impl Channel {
    pub fn new(config: &EditorConfig) -> Self {
        let slots = |kind: SlotKind| vec![None; config.num_slots(kind)];
        Self {
            midi_fx: slots(SlotKind::MidiFx),
            instrument: slots(SlotKind::Instrument),
            inserts: slots(SlotKind::Insert),
            modulators: slots(SlotKind::Modulator),
        }
    }

    pub fn slots(&self, kind: SlotKind) -> &[Option<Plugin>] {
        match kind {
            SlotKind::MidiFx => &self.midi_fx,
            SlotKind::Instrument => &self.instrument,
            SlotKind::Insert => &self.inserts,
            SlotKind::Modulator => &self.modulators,
        }
    }

    fn slots_mut(&mut self, kind: SlotKind) -> &mut Vec<Option<Plugin>> {
        match kind {
            SlotKind::MidiFx => &mut self.midi_fx,
            SlotKind::Instrument => &mut self.instrument,
            SlotKind::Insert => &mut self.inserts,
            SlotKind::Modulator => &mut self.modulators,
        }
    }

    pub fn num_slots(&self, kind: SlotKind) -> usize {
        self.slots(kind).len()
    }

    pub fn plugin(&self, kind: SlotKind, slot: usize) -> Option<&Plugin> {
        self.slots(kind).get(slot)?.as_ref()
    }

    pub fn plugin_mut(&mut self, kind: SlotKind, slot: usize) -> Option<&mut Plugin> {
        self.slots_mut(kind).get_mut(slot)?.as_mut()
    }

    pub(crate) fn check_slot(&self, address: &SlotAddress) -> Result<(), ValidationError> {
        let available = self.num_slots(address.kind);
        if address.slot < available {
            Ok(())
        } else {
            Err(ValidationError::SlotOutOfRange {
                address: *address,
                available,
            })
        }
    }

    pub(crate) fn put(
        &mut self,
        address: &SlotAddress,
        plugin: Plugin,
    ) -> Result<(), ValidationError> {
        self.check_slot(address)?;
        let slot = &mut self.slots_mut(address.kind)[address.slot];
        if slot.is_some() {
            return Err(ValidationError::SlotOccupied(*address));
        }
        *slot = Some(plugin);
        Ok(())
    }

    pub(crate) fn take(&mut self, address: &SlotAddress) -> Result<Plugin, ValidationError> {
        self.check_slot(address)?;
        self.slots_mut(address.kind)[address.slot]
            .take()
            .ok_or(ValidationError::EmptySlot(*address))
    }

    pub fn plugins(&self) -> impl Iterator<Item = (SlotKind, usize, &Plugin)> {
        [
            SlotKind::MidiFx,
            SlotKind::Instrument,
            SlotKind::Insert,
            SlotKind::Modulator,
        ]
        .into_iter()
        .flat_map(move |kind| {
            self.slots(kind)
                .iter()
                .enumerate()
                .filter_map(move |(slot, plugin)| plugin.as_ref().map(|p| (kind, slot, p)))
        })
    }

    pub fn find_plugin(&self, id: PluginId) -> Option<(SlotKind, usize)> {
        self.plugins()
            .find(|(_, _, plugin)| plugin.id == id)
            .map(|(kind, slot, _)| (kind, slot))
    }

    /// Plugins in signal order: MIDI FX, then the instrument, then inserts.
    /// Modulators sit outside the chain.
    pub fn processing_chain(&self) -> impl Iterator<Item = &Plugin> {
        self.midi_fx
            .iter()
            .chain(&self.instrument)
            .chain(&self.inserts)
            .flatten()
    }

    pub fn modulators(&self) -> impl Iterator<Item = &Plugin> {
        self.modulators.iter().flatten()
    }
}

/// Timeline regions owned by a track.
#[derive(Component, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Lanes {
    pub regions: Vec<Region>,
}

impl Lanes {
    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.id == id)
    }

    pub fn remove_region(&mut self, id: RegionId) -> Option<Region> {
        let index = self.regions.iter().position(|r| r.id == id)?;
        Some(self.regions.remove(index))
    }
}

/// Track order, and the entity holding each track's components.
#[derive(Resource, Clone, Debug, Default)]
pub struct Tracklist {
    tracks: Vec<(TrackId, Entity)>,
    master: Option<TrackId>,
}

impl Tracklist {
    pub fn entity(&self, id: TrackId) -> Option<Entity> {
        self.tracks
            .iter()
            .find(|(track, _)| *track == id)
            .map(|(_, entity)| *entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrackId, Entity)> + '_ {
        self.tracks.iter().copied()
    }

    pub fn position(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|(track, _)| *track == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.tracks.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn master(&self) -> Option<TrackId> {
        self.master
    }

    pub(crate) fn push(&mut self, id: TrackId, entity: Entity, kind: TrackKind) {
        if kind == TrackKind::Master {
            self.master = Some(id);
        }
        self.tracks.push((id, entity));
    }

    /// Moves a track so it ends up at `position`, clamped to the end of the
    /// list.
    pub(crate) fn move_to(&mut self, id: TrackId, position: usize) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let entry = self.tracks.remove(index);
        self.tracks.insert(position.min(self.tracks.len()), entry);
        true
    }

    pub(crate) fn remove(&mut self, id: TrackId) -> Option<Entity> {
        let index = self.tracks.iter().position(|(track, _)| *track == id)?;
        if self.master == Some(id) {
            self.master = None;
        }
        Some(self.tracks.remove(index).1)
    }
}

/// Spawns a track with an empty strip, outside the edit history.
pub fn spawn_track(world: &mut World, name: &str, kind: TrackKind) -> TrackId {
    let config = world.get_resource::<EditorConfig>().cloned().unwrap_or_default();
    let master = world.get_resource::<Tracklist>().and_then(Tracklist::master);
    let id = TrackId::new();

    let track = Track {
        id,
        kind,
        output: if kind == TrackKind::Master { None } else { master },
    };

    let entity = world
        .spawn((
            track,
            Name::new(name.to_owned()),
            ChannelState::default(),
            Channel::new(&config),
            Lanes::default(),
            AutomationTracklist::default(),
        ))
        .id();

    world
        .get_resource_or_insert_with(Tracklist::default)
        .push(id, entity, kind);

    log::debug!("spawned {kind:?} track {id} \"{name}\"");
    id
}
