use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    automation::AutomationTrack,
    error::{EditError, ValidationError},
    graph::ProjectGraph,
    ids::{ClipId, NoteId, RegionId, SlotAddress, SlotKind, TrackId},
    plugin::Plugin,
    region::{MidiNote, Region},
};

/// Slots chosen on one track's strip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotSelection {
    pub track: TrackId,
    pub kind: SlotKind,
    pub slots: Vec<usize>,
}

impl SlotSelection {
    pub fn new(track: TrackId, kind: SlotKind, slots: impl IntoIterator<Item = usize>) -> Self {
        Self {
            track,
            kind,
            slots: slots.into_iter().collect(),
        }
    }
}

/// Where an edit places plugins. `track: None` asks for a new channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotTarget {
    pub track: Option<TrackId>,
    pub kind: SlotKind,
    pub slot: usize,
}

impl SlotTarget {
    pub fn new(track: TrackId, kind: SlotKind, slot: usize) -> Self {
        Self {
            track: Some(track),
            kind,
            slot,
        }
    }

    pub fn new_channel(kind: SlotKind, slot: usize) -> Self {
        Self {
            track: None,
            kind,
            slot,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlottedPlugin {
    pub slot: usize,
    pub plugin: Plugin,
}

/// Deep copy of selected plugins and the slots they occupied. Owned by
/// whichever action captured it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MixerSelectionSnapshot {
    pub track: TrackId,
    pub kind: SlotKind,
    pub plugins: Vec<SlottedPlugin>,
}

impl MixerSelectionSnapshot {
    /// Copies the selected plugins in selection order. Every selected slot
    /// must hold a plugin.
    pub fn capture(world: &World, selection: &SlotSelection) -> Result<Self, EditError> {
        if selection.slots.is_empty() {
            return Err(ValidationError::NothingSelected.into());
        }
        let channel = world
            .channel(selection.track)
            .ok_or(ValidationError::TrackNotFound(selection.track))?;

        let mut plugins: Vec<SlottedPlugin> = Vec::with_capacity(selection.slots.len());
        for slot in &selection.slots {
            if plugins.iter().any(|p| p.slot == *slot) {
                continue;
            }
            let address = SlotAddress::new(selection.track, selection.kind, *slot);
            channel.check_slot(&address)?;
            let plugin = channel
                .plugin(selection.kind, *slot)
                .ok_or(ValidationError::EmptySlot(address))?;
            plugins.push(SlottedPlugin {
                slot: *slot,
                plugin: plugin.clone(),
            });
        }

        Ok(Self {
            track: selection.track,
            kind: selection.kind,
            plugins,
        })
    }

    /// Automation lanes of every captured plugin, as they are right now.
    pub fn capture_automation(&self, world: &World) -> Vec<AutomationTrack> {
        let Some(automation) = world.automation(self.track) else {
            return Vec::new();
        };
        self.plugins
            .iter()
            .flat_map(|p| automation.for_plugin(p.plugin.id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugins ordered by the slot they came from.
    pub fn by_slot(&self) -> Vec<&SlottedPlugin> {
        let mut plugins: Vec<_> = self.plugins.iter().collect();
        plugins.sort_by_key(|p| p.slot);
        plugins
    }

    pub fn address(&self, slot: usize) -> SlotAddress {
        SlotAddress::new(self.track, self.kind, slot)
    }
}

/// A timeline object captured for editing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EditableObject {
    Note { region: RegionId, note: MidiNote },
    Region { track: TrackId, region: Region },
}

impl EditableObject {
    pub fn capture_note(
        world: &World,
        track: TrackId,
        region: RegionId,
        note: NoteId,
    ) -> Result<Self, EditError> {
        let lanes = world.lanes(track).ok_or(ValidationError::TrackNotFound(track))?;
        let found = lanes
            .region(region)
            .ok_or(ValidationError::RegionNotFound(region))?
            .notes()
            .iter()
            .find(|n| n.id == note)
            .ok_or(ValidationError::NoteNotFound(note))?;
        Ok(EditableObject::Note {
            region,
            note: found.clone(),
        })
    }

    pub fn capture_region(
        world: &World,
        track: TrackId,
        region: RegionId,
    ) -> Result<Self, EditError> {
        let lanes = world.lanes(track).ok_or(ValidationError::TrackNotFound(track))?;
        let found = lanes
            .region(region)
            .ok_or(ValidationError::RegionNotFound(region))?;
        Ok(EditableObject::Region {
            track,
            region: found.clone(),
        })
    }

    pub fn references_clip(&self, clip: ClipId) -> bool {
        match self {
            EditableObject::Region { region, .. } => region.clip() == Some(clip),
            EditableObject::Note { .. } => false,
        }
    }
}
