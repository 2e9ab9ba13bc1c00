use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    ids::{PluginId, RegionId},
    plugin::Plugin,
    ports::{PortId, PortOwner},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutomationPoint {
    pub tick: i64,
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutomationRegion {
    pub id: RegionId,
    pub start: i64,
    pub length: i64,
    pub points: Vec<AutomationPoint>,
}

impl AutomationRegion {
    pub fn new(start: i64, length: i64, points: Vec<AutomationPoint>) -> Self {
        Self {
            id: RegionId::new(),
            start,
            length,
            points,
        }
    }
}

/// Automation lane for one plugin parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutomationTrack {
    pub port: PortId,
    pub label: String,
    pub regions: Vec<AutomationRegion>,
}

impl AutomationTrack {
    pub fn plugin_id(&self) -> Option<PluginId> {
        self.port.plugin_id()
    }

    /// The same lane pointed at another plugin's matching parameter, with
    /// fresh region ids.
    pub fn retarget(&self, plugin: PluginId) -> AutomationTrack {
        AutomationTrack {
            port: PortId {
                owner: PortOwner::Plugin(plugin),
                ..self.port
            },
            label: self.label.clone(),
            regions: self
                .regions
                .iter()
                .map(|region| AutomationRegion {
                    id: RegionId::new(),
                    ..region.clone()
                })
                .collect(),
        }
    }
}

/// Kept sorted by port so that detaching and reattaching a plugin always
/// lands its lanes back in the same place.
#[derive(Component, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationTracklist {
    tracks: Vec<AutomationTrack>,
}

impl AutomationTracklist {
    pub fn iter(&self) -> impl Iterator<Item = &AutomationTrack> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, port: &PortId) -> Option<&AutomationTrack> {
        self.tracks.iter().find(|at| at.port == *port)
    }

    pub fn get_mut(&mut self, port: &PortId) -> Option<&mut AutomationTrack> {
        self.tracks.iter_mut().find(|at| at.port == *port)
    }

    pub fn for_plugin(&self, plugin: PluginId) -> impl Iterator<Item = &AutomationTrack> {
        self.tracks
            .iter()
            .filter(move |at| at.plugin_id() == Some(plugin))
    }

    pub fn insert(&mut self, track: AutomationTrack) {
        match self.tracks.binary_search_by(|at| at.port.cmp(&track.port)) {
            Ok(existing) => self.tracks[existing] = track,
            Err(index) => self.tracks.insert(index, track),
        }
    }

    pub fn take_plugin(&mut self, plugin: PluginId) -> Vec<AutomationTrack> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tracks)
            .into_iter()
            .partition(|at| at.plugin_id() == Some(plugin));
        self.tracks = kept;
        taken
    }

    /// Adds an empty lane for every automatable parameter of `plugin` that
    /// doesn't have one yet.
    pub fn generate_for(&mut self, plugin: &Plugin) {
        for (port, label) in plugin.automatable_ports() {
            if self.get(&port).is_none() {
                self.insert(AutomationTrack {
                    port,
                    label: label.to_owned(),
                    regions: Vec::new(),
                });
            }
        }
    }
}
