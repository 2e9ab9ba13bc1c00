use std::fmt;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ids::{PluginId, TrackId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PortKind {
    Audio,
    Event,
    Control,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PortFlow {
    Input,
    Output,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PortOwner {
    Track(TrackId),
    Plugin(PluginId),
}

/// Addresses a port by what owns it rather than by where that owner
/// currently sits, so a plugin keeps its ports when it moves between slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortId {
    pub owner: PortOwner,
    pub kind: PortKind,
    pub flow: PortFlow,
    pub index: u16,
}

impl PortId {
    pub fn plugin(plugin: PluginId, kind: PortKind, flow: PortFlow, index: u16) -> Self {
        Self {
            owner: PortOwner::Plugin(plugin),
            kind,
            flow,
            index,
        }
    }

    pub fn track(track: TrackId, kind: PortKind, flow: PortFlow, index: u16) -> Self {
        Self {
            owner: PortOwner::Track(track),
            kind,
            flow,
            index,
        }
    }

    pub fn plugin_id(&self) -> Option<PluginId> {
        match self.owner {
            PortOwner::Plugin(id) => Some(id),
            PortOwner::Track(_) => None,
        }
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (owner, id) = match self.owner {
            PortOwner::Track(id) => ("track", id.to_string()),
            PortOwner::Plugin(id) => ("plugin", id.to_string()),
        };
        let flow = match self.flow {
            PortFlow::Input => "in",
            PortFlow::Output => "out",
        };
        write!(f, "{owner} {id} {:?} {flow} {}", self.kind, self.index)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortConnection {
    pub src: PortId,
    pub dest: PortId,
    pub multiplier: f32,
    pub enabled: bool,
    pub locked: bool,
}

impl PortConnection {
    pub fn new(src: PortId, dest: PortId) -> Self {
        Self {
            src,
            dest,
            multiplier: 1.0,
            enabled: true,
            locked: false,
        }
    }

    pub fn locked(self) -> Self {
        Self {
            locked: true,
            ..self
        }
    }

    pub fn involves(&self, owner: &PortOwner) -> bool {
        self.src.owner == *owner || self.dest.owner == *owner
    }
}

/// The project-wide routing table.
#[derive(Resource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PortConnections {
    connections: Vec<PortConnection>,
}

impl PortConnections {
    pub fn iter(&self) -> impl Iterator<Item = &PortConnection> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn position(&self, src: &PortId, dest: &PortId) -> Option<usize> {
        self.connections
            .iter()
            .position(|c| c.src == *src && c.dest == *dest)
    }

    pub fn find(&self, src: &PortId, dest: &PortId) -> Option<&PortConnection> {
        self.position(src, dest).map(|index| &self.connections[index])
    }

    pub fn contains(&self, src: &PortId, dest: &PortId) -> bool {
        self.position(src, dest).is_some()
    }

    pub fn add(&mut self, connection: PortConnection) {
        self.connections.push(connection);
    }

    /// Puts `connection` in place of the existing one with the same ends, or
    /// inserts it at `index` when there is none.
    pub fn put(&mut self, index: usize, connection: PortConnection) {
        match self.position(&connection.src, &connection.dest) {
            Some(existing) => self.connections[existing] = connection,
            None => {
                let index = index.min(self.connections.len());
                self.connections.insert(index, connection);
            }
        }
    }

    pub fn remove(&mut self, src: &PortId, dest: &PortId) -> Option<PortConnection> {
        self.position(src, dest)
            .map(|index| self.connections.remove(index))
    }

    /// Drops every connection touching `owner` and returns them.
    pub fn remove_owner(&mut self, owner: &PortOwner) -> Vec<PortConnection> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(|c| c.involves(owner));
        self.connections = kept;
        removed
    }
}
