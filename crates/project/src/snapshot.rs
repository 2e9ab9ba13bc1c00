use bevy_ecs::{name::Name, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    automation::AutomationTracklist,
    error::{ConsistencyError, EditError, ValidationError},
    ids::TrackId,
    ports::PortConnections,
    track::{Channel, ChannelState, Lanes, Track, Tracklist},
    transport::Transport,
};

/// Everything that makes up one track, detached from the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub track: Track,
    pub name: String,
    pub state: ChannelState,
    pub channel: Channel,
    pub lanes: Lanes,
    pub automation: AutomationTracklist,
}

/// Structural copy of a whole project. Two snapshots compare equal when the
/// projects they were taken from hold the same tracks in the same order
/// with the same contents, routing and transport.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectSnapshot {
    pub tracks: Vec<TrackSnapshot>,
    pub connections: PortConnections,
    pub transport: Transport,
}

fn component<T: Component + Clone>(
    world: &World,
    entity: Entity,
    track: TrackId,
    component: &'static str,
) -> Result<T, ConsistencyError> {
    world
        .get::<T>(entity)
        .cloned()
        .ok_or(ConsistencyError::MissingComponent { track, component })
}

impl TrackSnapshot {
    pub fn capture(world: &World, id: TrackId) -> Result<Self, EditError> {
        let entity = world
            .get_resource::<Tracklist>()
            .ok_or(ConsistencyError::MissingResource("Tracklist"))?
            .entity(id)
            .ok_or(ValidationError::TrackNotFound(id))?;
        Ok(Self::from_entity(world, id, entity)?)
    }

    fn from_entity(world: &World, id: TrackId, entity: Entity) -> Result<Self, ConsistencyError> {
        Ok(Self {
            track: component(world, entity, id, "Track")?,
            name: component::<Name>(world, entity, id, "Name")?
                .as_str()
                .to_owned(),
            state: component(world, entity, id, "ChannelState")?,
            channel: component(world, entity, id, "Channel")?,
            lanes: component(world, entity, id, "Lanes")?,
            automation: component(world, entity, id, "AutomationTracklist")?,
        })
    }
}

impl ProjectSnapshot {
    pub fn capture(world: &World) -> Result<Self, EditError> {
        let tracklist = world
            .get_resource::<Tracklist>()
            .ok_or(ConsistencyError::MissingResource("Tracklist"))?;

        let tracks = tracklist
            .iter()
            .map(|(id, entity)| TrackSnapshot::from_entity(world, id, entity))
            .collect::<Result<Vec<_>, ConsistencyError>>()?;

        Ok(Self {
            tracks,
            connections: world
                .get_resource::<PortConnections>()
                .cloned()
                .ok_or(ConsistencyError::MissingResource("PortConnections"))?,
            transport: world
                .get_resource::<Transport>()
                .cloned()
                .ok_or(ConsistencyError::MissingResource("Transport"))?,
        })
    }

    pub fn track(&self, id: TrackId) -> Option<&TrackSnapshot> {
        self.tracks.iter().find(|snapshot| snapshot.track.id == id)
    }
}
