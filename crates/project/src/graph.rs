use std::collections::{HashMap, hash_map::Entry};

use audio_graph::AudioGraphError;
use bevy_ecs::{name::Name, prelude::*};

use crate::{
    automation::{AutomationTrack, AutomationTracklist},
    config::EditorConfig,
    error::{ConsistencyError, EditError, ValidationError},
    ids::{PluginId, RegionId, SlotAddress, TrackId},
    plugin::Plugin,
    ports::{PortConnections, PortId, PortOwner},
    routing::{self, TrackView, build_graph_desc},
    snapshot::TrackSnapshot,
    track::{Channel, ChannelState, Lanes, Track, TrackKind, Tracklist},
    transport::Transport,
};

/// The operations edits need from the live project.
pub trait ProjectGraph {
    fn plugin_at(&self, address: &SlotAddress) -> Option<&Plugin>;

    /// Places `plugin` in an empty slot and gives it automation lanes.
    fn insert_plugin(&mut self, address: &SlotAddress, plugin: Plugin) -> Result<u64, EditError>;

    /// Empties a slot, dropping the plugin's lanes and connections.
    fn remove_plugin(&mut self, address: &SlotAddress) -> Result<Plugin, EditError>;

    fn port_connections(&self) -> Option<&PortConnections>;

    fn replace_port_connections(&mut self, connections: PortConnections) -> Result<u64, EditError>;

    fn recalculate_processing_schedule(&mut self) -> Result<u64, EditError>;

    fn channel(&self, track: TrackId) -> Option<&Channel>;

    fn automation(&self, track: TrackId) -> Option<&AutomationTracklist>;

    fn lanes(&self, track: TrackId) -> Option<&Lanes>;
}

fn track_component<T: Component>(world: &World, track: TrackId) -> Option<&T> {
    let entity = world.get_resource::<Tracklist>()?.entity(track)?;
    world.get::<T>(entity)
}

impl ProjectGraph for World {
    fn plugin_at(&self, address: &SlotAddress) -> Option<&Plugin> {
        self.channel(address.track)?
            .plugin(address.kind, address.slot)
    }

    fn insert_plugin(&mut self, address: &SlotAddress, plugin: Plugin) -> Result<u64, EditError> {
        let mut edit = GraphEdit::new(self);
        edit.insert_plugin(address, plugin, Vec::new())?;
        edit.commit()
    }

    fn remove_plugin(&mut self, address: &SlotAddress) -> Result<Plugin, EditError> {
        let mut edit = GraphEdit::new(self);
        let detached = edit.detach_plugin(address)?;
        edit.commit()?;
        Ok(detached.plugin)
    }

    fn port_connections(&self) -> Option<&PortConnections> {
        self.get_resource::<PortConnections>()
    }

    fn replace_port_connections(&mut self, connections: PortConnections) -> Result<u64, EditError> {
        let mut edit = GraphEdit::new(self);
        edit.replace_connections(connections);
        edit.commit()
    }

    fn recalculate_processing_schedule(&mut self) -> Result<u64, EditError> {
        routing::recalculate_processing_schedule(self)
    }

    fn channel(&self, track: TrackId) -> Option<&Channel> {
        track_component(self, track)
    }

    fn automation(&self, track: TrackId) -> Option<&AutomationTracklist> {
        track_component(self, track)
    }

    fn lanes(&self, track: TrackId) -> Option<&Lanes> {
        track_component(self, track)
    }
}

/// Whether `port` belongs to a track or plugin currently in the project.
pub(crate) fn port_exists(world: &World, port: &PortId) -> bool {
    match port.owner {
        PortOwner::Track(track) => world
            .get_resource::<Tracklist>()
            .is_some_and(|tracklist| tracklist.entity(track).is_some()),
        PortOwner::Plugin(plugin) => find_plugin(world, plugin).is_some_and(|p| p.has_port(port)),
    }
}

pub(crate) fn find_plugin(world: &World, id: PluginId) -> Option<&Plugin> {
    let tracklist = world.get_resource::<Tracklist>()?;
    tracklist.iter().find_map(|(_, entity)| {
        let channel = world.get::<Channel>(entity)?;
        let (kind, slot) = channel.find_plugin(id)?;
        channel.plugin(kind, slot)
    })
}

pub(crate) struct Detached {
    pub(crate) plugin: Plugin,
    pub(crate) automation: Vec<AutomationTrack>,
}

pub(crate) struct StagedTrack {
    track: Track,
    name: String,
    state: ChannelState,
    pub(crate) channel: Channel,
    pub(crate) lanes: Lanes,
    pub(crate) automation: AutomationTracklist,
    entity: Option<Entity>,
}

impl StagedTrack {
    fn load(world: &World, id: TrackId) -> Result<Self, EditError> {
        let entity = world
            .get_resource::<Tracklist>()
            .ok_or(ConsistencyError::MissingResource("Tracklist"))?
            .entity(id)
            .ok_or(ValidationError::TrackNotFound(id))?;

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

        Ok(Self {
            track: component(world, entity, id, "Track")?,
            name: component::<Name>(world, entity, id, "Name")?.as_str().to_owned(),
            state: component(world, entity, id, "ChannelState")?,
            channel: component(world, entity, id, "Channel")?,
            lanes: component(world, entity, id, "Lanes")?,
            automation: component(world, entity, id, "AutomationTracklist")?,
            entity: Some(entity),
        })
    }

    pub(crate) fn set_output(&mut self, output: Option<TrackId>) {
        self.track.output = output;
    }

    fn view(&self) -> TrackView<'_> {
        TrackView {
            id: self.track.id,
            output: self.track.output,
            channel: &self.channel,
        }
    }
}

/// Stages changes to the project and writes them back only once the result
/// is known to be valid. Dropping an uncommitted edit leaves the project
/// untouched.
pub(crate) struct GraphEdit<'w> {
    world: &'w mut World,
    tracks: HashMap<TrackId, StagedTrack>,
    added: Vec<TrackId>,
    removed: Vec<TrackId>,
    /// Applied in order once additions and removals are written back.
    positions: Vec<(TrackId, usize)>,
    connections: PortConnections,
    transport: Option<Transport>,
}

impl<'w> GraphEdit<'w> {
    pub(crate) fn new(world: &'w mut World) -> Self {
        let connections = world
            .get_resource::<PortConnections>()
            .cloned()
            .unwrap_or_default();

        Self {
            world,
            tracks: HashMap::new(),
            added: Vec::new(),
            removed: Vec::new(),
            positions: Vec::new(),
            connections,
            transport: None,
        }
    }

    pub(crate) fn config(&self) -> EditorConfig {
        self.world
            .get_resource::<EditorConfig>()
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn track(&mut self, id: TrackId) -> Result<&mut StagedTrack, EditError> {
        if self.removed.contains(&id) {
            return Err(ValidationError::TrackNotFound(id).into());
        }
        match self.tracks.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(StagedTrack::load(self.world, id)?)),
        }
    }

    pub(crate) fn has_track(&self, id: TrackId) -> bool {
        !self.removed.contains(&id)
            && (self.tracks.contains_key(&id)
                || self
                    .world
                    .get_resource::<Tracklist>()
                    .is_some_and(|tracklist| tracklist.entity(id).is_some()))
    }

    pub(crate) fn plugin_at(
        &mut self,
        address: &SlotAddress,
    ) -> Result<Option<&Plugin>, EditError> {
        let channel = &self.track(address.track)?.channel;
        channel.check_slot(address)?;
        Ok(channel.plugin(address.kind, address.slot))
    }

    pub(crate) fn plugin_mut(&mut self, address: &SlotAddress) -> Result<&mut Plugin, EditError> {
        let channel = &mut self.track(address.track)?.channel;
        channel.check_slot(address)?;
        channel
            .plugin_mut(address.kind, address.slot)
            .ok_or(ValidationError::EmptySlot(*address).into())
    }

    /// Places `plugin` in an empty slot together with `automation`; any
    /// automatable parameter still without a lane gets an empty one.
    pub(crate) fn insert_plugin(
        &mut self,
        address: &SlotAddress,
        plugin: Plugin,
        automation: Vec<AutomationTrack>,
    ) -> Result<(), EditError> {
        let staged = self.track(address.track)?;
        for lane in automation {
            staged.automation.insert(lane);
        }
        staged.automation.generate_for(&plugin);
        staged.channel.put(address, plugin)?;
        Ok(())
    }

    /// Empties a slot, keeping the plugin's connections in place.
    pub(crate) fn take_plugin(&mut self, address: &SlotAddress) -> Result<Detached, EditError> {
        let staged = self.track(address.track)?;
        let plugin = staged.channel.take(address)?;
        let automation = staged.automation.take_plugin(plugin.id);
        Ok(Detached { plugin, automation })
    }

    /// Empties a slot and drops the plugin's connections.
    pub(crate) fn detach_plugin(&mut self, address: &SlotAddress) -> Result<Detached, EditError> {
        let detached = self.take_plugin(address)?;
        self.connections
            .remove_owner(&PortOwner::Plugin(detached.plugin.id));
        Ok(detached)
    }

    pub(crate) fn add_track(&mut self, id: TrackId, name: &str, kind: TrackKind) {
        let config = self.config();
        let master = self
            .world
            .get_resource::<Tracklist>()
            .and_then(Tracklist::master);

        self.tracks.insert(
            id,
            StagedTrack {
                track: Track {
                    id,
                    kind,
                    output: master,
                },
                name: name.to_owned(),
                state: ChannelState::default(),
                channel: Channel::new(&config),
                lanes: Lanes::default(),
                automation: AutomationTracklist::default(),
                entity: None,
            },
        );
        self.added.push(id);
    }

    /// Brings back a track taken by an earlier removal, at `position` in
    /// the track order.
    pub(crate) fn restore_track(&mut self, snapshot: TrackSnapshot, position: usize) {
        let id = snapshot.track.id;
        self.tracks.insert(
            id,
            StagedTrack {
                track: snapshot.track,
                name: snapshot.name,
                state: snapshot.state,
                channel: snapshot.channel,
                lanes: snapshot.lanes,
                automation: snapshot.automation,
                entity: None,
            },
        );
        self.added.push(id);
        self.positions.push((id, position));
    }

    pub(crate) fn move_track(&mut self, id: TrackId, position: usize) -> Result<(), EditError> {
        if !self.has_track(id) {
            return Err(ValidationError::TrackNotFound(id).into());
        }
        self.positions.push((id, position));
        Ok(())
    }

    pub(crate) fn remove_track(&mut self, id: TrackId) -> Result<(), EditError> {
        if let Some(index) = self.added.iter().position(|added| *added == id) {
            self.added.remove(index);
            self.tracks.remove(&id);
            return Ok(());
        }
        if !self.has_track(id) {
            return Err(ValidationError::TrackNotFound(id).into());
        }
        self.tracks.remove(&id);
        self.removed.push(id);
        Ok(())
    }

    pub(crate) fn connections_mut(&mut self) -> &mut PortConnections {
        &mut self.connections
    }

    pub(crate) fn replace_connections(&mut self, connections: PortConnections) {
        self.connections = connections;
    }

    pub(crate) fn transport_mut(&mut self) -> Result<&mut Transport, EditError> {
        if self.transport.is_none() {
            let transport = self
                .world
                .get_resource::<Transport>()
                .cloned()
                .ok_or(ConsistencyError::MissingResource("Transport"))?;
            self.transport = Some(transport);
        }
        self.transport
            .as_mut()
            .ok_or(ConsistencyError::MissingResource("Transport").into())
    }

    /// The track whose lanes hold `region`.
    pub(crate) fn region_track(&self, region: RegionId) -> Result<TrackId, EditError> {
        self.views()?
            .iter()
            .map(|view| view.id)
            .find(|id| {
                let lanes = match self.tracks.get(id) {
                    Some(staged) => Some(&staged.lanes),
                    None => track_component::<Lanes>(self.world, *id),
                };
                lanes.is_some_and(|lanes| lanes.region(region).is_some())
            })
            .ok_or(ValidationError::RegionNotFound(region).into())
    }

    fn views(&self) -> Result<Vec<TrackView<'_>>, EditError> {
        let tracklist = self
            .world
            .get_resource::<Tracklist>()
            .ok_or(ConsistencyError::MissingResource("Tracklist"))?;

        let mut views = Vec::with_capacity(tracklist.len() + self.added.len());
        for (id, entity) in tracklist.iter() {
            if self.removed.contains(&id) {
                continue;
            }
            if let Some(staged) = self.tracks.get(&id) {
                views.push(staged.view());
                continue;
            }
            let track = self
                .world
                .get::<Track>(entity)
                .ok_or(ConsistencyError::MissingComponent {
                    track: id,
                    component: "Track",
                })?;
            let channel = self
                .world
                .get::<Channel>(entity)
                .ok_or(ConsistencyError::MissingComponent {
                    track: id,
                    component: "Channel",
                })?;
            views.push(TrackView {
                id,
                output: track.output,
                channel,
            });
        }
        views.extend(
            self.added
                .iter()
                .filter_map(|id| self.tracks.get(id))
                .map(StagedTrack::view),
        );
        Ok(views)
    }

    fn validate_topology(&self) -> Result<(), EditError> {
        let views = self.views()?;
        match build_graph_desc(&views, &self.connections).and_then(|desc| desc.build_schedule(0)) {
            Ok(_) => Ok(()),
            Err(AudioGraphError::Cycle | AudioGraphError::DestEqualsSrc) => {
                Err(ValidationError::CyclicConnection.into())
            }
            Err(error) => Err(ConsistencyError::Schedule(error).into()),
        }
    }

    /// Validates the staged project, writes it back and publishes a new
    /// processing schedule.
    pub(crate) fn commit(self) -> Result<u64, EditError> {
        self.validate_topology()?;
        if !self.world.contains_resource::<crate::routing::Router>() {
            return Err(ConsistencyError::MissingResource("Router").into());
        }

        let GraphEdit {
            world,
            mut tracks,
            added,
            removed,
            positions,
            connections,
            transport,
        } = self;

        for id in removed {
            let entity = world
                .get_resource_mut::<Tracklist>()
                .and_then(|mut tracklist| tracklist.remove(id));
            if let Some(entity) = entity {
                world.despawn(entity);
                log::debug!("removed track {id}");
            }
        }

        for id in added {
            let Some(staged) = tracks.remove(&id) else {
                continue;
            };
            let kind = staged.track.kind;
            let entity = world
                .spawn((
                    staged.track,
                    Name::new(staged.name),
                    staged.state,
                    staged.channel,
                    staged.lanes,
                    staged.automation,
                ))
                .id();
            if let Some(mut tracklist) = world.get_resource_mut::<Tracklist>() {
                tracklist.push(id, entity, kind);
            }
            log::debug!("added track {id}");
        }

        for staged in tracks.into_values() {
            let Some(entity) = staged.entity else {
                continue;
            };
            if let Some(mut track) = world.get_mut::<Track>(entity) {
                *track = staged.track;
            }
            if let Some(mut state) = world.get_mut::<ChannelState>(entity) {
                *state = staged.state;
            }
            if let Some(mut channel) = world.get_mut::<Channel>(entity) {
                *channel = staged.channel;
            }
            if let Some(mut lanes) = world.get_mut::<Lanes>(entity) {
                *lanes = staged.lanes;
            }
            if let Some(mut automation) = world.get_mut::<AutomationTracklist>(entity) {
                *automation = staged.automation;
            }
        }

        if let Some(mut tracklist) = world.get_resource_mut::<Tracklist>() {
            for (id, position) in positions {
                tracklist.move_to(id, position);
            }
        }

        world.insert_resource(connections);
        if let Some(transport) = transport {
            world.insert_resource(transport);
        }

        routing::recalculate_processing_schedule(world)
    }
}
