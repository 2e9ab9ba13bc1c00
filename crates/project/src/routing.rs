use audio_graph::{AudioGraph, AudioGraphError, AudioGraphWorker, GraphDesc, ProcessingSchedule};
use bevy_ecs::prelude::*;

use crate::{
    error::{ConsistencyError, EditError},
    ids::{PluginId, TrackId},
    ports::{PortConnections, PortFlow, PortId, PortOwner},
    track::{Channel, Track, Tracklist},
};

/// A node of the processing graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    TrackInput(TrackId),
    TrackOutput(TrackId),
    Plugin(PluginId),
}

impl NodeKey {
    pub fn for_port(port: &PortId) -> NodeKey {
        match (port.owner, port.flow) {
            (PortOwner::Plugin(id), _) => NodeKey::Plugin(id),
            (PortOwner::Track(id), PortFlow::Input) => NodeKey::TrackInput(id),
            (PortOwner::Track(id), PortFlow::Output) => NodeKey::TrackOutput(id),
        }
    }
}

pub(crate) struct TrackView<'a> {
    pub(crate) id: TrackId,
    pub(crate) output: Option<TrackId>,
    pub(crate) channel: &'a Channel,
}

/// Every track contributes its strip (input, MIDI FX, instrument, inserts,
/// output) and feeds the input of its output track. Enabled connections add
/// the remaining edges. Cycles are left for `build_schedule` to find.
pub(crate) fn build_graph_desc<'a>(
    tracks: &[TrackView<'a>],
    connections: &PortConnections,
) -> Result<GraphDesc<NodeKey>, AudioGraphError> {
    let mut desc = GraphDesc::default();

    for track in tracks {
        let mut previous = desc.add_node(NodeKey::TrackInput(track.id));
        for plugin in track.channel.processing_chain() {
            let node = desc.add_node(NodeKey::Plugin(plugin.id));
            desc.connect_unchecked(node, previous)?;
            previous = node;
        }
        let output = desc.add_node(NodeKey::TrackOutput(track.id));
        desc.connect_unchecked(output, previous)?;

        for modulator in track.channel.modulators() {
            desc.add_node(NodeKey::Plugin(modulator.id));
        }
    }

    for track in tracks {
        let Some(destination) = track.output.and_then(|id| desc.node_id(&NodeKey::TrackInput(id)))
        else {
            continue;
        };
        if let Some(output) = desc.node_id(&NodeKey::TrackOutput(track.id)) {
            desc.connect_unchecked(destination, output)?;
        }
    }

    for connection in connections.iter().filter(|c| c.enabled) {
        let src = desc.node_id(&NodeKey::for_port(&connection.src));
        let dest = desc.node_id(&NodeKey::for_port(&connection.dest));
        if let (Some(src), Some(dest)) = (src, dest) {
            desc.connect_unchecked(dest, src)?;
        }
    }

    Ok(desc)
}

pub(crate) fn world_track_views(world: &World) -> Result<Vec<TrackView<'_>>, EditError> {
    let tracklist = world
        .get_resource::<Tracklist>()
        .ok_or(ConsistencyError::MissingResource("Tracklist"))?;

    tracklist
        .iter()
        .map(|(id, entity)| -> Result<TrackView<'_>, EditError> {
            let track = world.get::<Track>(entity).ok_or(ConsistencyError::MissingComponent {
                track: id,
                component: "Track",
            })?;
            let channel = world.get::<Channel>(entity).ok_or(ConsistencyError::MissingComponent {
                track: id,
                component: "Channel",
            })?;
            Ok(TrackView {
                id,
                output: track.output,
                channel,
            })
        })
        .collect()
}

/// Control-side end of the processing graph.
#[derive(Resource)]
pub struct Router {
    audio_graph: AudioGraph<NodeKey>,
    version: u64,
}

impl Router {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Router, AudioGraphWorker<NodeKey>) {
        let (audio_graph, worker) = AudioGraph::new();
        (
            Router {
                audio_graph,
                version: 0,
            },
            worker,
        )
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    fn publish(&mut self, schedule: ProcessingSchedule<NodeKey>) {
        self.version = schedule.version();
        self.audio_graph.publish(schedule);
    }
}

/// Rebuilds the processing order from the current project and hands it to
/// the audio side. Returns the new schedule version.
pub fn recalculate_processing_schedule(world: &mut World) -> Result<u64, EditError> {
    let version = world
        .get_resource::<Router>()
        .ok_or(ConsistencyError::MissingResource("Router"))?
        .version()
        + 1;

    let schedule = {
        let tracks = world_track_views(world)?;
        let connections = world
            .get_resource::<PortConnections>()
            .ok_or(ConsistencyError::MissingResource("PortConnections"))?;
        build_graph_desc(&tracks, connections)
            .and_then(|desc| desc.build_schedule(version))
            .map_err(ConsistencyError::Schedule)?
    };

    log::debug!(
        "publishing processing schedule {version} with {} nodes",
        schedule.len()
    );

    if let Some(mut router) = world.get_resource_mut::<Router>() {
        router.publish(schedule);
    }
    Ok(version)
}

/// Whether adding an enabled connection from `src` to `dest` would close a
/// loop in the current graph.
pub(crate) fn would_create_cycle(
    world: &World,
    src: &PortId,
    dest: &PortId,
) -> Result<bool, EditError> {
    let tracks = world_track_views(world)?;
    let empty = PortConnections::default();
    let connections = world.get_resource::<PortConnections>().unwrap_or(&empty);
    let desc = build_graph_desc(&tracks, connections).map_err(ConsistencyError::Schedule)?;

    let src = desc.node_id(&NodeKey::for_port(src));
    let dest = desc.node_id(&NodeKey::for_port(dest));
    Ok(match (src, dest) {
        (Some(src), Some(dest)) => desc.would_create_cycle(dest, src),
        _ => false,
    })
}
