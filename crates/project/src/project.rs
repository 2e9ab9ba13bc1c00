use std::path::Path;

use audio_graph::AudioGraphWorker;
use bevy_ecs::prelude::*;

use crate::{
    actions::{ActionVariant, EditRequest, TracklistEditAction, TracklistEditRequest},
    config::EditorConfig,
    error::{ConsistencyError, EditError, PersistenceError, ValidationError},
    ids::{ClipId, RegionId, TrackId},
    plugin::{Host, InProcessHost, PluginHost},
    ports::PortConnections,
    region::Region,
    routing::{NodeKey, Router, recalculate_processing_schedule},
    snapshot::ProjectSnapshot,
    track::{Lanes, TrackKind, Tracklist, spawn_track},
    transport::Transport,
    undo::{ActionHandle, UndoManager},
};

/// A project's state together with its edit history.
pub struct Project {
    world: World,
    undo_manager: UndoManager,
}

impl Project {
    /// Returns the project and the audio-side end of its processing graph.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(config: EditorConfig) -> Result<(Project, AudioGraphWorker<NodeKey>), EditError> {
        Self::with_host(config, Box::new(InProcessHost))
    }

    pub fn with_host(
        config: EditorConfig,
        host: Box<dyn PluginHost>,
    ) -> Result<(Project, AudioGraphWorker<NodeKey>), EditError> {
        let (router, worker) = Router::new();
        let undo_manager = UndoManager::new(config.undo_capacity);

        let mut world = World::new();
        world.insert_resource(config);
        world.insert_resource(Tracklist::default());
        world.insert_resource(PortConnections::default());
        world.insert_resource(Transport::default());
        world.insert_resource(Host(host));
        world.insert_resource(router);

        spawn_track(&mut world, "Master", TrackKind::Master);
        recalculate_processing_schedule(&mut world)?;

        Ok((
            Project {
                world,
                undo_manager,
            },
            worker,
        ))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct access bypasses the history; edits made this way can't be
    /// undone and may invalidate recorded actions.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo_manager
    }

    pub fn config(&self) -> EditorConfig {
        self.world
            .get_resource::<EditorConfig>()
            .cloned()
            .unwrap_or_default()
    }

    pub fn master(&self) -> Option<TrackId> {
        self.world
            .get_resource::<Tracklist>()
            .and_then(Tracklist::master)
    }

    /// Adds a track outside the edit history.
    pub fn add_track(&mut self, name: &str, kind: TrackKind) -> Result<TrackId, EditError> {
        let id = spawn_track(&mut self.world, name, kind);
        recalculate_processing_schedule(&mut self.world)?;
        Ok(id)
    }

    /// Adds a track as an undoable edit and returns its id.
    pub fn create_track(
        &mut self,
        name: &str,
        kind: TrackKind,
        position: Option<usize>,
    ) -> Result<TrackId, EditError> {
        let request = TracklistEditRequest::Create {
            name: name.to_owned(),
            kind,
            position,
        };
        let action = TracklistEditAction::new(&self.world, request)?;
        let id = action
            .created_track()
            .ok_or(ConsistencyError::MissingNewChannel)?;
        self.undo_manager
            .perform_action(&mut self.world, ActionVariant::Tracklist(action))?;
        Ok(id)
    }

    /// Places a region on `track` outside the edit history.
    pub fn add_region(&mut self, track: TrackId, region: Region) -> Result<RegionId, EditError> {
        let entity = self
            .world
            .get_resource::<Tracklist>()
            .and_then(|tracklist| tracklist.entity(track))
            .ok_or(ValidationError::TrackNotFound(track))?;
        let id = region.id;
        if let Some(mut lanes) = self.world.get_mut::<Lanes>(entity) {
            lanes.regions.push(region);
        }
        Ok(id)
    }

    pub fn set_musical_mode(&mut self, musical_mode: bool) {
        if let Some(mut transport) = self.world.get_resource_mut::<Transport>() {
            transport.musical_mode = musical_mode;
        }
    }

    pub fn transport(&self) -> Option<&Transport> {
        self.world.get_resource::<Transport>()
    }

    pub fn schedule_version(&self) -> u64 {
        self.world
            .get_resource::<Router>()
            .map_or(0, Router::version)
    }

    pub fn snapshot(&self) -> Result<ProjectSnapshot, EditError> {
        ProjectSnapshot::capture(&self.world)
    }

    pub fn perform(&mut self, request: impl Into<EditRequest>) -> Result<ActionHandle, EditError> {
        self.undo_manager.perform(&mut self.world, request)
    }

    pub fn undo(&mut self) -> Result<bool, EditError> {
        self.undo_manager.undo(&mut self.world)
    }

    pub fn redo(&mut self) -> Result<bool, EditError> {
        self.undo_manager.redo(&mut self.world)
    }

    pub fn undo_n(&mut self, count: usize) -> Result<usize, EditError> {
        self.undo_manager.undo_n(&mut self.world, count)
    }

    pub fn redo_n(&mut self, count: usize) -> Result<usize, EditError> {
        self.undo_manager.redo_n(&mut self.world, count)
    }

    /// `(undo_count, redo_count)`
    pub fn stack_depth(&self) -> (usize, usize) {
        self.undo_manager.stack_depth()
    }

    /// Whether the edit history still needs `clip`'s audio data.
    pub fn clip_in_use(&self, clip: ClipId) -> bool {
        self.undo_manager.references_clip(clip)
    }

    pub fn save_history(&self) -> Result<String, PersistenceError> {
        self.undo_manager.save_json()
    }

    /// Replaces the edit history with one saved alongside this project.
    pub fn load_history(&mut self, json: &str) -> Result<(), PersistenceError> {
        let loaded = UndoManager::load_json(json)?;
        let mut previous = std::mem::replace(&mut self.undo_manager, loaded);
        previous.clear();
        Ok(())
    }

    pub fn save_history_to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.undo_manager.save_to_file(path)
    }

    pub fn load_history_from_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let loaded = UndoManager::load_from_file(path)?;
        let mut previous = std::mem::replace(&mut self.undo_manager, loaded);
        previous.clear();
        Ok(())
    }
}
