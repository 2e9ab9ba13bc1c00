use std::ops::Range;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    automation::AutomationTrack,
    config::EditorConfig,
    error::{ConsistencyError, EditError, ValidationError},
    graph::{Detached, GraphEdit, ProjectGraph},
    ids::{PluginId, SlotAddress, SlotKind, TrackId},
    plugin::{BridgeMode, Host, Plugin, PluginDescriptor},
    ports::PortConnections,
    selections::{MixerSelectionSnapshot, SlotSelection, SlotTarget, SlottedPlugin},
    track::TrackKind,
};

use super::Undoable;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MixerEditRequest {
    Create {
        target: SlotTarget,
        descriptor: PluginDescriptor,
        count: usize,
    },
    Delete {
        selection: SlotSelection,
    },
    Move {
        selection: SlotSelection,
        target: SlotTarget,
    },
    Copy {
        selection: SlotSelection,
        target: SlotTarget,
    },
    Paste {
        clipboard: MixerSelectionSnapshot,
        clipboard_automation: Vec<AutomationTrack>,
        target: SlotTarget,
    },
    ChangeBypassStatus {
        selection: SlotSelection,
        bypassed: bool,
    },
    ChangeLoadBehavior {
        selection: SlotSelection,
        bridge_mode: BridgeMode,
    },
}

/// A channel created by an edit whose target had no track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewChannel {
    pub id: TrackId,
    pub name: String,
    pub kind: TrackKind,
}

/// Plugins that occupied destination slots, with their lanes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplacedPlugins {
    pub deleted_snapshot: Vec<SlottedPlugin>,
    pub displaced_automation: Vec<AutomationTrack>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionHistory {
    pub connections_before: PortConnections,
    /// Recorded by the first do and replayed by every redo.
    pub connections_after: Option<PortConnections>,
}

impl ConnectionHistory {
    pub(super) fn capture(world: &World) -> Self {
        Self {
            connections_before: world.port_connections().cloned().unwrap_or_default(),
            connections_after: None,
        }
    }

    pub(super) fn replay(&self, edit: &mut GraphEdit) {
        if let Some(after) = &self.connections_after {
            edit.replace_connections(after.clone());
        }
    }

    pub(super) fn record(&mut self, world: &World) {
        if self.connections_after.is_none() {
            self.connections_after = world.port_connections().cloned();
        }
    }

    pub(super) fn restore(&self, edit: &mut GraphEdit) {
        edit.replace_connections(self.connections_before.clone());
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatePlugins {
    pub target: SlotTarget,
    pub descriptor: PluginDescriptor,
    pub plugin_count: usize,
    new_channel: Option<NewChannel>,
    created: Vec<SlottedPlugin>,
    created_automation: Vec<AutomationTrack>,
    displaced: DisplacedPlugins,
    connections: ConnectionHistory,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeletePlugins {
    pub before_snapshot: MixerSelectionSnapshot,
    before_automation: Vec<AutomationTrack>,
    connections: ConnectionHistory,
}

/// Shared by move, copy and paste: plugins from `before_snapshot` end up
/// in consecutive slots starting at `target`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelocatePlugins {
    pub before_snapshot: MixerSelectionSnapshot,
    before_automation: Vec<AutomationTrack>,
    pub target: SlotTarget,
    new_channel: Option<NewChannel>,
    /// Copies placed by copy and paste; moves place the originals.
    placed: Vec<SlottedPlugin>,
    placed_automation: Vec<AutomationTrack>,
    displaced: DisplacedPlugins,
    connections: ConnectionHistory,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeBypassStatus {
    pub before_snapshot: MixerSelectionSnapshot,
    pub new_bool_value: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeLoadBehavior {
    pub before_snapshot: MixerSelectionSnapshot,
    pub new_bridge_mode: BridgeMode,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MixerEdit {
    Create(CreatePlugins),
    Delete(DeletePlugins),
    Move(RelocatePlugins),
    Copy(RelocatePlugins),
    Paste(RelocatePlugins),
    ChangeBypassStatus(ChangeBypassStatus),
    ChangeLoadBehavior(ChangeLoadBehavior),
}

#[derive(Clone, Copy, PartialEq)]
enum Relocation {
    Move,
    Copy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MixerEditAction {
    edit: MixerEdit,
    already_applied: bool,
}

impl MixerEditAction {
    /// Captures everything the edit needs from the live project. Nothing is
    /// modified.
    pub fn new(world: &World, request: MixerEditRequest) -> Result<Self, EditError> {
        let config = world
            .get_resource::<EditorConfig>()
            .cloned()
            .unwrap_or_default();

        let edit = match request {
            MixerEditRequest::Create {
                target,
                descriptor,
                count,
            } => {
                check_count(count, &config)?;
                MixerEdit::Create(CreatePlugins {
                    target,
                    descriptor,
                    plugin_count: count,
                    new_channel: None,
                    created: Vec::new(),
                    created_automation: Vec::new(),
                    displaced: DisplacedPlugins::default(),
                    connections: ConnectionHistory::capture(world),
                })
            }
            MixerEditRequest::Delete { selection } => {
                let before_snapshot = MixerSelectionSnapshot::capture(world, &selection)?;
                MixerEdit::Delete(DeletePlugins {
                    before_automation: before_snapshot.capture_automation(world),
                    before_snapshot,
                    connections: ConnectionHistory::capture(world),
                })
            }
            MixerEditRequest::Move { selection, target } => {
                let before_snapshot = MixerSelectionSnapshot::capture(world, &selection)?;
                let before_automation = before_snapshot.capture_automation(world);
                MixerEdit::Move(RelocatePlugins::new(
                    world,
                    &config,
                    before_snapshot,
                    before_automation,
                    target,
                )?)
            }
            MixerEditRequest::Copy { selection, target } => {
                let before_snapshot = MixerSelectionSnapshot::capture(world, &selection)?;
                let before_automation = before_snapshot.capture_automation(world);
                MixerEdit::Copy(RelocatePlugins::new(
                    world,
                    &config,
                    before_snapshot,
                    before_automation,
                    target,
                )?)
            }
            MixerEditRequest::Paste {
                clipboard,
                clipboard_automation,
                target,
            } => MixerEdit::Paste(RelocatePlugins::new(
                world,
                &config,
                clipboard,
                clipboard_automation,
                target,
            )?),
            MixerEditRequest::ChangeBypassStatus {
                selection,
                bypassed,
            } => MixerEdit::ChangeBypassStatus(ChangeBypassStatus {
                before_snapshot: MixerSelectionSnapshot::capture(world, &selection)?,
                new_bool_value: bypassed,
            }),
            MixerEditRequest::ChangeLoadBehavior {
                selection,
                bridge_mode,
            } => MixerEdit::ChangeLoadBehavior(ChangeLoadBehavior {
                before_snapshot: MixerSelectionSnapshot::capture(world, &selection)?,
                new_bridge_mode: bridge_mode,
            }),
        };

        Ok(Self {
            edit,
            already_applied: false,
        })
    }

    pub fn edit(&self) -> &MixerEdit {
        &self.edit
    }
}

impl Undoable for MixerEditAction {
    fn apply(&mut self, world: &mut World) -> Result<(), EditError> {
        let first = !self.already_applied;
        match &mut self.edit {
            MixerEdit::Create(create) => create.apply(world, first)?,
            MixerEdit::Delete(delete) => delete.apply(world, first)?,
            MixerEdit::Move(relocate) => relocate.apply(world, Relocation::Move, first)?,
            MixerEdit::Copy(relocate) | MixerEdit::Paste(relocate) => {
                relocate.apply(world, Relocation::Copy, first)?
            }
            MixerEdit::ChangeBypassStatus(change) => {
                let bypassed = change.new_bool_value;
                update_plugins(world, &change.before_snapshot, |plugin, _| {
                    plugin.bypassed = bypassed
                })?
            }
            MixerEdit::ChangeLoadBehavior(change) => {
                let bridge_mode = change.new_bridge_mode;
                update_plugins(world, &change.before_snapshot, |plugin, _| {
                    plugin.bridge_mode = bridge_mode
                })?
            }
        }
        self.already_applied = true;
        Ok(())
    }

    fn undo(&mut self, world: &mut World) -> Result<(), EditError> {
        if !self.already_applied {
            return Err(ConsistencyError::NotApplied.into());
        }
        match &self.edit {
            MixerEdit::Create(create) => create.undo(world),
            MixerEdit::Delete(delete) => delete.undo(world),
            MixerEdit::Move(relocate) => relocate.undo(world, Relocation::Move),
            MixerEdit::Copy(relocate) | MixerEdit::Paste(relocate) => {
                relocate.undo(world, Relocation::Copy)
            }
            MixerEdit::ChangeBypassStatus(change) => {
                update_plugins(world, &change.before_snapshot, |plugin, before| {
                    plugin.bypassed = before.bypassed
                })
            }
            MixerEdit::ChangeLoadBehavior(change) => {
                update_plugins(world, &change.before_snapshot, |plugin, before| {
                    plugin.bridge_mode = before.bridge_mode
                })
            }
        }
    }

    fn describe(&self) -> String {
        match &self.edit {
            MixerEdit::Create(create) if create.plugin_count == 1 => {
                format!("Create {}", create.descriptor.name)
            }
            MixerEdit::Create(create) => {
                format!("Create {} {}s", create.plugin_count, create.descriptor.name)
            }
            MixerEdit::Delete(delete) if delete.before_snapshot.len() == 1 => {
                "Delete Plugin".to_owned()
            }
            MixerEdit::Delete(delete) => {
                format!("Delete {} Plugins", delete.before_snapshot.len())
            }
            MixerEdit::Move(relocate) => describe_plugins("Move", &relocate.before_snapshot),
            MixerEdit::Copy(relocate) => describe_plugins("Copy", &relocate.before_snapshot),
            MixerEdit::Paste(relocate) => describe_plugins("Paste", &relocate.before_snapshot),
            MixerEdit::ChangeBypassStatus(change) => {
                let verb = if change.new_bool_value { "Bypass" } else { "Enable" };
                describe_plugins(verb, &change.before_snapshot)
            }
            MixerEdit::ChangeLoadBehavior(_) => "Change Load Behavior".to_owned(),
        }
    }

    fn already_applied(&self) -> bool {
        self.already_applied
    }
}

fn describe_plugins(verb: &str, snapshot: &MixerSelectionSnapshot) -> String {
    match snapshot.plugins.as_slice() {
        [single] => format!("{verb} {}", single.plugin.name()),
        plugins => format!("{verb} {} Plugins", plugins.len()),
    }
}

fn check_count(count: usize, config: &EditorConfig) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::NothingSelected);
    }
    if count > config.max_plugins_per_edit {
        return Err(ValidationError::PluginLimitExceeded {
            requested: count,
            limit: config.max_plugins_per_edit,
        });
    }
    Ok(())
}

/// Checks that `count` consecutive slots from `target` exist, without
/// touching anything, and returns them.
fn check_range(
    world: &World,
    target: &SlotTarget,
    count: usize,
) -> Result<Range<usize>, EditError> {
    let available = match target.track {
        Some(track) => world
            .channel(track)
            .ok_or(ValidationError::TrackNotFound(track))?
            .num_slots(target.kind),
        None => world
            .get_resource::<EditorConfig>()
            .cloned()
            .unwrap_or_default()
            .num_slots(target.kind),
    };

    let last = target.slot.checked_add(count.saturating_sub(1));
    match last {
        Some(last) if last < available => Ok(target.slot..last + 1),
        _ => {
            let slot = last.unwrap_or(target.slot);
            Err(match target.track {
                Some(track) => ValidationError::SlotOutOfRange {
                    address: SlotAddress::new(track, target.kind, slot),
                    available,
                },
                None => ValidationError::NewChannelSlotOutOfRange {
                    kind: target.kind,
                    slot,
                    available,
                },
            }
            .into())
        }
    }
}

fn resolve_track(
    target: &SlotTarget,
    new_channel: &Option<NewChannel>,
) -> Result<TrackId, EditError> {
    target
        .track
        .or(new_channel.as_ref().map(|channel| channel.id))
        .ok_or(ConsistencyError::MissingNewChannel.into())
}

fn new_channel_kind(kind: SlotKind) -> TrackKind {
    match kind {
        SlotKind::Instrument => TrackKind::Instrument,
        _ => TrackKind::AudioBus,
    }
}

fn lanes_for(automation: &[AutomationTrack], plugin: PluginId) -> Vec<AutomationTrack> {
    automation
        .iter()
        .filter(|lane| lane.plugin_id() == Some(plugin))
        .cloned()
        .collect()
}

fn expect_plugin(
    detached: &Detached,
    address: &SlotAddress,
    expected: PluginId,
) -> Result<(), EditError> {
    if detached.plugin.id == expected {
        Ok(())
    } else {
        Err(ConsistencyError::PluginMismatch {
            address: *address,
            expected,
        }
        .into())
    }
}

/// Empties every occupied slot in `slots`, remembering what was there.
fn displace(
    edit: &mut GraphEdit,
    track: TrackId,
    kind: SlotKind,
    slots: impl Iterator<Item = usize>,
) -> Result<DisplacedPlugins, EditError> {
    let mut displaced = DisplacedPlugins::default();
    for slot in slots {
        let address = SlotAddress::new(track, kind, slot);
        if edit.plugin_at(&address)?.is_none() {
            continue;
        }
        let detached = edit.detach_plugin(&address)?;
        log::debug!("{} displaced from {address}", detached.plugin.name());
        displaced.deleted_snapshot.push(SlottedPlugin {
            slot,
            plugin: detached.plugin,
        });
        displaced.displaced_automation.extend(detached.automation);
    }
    Ok(displaced)
}

fn restore_displaced(
    edit: &mut GraphEdit,
    track: TrackId,
    kind: SlotKind,
    displaced: &DisplacedPlugins,
) -> Result<(), EditError> {
    for displaced_plugin in &displaced.deleted_snapshot {
        let plugin = &displaced_plugin.plugin;
        edit.insert_plugin(
            &SlotAddress::new(track, kind, displaced_plugin.slot),
            plugin.clone(),
            lanes_for(&displaced.displaced_automation, plugin.id),
        )?;
    }
    Ok(())
}

fn update_plugins(
    world: &mut World,
    snapshot: &MixerSelectionSnapshot,
    update: impl Fn(&mut Plugin, &Plugin),
) -> Result<(), EditError> {
    let mut edit = GraphEdit::new(world);
    for captured in &snapshot.plugins {
        let address = snapshot.address(captured.slot);
        let plugin = edit.plugin_mut(&address)?;
        if plugin.id != captured.plugin.id {
            return Err(ConsistencyError::PluginMismatch {
                address,
                expected: captured.plugin.id,
            }
            .into());
        }
        update(plugin, &captured.plugin);
    }
    edit.commit()?;
    Ok(())
}

impl CreatePlugins {
    fn apply(&mut self, world: &mut World, first: bool) -> Result<(), EditError> {
        let slots = check_range(world, &self.target, self.plugin_count)?;

        let (plugins, new_channel) = if first {
            let host = world
                .get_resource::<Host>()
                .ok_or(ConsistencyError::MissingResource("Host"))?;
            let plugins = (0..self.plugin_count)
                .map(|_| host.0.create_plugin(&self.descriptor))
                .collect::<Result<Vec<_>, _>>()?;
            let new_channel = self.target.track.is_none().then(|| NewChannel {
                id: TrackId::new(),
                name: self.descriptor.name.clone(),
                kind: new_channel_kind(self.target.kind),
            });
            (plugins, new_channel)
        } else {
            let plugins = self.created.iter().map(|p| p.plugin.clone()).collect();
            (plugins, self.new_channel.clone())
        };

        let track = resolve_track(&self.target, &new_channel)?;
        let kind = self.target.kind;
        let created: Vec<SlottedPlugin> = slots
            .clone()
            .zip(plugins)
            .map(|(slot, plugin)| SlottedPlugin { slot, plugin })
            .collect();

        let mut edit = GraphEdit::new(world);
        if let Some(channel) = &new_channel {
            edit.add_track(channel.id, &channel.name, channel.kind);
        }

        let displaced = displace(&mut edit, track, kind, slots)?;
        for placed in &created {
            edit.insert_plugin(
                &SlotAddress::new(track, kind, placed.slot),
                placed.plugin.clone(),
                lanes_for(&self.created_automation, placed.plugin.id),
            )?;
        }
        let created_automation: Vec<AutomationTrack> = {
            let automation = &edit.track(track)?.automation;
            created
                .iter()
                .flat_map(|p| automation.for_plugin(p.plugin.id).cloned())
                .collect()
        };
        self.connections.replay(&mut edit);
        edit.commit()?;

        self.connections.record(world);
        self.displaced = displaced;
        if first {
            self.new_channel = new_channel;
            self.created = created;
            self.created_automation = created_automation;
        }
        Ok(())
    }

    fn undo(&self, world: &mut World) -> Result<(), EditError> {
        let track = resolve_track(&self.target, &self.new_channel)?;
        let mut edit = GraphEdit::new(world);

        for created in &self.created {
            let address = SlotAddress::new(track, self.target.kind, created.slot);
            let detached = edit.detach_plugin(&address)?;
            expect_plugin(&detached, &address, created.plugin.id)?;
        }
        restore_displaced(&mut edit, track, self.target.kind, &self.displaced)?;
        if let Some(channel) = &self.new_channel {
            edit.remove_track(channel.id)?;
        }
        self.connections.restore(&mut edit);
        edit.commit()?;
        Ok(())
    }
}

impl DeletePlugins {
    fn apply(&mut self, world: &mut World, _first: bool) -> Result<(), EditError> {
        let mut edit = GraphEdit::new(world);
        for captured in self.before_snapshot.by_slot() {
            let address = self.before_snapshot.address(captured.slot);
            let detached = edit.detach_plugin(&address)?;
            expect_plugin(&detached, &address, captured.plugin.id)?;
        }
        self.connections.replay(&mut edit);
        edit.commit()?;

        self.connections.record(world);
        Ok(())
    }

    /// Puts every plugin back in the slot it was deleted from, lowest slot
    /// first, whatever order the selection listed them in.
    fn undo(&self, world: &mut World) -> Result<(), EditError> {
        let mut edit = GraphEdit::new(world);
        for captured in self.before_snapshot.by_slot() {
            edit.insert_plugin(
                &self.before_snapshot.address(captured.slot),
                captured.plugin.clone(),
                lanes_for(&self.before_automation, captured.plugin.id),
            )?;
        }
        self.connections.restore(&mut edit);
        edit.commit()?;
        Ok(())
    }
}

impl RelocatePlugins {
    fn new(
        world: &World,
        config: &EditorConfig,
        before_snapshot: MixerSelectionSnapshot,
        before_automation: Vec<AutomationTrack>,
        target: SlotTarget,
    ) -> Result<Self, EditError> {
        check_count(before_snapshot.len(), config)?;
        Ok(Self {
            before_snapshot,
            before_automation,
            target,
            new_channel: None,
            placed: Vec::new(),
            placed_automation: Vec::new(),
            displaced: DisplacedPlugins::default(),
            connections: ConnectionHistory::capture(world),
        })
    }

    fn apply(
        &mut self,
        world: &mut World,
        relocation: Relocation,
        first: bool,
    ) -> Result<(), EditError> {
        let sources: Vec<SlottedPlugin> = self
            .before_snapshot
            .by_slot()
            .into_iter()
            .cloned()
            .collect();
        let destinations = check_range(world, &self.target, sources.len())?;

        let copies: Vec<Detached> = match relocation {
            Relocation::Move => Vec::new(),
            Relocation::Copy if first => {
                let host = world
                    .get_resource::<Host>()
                    .ok_or(ConsistencyError::MissingResource("Host"))?;
                let mut copies = Vec::with_capacity(sources.len());
                for source in &sources {
                    let plugin = host.0.clone_plugin(&source.plugin)?;
                    let automation = lanes_for(&self.before_automation, source.plugin.id)
                        .iter()
                        .map(|lane| lane.retarget(plugin.id))
                        .collect();
                    copies.push(Detached { plugin, automation });
                }
                copies
            }
            Relocation::Copy => self
                .placed
                .iter()
                .map(|placed| Detached {
                    plugin: placed.plugin.clone(),
                    automation: lanes_for(&self.placed_automation, placed.plugin.id),
                })
                .collect(),
        };

        let new_channel = if first {
            self.target.track.is_none().then(|| NewChannel {
                id: TrackId::new(),
                name: format!(
                    "{} (Copy)",
                    sources.first().map_or("Plugin", |source| source.plugin.name())
                ),
                kind: new_channel_kind(self.target.kind),
            })
        } else {
            self.new_channel.clone()
        };
        let track = resolve_track(&self.target, &new_channel)?;

        let mut edit = GraphEdit::new(world);
        if let Some(channel) = &new_channel {
            edit.add_track(channel.id, &channel.name, channel.kind);
        }

        // Every source leaves before any destination is filled, so moving
        // onto overlapping slots of the same strip never displaces a
        // selected plugin.
        let incoming = match relocation {
            Relocation::Move => {
                let mut moved = Vec::with_capacity(sources.len());
                for source in &sources {
                    let address = self.before_snapshot.address(source.slot);
                    let detached = edit.take_plugin(&address)?;
                    expect_plugin(&detached, &address, source.plugin.id)?;
                    moved.push(detached);
                }
                moved
            }
            Relocation::Copy => copies,
        };

        let displaced = displace(&mut edit, track, self.target.kind, destinations.clone())?;

        let mut placed = Vec::with_capacity(incoming.len());
        let mut placed_automation = Vec::new();
        for (slot, detached) in destinations.zip(incoming) {
            let address = SlotAddress::new(track, self.target.kind, slot);
            if relocation == Relocation::Copy {
                placed.push(SlottedPlugin {
                    slot: address.slot,
                    plugin: detached.plugin.clone(),
                });
                placed_automation.extend(detached.automation.iter().cloned());
            }
            edit.insert_plugin(&address, detached.plugin, detached.automation)?;
        }
        self.connections.replay(&mut edit);
        edit.commit()?;

        self.connections.record(world);
        self.displaced = displaced;
        if first {
            self.new_channel = new_channel;
            self.placed = placed;
            self.placed_automation = placed_automation;
        }
        Ok(())
    }

    fn undo(&self, world: &mut World, relocation: Relocation) -> Result<(), EditError> {
        let track = resolve_track(&self.target, &self.new_channel)?;
        let sources = self.before_snapshot.by_slot();
        let mut edit = GraphEdit::new(world);

        let mut returning = Vec::new();
        match relocation {
            Relocation::Move => {
                for (source, slot) in sources.iter().zip(self.target.slot..) {
                    let address = SlotAddress::new(track, self.target.kind, slot);
                    let detached = edit.take_plugin(&address)?;
                    expect_plugin(&detached, &address, source.plugin.id)?;
                    returning.push((self.before_snapshot.address(source.slot), detached));
                }
            }
            Relocation::Copy => {
                for placed in &self.placed {
                    let address = SlotAddress::new(track, self.target.kind, placed.slot);
                    let detached = edit.detach_plugin(&address)?;
                    expect_plugin(&detached, &address, placed.plugin.id)?;
                }
            }
        }

        restore_displaced(&mut edit, track, self.target.kind, &self.displaced)?;
        for (address, detached) in returning {
            edit.insert_plugin(&address, detached.plugin, detached.automation)?;
        }
        if let Some(channel) = &self.new_channel {
            edit.remove_track(channel.id)?;
        }
        self.connections.restore(&mut edit);
        edit.commit()?;
        Ok(())
    }
}
