use std::{collections::BTreeMap, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    actions::{
        ActionVariant, ChannelEditAction, DuplicateSelectionAction, MixerEditAction,
        PortConnectionAction, TracklistEditAction, TransportEditAction,
    },
    error::PersistenceError,
    undo::{UndoManager, UndoStack},
};

/// An action together with its position in the stack it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sequenced<T> {
    pub stack_index: usize,
    pub action: T,
}

/// One stack, stored as a sequence per action kind. The stack indices
/// interleave them back into chronological order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedUndoStack {
    pub capacity: usize,
    #[serde(default)]
    pub mixer_actions: Vec<Sequenced<MixerEditAction>>,
    #[serde(default)]
    pub transport_actions: Vec<Sequenced<TransportEditAction>>,
    #[serde(default)]
    pub duplicate_selection_actions: Vec<Sequenced<DuplicateSelectionAction>>,
    #[serde(default)]
    pub port_connection_actions: Vec<Sequenced<PortConnectionAction>>,
    #[serde(default)]
    pub channel_actions: Vec<Sequenced<ChannelEditAction>>,
    #[serde(default)]
    pub tracklist_actions: Vec<Sequenced<TracklistEditAction>>,
}

fn sequenced<T>(stack_index: usize, action: &T) -> Sequenced<T>
where
    T: Clone,
{
    Sequenced {
        stack_index,
        action: action.clone(),
    }
}

impl SerializedUndoStack {
    pub fn from_stack(stack: &UndoStack) -> Self {
        let mut serialized = Self {
            capacity: stack.capacity(),
            ..Default::default()
        };

        for (index, action) in stack.iter().enumerate() {
            match action {
                ActionVariant::Mixer(action) => {
                    serialized.mixer_actions.push(sequenced(index, action))
                }
                ActionVariant::Transport(action) => {
                    serialized.transport_actions.push(sequenced(index, action))
                }
                ActionVariant::DuplicateSelection(action) => serialized
                    .duplicate_selection_actions
                    .push(sequenced(index, action)),
                ActionVariant::PortConnection(action) => serialized
                    .port_connection_actions
                    .push(sequenced(index, action)),
                ActionVariant::Channel(action) => {
                    serialized.channel_actions.push(sequenced(index, action))
                }
                ActionVariant::Tracklist(action) => {
                    serialized.tracklist_actions.push(sequenced(index, action))
                }
            }
        }
        serialized
    }

    pub fn len(&self) -> usize {
        self.mixer_actions.len()
            + self.transport_actions.len()
            + self.duplicate_selection_actions.len()
            + self.port_connection_actions.len()
            + self.channel_actions.len()
            + self.tracklist_actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuilds the stack. The stored indices must cover `0..len` exactly
    /// once.
    pub fn into_stack(self) -> Result<UndoStack, PersistenceError> {
        let len = self.len();
        if len > self.capacity {
            return Err(PersistenceError::CapacityExceeded {
                len,
                capacity: self.capacity,
            });
        }

        let mut ordered = BTreeMap::new();
        let entries = (self.mixer_actions.into_iter())
            .map(|s| (s.stack_index, ActionVariant::Mixer(s.action)))
            .chain(
                self.transport_actions
                    .into_iter()
                    .map(|s| (s.stack_index, ActionVariant::Transport(s.action))),
            )
            .chain(
                self.duplicate_selection_actions
                    .into_iter()
                    .map(|s| (s.stack_index, ActionVariant::DuplicateSelection(s.action))),
            )
            .chain(
                self.port_connection_actions
                    .into_iter()
                    .map(|s| (s.stack_index, ActionVariant::PortConnection(s.action))),
            )
            .chain(
                self.channel_actions
                    .into_iter()
                    .map(|s| (s.stack_index, ActionVariant::Channel(s.action))),
            )
            .chain(
                self.tracklist_actions
                    .into_iter()
                    .map(|s| (s.stack_index, ActionVariant::Tracklist(s.action))),
            );

        for (index, action) in entries {
            if ordered.insert(index, action).is_some() {
                return Err(PersistenceError::DuplicateIndex(index));
            }
        }
        if let Some(missing) = (0..len).find(|index| !ordered.contains_key(index)) {
            return Err(PersistenceError::MissingIndex(missing));
        }

        UndoStack::from_actions(ordered.into_values(), self.capacity).ok_or(
            PersistenceError::CapacityExceeded {
                len,
                capacity: self.capacity,
            },
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedUndoManager {
    pub undo_stack: SerializedUndoStack,
    pub redo_stack: SerializedUndoStack,
}

impl UndoManager {
    pub fn to_serialized(&self) -> SerializedUndoManager {
        SerializedUndoManager {
            undo_stack: SerializedUndoStack::from_stack(self.undo_stack()),
            redo_stack: SerializedUndoStack::from_stack(self.redo_stack()),
        }
    }

    pub fn from_serialized(serialized: SerializedUndoManager) -> Result<Self, PersistenceError> {
        let undo_stack = serialized.undo_stack.into_stack()?;
        let redo_stack = serialized.redo_stack.into_stack()?;
        log::info!(
            "loaded undo history with {} undo and {} redo actions",
            undo_stack.len(),
            redo_stack.len()
        );
        Ok(UndoManager::from_stacks(undo_stack, redo_stack))
    }

    pub fn save_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(&self.to_serialized())?)
    }

    pub fn load_json(json: &str) -> Result<Self, PersistenceError> {
        let serialized: SerializedUndoManager = serde_json::from_str(json)?;
        Self::from_serialized(serialized)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = self.save_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("writing undo history to {}", path.display()))
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading undo history from {}", path.display()))?;
        Self::load_json(&json)
            .with_context(|| format!("loading undo history from {}", path.display()))
    }
}
