use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConsistencyError, EditError, ValidationError},
    graph::{GraphEdit, ProjectGraph, port_exists},
    ports::{PortConnection, PortFlow, PortId},
    routing::would_create_cycle,
};

use super::Undoable;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PortConnectionRequest {
    Connect { src: PortId, dest: PortId },
    Disconnect { src: PortId, dest: PortId },
    Enable { src: PortId, dest: PortId },
    Disable { src: PortId, dest: PortId },
    ChangeMultiplier { src: PortId, dest: PortId, multiplier: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortConnectionEdit {
    Connect,
    Disconnect,
    Enable,
    Disable,
    ChangeMultiplier,
}

/// One routing table entry before and after the edit; `None` means no
/// connection between the two ports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortConnectionAction {
    edit: PortConnectionEdit,
    src: PortId,
    dest: PortId,
    /// Position of the entry in the routing table.
    index: usize,
    before: Option<PortConnection>,
    after: Option<PortConnection>,
    already_applied: bool,
}

impl PortConnectionAction {
    pub fn new(world: &World, request: PortConnectionRequest) -> Result<Self, EditError> {
        let connections = world.port_connections().cloned().unwrap_or_default();

        let (edit, src, dest) = match request {
            PortConnectionRequest::Connect { src, dest } => {
                (PortConnectionEdit::Connect, src, dest)
            }
            PortConnectionRequest::Disconnect { src, dest } => {
                (PortConnectionEdit::Disconnect, src, dest)
            }
            PortConnectionRequest::Enable { src, dest } => (PortConnectionEdit::Enable, src, dest),
            PortConnectionRequest::Disable { src, dest } => {
                (PortConnectionEdit::Disable, src, dest)
            }
            PortConnectionRequest::ChangeMultiplier { src, dest, .. } => {
                (PortConnectionEdit::ChangeMultiplier, src, dest)
            }
        };

        let index = connections.position(&src, &dest);
        let existing = connections.find(&src, &dest).cloned();

        let (before, after) = if edit == PortConnectionEdit::Connect {
            if existing.is_some() {
                return Err(ValidationError::ConnectionExists { src, dest }.into());
            }
            for port in [&src, &dest] {
                if !port_exists(world, port) {
                    return Err(ValidationError::UnknownPort(*port).into());
                }
            }
            if src.flow != PortFlow::Output || dest.flow != PortFlow::Input {
                return Err(ValidationError::PortDirection { src, dest }.into());
            }
            if would_create_cycle(world, &src, &dest)? {
                return Err(ValidationError::CyclicConnection.into());
            }
            (None, Some(PortConnection::new(src, dest)))
        } else {
            let existing = existing.ok_or(ValidationError::ConnectionNotFound { src, dest })?;
            let after = match request {
                PortConnectionRequest::Disconnect { .. } => {
                    if existing.locked {
                        return Err(ValidationError::ConnectionLocked { src, dest }.into());
                    }
                    None
                }
                PortConnectionRequest::Enable { .. } => Some(PortConnection {
                    enabled: true,
                    ..existing.clone()
                }),
                PortConnectionRequest::Disable { .. } => Some(PortConnection {
                    enabled: false,
                    ..existing.clone()
                }),
                PortConnectionRequest::ChangeMultiplier { multiplier, .. } => {
                    if !multiplier.is_finite() || multiplier < 0.0 {
                        return Err(ValidationError::InvalidGain(multiplier).into());
                    }
                    Some(PortConnection {
                        multiplier,
                        ..existing.clone()
                    })
                }
                PortConnectionRequest::Connect { .. } => None,
            };
            (Some(existing), after)
        };

        Ok(Self {
            edit,
            src,
            dest,
            index: index.unwrap_or(connections.len()),
            before,
            after,
            already_applied: false,
        })
    }

    fn set(&self, world: &mut World, connection: &Option<PortConnection>) -> Result<(), EditError> {
        let mut edit = GraphEdit::new(world);
        match connection {
            Some(connection) => edit.connections_mut().put(self.index, connection.clone()),
            None => {
                edit.connections_mut().remove(&self.src, &self.dest);
            }
        }
        edit.commit()?;
        Ok(())
    }
}

impl Undoable for PortConnectionAction {
    fn apply(&mut self, world: &mut World) -> Result<(), EditError> {
        self.set(world, &self.after)?;
        self.already_applied = true;
        Ok(())
    }

    fn undo(&mut self, world: &mut World) -> Result<(), EditError> {
        if !self.already_applied {
            return Err(ConsistencyError::NotApplied.into());
        }
        self.set(world, &self.before)
    }

    fn describe(&self) -> String {
        match self.edit {
            PortConnectionEdit::Connect => "Connect Ports",
            PortConnectionEdit::Disconnect => "Disconnect Ports",
            PortConnectionEdit::Enable => "Enable Connection",
            PortConnectionEdit::Disable => "Disable Connection",
            PortConnectionEdit::ChangeMultiplier => "Change Connection Multiplier",
        }
        .to_owned()
    }

    fn already_applied(&self) -> bool {
        self.already_applied
    }
}
