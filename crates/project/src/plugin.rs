use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::InstantiationError,
    ids::PluginId,
    ports::{PortFlow, PortId, PortKind},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub default_value: f32,
    pub automatable: bool,
}

impl ParamDescriptor {
    pub fn automatable(name: impl Into<String>, default_value: f32) -> Self {
        Self {
            name: name.into(),
            default_value,
            automatable: true,
        }
    }
}

/// What a plugin is, independent of any particular instance of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub uri: String,
    pub name: String,
    pub audio_inputs: u16,
    pub audio_outputs: u16,
    pub params: Vec<ParamDescriptor>,
}

/// How a plugin instance is isolated from the engine process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeMode {
    #[default]
    None,
    Ui,
    Full,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub id: PluginId,
    pub descriptor: PluginDescriptor,
    pub params: Vec<f32>,
    pub bypassed: bool,
    pub bridge_mode: BridgeMode,
    pub visible: bool,
}

impl Plugin {
    pub fn from_descriptor(descriptor: PluginDescriptor) -> Self {
        let params = descriptor.params.iter().map(|p| p.default_value).collect();
        Self {
            id: PluginId::new(),
            descriptor,
            params,
            bypassed: false,
            bridge_mode: BridgeMode::default(),
            visible: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Same state, new identity.
    pub fn duplicate(&self) -> Self {
        Self {
            id: PluginId::new(),
            ..self.clone()
        }
    }

    pub fn control_port(&self, index: u16) -> PortId {
        PortId::plugin(self.id, PortKind::Control, PortFlow::Input, index)
    }

    pub fn automatable_ports(&self) -> impl Iterator<Item = (PortId, &str)> {
        self.descriptor
            .params
            .iter()
            .enumerate()
            .filter(|(_, param)| param.automatable)
            .map(|(index, param)| (self.control_port(index as u16), param.name.as_str()))
    }

    pub fn has_port(&self, port: &PortId) -> bool {
        if port.plugin_id() != Some(self.id) {
            return false;
        }
        let count = match (port.kind, port.flow) {
            (PortKind::Audio, PortFlow::Input) => self.descriptor.audio_inputs as usize,
            (PortKind::Audio, PortFlow::Output) => self.descriptor.audio_outputs as usize,
            (PortKind::Control, PortFlow::Input) => self.descriptor.params.len(),
            // Every plugin has one event input and one event output.
            (PortKind::Event, _) => 1,
            (PortKind::Control, PortFlow::Output) => 0,
        };
        (port.index as usize) < count
    }
}

/// Creates live plugin instances. Instantiation is the only step of an edit
/// that can fail for reasons outside the project.
pub trait PluginHost: Send + Sync {
    fn create_plugin(&self, descriptor: &PluginDescriptor) -> Result<Plugin, InstantiationError>;

    fn clone_plugin(&self, plugin: &Plugin) -> Result<Plugin, InstantiationError>;
}

#[derive(Resource)]
pub struct Host(pub Box<dyn PluginHost>);

/// Host that instantiates every descriptor without loading anything.
#[derive(Debug, Default)]
pub struct InProcessHost;

impl PluginHost for InProcessHost {
    fn create_plugin(&self, descriptor: &PluginDescriptor) -> Result<Plugin, InstantiationError> {
        Ok(Plugin::from_descriptor(descriptor.clone()))
    }

    fn clone_plugin(&self, plugin: &Plugin) -> Result<Plugin, InstantiationError> {
        Ok(plugin.duplicate())
    }
}
