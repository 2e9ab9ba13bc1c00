use std::path::Path;

use anyhow::Context;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ids::SlotKind;

/// Editor limits, loadable from a TOML file. Missing keys fall back to the
/// defaults.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub undo_capacity: usize,
    pub insert_slots: usize,
    pub midi_fx_slots: usize,
    pub modulator_slots: usize,
    pub max_plugins_per_edit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_capacity: 128,
            insert_slots: 16,
            midi_fx_slots: 16,
            modulator_slots: 16,
            max_plugins_per_edit: 16,
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading editor config {}", path.display()))?;
        let config = Self::from_toml_str(&source)
            .with_context(|| format!("parsing editor config {}", path.display()))?;
        anyhow::ensure!(config.undo_capacity > 0, "undo_capacity must be at least 1");
        Ok(config)
    }

    pub fn num_slots(&self, kind: SlotKind) -> usize {
        match kind {
            SlotKind::MidiFx => self.midi_fx_slots,
            SlotKind::Instrument => 1,
            SlotKind::Insert => self.insert_slots,
            SlotKind::Modulator => self.modulator_slots,
        }
    }
}
