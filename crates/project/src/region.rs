use serde::{Deserialize, Serialize};

use crate::ids::{ClipId, NoteId, RegionId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MidiNote {
    pub id: NoteId,
    pub start: i64,
    pub length: i64,
    pub pitch: u8,
    pub velocity: u8,
}

impl MidiNote {
    pub fn new(start: i64, length: i64, pitch: u8, velocity: u8) -> Self {
        Self {
            id: NoteId::new(),
            start,
            length,
            pitch,
            velocity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RegionContent {
    Midi {
        notes: Vec<MidiNote>,
    },
    Audio {
        clip: ClipId,
        stretch_ratio: f64,
        /// Follows tempo changes when the transport is in musical mode.
        musical: bool,
    },
}

/// Positions and lengths are in ticks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub start: i64,
    pub length: i64,
    pub content: RegionContent,
}

impl Region {
    pub fn midi(name: impl Into<String>, start: i64, length: i64) -> Self {
        Self {
            id: RegionId::new(),
            name: name.into(),
            start,
            length,
            content: RegionContent::Midi { notes: Vec::new() },
        }
    }

    pub fn audio(
        name: impl Into<String>,
        start: i64,
        length: i64,
        clip: ClipId,
        musical: bool,
    ) -> Self {
        Self {
            id: RegionId::new(),
            name: name.into(),
            start,
            length,
            content: RegionContent::Audio {
                clip,
                stretch_ratio: 1.0,
                musical,
            },
        }
    }

    pub fn with_notes(mut self, new_notes: impl IntoIterator<Item = MidiNote>) -> Self {
        if let Some(notes) = self.notes_mut() {
            notes.extend(new_notes);
        }
        self
    }

    pub fn notes(&self) -> &[MidiNote] {
        match &self.content {
            RegionContent::Midi { notes } => notes,
            RegionContent::Audio { .. } => &[],
        }
    }

    pub fn notes_mut(&mut self) -> Option<&mut Vec<MidiNote>> {
        match &mut self.content {
            RegionContent::Midi { notes } => Some(notes),
            RegionContent::Audio { .. } => None,
        }
    }

    pub fn clip(&self) -> Option<ClipId> {
        match &self.content {
            RegionContent::Audio { clip, .. } => Some(*clip),
            RegionContent::Midi { .. } => None,
        }
    }

    pub fn stretch_ratio(&self) -> Option<f64> {
        match &self.content {
            RegionContent::Audio { stretch_ratio, .. } => Some(*stretch_ratio),
            RegionContent::Midi { .. } => None,
        }
    }

    pub fn set_stretch_ratio(&mut self, ratio: f64) -> bool {
        match &mut self.content {
            RegionContent::Audio { stretch_ratio, .. } => {
                *stretch_ratio = ratio;
                true
            }
            RegionContent::Midi { .. } => false,
        }
    }

    /// A copy with fresh ids for the region and every note in it.
    pub fn duplicate(&self) -> Self {
        let mut copy = Self {
            id: RegionId::new(),
            ..self.clone()
        };
        if let Some(notes) = copy.notes_mut() {
            for note in notes {
                note.id = NoteId::new();
            }
        }
        copy
    }
}
