use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConsistencyError, EditError, ValidationError},
    graph::GraphEdit,
    ids::{ClipId, NoteId, RegionId, TrackId},
    region::MidiNote,
    selections::EditableObject,
};

use super::Undoable;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SelectedObject {
    Note {
        track: TrackId,
        region: RegionId,
        note: NoteId,
    },
    Region {
        track: TrackId,
        region: RegionId,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSelectionRequest {
    pub selection: Vec<SelectedObject>,
    /// Added to every copy's position.
    pub tick_offset: i64,
    /// Added to every copied note's pitch; regions ignore it.
    pub value_offset: i32,
}

/// Copies timeline objects in place, shifted by an offset. Copies get new
/// ids on the first do; redo brings back those same copies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSelectionAction {
    selection_snapshot: Vec<EditableObject>,
    tick_offset: i64,
    value_offset: i32,
    inserted: Vec<EditableObject>,
    already_applied: bool,
}

impl DuplicateSelectionAction {
    pub fn new(world: &World, request: DuplicateSelectionRequest) -> Result<Self, EditError> {
        if request.selection.is_empty() {
            return Err(ValidationError::NothingSelected.into());
        }

        let selection_snapshot = request
            .selection
            .iter()
            .map(|selected| match *selected {
                SelectedObject::Note {
                    track,
                    region,
                    note,
                } => EditableObject::capture_note(world, track, region, note),
                SelectedObject::Region { track, region } => {
                    EditableObject::capture_region(world, track, region)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let action = Self {
            selection_snapshot,
            tick_offset: request.tick_offset,
            value_offset: request.value_offset,
            inserted: Vec::new(),
            already_applied: false,
        };

        // Fail now rather than halfway through the first do.
        for object in &action.selection_snapshot {
            action.duplicate(object)?;
        }
        Ok(action)
    }

    pub fn inserted(&self) -> &[EditableObject] {
        &self.inserted
    }

    pub(crate) fn references_clip(&self, clip: ClipId) -> bool {
        self.selection_snapshot
            .iter()
            .chain(&self.inserted)
            .any(|object| object.references_clip(clip))
    }

    fn duplicate(&self, object: &EditableObject) -> Result<EditableObject, ValidationError> {
        match object {
            EditableObject::Note { region, note } => {
                let start = offset_position(note.start, self.tick_offset)?;
                let pitch = i32::from(note.pitch).saturating_add(self.value_offset);
                let pitch = u8::try_from(pitch)
                    .ok()
                    .filter(|pitch| *pitch <= 127)
                    .ok_or(ValidationError::PitchOutOfRange(pitch))?;
                Ok(EditableObject::Note {
                    region: *region,
                    note: MidiNote {
                        id: NoteId::new(),
                        start,
                        pitch,
                        ..note.clone()
                    },
                })
            }
            EditableObject::Region { track, region } => {
                let mut copy = region.duplicate();
                copy.start = offset_position(region.start, self.tick_offset)?;
                Ok(EditableObject::Region {
                    track: *track,
                    region: copy,
                })
            }
        }
    }
}

fn offset_position(position: i64, offset: i64) -> Result<i64, ValidationError> {
    let moved = position.saturating_add(offset);
    if moved < 0 {
        Err(ValidationError::NegativePosition(moved))
    } else {
        Ok(moved)
    }
}

fn insert_object(edit: &mut GraphEdit, object: &EditableObject) -> Result<(), EditError> {
    match object {
        EditableObject::Note { region, note } => {
            let track = edit.region_track(*region)?;
            let notes = edit
                .track(track)?
                .lanes
                .region_mut(*region)
                .and_then(|r| r.notes_mut())
                .ok_or(ValidationError::RegionNotFound(*region))?;
            notes.push(note.clone());
        }
        EditableObject::Region { track, region } => {
            edit.track(*track)?.lanes.regions.push(region.clone());
        }
    }
    Ok(())
}

fn remove_object(edit: &mut GraphEdit, object: &EditableObject) -> Result<(), EditError> {
    match object {
        EditableObject::Note { region, note } => {
            let track = edit.region_track(*region)?;
            let notes = edit
                .track(track)?
                .lanes
                .region_mut(*region)
                .and_then(|r| r.notes_mut())
                .ok_or(ConsistencyError::MissingRegion(*region))?;
            let index = notes
                .iter()
                .position(|n| n.id == note.id)
                .ok_or(ConsistencyError::MissingNote(note.id))?;
            notes.remove(index);
        }
        EditableObject::Region { track, region } => {
            edit.track(*track)?
                .lanes
                .remove_region(region.id)
                .ok_or(ConsistencyError::MissingRegion(region.id))?;
        }
    }
    Ok(())
}

impl Undoable for DuplicateSelectionAction {
    fn apply(&mut self, world: &mut World) -> Result<(), EditError> {
        let copies = if self.already_applied {
            self.inserted.clone()
        } else {
            self.selection_snapshot
                .iter()
                .map(|object| self.duplicate(object))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut edit = GraphEdit::new(world);
        for copy in &copies {
            insert_object(&mut edit, copy)?;
        }
        edit.commit()?;

        self.inserted = copies;
        self.already_applied = true;
        Ok(())
    }

    fn undo(&mut self, world: &mut World) -> Result<(), EditError> {
        if !self.already_applied {
            return Err(ConsistencyError::NotApplied.into());
        }

        let mut edit = GraphEdit::new(world);
        for copy in self.inserted.iter().rev() {
            remove_object(&mut edit, copy)?;
        }
        edit.commit()?;
        Ok(())
    }

    fn describe(&self) -> String {
        match self.selection_snapshot.as_slice() {
            [EditableObject::Note { .. }] => "Duplicate Note".to_owned(),
            [EditableObject::Region { .. }] => "Duplicate Region".to_owned(),
            objects => format!("Duplicate {} Objects", objects.len()),
        }
    }

    fn already_applied(&self) -> bool {
        self.already_applied
    }
}
