use super::*;
use crate::{
    actions::{DuplicateSelectionRequest, SelectedObject},
    region::{MidiNote, Region},
};

fn notes(project: &Project, track: TrackId, region: RegionId) -> Vec<MidiNote> {
    project
        .world()
        .lanes(track)
        .unwrap()
        .region(region)
        .unwrap()
        .notes()
        .to_vec()
}

#[test]
fn duplicate_notes() {
    let Setup {
        mut project, t1, ..
    } = setup();
    let c = MidiNote::new(0, 240, 60, 100);
    let e = MidiNote::new(480, 240, 64, 90);
    let region = project
        .add_region(t1, Region::midi("Chords", 0, 1920).with_notes([c.clone(), e.clone()]))
        .unwrap();
    let before = snapshot(&project);

    project
        .perform(DuplicateSelectionRequest {
            selection: vec![
                SelectedObject::Note {
                    track: t1,
                    region,
                    note: c.id,
                },
                SelectedObject::Note {
                    track: t1,
                    region,
                    note: e.id,
                },
            ],
            tick_offset: 960,
            value_offset: 12,
        })
        .unwrap();

    let duplicated = notes(&project, t1, region);
    assert_eq!(4, duplicated.len());
    itertools::assert_equal(
        duplicated.iter().map(|note| (note.start, note.pitch, note.velocity)),
        [(0, 60, 100), (480, 64, 90), (960, 72, 100), (1440, 76, 90)],
    );
    assert!(duplicated[2..].iter().all(|note| note.id != c.id && note.id != e.id));
    assert_eq!(
        Some("Duplicate 2 Objects".to_owned()),
        project.undo_manager().undo_description()
    );
    let after = snapshot(&project);

    project.undo().unwrap();
    assert_eq!(before, snapshot(&project));

    project.redo().unwrap();
    assert_eq!(after, snapshot(&project));
}

#[test]
fn pitch_past_the_top_is_rejected() {
    let Setup {
        mut project, t1, ..
    } = setup();
    let note = MidiNote::new(0, 240, 120, 100);
    let region = project
        .add_region(t1, Region::midi("High", 0, 960).with_notes([note.clone()]))
        .unwrap();
    let before = snapshot(&project);

    let err = project
        .perform(DuplicateSelectionRequest {
            selection: vec![SelectedObject::Note {
                track: t1,
                region,
                note: note.id,
            }],
            tick_offset: 0,
            value_offset: 12,
        })
        .unwrap_err();

    assert_eq!(
        EditError::Validation(ValidationError::PitchOutOfRange(132)),
        err
    );
    assert_eq!(before, snapshot(&project));
    assert_eq!((0, 0), project.stack_depth());
}

#[test]
fn huge_pitch_offset_is_rejected() {
    let Setup {
        mut project, t1, ..
    } = setup();
    let note = MidiNote::new(0, 240, 60, 100);
    let region = project
        .add_region(t1, Region::midi("Lead", 0, 960).with_notes([note.clone()]))
        .unwrap();
    let before = snapshot(&project);

    let err = project
        .perform(DuplicateSelectionRequest {
            selection: vec![SelectedObject::Note {
                track: t1,
                region,
                note: note.id,
            }],
            tick_offset: 0,
            value_offset: i32::MAX,
        })
        .unwrap_err();

    assert_eq!(
        EditError::Validation(ValidationError::PitchOutOfRange(i32::MAX)),
        err
    );
    assert_eq!(before, snapshot(&project));
    assert_eq!((0, 0), project.stack_depth());
}

#[test]
fn duplicate_before_timeline_start_is_rejected() {
    let Setup {
        mut project, t1, ..
    } = setup();
    let region = project
        .add_region(t1, Region::midi("Intro", 100, 960))
        .unwrap();

    let err = project
        .perform(DuplicateSelectionRequest {
            selection: vec![SelectedObject::Region { track: t1, region }],
            tick_offset: -200,
            value_offset: 0,
        })
        .unwrap_err();

    assert_eq!(
        EditError::Validation(ValidationError::NegativePosition(-100)),
        err
    );
}

#[test]
fn duplicate_region_keeps_its_clip_referenced() {
    let Setup {
        mut project, t2, ..
    } = setup();
    let clip = ClipId::new();
    let region = project
        .add_region(t2, Region::audio("Vox", 0, 1920, clip, false))
        .unwrap();

    project
        .perform(DuplicateSelectionRequest {
            selection: vec![SelectedObject::Region { track: t2, region }],
            tick_offset: 1920,
            value_offset: 5,
        })
        .unwrap();

    let lanes = project.world().lanes(t2).unwrap();
    assert_eq!(2, lanes.regions.len());
    let copy = &lanes.regions[1];
    assert_ne!(region, copy.id);
    assert_eq!(1920, copy.start);
    assert_eq!(Some(clip), copy.clip());
    assert_eq!(
        Some("Duplicate Region".to_owned()),
        project.undo_manager().undo_description()
    );

    assert!(project.clip_in_use(clip));
    assert!(!project.clip_in_use(ClipId::new()));

    project.undo().unwrap();
    assert_eq!(1, project.world().lanes(t2).unwrap().regions.len());
    // Still needed for redo.
    assert!(project.clip_in_use(clip));
}

#[test]
fn unknown_note_is_rejected() {
    let Setup {
        mut project, t1, ..
    } = setup();
    let region = project
        .add_region(t1, Region::midi("Empty", 0, 960))
        .unwrap();
    let missing = NoteId::new();

    let err = project
        .perform(DuplicateSelectionRequest {
            selection: vec![SelectedObject::Note {
                track: t1,
                region,
                note: missing,
            }],
            tick_offset: 0,
            value_offset: 0,
        })
        .unwrap_err();

    assert_eq!(
        EditError::Validation(ValidationError::NoteNotFound(missing)),
        err
    );
}
