use super::*;
use crate::{
    actions::{ChannelEditRequest, TracklistEdit, TracklistEditRequest},
    ports::{PortConnection, PortConnections, PortFlow, PortId, PortKind},
    region::Region,
    track::{Track, Tracklist},
};

fn order(project: &Project) -> Vec<TrackId> {
    project
        .world()
        .get_resource::<Tracklist>()
        .unwrap()
        .ids()
        .collect()
}

fn route(project: &mut Project, track: TrackId, output: TrackId) {
    let entity = project
        .world()
        .get_resource::<Tracklist>()
        .unwrap()
        .entity(track)
        .unwrap();
    project.world_mut().get_mut::<Track>(entity).unwrap().output = Some(output);
    project.world_mut().recalculate_processing_schedule().unwrap();
}

#[test]
fn create_track_at_position() {
    let Setup {
        mut project,
        t1,
        t2,
        ..
    } = setup();
    let master = project.master().unwrap();
    let before = snapshot(&project);

    let bus = project
        .create_track("Reverb Bus", TrackKind::AudioBus, Some(1))
        .unwrap();

    assert_eq!(vec![master, bus, t1, t2], order(&project));
    let after = snapshot(&project);
    let created = after.track(bus).unwrap();
    assert_eq!("Reverb Bus", created.name);
    assert_eq!(Some(master), created.track.output);
    assert_eq!(
        Some("Create Track Reverb Bus".to_owned()),
        project.undo_manager().undo_description()
    );

    project.undo().unwrap();
    assert_eq!(before, snapshot(&project));

    project.redo().unwrap();
    assert_eq!(after, snapshot(&project));
}

#[test]
fn create_appends_by_default() {
    let Setup {
        mut project, t2, ..
    } = setup();

    project
        .perform(TracklistEditRequest::Create {
            name: "Keys".to_owned(),
            kind: TrackKind::Instrument,
            position: None,
        })
        .unwrap();

    let tracks = order(&project);
    assert_eq!(4, tracks.len());
    assert_eq!(t2, tracks[2]);
    assert_eq!("Keys", snapshot(&project).tracks[3].name);
}

#[test]
fn invalid_creates_are_rejected() {
    let Setup { mut project, .. } = setup();
    let before = snapshot(&project);

    assert_eq!(
        EditError::Validation(ValidationError::DuplicateMaster),
        project
            .create_track("Master 2", TrackKind::Master, None)
            .unwrap_err()
    );
    assert_eq!(
        EditError::Validation(ValidationError::TrackPositionOutOfRange {
            position: 4,
            len: 3,
        }),
        project
            .create_track("Far", TrackKind::Audio, Some(4))
            .unwrap_err()
    );

    assert_eq!(before, snapshot(&project));
    assert_eq!((0, 0), project.stack_depth());
}

#[test]
fn delete_track_and_undo_restores_it() {
    let Setup {
        mut project,
        t1,
        t2,
        ..
    } = setup();
    let master = project.master().unwrap();
    let plugin = place_plugin(&mut project, t1, SlotKind::Insert, 0, "Compressor");
    project
        .add_region(t1, Region::midi("Verse", 0, 1920))
        .unwrap();
    project
        .perform(ChannelEditRequest::SetGain {
            track: t1,
            gain: 0.25,
        })
        .unwrap();
    route(&mut project, t2, t1);

    let mut connections = PortConnections::default();
    connections.add(PortConnection::new(
        PortId::plugin(plugin, PortKind::Audio, PortFlow::Output, 0),
        PortId::track(master, PortKind::Audio, PortFlow::Input, 0),
    ));
    project
        .world_mut()
        .replace_port_connections(connections.clone())
        .unwrap();
    let before = snapshot(&project);

    project
        .perform(TracklistEditRequest::Delete { track: t1 })
        .unwrap();

    assert_eq!(vec![master, t2], order(&project));
    let after = snapshot(&project);
    assert_eq!(Some(master), after.track(t2).unwrap().track.output);
    assert!(after.connections.is_empty());
    assert_eq!(
        Some("Delete Track Track 1".to_owned()),
        project.undo_manager().undo_description()
    );

    project.undo().unwrap();
    assert_eq!(before, snapshot(&project));
    assert_eq!(Some(&connections), project.world().port_connections());
    assert_eq!(Some(plugin), plugin_at(&project, t1, SlotKind::Insert, 0));

    project.redo().unwrap();
    assert_eq!(after, snapshot(&project));
}

#[test]
fn master_track_cant_be_deleted() {
    let Setup { mut project, .. } = setup();
    let master = project.master().unwrap();

    assert_eq!(
        EditError::Validation(ValidationError::MasterTrackLocked),
        project
            .perform(TracklistEditRequest::Delete { track: master })
            .unwrap_err()
    );
    assert_eq!(Some(master), project.master());
}

#[test]
fn deleted_track_keeps_its_clips_in_use() {
    let Setup {
        mut project, t1, ..
    } = setup();
    let clip = ClipId::new();
    project
        .add_region(t1, Region::audio("Take", 0, 960, clip, false))
        .unwrap();
    assert!(!project.clip_in_use(clip));

    project
        .perform(TracklistEditRequest::Delete { track: t1 })
        .unwrap();

    assert!(project.clip_in_use(clip));
}

#[test]
fn move_track_and_undo() {
    let Setup {
        mut project,
        t1,
        t2,
        ..
    } = setup();
    let master = project.master().unwrap();

    project
        .perform(TracklistEditRequest::Move {
            track: t2,
            position: 0,
        })
        .unwrap();
    assert_eq!(vec![t2, master, t1], order(&project));

    project.undo().unwrap();
    assert_eq!(vec![master, t1, t2], order(&project));

    assert_eq!(
        EditError::Validation(ValidationError::TrackPositionOutOfRange {
            position: 3,
            len: 3,
        }),
        project
            .perform(TracklistEditRequest::Move {
                track: t1,
                position: 3,
            })
            .unwrap_err()
    );
}

#[test]
fn tracklist_history_round_trips() {
    let Setup {
        mut project, t1, ..
    } = setup();
    let bus = project
        .create_track("Bus", TrackKind::AudioBus, None)
        .unwrap();
    project
        .perform(TracklistEditRequest::Delete { track: t1 })
        .unwrap();
    let original = project.undo_manager().clone();

    let serialized = original.to_serialized();
    itertools::assert_equal(
        serialized.undo_stack.tracklist_actions.iter().map(|s| s.stack_index),
        [0, 1],
    );
    assert!(matches!(
        serialized.undo_stack.tracklist_actions[0].action.edit(),
        TracklistEdit::Create { track, .. } if *track == bus
    ));

    let json = project.save_history().unwrap();
    project.load_history(&json).unwrap();
    assert_eq!(&original, project.undo_manager());

    assert_eq!(2, project.undo_n(2).unwrap());
    assert!(!order(&project).contains(&bus));
    assert!(order(&project).contains(&t1));
}
