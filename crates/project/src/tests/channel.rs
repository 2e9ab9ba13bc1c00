use super::*;
use crate::{actions::ChannelEditRequest, track::ChannelButton};

fn track<'a>(snapshot: &'a ProjectSnapshot, id: TrackId) -> &'a crate::snapshot::TrackSnapshot {
    snapshot.track(id).unwrap()
}

#[test]
fn rename_track() {
    let Setup {
        mut project, t1, ..
    } = setup();

    project
        .perform(ChannelEditRequest::Rename {
            track: t1,
            name: "Drums".to_owned(),
        })
        .unwrap();
    assert_eq!("Drums", track(&snapshot(&project), t1).name);
    assert_eq!(
        Some("Rename Track to Drums".to_owned()),
        project.undo_manager().undo_description()
    );

    project.undo().unwrap();
    assert_eq!("Track 1", track(&snapshot(&project), t1).name);
}

#[test]
fn fader_and_buttons() {
    let Setup {
        mut project, t2, ..
    } = setup();
    let before = snapshot(&project);

    project
        .perform(ChannelEditRequest::SetGain {
            track: t2,
            gain: 0.5,
        })
        .unwrap();
    project
        .perform(ChannelEditRequest::SetButton {
            track: t2,
            button: ChannelButton::Mute,
            value: true,
        })
        .unwrap();
    project
        .perform(ChannelEditRequest::SetButton {
            track: t2,
            button: ChannelButton::Solo,
            value: true,
        })
        .unwrap();

    let after = snapshot(&project);
    let state = &track(&after, t2).state;
    assert_eq!(0.5, state.gain_value);
    assert!(state.muted);
    assert!(state.soloed);
    assert!(!state.armed);
    assert_eq!(
        Some("Solo Track".to_owned()),
        project.undo_manager().undo_description()
    );

    assert_eq!(3, project.undo_n(3).unwrap());
    assert_eq!(before, snapshot(&project));
}

#[test]
fn negative_gain_is_rejected() {
    let Setup {
        mut project, t1, ..
    } = setup();

    assert_eq!(
        EditError::Validation(ValidationError::InvalidGain(-0.5)),
        project
            .perform(ChannelEditRequest::SetGain {
                track: t1,
                gain: -0.5,
            })
            .unwrap_err()
    );
}

#[test]
fn unknown_track_is_rejected() {
    let Setup { mut project, .. } = setup();
    let missing = TrackId::new();

    assert_eq!(
        EditError::Validation(ValidationError::TrackNotFound(missing)),
        project
            .perform(ChannelEditRequest::Rename {
                track: missing,
                name: "Nowhere".to_owned(),
            })
            .unwrap_err()
    );
}
