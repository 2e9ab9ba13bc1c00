use super::*;
use crate::{
    actions::MixerEditRequest,
    plugin::BridgeMode,
    ports::{PortConnection, PortConnections, PortFlow, PortId, PortKind},
    selections::{MixerSelectionSnapshot, SlotSelection, SlotTarget},
};

fn audio_port(plugin: PluginId, flow: PortFlow) -> PortId {
    PortId::plugin(plugin, PortKind::Audio, flow, 0)
}

#[test]
fn create_into_empty_slot() {
    let Setup {
        mut project,
        host,
        t1,
        ..
    } = setup();
    let before = snapshot(&project);

    let handle = project
        .perform(MixerEditRequest::Create {
            target: SlotTarget::new(t1, SlotKind::Insert, 3),
            descriptor: descriptor("Reverb"),
            count: 1,
        })
        .unwrap();

    assert_eq!(ActionKind::Mixer, handle.kind);
    assert_eq!(0, handle.stack_index);
    let created = plugin_at(&project, t1, SlotKind::Insert, 3).unwrap();
    assert_eq!(1, host.instantiated());
    assert_eq!(2, project.world().automation(t1).unwrap().for_plugin(created).count());
    assert_eq!(Some("Create Reverb".to_owned()), project.undo_manager().undo_description());

    assert!(project.undo().unwrap());
    assert_eq!(before, snapshot(&project));
    assert_eq!((0, 1), project.stack_depth());

    assert!(project.redo().unwrap());
    assert_eq!(Some(created), plugin_at(&project, t1, SlotKind::Insert, 3));
    assert_eq!(1, host.instantiated());
    assert_eq!((1, 0), project.stack_depth());
}

#[test]
fn create_several_fills_consecutive_slots() {
    let Setup {
        mut project, t1, ..
    } = setup();

    project
        .perform(MixerEditRequest::Create {
            target: SlotTarget::new(t1, SlotKind::Insert, 4),
            descriptor: descriptor("Delay"),
            count: 3,
        })
        .unwrap();

    for slot in 4..7 {
        assert!(plugin_at(&project, t1, SlotKind::Insert, slot).is_some());
    }
    assert!(plugin_at(&project, t1, SlotKind::Insert, 7).is_none());
    assert_eq!(
        Some("Create 3 Delays".to_owned()),
        project.undo_manager().undo_description()
    );
}

#[test]
fn create_replaces_occupant_and_undo_brings_it_back() {
    let Setup {
        mut project, t1, ..
    } = setup();
    let old = place_plugin(&mut project, t1, SlotKind::Insert, 0, "Old");
    let before = snapshot(&project);

    project
        .perform(MixerEditRequest::Create {
            target: SlotTarget::new(t1, SlotKind::Insert, 0),
            descriptor: descriptor("New"),
            count: 1,
        })
        .unwrap();
    assert_ne!(Some(old), plugin_at(&project, t1, SlotKind::Insert, 0));

    project.undo().unwrap();
    assert_eq!(before, snapshot(&project));
}

#[test]
fn create_out_of_range_changes_nothing() {
    let Setup {
        mut project,
        host,
        t1,
        ..
    } = setup();
    let before = snapshot(&project);

    let err = project
        .perform(MixerEditRequest::Create {
            target: SlotTarget::new(t1, SlotKind::Insert, 15),
            descriptor: descriptor("Reverb"),
            count: 2,
        })
        .unwrap_err();

    assert!(matches!(
        err,
        EditError::Validation(ValidationError::SlotOutOfRange { available: 16, .. })
    ));
    assert_eq!(before, snapshot(&project));
    assert_eq!((0, 0), project.stack_depth());
    assert_eq!(0, host.instantiated());
}

#[test]
fn slot_past_usize_max_is_rejected() {
    let Setup {
        mut project,
        host,
        t1,
        t2,
        ..
    } = setup();
    place_plugin(&mut project, t1, SlotKind::Insert, 0, "A");
    place_plugin(&mut project, t1, SlotKind::Insert, 1, "B");
    let before = snapshot(&project);

    let create = project
        .perform(MixerEditRequest::Create {
            target: SlotTarget::new(t1, SlotKind::Insert, usize::MAX),
            descriptor: descriptor("Reverb"),
            count: 2,
        })
        .unwrap_err();
    assert_eq!(
        EditError::Validation(ValidationError::SlotOutOfRange {
            address: SlotAddress::new(t1, SlotKind::Insert, usize::MAX),
            available: 16,
        }),
        create
    );

    let moved = project
        .perform(MixerEditRequest::Move {
            selection: SlotSelection::new(t1, SlotKind::Insert, [0, 1]),
            target: SlotTarget::new(t2, SlotKind::Insert, usize::MAX),
        })
        .unwrap_err();
    assert!(matches!(
        moved,
        EditError::Validation(ValidationError::SlotOutOfRange { .. })
    ));

    let new_channel = project
        .perform(MixerEditRequest::Create {
            target: SlotTarget::new_channel(SlotKind::Insert, usize::MAX),
            descriptor: descriptor("Reverb"),
            count: 2,
        })
        .unwrap_err();
    assert!(matches!(
        new_channel,
        EditError::Validation(ValidationError::NewChannelSlotOutOfRange {
            kind: SlotKind::Insert,
            slot: usize::MAX,
            ..
        })
    ));

    assert_eq!(before, snapshot(&project));
    assert_eq!((0, 0), project.stack_depth());
    assert_eq!(0, host.instantiated());
}

#[test]
fn create_over_plugin_limit_is_rejected() {
    let Setup {
        mut project, t1, ..
    } = setup();

    let err = project
        .perform(MixerEditRequest::Create {
            target: SlotTarget::new(t1, SlotKind::Insert, 0),
            descriptor: descriptor("Reverb"),
            count: 17,
        })
        .unwrap_err();

    assert_eq!(
        EditError::Validation(ValidationError::PluginLimitExceeded {
            requested: 17,
            limit: 16
        }),
        err
    );
}

#[test]
fn failed_instantiation_changes_nothing() {
    let Setup {
        mut project,
        host,
        t1,
        ..
    } = setup();
    place_plugin(&mut project, t1, SlotKind::Insert, 3, "Occupant");
    let before = snapshot(&project);
    host.set_failing(true);

    let err = project
        .perform(MixerEditRequest::Create {
            target: SlotTarget::new(t1, SlotKind::Insert, 3),
            descriptor: descriptor("Reverb"),
            count: 1,
        })
        .unwrap_err();

    assert!(matches!(err, EditError::Instantiation(_)));
    assert_eq!(before, snapshot(&project));
    assert_eq!((0, 0), project.stack_depth());
}

#[test]
fn create_on_new_channel() {
    let Setup {
        mut project, ..
    } = setup();
    let before = snapshot(&project);

    project
        .perform(MixerEditRequest::Create {
            target: SlotTarget::new_channel(SlotKind::Instrument, 0),
            descriptor: descriptor("Synth"),
            count: 1,
        })
        .unwrap();

    let after = snapshot(&project);
    assert_eq!(before.tracks.len() + 1, after.tracks.len());
    let added = after.tracks.last().unwrap();
    assert_eq!("Synth", added.name);
    assert_eq!(TrackKind::Instrument, added.track.kind);
    assert_eq!(project.master(), added.track.output);

    project.undo().unwrap();
    assert_eq!(before, snapshot(&project));

    project.redo().unwrap();
    assert_eq!(after, snapshot(&project));
}

#[test]
fn move_displaces_destination_and_undo_restores_it() {
    let Setup {
        mut project,
        t1,
        t2,
        ..
    } = setup();
    let moved = place_plugin(&mut project, t1, SlotKind::Insert, 2, "Compressor");
    let displaced = place_plugin(&mut project, t2, SlotKind::Insert, 5, "Limiter");

    let mut connections = PortConnections::default();
    connections.add(PortConnection::new(
        audio_port(moved, PortFlow::Output),
        audio_port(displaced, PortFlow::Input),
    ));
    project
        .world_mut()
        .replace_port_connections(connections.clone())
        .unwrap();
    let before = snapshot(&project);

    project
        .perform(MixerEditRequest::Move {
            selection: SlotSelection::new(t1, SlotKind::Insert, [2]),
            target: SlotTarget::new(t2, SlotKind::Insert, 5),
        })
        .unwrap();

    assert_eq!(None, plugin_at(&project, t1, SlotKind::Insert, 2));
    assert_eq!(Some(moved), plugin_at(&project, t2, SlotKind::Insert, 5));
    assert!(project.world().port_connections().unwrap().is_empty());
    assert_eq!(0, project.world().automation(t1).unwrap().len());
    assert_eq!(2, project.world().automation(t2).unwrap().for_plugin(moved).count());
    assert_eq!(0, project.world().automation(t2).unwrap().for_plugin(displaced).count());
    let after = snapshot(&project);

    project.undo().unwrap();
    assert_eq!(before, snapshot(&project));
    assert_eq!(Some(&connections), project.world().port_connections());
    assert_eq!(Some(displaced), plugin_at(&project, t2, SlotKind::Insert, 5));

    project.redo().unwrap();
    assert_eq!(after, snapshot(&project));
}

#[test]
fn move_within_a_strip_handles_overlap() {
    let Setup {
        mut project, t1, ..
    } = setup();
    let a = place_plugin(&mut project, t1, SlotKind::Insert, 0, "A");
    let b = place_plugin(&mut project, t1, SlotKind::Insert, 1, "B");
    let before = snapshot(&project);

    project
        .perform(MixerEditRequest::Move {
            selection: SlotSelection::new(t1, SlotKind::Insert, [0, 1]),
            target: SlotTarget::new(t1, SlotKind::Insert, 1),
        })
        .unwrap();

    assert_eq!(None, plugin_at(&project, t1, SlotKind::Insert, 0));
    assert_eq!(Some(a), plugin_at(&project, t1, SlotKind::Insert, 1));
    assert_eq!(Some(b), plugin_at(&project, t1, SlotKind::Insert, 2));

    project.undo().unwrap();
    assert_eq!(before, snapshot(&project));
}

#[test]
fn copy_to_new_channel() {
    let Setup {
        mut project,
        host,
        t1,
        ..
    } = setup();
    let original = place_plugin(&mut project, t1, SlotKind::Insert, 2, "Chorus");
    let before = snapshot(&project);

    project
        .perform(MixerEditRequest::Copy {
            selection: SlotSelection::new(t1, SlotKind::Insert, [2]),
            target: SlotTarget::new_channel(SlotKind::Insert, 0),
        })
        .unwrap();
    assert_eq!(1, host.instantiated());

    let after = snapshot(&project);
    let added = after.tracks.last().unwrap();
    assert_eq!("Chorus (Copy)", added.name);
    assert_eq!(TrackKind::AudioBus, added.track.kind);
    let copy = added.channel.plugin(SlotKind::Insert, 0).unwrap();
    assert_ne!(original, copy.id);
    assert_eq!(2, added.automation.for_plugin(copy.id).count());
    assert_eq!(Some(original), plugin_at(&project, t1, SlotKind::Insert, 2));

    project.undo().unwrap();
    assert_eq!(before, snapshot(&project));

    project.redo().unwrap();
    assert_eq!(after, snapshot(&project));
    assert_eq!(1, host.instantiated());
}

#[test]
fn copy_displaces_destination_and_undo_restores_it() {
    let Setup {
        mut project,
        t1,
        t2,
        ..
    } = setup();
    let source = place_plugin(&mut project, t1, SlotKind::Insert, 2, "Delay");
    let occupant = place_plugin(&mut project, t2, SlotKind::Insert, 4, "Gate");

    let mut connections = PortConnections::default();
    connections.add(PortConnection::new(
        audio_port(source, PortFlow::Output),
        audio_port(occupant, PortFlow::Input),
    ));
    project
        .world_mut()
        .replace_port_connections(connections.clone())
        .unwrap();
    let before = snapshot(&project);

    project
        .perform(MixerEditRequest::Copy {
            selection: SlotSelection::new(t1, SlotKind::Insert, [2]),
            target: SlotTarget::new(t2, SlotKind::Insert, 4),
        })
        .unwrap();

    let copy = plugin_at(&project, t2, SlotKind::Insert, 4).unwrap();
    assert_ne!(occupant, copy);
    assert_ne!(source, copy);
    assert_eq!(Some(source), plugin_at(&project, t1, SlotKind::Insert, 2));
    assert!(project.world().port_connections().unwrap().is_empty());
    assert_eq!(0, project.world().automation(t2).unwrap().for_plugin(occupant).count());
    assert_eq!(2, project.world().automation(t2).unwrap().for_plugin(copy).count());
    let after = snapshot(&project);

    project.undo().unwrap();
    assert_eq!(before, snapshot(&project));
    assert_eq!(Some(occupant), plugin_at(&project, t2, SlotKind::Insert, 4));
    assert_eq!(Some(&connections), project.world().port_connections());
    assert_eq!(2, project.world().automation(t2).unwrap().for_plugin(occupant).count());

    project.redo().unwrap();
    assert_eq!(after, snapshot(&project));
}

#[test]
fn paste_clones_clipboard() {
    let Setup {
        mut project,
        t1,
        t2,
        ..
    } = setup();
    let original = place_plugin(&mut project, t1, SlotKind::Insert, 2, "EQ");
    let clipboard = MixerSelectionSnapshot::capture(
        project.world(),
        &SlotSelection::new(t1, SlotKind::Insert, [2]),
    )
    .unwrap();
    let clipboard_automation = clipboard.capture_automation(project.world());

    project
        .perform(MixerEditRequest::Paste {
            clipboard,
            clipboard_automation,
            target: SlotTarget::new(t2, SlotKind::Insert, 0),
        })
        .unwrap();

    let pasted = project
        .world()
        .plugin_at(&SlotAddress::new(t2, SlotKind::Insert, 0))
        .unwrap();
    assert_eq!("EQ", pasted.name());
    assert_ne!(original, pasted.id);
    assert_eq!(Some("Paste EQ".to_owned()), project.undo_manager().undo_description());
}

#[test]
fn delete_restores_slot_order() {
    let Setup {
        mut project, t1, ..
    } = setup();
    let low = place_plugin(&mut project, t1, SlotKind::Insert, 2, "Low");
    let high = place_plugin(&mut project, t1, SlotKind::Insert, 5, "High");
    let before = snapshot(&project);

    project
        .perform(MixerEditRequest::Delete {
            selection: SlotSelection::new(t1, SlotKind::Insert, [5, 2]),
        })
        .unwrap();
    assert_eq!(None, plugin_at(&project, t1, SlotKind::Insert, 2));
    assert_eq!(None, plugin_at(&project, t1, SlotKind::Insert, 5));
    assert_eq!(
        Some("Delete 2 Plugins".to_owned()),
        project.undo_manager().undo_description()
    );

    project.undo().unwrap();
    assert_eq!(before, snapshot(&project));
    let channel = project.world().channel(t1).unwrap();
    itertools::assert_equal(
        channel.plugins().map(|(_, slot, plugin)| (slot, plugin.id)),
        [(2, low), (5, high)],
    );
}

#[test]
fn delete_empty_slot_is_rejected() {
    let Setup {
        mut project, t1, ..
    } = setup();

    let err = project
        .perform(MixerEditRequest::Delete {
            selection: SlotSelection::new(t1, SlotKind::Insert, [4]),
        })
        .unwrap_err();

    assert!(matches!(err, EditError::Validation(ValidationError::EmptySlot(_))));
}

#[test]
fn bypass_and_load_behavior() {
    let Setup {
        mut project, t1, ..
    } = setup();
    place_plugin(&mut project, t1, SlotKind::Insert, 0, "Gate");
    let selection = SlotSelection::new(t1, SlotKind::Insert, [0]);
    let address = SlotAddress::new(t1, SlotKind::Insert, 0);

    project
        .perform(MixerEditRequest::ChangeBypassStatus {
            selection: selection.clone(),
            bypassed: true,
        })
        .unwrap();
    assert!(project.world().plugin_at(&address).unwrap().bypassed);
    assert_eq!(Some("Bypass Gate".to_owned()), project.undo_manager().undo_description());

    project
        .perform(MixerEditRequest::ChangeLoadBehavior {
            selection,
            bridge_mode: BridgeMode::Full,
        })
        .unwrap();
    assert_eq!(BridgeMode::Full, project.world().plugin_at(&address).unwrap().bridge_mode);

    assert_eq!(2, project.undo_n(2).unwrap());
    let plugin = project.world().plugin_at(&address).unwrap();
    assert!(!plugin.bypassed);
    assert_eq!(BridgeMode::None, plugin.bridge_mode);
}
