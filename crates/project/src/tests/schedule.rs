use audio_graph::{NodeProcessor, ScheduledNode};

use super::*;
use crate::{
    actions::{MixerEditRequest, PortConnectionRequest},
    ports::{PortFlow, PortId, PortKind},
    selections::SlotTarget,
};

#[derive(Default)]
struct Recorder {
    visited: Vec<NodeKey>,
}

impl NodeProcessor<NodeKey> for Recorder {
    fn process(&mut self, node: &ScheduledNode<NodeKey>, _: usize) {
        self.visited.push(node.key);
    }
}

impl Recorder {
    fn position(&self, key: NodeKey) -> usize {
        self.visited.iter().position(|k| *k == key).unwrap()
    }
}

fn run(worker: &mut AudioGraphWorker<NodeKey>) -> (Option<u64>, Recorder) {
    let mut recorder = Recorder::default();
    let version = worker.tick(&mut recorder, 64);
    (version, recorder)
}

#[test]
fn edits_reach_the_audio_side() {
    let Setup {
        mut project,
        mut worker,
        t1,
        ..
    } = setup();

    let (version, _) = run(&mut worker);
    assert_eq!(Some(project.schedule_version()), version);

    project
        .perform(MixerEditRequest::Create {
            target: SlotTarget::new(t1, SlotKind::Insert, 0),
            descriptor: descriptor("Drive"),
            count: 1,
        })
        .unwrap();
    let plugin = plugin_at(&project, t1, SlotKind::Insert, 0).unwrap();

    let (version, recorder) = run(&mut worker);
    assert_eq!(Some(project.schedule_version()), version);
    let master = project.master().unwrap();
    let input = recorder.position(NodeKey::TrackInput(t1));
    let drive = recorder.position(NodeKey::Plugin(plugin));
    let output = recorder.position(NodeKey::TrackOutput(t1));
    assert!(input < drive && drive < output);
    assert!(output < recorder.position(NodeKey::TrackInput(master)));

    project.undo().unwrap();
    let (_, recorder) = run(&mut worker);
    assert!(!recorder.visited.contains(&NodeKey::Plugin(plugin)));
}

#[test]
fn rejected_edit_publishes_nothing() {
    let Setup {
        mut project,
        t1,
        ..
    } = setup();
    let version = project.schedule_version();

    project
        .perform(PortConnectionRequest::Connect {
            src: PortId::track(t1, PortKind::Audio, PortFlow::Output, 0),
            dest: PortId::track(t1, PortKind::Audio, PortFlow::Input, 0),
        })
        .unwrap_err();

    assert_eq!(version, project.schedule_version());
}

#[test]
fn every_edit_publishes_a_newer_schedule() {
    let Setup {
        mut project, t2, ..
    } = setup();
    let mut versions = vec![project.schedule_version()];

    project
        .perform(MixerEditRequest::Create {
            target: SlotTarget::new(t2, SlotKind::MidiFx, 2),
            descriptor: descriptor("Arp"),
            count: 1,
        })
        .unwrap();
    versions.push(project.schedule_version());
    project.undo().unwrap();
    versions.push(project.schedule_version());
    project.redo().unwrap();
    versions.push(project.schedule_version());

    assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
}
