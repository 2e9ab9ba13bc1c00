use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use crate::schedule::{ProcessingSchedule, ScheduledNode};

/// Control-side handle. Publishes complete schedules for the audio side to
/// pick up.
pub struct AudioGraph<K> {
    shared: Arc<Mutex<Slot<K>>>,
    published_version: Option<u64>,
}

/// This is the part of the audio graph that does audio processing, so it lives
/// on the audio thread.
pub struct AudioGraphWorker<K> {
    shared: Arc<Mutex<Slot<K>>>,
    current: Option<Box<ProcessingSchedule<K>>>,
}

pub trait NodeProcessor<K> {
    fn process(&mut self, node: &ScheduledNode<K>, num_frames: usize);
}

struct Slot<K> {
    // Most recently published schedule not yet seen by the worker.
    pending: Option<Box<ProcessingSchedule<K>>>,
    // Schedule the worker swapped out; freed by the next publish.
    retired: Option<Box<ProcessingSchedule<K>>>,
}

impl<K> AudioGraph<K> {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (AudioGraph<K>, AudioGraphWorker<K>) {
        let shared = Arc::new(Mutex::new(Slot {
            pending: None,
            retired: None,
        }));

        let audio_graph = AudioGraph {
            shared: shared.clone(),
            published_version: None,
        };

        let worker = AudioGraphWorker {
            shared,
            current: None,
        };

        (audio_graph, worker)
    }

    pub fn publish(&mut self, schedule: ProcessingSchedule<K>) {
        let version = schedule.version();
        let schedule = Box::new(schedule);

        let (superseded, retired) = {
            let mut slot = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
            (slot.pending.replace(schedule), slot.retired.take())
        };

        if let Some(superseded) = &superseded {
            log::trace!(
                "schedule {} replaced before the audio side picked it up",
                superseded.version()
            );
        }

        // Both are freed here, outside the lock and off the audio thread.
        drop(superseded);
        drop(retired);

        self.published_version = Some(version);
    }

    pub fn published_version(&self) -> Option<u64> {
        self.published_version
    }
}

impl<K> AudioGraphWorker<K> {
    /// Runs one processing cycle. A newly published schedule is adopted at the
    /// start of the cycle; if the control side holds the lock right now the
    /// previous schedule is used again. Returns the version that ran.
    pub fn tick(
        &mut self,
        processor: &mut impl NodeProcessor<K>,
        num_frames: usize,
    ) -> Option<u64> {
        self.adopt_published();

        let schedule = self.current.as_deref()?;
        for node in schedule.steps() {
            processor.process(node, num_frames);
        }
        Some(schedule.version())
    }

    pub fn current_version(&self) -> Option<u64> {
        self.current.as_ref().map(|schedule| schedule.version())
    }

    fn adopt_published(&mut self) {
        let mut slot = match self.shared.try_lock() {
            Ok(slot) => slot,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };

        if let Some(next) = slot.pending.take() {
            // `retired` is always empty here: every publish clears it, and a
            // swap only happens after a publish.
            slot.retired = self.current.replace(next);
        }
    }
}

#[cfg(test)]
mod test {
    use std::{sync::mpsc, thread};

    use super::*;
    use crate::GraphDesc;

    #[derive(Default)]
    struct Recorder {
        visited: Vec<&'static str>,
    }

    impl NodeProcessor<&'static str> for Recorder {
        fn process(&mut self, node: &ScheduledNode<&'static str>, _: usize) {
            self.visited.push(node.key);
        }
    }

    fn chain(version: u64, keys: &[&'static str]) -> ProcessingSchedule<&'static str> {
        let mut desc = GraphDesc::default();
        let ids: Vec<_> = keys.iter().map(|key| desc.add_node(*key)).collect();
        for pair in ids.windows(2) {
            desc.connect(pair[1], pair[0]).unwrap();
        }
        desc.build_schedule(version).unwrap()
    }

    #[test]
    fn worker_is_silent_until_something_is_published() {
        let (_graph, mut worker) = AudioGraph::<&'static str>::new();
        let mut recorder = Recorder::default();

        assert_eq!(None, worker.tick(&mut recorder, 64));
        assert!(recorder.visited.is_empty());
    }

    #[test]
    fn worker_adopts_latest_publish() {
        let (mut graph, mut worker) = AudioGraph::new();
        let mut recorder = Recorder::default();

        graph.publish(chain(1, &["a", "b"]));
        graph.publish(chain(2, &["c", "d"]));

        assert_eq!(Some(2), graph.published_version());
        assert_eq!(Some(2), worker.tick(&mut recorder, 64));
        assert_eq!(vec!["c", "d"], recorder.visited);
    }

    #[test]
    fn worker_keeps_previous_schedule_while_locked() {
        let (mut graph, mut worker) = AudioGraph::new();
        let mut recorder = Recorder::default();

        graph.publish(chain(1, &["a"]));
        assert_eq!(Some(1), worker.tick(&mut recorder, 64));

        graph.publish(chain(2, &["b"]));
        {
            let _held = graph.shared.lock().unwrap();
            assert_eq!(Some(1), worker.tick(&mut recorder, 64));
        }
        assert_eq!(Some(2), worker.tick(&mut recorder, 64));
        assert_eq!(vec!["a", "a", "b"], recorder.visited);
    }

    #[test]
    fn swapped_out_schedule_is_freed_by_next_publish() {
        let (mut graph, mut worker) = AudioGraph::new();
        let mut recorder = Recorder::default();

        graph.publish(chain(1, &["a"]));
        worker.tick(&mut recorder, 64);
        graph.publish(chain(2, &["b"]));
        worker.tick(&mut recorder, 64);

        assert_eq!(
            Some(1),
            graph.shared.lock().unwrap().retired.as_ref().map(|s| s.version())
        );

        graph.publish(chain(3, &["c"]));
        assert!(graph.shared.lock().unwrap().retired.is_none());
    }

    #[test]
    fn worker_on_another_thread_only_sees_whole_schedules() {
        let (mut graph, mut worker) = AudioGraph::new();
        let (done_sender, done_receiver) = mpsc::channel();

        let audio = thread::spawn(move || {
            struct Check {
                steps: usize,
            }
            impl NodeProcessor<&'static str> for Check {
                fn process(&mut self, _: &ScheduledNode<&'static str>, _: usize) {
                    self.steps += 1;
                }
            }

            let mut last_version = 0;
            loop {
                let mut check = Check { steps: 0 };
                if let Some(version) = worker.tick(&mut check, 32) {
                    assert!(version >= last_version);
                    // Every published schedule has three steps.
                    assert_eq!(3, check.steps);
                    last_version = version;
                }
                if done_receiver.try_recv().is_ok() {
                    worker.tick(&mut Check { steps: 0 }, 32);
                    return worker.current_version();
                }
            }
        });

        for version in 1..=200 {
            graph.publish(chain(version, &["in", "fx", "out"]));
        }
        done_sender.send(()).unwrap();

        assert_eq!(Some(200), audio.join().unwrap());
    }
}
