mod audio_graph;
mod desc;
mod schedule;

pub use audio_graph::{AudioGraph, AudioGraphWorker, NodeProcessor};
pub use desc::{AudioGraphError, GraphDesc, NodeDesc, NodeId};
pub use schedule::{ProcessingSchedule, ScheduledNode};
