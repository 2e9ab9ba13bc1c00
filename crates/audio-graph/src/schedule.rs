#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledNode<K> {
    pub key: K,
    /// Positions, within the same schedule, of the steps feeding this one.
    pub inputs: Vec<usize>,
}

/// A flattened processing order. Built on the control side and handed to the
/// audio side whole; it is never modified once built.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessingSchedule<K> {
    version: u64,
    steps: Vec<ScheduledNode<K>>,
}

impl<K> ProcessingSchedule<K> {
    pub(crate) fn new(version: u64, steps: Vec<ScheduledNode<K>>) -> Self {
        Self { version, steps }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn steps(&self) -> &[ScheduledNode<K>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn position(&self, key: &K) -> Option<usize>
    where
        K: PartialEq,
    {
        self.steps.iter().position(|step| step.key == *key)
    }

    /// True when every step only reads from steps that run before it.
    pub fn is_consistent(&self) -> bool {
        self.steps
            .iter()
            .enumerate()
            .all(|(step, node)| node.inputs.iter().all(|input| *input < step))
    }
}
