use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    hash::Hash,
};

use fixedbitset::FixedBitSet;
use thiserror::Error;

use crate::schedule::{ProcessingSchedule, ScheduledNode};

#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioGraphError {
    #[error("node {0:?} doesn't exist")]
    InvalidNode(NodeId),
    #[error("dest_node must not equal src_node")]
    DestEqualsSrc,
    #[error("connection would create a cycle")]
    Cycle,
}

#[derive(Clone, Debug)]
pub struct NodeDesc<K> {
    pub id: NodeId,
    pub key: K,
    pub input_nodes: Vec<NodeId>,
}

impl<K> NodeDesc<K> {
    fn add_input_node(&mut self, node: &NodeId) {
        if !self.input_nodes.contains(node) {
            self.input_nodes.push(*node);
        }
    }
}

/// Describes which node feeds which. Nodes are identified by a caller-chosen
/// key; adding the same key twice yields the same node.
#[derive(Clone, Debug)]
pub struct GraphDesc<K> {
    nodes: Vec<NodeDesc<K>>,
    ids: HashMap<K, NodeId>,
}

impl<K> Default for GraphDesc<K> {
    fn default() -> Self {
        Self {
            nodes: Vec::default(),
            ids: HashMap::default(),
        }
    }
}

impl<K: Clone + Eq + Hash> GraphDesc<K> {
    pub fn add_node(&mut self, key: K) -> NodeId {
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeDesc {
            id,
            key: key.clone(),
            input_nodes: Vec::default(),
        });
        self.ids.insert(key, id);
        id
    }

    pub fn node_id(&self, key: &K) -> Option<NodeId> {
        self.ids.get(key).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeDesc<K>> {
        self.nodes.get(id.0)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Makes `src_node` an input of `dest_node`, refusing edges that would
    /// close a loop.
    pub fn connect(&mut self, dest_node: NodeId, src_node: NodeId) -> Result<(), AudioGraphError> {
        self.check_edge(dest_node, src_node)?;

        if self.would_create_cycle(dest_node, src_node) {
            return Err(AudioGraphError::Cycle);
        }

        self.nodes[dest_node.0].add_input_node(&src_node);
        Ok(())
    }

    /// Like `connect`, but leaves cycle detection to `build_schedule`. Used
    /// when replaying a complete routing table.
    pub fn connect_unchecked(
        &mut self,
        dest_node: NodeId,
        src_node: NodeId,
    ) -> Result<(), AudioGraphError> {
        self.check_edge(dest_node, src_node)?;
        self.nodes[dest_node.0].add_input_node(&src_node);
        Ok(())
    }

    fn check_edge(&self, dest_node: NodeId, src_node: NodeId) -> Result<(), AudioGraphError> {
        if dest_node == src_node {
            return Err(AudioGraphError::DestEqualsSrc);
        }
        for node in [dest_node, src_node] {
            if node.0 >= self.nodes.len() {
                return Err(AudioGraphError::InvalidNode(node));
            }
        }
        Ok(())
    }

    /// Adding `src_node` as an input of `dest_node` closes a loop exactly when
    /// `dest_node` already feeds `src_node`.
    pub fn would_create_cycle(&self, dest_node: NodeId, src_node: NodeId) -> bool {
        dest_node == src_node || self.get_reachable_nodes(src_node).contains(dest_node.0)
    }

    /// Every node whose output eventually flows into `start_node`, including
    /// `start_node` itself.
    pub fn get_reachable_nodes(&self, start_node: NodeId) -> FixedBitSet {
        let mut reachable = FixedBitSet::with_capacity(self.nodes.len());
        let mut stack = Vec::with_capacity(self.nodes.len());

        stack.push(start_node);
        while let Some(node) = stack.pop() {
            if node.0 < self.nodes.len() && !reachable.contains(node.0) {
                reachable.put(node.0);
                stack.extend_from_slice(self.nodes[node.0].input_nodes.as_slice());
            }
        }

        reachable
    }

    /// Orders every node so that each one comes after all of its inputs.
    /// Among nodes that are ready at the same time the lowest id goes first,
    /// so sources are visited before the nodes they feed.
    pub fn build_schedule(&self, version: u64) -> Result<ProcessingSchedule<K>, AudioGraphError> {
        let num_nodes = self.nodes.len();

        let mut incoming = vec![0; num_nodes];
        let mut outputs: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];
        let mut heap: BinaryHeap<Reverse<usize>> = BinaryHeap::with_capacity(num_nodes);

        for node in &self.nodes {
            for input in &node.input_nodes {
                outputs[input.0].push(node.id.0);
            }
            incoming[node.id.0] = node.input_nodes.len();
            if incoming[node.id.0] == 0 {
                heap.push(Reverse(node.id.0));
            }
        }

        let mut ordered = Vec::with_capacity(num_nodes);
        while let Some(Reverse(node_id)) = heap.pop() {
            ordered.push(node_id);

            for output in &outputs[node_id] {
                incoming[*output] -= 1;
                if incoming[*output] == 0 {
                    heap.push(Reverse(*output));
                }
            }
        }

        if ordered.len() != num_nodes {
            return Err(AudioGraphError::Cycle);
        }

        let mut position = vec![0; num_nodes];
        for (step, node_id) in ordered.iter().enumerate() {
            position[*node_id] = step;
        }

        let steps = ordered
            .into_iter()
            .map(|node_id| {
                let node = &self.nodes[node_id];
                ScheduledNode {
                    key: node.key.clone(),
                    inputs: node.input_nodes.iter().map(|id| position[id.0]).collect(),
                }
            })
            .collect();

        Ok(ProcessingSchedule::new(version, steps))
    }
}
