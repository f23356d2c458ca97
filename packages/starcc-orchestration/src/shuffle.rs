//! Shuffle key and grouping contract.
//!
//! Records are partitioned by `node` only, sorted by the full
//! `(node, neighbor)` key, and grouped by `node`. Within a group the
//! neighbor values arrive ascending, so the smallest neighbor is first.

use starcc_storage::{EdgeRecord, NodeId, NO_NEIGHBOR};

/// Intermediate key/value pair. Orders by `(node, neighbor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodesPair {
    pub node: NodeId,
    pub neighbor: NodeId,
}

impl NodesPair {
    pub fn new(node: NodeId, neighbor: NodeId) -> Self {
        Self { node, neighbor }
    }

    pub fn isolated(node: NodeId) -> Self {
        Self::new(node, NO_NEIGHBOR)
    }

    pub fn is_isolated(&self) -> bool {
        self.neighbor == NO_NEIGHBOR
    }
}

impl From<EdgeRecord> for NodesPair {
    fn from(edge: EdgeRecord) -> Self {
        Self::new(edge.node, edge.neighbor)
    }
}

impl From<NodesPair> for EdgeRecord {
    fn from(pair: NodesPair) -> Self {
        EdgeRecord::new(pair.node, pair.neighbor)
    }
}

/// Reduce partition of `node`. Uses the first component only.
pub fn partition_for(node: NodeId, partitions: usize) -> usize {
    (node & i32::MAX) as usize % partitions.max(1)
}

/// One reduce group: a node and its ascending value stream.
#[derive(Debug, Clone, Copy)]
pub struct Group<'a> {
    node: NodeId,
    values: &'a [NodeId],
}

impl<'a> Group<'a> {
    pub fn new(node: NodeId, values: &'a [NodeId]) -> Self {
        Self { node, values }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Every value, markers included.
    pub fn values(&self) -> &'a [NodeId] {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when every value is `NO_NEIGHBOR`.
    pub fn is_isolated(&self) -> bool {
        self.values.last().map_or(true, |v| *v == NO_NEIGHBOR)
    }

    /// Real neighbors, ascending, duplicates kept. Markers sort first and
    /// are skipped.
    pub fn neighbors(&self) -> &'a [NodeId] {
        let start = self.values.partition_point(|v| *v == NO_NEIGHBOR);
        &self.values[start..]
    }

    pub fn first_neighbor(&self) -> Option<NodeId> {
        self.neighbors().first().copied()
    }

    /// Real neighbors with consecutive duplicates skipped.
    pub fn distinct_neighbors(&self) -> impl Iterator<Item = NodeId> + 'a {
        let neighbors = self.neighbors();
        neighbors
            .iter()
            .enumerate()
            .filter(move |(i, v)| *i == 0 || neighbors[*i - 1] != **v)
            .map(|(_, v)| *v)
    }
}

/// A reduce partition after the secondary sort.
#[derive(Debug, Default)]
pub struct SortedPartition {
    keys: Vec<NodesPair>,
    values: Vec<NodeId>,
}

impl SortedPartition {
    pub fn new(mut pairs: Vec<NodesPair>) -> Self {
        pairs.sort_unstable();
        let values = pairs.iter().map(|p| p.neighbor).collect();
        Self {
            keys: pairs,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Groups in ascending node order.
    pub fn groups(&self) -> Groups<'_> {
        Groups {
            keys: &self.keys,
            values: &self.values,
            pos: 0,
        }
    }
}

pub struct Groups<'a> {
    keys: &'a [NodesPair],
    values: &'a [NodeId],
    pos: usize,
}

impl<'a> Iterator for Groups<'a> {
    type Item = Group<'a>;

    fn next(&mut self) -> Option<Group<'a>> {
        let node = self.keys.get(self.pos)?.node;
        let start = self.pos;
        let end = start + self.keys[start..].partition_point(|p| p.node == node);
        self.pos = end;
        Some(Group::new(node, &self.values[start..end]))
    }
}
