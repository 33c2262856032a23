use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use super::transitions::{PlaylistTransitions, TransitionQuality};
use crate::error::{Error, Result};
use crate::models::{NodeId, NodeState, PlaylistNode, Track};

/// Ordered container of nodes.
///
/// Every structural change refreshes `transition_to_next` on the edges it
/// touches, so transitions are never stale once a call returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaylistSequence {
    nodes: Vec<PlaylistNode>,
}

impl PlaylistSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self::from_nodes(tracks.into_iter().map(PlaylistNode::new).collect())
    }

    pub fn from_nodes(nodes: Vec<PlaylistNode>) -> Self {
        let mut sequence = Self { nodes };
        sequence.refresh_all();
        sequence
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[PlaylistNode] {
        &self.nodes
    }

    pub fn get(&self, id: &NodeId) -> Option<&PlaylistNode> {
        self.nodes.iter().find(|node| node.id == *id)
    }

    pub fn position(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == *id)
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.nodes.iter().map(|node| node.track.clone()).collect()
    }

    pub fn track_ids(&self) -> HashSet<String> {
        self.nodes.iter().map(|node| node.track.id.clone()).collect()
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.nodes
            .iter()
            .map(|node| u64::from(node.track.duration_secs))
            .sum()
    }

    pub fn transitions(&self) -> Vec<TransitionQuality> {
        self.nodes
            .iter()
            .filter_map(|node| node.transition_to_next)
            .collect()
    }

    /// Insert a node at `at_index`, shifting later nodes right.
    /// A node whose id is already present is refused with `InvalidOrder`.
    ///
    /// # Panics
    /// If `at_index > len()`.
    pub fn insert(&mut self, node: PlaylistNode, at_index: usize) -> Result<NodeId> {
        assert!(
            at_index <= self.nodes.len(),
            "insert index {at_index} out of bounds for sequence of length {}",
            self.nodes.len()
        );
        if self.position(&node.id).is_some() {
            return Err(Error::InvalidOrder(format!("node {} is already in the set", node.id)));
        }
        let id = node.id;
        self.nodes.insert(at_index, node);
        self.refresh_edges(at_index.saturating_sub(1), at_index);
        Ok(id)
    }

    pub fn remove(&mut self, id: &NodeId) -> Result<PlaylistNode> {
        let index = self.position(id).ok_or_else(|| Error::node_not_found(id))?;
        let mut removed = self.nodes.remove(index);
        removed.transition_to_next = None;
        if index > 0 {
            self.refresh_edges(index - 1, index - 1);
        }
        Ok(removed)
    }

    /// Rearrange nodes to `new_order`, which must be a permutation of the current ids
    pub fn reorder(&mut self, new_order: &[NodeId]) -> Result<()> {
        if new_order.len() != self.nodes.len() {
            return Err(Error::InvalidOrder(format!(
                "expected {} node ids, got {}",
                self.nodes.len(),
                new_order.len()
            )));
        }
        let unique: HashSet<&NodeId> = new_order.iter().collect();
        if unique.len() != new_order.len() {
            return Err(Error::InvalidOrder("duplicate node id".to_string()));
        }

        if let Some(unknown) = new_order.iter().find(|id| self.position(id).is_none()) {
            return Err(Error::InvalidOrder(format!("unknown node id {unknown}")));
        }

        let mut remaining = std::mem::take(&mut self.nodes);
        let mut reordered = Vec::with_capacity(remaining.len());
        for id in new_order {
            if let Some(index) = remaining.iter().position(|node| node.id == *id) {
                reordered.push(remaining.swap_remove(index));
            }
        }

        self.nodes = reordered;
        self.refresh_all();
        Ok(())
    }

    /// Replace nodes `start..=end` with `new_nodes` (which may differ in length).
    ///
    /// Fails with `LockedNodeConflict` if a locked node sits inside the range;
    /// nothing is modified in that case.
    ///
    /// # Panics
    /// If `start > end` or `end >= len()`.
    pub fn replace_range(
        &mut self,
        start: usize,
        end: usize,
        new_nodes: Vec<PlaylistNode>,
    ) -> Result<Vec<PlaylistNode>> {
        assert!(start <= end, "malformed range: start {start} > end {end}");
        assert!(
            end < self.nodes.len(),
            "range end {end} out of bounds for sequence of length {}",
            self.nodes.len()
        );

        if let Some(locked) = self.nodes[start..=end].iter().find(|node| node.is_locked) {
            return Err(Error::LockedNodeConflict(locked.id));
        }

        let inserted = new_nodes.len();
        let mut removed: Vec<PlaylistNode> = self.nodes.splice(start..=end, new_nodes).collect();
        for node in &mut removed {
            node.transition_to_next = None;
        }

        debug!(start, end, inserted, "Replaced sequence range");

        let lo = start.saturating_sub(1);
        let hi = (start + inserted).saturating_sub(1).max(lo);
        self.refresh_edges(lo, hi);
        Ok(removed)
    }

    pub fn lock(&mut self, id: &NodeId) -> Result<()> {
        self.node_mut(id)?.is_locked = true;
        Ok(())
    }

    pub fn unlock(&mut self, id: &NodeId) -> Result<()> {
        self.node_mut(id)?.is_locked = false;
        Ok(())
    }

    pub fn set_lifecycle_state(&mut self, id: &NodeId, state: NodeState) -> Result<()> {
        self.node_mut(id)?.state = state;
        Ok(())
    }

    /// Swap the track of a single unlocked node in place, keeping its id
    pub fn replace_track(&mut self, id: &NodeId, track: Track) -> Result<()> {
        let index = self.position(id).ok_or_else(|| Error::node_not_found(id))?;
        let node = &mut self.nodes[index];
        if node.is_locked {
            return Err(Error::NodeLocked(node.id));
        }
        node.track = track;
        node.state = NodeState::Resolved;
        self.refresh_edges(index.saturating_sub(1), index);
        Ok(())
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut PlaylistNode> {
        self.nodes
            .iter_mut()
            .find(|node| node.id == *id)
            .ok_or_else(|| Error::node_not_found(id))
    }

    fn refresh_all(&mut self) {
        if !self.nodes.is_empty() {
            self.refresh_edges(0, self.nodes.len() - 1);
        }
    }

    /// Recompute the outgoing transition of every node in `lo..=hi`
    fn refresh_edges(&mut self, lo: usize, hi: usize) {
        let len = self.nodes.len();
        if len == 0 {
            return;
        }
        for index in lo..=hi.min(len - 1) {
            let transition = self
                .nodes
                .get(index + 1)
                .map(|next| PlaylistTransitions::score_nodes(&self.nodes[index], next));
            self.nodes[index].transition_to_next = transition;
        }
    }
}
