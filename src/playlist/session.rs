use parking_lot::{Mutex, MutexGuard};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use super::config::{ConstraintOverride, Constraints};
use super::metadata::SetMetadata;
use super::scoring::SetScoring;
use super::segments::{DerivedSegment, SegmentDuration, SegmentManager};
use super::sequence::PlaylistSequence;
use crate::error::{Error, Result};
use crate::models::{NodeId, NodeState, PlaylistNode, SegmentId, Track};

/// Regenerations currently waiting on the provider
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    /// Segments with a pending regeneration
    pub(crate) segments: HashSet<SegmentId>,
    /// Nodes targeted by a pending single-node regeneration
    pub(crate) nodes: HashSet<NodeId>,
    /// Nodes a pending segment regeneration intends to replace
    pub(crate) claimed: HashMap<NodeId, SegmentId>,
}

impl InFlight {
    pub(crate) fn pending(&self) -> usize {
        self.segments.len() + self.nodes.len()
    }

    pub(crate) fn is_node_targeted(&self, id: &NodeId) -> bool {
        self.nodes.contains(id) || self.claimed.contains_key(id)
    }

    /// Segment whose pending regeneration already claimed one of `ids`
    pub(crate) fn claimed_by_other(
        &self,
        ids: &[NodeId],
        segment: &SegmentId,
    ) -> Option<(NodeId, SegmentId)> {
        ids.iter().find_map(|id| {
            self.claimed
                .get(id)
                .filter(|owner| *owner != segment)
                .map(|owner| (*id, *owner))
        })
    }
}

pub(crate) struct SetState {
    pub(crate) sequence: PlaylistSequence,
    pub(crate) segments: SegmentManager,
    pub(crate) constraints: Constraints,
    pub(crate) in_flight: InFlight,
}

/// One generated set and everything that mutates it.
///
/// The state lock is only held for bookkeeping and merges, never while the
/// provider runs. The in-flight records stand in for a set-wide critical
/// section: while a node regeneration is pending nothing else may regenerate,
/// and segment regenerations may only overlap each other when their ranges
/// are disjoint. Anything that moves nodes or segment boundaries is refused
/// with `StructuralChangeBlocked` while any regeneration is pending, so a
/// derived range cannot shift under a pending call. Conflicts fail fast with
/// typed errors instead of queueing.
pub struct SetSession {
    id: Uuid,
    name: String,
    owner: String,
    state: Mutex<SetState>,
}

impl SetSession {
    pub(crate) fn new(
        owner: String,
        name: String,
        sequence: PlaylistSequence,
        segments: SegmentManager,
        constraints: Constraints,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            owner,
            state: Mutex::new(SetState {
                sequence,
                segments,
                constraints,
                in_flight: InFlight::default(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity whose credits pay for this set's regenerations
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, SetState> {
        self.state.lock()
    }

    /// Snapshot of the current sequence
    pub fn sequence(&self) -> PlaylistSequence {
        self.state.lock().sequence.clone()
    }

    pub fn node(&self, id: &NodeId) -> Option<PlaylistNode> {
        self.state.lock().sequence.get(id).cloned()
    }

    /// Explicit segments with their current ranges; empty for an unsegmented set
    pub fn segments(&self) -> Vec<DerivedSegment> {
        let state = self.state.lock();
        state.segments.derive_ranges(state.sequence.len())
    }

    pub fn active_segment(&self) -> Option<SegmentId> {
        self.state.lock().segments.active_segment().copied()
    }

    pub fn constraints(&self) -> Constraints {
        self.state.lock().constraints.clone()
    }

    pub fn metadata(&self) -> SetMetadata {
        let state = self.state.lock();
        SetScoring::calculate_metadata_for_arc(&state.sequence, state.constraints.energy_arc)
    }

    /// Number of regenerations waiting on the provider
    pub fn pending_regenerations(&self) -> usize {
        self.state.lock().in_flight.pending()
    }

    pub fn lock(&self, id: &NodeId) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_not_busy(&state, id)?;
        state.sequence.lock(id)
    }

    pub fn unlock(&self, id: &NodeId) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_not_busy(&state, id)?;
        state.sequence.unlock(id)
    }

    pub fn set_lifecycle_state(&self, id: &NodeId, node_state: NodeState) -> Result<()> {
        self.state.lock().sequence.set_lifecycle_state(id, node_state)
    }

    /// Put a caller-chosen track into an unlocked node
    pub fn replace_track(&self, id: &NodeId, track: Track) -> Result<()> {
        let mut state = self.state.lock();
        if state.in_flight.is_node_targeted(id) {
            return Err(Error::NodeBusy(*id));
        }
        state.sequence.replace_track(id, track)
    }

    /// Insert a track as a new node. Shifts segment ranges, so it is refused
    /// while any regeneration is pending.
    ///
    /// # Panics
    /// If `at_index` is past the end of the sequence.
    pub fn insert_track(&self, track: Track, at_index: usize) -> Result<NodeId> {
        let mut state = self.state.lock();
        Self::ensure_no_pending(&state)?;
        state.sequence.insert(PlaylistNode::new(track), at_index)
    }

    pub fn remove_node(&self, id: &NodeId) -> Result<PlaylistNode> {
        let mut state = self.state.lock();
        Self::ensure_no_pending(&state)?;
        state.sequence.remove(id)
    }

    pub fn reorder(&self, new_order: &[NodeId]) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_no_pending(&state)?;
        state.sequence.reorder(new_order)
    }

    pub fn remove_segment(&self, id: &SegmentId) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_no_pending(&state)?;
        let removed = state.segments.remove_segment(id)?;
        debug!(segment = %removed.id, name = %removed.name, "Segment removed");
        Ok(())
    }

    pub fn set_active_segment(&self, id: &SegmentId) -> Result<()> {
        self.state.lock().segments.set_active_segment(id)
    }

    pub fn rename_segment(&self, id: &SegmentId, name: String) -> Result<()> {
        self.state.lock().segments.rename_segment(id, name)
    }

    /// Changing a duration moves boundaries, so it counts as a structural change
    pub fn set_segment_duration(&self, id: &SegmentId, duration: SegmentDuration) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_no_pending(&state)?;
        state.segments.set_segment_duration(id, duration)
    }

    pub fn set_segment_constraints(
        &self,
        id: &SegmentId,
        constraints: Option<ConstraintOverride>,
    ) -> Result<()> {
        self.state.lock().segments.set_segment_constraints(id, constraints)
    }

    pub(crate) fn add_segment(
        &self,
        after: Option<&SegmentId>,
        name: Option<String>,
        duration: SegmentDuration,
    ) -> Result<SegmentId> {
        let mut state = self.state.lock();
        Self::ensure_no_pending(&state)?;
        let len = state.sequence.len();
        state.segments.add_segment(after, name, duration, len)
    }

    pub(crate) fn replace_segments(
        &self,
        parts: Vec<(Option<String>, SegmentDuration)>,
    ) -> Result<Vec<SegmentId>> {
        let mut state = self.state.lock();
        Self::ensure_no_pending(&state)?;
        Ok(state.segments.replace_segments(parts))
    }

    fn ensure_not_busy(state: &SetState, id: &NodeId) -> Result<()> {
        if state.in_flight.nodes.contains(id) {
            return Err(Error::NodeBusy(*id));
        }
        Ok(())
    }

    fn ensure_no_pending(state: &SetState) -> Result<()> {
        match state.in_flight.pending() {
            0 => Ok(()),
            pending => Err(Error::StructuralChangeBlocked(pending)),
        }
    }
}

pub(crate) enum InFlightTarget {
    Node(NodeId),
    Segment(SegmentId),
}

/// Clears an in-flight record when the regeneration ends, however it ends,
/// and puts nodes still marked `Loading` back to their previous state.
pub(crate) struct InFlightGuard<'a> {
    session: &'a SetSession,
    target: InFlightTarget,
    prior_states: Vec<(NodeId, NodeState)>,
}

impl<'a> InFlightGuard<'a> {
    /// Register the target. Call with the state lock held (passed in).
    pub(crate) fn register(
        session: &'a SetSession,
        state: &mut SetState,
        target: InFlightTarget,
        nodes: &[NodeId],
    ) -> Self {
        match &target {
            InFlightTarget::Node(id) => {
                state.in_flight.nodes.insert(*id);
            }
            InFlightTarget::Segment(segment) => {
                state.in_flight.segments.insert(*segment);
                for id in nodes {
                    state.in_flight.claimed.insert(*id, *segment);
                }
            }
        }

        let mut prior_states = Vec::with_capacity(nodes.len());
        for id in nodes {
            if let Some(node) = state.sequence.get(id) {
                prior_states.push((*id, node.state));
            }
            // ids were just read from this sequence
            let _ = state.sequence.set_lifecycle_state(id, NodeState::Loading);
        }

        Self {
            session,
            target,
            prior_states,
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.session.state.lock();
        match &self.target {
            InFlightTarget::Node(id) => {
                state.in_flight.nodes.remove(id);
            }
            InFlightTarget::Segment(segment) => {
                state.in_flight.segments.remove(segment);
                state.in_flight.claimed.retain(|_, owner| owner != segment);
            }
        }

        for (id, prior) in &self.prior_states {
            let still_loading = state
                .sequence
                .get(id)
                .is_some_and(|node| node.state == NodeState::Loading);
            if still_loading {
                let _ = state.sequence.set_lifecycle_state(id, *prior);
            }
        }
    }
}
