use serde::Serialize;
use std::ops::Range;
use tracing::{debug, info, warn};

use super::config::{Constraints, EngineConfig};
use super::filters::TrackFilters;
use super::scoring::SetScoring;
use super::segments::{SegmentDuration, SegmentManager};
use super::sequence::PlaylistSequence;
use super::session::{InFlightGuard, InFlightTarget, SetSession};
use super::utils::PlaylistNaming;
use crate::credits::{CreditGate, CreditLedger, Operation};
use crate::error::{Error, Result};
use crate::models::{NodeId, PlaylistNode, SegmentId, Track};
use crate::provider::{GenerationContext, TrackProvider};

/// Outcome of a segment regeneration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacedRange {
    pub segment_id: SegmentId,
    /// Segment range after the merge
    pub range: Range<usize>,
    /// Ids of the freshly inserted nodes, in sequence order
    pub replaced: Vec<NodeId>,
    /// Locked nodes inside the range that were left alone
    pub kept_locked: Vec<NodeId>,
    /// Unlocked nodes left as they were because the provider returned too few tracks
    pub unfilled: Vec<NodeId>,
}

/// Credit-gated front door for every provider call.
///
/// Nothing here retries: a failed provider call is reported as-is so that
/// every billable attempt stays explicit to the caller.
pub struct SetOrchestrator<P: TrackProvider, L: CreditLedger> {
    provider: P,
    gate: CreditGate<L>,
    config: EngineConfig,
}

impl<P: TrackProvider, L: CreditLedger> SetOrchestrator<P, L> {
    pub fn new(provider: P, ledger: L, config: EngineConfig) -> Self {
        Self {
            provider,
            gate: CreditGate::new(ledger),
            config,
        }
    }

    pub fn gate(&self) -> &CreditGate<L> {
        &self.gate
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate a whole set for `identity`. Costs one credit on success.
    pub fn generate(&self, identity: &str, constraints: Constraints) -> Result<SetSession> {
        self.gate
            .authorize(identity, Operation::Generate, self.provider.name())?;

        let slots = constraints.requested_track_count(&self.config);
        let context = GenerationContext {
            slots,
            ..Default::default()
        };

        info!(identity, slots, prompt = %constraints.prompt, "Generating set");
        let tracks = self.call_provider(&constraints, &context)?;

        if !self.gate.settle(identity) {
            return Err(Error::InsufficientCredits(
                "balance ran out before the set could be charged".to_string(),
            ));
        }

        let sequence = PlaylistSequence::from_tracks(tracks);
        let metadata = SetScoring::calculate_metadata(&sequence);
        let name =
            PlaylistNaming::generate_set_name(&constraints.prompt, &metadata, &mut rand::thread_rng());
        info!(
            identity,
            tracks = sequence.len(),
            smooth = metadata.transitions.smooth,
            jarring = metadata.transitions.jarring,
            "Set generated"
        );

        Ok(SetSession::new(
            identity.to_string(),
            name,
            sequence,
            SegmentManager::new(self.config.clone()),
            constraints,
        ))
    }

    /// Swap one node for a fresh track, using its current neighbors as context
    pub fn regenerate_node(
        &self,
        session: &SetSession,
        node_id: &NodeId,
        constraints: &Constraints,
    ) -> Result<PlaylistNode> {
        let identity = session.owner();
        self.gate
            .authorize(identity, Operation::RegenerateNode, self.provider.name())?;

        let (context, _guard) = {
            let mut state = session.state();
            let index = state
                .sequence
                .position(node_id)
                .ok_or_else(|| Error::NotFound(format!("node {node_id}")))?;
            let nodes = state.sequence.nodes();
            if nodes[index].is_locked {
                return Err(Error::NodeLocked(*node_id));
            }
            if state.in_flight.is_node_targeted(node_id) {
                return Err(Error::RegenerationInProgress(format!("node {node_id}")));
            }
            // a node regeneration holds the whole set
            let pending = state.in_flight.pending();
            if pending > 0 {
                return Err(Error::RegenerationInProgress(format!(
                    "{pending} other target(s) of set {}",
                    session.id()
                )));
            }

            let context = GenerationContext {
                previous: index.checked_sub(1).map(|i| nodes[i].track.clone()),
                next: nodes.get(index + 1).map(|n| n.track.clone()),
                exclude_ids: state.sequence.track_ids(),
                slots: 1,
            };
            let guard = InFlightGuard::register(
                session,
                &mut state,
                InFlightTarget::Node(*node_id),
                &[*node_id],
            );
            (context, guard)
        };

        debug!(node = %node_id, "Regenerating node");
        let mut tracks = self.call_provider(constraints, &context)?;
        let track = tracks.swap_remove(0);

        let mut state = session.state();
        let Some(index) = state.sequence.position(node_id) else {
            drop(state);
            return Err(self.discard_stale(identity, format!("node {node_id} was removed")));
        };

        if !self.gate.settle(identity) {
            return Err(Error::InsufficientCredits(
                "balance ran out before the node could be charged".to_string(),
            ));
        }

        let node = PlaylistNode::new(track);
        let new_id = node.id;
        state.sequence.replace_range(index, index, vec![node])?;
        let merged = state
            .sequence
            .get(&new_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("node {new_id}")))?;
        drop(state);

        info!(old = %node_id, new = %new_id, title = %merged.track.title, "Node regenerated");
        Ok(merged)
    }

    /// Regenerate the unlocked nodes of one segment
    pub fn regenerate_segment(
        &self,
        session: &SetSession,
        segment_id: &SegmentId,
    ) -> Result<ReplacedRange> {
        let identity = session.owner();
        self.gate
            .authorize(identity, Operation::RegenerateSegment, self.provider.name())?;

        let (constraints, context, slots, _guard) = {
            let mut state = session.state();
            let segment = state
                .segments
                .segment(segment_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("segment {segment_id}")))?;
            if state.in_flight.segments.contains(segment_id) {
                return Err(Error::RegenerationInProgress(format!(
                    "segment {segment_id}"
                )));
            }
            if let Some(busy) = state.in_flight.nodes.iter().next() {
                return Err(Error::RegenerationInProgress(format!("node {busy}")));
            }

            let range = state.segments.range_of(segment_id, state.sequence.len())?;
            let nodes = state.sequence.nodes();
            let slots: Vec<NodeId> = nodes[range.clone()]
                .iter()
                .filter(|n| !n.is_locked)
                .map(|n| n.id)
                .collect();
            let kept_locked: Vec<NodeId> = nodes[range.clone()]
                .iter()
                .filter(|n| n.is_locked)
                .map(|n| n.id)
                .collect();

            let range_ids: Vec<NodeId> = nodes[range.clone()].iter().map(|n| n.id).collect();
            if let Some((node, owner)) = state.in_flight.claimed_by_other(&range_ids, segment_id) {
                return Err(Error::RegenerationInProgress(format!(
                    "node {node}, claimed by segment {owner}"
                )));
            }
            if slots.is_empty() {
                debug!(segment = %segment_id, "Nothing to regenerate, segment fully locked or empty");
                return Ok(ReplacedRange {
                    segment_id: *segment_id,
                    range,
                    replaced: Vec::new(),
                    kept_locked,
                    unfilled: Vec::new(),
                });
            }

            let mut constraints = match &segment.constraints {
                Some(overrides) => state.constraints.narrowed_by(overrides),
                None => state.constraints.clone(),
            };
            constraints.track_count = Some(slots.len());

            let context = GenerationContext {
                previous: range.start.checked_sub(1).map(|i| nodes[i].track.clone()),
                next: nodes.get(range.end).map(|n| n.track.clone()),
                exclude_ids: state.sequence.track_ids(),
                slots: slots.len(),
            };
            let guard = InFlightGuard::register(
                session,
                &mut state,
                InFlightTarget::Segment(*segment_id),
                &slots,
            );
            (constraints, context, slots, guard)
        };

        debug!(segment = %segment_id, slots = slots.len(), "Regenerating segment");
        let tracks = self.call_provider(&constraints, &context)?;

        let mut state = session.state();
        if state.segments.segment(segment_id).is_none() {
            drop(state);
            return Err(self.discard_stale(identity, format!("segment {segment_id} was removed")));
        }
        if let Some(missing) = slots.iter().find(|id| state.sequence.position(id).is_none()) {
            let reason = format!("node {missing} in segment {segment_id} was removed");
            drop(state);
            return Err(self.discard_stale(identity, reason));
        }

        if !self.gate.settle(identity) {
            return Err(Error::InsufficientCredits(
                "balance ran out before the segment could be charged".to_string(),
            ));
        }

        // nodes locked while the provider ran keep their tracks
        let open_slots: Vec<NodeId> = slots
            .iter()
            .filter(|id| state.sequence.get(id).is_some_and(|n| !n.is_locked))
            .copied()
            .collect();
        let mut assignments: Vec<(usize, PlaylistNode)> = open_slots
            .iter()
            .zip(tracks)
            .filter_map(|(id, track)| {
                state
                    .sequence
                    .position(id)
                    .map(|index| (index, PlaylistNode::new(track)))
            })
            .collect();
        let unfilled: Vec<NodeId> = open_slots.iter().skip(assignments.len()).copied().collect();
        assignments.sort_by_key(|(index, _)| *index);

        let mut replaced = Vec::with_capacity(assignments.len());
        for run in Self::contiguous_runs(assignments) {
            let start = run[0].0;
            let end = run[run.len() - 1].0;
            let new_nodes: Vec<PlaylistNode> = run.into_iter().map(|(_, node)| node).collect();
            replaced.extend(new_nodes.iter().map(|n| n.id));
            state.sequence.replace_range(start, end, new_nodes)?;
        }

        let range = state.segments.range_of(segment_id, state.sequence.len())?;
        let kept_locked = state.sequence.nodes()[range.clone()]
            .iter()
            .filter(|n| n.is_locked)
            .map(|n| n.id)
            .collect();
        drop(state);

        info!(
            segment = %segment_id,
            replaced = replaced.len(),
            unfilled = unfilled.len(),
            "Segment regenerated"
        );
        Ok(ReplacedRange {
            segment_id: *segment_id,
            range,
            replaced,
            kept_locked,
            unfilled,
        })
    }

    /// Add a segment to a set. Needs a tier with segmented sets; costs nothing.
    pub fn add_segment(
        &self,
        session: &SetSession,
        after: Option<&SegmentId>,
        name: Option<String>,
        duration: SegmentDuration,
    ) -> Result<SegmentId> {
        self.gate
            .authorize(session.owner(), Operation::AddSegment, self.provider.name())?;
        let id = session.add_segment(after, name, duration)?;
        debug!(segment = %id, "Segment added");
        Ok(id)
    }

    /// Lay the set out as exactly `parts`, replacing any existing segments.
    /// Same entitlement as `add_segment`; costs nothing.
    pub fn split_into_segments(
        &self,
        session: &SetSession,
        parts: Vec<(Option<String>, SegmentDuration)>,
    ) -> Result<Vec<SegmentId>> {
        self.gate
            .authorize(session.owner(), Operation::AddSegment, self.provider.name())?;
        let ids = session.replace_segments(parts)?;
        debug!(segments = ids.len(), "Set split into segments");
        Ok(ids)
    }

    /// Call the provider and keep only usable tracks, at most `context.slots`
    fn call_provider(&self, constraints: &Constraints, context: &GenerationContext) -> Result<Vec<Track>> {
        let raw = self
            .provider
            .generate_tracks(constraints, context)
            .map_err(|e| {
                warn!(provider = self.provider.name(), error = %e, "Provider call failed");
                Error::Provider(e.to_string())
            })?;

        let mut tracks = TrackFilters::sanitize_provider_output(raw, &context.exclude_ids);
        tracks.truncate(context.slots);
        if tracks.is_empty() {
            return Err(Error::Provider(format!(
                "{} returned no usable tracks",
                self.provider.name()
            )));
        }
        Ok(tracks)
    }

    /// The provider succeeded but the target is gone: charge and drop the result.
    /// Structural edits are refused while a call is pending, so this is only
    /// a backstop for a target that vanished regardless.
    fn discard_stale(&self, identity: &str, reason: String) -> Error {
        self.gate.settle(identity);
        warn!(identity, %reason, "Discarding regeneration result for stale target");
        Error::StaleTarget(reason)
    }

    /// Group sorted `(index, node)` pairs into runs of consecutive indices
    fn contiguous_runs(assignments: Vec<(usize, PlaylistNode)>) -> Vec<Vec<(usize, PlaylistNode)>> {
        let mut runs: Vec<Vec<(usize, PlaylistNode)>> = Vec::new();
        for (index, node) in assignments {
            match runs.last_mut() {
                Some(run) if run[run.len() - 1].0 + 1 == index => run.push((index, node)),
                _ => runs.push(vec![(index, node)]),
            }
        }
        runs
    }
}
