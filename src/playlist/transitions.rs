use serde::{Deserialize, Serialize};

use crate::models::{NodeId, PlaylistNode, Track};

/// BPM delta at or below which a transition can be smooth
pub const SMOOTH_MAX_BPM_DELTA: u32 = 5;
/// Energy delta at or below which a transition can be smooth
pub const SMOOTH_MAX_ENERGY_DELTA: u32 = 20;
/// BPM delta at or below which a transition is at least ok
pub const OK_MAX_BPM_DELTA: u32 = 15;
/// Energy delta at or below which a transition is at least ok
pub const OK_MAX_ENERGY_DELTA: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionScore {
    Smooth,
    Ok,
    Jarring,
}

/// Outcome of scoring two tracks against each other.
///
/// A delta is `None` when either track lacks the value; a missing value never
/// satisfies a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionVerdict {
    pub score: TransitionScore,
    pub bpm_delta: Option<u32>,
    pub energy_delta: Option<u32>,
}

/// Quality of the edge between two adjacent nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionQuality {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(flatten)]
    pub verdict: TransitionVerdict,
}

impl TransitionQuality {
    pub fn score(&self) -> TransitionScore {
        self.verdict.score
    }
}

/// Transition scoring between adjacent tracks
pub struct PlaylistTransitions;

impl PlaylistTransitions {
    /// Score the transition from `a` into `b`
    pub fn score(a: &Track, b: &Track) -> TransitionVerdict {
        let bpm_delta = match (a.bpm, b.bpm) {
            (Some(bpm_a), Some(bpm_b)) => Some(bpm_a.abs_diff(bpm_b)),
            _ => None,
        };
        let energy_delta = match (a.energy, b.energy) {
            (Some(energy_a), Some(energy_b)) => Some(u32::from(energy_a.abs_diff(energy_b))),
            _ => None,
        };

        let bpm_within = |limit: u32| bpm_delta.is_some_and(|d| d <= limit);
        let energy_within = |limit: u32| energy_delta.is_some_and(|d| d <= limit);

        let score = if bpm_within(SMOOTH_MAX_BPM_DELTA) && energy_within(SMOOTH_MAX_ENERGY_DELTA) {
            TransitionScore::Smooth
        } else if bpm_within(OK_MAX_BPM_DELTA) || energy_within(OK_MAX_ENERGY_DELTA) {
            // OR on purpose: a huge tempo jump at similar energy still passes
            TransitionScore::Ok
        } else {
            TransitionScore::Jarring
        };

        TransitionVerdict {
            score,
            bpm_delta,
            energy_delta,
        }
    }

    /// Score the edge between two nodes
    pub fn score_nodes(from: &PlaylistNode, to: &PlaylistNode) -> TransitionQuality {
        TransitionQuality {
            from: from.id,
            to: to.id,
            verdict: Self::score(&from.track, &to.track),
        }
    }

    /// Numeric rank used when ordering candidates (higher is better)
    pub fn rank(score: TransitionScore) -> f32 {
        match score {
            TransitionScore::Smooth => 1.0,
            TransitionScore::Ok => 0.5,
            TransitionScore::Jarring => 0.0,
        }
    }

    /// Check if a candidate would repeat an artist from the last `avoid_within` tracks
    pub fn would_violate_artist_repetition(
        avoid_within: usize,
        recent: &[Track],
        candidate: &Track,
    ) -> bool {
        let check_count = avoid_within.min(recent.len());
        let window = &recent[recent.len() - check_count..];

        window
            .iter()
            .any(|track| track.artist.eq_ignore_ascii_case(&candidate.artist))
    }
}
