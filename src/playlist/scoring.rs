use super::config::EnergyArc;
use super::metadata::{SetMetadata, TransitionSummary};
use super::sequence::PlaylistSequence;
use super::transitions::{PlaylistTransitions, TransitionQuality, TransitionScore};
use crate::models::Track;
use std::collections::{HashMap, HashSet};

/// Aggregate scoring over a whole set
pub struct SetScoring;

impl SetScoring {
    /// Calculate metadata for a sequence
    pub fn calculate_metadata(sequence: &PlaylistSequence) -> SetMetadata {
        let nodes = sequence.nodes();

        let bpms: Vec<u32> = nodes.iter().filter_map(|n| n.track.bpm).collect();
        let average_bpm =
            (!bpms.is_empty()).then(|| bpms.iter().sum::<u32>() as f32 / bpms.len() as f32);
        let bpm_range = bpms
            .iter()
            .min()
            .zip(bpms.iter().max())
            .map(|(min, max)| (*min, *max));

        let energies: Vec<u32> = nodes
            .iter()
            .filter_map(|n| n.track.energy.map(u32::from))
            .collect();
        let average_energy = (!energies.is_empty())
            .then(|| energies.iter().sum::<u32>() as f32 / energies.len() as f32);

        let mut genre_distribution = HashMap::new();
        for node in nodes {
            if let Some(genre) = &node.track.genre {
                *genre_distribution.entry(genre.to_lowercase()).or_insert(0) += 1;
            }
        }

        let artist_count = nodes
            .iter()
            .map(|n| n.track.artist.to_lowercase())
            .collect::<HashSet<_>>()
            .len();

        let transitions = sequence.transitions();
        SetMetadata {
            total_duration_secs: sequence.total_duration_secs(),
            total_tracks: nodes.len(),
            average_bpm,
            bpm_range,
            average_energy,
            genre_distribution,
            artist_count,
            locked_tracks: nodes.iter().filter(|n| n.is_locked).count(),
            transitions: Self::summarize_transitions(&transitions),
            flow_score: Self::calculate_flow_score(&transitions),
            arc_fit: None,
            artist_diversity: Self::calculate_artist_diversity_score(&sequence.tracks()),
        }
    }

    /// Metadata plus how well the set follows `arc`
    pub fn calculate_metadata_for_arc(sequence: &PlaylistSequence, arc: EnergyArc) -> SetMetadata {
        SetMetadata {
            arc_fit: Some(Self::calculate_arc_fit(&sequence.tracks(), arc)),
            ..Self::calculate_metadata(sequence)
        }
    }

    pub fn summarize_transitions(transitions: &[TransitionQuality]) -> TransitionSummary {
        let mut summary = TransitionSummary::default();
        for transition in transitions {
            match transition.score() {
                TransitionScore::Smooth => summary.smooth += 1,
                TransitionScore::Ok => summary.ok += 1,
                TransitionScore::Jarring => summary.jarring += 1,
            }
        }
        summary
    }

    /// Flow score (0.0 to 1.0): mean transition rank, 1.0 when there are no transitions
    pub fn calculate_flow_score(transitions: &[TransitionQuality]) -> f32 {
        if transitions.is_empty() {
            return 1.0;
        }
        transitions
            .iter()
            .map(|t| PlaylistTransitions::rank(t.score()))
            .sum::<f32>()
            / transitions.len() as f32
    }

    /// How closely track energies follow the arc (0.0 to 1.0).
    /// Tracks without energy are skipped; 0.5 when none has a value.
    pub fn calculate_arc_fit(tracks: &[Track], arc: EnergyArc) -> f32 {
        let deviations: Vec<f32> = tracks
            .iter()
            .enumerate()
            .filter_map(|(i, track)| {
                let energy = track.energy?;
                let target = arc.target_energy(Self::arc_position(i, tracks.len()));
                Some(energy.abs_diff(target) as f32 / 100.0)
            })
            .collect();

        if deviations.is_empty() {
            return 0.5;
        }
        let mean = deviations.iter().sum::<f32>() / deviations.len() as f32;
        (1.0 - mean).clamp(0.0, 1.0)
    }

    /// Artist diversity (0.0 to 1.0): unique artists over track count
    pub fn calculate_artist_diversity_score(tracks: &[Track]) -> f32 {
        if tracks.len() <= 1 {
            return 1.0;
        }
        let unique_artists = tracks
            .iter()
            .map(|t| t.artist.to_lowercase())
            .collect::<HashSet<_>>()
            .len();
        unique_artists as f32 / tracks.len() as f32
    }

    /// Relative position of slot `index` among `count` slots, in `[0.0, 1.0]`
    pub fn arc_position(index: usize, count: usize) -> f32 {
        if count <= 1 {
            0.0
        } else {
            index as f32 / (count - 1) as f32
        }
    }
}
