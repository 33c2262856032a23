use chrono::Local;
use rand::Rng;
use rand::seq::SliceRandom;

use super::config::EnergyArc;
use super::metadata::SetMetadata;
use super::scoring::SetScoring;
use super::transitions::PlaylistTransitions;
use crate::models::Track;

/// Helper trait for string formatting
pub trait ToTitleCase {
    fn to_title_case(&self) -> String;
}

impl ToTitleCase for str {
    fn to_title_case(&self) -> String {
        self.split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Set naming utilities
pub struct PlaylistNaming;

impl PlaylistNaming {
    /// Generate a display name for a set based on its metadata
    pub fn generate_set_name<R: Rng + ?Sized>(
        name: &str,
        metadata: &SetMetadata,
        rng: &mut R,
    ) -> String {
        let day_of_week = Local::now().format("%A").to_string();
        let base = if name.trim().is_empty() {
            "Set".to_string()
        } else {
            name.trim().to_title_case()
        };

        // Mention the dominant genre only if it covers at least 40% of the set
        if let Some((genre, &count)) = metadata.genre_distribution.iter().max_by_key(|(_, c)| *c) {
            if metadata.total_tracks > 0 && count as f32 / metadata.total_tracks as f32 >= 0.4 {
                return format!("{} {} {}", base, day_of_week, genre.to_title_case());
            }
        }

        let suffixes = ["Session", "Journey", "Mix", "Selection", "Run"];
        let suffix = suffixes.choose(rng).copied().unwrap_or("Mix");
        format!("{base} {day_of_week} {suffix}")
    }
}

/// Weights used when picking the next track of a sequence
const TRANSITION_WEIGHT: f32 = 0.6;
const ENERGY_WEIGHT: f32 = 0.4;
const ARTIST_REPEAT_PENALTY: f32 = 1.0;
const AVOID_ARTIST_REPEATS_WITHIN: usize = 3;

/// Sequence ordering utilities
pub struct PlaylistOrdering;

impl PlaylistOrdering {
    /// Greedily build a sequence of up to `slots` tracks that follows the energy
    /// arc and keeps transitions smooth, starting from `previous` and leading
    /// into `next` when they are given.
    pub fn create_arc_sequence(
        candidates: Vec<Track>,
        slots: usize,
        arc: EnergyArc,
        previous: Option<&Track>,
        next: Option<&Track>,
    ) -> Vec<Track> {
        let slots = slots.min(candidates.len());
        let mut remaining = candidates;
        let mut selected: Vec<Track> = Vec::with_capacity(slots);

        while selected.len() < slots && !remaining.is_empty() {
            let position = SetScoring::arc_position(selected.len(), slots);
            let target_energy = arc.target_energy(position);
            let before = selected.last().or(previous);
            let is_last = selected.len() + 1 == slots;

            let mut best_index = 0;
            let mut best_score = f32::NEG_INFINITY;
            for (i, candidate) in remaining.iter().enumerate() {
                let mut score =
                    Self::candidate_score(before, candidate, target_energy, &selected);
                if is_last {
                    if let Some(next) = next {
                        score += TRANSITION_WEIGHT
                            * PlaylistTransitions::rank(PlaylistTransitions::score(candidate, next).score);
                    }
                }
                if score > best_score {
                    best_score = score;
                    best_index = i;
                }
            }

            selected.push(remaining.remove(best_index));
        }

        selected
    }

    /// Score a candidate for the next slot (higher is better)
    fn candidate_score(
        before: Option<&Track>,
        candidate: &Track,
        target_energy: u8,
        selected: &[Track],
    ) -> f32 {
        let transition = before
            .map(|b| PlaylistTransitions::rank(PlaylistTransitions::score(b, candidate).score))
            .unwrap_or(0.5);

        let energy_fit = candidate
            .energy
            .map(|e| 1.0 - e.abs_diff(target_energy) as f32 / 100.0)
            .unwrap_or(0.5);

        let repeat_penalty = if PlaylistTransitions::would_violate_artist_repetition(
            AVOID_ARTIST_REPEATS_WITHIN,
            selected,
            candidate,
        ) {
            ARTIST_REPEAT_PENALTY
        } else {
            0.0
        };

        transition * TRANSITION_WEIGHT + energy_fit * ENERGY_WEIGHT - repeat_penalty
    }
}
