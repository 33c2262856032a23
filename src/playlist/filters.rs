use super::config::Constraints;
use crate::models::Track;
use std::collections::HashSet;
use tracing::debug;

/// Track filtering using static helper functions
pub struct TrackFilters;

impl TrackFilters {
    /// Check if a track is an actual song (not an interlude, sketch, skit...)
    pub fn is_actual_song(track: &Track) -> bool {
        let title_lower = track.title.to_lowercase();

        let non_song_patterns = [
            // interludes and transitions
            "interlude",
            "intro",
            "outro",
            "prelude",
            "segue",
            // fragments
            "sketch",
            "fragment",
            "snippet",
            "skit",
            // spoken content
            "monologue",
            "dialogue",
            "speech",
            "interview",
            // other non-musical content
            "silence",
            "intermission",
            "announcement",
            "commercial",
            "untitled",
        ];

        let contains_non_song_pattern = non_song_patterns.iter().any(|pattern| {
            title_lower == *pattern
                || title_lower
                    .split(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == ':')
                    .any(|word| word == *pattern)
        });

        // DJ sets want full tracks: very short cuts and long continuous mixes are out
        let too_short = track.duration_secs < 60;
        let too_long = track.duration_secs > 900;

        let is_track_number = title_lower.starts_with("track ")
            && title_lower
                .chars()
                .skip(6)
                .all(|c| c.is_numeric() || c.is_whitespace());

        !contains_non_song_pattern && !too_short && !too_long && !is_track_number
    }

    /// Check if a track matches the BPM window. Tracks without BPM pass.
    pub fn matches_bpm_range(track: &Track, constraints: &Constraints) -> bool {
        let Some(range) = &constraints.bpm_range else {
            return true;
        };
        let Some(bpm) = track.bpm else {
            return true;
        };
        range.contains(bpm)
    }

    /// Check if a track matches any requested genre tag
    pub fn matches_genres(track: &Track, constraints: &Constraints) -> bool {
        constraints.genres.is_empty() || track.matches_genre_patterns(&constraints.genres)
    }

    /// Apply all constraint filters to decide whether a catalog track is a candidate
    pub fn should_include_track(
        track: &Track,
        constraints: &Constraints,
        exclude_ids: &HashSet<String>,
    ) -> bool {
        !exclude_ids.contains(&track.id)
            && Self::is_actual_song(track)
            && Self::matches_bpm_range(track, constraints)
            && Self::matches_genres(track, constraints)
    }

    /// Clean provider output: drop tracks with invalid attributes, tracks
    /// the provider was told to exclude, and duplicates within the batch.
    pub fn sanitize_provider_output(tracks: Vec<Track>, exclude_ids: &HashSet<String>) -> Vec<Track> {
        let received = tracks.len();
        let mut seen = HashSet::new();
        let kept: Vec<Track> = tracks
            .into_iter()
            .filter(|track| match track.validate() {
                Ok(()) => true,
                Err(reason) => {
                    debug!(%reason, "Dropping invalid provider track");
                    false
                }
            })
            .filter(|track| !exclude_ids.contains(&track.id))
            .filter(|track| seen.insert(track.id.clone()))
            .collect();

        if kept.len() < received {
            debug!(
                received,
                kept = kept.len(),
                "Provider output violated exclusions or validation"
            );
        }
        kept
    }
}
