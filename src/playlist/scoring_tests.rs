#[cfg(test)]
mod tests {
    use super::super::filters::TrackFilters;
    use super::super::scoring::SetScoring;
    use super::super::test_support::{create_test_track, numbered_tracks};
    use super::super::utils::{PlaylistNaming, PlaylistOrdering, ToTitleCase};
    use super::super::*;
    use crate::models::Track;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn song(title: &str, duration_secs: u32) -> Track {
        Track {
            title: title.to_string(),
            duration_secs,
            ..create_test_track("s", Some(120), Some(50))
        }
    }

    #[test]
    fn test_metadata_summarizes_sequence() {
        let mut tracks = numbered_tracks("t", 3);
        tracks[2].bpm = None;
        tracks[2].genre = Some("Techno".to_string());
        tracks[1].artist = tracks[0].artist.to_uppercase();
        let mut sequence = PlaylistSequence::from_tracks(tracks);
        let first = sequence.nodes()[0].id;
        sequence.lock(&first).unwrap();

        let metadata = SetScoring::calculate_metadata(&sequence);

        assert_eq!(metadata.total_tracks, 3);
        assert_eq!(metadata.total_duration_secs, 720);
        assert_relative_eq!(metadata.average_bpm.unwrap(), 120.5);
        assert_eq!(metadata.bpm_range, Some((120, 121)));
        assert_relative_eq!(metadata.average_energy.unwrap(), 50.0);
        assert_eq!(metadata.genre_distribution.get("house"), Some(&2));
        assert_eq!(metadata.genre_distribution.get("techno"), Some(&1));
        assert_eq!(metadata.artist_count, 2);
        assert_eq!(metadata.locked_tracks, 1);
        assert_eq!(metadata.transitions.total(), 2);
    }

    #[test]
    fn test_metadata_carries_set_scores() {
        let mut tracks = numbered_tracks("t", 3);
        tracks[2].bpm = None;
        tracks[1].artist = tracks[0].artist.clone();
        let sequence = PlaylistSequence::from_tracks(tracks);

        let metadata = SetScoring::calculate_metadata(&sequence);
        // one smooth, one ok
        assert_relative_eq!(metadata.flow_score, 0.75);
        assert_relative_eq!(metadata.artist_diversity, 2.0 / 3.0, epsilon = 1e-5);
        assert_eq!(metadata.arc_fit, None);

        // every energy sits 10 below the steady target
        let steady = SetScoring::calculate_metadata_for_arc(&sequence, EnergyArc::Steady);
        assert_relative_eq!(steady.arc_fit.unwrap(), 0.9, epsilon = 1e-5);
        assert_eq!(steady.transitions, metadata.transitions);
    }

    #[test]
    fn test_metadata_of_empty_sequence() {
        let metadata = SetScoring::calculate_metadata(&PlaylistSequence::new());
        assert_eq!(metadata.total_tracks, 0);
        assert_eq!(metadata.average_bpm, None);
        assert_eq!(metadata.bpm_range, None);
        assert_eq!(metadata.transitions, TransitionSummary::default());
        assert_relative_eq!(metadata.flow_score, 1.0);
    }

    #[test]
    fn test_flow_score() {
        assert_relative_eq!(SetScoring::calculate_flow_score(&[]), 1.0);

        let smooth = PlaylistSequence::from_tracks(numbered_tracks("t", 4));
        assert_relative_eq!(SetScoring::calculate_flow_score(&smooth.transitions()), 1.0);

        let mixed = PlaylistSequence::from_tracks(vec![
            create_test_track("a", Some(120), Some(50)),
            create_test_track("b", Some(122), Some(55)),
            create_test_track("c", Some(180), Some(100)),
        ]);
        // one smooth, one jarring
        assert_relative_eq!(SetScoring::calculate_flow_score(&mixed.transitions()), 0.5);
    }

    #[test]
    fn test_arc_fit() {
        let rising: Vec<Track> = [30u8, 60, 90]
            .iter()
            .enumerate()
            .map(|(i, e)| create_test_track(&i.to_string(), Some(120), Some(*e)))
            .collect();
        assert_relative_eq!(SetScoring::calculate_arc_fit(&rising, EnergyArc::WarmUp), 1.0);
        assert!(SetScoring::calculate_arc_fit(&rising, EnergyArc::CoolDown) < 0.7);

        let unknown = vec![create_test_track("x", Some(120), None)];
        assert_relative_eq!(SetScoring::calculate_arc_fit(&unknown, EnergyArc::Peak), 0.5);
    }

    #[test]
    fn test_artist_diversity() {
        let mut tracks = numbered_tracks("t", 4);
        assert_relative_eq!(SetScoring::calculate_artist_diversity_score(&tracks), 1.0);

        tracks[3].artist = tracks[0].artist.clone();
        assert_relative_eq!(SetScoring::calculate_artist_diversity_score(&tracks), 0.75);
        assert_relative_eq!(SetScoring::calculate_artist_diversity_score(&tracks[..1]), 1.0);
    }

    #[test]
    fn test_filters_non_songs() {
        assert!(!TrackFilters::is_actual_song(&song("Interlude", 120)));
        assert!(!TrackFilters::is_actual_song(&song("Outro (Extended)", 300)));
        assert!(!TrackFilters::is_actual_song(&song("Skit: The Call", 200)));
        assert!(!TrackFilters::is_actual_song(&song("Track 7", 200)));
        assert!(!TrackFilters::is_actual_song(&song("Radio Edit", 45)));
        assert!(!TrackFilters::is_actual_song(&song("Continuous Mix", 3600)));

        assert!(TrackFilters::is_actual_song(&song("Introspection", 400)));
        assert!(TrackFilters::is_actual_song(&song("Track Record", 300)));
    }

    #[test]
    fn test_constraint_filters() {
        let constraints = Constraints {
            bpm_range: Some(BpmRange {
                min_bpm: 118,
                max_bpm: 124,
            }),
            genres: vec!["house".to_string()],
            ..Constraints::from_prompt("house")
        };
        let exclude: HashSet<String> = ["taken".to_string()].into();

        let fits = create_test_track("fits", Some(122), Some(60));
        let too_fast = create_test_track("fast", Some(140), Some(60));
        let no_bpm = create_test_track("nobpm", None, Some(60));
        let taken = create_test_track("taken", Some(120), Some(60));
        let mut wrong_genre = create_test_track("dnb", Some(120), Some(60));
        wrong_genre.genre = Some("Drum & Bass".to_string());

        assert!(TrackFilters::should_include_track(&fits, &constraints, &exclude));
        assert!(TrackFilters::should_include_track(&no_bpm, &constraints, &exclude));
        assert!(!TrackFilters::should_include_track(&too_fast, &constraints, &exclude));
        assert!(!TrackFilters::should_include_track(&taken, &constraints, &exclude));
        assert!(!TrackFilters::should_include_track(&wrong_genre, &constraints, &exclude));
    }

    #[test]
    fn test_sanitize_provider_output() {
        let exclude: HashSet<String> = ["t0".to_string()].into();
        let mut bad_energy = create_test_track("loud", Some(120), Some(50));
        bad_energy.energy = Some(150);

        let kept = TrackFilters::sanitize_provider_output(
            vec![
                create_test_track("t0", Some(120), Some(50)),
                create_test_track("new", Some(121), Some(50)),
                create_test_track("new", Some(122), Some(50)),
                bad_energy,
                create_test_track("other", Some(123), Some(50)),
            ],
            &exclude,
        );

        let ids: Vec<&str> = kept.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "other"]);
        assert_eq!(kept[0].bpm, Some(121));
    }

    #[test]
    fn test_arc_sequence_follows_energy_curve() {
        let candidates: Vec<Track> = [90u8, 30, 60, 75, 45]
            .iter()
            .enumerate()
            .map(|(i, e)| create_test_track(&format!("c{i}"), Some(124), Some(*e)))
            .collect();

        let ordered = PlaylistOrdering::create_arc_sequence(candidates, 5, EnergyArc::WarmUp, None, None);

        let energies: Vec<u8> = ordered.iter().filter_map(|t| t.energy).collect();
        assert_eq!(energies, vec![30, 45, 60, 75, 90]);
    }

    #[test]
    fn test_arc_sequence_respects_slots_and_pool() {
        let candidates = numbered_tracks("c", 3);
        let ordered =
            PlaylistOrdering::create_arc_sequence(candidates.clone(), 2, EnergyArc::Steady, None, None);
        assert_eq!(ordered.len(), 2);

        let ordered = PlaylistOrdering::create_arc_sequence(candidates, 10, EnergyArc::Steady, None, None);
        assert_eq!(ordered.len(), 3);
    }

    #[test]
    fn test_arc_sequence_bridges_into_next_track() {
        let previous = create_test_track("prev", Some(120), Some(60));
        let next = create_test_track("next", Some(150), Some(100));
        let near = create_test_track("near", Some(121), Some(55));
        let bridge = create_test_track("bridge", Some(147), Some(85));

        let ordered = PlaylistOrdering::create_arc_sequence(
            vec![near, bridge],
            1,
            EnergyArc::Steady,
            Some(&previous),
            Some(&next),
        );

        // "near" follows prev best but clashes with next
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id, "bridge");
    }

    #[test]
    fn test_arc_sequence_avoids_artist_repeats() {
        let mut candidates = vec![
            create_test_track("a1", Some(124), Some(60)),
            create_test_track("a2", Some(124), Some(60)),
            create_test_track("b1", Some(124), Some(60)),
        ];
        candidates[1].artist = candidates[0].artist.clone();

        let ordered = PlaylistOrdering::create_arc_sequence(candidates, 2, EnergyArc::Steady, None, None);
        assert_ne!(ordered[0].artist, ordered[1].artist);
    }

    #[test]
    fn test_set_name_mentions_dominant_genre() {
        let sequence = PlaylistSequence::from_tracks(numbered_tracks("t", 5));
        let metadata = SetScoring::calculate_metadata(&sequence);
        let mut rng = StdRng::seed_from_u64(7);

        let name = PlaylistNaming::generate_set_name("late night", &metadata, &mut rng);

        assert!(name.starts_with("Late Night "));
        assert!(name.ends_with(" House"));
    }

    #[test]
    fn test_set_name_without_dominant_genre() {
        let mut tracks = numbered_tracks("t", 5);
        for (track, genre) in tracks.iter_mut().zip(["a", "b", "c", "d", "e"]) {
            track.genre = Some(genre.to_string());
        }
        let metadata = SetScoring::calculate_metadata(&PlaylistSequence::from_tracks(tracks));
        let mut rng = StdRng::seed_from_u64(7);

        let name = PlaylistNaming::generate_set_name("  ", &metadata, &mut rng);

        assert!(name.starts_with("Set "));
        let suffix = name.rsplit(' ').next().unwrap();
        assert!(["Session", "Journey", "Mix", "Selection", "Run"].contains(&suffix));
    }

    #[test]
    fn test_title_case() {
        assert_eq!("deep HOUSE  sunset".to_title_case(), "Deep House Sunset");
        assert_eq!("".to_title_case(), "");
    }
}
