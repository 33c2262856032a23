#[cfg(test)]
mod tests {
    use super::super::test_support::create_test_track;
    use super::super::transitions::*;
    use crate::models::PlaylistNode;

    #[test]
    fn test_small_deltas_are_smooth() {
        let a = create_test_track("a", Some(120), Some(50));
        let b = create_test_track("b", Some(123), Some(60));

        let verdict = PlaylistTransitions::score(&a, &b);
        assert_eq!(verdict.score, TransitionScore::Smooth);
        assert_eq!(verdict.bpm_delta, Some(3));
        assert_eq!(verdict.energy_delta, Some(10));
    }

    #[test]
    fn test_large_bpm_jump_with_close_energy_is_ok() {
        let a = create_test_track("a", Some(120), Some(50));
        let c = create_test_track("c", Some(200), Some(55));

        let verdict = PlaylistTransitions::score(&a, &c);
        assert_eq!(verdict.bpm_delta, Some(80));
        assert_eq!(verdict.energy_delta, Some(5));
        assert_eq!(verdict.score, TransitionScore::Ok);
    }

    #[test]
    fn test_threshold_boundaries() {
        let base = create_test_track("base", Some(120), Some(50));
        let cases = [
            (Some(125), Some(70), TransitionScore::Smooth), // 5 / 20
            (Some(126), Some(70), TransitionScore::Ok),     // bpm just over smooth
            (Some(125), Some(71), TransitionScore::Ok),     // energy just over smooth
            (Some(135), Some(95), TransitionScore::Ok),     // 15 / 45, bpm carries it
            (Some(136), Some(90), TransitionScore::Ok),     // 16 / 40, energy carries it
            (Some(136), Some(91), TransitionScore::Jarring), // 16 / 41
        ];

        for (bpm, energy, expected) in cases {
            let other = create_test_track("other", bpm, energy);
            assert_eq!(
                PlaylistTransitions::score(&base, &other).score,
                expected,
                "bpm {bpm:?} energy {energy:?}"
            );
        }
    }

    #[test]
    fn test_scoring_is_symmetric() {
        let a = create_test_track("a", Some(128), Some(80));
        let b = create_test_track("b", Some(110), Some(30));
        assert_eq!(
            PlaylistTransitions::score(&a, &b),
            PlaylistTransitions::score(&b, &a)
        );
    }

    #[test]
    fn test_missing_bpm_never_smooth() {
        let a = create_test_track("a", None, Some(50));
        let b = create_test_track("b", Some(120), Some(50));

        let verdict = PlaylistTransitions::score(&a, &b);
        assert_eq!(verdict.bpm_delta, None);
        // energy alone still qualifies for ok
        assert_eq!(verdict.score, TransitionScore::Ok);
    }

    #[test]
    fn test_missing_energy_falls_back_to_bpm_rule() {
        let a = create_test_track("a", Some(120), None);
        let close = create_test_track("b", Some(122), Some(50));
        let far = create_test_track("c", Some(150), Some(50));

        assert_eq!(PlaylistTransitions::score(&a, &close).score, TransitionScore::Ok);
        assert_eq!(PlaylistTransitions::score(&a, &far).score, TransitionScore::Jarring);
    }

    #[test]
    fn test_missing_everything_is_jarring() {
        let a = create_test_track("a", None, None);
        let b = create_test_track("b", None, None);
        assert_eq!(PlaylistTransitions::score(&a, &b).score, TransitionScore::Jarring);
    }

    #[test]
    fn test_score_nodes_carries_node_ids() {
        let from = PlaylistNode::new(create_test_track("a", Some(120), Some(50)));
        let to = PlaylistNode::new(create_test_track("b", Some(121), Some(52)));

        let quality = PlaylistTransitions::score_nodes(&from, &to);
        assert_eq!(quality.from, from.id);
        assert_eq!(quality.to, to.id);
        assert_eq!(quality.score(), TransitionScore::Smooth);
    }

    #[test]
    fn test_artist_repetition_window() {
        let recent = vec![
            create_test_track("1", Some(120), Some(50)),
            create_test_track("2", Some(120), Some(50)),
            create_test_track("3", Some(120), Some(50)),
        ];
        let mut candidate = create_test_track("4", Some(120), Some(50));
        candidate.artist = "artist 1".to_string();

        assert!(PlaylistTransitions::would_violate_artist_repetition(3, &recent, &candidate));
        assert!(!PlaylistTransitions::would_violate_artist_repetition(2, &recent, &candidate));
        assert!(!PlaylistTransitions::would_violate_artist_repetition(3, &[], &candidate));
    }
}
