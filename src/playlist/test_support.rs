// Shared fixtures for the playlist test modules

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};

use super::sequence::PlaylistSequence;
use super::transitions::PlaylistTransitions;
use crate::models::Track;
use crate::playlist::config::Constraints;
use crate::provider::{GenerationContext, TrackProvider};

pub(crate) fn create_test_track(id: &str, bpm: Option<u32>, energy: Option<u8>) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Song {id}"),
        artist: format!("Artist {id}"),
        duration_secs: 240,
        bpm,
        energy,
        key: Some("8A".to_string()),
        genre: Some("House".to_string()),
        thumbnail: None,
        ai_reasoning: None,
    }
}

/// `count` tracks with gently rising tempo and constant energy
pub(crate) fn numbered_tracks(prefix: &str, count: usize) -> Vec<Track> {
    (0..count)
        .map(|i| create_test_track(&format!("{prefix}{i}"), Some(120 + i as u32), Some(50)))
        .collect()
}

/// Every node's outgoing transition must equal a fresh score of its edge
pub(crate) fn assert_transitions_fresh(sequence: &PlaylistSequence) {
    let nodes = sequence.nodes();
    for (i, node) in nodes.iter().enumerate() {
        match nodes.get(i + 1) {
            Some(next) => {
                let expected = PlaylistTransitions::score_nodes(node, next);
                assert_eq!(
                    node.transition_to_next(),
                    Some(&expected),
                    "stale transition at index {i}"
                );
            }
            None => assert!(
                node.transition_to_next().is_none(),
                "last node must not have a transition"
            ),
        }
    }
}

/// Lets a test hold a provider call open until it decides to release it
pub(crate) struct CallLatch {
    entered_tx: Mutex<Sender<()>>,
    entered_rx: Mutex<Receiver<()>>,
    release_tx: Mutex<Sender<()>>,
    release_rx: Mutex<Receiver<()>>,
}

impl CallLatch {
    pub(crate) fn new() -> Self {
        let (entered_tx, entered_rx) = channel();
        let (release_tx, release_rx) = channel();
        Self {
            entered_tx: Mutex::new(entered_tx),
            entered_rx: Mutex::new(entered_rx),
            release_tx: Mutex::new(release_tx),
            release_rx: Mutex::new(release_rx),
        }
    }

    /// Block until a provider call has started
    pub(crate) fn wait_entered(&self) {
        self.entered_rx
            .lock()
            .recv()
            .expect("provider call never started");
    }

    /// Let one blocked provider call finish
    pub(crate) fn release(&self) {
        self.release_tx.lock().send(()).expect("latch closed");
    }

    fn enter_and_wait(&self) {
        self.entered_tx.lock().send(()).expect("latch closed");
        self.release_rx.lock().recv().expect("latch closed");
    }
}

/// Provider that fabricates fresh tracks. Calls numbered in
/// `blocking_calls` (0-based) wait on the latch before answering.
pub(crate) struct ScriptedProvider {
    counter: AtomicUsize,
    calls: AtomicUsize,
    latch: Option<Arc<CallLatch>>,
    blocking_calls: Vec<usize>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            latch: None,
            blocking_calls: Vec::new(),
        }
    }

    pub(crate) fn blocking_on(calls: &[usize]) -> (Self, Arc<CallLatch>) {
        let latch = Arc::new(CallLatch::new());
        let provider = Self {
            latch: Some(latch.clone()),
            blocking_calls: calls.to_vec(),
            ..Self::new()
        };
        (provider, latch)
    }
}

impl TrackProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn generate_tracks(
        &self,
        _constraints: &Constraints,
        context: &GenerationContext,
    ) -> anyhow::Result<Vec<Track>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latch) = &self.latch {
            if self.blocking_calls.contains(&call) {
                latch.enter_and_wait();
            }
        }

        let base_bpm = context
            .previous
            .as_ref()
            .and_then(|t| t.bpm)
            .unwrap_or(124);
        Ok((0..context.slots)
            .map(|i| {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                create_test_track(&format!("gen-{n}"), Some(base_bpm + i as u32), Some(60))
            })
            .collect())
    }
}
