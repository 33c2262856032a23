use serde::Serialize;
use std::collections::HashMap;

/// Metadata about the set composition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMetadata {
    pub total_duration_secs: u64,
    pub total_tracks: usize,
    /// Averages and ranges skip tracks without a value
    pub average_bpm: Option<f32>,
    pub bpm_range: Option<(u32, u32)>,
    pub average_energy: Option<f32>,
    pub genre_distribution: HashMap<String, usize>,
    pub artist_count: usize,
    pub locked_tracks: usize,
    pub transitions: TransitionSummary,
    /// Mean transition rank, 1.0 when there is nothing to transition
    pub flow_score: f32,
    /// How closely energies follow the set's arc; `None` until an arc is known
    pub arc_fit: Option<f32>,
    pub artist_diversity: f32,
}

/// Count of transitions per verdict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransitionSummary {
    pub smooth: usize,
    pub ok: usize,
    pub jarring: usize,
}

impl TransitionSummary {
    pub fn total(&self) -> usize {
        self.smooth + self.ok + self.jarring
    }
}
