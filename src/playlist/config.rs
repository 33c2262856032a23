use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The generation brief for a set or a segment of it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    pub prompt: String,
    #[serde(default)]
    pub bpm_range: Option<BpmRange>,
    #[serde(default)]
    pub energy_arc: EnergyArc,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub moods: Vec<String>,
    #[serde(default)]
    pub target_duration_minutes: Option<u32>,
    #[serde(default)]
    pub track_count: Option<usize>,
}

/// Inclusive BPM window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpmRange {
    pub min_bpm: u32,
    pub max_bpm: u32,
}

impl BpmRange {
    pub fn contains(&self, bpm: u32) -> bool {
        bpm >= self.min_bpm && bpm <= self.max_bpm
    }

    /// Overlap of two windows, `None` when they are disjoint
    pub fn intersect(&self, other: &BpmRange) -> Option<BpmRange> {
        let min_bpm = self.min_bpm.max(other.min_bpm);
        let max_bpm = self.max_bpm.min(other.max_bpm);
        (min_bpm <= max_bpm).then_some(BpmRange { min_bpm, max_bpm })
    }
}

/// Energy curve template the ordering follows across a set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnergyArc {
    #[default]
    Steady,
    WarmUp,
    Peak,
    CoolDown,
    Wave,
}

impl EnergyArc {
    /// Target energy (0-100) at `position` in `[0.0, 1.0]` of the set
    pub fn target_energy(&self, position: f32) -> u8 {
        let p = position.clamp(0.0, 1.0);
        let energy = match self {
            EnergyArc::Steady => 60.0,
            EnergyArc::WarmUp => 30.0 + 60.0 * p,
            EnergyArc::Peak => {
                // climb to the peak at 60% of the set, then release
                if p <= 0.6 {
                    40.0 + 50.0 * (p / 0.6)
                } else {
                    90.0 - 30.0 * ((p - 0.6) / 0.4)
                }
            }
            EnergyArc::CoolDown => 85.0 - 55.0 * p,
            EnergyArc::Wave => 60.0 + 25.0 * (p * 4.0 * std::f32::consts::PI).sin(),
        };
        energy.round().clamp(0.0, 100.0) as u8
    }
}

impl std::str::FromStr for EnergyArc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "steady" => Ok(EnergyArc::Steady),
            "warmup" => Ok(EnergyArc::WarmUp),
            "peak" => Ok(EnergyArc::Peak),
            "cooldown" => Ok(EnergyArc::CoolDown),
            "wave" => Ok(EnergyArc::Wave),
            other => Err(Error::Config(format!("unknown energy arc '{other}'"))),
        }
    }
}

/// Segment-scoped adjustments applied on top of the global brief
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintOverride {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub bpm_range: Option<BpmRange>,
    #[serde(default)]
    pub energy_arc: Option<EnergyArc>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub moods: Vec<String>,
}

impl Constraints {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Apply a segment override. The prompt is extended, the BPM window
    /// narrowed, and arc and tags replaced when the override sets them.
    pub fn narrowed_by(&self, overrides: &ConstraintOverride) -> Constraints {
        let mut narrowed = self.clone();

        if let Some(extra) = overrides.prompt.as_deref().filter(|p| !p.trim().is_empty()) {
            narrowed.prompt = if self.prompt.trim().is_empty() {
                extra.to_string()
            } else {
                format!("{} / {}", self.prompt, extra)
            };
        }

        narrowed.bpm_range = match (self.bpm_range, overrides.bpm_range) {
            // disjoint windows fall back to the segment's own window
            (Some(global), Some(local)) => Some(global.intersect(&local).unwrap_or(local)),
            (global, local) => local.or(global),
        };

        if let Some(arc) = overrides.energy_arc {
            narrowed.energy_arc = arc;
        }
        if !overrides.genres.is_empty() {
            narrowed.genres = overrides.genres.clone();
        }
        if !overrides.moods.is_empty() {
            narrowed.moods = overrides.moods.clone();
        }

        narrowed
    }

    /// Number of tracks a full-set request should produce
    pub fn requested_track_count(&self, config: &EngineConfig) -> usize {
        let count = if let Some(count) = self.track_count {
            count
        } else if let Some(minutes) = self.target_duration_minutes {
            (minutes as f64 / config.nominal_track_minutes).ceil() as usize
        } else {
            config.default_track_count
        };
        count.clamp(1, config.max_tracks_per_request.max(1))
    }
}

/// Tunables for the engine, loadable from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_track_count: usize,
    /// Track length used to turn a minutes-based segment into track-equivalents
    pub nominal_track_minutes: f64,
    pub max_tracks_per_request: usize,
    pub segment_palette: Vec<String>,
    pub implicit_segment_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_track_count: 12,
            nominal_track_minutes: 4.0,
            max_tracks_per_request: 60,
            segment_palette: vec![
                "#8B5CF6".to_string(),
                "#EC4899".to_string(),
                "#F59E0B".to_string(),
                "#10B981".to_string(),
                "#3B82F6".to_string(),
                "#EF4444".to_string(),
            ],
            implicit_segment_name: "Full Set".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load the engine configuration from a JSON file
    pub fn load_from_file(path: &str) -> Result<EngineConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {path}: {e}")))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nominal_track_minutes.is_nan() || self.nominal_track_minutes <= 0.0 {
            return Err(Error::Config(
                "nominal_track_minutes must be positive".to_string(),
            ));
        }
        if self.segment_palette.is_empty() {
            return Err(Error::Config("segment_palette must not be empty".to_string()));
        }
        Ok(())
    }
}
