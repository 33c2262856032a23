use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::playlist::transitions::TransitionQuality;

/// A track as returned by a provider. Value object, freely cloned between nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_secs: u32,
    #[serde(default)]
    pub bpm: Option<u32>,
    /// 0-100
    #[serde(default)]
    pub energy: Option<u8>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub ai_reasoning: Option<String>,
}

impl Track {
    /// Check that the attributes are within their documented ranges
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("track id is empty".to_string());
        }
        if self.duration_secs == 0 {
            return Err(format!("track {} has zero duration", self.id));
        }
        if self.bpm == Some(0) {
            return Err(format!("track {} has zero bpm", self.id));
        }
        if let Some(energy) = self.energy {
            if energy > 100 {
                return Err(format!("track {} has energy {energy} above 100", self.id));
            }
        }
        Ok(())
    }

    /// Check if this track's genre matches any of the given patterns (case-insensitive substring)
    pub fn matches_genre_patterns(&self, patterns: &[String]) -> bool {
        let Some(genre) = &self.genre else {
            return false;
        };
        let genre = genre.to_lowercase();

        patterns
            .iter()
            .any(|pattern| genre.contains(&pattern.to_lowercase()))
    }
}

impl Default for Track {
    fn default() -> Self {
        Track {
            id: String::new(),
            title: "Unknown".to_string(),
            artist: "Unknown".to_string(),
            duration_secs: 0,
            bpm: None,
            energy: None,
            key: None,
            genre: None,
            thumbnail: None,
            ai_reasoning: None,
        }
    }
}

/// Identity of one occurrence of a track inside a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        NodeId(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolution status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    #[default]
    Resolved,
    Unresolved,
    Unavailable,
    Loading,
}

/// One position in a playlist, wrapping the track currently placed there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistNode {
    pub id: NodeId,
    pub track: Track,
    pub is_locked: bool,
    pub state: NodeState,
    /// Maintained by the owning sequence; a detached node always has `None`
    pub(crate) transition_to_next: Option<TransitionQuality>,
}

impl PlaylistNode {
    pub fn new(track: Track) -> Self {
        Self {
            id: NodeId::new(),
            track,
            is_locked: false,
            state: NodeState::Resolved,
            transition_to_next: None,
        }
    }

    pub fn transition_to_next(&self) -> Option<&TransitionQuality> {
        self.transition_to_next.as_ref()
    }
}
