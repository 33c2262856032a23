use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::config::{ConstraintOverride, EngineConfig};
use crate::error::{Error, Result};
use crate::models::SegmentId;

/// How much of the set a segment should cover
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SegmentDuration {
    Tracks { count: u32 },
    Duration { minutes: u32 },
}

impl SegmentDuration {
    /// Weight in track-equivalents
    pub fn weight(&self, nominal_track_minutes: f64) -> f64 {
        match *self {
            SegmentDuration::Tracks { count } => f64::from(count),
            SegmentDuration::Duration { minutes } => f64::from(minutes) / nominal_track_minutes,
        }
    }

    /// Fold `other` into this duration, keeping this duration's unit
    fn absorb(&self, other: &SegmentDuration, nominal_track_minutes: f64) -> SegmentDuration {
        let extra = other.weight(nominal_track_minutes);
        match *self {
            SegmentDuration::Tracks { count } => SegmentDuration::Tracks {
                count: count.saturating_add(extra.round() as u32),
            },
            SegmentDuration::Duration { minutes } => SegmentDuration::Duration {
                minutes: minutes.saturating_add((extra * nominal_track_minutes).round() as u32),
            },
        }
    }
}

/// A named, colored slice of the set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSegment {
    pub id: SegmentId,
    pub name: String,
    pub color: String,
    pub duration: SegmentDuration,
    #[serde(default)]
    pub constraints: Option<ConstraintOverride>,
}

/// A segment together with the slice of the sequence it currently covers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedSegment {
    pub segment: SetSegment,
    pub position: usize,
    pub range: Range<usize>,
}

impl DerivedSegment {
    /// Inclusive bounds, `None` for a segment that currently covers no track
    pub fn bounds(&self) -> Option<(usize, usize)> {
        (!self.range.is_empty()).then(|| (self.range.start, self.range.end - 1))
    }
}

/// Ordered segments of one set.
///
/// Ranges are never stored: they are derived from segment order, segment
/// durations and the current sequence length on every read.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentManager {
    segments: Vec<SetSegment>,
    active: Option<SegmentId>,
    #[serde(skip)]
    config: EngineConfig,
    #[serde(skip)]
    next_color: usize,
}

impl SegmentManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            segments: Vec::new(),
            active: None,
            config,
            next_color: 0,
        }
    }

    pub fn segments(&self) -> &[SetSegment] {
        &self.segments
    }

    /// A set with no explicit segment is one implicit segment
    pub fn is_segmented(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn segment(&self, id: &SegmentId) -> Option<&SetSegment> {
        self.segments.iter().find(|s| s.id == *id)
    }

    pub fn position(&self, id: &SegmentId) -> Option<usize> {
        self.segments.iter().position(|s| s.id == *id)
    }

    pub fn active_segment(&self) -> Option<&SegmentId> {
        self.active.as_ref()
    }

    /// Add a segment after `after` (or at the end). On an unsegmented set the
    /// implicit segment is materialized first so it keeps the existing tracks:
    /// it is weighted at `sequence_length` tracks, so the new segment only gets
    /// its proportional share. Use `replace_segments` to lay out a set from scratch.
    pub fn add_segment(
        &mut self,
        after: Option<&SegmentId>,
        name: Option<String>,
        duration: SegmentDuration,
        sequence_length: usize,
    ) -> Result<SegmentId> {
        let insert_at = match after {
            Some(id) => self.position(id).ok_or_else(|| Error::segment_not_found(id))? + 1,
            None => self.segments.len(),
        };

        let insert_at = if self.segments.is_empty() {
            let implicit = SetSegment {
                id: SegmentId::new(),
                name: self.config.implicit_segment_name.clone(),
                color: self.take_color(),
                duration: SegmentDuration::Tracks {
                    count: sequence_length.max(1) as u32,
                },
                constraints: None,
            };
            self.active = Some(implicit.id);
            self.segments.push(implicit);
            1
        } else {
            insert_at
        };

        let segment = SetSegment {
            id: SegmentId::new(),
            name: name.unwrap_or_else(|| format!("Segment {}", self.segments.len() + 1)),
            color: self.take_color(),
            duration,
            constraints: None,
        };
        let id = segment.id;
        self.segments.insert(insert_at, segment);
        Ok(id)
    }

    /// Replace every segment with `parts`, in order, and focus the first one.
    /// An empty layout turns the set back into one implicit segment.
    pub fn replace_segments(
        &mut self,
        parts: Vec<(Option<String>, SegmentDuration)>,
    ) -> Vec<SegmentId> {
        self.next_color = 0;
        self.segments = Vec::with_capacity(parts.len());
        for (name, duration) in parts {
            let name = name.unwrap_or_else(|| format!("Segment {}", self.segments.len() + 1));
            let segment = SetSegment {
                id: SegmentId::new(),
                name,
                color: self.take_color(),
                duration,
                constraints: None,
            };
            self.segments.push(segment);
        }
        self.active = self.segments.first().map(|s| s.id);
        self.segments.iter().map(|s| s.id).collect()
    }

    /// Remove a segment, folding its share into the following segment
    /// (or the preceding one when it was last).
    pub fn remove_segment(&mut self, id: &SegmentId) -> Result<SetSegment> {
        let index = self.position(id).ok_or_else(|| Error::segment_not_found(id))?;
        if self.segments.len() == 1 {
            return Err(Error::LastSegment(*id));
        }

        let removed = self.segments.remove(index);
        let absorber = if index < self.segments.len() {
            index
        } else {
            index - 1
        };
        let nominal = self.config.nominal_track_minutes;
        let target = &mut self.segments[absorber];
        target.duration = target.duration.absorb(&removed.duration, nominal);

        if self.active == Some(removed.id) {
            self.active = Some(self.segments[absorber].id);
        }
        Ok(removed)
    }

    pub fn set_active_segment(&mut self, id: &SegmentId) -> Result<()> {
        if self.position(id).is_none() {
            return Err(Error::segment_not_found(id));
        }
        self.active = Some(*id);
        Ok(())
    }

    pub fn rename_segment(&mut self, id: &SegmentId, name: String) -> Result<()> {
        self.segment_mut(id)?.name = name;
        Ok(())
    }

    pub fn set_segment_duration(&mut self, id: &SegmentId, duration: SegmentDuration) -> Result<()> {
        self.segment_mut(id)?.duration = duration;
        Ok(())
    }

    pub fn set_segment_constraints(
        &mut self,
        id: &SegmentId,
        constraints: Option<ConstraintOverride>,
    ) -> Result<()> {
        self.segment_mut(id)?.constraints = constraints;
        Ok(())
    }

    /// Split `0..sequence_length` among the segments in proportion to their
    /// weights. Each segment but the last gets its rounded share; the last
    /// takes whatever remains, so the ranges always cover the whole sequence.
    pub fn derive_ranges(&self, sequence_length: usize) -> Vec<DerivedSegment> {
        let nominal = self.config.nominal_track_minutes;
        let weights: Vec<f64> = self
            .segments
            .iter()
            .map(|s| s.duration.weight(nominal).max(0.0))
            .collect();
        let total: f64 = weights.iter().sum();
        let last = self.segments.len().saturating_sub(1);

        let mut start = 0;
        self.segments
            .iter()
            .enumerate()
            .map(|(position, segment)| {
                let end = if position == last {
                    sequence_length
                } else {
                    let share = if total > 0.0 {
                        (weights[position] / total * sequence_length as f64).round() as usize
                    } else {
                        0
                    };
                    (start + share).min(sequence_length)
                };
                let derived = DerivedSegment {
                    segment: segment.clone(),
                    position,
                    range: start..end,
                };
                start = end;
                derived
            })
            .collect()
    }

    /// Current range of one segment
    pub fn range_of(&self, id: &SegmentId, sequence_length: usize) -> Result<Range<usize>> {
        self.derive_ranges(sequence_length)
            .into_iter()
            .find(|d| d.segment.id == *id)
            .map(|d| d.range)
            .ok_or_else(|| Error::segment_not_found(id))
    }

    /// Segment covering sequence index `index`
    pub fn segment_at(&self, index: usize, sequence_length: usize) -> Option<DerivedSegment> {
        self.derive_ranges(sequence_length)
            .into_iter()
            .find(|d| d.range.contains(&index))
    }

    fn segment_mut(&mut self, id: &SegmentId) -> Result<&mut SetSegment> {
        self.segments
            .iter_mut()
            .find(|s| s.id == *id)
            .ok_or_else(|| Error::segment_not_found(id))
    }

    fn take_color(&mut self) -> String {
        let palette = &self.config.segment_palette;
        if palette.is_empty() {
            return "#888888".to_string();
        }
        let color = palette[self.next_color % palette.len()].clone();
        self.next_color += 1;
        color
    }
}
