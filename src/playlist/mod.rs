pub mod config;
pub mod filters;
pub mod generator;
pub mod metadata;
pub mod scoring;
pub mod segments;
pub mod sequence;
pub mod session;
pub mod transitions;
pub mod utils;

pub use config::*;
pub use generator::*;
pub use metadata::*;
pub use segments::{DerivedSegment, SegmentDuration, SegmentManager, SetSegment};
pub use sequence::PlaylistSequence;
pub use session::SetSession;
pub use transitions::{PlaylistTransitions, TransitionQuality, TransitionScore, TransitionVerdict};

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod transitions_tests;
#[cfg(test)]
mod scoring_tests;
