//! Track provider contract and a catalog-search implementation of it.

use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::debug;

use crate::models::Track;
use crate::playlist::config::Constraints;
use crate::playlist::filters::TrackFilters;
use crate::playlist::utils::PlaylistOrdering;

/// What the provider needs to know about the spot it is filling
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationContext {
    /// Track just before the slots being filled
    pub previous: Option<Track>,
    /// Track just after the slots being filled
    pub next: Option<Track>,
    /// Track ids already present in the set; must not be suggested again
    pub exclude_ids: HashSet<String>,
    /// Number of tracks wanted
    pub slots: usize,
}

/// Source of candidate tracks.
///
/// The engine treats this as an opaque, fallible function. Implementations
/// should honor `exclude_ids`, but the engine re-checks the output anyway.
#[cfg_attr(test, mockall::automock)]
pub trait TrackProvider: Send + Sync {
    /// Provider name, checked against the caller's tier
    fn name(&self) -> &'static str;

    fn generate_tracks(
        &self,
        constraints: &Constraints,
        context: &GenerationContext,
    ) -> Result<Vec<Track>>;
}

/// Provider that searches a fixed catalog of tracks
pub struct CatalogProvider {
    catalog: Vec<Track>,
    rng: Mutex<StdRng>,
}

impl CatalogProvider {
    pub fn new(catalog: Vec<Track>) -> Self {
        Self {
            catalog,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic variant, for reproducible runs
    pub fn with_seed(catalog: Vec<Track>, seed: u64) -> Self {
        Self {
            catalog,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Load a catalog from a JSON array of tracks
    pub fn load_catalog(path: &str) -> Result<Vec<Track>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read catalog '{}': {}", path, e))?;
        let tracks: Vec<Track> = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse catalog '{}': {}", path, e))?;
        Ok(tracks)
    }

    pub fn catalog_size(&self) -> usize {
        self.catalog.len()
    }
}

impl TrackProvider for CatalogProvider {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn generate_tracks(
        &self,
        constraints: &Constraints,
        context: &GenerationContext,
    ) -> Result<Vec<Track>> {
        let mut pool: Vec<Track> = self
            .catalog
            .iter()
            .filter(|track| TrackFilters::should_include_track(track, constraints, &context.exclude_ids))
            .cloned()
            .collect();

        if pool.is_empty() {
            return Err(anyhow!(
                "No catalog tracks match '{}' ({} excluded)",
                constraints.prompt,
                context.exclude_ids.len()
            ));
        }

        // shuffle so repeated requests with the same brief can differ
        pool.shuffle(&mut *self.rng.lock());

        debug!(
            pool = pool.len(),
            slots = context.slots,
            "Ordering catalog candidates"
        );

        Ok(PlaylistOrdering::create_arc_sequence(
            pool,
            context.slots,
            constraints.energy_arc,
            context.previous.as_ref(),
            context.next.as_ref(),
        ))
    }
}
