//! # setforge
//!
//! Builds DJ sets from a prompt and musical constraints, then regenerates
//! single nodes or whole segments of a set without touching the rest.
//!
//! - [`playlist::PlaylistSequence`]: ordered nodes with always-fresh transition verdicts
//! - [`playlist::SegmentManager`]: named segments whose ranges are derived, never stored
//! - [`playlist::SetOrchestrator`]: credit-gated front door to a [`provider::TrackProvider`]
//! - [`credits`]: the ledger contract and the gate around it
//!
//! ```no_run
//! use setforge::credits::{InMemoryLedger, Tier};
//! use setforge::playlist::{Constraints, EngineConfig, SegmentDuration, SetOrchestrator};
//! use setforge::provider::CatalogProvider;
//!
//! # fn main() -> anyhow::Result<()> {
//! let catalog = CatalogProvider::load_catalog("catalog.json")?;
//! let orchestrator = SetOrchestrator::new(
//!     CatalogProvider::new(catalog),
//!     InMemoryLedger::new(Tier::Pro),
//!     EngineConfig::default(),
//! );
//!
//! let set = orchestrator.generate("dj@example.com", Constraints::from_prompt("sunset deep house"))?;
//! let closer = orchestrator.add_segment(&set, None, Some("Closer".into()), SegmentDuration::Tracks { count: 3 })?;
//! orchestrator.regenerate_segment(&set, &closer)?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod credits;
pub mod error;
pub mod models;
pub mod playlist;
pub mod provider;

pub use error::{Error, Result};
