//! solar-fanout - Multi-channel content distribution for Solar Ascension
//!
//! Generates channel-tailored posts about solar energy and publishes them to
//! every configured destination in one run.
//!
//! # Architecture
//!
//! A distribution run is a fan-out:
//! - Context (production, prices, research) is collected once per run
//! - Each channel gets content shaped by its strategy
//! - Failed generation falls back to fixed content; failed publishing is
//!   recorded, never propagated
//! - Every run's aggregate report is appended to a bounded ledger
//!
//! # Modules
//!
//! - `adapters`: External collaborators (generator, context, channels)
//! - `core`: Distribution logic (Catalog, Coordinator, Ledger)
//! - `domain`: Data structures (Strategy, Content, Report)
//! - `config`: YAML config discovery and resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Publish to every configured channel
//! solar-fanout distribute
//!
//! # Show the last runs
//! solar-fanout history --limit 5
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use adapters::{ChannelAdapter, ContentGenerator, ContextProvider};
pub use core::{ContentStrategyCatalog, DistributionCoordinator, DistributionLedger, FallbackContent};
pub use domain::{
    ChannelStrategy, ContentRequest, ContentType, ContextData, DistributionReport,
    GeneratedContent, PublishResult,
};
pub use error::{CatalogError, DistributionError, GenerationError};
