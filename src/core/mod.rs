//! Core distribution logic.
//!
//! This module contains:
//! - Catalog: Per-channel content strategies
//! - Fallback: Fixed content used when generation fails
//! - Ledger: Bounded history of distribution reports
//! - Limits: Per-call timeouts
//! - Coordinator: Main fan-out engine

pub mod catalog;
pub mod coordinator;
pub mod fallback;
pub mod ledger;
pub mod limits;

// Re-export commonly used types
pub use catalog::ContentStrategyCatalog;
pub use coordinator::{CoordinatorBuilder, DistributionCoordinator, DistributionPhase};
pub use fallback::{FallbackContent, DEFAULT_FALLBACK};
pub use ledger::{DistributionLedger, DEFAULT_LEDGER_CAP};
pub use limits::{DispatchLimits, DEFAULT_CALL_TIMEOUT_SECONDS};
