//! Error taxonomy for catalog lookups, generation and distribution runs.
//!
//! Per-channel publish failures are not errors: they are recorded as
//! failed `PublishResult`s. Only infrastructural faults leave `distribute()`.

use std::time::Duration;

use thiserror::Error;

use crate::domain::StrategyError;

/// Strategy catalog errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("No strategy registered for channel '{0}'")]
    NotFound(String),

    #[error("Channel '{0}' is registered more than once")]
    Duplicate(String),

    #[error(transparent)]
    InvalidStrategy(#[from] StrategyError),
}

/// Content generation could not produce a body
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Content generation unavailable: {0}")]
    Upstream(String),

    #[error("Content generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("No generation template for content type '{0}'")]
    UnknownContentType(String),

    #[error("Generator returned an empty body")]
    EmptyBody,
}

/// Faults that abort a whole distribution run
#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("A distribution run is already in progress")]
    InProgress,

    #[error("Context data unavailable and no defaults are configured: {0}")]
    ContextUnavailable(String),

    #[error("Failed to record run in ledger: {0}")]
    Ledger(String),
}
