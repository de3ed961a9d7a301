//! Domain types for distribution runs.
//!
//! This module contains the core data structures:
//! - Strategy: per-channel tone, content categories and posting windows
//! - Content: generation requests and channel-ready content
//! - Report: publish outcomes, run reports and ledger entries

pub mod content;
pub mod report;
pub mod strategy;

// Re-export commonly used types
pub use content::{ContentRequest, ContextData, ContextSource, GeneratedContent};
pub use report::{hash_body, publish_idempotency_key, DistributionReport, LedgerEntry, PublishResult};
pub use strategy::{ChannelStrategy, ContentType, StrategyError};
