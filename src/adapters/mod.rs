//! Adapter interfaces for external systems.
//!
//! Three collaborators sit outside the distribution core:
//! - `ContextProvider`: current figures (production, prices) for the prompt
//! - `ContentGenerator`: turns a content request into text (LLM-backed)
//! - `ChannelAdapter`: publishes content to one destination channel

pub mod channels;
pub mod openai;
pub mod solar;
pub mod webhook;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{ContentRequest, ContextData, GeneratedContent};
use crate::error::GenerationError;

// Re-export the concrete adapters
pub use channels::{ChannelKind, SimulatedChannel};
pub use openai::{OpenAiGenerator, PromptTemplate};
pub use solar::{SolarMarketProvider, StaticContextProvider};
pub use webhook::WebhookChannel;

/// Source of context data for generation
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Fetch the current context values
    async fn fetch_context(&self) -> Result<ContextData>;
}

/// Text generation for a content request
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Human-readable generator name
    fn name(&self) -> &str;

    /// Generate a body for the request
    async fn generate(&self, request: &ContentRequest) -> Result<String, GenerationError>;
}

/// Publishing to a single destination channel.
///
/// Implementations report failures through `Err`; the coordinator converts
/// errors, timeouts and panics into failed publish results.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Channel this adapter publishes to (must match a catalog strategy)
    fn channel_id(&self) -> &str;

    /// Publish content, returning the platform's id for the post
    async fn post(&self, content: &GeneratedContent) -> Result<String>;
}
