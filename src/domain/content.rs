//! Generation inputs and outputs.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::strategy::{posting_time, ChannelStrategy, ContentType};

/// Context values handed to the generator, already formatted for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextData(BTreeMap<String, String>);

impl ContextData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default solar figures used when no live data is available
    pub fn solar_defaults() -> Self {
        Self::new()
            .with("current_production_mw", "50,000")
            .with("total_capacity_mw", "150,000")
            .with("efficiency_percent", "20.0%")
            .with("market_price", "$50.0")
            .with("carbon_saved_tons", "1,000")
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Add entries from `other` without overwriting existing keys
    pub fn merge_missing(&mut self, other: &ContextData) {
        for (key, value) in &other.0 {
            self.0.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for ContextData {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Where a run's context came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    /// Fetched from the provider
    Live,

    /// Provider failed, configured defaults were used
    Default,
}

/// Input to content generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub channel_id: String,
    pub content_type: ContentType,
    pub context: ContextData,
}

impl ContentRequest {
    /// Build a request for a channel, returning `None` if the strategy
    /// does not allow `content_type`.
    pub fn for_strategy(
        strategy: &ChannelStrategy,
        content_type: &ContentType,
        base_context: &ContextData,
    ) -> Option<Self> {
        if !strategy.allows(content_type) {
            return None;
        }

        let mut context = base_context.clone();
        context.insert("platform", strategy.channel_id());
        context.insert("tone", strategy.tone_descriptor());
        context.insert("audience", strategy.audience_descriptor());

        Some(Self {
            channel_id: strategy.channel_id().to_string(),
            content_type: content_type.clone(),
            context,
        })
    }
}

/// Channel-ready content. Immutable once composed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    channel_id: String,
    content_type: ContentType,
    body: String,
    hashtags: Vec<String>,
    target_audience: String,
    #[serde(with = "posting_time")]
    chosen_posting_time: NaiveTime,
    used_fallback: bool,
}

impl GeneratedContent {
    /// Compose content from a generated (or fallback) body and the channel strategy.
    ///
    /// Returns `None` for an empty body.
    pub fn compose(
        strategy: &ChannelStrategy,
        content_type: ContentType,
        body: String,
        chosen_posting_time: NaiveTime,
        used_fallback: bool,
    ) -> Option<Self> {
        if body.trim().is_empty() {
            return None;
        }

        Some(Self {
            channel_id: strategy.channel_id().to_string(),
            content_type,
            body,
            hashtags: strategy.hashtags().to_vec(),
            target_audience: strategy.audience_descriptor().to_string(),
            chosen_posting_time,
            used_fallback,
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn hashtags(&self) -> &[String] {
        &self.hashtags
    }

    pub fn target_audience(&self) -> &str {
        &self.target_audience
    }

    pub fn chosen_posting_time(&self) -> NaiveTime {
        self.chosen_posting_time
    }

    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    /// First `max_chars` characters of the body, with an ellipsis if cut
    pub fn preview(&self, max_chars: usize) -> String {
        if self.body.chars().count() <= max_chars {
            return self.body.clone();
        }
        let cut: String = self.body.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
