//! Per-channel content strategy.
//!
//! A strategy fixes the tone, allowed content categories, hashtags and
//! posting windows for one distribution channel. Strategies are validated
//! once on construction and never mutated afterwards.

use std::collections::HashSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content category key (e.g. `professional_insight`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentType(String);

impl ContentType {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentType {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Reasons a strategy definition is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StrategyError {
    #[error("Channel id cannot be empty")]
    EmptyChannelId,

    #[error("Channel '{0}' must allow at least one content type")]
    NoContentTypes(String),

    #[error("Channel '{channel}' lists content type '{content_type}' more than once")]
    DuplicateContentType {
        channel: String,
        content_type: ContentType,
    },

    #[error("Channel '{0}' must have at least one posting window")]
    NoPostingWindows(String),

    #[error("Invalid posting time '{0}' (expected HH:MM, 24-hour)")]
    InvalidPostingTime(String),
}

/// Immutable per-channel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStrategy {
    channel_id: String,
    content_types: Vec<ContentType>,
    tone_descriptor: String,
    hashtags: Vec<String>,
    #[serde(with = "posting_times")]
    posting_windows: Vec<NaiveTime>,
    audience_descriptor: String,
}

impl ChannelStrategy {
    /// Build and validate a strategy.
    ///
    /// Posting windows are `HH:MM` strings on a 24-hour clock.
    pub fn new(
        channel_id: impl Into<String>,
        content_types: Vec<ContentType>,
        tone_descriptor: impl Into<String>,
        hashtags: Vec<String>,
        posting_windows: &[&str],
        audience_descriptor: impl Into<String>,
    ) -> Result<Self, StrategyError> {
        let windows = posting_windows
            .iter()
            .map(|w| parse_posting_time(w))
            .collect::<Result<Vec<_>, _>>()?;

        let strategy = Self {
            channel_id: channel_id.into(),
            content_types,
            tone_descriptor: tone_descriptor.into(),
            hashtags,
            posting_windows: windows,
            audience_descriptor: audience_descriptor.into(),
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Check the structural invariants (used after deserialization too)
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.channel_id.trim().is_empty() {
            return Err(StrategyError::EmptyChannelId);
        }

        if self.content_types.is_empty() {
            return Err(StrategyError::NoContentTypes(self.channel_id.clone()));
        }

        let mut seen = HashSet::new();
        for content_type in &self.content_types {
            if !seen.insert(content_type) {
                return Err(StrategyError::DuplicateContentType {
                    channel: self.channel_id.clone(),
                    content_type: content_type.clone(),
                });
            }
        }

        if self.posting_windows.is_empty() {
            return Err(StrategyError::NoPostingWindows(self.channel_id.clone()));
        }

        Ok(())
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn content_types(&self) -> &[ContentType] {
        &self.content_types
    }

    pub fn tone_descriptor(&self) -> &str {
        &self.tone_descriptor
    }

    pub fn hashtags(&self) -> &[String] {
        &self.hashtags
    }

    pub fn posting_windows(&self) -> &[NaiveTime] {
        &self.posting_windows
    }

    pub fn audience_descriptor(&self) -> &str {
        &self.audience_descriptor
    }

    pub fn allows(&self, content_type: &ContentType) -> bool {
        self.content_types.contains(content_type)
    }

    /// Pick a content type by rotating through the allowed list
    pub fn content_type_for_run(&self, run_index: u64) -> &ContentType {
        let idx = (run_index % self.content_types.len() as u64) as usize;
        &self.content_types[idx]
    }

    /// Pick a posting window by rotating through the configured times
    pub fn posting_time_for_run(&self, run_index: u64) -> NaiveTime {
        let idx = (run_index % self.posting_windows.len() as u64) as usize;
        self.posting_windows[idx]
    }
}

/// Parse a `HH:MM` posting time
pub fn parse_posting_time(value: &str) -> Result<NaiveTime, StrategyError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| StrategyError::InvalidPostingTime(value.to_string()))
}

/// Serde helpers for `HH:MM` time lists
pub(crate) mod posting_times {
    use chrono::NaiveTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(times: &[NaiveTime], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(times.iter().map(|t| t.format("%H:%M").to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<NaiveTime>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| super::parse_posting_time(s).map_err(D::Error::custom))
            .collect()
    }
}

/// Serde helper for a single `HH:MM` time
pub(crate) mod posting_time {
    use chrono::NaiveTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_posting_time(&raw).map_err(D::Error::custom)
    }
}
