//! Channel payload shapes and the simulated publisher.
//!
//! Each channel kind needs a differently shaped post: a video platform wants a
//! title and description, a forum wants a title and target communities, and so
//! on. `SimulatedChannel` builds that payload and logs it without contacting
//! any platform. There is no authentication, rate limiting or retry here.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::ChannelAdapter;
use crate::domain::GeneratedContent;

/// Kind of destination, which decides the payload shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Short text posts with inline hashtags (Twitter/X-style)
    Microblog,

    /// LinkedIn-style professional network
    ProfessionalNetwork,

    /// Long-form video platform (YouTube-style)
    Video,

    /// Short-form video (TikTok-style)
    ShortVideo,

    /// Image platform (Instagram-style)
    Image,

    /// Discussion forum (Reddit-style)
    Forum,
}

impl ChannelKind {
    /// Default kind for the built-in channel ids
    pub fn for_channel(channel_id: &str) -> Option<Self> {
        match channel_id {
            "twitter" => Some(Self::Microblog),
            "linkedin" => Some(Self::ProfessionalNetwork),
            "youtube" => Some(Self::Video),
            "tiktok" => Some(Self::ShortVideo),
            "instagram" => Some(Self::Image),
            "reddit" => Some(Self::Forum),
            _ => None,
        }
    }

    /// Build the channel-shaped payload for a piece of content
    pub fn payload(&self, content: &GeneratedContent) -> Value {
        let timestamp = Utc::now().to_rfc3339();
        let posting_time = content.chosen_posting_time().format("%H:%M").to_string();

        match self {
            Self::Microblog => {
                let text = if content.hashtags().is_empty() {
                    content.body().to_string()
                } else {
                    format!("{}\n\n{}", content.body(), content.hashtags().join(" "))
                };
                json!({
                    "platform": content.channel_id(),
                    "content_length": text.chars().count(),
                    "text": text,
                    "posting_time": posting_time,
                    "timestamp": timestamp,
                })
            }
            Self::ProfessionalNetwork => json!({
                "platform": content.channel_id(),
                "content": content.body(),
                "hashtags": content.hashtags(),
                "audience": content.target_audience(),
                "posting_time": posting_time,
                "timestamp": timestamp,
            }),
            Self::Video => json!({
                "platform": content.channel_id(),
                "title": format!("Solar Ascension: {}", content.preview(50)),
                "description": content.body(),
                "tags": content.hashtags(),
                "duration": "5-10 minutes",
                "posting_time": posting_time,
                "timestamp": timestamp,
            }),
            Self::ShortVideo => json!({
                "platform": content.channel_id(),
                "content": content.body(),
                "hashtags": content.hashtags(),
                "duration": "15-60 seconds",
                "posting_time": posting_time,
                "timestamp": timestamp,
            }),
            Self::Image => json!({
                "platform": content.channel_id(),
                "content": content.body(),
                "hashtags": content.hashtags(),
                "media_type": "image/carousel",
                "posting_time": posting_time,
                "timestamp": timestamp,
            }),
            Self::Forum => json!({
                "platform": content.channel_id(),
                "subreddits": ["r/solar", "r/energy", "r/climateaction"],
                "title": format!("Solar Ascension Update: {}", content.preview(50)),
                "content": content.body(),
                "posting_time": posting_time,
                "timestamp": timestamp,
            }),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Microblog => "tweet",
            Self::ProfessionalNetwork => "professional post",
            Self::Video => "video",
            Self::ShortVideo => "short video",
            Self::Image => "visual post",
            Self::Forum => "community post",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Microblog => write!(f, "microblog"),
            Self::ProfessionalNetwork => write!(f, "professional_network"),
            Self::Video => write!(f, "video"),
            Self::ShortVideo => write!(f, "short_video"),
            Self::Image => write!(f, "image"),
            Self::Forum => write!(f, "forum"),
        }
    }
}

/// Publisher that logs the payload instead of calling a platform
#[derive(Debug, Clone)]
pub struct SimulatedChannel {
    channel_id: String,
    kind: ChannelKind,
}

impl SimulatedChannel {
    pub fn new(channel_id: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            channel_id: channel_id.into(),
            kind,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }
}

#[async_trait]
impl ChannelAdapter for SimulatedChannel {
    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    async fn post(&self, content: &GeneratedContent) -> Result<String> {
        let payload = self.kind.payload(content);

        info!(
            channel = %self.channel_id,
            kind = %self.kind,
            preview = %content.preview(50),
            "Simulating {}",
            self.kind.label()
        );
        info!(channel = %self.channel_id, payload = %payload, "Post payload");

        Ok(format!("{}-{}", self.channel_id, Uuid::new_v4()))
    }
}
