//! Strategy catalog: channel id -> strategy.
//!
//! Populated once at startup and read-only afterwards, so it can be shared
//! between readers without locking.

use std::collections::HashMap;

use crate::domain::{ChannelStrategy, ContentType};
use crate::error::CatalogError;

/// Read-only registry of channel strategies, in registration order
#[derive(Debug, Clone, Default)]
pub struct ContentStrategyCatalog {
    strategies: Vec<ChannelStrategy>,
    index: HashMap<String, usize>,
}

impl ContentStrategyCatalog {
    /// Build a catalog, rejecting duplicate channel ids
    pub fn from_strategies(
        strategies: impl IntoIterator<Item = ChannelStrategy>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();

        for strategy in strategies {
            strategy.validate()?;
            let id = strategy.channel_id().to_string();
            if catalog.index.contains_key(&id) {
                return Err(CatalogError::Duplicate(id));
            }
            catalog.index.insert(id, catalog.strategies.len());
            catalog.strategies.push(strategy);
        }

        Ok(catalog)
    }

    /// The six channels the engine ships with
    pub fn builtin() -> Self {
        let strategies = builtin_strategies();
        let index = strategies
            .iter()
            .enumerate()
            .map(|(i, s)| (s.channel_id().to_string(), i))
            .collect();
        Self { strategies, index }
    }

    /// Look up the strategy for a channel
    pub fn get(&self, channel_id: &str) -> Result<&ChannelStrategy, CatalogError> {
        self.index
            .get(channel_id)
            .map(|&i| &self.strategies[i])
            .ok_or_else(|| CatalogError::NotFound(channel_id.to_string()))
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.index.contains_key(channel_id)
    }

    /// Channel ids in registration order
    pub fn channel_ids(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|s| s.channel_id())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelStrategy> {
        self.strategies.iter()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

fn strategy(
    id: &str,
    content_types: &[&str],
    tone: &str,
    hashtags: &[&str],
    windows: &[&str],
    audience: &str,
) -> ChannelStrategy {
    ChannelStrategy::new(
        id,
        content_types.iter().map(|t| ContentType::new(*t)).collect(),
        tone,
        hashtags.iter().map(|h| h.to_string()).collect(),
        windows,
        audience,
    )
    .unwrap_or_else(|e| panic!("built-in strategy '{}' is invalid: {}", id, e))
}

fn builtin_strategies() -> Vec<ChannelStrategy> {
    vec![
        strategy(
            "twitter",
            &["solar_update", "research_highlight", "policy_commentary", "vision_statement"],
            "bold, data-driven, inspiring",
            &["#SolarAscension", "#CleanEnergy", "#EnergyIndependence", "#SunKingdom"],
            &[
                "08:00", "09:00", "10:00", "11:00", "12:00", "14:00", "15:00", "16:00", "17:00",
                "18:00",
            ],
            "General public, energy advocates, policymakers",
        ),
        strategy(
            "linkedin",
            &["professional_insight", "policy_analysis", "industry_trend"],
            "professional, analytical, business-focused",
            &["#SolarEnergy", "#CleanTech", "#EnergyPolicy", "#Sustainability"],
            &["09:00", "12:00", "17:00"],
            "Professionals, policymakers, industry leaders",
        ),
        strategy(
            "youtube",
            &["educational_video", "technology_demo", "policy_explainer"],
            "educational, engaging, visual",
            &["#SolarTechnology", "#CleanEnergy", "#EnergyIndependence"],
            &["15:00", "19:00"],
            "General public, students, technology enthusiasts",
        ),
        strategy(
            "tiktok",
            &["viral_short", "quick_fact", "trending_topic"],
            "fun, fast-paced, viral-worthy",
            &["#SolarTok", "#CleanEnergy", "#ClimateAction"],
            &["12:00", "18:00", "21:00"],
            "Gen Z, Millennials, social media users",
        ),
        strategy(
            "instagram",
            &["visual_story", "infographic", "behind_scenes"],
            "visual, inspiring, lifestyle-focused",
            &["#SolarLife", "#CleanEnergy", "#SustainableLiving"],
            &["11:00", "15:00", "19:00"],
            "Visual learners, lifestyle enthusiasts, environmentalists",
        ),
        strategy(
            "reddit",
            &["community_discussion", "ama_session", "news_analysis"],
            "informative, community-focused, discussion-oriented",
            &["#SolarEnergy", "#ClimateAction", "#EnergyPolicy"],
            &["10:00", "14:00", "20:00"],
            "Reddit community, tech enthusiasts, policy wonks",
        ),
    ]
}
