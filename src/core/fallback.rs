//! Fixed fallback content, keyed by content type.
//!
//! Used whenever generation fails or times out so a run always has
//! something to publish.

use std::collections::HashMap;

use crate::domain::ContentType;

/// Default text for content types with no specific fallback
pub const DEFAULT_FALLBACK: &str = "☀️ Solar energy is the future! #SolarAscension";

/// Content-type -> fallback text
#[derive(Debug, Clone)]
pub struct FallbackContent {
    by_type: HashMap<ContentType, String>,
    default_text: String,
}

impl Default for FallbackContent {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FallbackContent {
    /// Empty table that only returns `default_text`.
    ///
    /// A blank default is replaced with [`DEFAULT_FALLBACK`].
    pub fn new(default_text: impl Into<String>) -> Self {
        let default_text = default_text.into();
        Self {
            by_type: HashMap::new(),
            default_text: if default_text.trim().is_empty() {
                DEFAULT_FALLBACK.to_string()
            } else {
                default_text
            },
        }
    }

    pub fn builtin() -> Self {
        let mut table = Self::new(DEFAULT_FALLBACK);
        for (content_type, text) in BUILTIN_FALLBACKS {
            table.set(ContentType::new(*content_type), *text);
        }
        table
    }

    /// Set the text for a content type. Blank text is ignored.
    pub fn set(&mut self, content_type: ContentType, text: impl Into<String>) {
        let text = text.into();
        if !text.trim().is_empty() {
            self.by_type.insert(content_type, text);
        }
    }

    /// Replace the default text. Blank text is ignored.
    pub fn set_default(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.trim().is_empty() {
            self.default_text = text;
        }
    }

    pub fn with(mut self, content_type: impl Into<ContentType>, text: impl Into<String>) -> Self {
        self.set(content_type.into(), text);
        self
    }

    /// Fallback text for a content type (never empty)
    pub fn for_type(&self, content_type: &ContentType) -> &str {
        self.by_type
            .get(content_type)
            .map(String::as_str)
            .unwrap_or(&self.default_text)
    }

    pub fn default_text(&self) -> &str {
        &self.default_text
    }
}

const BUILTIN_FALLBACKS: &[(&str, &str)] = &[
    (
        "solar_update",
        "☀️ Solar energy is powering America's future! The sun never sends us a bill. #SolarAscension #CleanEnergy",
    ),
    (
        "research_highlight",
        "🔬 New solar technology breakthroughs are accelerating our path to energy independence. The future is bright! #SolarInnovation",
    ),
    (
        "policy_commentary",
        "📜 Smart solar policies can transform America into the Sun Kingdom of Earth. The time for bold action is now! #SolarPolicy",
    ),
    (
        "vision_statement",
        "🌟 America's solar ascension is not just possible, it's inevitable. The sun is ready. Are we? #SolarAscension #SunKingdom",
    ),
    (
        "professional_insight",
        "Solar is now the cheapest new electricity in most US markets. Businesses that plan for it today lead tomorrow. #SolarEnergy",
    ),
    (
        "policy_analysis",
        "Stable, long-term solar policy unlocks private investment and local jobs. Clear rules beat short-term incentives. #EnergyPolicy",
    ),
    (
        "industry_trend",
        "Module prices keep falling while storage pairs with more projects every quarter. The grid is changing fast. #CleanTech",
    ),
    (
        "educational_video",
        "How does a solar panel turn sunlight into electricity? Photons knock electrons loose, and that flow powers your home. #CleanEnergy",
    ),
    (
        "technology_demo",
        "From bifacial panels to single-axis trackers, today's solar farms squeeze more power from every sunrise. #SolarTechnology",
    ),
    (
        "policy_explainer",
        "Net metering in one minute: your panels export extra power and the grid credits you for it. #EnergyIndependence",
    ),
    (
        "viral_short",
        "POV: your electricity bill just hit $0 because the sun did all the work ☀️ #SolarTok",
    ),
    (
        "quick_fact",
        "Quick fact: one hour of sunlight on Earth carries more energy than humanity uses in a year ⚡ #SolarTok",
    ),
    (
        "trending_topic",
        "Everyone's talking about energy prices. The answer has been shining on us the whole time ☀️ #ClimateAction",
    ),
    (
        "visual_story",
        "Rooftops becoming power plants, one home at a time 🌞 #SolarLife",
    ),
    (
        "infographic",
        "Every MWh of solar avoids roughly 0.8 tons of CO₂ compared with the average grid mix 🌍 #SustainableLiving",
    ),
    (
        "behind_scenes",
        "Behind the scenes: sunrise install day, one more neighborhood running on sunshine 🔧☀️ #SolarLife",
    ),
    (
        "community_discussion",
        "What's holding back rooftop solar in your area: permitting, cost, or utility rules? Let's compare notes. #SolarEnergy",
    ),
    (
        "ama_session",
        "We track US solar production and policy every day. Ask us anything about where the grid is heading. #ClimateAction",
    ),
    (
        "news_analysis",
        "Solar keeps setting generation records. Here's what the latest numbers mean for prices and emissions. #EnergyPolicy",
    ),
];
