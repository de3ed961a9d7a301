//! OpenAI-compatible chat completion generator.
//!
//! Each content type maps to a prompt template. The request context is
//! appended to the prompt as `key: value` lines.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ContentGenerator;
use crate::domain::{ContentRequest, ContentType};
use crate::error::GenerationError;

/// Default chat completions endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model name
pub const DEFAULT_MODEL: &str = "gpt-4";

const SYSTEM_PROMPT: &str = "You are a solar energy expert and social media strategist. \
Create engaging, accurate, and inspiring content about solar energy and America's energy future.";

/// Prompt and sampling settings for one content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub prompt: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    280
}
fn default_temperature() -> f32 {
    0.7
}

impl PromptTemplate {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature,
        }
    }

    /// Render the user prompt with context lines appended
    pub fn render(&self, request: &ContentRequest) -> String {
        let mut prompt = self.prompt.clone();
        if !request.context.is_empty() {
            let context_str = request
                .context
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join("\n");
            prompt.push_str("\n\nContext:\n");
            prompt.push_str(&context_str);
        }
        prompt
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generator backed by an OpenAI-compatible chat API
pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    endpoint: String,
    templates: HashMap<ContentType, PromptTemplate>,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    /// Create a generator with the built-in templates
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            templates: builtin_templates(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Add or replace a template
    pub fn with_template(mut self, content_type: ContentType, template: PromptTemplate) -> Self {
        self.templates.insert(content_type, template);
        self
    }

    pub fn template(&self, content_type: &ContentType) -> Option<&PromptTemplate> {
        self.templates.get(content_type)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &ContentRequest) -> Result<String, GenerationError> {
        let template = self
            .templates
            .get(&request.content_type)
            .ok_or_else(|| GenerationError::UnknownContentType(request.content_type.to_string()))?;

        if self.api_key.is_empty() {
            return Err(GenerationError::Upstream("no API key configured".to_string()));
        }

        let prompt = template.render(request);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: template.max_tokens,
            temperature: template.temperature,
        };

        debug!(content_type = %request.content_type, model = %self.model, "Requesting completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream(format!("{}: {}", status, text.trim())));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Upstream(format!("invalid response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(GenerationError::EmptyBody);
        }

        info!(
            content_type = %request.content_type,
            chars = content.chars().count(),
            "Generated content"
        );

        Ok(content)
    }
}

fn builtin_templates() -> HashMap<ContentType, PromptTemplate> {
    let table: &[(&str, &str, f32)] = &[
        ("solar_update", "Create a compelling post about current solar energy production and its impact. Include specific data points and make it engaging for a general audience.", 0.7),
        ("research_highlight", "Summarize a solar energy research finding in an engaging way for social media. Focus on the practical impact and future potential.", 0.8),
        ("policy_commentary", "Comment on current solar energy policy developments in a way that supports the Solar Ascension vision. Be informative but engaging.", 0.6),
        ("vision_statement", "Create an inspiring statement about America's solar future. Be bold and visionary.", 0.9),
        ("professional_insight", "Write a short professional insight on the business case for solar energy, grounded in the figures provided.", 0.6),
        ("policy_analysis", "Write a concise analysis of how current energy policy affects solar deployment, citing the figures provided.", 0.5),
        ("industry_trend", "Describe one current trend in the solar industry and why it matters to decision makers.", 0.6),
        ("educational_video", "Write a short video description that teaches one solar energy concept to a general audience.", 0.7),
        ("technology_demo", "Write a short video description demonstrating a solar technology and what makes it work.", 0.7),
        ("policy_explainer", "Write a short video description explaining a solar energy policy in plain language.", 0.6),
        ("viral_short", "Write a punchy caption for a short-form solar video. Keep it fun and under 150 characters.", 0.9),
        ("quick_fact", "Share one surprising solar energy fact in a single fun sentence.", 0.8),
        ("trending_topic", "Connect a trending energy topic to solar power in a fun, fast-paced caption.", 0.9),
        ("visual_story", "Write an inspiring caption for a photo story about solar energy in everyday life.", 0.8),
        ("infographic", "Write a caption for an infographic summarizing the solar figures provided.", 0.6),
        ("behind_scenes", "Write a warm behind-the-scenes caption about a solar installation.", 0.8),
        ("community_discussion", "Write a discussion-starting forum post about solar energy, ending with an open question.", 0.7),
        ("ama_session", "Write an 'ask me anything' forum introduction about solar energy and policy.", 0.7),
        ("news_analysis", "Write a short forum post analyzing what the figures provided mean for solar energy.", 0.6),
    ];

    table
        .iter()
        .map(|(key, prompt, temperature)| {
            (
                ContentType::new(*key),
                PromptTemplate::new(*prompt, default_max_tokens(), *temperature),
            )
        })
        .collect()
}
