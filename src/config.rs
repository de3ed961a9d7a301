//! Configuration for solar-fanout.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SOLAR_FANOUT_HOME, API keys)
//! 2. Config file (.solar-fanout/config.yaml)
//! 3. Built-in defaults (six simulated channels, ~/.solar-fanout)
//!
//! Config file discovery:
//! - An explicit path wins
//! - Otherwise searches current directory and parents for .solar-fanout/config.yaml
//! - Relative paths in the file are relative to the .solar-fanout/ directory
//!
//! The resolved configuration is returned by value and handed to whoever
//! wires the coordinator; nothing is cached process-wide.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;

use crate::adapters::{ChannelKind, PromptTemplate};
use crate::core::{
    ContentStrategyCatalog, DispatchLimits, FallbackContent, DEFAULT_CALL_TIMEOUT_SECONDS,
    DEFAULT_LEDGER_CAP,
};
use crate::domain::{ChannelStrategy, ContentType, ContextData};

const CONFIG_DIR: &str = ".solar-fanout";
const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_RESEARCH_WINDOW_DAYS: i64 = 7;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub fallbacks: Option<FallbacksConfig>,
    #[serde(default)]
    pub timeouts: Option<TimeoutsConfig>,
    #[serde(default)]
    pub ledger: Option<LedgerConfig>,
    #[serde(default)]
    pub context: Option<ContextConfig>,
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,
    #[serde(default)]
    pub market: Option<MarketConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Engine state directory (relative to .solar-fanout/)
    pub home: Option<String>,
}

/// One channel: its strategy plus how to publish to it
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    #[serde(flatten)]
    pub strategy: ChannelStrategy,
    /// Payload shape (defaults by channel id for the built-in channels)
    #[serde(default)]
    pub kind: Option<ChannelKind>,
    /// Deliver to a webhook instead of simulating
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub endpoint: String,
    /// Name of the env var holding the bearer token
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FallbacksConfig {
    pub default: Option<String>,
    #[serde(default)]
    pub by_type: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    pub context_seconds: Option<u64>,
    pub generate_seconds: Option<u64>,
    pub publish_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub cap: Option<usize>,
    /// Persist to $HOME/ledger.jsonl (default: true)
    pub persist: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextConfig {
    /// Replaces the built-in default figures
    pub defaults: Option<HashMap<String, String>>,
    /// Dated research insights; the newest recent one is merged into every context
    #[serde(default)]
    pub research: Vec<ResearchConfig>,
    /// How many days an insight counts as recent (default: 7)
    pub research_window_days: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResearchConfig {
    pub title: String,
    pub impact: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratorConfig {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    /// Name of the env var holding the API key (default OPENAI_API_KEY)
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub templates: HashMap<String, PromptTemplate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Fetch live figures; when false the default context is used directly
    pub enabled: Option<bool>,
}

/// How a channel gets published
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublisherSettings {
    Simulated,
    Webhook {
        endpoint: String,
        token: Option<String>,
    },
}

/// A fully resolved channel
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub channel_id: String,
    pub kind: ChannelKind,
    pub publisher: PublisherSettings,
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: String,
    pub templates: HashMap<ContentType, PromptTemplate>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to solar-fanout home (ledger lives here)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub catalog: ContentStrategyCatalog,
    /// Channels in registration order
    pub channels: Vec<ChannelSettings>,
    pub fallbacks: FallbackContent,
    pub limits: DispatchLimits,
    pub ledger_cap: usize,
    pub ledger_path: Option<PathBuf>,
    pub default_context: ContextData,
    pub extra_context: ContextData,
    pub generator: GeneratorSettings,
    pub live_market_data: bool,
    pub nrel_api_key: String,
    pub eia_api_key: String,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse config YAML
pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = serde_yaml::from_str(content)?;
    for channel in &config.channels {
        channel.strategy.validate()?;
    }
    Ok(config)
}

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn env_or_empty(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

/// Load configuration from all sources.
///
/// `explicit` overrides config file discovery.
pub fn load_config(explicit: Option<&Path>) -> Result<ResolvedConfig> {
    let config_file = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let parsed = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let home = if let Ok(env_home) = std::env::var("SOLAR_FANOUT_HOME") {
        PathBuf::from(env_home)
    } else if let (Some(path), Some(home_path)) = (
        config_file.as_ref(),
        parsed.as_ref().and_then(|c| c.paths.home.as_ref()),
    ) {
        let config_dir = path.parent().unwrap_or(Path::new("."));
        resolve_path(config_dir, home_path)
    } else {
        default_home
    };

    let mut resolved = resolve(parsed.unwrap_or_else(empty_config), home)?;
    resolved.config_file = config_file;
    Ok(resolved)
}

fn empty_config() -> ConfigFile {
    ConfigFile {
        version: "1".to_string(),
        paths: PathsConfig::default(),
        channels: Vec::new(),
        fallbacks: None,
        timeouts: None,
        ledger: None,
        context: None,
        generator: None,
        market: None,
    }
}

/// Newest insight dated within `window_days` of `today`
pub fn latest_research(
    insights: &[ResearchConfig],
    today: NaiveDate,
    window_days: i64,
) -> Option<&ResearchConfig> {
    let cutoff = today - Duration::days(window_days);
    insights
        .iter()
        .filter(|insight| insight.date > cutoff)
        .max_by_key(|insight| insight.date)
}

/// Turn a parsed config into resolved settings rooted at `home`
pub fn resolve(config: ConfigFile, home: PathBuf) -> Result<ResolvedConfig> {
    resolve_at(config, home, Utc::now().date_naive())
}

/// Like [`resolve`], judging research recency against `today`
pub fn resolve_at(config: ConfigFile, home: PathBuf, today: NaiveDate) -> Result<ResolvedConfig> {
    let (catalog, channels) = resolve_channels(config.channels)?;

    let mut fallbacks = FallbackContent::builtin();
    if let Some(f) = config.fallbacks {
        if let Some(text) = f.default {
            fallbacks.set_default(text);
        }
        for (content_type, text) in f.by_type {
            fallbacks.set(ContentType::new(content_type), text);
        }
    }

    let limits = match config.timeouts {
        Some(t) => DispatchLimits::from_seconds(
            t.context_seconds.unwrap_or(DEFAULT_CALL_TIMEOUT_SECONDS),
            t.generate_seconds.unwrap_or(DEFAULT_CALL_TIMEOUT_SECONDS),
            t.publish_seconds.unwrap_or(DEFAULT_CALL_TIMEOUT_SECONDS),
        ),
        None => DispatchLimits::default(),
    };

    let ledger_cap = config
        .ledger
        .as_ref()
        .and_then(|l| l.cap)
        .unwrap_or(DEFAULT_LEDGER_CAP);
    let persist = config
        .ledger
        .as_ref()
        .and_then(|l| l.persist)
        .unwrap_or(true);
    let ledger_path = persist.then(|| home.join("ledger.jsonl"));

    let context = config.context.unwrap_or_default();
    let default_context = match context.defaults {
        Some(values) => values.into_iter().collect(),
        None => ContextData::solar_defaults(),
    };
    let window_days = context
        .research_window_days
        .unwrap_or(DEFAULT_RESEARCH_WINDOW_DAYS);
    let extra_context = match latest_research(&context.research, today, window_days) {
        Some(r) => ContextData::new()
            .with("research_title", r.title.clone())
            .with("research_impact", r.impact.clone()),
        None => ContextData::new(),
    };

    let generator = config.generator.unwrap_or_default();
    let api_key_env = generator
        .api_key_env
        .unwrap_or_else(|| "OPENAI_API_KEY".to_string());
    let generator = GeneratorSettings {
        model: generator.model,
        endpoint: generator.endpoint,
        api_key: env_or_empty(&api_key_env),
        templates: generator
            .templates
            .into_iter()
            .map(|(k, v)| (ContentType::new(k), v))
            .collect(),
    };

    let live_market_data = config
        .market
        .and_then(|m| m.enabled)
        .unwrap_or(true);

    Ok(ResolvedConfig {
        home,
        config_file: None,
        catalog,
        channels,
        fallbacks,
        limits,
        ledger_cap,
        ledger_path,
        default_context,
        extra_context,
        generator,
        live_market_data,
        nrel_api_key: env_or_empty("NREL_API_KEY"),
        eia_api_key: env_or_empty("EIA_API_KEY"),
    })
}

/// Build the catalog and channel list; empty config means the built-in channels
fn resolve_channels(
    channels: Vec<ChannelConfig>,
) -> Result<(ContentStrategyCatalog, Vec<ChannelSettings>)> {
    if channels.is_empty() {
        let catalog = ContentStrategyCatalog::builtin();
        let settings = catalog
            .iter()
            .filter_map(|s| {
                ChannelKind::for_channel(s.channel_id()).map(|kind| ChannelSettings {
                    channel_id: s.channel_id().to_string(),
                    kind,
                    publisher: PublisherSettings::Simulated,
                })
            })
            .collect();
        return Ok((catalog, settings));
    }

    let mut settings = Vec::with_capacity(channels.len());
    let mut strategies = Vec::with_capacity(channels.len());

    for channel in channels {
        let channel_id = channel.strategy.channel_id().to_string();
        let kind = channel
            .kind
            .or_else(|| ChannelKind::for_channel(&channel_id))
            .with_context(|| format!("Channel '{}' needs an explicit kind", channel_id))?;

        let publisher = match channel.webhook {
            Some(w) => PublisherSettings::Webhook {
                endpoint: w.endpoint,
                token: w.token_env.and_then(|name| std::env::var(name).ok()),
            },
            None => PublisherSettings::Simulated,
        };

        settings.push(ChannelSettings {
            channel_id,
            kind,
            publisher,
        });
        strategies.push(channel.strategy);
    }

    let catalog = ContentStrategyCatalog::from_strategies(strategies)?;
    Ok((catalog, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = r##"
version: "1"
paths:
  home: ./state
channels:
  - channel_id: linkedin
    content_types: [professional_insight]
    tone_descriptor: professional
    hashtags: ["#SolarEnergy"]
    posting_windows: ["09:00", "17:00"]
    audience_descriptor: Professionals
  - channel_id: mastodon
    kind: forum
    content_types: [news_analysis, community_discussion]
    tone_descriptor: friendly
    hashtags: []
    posting_windows: ["20:00"]
    audience_descriptor: Fediverse
    webhook:
      endpoint: http://localhost:8080/hooks/mastodon
fallbacks:
  default: "Sunshine!"
  by_type:
    news_analysis: "Solar news, summarized."
timeouts:
  generate_seconds: 5
ledger:
  cap: 50
  persist: false
context:
  research:
    - title: Bifacial tracker study
      impact: More yield per acre
      date: 2025-03-02
    - title: Perovskite tandem record
      impact: Higher efficiency at lower cost
      date: 2025-03-08
    - title: Thin-film recycling pilot
      impact: Lower end-of-life cost
      date: 2025-01-15
"##;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join(CONFIG_FILE);
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", SAMPLE).unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1");
        assert_eq!(config.paths.home, Some("./state".to_string()));
        assert_eq!(config.channels.len(), 2);
        assert_eq!(
            config.channels[0].strategy.hashtags().to_vec(),
            vec!["#SolarEnergy".to_string()]
        );
        assert_eq!(config.channels[1].kind, Some(ChannelKind::Forum));
        assert_eq!(config.context.unwrap().research.len(), 3);
    }

    #[test]
    fn test_resolve_channels_and_settings() {
        let config = parse_config(SAMPLE).unwrap();
        let resolved = resolve_at(config, PathBuf::from("/tmp/solar"), today()).unwrap();

        let ids: Vec<&str> = resolved.catalog.channel_ids().collect();
        assert_eq!(ids, vec!["linkedin", "mastodon"]);
        assert_eq!(resolved.channels[0].kind, ChannelKind::ProfessionalNetwork);
        assert_eq!(resolved.channels[0].publisher, PublisherSettings::Simulated);
        assert!(matches!(
            resolved.channels[1].publisher,
            PublisherSettings::Webhook { ref endpoint, .. } if endpoint == "http://localhost:8080/hooks/mastodon"
        ));

        assert_eq!(resolved.ledger_cap, 50);
        assert!(resolved.ledger_path.is_none());
        assert_eq!(resolved.limits.generate_timeout.as_secs(), 5);
        assert_eq!(resolved.limits.publish_timeout.as_secs(), DEFAULT_CALL_TIMEOUT_SECONDS);
        assert_eq!(resolved.extra_context.get("research_title"), Some("Perovskite tandem record"));
        assert_eq!(
            resolved.extra_context.get("research_impact"),
            Some("Higher efficiency at lower cost")
        );
    }

    #[test]
    fn test_latest_research_picks_newest_recent_insight() {
        let config = parse_config(SAMPLE).unwrap();
        let insights = config.context.unwrap().research;
        assert_eq!(insights.len(), 3);

        let latest = latest_research(&insights, today(), 7).unwrap();
        assert_eq!(latest.title, "Perovskite tandem record");

        // A week later everything has gone stale
        let later = today() + Duration::days(7);
        assert!(latest_research(&insights, later, 7).is_none());

        // A wider window reaches back to the older study
        let wide = latest_research(&insights[..1], later, 30).unwrap();
        assert_eq!(wide.title, "Bifacial tracker study");
    }

    #[test]
    fn test_stale_research_is_not_merged() {
        let config = parse_config(SAMPLE).unwrap();
        let later = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let resolved = resolve_at(config, PathBuf::from("/tmp/solar"), later).unwrap();
        assert!(resolved.extra_context.is_empty());
    }

    #[test]
    fn test_research_window_is_configurable() {
        let mut config = parse_config(SAMPLE).unwrap();
        if let Some(ref mut context) = config.context {
            context.research_window_days = Some(120);
        }
        let later = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let resolved = resolve_at(config, PathBuf::from("/tmp/solar"), later).unwrap();
        assert_eq!(resolved.extra_context.get("research_title"), Some("Perovskite tandem record"));
    }

    #[test]
    fn test_resolve_fallback_overrides() {
        let config = parse_config(SAMPLE).unwrap();
        let resolved = resolve(config, PathBuf::from("/tmp/solar")).unwrap();

        assert_eq!(
            resolved.fallbacks.for_type(&ContentType::new("news_analysis")),
            "Solar news, summarized."
        );
        assert_eq!(resolved.fallbacks.for_type(&ContentType::new("unmapped")), "Sunshine!");
        // Built-in per-type texts survive a new default
        assert!(resolved
            .fallbacks
            .for_type(&ContentType::new("solar_update"))
            .starts_with("☀️ Solar energy is powering"));
    }

    #[test]
    fn test_empty_config_uses_builtin_channels() {
        let resolved = resolve(empty_config(), PathBuf::from("/tmp/solar")).unwrap();

        assert_eq!(resolved.channels.len(), 6);
        assert_eq!(resolved.channels[0].kind, ChannelKind::Microblog);
        assert_eq!(resolved.ledger_cap, DEFAULT_LEDGER_CAP);
        assert_eq!(resolved.ledger_path, Some(PathBuf::from("/tmp/solar/ledger.jsonl")));
        assert_eq!(resolved.default_context, ContextData::solar_defaults());
        assert!(resolved.live_market_data);
    }

    #[test]
    fn test_unknown_channel_needs_kind() {
        let yaml = r#"
version: "1"
channels:
  - channel_id: bluesky
    content_types: [quick_fact]
    tone_descriptor: short
    hashtags: []
    posting_windows: ["12:00"]
    audience_descriptor: Everyone
"#;
        let config = parse_config(yaml).unwrap();
        assert!(resolve(config, PathBuf::from("/tmp/solar")).is_err());
    }

    #[test]
    fn test_invalid_posting_window_rejected() {
        let yaml = r#"
version: "1"
channels:
  - channel_id: linkedin
    content_types: [professional_insight]
    tone_descriptor: professional
    hashtags: []
    posting_windows: ["9am"]
    audience_descriptor: Professionals
"#;
        assert!(parse_config(yaml).is_err());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
    }
}
