//! Command-line interface for solar-fanout.
//!
//! Provides commands for running a distribution, browsing the run history,
//! listing channel strategies, and inspecting the resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{
    ChannelAdapter, ContentGenerator, ContextProvider, OpenAiGenerator, SimulatedChannel,
    SolarMarketProvider, StaticContextProvider, WebhookChannel,
};
use crate::config::{load_config, PublisherSettings, ResolvedConfig};
use crate::core::{DistributionCoordinator, DistributionLedger};
use crate::domain::DistributionReport;

/// solar-fanout - Multi-channel content distribution for Solar Ascension
#[derive(Parser, Debug)]
#[command(name = "solar-fanout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (searches for .solar-fanout/config.yaml if not provided)
    #[arg(long, global = true, env = "SOLAR_FANOUT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate and publish content to every configured channel
    Distribute {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent distribution runs
    History {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// List channel strategies
    Strategies,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;

        match self.command {
            Commands::Distribute { json } => distribute(&config, json).await,
            Commands::History { limit, json } => show_history(&config, limit, json).await,
            Commands::Strategies => {
                list_strategies(&config);
                Ok(())
            }
            Commands::Config => {
                show_config(&config);
                Ok(())
            }
        }
    }
}

/// Wire a coordinator from resolved configuration
pub async fn build_coordinator(config: &ResolvedConfig) -> Result<DistributionCoordinator> {
    let mut generator = OpenAiGenerator::new(config.generator.api_key.clone());
    if let Some(ref model) = config.generator.model {
        generator = generator.with_model(model.clone());
    }
    if let Some(ref endpoint) = config.generator.endpoint {
        generator = generator.with_endpoint(endpoint.clone());
    }
    for (content_type, template) in &config.generator.templates {
        generator = generator.with_template(content_type.clone(), template.clone());
    }
    let generator: Arc<dyn ContentGenerator> = Arc::new(generator);

    let context_provider: Arc<dyn ContextProvider> = if config.live_market_data {
        Arc::new(SolarMarketProvider::new(
            config.nrel_api_key.clone(),
            config.eia_api_key.clone(),
        ))
    } else {
        Arc::new(StaticContextProvider::new(config.default_context.clone()))
    };

    let ledger = match config.ledger_path {
        Some(ref path) => DistributionLedger::open(path, config.ledger_cap).await?,
        None => DistributionLedger::in_memory(config.ledger_cap),
    };

    let mut builder = DistributionCoordinator::builder(config.catalog.clone(), generator, context_provider)
        .fallbacks(config.fallbacks.clone())
        .default_context(config.default_context.clone())
        .extra_context(config.extra_context.clone())
        .limits(config.limits)
        .ledger(ledger);

    for channel in &config.channels {
        let adapter: Arc<dyn ChannelAdapter> = match channel.publisher {
            PublisherSettings::Simulated => {
                Arc::new(SimulatedChannel::new(channel.channel_id.clone(), channel.kind))
            }
            PublisherSettings::Webhook {
                ref endpoint,
                ref token,
            } => Arc::new(WebhookChannel::new(
                channel.channel_id.clone(),
                channel.kind,
                endpoint.clone(),
                token.clone(),
            )),
        };
        builder = builder.shared_channel(adapter);
    }

    builder.build().context("Invalid channel configuration")
}

/// Run one distribution and print the report
async fn distribute(config: &ResolvedConfig, json: bool) -> Result<()> {
    let coordinator = build_coordinator(config).await?;
    let report = coordinator.distribute().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.failed_count > 0 {
        eprintln!(
            "\n[Run {} completed with {} failed channel(s)]",
            report.run_id, report.failed_count
        );
    } else {
        eprintln!("\n[Run {} completed successfully]", report.run_id);
    }

    Ok(())
}

fn print_report(report: &DistributionReport) {
    println!("Run ID: {}", report.run_id);
    println!("Started: {}", report.started_at);
    println!("Completed: {}", report.completed_at);
    println!("Context: {:?}", report.context_source);
    println!(
        "Results: {} succeeded, {} failed",
        report.succeeded_count, report.failed_count
    );
    println!();
    println!("{:<12} {:<8} {:<24} {:<50}", "CHANNEL", "STATUS", "TYPE", "DETAIL");
    println!("{}", "-".repeat(96));

    for result in &report.results {
        let status = if result.succeeded { "ok" } else { "FAILED" };
        let content_type = result
            .content
            .as_ref()
            .map(|c| {
                if c.used_fallback() {
                    format!("{} (fallback)", c.content_type())
                } else {
                    c.content_type().to_string()
                }
            })
            .unwrap_or_else(|| "-".to_string());
        let detail = if result.succeeded {
            result.external_id.clone().unwrap_or_default()
        } else {
            result.error_detail.clone().unwrap_or_default()
        };

        println!(
            "{:<12} {:<8} {:<24} {:<50}",
            result.channel_id,
            status,
            content_type,
            truncate(&detail, 50)
        );
    }
}

/// List recent runs from the ledger
async fn show_history(config: &ResolvedConfig, limit: usize, json: bool) -> Result<()> {
    let ledger = match config.ledger_path {
        Some(ref path) => DistributionLedger::open(path, config.ledger_cap).await?,
        None => {
            println!("Ledger persistence is disabled; no history available");
            return Ok(());
        }
    };

    let entries = ledger.recent_entries(limit);

    if json {
        let reports: Vec<&DistributionReport> = entries.iter().map(|e| &e.report).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    println!(
        "{:<6} {:<38} {:<22} {:<6} {:<6}",
        "SEQ", "RUN ID", "STARTED", "OK", "FAILED"
    );
    println!("{}", "-".repeat(82));

    for entry in entries {
        let report = &entry.report;
        println!(
            "{:<6} {:<38} {:<22} {:<6} {:<6}",
            entry.sequence,
            report.run_id,
            report.started_at.format("%Y-%m-%d %H:%M:%S"),
            report.succeeded_count,
            report.failed_count
        );
    }

    println!("\nTotal recorded: {} runs", ledger.runs_recorded());
    Ok(())
}

fn list_strategies(config: &ResolvedConfig) {
    println!("{:<12} {:<22} {:<40}", "CHANNEL", "TONE", "CONTENT TYPES");
    println!("{}", "-".repeat(80));

    for strategy in config.catalog.iter() {
        let types: Vec<&str> = strategy.content_types().iter().map(|t| t.as_str()).collect();
        println!(
            "{:<12} {:<22} {:<40}",
            strategy.channel_id(),
            truncate(strategy.tone_descriptor(), 22),
            types.join(", ")
        );

        let windows: Vec<String> = strategy
            .posting_windows()
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect();
        println!("{:<12} windows: {}", "", windows.join(", "));
        println!("{:<12} hashtags: {}", "", strategy.hashtags().join(" "));
        println!("{:<12} audience: {}", "", strategy.audience_descriptor());
    }

    println!("\nTotal: {} channels", config.catalog.len());
}

fn show_config(cfg: &ResolvedConfig) {
    println!("Solar Fanout Configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:   {}", cfg.home.display());
    println!(
        "  Ledger: {}",
        cfg.ledger_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(in memory)".to_string())
    );
    println!("  Ledger cap: {}", cfg.ledger_cap);
    println!();
    println!("Channels:");
    for channel in &cfg.channels {
        let publisher = match channel.publisher {
            PublisherSettings::Simulated => "simulated".to_string(),
            PublisherSettings::Webhook { ref endpoint, .. } => format!("webhook {}", endpoint),
        };
        println!("  {:<12} {:<22} {}", channel.channel_id, channel.kind.to_string(), publisher);
    }
    println!();
    println!("Timeouts:");
    println!("  Context:  {}s", cfg.limits.context_timeout.as_secs());
    println!("  Generate: {}s", cfg.limits.generate_timeout.as_secs());
    println!("  Publish:  {}s", cfg.limits.publish_timeout.as_secs());
    println!();
    println!("Generator:");
    println!(
        "  Model:   {}",
        cfg.generator.model.as_deref().unwrap_or(crate::adapters::openai::DEFAULT_MODEL)
    );
    println!(
        "  API key: {}",
        if cfg.generator.api_key.is_empty() { "(not set - fallbacks only)" } else { "set" }
    );
    println!(
        "  Market data: {}",
        if cfg.live_market_data { "live (NREL + EIA)" } else { "defaults only" }
    );
    println!();
    println!("Environment overrides:");
    println!(
        "  SOLAR_FANOUT_HOME: {}",
        std::env::var("SOLAR_FANOUT_HOME").unwrap_or_else(|_| "(not set)".to_string())
    );
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
