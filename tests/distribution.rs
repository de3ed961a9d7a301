//! Distribution Integration Tests
//!
//! Fan-out behavior of the coordinator: completeness, failure isolation,
//! fallback content, timeouts and the single-run guard.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use solar_fanout::adapters::{
    ChannelAdapter, ContentGenerator, ContextProvider, StaticContextProvider,
};
use solar_fanout::core::{
    ContentStrategyCatalog, DispatchLimits, DistributionCoordinator, FallbackContent,
};
use solar_fanout::domain::{
    ChannelStrategy, ContentRequest, ContentType, ContextData, ContextSource, GeneratedContent,
};
use solar_fanout::error::{DistributionError, GenerationError};

fn strategy(id: &str, content_type: &str) -> ChannelStrategy {
    ChannelStrategy::new(
        id,
        vec![ContentType::new(content_type)],
        "plain",
        vec!["#Solar".to_string()],
        &["09:00"],
        "Everyone",
    )
    .unwrap()
}

fn abc_catalog() -> ContentStrategyCatalog {
    ContentStrategyCatalog::from_strategies(vec![
        strategy("a", "update_a"),
        strategy("b", "update_b"),
        strategy("c", "update_c"),
    ])
    .unwrap()
}

fn fallbacks() -> FallbackContent {
    FallbackContent::new("Default sunshine")
        .with("update_a", "Fallback A")
        .with("update_b", "Fallback B")
        .with("update_c", "Fallback C")
}

/// Echoes the request; fails or panics for the listed channels
struct ScriptedGenerator {
    failing: Vec<&'static str>,
    panicking: Vec<&'static str>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn ok() -> Self {
        Self {
            failing: Vec::new(),
            panicking: Vec::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(channels: &[&'static str]) -> Self {
        Self {
            failing: channels.to_vec(),
            ..Self::ok()
        }
    }

    fn panicking(channels: &[&'static str]) -> Self {
        Self {
            panicking: channels.to_vec(),
            ..Self::ok()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::ok()
        }
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &ContentRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panicking.iter().any(|c| *c == request.channel_id) {
            panic!("generator crashed on {}", request.channel_id);
        }
        if self.failing.iter().any(|c| *c == request.channel_id) {
            return Err(GenerationError::Upstream("model overloaded".to_string()));
        }
        Ok(format!("{} for {}", request.content_type, request.channel_id))
    }
}

enum Behavior {
    Succeed,
    Fail,
    Panic,
    Hang,
}

struct StubChannel {
    id: &'static str,
    behavior: Behavior,
}

impl StubChannel {
    fn new(id: &'static str, behavior: Behavior) -> Self {
        Self { id, behavior }
    }
}

#[async_trait]
impl ChannelAdapter for StubChannel {
    fn channel_id(&self) -> &str {
        self.id
    }

    async fn post(&self, content: &GeneratedContent) -> Result<String> {
        match self.behavior {
            Behavior::Succeed => Ok(format!("{}-post-{}", self.id, content.body().len())),
            Behavior::Fail => anyhow::bail!("rate limited by {}", self.id),
            Behavior::Panic => panic!("adapter {} exploded", self.id),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("too-late".to_string())
            }
        }
    }
}

struct FailingContext;

#[async_trait]
impl ContextProvider for FailingContext {
    fn name(&self) -> &str {
        "failing"
    }

    async fn fetch_context(&self) -> Result<ContextData> {
        anyhow::bail!("market API down")
    }
}

fn static_context() -> Arc<StaticContextProvider> {
    Arc::new(StaticContextProvider::new(ContextData::solar_defaults()))
}

#[tokio::test]
async fn test_every_channel_gets_exactly_one_result() {
    let coordinator = DistributionCoordinator::builder(
        abc_catalog(),
        Arc::new(ScriptedGenerator::ok()),
        static_context(),
    )
    .channel(StubChannel::new("a", Behavior::Succeed))
    .channel(StubChannel::new("b", Behavior::Succeed))
    .channel(StubChannel::new("c", Behavior::Succeed))
    .build()
    .unwrap();

    let report = coordinator.distribute().await.unwrap();

    let channels: Vec<&str> = report.results.iter().map(|r| r.channel_id.as_str()).collect();
    assert_eq!(channels, vec!["a", "b", "c"]);
    assert_eq!(report.succeeded_count, 3);
    assert_eq!(report.failed_count, 0);
    assert_eq!(report.context_source, ContextSource::Live);
    assert!(report.started_at <= report.completed_at);

    let a = report.result_for("a").unwrap();
    assert_eq!(a.body(), Some("update_a for a"));
    assert_eq!(a.external_id.as_deref(), Some("a-post-14"));
    assert!(a.error_detail.is_none());
    assert!(a.idempotency_key.starts_with(&format!("{}:a:", report.run_id)));
}

#[tokio::test]
async fn test_generation_failure_uses_fallback_and_adapter_failure_is_isolated() {
    let coordinator = DistributionCoordinator::builder(
        abc_catalog(),
        Arc::new(ScriptedGenerator::failing(&["b"])),
        static_context(),
    )
    .fallbacks(fallbacks())
    .channel(StubChannel::new("a", Behavior::Succeed))
    .channel(StubChannel::new("b", Behavior::Succeed))
    .channel(StubChannel::new("c", Behavior::Fail))
    .build()
    .unwrap();

    let report = coordinator.distribute().await.unwrap();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.succeeded_count, 2);
    assert_eq!(report.failed_count, 1);

    let a = report.result_for("a").unwrap();
    assert!(a.succeeded);
    assert!(!a.content.as_ref().unwrap().used_fallback());

    let b = report.result_for("b").unwrap();
    assert!(b.succeeded);
    assert_eq!(b.body(), Some("Fallback B"));
    assert!(b.content.as_ref().unwrap().used_fallback());

    let c = report.result_for("c").unwrap();
    assert!(!c.succeeded);
    assert!(c.external_id.is_none());
    assert!(c.error_detail.as_deref().unwrap().contains("rate limited by c"));
}

#[tokio::test]
async fn test_adapter_panic_becomes_failed_result() {
    let coordinator = DistributionCoordinator::builder(
        abc_catalog(),
        Arc::new(ScriptedGenerator::ok()),
        static_context(),
    )
    .channel(StubChannel::new("a", Behavior::Succeed))
    .channel(StubChannel::new("b", Behavior::Panic))
    .channel(StubChannel::new("c", Behavior::Succeed))
    .build()
    .unwrap();

    let report = coordinator.distribute().await.unwrap();

    assert_eq!(report.succeeded_count, 2);
    let b = report.result_for("b").unwrap();
    assert!(!b.succeeded);
    assert!(b.error_detail.as_deref().unwrap().contains("adapter b exploded"));

    // Channels after the panicking one still run
    assert!(report.result_for("c").unwrap().succeeded);
}

#[tokio::test]
async fn test_generator_panic_falls_back_and_run_continues() {
    let coordinator = DistributionCoordinator::builder(
        abc_catalog(),
        Arc::new(ScriptedGenerator::panicking(&["a"])),
        static_context(),
    )
    .fallbacks(fallbacks())
    .channel(StubChannel::new("a", Behavior::Succeed))
    .channel(StubChannel::new("b", Behavior::Succeed))
    .channel(StubChannel::new("c", Behavior::Succeed))
    .build()
    .unwrap();

    let report = coordinator.distribute().await.unwrap();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.succeeded_count, 3);

    let a = report.result_for("a").unwrap();
    assert_eq!(a.body(), Some("Fallback A"));
    assert!(a.content.as_ref().unwrap().used_fallback());

    // Later channels still generate normally
    assert_eq!(report.result_for("c").unwrap().body(), Some("update_c for c"));
    assert_eq!(coordinator.runs_recorded().await, 1);
}

#[tokio::test]
async fn test_generation_timeout_falls_back() {
    let coordinator = DistributionCoordinator::builder(
        abc_catalog(),
        Arc::new(ScriptedGenerator::slow(Duration::from_millis(500))),
        static_context(),
    )
    .fallbacks(fallbacks())
    .limits(DispatchLimits {
        generate_timeout: Duration::from_millis(20),
        ..DispatchLimits::default()
    })
    .channel(StubChannel::new("a", Behavior::Succeed))
    .build()
    .unwrap();

    let report = coordinator.distribute().await.unwrap();

    let a = report.result_for("a").unwrap();
    assert!(a.succeeded);
    assert_eq!(a.body(), Some("Fallback A"));
}

#[tokio::test]
async fn test_publish_timeout_is_recorded_as_failure() {
    let coordinator = DistributionCoordinator::builder(
        abc_catalog(),
        Arc::new(ScriptedGenerator::ok()),
        static_context(),
    )
    .limits(DispatchLimits {
        publish_timeout: Duration::from_millis(20),
        ..DispatchLimits::default()
    })
    .channel(StubChannel::new("a", Behavior::Hang))
    .channel(StubChannel::new("b", Behavior::Succeed))
    .build()
    .unwrap();

    let report = coordinator.distribute().await.unwrap();

    let a = report.result_for("a").unwrap();
    assert!(!a.succeeded);
    assert!(a.error_detail.as_deref().unwrap().contains("timed out"));
    assert!(report.result_for("b").unwrap().succeeded);
}

#[tokio::test]
async fn test_context_failure_uses_defaults() {
    let defaults = ContextData::new().with("market_price", "$42.0");
    let coordinator = DistributionCoordinator::builder(
        abc_catalog(),
        Arc::new(ScriptedGenerator::ok()),
        Arc::new(FailingContext),
    )
    .default_context(defaults)
    .channel(StubChannel::new("a", Behavior::Succeed))
    .build()
    .unwrap();

    let report = coordinator.distribute().await.unwrap();

    assert_eq!(report.context_source, ContextSource::Default);
    assert!(report.result_for("a").unwrap().succeeded);
}

#[tokio::test]
async fn test_context_failure_without_defaults_fails_run() {
    let coordinator = DistributionCoordinator::builder(
        abc_catalog(),
        Arc::new(ScriptedGenerator::ok()),
        Arc::new(FailingContext),
    )
    .default_context(ContextData::new())
    .channel(StubChannel::new("a", Behavior::Succeed))
    .build()
    .unwrap();

    let err = coordinator.distribute().await.unwrap_err();
    assert!(matches!(err, DistributionError::ContextUnavailable(ref reason) if reason.contains("market API down")));
    assert_eq!(coordinator.runs_recorded().await, 0);
}

#[tokio::test]
async fn test_concurrent_distribute_is_rejected() {
    let generator = Arc::new(ScriptedGenerator::slow(Duration::from_millis(200)));
    let coordinator = DistributionCoordinator::builder(
        abc_catalog(),
        generator.clone(),
        static_context(),
    )
    .channel(StubChannel::new("a", Behavior::Succeed))
    .build()
    .unwrap();

    let (first, second) = tokio::join!(coordinator.distribute(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        coordinator.distribute().await
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(DistributionError::InProgress)));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.runs_recorded().await, 1);
    assert!(!coordinator.is_running());
}

#[tokio::test]
async fn test_no_channels_yields_empty_report() {
    let coordinator = DistributionCoordinator::builder(
        abc_catalog(),
        Arc::new(ScriptedGenerator::ok()),
        static_context(),
    )
    .build()
    .unwrap();

    let report = coordinator.distribute().await.unwrap();
    assert!(report.results.is_empty());
    assert_eq!(report.succeeded_count, 0);
    assert_eq!(report.failed_count, 0);
}

#[tokio::test]
async fn test_extra_context_reaches_generator() {
    struct ContextEcho;

    #[async_trait]
    impl ContentGenerator for ContextEcho {
        fn name(&self) -> &str {
            "context-echo"
        }

        async fn generate(&self, request: &ContentRequest) -> Result<String, GenerationError> {
            Ok(request
                .context
                .get("research_title")
                .unwrap_or("none")
                .to_string())
        }
    }

    let coordinator = DistributionCoordinator::builder(
        abc_catalog(),
        Arc::new(ContextEcho),
        static_context(),
    )
    .extra_context(ContextData::new().with("research_title", "Perovskite record"))
    .channel(StubChannel::new("a", Behavior::Succeed))
    .build()
    .unwrap();

    let report = coordinator.distribute().await.unwrap();
    assert_eq!(report.result_for("a").unwrap().body(), Some("Perovskite record"));
}
