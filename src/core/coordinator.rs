//! Distribution coordinator.
//!
//! One `distribute()` call walks through
//! `CollectingContext -> Generating -> Publishing -> Aggregating -> Done`:
//! fetch context, then for each registered channel (in registration order)
//! generate content, publish it and record the outcome, then append the
//! aggregate report to the ledger.
//!
//! Per-channel faults never abort a run. Generation failures fall back to
//! fixed content; publish errors, timeouts and panics become failed results.
//! At most one run may be in flight per coordinator; a concurrent call is
//! rejected with `DistributionError::InProgress`.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{ChannelAdapter, ContentGenerator, ContextProvider};
use crate::domain::{
    ContentRequest, ContextData, ContextSource, DistributionReport, GeneratedContent,
    PublishResult,
};
use crate::error::{CatalogError, DistributionError, GenerationError};

use super::catalog::ContentStrategyCatalog;
use super::fallback::FallbackContent;
use super::ledger::DistributionLedger;
use super::limits::DispatchLimits;

/// Stage of a distribution run (reported through tracing)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionPhase {
    CollectingContext,
    Generating,
    Publishing,
    Aggregating,
    Done,
}

/// Fans content out to every registered channel
pub struct DistributionCoordinator {
    catalog: Arc<ContentStrategyCatalog>,
    generator: Arc<dyn ContentGenerator>,
    context_provider: Arc<dyn ContextProvider>,
    channels: Vec<Arc<dyn ChannelAdapter>>,
    fallbacks: FallbackContent,
    default_context: ContextData,
    extra_context: ContextData,
    limits: DispatchLimits,
    ledger: Mutex<DistributionLedger>,
    in_flight: Mutex<()>,
}

impl DistributionCoordinator {
    pub fn builder(
        catalog: ContentStrategyCatalog,
        generator: Arc<dyn ContentGenerator>,
        context_provider: Arc<dyn ContextProvider>,
    ) -> CoordinatorBuilder {
        CoordinatorBuilder::new(catalog, generator, context_provider)
    }

    /// Run one distribution across all registered channels
    #[instrument(skip(self), fields(channels = self.channels.len()))]
    pub async fn distribute(&self) -> Result<DistributionReport, DistributionError> {
        let _running = self
            .in_flight
            .try_lock()
            .map_err(|_| DistributionError::InProgress)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "Starting distribution run");

        debug!(%run_id, phase = ?DistributionPhase::CollectingContext, "Phase");
        let (context, context_source) = self.collect_context().await?;

        let run_index = self.ledger.lock().await.runs_recorded();

        let mut results = Vec::with_capacity(self.channels.len());
        for adapter in &self.channels {
            let result = self
                .distribute_to_channel(run_id, run_index, adapter, &context)
                .await;

            if result.succeeded {
                info!(channel = %result.channel_id, "Published");
            } else {
                warn!(
                    channel = %result.channel_id,
                    error = result.error_detail.as_deref().unwrap_or_default(),
                    "Publish failed"
                );
            }
            results.push(result);
        }

        debug!(%run_id, phase = ?DistributionPhase::Aggregating, "Phase");
        let report = DistributionReport::new(run_id, results, started_at, Utc::now(), context_source);

        let sequence = self
            .ledger
            .lock()
            .await
            .append(report.clone())
            .map_err(|e| {
                error!(%run_id, error = %e, "Failed to record run");
                DistributionError::Ledger(format!("{:#}", e))
            })?;

        debug!(%run_id, phase = ?DistributionPhase::Done, "Phase");
        info!(
            %run_id,
            sequence,
            succeeded = report.succeeded_count,
            failed = report.failed_count,
            duration_ms = report.duration_ms(),
            "Distribution run completed"
        );

        Ok(report)
    }

    /// The last `n` reports, oldest first
    pub async fn history(&self, n: usize) -> Vec<DistributionReport> {
        self.ledger.lock().await.recent(n)
    }

    /// Total runs recorded by this coordinator's ledger
    pub async fn runs_recorded(&self) -> u64 {
        self.ledger.lock().await.runs_recorded()
    }

    /// Whether a run is currently in flight
    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    pub fn catalog(&self) -> &ContentStrategyCatalog {
        &self.catalog
    }

    /// Registered channel ids in dispatch order
    pub fn channel_ids(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel_id()).collect()
    }

    /// Fetch context, falling back to the configured defaults
    async fn collect_context(&self) -> Result<(ContextData, ContextSource), DistributionError> {
        let fetched = match timeout(
            self.limits.context_timeout,
            self.context_provider.fetch_context(),
        )
        .await
        {
            Ok(Ok(context)) => Ok(context),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(_) => Err(format!(
                "context provider timed out after {:?}",
                self.limits.context_timeout
            )),
        };

        let (mut context, source) = match fetched {
            Ok(context) => (context, ContextSource::Live),
            Err(reason) if !self.default_context.is_empty() => {
                warn!(
                    provider = self.context_provider.name(),
                    error = %reason,
                    "Context unavailable, using defaults"
                );
                (self.default_context.clone(), ContextSource::Default)
            }
            Err(reason) => {
                error!(provider = self.context_provider.name(), error = %reason, "Context unavailable");
                return Err(DistributionError::ContextUnavailable(reason));
            }
        };

        context.merge_missing(&self.extra_context);
        Ok((context, source))
    }

    /// Generate and publish for one channel. Always yields a result.
    async fn distribute_to_channel(
        &self,
        run_id: Uuid,
        run_index: u64,
        adapter: &Arc<dyn ChannelAdapter>,
        context: &ContextData,
    ) -> PublishResult {
        let channel_id = adapter.channel_id();

        let strategy = match self.catalog.get(channel_id) {
            Ok(strategy) => strategy,
            Err(e) => {
                warn!(channel = %channel_id, error = %e, "Skipping channel without strategy");
                return PublishResult::failure(run_id, channel_id, None, e.to_string(), Utc::now());
            }
        };

        let content_type = strategy.content_type_for_run(run_index).clone();
        let posting_time = strategy.posting_time_for_run(run_index);

        let Some(request) = ContentRequest::for_strategy(strategy, &content_type, context) else {
            return PublishResult::failure(
                run_id,
                channel_id,
                None,
                format!("content type '{}' not allowed", content_type),
                Utc::now(),
            );
        };

        debug!(channel = %channel_id, %content_type, phase = ?DistributionPhase::Generating, "Phase");
        let (body, used_fallback) = match self.generate(&request).await {
            Ok(body) => (body, false),
            Err(e) => {
                warn!(
                    channel = %channel_id,
                    %content_type,
                    generator = self.generator.name(),
                    error = %e,
                    "Generation failed, using fallback content"
                );
                (self.fallbacks.for_type(&content_type).to_string(), true)
            }
        };

        let Some(content) =
            GeneratedContent::compose(strategy, content_type, body, posting_time, used_fallback)
        else {
            return PublishResult::failure(run_id, channel_id, None, "empty content body", Utc::now());
        };

        debug!(channel = %channel_id, phase = ?DistributionPhase::Publishing, "Phase");
        self.publish(run_id, Arc::clone(adapter), content).await
    }

    /// Call the generator on a separate task under the generation timeout.
    ///
    /// A generator panic is reported as an upstream failure so the channel
    /// still gets fallback content.
    async fn generate(&self, request: &ContentRequest) -> Result<String, GenerationError> {
        let generator = Arc::clone(&self.generator);
        let generate_timeout = self.limits.generate_timeout;
        let task_request = request.clone();

        let handle = tokio::spawn(async move {
            timeout(generate_timeout, generator.generate(&task_request)).await
        });

        let body = match handle.await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(GenerationError::Timeout(generate_timeout)),
            Err(join_error) if join_error.is_panic() => {
                let detail = panic_message(join_error.into_panic());
                return Err(GenerationError::Upstream(format!("generator panicked: {}", detail)));
            }
            Err(join_error) => return Err(GenerationError::Upstream(join_error.to_string())),
        };

        if body.trim().is_empty() {
            return Err(GenerationError::EmptyBody);
        }
        Ok(body)
    }

    /// Publish on a separate task so errors, timeouts and panics all become results
    async fn publish(
        &self,
        run_id: Uuid,
        adapter: Arc<dyn ChannelAdapter>,
        content: GeneratedContent,
    ) -> PublishResult {
        let attempted_at = Utc::now();
        let publish_timeout = self.limits.publish_timeout;
        let channel_id = adapter.channel_id().to_string();

        let task_content = content.clone();
        let handle = tokio::spawn(async move {
            timeout(publish_timeout, adapter.post(&task_content)).await
        });

        match handle.await {
            Ok(Ok(Ok(external_id))) => {
                PublishResult::success(run_id, content, external_id, attempted_at)
            }
            Ok(Ok(Err(e))) => {
                PublishResult::failure(run_id, channel_id, Some(content), format!("{:#}", e), attempted_at)
            }
            Ok(Err(_)) => PublishResult::failure(
                run_id,
                channel_id,
                Some(content),
                format!("publish timed out after {:?}", publish_timeout),
                attempted_at,
            ),
            Err(join_error) if join_error.is_panic() => {
                let detail = panic_message(join_error.into_panic());
                PublishResult::failure(
                    run_id,
                    channel_id,
                    Some(content),
                    format!("adapter panicked: {}", detail),
                    attempted_at,
                )
            }
            Err(join_error) => {
                PublishResult::failure(run_id, channel_id, Some(content), join_error.to_string(), attempted_at)
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Wires collaborators into a coordinator and checks channel registration
pub struct CoordinatorBuilder {
    catalog: ContentStrategyCatalog,
    generator: Arc<dyn ContentGenerator>,
    context_provider: Arc<dyn ContextProvider>,
    channels: Vec<Arc<dyn ChannelAdapter>>,
    fallbacks: FallbackContent,
    default_context: ContextData,
    extra_context: ContextData,
    limits: DispatchLimits,
    ledger: Option<DistributionLedger>,
}

impl CoordinatorBuilder {
    pub fn new(
        catalog: ContentStrategyCatalog,
        generator: Arc<dyn ContentGenerator>,
        context_provider: Arc<dyn ContextProvider>,
    ) -> Self {
        Self {
            catalog,
            generator,
            context_provider,
            channels: Vec::new(),
            fallbacks: FallbackContent::builtin(),
            default_context: ContextData::solar_defaults(),
            extra_context: ContextData::new(),
            limits: DispatchLimits::default(),
            ledger: None,
        }
    }

    /// Register a channel adapter (dispatch follows registration order)
    pub fn channel(self, adapter: impl ChannelAdapter + 'static) -> Self {
        self.shared_channel(Arc::new(adapter))
    }

    pub fn shared_channel(mut self, adapter: Arc<dyn ChannelAdapter>) -> Self {
        self.channels.push(adapter);
        self
    }

    pub fn fallbacks(mut self, fallbacks: FallbackContent) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Context used when the provider fails (empty means fail the run)
    pub fn default_context(mut self, context: ContextData) -> Self {
        self.default_context = context;
        self
    }

    /// Values added to every run's context unless the provider set them
    pub fn extra_context(mut self, context: ContextData) -> Self {
        self.extra_context = context;
        self
    }

    pub fn limits(mut self, limits: DispatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn ledger(mut self, ledger: DistributionLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Build, requiring exactly one strategy per registered channel
    pub fn build(self) -> Result<DistributionCoordinator, CatalogError> {
        let mut seen = HashSet::new();
        for adapter in &self.channels {
            let id = adapter.channel_id();
            self.catalog.get(id)?;
            if !seen.insert(id.to_string()) {
                return Err(CatalogError::Duplicate(id.to_string()));
            }
        }

        Ok(DistributionCoordinator {
            catalog: Arc::new(self.catalog),
            generator: self.generator,
            context_provider: self.context_provider,
            channels: self.channels,
            fallbacks: self.fallbacks,
            default_context: self.default_context,
            extra_context: self.extra_context,
            limits: self.limits,
            ledger: Mutex::new(self.ledger.unwrap_or_default()),
            in_flight: Mutex::new(()),
        })
    }
}
