//! The query pipeline.
//!
//! [`Pipeline::process`] drives one query through the state machine in
//! [`QueryState`]: input safety check, semantic cache lookup, and on a miss
//! classification, routing, generation, output check and cache insert.
//!
//! Build a pipeline with [`Huginn::builder()`](crate::Huginn::builder).

mod builder;
pub mod metrics;
mod state;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

pub use builder::{Huginn, HuginnBuilder};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use state::{
    DEFAULT_REJECTION_MESSAGE, OutputPolicy, PipelineConfig, PipelineResponse, Query, QueryState,
    ResponseSource,
};

use crate::cache::SemanticCache;
use crate::guard::SafetyGate;
use crate::prompt::PromptTemplate;
use crate::router::{ComplexityClassifier, Router, estimate_tokens};
use crate::telemetry;
use crate::traits::GenerationBackend;
use crate::types::{GenerateOptions, GuardrailVerdict, Message, RoutingDecision};
use crate::{HuginnError, Result};

/// Query intake pipeline.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Pipeline {
    config: PipelineConfig,
    gate: SafetyGate,
    cache: SemanticCache<String>,
    classifier: ComplexityClassifier,
    router: Router,
    template: PromptTemplate,
    backend: Arc<dyn GenerationBackend>,
    metrics: Arc<PipelineMetrics>,
}

/// Trace and timing for one query in flight.
struct Run<'a> {
    trace: Vec<QueryState>,
    started: Instant,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> Run<'a> {
    fn new(cancel: Option<&'a CancellationToken>) -> Self {
        Self {
            trace: Vec::with_capacity(8),
            started: Instant::now(),
            cancel,
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(HuginnError::Cancelled),
            _ => Ok(()),
        }
    }

    fn enter(&mut self, state: QueryState) -> Result<()> {
        self.check_cancelled()?;
        debug!(%state, "transition");
        ::metrics::counter!(telemetry::TRANSITIONS_TOTAL, "state" => state.as_str()).increment(1);
        self.trace.push(state);
        Ok(())
    }
}

impl Pipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &SemanticCache<String> {
        &self.cache
    }

    pub fn gate(&self) -> &SafetyGate {
        &self.gate
    }

    pub fn classifier(&self) -> &ComplexityClassifier {
        &self.classifier
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Run one query to a terminal state.
    ///
    /// Safety rejections are successful responses in state `Rejected`;
    /// errors are reserved for generation failures and timeouts. Dropping
    /// the returned future abandons the query without touching the cache.
    pub async fn process(&self, query: impl Into<Query>) -> Result<PipelineResponse> {
        self.run(query.into(), None).await
    }

    /// Like [`process`](Self::process), but stops with
    /// [`HuginnError::Cancelled`] once `token` is cancelled.
    ///
    /// The token is checked before every transition and raced against the
    /// generation call.
    pub async fn process_with_cancel(
        &self,
        query: impl Into<Query>,
        token: &CancellationToken,
    ) -> Result<PipelineResponse> {
        self.run(query.into(), Some(token)).await
    }

    /// Run a query and return only the text.
    ///
    /// A rejected input becomes [`HuginnError::InputRejected`]; a blocked
    /// output becomes [`HuginnError::OutputFlagged`].
    pub async fn answer(&self, query: impl Into<Query>) -> Result<String> {
        let response = self.process(query).await?;
        if !response.is_rejected() {
            return Ok(response.content);
        }
        match response.output_verdict {
            Some(verdict) if !verdict.passed => {
                Err(HuginnError::OutputFlagged(verdict.descriptions()))
            }
            _ => Err(HuginnError::InputRejected(
                response.input_verdict.descriptions(),
            )),
        }
    }

    /// Process many queries with at most `max_concurrent` in flight.
    ///
    /// Results come back in input order.
    pub async fn process_all(
        self: Arc<Self>,
        queries: Vec<Query>,
    ) -> Vec<Result<PipelineResponse>> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let handles: Vec<_> = queries
            .into_iter()
            .map(|query| {
                let pipeline = Arc::clone(&self);
                let permits = Arc::clone(&permits);
                tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|_| HuginnError::Cancelled)?;
                    pipeline.process(query).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(HuginnError::Cancelled),
                Err(e) => Err(HuginnError::GenerationFailed {
                    message: format!("worker panicked: {e}"),
                    source: None,
                }),
            });
        }
        results
    }

    #[instrument(name = "pipeline.process", skip_all, fields(query_len = query.text.len()))]
    async fn run(&self, query: Query, cancel: Option<&CancellationToken>) -> Result<PipelineResponse> {
        let mut run = Run::new(cancel);
        self.metrics.record_query();
        ::metrics::counter!(telemetry::QUERIES_TOTAL).increment(1);
        run.enter(QueryState::Received)?;

        let input_verdict = self.gate.check_input(&query.text);
        run.enter(QueryState::InputChecked)?;
        if !input_verdict.passed {
            self.metrics.record_input_rejection();
            debug!(issues = ?input_verdict.descriptions(), "input rejected");
            run.enter(QueryState::Rejected)?;
            return Ok(self.finish(
                run,
                self.config.rejection_message.clone(),
                ResponseSource::Guardrail,
                input_verdict,
                None,
                None,
                false,
            ));
        }

        let hit = self.cache.lookup(&query.text).await;
        run.enter(QueryState::CacheChecked)?;
        if let Some(hit) = hit {
            self.metrics.record_cache_hit();
            debug!(similarity = hit.similarity, "cache hit");
            run.enter(QueryState::Resolved)?;
            return Ok(self.finish(
                run,
                hit.response,
                ResponseSource::Cache {
                    similarity: hit.similarity,
                },
                input_verdict,
                None,
                None,
                false,
            ));
        }
        self.metrics.record_cache_miss();

        let context_tokens = query.context.as_deref().map_or(0, estimate_tokens);
        let score = self.classifier.classify(&query.text, context_tokens);
        run.enter(QueryState::Classified)?;

        let routing = self.router.route(&score);
        run.enter(QueryState::Routed)?;

        let text = self.generate(&query, &routing, cancel).await?;
        run.enter(QueryState::Generated)?;

        let output_verdict = self.gate.check_output(&text);
        run.enter(QueryState::OutputChecked)?;

        if !output_verdict.passed {
            self.metrics.record_output_flag();
            match self.config.output_policy {
                OutputPolicy::Log => {
                    warn!(issues = ?output_verdict.descriptions(), "output flagged by safety gate");
                }
                OutputPolicy::Block => {
                    warn!(issues = ?output_verdict.descriptions(), "output blocked by safety gate");
                    run.enter(QueryState::Rejected)?;
                    return Ok(self.finish(
                        run,
                        self.config.rejection_message.clone(),
                        ResponseSource::Guardrail,
                        input_verdict,
                        Some(output_verdict),
                        Some(routing),
                        true,
                    ));
                }
            }
        } else if let Err(e) = self.cache.insert(&query.text, text.clone()).await {
            warn!(error = %e, "failed to cache response");
        }

        let flagged = !output_verdict.passed;
        run.enter(QueryState::Resolved)?;
        Ok(self.finish(
            run,
            text,
            ResponseSource::Generated,
            input_verdict,
            Some(output_verdict),
            Some(routing),
            flagged,
        ))
    }

    /// Render the prompt and call the backend under the generation timeout.
    async fn generate(
        &self,
        query: &Query,
        routing: &RoutingDecision,
        cancel: Option<&CancellationToken>,
    ) -> Result<String> {
        let messages = self.render(query)?;
        let mut options = GenerateOptions::for_route(routing);
        if options.temperature.is_none() {
            options.temperature = self.config.temperature;
        }

        let timeout = self.config.generation_timeout;
        let started = Instant::now();
        let call = tokio::time::timeout(timeout, self.backend.generate(&messages, &options));
        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(HuginnError::Cancelled),
                outcome = call => outcome,
            },
            None => call.await,
        };
        ::metrics::histogram!(
            telemetry::GENERATION_DURATION_SECONDS,
            "tier" => routing.tier.as_str()
        )
        .record(started.elapsed().as_secs_f64());

        let result = match outcome {
            Err(_) => Err(HuginnError::GenerationTimeout(timeout)),
            Ok(Err(e)) => Err(HuginnError::generation(self.backend.name(), e)),
            Ok(Ok(response)) => Ok(response.text),
        };
        if let Err(e) = &result {
            self.metrics.record_generation_failure();
            ::metrics::counter!(telemetry::GENERATION_FAILURES_TOTAL).increment(1);
            warn!(error = %e, tier = %routing.tier, "generation failed");
        }
        result
    }

    fn render(&self, query: &Query) -> Result<Vec<Message>> {
        let vars = HashMap::from([
            ("query".to_string(), query.text.clone()),
            (
                "context".to_string(),
                query.context.clone().unwrap_or_default(),
            ),
        ]);
        self.template.render(&vars)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        run: Run<'_>,
        content: String,
        source: ResponseSource,
        input_verdict: GuardrailVerdict,
        output_verdict: Option<GuardrailVerdict>,
        routing: Option<RoutingDecision>,
        flagged: bool,
    ) -> PipelineResponse {
        let latency = run.started.elapsed();
        let state = run.trace.last().copied().unwrap_or(QueryState::Received);
        self.metrics.record_completion(latency);
        ::metrics::histogram!(telemetry::QUERY_DURATION_SECONDS, "state" => state.as_str())
            .record(latency.as_secs_f64());
        PipelineResponse {
            content,
            state,
            source,
            input_verdict,
            output_verdict,
            routing,
            trace: run.trace,
            latency,
            flagged,
        }
    }
}
