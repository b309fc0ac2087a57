//! In-process pipeline counters.
//!
//! [`PipelineMetrics`] is shared by the pipeline and the router through an
//! `Arc`. Counters are relaxed atomics: each is individually exact, but a
//! snapshot taken during traffic is not a consistent cut across counters.
//! Nothing is ever reset.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::GenerationTier;

/// Process-wide counters for the query pipeline.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    total_queries: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    guardrail_triggers: AtomicU64,
    input_rejections: AtomicU64,
    output_flags: AtomicU64,
    generation_failures: AtomicU64,
    routes: [AtomicU64; 2],
    completed: AtomicU64,
    latency_micros: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_query(&self) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_input_rejection(&self) {
        self.guardrail_triggers.fetch_add(1, Ordering::Relaxed);
        self.input_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_output_flag(&self) {
        self.guardrail_triggers.fetch_add(1, Ordering::Relaxed);
        self.output_flags.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_generation_failure(&self) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_route(&self, tier: GenerationTier) {
        self.routes[tier.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Record the latency of a query that reached a terminal state.
    pub(crate) fn record_completion(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency_micros.fetch_add(micros, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Queries routed to `tier` so far.
    pub fn routes(&self, tier: GenerationTier) -> u64 {
        self.routes[tier.index()].load(Ordering::Relaxed)
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);

        let cache_hits = load(&self.cache_hits);
        let cache_misses = load(&self.cache_misses);
        let lookups = cache_hits + cache_misses;
        let completed = load(&self.completed);
        let latency_micros = load(&self.latency_micros);

        MetricsSnapshot {
            total_queries: load(&self.total_queries),
            cache_hits,
            cache_misses,
            cache_hit_rate: if lookups > 0 {
                cache_hits as f64 / lookups as f64
            } else {
                0.0
            },
            guardrail_triggers: load(&self.guardrail_triggers),
            input_rejections: load(&self.input_rejections),
            output_flags: load(&self.output_flags),
            generation_failures: load(&self.generation_failures),
            fast_routes: self.routes(GenerationTier::Fast),
            smart_routes: self.routes(GenerationTier::Smart),
            completed,
            average_latency_ms: if completed > 0 {
                latency_micros as f64 / completed as f64 / 1000.0
            } else {
                0.0
            },
        }
    }
}

/// Read-only copy of [`PipelineMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Hits over lookups; 0.0 before the first lookup.
    pub cache_hit_rate: f64,
    /// Input rejections plus output flags.
    pub guardrail_triggers: u64,
    pub input_rejections: u64,
    pub output_flags: u64,
    pub generation_failures: u64,
    pub fast_routes: u64,
    pub smart_routes: u64,
    /// Queries that reached a terminal state (resolved or rejected).
    pub completed: u64,
    pub average_latency_ms: f64,
}
