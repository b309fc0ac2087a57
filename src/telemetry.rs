//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! These complement [`PipelineMetrics`](crate::PipelineMetrics), which keeps
//! in-process atomic counters readable without any recorder.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `state`: pipeline state entered (e.g. "cache_checked", "resolved")
//! - `tier`: generation tier: "fast" or "smart"
//! - `direction`: guardrail direction: "input" or "output"
//! - `reason`: eviction reason: "expired" or "lru"

/// Total queries received by the pipeline.
pub const QUERIES_TOTAL: &str = "huginn_queries_total";

/// Total state transitions.
///
/// Labels: `state`.
pub const TRANSITIONS_TOTAL: &str = "huginn_transitions_total";

/// End-to-end query duration in seconds.
///
/// Labels: `state` (terminal state: "resolved" | "rejected").
pub const QUERY_DURATION_SECONDS: &str = "huginn_query_duration_seconds";

/// Total semantic cache hits.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total semantic cache misses (including fail-open misses).
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Total lookups that degraded to a miss because of an internal error.
pub const CACHE_ERRORS_TOTAL: &str = "huginn_cache_errors_total";

/// Total semantic cache evictions.
///
/// Labels: `reason` ("expired" | "lru").
pub const CACHE_EVICTIONS_TOTAL: &str = "huginn_cache_evictions_total";

/// Total routing decisions.
///
/// Labels: `tier`.
pub const ROUTES_TOTAL: &str = "huginn_routes_total";

/// Total guardrail verdicts with at least one issue.
///
/// Labels: `direction`.
pub const GUARDRAIL_TRIGGERS_TOTAL: &str = "huginn_guardrail_triggers_total";

/// Total failed or timed-out generation calls.
pub const GENERATION_FAILURES_TOTAL: &str = "huginn_generation_failures_total";

/// Generation backend call duration in seconds.
///
/// Labels: `tier`.
pub const GENERATION_DURATION_SECONDS: &str = "huginn_generation_duration_seconds";
