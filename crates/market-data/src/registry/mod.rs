//! Fetch orchestration module.
//!
//! This module runs logical fetches and keeps score of how providers behave:
//! - Quality scoring of parsed records
//! - Failover across an ordered provider list with per-attempt diagnostics
//! - Process-wide reliability aggregation over every attempt
//! - A bounded worker pool for fetching many symbols at once

mod diagnostics;
mod orchestrator;
mod pool;
mod quality;
mod reliability;

pub use diagnostics::{AttemptOutcome, FetchAttempt, FetchDiagnostics};
pub use orchestrator::{FailoverOrchestrator, Fetched};
pub use pool::{FetchPool, SymbolResult};
pub use quality::{CheckWeights, QualityScore, QualityScorer, ScorerConfig};
pub use reliability::{LatencyStats, ProviderReliability, ReliabilityAggregator, ReliabilitySnapshot};
