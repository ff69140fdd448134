//! Provider reliability aggregation.
//!
//! Every attempt made by every fetch is appended to one shared log. Reports
//! are computed fresh from the log under the same lock that guards appends,
//! so a snapshot never observes a partially recorded attempt.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use super::diagnostics::{as_millis, AttemptOutcome, FetchAttempt};

struct AttemptLog {
    attempts: VecDeque<FetchAttempt>,
    capacity: Option<usize>,
    total_recorded: u64,
}

/// Append-only, thread-safe attempt log with on-demand aggregates.
pub struct ReliabilityAggregator {
    log: Mutex<AttemptLog>,
}

impl Default for ReliabilityAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReliabilityAggregator {
    /// Unbounded log.
    pub fn new() -> Self {
        Self {
            log: Mutex::new(AttemptLog {
                attempts: VecDeque::new(),
                capacity: None,
                total_recorded: 0,
            }),
        }
    }

    /// Log keeping only the most recent `capacity` attempts.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            log: Mutex::new(AttemptLog {
                attempts: VecDeque::with_capacity(capacity),
                capacity: Some(capacity),
                total_recorded: 0,
            }),
        }
    }

    /// Lock the log, recovering from poison if necessary.
    ///
    /// Each mutation is a single push (plus an optional pop), so a panic in
    /// another holder cannot leave a half-written attempt behind.
    fn lock_log(&self) -> MutexGuard<'_, AttemptLog> {
        self.log.lock().unwrap_or_else(|poisoned| {
            warn!("Reliability log mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Append one attempt.
    pub fn record(&self, attempt: FetchAttempt) {
        let mut log = self.lock_log();
        if let Some(capacity) = log.capacity {
            while log.attempts.len() >= capacity {
                log.attempts.pop_front();
            }
        }
        log.attempts.push_back(attempt);
        log.total_recorded += 1;
    }

    /// Attempts currently held.
    pub fn len(&self) -> usize {
        self.lock_log().attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attempts ever recorded, including ones evicted from a bounded log.
    pub fn total_recorded(&self) -> u64 {
        self.lock_log().total_recorded
    }

    /// Copy of the held attempts, oldest first.
    pub fn attempts(&self) -> Vec<FetchAttempt> {
        self.lock_log().attempts.iter().cloned().collect()
    }

    /// Aggregate the log, optionally restricted to one provider.
    pub fn snapshot(&self, provider: Option<&str>) -> ReliabilitySnapshot {
        let log = self.lock_log();

        let mut grouped: BTreeMap<String, Vec<&FetchAttempt>> = BTreeMap::new();
        let mut attempt_count = 0usize;
        for attempt in &log.attempts {
            if provider.is_some_and(|p| !attempt.provider.eq_ignore_ascii_case(p)) {
                continue;
            }
            attempt_count += 1;
            grouped
                .entry(attempt.provider.to_string())
                .or_default()
                .push(attempt);
        }

        let providers = grouped
            .into_iter()
            .map(|(provider, attempts)| ProviderReliability::from_attempts(provider, &attempts))
            .collect::<Vec<_>>();

        debug!(
            "Reliability snapshot over {} attempt(s), {} provider(s)",
            attempt_count,
            providers.len()
        );

        ReliabilitySnapshot {
            taken_at: Utc::now(),
            attempt_count,
            total_recorded: log.total_recorded,
            providers,
        }
    }
}

/// Latency distribution of the attempts that reached the network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyStats {
    #[serde(rename = "minMs", serialize_with = "as_millis")]
    pub min: Duration,
    #[serde(rename = "meanMs", serialize_with = "as_millis")]
    pub mean: Duration,
    #[serde(rename = "medianMs", serialize_with = "as_millis")]
    pub median: Duration,
    #[serde(rename = "maxMs", serialize_with = "as_millis")]
    pub max: Duration,
}

impl LatencyStats {
    fn from_samples(mut samples: Vec<Duration>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort();
        let n = samples.len();
        let total: Duration = samples.iter().sum();
        let median = if n % 2 == 1 {
            samples[n / 2]
        } else {
            (samples[n / 2 - 1] + samples[n / 2]) / 2
        };
        Some(Self {
            min: samples[0],
            mean: total / n as u32,
            median,
            max: samples[n - 1],
        })
    }
}

/// Aggregates for one provider.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReliability {
    pub provider: String,
    pub attempts: usize,
    pub successes: usize,
    /// `successes / eligible`, where unsupported attempts are not eligible.
    pub success_rate: f64,
    /// `None` when no attempt reached the network.
    pub latency: Option<LatencyStats>,
    /// Mean over attempts that were scored.
    pub mean_quality: Option<f64>,
    pub outcomes: BTreeMap<AttemptOutcome, usize>,
    /// Distinct symbols attempted.
    pub symbols: usize,
}

impl ProviderReliability {
    fn from_attempts(provider: String, attempts: &[&FetchAttempt]) -> Self {
        let successes = attempts.iter().filter(|a| a.outcome.is_success()).count();

        // Unsupported attempts never reached the network.
        let eligible: Vec<&FetchAttempt> = attempts
            .iter()
            .copied()
            .filter(|a| a.outcome != AttemptOutcome::Unsupported)
            .collect();
        let latencies = eligible.iter().map(|a| a.latency).collect();

        let qualities: Vec<f64> = attempts.iter().filter_map(|a| a.quality).collect();
        let mean_quality = if qualities.is_empty() {
            None
        } else {
            Some(qualities.iter().sum::<f64>() / qualities.len() as f64)
        };

        let mut outcomes = BTreeMap::new();
        for attempt in attempts {
            *outcomes.entry(attempt.outcome).or_insert(0) += 1;
        }

        let symbols = attempts
            .iter()
            .map(|a| a.symbol.to_string())
            .collect::<BTreeSet<_>>()
            .len();

        Self {
            provider,
            attempts: attempts.len(),
            successes,
            success_rate: if eligible.is_empty() {
                0.0
            } else {
                successes as f64 / eligible.len() as f64
            },
            latency: LatencyStats::from_samples(latencies),
            mean_quality,
            outcomes,
            symbols,
        }
    }
}

/// Point-in-time view of the attempt log.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReliabilitySnapshot {
    pub taken_at: DateTime<Utc>,
    /// Attempts covered by this snapshot.
    pub attempt_count: usize,
    /// Attempts ever recorded by the aggregator.
    pub total_recorded: u64,
    /// Sorted by provider id.
    pub providers: Vec<ProviderReliability>,
}

impl ReliabilitySnapshot {
    pub fn provider(&self, id: &str) -> Option<&ProviderReliability> {
        self.providers
            .iter()
            .find(|p| p.provider.eq_ignore_ascii_case(id))
    }

    /// Providers from most to least recommendable: success rate, then mean
    /// quality, then median latency.
    pub fn ranked(&self) -> Vec<&ProviderReliability> {
        let mut ranked: Vec<&ProviderReliability> = self.providers.iter().collect();
        ranked.sort_by(|a, b| {
            b.success_rate
                .total_cmp(&a.success_rate)
                .then_with(|| {
                    b.mean_quality
                        .unwrap_or(-1.0)
                        .total_cmp(&a.mean_quality.unwrap_or(-1.0))
                })
                .then_with(|| {
                    let median = |p: &ProviderReliability| p.latency.map(|l| l.median);
                    match (median(a), median(b)) {
                        (Some(x), Some(y)) => x.cmp(&y),
                        (Some(_), None) => std::cmp::Ordering::Less,
                        (None, Some(_)) => std::cmp::Ordering::Greater,
                        (None, None) => std::cmp::Ordering::Equal,
                    }
                })
        });
        ranked
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::sync::Arc;

    use super::*;
    use crate::models::{QuoteKind, RecordKind};

    fn attempt(
        provider: &'static str,
        symbol: &str,
        outcome: AttemptOutcome,
        latency_ms: u64,
        quality: Option<f64>,
    ) -> FetchAttempt {
        FetchAttempt {
            provider: Cow::Borrowed(provider),
            symbol: symbol.parse().unwrap(),
            kind: RecordKind::Quote(QuoteKind::Realtime),
            outcome,
            latency: Duration::from_millis(latency_ms),
            quality,
            detail: None,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_per_provider_aggregates() {
        let aggregator = ReliabilityAggregator::new();
        aggregator.record(attempt("SINA", "sz000498", AttemptOutcome::Success, 100, Some(1.0)));
        aggregator.record(attempt("SINA", "sh600000", AttemptOutcome::Success, 300, Some(0.8)));
        aggregator.record(attempt("SINA", "sz000498", AttemptOutcome::TransportError, 200, None));
        aggregator.record(attempt("TENCENT", "sz000498", AttemptOutcome::FormatError, 50, None));

        let snapshot = aggregator.snapshot(None);
        assert_eq!(snapshot.attempt_count, 4);

        let sina = snapshot.provider("SINA").unwrap();
        assert_eq!(sina.attempts, 3);
        assert_eq!(sina.successes, 2);
        assert!((sina.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((sina.mean_quality.unwrap() - 0.9).abs() < 1e-9);
        assert_eq!(sina.symbols, 2);
        let latency = sina.latency.unwrap();
        assert_eq!(latency.min, Duration::from_millis(100));
        assert_eq!(latency.median, Duration::from_millis(200));
        assert_eq!(latency.mean, Duration::from_millis(200));
        assert_eq!(latency.max, Duration::from_millis(300));
        assert_eq!(sina.outcomes[&AttemptOutcome::TransportError], 1);

        let tencent = snapshot.provider("TENCENT").unwrap();
        assert_eq!(tencent.success_rate, 0.0);
        assert_eq!(tencent.mean_quality, None);
    }

    #[test]
    fn test_snapshot_filtered_by_provider() {
        let aggregator = ReliabilityAggregator::new();
        aggregator.record(attempt("SINA", "sz000498", AttemptOutcome::Success, 10, Some(1.0)));
        aggregator.record(attempt("TENCENT", "sz000498", AttemptOutcome::Success, 10, Some(1.0)));

        let snapshot = aggregator.snapshot(Some("tencent"));
        assert_eq!(snapshot.attempt_count, 1);
        assert_eq!(snapshot.providers.len(), 1);
        assert_eq!(snapshot.providers[0].provider, "TENCENT");
        assert_eq!(snapshot.total_recorded, 2);
    }

    #[test]
    fn test_bounded_log_evicts_oldest() {
        let aggregator = ReliabilityAggregator::with_capacity(2);
        aggregator.record(attempt("SINA", "sz000498", AttemptOutcome::TransportError, 10, None));
        aggregator.record(attempt("SINA", "sz000498", AttemptOutcome::Success, 10, Some(1.0)));
        aggregator.record(attempt("SINA", "sz000498", AttemptOutcome::Success, 10, Some(1.0)));

        assert_eq!(aggregator.len(), 2);
        assert_eq!(aggregator.total_recorded(), 3);
        let snapshot = aggregator.snapshot(None);
        assert_eq!(snapshot.provider("SINA").unwrap().success_rate, 1.0);
    }

    #[test]
    fn test_unsupported_attempts_excluded_from_latency() {
        let aggregator = ReliabilityAggregator::new();
        aggregator.record(attempt("SINA", "sz000498", AttemptOutcome::Unsupported, 0, None));
        let snapshot = aggregator.snapshot(None);
        let sina = snapshot.provider("SINA").unwrap();
        assert_eq!(sina.latency, None);
        assert_eq!(sina.success_rate, 0.0);
    }

    #[test]
    fn test_unsupported_attempts_excluded_from_success_rate() {
        let aggregator = ReliabilityAggregator::new();
        aggregator.record(attempt("SINA_CENTER", "sz000498", AttemptOutcome::Unsupported, 0, None));
        aggregator.record(attempt("SINA_CENTER", "sz000498", AttemptOutcome::Unsupported, 0, None));
        aggregator.record(attempt("SINA_CENTER", "sz000498", AttemptOutcome::Success, 120, Some(1.0)));
        aggregator.record(attempt("TENCENT", "sz000498", AttemptOutcome::Success, 80, Some(1.0)));
        aggregator.record(attempt("TENCENT", "sz000498", AttemptOutcome::FormatError, 80, None));

        let snapshot = aggregator.snapshot(None);
        let center = snapshot.provider("SINA_CENTER").unwrap();
        assert_eq!(center.attempts, 3);
        assert_eq!(center.success_rate, 1.0);
        assert_eq!(center.outcomes[&AttemptOutcome::Unsupported], 2);

        let order: Vec<&str> = snapshot.ranked().iter().map(|p| p.provider.as_str()).collect();
        assert_eq!(order, vec!["SINA_CENTER", "TENCENT"]);
    }

    #[test]
    fn test_ranked_by_success_then_quality_then_latency() {
        let aggregator = ReliabilityAggregator::new();
        aggregator.record(attempt("SLOW", "sz000498", AttemptOutcome::Success, 900, Some(1.0)));
        aggregator.record(attempt("FAST", "sz000498", AttemptOutcome::Success, 100, Some(1.0)));
        aggregator.record(attempt("ROUGH", "sz000498", AttemptOutcome::Success, 50, Some(0.6)));
        aggregator.record(attempt("FLAKY", "sz000498", AttemptOutcome::Success, 10, Some(1.0)));
        aggregator.record(attempt("FLAKY", "sz000498", AttemptOutcome::TransportError, 10, None));

        let snapshot = aggregator.snapshot(None);
        let order: Vec<&str> = snapshot.ranked().iter().map(|p| p.provider.as_str()).collect();
        assert_eq!(order, vec!["FAST", "SLOW", "ROUGH", "FLAKY"]);
    }

    #[test]
    fn test_concurrent_writers_lose_nothing() {
        let aggregator = Arc::new(ReliabilityAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        aggregator.record(attempt(
                            "SINA",
                            "sz000498",
                            AttemptOutcome::Success,
                            1,
                            Some(1.0),
                        ));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(aggregator.snapshot(None).attempt_count, 2000);
    }
}
