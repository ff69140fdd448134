//! Bounded worker pool over independent symbols.
//!
//! Different symbols are fetched concurrently, at most `max_concurrency` at
//! a time; each symbol's provider list is still walked sequentially by the
//! orchestrator. The pool size is the only backpressure.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::info;

use super::orchestrator::{FailoverOrchestrator, Fetched};
use super::reliability::{ReliabilityAggregator, ReliabilitySnapshot};
use crate::config::{EngineConfig, PoolConfig};
use crate::errors::MarketDataError;
use crate::models::{BarPeriod, CanonicalQuote, KlineSeries, QuoteKind, Symbol};
use crate::provider::{HttpTransport, ProviderDescriptor};

/// Outcome of one symbol's logical fetch.
pub type SymbolResult<T> = (Symbol, Result<Fetched<T>, MarketDataError>);

pub struct FetchPool {
    orchestrator: Arc<FailoverOrchestrator>,
    config: PoolConfig,
}

impl FetchPool {
    pub fn new(orchestrator: Arc<FailoverOrchestrator>, config: PoolConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// HTTP transport, shared aggregator and orchestrator wired from `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        let aggregator = match config.history_capacity {
            Some(capacity) => ReliabilityAggregator::with_capacity(capacity),
            None => ReliabilityAggregator::new(),
        };
        let orchestrator = FailoverOrchestrator::new(
            Arc::new(HttpTransport::new(&config.transport)),
            config.policy.clone(),
        )
        .with_aggregator(Arc::new(aggregator));

        Self::new(Arc::new(orchestrator), config.pool.clone())
    }

    pub fn orchestrator(&self) -> &Arc<FailoverOrchestrator> {
        &self.orchestrator
    }

    pub fn aggregator(&self) -> Option<&Arc<ReliabilityAggregator>> {
        self.orchestrator.aggregator()
    }

    /// Reliability snapshot of the attached aggregator, if any.
    pub fn snapshot(&self, provider: Option<&str>) -> Option<ReliabilitySnapshot> {
        self.aggregator().map(|a| a.snapshot(provider))
    }

    fn width(&self) -> usize {
        self.config.max_concurrency.max(1)
    }

    /// One quote fetch per symbol. Results come back in input order.
    pub async fn fetch_quotes(
        &self,
        symbols: &[Symbol],
        kind: QuoteKind,
        providers: &[&ProviderDescriptor],
        threshold: f64,
    ) -> Vec<SymbolResult<CanonicalQuote>> {
        info!(
            "Fetching {:?} quotes for {} symbol(s), {} at a time",
            kind,
            symbols.len(),
            self.width()
        );
        let orchestrator = &self.orchestrator;
        let mut results: Vec<(usize, SymbolResult<CanonicalQuote>)> =
            stream::iter(symbols.iter().enumerate())
                .map(|(index, symbol)| async move {
                    let result = orchestrator
                        .fetch_quote(symbol, kind, providers, threshold)
                        .await;
                    (index, (symbol.clone(), result))
                })
                .buffer_unordered(self.width())
                .collect()
                .await;
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// One bar fetch per symbol. Results come back in input order.
    pub async fn fetch_bars(
        &self,
        symbols: &[Symbol],
        period: BarPeriod,
        span: usize,
        providers: &[&ProviderDescriptor],
    ) -> Vec<SymbolResult<KlineSeries>> {
        info!(
            "Fetching {:?} bars (span {}) for {} symbol(s), {} at a time",
            period,
            span,
            symbols.len(),
            self.width()
        );
        let orchestrator = &self.orchestrator;
        let mut results: Vec<(usize, SymbolResult<KlineSeries>)> =
            stream::iter(symbols.iter().enumerate())
                .map(|(index, symbol)| async move {
                    let result = orchestrator
                        .fetch_bars(symbol, period, span, providers)
                        .await;
                    (index, (symbol.clone(), result))
                })
                .buffer_unordered(self.width())
                .collect()
                .await;
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}
