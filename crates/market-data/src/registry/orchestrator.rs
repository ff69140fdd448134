//! Failover orchestration.
//!
//! One logical fetch (one symbol, one record kind) walks the caller's
//! provider list strictly in order:
//!
//! ```text
//! START -> TRY(i) -> transport -> parse -> score -> SUCCESS(i)
//!            |          |          |        |
//!            +----------+----------+--------+--> record attempt, TRY(i+1)
//!                                                 ... -> EXHAUSTED
//! ```
//!
//! Every provider tried produces exactly one [`FetchAttempt`], appended to
//! the fetch's [`FetchDiagnostics`] and to the shared
//! [`ReliabilityAggregator`] when one is attached. A provider that fails is
//! not retried within the same fetch; listing it twice asks for a retry.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::diagnostics::{AttemptOutcome, FetchAttempt, FetchDiagnostics};
use super::quality::{QualityScore, QualityScorer};
use super::reliability::ReliabilityAggregator;
use crate::adapter;
use crate::config::FetchPolicy;
use crate::errors::MarketDataError;
use crate::models::{
    BarPeriod, CanonicalQuote, Charset, KlineSeries, ProviderId, QuoteKind, RawPayload,
    RecordKind, Symbol,
};
use crate::provider::{ProviderDescriptor, Transport, TransportRequest};

/// An accepted record with the evidence behind it.
#[derive(Clone, Debug)]
pub struct Fetched<T> {
    pub record: T,
    pub quality: QualityScore,
    /// Provider that produced `record`.
    pub provider: ProviderId,
    /// Every attempt of this fetch, the accepted one last.
    pub diagnostics: FetchDiagnostics,
}

/// What differs between a quote fetch and a bar fetch.
trait FetchPlan {
    type Record;

    fn kind(&self) -> RecordKind;

    /// URL and charset for this provider, `None` if it does not serve the kind.
    fn request(&self, provider: &ProviderDescriptor, symbol: &Symbol) -> Option<(String, Charset)>;

    fn parse(
        &self,
        provider: &ProviderDescriptor,
        payload: &RawPayload,
    ) -> Result<Self::Record, MarketDataError>;

    fn score(&self, scorer: &QualityScorer, record: &Self::Record) -> QualityScore;
}

struct QuotePlan {
    kind: QuoteKind,
}

impl FetchPlan for QuotePlan {
    type Record = CanonicalQuote;

    fn kind(&self) -> RecordKind {
        RecordKind::Quote(self.kind)
    }

    fn request(&self, provider: &ProviderDescriptor, symbol: &Symbol) -> Option<(String, Charset)> {
        provider
            .quote_source(self.kind)
            .map(|source| (source.url(symbol), source.charset))
    }

    fn parse(
        &self,
        provider: &ProviderDescriptor,
        payload: &RawPayload,
    ) -> Result<CanonicalQuote, MarketDataError> {
        let source = provider
            .quote_source(self.kind)
            .ok_or_else(|| unsupported(provider, self.kind()))?;
        adapter::parse_quote(payload, &source.shape, source.mapping)
    }

    fn score(&self, scorer: &QualityScorer, record: &CanonicalQuote) -> QualityScore {
        scorer.score_quote(record, self.kind)
    }
}

struct BarPlan {
    period: BarPeriod,
    span: usize,
}

impl FetchPlan for BarPlan {
    type Record = KlineSeries;

    fn kind(&self) -> RecordKind {
        RecordKind::Bars(self.period)
    }

    fn request(&self, provider: &ProviderDescriptor, symbol: &Symbol) -> Option<(String, Charset)> {
        provider
            .bar_source(self.period)
            .map(|(source, code)| (source.url(symbol, code, self.span), source.charset))
    }

    fn parse(
        &self,
        provider: &ProviderDescriptor,
        payload: &RawPayload,
    ) -> Result<KlineSeries, MarketDataError> {
        let (source, code) = provider
            .bar_source(self.period)
            .ok_or_else(|| unsupported(provider, self.kind()))?;
        adapter::parse_bars(
            payload,
            &source.shape,
            source.mapping,
            self.period,
            code,
            self.span,
        )
    }

    fn score(&self, scorer: &QualityScorer, record: &KlineSeries) -> QualityScore {
        scorer.score_bars(record)
    }
}

fn unsupported(provider: &ProviderDescriptor, kind: RecordKind) -> MarketDataError {
    MarketDataError::Unsupported {
        provider: provider.id.to_string(),
        kind: kind.to_string(),
    }
}

/// Runs logical fetches across ordered provider lists.
pub struct FailoverOrchestrator {
    transport: Arc<dyn Transport>,
    scorer: QualityScorer,
    policy: FetchPolicy,
    aggregator: Option<Arc<ReliabilityAggregator>>,
    cancel: CancellationToken,
}

impl FailoverOrchestrator {
    pub fn new(transport: Arc<dyn Transport>, policy: FetchPolicy) -> Self {
        Self {
            transport,
            scorer: QualityScorer::new(),
            policy,
            aggregator: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Feed every attempt into `aggregator`.
    pub fn with_aggregator(mut self, aggregator: Arc<ReliabilityAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn with_scorer(mut self, scorer: QualityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Honor `token` before each provider attempt.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels fetches run by this orchestrator.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub fn aggregator(&self) -> Option<&Arc<ReliabilityAggregator>> {
        self.aggregator.as_ref()
    }

    /// Fetch one quote, accepting the first record whose score meets
    /// `threshold` (and is above zero).
    pub async fn fetch_quote(
        &self,
        symbol: &Symbol,
        kind: QuoteKind,
        providers: &[&ProviderDescriptor],
        threshold: f64,
    ) -> Result<Fetched<CanonicalQuote>, MarketDataError> {
        self.run(&QuotePlan { kind }, symbol, providers, threshold).await
    }

    /// Fetch the most recent `span` bars of `period`, accepted under the
    /// policy's quality threshold.
    pub async fn fetch_bars(
        &self,
        symbol: &Symbol,
        period: BarPeriod,
        span: usize,
        providers: &[&ProviderDescriptor],
    ) -> Result<Fetched<KlineSeries>, MarketDataError> {
        self.run(
            &BarPlan { period, span },
            symbol,
            providers,
            self.policy.quality_threshold,
        )
        .await
    }

    async fn run<P: FetchPlan>(
        &self,
        plan: &P,
        symbol: &Symbol,
        providers: &[&ProviderDescriptor],
        threshold: f64,
    ) -> Result<Fetched<P::Record>, MarketDataError> {
        let kind = plan.kind();
        let mut diagnostics = FetchDiagnostics::new();
        let mut requested = false;

        for provider in providers {
            if self.cancel.is_cancelled() {
                warn!(
                    "Fetch of {} {} cancelled after {} attempt(s)",
                    symbol,
                    kind,
                    diagnostics.attempts.len()
                );
                return Err(MarketDataError::Cancelled(diagnostics));
            }

            let provider_id: ProviderId = Cow::Borrowed(provider.id);

            let Some((url, charset)) = plan.request(provider, symbol) else {
                debug!("Provider '{}' does not serve {}, skipping", provider_id, kind);
                let error = unsupported(provider, kind);
                self.record(
                    &mut diagnostics,
                    self.attempt(&provider_id, symbol, kind, AttemptOutcome::Unsupported)
                        .detail(error.to_string())
                        .build(),
                );
                continue;
            };

            if requested && !self.policy.inter_attempt_delay.is_zero() {
                if self.pause(self.policy.inter_attempt_delay).await {
                    warn!(
                        "Fetch of {} {} cancelled after {} attempt(s)",
                        symbol,
                        kind,
                        diagnostics.attempts.len()
                    );
                    return Err(MarketDataError::Cancelled(diagnostics));
                }
            }
            requested = true;

            debug!("Fetching {} {} from provider '{}'", symbol, kind, provider_id);

            let started = Instant::now();
            let result = self
                .try_provider(plan, provider, &provider_id, symbol, url, charset, threshold)
                .await;
            let latency = started.elapsed();

            match result {
                Ok((record, quality)) => {
                    self.record(
                        &mut diagnostics,
                        self.attempt(&provider_id, symbol, kind, AttemptOutcome::Success)
                            .latency(latency)
                            .quality(Some(quality.value))
                            .build(),
                    );
                    info!(
                        "Fetched {} {} from '{}' (quality {:.2}). Diagnostics: {}",
                        symbol,
                        kind,
                        provider_id,
                        quality.value,
                        diagnostics.summary()
                    );
                    return Ok(Fetched {
                        record,
                        quality,
                        provider: provider_id,
                        diagnostics,
                    });
                }
                Err((error, quality)) => {
                    let outcome = error
                        .attempt_outcome()
                        .unwrap_or(AttemptOutcome::TransportError);
                    debug!(
                        "Provider '{}' failed for {} {}: {}",
                        provider_id, symbol, kind, error
                    );
                    self.record(
                        &mut diagnostics,
                        self.attempt(&provider_id, symbol, kind, outcome)
                            .latency(latency)
                            .quality(quality)
                            .detail(error.to_string())
                            .build(),
                    );
                }
            }
        }

        warn!(
            "All providers failed for {} {}. Diagnostics: {}",
            symbol,
            kind,
            diagnostics.summary()
        );
        Err(MarketDataError::Exhausted(diagnostics))
    }

    /// One provider attempt: transport, parse, score. The error side carries
    /// the score when the record got that far.
    #[allow(clippy::too_many_arguments)]
    async fn try_provider<P: FetchPlan>(
        &self,
        plan: &P,
        provider: &ProviderDescriptor,
        provider_id: &ProviderId,
        symbol: &Symbol,
        url: String,
        charset: Charset,
        threshold: f64,
    ) -> Result<(P::Record, QualityScore), (MarketDataError, Option<f64>)> {
        let request = TransportRequest {
            provider: provider_id.clone(),
            url,
            referer: provider.referer,
        };
        let response = self
            .transport
            .get(&request)
            .await
            .map_err(|e| (e, None))?;

        if !response.is_success() {
            return Err((
                MarketDataError::Http {
                    provider: provider_id.to_string(),
                    status: response.status,
                },
                None,
            ));
        }

        let payload = RawPayload::new(
            provider_id.clone(),
            symbol.clone(),
            response.status,
            response.body,
            charset,
        );
        let record = plan.parse(provider, &payload).map_err(|e| (e, None))?;

        let quality = plan.score(&self.scorer, &record);
        if !quality.meets(threshold) {
            debug!(
                "Rejecting {} from '{}': {}",
                symbol,
                provider_id,
                quality.issues.join("; ")
            );
            return Err((
                MarketDataError::LowQuality {
                    provider: provider_id.to_string(),
                    score: quality.value,
                    threshold,
                },
                Some(quality.value),
            ));
        }

        Ok((record, quality))
    }

    /// Sleep, returning early with `true` if cancelled meanwhile.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = self.cancel.cancelled() => true,
        }
    }

    fn attempt(
        &self,
        provider: &ProviderId,
        symbol: &Symbol,
        kind: RecordKind,
        outcome: AttemptOutcome,
    ) -> AttemptBuilder {
        AttemptBuilder(FetchAttempt {
            provider: provider.clone(),
            symbol: symbol.clone(),
            kind,
            outcome,
            latency: Duration::ZERO,
            quality: None,
            detail: None,
            at: Utc::now(),
        })
    }

    fn record(&self, diagnostics: &mut FetchDiagnostics, attempt: FetchAttempt) {
        if let Some(aggregator) = &self.aggregator {
            aggregator.record(attempt.clone());
        }
        diagnostics.record(attempt);
    }
}

struct AttemptBuilder(FetchAttempt);

impl AttemptBuilder {
    fn latency(mut self, latency: Duration) -> Self {
        self.0.latency = latency;
        self
    }

    fn quality(mut self, quality: Option<f64>) -> Self {
        self.0.quality = quality;
        self
    }

    fn detail(mut self, detail: String) -> Self {
        self.0.detail = Some(detail);
        self
    }

    fn build(self) -> FetchAttempt {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::provider::catalog::{EASTMONEY, SINA, SINA_CENTER};
    use crate::provider::TransportResponse;

    const VALID_SINA: &str = "var hq_str_sz000498=\"SHANDONGLQ,10.50,10.40,10.55,10.60,10.35,10.54,10.55,1000000,10550000\";\n";

    enum Reply {
        Body(u16, &'static str),
        Fail,
    }

    /// Answers by provider id and remembers the order of calls.
    struct ScriptedTransport {
        replies: HashMap<&'static str, Reply>,
        calls: Mutex<Vec<String>>,
        cancel_on_call: Option<CancellationToken>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<(&'static str, Reply)>) -> Self {
            Self {
                replies: replies.into_iter().collect(),
                calls: Mutex::new(Vec::new()),
                cancel_on_call: None,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(
            &self,
            request: &TransportRequest,
        ) -> Result<TransportResponse, MarketDataError> {
            self.calls.lock().unwrap().push(request.provider.to_string());
            if let Some(token) = &self.cancel_on_call {
                token.cancel();
            }
            match self.replies.get(&*request.provider) {
                Some(Reply::Body(status, body)) => Ok(TransportResponse {
                    status: *status,
                    body: body.as_bytes().to_vec(),
                }),
                _ => Err(MarketDataError::Transport {
                    provider: request.provider.to_string(),
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    fn sina_like(id: &'static str) -> ProviderDescriptor {
        let mut descriptor = SINA.clone();
        descriptor.id = id;
        descriptor
    }

    fn orchestrator(transport: Arc<ScriptedTransport>) -> FailoverOrchestrator {
        FailoverOrchestrator::new(transport, FetchPolicy::immediate())
    }

    fn symbol() -> Symbol {
        "sz000498".parse().unwrap()
    }

    #[tokio::test]
    async fn test_fails_over_in_order_until_valid() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ("A", Reply::Fail),
            ("B", Reply::Body(200, "<html>maintenance</html>")),
            ("C", Reply::Body(200, VALID_SINA)),
        ]));
        let (a, b, c) = (sina_like("A"), sina_like("B"), sina_like("C"));

        let fetched = orchestrator(transport.clone())
            .fetch_quote(&symbol(), QuoteKind::Realtime, &[&a, &b, &c], 0.0)
            .await
            .unwrap();

        assert_eq!(fetched.provider, "C");
        assert_eq!(fetched.record.last, Some(dec!(10.55)));
        assert_eq!(fetched.quality.value, 1.0);

        let outcomes: Vec<_> = fetched
            .diagnostics
            .attempts
            .iter()
            .map(|a| (a.provider.to_string(), a.outcome))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                ("A".to_string(), AttemptOutcome::TransportError),
                ("B".to_string(), AttemptOutcome::FormatError),
                ("C".to_string(), AttemptOutcome::Success),
            ]
        );
        assert_eq!(transport.calls(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_all_failing_is_exhausted_with_every_attempt() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ("A", Reply::Fail),
            ("B", Reply::Body(503, "")),
            ("C", Reply::Body(200, "var hq_str_sz000498=\"\";")),
        ]));
        let (a, b, c) = (sina_like("A"), sina_like("B"), sina_like("C"));

        let err = orchestrator(transport)
            .fetch_quote(&symbol(), QuoteKind::Realtime, &[&a, &b, &c], 0.0)
            .await
            .unwrap_err();

        let MarketDataError::Exhausted(diagnostics) = err else {
            panic!("expected exhausted, got {:?}", err);
        };
        assert_eq!(diagnostics.attempts.len(), 3);
        assert!(!diagnostics.has_success());
        assert_eq!(diagnostics.attempts[1].outcome, AttemptOutcome::TransportError);
        assert_eq!(diagnostics.attempts[1].detail.as_deref(), Some("HTTP 503 from B"));
        assert_eq!(diagnostics.attempts[2].outcome, AttemptOutcome::FormatError);
    }

    #[tokio::test]
    async fn test_below_threshold_moves_on() {
        // Missing turnover and volume: 12 of 15 checks pass.
        const THIN: &str = "var hq_str_sz000498=\"X,10.50,10.40,10.55,10.60,10.35,0,0,,\";";
        let transport = Arc::new(ScriptedTransport::new(vec![
            ("A", Reply::Body(200, THIN)),
            ("B", Reply::Body(200, VALID_SINA)),
        ]));
        let (a, b) = (sina_like("A"), sina_like("B"));

        let fetched = orchestrator(transport)
            .fetch_quote(&symbol(), QuoteKind::Realtime, &[&a, &b], 0.95)
            .await
            .unwrap();

        let first = &fetched.diagnostics.attempts[0];
        assert_eq!(first.outcome, AttemptOutcome::LowQuality);
        assert!(first.quality.unwrap() < 0.95);
        assert_eq!(fetched.provider, "B");
    }

    #[tokio::test]
    async fn test_unsupported_provider_is_recorded_without_a_request() {
        let transport = Arc::new(ScriptedTransport::new(vec![(
            "SINA",
            Reply::Body(200, VALID_SINA),
        )]));

        let fetched = orchestrator(transport.clone())
            .fetch_quote(&symbol(), QuoteKind::Realtime, &[&SINA_CENTER, &SINA], 0.0)
            .await
            .unwrap();

        assert_eq!(
            fetched.diagnostics.attempts[0].outcome,
            AttemptOutcome::Unsupported
        );
        assert_eq!(transport.calls(), vec!["SINA"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_next_attempt() {
        let token = CancellationToken::new();
        let mut transport = ScriptedTransport::new(vec![("B", Reply::Body(200, VALID_SINA))]);
        transport.cancel_on_call = Some(token.clone());
        let transport = Arc::new(transport);
        let (a, b) = (sina_like("A"), sina_like("B"));

        let err = orchestrator(transport.clone())
            .with_cancellation(token)
            .fetch_quote(&symbol(), QuoteKind::Realtime, &[&a, &b], 0.0)
            .await
            .unwrap_err();

        let MarketDataError::Cancelled(diagnostics) = err else {
            panic!("expected cancelled, got {:?}", err);
        };
        // The in-flight attempt completed and was recorded; B never ran.
        assert_eq!(diagnostics.attempts.len(), 1);
        assert_eq!(transport.calls(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_attempts_feed_the_aggregator() {
        let aggregator = Arc::new(ReliabilityAggregator::new());
        let transport = Arc::new(ScriptedTransport::new(vec![
            ("A", Reply::Fail),
            ("B", Reply::Body(200, VALID_SINA)),
        ]));
        let (a, b) = (sina_like("A"), sina_like("B"));

        orchestrator(transport)
            .with_aggregator(aggregator.clone())
            .fetch_quote(&symbol(), QuoteKind::Realtime, &[&a, &b], 0.0)
            .await
            .unwrap();

        let snapshot = aggregator.snapshot(None);
        assert_eq!(snapshot.attempt_count, 2);
        assert_eq!(snapshot.provider("B").unwrap().successes, 1);
        assert_eq!(snapshot.provider("A").unwrap().successes, 0);
    }

    #[tokio::test]
    async fn test_fetch_bars_truncates_to_span() {
        const KLINES: &str = r#"{"rc":0,"data":{"code":"000498","klines":[
            "2024-03-13,9.80,10.00,10.05,9.75,90000,90000000.00,3.06,2.04,0.20,0.61",
            "2024-03-14,10.00,10.10,10.20,9.95,80000,81000000.00,2.50,1.00,0.10,0.54",
            "2024-03-15,10.10,10.40,10.45,10.05,85000,88000000.00,3.96,2.97,0.30,0.57"
        ]}}"#;
        let transport = Arc::new(ScriptedTransport::new(vec![(
            "EASTMONEY",
            Reply::Body(200, KLINES),
        )]));

        let fetched = orchestrator(transport)
            .fetch_bars(&symbol(), BarPeriod::Daily, 2, &[&EASTMONEY])
            .await
            .unwrap();

        assert_eq!(fetched.record.len(), 2);
        assert_eq!(fetched.record.latest().unwrap().close, dec!(10.40));
        assert_eq!(fetched.record.bars[0].volume, dec!(8000000));
        assert_eq!(fetched.quality.value, 1.0);
    }

    #[tokio::test]
    async fn test_empty_provider_list_is_exhausted() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let err = orchestrator(transport)
            .fetch_quote(&symbol(), QuoteKind::Realtime, &[], 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::Exhausted(d) if d.attempts.is_empty()));
    }
}
