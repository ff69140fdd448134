//! Per-fetch attempt tracking.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::models::{ProviderId, RecordKind, Symbol};

/// How one provider attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    Success,
    /// Connection failure, timeout or non-success status.
    TransportError,
    /// Payload did not match the provider's grammar.
    FormatError,
    /// Payload matched but yielded no usable record.
    ParseError,
    /// Record scored below the acceptance threshold.
    LowQuality,
    /// Provider has no endpoint for the requested record kind.
    Unsupported,
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::TransportError => "TRANSPORT",
            Self::FormatError => "FORMAT",
            Self::ParseError => "PARSE",
            Self::LowQuality => "LOW_QUALITY",
            Self::Unsupported => "UNSUPPORTED",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Record of a single provider attempt. Immutable once built.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAttempt {
    pub provider: ProviderId,
    pub symbol: Symbol,
    pub kind: RecordKind,
    pub outcome: AttemptOutcome,
    #[serde(rename = "latencyMs", serialize_with = "as_millis")]
    pub latency: Duration,
    /// Quality score, when the payload got far enough to be scored.
    pub quality: Option<f64>,
    /// Error text or rejection reason.
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

pub(crate) fn as_millis<S: Serializer>(latency: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX))
}

/// Every attempt made during one logical fetch, in order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FetchDiagnostics {
    pub attempts: Vec<FetchAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    pub fn record(&mut self, attempt: FetchAttempt) {
        self.attempts.push(attempt);
    }

    /// Summary for logging/debugging.
    ///
    /// `SINA: TRANSPORT (Timeout: SINA) -> TENCENT: SUCCESS`
    pub fn summary(&self) -> String {
        if self.attempts.is_empty() {
            return "no providers tried".to_string();
        }
        self.attempts
            .iter()
            .map(|a| match &a.detail {
                Some(detail) if !a.outcome.is_success() => {
                    format!("{}: {} ({})", a.provider, a.outcome, detail)
                }
                _ => format!("{}: {}", a.provider, a.outcome),
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Check if any provider succeeded.
    pub fn has_success(&self) -> bool {
        self.attempts.iter().any(|a| a.outcome.is_success())
    }

    /// Providers in the order they were tried.
    pub fn providers(&self) -> Vec<&ProviderId> {
        self.attempts.iter().map(|a| &a.provider).collect()
    }

    /// Failed attempts with their outcome and detail.
    pub fn failures(&self) -> Vec<(&ProviderId, AttemptOutcome, Option<&str>)> {
        self.attempts
            .iter()
            .filter(|a| !a.outcome.is_success())
            .map(|a| (&a.provider, a.outcome, a.detail.as_deref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::models::QuoteKind;

    fn attempt(provider: &'static str, outcome: AttemptOutcome, detail: Option<&str>) -> FetchAttempt {
        FetchAttempt {
            provider: Cow::Borrowed(provider),
            symbol: "sz000498".parse().unwrap(),
            kind: RecordKind::Quote(QuoteKind::Realtime),
            outcome,
            latency: Duration::from_millis(120),
            quality: None,
            detail: detail.map(str::to_string),
            at: Utc::now(),
        }
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = FetchDiagnostics::new();
        diag.record(attempt("SINA", AttemptOutcome::TransportError, Some("Timeout: SINA")));
        diag.record(attempt("TENCENT", AttemptOutcome::FormatError, Some("bad prefix")));
        diag.record(attempt("EASTMONEY", AttemptOutcome::Success, None));

        assert_eq!(
            diag.summary(),
            "SINA: TRANSPORT (Timeout: SINA) -> TENCENT: FORMAT (bad prefix) -> EASTMONEY: SUCCESS"
        );
    }

    #[test]
    fn test_has_success() {
        let mut diag = FetchDiagnostics::new();
        diag.record(attempt("SINA", AttemptOutcome::LowQuality, Some("score 0.20")));
        assert!(!diag.has_success());

        diag.record(attempt("TENCENT", AttemptOutcome::Success, None));
        assert!(diag.has_success());
        assert_eq!(diag.failures().len(), 1);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(FetchDiagnostics::new().summary(), "no providers tried");
    }

    #[test]
    fn test_attempt_serializes_latency_in_millis() {
        let json = serde_json::to_value(attempt("SINA", AttemptOutcome::ParseError, None)).unwrap();
        assert_eq!(json["latencyMs"], 120);
        assert_eq!(json["outcome"], "PARSE_ERROR");
        assert_eq!(json["symbol"], "sz000498");
    }
}
