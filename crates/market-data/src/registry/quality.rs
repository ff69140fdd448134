//! Record quality scoring.
//!
//! Scores a parsed record against a fixed, weighted checklist:
//! - Required-field presence (present and numerically converted)
//! - Price range sanity (`0 < price < max_price`)
//! - OHLC invariant (high >= low)
//! - Non-negative volume
//!
//! Every check of the checklist is attempted on every record of a kind, and
//! a check that cannot be verified (its input is unavailable) fails. Adding a
//! corruption to a record can therefore only turn passes into failures, so
//! the score never rises as a record degrades.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{CanonicalField, CanonicalQuote, KlineSeries, QuoteKind};

const REALTIME_REQUIRED: &[CanonicalField] = &[
    CanonicalField::Name,
    CanonicalField::Last,
    CanonicalField::Open,
    CanonicalField::PrevClose,
    CanonicalField::High,
    CanonicalField::Low,
    CanonicalField::Volume,
    CanonicalField::Turnover,
];

const FUNDAMENTALS_EXTRA: &[CanonicalField] = &[
    CanonicalField::TurnoverRate,
    CanonicalField::PeRatio,
    CanonicalField::MarketCap,
];

const RANGE_CHECKED: &[CanonicalField] = &[
    CanonicalField::Last,
    CanonicalField::Open,
    CanonicalField::PrevClose,
    CanonicalField::High,
    CanonicalField::Low,
];

/// Result of scoring one record. Derived per fetch, never stored on the record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityScore {
    /// Passed weight over attempted weight, in `[0, 1]`.
    pub value: f64,
    /// One entry per failed check, naming the field and the rule.
    pub issues: Vec<String>,
    pub checks_attempted: usize,
    pub checks_passed: usize,
}

impl QualityScore {
    /// Whether a record with this score may be accepted under `threshold`.
    ///
    /// A zero score is never acceptable, whatever the threshold.
    pub fn meets(&self, threshold: f64) -> bool {
        self.value > 0.0 && self.value >= threshold
    }
}

/// Weights of each check family.
#[derive(Clone, Debug)]
pub struct CheckWeights {
    pub presence: f64,
    pub price_range: f64,
    pub high_low: f64,
    pub volume: f64,
    /// Bar series only: strictly increasing time.
    pub ordering: f64,
    /// Bar series only: no source lines dropped.
    pub completeness: f64,
}

impl Default for CheckWeights {
    fn default() -> Self {
        Self {
            presence: 1.0,
            price_range: 1.0,
            high_low: 1.0,
            volume: 1.0,
            ordering: 1.0,
            completeness: 1.0,
        }
    }
}

/// Quality scorer configuration.
#[derive(Clone, Debug)]
pub struct ScorerConfig {
    /// Exclusive upper bound for any price.
    pub max_price: Decimal,
    pub weights: CheckWeights,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            max_price: Decimal::from(1_000_000i64),
            weights: CheckWeights::default(),
        }
    }
}

/// Deterministic, side-effect-free record scorer.
#[derive(Clone, Debug, Default)]
pub struct QualityScorer {
    config: ScorerConfig,
}

impl QualityScorer {
    /// Create a new scorer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scorer with custom configuration.
    pub fn with_config(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Fields a quote of `kind` is expected to carry.
    pub fn required_fields(kind: QuoteKind) -> Vec<CanonicalField> {
        let mut fields = REALTIME_REQUIRED.to_vec();
        if kind == QuoteKind::Fundamentals {
            fields.extend_from_slice(FUNDAMENTALS_EXTRA);
        }
        fields
    }

    /// Score a quote.
    pub fn score_quote(&self, quote: &CanonicalQuote, kind: QuoteKind) -> QualityScore {
        let weights = &self.config.weights;
        let mut tally = Tally::default();

        for field in Self::required_fields(kind) {
            let ok = quote.has(field);
            tally.check(weights.presence, ok, || format!("{}: missing", field));
        }

        for &field in RANGE_CHECKED {
            self.check_price(&mut tally, &field.to_string(), quote.number(field));
        }

        self.check_high_low(&mut tally, "", quote.high, quote.low);
        self.check_volume(&mut tally, "", quote.volume);

        tally.finish()
    }

    /// Score a bar series. An empty series scores zero.
    pub fn score_bars(&self, series: &KlineSeries) -> QualityScore {
        let weights = &self.config.weights;
        let mut tally = Tally::default();

        for bar in &series.bars {
            let at = bar.time.format("%Y-%m-%d %H:%M").to_string();
            for (name, price) in [
                ("open", bar.open),
                ("high", bar.high),
                ("low", bar.low),
                ("close", bar.close),
            ] {
                self.check_price(&mut tally, &format!("{} {}", at, name), Some(price));
            }
            self.check_high_low(&mut tally, &format!("{} ", at), Some(bar.high), Some(bar.low));
            self.check_volume(&mut tally, &format!("{} ", at), Some(bar.volume));
        }

        if !series.bars.is_empty() {
            tally.check(weights.ordering, series.is_strictly_ordered(), || {
                "bars: times not strictly increasing".to_string()
            });
            tally.check(weights.completeness, series.dropped_lines == 0, || {
                format!("bars: {} source line(s) dropped", series.dropped_lines)
            });
        }

        tally.finish()
    }

    fn check_price(&self, tally: &mut Tally, label: &str, price: Option<Decimal>) {
        let max = self.config.max_price;
        let weight = self.config.weights.price_range;
        match price {
            Some(p) => tally.check(weight, p > Decimal::ZERO && p < max, || {
                format!("{}: {} outside (0, {})", label, p, max)
            }),
            None => tally.check(weight, false, || {
                format!("{}: unavailable, range not verifiable", label)
            }),
        }
    }

    fn check_high_low(
        &self,
        tally: &mut Tally,
        prefix: &str,
        high: Option<Decimal>,
        low: Option<Decimal>,
    ) {
        let weight = self.config.weights.high_low;
        match (high, low) {
            (Some(h), Some(l)) => tally.check(weight, h >= l, || {
                format!("{}high < low: {} < {}", prefix, h, l)
            }),
            _ => tally.check(weight, false, || {
                format!("{}high/low: unavailable, not verifiable", prefix)
            }),
        }
    }

    fn check_volume(&self, tally: &mut Tally, prefix: &str, volume: Option<Decimal>) {
        let weight = self.config.weights.volume;
        match volume {
            Some(v) => tally.check(weight, v >= Decimal::ZERO, || {
                format!("{}volume: negative ({})", prefix, v)
            }),
            None => tally.check(weight, false, || {
                format!("{}volume: unavailable, not verifiable", prefix)
            }),
        }
    }
}

#[derive(Default)]
struct Tally {
    attempted_weight: f64,
    passed_weight: f64,
    attempted: usize,
    passed: usize,
    issues: Vec<String>,
}

impl Tally {
    fn check(&mut self, weight: f64, ok: bool, issue: impl FnOnce() -> String) {
        self.attempted += 1;
        self.attempted_weight += weight;
        if ok {
            self.passed += 1;
            self.passed_weight += weight;
        } else {
            self.issues.push(issue());
        }
    }

    fn finish(self) -> QualityScore {
        let value = if self.attempted == 0 || self.attempted_weight <= 0.0 {
            0.0
        } else {
            (self.passed_weight / self.attempted_weight).clamp(0.0, 1.0)
        };
        QualityScore {
            value,
            issues: self.issues,
            checks_attempted: self.attempted,
            checks_passed: self.passed,
        }
    }
}
