use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::kind::BarPeriod;
use super::symbol::Symbol;
use super::types::ProviderId;

/// One OHLCV interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineBar {
    /// Exchange-local bar time; midnight for daily bars.
    pub time: NaiveDateTime,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Shares traded in the interval.
    pub volume: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turnover: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turnover_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<Decimal>,
}

/// An ordered bar sequence from one provider.
///
/// Adapters guarantee `bars` is strictly increasing by `time`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineSeries {
    pub symbol: Symbol,
    pub provider: ProviderId,
    pub period: BarPeriod,
    pub bars: Vec<KlineBar>,
    /// Source lines that could not be turned into a bar (malformed or duplicate).
    pub dropped_lines: usize,
}

impl KlineSeries {
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn latest(&self) -> Option<&KlineBar> {
        self.bars.last()
    }

    /// Whether bar times strictly increase.
    pub fn is_strictly_ordered(&self) -> bool {
        self.bars.windows(2).all(|w| w[0].time < w[1].time)
    }
}
