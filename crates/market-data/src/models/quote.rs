use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::field::{CanonicalField, BOOK_DEPTH};
use super::symbol::Symbol;
use super::types::ProviderId;

/// One rung of the order book.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Option<Decimal>,
    pub size: Option<Decimal>,
}

/// Provider-independent quote record.
///
/// Every numeric field is either a value the provider actually supplied
/// (after unit normalization) or `None`, meaning unavailable. A field is
/// never zero-filled; zero only appears when the provider reported zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalQuote {
    pub symbol: Symbol,
    pub provider: ProviderId,
    pub name: Option<String>,

    pub last: Option<Decimal>,
    pub open: Option<Decimal>,
    pub prev_close: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,

    /// Shares traded.
    pub volume: Option<Decimal>,
    /// Traded value in currency units.
    pub turnover: Option<Decimal>,

    pub change: Option<Decimal>,
    /// Percent points, 1.44 means +1.44 %.
    pub change_percent: Option<Decimal>,
    pub amplitude: Option<Decimal>,

    /// Bid ladder, index 0 is rank 1 (best bid).
    pub bids: [BookLevel; BOOK_DEPTH as usize],
    /// Ask ladder, index 0 is rank 1 (best ask).
    pub asks: [BookLevel; BOOK_DEPTH as usize],

    pub turnover_rate: Option<Decimal>,
    pub pe_ratio: Option<Decimal>,
    pub pb_ratio: Option<Decimal>,
    /// Total market capitalization in currency units.
    pub market_cap: Option<Decimal>,
    pub float_market_cap: Option<Decimal>,

    /// Exchange-local time the provider stamped on the quote.
    pub updated_at: Option<NaiveDateTime>,
    /// When the payload was received.
    pub fetched_at: DateTime<Utc>,
}

impl CanonicalQuote {
    /// A quote with every field unavailable.
    pub fn unavailable(symbol: Symbol, provider: ProviderId, fetched_at: DateTime<Utc>) -> Self {
        Self {
            symbol,
            provider,
            name: None,
            last: None,
            open: None,
            prev_close: None,
            high: None,
            low: None,
            volume: None,
            turnover: None,
            change: None,
            change_percent: None,
            amplitude: None,
            bids: [BookLevel::default(); BOOK_DEPTH as usize],
            asks: [BookLevel::default(); BOOK_DEPTH as usize],
            turnover_rate: None,
            pe_ratio: None,
            pb_ratio: None,
            market_cap: None,
            float_market_cap: None,
            updated_at: None,
            fetched_at,
        }
    }

    /// Numeric value of a canonical field, if the quote carries one.
    pub fn number(&self, field: CanonicalField) -> Option<Decimal> {
        match field {
            CanonicalField::Last | CanonicalField::Close => self.last,
            CanonicalField::Open => self.open,
            CanonicalField::PrevClose => self.prev_close,
            CanonicalField::High => self.high,
            CanonicalField::Low => self.low,
            CanonicalField::Volume => self.volume,
            CanonicalField::Turnover => self.turnover,
            CanonicalField::Change => self.change,
            CanonicalField::ChangePercent => self.change_percent,
            CanonicalField::Amplitude => self.amplitude,
            CanonicalField::BidPrice(rank) => Self::level(&self.bids, rank).and_then(|l| l.price),
            CanonicalField::BidSize(rank) => Self::level(&self.bids, rank).and_then(|l| l.size),
            CanonicalField::AskPrice(rank) => Self::level(&self.asks, rank).and_then(|l| l.price),
            CanonicalField::AskSize(rank) => Self::level(&self.asks, rank).and_then(|l| l.size),
            CanonicalField::TurnoverRate => self.turnover_rate,
            CanonicalField::PeRatio => self.pe_ratio,
            CanonicalField::PbRatio => self.pb_ratio,
            CanonicalField::MarketCap => self.market_cap,
            CanonicalField::FloatMarketCap => self.float_market_cap,
            CanonicalField::Name
            | CanonicalField::Timestamp
            | CanonicalField::Date
            | CanonicalField::Time => None,
        }
    }

    /// Whether a canonical field is populated.
    pub fn has(&self, field: CanonicalField) -> bool {
        match field {
            CanonicalField::Name => self.name.as_deref().is_some_and(|n| !n.trim().is_empty()),
            CanonicalField::Timestamp | CanonicalField::Date | CanonicalField::Time => {
                self.updated_at.is_some()
            }
            other => self.number(other).is_some(),
        }
    }

    /// Store a numeric value. Non-numeric fields are ignored.
    pub fn set_number(&mut self, field: CanonicalField, value: Decimal) {
        let value = Some(value);
        match field {
            CanonicalField::Last | CanonicalField::Close => self.last = value,
            CanonicalField::Open => self.open = value,
            CanonicalField::PrevClose => self.prev_close = value,
            CanonicalField::High => self.high = value,
            CanonicalField::Low => self.low = value,
            CanonicalField::Volume => self.volume = value,
            CanonicalField::Turnover => self.turnover = value,
            CanonicalField::Change => self.change = value,
            CanonicalField::ChangePercent => self.change_percent = value,
            CanonicalField::Amplitude => self.amplitude = value,
            CanonicalField::BidPrice(rank) => {
                if let Some(level) = Self::level_mut(&mut self.bids, rank) {
                    level.price = value;
                }
            }
            CanonicalField::BidSize(rank) => {
                if let Some(level) = Self::level_mut(&mut self.bids, rank) {
                    level.size = value;
                }
            }
            CanonicalField::AskPrice(rank) => {
                if let Some(level) = Self::level_mut(&mut self.asks, rank) {
                    level.price = value;
                }
            }
            CanonicalField::AskSize(rank) => {
                if let Some(level) = Self::level_mut(&mut self.asks, rank) {
                    level.size = value;
                }
            }
            CanonicalField::TurnoverRate => self.turnover_rate = value,
            CanonicalField::PeRatio => self.pe_ratio = value,
            CanonicalField::PbRatio => self.pb_ratio = value,
            CanonicalField::MarketCap => self.market_cap = value,
            CanonicalField::FloatMarketCap => self.float_market_cap = value,
            CanonicalField::Name
            | CanonicalField::Timestamp
            | CanonicalField::Date
            | CanonicalField::Time => {}
        }
    }

    fn level(ladder: &[BookLevel], rank: u8) -> Option<&BookLevel> {
        if rank == 0 {
            return None;
        }
        ladder.get(usize::from(rank) - 1)
    }

    fn level_mut(ladder: &mut [BookLevel], rank: u8) -> Option<&mut BookLevel> {
        if rank == 0 {
            return None;
        }
        ladder.get_mut(usize::from(rank) - 1)
    }
}
