use std::fmt;

use serde::{Deserialize, Serialize};

/// Deepest order-book rank any provider publishes.
pub const BOOK_DEPTH: u8 = 5;

/// A semantic field of the canonical quote/bar schema.
///
/// Book fields carry their rank (1..=5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    Name,
    Last,
    Open,
    PrevClose,
    High,
    Low,
    Close,
    Volume,
    Turnover,
    Change,
    ChangePercent,
    Amplitude,
    BidPrice(u8),
    BidSize(u8),
    AskPrice(u8),
    AskSize(u8),
    TurnoverRate,
    PeRatio,
    PbRatio,
    MarketCap,
    FloatMarketCap,
    /// Full date-time in one source field.
    Timestamp,
    /// Date half of a split date/time pair.
    Date,
    /// Time half of a split date/time pair.
    Time,
}

impl CanonicalField {
    /// Whether the field holds a price level subject to range checks.
    pub fn is_price(&self) -> bool {
        matches!(
            self,
            Self::Last
                | Self::Open
                | Self::PrevClose
                | Self::High
                | Self::Low
                | Self::Close
                | Self::BidPrice(_)
                | Self::AskPrice(_)
        )
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Last => write!(f, "last"),
            Self::Open => write!(f, "open"),
            Self::PrevClose => write!(f, "prevClose"),
            Self::High => write!(f, "high"),
            Self::Low => write!(f, "low"),
            Self::Close => write!(f, "close"),
            Self::Volume => write!(f, "volume"),
            Self::Turnover => write!(f, "turnover"),
            Self::Change => write!(f, "change"),
            Self::ChangePercent => write!(f, "changePercent"),
            Self::Amplitude => write!(f, "amplitude"),
            Self::BidPrice(rank) => write!(f, "bid{}Price", rank),
            Self::BidSize(rank) => write!(f, "bid{}Size", rank),
            Self::AskPrice(rank) => write!(f, "ask{}Price", rank),
            Self::AskSize(rank) => write!(f, "ask{}Size", rank),
            Self::TurnoverRate => write!(f, "turnoverRate"),
            Self::PeRatio => write!(f, "peRatio"),
            Self::PbRatio => write!(f, "pbRatio"),
            Self::MarketCap => write!(f, "marketCap"),
            Self::FloatMarketCap => write!(f, "floatMarketCap"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Date => write!(f, "date"),
            Self::Time => write!(f, "time"),
        }
    }
}
