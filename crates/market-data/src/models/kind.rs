use std::fmt;

use serde::{Deserialize, Serialize};

/// What a quote fetch asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteKind {
    /// Last price, OHLC, volume and the order book.
    Realtime,
    /// Realtime fields plus valuation metrics (turnover rate, P/E, market cap).
    Fundamentals,
}

/// Bar interval for K-line fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarPeriod {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Minute60,
    Daily,
}

impl BarPeriod {
    /// Interval length in minutes, `None` for daily bars.
    pub fn minutes(&self) -> Option<u32> {
        match self {
            Self::Minute1 => Some(1),
            Self::Minute5 => Some(5),
            Self::Minute15 => Some(15),
            Self::Minute30 => Some(30),
            Self::Minute60 => Some(60),
            Self::Daily => None,
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        match minutes {
            1 => Some(Self::Minute1),
            5 => Some(Self::Minute5),
            15 => Some(Self::Minute15),
            30 => Some(Self::Minute30),
            60 => Some(Self::Minute60),
            _ => None,
        }
    }

    pub fn is_intraday(&self) -> bool {
        !matches!(self, Self::Daily)
    }
}

/// Kind of record a single logical fetch produced, used for attempt bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum RecordKind {
    Quote(QuoteKind),
    Bars(BarPeriod),
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quote(QuoteKind::Realtime) => write!(f, "realtime"),
            Self::Quote(QuoteKind::Fundamentals) => write!(f, "fundamentals"),
            Self::Bars(BarPeriod::Daily) => write!(f, "daily bars"),
            Self::Bars(period) => write!(f, "{}m bars", period.minutes().unwrap_or_default()),
        }
    }
}
