use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Mainland exchange a listed code trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    /// Shenzhen Stock Exchange
    Sz,
    /// Shanghai Stock Exchange
    Sh,
    /// Beijing Stock Exchange
    Bj,
}

impl Exchange {
    /// Lowercase prefix used by the text quote services (`sz`, `sh`, `bj`).
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Sz => "sz",
            Self::Sh => "sh",
            Self::Bj => "bj",
        }
    }

    /// Market number used in EastMoney `secid` parameters.
    pub fn market_number(&self) -> u8 {
        match self {
            Self::Sh => 1,
            Self::Sz | Self::Bj => 0,
        }
    }

    /// Suffix used by international feeds (`SZ`, `SS`, `BJ`).
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Sz => "SZ",
            Self::Sh => "SS",
            Self::Bj => "BJ",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "sz" => Some(Self::Sz),
            "sh" | "ss" => Some(Self::Sh),
            "bj" => Some(Self::Bj),
            _ => None,
        }
    }
}

/// A listed security, e.g. `sz000498`.
///
/// Accepts the prefix form (`sz000498`) and the suffix form used by
/// international feeds (`000498.SZ`, `600000.SS`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    exchange: Exchange,
    code: String,
}

impl Symbol {
    pub fn new(exchange: Exchange, code: impl Into<String>) -> Result<Self, MarketDataError> {
        let code = code.into();
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MarketDataError::InvalidSymbol(format!(
                "{}{}",
                exchange.prefix(),
                code
            )));
        }
        Ok(Self { exchange, code })
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Six-digit listing code without exchange marker.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// EastMoney security id, e.g. `0.000498` or `1.600000`.
    pub fn secid(&self) -> String {
        format!("{}.{}", self.exchange.market_number(), self.code)
    }

    /// Suffix form, e.g. `000498.SZ` or `600000.SS`.
    pub fn suffixed(&self) -> String {
        format!("{}.{}", self.code, self.exchange.suffix())
    }
}

impl FromStr for Symbol {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || MarketDataError::InvalidSymbol(s.to_string());

        if let Some((code, suffix)) = s.split_once('.') {
            let exchange = Exchange::from_prefix(suffix).ok_or_else(invalid)?;
            return Self::new(exchange, code).map_err(|_| invalid());
        }

        if s.len() < 3 || !s.is_char_boundary(2) {
            return Err(invalid());
        }
        let (prefix, code) = s.split_at(2);
        let exchange = Exchange::from_prefix(prefix).ok_or_else(invalid)?;
        Self::new(exchange, code).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Symbol {
    type Error = MarketDataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.to_string()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.exchange.prefix(), self.code)
    }
}
