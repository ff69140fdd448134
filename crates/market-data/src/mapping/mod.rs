//! Declarative field mapping tables.
//!
//! Each provider publishes its fields under its own positional index or
//! short key, in its own units. A [`FieldMapping`] declares, as plain data,
//! where every canonical field lives in one provider's payload and how to
//! normalize it. Adapters never special-case a vendor: they walk the table.
//!
//! ```text
//! payload fields ──lookup(SourceKey)──> RawValue ──kind + scale──> FieldValue
//! ```
//!
//! Resolution is pure. A missing key, an out-of-range index, an empty
//! string, `-` and JSON `null` all resolve to [`FieldValue::Unavailable`];
//! text that is present but not convertible is a [`MarketDataError::Parse`].

mod tables;

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::models::CanonicalField;

pub use tables::{
    EASTMONEY_BAR, EASTMONEY_V1, EASTMONEY_V2, SINA_BAR, SINA_CENTER, SINA_REALTIME, TENCENT_BAR,
    TENCENT_REALTIME, YAHOO_BAR,
};

/// Where a field lives inside one record of a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKey {
    /// Position in a delimited line or a JSON array row.
    Index(usize),
    /// Key in a JSON object.
    Key(&'static str),
}

/// What kind of value a source field holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// Amount in currency units (prices, turnover).
    Price,
    Percent,
    /// Shares traded or resting on the book.
    Volume,
    /// Dimensionless number (P/E, P/B).
    Count,
    MarketCap,
    Text,
    /// Date, time or date-time, depending on the canonical field.
    Timestamp,
    /// Unix seconds, converted to exchange-local time.
    EpochSeconds,
}

impl ValueKind {
    /// Canonical unit values of this kind are normalized to.
    pub const fn target_unit(self) -> Unit {
        match self {
            Self::Price | Self::MarketCap => Unit::Currency,
            Self::Percent => Unit::PercentPoints,
            Self::Volume => Unit::Shares,
            Self::Count => Unit::Ratio,
            Self::Text => Unit::None,
            Self::Timestamp | Self::EpochSeconds => Unit::LocalTime,
        }
    }
}

/// Canonical unit after normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Currency,
    /// 1.44 means 1.44 %.
    PercentPoints,
    Shares,
    Ratio,
    /// Exchange-local wall clock.
    LocalTime,
    None,
}

/// Factor turning a source value into its canonical unit.
///
/// Integer factors keep the tables `const` and the arithmetic exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    Identity,
    /// Source is in units of `n` (lots of 100 shares, units of 10,000 yuan).
    Times(i64),
    /// Source is multiplied by `n` (integer-mode prices).
    Per(i64),
}

impl Scale {
    /// Apply the factor. `None` on overflow or a zero divisor.
    pub fn apply(self, value: Decimal) -> Option<Decimal> {
        match self {
            Self::Identity => Some(value),
            Self::Times(n) => value.checked_mul(Decimal::from(n)),
            Self::Per(n) => value.checked_div(Decimal::from(n)),
        }
    }
}

/// One row of a mapping table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappingEntry {
    pub source: SourceKey,
    pub field: CanonicalField,
    pub kind: ValueKind,
    pub unit: Unit,
    pub scale: Scale,
}

impl MappingEntry {
    /// Entry for a positional field.
    pub const fn at(index: usize, field: CanonicalField, kind: ValueKind) -> Self {
        Self {
            source: SourceKey::Index(index),
            field,
            kind,
            unit: kind.target_unit(),
            scale: Scale::Identity,
        }
    }

    /// Entry for a keyed field.
    pub const fn key(key: &'static str, field: CanonicalField, kind: ValueKind) -> Self {
        Self {
            source: SourceKey::Key(key),
            field,
            kind,
            unit: kind.target_unit(),
            scale: Scale::Identity,
        }
    }

    pub const fn scaled(self, scale: Scale) -> Self {
        Self { scale, ..self }
    }

    /// Extract and normalize this entry's value from one record.
    pub fn resolve<S: FieldSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<FieldValue, MarketDataError> {
        let Some(raw) = source.lookup(self.source) else {
            return Ok(FieldValue::Unavailable);
        };

        let text: Cow<'_, str> = match raw {
            RawValue::Text(text) => Cow::Borrowed(text),
            RawValue::Json(Value::Null) => return Ok(FieldValue::Unavailable),
            RawValue::Json(Value::String(text)) => Cow::Borrowed(text.as_str()),
            RawValue::Json(Value::Number(number)) => Cow::Owned(number.to_string()),
            RawValue::Json(other) => return Err(self.parse_error(&other.to_string())),
        };

        let text = text.trim().trim_matches('"').trim();
        if is_blank(text) {
            return Ok(FieldValue::Unavailable);
        }

        match self.kind {
            ValueKind::Text => Ok(FieldValue::Text(text.to_string())),
            ValueKind::Timestamp => self.time(text),
            ValueKind::EpochSeconds => self.epoch(text),
            _ => {
                let value = parse_decimal(text).ok_or_else(|| self.parse_error(text))?;
                self.number(value, text)
            }
        }
    }

    fn number(&self, value: Decimal, raw: &str) -> Result<FieldValue, MarketDataError> {
        self.scale
            .apply(value)
            .map(FieldValue::Number)
            .ok_or_else(|| self.parse_error(raw))
    }

    fn time(&self, text: &str) -> Result<FieldValue, MarketDataError> {
        let parsed = match self.field {
            CanonicalField::Date => parse_date(text).map(FieldValue::Date),
            CanonicalField::Time => parse_time(text).map(FieldValue::Time),
            _ => parse_date_time(text).map(FieldValue::Timestamp),
        };
        parsed.ok_or_else(|| self.parse_error(text))
    }

    fn epoch(&self, text: &str) -> Result<FieldValue, MarketDataError> {
        text.parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .zip(FixedOffset::east_opt(EXCHANGE_UTC_OFFSET_SECS))
            .map(|(utc, offset)| FieldValue::Timestamp(utc.with_timezone(&offset).naive_local()))
            .ok_or_else(|| self.parse_error(text))
    }

    fn parse_error(&self, value: &str) -> MarketDataError {
        MarketDataError::Parse {
            field: self.field.to_string(),
            value: value.to_string(),
        }
    }
}

/// A resolved field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Number(Decimal),
    Text(String),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    /// The provider did not supply the field.
    Unavailable,
}

impl FieldValue {
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

/// A raw, not yet converted field value.
#[derive(Clone, Copy, Debug)]
pub enum RawValue<'a> {
    Text(&'a str),
    Json(&'a Value),
}

/// One record of a payload that mapping entries can look into.
pub trait FieldSource {
    fn lookup(&self, key: SourceKey) -> Option<RawValue<'_>>;
}

impl<'s> FieldSource for [&'s str] {
    fn lookup(&self, key: SourceKey) -> Option<RawValue<'_>> {
        match key {
            SourceKey::Index(index) => self.get(index).map(|text| RawValue::Text(text)),
            SourceKey::Key(_) => None,
        }
    }
}

impl FieldSource for [Value] {
    fn lookup(&self, key: SourceKey) -> Option<RawValue<'_>> {
        match key {
            SourceKey::Index(index) => self.get(index).map(RawValue::Json),
            SourceKey::Key(_) => None,
        }
    }
}

impl FieldSource for serde_json::Map<String, Value> {
    fn lookup(&self, key: SourceKey) -> Option<RawValue<'_>> {
        match key {
            SourceKey::Key(key) => self.get(key).map(RawValue::Json),
            SourceKey::Index(_) => None,
        }
    }
}

/// A provider's complete mapping for one record grammar.
#[derive(Debug)]
pub struct FieldMapping {
    /// Provider the table belongs to.
    pub provider: &'static str,
    /// Table revision; a vendor contract change gets a new table, not an edit in place.
    pub version: u16,
    /// Split count below which a delimited record is rejected outright.
    pub min_fields: usize,
    pub entries: &'static [MappingEntry],
}

impl FieldMapping {
    /// The entry declaring `field`, if this provider supplies it.
    pub fn entry(&self, field: CanonicalField) -> Option<&MappingEntry> {
        self.entries.iter().find(|entry| entry.field == field)
    }

    pub fn supports(&self, field: CanonicalField) -> bool {
        self.entry(field).is_some()
    }

    /// Resolve one canonical field from one record.
    ///
    /// Fields the table does not declare are [`FieldValue::Unavailable`].
    pub fn resolve<S: FieldSource + ?Sized>(
        &self,
        field: CanonicalField,
        source: &S,
    ) -> Result<FieldValue, MarketDataError> {
        match self.entry(field) {
            Some(entry) => entry.resolve(source),
            None => Ok(FieldValue::Unavailable),
        }
    }
}

/// Shanghai and Shenzhen trade on UTC+8.
const EXCHANGE_UTC_OFFSET_SECS: i32 = 8 * 3600;

fn is_blank(text: &str) -> bool {
    matches!(text, "" | "-" | "--")
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim_end_matches('%');
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y%m%d%H%M%S",
    "%Y%m%d%H%M",
];

fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| parse_date(text).and_then(|date| date.and_hms_opt(0, 0, 0)))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y%m%d"))
        .ok()
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}
