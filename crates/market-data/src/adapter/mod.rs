//! Source adapters.
//!
//! An adapter turns one [`RawPayload`] into a [`CanonicalQuote`] or a
//! [`KlineSeries`] using nothing but the provider's wire shape and its
//! [`FieldMapping`]. There is one adapter per grammar family, not per vendor:
//!
//! - [`QuoteShape::Delimited`] - `prefix="f0,f1,...";` assignment text
//! - [`QuoteShape::Keyed`] - a JSON object of short field codes
//! - [`BarShape`] - a JSON list of bar rows (delimited strings, arrays or
//!   objects), or parallel per-field columns
//!
//! Adapters are pure. A payload that does not match the grammar at all is a
//! `Format` error; a record with no usable numeric field is a `Parse` error.
//! Individual field failures downgrade that field to unavailable.

mod bars;
mod delimited;
mod keyed;
mod quote;

use crate::errors::MarketDataError;
use crate::mapping::FieldMapping;
use crate::models::{BarPeriod, CanonicalQuote, KlineSeries, RawPayload};

pub use keyed::PathSegment;

/// Wire shape of a quote payload.
#[derive(Clone, Copy, Debug)]
pub enum QuoteShape {
    /// `{prefix}{symbol}="f0{delimiter}f1...";`
    Delimited {
        prefix: &'static str,
        delimiter: char,
    },
    /// JSON document; `path` leads to the object holding the field codes.
    Keyed { path: &'static [PathSegment] },
}

/// Wire shape of a bar payload; `path` leads to the list of rows.
#[derive(Clone, Copy, Debug)]
pub enum BarShape {
    /// Each row is one string of `delimiter`-joined fields.
    Delimited {
        path: &'static [PathSegment],
        delimiter: char,
    },
    /// Each row is a positional JSON array.
    Array { path: &'static [PathSegment] },
    /// Each row is a JSON object.
    Object { path: &'static [PathSegment] },
    /// Parallel arrays. `path` leads to the record holding the `time` array;
    /// `columns` leads from that record to the object of value arrays. Row
    /// `i` is element `i` of every array.
    Columnar {
        path: &'static [PathSegment],
        time: &'static str,
        columns: &'static [PathSegment],
    },
}

impl BarShape {
    pub fn path(&self) -> &'static [PathSegment] {
        match self {
            Self::Delimited { path, .. }
            | Self::Array { path }
            | Self::Object { path }
            | Self::Columnar { path, .. } => *path,
        }
    }
}

/// Parse one quote payload.
pub fn parse_quote(
    payload: &RawPayload,
    shape: &QuoteShape,
    mapping: &FieldMapping,
) -> Result<CanonicalQuote, MarketDataError> {
    let text = payload.text();
    match shape {
        QuoteShape::Delimited { prefix, delimiter } => {
            let fields = delimited::locate_fields(payload, &text, prefix, *delimiter)?;
            if fields.len() < mapping.min_fields {
                return Err(MarketDataError::format(
                    &payload.provider,
                    format!(
                        "expected at least {} fields, found {}",
                        mapping.min_fields,
                        fields.len()
                    ),
                ));
            }
            quote::assemble(payload, mapping, &fields[..])
        }
        QuoteShape::Keyed { path } => {
            let document = keyed::parse_document(payload, &text)?;
            let locator = keyed::Locator::new(&payload.symbol, None);
            let object = keyed::locate(&document, path, &locator)
                .and_then(|value| value.as_object())
                .ok_or_else(|| {
                    MarketDataError::format(&payload.provider, "quote object not found")
                })?;
            quote::assemble(payload, mapping, object)
        }
    }
}

/// Parse one bar payload into an ordered series of at most `span` bars.
///
/// `period_code` is the provider's own code for `period`, used by path
/// segments that embed it.
pub fn parse_bars(
    payload: &RawPayload,
    shape: &BarShape,
    mapping: &FieldMapping,
    period: BarPeriod,
    period_code: &str,
    span: usize,
) -> Result<KlineSeries, MarketDataError> {
    bars::parse(payload, shape, mapping, period, period_code, span)
}
