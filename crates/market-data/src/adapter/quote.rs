use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::mapping::{FieldMapping, FieldSource, FieldValue};
use crate::models::{CanonicalField, CanonicalQuote, RawPayload};

/// Build a quote from one located record by walking the mapping table.
pub(super) fn assemble<S: FieldSource + ?Sized>(
    payload: &RawPayload,
    mapping: &FieldMapping,
    source: &S,
) -> Result<CanonicalQuote, MarketDataError> {
    let mut quote = CanonicalQuote::unavailable(
        payload.symbol.clone(),
        payload.provider.clone(),
        payload.fetched_at,
    );
    let mut date = None;
    let mut time = None;
    let mut numeric = 0usize;
    let mut failed = 0usize;

    for entry in mapping.entries {
        match entry.resolve(source) {
            Ok(FieldValue::Number(value)) => {
                quote.set_number(entry.field, value);
                numeric += 1;
            }
            Ok(FieldValue::Text(text)) => {
                if entry.field == CanonicalField::Name {
                    quote.name = Some(text);
                }
            }
            Ok(FieldValue::Timestamp(at)) => quote.updated_at = Some(at),
            Ok(FieldValue::Date(d)) => date = Some(d),
            Ok(FieldValue::Time(t)) => time = Some(t),
            Ok(FieldValue::Unavailable) => {}
            Err(e) => {
                failed += 1;
                warn!(
                    "{} {}: field downgraded to unavailable: {}",
                    payload.provider, payload.symbol, e
                );
            }
        }
    }

    if numeric == 0 {
        return Err(MarketDataError::Parse {
            field: "record".to_string(),
            value: format!(
                "no numeric field resolved from {} ({} conversion failure(s))",
                payload.provider, failed
            ),
        });
    }

    if quote.updated_at.is_none() {
        quote.updated_at = match (date, time) {
            (Some(d), Some(t)) => Some(NaiveDateTime::new(d, t)),
            (Some(d), None) => d.and_hms_opt(0, 0, 0),
            _ => None,
        };
    }

    derive_change(&mut quote);

    debug!(
        "{} {}: {} numeric field(s) resolved, {} failed",
        payload.provider, payload.symbol, numeric, failed
    );
    Ok(quote)
}

/// Fill `change` and `changePercent` from `last` and `prevClose` when the
/// provider does not supply them.
pub(super) fn derive_change(quote: &mut CanonicalQuote) {
    let (Some(last), Some(prev_close)) = (quote.last, quote.prev_close) else {
        return;
    };
    if prev_close <= Decimal::ZERO {
        return;
    }

    let change = last - prev_close;
    if quote.change.is_none() {
        quote.change = Some(change);
    }
    if quote.change_percent.is_none() {
        quote.change_percent = change
            .checked_div(prev_close)
            .map(|ratio| (ratio * Decimal::ONE_HUNDRED).round_dp(2));
    }
}
