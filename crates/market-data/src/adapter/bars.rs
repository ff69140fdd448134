use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

use super::keyed::{self, Locator};
use super::BarShape;
use crate::errors::MarketDataError;
use crate::mapping::{FieldMapping, FieldSource, FieldValue, RawValue, SourceKey};
use crate::models::{BarPeriod, CanonicalField, KlineBar, KlineSeries, RawPayload};

pub(super) fn parse(
    payload: &RawPayload,
    shape: &BarShape,
    mapping: &FieldMapping,
    period: BarPeriod,
    period_code: &str,
    span: usize,
) -> Result<KlineSeries, MarketDataError> {
    let text = payload.text();
    let document = keyed::parse_document(payload, &text)?;
    let locator = Locator::new(&payload.symbol, Some(period_code));
    let target = keyed::locate(&document, shape.path(), &locator);
    let not_found = || MarketDataError::format(&payload.provider, "bar list not found");

    let parsed: Vec<Result<KlineBar, String>> = match shape {
        BarShape::Columnar { time, columns, .. } => {
            let record = target.and_then(Value::as_object).ok_or_else(not_found)?;
            let times = record.get(*time).and_then(Value::as_array).ok_or_else(not_found)?;
            let values = target
                .and_then(|target| keyed::locate(target, columns, &locator))
                .and_then(Value::as_object)
                .ok_or_else(not_found)?;
            (0..times.len())
                .map(|index| {
                    let row = ColumnRow {
                        record,
                        values,
                        index,
                    };
                    build_bar(mapping, &row)
                })
                .collect()
        }
        _ => target
            .and_then(Value::as_array)
            .ok_or_else(not_found)?
            .iter()
            .map(|row| parse_row(row, shape, mapping))
            .collect(),
    };

    let rows = parsed.len();
    let mut bars = Vec::with_capacity(rows);
    let mut dropped = 0usize;

    for (line, result) in parsed.into_iter().enumerate() {
        match result {
            Ok(mut bar) => {
                if !period.is_intraday() {
                    bar.time = bar.time.date().and_time(NaiveTime::default());
                }
                bars.push(bar);
            }
            Err(reason) => {
                dropped += 1;
                debug!(
                    "{} {}: dropped bar line {}: {}",
                    payload.provider, payload.symbol, line, reason
                );
            }
        }
    }

    if bars.is_empty() {
        return Err(MarketDataError::Parse {
            field: "bars".to_string(),
            value: format!("{} row(s), none usable", rows),
        });
    }

    // Stable sort keeps the first occurrence of a duplicated time in front.
    bars.sort_by_key(|bar| bar.time);
    let before = bars.len();
    bars.dedup_by_key(|bar| bar.time);
    dropped += before - bars.len();

    if bars.len() > span {
        bars.drain(..bars.len() - span);
    }
    if bars.is_empty() {
        return Err(MarketDataError::Parse {
            field: "span".to_string(),
            value: span.to_string(),
        });
    }

    Ok(KlineSeries {
        symbol: payload.symbol.clone(),
        provider: payload.provider.clone(),
        period,
        bars,
        dropped_lines: dropped,
    })
}

fn parse_row(row: &Value, shape: &BarShape, mapping: &FieldMapping) -> Result<KlineBar, String> {
    match shape {
        BarShape::Delimited { delimiter, .. } => {
            let line = row.as_str().ok_or("row is not a string")?;
            let fields: Vec<&str> = line.split(*delimiter).map(str::trim).collect();
            check_width(fields.len(), mapping)?;
            build_bar(mapping, &fields[..])
        }
        BarShape::Array { .. } => {
            let fields = row.as_array().ok_or("row is not an array")?;
            check_width(fields.len(), mapping)?;
            build_bar(mapping, &fields[..])
        }
        BarShape::Object { .. } => {
            let object = row.as_object().ok_or("row is not an object")?;
            build_bar(mapping, object)
        }
        BarShape::Columnar { .. } => Err("columnar rows are not list elements".to_string()),
    }
}

/// Row `index` of a columnar record. Keys resolve against the value
/// columns first, then against arrays on the record itself (the time axis).
struct ColumnRow<'a> {
    record: &'a Map<String, Value>,
    values: &'a Map<String, Value>,
    index: usize,
}

impl FieldSource for ColumnRow<'_> {
    fn lookup(&self, key: SourceKey) -> Option<RawValue<'_>> {
        let SourceKey::Key(key) = key else {
            return None;
        };
        self.values
            .get(key)
            .or_else(|| self.record.get(key))?
            .get(self.index)
            .map(RawValue::Json)
    }
}

fn check_width(found: usize, mapping: &FieldMapping) -> Result<(), String> {
    if found < mapping.min_fields {
        return Err(format!(
            "expected at least {} fields, found {}",
            mapping.min_fields, found
        ));
    }
    Ok(())
}

fn build_bar<S: FieldSource + ?Sized>(
    mapping: &FieldMapping,
    source: &S,
) -> Result<KlineBar, String> {
    let time = match resolve(mapping, CanonicalField::Timestamp, source)? {
        FieldValue::Timestamp(time) => time,
        other => return Err(format!("no bar time ({:?})", other)),
    };

    Ok(KlineBar {
        time,
        open: required(mapping, CanonicalField::Open, source)?,
        high: required(mapping, CanonicalField::High, source)?,
        low: required(mapping, CanonicalField::Low, source)?,
        close: required(mapping, CanonicalField::Close, source)?,
        volume: required(mapping, CanonicalField::Volume, source)?,
        turnover: optional(mapping, CanonicalField::Turnover, source),
        turnover_rate: optional(mapping, CanonicalField::TurnoverRate, source),
        change_percent: optional(mapping, CanonicalField::ChangePercent, source),
        change: optional(mapping, CanonicalField::Change, source),
        amplitude: optional(mapping, CanonicalField::Amplitude, source),
    })
}

fn resolve<S: FieldSource + ?Sized>(
    mapping: &FieldMapping,
    field: CanonicalField,
    source: &S,
) -> Result<FieldValue, String> {
    mapping.resolve(field, source).map_err(|e| e.to_string())
}

fn required<S: FieldSource + ?Sized>(
    mapping: &FieldMapping,
    field: CanonicalField,
    source: &S,
) -> Result<Decimal, String> {
    resolve(mapping, field, source)?
        .as_number()
        .ok_or_else(|| format!("{} missing", field))
}

fn optional<S: FieldSource + ?Sized>(
    mapping: &FieldMapping,
    field: CanonicalField,
    source: &S,
) -> Option<Decimal> {
    mapping
        .resolve(field, source)
        .ok()
        .and_then(|value| value.as_number())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::PathSegment;
    use crate::mapping::{EASTMONEY_BAR, SINA_BAR, TENCENT_BAR, YAHOO_BAR};
    use crate::models::Charset;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;
    use std::borrow::Cow;

    const EASTMONEY_SHAPE: BarShape = BarShape::Delimited {
        path: &[PathSegment::Key("data"), PathSegment::Key("klines")],
        delimiter: ',',
    };

    const YAHOO_SHAPE: BarShape = BarShape::Columnar {
        path: &[
            PathSegment::Key("chart"),
            PathSegment::Key("result"),
            PathSegment::Index(0),
        ],
        time: "timestamp",
        columns: &[
            PathSegment::Key("indicators"),
            PathSegment::Key("quote"),
            PathSegment::Index(0),
        ],
    };

    fn payload(provider: &'static str, body: &str) -> RawPayload {
        RawPayload::new(
            Cow::Borrowed(provider),
            "sz000498".parse().unwrap(),
            200,
            body.as_bytes().to_vec(),
            Charset::Utf8,
        )
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_malformed_line_is_dropped_not_fatal() {
        let body = r#"{"data":{"klines":[
            "2024-03-15 14:55,10.50,10.55,10.60,10.45,1200,1266000.00,1.43,0.48,0.05,0.08",
            "garbage",
            "2024-03-15 15:00,10.55,10.58,10.60,10.50,800,846400.00,0.95,0.28,0.03,0.05"
        ]}}"#;
        let series = parse(
            &payload("EASTMONEY", body),
            &EASTMONEY_SHAPE,
            &EASTMONEY_BAR,
            BarPeriod::Minute5,
            "5",
            10,
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.dropped_lines, 1);
        assert_eq!(series.bars[0].time, at(15, 14, 55));
        assert_eq!(series.bars[0].close, dec!(10.55));
        assert_eq!(series.bars[0].volume, dec!(120000));
        assert_eq!(series.bars[0].turnover_rate, Some(dec!(0.08)));
    }

    #[test]
    fn test_sorted_deduplicated_and_truncated() {
        let body = r#"[
            {"day":"2024-03-14","open":"10.0","high":"10.2","low":"9.9","close":"10.1","volume":"100"},
            {"day":"2024-03-12","open":"9.8","high":"9.9","low":"9.7","close":"9.8","volume":"100"},
            {"day":"2024-03-13","open":"9.8","high":"10.0","low":"9.8","close":"10.0","volume":"100"},
            {"day":"2024-03-14","open":"1","high":"1","low":"1","close":"1","volume":"1"}
        ]"#;
        let shape = BarShape::Object { path: &[] };
        let series = parse(
            &payload("SINA", body),
            &shape,
            &SINA_BAR,
            BarPeriod::Daily,
            "240",
            2,
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        assert!(series.is_strictly_ordered());
        assert_eq!(series.dropped_lines, 1);
        assert_eq!(series.bars[0].time, at(13, 0, 0));
        // First occurrence of the duplicated day survives.
        assert_eq!(series.latest().unwrap().close, dec!(10.1));
    }

    #[test]
    fn test_tencent_array_rows_located_by_symbol_and_period() {
        let body = r#"{"code":0,"data":{"sz000498":{"m5":[
            ["202403151455","10.50","10.55","10.60","10.45","12.00"],
            ["202403151500","10.55","10.58","10.60","10.50","8"]
        ]}}}"#;
        let shape = BarShape::Array {
            path: &[
                PathSegment::Key("data"),
                PathSegment::Symbol,
                PathSegment::Period("m"),
            ],
        };
        let series = parse(
            &payload("TENCENT", body),
            &shape,
            &TENCENT_BAR,
            BarPeriod::Minute5,
            "5",
            10,
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[1].time, at(15, 15, 0));
        assert_eq!(series.bars[1].volume, dec!(800));
    }

    #[test]
    fn test_missing_list_is_format_error() {
        let err = parse(
            &payload("EASTMONEY", r#"{"rc":0,"data":null}"#),
            &EASTMONEY_SHAPE,
            &EASTMONEY_BAR,
            BarPeriod::Daily,
            "101",
            10,
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::Format { .. }));
    }

    #[test]
    fn test_zero_span_is_parse_error() {
        let body = r#"{"data":{"klines":["2024-03-15,10.50,10.55,10.60,10.35,10000"]}}"#;
        let err = parse(
            &payload("EASTMONEY", body),
            &EASTMONEY_SHAPE,
            &EASTMONEY_BAR,
            BarPeriod::Daily,
            "101",
            0,
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::Parse { ref field, .. } if field == "span"));
    }

    #[test]
    fn test_all_lines_malformed_is_parse_error() {
        let err = parse(
            &payload("EASTMONEY", r#"{"data":{"klines":["a,b","c"]}}"#),
            &EASTMONEY_SHAPE,
            &EASTMONEY_BAR,
            BarPeriod::Daily,
            "101",
            10,
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::Parse { .. }));
    }

    #[test]
    fn test_columnar_rows_skip_null_entries_and_land_on_the_day() {
        // 2024-03-13, 03-14 and 03-15 at 09:30 in Shenzhen.
        let body = r#"{"chart":{"result":[{
            "meta":{"symbol":"000498.SZ"},
            "timestamp":[1710293400,1710379800,1710466200],
            "indicators":{"quote":[{
                "open":[10.1,null,10.5],
                "high":[10.3,10.4,10.6],
                "low":[10.0,10.1,10.35],
                "close":[10.2,10.3,10.55],
                "volume":[900000,1000000,1200000]
            }]}
        }],"error":null}}"#;
        let series = parse(
            &payload("YAHOO", body),
            &YAHOO_SHAPE,
            &YAHOO_BAR,
            BarPeriod::Daily,
            "1d",
            10,
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.dropped_lines, 1);
        assert_eq!(series.bars[0].time, at(13, 0, 0));
        assert_eq!(series.bars[1].time, at(15, 0, 0));
        assert_eq!(series.bars[1].close, dec!(10.55));
        assert_eq!(series.bars[1].volume, dec!(1200000));
        assert_eq!(series.bars[1].turnover, None);
    }

    #[test]
    fn test_columnar_without_result_is_format_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#;
        let err = parse(
            &payload("YAHOO", body),
            &YAHOO_SHAPE,
            &YAHOO_BAR,
            BarPeriod::Daily,
            "1d",
            10,
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::Format { .. }));
    }
}
