use serde_json::Value;

use crate::errors::MarketDataError;
use crate::models::{RawPayload, Symbol};

/// One step from a JSON document root towards the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Key(&'static str),
    Index(usize),
    /// Object key equal to the requested symbol (`sz000498`).
    Symbol,
    /// List element whose value under this key is the requested symbol.
    SymbolRow(&'static str),
    /// Object key made of a prefix and the provider's period code (`m5`).
    Period(&'static str),
}

/// Values path segments are resolved against.
pub(super) struct Locator<'a> {
    symbol: String,
    period_code: Option<&'a str>,
}

impl<'a> Locator<'a> {
    pub(super) fn new(symbol: &Symbol, period_code: Option<&'a str>) -> Self {
        Self {
            symbol: symbol.to_string(),
            period_code,
        }
    }
}

pub(super) fn parse_document(payload: &RawPayload, text: &str) -> Result<Value, MarketDataError> {
    serde_json::from_str(text.trim()).map_err(|e| {
        MarketDataError::format(&payload.provider, format!("body is not JSON: {}", e))
    })
}

/// Walk `path` from `root`. `None` when any step is missing or `null`.
pub(super) fn locate<'v>(
    root: &'v Value,
    path: &[PathSegment],
    locator: &Locator<'_>,
) -> Option<&'v Value> {
    let mut current = root;
    for segment in path {
        current = match segment {
            PathSegment::Key(key) => current.get(*key)?,
            PathSegment::Index(index) => current.get(*index)?,
            PathSegment::Symbol => current.get(locator.symbol.as_str())?,
            PathSegment::SymbolRow(key) => current.as_array()?.iter().find(|row| {
                row.get(*key)
                    .and_then(Value::as_str)
                    .is_some_and(|value| value.trim().eq_ignore_ascii_case(&locator.symbol))
            })?,
            PathSegment::Period(prefix) => {
                let key = format!("{}{}", prefix, locator.period_code?);
                current.get(key.as_str())?
            }
        };
    }
    (!current.is_null()).then_some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_walks_keys_symbol_and_period() {
        let doc = json!({"data": {"sz000498": {"m5": [["202403151455", "10.5"]]}}});
        let symbol: Symbol = "sz000498".parse().unwrap();
        let locator = Locator::new(&symbol, Some("5"));
        let path = [
            PathSegment::Key("data"),
            PathSegment::Symbol,
            PathSegment::Period("m"),
        ];
        let rows = locate(&doc, &path, &locator).unwrap();
        assert_eq!(rows.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_null_target_is_not_found() {
        let doc = json!({"rc": 0, "data": null});
        let symbol: Symbol = "sh600000".parse().unwrap();
        let locator = Locator::new(&symbol, None);
        assert!(locate(&doc, &[PathSegment::Key("data")], &locator).is_none());
    }

    #[test]
    fn test_index_into_array() {
        let doc = json!([{"name": "A"}, {"name": "B"}]);
        let symbol: Symbol = "sh600000".parse().unwrap();
        let locator = Locator::new(&symbol, None);
        let first = locate(&doc, &[PathSegment::Index(0)], &locator).unwrap();
        assert_eq!(first["name"], "A");
        assert!(locate(&json!([]), &[PathSegment::Index(0)], &locator).is_none());
    }

    #[test]
    fn test_symbol_row_matches_requested_symbol_only() {
        let doc = json!([
            {"symbol": "bj430017", "trade": "4.10"},
            {"symbol": "SZ000498", "trade": "10.55"}
        ]);
        let symbol: Symbol = "sz000498".parse().unwrap();
        let locator = Locator::new(&symbol, None);
        let row = locate(&doc, &[PathSegment::SymbolRow("symbol")], &locator).unwrap();
        assert_eq!(row["trade"], "10.55");

        let other: Symbol = "sh600000".parse().unwrap();
        let locator = Locator::new(&other, None);
        assert!(locate(&doc, &[PathSegment::SymbolRow("symbol")], &locator).is_none());
    }
}
