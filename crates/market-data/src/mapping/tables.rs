//! Vendor mapping tables.
//!
//! Fixing a vendor's field offset or unit is an edit here and nowhere else.

use super::{FieldMapping, MappingEntry as E, Scale, ValueKind as K};
use crate::models::CanonicalField as F;

const LOT: Scale = Scale::Times(100);
const WAN: Scale = Scale::Times(10_000);
const YI: Scale = Scale::Times(100_000_000);
const CENTS: Scale = Scale::Per(100);

/// `var hq_str_sz000498="name,open,prevClose,last,high,low,bid,ask,volume,turnover,...";`
///
/// Positions 6 and 7 repeat the best bid/ask and are not mapped; the ladder
/// below carries them. Ladder pairs are (size, price).
pub const SINA_REALTIME: FieldMapping = FieldMapping {
    provider: "SINA",
    version: 1,
    min_fields: 9,
    entries: &[
        E::at(0, F::Name, K::Text),
        E::at(1, F::Open, K::Price),
        E::at(2, F::PrevClose, K::Price),
        E::at(3, F::Last, K::Price),
        E::at(4, F::High, K::Price),
        E::at(5, F::Low, K::Price),
        E::at(8, F::Volume, K::Volume),
        E::at(9, F::Turnover, K::Price),
        E::at(10, F::BidSize(1), K::Volume),
        E::at(11, F::BidPrice(1), K::Price),
        E::at(12, F::BidSize(2), K::Volume),
        E::at(13, F::BidPrice(2), K::Price),
        E::at(14, F::BidSize(3), K::Volume),
        E::at(15, F::BidPrice(3), K::Price),
        E::at(16, F::BidSize(4), K::Volume),
        E::at(17, F::BidPrice(4), K::Price),
        E::at(18, F::BidSize(5), K::Volume),
        E::at(19, F::BidPrice(5), K::Price),
        E::at(20, F::AskSize(1), K::Volume),
        E::at(21, F::AskPrice(1), K::Price),
        E::at(22, F::AskSize(2), K::Volume),
        E::at(23, F::AskPrice(2), K::Price),
        E::at(24, F::AskSize(3), K::Volume),
        E::at(25, F::AskPrice(3), K::Price),
        E::at(26, F::AskSize(4), K::Volume),
        E::at(27, F::AskPrice(4), K::Price),
        E::at(28, F::AskSize(5), K::Volume),
        E::at(29, F::AskPrice(5), K::Price),
        E::at(30, F::Date, K::Timestamp),
        E::at(31, F::Time, K::Timestamp),
    ],
};

/// `v_sz000498="51~name~code~last~prevClose~open~volume~...";`
///
/// Volume and book sizes are in lots, turnover in 10,000 yuan and market
/// caps in 100 million yuan. Ladder pairs are (price, size).
pub const TENCENT_REALTIME: FieldMapping = FieldMapping {
    provider: "TENCENT",
    version: 1,
    min_fields: 35,
    entries: &[
        E::at(1, F::Name, K::Text),
        E::at(3, F::Last, K::Price),
        E::at(4, F::PrevClose, K::Price),
        E::at(5, F::Open, K::Price),
        E::at(6, F::Volume, K::Volume).scaled(LOT),
        E::at(9, F::BidPrice(1), K::Price),
        E::at(10, F::BidSize(1), K::Volume).scaled(LOT),
        E::at(11, F::BidPrice(2), K::Price),
        E::at(12, F::BidSize(2), K::Volume).scaled(LOT),
        E::at(13, F::BidPrice(3), K::Price),
        E::at(14, F::BidSize(3), K::Volume).scaled(LOT),
        E::at(15, F::BidPrice(4), K::Price),
        E::at(16, F::BidSize(4), K::Volume).scaled(LOT),
        E::at(17, F::BidPrice(5), K::Price),
        E::at(18, F::BidSize(5), K::Volume).scaled(LOT),
        E::at(19, F::AskPrice(1), K::Price),
        E::at(20, F::AskSize(1), K::Volume).scaled(LOT),
        E::at(21, F::AskPrice(2), K::Price),
        E::at(22, F::AskSize(2), K::Volume).scaled(LOT),
        E::at(23, F::AskPrice(3), K::Price),
        E::at(24, F::AskSize(3), K::Volume).scaled(LOT),
        E::at(25, F::AskPrice(4), K::Price),
        E::at(26, F::AskSize(4), K::Volume).scaled(LOT),
        E::at(27, F::AskPrice(5), K::Price),
        E::at(28, F::AskSize(5), K::Volume).scaled(LOT),
        E::at(30, F::Timestamp, K::Timestamp),
        E::at(31, F::Change, K::Price),
        E::at(32, F::ChangePercent, K::Percent),
        E::at(33, F::High, K::Price),
        E::at(34, F::Low, K::Price),
        E::at(37, F::Turnover, K::Price).scaled(WAN),
        E::at(38, F::TurnoverRate, K::Percent),
        E::at(39, F::PeRatio, K::Count),
        E::at(43, F::Amplitude, K::Percent),
        E::at(44, F::FloatMarketCap, K::MarketCap).scaled(YI),
        E::at(45, F::MarketCap, K::MarketCap).scaled(YI),
        E::at(46, F::PbRatio, K::Count),
    ],
};

/// push2 `stock/get` with `fltt=2`: decimal values under `data`.
pub const EASTMONEY_V1: FieldMapping = FieldMapping {
    provider: "EASTMONEY",
    version: 1,
    min_fields: 0,
    entries: &[
        E::key("f43", F::TurnoverRate, K::Percent),
        E::key("f44", F::Last, K::Price),
        E::key("f45", F::High, K::Price),
        E::key("f46", F::Low, K::Price),
        E::key("f47", F::Open, K::Price),
        E::key("f48", F::PrevClose, K::Price),
        E::key("f49", F::Change, K::Price),
        E::key("f50", F::ChangePercent, K::Percent),
        E::key("f51", F::Volume, K::Volume),
        E::key("f52", F::Turnover, K::Price),
        E::key("f55", F::Amplitude, K::Percent),
        E::key("f57", F::PeRatio, K::Count),
        E::key("f58", F::Name, K::Text),
        E::key("f116", F::MarketCap, K::MarketCap),
        E::key("f117", F::FloatMarketCap, K::MarketCap),
        E::key("f167", F::PbRatio, K::Count),
    ],
};

/// push2 `stock/get` without `fltt`: prices and percentages arrive as
/// integers multiplied by 100, and turnover rate moves to f168.
pub const EASTMONEY_V2: FieldMapping = FieldMapping {
    provider: "EASTMONEY",
    version: 2,
    min_fields: 0,
    entries: &[
        E::key("f168", F::TurnoverRate, K::Percent).scaled(CENTS),
        E::key("f44", F::Last, K::Price).scaled(CENTS),
        E::key("f45", F::High, K::Price).scaled(CENTS),
        E::key("f46", F::Low, K::Price).scaled(CENTS),
        E::key("f47", F::Open, K::Price).scaled(CENTS),
        E::key("f48", F::PrevClose, K::Price).scaled(CENTS),
        E::key("f49", F::Change, K::Price).scaled(CENTS),
        E::key("f50", F::ChangePercent, K::Percent).scaled(CENTS),
        E::key("f51", F::Volume, K::Volume),
        E::key("f52", F::Turnover, K::Price),
        E::key("f55", F::Amplitude, K::Percent).scaled(CENTS),
        E::key("f57", F::PeRatio, K::Count),
        E::key("f58", F::Name, K::Text),
        E::key("f116", F::MarketCap, K::MarketCap),
        E::key("f117", F::FloatMarketCap, K::MarketCap),
        E::key("f167", F::PbRatio, K::Count),
    ],
};

/// Market-center node data. Market caps are in 10,000 yuan.
pub const SINA_CENTER: FieldMapping = FieldMapping {
    provider: "SINA_CENTER",
    version: 1,
    min_fields: 0,
    entries: &[
        E::key("name", F::Name, K::Text),
        E::key("trade", F::Last, K::Price),
        E::key("open", F::Open, K::Price),
        E::key("settlement", F::PrevClose, K::Price),
        E::key("high", F::High, K::Price),
        E::key("low", F::Low, K::Price),
        E::key("volume", F::Volume, K::Volume),
        E::key("amount", F::Turnover, K::Price),
        E::key("per", F::PeRatio, K::Count),
        E::key("pb", F::PbRatio, K::Count),
        E::key("mktcap", F::MarketCap, K::MarketCap).scaled(WAN),
        E::key("nmc", F::FloatMarketCap, K::MarketCap).scaled(WAN),
        E::key("turnoverratio", F::TurnoverRate, K::Percent),
        E::key("changepercent", F::ChangePercent, K::Percent),
    ],
};

/// `getKLineData` rows: `{"day":..,"open":..,"high":..,"low":..,"close":..,"volume":..}`.
pub const SINA_BAR: FieldMapping = FieldMapping {
    provider: "SINA",
    version: 1,
    min_fields: 0,
    entries: &[
        E::key("day", F::Timestamp, K::Timestamp),
        E::key("open", F::Open, K::Price),
        E::key("high", F::High, K::Price),
        E::key("low", F::Low, K::Price),
        E::key("close", F::Close, K::Price),
        E::key("volume", F::Volume, K::Volume),
    ],
};

/// `mkline` rows: `[time, open, close, high, low, volume]`, volume in lots.
pub const TENCENT_BAR: FieldMapping = FieldMapping {
    provider: "TENCENT",
    version: 1,
    min_fields: 6,
    entries: &[
        E::at(0, F::Timestamp, K::Timestamp),
        E::at(1, F::Open, K::Price),
        E::at(2, F::Close, K::Price),
        E::at(3, F::High, K::Price),
        E::at(4, F::Low, K::Price),
        E::at(5, F::Volume, K::Volume).scaled(LOT),
    ],
};

/// `data.klines` lines:
/// `time,open,close,high,low,volume,turnover,amplitude,changePct,change,turnoverRate`.
pub const EASTMONEY_BAR: FieldMapping = FieldMapping {
    provider: "EASTMONEY",
    version: 1,
    min_fields: 6,
    entries: &[
        E::at(0, F::Timestamp, K::Timestamp),
        E::at(1, F::Open, K::Price),
        E::at(2, F::Close, K::Price),
        E::at(3, F::High, K::Price),
        E::at(4, F::Low, K::Price),
        E::at(5, F::Volume, K::Volume).scaled(LOT),
        E::at(6, F::Turnover, K::Price),
        E::at(7, F::Amplitude, K::Percent),
        E::at(8, F::ChangePercent, K::Percent),
        E::at(9, F::Change, K::Price),
        E::at(10, F::TurnoverRate, K::Percent),
    ],
};

/// `chart.result[0]` columns: `timestamp[i]` in Unix seconds and
/// `indicators.quote[0].{open,high,low,close,volume}[i]`, volume in shares.
pub const YAHOO_BAR: FieldMapping = FieldMapping {
    provider: "YAHOO",
    version: 1,
    min_fields: 0,
    entries: &[
        E::key("timestamp", F::Timestamp, K::EpochSeconds),
        E::key("open", F::Open, K::Price),
        E::key("high", F::High, K::Price),
        E::key("low", F::Low, K::Price),
        E::key("close", F::Close, K::Price),
        E::key("volume", F::Volume, K::Volume),
    ],
};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::mapping::SourceKey;

    fn all() -> [&'static FieldMapping; 9] {
        [
            &SINA_REALTIME,
            &TENCENT_REALTIME,
            &EASTMONEY_V1,
            &EASTMONEY_V2,
            &SINA_CENTER,
            &SINA_BAR,
            &TENCENT_BAR,
            &EASTMONEY_BAR,
            &YAHOO_BAR,
        ]
    }

    #[test]
    fn test_each_field_mapped_at_most_once_per_table() {
        for mapping in all() {
            let mut seen = HashSet::new();
            for entry in mapping.entries {
                assert!(
                    seen.insert(entry.field),
                    "{} v{} maps {} twice",
                    mapping.provider,
                    mapping.version,
                    entry.field
                );
            }
        }
    }

    #[test]
    fn test_each_source_key_used_at_most_once_per_table() {
        for mapping in all() {
            let mut seen = Vec::new();
            for entry in mapping.entries {
                assert!(
                    !seen.contains(&entry.source),
                    "{} v{} reads {:?} twice",
                    mapping.provider,
                    mapping.version,
                    entry.source
                );
                seen.push(entry.source);
            }
        }
    }

    #[test]
    fn test_eastmoney_versions_differ_only_in_scaling_and_turnover_rate_key() {
        assert_eq!(EASTMONEY_V1.entries.len(), EASTMONEY_V2.entries.len());
        let v1 = *EASTMONEY_V1.entry(F::TurnoverRate).unwrap();
        let v2 = *EASTMONEY_V2.entry(F::TurnoverRate).unwrap();
        assert_eq!(v1.source, SourceKey::Key("f43"));
        assert_eq!(v2.source, SourceKey::Key("f168"));
        assert_eq!(EASTMONEY_V2.entry(F::Last).unwrap().scale, Scale::Per(100));
        assert_eq!(EASTMONEY_V1.entry(F::Last).unwrap().scale, Scale::Identity);
    }

    #[test]
    fn test_bar_tables_cover_ohlcv() {
        for mapping in [&SINA_BAR, &TENCENT_BAR, &EASTMONEY_BAR, &YAHOO_BAR] {
            for field in [F::Timestamp, F::Open, F::High, F::Low, F::Close, F::Volume] {
                assert!(mapping.supports(field), "{} lacks {}", mapping.provider, field);
            }
        }
    }
}
