//! Built-in provider descriptors and the catalog that orders them.

use log::debug;

use super::descriptor::{BarSource, ProviderDescriptor, QuoteSource};
use crate::adapter::{BarShape, PathSegment, QuoteShape};
use crate::errors::MarketDataError;
use crate::mapping::{
    EASTMONEY_BAR, EASTMONEY_V1, EASTMONEY_V2, SINA_BAR, SINA_CENTER as SINA_CENTER_MAP,
    SINA_REALTIME, TENCENT_BAR, TENCENT_REALTIME, YAHOO_BAR,
};
use crate::models::{BarPeriod as P, Charset, QuoteKind, RecordKind};

const SINA_QUOTE: QuoteSource = QuoteSource {
    endpoint: "http://hq.sinajs.cn/list={symbol}",
    charset: Charset::Gb18030,
    shape: QuoteShape::Delimited {
        prefix: "hq_str_",
        delimiter: ',',
    },
    mapping: &SINA_REALTIME,
};

const TENCENT_QUOTE: QuoteSource = QuoteSource {
    endpoint: "http://qt.gtimg.cn/q={symbol}",
    charset: Charset::Gb18030,
    shape: QuoteShape::Delimited {
        prefix: "v_",
        delimiter: '~',
    },
    mapping: &TENCENT_REALTIME,
};

const EASTMONEY_QUOTE: QuoteSource = QuoteSource {
    endpoint: "http://push2.eastmoney.com/api/qt/stock/get?secid={secid}&fields=f43,f44,f45,f46,f47,f48,f49,f50,f51,f52,f55,f57,f58,f116,f117,f167,f168&fltt=2&invt=2",
    charset: Charset::Utf8,
    shape: QuoteShape::Keyed {
        path: &[PathSegment::Key("data")],
    },
    mapping: &EASTMONEY_V1,
};

const EASTMONEY_INT_QUOTE: QuoteSource = QuoteSource {
    endpoint: "http://push2.eastmoney.com/api/qt/stock/get?secid={secid}&fields=f44,f45,f46,f47,f48,f49,f50,f51,f52,f55,f57,f58,f116,f117,f167,f168&invt=2",
    charset: Charset::Utf8,
    shape: QuoteShape::Keyed {
        path: &[PathSegment::Key("data")],
    },
    mapping: &EASTMONEY_V2,
};

pub static SINA: ProviderDescriptor = ProviderDescriptor {
    id: "SINA",
    priority: 1,
    referer: Some("https://finance.sina.com.cn"),
    realtime: Some(SINA_QUOTE),
    fundamentals: Some(SINA_QUOTE),
    bars: Some(BarSource {
        endpoint: "http://money.finance.sina.com.cn/quotes_service/api/json_v2.php/CN_MarketData.getKLineData?symbol={symbol}&scale={period}&ma=no&datalen={count}",
        charset: Charset::Gb18030,
        shape: BarShape::Object { path: &[] },
        mapping: &SINA_BAR,
        periods: &[
            (P::Minute5, "5"),
            (P::Minute15, "15"),
            (P::Minute30, "30"),
            (P::Minute60, "60"),
            (P::Daily, "240"),
        ],
    }),
};

pub static SINA_CENTER: ProviderDescriptor = ProviderDescriptor {
    id: "SINA_CENTER",
    priority: 4,
    referer: Some("https://finance.sina.com.cn"),
    realtime: None,
    fundamentals: Some(QuoteSource {
        endpoint: "http://vip.stock.finance.sina.com.cn/quotes_service/api/json_v2.php/Market_Center.getHQNodeData?page=1&num=1&sort=symbol&asc=1&node=hs_a&symbol={symbol}",
        charset: Charset::Gb18030,
        shape: QuoteShape::Keyed {
            path: &[PathSegment::SymbolRow("symbol")],
        },
        mapping: &SINA_CENTER_MAP,
    }),
    bars: None,
};

pub static TENCENT: ProviderDescriptor = ProviderDescriptor {
    id: "TENCENT",
    priority: 2,
    referer: Some("http://stock.gtimg.cn/"),
    realtime: Some(TENCENT_QUOTE),
    fundamentals: Some(TENCENT_QUOTE),
    bars: Some(BarSource {
        endpoint: "http://ifzq.gtimg.cn/appstock/app/kline/mkline?param={symbol},m{period},,{count}",
        charset: Charset::Utf8,
        shape: BarShape::Array {
            path: &[
                PathSegment::Key("data"),
                PathSegment::Symbol,
                PathSegment::Period("m"),
            ],
        },
        mapping: &TENCENT_BAR,
        periods: &[
            (P::Minute1, "1"),
            (P::Minute5, "5"),
            (P::Minute15, "15"),
            (P::Minute30, "30"),
            (P::Minute60, "60"),
        ],
    }),
};

pub static EASTMONEY: ProviderDescriptor = ProviderDescriptor {
    id: "EASTMONEY",
    priority: 3,
    referer: Some("http://quote.eastmoney.com/"),
    realtime: Some(EASTMONEY_QUOTE),
    fundamentals: Some(EASTMONEY_QUOTE),
    bars: Some(BarSource {
        endpoint: "http://push2his.eastmoney.com/api/qt/stock/kline/get?secid={secid}&fields1=f1,f2,f3,f4,f5,f6&fields2=f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61&klt={period}&fqt=0&end=20500101&lmt={count}",
        charset: Charset::Utf8,
        shape: BarShape::Delimited {
            path: &[PathSegment::Key("data"), PathSegment::Key("klines")],
            delimiter: ',',
        },
        mapping: &EASTMONEY_BAR,
        periods: &[
            (P::Minute1, "1"),
            (P::Minute5, "5"),
            (P::Minute15, "15"),
            (P::Minute30, "30"),
            (P::Minute60, "60"),
            (P::Daily, "101"),
        ],
    }),
};

/// EastMoney in integer mode (no `fltt`), read through the v2 mapping.
/// Not part of any default order.
pub static EASTMONEY_INT: ProviderDescriptor = ProviderDescriptor {
    id: "EASTMONEY_INT",
    priority: 9,
    referer: Some("http://quote.eastmoney.com/"),
    realtime: Some(EASTMONEY_INT_QUOTE),
    fundamentals: Some(EASTMONEY_INT_QUOTE),
    bars: None,
};

/// Yahoo Finance chart API; daily bars only, used as the last resort.
pub static YAHOO: ProviderDescriptor = ProviderDescriptor {
    id: "YAHOO",
    priority: 5,
    referer: None,
    realtime: None,
    fundamentals: None,
    bars: Some(BarSource {
        endpoint: "https://query1.finance.yahoo.com/v8/finance/chart/{suffixed}?range={range}&interval={period}&events=history",
        charset: Charset::Utf8,
        shape: BarShape::Columnar {
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
        },
        mapping: &YAHOO_BAR,
        periods: &[(P::Daily, "1d")],
    }),
};

const REALTIME_ORDER: &[&str] = &["SINA", "TENCENT", "EASTMONEY"];
const FUNDAMENTALS_ORDER: &[&str] = &["EASTMONEY", "SINA_CENTER", "TENCENT", "SINA"];
const BARS_ORDER: &[&str] = &["SINA", "EASTMONEY", "TENCENT", "YAHOO"];

/// The set of providers a process knows about.
#[derive(Clone, Debug)]
pub struct ProviderCatalog {
    providers: Vec<ProviderDescriptor>,
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderCatalog {
    /// SINA, SINA_CENTER, TENCENT, EASTMONEY, EASTMONEY_INT and YAHOO.
    pub fn builtin() -> Self {
        Self {
            providers: vec![
                SINA.clone(),
                SINA_CENTER.clone(),
                TENCENT.clone(),
                EASTMONEY.clone(),
                EASTMONEY_INT.clone(),
                YAHOO.clone(),
            ],
        }
    }

    pub fn with_providers(providers: Vec<ProviderDescriptor>) -> Self {
        Self { providers }
    }

    pub fn get(&self, id: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id).collect()
    }

    /// Look up providers by id, keeping the caller's order.
    ///
    /// Repeated ids are kept; listing a provider twice is how a caller asks
    /// for a second try.
    pub fn resolve<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<Vec<&ProviderDescriptor>, MarketDataError> {
        ids.iter()
            .map(|id| {
                let id = id.as_ref().trim();
                self.get(id)
                    .ok_or_else(|| MarketDataError::UnknownProvider(id.to_string()))
            })
            .collect()
    }

    /// Providers that serve `kind`, in the standing preference order.
    ///
    /// Catalog entries outside the standing order that serve `kind` and are
    /// not opt-in (priority below 9) follow, by priority.
    pub fn default_order(&self, kind: RecordKind) -> Vec<&ProviderDescriptor> {
        let standing = match kind {
            RecordKind::Quote(QuoteKind::Realtime) => REALTIME_ORDER,
            RecordKind::Quote(QuoteKind::Fundamentals) => FUNDAMENTALS_ORDER,
            RecordKind::Bars(_) => BARS_ORDER,
        };

        let mut ordered: Vec<&ProviderDescriptor> = standing
            .iter()
            .filter_map(|id| self.get(id))
            .filter(|p| p.supports(kind))
            .collect();

        let mut extras: Vec<&ProviderDescriptor> = self
            .providers
            .iter()
            .filter(|p| !standing.contains(&p.id) && p.priority < 9 && p.supports(kind))
            .collect();
        extras.sort_by_key(|p| p.priority);
        ordered.extend(extras);

        debug!(
            "Default order for {}: {:?}",
            kind,
            ordered.iter().map(|p| p.id).collect::<Vec<_>>()
        );
        ordered
    }
}
