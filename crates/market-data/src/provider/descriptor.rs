use crate::adapter::{BarShape, QuoteShape};
use crate::mapping::FieldMapping;
use crate::models::{BarPeriod, Charset, QuoteKind, RecordKind, Symbol};

/// A quote endpoint: where to GET, how the body is shaped, how to map it.
///
/// `endpoint` may contain `{symbol}` (`sz000498`), `{secid}` (`0.000498`)
/// and `{suffixed}` (`000498.SZ`).
#[derive(Clone, Copy, Debug)]
pub struct QuoteSource {
    pub endpoint: &'static str,
    pub charset: Charset,
    pub shape: QuoteShape,
    pub mapping: &'static FieldMapping,
}

impl QuoteSource {
    pub fn url(&self, symbol: &Symbol) -> String {
        expand(self.endpoint, symbol)
    }
}

/// A bar endpoint. `endpoint` may additionally contain `{period}`, `{count}`
/// and `{range}`, the smallest calendar range holding `count` trading days.
#[derive(Clone, Copy, Debug)]
pub struct BarSource {
    pub endpoint: &'static str,
    pub charset: Charset,
    pub shape: BarShape,
    pub mapping: &'static FieldMapping,
    /// Provider code for each supported period. Periods not listed are
    /// unsupported.
    pub periods: &'static [(BarPeriod, &'static str)],
}

impl BarSource {
    pub fn period_code(&self, period: BarPeriod) -> Option<&'static str> {
        self.periods
            .iter()
            .find(|(p, _)| *p == period)
            .map(|(_, code)| *code)
    }

    pub fn url(&self, symbol: &Symbol, period_code: &str, count: usize) -> String {
        expand(self.endpoint, symbol)
            .replace("{period}", period_code)
            .replace("{count}", &count.to_string())
            .replace("{range}", chart_range(count))
    }
}

/// Immutable description of one upstream provider.
#[derive(Clone, Debug)]
pub struct ProviderDescriptor {
    /// Unique identifier, e.g. "SINA".
    pub id: &'static str,
    /// Lower is preferred when no explicit order is given.
    pub priority: u8,
    pub referer: Option<&'static str>,
    pub realtime: Option<QuoteSource>,
    pub fundamentals: Option<QuoteSource>,
    pub bars: Option<BarSource>,
}

impl ProviderDescriptor {
    pub fn quote_source(&self, kind: QuoteKind) -> Option<&QuoteSource> {
        match kind {
            QuoteKind::Realtime => self.realtime.as_ref(),
            QuoteKind::Fundamentals => self.fundamentals.as_ref(),
        }
    }

    pub fn bar_source(&self, period: BarPeriod) -> Option<(&BarSource, &'static str)> {
        let source = self.bars.as_ref()?;
        source.period_code(period).map(|code| (source, code))
    }

    pub fn supports(&self, kind: RecordKind) -> bool {
        match kind {
            RecordKind::Quote(kind) => self.quote_source(kind).is_some(),
            RecordKind::Bars(period) => self.bar_source(period).is_some(),
        }
    }
}

fn expand(template: &str, symbol: &Symbol) -> String {
    template
        .replace("{symbol}", &symbol.to_string())
        .replace("{secid}", &symbol.secid())
        .replace("{suffixed}", &symbol.suffixed())
}

/// About 240 trading days a year.
fn chart_range(count: usize) -> &'static str {
    match count {
        0..=60 => "3mo",
        61..=120 => "6mo",
        121..=240 => "1y",
        241..=480 => "2y",
        481..=1200 => "5y",
        _ => "max",
    }
}
