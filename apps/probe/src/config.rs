use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use quotefeed_market_data::{
    BarPeriod, EngineConfig, FetchPolicy, PoolConfig, QuoteKind, Symbol, TransportConfig,
};

/// What one probe run fetches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Job {
    Quotes(QuoteKind),
    Bars { period: BarPeriod, span: usize },
}

pub struct Config {
    pub symbols: Vec<Symbol>,
    /// Explicit provider order; empty means the catalog default for the job.
    pub providers: Vec<String>,
    pub job: Job,
    pub min_quality: f64,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let symbols = list("QF_SYMBOLS", "sz000498,sh600000")
            .iter()
            .map(|s| s.parse::<Symbol>().map_err(anyhow::Error::from))
            .collect::<anyhow::Result<Vec<_>>>()?;
        if symbols.is_empty() {
            bail!("QF_SYMBOLS names no symbols");
        }
        let providers = list("QF_PROVIDERS", "");

        let span: usize = number("QF_SPAN", 30)?;
        let job = parse_job(&var("QF_KIND", "realtime"), span)?;

        let timeout_ms: u64 = number("QF_TIMEOUT_MS", 10_000)?;
        let delay_ms: u64 = number("QF_INTER_ATTEMPT_DELAY_MS", 1_000)?;
        let min_quality: f64 = number("QF_MIN_QUALITY", 0.0)?;
        if !(0.0..=1.0).contains(&min_quality) {
            bail!("QF_MIN_QUALITY must be within [0, 1], got {}", min_quality);
        }
        let max_concurrency: usize = number("QF_MAX_CONCURRENCY", 4)?;
        let history_capacity = match std::env::var("QF_HISTORY_CAPACITY") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid QF_HISTORY_CAPACITY: {}", raw))?,
            ),
            _ => None,
        };

        Ok(Self {
            symbols,
            providers,
            job,
            min_quality,
            engine: EngineConfig {
                transport: TransportConfig {
                    timeout: Duration::from_millis(timeout_ms),
                    ..TransportConfig::default()
                },
                policy: FetchPolicy {
                    inter_attempt_delay: Duration::from_millis(delay_ms),
                    quality_threshold: min_quality,
                },
                pool: PoolConfig { max_concurrency },
                history_capacity,
            },
        })
    }
}

fn var(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn list(name: &str, default: &str) -> Vec<String> {
    var(name, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn number<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", name, raw)),
        _ => Ok(default),
    }
}

/// `realtime`, `fundamentals`, `daily`, or an intraday interval such as `5m`.
fn parse_job(raw: &str, span: usize) -> anyhow::Result<Job> {
    let raw = raw.trim().to_ascii_lowercase();
    let period = match raw.as_str() {
        "realtime" => return Ok(Job::Quotes(QuoteKind::Realtime)),
        "fundamentals" => return Ok(Job::Quotes(QuoteKind::Fundamentals)),
        "daily" | "day" => BarPeriod::Daily,
        other => other
            .strip_suffix('m')
            .and_then(|m| m.parse::<u32>().ok())
            .and_then(BarPeriod::from_minutes)
            .ok_or_else(|| anyhow!("Invalid QF_KIND: {}", raw))?,
    };
    Ok(Job::Bars { period, span })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quote_and_bar_jobs() {
        assert_eq!(
            parse_job("Realtime", 10).unwrap(),
            Job::Quotes(QuoteKind::Realtime)
        );
        assert_eq!(
            parse_job("daily", 10).unwrap(),
            Job::Bars {
                period: BarPeriod::Daily,
                span: 10
            }
        );
        assert_eq!(
            parse_job("15m", 5).unwrap(),
            Job::Bars {
                period: BarPeriod::Minute15,
                span: 5
            }
        );
        assert!(parse_job("7m", 5).is_err());
        assert!(parse_job("weekly", 5).is_err());
    }
}
