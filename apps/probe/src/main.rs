mod config;

use anyhow::Context;
use config::{Config, Job};
use quotefeed_market_data::{FetchPool, MarketDataError, ProviderCatalog, RecordKind};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    let catalog = ProviderCatalog::builtin();
    let kind = match config.job {
        Job::Quotes(kind) => RecordKind::Quote(kind),
        Job::Bars { period, .. } => RecordKind::Bars(period),
    };
    let providers = if config.providers.is_empty() {
        catalog.default_order(kind)
    } else {
        catalog.resolve(&config.providers)?
    };
    tracing::info!(
        "Probing {} symbol(s) for {} via {:?}",
        config.symbols.len(),
        kind,
        providers.iter().map(|p| p.id).collect::<Vec<_>>()
    );

    let pool = FetchPool::from_config(&config.engine);
    match config.job {
        Job::Quotes(quote_kind) => {
            let results = pool
                .fetch_quotes(&config.symbols, quote_kind, &providers, config.min_quality)
                .await;
            for (symbol, result) in results {
                match result {
                    Ok(fetched) => {
                        let record = serde_json::to_string(&fetched.record)?;
                        tracing::info!(
                            "{} from {} (quality {:.2}): {}",
                            symbol,
                            fetched.provider,
                            fetched.quality.value,
                            record
                        );
                    }
                    Err(err) => report_failure(&symbol.to_string(), &err),
                }
            }
        }
        Job::Bars { period, span } => {
            let results = pool
                .fetch_bars(&config.symbols, period, span, &providers)
                .await;
            for (symbol, result) in results {
                match result {
                    Ok(fetched) => {
                        let latest = match fetched.record.latest() {
                            Some(bar) => serde_json::to_string(bar)?,
                            None => String::new(),
                        };
                        tracing::info!(
                            "{} from {}: {} bar(s), latest {}",
                            symbol,
                            fetched.provider,
                            fetched.record.len(),
                            latest
                        );
                    }
                    Err(err) => report_failure(&symbol.to_string(), &err),
                }
            }
        }
    }

    let snapshot = pool
        .snapshot(None)
        .context("fetch pool was built without a reliability aggregator")?;
    let summary = serde_json::to_string(&snapshot)?;
    tracing::info!("Reliability: {}", summary);
    for (rank, provider) in snapshot.ranked().iter().enumerate() {
        tracing::info!(
            "#{} {}: {}/{} succeeded, mean quality {}",
            rank + 1,
            provider.provider,
            provider.successes,
            provider.attempts,
            provider
                .mean_quality
                .map(|q| format!("{:.2}", q))
                .unwrap_or_else(|| "n/a".to_string())
        );
    }
    Ok(())
}

fn report_failure(symbol: &str, err: &MarketDataError) {
    match err.diagnostics() {
        Some(diagnostics) => {
            tracing::warn!("{} failed: {}", symbol, diagnostics.summary())
        }
        None => tracing::warn!("{} failed: {}", symbol, err),
    }
}

fn init_tracing() {
    let log_format = std::env::var("QF_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}
