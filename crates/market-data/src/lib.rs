//! Quotefeed Market Data Crate
//!
//! This crate fetches A-share quotes and K-line bars from several free,
//! unofficial web endpoints and normalizes them into one canonical schema.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Realtime quotes with five-level order books
//! - Fundamentals (turnover rate, P/E, P/B, market capitalization)
//! - Intraday and daily bars
//! - Multiple providers: Sina, Sina market center, Tencent, EastMoney
//! - Ordered failover with per-attempt diagnostics and quality scoring
//! - Process-wide provider reliability statistics
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |   FetchPool      | --> |   Orchestrator   |  (one logical fetch per symbol)
//! +------------------+     +------------------+
//!                                  |  for each provider, in order
//!                                  v
//!                          +------------------+
//!                          |    Transport     |  (RawPayload: bytes + status)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  Source Adapter  |  (wire shape + FieldMapping)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  Quality Scorer  |  (accept, or try the next one)
//!                          +------------------+
//!                                  |
//!                                  v
//!                    CanonicalQuote / KlineSeries
//!                    + FetchAttempt -> ReliabilityAggregator
//! ```
//!
//! # Core Types
//!
//! - [`Symbol`] - Listed security (`sz000498`, `600000.SS`)
//! - [`CanonicalQuote`] - Provider-independent quote
//! - [`KlineSeries`] - Ordered bars from one provider
//! - [`ProviderDescriptor`] - Immutable description of one provider
//! - [`FieldMapping`] - Declarative field table for one provider grammar
//! - [`FetchDiagnostics`] - Every attempt of one logical fetch
//! - [`ReliabilitySnapshot`] - Per-provider aggregates over all attempts

pub mod adapter;
pub mod config;
pub mod errors;
pub mod mapping;
pub mod models;
pub mod provider;
pub mod registry;

// Re-export all public types from models
pub use models::{
    BarPeriod, BookLevel, CanonicalField, CanonicalQuote, Charset, Exchange, KlineBar,
    KlineSeries, ProviderId, QuoteKind, RawPayload, RecordKind, Symbol, BOOK_DEPTH,
};

pub use config::{EngineConfig, FetchPolicy, PoolConfig, TransportConfig};
pub use errors::MarketDataError;
pub use mapping::{FieldMapping, FieldValue, MappingEntry, Scale, SourceKey, Unit, ValueKind};

// Re-export provider types
pub use provider::{
    HttpTransport, ProviderCatalog, ProviderDescriptor, Transport, TransportRequest,
    TransportResponse,
};

// Re-export registry types
pub use registry::{
    AttemptOutcome, FailoverOrchestrator, FetchAttempt, FetchDiagnostics, FetchPool, Fetched,
    ProviderReliability, QualityScore, QualityScorer, ReliabilityAggregator, ReliabilitySnapshot,
};
