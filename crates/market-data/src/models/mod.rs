//! Market data models
//!
//! This module contains the core data types shared by every layer:
//! - `types` - Type aliases for common identifiers (ProviderId)
//! - `symbol` - Listed security identity (Symbol, Exchange)
//! - `kind` - What a fetch asks for (QuoteKind, BarPeriod, RecordKind)
//! - `field` - Canonical semantic fields (CanonicalField)
//! - `quote` - The canonical quote record (CanonicalQuote, BookLevel)
//! - `kline` - Bar records (KlineBar, KlineSeries)
//! - `payload` - Undecoded transport output (RawPayload, Charset)

mod field;
mod kind;
mod kline;
mod payload;
mod quote;
mod symbol;
mod types;

pub use field::{CanonicalField, BOOK_DEPTH};
pub use kind::{BarPeriod, QuoteKind, RecordKind};
pub use kline::{KlineBar, KlineSeries};
pub use payload::{Charset, RawPayload};
pub use quote::{BookLevel, CanonicalQuote};
pub use symbol::{Exchange, Symbol};
pub use types::ProviderId;
