//! Error types and attempt classification for the market data crate.
//!
//! This module provides [`MarketDataError`], the single error enum for all
//! market data operations. Errors raised below the failover orchestrator are
//! recoverable: [`MarketDataError::attempt_outcome`] maps each one to the
//! [`AttemptOutcome`] recorded for the provider that produced it, and the
//! orchestrator moves on to the next provider.

use thiserror::Error;

use crate::registry::{AttemptOutcome, FetchDiagnostics};

/// Errors that can occur during market data operations.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The symbol is not a recognizable listed code.
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// No provider descriptor is registered under this id.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Connection failure or body read failure.
    #[error("Transport error: {provider} - {message}")]
    Transport {
        /// The provider being contacted
        provider: String,
        /// Underlying client error
        message: String,
    },

    /// The request exceeded the transport timeout.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered with a non-success status.
    #[error("HTTP {status} from {provider}")]
    Http {
        /// The provider that answered
        provider: String,
        /// HTTP status code
        status: u16,
    },

    /// The payload does not match the provider's grammar at all.
    /// Usually a wrong symbol for this provider or an upstream contract change.
    #[error("Format error: {provider} - {message}")]
    Format {
        /// The provider whose payload was rejected
        provider: String,
        /// What was expected and not found
        message: String,
    },

    /// A value could not be converted to the field's kind.
    #[error("Parse error: {field} = {value:?}")]
    Parse {
        /// Canonical field (or record part) being converted
        field: String,
        /// Offending raw text
        value: String,
    },

    /// The record parsed but scored below the acceptance threshold.
    #[error("Low quality result from {provider}: score {score:.2} below threshold {threshold:.2}")]
    LowQuality {
        /// The provider whose record was rejected
        provider: String,
        /// Score the record achieved
        score: f64,
        /// Minimum the caller asked for
        threshold: f64,
    },

    /// The provider has no endpoint for the requested record kind.
    #[error("Unsupported: {provider} does not serve {kind}")]
    Unsupported {
        /// The provider asked
        provider: String,
        /// Requested record kind
        kind: String,
    },

    /// Every provider in the list was tried and rejected.
    #[error("All providers failed: {}", .0.summary())]
    Exhausted(FetchDiagnostics),

    /// The fetch was cancelled between provider attempts.
    #[error("Fetch cancelled after {} attempt(s)", .0.attempts.len())]
    Cancelled(FetchDiagnostics),
}

impl MarketDataError {
    /// Returns the attempt outcome this error stands for.
    ///
    /// Recoverable errors map to the outcome recorded against the provider
    /// before moving on. Terminal errors (bad input, exhaustion,
    /// cancellation) return `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotefeed_market_data::errors::MarketDataError;
    /// use quotefeed_market_data::AttemptOutcome;
    ///
    /// let error = MarketDataError::Timeout { provider: "SINA".to_string() };
    /// assert_eq!(error.attempt_outcome(), Some(AttemptOutcome::TransportError));
    ///
    /// let error = MarketDataError::InvalidSymbol("xx1".to_string());
    /// assert_eq!(error.attempt_outcome(), None);
    /// ```
    pub fn attempt_outcome(&self) -> Option<AttemptOutcome> {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } | Self::Http { .. } => {
                Some(AttemptOutcome::TransportError)
            }
            Self::Format { .. } => Some(AttemptOutcome::FormatError),
            Self::Parse { .. } => Some(AttemptOutcome::ParseError),
            Self::LowQuality { .. } => Some(AttemptOutcome::LowQuality),
            Self::Unsupported { .. } => Some(AttemptOutcome::Unsupported),
            Self::InvalidSymbol(_)
            | Self::UnknownProvider(_)
            | Self::Exhausted(_)
            | Self::Cancelled(_) => None,
        }
    }

    /// Diagnostics carried by a terminal fetch failure.
    pub fn diagnostics(&self) -> Option<&FetchDiagnostics> {
        match self {
            Self::Exhausted(d) | Self::Cancelled(d) => Some(d),
            _ => None,
        }
    }

    pub(crate) fn format(provider: &str, message: impl Into<String>) -> Self {
        Self::Format {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}
