//! Engine configuration.
//!
//! Every knob that shapes network behavior is a plain value here so tests can
//! run with zero delays and callers can tune without touching engine code.

use std::time::Duration;

/// Desktop browser user agent; several upstream services reject bare clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client settings shared by all providers.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Hard per-request timeout. A timeout is an ordinary transport failure.
    pub timeout: Duration,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
        }
    }
}

/// How one logical fetch walks its provider list.
#[derive(Clone, Debug)]
pub struct FetchPolicy {
    /// Pause before every attempt after the first.
    pub inter_attempt_delay: Duration,
    /// Minimum quality score to accept a quote. `0.0` accepts anything that
    /// scored above zero.
    pub quality_threshold: f64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            inter_attempt_delay: Duration::from_secs(1),
            quality_threshold: 0.0,
        }
    }
}

impl FetchPolicy {
    /// No delay and the default threshold. Meant for tests and replays.
    pub fn immediate() -> Self {
        Self {
            inter_attempt_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Bounded worker pool settings.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Logical fetches in flight at once.
    pub max_concurrency: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

/// Everything needed to stand up a fetch engine.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub transport: TransportConfig,
    pub policy: FetchPolicy,
    pub pool: PoolConfig,
    /// Attempt log capacity; `None` keeps every attempt.
    pub history_capacity: Option<usize>,
}
