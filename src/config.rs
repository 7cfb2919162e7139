//! Engine and upload configuration with environment variable overrides.

use std::time::Duration;

/// Timing configuration for the reconciliation engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interval between store readiness polls (default: 500ms)
    pub readiness_poll_interval: Duration,
    /// Overall bound on waiting for store readiness (default: 15s)
    pub readiness_timeout: Duration,
    /// Debounce window coalescing change bursts into one pass (default: 1s)
    pub debounce: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            readiness_poll_interval: Duration::from_millis(500),
            readiness_timeout: Duration::from_secs(15),
            debounce: Duration::from_secs(1),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = env_ms("VITRINE_READY_POLL_MS") {
            config.readiness_poll_interval = ms;
        }
        if let Some(ms) = env_ms("VITRINE_READY_TIMEOUT_MS") {
            config.readiness_timeout = ms;
        }
        if let Some(ms) = env_ms("VITRINE_DEBOUNCE_MS") {
            config.debounce = ms;
        }

        config
    }
}

/// Configuration for the HTTP upload gateway
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Upload endpoint URL
    pub endpoint: String,
    /// Unsigned upload preset sent alongside the file
    pub preset: String,
    /// Hard bound on the whole upload call (default: 30s)
    pub timeout: Duration,
    /// Maximum accepted payload size in bytes (default: 10 MB)
    pub max_bytes: usize,
}

impl UploadConfig {
    pub fn new(endpoint: impl Into<String>, preset: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            preset: preset.into(),
            timeout: Duration::from_secs(30),
            max_bytes: 10 * 1024 * 1024,
        }
    }

    /// Create config from environment variables.
    ///
    /// Returns `None` unless both `VITRINE_UPLOAD_URL` and
    /// `VITRINE_UPLOAD_PRESET` are set.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("VITRINE_UPLOAD_URL").ok()?;
        let preset = std::env::var("VITRINE_UPLOAD_PRESET").ok()?;
        let mut config = Self::new(endpoint, preset);

        if let Some(ms) = env_ms("VITRINE_UPLOAD_TIMEOUT_MS") {
            config.timeout = ms;
        }
        if let Ok(val) = std::env::var("VITRINE_UPLOAD_MAX_MB") {
            if let Ok(mb) = val.parse::<usize>() {
                config.max_bytes = mb * 1024 * 1024;
            }
        }

        Some(config)
    }
}

fn env_ms(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_millis)
}
