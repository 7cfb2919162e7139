//! Error types for the reconciliation engine and its collaborators.
//!
//! Every external call boundary (store, render adapter, cache, upload) has
//! its own error enum. Errors are caught and logged at the boundary where
//! the call was made; none of them propagate out of the engine to the host.

use std::time::Duration;

use thiserror::Error;

use crate::zone::Zone;

/// Error types for record store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Readiness poll not satisfied within the configured timeout.
    /// A startup state rather than a hard failure; the engine degrades.
    #[error("record store not ready after {0:?}")]
    Unavailable(Duration),

    /// Live subscription could not be established or failed afterwards
    #[error("subscription failed: {0}")]
    Subscription(String),

    /// One-shot full fetch failed
    #[error("fetch failed: {0}")]
    Fetch(String),
}

/// Error types for render adapter operations
#[derive(Debug, Error)]
pub enum RenderError {
    /// No container resolved for the zone
    #[error("no container for zone {0}")]
    ContainerMissing(Zone),

    /// Card construction failed
    #[error("render failed for zone {zone}: {reason}")]
    Failed { zone: Zone, reason: String },
}

/// Error types for the snapshot cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Error types for the upload gateway
#[derive(Debug, Error)]
pub enum UploadError {
    /// Payload rejected client-side (size or content type)
    #[error("upload rejected: {0}")]
    Rejected(String),

    /// Remote service did not answer within the fixed timeout
    #[error("upload timed out after {0:?}")]
    Timeout(Duration),

    /// Network-level failure
    #[error("upload transport error: {0}")]
    Transport(String),

    /// Service answered, but not with a usable URL
    #[error("upload response unusable: {0}")]
    BadResponse(String),
}
