//! Record model - raw store documents and the validated media record.
//!
//! `RawRecord` mirrors the flat key-value shape delivered by the record
//! store, with serde aliases covering the historical field spellings
//! (`section`/`category` for the zone tag, `url` for the media URL).
//! `MediaRecord` is the validated form used for rendering: it always has a
//! resolvable URL. Records that fail validation are excluded from rendering
//! but kept in the engine's record map for diagnostics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// A record as delivered by the record store - flat, loosely typed,
/// with every field except `id` optional in practice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Opaque unique identifier assigned by the store; immutable
    pub id: String,

    /// Zone tag; legacy records used `section` or `category`
    #[serde(default, alias = "section", alias = "category")]
    pub zone: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Absolute URL to the rendered asset; legacy records used `url`
    #[serde(default, rename = "mediaUrl", alias = "url")]
    pub media_url: Option<String>,

    /// Inactive records are fetched but never rendered
    #[serde(default = "default_true")]
    pub active: bool,

    /// Used only for stable newest-first ordering
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,

    /// Free-text provenance; informational only
    #[serde(default, rename = "ownerTag", alias = "createdBy")]
    pub owner_tag: Option<String>,
}

impl RawRecord {
    /// The asset URL, if it resolves to something renderable.
    ///
    /// A record with no resolvable URL is invalid for rendering.
    pub fn resolved_url(&self) -> Option<&str> {
        let url = self.media_url.as_deref()?.trim();
        if url.starts_with("http://") || url.starts_with("https://") {
            Some(url)
        } else {
            None
        }
    }
}

/// A validated media record, ready for classification and rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub media_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub owner_tag: Option<String>,
}

impl MediaRecord {
    /// Validate a raw record for rendering.
    ///
    /// Returns `None` when the record has no resolvable URL. Activity is
    /// not checked here; inactive records are filtered by the caller.
    pub fn from_raw(raw: &RawRecord) -> Option<MediaRecord> {
        let media_url = raw.resolved_url()?.to_string();
        Some(MediaRecord {
            id: raw.id.clone(),
            title: raw.title.trim().to_string(),
            description: raw
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            media_url,
            created_at: raw.created_at,
            owner_tag: raw.owner_tag.clone(),
        })
    }

    fn order_key(&self) -> (DateTime<Utc>, &str) {
        (
            self.created_at.unwrap_or(DateTime::<Utc>::MIN_UTC),
            self.id.as_str(),
        )
    }
}

/// Sort newest-first by `created_at`, ties broken by `id` so the order is
/// total and deterministic across passes.
pub fn sort_newest_first(records: &mut [MediaRecord]) {
    records.sort_by(|a, b| b.order_key().cmp(&a.order_key()));
}
