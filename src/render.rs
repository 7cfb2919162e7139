//! Render adapter contract - the seam between the engine and the page.
//!
//! The adapter owns markup and container resolution; the engine only ever
//! operates on handles it created through the adapter. Branding and other
//! static page elements are invisible to the engine by construction: no
//! handle for them exists, so no operation can touch them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::RenderError;
use crate::record::MediaRecord;
use crate::zone::Zone;

/// Reference to a zone's rendered container, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(pub String);

/// Handle to a single rendered card, minted by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardHandle(pub u64);

/// The displayable fields of a card. Placeholders are applied before this
/// is built, so comparisons between passes are stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardContent {
    pub title: String,
    pub description: String,
    pub media_url: String,
}

impl CardContent {
    /// Build display content for a record, substituting the zone's
    /// placeholder strings for missing title/description.
    pub fn from_record(zone: Zone, record: &MediaRecord) -> Self {
        let behavior = zone.behavior();
        let title = if record.title.is_empty() {
            behavior.placeholder_title.to_string()
        } else {
            record.title.clone()
        };
        let description = record
            .description
            .clone()
            .unwrap_or_else(|| behavior.placeholder_description.to_string());
        Self {
            title,
            description,
            media_url: record.media_url.clone(),
        }
    }

    /// Fields of `new` that differ from `self`
    pub fn diff(&self, new: &CardContent) -> CardPatch {
        CardPatch {
            title: (self.title != new.title).then(|| new.title.clone()),
            description: (self.description != new.description).then(|| new.description.clone()),
            media_url: (self.media_url != new.media_url).then(|| new.media_url.clone()),
        }
    }
}

/// A partial update carrying only the fields that changed, so unchanged
/// images are not reloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub media_url: Option<String>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.media_url.is_none()
    }
}

/// Zone name to container handle, record to markup.
///
/// Implementations are synchronous: rendering targets an already-loaded
/// page, not the network.
pub trait RenderAdapter: Send + Sync {
    /// Resolve the container for a zone. `None` leaves the zone
    /// permanently inactive for the engine session; it is not retried.
    fn resolve_container(&self, zone: Zone) -> Option<ContainerId>;

    /// Construct a card at `position` within the container
    fn insert_card(
        &self,
        zone: Zone,
        container: &ContainerId,
        content: &CardContent,
        position: usize,
    ) -> Result<CardHandle, RenderError>;

    /// Apply changed fields to an existing card
    fn patch_card(&self, handle: CardHandle, patch: &CardPatch);

    /// Remove a card from its container
    fn remove_card(&self, handle: CardHandle);

    /// Reposition a card within its container
    fn move_card(&self, container: &ContainerId, handle: CardHandle, position: usize);

    /// Hide a card in place (asset failed to load); the card remains
    /// rendered but invisible
    fn hide_card(&self, handle: CardHandle);

    /// Resize the carousel indicator list to `slide_count` and mark the
    /// first slide active
    fn sync_carousel(&self, container: &ContainerId, slide_count: usize);
}

/// One recorded adapter operation, for test assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterOp {
    Insert {
        zone: Zone,
        container: ContainerId,
        content: CardContent,
        position: usize,
        handle: CardHandle,
    },
    Patch {
        handle: CardHandle,
        patch: CardPatch,
    },
    Remove {
        handle: CardHandle,
    },
    Move {
        handle: CardHandle,
        position: usize,
    },
    Hide {
        handle: CardHandle,
    },
    SyncCarousel {
        container: ContainerId,
        slide_count: usize,
    },
}

#[derive(Debug, Clone)]
struct CardState {
    content: CardContent,
    hidden: bool,
}

#[derive(Default)]
struct RecordingInner {
    ops: Vec<AdapterOp>,
    /// DOM order per container
    containers: HashMap<ContainerId, Vec<CardHandle>>,
    cards: HashMap<CardHandle, CardState>,
    carousel: HashMap<ContainerId, usize>,
}

/// Render adapter for testing and local development: maintains an
/// in-memory model of each container and records every operation.
pub struct RecordingAdapter {
    zone_containers: HashMap<Zone, ContainerId>,
    inner: Mutex<RecordingInner>,
    next_handle: AtomicU64,
    fail_inserts: AtomicBool,
}

impl RecordingAdapter {
    /// Adapter with a container for every zone, using the selectors the
    /// live page uses
    pub fn new() -> Self {
        let zone_containers = [
            (Zone::Hero, ContainerId(".hero".to_string())),
            (Zone::Services, ContainerId(".services-grid".to_string())),
            (Zone::Gallery, ContainerId(".gallery-grid".to_string())),
            (Zone::Team, ContainerId("#carouselTrack".to_string())),
        ]
        .into_iter()
        .collect();

        Self {
            zone_containers,
            inner: Mutex::new(RecordingInner::default()),
            next_handle: AtomicU64::new(1),
            fail_inserts: AtomicBool::new(false),
        }
    }

    /// Drop a zone's container, simulating a page without that region
    pub fn without_zone(mut self, zone: Zone) -> Self {
        self.zone_containers.remove(&zone);
        self
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::Relaxed);
    }

    /// All operations recorded so far
    pub fn ops(&self) -> Vec<AdapterOp> {
        self.inner.lock().unwrap().ops.clone()
    }

    pub fn op_count(&self) -> usize {
        self.inner.lock().unwrap().ops.len()
    }

    pub fn clear_ops(&self) {
        self.inner.lock().unwrap().ops.clear();
    }

    /// Card contents for a zone in current DOM order
    pub fn cards_in(&self, zone: Zone) -> Vec<CardContent> {
        let Some(container) = self.zone_containers.get(&zone) else {
            return Vec::new();
        };
        let inner = self.inner.lock().unwrap();
        inner
            .containers
            .get(container)
            .map(|handles| {
                handles
                    .iter()
                    .filter_map(|h| inner.cards.get(h))
                    .map(|c| c.content.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_hidden(&self, handle: CardHandle) -> bool {
        self.inner
            .lock()
            .unwrap()
            .cards
            .get(&handle)
            .map(|c| c.hidden)
            .unwrap_or(false)
    }

    /// Indicator count last synced for a zone's carousel
    pub fn carousel_len(&self, zone: Zone) -> Option<usize> {
        let container = self.zone_containers.get(&zone)?;
        self.inner.lock().unwrap().carousel.get(container).copied()
    }
}

impl Default for RecordingAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderAdapter for RecordingAdapter {
    fn resolve_container(&self, zone: Zone) -> Option<ContainerId> {
        self.zone_containers.get(&zone).cloned()
    }

    fn insert_card(
        &self,
        zone: Zone,
        container: &ContainerId,
        content: &CardContent,
        position: usize,
    ) -> Result<CardHandle, RenderError> {
        if self.fail_inserts.load(Ordering::Relaxed) {
            return Err(RenderError::Failed {
                zone,
                reason: "injected failure".to_string(),
            });
        }

        let handle = CardHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let mut inner = self.inner.lock().unwrap();
        let order = inner.containers.entry(container.clone()).or_default();
        let position = position.min(order.len());
        order.insert(position, handle);
        inner.cards.insert(
            handle,
            CardState {
                content: content.clone(),
                hidden: false,
            },
        );
        inner.ops.push(AdapterOp::Insert {
            zone,
            container: container.clone(),
            content: content.clone(),
            position,
            handle,
        });
        Ok(handle)
    }

    fn patch_card(&self, handle: CardHandle, patch: &CardPatch) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(card) = inner.cards.get_mut(&handle) {
            if let Some(title) = &patch.title {
                card.content.title = title.clone();
            }
            if let Some(description) = &patch.description {
                card.content.description = description.clone();
            }
            if let Some(media_url) = &patch.media_url {
                card.content.media_url = media_url.clone();
            }
        }
        inner.ops.push(AdapterOp::Patch {
            handle,
            patch: patch.clone(),
        });
    }

    fn remove_card(&self, handle: CardHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.cards.remove(&handle);
        for order in inner.containers.values_mut() {
            order.retain(|h| *h != handle);
        }
        inner.ops.push(AdapterOp::Remove { handle });
    }

    fn move_card(&self, container: &ContainerId, handle: CardHandle, position: usize) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(order) = inner.containers.get_mut(container) {
            order.retain(|h| *h != handle);
            let position = position.min(order.len());
            order.insert(position, handle);
        }
        inner.ops.push(AdapterOp::Move { handle, position });
    }

    fn hide_card(&self, handle: CardHandle) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(card) = inner.cards.get_mut(&handle) {
            card.hidden = true;
        }
        inner.ops.push(AdapterOp::Hide { handle });
    }

    fn sync_carousel(&self, container: &ContainerId, slide_count: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.carousel.insert(container.clone(), slide_count);
        inner.ops.push(AdapterOp::SyncCarousel {
            container: container.clone(),
            slide_count,
        });
    }
}
