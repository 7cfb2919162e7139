//! Vitrine - media reconciliation engine
//!
//! One-way, best-effort synchronization of a remote collection of tagged
//! media records into categorized display zones. An admin dashboard writes
//! records to a hosted store; this engine observes them, classifies each
//! record into a zone (hero, services, gallery, team), and converges each
//! zone's rendered output with minimal insert/patch/remove operations.
//!
//! ## Components
//!
//! - **Engine**: subscription lifecycle, debounced passes, degradation chain
//! - **Classification**: pure record-to-zone mapping with keyword fallback
//! - **Reconciliation**: per-zone diffing against the rendered set
//! - **Store / Render / Cache / Upload**: trait seams for the external
//!   collaborators; the engine owns none of their implementations

pub mod cache;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod render;
pub mod store;
pub mod upload;
pub mod zone;

pub use cache::{FileSnapshotCache, MemorySnapshotCache, Snapshot, SnapshotCache};
pub use classify::classify;
pub use config::{EngineConfig, UploadConfig};
pub use engine::{Diagnostics, EngineState, MediaSyncEngine};
pub use error::{CacheError, RenderError, StoreError, UploadError};
pub use record::{MediaRecord, RawRecord};
pub use render::{CardContent, CardHandle, CardPatch, ContainerId, RenderAdapter};
pub use store::{ChangeBatch, RecordChange, RecordStore};
pub use upload::{HttpUploadGateway, UploadGateway, UploadMetadata};
pub use zone::Zone;
