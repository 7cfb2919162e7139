//! Reconciliation - converge a zone's rendered cards with its classified
//! record set using minimal insert/patch/remove/move operations.
//!
//! One function, parameterized by zone behavior, replaces the per-zone
//! copy-pasted update paths of the original dashboard scripts. The pass is
//! the sole writer of rendered state; no corrective pass is needed
//! afterwards.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::classify::classify;
use crate::record::{sort_newest_first, MediaRecord, RawRecord};
use crate::render::{CardContent, CardHandle, ContainerId, RenderAdapter};
use crate::zone::Zone;

/// A card currently rendered in a zone
#[derive(Debug, Clone)]
pub struct RenderedCard {
    pub id: String,
    pub content: CardContent,
    pub handle: CardHandle,
    /// Set when the card's asset failed to load; hidden cards stay
    /// rendered and hidden, never retried
    pub hidden: bool,
}

/// Rendered state for one zone
#[derive(Debug)]
pub struct ZoneState {
    /// Resolved once at startup; `None` means the zone is permanently
    /// inactive for this engine session
    pub container: Option<ContainerId>,
    /// Currently rendered cards in DOM order
    pub rendered: Vec<RenderedCard>,
}

impl ZoneState {
    pub fn new(container: Option<ContainerId>) -> Self {
        Self {
            container,
            rendered: Vec::new(),
        }
    }

    pub fn rendered_ids(&self) -> Vec<&str> {
        self.rendered.iter().map(|c| c.id.as_str()).collect()
    }
}

/// Operation counts from one zone reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneOps {
    pub inserted: usize,
    pub removed: usize,
    pub patched: usize,
    pub moved: usize,
}

impl ZoneOps {
    pub fn total(&self) -> usize {
        self.inserted + self.removed + self.patched + self.moved
    }

    pub fn merge(&mut self, other: ZoneOps) {
        self.inserted += other.inserted;
        self.removed += other.removed;
        self.patched += other.patched;
        self.moved += other.moved;
    }
}

/// Classify the active, URL-valid records and sort each zone's list
/// newest-first.
pub fn classify_and_sort(records: &HashMap<String, RawRecord>) -> HashMap<Zone, Vec<MediaRecord>> {
    let mut by_zone: HashMap<Zone, Vec<MediaRecord>> = HashMap::new();

    for raw in records.values() {
        if !raw.active {
            continue;
        }
        let Some(record) = MediaRecord::from_raw(raw) else {
            debug!(record_id = %raw.id, "record has no resolvable url, skipping");
            continue;
        };
        by_zone.entry(classify(raw)).or_default().push(record);
    }

    for list in by_zone.values_mut() {
        sort_newest_first(list);
    }
    by_zone
}

/// Converge one zone's rendered cards with its desired record list.
///
/// Removals first, then insertions at position, field-level patches for
/// survivors, and positional moves so DOM order equals the desired
/// newest-first order. `state.rendered` is updated after the operations
/// are applied. Running the same pass twice produces zero operations on
/// the second run.
pub fn reconcile_zone<R: RenderAdapter + ?Sized>(
    adapter: &R,
    zone: Zone,
    state: &mut ZoneState,
    desired: &[MediaRecord],
) -> ZoneOps {
    let mut ops = ZoneOps::default();
    let Some(container) = state.container.clone() else {
        return ops;
    };

    // Hero renders only the single newest active record; older records
    // stay in the store, simply not rendered.
    let desired = if zone.behavior().single_newest {
        &desired[..desired.len().min(1)]
    } else {
        desired
    };

    let new_ids: HashSet<&str> = desired.iter().map(|r| r.id.as_str()).collect();

    // Remove cards whose record left the desired set
    let mut survivors = Vec::with_capacity(state.rendered.len());
    for card in state.rendered.drain(..) {
        if new_ids.contains(card.id.as_str()) {
            survivors.push(card);
        } else {
            debug!(zone = %zone, record_id = %card.id, "removing card");
            adapter.remove_card(card.handle);
            ops.removed += 1;
        }
    }

    // Mirror of the container's card order after the removals above.
    // Every insert and move below is applied to the mirror too, so "is
    // this card already where it belongs" is answered against the real
    // DOM position, not the pre-pass order.
    let mut dom: Vec<CardHandle> = survivors.iter().map(|c| c.handle).collect();
    let mut surviving: HashMap<String, RenderedCard> = survivors
        .into_iter()
        .map(|card| (card.id.clone(), card))
        .collect();

    let mut next = Vec::with_capacity(desired.len());
    // Index of the next DOM slot to fill; trails the desired index when
    // an insert fails.
    let mut placed = 0usize;

    for record in desired {
        let content = CardContent::from_record(zone, record);

        if let Some(mut card) = surviving.remove(&record.id) {
            let patch = card.content.diff(&content);
            if !patch.is_empty() {
                debug!(zone = %zone, record_id = %card.id, "patching card");
                adapter.patch_card(card.handle, &patch);
                card.content = content;
                ops.patched += 1;
            }
            if dom.get(placed) != Some(&card.handle) {
                if let Some(current) = dom.iter().position(|h| *h == card.handle) {
                    dom.remove(current);
                }
                dom.insert(placed, card.handle);
                adapter.move_card(&container, card.handle, placed);
                ops.moved += 1;
            }
            placed += 1;
            next.push(card);
        } else {
            match adapter.insert_card(zone, &container, &content, placed) {
                Ok(handle) => {
                    debug!(zone = %zone, record_id = %record.id, position = placed, "inserted card");
                    dom.insert(placed, handle);
                    placed += 1;
                    next.push(RenderedCard {
                        id: record.id.clone(),
                        content,
                        handle,
                        hidden: false,
                    });
                    ops.inserted += 1;
                }
                Err(e) => {
                    warn!(zone = %zone, record_id = %record.id, error = %e, "card insert failed");
                }
            }
        }
    }

    state.rendered = next;

    if zone.behavior().carousel && ops.total() > 0 {
        adapter.sync_carousel(&container, state.rendered.len());
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{AdapterOp, RecordingAdapter};
    use chrono::{TimeZone, Utc};

    fn record(id: &str, title: &str, minute: u32) -> MediaRecord {
        MediaRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            media_url: format!("https://cdn.example.com/{id}.jpg"),
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()),
            owner_tag: None,
        }
    }

    fn gallery_state(adapter: &RecordingAdapter) -> ZoneState {
        ZoneState::new(adapter.resolve_container(Zone::Gallery))
    }

    #[test]
    fn test_insert_from_empty() {
        let adapter = RecordingAdapter::new();
        let mut state = gallery_state(&adapter);
        let desired = vec![record("b", "Mid Fade", 2), record("a", "High Fade", 1)];

        let ops = reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);

        assert_eq!(ops.inserted, 2);
        assert_eq!(ops.total(), 2);
        assert_eq!(state.rendered_ids(), vec!["b", "a"]);
        let titles: Vec<String> = adapter
            .cards_in(Zone::Gallery)
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Mid Fade", "High Fade"]);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let adapter = RecordingAdapter::new();
        let mut state = gallery_state(&adapter);
        let desired = vec![record("b", "Mid Fade", 2), record("a", "High Fade", 1)];

        reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);
        adapter.clear_ops();

        let ops = reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);
        assert_eq!(ops, ZoneOps::default());
        assert_eq!(adapter.op_count(), 0, "second run must not touch the DOM");
    }

    #[test]
    fn test_removal() {
        let adapter = RecordingAdapter::new();
        let mut state = gallery_state(&adapter);
        let mut desired = vec![record("b", "Mid Fade", 2), record("a", "High Fade", 1)];
        reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);

        desired.remove(1);
        let ops = reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);
        assert_eq!(ops.removed, 1);
        assert_eq!(state.rendered_ids(), vec!["b"]);
        assert_eq!(adapter.cards_in(Zone::Gallery).len(), 1);
    }

    #[test]
    fn test_patch_only_changed_fields() {
        let adapter = RecordingAdapter::new();
        let mut state = gallery_state(&adapter);
        let mut desired = vec![record("a", "High Fade", 1)];
        reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);
        adapter.clear_ops();

        desired[0].title = "High Fade Degradê".to_string();
        let ops = reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);

        assert_eq!(ops.patched, 1);
        assert_eq!(ops.inserted + ops.removed + ops.moved, 0);
        let ops_log = adapter.ops();
        let patches: Vec<&AdapterOp> = ops_log
            .iter()
            .filter(|op| matches!(op, AdapterOp::Patch { .. }))
            .collect();
        assert_eq!(patches.len(), 1);
        if let AdapterOp::Patch { patch, .. } = patches[0] {
            assert!(patch.title.is_some());
            assert!(patch.media_url.is_none(), "unchanged image must not reload");
        }
    }

    #[test]
    fn test_new_newest_record_prepends_without_moves() {
        let adapter = RecordingAdapter::new();
        let mut state = gallery_state(&adapter);
        let mut desired = vec![record("a", "High Fade", 1)];
        reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);
        adapter.clear_ops();

        desired.insert(0, record("b", "Mid Fade", 2));
        let ops = reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);

        assert_eq!(ops.inserted, 1);
        assert_eq!(ops.moved, 0, "insertion alone repositions the rest");
        assert_eq!(state.rendered_ids(), vec!["b", "a"]);
        let titles: Vec<String> = adapter
            .cards_in(Zone::Gallery)
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Mid Fade", "High Fade"]);
    }

    #[test]
    fn test_reorder_moves_card() {
        let adapter = RecordingAdapter::new();
        let mut state = gallery_state(&adapter);
        let mut desired = vec![record("b", "Mid Fade", 2), record("a", "High Fade", 1)];
        reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);

        desired.swap(0, 1);
        let ops = reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);
        assert!(ops.moved >= 1);
        assert_eq!(state.rendered_ids(), vec!["a", "b"]);
        let titles: Vec<String> = adapter
            .cards_in(Zone::Gallery)
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["High Fade", "Mid Fade"]);
    }

    #[test]
    fn test_multi_card_reorders_converge() {
        let adapter = RecordingAdapter::new();
        let mut state = gallery_state(&adapter);
        let cards: Vec<MediaRecord> = (0..4u32)
            .map(|i| record(&format!("r{i}"), &format!("T{i}"), i))
            .collect();

        // Orders where a card can sit at its old rank among survivors yet
        // at the wrong DOM position; [3,2,1,0] then [1,2,0,3] is one.
        let orders: [[usize; 4]; 4] = [[3, 2, 1, 0], [1, 2, 0, 3], [2, 0, 3, 1], [0, 1, 2, 3]];
        for order in orders {
            let desired: Vec<MediaRecord> = order.iter().map(|&i| cards[i].clone()).collect();
            reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);

            let titles: Vec<String> = adapter
                .cards_in(Zone::Gallery)
                .into_iter()
                .map(|c| c.title)
                .collect();
            let expected: Vec<String> = order.iter().map(|&i| format!("T{i}")).collect();
            assert_eq!(titles, expected, "after reorder to {order:?}");

            // The pass must actually converge, not just record that it did
            adapter.clear_ops();
            let ops = reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);
            assert_eq!(ops, ZoneOps::default(), "follow-up pass for {order:?}");
            assert_eq!(adapter.op_count(), 0);
        }
    }

    #[test]
    fn test_hero_renders_single_newest() {
        let adapter = RecordingAdapter::new();
        let mut state = ZoneState::new(adapter.resolve_container(Zone::Hero));
        let desired = vec![record("new", "Fachada nova", 5), record("old", "Fachada", 1)];

        let ops = reconcile_zone(&adapter, Zone::Hero, &mut state, &desired);
        assert_eq!(ops.inserted, 1);
        assert_eq!(state.rendered_ids(), vec!["new"]);

        // Deleting the newest promotes the next newest
        let desired = vec![record("old", "Fachada", 1)];
        let ops = reconcile_zone(&adapter, Zone::Hero, &mut state, &desired);
        assert_eq!(ops.removed, 1);
        assert_eq!(ops.inserted, 1);
        assert_eq!(state.rendered_ids(), vec!["old"]);
    }

    #[test]
    fn test_team_carousel_synced_on_change_only() {
        let adapter = RecordingAdapter::new();
        let mut state = ZoneState::new(adapter.resolve_container(Zone::Team));
        let desired = vec![record("p1", "Barbeiro", 2), record("p2", "Equipe", 1)];

        reconcile_zone(&adapter, Zone::Team, &mut state, &desired);
        assert_eq!(adapter.carousel_len(Zone::Team), Some(2));
        adapter.clear_ops();

        // No change: no carousel op either
        reconcile_zone(&adapter, Zone::Team, &mut state, &desired);
        assert_eq!(adapter.op_count(), 0);
    }

    #[test]
    fn test_missing_container_is_inert() {
        let adapter = RecordingAdapter::new().without_zone(Zone::Gallery);
        let mut state = ZoneState::new(adapter.resolve_container(Zone::Gallery));
        let desired = vec![record("a", "High Fade", 1)];

        let ops = reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);
        assert_eq!(ops, ZoneOps::default());
        assert_eq!(adapter.op_count(), 0);
    }

    #[test]
    fn test_insert_failure_skips_record() {
        let adapter = RecordingAdapter::new();
        adapter.set_fail_inserts(true);
        let mut state = gallery_state(&adapter);
        let desired = vec![record("a", "High Fade", 1)];

        let ops = reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);
        assert_eq!(ops.inserted, 0);
        assert!(state.rendered.is_empty());

        // Once inserts work again the record converges
        adapter.set_fail_inserts(false);
        let ops = reconcile_zone(&adapter, Zone::Gallery, &mut state, &desired);
        assert_eq!(ops.inserted, 1);
    }

    #[test]
    fn test_classify_and_sort_filters_and_orders() {
        let mut records = HashMap::new();
        let mut active = RawRecord {
            id: "1".to_string(),
            zone: Some("gallery".to_string()),
            title: "Fade".to_string(),
            description: None,
            media_url: Some("https://x/1.jpg".to_string()),
            active: true,
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
            owner_tag: None,
        };
        records.insert("1".to_string(), active.clone());

        active.id = "2".to_string();
        active.active = false;
        records.insert("2".to_string(), active.clone());

        active.id = "3".to_string();
        active.active = true;
        active.media_url = Some("img/relative.jpg".to_string());
        records.insert("3".to_string(), active);

        let by_zone = classify_and_sort(&records);
        let gallery = by_zone.get(&Zone::Gallery).unwrap();
        // inactive and URL-invalid records are excluded
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery[0].id, "1");
    }
}
