//! Scroll target registry
//!
//! Keeps a catalog of the page's selectable scroll targets (id -> element)
//! fresh for the surrounding UI. Rebuilt on mount, on DOM mutations and on
//! viewport resize, with bursts coalesced by a debounce window.
//!
//! # Lifecycle
//!
//! ```text
//! mount ──► scan ──► notify(options)
//!   │
//!   ▼
//! poll(now) ── mutation / resize ──► arm debounce
//!   │                                    │ (window elapsed)
//!   │                                    ▼
//!   │                               scan ──► notify(options)
//!   ▼
//! unmount ──► disconnect, clear, notify([])
//! ```
//!
//! Every rebuild replaces the catalog wholesale. Elements inside the
//! overlay's own subtree are never offered.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tether_core::Debouncer;

use crate::document::{Document, NodeId, ObserverId, ObserverOptions};
use crate::scrollable::is_scrollable;
use crate::target_id::{element_target_id, element_target_label, DEFAULT_MAX_ID_DEPTH};

/// Attributes whose changes can alter scrollability or labels
pub const OBSERVED_ATTRIBUTES: [&str; 5] = ["style", "class", "id", "aria-label", "role"];

/// Default debounce window for rescans
pub const DEFAULT_RESCAN_DEBOUNCE: Duration = Duration::from_millis(150);

/// One selectable scroll target as shown to the user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCatalogEntry {
    pub id: String,
    pub label: String,
}

/// Catalog of scroll targets produced by one scan
#[derive(Clone, Debug, Default)]
pub struct TargetCatalog {
    targets: IndexMap<String, NodeId>,
    entries: Vec<TargetCatalogEntry>,
}

impl TargetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the element behind a catalog id
    pub fn get(&self, id: &str) -> Option<NodeId> {
        self.targets.get(id).copied()
    }

    /// Options in document order
    pub fn entries(&self) -> &[TargetCatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.targets.values().any(|n| *n == node)
    }

    /// Add an entry; an id seen before is ignored (first seen wins)
    fn insert(&mut self, id: String, label: String, node: NodeId) -> bool {
        if self.targets.contains_key(&id) {
            return false;
        }
        self.targets.insert(id.clone(), node);
        self.entries.push(TargetCatalogEntry { id, label });
        true
    }
}

/// Scan `doc` for selectable scroll targets
///
/// Skips anything inside `overlay`, anything not scrollable, and anything
/// with a zero-area bounding rect.
pub fn scan_scroll_targets(
    doc: &Document,
    overlay: Option<NodeId>,
    max_id_depth: usize,
) -> TargetCatalog {
    let mut catalog = TargetCatalog::new();

    for node in doc.descendants(doc.body()) {
        if overlay.is_some_and(|root| doc.contains(root, node)) {
            continue;
        }
        if !is_scrollable(doc, node) {
            continue;
        }
        if !doc.get(node).is_some_and(|data| data.bounds().has_area()) {
            continue;
        }

        let id = element_target_id(doc, node, max_id_depth);
        if catalog.targets.contains_key(&id) {
            tracing::trace!(%id, ?node, "duplicate scroll target id collapsed");
            continue;
        }
        let label = element_target_label(doc, node);
        catalog.insert(id, label, node);
    }

    catalog
}

/// Registry configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Quiet window before a rescan runs
    pub debounce: Duration,
    /// Levels walked when building structural ids
    pub max_id_depth: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_RESCAN_DEBOUNCE,
            max_id_depth: DEFAULT_MAX_ID_DEPTH,
        }
    }
}

/// Callback receiving the full option list after every rebuild
pub type TargetsChangedCallback = Box<dyn FnMut(&[TargetCatalogEntry])>;

/// Live, debounced catalog of page scroll targets
pub struct ScrollTargetRegistry {
    config: RegistryConfig,
    overlay_root: Option<NodeId>,
    catalog: TargetCatalog,
    debounce: Debouncer,
    observer: Option<ObserverId>,
    listeners: Vec<TargetsChangedCallback>,
    rebuild_count: u64,
}

impl Default for ScrollTargetRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl ScrollTargetRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            overlay_root: None,
            catalog: TargetCatalog::new(),
            debounce: Debouncer::new(config.debounce),
            observer: None,
            listeners: Vec::new(),
            rebuild_count: 0,
        }
    }

    /// Exclude the overlay's own subtree from every scan
    pub fn with_overlay_root(mut self, overlay: NodeId) -> Self {
        self.overlay_root = Some(overlay);
        self
    }

    pub fn set_overlay_root(&mut self, overlay: Option<NodeId>) {
        self.overlay_root = overlay;
    }

    /// Register a listener for option list changes
    pub fn on_targets_changed<F>(&mut self, callback: F)
    where
        F: FnMut(&[TargetCatalogEntry]) + 'static,
    {
        self.listeners.push(Box::new(callback));
    }

    pub fn catalog(&self) -> &TargetCatalog {
        &self.catalog
    }

    pub fn is_mounted(&self) -> bool {
        self.observer.is_some()
    }

    /// Number of rebuilds since creation
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    pub fn has_pending_rescan(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Scan immediately and start watching `body` for changes
    pub fn mount(&mut self, doc: &mut Document) {
        if let Some(previous) = self.observer.take() {
            doc.disconnect(previous);
        }

        let body = doc.body();
        self.observer = Some(doc.observe(
            body,
            ObserverOptions {
                child_list: true,
                subtree: true,
                attribute_filter: OBSERVED_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
            },
        ));
        // Resizes that happened before mount are covered by the first scan
        doc.take_resize();
        self.rebuild(doc);
    }

    /// Arm the debounce window as if a change was observed
    pub fn request_rescan(&mut self, now: Duration) {
        self.debounce.schedule(now);
    }

    /// Drain observed changes and rebuild once the debounce window elapses
    ///
    /// Returns true if the catalog was rebuilt.
    pub fn poll(&mut self, doc: &mut Document, now: Duration) -> bool {
        let Some(observer) = self.observer else {
            return false;
        };

        let records = doc.take_records(observer);
        let resized = doc.take_resize();
        if !records.is_empty() || resized {
            tracing::trace!(mutations = records.len(), resized, "scroll target rescan armed");
            self.debounce.schedule(now);
        }

        if self.debounce.poll(now) {
            self.rebuild(doc);
            return true;
        }
        false
    }

    /// Replace the catalog with a fresh scan and notify listeners
    pub fn rebuild(&mut self, doc: &Document) {
        self.catalog = scan_scroll_targets(doc, self.overlay_root, self.config.max_id_depth);
        self.rebuild_count += 1;
        tracing::debug!(
            targets = self.catalog.len(),
            rebuild = self.rebuild_count,
            "scroll target catalog rebuilt"
        );
        self.notify();
    }

    /// Stop watching, drop the catalog and notify listeners with no options
    pub fn unmount(&mut self, doc: &mut Document) {
        if let Some(observer) = self.observer.take() {
            doc.disconnect(observer);
        }
        self.debounce.cancel();
        self.catalog = TargetCatalog::new();
        self.notify();
    }

    fn notify(&mut self) {
        let entries = self.catalog.entries();
        for listener in &mut self.listeners {
            listener(entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Element, Overflow};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tether_core::Size;

    fn scroller(id: &str, range: f64) -> Element {
        Element::new("div")
            .id(id)
            .overflow_y(Overflow::Auto)
            .size(300.0, 200.0)
            .content_size(300.0, 200.0 + range)
    }

    fn page_with_overlay() -> (Document, NodeId) {
        let mut doc = Document::new(Size::new(1024.0, 768.0));
        let body = doc.body();
        doc.append(body, scroller("feed", 800.0));
        doc.append(body, scroller("sidebar", 100.0));
        let overlay = doc.append(
            body,
            Element::new("div")
                .id("tether-overlay")
                .size(1024.0, 768.0)
                .child(scroller("overlay-panel", 5000.0)),
        );
        (doc, overlay)
    }

    #[test]
    fn test_scan_excludes_overlay_subtree() {
        let (doc, overlay) = page_with_overlay();
        let catalog = scan_scroll_targets(&doc, Some(overlay), DEFAULT_MAX_ID_DEPTH);

        let ids: Vec<&str> = catalog.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["body>div#feed", "body>div#sidebar"]);
        assert!(catalog.get("body>div#overlay-panel").is_none());
    }

    #[test]
    fn test_scan_collapses_duplicate_ids() {
        let mut doc = Document::new(Size::new(1024.0, 768.0));
        let body = doc.body();
        let first = doc.append(body, scroller("dup", 300.0));
        doc.append(body, scroller("dup", 300.0));

        let catalog = scan_scroll_targets(&doc, None, DEFAULT_MAX_ID_DEPTH);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("body>div#dup"), Some(first));
    }

    #[test]
    fn test_mount_notifies_and_unmount_clears() {
        let (mut doc, overlay) = page_with_overlay();
        let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);

        let mut registry = ScrollTargetRegistry::default().with_overlay_root(overlay);
        registry.on_targets_changed(move |options| seen_clone.borrow_mut().push(options.len()));

        registry.mount(&mut doc);
        assert!(registry.is_mounted());
        assert_eq!(registry.catalog().len(), 2);

        registry.unmount(&mut doc);
        assert!(!registry.is_mounted());
        assert!(registry.catalog().is_empty());
        assert_eq!(*seen.borrow(), vec![2, 0]);
    }

    #[test]
    fn test_mutations_are_debounced() {
        let (mut doc, overlay) = page_with_overlay();
        let mut registry = ScrollTargetRegistry::default().with_overlay_root(overlay);
        registry.mount(&mut doc);
        assert_eq!(registry.rebuild_count(), 1);

        let body = doc.body();
        let mut now = Duration::ZERO;
        for i in 0..5 {
            doc.append(body, scroller(&format!("late-{i}"), 50.0));
            assert!(!registry.poll(&mut doc, now));
            now += Duration::from_millis(50);
        }

        // 150ms after the last mutation
        now += Duration::from_millis(100);
        assert!(registry.poll(&mut doc, now));
        assert_eq!(registry.rebuild_count(), 2);
        assert_eq!(registry.catalog().len(), 7);
    }

    #[test]
    fn test_removed_target_vanishes_after_rescan() {
        let (mut doc, overlay) = page_with_overlay();
        let mut registry = ScrollTargetRegistry::default().with_overlay_root(overlay);
        registry.mount(&mut doc);

        let feed = registry.catalog().get("body>div#feed").unwrap();
        doc.remove(feed);
        registry.poll(&mut doc, Duration::ZERO);
        assert!(registry.poll(&mut doc, DEFAULT_RESCAN_DEBOUNCE));
        assert!(registry.catalog().get("body>div#feed").is_none());
    }

    #[test]
    fn test_resize_triggers_rescan() {
        let (mut doc, overlay) = page_with_overlay();
        let mut registry = ScrollTargetRegistry::default().with_overlay_root(overlay);
        registry.mount(&mut doc);

        doc.resize_viewport(800.0, 600.0);
        assert!(!registry.poll(&mut doc, Duration::ZERO));
        assert!(registry.has_pending_rescan());
        assert!(registry.poll(&mut doc, Duration::from_millis(150)));
    }
}
