//! Target resolution
//!
//! Decides which single scroll target is active for a tick, given the
//! configured [`SyncTargetMode`] and where the triggering event came from.
//!
//! ```text
//! window          ──► Window
//! element:<id>    ──► catalog[id] if live, else Window
//! auto, overlay   ──► cached best target (window if it scrolls, else best element)
//! auto, elsewhere ──► nearest scrollable ancestor of origin, else Window
//! ```
//!
//! Resolution never fails; a dangling pinned id degrades to the window.

use tether_page::{
    best_scrollable_element_excluding, to_scroll_target, window_is_scrollable, Document,
    EventOrigin, NodeId, ScrollTarget, TargetCatalog,
};

use crate::mode::SyncTargetMode;

/// Resolves event origins to scroll targets and caches the best-known target
#[derive(Clone, Debug, Default)]
pub struct TargetResolver {
    overlay_root: Option<NodeId>,
    detected: Option<NodeId>,
    /// Pinned id already reported as unavailable
    warned_pin: Option<String>,
}

impl TargetResolver {
    pub fn new(overlay_root: Option<NodeId>) -> Self {
        Self {
            overlay_root,
            detected: None,
            warned_pin: None,
        }
    }

    pub fn overlay_root(&self) -> Option<NodeId> {
        self.overlay_root
    }

    pub fn set_overlay_root(&mut self, overlay_root: Option<NodeId>) {
        self.overlay_root = overlay_root;
    }

    /// The cached best-known element, if any
    pub fn detected(&self) -> Option<NodeId> {
        self.detected
    }

    /// True if `origin` is inside the overlay's own subtree
    pub fn is_inside_overlay(&self, doc: &Document, origin: EventOrigin) -> bool {
        match (self.overlay_root, origin) {
            (Some(overlay), EventOrigin::Node(node)) => doc.contains(overlay, node),
            _ => false,
        }
    }

    /// Best-known target for interactions that happen over the overlay
    ///
    /// Keeps the cached element while it is live. Otherwise prefers the window
    /// when it has scroll range, and only then runs the full page scan.
    pub fn auto_preferred(&mut self, doc: &Document) -> ScrollTarget {
        if let Some(cached) = self.detected {
            if ScrollTarget::Element(cached).is_live(doc) {
                return ScrollTarget::Element(cached);
            }
        }
        if window_is_scrollable(doc) {
            return ScrollTarget::Window;
        }

        self.detected = best_scrollable_element_excluding(doc, doc.body(), self.overlay_root);
        tracing::trace!(detected = ?self.detected, "auto scroll target rescanned");
        self.detected.map_or(ScrollTarget::Window, ScrollTarget::Element)
    }

    /// The pinned element behind `id`, if it still resolves, is connected and scrolls
    pub fn explicit_target(doc: &Document, catalog: &TargetCatalog, id: &str) -> Option<NodeId> {
        catalog
            .get(id)
            .filter(|node| ScrollTarget::Element(*node).is_live(doc))
    }

    /// The target implied by the mode alone, ignoring event origin
    pub fn configured(
        &mut self,
        mode: &SyncTargetMode,
        doc: &Document,
        catalog: &TargetCatalog,
    ) -> ScrollTarget {
        match mode {
            SyncTargetMode::Auto => self.auto_preferred(doc),
            SyncTargetMode::Window => ScrollTarget::Window,
            SyncTargetMode::Element(id) => match Self::explicit_target(doc, catalog, id) {
                Some(node) => {
                    self.warned_pin = None;
                    ScrollTarget::Element(node)
                }
                None => {
                    if self.warned_pin.as_deref() == Some(id.as_str()) {
                        tracing::trace!(%id, "pinned scroll target still unavailable");
                    } else {
                        tracing::warn!(%id, "pinned scroll target unavailable, using window");
                        self.warned_pin = Some(id.clone());
                    }
                    ScrollTarget::Window
                }
            },
        }
    }

    /// Resolve the active target for an event from `origin`
    pub fn resolve(
        &mut self,
        mode: &SyncTargetMode,
        origin: EventOrigin,
        doc: &Document,
        catalog: &TargetCatalog,
    ) -> ScrollTarget {
        match mode {
            SyncTargetMode::Auto if self.is_inside_overlay(doc, origin) => self.auto_preferred(doc),
            SyncTargetMode::Auto => to_scroll_target(doc, origin),
            _ => self.configured(mode, doc, catalog),
        }
    }

    /// Cache an element the user was seen scrolling
    pub fn remember_detected(&mut self, node: NodeId) {
        self.detected = Some(node);
    }

    /// Forget the cached target (session restart)
    pub fn reset(&mut self) {
        self.detected = None;
        self.warned_pin = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::Size;
    use tether_page::{scan_scroll_targets, Element, Overflow, DEFAULT_MAX_ID_DEPTH};

    fn scroller(id: &str, range: f64) -> Element {
        Element::new("div")
            .id(id)
            .overflow_y(Overflow::Auto)
            .size(400.0, 300.0)
            .content_size(400.0, 300.0 + range)
    }

    struct Page {
        doc: Document,
        overlay: NodeId,
        feed: NodeId,
        canvas_node: NodeId,
    }

    fn page() -> Page {
        let mut doc = Document::new(Size::new(1200.0, 800.0));
        let body = doc.body();
        let feed = doc.append(body, scroller("feed", 500.0).child(Element::new("article")));
        doc.append(body, scroller("aside", 100.0));
        let overlay = doc.append(
            body,
            Element::new("div")
                .id("tether-root")
                .size(1200.0, 800.0)
                .child(Element::new("canvas").size(1200.0, 800.0)),
        );
        let canvas_node = doc.get(overlay).unwrap().children()[0];
        Page {
            doc,
            overlay,
            feed,
            canvas_node,
        }
    }

    #[test]
    fn test_window_mode_ignores_origin() {
        let p = page();
        let catalog = TargetCatalog::new();
        let mut resolver = TargetResolver::new(Some(p.overlay));
        let target = resolver.resolve(
            &SyncTargetMode::Window,
            EventOrigin::Node(p.feed),
            &p.doc,
            &catalog,
        );
        assert_eq!(target, ScrollTarget::Window);
    }

    #[test]
    fn test_auto_overlay_origin_prefers_best_element() {
        let p = page();
        let catalog = TargetCatalog::new();
        let mut resolver = TargetResolver::new(Some(p.overlay));

        let target = resolver.resolve(
            &SyncTargetMode::Auto,
            EventOrigin::Node(p.canvas_node),
            &p.doc,
            &catalog,
        );
        assert_eq!(target, ScrollTarget::Element(p.feed));
        assert_eq!(resolver.detected(), Some(p.feed));
    }

    #[test]
    fn test_auto_overlay_origin_prefers_scrollable_window() {
        let mut p = page();
        p.doc.set_document_size(1200.0, 4000.0);
        let catalog = TargetCatalog::new();
        let mut resolver = TargetResolver::new(Some(p.overlay));

        let target = resolver.resolve(
            &SyncTargetMode::Auto,
            EventOrigin::Node(p.canvas_node),
            &p.doc,
            &catalog,
        );
        assert_eq!(target, ScrollTarget::Window);
    }

    #[test]
    fn test_auto_page_origin_uses_nearest_ancestor() {
        let p = page();
        let catalog = TargetCatalog::new();
        let article = p.doc.get(p.feed).unwrap().children()[0];
        let mut resolver = TargetResolver::new(Some(p.overlay));

        let target =
            resolver.resolve(&SyncTargetMode::Auto, EventOrigin::Node(article), &p.doc, &catalog);
        assert_eq!(target, ScrollTarget::Element(p.feed));
    }

    #[test]
    fn test_pinned_target_falls_back_when_removed() {
        let mut p = page();
        let catalog = scan_scroll_targets(&p.doc, Some(p.overlay), DEFAULT_MAX_ID_DEPTH);
        let mode = SyncTargetMode::Element("body>div#feed".to_string());
        let mut resolver = TargetResolver::new(Some(p.overlay));

        assert_eq!(
            resolver.resolve(&mode, EventOrigin::Window, &p.doc, &catalog),
            ScrollTarget::Element(p.feed)
        );

        p.doc.remove(p.feed);
        assert_eq!(
            resolver.resolve(&mode, EventOrigin::Window, &p.doc, &catalog),
            ScrollTarget::Window
        );
        assert!(TargetResolver::explicit_target(&p.doc, &catalog, "body>div#missing").is_none());
    }

    #[test]
    fn test_unavailable_pin_reported_once_per_id() {
        let mut p = page();
        let catalog = scan_scroll_targets(&p.doc, Some(p.overlay), DEFAULT_MAX_ID_DEPTH);
        let feed = SyncTargetMode::Element("body>div#feed".to_string());
        let missing = SyncTargetMode::Element("body>div#missing".to_string());
        let mut resolver = TargetResolver::new(Some(p.overlay));

        for _ in 0..3 {
            assert_eq!(resolver.configured(&missing, &p.doc, &catalog), ScrollTarget::Window);
        }
        assert_eq!(resolver.warned_pin.as_deref(), Some("body>div#missing"));

        // Resolving again clears the report so a later loss is reported anew
        resolver.configured(&feed, &p.doc, &catalog);
        assert_eq!(resolver.warned_pin, None);

        p.doc.remove(p.feed);
        resolver.configured(&feed, &p.doc, &catalog);
        assert_eq!(resolver.warned_pin.as_deref(), Some("body>div#feed"));

        resolver.reset();
        assert_eq!(resolver.warned_pin, None);
    }

    #[test]
    fn test_stale_cache_is_recomputed() {
        let mut p = page();
        let mut resolver = TargetResolver::new(Some(p.overlay));
        assert_eq!(resolver.auto_preferred(&p.doc), ScrollTarget::Element(p.feed));

        p.doc.remove(p.feed);
        let aside = resolver.auto_preferred(&p.doc);
        assert_ne!(aside, ScrollTarget::Element(p.feed));
        assert!(aside.element().is_some());

        resolver.reset();
        assert_eq!(resolver.detected(), None);
    }
}
