//! Scrollable-target detection
//!
//! Classifies elements as scrollable from computed overflow and content size,
//! finds the nearest scrollable ancestor of an event origin, and scores the
//! page's scrollable elements by how much scroll range they offer.

use tether_core::ScrollPoint;

use crate::document::{Document, EventOrigin, NodeId};

/// The thing being scrolled: the page viewport or one scrollable element
///
/// The element variant is a non-owning handle. Check
/// [`ScrollTarget::is_live`] before trusting it across ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScrollTarget {
    #[default]
    Window,
    Element(NodeId),
}

impl ScrollTarget {
    pub fn is_window(self) -> bool {
        matches!(self, Self::Window)
    }

    pub fn element(self) -> Option<NodeId> {
        match self {
            Self::Window => None,
            Self::Element(node) => Some(node),
        }
    }

    /// Window is always live; an element must be connected and still scrollable
    pub fn is_live(self, doc: &Document) -> bool {
        match self {
            Self::Window => true,
            Self::Element(node) => doc.is_connected(node) && is_scrollable(doc, node),
        }
    }

    /// Current scroll offset. A vanished element reads as the origin.
    pub fn position(self, doc: &Document) -> ScrollPoint {
        match self {
            Self::Window => doc.window_scroll(),
            Self::Element(node) => doc.scroll_position(node).unwrap_or(ScrollPoint::ZERO),
        }
    }

    /// Scroll by `delta` immediately. Scrolling a vanished element does nothing.
    pub fn scroll_by(self, doc: &mut Document, delta: ScrollPoint) {
        match self {
            Self::Window => {
                doc.scroll_window_by(delta);
            }
            Self::Element(node) => {
                doc.scroll_by(node, delta);
            }
        }
    }
}

/// True iff some axis allows scrolling and its content exceeds its client box
pub fn is_scrollable(doc: &Document, node: NodeId) -> bool {
    let Some(data) = doc.get(node) else {
        return false;
    };
    let client = data.client_size();
    let scroll = data.scroll_size();

    let can_scroll_y = data.overflow_y().allows_scrolling() && scroll.height > client.height;
    let can_scroll_x = data.overflow_x().allows_scrolling() && scroll.width > client.width;
    can_scroll_x || can_scroll_y
}

/// Walk upward from `node` (inclusive) to the first scrollable element
pub fn nearest_scrollable_ancestor(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(id) = current {
        if is_scrollable(doc, id) {
            return Some(id);
        }
        current = doc.get(id).and_then(|data| data.parent());
    }
    None
}

/// How much scroll range an element offers on both axes combined
pub fn scroll_range_score(doc: &Document, node: NodeId) -> f64 {
    let Some(data) = doc.get(node) else {
        return 0.0;
    };
    let client = data.client_size();
    let scroll = data.scroll_size();
    (scroll.height - client.height).max(0.0) + (scroll.width - client.width).max(0.0)
}

/// The visible scrollable descendant of `root` with the strictly greatest score
///
/// Ties keep the first element in document order. Returns `None` when nothing
/// scores above zero. Linear in the subtree size; callers throttle it.
pub fn best_scrollable_element(doc: &Document, root: NodeId) -> Option<NodeId> {
    best_scrollable_element_excluding(doc, root, None)
}

/// [`best_scrollable_element`], skipping the subtree rooted at `exclude`
pub fn best_scrollable_element_excluding(
    doc: &Document,
    root: NodeId,
    exclude: Option<NodeId>,
) -> Option<NodeId> {
    let mut best: Option<NodeId> = None;
    let mut best_score = 0.0;

    for node in doc.descendants(root) {
        if exclude.is_some_and(|skip| doc.contains(skip, node)) {
            continue;
        }
        if !is_scrollable(doc, node) {
            continue;
        }
        let visible = doc.get(node).is_some_and(|data| data.bounds().has_area());
        if !visible {
            continue;
        }

        let score = scroll_range_score(doc, node);
        if score > best_score {
            best_score = score;
            best = Some(node);
        }
    }

    if let Some(node) = best {
        tracing::trace!(?node, score = best_score, "best scrollable element");
    }
    best
}

/// True iff the scrolling element's content exceeds its client box
pub fn window_is_scrollable(doc: &Document) -> bool {
    let Some(data) = doc.get(doc.document_element()) else {
        return false;
    };
    let client = data.client_size();
    let scroll = data.scroll_size();
    scroll.height > client.height || scroll.width > client.width
}

/// Map an event origin to the target it scrolls
///
/// The window, `html` and `body` map to the window; a scrollable element maps
/// to itself; anything else maps to its nearest scrollable ancestor, falling
/// back to the window.
pub fn to_scroll_target(doc: &Document, origin: EventOrigin) -> ScrollTarget {
    match origin {
        EventOrigin::Window => ScrollTarget::Window,
        EventOrigin::Node(node) if doc.is_window_node(node) => ScrollTarget::Window,
        EventOrigin::Node(node) => nearest_scrollable_ancestor(doc, node)
            .filter(|found| !doc.is_window_node(*found))
            .map_or(ScrollTarget::Window, ScrollTarget::Element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Element, Overflow};
    use tether_core::Size;

    fn doc() -> Document {
        Document::new(Size::new(1000.0, 800.0))
    }

    fn scroller(range: f64) -> Element {
        Element::new("div")
            .overflow(Overflow::Auto)
            .size(300.0, 300.0)
            .content_size(300.0, 300.0 + range)
    }

    #[test]
    fn test_is_scrollable_requires_style_and_overflowing_content() {
        let mut doc = doc();
        let body = doc.body();

        let auto = doc.append(body, scroller(200.0));
        let hidden = doc.append(
            body,
            Element::new("div")
                .overflow(Overflow::Hidden)
                .size(100.0, 100.0)
                .content_size(100.0, 900.0),
        );
        let fits = doc.append(body, scroller(0.0));
        let visible = doc.append(
            body,
            Element::new("div").size(100.0, 100.0).content_size(100.0, 900.0),
        );

        assert!(is_scrollable(&doc, auto));
        assert!(!is_scrollable(&doc, hidden));
        assert!(!is_scrollable(&doc, fits));
        assert!(!is_scrollable(&doc, visible));
    }

    #[test]
    fn test_single_axis_is_enough() {
        let mut doc = doc();
        let body = doc.body();
        let strip = doc.append(
            body,
            Element::new("div")
                .overflow_x(Overflow::Scroll)
                .overflow_y(Overflow::Hidden)
                .size(200.0, 50.0)
                .content_size(900.0, 50.0),
        );
        assert!(is_scrollable(&doc, strip));
    }

    #[test]
    fn test_nearest_scrollable_ancestor_includes_self() {
        let mut doc = doc();
        let body = doc.body();
        let list = doc.append(body, scroller(500.0).child(Element::new("p").child(Element::new("a"))));
        let p = doc.get(list).unwrap().children()[0];
        let link = doc.get(p).unwrap().children()[0];

        assert_eq!(nearest_scrollable_ancestor(&doc, link), Some(list));
        assert_eq!(nearest_scrollable_ancestor(&doc, list), Some(list));
        assert_eq!(nearest_scrollable_ancestor(&doc, body), None);
    }

    #[test]
    fn test_best_scrollable_prefers_largest_range() {
        let mut doc = doc();
        let body = doc.body();
        let _small = doc.append(body, scroller(100.0));
        let large = doc.append(body, scroller(900.0));
        let _hidden = doc.append(
            body,
            Element::new("div")
                .overflow(Overflow::Auto)
                .client_size(300.0, 300.0)
                .content_size(300.0, 5000.0),
        );

        assert_eq!(best_scrollable_element(&doc, body), Some(large));
    }

    #[test]
    fn test_best_scrollable_tie_keeps_first() {
        let mut doc = doc();
        let body = doc.body();
        let first = doc.append(body, scroller(400.0));
        let _second = doc.append(body, scroller(400.0));

        assert_eq!(best_scrollable_element(&doc, body), Some(first));
    }

    #[test]
    fn test_best_scrollable_skips_excluded_subtree() {
        let mut doc = doc();
        let body = doc.body();
        let page = doc.append(body, scroller(300.0));
        let overlay = doc.append(body, Element::new("div").size(1000.0, 800.0).child(scroller(9000.0)));

        assert_ne!(best_scrollable_element(&doc, body), Some(page));
        assert_eq!(best_scrollable_element_excluding(&doc, body, Some(overlay)), Some(page));
    }

    #[test]
    fn test_best_scrollable_none() {
        let mut doc = doc();
        let body = doc.body();
        doc.append(body, Element::new("div").size(10.0, 10.0));
        assert_eq!(best_scrollable_element(&doc, body), None);
    }

    #[test]
    fn test_window_scrollable() {
        let mut doc = doc();
        assert!(!window_is_scrollable(&doc));
        doc.set_document_size(1000.0, 3000.0);
        assert!(window_is_scrollable(&doc));
    }

    #[test]
    fn test_to_scroll_target() {
        let mut doc = doc();
        let body = doc.body();
        let list = doc.append(body, scroller(500.0).child(Element::new("li")));
        let item = doc.get(list).unwrap().children()[0];
        let plain = doc.append(body, Element::new("div"));

        assert_eq!(to_scroll_target(&doc, EventOrigin::Window), ScrollTarget::Window);
        assert_eq!(to_scroll_target(&doc, EventOrigin::Node(body)), ScrollTarget::Window);
        assert_eq!(
            to_scroll_target(&doc, EventOrigin::Node(item)),
            ScrollTarget::Element(list)
        );
        assert_eq!(to_scroll_target(&doc, EventOrigin::Node(plain)), ScrollTarget::Window);
    }

    #[test]
    fn test_target_liveness() {
        let mut doc = doc();
        let body = doc.body();
        let list = doc.append(body, scroller(500.0));
        let target = ScrollTarget::Element(list);

        assert!(target.is_live(&doc));
        doc.remove(list);
        assert!(!target.is_live(&doc));
        assert_eq!(target.position(&doc), ScrollPoint::ZERO);
        target.scroll_by(&mut doc, ScrollPoint::new(0.0, 10.0));
        assert!(ScrollTarget::Window.is_live(&doc));
    }
}
