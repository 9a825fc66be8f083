//! Page document model
//!
//! An arena of element nodes keyed by generational [`NodeId`]s. A key whose
//! node was removed stops resolving, so holders of a `NodeId` get a
//! non-owning reference that must be revalidated before use.
//!
//! The document always has an `html` root (the scrolling element: its client
//! box is the viewport and its scroll offset is the window scroll position)
//! and a `body`.
//!
//! Hosts mirror the real page into this model; tests and the CLI build it
//! directly with the [`Element`] builder:
//!
//! ```rust
//! use tether_page::{Document, Element, Overflow};
//! use tether_core::Size;
//!
//! let mut doc = Document::new(Size::new(1280.0, 800.0));
//! let body = doc.body();
//! let feed = doc.append(
//!     body,
//!     Element::new("div")
//!         .id("feed")
//!         .overflow_y(Overflow::Auto)
//!         .size(400.0, 600.0)
//!         .content_size(400.0, 2400.0),
//! );
//! assert!(doc.is_connected(feed));
//! ```

use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, Key, SlotMap};
use smallvec::SmallVec;
use tether_core::{Rect, ScrollPoint, Size};

new_key_type! {
    /// Handle to an element in a [`Document`]
    pub struct NodeId;
    /// Handle to a registered mutation observer
    pub struct ObserverId;
}

impl NodeId {
    /// Convert to a raw u64 representation
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Create from a raw u64 representation produced by [`NodeId::to_raw`]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

// ============================================================================
// Computed Style
// ============================================================================

/// Computed `overflow-x` / `overflow-y` value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Clip,
    Scroll,
    Auto,
    Overlay,
}

impl Overflow {
    /// Parse a CSS overflow keyword (case-insensitive). Unknown values are `Visible`.
    pub fn from_css(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "hidden" => Self::Hidden,
            "clip" => Self::Clip,
            "scroll" => Self::Scroll,
            "auto" => Self::Auto,
            "overlay" => Self::Overlay,
            _ => Self::Visible,
        }
    }

    /// Whether content overflowing on this axis can be scrolled by the user
    pub fn allows_scrolling(self) -> bool {
        matches!(self, Self::Auto | Self::Scroll | Self::Overlay)
    }
}

// ============================================================================
// Events and Mutations
// ============================================================================

/// Where a page event was dispatched
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventOrigin {
    /// The window / document itself
    Window,
    /// A specific element
    Node(NodeId),
}

/// A scroll event queued by the document for the host to dispatch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollEvent {
    pub origin: EventOrigin,
}

/// What changed in a [`MutationRecord`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were added or removed
    ChildList,
    /// An attribute changed
    Attributes { name: String },
}

/// A single observed DOM change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
}

/// What a mutation observer wants to hear about
#[derive(Clone, Debug, Default)]
pub struct ObserverOptions {
    pub child_list: bool,
    pub subtree: bool,
    /// Attribute names to report. Empty means attributes are not observed.
    pub attribute_filter: Vec<String>,
}

struct ObserverState {
    target: NodeId,
    options: ObserverOptions,
    records: Vec<MutationRecord>,
}

// ============================================================================
// Element Data
// ============================================================================

/// Attributes whose change can affect overflow style or target labels
pub const STYLE_ATTRIBUTE: &str = "style";

/// A live element in the document arena
#[derive(Clone, Debug)]
pub struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    overflow_x: Overflow,
    overflow_y: Overflow,
    bounds: Rect,
    client_size: Size,
    scroll_size: Size,
    scroll_offset: ScrollPoint,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
}

impl ElementData {
    /// Lowercase tag name
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The `id` attribute, or an empty string
    pub fn id(&self) -> &str {
        self.attribute("id").unwrap_or("")
    }

    /// The `class` attribute, or an empty string
    pub fn class_name(&self) -> &str {
        self.attribute("class").unwrap_or("")
    }

    pub fn overflow_x(&self) -> Overflow {
        self.overflow_x
    }

    pub fn overflow_y(&self) -> Overflow {
        self.overflow_y
    }

    /// Bounding client rect
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Visible (client) size of the scroll box
    pub fn client_size(&self) -> Size {
        self.client_size
    }

    /// Full content size of the scroll box (never smaller than the client size)
    pub fn scroll_size(&self) -> Size {
        self.scroll_size
    }

    pub fn scroll_offset(&self) -> ScrollPoint {
        self.scroll_offset
    }

    /// Largest reachable scroll offset on each axis
    pub fn max_scroll(&self) -> ScrollPoint {
        ScrollPoint::new(
            (self.scroll_size.width - self.client_size.width).max(0.0),
            (self.scroll_size.height - self.client_size.height).max(0.0),
        )
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    fn clamp_scroll(&self, offset: ScrollPoint) -> ScrollPoint {
        let max = self.max_scroll();
        ScrollPoint::new(offset.x.clamp(0.0, max.x), offset.y.clamp(0.0, max.y))
    }
}

// ============================================================================
// Element Builder
// ============================================================================

/// Builder for an element subtree, inserted with [`Document::append`]
#[derive(Clone, Debug)]
pub struct Element {
    tag: String,
    attributes: IndexMap<String, String>,
    overflow_x: Overflow,
    overflow_y: Overflow,
    bounds: Rect,
    client_size: Option<Size>,
    content_size: Option<Size>,
    scroll_offset: ScrollPoint,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: IndexMap::new(),
            overflow_x: Overflow::Visible,
            overflow_y: Overflow::Visible,
            bounds: Rect::default(),
            client_size: None,
            content_size: None,
            scroll_offset: ScrollPoint::ZERO,
            children: Vec::new(),
        }
    }

    /// Set an arbitrary attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn role(self, role: impl Into<String>) -> Self {
        self.attr("role", role)
    }

    pub fn aria_label(self, label: impl Into<String>) -> Self {
        self.attr("aria-label", label)
    }

    /// Set overflow on both axes
    pub fn overflow(mut self, overflow: Overflow) -> Self {
        self.overflow_x = overflow;
        self.overflow_y = overflow;
        self
    }

    pub fn overflow_x(mut self, overflow: Overflow) -> Self {
        self.overflow_x = overflow;
        self
    }

    pub fn overflow_y(mut self, overflow: Overflow) -> Self {
        self.overflow_y = overflow;
        self
    }

    /// Set the rendered size (bounding rect and client box)
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.bounds.width = width;
        self.bounds.height = height;
        self
    }

    /// Set the bounding rect origin
    pub fn at(mut self, left: f64, top: f64) -> Self {
        self.bounds.left = left;
        self.bounds.top = top;
        self
    }

    /// Override the client box (defaults to the rendered size)
    pub fn client_size(mut self, width: f64, height: f64) -> Self {
        self.client_size = Some(Size::new(width, height));
        self
    }

    /// Set the scrollable content size
    pub fn content_size(mut self, width: f64, height: f64) -> Self {
        self.content_size = Some(Size::new(width, height));
        self
    }

    /// Initial scroll offset (clamped on insertion)
    pub fn scrolled_to(mut self, x: f64, y: f64) -> Self {
        self.scroll_offset = ScrollPoint::new(x, y);
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }
}

// ============================================================================
// Document
// ============================================================================

/// The page element tree plus its pending events
pub struct Document {
    nodes: SlotMap<NodeId, ElementData>,
    root: NodeId,
    body: NodeId,
    observers: SlotMap<ObserverId, ObserverState>,
    scroll_events: VecDeque<ScrollEvent>,
    resize_pending: bool,
}

impl Document {
    /// Create an empty document (`html` > `body`) with the given viewport size
    pub fn new(viewport: Size) -> Self {
        let mut nodes = SlotMap::with_key();
        let frame = Rect::new(0.0, 0.0, viewport.width, viewport.height);

        let root = nodes.insert(ElementData {
            tag: "html".to_string(),
            attributes: IndexMap::new(),
            overflow_x: Overflow::Visible,
            overflow_y: Overflow::Visible,
            bounds: frame,
            client_size: viewport,
            scroll_size: viewport,
            scroll_offset: ScrollPoint::ZERO,
            parent: None,
            children: SmallVec::new(),
        });
        let body = nodes.insert(ElementData {
            tag: "body".to_string(),
            attributes: IndexMap::new(),
            overflow_x: Overflow::Visible,
            overflow_y: Overflow::Visible,
            bounds: frame,
            client_size: viewport,
            scroll_size: viewport,
            scroll_offset: ScrollPoint::ZERO,
            parent: Some(root),
            children: SmallVec::new(),
        });
        nodes[root].children.push(body);

        Self {
            nodes,
            root,
            body,
            observers: SlotMap::with_key(),
            scroll_events: VecDeque::new(),
            resize_pending: false,
        }
    }

    /// The `html` element (the scrolling element)
    pub fn document_element(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn get(&self, node: NodeId) -> Option<&ElementData> {
        self.nodes.get(node)
    }

    /// Number of live elements, including `html` and `body`
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True if `node` is live and attached under the document root
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(data) = self.nodes.get(id) else {
                return false;
            };
            if id == self.root {
                return true;
            }
            current = data.parent;
        }
        false
    }

    /// Inclusive descendant test: true if `node` is `ancestor` or inside it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|data| data.parent);
        }
        false
    }

    /// True for the window-like nodes (`html`, `body`)
    pub fn is_window_node(&self, node: NodeId) -> bool {
        node == self.root || node == self.body
    }

    /// All descendants of `root` in document (pre-)order, excluding `root`
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(data) = self.nodes.get(root) else {
            return out;
        };

        let mut stack: Vec<NodeId> = data.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(data) = self.nodes.get(id) else {
                continue;
            };
            out.push(id);
            stack.extend(data.children.iter().rev().copied());
        }
        out
    }

    // =========================================================================
    // Tree Mutation
    // =========================================================================

    /// Build `element` (and its children) and append it to `parent`
    ///
    /// Returns the new node's id. Appending to a dead parent still creates the
    /// subtree, detached.
    pub fn append(&mut self, parent: NodeId, element: Element) -> NodeId {
        let id = self.build(element);
        if self.nodes.contains_key(parent) {
            self.nodes[id].parent = Some(parent);
            self.nodes[parent].children.push(id);
            self.record(parent, MutationKind::ChildList);
        }
        id
    }

    fn build(&mut self, element: Element) -> NodeId {
        let client_size = element
            .client_size
            .unwrap_or_else(|| element.bounds.size());
        let content = element.content_size.unwrap_or(client_size);
        let scroll_size = Size::new(
            content.width.max(client_size.width),
            content.height.max(client_size.height),
        );

        let mut data = ElementData {
            tag: element.tag,
            attributes: element.attributes,
            overflow_x: element.overflow_x,
            overflow_y: element.overflow_y,
            bounds: element.bounds,
            client_size,
            scroll_size,
            scroll_offset: ScrollPoint::ZERO,
            parent: None,
            children: SmallVec::new(),
        };
        data.scroll_offset = data.clamp_scroll(element.scroll_offset);

        let id = self.nodes.insert(data);
        for child in element.children {
            let child_id = self.build(child);
            self.nodes[child_id].parent = Some(id);
            self.nodes[id].children.push(child_id);
        }
        id
    }

    /// Detach `node` from its parent without destroying it
    ///
    /// The node stays resolvable but is no longer connected.
    pub fn detach(&mut self, node: NodeId) -> bool {
        if node == self.root || node == self.body {
            return false;
        }
        let Some(parent) = self.nodes.get(node).and_then(|data| data.parent) else {
            return false;
        };

        if let Some(parent_data) = self.nodes.get_mut(parent) {
            parent_data.children.retain(|child| *child != node);
        }
        self.nodes[node].parent = None;
        self.record(parent, MutationKind::ChildList);
        true
    }

    /// Remove `node` and its whole subtree from the document
    ///
    /// Ids inside the removed subtree stop resolving. `html` and `body` cannot
    /// be removed.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if node == self.root || node == self.body || !self.nodes.contains_key(node) {
            return false;
        }
        self.detach(node);

        let mut doomed = self.descendants(node);
        doomed.push(node);
        for id in doomed {
            self.nodes.remove(id);
        }
        true
    }

    /// Set (or replace) an attribute
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        let Some(data) = self.nodes.get_mut(node) else {
            return;
        };
        data.attributes.insert(name.to_string(), value.into());
        self.record(
            node,
            MutationKind::Attributes {
                name: name.to_string(),
            },
        );
    }

    /// Change computed overflow. Reported to observers as a `style` change.
    pub fn set_overflow(&mut self, node: NodeId, overflow_x: Overflow, overflow_y: Overflow) {
        let Some(data) = self.nodes.get_mut(node) else {
            return;
        };
        data.overflow_x = overflow_x;
        data.overflow_y = overflow_y;
        self.record(
            node,
            MutationKind::Attributes {
                name: STYLE_ATTRIBUTE.to_string(),
            },
        );
    }

    /// Update the scrollable content size (layout change, not a DOM mutation)
    pub fn set_content_size(&mut self, node: NodeId, content: Size) {
        let Some(data) = self.nodes.get_mut(node) else {
            return;
        };
        data.scroll_size = Size::new(
            content.width.max(data.client_size.width),
            content.height.max(data.client_size.height),
        );
        data.scroll_offset = data.clamp_scroll(data.scroll_offset);
    }

    /// Update the bounding rect and client box (layout change, not a DOM mutation)
    pub fn set_bounds(&mut self, node: NodeId, bounds: Rect) {
        let Some(data) = self.nodes.get_mut(node) else {
            return;
        };
        data.bounds = bounds;
        data.client_size = bounds.size();
        data.scroll_size = Size::new(
            data.scroll_size.width.max(data.client_size.width),
            data.scroll_size.height.max(data.client_size.height),
        );
        data.scroll_offset = data.clamp_scroll(data.scroll_offset);
    }

    // =========================================================================
    // Viewport
    // =========================================================================

    pub fn viewport(&self) -> Size {
        self.nodes[self.root].client_size
    }

    /// Set the full document size scrolled by the window
    pub fn set_document_size(&mut self, width: f64, height: f64) {
        let root = self.root;
        self.set_content_size(root, Size::new(width, height));
    }

    /// Resize the viewport and queue a resize notification
    pub fn resize_viewport(&mut self, width: f64, height: f64) {
        let content = self.nodes[self.root].scroll_size;
        let frame = Rect::new(0.0, 0.0, width, height);

        let root = self.root;
        let body = self.body;
        self.set_bounds(root, frame);
        self.set_bounds(body, frame);
        self.set_content_size(root, content);
        self.resize_pending = true;
    }

    /// Take the pending resize notification, if any
    pub fn take_resize(&mut self) -> bool {
        std::mem::take(&mut self.resize_pending)
    }

    // =========================================================================
    // Scrolling
    // =========================================================================

    /// Current window scroll position
    pub fn window_scroll(&self) -> ScrollPoint {
        self.nodes[self.root].scroll_offset
    }

    /// Current scroll offset of an element, `None` if it no longer exists
    pub fn scroll_position(&self, node: NodeId) -> Option<ScrollPoint> {
        self.nodes.get(node).map(ElementData::scroll_offset)
    }

    /// Scroll `node` to `offset`, clamped to its scroll range
    ///
    /// Queues a scroll event when the offset actually changed. Returns the
    /// resulting offset, or `None` if the node is gone.
    pub fn scroll_to(&mut self, node: NodeId, offset: ScrollPoint) -> Option<ScrollPoint> {
        let data = self.nodes.get_mut(node)?;
        let clamped = data.clamp_scroll(offset);
        if clamped != data.scroll_offset {
            data.scroll_offset = clamped;
            let origin = if node == self.root {
                EventOrigin::Window
            } else {
                EventOrigin::Node(node)
            };
            self.scroll_events.push_back(ScrollEvent { origin });
        }
        Some(clamped)
    }

    /// Scroll `node` by `delta` with immediate (non-smooth) behavior
    pub fn scroll_by(&mut self, node: NodeId, delta: ScrollPoint) -> Option<ScrollPoint> {
        let current = self.scroll_position(node)?;
        self.scroll_to(node, current + delta)
    }

    pub fn scroll_window_to(&mut self, offset: ScrollPoint) -> ScrollPoint {
        let root = self.root;
        self.scroll_to(root, offset).unwrap_or(ScrollPoint::ZERO)
    }

    pub fn scroll_window_by(&mut self, delta: ScrollPoint) -> ScrollPoint {
        let root = self.root;
        self.scroll_by(root, delta).unwrap_or(ScrollPoint::ZERO)
    }

    /// Drain queued scroll events in the order they happened
    pub fn take_scroll_events(&mut self) -> Vec<ScrollEvent> {
        self.scroll_events.drain(..).collect()
    }

    pub fn has_pending_scroll_events(&self) -> bool {
        !self.scroll_events.is_empty()
    }

    // =========================================================================
    // Mutation Observers
    // =========================================================================

    /// Start observing changes at `target`
    pub fn observe(&mut self, target: NodeId, options: ObserverOptions) -> ObserverId {
        self.observers.insert(ObserverState {
            target,
            options,
            records: Vec::new(),
        })
    }

    /// Drain the records queued for `observer`
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .get_mut(observer)
            .map(|state| std::mem::take(&mut state.records))
            .unwrap_or_default()
    }

    /// Stop observing; pending records are dropped
    pub fn disconnect(&mut self, observer: ObserverId) {
        self.observers.remove(observer);
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        if self.observers.is_empty() {
            return;
        }

        let interested: Vec<ObserverId> = self
            .observers
            .iter()
            .filter(|(_, state)| {
                let kind_matches = match &kind {
                    MutationKind::ChildList => state.options.child_list,
                    MutationKind::Attributes { name } => {
                        state.options.attribute_filter.iter().any(|a| a == name)
                    }
                };
                let scope_matches = if state.options.subtree {
                    self.contains(state.target, target)
                } else {
                    state.target == target
                };
                kind_matches && scope_matches
            })
            .map(|(id, _)| id)
            .collect();

        for id in interested {
            self.observers[id].records.push(MutationRecord {
                kind: kind.clone(),
                target,
            });
        }
    }
}
