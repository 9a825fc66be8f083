//! Tether Page Model
//!
//! The page side of scroll synchronization:
//!
//! - **Document**: arena element tree with computed overflow, scroll boxes,
//!   queued scroll events, mutation observers and viewport resize
//! - **Scrollable-Target Model**: which elements scroll, nearest scrollable
//!   ancestor of an event origin, best-scoring scroll container
//! - **Target ids and labels**: structural ids stable across rescans
//! - **Registry**: debounced, deduplicated catalog of selectable targets
//!
//! # Example
//!
//! ```rust
//! use tether_core::Size;
//! use tether_page::{Document, Element, Overflow, ScrollTargetRegistry};
//!
//! let mut doc = Document::new(Size::new(1280.0, 800.0));
//! let body = doc.body();
//! doc.append(
//!     body,
//!     Element::new("div")
//!         .id("feed")
//!         .overflow_y(Overflow::Auto)
//!         .size(400.0, 600.0)
//!         .content_size(400.0, 2400.0),
//! );
//!
//! let mut registry = ScrollTargetRegistry::default();
//! registry.mount(&mut doc);
//! assert_eq!(registry.catalog().entries()[0].id, "body>div#feed");
//! ```

pub mod document;
pub mod registry;
pub mod scrollable;
pub mod target_id;

pub use document::{
    Document, Element, ElementData, EventOrigin, MutationKind, MutationRecord, NodeId,
    ObserverId, ObserverOptions, Overflow, ScrollEvent,
};
pub use registry::{
    scan_scroll_targets, RegistryConfig, ScrollTargetRegistry, TargetCatalog,
    TargetCatalogEntry, TargetsChangedCallback, DEFAULT_RESCAN_DEBOUNCE, OBSERVED_ATTRIBUTES,
};
pub use scrollable::{
    best_scrollable_element, best_scrollable_element_excluding, is_scrollable,
    nearest_scrollable_ancestor, scroll_range_score, to_scroll_target, window_is_scrollable,
    ScrollTarget,
};
pub use target_id::{element_target_id, element_target_label, DEFAULT_MAX_ID_DEPTH};
