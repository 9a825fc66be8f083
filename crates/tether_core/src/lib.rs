//! Tether Core
//!
//! Foundational primitives for keeping an annotation canvas pinned to the
//! page content underneath it:
//!
//! - **Geometry**: [`ScrollPoint`], [`Size`], [`Rect`]
//! - **Coordinate Transform**: page deltas <-> scene deltas under zoom, and
//!   client points -> scene points for placing captures
//! - **Scheduling**: deterministic clock, debounce window, single-slot frame
//!   requests driven by the host
//!
//! # Example
//!
//! ```rust
//! use tether_core::{to_canvas_delta, to_page_delta, ScrollPoint};
//!
//! let page = ScrollPoint::new(0.0, 200.0);
//! let scene = to_canvas_delta(page, 2.0);
//! assert_eq!(scene, ScrollPoint::new(0.0, -100.0));
//! assert_eq!(to_page_delta(scene, 2.0), page);
//! ```

pub mod geometry;
pub mod scheduler;
pub mod transform;

pub use geometry::{Rect, ScrollPoint, Size};
pub use scheduler::{Debouncer, DeterministicClock, FrameHandle, FrameSlot};
pub use transform::{
    sanitize_zoom, scene_point_to_viewport, to_canvas_delta, to_page_delta,
    viewport_point_to_scene, ViewportState,
};
