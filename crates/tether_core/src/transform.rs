//! Page space <-> scene space transforms
//!
//! The canvas pans opposite to the page scroll direction so that annotations
//! stay visually fixed over page content:
//!
//! ```text
//! scene delta = -page delta / zoom
//! page delta  = -scene delta * zoom
//! ```
//!
//! All functions are pure. An unusable zoom (zero, negative, NaN, infinite)
//! is replaced by `1.0`, which makes every transform an identity scale.

use serde::{Deserialize, Serialize};

use crate::geometry::ScrollPoint;

/// Replace an unusable zoom factor with identity scale
pub fn sanitize_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() && zoom > 0.0 {
        zoom
    } else {
        1.0
    }
}

/// Convert a page scroll delta into the canvas pan delta that keeps content fixed
pub fn to_canvas_delta(page_delta: ScrollPoint, zoom: f64) -> ScrollPoint {
    let zoom = sanitize_zoom(zoom);
    ScrollPoint::new(-(page_delta.x / zoom), -(page_delta.y / zoom))
}

/// Convert a canvas pan delta into the page scroll delta that keeps content fixed
pub fn to_page_delta(scene_delta: ScrollPoint, zoom: f64) -> ScrollPoint {
    let zoom = sanitize_zoom(zoom);
    ScrollPoint::new(-(scene_delta.x * zoom), -(scene_delta.y * zoom))
}

/// Canvas pan/zoom state needed to place client points in the scene
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub zoom: f64,
    /// Canvas element offset from the viewport's left edge
    pub offset_left: f64,
    /// Canvas element offset from the viewport's top edge
    pub offset_top: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset_left: 0.0,
            offset_top: 0.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

impl ViewportState {
    pub fn new(scroll: ScrollPoint, zoom: f64) -> Self {
        Self {
            zoom,
            scroll_x: scroll.x,
            scroll_y: scroll.y,
            ..Default::default()
        }
    }

    /// Set the canvas element's offset within the viewport
    pub fn with_offset(mut self, left: f64, top: f64) -> Self {
        self.offset_left = left;
        self.offset_top = top;
        self
    }

    pub fn scroll(&self) -> ScrollPoint {
        ScrollPoint::new(self.scroll_x, self.scroll_y)
    }
}

/// Map a client (viewport) point into scene coordinates
pub fn viewport_point_to_scene(client: ScrollPoint, viewport: &ViewportState) -> ScrollPoint {
    let zoom = sanitize_zoom(viewport.zoom);
    ScrollPoint::new(
        (client.x - viewport.offset_left) / zoom - viewport.scroll_x,
        (client.y - viewport.offset_top) / zoom - viewport.scroll_y,
    )
}

/// Inverse of [`viewport_point_to_scene`]
pub fn scene_point_to_viewport(scene: ScrollPoint, viewport: &ViewportState) -> ScrollPoint {
    let zoom = sanitize_zoom(viewport.zoom);
    ScrollPoint::new(
        (scene.x + viewport.scroll_x) * zoom + viewport.offset_left,
        (scene.y + viewport.scroll_y) * zoom + viewport.offset_top,
    )
}
