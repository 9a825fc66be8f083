//! Annotation canvas collaborator
//!
//! The canvas is an opaque engine exposing its pan position and zoom. Its
//! scroll-change notifications reach the controller through
//! [`ScrollSyncController::handle_canvas_scroll`](crate::ScrollSyncController::handle_canvas_scroll);
//! the host wires that subscription while a sync session is active.

use std::collections::VecDeque;

use tether_core::{ScrollPoint, ViewportState};

/// Scroll position and zoom reported by a canvas change notification
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasScrollChange {
    pub scroll: ScrollPoint,
    pub zoom: f64,
}

/// The canvas engine as seen by the sync controller
pub trait CanvasApi {
    /// Current pan position in scene units
    fn current_scroll(&self) -> ScrollPoint;

    /// Current zoom factor. Zero or missing is treated as `1.0` by callers.
    fn current_zoom(&self) -> f64;

    /// Programmatically move the canvas
    ///
    /// May emit the canvas's own change notification, and nothing else.
    fn set_scroll(&mut self, scroll: ScrollPoint);

    /// Pan/zoom state used to place captured images
    fn viewport_state(&self) -> ViewportState {
        ViewportState::new(self.current_scroll(), self.current_zoom())
    }
}

/// In-memory canvas used by the harness, the CLI and tests
///
/// Every position change (user pan, zoom, programmatic write) queues a
/// [`CanvasScrollChange`] for the host to deliver. Programmatic writes are
/// also counted.
#[derive(Debug, Clone)]
pub struct MemoryCanvas {
    scroll: ScrollPoint,
    zoom: f64,
    offset_left: f64,
    offset_top: f64,
    changes: VecDeque<CanvasScrollChange>,
    writes: Vec<ScrollPoint>,
}

impl Default for MemoryCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCanvas {
    pub fn new() -> Self {
        Self {
            scroll: ScrollPoint::ZERO,
            zoom: 1.0,
            offset_left: 0.0,
            offset_top: 0.0,
            changes: VecDeque::new(),
            writes: Vec::new(),
        }
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_scroll(mut self, scroll: ScrollPoint) -> Self {
        self.scroll = scroll;
        self
    }

    /// Set the canvas element's offset within the viewport
    pub fn with_offset(mut self, left: f64, top: f64) -> Self {
        self.offset_left = left;
        self.offset_top = top;
        self
    }

    /// User pans the canvas by `delta` scene units
    pub fn pan_by(&mut self, delta: ScrollPoint) {
        self.scroll += delta;
        self.notify();
    }

    /// User changes zoom; the canvas reports it with its unchanged position
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
        self.notify();
    }

    /// Drain queued change notifications
    pub fn take_changes(&mut self) -> Vec<CanvasScrollChange> {
        self.changes.drain(..).collect()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Positions written through [`CanvasApi::set_scroll`], oldest first
    pub fn writes(&self) -> &[ScrollPoint] {
        &self.writes
    }

    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    fn notify(&mut self) {
        self.changes.push_back(CanvasScrollChange {
            scroll: self.scroll,
            zoom: self.zoom,
        });
    }
}

impl CanvasApi for MemoryCanvas {
    fn current_scroll(&self) -> ScrollPoint {
        self.scroll
    }

    fn current_zoom(&self) -> f64 {
        self.zoom
    }

    fn set_scroll(&mut self, scroll: ScrollPoint) {
        self.scroll = scroll;
        self.writes.push(scroll);
        self.notify();
    }

    fn viewport_state(&self) -> ViewportState {
        ViewportState::new(self.scroll, self.zoom).with_offset(self.offset_left, self.offset_top)
    }
}
