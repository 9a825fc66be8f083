//! Deterministic sync session harness
//!
//! Owns a page, an in-memory canvas, a target registry and a controller, and
//! plays the host's part: it delivers queued scroll events and canvas change
//! notifications, runs deferred ticks, and fires animation frames on a
//! virtual clock. Used by the CLI's scenario replay and by integration tests.
//!
//! One host turn is pumped as:
//!
//! ```text
//! loop {
//!     deliver canvas changes  ──► handle_canvas_scroll
//!     deliver page scrolls    ──► handle_page_scroll
//!     nothing delivered?      ──► flush_deferred, or stop
//! }
//! ```

use std::time::Duration;

use serde::Serialize;
use tether_core::{to_canvas_delta, DeterministicClock, ScrollPoint};
use tether_page::{
    element_target_id, to_scroll_target, Document, EventOrigin, NodeId, ScrollTarget,
    ScrollTargetRegistry, TargetCatalog, DEFAULT_MAX_ID_DEPTH,
};

use crate::canvas::{CanvasApi, MemoryCanvas};
use crate::config::TetherConfig;
use crate::controller::{
    InteractionKind, ScrollSyncController, SyncHost, SyncSettings, SyncState, SyncStats,
};

/// Delivery rounds allowed per turn before the turn is reported unsettled
pub const MAX_DISPATCH_ROUNDS: usize = 64;

/// Virtual time between animation frames
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// What one harness step caused
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepReport {
    /// Programmatic page scrolls issued during the step
    pub page_writes: u64,
    /// Programmatic canvas writes issued during the step
    pub canvas_writes: u64,
    /// Of those, clamp corrections
    pub corrections: u64,
    /// Echoes swallowed by the write guard
    pub echoes_suppressed: u64,
    /// Delivery rounds the host turn needed
    pub rounds: usize,
    /// False if delivery was still producing events after the round limit
    pub settled: bool,
    pub state: SyncState,
    pub canvas_scroll: ScrollPoint,
    pub window_scroll: ScrollPoint,
    pub active_target: Option<String>,
}

impl StepReport {
    /// Total programmatic writes on both sides
    pub fn writes(&self) -> u64 {
        self.page_writes + self.canvas_writes
    }
}

/// Host simulator for one page and one canvas
pub struct SyncHarness {
    document: Document,
    canvas: MemoryCanvas,
    registry: ScrollTargetRegistry,
    controller: ScrollSyncController,
    clock: DeterministicClock,
    overlay: Option<NodeId>,
}

impl SyncHarness {
    pub fn new(document: Document, canvas: MemoryCanvas) -> Self {
        Self::with_config(document, canvas, &TetherConfig::default())
    }

    pub fn with_config(document: Document, canvas: MemoryCanvas, config: &TetherConfig) -> Self {
        Self {
            document,
            canvas,
            registry: ScrollTargetRegistry::new(config.registry_config()),
            controller: ScrollSyncController::new(config.controller_config()),
            clock: DeterministicClock::new(),
            overlay: None,
        }
    }

    /// Mark `overlay` as the overlay's own container
    pub fn with_overlay(mut self, overlay: NodeId) -> Self {
        self.set_overlay(Some(overlay));
        self
    }

    pub fn set_overlay(&mut self, overlay: Option<NodeId>) {
        self.overlay = overlay;
        self.registry.set_overlay_root(overlay);
        self.controller.set_overlay_root(overlay);
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct page access for mutations; scroll events it queues are
    /// delivered on the next step
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn canvas(&self) -> &MemoryCanvas {
        &self.canvas
    }

    pub fn controller(&self) -> &ScrollSyncController {
        &self.controller
    }

    pub fn registry(&self) -> &ScrollTargetRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ScrollTargetRegistry {
        &mut self.registry
    }

    pub fn catalog(&self) -> &TargetCatalog {
        self.registry.catalog()
    }

    pub fn overlay(&self) -> Option<NodeId> {
        self.overlay
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    // =========================================================================
    // Steps
    // =========================================================================

    /// Mount the registry (initial scan and mutation watch)
    pub fn mount(&mut self) {
        self.registry.mount(&mut self.document);
    }

    /// Apply new settings
    pub fn configure(&mut self, settings: &SyncSettings) -> StepReport {
        self.step(|harness| {
            let mut host = SyncHost::new(
                &mut harness.document,
                &mut harness.canvas,
                harness.registry.catalog(),
            );
            harness.controller.configure(settings, &mut host);
        })
    }

    /// User pans the canvas by `delta` scene units
    pub fn pan_canvas(&mut self, delta: ScrollPoint) -> StepReport {
        self.step(|harness| harness.canvas.pan_by(delta))
    }

    /// User zooms the canvas
    pub fn zoom_canvas(&mut self, zoom: f64) -> StepReport {
        self.step(|harness| harness.canvas.set_zoom(zoom))
    }

    /// User scrolls the window natively
    pub fn scroll_window(&mut self, delta: ScrollPoint) -> StepReport {
        self.step(|harness| {
            harness.document.scroll_window_by(delta);
        })
    }

    /// User scrolls an element natively
    pub fn scroll_element(&mut self, node: NodeId, delta: ScrollPoint) -> StepReport {
        self.step(|harness| {
            harness.document.scroll_by(node, delta);
        })
    }

    pub fn pointer_down(&mut self, origin: EventOrigin) -> StepReport {
        self.step(|harness| harness.interact(InteractionKind::PointerDown, origin))
    }

    /// Wheel over `origin` with a page-space `delta`
    ///
    /// Over the overlay the canvas handles the wheel and pans; elsewhere the
    /// page scrolls whatever is under the pointer.
    pub fn wheel(&mut self, origin: EventOrigin, delta: ScrollPoint) -> StepReport {
        self.step(|harness| {
            harness.interact(InteractionKind::Wheel, origin);

            let over_overlay = match (harness.overlay, origin) {
                (Some(overlay), EventOrigin::Node(node)) => {
                    harness.document.contains(overlay, node)
                }
                _ => false,
            };
            if over_overlay {
                let zoom = harness.canvas.current_zoom();
                harness.canvas.pan_by(to_canvas_delta(delta, zoom));
            } else {
                let target = to_scroll_target(&harness.document, origin);
                target.scroll_by(&mut harness.document, delta);
            }
        })
    }

    /// Remove an element and its subtree from the page
    pub fn remove(&mut self, node: NodeId) -> StepReport {
        self.step(|harness| {
            harness.document.remove(node);
        })
    }

    /// Advance one frame: reconcile, then poll the registry
    pub fn frame(&mut self) -> StepReport {
        self.step(|harness| harness.run_frame())
    }

    /// Advance virtual time by `duration`, one frame at a time
    pub fn advance(&mut self, duration: Duration) -> StepReport {
        self.step(|harness| {
            let target = harness.clock.now() + duration;
            while harness.clock.now() < target {
                harness.run_frame();
                harness.pump();
            }
        })
    }

    /// Deliver whatever is queued without any user input
    pub fn settle(&mut self) -> StepReport {
        self.step(|_| {})
    }

    /// Tear the controller down and unmount the registry
    pub fn teardown(&mut self) -> StepReport {
        self.step(|harness| {
            harness.controller.teardown();
            harness.registry.unmount(&mut harness.document);
        })
    }

    // =========================================================================
    // Host turn
    // =========================================================================

    fn step<F>(&mut self, action: F) -> StepReport
    where
        F: FnOnce(&mut Self),
    {
        let before = self.controller.stats();
        action(self);
        let (rounds, settled) = self.pump();
        if !settled {
            tracing::warn!(rounds, "host turn did not settle, feedback suspected");
        }
        self.report(before, rounds, settled)
    }

    fn interact(&mut self, kind: InteractionKind, origin: EventOrigin) {
        let catalog = self.registry.catalog();
        let mut host = SyncHost::new(&mut self.document, &mut self.canvas, catalog);
        self.controller.handle_interaction(kind, origin, &mut host);
    }

    fn run_frame(&mut self) {
        self.clock.advance(FRAME_INTERVAL);
        {
            let mut host =
                SyncHost::new(&mut self.document, &mut self.canvas, self.registry.catalog());
            self.controller.on_animation_frame(&mut host);
        }
        let now = self.clock.now();
        self.registry.poll(&mut self.document, now);
    }

    /// Deliver queued notifications until quiet; returns (rounds, settled)
    fn pump(&mut self) -> (usize, bool) {
        let mut rounds = 0;
        loop {
            let changes = self.canvas.take_changes();
            let events = self.document.take_scroll_events();

            if changes.is_empty() && events.is_empty() {
                if self.controller.has_deferred_work() {
                    self.controller.flush_deferred();
                    continue;
                }
                return (rounds, true);
            }

            rounds += 1;
            if rounds > MAX_DISPATCH_ROUNDS {
                return (rounds, false);
            }

            let catalog = self.registry.catalog();
            let mut host = SyncHost::new(&mut self.document, &mut self.canvas, catalog);
            for change in changes {
                self.controller.handle_canvas_scroll(change, &mut host);
            }
            for event in events {
                self.controller.handle_page_scroll(event.origin, &mut host);
            }
        }
    }

    fn report(&self, before: SyncStats, rounds: usize, settled: bool) -> StepReport {
        let after = self.controller.stats();
        StepReport {
            page_writes: after.page_writes - before.page_writes,
            canvas_writes: after.canvas_writes - before.canvas_writes,
            corrections: after.corrections - before.corrections,
            echoes_suppressed: after.echoes_suppressed - before.echoes_suppressed,
            rounds,
            settled,
            state: self.controller.state(),
            canvas_scroll: self.canvas.current_scroll(),
            window_scroll: self.document.window_scroll(),
            active_target: self
                .controller
                .active_target()
                .map(|target| self.describe_target(target)),
        }
    }

    /// Human-readable name of a target
    pub fn describe_target(&self, target: ScrollTarget) -> String {
        match target {
            ScrollTarget::Window => "window".to_string(),
            ScrollTarget::Element(node) => {
                element_target_id(&self.document, node, DEFAULT_MAX_ID_DEPTH)
            }
        }
    }
}
