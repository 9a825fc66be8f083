//! Scroll sync controller
//!
//! Mirrors scroll deltas between the active page scroll target and the
//! annotation canvas, and keeps the two from echoing each other's writes.
//!
//! # State machine
//!
//! ```text
//!                  configure(enabled, browse|annotate)
//!   Disabled ────────────────────────────────────────► Idle
//!      ▲                                              │  ▲ │
//!      │ configure(disabled)        canvas scroll     │  │ │ page scroll
//!      │                     ┌────────────────────────┘  │ └──────────────┐
//!      │                     ▼                           │                ▼
//!      │            CanvasWritePending ── frame, ok ─────┤        PageWritePending
//!      │                     │                           │                │
//!      │                     └── frame, clamped ──► PageWritePending      │
//!      │                                                 ▲                │
//!      │                                                 └─ flush_deferred┘
//!   teardown() ──► TornDown (terminal)
//! ```
//!
//! The host owns the page, the canvas and the catalog, and lends them to each
//! entry point through [`SyncHost`]. Canvas writes settle within the turn and
//! are released by [`ScrollSyncController::flush_deferred`]. Page writes are
//! measured one animation frame later in
//! [`ScrollSyncController::on_animation_frame`].

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tether_core::{
    sanitize_zoom, to_canvas_delta, to_page_delta, FrameHandle, FrameSlot, ScrollPoint,
};
use tether_page::{Document, EventOrigin, NodeId, ScrollTarget, TargetCatalog};

use crate::canvas::{CanvasApi, CanvasScrollChange};
use crate::mode::{OverlayMode, SyncTargetMode};
use crate::resolver::TargetResolver;

/// Default tolerance when comparing requested and applied page deltas
pub const DEFAULT_RECONCILE_TOLERANCE: f64 = 0.5;

// ============================================================================
// Settings and Host
// ============================================================================

/// UI-owned settings the controller reacts to
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// User-facing sync toggle
    pub enabled: bool,
    /// Overlay interaction mode
    pub overlay_mode: OverlayMode,
    /// Which target the canvas follows
    pub target_mode: SyncTargetMode,
}

impl SyncSettings {
    pub fn new(enabled: bool, overlay_mode: OverlayMode, target_mode: SyncTargetMode) -> Self {
        Self {
            enabled,
            overlay_mode,
            target_mode,
        }
    }

    /// True if these settings call for an active session
    pub fn is_active(&self) -> bool {
        self.enabled && self.overlay_mode.syncs_scroll()
    }
}

/// Controller tuning
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerConfig {
    /// Unapplied page delta (per axis, in pixels) up to which no correction is
    /// pushed yet; the leftover carries into the next reconciliation
    pub reconcile_tolerance: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reconcile_tolerance: DEFAULT_RECONCILE_TOLERANCE,
        }
    }
}

/// Everything the controller borrows from the host for one callback
pub struct SyncHost<'a, C: CanvasApi + ?Sized> {
    pub document: &'a mut Document,
    pub canvas: &'a mut C,
    pub catalog: &'a TargetCatalog,
}

impl<'a, C: CanvasApi + ?Sized> SyncHost<'a, C> {
    pub fn new(document: &'a mut Document, canvas: &'a mut C, catalog: &'a TargetCatalog) -> Self {
        Self {
            document,
            canvas,
            catalog,
        }
    }
}

/// Interactions that re-resolve the active target eagerly
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionKind {
    PointerDown,
    Wheel,
}

/// Externally visible controller state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    Disabled,
    Idle,
    CanvasWritePending,
    PageWritePending,
    TornDown,
}

/// Counters for what the controller has done since creation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Programmatic scrolls issued on page targets
    pub page_writes: u64,
    /// Programmatic scroll positions pushed into the canvas
    pub canvas_writes: u64,
    /// Canvas writes that corrected a clamped page scroll
    pub corrections: u64,
    /// Notifications dropped as echoes of our own writes
    pub echoes_suppressed: u64,
}

// ============================================================================
// Session State
// ============================================================================

/// Which side has a programmatic write in flight
///
/// A single enum, so both directions can never be guarded at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum WriteGuard {
    #[default]
    Idle,
    /// Page write issued from a canvas change; reconciled on the given frame
    CanvasWrite(FrameHandle),
    /// Canvas write issued from a page scroll; released on the deferred tick
    PageWrite,
}

/// A page write awaiting measurement on the next animation frame
#[derive(Clone, Copy, Debug)]
struct PendingReconcile {
    target: ScrollTarget,
    page_before: ScrollPoint,
    requested: ScrollPoint,
    canvas_scroll: ScrollPoint,
    zoom: f64,
}

/// Per-enable state, discarded wholesale on disable, mode change and teardown
#[derive(Debug)]
struct SyncSession {
    target_mode: SyncTargetMode,
    guard: WriteGuard,
    canvas_snapshot: Option<ScrollPoint>,
    target_snapshots: FxHashMap<ScrollTarget, ScrollPoint>,
    active: ScrollTarget,
    reconcile: FrameSlot<PendingReconcile>,
    /// Page delta the canvas is still ahead of, below the tolerance
    uncorrected: ScrollPoint,
}

impl SyncSession {
    fn start(target_mode: SyncTargetMode, doc: &Document, canvas_scroll: ScrollPoint) -> Self {
        let mut target_snapshots = FxHashMap::default();
        target_snapshots.insert(ScrollTarget::Window, doc.window_scroll());
        Self {
            target_mode,
            guard: WriteGuard::Idle,
            canvas_snapshot: Some(canvas_scroll),
            target_snapshots,
            active: ScrollTarget::Window,
            reconcile: FrameSlot::new(),
            uncorrected: ScrollPoint::ZERO,
        }
    }

    /// Drop snapshots of elements that no longer exist
    fn prune(&mut self, doc: &Document) {
        self.target_snapshots.retain(|target, _| match target {
            ScrollTarget::Window => true,
            ScrollTarget::Element(node) => doc.is_connected(*node),
        });
    }

    /// Record the current position of `target` if it has no snapshot yet
    fn ensure_snapshot(&mut self, target: ScrollTarget, doc: &Document) {
        self.target_snapshots
            .entry(target)
            .or_insert_with(|| target.position(doc));
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Bidirectional page/canvas scroll synchronizer
#[derive(Debug, Default)]
pub struct ScrollSyncController {
    config: ControllerConfig,
    resolver: TargetResolver,
    session: Option<SyncSession>,
    stats: SyncStats,
    torn_down: bool,
}

impl ScrollSyncController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Exclude the overlay's subtree from target resolution
    pub fn with_overlay_root(mut self, overlay: NodeId) -> Self {
        self.resolver.set_overlay_root(Some(overlay));
        self
    }

    pub fn set_overlay_root(&mut self, overlay: Option<NodeId>) {
        self.resolver.set_overlay_root(overlay);
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn state(&self) -> SyncState {
        if self.torn_down {
            return SyncState::TornDown;
        }
        match &self.session {
            None => SyncState::Disabled,
            Some(session) => match session.guard {
                WriteGuard::Idle => SyncState::Idle,
                WriteGuard::CanvasWrite(_) => SyncState::CanvasWritePending,
                WriteGuard::PageWrite => SyncState::PageWritePending,
            },
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Target the last interaction or write resolved to
    pub fn active_target(&self) -> Option<ScrollTarget> {
        self.session.as_ref().map(|session| session.active)
    }

    /// Last recorded position of `target`, if the session is tracking it
    pub fn target_snapshot(&self, target: ScrollTarget) -> Option<ScrollPoint> {
        self.session
            .as_ref()
            .and_then(|session| session.target_snapshots.get(&target).copied())
    }

    /// Last recorded canvas position
    pub fn canvas_snapshot(&self) -> Option<ScrollPoint> {
        self.session.as_ref().and_then(|session| session.canvas_snapshot)
    }

    /// True while a reconciliation frame is scheduled
    pub fn has_pending_frame(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.reconcile.is_pending())
    }

    /// True while a canvas write awaits the deferred tick
    pub fn has_deferred_work(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.guard == WriteGuard::PageWrite)
    }

    /// Apply new UI settings
    ///
    /// Any running session is discarded (pending frame cancelled, snapshots and
    /// guards cleared) and a fresh one is started if the settings call for it.
    /// Ignored after [`teardown`](Self::teardown).
    pub fn configure<C>(&mut self, settings: &SyncSettings, host: &mut SyncHost<'_, C>)
    where
        C: CanvasApi + ?Sized,
    {
        if self.torn_down {
            tracing::trace!("configure after teardown ignored");
            return;
        }

        self.end_session();
        if !settings.is_active() {
            tracing::debug!(
                enabled = settings.enabled,
                overlay_mode = %settings.overlay_mode,
                "scroll sync disabled"
            );
            return;
        }

        self.resolver.reset();
        self.session = Some(SyncSession::start(
            settings.target_mode.clone(),
            host.document,
            host.canvas.current_scroll(),
        ));
        tracing::debug!(target_mode = %settings.target_mode, "scroll sync session started");
    }

    /// Canvas reported a new position (user pan or our own write)
    pub fn handle_canvas_scroll<C>(
        &mut self,
        change: CanvasScrollChange,
        host: &mut SyncHost<'_, C>,
    ) where
        C: CanvasApi + ?Sized,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.prune(host.document);

        let previous = session.canvas_snapshot.replace(change.scroll);
        let Some(previous) = previous else {
            return;
        };
        if session.guard == WriteGuard::PageWrite {
            self.stats.echoes_suppressed += 1;
            tracing::trace!(scroll = ?change.scroll, "canvas echo suppressed");
            return;
        }

        let scene_delta = change.scroll - previous;
        if scene_delta.is_zero() {
            return;
        }

        let target = match &session.target_mode {
            SyncTargetMode::Auto => {
                let active = session.active;
                if active.is_window() || !active.is_live(host.document) {
                    self.resolver.auto_preferred(host.document)
                } else {
                    active
                }
            }
            mode => self.resolver.configured(mode, host.document, host.catalog),
        };
        session.active = target;

        let zoom = sanitize_zoom(change.zoom);
        let requested = to_page_delta(scene_delta, zoom);
        let page_before = target.position(host.document);

        // Writes landing before the previous frame fired are folded into one
        // reconciliation measured from the first write's starting point.
        let pending = match session.reconcile.cancel() {
            Some(earlier) if earlier.target == target => PendingReconcile {
                target,
                page_before: earlier.page_before,
                requested: earlier.requested + requested,
                canvas_scroll: change.scroll,
                zoom,
            },
            _ => PendingReconcile {
                target,
                page_before,
                requested,
                canvas_scroll: change.scroll,
                zoom,
            },
        };

        target.scroll_by(host.document, requested);
        let frame = session.reconcile.request(pending);
        session.guard = WriteGuard::CanvasWrite(frame);
        self.stats.page_writes += 1;

        tracing::debug!(
            ?target,
            dx = requested.x,
            dy = requested.y,
            zoom,
            "canvas scroll mirrored to page"
        );
    }

    /// Next animation frame: measure the page write and correct the canvas
    /// if the target could not scroll as far as requested
    pub fn on_animation_frame<C>(&mut self, host: &mut SyncHost<'_, C>)
    where
        C: CanvasApi + ?Sized,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(pending) = session.reconcile.take() else {
            return;
        };
        if let WriteGuard::CanvasWrite(frame) = session.guard {
            tracing::trace!(?frame, target = ?pending.target, "reconciling page write");
        }

        let target = pending.target;
        if let ScrollTarget::Element(node) = target {
            if !host.document.is_connected(node) {
                tracing::debug!(?node, "scroll target vanished before reconciliation");
                session.target_snapshots.remove(&target);
                session.active = ScrollTarget::Window;
                session.guard = WriteGuard::Idle;
                return;
            }
        }

        let page_after = target.position(host.document);
        let applied = page_after - pending.page_before;
        // Sub-tolerance leftovers accumulate until they are worth a correction
        let unapplied = pending.requested - applied + session.uncorrected;
        let tolerance = self.config.reconcile_tolerance;

        if unapplied.approx_eq(ScrollPoint::ZERO, tolerance) {
            session.uncorrected = unapplied;
            session.guard = WriteGuard::Idle;
        } else {
            // Stop the canvas exactly where the page stopped
            let corrected = pending.canvas_scroll - to_canvas_delta(unapplied, pending.zoom);
            session.guard = WriteGuard::PageWrite;
            host.canvas.set_scroll(corrected);
            session.canvas_snapshot = Some(corrected);
            session.uncorrected = ScrollPoint::ZERO;
            self.stats.canvas_writes += 1;
            self.stats.corrections += 1;
            tracing::debug!(
                ?target,
                unapplied_x = unapplied.x,
                unapplied_y = unapplied.y,
                x = corrected.x,
                y = corrected.y,
                "clamped page scroll corrected on canvas"
            );
        }

        session.target_snapshots.insert(target, page_after);
    }

    /// A page scroll event was dispatched from `origin`
    pub fn handle_page_scroll<C>(&mut self, origin: EventOrigin, host: &mut SyncHost<'_, C>)
    where
        C: CanvasApi + ?Sized,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.prune(host.document);
        let doc = &*host.document;

        let window_like = match origin {
            EventOrigin::Window => true,
            EventOrigin::Node(node) => doc.is_window_node(node),
        };

        match &session.target_mode {
            SyncTargetMode::Auto => {
                if self.resolver.is_inside_overlay(doc, origin) {
                    return;
                }
            }
            SyncTargetMode::Window => {
                if origin != EventOrigin::Window {
                    return;
                }
            }
            SyncTargetMode::Element(id) => {
                match TargetResolver::explicit_target(doc, host.catalog, id) {
                    Some(pinned) if origin != EventOrigin::Node(pinned) => return,
                    None if !window_like => return,
                    _ => {}
                }
            }
        }

        let target = self
            .resolver
            .resolve(&session.target_mode, origin, doc, host.catalog);
        session.active = target;
        if let Some(node) = target.element() {
            self.resolver.remember_detected(node);
        }

        // Snapshot moves even for echoes so guarded writes never show up as drift
        let current = target.position(doc);
        let previous = session.target_snapshots.insert(target, current);
        let Some(previous) = previous else {
            return;
        };
        if matches!(session.guard, WriteGuard::CanvasWrite(_)) {
            self.stats.echoes_suppressed += 1;
            tracing::trace!(?target, "page echo suppressed");
            return;
        }

        let page_delta = current - previous;
        if page_delta.is_zero() {
            return;
        }

        let zoom = sanitize_zoom(host.canvas.current_zoom());
        let next = host.canvas.current_scroll() + to_canvas_delta(page_delta, zoom);

        session.guard = WriteGuard::PageWrite;
        host.canvas.set_scroll(next);
        session.canvas_snapshot = Some(next);
        self.stats.canvas_writes += 1;

        tracing::debug!(
            ?target,
            dx = page_delta.x,
            dy = page_delta.y,
            zoom,
            "page scroll mirrored to canvas"
        );
    }

    /// Pointer-down or wheel: re-resolve the active target ahead of scrolling
    pub fn handle_interaction<C>(
        &mut self,
        kind: InteractionKind,
        origin: EventOrigin,
        host: &mut SyncHost<'_, C>,
    ) where
        C: CanvasApi + ?Sized,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        // Wheel is only listened to in auto mode
        if kind == InteractionKind::Wheel && !session.target_mode.is_auto() {
            return;
        }
        session.prune(host.document);
        let doc = &*host.document;

        let target = if session.target_mode.is_auto() {
            self.resolver
                .resolve(&session.target_mode, origin, doc, host.catalog)
        } else {
            self.resolver
                .configured(&session.target_mode, doc, host.catalog)
        };

        if target != session.active {
            tracing::trace!(?kind, from = ?session.active, to = ?target, "active scroll target changed");
        }
        session.active = target;
        if session.target_mode.is_auto() {
            session.ensure_snapshot(target, doc);
        }
    }

    /// Deferred tick: release the guard held by a canvas write
    pub fn flush_deferred(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.guard == WriteGuard::PageWrite {
                session.guard = WriteGuard::Idle;
            }
        }
    }

    /// Cancel everything and stop reacting for good
    pub fn teardown(&mut self) {
        self.end_session();
        self.resolver.reset();
        self.torn_down = true;
        tracing::debug!("scroll sync torn down");
    }

    fn end_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            if session.reconcile.cancel().is_some() {
                tracing::trace!("pending reconciliation cancelled");
            }
        }
    }
}
