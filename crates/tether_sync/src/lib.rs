//! Tether Scroll Sync
//!
//! Keeps an annotation canvas pinned to the page content underneath it while
//! either side scrolls:
//!
//! - **Modes**: `auto` / `window` / `element:<id>` target selection and the
//!   overlay's interaction mode
//! - **Resolver**: picks the single active scroll target per interaction
//! - **Controller**: mirrors deltas both ways under zoom, suppresses echoes
//!   with a one-direction write guard, and corrects clamped page scrolls one
//!   frame later
//! - **Capture placement**: lands a captured image over the page region it
//!   came from
//! - **Harness**: deterministic host simulator used by tests and the CLI
//!
//! # Example
//!
//! ```rust
//! use tether_core::{ScrollPoint, Size};
//! use tether_page::Document;
//! use tether_sync::{MemoryCanvas, OverlayMode, SyncHarness, SyncSettings, SyncTargetMode};
//!
//! let mut doc = Document::new(Size::new(1280.0, 800.0));
//! doc.set_document_size(1280.0, 4000.0);
//!
//! let mut harness = SyncHarness::new(doc, MemoryCanvas::new().with_zoom(2.0));
//! harness.mount();
//! harness.configure(&SyncSettings::new(true, OverlayMode::Browse, SyncTargetMode::Auto));
//!
//! let report = harness.scroll_window(ScrollPoint::new(0.0, 200.0));
//! assert_eq!(report.canvas_scroll, ScrollPoint::new(0.0, -100.0));
//! assert_eq!(report.canvas_writes, 1);
//! ```

pub mod canvas;
pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod harness;
pub mod mode;
pub mod resolver;

pub use canvas::{CanvasApi, CanvasScrollChange, MemoryCanvas};
pub use capture::{
    data_url_mime_type, place_capture, CaptureElement, CaptureElementKind, CaptureFile,
    CapturePlacement, CAPTURE_BORDER_COLOR, DEFAULT_CAPTURE_MIME,
};
pub use config::{RegistrySection, SyncSection, TetherConfig, CONFIG_FILE_NAME};
pub use controller::{
    ControllerConfig, InteractionKind, ScrollSyncController, SyncHost, SyncSettings, SyncState,
    SyncStats, DEFAULT_RECONCILE_TOLERANCE,
};
pub use error::{Result, SyncError};
pub use harness::{StepReport, SyncHarness, FRAME_INTERVAL, MAX_DISPATCH_ROUNDS};
pub use mode::{OverlayMode, SyncTargetMode};
pub use resolver::TargetResolver;
pub use tether_page::ScrollTarget;
