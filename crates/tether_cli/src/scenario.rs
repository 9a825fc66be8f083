//! Scripted sessions
//!
//! A scenario file describes a page, the canvas, the starting settings and a
//! list of steps:
//!
//! ```toml
//! [page]
//! width = 1280
//! height = 800
//! document_height = 4000
//!
//! [[page.elements]]
//! name = "feed"
//! id = "feed"
//! overflow_y = "auto"
//! width = 600
//! height = 500
//! content_height = 3000
//!
//! [[page.elements]]
//! name = "overlay"
//! overlay = true
//! width = 1280
//! height = 800
//!
//! [settings]
//! mode = "browse"
//! target = "auto"
//!
//! [[steps]]
//! action = "wheel"
//! element = "overlay"
//! dy = 120
//!
//! [[steps]]
//! action = "frame"
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use tether_core::{Rect, ScrollPoint, Size};
use tether_page::{Document, Element, EventOrigin, NodeId, Overflow};
use tether_sync::{
    place_capture, CanvasApi, CaptureFile, CapturePlacement, MemoryCanvas, OverlayMode,
    StepReport, SyncHarness, SyncSettings, SyncTargetMode, TetherConfig,
};

/// Name that refers to `body` as a parent
const BODY: &str = "body";

// =============================================================================
// File Format
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub page: PageDef,
    #[serde(default)]
    pub canvas: CanvasDef,
    #[serde(default)]
    pub settings: SettingsDef,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct PageDef {
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    /// Full document height scrolled by the window (defaults to the viewport)
    #[serde(default)]
    pub document_height: Option<f64>,
    #[serde(default)]
    pub document_width: Option<f64>,
    #[serde(default)]
    pub elements: Vec<ElementDef>,
}

fn default_width() -> f64 {
    1280.0
}

fn default_height() -> f64 {
    800.0
}

/// One element, appended in file order under `parent`
#[derive(Debug, Deserialize)]
pub struct ElementDef {
    /// Handle used by steps
    pub name: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Name of an earlier element, or `body`
    #[serde(default = "default_parent")]
    pub parent: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub overflow: Option<String>,
    #[serde(default)]
    pub overflow_x: Option<String>,
    #[serde(default)]
    pub overflow_y: Option<String>,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub content_width: Option<f64>,
    #[serde(default)]
    pub content_height: Option<f64>,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
    /// Marks the overlay's own container
    #[serde(default)]
    pub overlay: bool,
}

fn default_tag() -> String {
    "div".to_string()
}

fn default_parent() -> String {
    BODY.to_string()
}

#[derive(Debug, Deserialize)]
pub struct CanvasDef {
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
    #[serde(default)]
    pub offset_left: f64,
    #[serde(default)]
    pub offset_top: f64,
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for CanvasDef {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            scroll_x: 0.0,
            scroll_y: 0.0,
            offset_left: 0.0,
            offset_top: 0.0,
        }
    }
}

/// Starting settings; unset fields come from the config file
#[derive(Debug, Default, Deserialize)]
pub struct SettingsDef {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub mode: Option<OverlayMode>,
    #[serde(default)]
    pub target: Option<SyncTargetMode>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    PanCanvas {
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    Zoom {
        zoom: f64,
    },
    ScrollWindow {
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    ScrollElement {
        element: String,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    PointerDown {
        #[serde(default)]
        element: Option<String>,
    },
    Wheel {
        #[serde(default)]
        element: Option<String>,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    Frame,
    Advance {
        ms: u64,
    },
    Remove {
        element: String,
    },
    Configure {
        #[serde(default)]
        enabled: Option<bool>,
        #[serde(default)]
        mode: Option<OverlayMode>,
        #[serde(default)]
        target: Option<SyncTargetMode>,
    },
    Capture {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        #[serde(default = "default_data_url")]
        data_url: String,
    },
    Teardown,
}

fn default_data_url() -> String {
    "data:image/png;base64,".to_string()
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::PanCanvas { .. } => "pan-canvas",
            Step::Zoom { .. } => "zoom",
            Step::ScrollWindow { .. } => "scroll-window",
            Step::ScrollElement { .. } => "scroll-element",
            Step::PointerDown { .. } => "pointer-down",
            Step::Wheel { .. } => "wheel",
            Step::Frame => "frame",
            Step::Advance { .. } => "advance",
            Step::Remove { .. } => "remove",
            Step::Configure { .. } => "configure",
            Step::Capture { .. } => "capture",
            Step::Teardown => "teardown",
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

// =============================================================================
// Session
// =============================================================================

/// Outcome of one replayed step
#[derive(Debug, serde::Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    #[serde(flatten)]
    pub report: StepReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture: Option<CapturedImage>,
}

#[derive(Debug, serde::Serialize)]
pub struct CapturedImage {
    pub file: CaptureFile,
    pub placement: CapturePlacement,
}

/// A scenario's page wired into a harness
pub struct Session {
    harness: SyncHarness,
    nodes: IndexMap<String, NodeId>,
    settings: SyncSettings,
}

impl Session {
    /// Build the page, mount the registry and apply the starting settings
    pub fn start(scenario: &Scenario, config: &TetherConfig) -> Result<Self> {
        let (document, nodes, overlay) = build_document(&scenario.page)?;

        let canvas_def = &scenario.canvas;
        let canvas = MemoryCanvas::new()
            .with_zoom(canvas_def.zoom)
            .with_scroll(ScrollPoint::new(canvas_def.scroll_x, canvas_def.scroll_y))
            .with_offset(canvas_def.offset_left, canvas_def.offset_top);

        let mut harness = SyncHarness::with_config(document, canvas, config);
        harness.set_overlay(overlay);
        harness.mount();

        let defaults = config.settings(OverlayMode::Browse);
        let settings = SyncSettings {
            enabled: scenario.settings.enabled.unwrap_or(defaults.enabled),
            overlay_mode: scenario.settings.mode.unwrap_or(defaults.overlay_mode),
            target_mode: scenario
                .settings
                .target
                .clone()
                .unwrap_or(defaults.target_mode),
        };
        harness.configure(&settings);

        Ok(Self {
            harness,
            nodes,
            settings,
        })
    }

    pub fn harness(&self) -> &SyncHarness {
        &self.harness
    }

    /// Run one step through the harness
    pub fn run(&mut self, index: usize, step: &Step) -> Result<StepOutcome> {
        let mut capture = None;
        let report = match step {
            Step::PanCanvas { dx, dy } => self.harness.pan_canvas(ScrollPoint::new(*dx, *dy)),
            Step::Zoom { zoom } => self.harness.zoom_canvas(*zoom),
            Step::ScrollWindow { dx, dy } => {
                self.harness.scroll_window(ScrollPoint::new(*dx, *dy))
            }
            Step::ScrollElement { element, dx, dy } => {
                let node = self.node(element)?;
                self.harness
                    .scroll_element(node, ScrollPoint::new(*dx, *dy))
            }
            Step::PointerDown { element } => {
                let origin = self.origin(element.as_deref())?;
                self.harness.pointer_down(origin)
            }
            Step::Wheel { element, dx, dy } => {
                let origin = self.origin(element.as_deref())?;
                self.harness.wheel(origin, ScrollPoint::new(*dx, *dy))
            }
            Step::Frame => self.harness.frame(),
            Step::Advance { ms } => self.harness.advance(Duration::from_millis(*ms)),
            Step::Remove { element } => {
                let node = self.node(element)?;
                self.harness.remove(node)
            }
            Step::Configure {
                enabled,
                mode,
                target,
            } => {
                if let Some(enabled) = enabled {
                    self.settings.enabled = *enabled;
                }
                if let Some(mode) = mode {
                    self.settings.overlay_mode = *mode;
                }
                if let Some(target) = target {
                    self.settings.target_mode = target.clone();
                }
                let settings = self.settings.clone();
                self.harness.configure(&settings)
            }
            Step::Capture {
                left,
                top,
                width,
                height,
                data_url,
            } => {
                let file = CaptureFile::from_data_url(data_url.clone());
                let viewport = self.harness.canvas().viewport_state();
                let rect = Rect::new(*left, *top, *width, *height);
                let placement = place_capture(rect, &file.id, &viewport);
                capture = Some(CapturedImage { file, placement });
                self.harness.settle()
            }
            Step::Teardown => self.harness.teardown(),
        };

        Ok(StepOutcome {
            index,
            action: step.action(),
            report,
            capture,
        })
    }

    fn node(&self, name: &str) -> Result<NodeId> {
        match self.nodes.get(name) {
            Some(node) => Ok(*node),
            None => bail!("Unknown element '{}'", name),
        }
    }

    fn origin(&self, name: Option<&str>) -> Result<EventOrigin> {
        Ok(match name {
            None => EventOrigin::Window,
            Some(name) => EventOrigin::Node(self.node(name)?),
        })
    }
}

/// Build the document; returns it with the name table and the overlay root
fn build_document(
    page: &PageDef,
) -> Result<(Document, IndexMap<String, NodeId>, Option<NodeId>)> {
    let mut doc = Document::new(Size::new(page.width, page.height));
    if page.document_height.is_some() || page.document_width.is_some() {
        doc.set_document_size(
            page.document_width.unwrap_or(page.width),
            page.document_height.unwrap_or(page.height),
        );
    }

    let mut nodes = IndexMap::new();
    let mut overlay = None;

    for element in &page.elements {
        if element.name == BODY || nodes.contains_key(&element.name) {
            bail!("Duplicate element name '{}'", element.name);
        }
        let parent = if element.parent == BODY {
            doc.body()
        } else {
            match nodes.get(&element.parent) {
                Some(parent) => *parent,
                None => bail!(
                    "Element '{}' has unknown parent '{}' (parents must come first)",
                    element.name,
                    element.parent
                ),
            }
        };

        let node = doc.append(parent, element_from_def(element));
        if element.overlay {
            if overlay.is_some() {
                bail!("More than one element is marked as the overlay");
            }
            overlay = Some(node);
        }
        nodes.insert(element.name.clone(), node);
    }

    // Initial offsets are setup, not user scrolling
    doc.take_scroll_events();
    Ok((doc, nodes, overlay))
}

fn element_from_def(def: &ElementDef) -> Element {
    let mut element = Element::new(def.tag.as_str())
        .at(def.left, def.top)
        .size(def.width, def.height);

    if let Some(id) = &def.id {
        element = element.id(id.as_str());
    }
    if let Some(class) = &def.class {
        element = element.class(class.as_str());
    }
    if let Some(role) = &def.role {
        element = element.role(role.as_str());
    }
    if let Some(label) = &def.aria_label {
        element = element.aria_label(label.as_str());
    }
    if let Some(overflow) = &def.overflow {
        element = element.overflow(Overflow::from_css(overflow));
    }
    if let Some(overflow) = &def.overflow_x {
        element = element.overflow_x(Overflow::from_css(overflow));
    }
    if let Some(overflow) = &def.overflow_y {
        element = element.overflow_y(Overflow::from_css(overflow));
    }
    if def.content_width.is_some() || def.content_height.is_some() {
        element = element.content_size(
            def.content_width.unwrap_or(def.width),
            def.content_height.unwrap_or(def.height),
        );
    }
    element.scrolled_to(def.scroll_x, def.scroll_y)
}
