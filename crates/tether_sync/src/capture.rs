//! Capture placement
//!
//! Places a captured screenshot region on the canvas so it lands exactly
//! over the page content it was taken from, given the canvas's current
//! pan, zoom and offset. The capture/crop pipeline itself lives elsewhere;
//! it hands over a client-space rectangle and a data URL.

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tether_core::{viewport_point_to_scene, Rect, ViewportState};
use uuid::Uuid;

/// MIME type assumed when a data URL carries none
pub const DEFAULT_CAPTURE_MIME: &str = "image/png";

/// Border drawn around every captured image
pub const CAPTURE_BORDER_COLOR: &str = "#e03131";

static DATA_URL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn data_url_pattern() -> Option<&'static Regex> {
    DATA_URL_PATTERN
        .get_or_init(|| Regex::new(r"(?i)^data:([^;]+);base64,").ok())
        .as_ref()
}

/// MIME type declared by a base64 data URL, or [`DEFAULT_CAPTURE_MIME`]
pub fn data_url_mime_type(data_url: &str) -> &str {
    data_url_pattern()
        .and_then(|pattern| pattern.captures(data_url))
        .and_then(|captures| captures.get(1))
        .map_or(DEFAULT_CAPTURE_MIME, |mime| mime.as_str())
}

// ============================================================================
// Files
// ============================================================================

/// Binary file record backing a captured image element
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureFile {
    pub id: String,
    #[serde(rename = "dataURL")]
    pub data_url: String,
    pub mime_type: String,
    /// Milliseconds since the Unix epoch
    pub created: u64,
}

impl CaptureFile {
    /// Wrap a data URL in a new file record with a fresh `file-<uuid>` id
    pub fn from_data_url(data_url: impl Into<String>) -> Self {
        let data_url = data_url.into();
        let mime_type = data_url_mime_type(&data_url).to_string();
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64);
        Self {
            id: format!("file-{}", Uuid::new_v4()),
            data_url,
            mime_type,
            created,
        }
    }
}

// ============================================================================
// Elements
// ============================================================================

/// What a placed capture element draws
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CaptureElementKind {
    Image {
        #[serde(rename = "fileId")]
        file_id: String,
    },
    Rectangle {
        #[serde(rename = "strokeColor")]
        stroke_color: String,
        #[serde(rename = "backgroundColor")]
        background_color: String,
        #[serde(rename = "strokeWidth")]
        stroke_width: f64,
        opacity: u8,
        roughness: u8,
    },
}

/// A scene element produced by [`place_capture`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureElement {
    #[serde(flatten)]
    pub kind: CaptureElementKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub group_ids: Vec<String>,
}

/// Image plus border, grouped so they move together
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePlacement {
    pub group_id: String,
    pub image: CaptureElement,
    pub border: CaptureElement,
}

impl CapturePlacement {
    /// Scene rectangle both elements occupy
    pub fn scene_rect(&self) -> Rect {
        Rect::new(self.image.x, self.image.y, self.image.width, self.image.height)
    }
}

/// Place a captured client-space `rect` on the canvas
///
/// Both corners go through [`viewport_point_to_scene`]; width and height are
/// at least one scene unit so a degenerate selection still yields a visible
/// element.
pub fn place_capture(rect: Rect, file_id: &str, viewport: &ViewportState) -> CapturePlacement {
    let top_left = viewport_point_to_scene(rect.top_left(), viewport);
    let bottom_right = viewport_point_to_scene(rect.bottom_right(), viewport);
    let width = (bottom_right.x - top_left.x).max(1.0);
    let height = (bottom_right.y - top_left.y).max(1.0);
    let group_id = format!("group-{}", Uuid::new_v4());

    let element = |kind| CaptureElement {
        kind,
        x: top_left.x,
        y: top_left.y,
        width,
        height,
        group_ids: vec![group_id.clone()],
    };

    let image = element(CaptureElementKind::Image {
        file_id: file_id.to_string(),
    });
    let border = element(CaptureElementKind::Rectangle {
        stroke_color: CAPTURE_BORDER_COLOR.to_string(),
        background_color: "transparent".to_string(),
        stroke_width: 2.0,
        opacity: 50,
        roughness: 0,
    });

    tracing::debug!(
        %group_id,
        x = top_left.x,
        y = top_left.y,
        width,
        height,
        "capture placed on canvas"
    );

    CapturePlacement {
        group_id,
        image,
        border,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{scene_point_to_viewport, ScrollPoint};

    #[test]
    fn test_mime_type_from_data_url() {
        assert_eq!(data_url_mime_type("data:image/jpeg;base64,AAAA"), "image/jpeg");
        assert_eq!(data_url_mime_type("DATA:image/webp;BASE64,AAAA"), "image/webp");
        assert_eq!(data_url_mime_type("data:,plain"), DEFAULT_CAPTURE_MIME);
        assert_eq!(data_url_mime_type(""), DEFAULT_CAPTURE_MIME);
    }

    #[test]
    fn test_capture_file_ids() {
        let file = CaptureFile::from_data_url("data:image/png;base64,iVBORw0KGgo=");
        assert!(file.id.starts_with("file-"));
        assert_eq!(file.mime_type, "image/png");
        assert_ne!(file.id, CaptureFile::from_data_url("data:image/png;base64,").id);
    }

    #[test]
    fn test_place_capture_under_pan_and_zoom() {
        let viewport =
            ViewportState::new(ScrollPoint::new(-100.0, -400.0), 2.0).with_offset(10.0, 20.0);
        let rect = Rect::new(110.0, 220.0, 200.0, 100.0);

        let placed = place_capture(rect, "file-1", &viewport);
        assert_eq!(placed.scene_rect(), Rect::new(150.0, 500.0, 100.0, 50.0));
        assert_eq!(placed.image.group_ids, vec![placed.group_id.clone()]);
        assert_eq!(placed.border.group_ids, placed.image.group_ids);
        assert!(placed.group_id.starts_with("group-"));

        // The scene corner maps back onto the selection
        let corner = scene_point_to_viewport(ScrollPoint::new(150.0, 500.0), &viewport);
        assert_eq!(corner, rect.top_left());
    }

    #[test]
    fn test_degenerate_selection_keeps_minimum_size() {
        let rect = Rect::new(5.0, 5.0, 0.0, 0.0);
        let placed = place_capture(rect, "file-2", &ViewportState::default());
        assert_eq!(placed.image.width, 1.0);
        assert_eq!(placed.image.height, 1.0);
        match placed.border.kind {
            CaptureElementKind::Rectangle {
                ref stroke_color,
                opacity,
                ..
            } => {
                assert_eq!(stroke_color, CAPTURE_BORDER_COLOR);
                assert_eq!(opacity, 50);
            }
            _ => panic!("border should be a rectangle"),
        }
    }
}
