//! Sync target mode and overlay mode
//!
//! Both are owned by the surrounding UI and read-only to the engine. They
//! serialize as their string forms so they can live in TOML config and
//! extension storage unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

const ELEMENT_PREFIX: &str = "element:";

/// Which scroll target the canvas follows
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SyncTargetMode {
    /// Pick the target per interaction
    #[default]
    Auto,
    /// Always the page viewport
    Window,
    /// Pinned to a catalog id
    Element(String),
}

impl SyncTargetMode {
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// The pinned catalog id, if any
    pub fn element_id(&self) -> Option<&str> {
        match self {
            Self::Element(id) => Some(id),
            _ => None,
        }
    }
}

impl FromStr for SyncTargetMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(Self::Auto),
            "window" => Ok(Self::Window),
            other => match other.strip_prefix(ELEMENT_PREFIX) {
                Some(id) if !id.is_empty() => Ok(Self::Element(id.to_string())),
                _ => Err(SyncError::InvalidTargetMode(s.to_string())),
            },
        }
    }
}

impl fmt::Display for SyncTargetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Window => f.write_str("window"),
            Self::Element(id) => write!(f, "{ELEMENT_PREFIX}{id}"),
        }
    }
}

impl TryFrom<String> for SyncTargetMode {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SyncTargetMode> for String {
    fn from(mode: SyncTargetMode) -> Self {
        mode.to_string()
    }
}

/// The overlay's interaction mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    #[default]
    Off,
    Browse,
    Annotate,
    Capture,
}

impl OverlayMode {
    /// Scroll sync only runs while browsing or annotating
    pub fn syncs_scroll(self) -> bool {
        matches!(self, Self::Browse | Self::Annotate)
    }
}

impl FromStr for OverlayMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "off" => Ok(Self::Off),
            "browse" => Ok(Self::Browse),
            "annotate" => Ok(Self::Annotate),
            "capture" => Ok(Self::Capture),
            _ => Err(SyncError::InvalidOverlayMode(s.to_string())),
        }
    }
}

impl fmt::Display for OverlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Browse => "browse",
            Self::Annotate => "annotate",
            Self::Capture => "capture",
        })
    }
}
