//! Tether configuration file handling
//!
//! `tether.toml` holds the sync defaults and registry tuning:
//!
//! ```toml
//! [sync]
//! enabled = true
//! target = "auto"
//! reconcile_tolerance = 0.5
//!
//! [registry]
//! debounce_ms = 150
//! max_id_depth = 8
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_page::{RegistryConfig, DEFAULT_MAX_ID_DEPTH};

use crate::controller::{ControllerConfig, SyncSettings, DEFAULT_RECONCILE_TOLERANCE};
use crate::error::{Result, SyncError};
use crate::mode::{OverlayMode, SyncTargetMode};

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "tether.toml";

// =============================================================================
// tether.toml
// =============================================================================

/// Root of `tether.toml`
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TetherConfig {
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub registry: RegistrySection,
}

/// `[sync]` table
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SyncSection {
    /// Whether sync starts enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// `auto`, `window` or `element:<id>`
    #[serde(default)]
    pub target: SyncTargetMode,
    /// Unapplied page delta, in pixels, tolerated without a canvas correction
    #[serde(default = "default_reconcile_tolerance")]
    pub reconcile_tolerance: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_reconcile_tolerance() -> f64 {
    DEFAULT_RECONCILE_TOLERANCE
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            target: SyncTargetMode::default(),
            reconcile_tolerance: default_reconcile_tolerance(),
        }
    }
}

/// `[registry]` table
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegistrySection {
    /// Quiet window before a rescan runs
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Levels walked when building structural target ids
    #[serde(default = "default_max_id_depth")]
    pub max_id_depth: usize,
}

fn default_debounce_ms() -> u64 {
    150
}

fn default_max_id_depth() -> usize {
    DEFAULT_MAX_ID_DEPTH
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_id_depth: default_max_id_depth(),
        }
    }
}

impl TetherConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SyncError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `tether.toml` from `dir` if present, else defaults
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            debounce: Duration::from_millis(self.registry.debounce_ms),
            max_id_depth: self.registry.max_id_depth,
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            reconcile_tolerance: self.sync.reconcile_tolerance.max(0.0),
        }
    }

    /// Initial settings for the given overlay mode
    pub fn settings(&self, overlay_mode: OverlayMode) -> SyncSettings {
        SyncSettings::new(self.sync.enabled, overlay_mode, self.sync.target.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TetherConfig::from_toml_str("").unwrap();
        assert_eq!(config, TetherConfig::default());
        assert!(config.sync.enabled);
        assert_eq!(config.sync.target, SyncTargetMode::Auto);
        assert_eq!(config.registry_config(), RegistryConfig::default());
        assert_eq!(config.controller_config(), ControllerConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = TetherConfig::from_toml_str(
            r#"
            [sync]
            target = "element:body>div#feed"

            [registry]
            debounce_ms = 40
            "#,
        )
        .unwrap();

        assert_eq!(
            config.sync.target,
            SyncTargetMode::Element("body>div#feed".to_string())
        );
        assert_eq!(config.registry.debounce_ms, 40);
        assert_eq!(config.registry.max_id_depth, DEFAULT_MAX_ID_DEPTH);
        let settings = config.settings(OverlayMode::Annotate);
        assert!(settings.is_active());
    }

    #[test]
    fn test_reconcile_tolerance_reaches_controller() {
        let exact = TetherConfig::from_toml_str("[sync]\nreconcile_tolerance = 0.0").unwrap();
        assert_eq!(exact.controller_config().reconcile_tolerance, 0.0);

        // Negative tolerances clamp to exact comparison
        let negative = TetherConfig::from_toml_str("[sync]\nreconcile_tolerance = -2.0").unwrap();
        assert_eq!(negative.controller_config().reconcile_tolerance, 0.0);
    }

    #[test]
    fn test_invalid_target_is_rejected() {
        let err = TetherConfig::from_toml_str("[sync]\ntarget = \"diagonal\"").unwrap_err();
        assert!(matches!(err, SyncError::ConfigParse(_)));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = TetherConfig::default();
        config.sync.target = SyncTargetMode::Window;
        let text = config.to_toml().unwrap();
        assert!(text.contains("target = \"window\""));
        assert_eq!(TetherConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = TetherConfig::load(Path::new("/nonexistent/tether.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tether.toml"));
    }
}
