use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::enums::{PaintMode, WindowPreset};
use crate::error::{Result, ViewerError};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub contrast: ContrastConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

impl ViewerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: ViewerConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.transform;
        if !(t.min_scale > 0.0 && t.min_scale <= t.max_scale) {
            return Err(ViewerError::InvalidConfig(format!(
                "scale range [{}, {}] is empty",
                t.min_scale, t.max_scale
            )));
        }
        if t.zoom_step <= 0.0 || t.zoom_step >= 1.0 {
            return Err(ViewerError::InvalidConfig(format!(
                "zoom_step {} must lie in (0, 1)",
                t.zoom_step
            )));
        }
        let c = &self.contrast;
        if c.min_hu >= c.max_hu {
            return Err(ViewerError::InvalidConfig(format!(
                "HU domain [{}, {}] is empty",
                c.min_hu, c.max_hu
            )));
        }
        if !(0.0..100.0).contains(&c.histogram_cutoff) {
            return Err(ViewerError::InvalidConfig(format!(
                "histogram_cutoff {} must lie in [0, 100)",
                c.histogram_cutoff
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Fraction of the current scale added or removed per wheel notch.
    pub zoom_step: f64,
    /// Pointer travel (CSS px) separating a drag from a click.
    pub drag_threshold: f64,
    /// Scale above which the minimap viewport is shown.
    pub minimap_threshold: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            min_scale: 1.0,
            max_scale: 10.0,
            zoom_step: 0.1,
            drag_threshold: 2.0,
            minimap_threshold: 1.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f64,
    pub center: f64,
    pub colormap: Option<String>,
    pub presets: Vec<PresetConfig>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 400.0,
            center: 40.0,
            colormap: None,
            presets: vec![
                PresetConfig::new(WindowPreset::Lung, 1500.0, -600.0),
                PresetConfig::new(WindowPreset::Bone, 2500.0, 480.0),
                PresetConfig::new(WindowPreset::SoftTissue, 400.0, 40.0),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresetConfig {
    pub preset: WindowPreset,
    pub width: f64,
    pub center: f64,
}

impl PresetConfig {
    pub fn new(preset: WindowPreset, width: f64, center: f64) -> Self {
        Self {
            preset,
            width,
            center,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    pub min_hu: f64,
    pub max_hu: f64,
    /// Top percentile of histogram bins ignored when normalising bar heights.
    pub histogram_cutoff: f64,
    pub log_scale: bool,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            min_hu: -1024.0,
            max_hu: 3071.0,
            histogram_cutoff: 7.0,
            log_scale: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub brush_size: u32,
    /// Radius around the first vertex that closes a polygon, in internal pixels at scale 1.
    pub close_radius: f64,
    pub mode: PaintMode,
    /// Mask snapshots kept for undo by the in-memory backend.
    pub history_depth: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            brush_size: 1,
            close_radius: 10.0,
            mode: PaintMode::Paint,
            history_depth: 20,
        }
    }
}
