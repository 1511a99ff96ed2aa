use crate::config::{PresetConfig, WindowConfig};
use crate::enums::{View, WindowPreset};
use crate::services::ImageQuery;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowLevel {
    pub width: f64,
    pub center: f64,
}

impl WindowLevel {
    pub fn new(width: f64, center: f64) -> Self {
        Self { width, center }
    }

    /// HU bounds mapped to black and white.
    pub fn bounds(&self) -> (f64, f64) {
        (
            self.center - self.width / 2.0,
            self.center + self.width / 2.0,
        )
    }
}

/// Window/level and colormap shared by all three views. Any change here
/// invalidates every view's raster.
#[derive(Clone, Debug)]
pub struct WindowState {
    level: WindowLevel,
    colormap: Option<String>,
    presets: Vec<PresetConfig>,
}

impl WindowState {
    pub fn new(config: &WindowConfig) -> Self {
        Self {
            level: WindowLevel::new(config.width, config.center),
            colormap: config.colormap.clone(),
            presets: config.presets.clone(),
        }
    }

    pub fn level(&self) -> WindowLevel {
        self.level
    }

    pub fn colormap(&self) -> Option<&str> {
        self.colormap.as_deref()
    }

    /// Returns whether anything changed.
    pub fn set(&mut self, level: WindowLevel) -> bool {
        if level == self.level {
            return false;
        }
        self.level = level;
        true
    }

    pub fn set_colormap(&mut self, colormap: Option<String>) -> bool {
        if colormap == self.colormap {
            return false;
        }
        self.colormap = colormap;
        true
    }

    pub fn preset(&self, preset: WindowPreset) -> Option<WindowLevel> {
        self.presets
            .iter()
            .find(|p| p.preset == preset)
            .map(|p| WindowLevel::new(p.width, p.center))
    }

    /// The preset whose values match the current window, i.e. the highlighted button.
    pub fn active_preset(&self) -> Option<WindowPreset> {
        self.presets
            .iter()
            .find(|p| p.width == self.level.width && p.center == self.level.center)
            .map(|p| p.preset)
    }

    pub fn query(&self, view: View, layer: usize) -> ImageQuery {
        ImageQuery {
            view,
            layer,
            ww: self.level.width,
            wc: self.level.center,
            cmap: self.colormap.clone(),
        }
    }
}
