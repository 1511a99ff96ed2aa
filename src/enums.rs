use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

/// One of the three orthogonal planes. The set is fixed for the lifetime of a viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Axial,
    Coronal,
    #[serde(rename = "sagital", alias = "sagittal")]
    Sagittal,
}

impl View {
    pub const ALL: [View; 3] = [View::Axial, View::Coronal, View::Sagittal];

    /// Stable position of the view in per-view arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            View::Axial => 0,
            View::Coronal => 1,
            View::Sagittal => 2,
        }
    }

    /// Name used in service paths and query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            View::Axial => "axial",
            View::Coronal => "coronal",
            View::Sagittal => "sagital",
        }
    }

    /// The two views other than `self`, in `ALL` order.
    pub fn others(self) -> [View; 2] {
        match self {
            View::Axial => [View::Coronal, View::Sagittal],
            View::Coronal => [View::Axial, View::Sagittal],
            View::Sagittal => [View::Axial, View::Coronal],
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "axial" => Ok(View::Axial),
            "coronal" => Ok(View::Coronal),
            "sagital" | "sagittal" => Ok(View::Sagittal),
            other => Err(ViewerError::UnknownView(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaintMode {
    #[default]
    Paint,
    Erase,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationTool {
    #[default]
    Brush,
    Polygon,
}

/// Pointer-interpretation mode. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToolMode {
    #[default]
    None,
    Inspector,
    Segmentation(SegmentationTool),
    HuPicker,
}

impl ToolMode {
    /// Whether a primary-button drag belongs to the tool instead of panning.
    pub fn claims_drag(self) -> bool {
        matches!(self, ToolMode::Inspector | ToolMode::Segmentation(_))
    }

    pub fn kind(self) -> ToolKind {
        match self {
            ToolMode::None => ToolKind::None,
            ToolMode::Inspector => ToolKind::Inspector,
            ToolMode::Segmentation(_) => ToolKind::Segmentation,
            ToolMode::HuPicker => ToolKind::HuPicker,
        }
    }
}

/// `ToolMode` without the segmentation sub-tool, used for toggle buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    None,
    Inspector,
    Segmentation,
    HuPicker,
}

/// Panels that open independently of the active tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Panel {
    WindowLevel,
    Contrast,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorStyle {
    #[default]
    Grab,
    Grabbing,
    Crosshair,
    Pointer,
}

impl CursorStyle {
    pub fn as_css(self) -> &'static str {
        match self {
            CursorStyle::Grab => "grab",
            CursorStyle::Grabbing => "grabbing",
            CursorStyle::Crosshair => "crosshair",
            CursorStyle::Pointer => "pointer",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    Backspace,
    Enter,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum WindowPreset {
    Lung,
    Bone,
    SoftTissue,
}

impl WindowPreset {
    pub const ALL: [WindowPreset; 3] = [
        WindowPreset::Lung,
        WindowPreset::Bone,
        WindowPreset::SoftTissue,
    ];
}
