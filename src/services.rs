//! Contracts of the external collaborators: slice rendering, voxel lookup,
//! histogram and the segmentation mask service.
//!
//! The viewer only talks to them through [`ViewerBackend`]. Payload field names
//! match the JSON the services exchange.

use serde::{Deserialize, Serialize};

use crate::enums::{PaintMode, View};
use crate::error::ServiceError;
use crate::histogram::HistogramData;
use crate::sync::{AspectScales, VoxelCoordinate};

/// Header carrying the page's anti-forgery token on every mutating request.
pub const CSRF_HEADER: &str = "X-CSRFToken";

pub mod endpoints {
    pub const IMAGE: &str = "/image";
    pub const HU_VALUE: &str = "/hu_value";
    pub const HISTOGRAM: &str = "/get_histogram";
    pub const PAINT_VOXEL: &str = "/paint_voxel";
    pub const FILL_POLYGON: &str = "/fill_polygon";
    pub const UNDO: &str = "/undo_segmentation";
    pub const REDO: &str = "/redo_segmentation";
    pub const CLEAR: &str = "/clear_segmentation";
    pub const EXPORT: &str = "/export_segmentation";
    pub const HISTORY_STATE: &str = "/get_history_state";
}

/// Parameters a slice raster is rendered with. Two queries are equal exactly
/// when they describe the same raster.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageQuery {
    pub view: View,
    pub layer: usize,
    pub ww: f64,
    pub wc: f64,
    pub cmap: Option<String>,
}

impl ImageQuery {
    pub fn path(&self) -> String {
        let mut path = format!(
            "{}/{}/{}?ww={}&wc={}",
            endpoints::IMAGE,
            self.view,
            self.layer,
            self.ww,
            self.wc
        );
        if let Some(cmap) = &self.cmap {
            path.push_str("&cmap=");
            path.push_str(cmap);
        }
        path
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelQuery {
    pub view: View,
    pub x: i64,
    pub y: i64,
    pub index: usize,
}

impl VoxelQuery {
    pub fn path(&self) -> String {
        format!(
            "{}?view={}&x={}&y={}&index={}",
            endpoints::HU_VALUE,
            self.view,
            self.x,
            self.y,
            self.index
        )
    }
}

/// Raw voxel lookup payload. Either `error` or the three data fields are set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VoxelResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voxel: Option<VoxelCoordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scales: Option<AspectScales>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelLookup {
    pub voxel: VoxelCoordinate,
    pub hu: f64,
    pub scales: AspectScales,
}

impl VoxelResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn into_lookup(self) -> Result<VoxelLookup, ServiceError> {
        if let Some(message) = self.error {
            return Err(ServiceError::status(endpoints::HU_VALUE, message));
        }
        match (self.voxel, self.hu, self.scales) {
            (Some(voxel), Some(hu), Some(scales)) => Ok(VoxelLookup { voxel, hu, scales }),
            _ => Err(ServiceError::Decode {
                endpoint: endpoints::HU_VALUE.to_string(),
                message: "voxel, hu and scales are required".to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaintRequest {
    pub view: View,
    #[serde(rename = "xPix")]
    pub x_pix: i64,
    #[serde(rename = "yPix")]
    pub y_pix: i64,
    pub layer: usize,
    pub brush_size: u32,
    pub mode: PaintMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelVertex {
    #[serde(rename = "xPix")]
    pub x_pix: i64,
    #[serde(rename = "yPix")]
    pub y_pix: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillRequest {
    pub view: View,
    pub layer: usize,
    pub vertices: Vec<PixelVertex>,
    pub mode: PaintMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
        }
    }

    pub fn into_result(self, endpoint: &str) -> Result<(), ServiceError> {
        match self.status {
            Status::Success => Ok(()),
            Status::Error => Err(ServiceError::status(
                endpoint,
                self.message.unwrap_or_else(|| "request failed".to_string()),
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    pub can_undo: bool,
    pub can_redo: bool,
    #[serde(default)]
    pub history_length: usize,
}

/// Everything the viewer needs from the outside world. Implementations decide
/// transport; the viewer is single-threaded so futures need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait ViewerBackend {
    /// Encoded raster (PNG or any format `image` can decode).
    async fn fetch_slice(&self, query: &ImageQuery) -> Result<Vec<u8>, ServiceError>;

    async fn lookup_voxel(&self, query: &VoxelQuery) -> Result<VoxelResponse, ServiceError>;

    async fn histogram(&self) -> Result<HistogramData, ServiceError>;

    async fn paint_voxel(&self, request: &PaintRequest) -> Result<StatusResponse, ServiceError>;

    async fn fill_polygon(&self, request: &FillRequest) -> Result<StatusResponse, ServiceError>;

    async fn undo_segmentation(&self) -> Result<StatusResponse, ServiceError>;

    async fn redo_segmentation(&self) -> Result<StatusResponse, ServiceError>;

    async fn clear_segmentation(&self) -> Result<StatusResponse, ServiceError>;

    async fn export_segmentation(&self) -> Result<Vec<u8>, ServiceError>;

    async fn history_state(&self) -> Result<HistoryState, ServiceError>;
}
