#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use mpr_viewer::enums::View;
use mpr_viewer::error::ServiceError;
use mpr_viewer::geometry::{Point, Rect};
use mpr_viewer::histogram::HistogramData;
use mpr_viewer::mapper::ViewLayout;
use mpr_viewer::services::{
    FillRequest, HistoryState, ImageQuery, PaintRequest, StatusResponse, ViewerBackend,
    VoxelQuery, VoxelResponse,
};
use mpr_viewer::sync::SliceIndices;
use mpr_viewer::volume::Volume;
use mpr_viewer::{MemoryBackend, Viewer, ViewerConfig};

/// Phantom used by every viewer test: 20 slices of 64x64 voxels, slices twice
/// as thick as the in-plane spacing.
pub const DIMS: (usize, usize, usize) = (20, 64, 64);
pub const SPACING: (f32, f32, f32) = (1.0, 1.0, 2.0);

pub fn phantom() -> Volume {
    Volume::phantom(DIMS, SPACING)
}

/// [`MemoryBackend`] that records raster fetches and can be told to reject
/// fetches or mask mutations.
pub struct RecordingBackend {
    pub inner: MemoryBackend,
    fetches: RefCell<Vec<ImageQuery>>,
    pub fail_fetch: Cell<bool>,
    pub fail_fill: Cell<bool>,
    pub fail_undo: Cell<bool>,
}

impl RecordingBackend {
    pub fn new(inner: MemoryBackend) -> Self {
        Self {
            inner,
            fetches: RefCell::new(Vec::new()),
            fail_fetch: Cell::new(false),
            fail_fill: Cell::new(false),
            fail_undo: Cell::new(false),
        }
    }

    pub fn fetches(&self) -> Vec<ImageQuery> {
        self.fetches.borrow().clone()
    }

    pub fn fetches_for(&self, view: View) -> Vec<ImageQuery> {
        self.fetches
            .borrow()
            .iter()
            .filter(|q| q.view == view)
            .cloned()
            .collect()
    }

    pub fn clear_fetches(&self) {
        self.fetches.borrow_mut().clear();
    }
}

impl ViewerBackend for RecordingBackend {
    async fn fetch_slice(&self, query: &ImageQuery) -> Result<Vec<u8>, ServiceError> {
        self.fetches.borrow_mut().push(query.clone());
        if self.fail_fetch.get() {
            return Err(ServiceError::Transport {
                endpoint: query.path(),
                message: "image service down".to_string(),
            });
        }
        self.inner.fetch_slice(query).await
    }

    async fn lookup_voxel(&self, query: &VoxelQuery) -> Result<VoxelResponse, ServiceError> {
        self.inner.lookup_voxel(query).await
    }

    async fn histogram(&self) -> Result<HistogramData, ServiceError> {
        self.inner.histogram().await
    }

    async fn paint_voxel(&self, request: &PaintRequest) -> Result<StatusResponse, ServiceError> {
        self.inner.paint_voxel(request).await
    }

    async fn fill_polygon(&self, request: &FillRequest) -> Result<StatusResponse, ServiceError> {
        if self.fail_fill.get() {
            return Ok(StatusResponse::error("Mask service unavailable"));
        }
        self.inner.fill_polygon(request).await
    }

    async fn undo_segmentation(&self) -> Result<StatusResponse, ServiceError> {
        if self.fail_undo.get() {
            return Err(ServiceError::Transport {
                endpoint: "/undo_segmentation".to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.inner.undo_segmentation().await
    }

    async fn redo_segmentation(&self) -> Result<StatusResponse, ServiceError> {
        self.inner.redo_segmentation().await
    }

    async fn clear_segmentation(&self) -> Result<StatusResponse, ServiceError> {
        self.inner.clear_segmentation().await
    }

    async fn export_segmentation(&self) -> Result<Vec<u8>, ServiceError> {
        self.inner.export_segmentation().await
    }

    async fn history_state(&self) -> Result<HistoryState, ServiceError> {
        self.inner.history_state().await
    }
}

/// Viewer over the phantom with every view loaded and laid out at native size
/// with its wrapper at the client origin. The fetch log starts empty.
pub async fn viewer() -> Viewer<RecordingBackend> {
    viewer_with(ViewerConfig::default()).await
}

pub async fn viewer_with(config: ViewerConfig) -> Viewer<RecordingBackend> {
    viewer_for(phantom(), config).await
}

pub async fn viewer_for(volume: Volume, config: ViewerConfig) -> Viewer<RecordingBackend> {
    let indices = SliceIndices::for_dims(volume.dim());
    let scales = volume.scales();
    let backend = RecordingBackend::new(MemoryBackend::new(volume, config.segmentation.history_depth));
    let mut viewer = Viewer::new(backend, config, indices).with_scales(scales);
    viewer.load_all().await;
    for view in View::ALL {
        let (width, height) = viewer
            .cache()
            .dimensions(view)
            .expect("raster loaded for every view");
        let wrapper = Rect::new(0.0, 0.0, width as f64, height as f64);
        viewer.set_layout(view, ViewLayout::native(wrapper, (width, height)));
    }
    viewer.backend().clear_fetches();
    viewer
}

pub fn at(x: f64, y: f64) -> Point {
    Point::new(x, y)
}
