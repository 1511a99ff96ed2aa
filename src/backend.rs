//! In-process implementation of [`ViewerBackend`] over a [`Volume`].
//!
//! It renders slices, answers voxel lookups and keeps the segmentation mask
//! with a bounded undo/redo history, following the same pixel/voxel
//! conventions the viewer uses for its crosshairs.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Cursor, Write};

use image::ImageFormat;
use ndarray::Array3;
use ndarray::parallel::prelude::*;
use tracing::debug;

use crate::enums::{PaintMode, View};
use crate::error::ServiceError;
use crate::histogram::HistogramData;
use crate::segmentation::MIN_POLYGON_VERTICES;
use crate::services::{
    FillRequest, HistoryState, ImageQuery, PaintRequest, StatusResponse, ViewerBackend,
    VoxelQuery, VoxelResponse, endpoints,
};
use crate::sync::{VoxelCoordinate, pixel_to_voxel};
use crate::volume::Volume;
use crate::window::WindowLevel;

const HISTOGRAM_BINS: usize = 256;
const HISTOGRAM_RANGE: (f32, f32) = (-1024.0, 3071.0);

#[derive(Debug)]
struct MaskState {
    mask: Array3<u8>,
    undo: VecDeque<Array3<u8>>,
    redo: Vec<Array3<u8>>,
}

impl MaskState {
    /// Snapshot before a mutation. A new mutation invalidates redo.
    fn push(&mut self, depth: usize) {
        if depth == 0 {
            return;
        }
        self.undo.push_back(self.mask.clone());
        while self.undo.len() > depth {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    fn history(&self) -> HistoryState {
        HistoryState {
            can_undo: !self.undo.is_empty(),
            can_redo: !self.redo.is_empty(),
            history_length: self.undo.len() + self.redo.len(),
        }
    }
}

pub struct MemoryBackend {
    volume: Volume,
    state: RefCell<MaskState>,
    history_depth: usize,
}

impl MemoryBackend {
    pub fn new(volume: Volume, history_depth: usize) -> Self {
        let mask = Array3::zeros(volume.dim());
        Self {
            volume,
            state: RefCell::new(MaskState {
                mask,
                undo: VecDeque::new(),
                redo: Vec::new(),
            }),
            history_depth,
        }
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Number of painted voxels.
    pub fn painted_voxels(&self) -> usize {
        self.state.borrow().mask.iter().filter(|&&v| v > 0).count()
    }

    pub fn mask_value(&self, voxel: &VoxelCoordinate) -> Option<u8> {
        self.volume.contains(voxel).then(|| {
            self.state.borrow().mask[[voxel.z as usize, voxel.y as usize, voxel.x as usize]]
        })
    }

    fn paint_value(mode: PaintMode) -> u8 {
        match mode {
            PaintMode::Paint => 255,
            PaintMode::Erase => 0,
        }
    }

    /// (rows, columns) of a view's voxel plane.
    fn plane_shape(&self, view: View) -> (usize, usize) {
        let (z, y, x) = self.volume.dim();
        match view {
            View::Axial => (y, x),
            View::Coronal => (z, x),
            View::Sagittal => (z, y),
        }
    }

    /// Voxel for a (row, column) cell of the plane at `layer`.
    fn plane_voxel(view: View, layer: usize, row: usize, col: usize) -> [usize; 3] {
        match view {
            View::Axial => [layer, row, col],
            View::Coronal => [row, layer, col],
            View::Sagittal => [row, col, layer],
        }
    }

    fn encode_png(raster: &image::RgbaImage) -> Result<Vec<u8>, ServiceError> {
        let mut bytes = Cursor::new(Vec::new());
        raster
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(|err| ServiceError::status(endpoints::IMAGE, err.to_string()))?;
        Ok(bytes.into_inner())
    }

    fn encode_nrrd(&self, mask: &Array3<u8>) -> Result<Vec<u8>, ServiceError> {
        let (z, y, x) = mask.dim();
        let (dx, dy, dz) = self.volume.spacing;
        let mut out = Vec::with_capacity(mask.len() + 256);
        let header = format!(
            "NRRD0004\n\
             type: uint8\n\
             dimension: 3\n\
             space: left-posterior-superior\n\
             sizes: {x} {y} {z}\n\
             space directions: ({dx},0,0) (0,{dy},0) (0,0,{dz})\n\
             kinds: domain domain domain\n\
             encoding: raw\n\n"
        );
        out.write_all(header.as_bytes())
            .map_err(|err| ServiceError::status(endpoints::EXPORT, err.to_string()))?;
        out.extend(mask.iter().copied());
        Ok(out)
    }
}

/// Cells of a `rows x cols` grid whose centres lie inside the polygon
/// (even-odd rule). Vertices are given as (row, column).
fn polygon_cells(vertices: &[(f64, f64)], rows: usize, cols: usize) -> Vec<(usize, usize)> {
    if vertices.len() < MIN_POLYGON_VERTICES || rows == 0 || cols == 0 {
        return Vec::new();
    }
    let (mut r_min, mut r_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut c_min, mut c_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(r, c) in vertices {
        r_min = r_min.min(r);
        r_max = r_max.max(r);
        c_min = c_min.min(c);
        c_max = c_max.max(c);
    }
    let r_lo = r_min.ceil().max(0.0) as usize;
    let c_lo = c_min.ceil().max(0.0) as usize;
    if r_max < 0.0 || c_max < 0.0 {
        return Vec::new();
    }
    let r_hi = (r_max.floor() as usize).min(rows - 1);
    let c_hi = (c_max.floor() as usize).min(cols - 1);

    let inside = |r: f64, c: f64| {
        let mut inside = false;
        let mut j = vertices.len() - 1;
        for i in 0..vertices.len() {
            let (ri, ci) = vertices[i];
            let (rj, cj) = vertices[j];
            if (ri > r) != (rj > r) && c < (cj - ci) * (r - ri) / (rj - ri) + ci {
                inside = !inside;
            }
            j = i;
        }
        inside
    };

    let mut cells = Vec::new();
    for r in r_lo..=r_hi {
        for c in c_lo..=c_hi {
            if inside(r as f64, c as f64) {
                cells.push((r, c));
            }
        }
    }
    cells
}

impl ViewerBackend for MemoryBackend {
    async fn fetch_slice(&self, query: &ImageQuery) -> Result<Vec<u8>, ServiceError> {
        let state = self.state.borrow();
        let raster = self
            .volume
            .render_slice(
                query.layer,
                query.view,
                WindowLevel::new(query.ww, query.wc),
                Some(&state.mask),
            )
            .ok_or_else(|| ServiceError::status(endpoints::IMAGE, "Invalid view or index"))?;
        debug!(view = %query.view, layer = query.layer, ww = query.ww, wc = query.wc, "rendered slice");
        Self::encode_png(&raster)
    }

    async fn lookup_voxel(&self, query: &VoxelQuery) -> Result<VoxelResponse, ServiceError> {
        let scales = self.volume.scales();
        let voxel = pixel_to_voxel(query.view, (query.x, query.y), query.index, &scales);
        Ok(match self.volume.hu_at(&voxel) {
            Some(hu) => VoxelResponse {
                error: None,
                voxel: Some(voxel),
                hu: Some(hu.trunc() as f64),
                scales: Some(scales),
            },
            None => VoxelResponse::error("Coordinates out of range"),
        })
    }

    async fn histogram(&self) -> Result<HistogramData, ServiceError> {
        let (min_hu, max_hu) = HISTOGRAM_RANGE;
        let width = (max_hu - min_hu) / HISTOGRAM_BINS as f32;
        let volume = &self.volume;
        let counts = volume
            .data
            .par_iter()
            .fold(
                || vec![0u64; HISTOGRAM_BINS],
                |mut counts, &value| {
                    let hu = volume.to_hu(value);
                    if (min_hu..=max_hu).contains(&hu) {
                        let bin = (((hu - min_hu) / width) as usize).min(HISTOGRAM_BINS - 1);
                        counts[bin] += 1;
                    }
                    counts
                },
            )
            .reduce(
                || vec![0u64; HISTOGRAM_BINS],
                |mut a, b| {
                    a.iter_mut().zip(b).for_each(|(a, b)| *a += b);
                    a
                },
            );
        let bin_edges = (0..=HISTOGRAM_BINS)
            .map(|i| (min_hu + i as f32 * width) as f64)
            .collect();
        Ok(HistogramData::Intensity { counts, bin_edges })
    }

    async fn paint_voxel(&self, request: &PaintRequest) -> Result<StatusResponse, ServiceError> {
        let scales = self.volume.scales();
        let center = pixel_to_voxel(
            request.view,
            (request.x_pix, request.y_pix),
            request.layer,
            &scales,
        );
        if !self.volume.contains(&center) {
            return Ok(StatusResponse::error("Coordinates out of range"));
        }
        let (rows, cols) = self.plane_shape(request.view);
        let (row, col) = match request.view {
            View::Axial => (center.y, center.x),
            View::Coronal => (center.z, center.x),
            View::Sagittal => (center.z, center.y),
        };
        let value = Self::paint_value(request.mode);
        let radius = request.brush_size as i64;

        let mut state = self.state.borrow_mut();
        state.push(self.history_depth);
        for r in (row - radius)..=(row + radius) {
            for c in (col - radius)..=(col + radius) {
                if (0..rows as i64).contains(&r) && (0..cols as i64).contains(&c) {
                    let index =
                        Self::plane_voxel(request.view, request.layer, r as usize, c as usize);
                    state.mask[index] = value;
                }
            }
        }
        debug!(view = %request.view, layer = request.layer, ?center, "painted brush");
        Ok(StatusResponse::success())
    }

    async fn fill_polygon(&self, request: &FillRequest) -> Result<StatusResponse, ServiceError> {
        if request.vertices.len() < MIN_POLYGON_VERTICES {
            return Ok(StatusResponse::error("At least 3 vertices required"));
        }
        if !self.volume.is_valid_index(request.layer, request.view) {
            return Ok(StatusResponse::error("Layer out of range"));
        }
        let scale = self.volume.scales().get(request.view);
        let vertices: Vec<(f64, f64)> = request
            .vertices
            .iter()
            .map(|v| ((v.y_pix as f64 / scale).round(), v.x_pix as f64))
            .collect();
        let (rows, cols) = self.plane_shape(request.view);
        let cells = polygon_cells(&vertices, rows, cols);
        let value = Self::paint_value(request.mode);

        let mut state = self.state.borrow_mut();
        state.push(self.history_depth);
        for &(r, c) in &cells {
            let index = Self::plane_voxel(request.view, request.layer, r, c);
            state.mask[index] = value;
        }
        debug!(view = %request.view, layer = request.layer, cells = cells.len(), "filled polygon");
        Ok(StatusResponse::success())
    }

    async fn undo_segmentation(&self) -> Result<StatusResponse, ServiceError> {
        let mut state = self.state.borrow_mut();
        let Some(previous) = state.undo.pop_back() else {
            return Ok(StatusResponse::error("Nothing to undo"));
        };
        let current = std::mem::replace(&mut state.mask, previous);
        state.redo.push(current);
        Ok(StatusResponse::success())
    }

    async fn redo_segmentation(&self) -> Result<StatusResponse, ServiceError> {
        let mut state = self.state.borrow_mut();
        let Some(next) = state.redo.pop() else {
            return Ok(StatusResponse::error("Nothing to redo"));
        };
        let current = std::mem::replace(&mut state.mask, next);
        state.undo.push_back(current);
        Ok(StatusResponse::success())
    }

    async fn clear_segmentation(&self) -> Result<StatusResponse, ServiceError> {
        let mut state = self.state.borrow_mut();
        state.push(self.history_depth);
        state.mask.fill(0);
        Ok(StatusResponse::success())
    }

    async fn export_segmentation(&self) -> Result<Vec<u8>, ServiceError> {
        let state = self.state.borrow();
        if state.mask.iter().all(|&v| v == 0) {
            return Err(ServiceError::status(
                endpoints::EXPORT,
                "No segmentation to export",
            ));
        }
        self.encode_nrrd(&state.mask)
    }

    async fn history_state(&self) -> Result<HistoryState, ServiceError> {
        Ok(self.state.borrow().history())
    }
}
