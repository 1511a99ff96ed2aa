use serde::{Deserialize, Serialize};

use crate::enums::View;
use crate::geometry::Point;

/// Index of a voxel in the volume, shared by all three views.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelCoordinate {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl VoxelCoordinate {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

/// Per-view factor stretching the out-of-plane voxel axis onto raster rows.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AspectScales {
    pub axial: f64,
    pub coronal: f64,
    pub sagittal: f64,
}

impl Default for AspectScales {
    fn default() -> Self {
        Self {
            axial: 1.0,
            coronal: 1.0,
            sagittal: 1.0,
        }
    }
}

impl AspectScales {
    const MIN: f64 = 1e-8;

    /// Scales for voxel spacing `(dx, dy, dz)`.
    pub fn from_spacing(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            axial: (dy / dx).max(Self::MIN),
            coronal: (dz / dx).max(Self::MIN),
            sagittal: (dz / dy).max(Self::MIN),
        }
    }

    pub fn get(&self, view: View) -> f64 {
        match view {
            View::Axial => self.axial,
            View::Coronal => self.coronal,
            View::Sagittal => self.sagittal,
        }
    }
}

/// Voxel component a view slices along.
pub fn depth_of(view: View, voxel: &VoxelCoordinate) -> i64 {
    match view {
        View::Axial => voxel.z,
        View::Coronal => voxel.y,
        View::Sagittal => voxel.x,
    }
}

/// Voxel components shown as (column, row) in a view, before aspect correction.
pub fn in_plane(view: View, voxel: &VoxelCoordinate) -> (i64, i64) {
    match view {
        View::Axial => (voxel.x, voxel.y),
        View::Coronal => (voxel.x, voxel.z),
        View::Sagittal => (voxel.y, voxel.z),
    }
}

/// Pixel position of `voxel` in `view`: the column maps directly, the row is
/// stretched by the view's aspect scale and rounded to the nearest pixel.
pub fn voxel_to_pixel(view: View, voxel: &VoxelCoordinate, scales: &AspectScales) -> Point {
    let (column, row) = in_plane(view, voxel);
    Point::new(
        column as f64,
        (row as f64 * scales.get(view)).round(),
    )
}

/// Inverse of [`voxel_to_pixel`] for a pixel on slice `layer`.
pub fn pixel_to_voxel(
    view: View,
    pixel: (i64, i64),
    layer: usize,
    scales: &AspectScales,
) -> VoxelCoordinate {
    let (column, row) = pixel;
    let row = (row as f64 / scales.get(view).max(AspectScales::MIN)).round() as i64;
    let layer = layer as i64;
    match view {
        View::Axial => VoxelCoordinate::new(column, row, layer),
        View::Coronal => VoxelCoordinate::new(column, layer, row),
        View::Sagittal => VoxelCoordinate::new(layer, column, row),
    }
}

/// Current slice index and slider maximum of every view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SliceIndices {
    current: [usize; 3],
    max: [usize; 3],
}

impl SliceIndices {
    pub fn new(max: [usize; 3]) -> Self {
        Self {
            current: [0; 3],
            max,
        }
    }

    /// Slider maxima for a volume of `(depth, height, width)` voxels.
    pub fn for_dims(dims: (usize, usize, usize)) -> Self {
        let (z, y, x) = dims;
        Self::new([
            z.saturating_sub(1),
            y.saturating_sub(1),
            x.saturating_sub(1),
        ])
    }

    pub fn get(&self, view: View) -> usize {
        self.current[view.index()]
    }

    pub fn max(&self, view: View) -> usize {
        self.max[view.index()]
    }

    /// Clamp and store. Returns the stored value when it differs from the old one.
    pub fn set(&mut self, view: View, value: i64) -> Option<usize> {
        let clamped = value.clamp(0, self.max(view) as i64) as usize;
        let slot = &mut self.current[view.index()];
        if *slot == clamped {
            return None;
        }
        *slot = clamped;
        Some(clamped)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyncOutcome {
    /// Views whose slice index changed, with the new index.
    pub slice_updates: Vec<(View, usize)>,
    /// Crosshair pixel position for every view, source included.
    pub crosshairs: [(View, Point); 3],
}

pub struct CrossViewSync;

impl CrossViewSync {
    /// Move the other two views onto the planes through `voxel` and compute
    /// crosshair positions for all three views.
    pub fn sync(
        source: View,
        voxel: &VoxelCoordinate,
        indices: &mut SliceIndices,
        scales: &AspectScales,
    ) -> SyncOutcome {
        let slice_updates = source
            .others()
            .into_iter()
            .filter_map(|target| {
                indices
                    .set(target, depth_of(target, voxel))
                    .map(|index| (target, index))
            })
            .collect();

        let crosshairs = View::ALL.map(|view| (view, voxel_to_pixel(view, voxel, scales)));

        SyncOutcome {
            slice_updates,
            crosshairs,
        }
    }
}
