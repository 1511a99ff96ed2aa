use crate::enums::View;
use crate::interpolator::Interpolator;
use crate::sync::{AspectScales, VoxelCoordinate};
use crate::window::WindowLevel;

use image::RgbaImage;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;
use rayon::prelude::*;

const MASK_TINT: [f32; 3] = [0.0, 255.0, 0.0];
const MASK_ALPHA: f32 = 0.6;

/// Scan volume held in memory, indexed `(z, y, x)`.
#[derive(Clone, Debug, Default)]
pub struct Volume {
    pub data: Array3<u16>,
    /// Voxel spacing `(dx, dy, dz)`.
    pub spacing: (f32, f32, f32),
    pub slope: f32,
    pub intercept: f32,
}

impl Volume {
    pub fn new(data: Array3<u16>, spacing: (f32, f32, f32)) -> Self {
        Self {
            data,
            spacing,
            slope: 1.0,
            intercept: 0.0,
        }
    }

    /// Set the rescale turning stored samples into HU.
    pub fn with_rescale(mut self, slope: f32, intercept: f32) -> Self {
        self.slope = slope;
        self.intercept = intercept;
        self
    }

    /// Synthetic chest-like phantom of `(depth, height, width)` voxels: air
    /// around an elliptic soft-tissue body holding two lungs and a spine.
    /// Samples are stored with intercept -1024.
    pub fn phantom(dims: (usize, usize, usize), spacing: (f32, f32, f32)) -> Self {
        let (_, height, width) = dims;
        let (cy, cx) = (height as f32 / 2.0, width as f32 / 2.0);
        let inside = |y: f32, x: f32, (oy, ox): (f32, f32), (ry, rx): (f32, f32)| {
            let (dy, dx) = ((y - oy) / ry, (x - ox) / rx);
            dy * dy + dx * dx <= 1.0
        };
        let data = Array3::from_shape_fn(dims, |(_, y, x)| {
            let (y, x) = (y as f32 + 0.5, x as f32 + 0.5);
            let hu: f32 = if !inside(y, x, (cy, cx), (cy * 0.8, cx * 0.9)) {
                -1000.0
            } else if inside(y, x, (cy * 1.4, cx), (cy * 0.15, cx * 0.15)) {
                700.0
            } else if inside(y, x, (cy * 0.9, cx * 0.6), (cy * 0.4, cx * 0.25))
                || inside(y, x, (cy * 0.9, cx * 1.4), (cy * 0.4, cx * 0.25))
            {
                -800.0
            } else {
                40.0
            };
            (hu + 1024.0) as u16
        });
        Volume::new(data, spacing).with_rescale(1.0, -1024.0)
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn scales(&self) -> AspectScales {
        let (dx, dy, dz) = self.spacing;
        let sane = |v: f32| {
            if v.is_finite() && v > 0.0 {
                v as f64
            } else {
                1.0
            }
        };
        AspectScales::from_spacing(sane(dx), sane(dy), sane(dz))
    }

    #[inline]
    pub fn to_hu(&self, value: u16) -> f32 {
        value as f32 * self.slope + self.intercept
    }

    pub fn contains(&self, voxel: &VoxelCoordinate) -> bool {
        let (z, y, x) = self.dim();
        (0..z as i64).contains(&voxel.z)
            && (0..y as i64).contains(&voxel.y)
            && (0..x as i64).contains(&voxel.x)
    }

    pub fn hu_at(&self, voxel: &VoxelCoordinate) -> Option<f32> {
        self.contains(voxel).then(|| {
            self.to_hu(self.data[[voxel.z as usize, voxel.y as usize, voxel.x as usize]])
        })
    }

    pub fn slice_count(&self, view: View) -> usize {
        let (z, y, x) = self.dim();
        match view {
            View::Axial => z,
            View::Coronal => y,
            View::Sagittal => x,
        }
    }

    pub fn is_valid_index(&self, index: usize, view: View) -> bool {
        index < self.slice_count(view)
    }

    /// Voxel plane shown by `view` at `index`, as (rows, columns):
    /// axial (y, x), coronal (z, x), sagittal (z, y).
    pub fn get_slice_from_axis(&self, index: usize, view: View) -> Option<ArrayView2<'_, u16>> {
        if !self.is_valid_index(index, view) {
            return None;
        }
        Some(match view {
            View::Axial => self.data.slice(s![index, .., ..]),
            View::Coronal => self.data.slice(s![.., index, ..]),
            View::Sagittal => self.data.slice(s![.., .., index]),
        })
    }

    /// Raster size (width, height) for `view`: one column per voxel column, rows
    /// stretched by the view's aspect scale.
    pub fn get_output_dimensions(&self, view: View) -> (u32, u32) {
        let (z, y, x) = self.dim();
        let (rows, cols) = match view {
            View::Axial => (y, x),
            View::Coronal => (z, x),
            View::Sagittal => (z, y),
        };
        (
            cols as u32,
            Interpolator::stretched_rows(rows, self.scales().get(view)),
        )
    }

    #[inline]
    fn window_to_u8(hu: f32, lower: f32, upper: f32) -> u8 {
        if upper <= lower {
            return 0;
        }
        ((hu.clamp(lower, upper) - lower) / (upper - lower) * 255.0) as u8
    }

    /// Render a windowed greyscale raster of one slice, with painted mask
    /// voxels blended on top.
    pub fn render_slice(
        &self,
        index: usize,
        view: View,
        window: WindowLevel,
        mask: Option<&Array3<u8>>,
    ) -> Option<RgbaImage> {
        let slice = self.get_slice_from_axis(index, view)?;
        let hu: Array2<f32> = slice.mapv(|v| self.to_hu(v));
        let mask_slice = mask.map(|mask| match view {
            View::Axial => mask.slice(s![index, .., ..]),
            View::Coronal => mask.slice(s![.., index, ..]),
            View::Sagittal => mask.slice(s![.., .., index]),
        });

        let (rows, cols) = hu.dim();
        if rows == 0 || cols == 0 {
            return None;
        }
        let (width, height) = self.get_output_dimensions(view);
        let scale = self.scales().get(view);
        let (lower, upper) = window.bounds();
        let (lower, upper) = (lower as f32, upper as f32);
        let hu = hu.view();

        let pixel_data: Vec<u8> = (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                let src_y = Interpolator::source_row(y, height, rows);
                let voxel_row = ((y as f64 / scale).round() as usize).min(rows - 1);
                let hu = &hu;
                let mask_slice = &mask_slice;
                (0..width).flat_map(move |x| {
                    let x = (x as usize).min(cols - 1);
                    let value = Interpolator::bilinear_interpolate(hu, src_y, x as f32);
                    let grey = Self::window_to_u8(value, lower, upper) as f32;
                    let painted = mask_slice
                        .as_ref()
                        .is_some_and(|m| m[[voxel_row, x]] > 0);
                    let rgb = if painted {
                        MASK_TINT.map(|t| grey * (1.0 - MASK_ALPHA) + t * MASK_ALPHA)
                    } else {
                        [grey; 3]
                    };
                    [rgb[0] as u8, rgb[1] as u8, rgb[2] as u8, 255]
                })
            })
            .collect();

        RgbaImage::from_raw(width, height, pixel_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Volume {
        let data = Array3::from_shape_fn((4, 6, 8), |(z, y, x)| (z * 100 + y * 10 + x) as u16);
        Volume::new(data, (1.0, 1.0, 2.0))
    }

    #[test]
    fn slices_follow_view_axes() {
        let volume = ramp();
        assert_eq!(volume.get_slice_from_axis(0, View::Axial).unwrap().dim(), (6, 8));
        assert_eq!(volume.get_slice_from_axis(0, View::Coronal).unwrap().dim(), (4, 8));
        assert_eq!(volume.get_slice_from_axis(0, View::Sagittal).unwrap().dim(), (4, 6));
        assert!(volume.get_slice_from_axis(8, View::Sagittal).is_none());
    }

    #[test]
    fn output_rows_are_stretched() {
        let volume = ramp();
        assert_eq!(volume.get_output_dimensions(View::Axial), (8, 6));
        assert_eq!(volume.get_output_dimensions(View::Coronal), (8, 8));
        assert_eq!(volume.get_output_dimensions(View::Sagittal), (6, 8));
    }

    #[test]
    fn window_maps_bounds_to_black_and_white() {
        assert_eq!(Volume::window_to_u8(-500.0, -160.0, 240.0), 0);
        assert_eq!(Volume::window_to_u8(240.0, -160.0, 240.0), 255);
        assert_eq!(Volume::window_to_u8(10.0, 10.0, 10.0), 0);
    }

    #[test]
    fn phantom_has_air_tissue_and_lung() {
        let volume = Volume::phantom((4, 64, 64), (1.0, 1.0, 2.5));
        assert_eq!(volume.hu_at(&VoxelCoordinate::new(0, 0, 0)), Some(-1000.0));
        assert_eq!(volume.hu_at(&VoxelCoordinate::new(32, 20, 1)), Some(40.0));
        assert_eq!(volume.hu_at(&VoxelCoordinate::new(19, 29, 1)), Some(-800.0));
        assert_eq!(volume.hu_at(&VoxelCoordinate::new(32, 45, 1)), Some(700.0));
    }

    #[test]
    fn rendered_raster_has_output_size() {
        let volume = ramp();
        let raster = volume
            .render_slice(1, View::Coronal, WindowLevel::new(1000.0, 500.0), None)
            .unwrap();
        assert_eq!(raster.dimensions(), (8, 8));
        let p = raster.get_pixel(3, 3).0;
        assert_eq!(p[0], p[1]);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn empty_plane_renders_nothing() {
        let volume = Volume::new(Array3::zeros((2, 0, 4)), (1.0, 1.0, 1.0));
        let window = WindowLevel::new(400.0, 40.0);
        assert!(volume.render_slice(0, View::Axial, window, None).is_none());
        assert!(volume.render_slice(0, View::Sagittal, window, None).is_none());
    }
}
