//! Piecewise-linear contrast curve over the HU domain and the 256-entry LUT
//! derived from it.
//!
//! The LUT is applied on the client side to an already windowed greyscale
//! raster, so changing the curve never needs a new slice from the image service.

use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const LUT_SIZE: usize = 256;
const OUTPUT_MAX: f64 = 255.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Input HU value.
    pub x: f64,
    /// Output intensity in `[0, 255]`.
    pub y: f64,
}

impl ControlPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Ordered control points. The first and last point are pinned to the domain
/// bounds; interior points may move freely and are re-sorted after each edit.
#[derive(Clone, Debug, PartialEq)]
pub struct ContrastCurve {
    points: Vec<ControlPoint>,
    min_hu: f64,
    max_hu: f64,
}

impl ContrastCurve {
    pub fn new(min_hu: f64, max_hu: f64) -> Self {
        let mut curve = Self {
            points: Vec::new(),
            min_hu,
            max_hu,
        };
        curve.reset();
        curve
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.min_hu, self.max_hu)
    }

    /// Restore the identity ramp: exactly the two endpoints at 0 and 255.
    pub fn reset(&mut self) {
        self.points = vec![
            ControlPoint::new(self.min_hu, 0.0),
            ControlPoint::new(self.max_hu, OUTPUT_MAX),
        ];
    }

    /// Change the HU domain. Endpoints follow the new bounds, interior points
    /// that fall outside it are dropped.
    pub fn set_domain(&mut self, min_hu: f64, max_hu: f64) {
        if !(min_hu < max_hu) {
            return;
        }
        self.min_hu = min_hu;
        self.max_hu = max_hu;
        let last = self.points.len() - 1;
        self.points[0].x = min_hu;
        self.points[last].x = max_hu;
        let interior: Vec<_> = self.points[1..last]
            .iter()
            .copied()
            .filter(|p| p.x > min_hu && p.x < max_hu)
            .collect();
        let (first, end) = (self.points[0], self.points[last]);
        self.points = std::iter::once(first)
            .chain(interior)
            .chain(std::iter::once(end))
            .collect();
    }

    /// Insert an interior point. Rejected when `x` is outside the open domain
    /// or already taken. Returns the index of the new point.
    pub fn add_point(&mut self, x: f64, y: f64) -> Option<usize> {
        if !(x > self.min_hu && x < self.max_hu) || self.has_x(x, None) {
            return None;
        }
        self.points.push(ControlPoint::new(x, y.clamp(0.0, OUTPUT_MAX)));
        self.sort();
        self.points.iter().position(|p| p.x == x)
    }

    /// Remove an interior point. Endpoints and unknown indices are a no-op.
    pub fn remove_point(&mut self, index: usize) -> bool {
        if self.is_endpoint(index) || index >= self.points.len() {
            return false;
        }
        self.points.remove(index);
        true
    }

    /// Move a point. `x` is ignored for endpoints, and for interior points it is
    /// kept inside the open domain and away from other points. Returns the
    /// point's index after re-sorting.
    pub fn move_point(&mut self, index: usize, x: Option<f64>, y: Option<f64>) -> Option<usize> {
        if index >= self.points.len() {
            return None;
        }
        if let Some(y) = y {
            self.points[index].y = y.clamp(0.0, OUTPUT_MAX);
        }
        let Some(x) = x else {
            return Some(index);
        };
        if self.is_endpoint(index) {
            return Some(index);
        }
        if x > self.min_hu && x < self.max_hu && !self.has_x(x, Some(index)) {
            self.points[index].x = x;
        }
        let moved = self.points[index];
        self.sort();
        self.points.iter().position(|p| *p == moved)
    }

    fn is_endpoint(&self, index: usize) -> bool {
        index == 0 || index + 1 == self.points.len()
    }

    fn has_x(&self, x: f64, skip: Option<usize>) -> bool {
        self.points
            .iter()
            .enumerate()
            .any(|(i, p)| Some(i) != skip && p.x == x)
    }

    fn sort(&mut self) {
        self.points.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    /// Output intensity of the curve at `hu`, clamped to the end points' `y`
    /// outside the covered range.
    pub fn evaluate(&self, hu: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if hu <= first.x {
            return first.y;
        }
        if hu >= last.x {
            return last.y;
        }
        self.points
            .windows(2)
            .find(|pair| hu >= pair[0].x && hu <= pair[1].x)
            .map(|pair| {
                let (a, b) = (pair[0], pair[1]);
                let span = b.x - a.x;
                if span <= 0.0 {
                    return a.y;
                }
                let t = (hu - a.x) / span;
                a.y + t * (b.y - a.y)
            })
            .unwrap_or(last.y)
    }

    pub fn compute_lut(&self) -> Lut {
        let mut table = [0u8; LUT_SIZE];
        let span = self.max_hu - self.min_hu;
        for (i, slot) in table.iter_mut().enumerate() {
            let hu = self.min_hu + (i as f64 / OUTPUT_MAX) * span;
            let normalized = (self.evaluate(hu) / OUTPUT_MAX).clamp(0.0, 1.0);
            *slot = (normalized * OUTPUT_MAX).round() as u8;
        }
        Lut(table)
    }
}

/// 256-entry greyscale lookup table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lut(pub [u8; LUT_SIZE]);

impl Default for Lut {
    fn default() -> Self {
        Self::identity()
    }
}

impl Lut {
    pub fn identity() -> Self {
        let mut table = [0u8; LUT_SIZE];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = i as u8;
        }
        Lut(table)
    }

    #[inline]
    pub fn get(&self, value: u8) -> u8 {
        self.0[value as usize]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Re-derive `target` from `original`: RGB becomes `LUT[R]`, alpha is kept.
    /// `original` is never written, so the pass can be repeated for every curve
    /// edit without fetching the raster again.
    pub fn apply_into(&self, original: &RgbaImage, target: &mut RgbaImage) {
        if target.dimensions() != original.dimensions() {
            *target = RgbaImage::new(original.width(), original.height());
        }
        target
            .par_chunks_mut(4)
            .zip(original.par_chunks(4))
            .for_each(|(dst, src)| {
                let v = self.get(src[0]);
                dst[0] = v;
                dst[1] = v;
                dst[2] = v;
                dst[3] = src[3];
            });
    }

    pub fn apply(&self, original: &RgbaImage) -> RgbaImage {
        let mut target = RgbaImage::new(original.width(), original.height());
        self.apply_into(original, &mut target);
        target
    }
}
