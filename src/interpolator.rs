use ndarray::ArrayView2;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Raster height of a slice with `rows` voxel rows stretched by `scale`.
    pub(crate) fn stretched_rows(rows: usize, scale: f64) -> u32 {
        ((rows as f64 * scale).round() as u32).max(1)
    }

    /// Source row sampled by output row `y` of a `height`-row raster, using
    /// pixel centres on both grids.
    #[inline]
    pub(crate) fn source_row(y: u32, height: u32, rows: usize) -> f32 {
        let norm_y = (y as f32 + 0.5) / height as f32;
        (norm_y * rows as f32 - 0.5).clamp(0.0, (rows - 1) as f32)
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(slice: &ArrayView2<f32>, y: f32, x: f32) -> f32 {
        let (height, width) = slice.dim();

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f32;
        let dx = x - x0 as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;

        let v00 = slice[[y0, x0]];
        let v01 = slice[[y0, x1]];
        let v10 = slice[[y1, x0]];
        let v11 = slice[[y1, x1]];

        let v0 = v00.mul_add(one_minus_dx, v01 * dx);
        let v1 = v10.mul_add(one_minus_dx, v11 * dx);

        v0.mul_add(one_minus_dy, v1 * dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn bilinear_midpoint_is_mean() {
        let slice = array![[0.0f32, 10.0], [20.0, 30.0]];
        let v = Interpolator::bilinear_interpolate(&slice.view(), 0.5, 0.5);
        assert!((v - 15.0).abs() < 1e-5);
    }

    #[test]
    fn stretched_rows_round() {
        assert_eq!(Interpolator::stretched_rows(40, 2.5), 100);
        assert_eq!(Interpolator::stretched_rows(3, 0.1), 1);
    }

    #[test]
    fn source_row_stays_in_range() {
        for y in 0..100 {
            let row = Interpolator::source_row(y, 100, 40);
            assert!((0.0..=39.0).contains(&row));
        }
    }
}
