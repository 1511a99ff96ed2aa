use crate::geometry::{Point, Rect, Size};
use crate::transform::TransformState;

/// Geometry of one view as laid out by the page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewLayout {
    /// Client-space bounding rectangle of the wrapper element. The wrapper is not
    /// transformed, so it stays a reliable reference at any zoom.
    pub wrapper: Rect,
    /// CSS size of the canvas before the pan/zoom transform.
    pub canvas: Size,
    /// Internal drawing-surface size, equal to the raster's natural size.
    pub internal: (u32, u32),
}

impl ViewLayout {
    /// Layout where the canvas is displayed at its native size.
    pub fn native(wrapper: Rect, internal: (u32, u32)) -> Self {
        Self {
            wrapper,
            canvas: Size::new(internal.0 as f64, internal.1 as f64),
            internal,
        }
    }

    fn ratio(&self) -> Option<(f64, f64)> {
        if self.canvas.is_empty() || self.internal.0 == 0 || self.internal.1 == 0 {
            return None;
        }
        Some((
            self.internal.0 as f64 / self.canvas.width,
            self.internal.1 as f64 / self.canvas.height,
        ))
    }
}

pub struct CoordinateMapper;

impl CoordinateMapper {
    /// Map a client-space pointer position to internal pixel space.
    ///
    /// Returns `None` when the pointer misses the image, or when the layout is
    /// not known yet. Neither case is an error for the caller.
    pub fn pointer_to_pixel(
        transform: &TransformState,
        layout: &ViewLayout,
        client: Point,
    ) -> Option<Point> {
        let (rx, ry) = layout.ratio()?;
        let local = transform.invert(client - layout.wrapper.origin());
        let pixel = Point::new(local.x * rx, local.y * ry);
        let (width, height) = layout.internal;
        let inside = pixel.x >= 0.0
            && pixel.y >= 0.0
            && pixel.x < width as f64
            && pixel.y < height as f64;
        inside.then_some(pixel)
    }

    /// Forward transform: where on screen (client space) a pixel is drawn.
    pub fn pixel_to_pointer(
        transform: &TransformState,
        layout: &ViewLayout,
        pixel: Point,
    ) -> Option<Point> {
        Self::pixel_to_wrapper(transform, layout, pixel).map(|p| p + layout.wrapper.origin())
    }

    /// Forward transform into wrapper space.
    pub fn pixel_to_wrapper(
        transform: &TransformState,
        layout: &ViewLayout,
        pixel: Point,
    ) -> Option<Point> {
        let (rx, ry) = layout.ratio()?;
        Some(transform.apply(Point::new(pixel.x / rx, pixel.y / ry)))
    }

    /// Pointer position relative to the wrapper, used as the zoom anchor.
    pub fn wrapper_point(layout: &ViewLayout, client: Point) -> Point {
        client - layout.wrapper.origin()
    }
}
