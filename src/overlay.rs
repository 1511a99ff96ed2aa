//! Transient drawing on top of each view's raster.
//!
//! An overlay is a display list in pixel space, drawn with the same transform
//! as the raster. It is always rebuilt from scratch, never patched. Stroke
//! widths and dash lengths are divided by the view's zoom so they keep their
//! on-screen size.

use std::time::Duration;

use image::Rgba;
use web_time::Instant;

use crate::enums::PaintMode;
use crate::geometry::Point;
use crate::segmentation::PolygonDraft;

const LINE_WIDTH: f64 = 2.0;
const DASH: [f64; 2] = [6.0, 4.0];
const MARKER_RADIUS: f64 = 5.0;
const VERTEX_RADIUS: f64 = 3.0;

pub const CROSSHAIR_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);
pub const MARKER_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const PAINT_STROKE: Rgba<u8> = Rgba([0, 255, 255, 255]);
pub const PAINT_FILL: Rgba<u8> = Rgba([0, 255, 255, 64]);
pub const ERASE_STROKE: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const ERASE_FILL: Rgba<u8> = Rgba([255, 0, 0, 64]);

#[derive(Clone, Debug, PartialEq)]
pub enum OverlayShape {
    /// Full-width and full-height lines through `center`.
    Crosshair {
        center: Point,
        extent: (u32, u32),
        line_width: f64,
        color: Rgba<u8>,
    },
    Marker {
        center: Point,
        radius: f64,
        color: Rgba<u8>,
    },
    Polyline {
        points: Vec<Point>,
        line_width: f64,
        color: Rgba<u8>,
    },
    DashedSegment {
        from: Point,
        to: Point,
        line_width: f64,
        dash: [f64; 2],
        color: Rgba<u8>,
    },
    FilledPolygon {
        points: Vec<Point>,
        fill: Rgba<u8>,
    },
    Circle {
        center: Point,
        radius: f64,
        line_width: f64,
        color: Rgba<u8>,
    },
}

/// Display list of one view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay {
    shapes: Vec<OverlayShape>,
}

impl Overlay {
    pub fn shapes(&self) -> &[OverlayShape] {
        &self.shapes
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Replace the whole display list.
    pub fn redraw(&mut self, shapes: Vec<OverlayShape>) {
        self.shapes = shapes;
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }
}

fn scaled(value: f64, zoom: f64) -> f64 {
    value / zoom.max(f64::EPSILON)
}

fn colors(mode: PaintMode) -> (Rgba<u8>, Rgba<u8>) {
    match mode {
        PaintMode::Paint => (PAINT_STROKE, PAINT_FILL),
        PaintMode::Erase => (ERASE_STROKE, ERASE_FILL),
    }
}

pub fn crosshair(center: Point, extent: (u32, u32), zoom: f64) -> OverlayShape {
    OverlayShape::Crosshair {
        center,
        extent,
        line_width: scaled(1.0, zoom),
        color: CROSSHAIR_COLOR,
    }
}

pub fn marker(center: Point, zoom: f64) -> OverlayShape {
    OverlayShape::Marker {
        center,
        radius: scaled(MARKER_RADIUS, zoom),
        color: MARKER_COLOR,
    }
}

pub fn brush_preview(center: Point, brush_size: u32, mode: PaintMode, zoom: f64) -> OverlayShape {
    let (stroke, _) = colors(mode);
    OverlayShape::Circle {
        center,
        radius: brush_size as f64 + 0.5,
        line_width: scaled(1.0, zoom),
        color: stroke,
    }
}

/// Committed edges, a dashed edge to the pointer, and a translucent fill once
/// the draft can form a polygon.
pub fn polygon_preview(
    draft: &PolygonDraft,
    hover: Option<Point>,
    mode: PaintMode,
    zoom: f64,
) -> Vec<OverlayShape> {
    let (stroke, fill) = colors(mode);
    let mut shapes = Vec::with_capacity(draft.vertices.len() + 3);

    if draft.vertices.len() >= 3 {
        shapes.push(OverlayShape::FilledPolygon {
            points: draft.vertices.clone(),
            fill,
        });
    }
    if draft.vertices.len() >= 2 {
        shapes.push(OverlayShape::Polyline {
            points: draft.vertices.clone(),
            line_width: scaled(LINE_WIDTH, zoom),
            color: stroke,
        });
    }
    if let (Some(last), Some(pointer)) = (draft.vertices.last(), hover) {
        shapes.push(OverlayShape::DashedSegment {
            from: *last,
            to: pointer,
            line_width: scaled(LINE_WIDTH, zoom),
            dash: DASH.map(|d| scaled(d, zoom)),
            color: stroke,
        });
    }
    shapes.extend(draft.vertices.iter().map(|v| OverlayShape::Marker {
        center: *v,
        radius: scaled(VERTEX_RADIUS, zoom),
        color: stroke,
    }));
    shapes
}

/// Display refresh interval assumed when pacing previews.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Coalesces redraw requests to at most one per display frame. A request made
/// while one is pending replaces its payload instead of queuing another frame.
/// Frame callbacks arriving sooner than `interval` after the last delivered
/// frame keep the payload pending.
#[derive(Clone, Debug)]
pub struct FrameScheduler<T> {
    pending: Option<T>,
    interval: Duration,
    last_frame: Option<Instant>,
}

impl<T> Default for FrameScheduler<T> {
    fn default() -> Self {
        Self::with_interval(FRAME_INTERVAL)
    }
}

impl<T> FrameScheduler<T> {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            pending: None,
            interval,
            last_frame: None,
        }
    }

    /// Returns `true` when the caller must schedule a new frame callback.
    pub fn request(&mut self, payload: T) -> bool {
        let needs_frame = self.pending.is_none();
        self.pending = Some(payload);
        needs_frame
    }

    /// Called from the frame callback; yields the latest payload once.
    pub fn on_frame(&mut self) -> Option<T> {
        self.on_frame_at(Instant::now())
    }

    pub fn on_frame_at(&mut self, now: Instant) -> Option<T> {
        if self
            .last_frame
            .is_some_and(|last| now.saturating_duration_since(last) < self.interval)
        {
            return None;
        }
        let payload = self.pending.take()?;
        self.last_frame = Some(now);
        Some(payload)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::View;

    fn draft(n: usize) -> PolygonDraft {
        PolygonDraft {
            view: View::Axial,
            layer: 0,
            vertices: (0..n).map(|i| Point::new(i as f64 * 10.0, (i % 2) as f64 * 10.0)).collect(),
        }
    }

    #[test]
    fn fill_appears_from_three_vertices() {
        let has_fill = |shapes: &[OverlayShape]| {
            shapes
                .iter()
                .any(|s| matches!(s, OverlayShape::FilledPolygon { .. }))
        };
        assert!(!has_fill(&polygon_preview(&draft(2), None, PaintMode::Paint, 1.0)));
        assert!(has_fill(&polygon_preview(&draft(3), None, PaintMode::Paint, 1.0)));
    }

    #[test]
    fn erase_preview_is_red() {
        let shapes = polygon_preview(&draft(3), None, PaintMode::Erase, 1.0);
        assert!(shapes.contains(&OverlayShape::FilledPolygon {
            points: draft(3).vertices,
            fill: ERASE_FILL,
        }));
    }

    #[test]
    fn strokes_shrink_with_zoom() {
        let shapes = polygon_preview(&draft(2), Some(Point::new(5.0, 5.0)), PaintMode::Paint, 4.0);
        let dashed = shapes
            .iter()
            .find_map(|s| match s {
                OverlayShape::DashedSegment {
                    line_width, dash, ..
                } => Some((*line_width, *dash)),
                _ => None,
            })
            .unwrap();
        assert_eq!(dashed, (0.5, [1.5, 1.0]));
    }

    #[test]
    fn scheduler_coalesces_requests() {
        let mut frames = FrameScheduler::default();
        assert!(frames.request(1));
        assert!(!frames.request(2));
        assert!(!frames.request(3));
        assert_eq!(frames.on_frame(), Some(3));
        assert_eq!(frames.on_frame(), None);
        assert!(frames.request(4));
    }

    #[test]
    fn scheduler_waits_out_the_refresh_interval() {
        let mut frames = FrameScheduler::with_interval(Duration::from_millis(16));
        let start = Instant::now();
        frames.request(1);
        assert_eq!(frames.on_frame_at(start), Some(1));

        frames.request(2);
        assert_eq!(frames.on_frame_at(start + Duration::from_millis(5)), None);
        assert!(frames.is_pending());
        assert_eq!(frames.on_frame_at(start + Duration::from_millis(16)), Some(2));
        assert!(!frames.is_pending());
    }
}
