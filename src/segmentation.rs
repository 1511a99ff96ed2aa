//! Brush and polygon editing of the segmentation mask.
//!
//! The mask itself lives in the mask service. The editor only holds what an
//! interaction needs between events: the polygon being drawn, the last
//! polygon that was filled (for "undo last polygon") and the service's
//! undo/redo availability.

use crate::config::SegmentationConfig;
use crate::enums::{Key, PaintMode, SegmentationTool, View};
use crate::error::ViewerError;
use crate::geometry::Point;
use crate::services::{FillRequest, HistoryState, PaintRequest, PixelVertex};

pub const MIN_POLYGON_VERTICES: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    BrushActive,
    PolygonDrawing,
}

/// Polygon under construction, pinned to the view and slice of its first vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonDraft {
    pub view: View,
    pub layer: usize,
    pub vertices: Vec<Point>,
}

impl PolygonDraft {
    fn to_request(&self, mode: PaintMode) -> FillRequest {
        FillRequest {
            view: self.view,
            layer: self.layer,
            vertices: self.vertices.iter().map(|p| pixel_vertex(*p)).collect(),
            mode,
        }
    }
}

/// Copy of the last successfully filled polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonRecord {
    pub view: View,
    pub layer: usize,
    pub vertices: Vec<PixelVertex>,
    pub mode: PaintMode,
}

impl From<&FillRequest> for PolygonRecord {
    fn from(request: &FillRequest) -> Self {
        Self {
            view: request.view,
            layer: request.layer,
            vertices: request.vertices.clone(),
            mode: request.mode,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PolygonClick {
    Started,
    Appended(usize),
    /// The click closed the polygon; the draft was handed over for submission.
    Submit(FillRequest),
    /// The click closed a polygon with too few vertices (count given); the
    /// draft was dropped.
    Invalid(usize),
    /// Click on another view or slice than the draft's. The draft is kept.
    WrongContext { view: View, layer: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub enum KeyOutcome {
    Ignored,
    Cleared,
    Popped { remaining: usize },
    Submit(FillRequest),
    Invalid(usize),
}

fn pixel_vertex(point: Point) -> PixelVertex {
    let (x_pix, y_pix) = point.floor();
    PixelVertex { x_pix, y_pix }
}

#[derive(Clone, Debug)]
pub struct SegmentationEditor {
    tool: SegmentationTool,
    mode: PaintMode,
    brush_size: u32,
    close_radius: f64,
    brush_active: bool,
    draft: Option<PolygonDraft>,
    last_polygon: Option<PolygonRecord>,
    history: HistoryState,
}

impl Default for SegmentationEditor {
    fn default() -> Self {
        Self::new(&SegmentationConfig::default())
    }
}

impl SegmentationEditor {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            tool: SegmentationTool::default(),
            mode: config.mode,
            brush_size: config.brush_size.max(1),
            close_radius: config.close_radius,
            brush_active: false,
            draft: None,
            last_polygon: None,
            history: HistoryState::default(),
        }
    }

    pub fn state(&self) -> EditorState {
        if self.draft.is_some() {
            EditorState::PolygonDrawing
        } else if self.brush_active {
            EditorState::BrushActive
        } else {
            EditorState::Idle
        }
    }

    pub fn tool(&self) -> SegmentationTool {
        self.tool
    }

    pub fn mode(&self) -> PaintMode {
        self.mode
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    pub fn draft(&self) -> Option<&PolygonDraft> {
        self.draft.as_ref()
    }

    pub fn last_polygon(&self) -> Option<&PolygonRecord> {
        self.last_polygon.as_ref()
    }

    pub fn history(&self) -> HistoryState {
        self.history
    }

    pub fn set_history(&mut self, history: HistoryState) {
        self.history = history;
    }

    /// Switch tool. Leaving the polygon tool drops the draft; returns whether it did.
    pub fn set_tool(&mut self, tool: SegmentationTool) -> bool {
        self.tool = tool;
        self.brush_active = false;
        tool != SegmentationTool::Polygon && self.cancel()
    }

    pub fn set_mode(&mut self, mode: PaintMode) {
        self.mode = mode;
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.max(1);
    }

    pub fn begin_stroke(&mut self) {
        self.brush_active = self.tool == SegmentationTool::Brush;
    }

    pub fn end_stroke(&mut self) {
        self.brush_active = false;
    }

    pub fn is_stroking(&self) -> bool {
        self.brush_active
    }

    pub fn paint_request(&self, view: View, pixel: Point, layer: usize) -> PaintRequest {
        let vertex = pixel_vertex(pixel);
        PaintRequest {
            view,
            x_pix: vertex.x_pix,
            y_pix: vertex.y_pix,
            layer,
            brush_size: self.brush_size,
            mode: self.mode,
        }
    }

    /// Closing distance around the first vertex, shrunk with zoom so it stays
    /// the same size on screen.
    pub fn close_radius(&self, zoom: f64) -> f64 {
        self.close_radius / zoom.max(f64::EPSILON)
    }

    pub fn polygon_click(&mut self, view: View, layer: usize, pixel: Point, zoom: f64) -> PolygonClick {
        let radius = self.close_radius(zoom);
        let Some(draft) = self.draft.as_mut() else {
            self.draft = Some(PolygonDraft {
                view,
                layer,
                vertices: vec![pixel],
            });
            return PolygonClick::Started;
        };
        if draft.view != view || draft.layer != layer {
            return PolygonClick::WrongContext {
                view: draft.view,
                layer: draft.layer,
            };
        }
        if draft.vertices[0].distance_to(&pixel) <= radius {
            let draft_len = draft.vertices.len();
            return match self.close() {
                Ok(request) => PolygonClick::Submit(request),
                Err(_) => PolygonClick::Invalid(draft_len),
            };
        }
        draft.vertices.push(pixel);
        PolygonClick::Appended(draft.vertices.len())
    }

    /// Take the draft for submission. With fewer than three vertices the draft
    /// is dropped and an error returned.
    pub fn close(&mut self) -> Result<FillRequest, ViewerError> {
        let draft = self.draft.take().ok_or(ViewerError::InsufficientVertices(0))?;
        if draft.vertices.len() < MIN_POLYGON_VERTICES {
            return Err(ViewerError::InsufficientVertices(draft.vertices.len()));
        }
        Ok(draft.to_request(self.mode))
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        let Some(draft) = self.draft.as_mut() else {
            return KeyOutcome::Ignored;
        };
        match key {
            Key::Escape => {
                self.draft = None;
                KeyOutcome::Cleared
            }
            Key::Backspace => {
                draft.vertices.pop();
                let remaining = draft.vertices.len();
                if remaining == 0 {
                    self.draft = None;
                }
                KeyOutcome::Popped { remaining }
            }
            Key::Enter => {
                let count = draft.vertices.len();
                match self.close() {
                    Ok(request) => KeyOutcome::Submit(request),
                    Err(_) => KeyOutcome::Invalid(count),
                }
            }
            Key::Other => KeyOutcome::Ignored,
        }
    }

    /// Drop the draft. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        self.draft.take().is_some()
    }

    /// A slice change on the draft's view ends the drawing.
    pub fn on_slice_change(&mut self, view: View) -> bool {
        if self.draft.as_ref().is_some_and(|d| d.view == view) {
            self.draft = None;
            return true;
        }
        false
    }

    pub fn polygon_filled(&mut self, request: &FillRequest) {
        self.last_polygon = Some(PolygonRecord::from(request));
    }

    /// Any other mask mutation makes "undo last polygon" refer to the wrong change.
    pub fn forget_last_polygon(&mut self) {
        self.last_polygon = None;
    }

    pub fn take_last_polygon(&mut self) -> Option<PolygonRecord> {
        self.last_polygon.take()
    }

    /// Put a record back after its undo request failed.
    pub fn restore_last_polygon(&mut self, record: PolygonRecord) {
        self.last_polygon = Some(record);
    }
}
