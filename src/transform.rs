use crate::config::TransformConfig;
use crate::enums::View;
use crate::geometry::Point;

/// Pan/zoom state of one view. The CSS transform applied to the view's raster
/// and overlay is `translate(pan_x, pan_y) scale(scale)` with origin top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformState {
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    /// Set once a press moved past the drag threshold; consumed by the next click.
    pub is_dragging: bool,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            is_dragging: false,
        }
    }
}

impl TransformState {
    pub fn pan(&self) -> Point {
        Point::new(self.pan_x, self.pan_y)
    }

    /// Wrapper-space position of an (unscaled) layout point.
    pub fn apply(&self, layout: Point) -> Point {
        Point::new(
            layout.x * self.scale + self.pan_x,
            layout.y * self.scale + self.pan_y,
        )
    }

    /// Inverse of [`TransformState::apply`].
    pub fn invert(&self, wrapper: Point) -> Point {
        Point::new(
            (wrapper.x - self.pan_x) / self.scale,
            (wrapper.y - self.pan_y) / self.scale,
        )
    }

    pub fn css(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.pan_x, self.pan_y, self.scale
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct DragAnchor {
    pointer: Point,
    pan: Point,
}

/// Owns one [`TransformState`] per view and enforces the zoom/pan invariants:
/// scale stays inside `[min_scale, max_scale]`, and pan is zero whenever the
/// scale is back at its minimum.
#[derive(Clone, Debug)]
pub struct TransformStore {
    states: [TransformState; 3],
    anchors: [Option<DragAnchor>; 3],
    limits: TransformConfig,
}

impl Default for TransformStore {
    fn default() -> Self {
        Self::new(TransformConfig::default())
    }
}

impl TransformStore {
    pub fn new(limits: TransformConfig) -> Self {
        Self {
            states: [TransformState::default(); 3],
            anchors: [None; 3],
            limits,
        }
    }

    pub fn get(&self, view: View) -> &TransformState {
        &self.states[view.index()]
    }

    pub fn limits(&self) -> &TransformConfig {
        &self.limits
    }

    /// Zoom `view` around `anchor` (wrapper space). A positive `delta` zooms in.
    /// Returns whether the state changed.
    pub fn zoom(&mut self, view: View, anchor: Point, delta: f64) -> bool {
        if delta == 0.0 || !delta.is_finite() {
            return false;
        }
        let state = &mut self.states[view.index()];
        let old = state.scale;
        let new = (old + delta.signum() * self.limits.zoom_step * old)
            .clamp(self.limits.min_scale, self.limits.max_scale);
        if new == old {
            return false;
        }

        if new <= self.limits.min_scale {
            state.pan_x = 0.0;
            state.pan_y = 0.0;
        } else {
            let ratio = new / old;
            state.pan_x = anchor.x - (anchor.x - state.pan_x) * ratio;
            state.pan_y = anchor.y - (anchor.y - state.pan_y) * ratio;
        }
        state.scale = new;
        true
    }

    pub fn reset(&mut self, view: View) {
        self.states[view.index()] = TransformState::default();
        self.anchors[view.index()] = None;
    }

    /// Start tracking a press at `pointer` (client space).
    pub fn begin_drag(&mut self, view: View, pointer: Point) {
        let state = &mut self.states[view.index()];
        state.is_dragging = false;
        self.anchors[view.index()] = Some(DragAnchor {
            pointer,
            pan: state.pan(),
        });
    }

    /// Follow the pointer while pressed. Panning is disabled at minimum scale so
    /// the zero-pan invariant holds. Returns whether the pan changed.
    pub fn drag_to(&mut self, view: View, pointer: Point) -> bool {
        let Some(anchor) = self.anchors[view.index()] else {
            return false;
        };
        let state = &mut self.states[view.index()];
        let delta = pointer - anchor.pointer;
        if delta.x.hypot(delta.y) > self.limits.drag_threshold {
            state.is_dragging = true;
        }
        if state.scale <= self.limits.min_scale {
            return false;
        }
        let pan = anchor.pan + delta;
        let changed = pan != state.pan();
        state.pan_x = pan.x;
        state.pan_y = pan.y;
        changed
    }

    pub fn end_drag(&mut self, view: View) {
        self.anchors[view.index()] = None;
    }

    pub fn is_pressed(&self, view: View) -> bool {
        self.anchors[view.index()].is_some()
    }

    /// Read and clear the drag flag. A click following a real drag is suppressed.
    pub fn take_drag(&mut self, view: View) -> bool {
        std::mem::take(&mut self.states[view.index()].is_dragging)
    }

    pub fn minimap_visible(&self, view: View) -> bool {
        self.get(view).scale > self.limits.minimap_threshold
    }
}
