//! The controller owning all viewer state.
//!
//! Input arrives as [`InputEvent`]s or as calls from UI controls. Each call
//! updates state, talks to the [`ViewerBackend`] where needed, and finally
//! rebuilds the overlays of the affected views. Handlers never fail: errors
//! become a [`Notice`] and local state is left as it was before the request.

use futures::future::join_all;
use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::contrast::{ContrastCurve, Lut};
use crate::enums::{
    CursorStyle, Key, PaintMode, Panel, PointerButton, SegmentationTool, ToolKind, ToolMode, View,
    WindowPreset,
};
use crate::error::ServiceError;
use crate::geometry::Point;
use crate::histogram::HistogramData;
use crate::mapper::{CoordinateMapper, ViewLayout};
use crate::overlay::{self, FrameScheduler, Overlay, OverlayShape};
use crate::segmentation::{KeyOutcome, PolygonClick, SegmentationEditor};
use crate::services::{FillRequest, ViewerBackend, VoxelLookup, VoxelQuery, endpoints};
use crate::slice_cache::{LoadOutcome, RasterTicket, SliceCache};
use crate::sync::{AspectScales, CrossViewSync, SliceIndices};
use crate::tools::ActivationController;
use crate::transform::TransformStore;
use crate::window::{WindowLevel, WindowState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient message for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Pointer and keyboard input. Positions are in client space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    PointerDown {
        view: View,
        button: PointerButton,
        client: Point,
    },
    PointerMove {
        view: View,
        client: Point,
    },
    PointerUp {
        view: View,
    },
    PointerLeave {
        view: View,
    },
    Click {
        view: View,
        client: Point,
    },
    DoubleClick {
        view: View,
    },
    Wheel {
        view: View,
        client: Point,
        /// Positive zooms in. DOM hosts pass `-deltaY`.
        delta: f64,
    },
    Key(Key),
}

#[derive(Debug, Default)]
struct ViewHandles {
    layout: Option<ViewLayout>,
    overlay: Overlay,
    crosshair: Option<Point>,
    marker: Option<Point>,
    hover: Option<Point>,
    brush_frames: FrameScheduler<Point>,
}

/// What the host draws for one view.
#[derive(Debug)]
pub struct ViewFrame<'a> {
    pub view: View,
    /// CSS transform for the canvas and overlay.
    pub transform: String,
    pub cursor: CursorStyle,
    pub overlay: &'a [OverlayShape],
    pub minimap_visible: bool,
    pub slice: usize,
    pub max_slice: usize,
    /// LUT-processed raster.
    pub raster: Option<&'a RgbaImage>,
}

pub struct Viewer<B> {
    backend: B,
    config: ViewerConfig,
    transforms: TransformStore,
    cache: SliceCache,
    curve: ContrastCurve,
    lut: Lut,
    editor: SegmentationEditor,
    tools: ActivationController,
    window: WindowState,
    scales: AspectScales,
    indices: SliceIndices,
    handles: [ViewHandles; 3],
    histogram: Option<HistogramData>,
    log_scale: bool,
    results: Option<String>,
    notices: Vec<Notice>,
}

impl<B: ViewerBackend> Viewer<B> {
    pub fn new(backend: B, config: ViewerConfig, indices: SliceIndices) -> Self {
        let curve = ContrastCurve::new(config.contrast.min_hu, config.contrast.max_hu);
        let lut = curve.compute_lut();
        Self {
            backend,
            transforms: TransformStore::new(config.transform.clone()),
            cache: SliceCache::new(),
            curve,
            lut,
            editor: SegmentationEditor::new(&config.segmentation),
            tools: ActivationController::new(),
            window: WindowState::new(&config.window),
            scales: AspectScales::default(),
            indices,
            handles: Default::default(),
            histogram: None,
            log_scale: config.contrast.log_scale,
            results: None,
            notices: Vec::new(),
            config,
        }
    }

    pub fn with_scales(mut self, scales: AspectScales) -> Self {
        self.scales = scales;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn transforms(&self) -> &TransformStore {
        &self.transforms
    }

    pub fn editor(&self) -> &SegmentationEditor {
        &self.editor
    }

    pub fn tools(&self) -> &ActivationController {
        &self.tools
    }

    pub fn window(&self) -> &WindowState {
        &self.window
    }

    pub fn cache(&self) -> &SliceCache {
        &self.cache
    }

    pub fn curve(&self) -> &ContrastCurve {
        &self.curve
    }

    pub fn lut(&self) -> &Lut {
        &self.lut
    }

    pub fn scales(&self) -> AspectScales {
        self.scales
    }

    pub fn slice(&self, view: View) -> usize {
        self.indices.get(view)
    }

    pub fn crosshair(&self, view: View) -> Option<Point> {
        self.handles[view.index()].crosshair
    }

    pub fn marker(&self, view: View) -> Option<Point> {
        self.handles[view.index()].marker
    }

    /// Text of the results panel.
    pub fn results(&self) -> Option<&str> {
        self.results.as_deref()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn active_preset(&self) -> Option<WindowPreset> {
        self.window.active_preset()
    }

    pub fn cursor(&self, view: View) -> CursorStyle {
        self.tools.cursor(self.transforms.is_pressed(view))
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Info => info!(%message, "notice"),
            NoticeLevel::Warning | NoticeLevel::Error => warn!(%message, "notice"),
        }
        self.notices.push(Notice { level, message });
    }

    fn service_failed(&mut self, err: &ServiceError) {
        warn!(error = %err, "service request failed");
        self.notices.push(Notice {
            level: NoticeLevel::Error,
            message: err.message().to_string(),
        });
    }

    /// Geometry reported by the page. Without one, pointer input on the view is ignored.
    pub fn set_layout(&mut self, view: View, layout: ViewLayout) {
        self.handles[view.index()].layout = Some(layout);
        self.redraw(view);
    }

    pub fn layout(&self, view: View) -> Option<&ViewLayout> {
        self.handles[view.index()].layout.as_ref()
    }

    pub fn frame(&self, view: View) -> ViewFrame<'_> {
        ViewFrame {
            view,
            transform: self.transforms.get(view).css(),
            cursor: self.cursor(view),
            overlay: self.handles[view.index()].overlay.shapes(),
            minimap_visible: self.transforms.minimap_visible(view),
            slice: self.indices.get(view),
            max_slice: self.indices.max(view),
            raster: self.cache.display(view),
        }
    }

    // Rasters

    pub async fn load_all(&mut self) {
        self.reload(&View::ALL).await;
    }

    /// Register a fetch of the view's current slice. The returned ticket is
    /// landed with [`Viewer::deliver`].
    pub fn request_slice(&mut self, view: View) -> RasterTicket {
        let query = self.window.query(view, self.indices.get(view));
        debug!(view = %view, layer = query.layer, ww = query.ww, wc = query.wc, "requesting slice");
        self.cache.begin(query)
    }

    pub fn deliver(
        &mut self,
        ticket: &RasterTicket,
        response: Result<Vec<u8>, ServiceError>,
    ) -> Option<LoadOutcome> {
        let view = ticket.view();
        let bytes = match response {
            Ok(bytes) => bytes,
            Err(err) => {
                self.fetch_failed(ticket);
                self.service_failed(&err);
                return None;
            }
        };
        match self.cache.complete(ticket, &bytes, &self.lut) {
            Ok(LoadOutcome::Applied) => {
                if let (Some(layout), Some(dims)) = (
                    self.handles[view.index()].layout.as_mut(),
                    self.cache.dimensions(view),
                ) {
                    layout.internal = dims;
                }
                self.redraw(view);
                Some(LoadOutcome::Applied)
            }
            Ok(LoadOutcome::Stale) => Some(LoadOutcome::Stale),
            Err(err) => {
                self.fetch_failed(ticket);
                self.notify(NoticeLevel::Error, format!("Could not decode {view} slice: {err}"));
                None
            }
        }
    }

    /// The slice index follows the raster on screen: when the view's latest
    /// request fails, it falls back to the loaded layer.
    fn fetch_failed(&mut self, ticket: &RasterTicket) {
        if !self.cache.fail(ticket) {
            return;
        }
        let view = ticket.view();
        let Some(shown) = self.cache.loaded_query(view).map(|q| q.layer) else {
            return;
        };
        if self.indices.set(view, shown as i64).is_some() {
            warn!(view = %view, requested = ticket.query.layer, shown, "slice index restored");
            self.redraw(view);
        }
    }

    /// Fetch the current slice of every view in `views` concurrently.
    pub async fn reload(&mut self, views: &[View]) {
        let tickets: Vec<RasterTicket> = views.iter().map(|&v| self.request_slice(v)).collect();
        let backend = &self.backend;
        let responses = join_all(tickets.iter().map(|t| backend.fetch_slice(&t.query))).await;
        for (ticket, response) in tickets.iter().zip(responses) {
            self.deliver(ticket, response);
        }
    }

    /// Slider and number input share this path: clamp, then load when changed.
    pub async fn set_slice(&mut self, view: View, value: i64) {
        let Some(index) = self.indices.set(view, value) else {
            return;
        };
        if self.editor.on_slice_change(view) {
            self.notify(NoticeLevel::Info, "Polygon discarded after slice change");
        }
        debug!(view = %view, index, "slice changed");
        self.reload(&[view]).await;
        self.redraw(view);
    }

    // Window/level

    pub async fn set_window(&mut self, level: WindowLevel) {
        if self.window.set(level) {
            info!(ww = level.width, wc = level.center, "window changed");
            self.reload(&View::ALL).await;
        }
    }

    pub async fn apply_preset(&mut self, preset: WindowPreset) {
        match self.window.preset(preset) {
            Some(level) => self.set_window(level).await,
            None => self.notify(NoticeLevel::Warning, format!("Preset {preset:?} is not configured")),
        }
    }

    pub async fn set_colormap(&mut self, colormap: Option<String>) {
        if self.window.set_colormap(colormap) {
            self.reload(&View::ALL).await;
        }
    }

    // Contrast curve. None of these fetch a raster.

    fn refresh_lut(&mut self) {
        self.lut = self.curve.compute_lut();
        self.cache.apply_lut(&self.lut);
    }

    pub fn add_control_point(&mut self, hu: f64, output: f64) -> Option<usize> {
        let index = self.curve.add_point(hu, output)?;
        self.refresh_lut();
        Some(index)
    }

    pub fn remove_control_point(&mut self, index: usize) -> bool {
        let removed = self.curve.remove_point(index);
        if removed {
            self.refresh_lut();
        }
        removed
    }

    pub fn move_control_point(
        &mut self,
        index: usize,
        hu: Option<f64>,
        output: Option<f64>,
    ) -> Option<usize> {
        let index = self.curve.move_point(index, hu, output)?;
        self.refresh_lut();
        Some(index)
    }

    pub fn reset_contrast(&mut self) {
        self.curve.reset();
        self.refresh_lut();
    }

    /// Fetch the histogram; an intensity histogram also sets the curve's HU domain.
    pub async fn load_histogram(&mut self) {
        match self.backend.histogram().await {
            Ok(histogram) => {
                if let Some((min_hu, max_hu)) = histogram.domain() {
                    self.curve.set_domain(min_hu, max_hu);
                    self.refresh_lut();
                }
                self.histogram = Some(histogram);
            }
            Err(err) => self.service_failed(&err),
        }
    }

    pub fn histogram(&self) -> Option<&HistogramData> {
        self.histogram.as_ref()
    }

    pub fn set_log_scale(&mut self, log_scale: bool) {
        self.log_scale = log_scale;
    }

    /// Bar heights in `[0, 1]` for the histogram behind the curve editor.
    pub fn histogram_bars(&self) -> Vec<f64> {
        self.histogram
            .as_ref()
            .map(|h| h.bar_heights(self.config.contrast.histogram_cutoff, self.log_scale))
            .unwrap_or_default()
    }

    // Tools and panels

    pub fn toggle_tool(&mut self, kind: ToolKind) {
        let transition = self.tools.toggle(kind);
        if transition.is_noop() {
            return;
        }
        info!(deactivated = ?transition.deactivated, activated = ?transition.activated, "tool changed");
        if let Some(old) = transition.deactivated {
            self.tear_down(old);
        }
        self.redraw_all();
    }

    /// Clear everything a tool drew or kept between events.
    fn tear_down(&mut self, kind: ToolKind) {
        match kind {
            ToolKind::Inspector => {
                for handles in &mut self.handles {
                    handles.crosshair = None;
                }
            }
            ToolKind::HuPicker => {
                for handles in &mut self.handles {
                    handles.marker = None;
                }
                self.results = None;
            }
            ToolKind::Segmentation => {
                self.editor.end_stroke();
                self.editor.cancel();
                for handles in &mut self.handles {
                    handles.hover = None;
                    handles.brush_frames.cancel();
                }
            }
            ToolKind::None => {}
        }
    }

    pub fn set_segmentation_tool(&mut self, tool: SegmentationTool) {
        self.tools.set_segmentation_tool(tool);
        if self.editor.set_tool(tool) {
            debug!("polygon draft dropped on tool switch");
        }
        self.redraw_all();
    }

    pub fn set_paint_mode(&mut self, mode: PaintMode) {
        self.editor.set_mode(mode);
        self.redraw_all();
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.editor.set_brush_size(size);
    }

    pub fn toggle_panel(&mut self, panel: Panel) -> bool {
        self.tools.toggle_panel(panel)
    }

    pub fn panel_open(&self, panel: Panel) -> bool {
        self.tools.panel_open(panel)
    }

    // Input

    pub async fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerDown {
                view,
                button,
                client,
            } => {
                if button != PointerButton::Primary {
                    return;
                }
                if !self.tools.mode().claims_drag() {
                    self.transforms.begin_drag(view, client);
                }
                if self.tools.mode() == ToolMode::Segmentation(SegmentationTool::Brush) {
                    self.editor.begin_stroke();
                    self.paint_at(view, client).await;
                }
            }
            InputEvent::PointerMove { view, client } => self.pointer_moved(view, client).await,
            InputEvent::PointerUp { view } => {
                self.transforms.end_drag(view);
                self.editor.end_stroke();
            }
            InputEvent::PointerLeave { view } => {
                self.transforms.end_drag(view);
                self.editor.end_stroke();
                let handles = &mut self.handles[view.index()];
                handles.hover = None;
                handles.brush_frames.cancel();
                self.redraw(view);
            }
            InputEvent::Click { view, client } => self.clicked(view, client).await,
            InputEvent::DoubleClick { view } => {
                self.transforms.reset(view);
                self.redraw(view);
            }
            InputEvent::Wheel {
                view,
                client,
                delta,
            } => {
                let anchor = match &self.handles[view.index()].layout {
                    Some(layout) => CoordinateMapper::wrapper_point(layout, client),
                    None => return,
                };
                if self.transforms.zoom(view, anchor, delta) {
                    self.redraw(view);
                }
            }
            InputEvent::Key(key) => self.key_pressed(key).await,
        }
    }

    /// Run pending brush-preview redraws; call once per display frame.
    pub fn animation_frame(&mut self) {
        for view in View::ALL {
            if let Some(pixel) = self.handles[view.index()].brush_frames.on_frame() {
                self.handles[view.index()].hover = Some(pixel);
                self.redraw(view);
            }
        }
    }

    fn pixel_at(&self, view: View, client: Point) -> Option<Point> {
        let layout = self.handles[view.index()].layout.as_ref()?;
        CoordinateMapper::pointer_to_pixel(self.transforms.get(view), layout, client)
    }

    async fn pointer_moved(&mut self, view: View, client: Point) {
        // Only tools that leave the drag to panning start one.
        if self.transforms.is_pressed(view) {
            self.transforms.drag_to(view, client);
            return;
        }
        let pixel = self.pixel_at(view, client);
        match self.tools.mode() {
            ToolMode::Segmentation(SegmentationTool::Brush) => {
                match pixel {
                    Some(pixel) => {
                        self.handles[view.index()].brush_frames.request(pixel);
                    }
                    None => {
                        self.handles[view.index()].hover = None;
                        self.handles[view.index()].brush_frames.cancel();
                        self.redraw(view);
                    }
                }
                if self.editor.is_stroking() {
                    self.paint_at(view, client).await;
                }
            }
            ToolMode::Segmentation(SegmentationTool::Polygon) => {
                self.handles[view.index()].hover = pixel;
                if self.editor.draft().is_some_and(|d| d.view == view) {
                    self.redraw(view);
                }
            }
            _ => {}
        }
    }

    async fn clicked(&mut self, view: View, client: Point) {
        if self.transforms.take_drag(view) {
            debug!(view = %view, "click after drag suppressed");
            return;
        }
        match self.tools.mode() {
            ToolMode::Inspector => self.inspect(view, client).await,
            ToolMode::HuPicker => self.pick_hu(view, client).await,
            ToolMode::Segmentation(SegmentationTool::Polygon) => {
                self.polygon_click(view, client).await
            }
            ToolMode::Segmentation(SegmentationTool::Brush) | ToolMode::None => {}
        }
    }

    async fn key_pressed(&mut self, key: Key) {
        if self.tools.mode() != ToolMode::Segmentation(SegmentationTool::Polygon) {
            return;
        }
        let view = self.editor.draft().map(|d| d.view);
        match self.editor.handle_key(key) {
            KeyOutcome::Ignored => {}
            KeyOutcome::Cleared | KeyOutcome::Popped { .. } => {
                if let Some(view) = view {
                    self.redraw(view);
                }
            }
            KeyOutcome::Submit(request) => self.submit_polygon(request).await,
            KeyOutcome::Invalid(count) => {
                self.notify(
                    NoticeLevel::Warning,
                    format!("Polygon needs at least 3 vertices, got {count}"),
                );
                if let Some(view) = view {
                    self.redraw(view);
                }
            }
        }
    }

    async fn lookup(&mut self, view: View, pixel: Point) -> Option<VoxelLookup> {
        let (x, y) = pixel.floor();
        let query = VoxelQuery {
            view,
            x,
            y,
            index: self.indices.get(view),
        };
        debug!(path = %query.path(), "voxel lookup");
        let response = self
            .backend
            .lookup_voxel(&query)
            .await
            .and_then(|response| response.into_lookup());
        match response {
            Ok(lookup) => {
                self.scales = lookup.scales;
                Some(lookup)
            }
            Err(err) => {
                self.service_failed(&err);
                None
            }
        }
    }

    async fn inspect(&mut self, view: View, client: Point) {
        let Some(pixel) = self.pixel_at(view, client) else {
            debug!(view = %view, "inspector click outside image");
            return;
        };
        let Some(lookup) = self.lookup(view, pixel).await else {
            return;
        };
        let outcome = CrossViewSync::sync(view, &lookup.voxel, &mut self.indices, &self.scales);
        for (target, pixel) in outcome.crosshairs {
            self.handles[target.index()].crosshair = Some(pixel);
        }
        let updated: Vec<View> = outcome.slice_updates.iter().map(|(v, _)| *v).collect();
        for &target in &updated {
            if self.editor.on_slice_change(target) {
                self.notify(NoticeLevel::Info, "Polygon discarded after slice change");
            }
        }
        let voxel = lookup.voxel;
        self.results = Some(format!(
            "Voxel ({}, {}, {}): HU = {}",
            voxel.x, voxel.y, voxel.z, lookup.hu
        ));
        self.reload(&updated).await;
        self.redraw_all();
    }

    async fn pick_hu(&mut self, view: View, client: Point) {
        let Some(pixel) = self.pixel_at(view, client) else {
            self.results = Some("Click outside image".to_string());
            self.handles[view.index()].marker = None;
            self.redraw(view);
            return;
        };
        match self.lookup(view, pixel).await {
            Some(lookup) => {
                let voxel = lookup.voxel;
                self.results = Some(format!(
                    "Voxel ({}, {}, {}): HU = {}",
                    voxel.x, voxel.y, voxel.z, lookup.hu
                ));
                for handles in &mut self.handles {
                    handles.marker = None;
                }
                self.handles[view.index()].marker = Some(pixel);
            }
            None => self.results = None,
        }
        self.redraw_all();
    }

    async fn polygon_click(&mut self, view: View, client: Point) {
        let Some(pixel) = self.pixel_at(view, client) else {
            return;
        };
        let layer = self.indices.get(view);
        let zoom = self.transforms.get(view).scale;
        match self.editor.polygon_click(view, layer, pixel, zoom) {
            PolygonClick::Started | PolygonClick::Appended(_) => self.redraw(view),
            PolygonClick::Submit(request) => self.submit_polygon(request).await,
            PolygonClick::Invalid(count) => {
                self.notify(
                    NoticeLevel::Warning,
                    format!("Polygon needs at least 3 vertices, got {count}"),
                );
                self.redraw(view);
            }
            PolygonClick::WrongContext { view, layer } => self.notify(
                NoticeLevel::Warning,
                format!("Finish or cancel the polygon on the {view} view, slice {layer}, first"),
            ),
        }
    }

    // Mask mutations

    async fn submit_polygon(&mut self, request: FillRequest) {
        let view = request.view;
        let result = self
            .backend
            .fill_polygon(&request)
            .await
            .and_then(|status| status.into_result(endpoints::FILL_POLYGON));
        match result {
            Ok(()) => {
                info!(view = %view, layer = request.layer, vertices = request.vertices.len(), "polygon filled");
                self.editor.polygon_filled(&request);
                self.refresh_history().await;
                self.reload(&View::ALL).await;
            }
            Err(err) => self.service_failed(&err),
        }
        self.redraw(view);
    }

    async fn paint_at(&mut self, view: View, client: Point) {
        let Some(pixel) = self.pixel_at(view, client) else {
            return;
        };
        let request = self.editor.paint_request(view, pixel, self.indices.get(view));
        let result = self
            .backend
            .paint_voxel(&request)
            .await
            .and_then(|status| status.into_result(endpoints::PAINT_VOXEL));
        match result {
            Ok(()) => {
                self.editor.forget_last_polygon();
                self.refresh_history().await;
                self.reload(&[view]).await;
            }
            Err(err) => {
                self.editor.end_stroke();
                self.service_failed(&err);
            }
        }
    }

    async fn refresh_history(&mut self) {
        match self.backend.history_state().await {
            Ok(history) => self.editor.set_history(history),
            Err(err) => warn!(error = %err, "history state unavailable"),
        }
    }

    /// Reload all views after the mask changed, forgetting the polygon record.
    async fn mask_changed(&mut self) {
        self.editor.forget_last_polygon();
        self.refresh_history().await;
        self.reload(&View::ALL).await;
    }

    pub async fn undo(&mut self) {
        match self.backend.undo_segmentation().await.and_then(|s| s.into_result(endpoints::UNDO)) {
            Ok(()) => self.mask_changed().await,
            Err(err) => self.service_failed(&err),
        }
    }

    pub async fn redo(&mut self) {
        match self.backend.redo_segmentation().await.and_then(|s| s.into_result(endpoints::REDO)) {
            Ok(()) => self.mask_changed().await,
            Err(err) => self.service_failed(&err),
        }
    }

    pub async fn clear(&mut self) {
        match self.backend.clear_segmentation().await.and_then(|s| s.into_result(endpoints::CLEAR)) {
            Ok(()) => {
                info!("segmentation cleared");
                self.mask_changed().await;
            }
            Err(err) => self.service_failed(&err),
        }
    }

    /// Undo the last filled polygon. The record is consumed on success and
    /// kept when the request fails.
    pub async fn undo_last_polygon(&mut self) {
        let Some(record) = self.editor.take_last_polygon() else {
            self.notify(NoticeLevel::Info, "No polygon to undo");
            return;
        };
        match self.backend.undo_segmentation().await.and_then(|s| s.into_result(endpoints::UNDO)) {
            Ok(()) => {
                info!(view = %record.view, layer = record.layer, "polygon undone");
                self.refresh_history().await;
                self.reload(&View::ALL).await;
            }
            Err(err) => {
                self.editor.restore_last_polygon(record);
                self.service_failed(&err);
            }
        }
    }

    pub async fn export(&mut self) -> Option<Vec<u8>> {
        match self.backend.export_segmentation().await {
            Ok(bytes) => {
                info!(bytes = bytes.len(), "segmentation exported");
                Some(bytes)
            }
            Err(err) => {
                self.service_failed(&err);
                None
            }
        }
    }

    // Overlays

    fn redraw_all(&mut self) {
        for view in View::ALL {
            self.redraw(view);
        }
    }

    /// Rebuild the view's overlay from state.
    fn redraw(&mut self, view: View) {
        let zoom = self.transforms.get(view).scale;
        let handles = &self.handles[view.index()];
        let extent = self
            .cache
            .dimensions(view)
            .or_else(|| handles.layout.map(|l| l.internal))
            .unwrap_or_default();

        let mut shapes = Vec::new();
        if let Some(center) = handles.crosshair {
            shapes.push(overlay::crosshair(center, extent, zoom));
        }
        if let Some(center) = handles.marker {
            shapes.push(overlay::marker(center, zoom));
        }
        match self.tools.mode() {
            ToolMode::Segmentation(SegmentationTool::Brush) => {
                if let Some(center) = handles.hover {
                    shapes.push(overlay::brush_preview(
                        center,
                        self.editor.brush_size(),
                        self.editor.mode(),
                        zoom,
                    ));
                }
            }
            ToolMode::Segmentation(SegmentationTool::Polygon) => {
                if let Some(draft) = self.editor.draft().filter(|d| d.view == view) {
                    shapes.extend(overlay::polygon_preview(
                        draft,
                        handles.hover,
                        self.editor.mode(),
                        zoom,
                    ));
                }
            }
            _ => {}
        }
        self.handles[view.index()].overlay.redraw(shapes);
    }
}
