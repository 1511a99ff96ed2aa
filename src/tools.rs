use crate::enums::{CursorStyle, Panel, SegmentationTool, ToolKind, ToolMode};

/// What a tool activation changed. The caller resets the deactivated tool's
/// button and clears the overlays it drew.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub deactivated: Option<ToolKind>,
    pub activated: Option<ToolKind>,
}

impl Transition {
    const NONE: Transition = Transition {
        deactivated: None,
        activated: None,
    };

    pub fn is_noop(&self) -> bool {
        *self == Self::NONE
    }
}

/// Single active pointer tool plus independent panel toggles.
#[derive(Clone, Debug, Default)]
pub struct ActivationController {
    mode: ToolMode,
    segmentation_tool: SegmentationTool,
    window_panel: bool,
    contrast_panel: bool,
}

impl ActivationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn is_active(&self, kind: ToolKind) -> bool {
        self.mode.kind() == kind
    }

    /// Button press for `kind`: turns it off when active, otherwise turns it on
    /// and turns off whatever else was active.
    pub fn toggle(&mut self, kind: ToolKind) -> Transition {
        if kind == ToolKind::None {
            return self.set_mode(ToolMode::None);
        }
        if self.is_active(kind) {
            self.set_mode(ToolMode::None)
        } else {
            self.set_mode(self.mode_for(kind))
        }
    }

    fn mode_for(&self, kind: ToolKind) -> ToolMode {
        match kind {
            ToolKind::None => ToolMode::None,
            ToolKind::Inspector => ToolMode::Inspector,
            ToolKind::Segmentation => ToolMode::Segmentation(self.segmentation_tool),
            ToolKind::HuPicker => ToolMode::HuPicker,
        }
    }

    fn set_mode(&mut self, mode: ToolMode) -> Transition {
        let old = self.mode;
        self.mode = mode;
        if old.kind() == mode.kind() {
            return Transition::NONE;
        }
        let deactivated = (old.kind() != ToolKind::None).then_some(old.kind());
        let activated = (mode.kind() != ToolKind::None).then_some(mode.kind());
        Transition {
            deactivated,
            activated,
        }
    }

    pub fn segmentation_tool(&self) -> SegmentationTool {
        self.segmentation_tool
    }

    /// Choose brush or polygon. Takes effect immediately when segmenting,
    /// otherwise on the next activation.
    pub fn set_segmentation_tool(&mut self, tool: SegmentationTool) {
        self.segmentation_tool = tool;
        if let ToolMode::Segmentation(_) = self.mode {
            self.mode = ToolMode::Segmentation(tool);
        }
    }

    pub fn toggle_panel(&mut self, panel: Panel) -> bool {
        let slot = match panel {
            Panel::WindowLevel => &mut self.window_panel,
            Panel::Contrast => &mut self.contrast_panel,
        };
        *slot = !*slot;
        *slot
    }

    pub fn panel_open(&self, panel: Panel) -> bool {
        match panel {
            Panel::WindowLevel => self.window_panel,
            Panel::Contrast => self.contrast_panel,
        }
    }

    /// Cursor shared by every element of every view.
    pub fn cursor(&self, pressed: bool) -> CursorStyle {
        match self.mode {
            ToolMode::Segmentation(_) | ToolMode::HuPicker => CursorStyle::Crosshair,
            ToolMode::Inspector => CursorStyle::Pointer,
            ToolMode::None if pressed => CursorStyle::Grabbing,
            ToolMode::None => CursorStyle::Grab,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activating_one_tool_deactivates_the_other() {
        let mut tools = ActivationController::new();
        tools.toggle(ToolKind::Inspector);
        let transition = tools.toggle(ToolKind::Segmentation);
        assert_eq!(transition.deactivated, Some(ToolKind::Inspector));
        assert_eq!(transition.activated, Some(ToolKind::Segmentation));
        assert!(!tools.is_active(ToolKind::Inspector));
    }

    #[test]
    fn toggling_active_tool_turns_it_off() {
        let mut tools = ActivationController::new();
        tools.toggle(ToolKind::HuPicker);
        let transition = tools.toggle(ToolKind::HuPicker);
        assert_eq!(transition.deactivated, Some(ToolKind::HuPicker));
        assert_eq!(tools.mode(), ToolMode::None);
    }

    #[test]
    fn panels_do_not_affect_tools() {
        let mut tools = ActivationController::new();
        tools.toggle(ToolKind::Inspector);
        assert!(tools.toggle_panel(Panel::Contrast));
        assert!(tools.is_active(ToolKind::Inspector));
        assert!(!tools.toggle_panel(Panel::Contrast));
    }

    #[test]
    fn segmentation_remembers_sub_tool() {
        let mut tools = ActivationController::new();
        tools.set_segmentation_tool(SegmentationTool::Polygon);
        tools.toggle(ToolKind::Segmentation);
        assert_eq!(tools.mode(), ToolMode::Segmentation(SegmentationTool::Polygon));
        assert_eq!(tools.cursor(false), CursorStyle::Crosshair);
    }

    #[test]
    fn cursor_follows_mode() {
        let mut tools = ActivationController::new();
        assert_eq!(tools.cursor(false), CursorStyle::Grab);
        assert_eq!(tools.cursor(true), CursorStyle::Grabbing);
        tools.toggle(ToolKind::Inspector);
        assert_eq!(tools.cursor(true), CursorStyle::Pointer);
    }
}
