use scene::layout::{DEFAULT_PANEL_WIDTH, clamp_panel_width};

/// Draggable divider between the map (left) and the info panel (right).
///
/// While dragging only a provisional width changes; the committed width,
/// which drives layout and the focus projection, moves on release. Widths
/// use the same clamp as the layout, so the guide and the committed panel
/// always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPane {
    width: f64,
    drag: Option<PaneDrag>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct PaneDrag {
    /// Viewport x of the container's left edge.
    container_left: f64,
    /// Pointer x minus the panel's left edge at press time.
    grab_offset: f64,
    outer_width: f64,
    provisional: f64,
}

impl Default for SplitPane {
    fn default() -> Self {
        Self::new(DEFAULT_PANEL_WIDTH)
    }
}

impl SplitPane {
    pub fn new(width: f64) -> Self {
        Self {
            width: clamp_panel_width(width),
            drag: None,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Begins a drag from viewport x `client_x` in a container whose left
    /// edge is at `container_left` and which is `outer_width` wide. Later
    /// pointer positions are viewport x too.
    pub fn pointer_down(&mut self, client_x: f64, container_left: f64, outer_width: f64) {
        let panel_left = outer_width - self.width;
        self.drag = Some(PaneDrag {
            container_left,
            grab_offset: client_x - container_left - panel_left,
            outer_width,
            provisional: self.width,
        });
    }

    /// Updates the provisional width. Returns it while a drag is active.
    pub fn pointer_move(&mut self, client_x: f64) -> Option<f64> {
        let drag = self.drag.as_mut()?;
        let x = client_x - drag.container_left;
        drag.provisional = clamp_panel_width(drag.outer_width - (x - drag.grab_offset));
        Some(drag.provisional)
    }

    /// Commits the provisional width. Returns the new width if a drag ended.
    pub fn pointer_up(&mut self) -> Option<f64> {
        let drag = self.drag.take()?;
        self.width = drag.provisional;
        Some(self.width)
    }

    pub fn cancel(&mut self) {
        self.drag = None;
    }

    /// Guide line position in container pixels (left edge of the provisional
    /// panel) while dragging.
    pub fn guide_x(&self) -> Option<f64> {
        self.drag.map(|d| d.outer_width - d.provisional)
    }
}

#[cfg(test)]
mod tests {
    use super::SplitPane;

    #[test]
    fn drag_moves_provisional_then_commits() {
        let mut pane = SplitPane::new(400.0);
        pane.pointer_down(800.0, 0.0, 1200.0);
        assert_eq!(pane.guide_x(), Some(800.0));

        assert_eq!(pane.pointer_move(700.0), Some(500.0));
        assert_eq!(pane.width(), 400.0, "committed width waits for release");
        assert_eq!(pane.guide_x(), Some(700.0));

        assert_eq!(pane.pointer_up(), Some(500.0));
        assert_eq!(pane.width(), 500.0);
        assert_eq!(pane.guide_x(), None);
        assert_eq!(pane.pointer_up(), None);
    }

    #[test]
    fn provisional_width_is_clamped() {
        let mut pane = SplitPane::new(400.0);
        pane.pointer_down(800.0, 0.0, 1200.0);
        assert_eq!(pane.pointer_move(0.0), Some(800.0));
        assert_eq!(pane.pointer_move(1190.0), Some(240.0));
        assert_eq!(pane.pointer_up(), Some(240.0));
    }

    #[test]
    fn positions_are_taken_relative_to_the_container() {
        let mut pane = SplitPane::new(400.0);
        // Container starts 100 px into the viewport; the panel edge sits at 900.
        pane.pointer_down(900.0, 100.0, 1200.0);
        assert_eq!(pane.guide_x(), Some(800.0));
        assert_eq!(pane.pointer_move(850.0), Some(450.0));
        assert_eq!(pane.guide_x(), Some(750.0));
        assert_eq!(pane.pointer_up(), Some(450.0));
    }

    #[test]
    fn initial_width_uses_layout_bounds() {
        assert_eq!(SplitPane::new(50.0).width(), 240.0);
        assert_eq!(SplitPane::new(2000.0).width(), 800.0);
    }

    #[test]
    fn cancel_keeps_committed_width() {
        let mut pane = SplitPane::default();
        let before = pane.width();
        pane.pointer_down(900.0, 0.0, 1200.0);
        pane.pointer_move(500.0);
        pane.cancel();
        assert_eq!(pane.width(), before);
        assert!(!pane.is_dragging());
        assert_eq!(pane.pointer_move(100.0), None);
    }
}
