use crate::view::Size;

pub const PANEL_MIN_WIDTH: f64 = 240.0;
pub const PANEL_MAX_WIDTH: f64 = 800.0;
pub const DEFAULT_PANEL_WIDTH: f64 = 360.0;
pub const DEFAULT_HANDLE_WIDTH: f64 = 6.0;

pub fn clamp_panel_width(width: f64) -> f64 {
    if width.is_nan() {
        return PANEL_MIN_WIDTH;
    }
    width.clamp(PANEL_MIN_WIDTH, PANEL_MAX_WIDTH)
}

/// Split between the map area and the side panel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Layout {
    pub outer: Size,
    pub panel_width: f64,
    pub handle_width: f64,
    pub panel_open: bool,
    /// Space left for the map.
    pub map: Size,
}

/// Map width is whatever remains after the open panel and its handle, never negative.
pub fn derive_layout(outer: Size, panel_width: f64, handle_width: f64, panel_open: bool) -> Layout {
    let panel_width = clamp_panel_width(panel_width);
    let handle_width = handle_width.max(0.0);
    let outer = Size::new(outer.width.max(0.0), outer.height.max(0.0));
    let map_width = if panel_open {
        (outer.width - panel_width - handle_width).max(0.0)
    } else {
        outer.width
    };
    Layout {
        outer,
        panel_width,
        handle_width,
        panel_open,
        map: Size::new(map_width, outer.height),
    }
}

#[cfg(test)]
mod tests {
    use super::{PANEL_MAX_WIDTH, PANEL_MIN_WIDTH, clamp_panel_width, derive_layout};
    use crate::view::Size;

    #[test]
    fn panel_width_is_clamped() {
        assert_eq!(clamp_panel_width(100.0), PANEL_MIN_WIDTH);
        assert_eq!(clamp_panel_width(500.0), 500.0);
        assert_eq!(clamp_panel_width(5000.0), PANEL_MAX_WIDTH);
        assert_eq!(clamp_panel_width(f64::NAN), PANEL_MIN_WIDTH);
    }

    #[test]
    fn open_panel_takes_width_from_the_map() {
        let l = derive_layout(Size::new(1200.0, 700.0), 400.0, 6.0, true);
        assert_eq!(l.map, Size::new(794.0, 700.0));
    }

    #[test]
    fn closed_panel_leaves_full_width() {
        let l = derive_layout(Size::new(1200.0, 700.0), 400.0, 6.0, false);
        assert_eq!(l.map, Size::new(1200.0, 700.0));
    }

    #[test]
    fn out_of_range_panel_width_is_clamped_in_layout() {
        let l = derive_layout(Size::new(1600.0, 700.0), 950.0, 6.0, true);
        assert_eq!(l.panel_width, PANEL_MAX_WIDTH);
        assert_eq!(l.map.width, 1600.0 - 800.0 - 6.0);
    }

    #[test]
    fn narrow_window_never_goes_negative() {
        let l = derive_layout(Size::new(200.0, 300.0), 400.0, 6.0, true);
        assert_eq!(l.map.width, 0.0);
    }
}
