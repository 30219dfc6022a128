//! Bounded zoom and pan over the projected map.
//!
//! The controller owns a `ViewTransform` mapping projected points to screen
//! pixels (`screen = k * p + (x, y)`). Gestures clamp the scale to the scale
//! extent; every update clamps the translation so the geometry's bounding box
//! covers the viewport, or is centered when it is smaller than the viewport.

use foundation::bounds::Aabb2;
use foundation::math::Vec2;
use runtime::{Tween, lerp};
use scene::{Size, ViewTarget};

pub const DEFAULT_SCALE_EXTENT: [f64; 2] = [1.0, 15.0];

/// Exponent per wheel delta unit: one notch of 100 zooms by `2^-0.2`.
pub const WHEEL_SENSITIVITY: f64 = 0.002;

pub const RESET_DURATION_S: f64 = 0.5;

/// Pointer travel beyond which a press counts as a drag rather than a click.
pub const CLICK_TOLERANCE_PX: f64 = 3.0;

const RESET_MIN_SCALE: f64 = 0.4;
const RESET_MAX_SCALE: f64 = 1.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        k: 1.0,
        x: 0.0,
        y: 0.0,
    };

    pub fn apply(&self, p: Vec2) -> Vec2 {
        Vec2::new(self.k * p.x + self.x, self.k * p.y + self.y)
    }

    pub fn invert(&self, s: Vec2) -> Vec2 {
        Vec2::new((s.x - self.x) / self.k, (s.y - self.y) / self.k)
    }

    pub fn interpolate(&self, other: &Self, t: f64) -> Self {
        Self {
            k: lerp(self.k, other.k, t),
            x: lerp(self.x, other.x, t),
            y: lerp(self.y, other.y, t),
        }
    }
}

/// Clamps the translation of `t` so `bbox` (in projected space) covers the
/// viewport, centering any axis on which the scaled box is smaller.
pub fn constrain(t: ViewTransform, viewport: Size, bbox: &Aabb2) -> ViewTransform {
    if bbox.is_empty() {
        return t;
    }
    let axis = |pos: f64, extent: f64, lo_edge: f64, hi_edge: f64| {
        let min = extent - hi_edge * t.k;
        let max = -lo_edge * t.k;
        if min > max {
            (extent - (lo_edge + hi_edge) * t.k) * 0.5
        } else {
            pos.clamp(min, max)
        }
    };
    ViewTransform {
        k: t.k,
        x: axis(t.x, viewport.width, bbox.min[0], bbox.max[0]),
        y: axis(t.y, viewport.height, bbox.min[1], bbox.max[1]),
    }
}

/// Transform that centers `bbox` at a scale between 0.4 and 1.
pub fn fit_transform(viewport: Size, bbox: &Aabb2) -> ViewTransform {
    if bbox.is_empty() {
        return ViewTransform::IDENTITY;
    }
    let fit = (viewport.width / bbox.width()).min(viewport.height / bbox.height());
    let k = if fit.is_nan() {
        RESET_MAX_SCALE
    } else {
        fit.max(RESET_MIN_SCALE).min(RESET_MAX_SCALE)
    };
    ViewTransform {
        k,
        x: (viewport.width - (bbox.min[0] + bbox.max[0]) * k) * 0.5,
        y: (viewport.height - (bbox.min[1] + bbox.max[1]) * k) * 0.5,
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Drag {
    origin: Vec2,
    last: Vec2,
    moved: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct ResetAnimation {
    tween: Tween,
    from: ViewTransform,
    to: ViewTransform,
}

#[derive(Debug, Clone)]
pub struct ZoomController {
    transform: ViewTransform,
    viewport: Size,
    bbox: Aabb2,
    target: ViewTarget,
    /// Target change that arrived mid-gesture.
    pending_target: Option<ViewTarget>,
    drag: Option<Drag>,
    animation: Option<ResetAnimation>,
    scale_extent: [f64; 2],
    reset_duration_s: f64,
}

impl Default for ZoomController {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE_EXTENT, RESET_DURATION_S)
    }
}

impl ZoomController {
    pub fn new(scale_extent: [f64; 2], reset_duration_s: f64) -> Self {
        let lo = scale_extent[0].max(f64::MIN_POSITIVE);
        Self {
            transform: ViewTransform::IDENTITY,
            viewport: Size::default(),
            bbox: Aabb2::empty(),
            target: ViewTarget::World,
            pending_target: None,
            drag: None,
            animation: None,
            scale_extent: [lo, scale_extent[1].max(lo)],
            reset_duration_s,
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn target(&self) -> &ViewTarget {
        &self.target
    }

    /// A drag or a reset animation is in progress.
    pub fn is_zooming(&self) -> bool {
        self.drag.is_some() || self.animation.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.as_ref().is_some_and(|d| d.moved)
    }

    /// Re-initializes gesture capture for a new render target.
    ///
    /// Returns `true` if the transform was reset now; mid-gesture the switch
    /// is deferred until the gesture ends.
    pub fn attach(&mut self, target: ViewTarget) -> bool {
        if self.is_zooming() {
            self.pending_target = Some(target);
            return false;
        }
        self.pending_target = None;
        self.target = target;
        self.transform = constrain(ViewTransform::IDENTITY, self.viewport, &self.bbox);
        true
    }

    /// Updates the extent the constraint works against. `bbox` is the
    /// projected bounds of the geometry currently rendered.
    pub fn set_viewport(&mut self, viewport: Size, bbox: Aabb2) {
        self.viewport = viewport;
        self.bbox = bbox;
        self.transform = constrain(self.transform, self.viewport, &self.bbox);
    }

    pub fn pointer_down(&mut self, pos: Vec2) {
        self.animation = None;
        self.drag = Some(Drag {
            origin: pos,
            last: pos,
            moved: false,
        });
    }

    /// Pans by the pointer delta. Returns `true` if the transform changed.
    pub fn pointer_move(&mut self, pos: Vec2) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        let delta = pos - drag.last;
        drag.last = pos;
        if (pos - drag.origin).length() > CLICK_TOLERANCE_PX {
            drag.moved = true;
        }
        let before = self.transform;
        let panned = ViewTransform {
            k: before.k,
            x: before.x + delta.x,
            y: before.y + delta.y,
        };
        self.transform = constrain(panned, self.viewport, &self.bbox);
        self.transform != before
    }

    /// Ends the drag. Returns `true` when the press never moved far enough to
    /// count as a drag, i.e. it was a click.
    pub fn pointer_up(&mut self) -> bool {
        let clicked = self.drag.take().is_some_and(|d| !d.moved);
        self.flush_pending_target();
        clicked
    }

    pub fn pointer_cancel(&mut self) {
        self.drag = None;
        self.flush_pending_target();
    }

    /// Zooms by `2^(-delta_y * 0.002)` keeping the point under `pos` fixed.
    pub fn wheel(&mut self, pos: Vec2, delta_y: f64) -> bool {
        if !delta_y.is_finite() || delta_y == 0.0 {
            return false;
        }
        if self.animation.take().is_some() {
            self.flush_pending_target();
        }
        let before = self.transform;
        let factor = (-delta_y * WHEEL_SENSITIVITY).exp2();
        let k = (before.k * factor).clamp(self.scale_extent[0], self.scale_extent[1]);
        let anchor = before.invert(pos);
        let zoomed = ViewTransform {
            k,
            x: pos.x - anchor.x * k,
            y: pos.y - anchor.y * k,
        };
        self.transform = constrain(zoomed, self.viewport, &self.bbox);
        self.transform != before
    }

    /// Starts the animated reset to the fitted, centered transform.
    pub fn double_click(&mut self, now_s: f64) {
        let to = fit_transform(self.viewport, &self.bbox);
        self.drag = None;
        self.animation = Some(ResetAnimation {
            tween: Tween::new(now_s, self.reset_duration_s),
            from: self.transform,
            to,
        });
    }

    /// Advances the reset animation. Returns `true` while a frame should be drawn.
    pub fn tick(&mut self, now_s: f64) -> bool {
        let Some(anim) = self.animation else {
            return false;
        };
        if anim.tween.finished(now_s) {
            self.transform = constrain(anim.to, self.viewport, &self.bbox);
            self.animation = None;
            self.flush_pending_target();
            return true;
        }
        let t = anim.tween.eased(now_s);
        self.transform = constrain(anim.from.interpolate(&anim.to, t), self.viewport, &self.bbox);
        true
    }

    /// Screen pixel to projected point.
    pub fn invert(&self, screen: Vec2) -> Vec2 {
        self.transform.invert(screen)
    }

    fn flush_pending_target(&mut self) {
        if let Some(target) = self.pending_target.take() {
            self.attach(target);
        }
    }
}
