//! Cartographic projections with screen-space scale and translation.
//!
//! Screen coordinates follow the canvas convention: `x` grows to the right,
//! `y` grows downward. A projected point is
//! `(translate.x + scale * raw_x, translate.y - scale * raw_y)` where `raw` is
//! the unit projection of the (rotated) longitude and latitude in radians.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

use super::Vec2;
use crate::bounds::Aabb2;

/// Latitude limit of the square Web Mercator world.
pub const MERCATOR_MAX_LAT_DEG: f64 = 85.05112878;

const NEWTON_EPSILON: f64 = 1e-6;
const NEWTON_ITERATIONS: usize = 25;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProjectionKind {
    /// Natural Earth I: a pseudo-cylindrical compromise projection for world maps.
    NaturalEarth,
    /// Spherical Mercator: conformal, used for close-ups of a single region.
    Mercator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// No finite coordinates to fit.
    Empty,
    /// Target extent has no area.
    InvalidExtent { width: f64, height: f64 },
    /// Projected bounds collapse to a point or overflow.
    Degenerate { width: f64, height: f64 },
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitError::Empty => write!(f, "no finite coordinates to fit"),
            FitError::InvalidExtent { width, height } => {
                write!(f, "fit extent has no area: {width}x{height}")
            }
            FitError::Degenerate { width, height } => {
                write!(f, "degenerate projected bounds: {width}x{height}")
            }
        }
    }
}

impl std::error::Error for FitError {}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projection {
    pub kind: ProjectionKind,
    /// Pixels per unit of raw projected distance.
    pub scale: f64,
    pub translate: Vec2,
    /// Degrees added to every longitude before projecting.
    pub rotate_lon_deg: f64,
}

impl Projection {
    pub fn natural_earth() -> Self {
        Self {
            kind: ProjectionKind::NaturalEarth,
            scale: 175.295,
            translate: Vec2::new(480.0, 250.0),
            rotate_lon_deg: 0.0,
        }
    }

    pub fn mercator() -> Self {
        Self {
            kind: ProjectionKind::Mercator,
            scale: 961.0 / TAU,
            translate: Vec2::new(480.0, 250.0),
            rotate_lon_deg: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotate_lon_deg: f64) -> Self {
        self.rotate_lon_deg = rotate_lon_deg;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_translate(mut self, translate: Vec2) -> Self {
        self.translate = translate;
        self
    }

    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> Vec2 {
        let (x, y) = self.unit(lon_deg, lat_deg);
        Vec2::new(
            self.translate.x + self.scale * x,
            self.translate.y + self.scale * y,
        )
    }

    /// Maps a screen point back to `(lon_deg, lat_deg)`.
    ///
    /// Returns `None` for points outside the projection's domain.
    pub fn invert(&self, p: Vec2) -> Option<(f64, f64)> {
        if self.scale <= 0.0 || !self.scale.is_finite() {
            return None;
        }
        let x = (p.x - self.translate.x) / self.scale;
        let y = (self.translate.y - p.y) / self.scale;
        let (lambda, phi) = raw_invert(self.kind, x, y)?;
        if lambda.abs() > std::f64::consts::PI + 1e-9 {
            return None;
        }
        let lon = wrap_lon_deg(lambda.to_degrees() - self.rotate_lon_deg);
        Some((lon, phi.to_degrees()))
    }

    /// Bounds of `points` in screen space under this projection.
    pub fn bounds(&self, points: impl IntoIterator<Item = (f64, f64)>) -> Aabb2 {
        Aabb2::from_points(
            points
                .into_iter()
                .map(|(lon, lat)| self.project(lon, lat)),
        )
    }

    /// Chooses scale and translation so the projected `points` exactly fit
    /// `extent`, preserving aspect ratio and centering along the slack axis.
    pub fn fit_extent(
        self,
        extent: Aabb2,
        points: impl IntoIterator<Item = (f64, f64)>,
    ) -> Result<Self, FitError> {
        let w = extent.width();
        let h = extent.height();
        if !(w > 0.0 && h > 0.0) || !w.is_finite() || !h.is_finite() {
            return Err(FitError::InvalidExtent {
                width: w,
                height: h,
            });
        }

        let b = Aabb2::from_points(points.into_iter().map(|(lon, lat)| {
            let (x, y) = self.unit(lon, lat);
            Vec2::new(x, y)
        }));
        if b.is_empty() {
            return Err(FitError::Empty);
        }

        let k = (w / b.width()).min(h / b.height());
        if !k.is_finite() || k <= 0.0 {
            return Err(FitError::Degenerate {
                width: b.width(),
                height: b.height(),
            });
        }

        let x = extent.min[0] + (w - k * (b.min[0] + b.max[0])) * 0.5;
        let y = extent.min[1] + (h - k * (b.min[1] + b.max[1])) * 0.5;
        Ok(self.with_scale(k).with_translate(Vec2::new(x, y)))
    }

    pub fn fit_size(
        self,
        width: f64,
        height: f64,
        points: impl IntoIterator<Item = (f64, f64)>,
    ) -> Result<Self, FitError> {
        self.fit_extent(Aabb2::new([0.0, 0.0], [width, height]), points)
    }

    /// Unit projection with the screen's downward `y`.
    fn unit(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lambda = wrap_lon_deg(lon_deg + self.rotate_lon_deg).to_radians();
        let (x, y) = raw(self.kind, lambda, lat_deg.to_radians());
        (x, -y)
    }
}

fn raw(kind: ProjectionKind, lambda: f64, phi: f64) -> (f64, f64) {
    match kind {
        ProjectionKind::NaturalEarth => {
            let phi2 = phi * phi;
            let phi4 = phi2 * phi2;
            let x = lambda
                * (0.8707 - 0.131979 * phi2
                    + phi4 * (-0.013791 + phi4 * (0.003971 * phi2 - 0.001529 * phi4)));
            let y = phi
                * (1.007226
                    + phi2 * (0.015085 + phi4 * (-0.044475 + 0.028874 * phi2 - 0.005916 * phi4)));
            (x, y)
        }
        ProjectionKind::Mercator => {
            let max = MERCATOR_MAX_LAT_DEG.to_radians();
            let phi = phi.clamp(-max, max);
            (lambda, (FRAC_PI_4 + 0.5 * phi).tan().ln())
        }
    }
}

fn raw_invert(kind: ProjectionKind, x: f64, y: f64) -> Option<(f64, f64)> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    match kind {
        ProjectionKind::NaturalEarth => {
            let mut phi = y;
            for _ in 0..NEWTON_ITERATIONS {
                let phi2 = phi * phi;
                let phi4 = phi2 * phi2;
                let f = phi
                    * (1.007226
                        + phi2
                            * (0.015085 + phi4 * (-0.044475 + 0.028874 * phi2 - 0.005916 * phi4)))
                    - y;
                let df = 1.007226
                    + phi2
                        * (0.015085 * 3.0
                            + phi4
                                * (-0.044475 * 7.0 + 0.028874 * 9.0 * phi2
                                    - 0.005916 * 11.0 * phi4));
                let delta = f / df;
                phi -= delta;
                if delta.abs() <= NEWTON_EPSILON {
                    break;
                }
            }
            if phi.abs() > FRAC_PI_2 + 1e-9 {
                return None;
            }
            let phi2 = phi * phi;
            let lambda = x
                / (0.8707
                    + phi2
                        * (-0.131979 + phi2 * (-0.013791 + phi2 * phi2 * phi2 * (0.003971 - 0.001529 * phi2))));
            Some((lambda, phi))
        }
        ProjectionKind::Mercator => Some((x, 2.0 * y.exp().atan() - FRAC_PI_2)),
    }
}

/// Wraps `lon` into `[-180, 180]`.
///
/// Values already in range are returned unchanged, so `180` stays on the
/// east edge and rings that end on the antimeridian keep their side.
pub fn wrap_lon_deg(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Longitude at the middle of the smallest arc covering all `lons`.
///
/// Regions that straddle the antimeridian (e.g. points at 170° and -170°)
/// are centered on 180° rather than on 0°.
pub fn central_longitude(lons: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = lons
        .into_iter()
        .filter(|l| l.is_finite())
        .map(wrap_lon_deg)
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();

    let first = sorted[0];
    let last = sorted[sorted.len() - 1];

    // The wrap-around gap spans from the last longitude back to the first.
    let mut best_gap = first + 360.0 - last;
    let mut center = 0.5 * (first + last);
    for pair in sorted.windows(2) {
        let gap = pair[1] - pair[0];
        if gap > best_gap {
            best_gap = gap;
            center = 0.5 * (pair[1] + pair[0] + 360.0);
        }
    }
    Some(wrap_lon_deg(center))
}
