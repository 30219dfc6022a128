//! Projection fitting for the world view and the focus view.

use foundation::bounds::Aabb2;
use foundation::math::{Projection, Vec2, central_longitude};
use tracing::warn;

use crate::region::{Region, RegionSet};

pub const FOCUS_PADDING_RATIO: f64 = 0.06;
pub const FOCUS_PADDING_MIN_PX: f64 = 20.0;
pub const FOCUS_PADDING_MAX_PX: f64 = 80.0;

/// Share of the smaller viewport dimension used when a proper fit is impossible.
pub const FALLBACK_SCALE_FRACTION: f64 = 0.45;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }

    pub fn rect(&self) -> Aabb2 {
        Aabb2::new([0.0, 0.0], [self.width, self.height])
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Which render target is active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewTarget {
    #[default]
    World,
    /// Close-up of the region with this index.
    Focus(usize),
}

/// Padding around the focused region, proportional to the viewport.
pub fn focus_padding(size: Size) -> f64 {
    (size.min_side() * FOCUS_PADDING_RATIO).clamp(FOCUS_PADDING_MIN_PX, FOCUS_PADDING_MAX_PX)
}

/// Natural Earth projection fitting every region into `size`.
pub fn world_projection(regions: &RegionSet, size: Size) -> Projection {
    match Projection::natural_earth().fit_size(size.width, size.height, regions.coordinates()) {
        Ok(p) => p,
        Err(err) => {
            warn!("world projection fit failed ({err}); using approximate fit");
            fallback_fit(Projection::natural_earth(), size, (0.0, 0.0))
        }
    }
}

/// Mercator projection fitting `region` into `size` minus the focus padding.
///
/// The projection is rotated onto the region's central longitude so regions
/// straddling the antimeridian stay contiguous. Degenerate geometry gets an
/// approximate fit centered on the region instead of an error.
pub fn focus_projection(region: &Region, size: Size) -> Projection {
    let rotate = central_longitude(region.coordinates().map(|(lon, _)| lon))
        .map(|c| -c)
        .unwrap_or(0.0);
    let base = Projection::mercator().with_rotation(rotate);

    let pad = focus_padding(size);
    let extent = Aabb2::new([pad, pad], [size.width - pad, size.height - pad]);
    match base.fit_extent(extent, region.coordinates()) {
        Ok(p) => p,
        Err(err) => {
            warn!(region = %region.name, "focus projection fit failed ({err}); using approximate fit");
            fallback_fit(base, size, midpoint(region))
        }
    }
}

/// Centers `center` in `size` at a scale derived from the smaller side.
fn fallback_fit(base: Projection, size: Size, center: (f64, f64)) -> Projection {
    let scale = (size.min_side() * FALLBACK_SCALE_FRACTION).max(1.0);
    let at_origin = base.with_scale(scale).with_translate(Vec2::default());
    let p = at_origin.project(center.0, center.1);
    let offset = if p.x.is_finite() && p.y.is_finite() {
        p
    } else {
        Vec2::default()
    };
    at_origin.with_translate(size.center() - offset)
}

fn midpoint(region: &Region) -> (f64, f64) {
    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
    for (lon, lat) in region.coordinates() {
        if lon.is_finite() && lat.is_finite() {
            sx += lon;
            sy += lat;
            n += 1;
        }
    }
    if n == 0 {
        (0.0, 0.0)
    } else {
        (sx / n as f64, sy / n as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::{Size, focus_padding, focus_projection, world_projection};
    use crate::picking::ProjectedScene;
    use crate::region::{Region, RegionSet};
    use formats::GeoPoint;
    use foundation::bounds::Aabb2;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn rect_region(name: &str, lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> Region {
        Region {
            name: name.to_string(),
            id: None,
            polygons: vec![vec![vec![
                GeoPoint::new(lon0, lat0),
                GeoPoint::new(lon1, lat0),
                GeoPoint::new(lon1, lat1),
                GeoPoint::new(lon0, lat1),
                GeoPoint::new(lon0, lat0),
            ]]],
        }
    }

    fn regions() -> RegionSet {
        RegionSet::new(vec![
            rect_region("Boreal", -170.0, 50.0, -50.0, 83.0),
            rect_region("Austral", 110.0, -45.0, 155.0, -10.0),
            rect_region("Equatoria", -10.0, -5.0, 40.0, 15.0),
        ])
    }

    #[test]
    fn padding_scales_and_clamps() {
        assert_close(focus_padding(Size::new(1000.0, 600.0)), 36.0, 1e-9);
        assert_close(focus_padding(Size::new(100.0, 200.0)), 20.0, 1e-9);
        assert_close(focus_padding(Size::new(3000.0, 2000.0)), 80.0, 1e-9);
    }

    #[test]
    fn world_fits_inside_viewport() {
        let set = regions();
        for size in [Size::new(960.0, 500.0), Size::new(400.0, 800.0)] {
            let p = world_projection(&set, size);
            let b = p.bounds(set.coordinates());
            assert!(size.rect().contains_box(&b, 1e-6), "{b:?} outside {size:?}");
        }
    }

    #[test]
    fn focus_fits_inside_padded_viewport() {
        let set = regions();
        let size = Size::new(700.0, 450.0);
        let pad = focus_padding(size);
        let padded = Aabb2::new([pad, pad], [size.width - pad, size.height - pad]);
        for (_, region) in set.iter() {
            let p = focus_projection(region, size);
            let b = p.bounds(region.coordinates());
            assert!(padded.contains_box(&b, 1e-6), "{} {b:?} outside {padded:?}", region.name);
        }
    }

    #[test]
    fn focus_keeps_antimeridian_regions_contiguous() {
        let region = Region {
            name: "Islands".to_string(),
            id: None,
            polygons: vec![
                vec![vec![
                    GeoPoint::new(177.0, -19.0),
                    GeoPoint::new(180.0, -19.0),
                    GeoPoint::new(180.0, -16.0),
                    GeoPoint::new(177.0, -19.0),
                ]],
                vec![vec![
                    GeoPoint::new(-180.0, -17.0),
                    GeoPoint::new(-178.0, -17.0),
                    GeoPoint::new(-178.0, -15.0),
                    GeoPoint::new(-180.0, -17.0),
                ]],
            ],
        };
        let size = Size::new(600.0, 600.0);
        let p = focus_projection(&region, size);
        let b = p.bounds(region.coordinates());
        // Five degrees of longitude, not 358, span the padded width.
        let span_deg = b.width() / p.scale;
        assert!(span_deg.to_degrees() < 10.0, "span {}", span_deg.to_degrees());
    }

    #[test]
    fn world_view_keeps_antimeridian_rings_on_the_east_edge() {
        let set = RegionSet::new(vec![
            rect_region("Fiji", 178.0, -17.0, 180.0, -16.0),
            rect_region("Brazil", -74.0, -34.0, -34.0, 5.0),
        ]);
        let size = Size::new(960.0, 500.0);
        let p = world_projection(&set, size);

        let near_edge = p.project(179.9, -16.5).x;
        let edge = p.project(180.0, -16.5).x;
        assert!(edge >= near_edge, "180 wrapped to {edge}, 179.9 at {near_edge}");
        assert!(size.rect().contains_box(&p.bounds(set.coordinates()), 1e-6));

        let scene = ProjectedScene::world(&set, &p);
        let inland = p.project(-55.0, -16.5);
        assert_eq!(scene.pick(inland), set.index_of("Brazil"));
        assert_eq!(scene.pick(p.project(179.0, -16.5)), set.index_of("Fiji"));
    }

    #[test]
    fn degenerate_region_falls_back_to_centered_fit() {
        let dot = Region {
            name: "Dot".to_string(),
            id: None,
            polygons: vec![vec![vec![GeoPoint::new(12.0, 41.0); 4]]],
        };
        let size = Size::new(500.0, 300.0);
        let p = focus_projection(&dot, size);
        let s = p.project(12.0, 41.0);
        assert_close(s.x, 250.0, 1e-6);
        assert_close(s.y, 150.0, 1e-6);
        assert_close(p.scale, 300.0 * 0.45, 1e-9);
    }

    #[test]
    fn empty_world_falls_back_without_panicking() {
        let p = world_projection(&RegionSet::default(), Size::new(800.0, 400.0));
        let s = p.project(0.0, 0.0);
        assert_close(s.x, 400.0, 1e-6);
        assert_close(s.y, 200.0, 1e-6);
    }
}
