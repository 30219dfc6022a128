use foundation::bounds::Aabb2;
use foundation::math::{Projection, Vec2};

use crate::region::{Region, RegionSet};

/// A region's rings in projected (pre-transform) screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRegion {
    /// Index into the owning `RegionSet`.
    pub region: usize,
    pub polygons: Vec<Vec<Vec<Vec2>>>,
    pub bounds: Aabb2,
}

impl ProjectedRegion {
    pub fn project(region: usize, source: &Region, projection: &Projection) -> Self {
        let mut bounds = Aabb2::empty();
        let polygons: Vec<Vec<Vec<Vec2>>> = source
            .polygons
            .iter()
            .map(|rings| {
                rings
                    .iter()
                    .map(|ring| {
                        ring.iter()
                            .map(|p| {
                                let s = projection.project(p.lon_deg, p.lat_deg);
                                bounds.include(s);
                                s
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Self {
            region,
            polygons,
            bounds,
        }
    }

    /// Even-odd containment; holes punch through their polygon.
    pub fn contains(&self, p: Vec2) -> bool {
        if !self.bounds.contains(p) {
            return false;
        }
        self.polygons.iter().any(|rings| {
            rings
                .iter()
                .filter(|ring| ring_crosses(ring, p))
                .count()
                % 2
                == 1
        })
    }
}

/// Projected geometry of one render target (the world view or a focus view).
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedScene {
    regions: Vec<ProjectedRegion>,
    bounds: Aabb2,
}

impl Default for ProjectedScene {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            bounds: Aabb2::empty(),
        }
    }
}

impl ProjectedScene {
    pub fn world(set: &RegionSet, projection: &Projection) -> Self {
        Self::from_regions(
            set.iter()
                .map(|(idx, r)| ProjectedRegion::project(idx, r, projection)),
        )
    }

    pub fn focus(set: &RegionSet, index: usize, projection: &Projection) -> Self {
        Self::from_regions(
            set.get(index)
                .map(|r| ProjectedRegion::project(index, r, projection)),
        )
    }

    fn from_regions(regions: impl IntoIterator<Item = ProjectedRegion>) -> Self {
        let regions: Vec<ProjectedRegion> = regions.into_iter().collect();
        let bounds = regions
            .iter()
            .fold(Aabb2::empty(), |acc, r| acc.union(&r.bounds));
        Self { regions, bounds }
    }

    pub fn regions(&self) -> &[ProjectedRegion] {
        &self.regions
    }

    /// Union of all projected region bounds.
    pub fn bounds(&self) -> Aabb2 {
        self.bounds
    }

    /// Region index under the projected point `p`.
    ///
    /// Ordering contract: when regions overlap, the one listed first wins.
    pub fn pick(&self, p: Vec2) -> Option<usize> {
        self.regions
            .iter()
            .find(|r| r.contains(p))
            .map(|r| r.region)
    }
}

/// Whether a horizontal ray from `p` toward +x crosses `ring` an odd number of times.
fn ring_crosses(ring: &[Vec2], p: Vec2) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
