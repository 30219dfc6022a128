use std::collections::BTreeMap;

use formats::{GeoPoint, VectorChunk, VectorFeature};
use tracing::debug;

pub type Ring = Vec<GeoPoint>;

/// A named area loaded from boundary data. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub id: Option<String>,
    /// Polygons as rings; the first ring of each polygon is its outer boundary.
    pub polygons: Vec<Vec<Ring>>,
}

impl Region {
    /// Builds a region from an area feature. Features without a name or
    /// without polygon geometry are not regions.
    pub fn from_feature(feature: VectorFeature) -> Option<Self> {
        if !feature.geometry.is_area() {
            return None;
        }
        let name = feature.name()?.to_string();
        let polygons: Vec<Vec<Ring>> = feature
            .geometry
            .into_polygons()
            .into_iter()
            .filter(|rings| rings.first().is_some_and(|outer| !outer.is_empty()))
            .collect();
        if polygons.is_empty() {
            return None;
        }
        Some(Self {
            name,
            id: feature.id,
            polygons,
        })
    }

    /// Every vertex as `(lon_deg, lat_deg)`.
    pub fn coordinates(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.polygons
            .iter()
            .flatten()
            .flatten()
            .map(|p| p.lon_lat())
    }
}

/// The loaded region set with a name index.
///
/// Names are treated as identities; when two features share a name the
/// first one wins lookups.
#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    regions: Vec<Region>,
    by_name: BTreeMap<String, usize>,
}

impl RegionSet {
    pub fn new(regions: Vec<Region>) -> Self {
        let mut by_name = BTreeMap::new();
        for (idx, region) in regions.iter().enumerate() {
            by_name.entry(region.name.clone()).or_insert(idx);
        }
        Self { regions, by_name }
    }

    pub fn from_chunk(chunk: VectorChunk) -> Self {
        let total = chunk.features.len();
        let regions: Vec<Region> = chunk
            .features
            .into_iter()
            .filter_map(Region::from_feature)
            .collect();
        if regions.len() != total {
            debug!(
                skipped = total - regions.len(),
                "ignored features without a name or area geometry"
            );
        }
        Self::new(regions)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Region)> {
        self.regions.iter().enumerate()
    }

    /// Distinct region names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn coordinates(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.regions.iter().flat_map(Region::coordinates)
    }
}
