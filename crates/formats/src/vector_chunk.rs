use serde_json::{Map, Value};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    pub fn lon_lat(self) -> (f64, f64) {
        (self.lon_deg, self.lat_deg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VectorGeometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
}

impl VectorGeometry {
    pub fn is_area(&self) -> bool {
        matches!(
            self,
            VectorGeometry::Polygon(_) | VectorGeometry::MultiPolygon(_)
        )
    }

    /// Polygons of an area geometry (outer ring first, then holes).
    ///
    /// Non-area geometries yield no polygons.
    pub fn into_polygons(self) -> Vec<Vec<Vec<GeoPoint>>> {
        match self {
            VectorGeometry::Polygon(rings) => vec![rings],
            VectorGeometry::MultiPolygon(polys) => polys,
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorFeature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: VectorGeometry,
}

impl VectorFeature {
    /// `properties.name`, falling back to the feature id.
    pub fn name(&self) -> Option<&str> {
        self.properties
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorChunk {
    pub features: Vec<VectorFeature>,
}

#[derive(Debug)]
pub enum VectorChunkError {
    Json(String),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for VectorChunkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorChunkError::Json(msg) => write!(f, "JSON parse error: {msg}"),
            VectorChunkError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            VectorChunkError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for VectorChunkError {}

impl VectorChunk {
    pub fn from_geojson_str(payload: &str) -> Result<Self, VectorChunkError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| VectorChunkError::Json(e.to_string()))?;
        Self::from_geojson_value(&value)
    }

    /// Parses a FeatureCollection. Features with a `null` geometry are skipped.
    pub fn from_geojson_value(value: &Value) -> Result<Self, VectorChunkError> {
        let obj = value
            .as_object()
            .ok_or(VectorChunkError::NotAFeatureCollection)?;
        if obj.get("type").and_then(|v| v.as_str()) != Some("FeatureCollection") {
            return Err(VectorChunkError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(VectorChunkError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let invalid = |reason: String| VectorChunkError::InvalidFeature { index, reason };
            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| invalid("feature must be an object".to_string()))?;

            match feat_obj.get("type").and_then(|v| v.as_str()) {
                Some("Feature") => {}
                Some(other) => return Err(invalid(format!("unexpected feature type: {other}"))),
                None => return Err(invalid("feature missing type".to_string())),
            }

            let geometry = match feat_obj.get("geometry") {
                None => return Err(invalid("feature missing geometry".to_string())),
                Some(Value::Null) => continue,
                Some(g) => parse_geometry(g).map_err(invalid)?,
            };

            features.push(VectorFeature {
                id: parse_id(feat_obj.get("id")),
                properties: feat_obj
                    .get("properties")
                    .and_then(|v| v.as_object())
                    .cloned()
                    .unwrap_or_default(),
                geometry,
            });
        }

        Ok(Self { features })
    }
}

pub(crate) fn parse_id(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_geometry(value: &Value) -> Result<VectorGeometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(VectorGeometry::Point(parse_point(coords)?)),
        "MultiPoint" => Ok(VectorGeometry::MultiPoint(parse_points(coords)?)),
        "LineString" => Ok(VectorGeometry::LineString(parse_points(coords)?)),
        "MultiLineString" => Ok(VectorGeometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(VectorGeometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            let mut out = Vec::with_capacity(polys.len());
            for poly in polys {
                out.push(parse_rings(poly)?);
            }
            Ok(VectorGeometry::MultiPolygon(out))
        }
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_points(coords: &Value) -> Result<Vec<GeoPoint>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_rings(coords: &Value) -> Result<Vec<Vec<GeoPoint>>, String> {
    let rings = coords
        .as_array()
        .ok_or("coordinates must be an array of rings".to_string())?;
    rings.iter().map(parse_points).collect()
}
