//! TopoJSON decoding.
//!
//! A topology stores shared boundary arcs once; geometries reference arcs by
//! index (`~i`, i.e. `-i - 1`, walks arc `i` backwards). Quantized topologies
//! carry a `transform` and delta-encode arc positions.

use serde_json::{Map, Value};

use crate::vector_chunk::{GeoPoint, VectorChunk, VectorChunkError, VectorFeature, VectorGeometry, parse_id};

/// Object collection holding country boundaries in the usual world atlases.
pub const DEFAULT_OBJECT: &str = "countries";

#[derive(Debug)]
pub enum TopologyError {
    Json(String),
    NotATopology,
    NoObjects,
    InvalidArcs(String),
    ArcOutOfRange(i64),
    InvalidGeometry { index: usize, reason: String },
    GeoJson(VectorChunkError),
}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::Json(msg) => write!(f, "JSON parse error: {msg}"),
            TopologyError::NotATopology => write!(f, "expected a Topology or FeatureCollection"),
            TopologyError::NoObjects => write!(f, "topology has no objects"),
            TopologyError::InvalidArcs(msg) => write!(f, "invalid arcs: {msg}"),
            TopologyError::ArcOutOfRange(i) => write!(f, "arc index out of range: {i}"),
            TopologyError::InvalidGeometry { index, reason } => {
                write!(f, "invalid geometry at index {index}: {reason}")
            }
            TopologyError::GeoJson(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for TopologyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TopologyError::GeoJson(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Quantization {
    scale: [f64; 2],
    translate: [f64; 2],
}

impl Quantization {
    fn apply(&self, x: f64, y: f64) -> GeoPoint {
        GeoPoint::new(
            x * self.scale[0] + self.translate[0],
            y * self.scale[1] + self.translate[1],
        )
    }
}

#[derive(Debug, Clone)]
pub struct Topology {
    quantization: Option<Quantization>,
    /// Arcs with absolute, dequantized positions.
    arcs: Vec<Vec<GeoPoint>>,
    objects: Map<String, Value>,
}

impl Topology {
    pub fn from_geojson_str(payload: &str) -> Result<Self, TopologyError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| TopologyError::Json(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, TopologyError> {
        let obj = value.as_object().ok_or(TopologyError::NotATopology)?;
        if obj.get("type").and_then(|v| v.as_str()) != Some("Topology") {
            return Err(TopologyError::NotATopology);
        }

        let quantization = match obj.get("transform") {
            Some(t) => Some(parse_quantization(t)?),
            None => None,
        };

        let arcs_val = obj
            .get("arcs")
            .and_then(|v| v.as_array())
            .ok_or_else(|| TopologyError::InvalidArcs("missing arcs array".to_string()))?;
        let mut arcs = Vec::with_capacity(arcs_val.len());
        for (idx, arc) in arcs_val.iter().enumerate() {
            arcs.push(decode_arc(arc, quantization).map_err(|reason| {
                TopologyError::InvalidArcs(format!("arc {idx}: {reason}"))
            })?);
        }

        let objects = obj
            .get("objects")
            .and_then(|v| v.as_object())
            .cloned()
            .ok_or(TopologyError::NoObjects)?;
        if objects.is_empty() {
            return Err(TopologyError::NoObjects);
        }

        Ok(Self {
            quantization,
            arcs,
            objects,
        })
    }

    /// Expands the named object (or the first object in document order when
    /// `name` is absent) into GeoJSON-shaped features. Null geometries are
    /// skipped.
    pub fn features(&self, name: &str) -> Result<VectorChunk, TopologyError> {
        let object = match self.objects.get(name) {
            Some(o) => o,
            None => self.objects.values().next().ok_or(TopologyError::NoObjects)?,
        };

        let mut features = Vec::new();
        let geometries: Vec<&Value> = if geometry_type(object) == Some("GeometryCollection") {
            object
                .get("geometries")
                .and_then(|v| v.as_array())
                .map(|a| a.iter().collect())
                .unwrap_or_default()
        } else {
            vec![object]
        };

        for (index, geom) in geometries.into_iter().enumerate() {
            let Some(geometry) = self
                .geometry(geom)
                .map_err(|reason| TopologyError::InvalidGeometry { index, reason })?
            else {
                continue;
            };
            features.push(VectorFeature {
                id: parse_id(geom.get("id")),
                properties: geom
                    .get("properties")
                    .and_then(|v| v.as_object())
                    .cloned()
                    .unwrap_or_default(),
                geometry,
            });
        }

        Ok(VectorChunk { features })
    }

    fn geometry(&self, value: &Value) -> Result<Option<VectorGeometry>, String> {
        let Some(ty) = geometry_type(value) else {
            return Ok(None);
        };
        let arcs = value.get("arcs");
        let geometry = match ty {
            "Point" => VectorGeometry::Point(self.position(value.get("coordinates"))?),
            "MultiPoint" => {
                let coords = value
                    .get("coordinates")
                    .and_then(|v| v.as_array())
                    .ok_or("MultiPoint missing coordinates".to_string())?;
                let points = coords
                    .iter()
                    .map(|c| self.position(Some(c)))
                    .collect::<Result<Vec<_>, _>>()?;
                VectorGeometry::MultiPoint(points)
            }
            "LineString" => VectorGeometry::LineString(self.line(arcs)?),
            "MultiLineString" => VectorGeometry::MultiLineString(
                as_array(arcs)?
                    .iter()
                    .map(|a| self.line(Some(a)))
                    .collect::<Result<_, _>>()?,
            ),
            "Polygon" => VectorGeometry::Polygon(self.polygon(arcs)?),
            "MultiPolygon" => VectorGeometry::MultiPolygon(
                as_array(arcs)?
                    .iter()
                    .map(|a| self.polygon(Some(a)))
                    .collect::<Result<_, _>>()?,
            ),
            other => return Err(format!("unsupported geometry type: {other}")),
        };
        Ok(Some(geometry))
    }

    fn position(&self, value: Option<&Value>) -> Result<GeoPoint, String> {
        let (x, y) = pair(value.ok_or("missing coordinates".to_string())?)?;
        Ok(match self.quantization {
            Some(q) => q.apply(x, y),
            None => GeoPoint::new(x, y),
        })
    }

    fn polygon(&self, arcs: Option<&Value>) -> Result<Vec<Vec<GeoPoint>>, String> {
        let mut rings = Vec::new();
        for ring_arcs in as_array(arcs)? {
            let mut ring = self.line(Some(ring_arcs))?;
            if ring.is_empty() {
                continue;
            }
            while ring.len() < 4 {
                ring.push(ring[0]);
            }
            rings.push(ring);
        }
        Ok(rings)
    }

    /// Stitches arcs end to end; consecutive arcs share their joining point.
    fn line(&self, arcs: Option<&Value>) -> Result<Vec<GeoPoint>, String> {
        let mut points: Vec<GeoPoint> = Vec::new();
        for idx in as_array(arcs)? {
            let i = idx
                .as_i64()
                .ok_or("arc index must be an integer".to_string())?;
            let (arc_idx, reversed) = if i < 0 { (!i, true) } else { (i, false) };
            let arc = usize::try_from(arc_idx)
                .ok()
                .and_then(|a| self.arcs.get(a))
                .ok_or_else(|| TopologyError::ArcOutOfRange(i).to_string())?;

            points.pop();
            if reversed {
                points.extend(arc.iter().rev().copied());
            } else {
                points.extend(arc.iter().copied());
            }
        }
        if points.len() == 1 {
            points.push(points[0]);
        }
        Ok(points)
    }
}

/// Parses a boundary document that is either a TopoJSON topology or a
/// GeoJSON FeatureCollection.
pub fn parse_boundary_document(payload: &str, object: &str) -> Result<VectorChunk, TopologyError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| TopologyError::Json(e.to_string()))?;
    match value.get("type").and_then(|v| v.as_str()) {
        Some("Topology") => Topology::from_value(&value)?.features(object),
        Some("FeatureCollection") => {
            VectorChunk::from_geojson_value(&value).map_err(TopologyError::GeoJson)
        }
        _ => Err(TopologyError::NotATopology),
    }
}

fn geometry_type(value: &Value) -> Option<&str> {
    value.get("type").and_then(|v| v.as_str())
}

fn as_array(value: Option<&Value>) -> Result<&Vec<Value>, String> {
    value
        .and_then(|v| v.as_array())
        .ok_or("arcs must be an array".to_string())
}

fn pair(value: &Value) -> Result<(f64, f64), String> {
    let arr = value
        .as_array()
        .ok_or("position must be an array".to_string())?;
    match (
        arr.first().and_then(|v| v.as_f64()),
        arr.get(1).and_then(|v| v.as_f64()),
    ) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err("position must have two numbers".to_string()),
    }
}

fn parse_quantization(value: &Value) -> Result<Quantization, TopologyError> {
    let scale = value
        .get("scale")
        .ok_or_else(|| TopologyError::InvalidArcs("transform missing scale".to_string()))
        .and_then(|v| pair(v).map_err(TopologyError::InvalidArcs))?;
    let translate = value
        .get("translate")
        .ok_or_else(|| TopologyError::InvalidArcs("transform missing translate".to_string()))
        .and_then(|v| pair(v).map_err(TopologyError::InvalidArcs))?;
    Ok(Quantization {
        scale: [scale.0, scale.1],
        translate: [translate.0, translate.1],
    })
}

fn decode_arc(value: &Value, quantization: Option<Quantization>) -> Result<Vec<GeoPoint>, String> {
    let positions = value
        .as_array()
        .ok_or("arc must be an array of positions".to_string())?;
    let mut out = Vec::with_capacity(positions.len());
    let (mut x, mut y) = (0.0, 0.0);
    for p in positions {
        let (px, py) = pair(p)?;
        match quantization {
            Some(q) => {
                x += px;
                y += py;
                out.push(q.apply(x, y));
            }
            None => out.push(GeoPoint::new(px, py)),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{Topology, TopologyError, parse_boundary_document};
    use crate::vector_chunk::{GeoPoint, VectorGeometry};
    use pretty_assertions::assert_eq;

    // Two unit squares side by side sharing the edge x = 1.
    const PLAIN: &str = r#"{
        "type": "Topology",
        "objects": {
            "countries": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Polygon", "id": "A", "properties": {"name": "Westland"}, "arcs": [[0, 1]]},
                    {"type": "Polygon", "id": "B", "properties": {"name": "Eastland"}, "arcs": [[2, -1]]},
                    {"type": null, "id": "C", "properties": {"name": "Ghost"}}
                ]
            }
        },
        "arcs": [
            [[1, 0], [1, 1]],
            [[1, 1], [0, 1], [0, 0], [1, 0]],
            [[1, 0], [2, 0], [2, 1], [1, 1]]
        ]
    }"#;

    fn pts(coords: &[(f64, f64)]) -> Vec<GeoPoint> {
        coords.iter().map(|&(x, y)| GeoPoint::new(x, y)).collect()
    }

    #[test]
    fn stitches_shared_and_reversed_arcs() {
        let chunk = Topology::from_geojson_str(PLAIN)
            .expect("topology")
            .features("countries")
            .expect("features");
        assert_eq!(chunk.features.len(), 2);

        assert_eq!(chunk.features[0].name(), Some("Westland"));
        assert_eq!(
            chunk.features[0].geometry,
            VectorGeometry::Polygon(vec![pts(&[
                (1.0, 0.0),
                (1.0, 1.0),
                (0.0, 1.0),
                (0.0, 0.0),
                (1.0, 0.0)
            ])])
        );
        assert_eq!(
            chunk.features[1].geometry,
            VectorGeometry::Polygon(vec![pts(&[
                (1.0, 0.0),
                (2.0, 0.0),
                (2.0, 1.0),
                (1.0, 1.0),
                (1.0, 0.0)
            ])])
        );
    }

    #[test]
    fn dequantizes_delta_encoded_arcs() {
        let payload = r#"{
            "type": "Topology",
            "transform": {"scale": [0.5, 2.0], "translate": [10, 20]},
            "objects": {"land": {"type": "MultiPolygon", "arcs": [[[0]]]}},
            "arcs": [[[0, 0], [2, 0], [0, 1], [-2, 0], [0, -1]]]
        }"#;
        let topo = Topology::from_geojson_str(payload).expect("topology");
        // Unknown name falls back to the first object.
        let chunk = topo.features("countries").expect("features");
        assert_eq!(
            chunk.features[0].geometry,
            VectorGeometry::MultiPolygon(vec![vec![pts(&[
                (10.0, 20.0),
                (11.0, 20.0),
                (11.0, 22.0),
                (10.0, 22.0),
                (10.0, 20.0)
            ])]])
        );
    }

    #[test]
    fn fallback_object_follows_document_order() {
        let payload = r#"{
            "type": "Topology",
            "objects": {
                "zeta": {"type": "GeometryCollection", "geometries": [
                    {"type": "Polygon", "arcs": [[0]], "properties": {"name": "First"}}
                ]},
                "alpha": {"type": "GeometryCollection", "geometries": []}
            },
            "arcs": [[[0, 0], [1, 0], [1, 1], [0, 0]]]
        }"#;
        let chunk = parse_boundary_document(payload, "countries").expect("topology");
        assert_eq!(chunk.features.len(), 1);
        assert_eq!(chunk.features[0].name(), Some("First"));
    }

    #[test]
    fn out_of_range_arc_is_reported() {
        let payload = r#"{"type":"Topology","objects":{"x":{"type":"Polygon","arcs":[[5]]}},"arcs":[]}"#;
        let err = Topology::from_geojson_str(payload)
            .expect("topology")
            .features("x")
            .unwrap_err();
        match err {
            TopologyError::InvalidGeometry { index, reason } => {
                assert_eq!(index, 0);
                assert!(reason.contains("out of range"), "{reason}");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn boundary_document_accepts_both_formats() {
        let topo = parse_boundary_document(PLAIN, "countries").expect("topology");
        assert_eq!(topo.features.len(), 2);

        let geojson = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"Only"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[0,1],[0,0]]]}}]}"#;
        let chunk = parse_boundary_document(geojson, "countries").expect("geojson");
        assert_eq!(chunk.features[0].name(), Some("Only"));

        assert!(matches!(
            parse_boundary_document(r#"{"type":"Point"}"#, "countries"),
            Err(TopologyError::NotATopology)
        ));
    }
}
