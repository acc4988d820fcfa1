use foundation::bounds::Aabb2;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
}

impl Geometry {
    pub fn for_each_point(&self, mut f: impl FnMut(&GeoPoint)) {
        match self {
            Geometry::Point(p) => f(p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter().for_each(f),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().for_each(f)
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().for_each(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

impl Feature {
    /// Display label from the usual property names, if any.
    pub fn label(&self) -> Option<&str> {
        ["name", "title", "label"]
            .iter()
            .find_map(|k| self.properties.get(*k).and_then(|v| v.as_str()))
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug)]
pub enum GeoJsonError {
    Json(String),
    NotGeoJson,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Json(msg) => write!(f, "GeoJSON parse error: {msg}"),
            GeoJsonError::NotGeoJson => {
                write!(f, "expected a GeoJSON FeatureCollection, Feature or geometry")
            }
            GeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {}

impl FeatureCollection {
    pub fn from_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| GeoJsonError::Json(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Accepts a `FeatureCollection`, a single `Feature`, or a bare geometry.
    pub fn from_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value.as_object().ok_or(GeoJsonError::NotGeoJson)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(GeoJsonError::NotGeoJson)?;

        match ty {
            "FeatureCollection" => {
                let features_val = obj
                    .get("features")
                    .and_then(|v| v.as_array())
                    .ok_or(GeoJsonError::NotGeoJson)?;
                let mut features = Vec::with_capacity(features_val.len());
                for (index, feat_val) in features_val.iter().enumerate() {
                    // Null geometries are legal GeoJSON; there is nothing to draw.
                    if feat_val.get("geometry").is_some_and(|g| g.is_null()) {
                        continue;
                    }
                    let feature = parse_feature(feat_val)
                        .map_err(|reason| GeoJsonError::InvalidFeature { index, reason })?;
                    features.push(feature);
                }
                Ok(Self { features })
            }
            "Feature" => {
                let feature = parse_feature(value)
                    .map_err(|reason| GeoJsonError::InvalidFeature { index: 0, reason })?;
                Ok(Self {
                    features: vec![feature],
                })
            }
            _ => {
                let geometry = parse_geometry(value)
                    .map_err(|reason| GeoJsonError::InvalidFeature { index: 0, reason })?;
                Ok(Self {
                    features: vec![Feature {
                        id: None,
                        properties: Map::new(),
                        geometry,
                    }],
                })
            }
        }
    }

    pub fn bounds(&self) -> Aabb2 {
        let mut b = Aabb2::empty();
        for feat in &self.features {
            feat.geometry
                .for_each_point(|p| b.extend_lon_lat(p.lon_deg, p.lat_deg));
        }
        b
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn parse_feature(value: &Value) -> Result<Feature, String> {
    let feat_obj = value
        .as_object()
        .ok_or("feature must be an object".to_string())?;

    let feat_type = feat_obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("feature missing type".to_string())?;
    if feat_type != "Feature" {
        return Err(format!("unexpected feature type: {feat_type}"));
    }

    let id = match feat_obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let properties = feat_obj
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    let geometry_val = feat_obj
        .get("geometry")
        .ok_or("feature missing geometry".to_string())?;
    let geometry = parse_geometry(geometry_val)?;

    Ok(Feature {
        id,
        properties,
        geometry,
    })
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
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
        "Point" => Ok(Geometry::Point(parse_point(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_points(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_points(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            let mut out = Vec::with_capacity(polys.len());
            for poly in polys {
                out.push(parse_rings(poly)?);
            }
            Ok(Geometry::MultiPolygon(out))
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
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of position arrays".to_string())?;
    arr.iter().map(parse_points).collect()
}

#[cfg(test)]
mod tests {
    use super::{FeatureCollection, GeoJsonError, Geometry};

    const FLIGHT_PLAN: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": 7, "properties": {"name": "Launch"},
             "geometry": {"type": "Point", "coordinates": [-122.40, 37.79]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "LineString", "coordinates": [[-122.41, 37.78], [-122.39, 37.80]]}},
            {"type": "Feature", "properties": {"title": "Nothing"}, "geometry": null}
        ]
    }"#;

    #[test]
    fn parses_feature_collection() {
        let fc = FeatureCollection::from_str(FLIGHT_PLAN).expect("parse");
        assert_eq!(fc.features.len(), 2);
        assert_eq!(fc.features[0].id.as_deref(), Some("7"));
        assert_eq!(fc.features[0].label(), Some("Launch"));
        assert_eq!(fc.features[1].label(), None);
        assert!(matches!(fc.features[1].geometry, Geometry::LineString(ref l) if l.len() == 2));
    }

    #[test]
    fn bounds_cover_all_positions() {
        let fc = FeatureCollection::from_str(FLIGHT_PLAN).expect("parse");
        let b = fc.bounds();
        assert_eq!(b.min, [-122.41, 37.78]);
        assert_eq!(b.max, [-122.39, 37.80]);
    }

    #[test]
    fn accepts_bare_feature_and_geometry() {
        let feature = r#"{"type":"Feature","properties":null,
            "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}"#;
        let fc = FeatureCollection::from_str(feature).expect("feature");
        assert_eq!(fc.features.len(), 1);

        let geometry = r#"{"type":"MultiPoint","coordinates":[[1,2],[3,4]]}"#;
        let fc = FeatureCollection::from_str(geometry).expect("geometry");
        assert!(matches!(fc.features[0].geometry, Geometry::MultiPoint(ref p) if p.len() == 2));
    }

    #[test]
    fn rejects_non_geojson() {
        assert!(matches!(
            FeatureCollection::from_str("[1,2,3]"),
            Err(GeoJsonError::NotGeoJson)
        ));
        assert!(matches!(
            FeatureCollection::from_str("{not json"),
            Err(GeoJsonError::Json(_))
        ));
        let bad = r#"{"type":"FeatureCollection","features":[{"type":"Feature",
            "geometry":{"type":"Point","coordinates":[1]}}]}"#;
        assert!(matches!(
            FeatureCollection::from_str(bad),
            Err(GeoJsonError::InvalidFeature { index: 0, .. })
        ));
    }
}
