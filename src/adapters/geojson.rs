//! GeoJSON FeatureCollection of hexagon polygons <-> `Site`.

use crate::domain::model::Site;
use crate::utils::error::{Result, TransportError};
use geo::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ROAD_DIST: &str = "road_dist";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// 讀入的六角格，連同 FeatureCollection 其餘成員，寫出時原樣帶回
#[derive(Debug, Clone)]
pub struct SiteLayer {
    pub sites: Vec<Site>,
    pub extra: Map<String, Value>,
}

fn parse_ring(ring: &Value) -> Option<LineString<f64>> {
    let coords = ring
        .as_array()?
        .iter()
        .map(|position| {
            let position = position.as_array()?;
            Some(Coord {
                x: position.first()?.as_f64()?,
                y: position.get(1)?.as_f64()?,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(LineString::new(coords))
}

fn parse_polygon_rings(rings: &Value) -> Option<Polygon<f64>> {
    let mut rings = rings.as_array()?.iter().map(parse_ring);
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

/// Polygon, or a MultiPolygon holding exactly one polygon.
pub fn parse_polygon(geometry: &Value) -> Result<Polygon<f64>> {
    let kind = geometry.get("type").and_then(Value::as_str).unwrap_or("");
    let coordinates = geometry
        .get("coordinates")
        .ok_or_else(|| TransportError::geometry("geometry has no coordinates"))?;

    let polygon = match kind {
        "Polygon" => parse_polygon_rings(coordinates),
        "MultiPolygon" => match coordinates.as_array().map(Vec::as_slice) {
            Some([single]) => parse_polygon_rings(single),
            _ => None,
        },
        other => {
            return Err(TransportError::geometry(format!(
                "unsupported geometry type '{}'",
                other
            )))
        }
    };

    polygon.ok_or_else(|| TransportError::geometry(format!("unparsable {} coordinates", kind)))
}

fn polygon_to_value(polygon: &Polygon<f64>) -> Value {
    let ring = |line: &LineString<f64>| -> Value {
        Value::Array(
            line.coords()
                .map(|c| Value::Array(vec![Value::from(c.x), Value::from(c.y)]))
                .collect(),
        )
    };
    let mut rings = vec![ring(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring));

    let mut geometry = Map::new();
    geometry.insert("type".to_string(), Value::from("Polygon"));
    geometry.insert("coordinates".to_string(), Value::Array(rings));
    Value::Object(geometry)
}

/// 讀取六角格。幾何無法解析的格子保留下來 (空多邊形)，
/// 之後在計算時以單格錯誤回報；缺少 road_dist 則整批失敗。
pub fn read_layer(data: &[u8]) -> Result<SiteLayer> {
    let collection: FeatureCollection = serde_json::from_slice(data)?;
    if collection.kind != "FeatureCollection" {
        return Err(TransportError::ValidationError {
            message: format!("expected a FeatureCollection, found '{}'", collection.kind),
        });
    }

    let mut sites = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.into_iter().enumerate() {
        let properties = feature.properties.unwrap_or_default();

        let road_dist = properties
            .get(ROAD_DIST)
            .and_then(Value::as_f64)
            .ok_or_else(|| TransportError::ValidationError {
                message: format!("hexagon {} has no numeric '{}'", index, ROAD_DIST),
            })?;
        crate::utils::validation::validate_non_negative_f64(
            &format!("hexagon {} {}", index, ROAD_DIST),
            road_dist,
        )?;

        let geometry = match feature.geometry.as_ref().map(parse_polygon) {
            Some(Ok(polygon)) => polygon,
            Some(Err(e)) => {
                tracing::warn!("⚠️ Hexagon {}: {}", index, e);
                Polygon::new(LineString::new(vec![]), vec![])
            }
            None => {
                tracing::warn!("⚠️ Hexagon {} has no geometry", index);
                Polygon::new(LineString::new(vec![]), vec![])
            }
        };

        sites.push(Site {
            index,
            geometry,
            road_dist,
            properties,
            source_geometry: feature.geometry,
            feature_extra: feature.extra,
        });
    }

    Ok(SiteLayer {
        sites,
        extra: collection.extra,
    })
}

pub fn write_layer(sites: &[Site], extra: &Map<String, Value>) -> Result<Vec<u8>> {
    let features = sites
        .iter()
        .map(|site| Feature {
            kind: "Feature".to_string(),
            geometry: Some(
                site.source_geometry
                    .clone()
                    .unwrap_or_else(|| polygon_to_value(&site.geometry)),
            ),
            properties: Some(site.properties.clone()),
            extra: site.feature_extra.clone(),
        })
        .collect();

    let collection = FeatureCollection {
        kind: "FeatureCollection".to_string(),
        features,
        extra: extra.clone(),
    };
    Ok(serde_json::to_vec(&collection)?)
}
