use crate::utils::error::{Result, TransportError};
use geo::{Area, Centroid, Contains, Distance, Geodesic, Point, Polygon};

/// Rejects polygons that cannot yield a meaningful centroid.
pub fn ensure_valid_polygon(polygon: &Polygon<f64>) -> Result<()> {
    let exterior = polygon.exterior();

    if exterior
        .coords()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(TransportError::geometry("polygon has non-finite coordinates"));
    }

    let mut distinct: Vec<(f64, f64)> = Vec::new();
    for c in exterior.coords() {
        if !distinct.contains(&(c.x, c.y)) {
            distinct.push((c.x, c.y));
        }
        if distinct.len() >= 3 {
            break;
        }
    }
    if distinct.len() < 3 {
        return Err(TransportError::geometry(format!(
            "polygon has {} distinct vertices, need at least 3",
            distinct.len()
        )));
    }

    let area = polygon.unsigned_area();
    if !(area > 0.0) {
        return Err(TransportError::geometry("polygon has zero area"));
    }

    Ok(())
}

/// 六角格質心到需求中心的大圓距離 (km，WGS84 橢球)
pub fn distance_to_demand(polygon: &Polygon<f64>, demand_location: Point<f64>) -> Result<f64> {
    ensure_valid_polygon(polygon)?;

    let centroid = polygon
        .centroid()
        .ok_or_else(|| TransportError::geometry("polygon has no centroid"))?;

    let meters = Geodesic::distance(centroid, demand_location);
    Ok(meters / 1000.0)
}

/// Boundary points are not contained.
pub fn contains_demand(polygon: &Polygon<f64>, demand_location: &Point<f64>) -> bool {
    polygon.contains(demand_location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, LineString};

    fn square(lon: f64, lat: f64, half: f64) -> Polygon<f64> {
        polygon![
            (x: lon - half, y: lat - half),
            (x: lon + half, y: lat - half),
            (x: lon + half, y: lat + half),
            (x: lon - half, y: lat + half),
        ]
    }

    #[test]
    fn test_distance_from_centroid() {
        // 赤道上經度差 1 度約 111.32 km
        let hex = square(36.0, 0.0, 0.01);
        let d = distance_to_demand(&hex, Point::new(37.0, 0.0)).unwrap();
        assert!((d - 111.32).abs() < 0.1, "got {}", d);
    }

    #[test]
    fn test_distance_is_zero_at_centroid() {
        let hex = square(36.8, -1.3, 0.05);
        let d = distance_to_demand(&hex, Point::new(36.8, -1.3)).unwrap();
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_distance_is_deterministic() {
        let hex = square(10.0, 50.0, 0.1);
        let a = distance_to_demand(&hex, Point::new(13.4, 52.5)).unwrap();
        let b = distance_to_demand(&hex, Point::new(13.4, 52.5)).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_degenerate_polygons_are_rejected() {
        let flat = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)]),
            vec![],
        );
        assert!(matches!(
            distance_to_demand(&flat, Point::new(0.0, 0.0)),
            Err(TransportError::GeometryError { .. })
        ));

        let point_like = Polygon::new(
            LineString::from(vec![(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]),
            vec![],
        );
        assert!(ensure_valid_polygon(&point_like).is_err());

        let nan = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, f64::NAN), (1.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        assert!(ensure_valid_polygon(&nan).is_err());
    }

    #[test]
    fn test_contains_demand() {
        let hex = square(36.8, -1.3, 0.05);
        assert!(contains_demand(&hex, &Point::new(36.8, -1.3)));
        assert!(!contains_demand(&hex, &Point::new(37.8, -1.3)));
    }
}
