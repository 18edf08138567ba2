use crate::models::{BoundingBox, Coordinate};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometers
#[inline]
pub fn haversine_distance(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.latitude().to_radians();
    let lat2_rad = to.latitude().to_radians();
    let delta_lat = (to.latitude() - from.latitude()).to_radians();
    let delta_lon = (to.longitude() - from.longitude()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Bounding box enclosing a circle of `radius_km` around `center`
///
/// 1° latitude ≈ 111km, 1° longitude ≈ 111km * cos(latitude)
pub fn calculate_bounding_box(center: Coordinate, radius_km: f64) -> BoundingBox {
    let lat = center.latitude();
    let lon = center.longitude();

    let lat_delta = radius_km / 111.0;
    // Near the poles cos(lat) collapses; cap the span at the full longitude range
    let lon_delta = (radius_km / (111.0 * lat.to_radians().cos().abs())).min(180.0);

    BoundingBox {
        min_lat: (lat - lat_delta).max(-90.0),
        max_lat: (lat + lat_delta).min(90.0),
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Check if a coordinate is within a bounding box
#[inline]
pub fn is_within_bounding_box(point: Coordinate, bbox: &BoundingBox) -> bool {
    point.latitude() >= bbox.min_lat
        && point.latitude() <= bbox.max_lat
        && point.longitude() >= bbox.min_lon
        && point.longitude() <= bbox.max_lon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn test_haversine_distance() {
        // Seoul to Busan (approximately 325 km)
        let distance = haversine_distance(coord(37.5665, 126.978), coord(35.1796, 129.0756));
        assert!((distance - 325.0).abs() < 10.0, "Distance should be ~325km, got {}", distance);
    }

    #[test]
    fn test_bounding_box() {
        let center = coord(37.5665, 126.978);
        let bbox = calculate_bounding_box(center, 10.0);

        assert!(is_within_bounding_box(center, &bbox));
        assert!(!is_within_bounding_box(coord(35.1796, 129.0756), &bbox));

        // 20km / 111km per degree = ~0.18 degrees
        let lat_span = bbox.max_lat - bbox.min_lat;
        assert!((lat_span - 0.18).abs() < 0.02, "Lat span should be ~0.18 degrees");
    }
}
