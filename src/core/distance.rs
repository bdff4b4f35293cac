use geo::{HaversineDistance, Point};

use crate::models::GeoPoint;

/// Mean Earth radius in meters, the same radius `geo` uses for haversine
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Latitude/longitude rectangle in degrees.
///
/// When `min_lon > max_lon` the box wraps across the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    #[inline]
    pub fn wraps_antimeridian(&self) -> bool {
        self.min_lon > self.max_lon
    }
}

/// Calculate the great-circle distance between two points in meters
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Point::new(lon1, lat1).haversine_distance(&Point::new(lon2, lat2))
}

/// Distance in meters between two `GeoPoint`s
#[inline]
pub fn distance_between(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Smallest lat/lon box containing every point within `radius_m` of the center
///
/// Used as a cheap pre-filter before the exact haversine check. The longitude
/// extent is the tangent-point bound of the spherical cap, so no point inside
/// the radius falls outside the box. Caps touching a pole span all longitudes.
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_m: f64) -> BoundingBox {
    let angular = radius_m / EARTH_RADIUS_M;
    let lat_delta = angular.to_degrees();

    let min_lat = (lat - lat_delta).max(-90.0);
    let max_lat = (lat + lat_delta).min(90.0);

    let covers_pole = lat + lat_delta >= 90.0 || lat - lat_delta <= -90.0;
    if covers_pole || angular >= std::f64::consts::FRAC_PI_2 {
        return BoundingBox {
            min_lat,
            max_lat,
            min_lon: -180.0,
            max_lon: 180.0,
        };
    }

    let ratio = (angular.sin() / lat.to_radians().cos()).min(1.0);
    let lon_delta = ratio.asin().to_degrees();

    BoundingBox {
        min_lat,
        max_lat,
        min_lon: normalize_longitude(lon - lon_delta),
        max_lon: normalize_longitude(lon + lon_delta),
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(lat: f64, lon: f64, bbox: &BoundingBox) -> bool {
    if lat < bbox.min_lat || lat > bbox.max_lat {
        return false;
    }
    if bbox.wraps_antimeridian() {
        lon >= bbox.min_lon || lon <= bbox.max_lon
    } else {
        lon >= bbox.min_lon && lon <= bbox.max_lon
    }
}

/// Wrap a longitude into [-180, 180]
#[inline]
pub fn normalize_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
        if wrapped == -180.0 && lon > 0.0 {
            180.0
        } else {
            wrapped
        }
    }
}
