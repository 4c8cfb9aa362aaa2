pub mod polyline;

use crate::models::transport::GeoPoint;

const EARTH_RADIUS_MILES: f64 = 3_958.8;

pub const MILES_PER_METER: f64 = 1.0 / 1_609.344;
pub const MINUTES_PER_SECOND: f64 = 1.0 / 60.0;

pub fn haversine_miles(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_MILES * central_angle
}

#[derive(Debug, Clone, Copy)]
pub struct SegmentProjection {
    /// Position along the segment, clamped to [0, 1].
    pub fraction: f64,
    pub nearest: GeoPoint,
    /// Great-circle distance from the query point to the nearest point.
    pub offset_miles: f64,
}

/// Projects `p` onto the segment `a`..`b` in a local equirectangular frame
/// (longitude scaled by the cosine of the segment's mean latitude). Good for
/// the segment lengths a road polyline produces; a zero-length segment
/// projects onto `a`.
pub fn project_onto_segment(p: &GeoPoint, a: &GeoPoint, b: &GeoPoint) -> SegmentProjection {
    let scale = ((a.lat + b.lat) / 2.0).to_radians().cos();

    let dx = (b.lng - a.lng) * scale;
    let dy = b.lat - a.lat;
    let px = (p.lng - a.lng) * scale;
    let py = p.lat - a.lat;

    let len_sq = dx * dx + dy * dy;
    let fraction = if len_sq == 0.0 {
        0.0
    } else {
        ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
    };

    let nearest = GeoPoint {
        lat: a.lat + (b.lat - a.lat) * fraction,
        lng: a.lng + (b.lng - a.lng) * fraction,
    };

    SegmentProjection {
        fraction,
        offset_miles: haversine_miles(p, &nearest),
        nearest,
    }
}

#[cfg(test)]
mod tests {
    use super::{haversine_miles, project_onto_segment};
    use crate::models::transport::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 53.5511,
            lng: 9.9937,
        };
        let distance = haversine_miles(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn london_to_paris_is_around_213_miles() {
        let london = GeoPoint {
            lat: 51.5074,
            lng: -0.1278,
        };
        let paris = GeoPoint {
            lat: 48.8566,
            lng: 2.3522,
        };
        let distance = haversine_miles(&london, &paris);
        assert!((distance - 213.0).abs() < 3.0);
    }

    #[test]
    fn projection_lands_mid_segment() {
        let a = GeoPoint { lat: 0.0, lng: 0.0 };
        let b = GeoPoint { lat: 0.0, lng: 1.0 };
        let p = GeoPoint {
            lat: 0.01,
            lng: 0.5,
        };

        let proj = project_onto_segment(&p, &a, &b);
        assert!((proj.fraction - 0.5).abs() < 1e-6);
        assert!((proj.nearest.lng - 0.5).abs() < 1e-6);
        assert!(proj.nearest.lat.abs() < 1e-9);
        assert!(proj.offset_miles > 0.0);
    }

    #[test]
    fn projection_clamps_before_segment_start() {
        let a = GeoPoint { lat: 0.0, lng: 0.0 };
        let b = GeoPoint { lat: 0.0, lng: 1.0 };
        let p = GeoPoint {
            lat: 0.0,
            lng: -0.4,
        };

        let proj = project_onto_segment(&p, &a, &b);
        assert_eq!(proj.fraction, 0.0);
        assert!((proj.nearest.lng - a.lng).abs() < 1e-9);
    }

    #[test]
    fn projection_clamps_past_segment_end() {
        let a = GeoPoint { lat: 0.0, lng: 0.0 };
        let b = GeoPoint { lat: 0.0, lng: 1.0 };
        let p = GeoPoint { lat: 0.0, lng: 1.7 };

        let proj = project_onto_segment(&p, &a, &b);
        assert_eq!(proj.fraction, 1.0);
        assert!((proj.nearest.lng - b.lng).abs() < 1e-9);
    }

    #[test]
    fn degenerate_segment_projects_onto_its_start() {
        let a = GeoPoint { lat: 10.0, lng: 10.0 };
        let p = GeoPoint { lat: 10.1, lng: 10.0 };

        let proj = project_onto_segment(&p, &a, &a);
        assert_eq!(proj.fraction, 0.0);
        assert!((proj.nearest.lat - a.lat).abs() < 1e-9);
    }
}
