use serde::{Deserialize, Serialize};

use crate::geo::{self, MILES_PER_METER};
use crate::models::route::RouteLeg;
use crate::models::transport::GeoPoint;

/// Milestones that count as reached when the driver is within this many
/// miles of them, absorbing float noise at exact leg boundaries.
const REACHED_TOLERANCE_MILES: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteProgress {
    pub distance_traveled_miles: f64,
    pub distance_remaining_miles: f64,
    pub percent: u8,
    pub eta_minutes: f64,
}

/// A named point along the route, one per leg end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub label: String,
    pub distance_from_origin_miles: f64,
    pub eta_minutes: f64,
    pub reached: bool,
}

/// Progress for a transport that has a route but no position yet.
pub fn start_of_route(total_distance_miles: f64, total_duration_minutes: f64) -> RouteProgress {
    RouteProgress {
        distance_traveled_miles: 0.0,
        distance_remaining_miles: total_distance_miles.max(0.0),
        percent: 0,
        eta_minutes: total_duration_minutes.max(0.0),
    }
}

/// Projects the driver position onto the nearest segment of the route
/// geometry and measures distance along the polyline up to that point.
/// Remaining distance never goes below zero and the percentage is clamped
/// to [0, 100], so positions past the destination read as arrival.
pub fn route_progress(
    points: &[GeoPoint],
    position: GeoPoint,
    total_distance_miles: f64,
    total_duration_minutes: f64,
) -> RouteProgress {
    if points.len() < 2 || total_distance_miles <= 0.0 {
        return start_of_route(total_distance_miles, total_duration_minutes);
    }

    // Miles from the origin to each vertex, measured along the polyline.
    let mut cumulative = vec![0.0; points.len()];
    for i in 1..points.len() {
        cumulative[i] = cumulative[i - 1] + geo::haversine_miles(&points[i - 1], &points[i]);
    }

    let mut best_segment = 0;
    let mut best_fraction = 0.0;
    let mut best_offset = f64::INFINITY;
    for i in 0..points.len() - 1 {
        let projection = geo::project_onto_segment(&position, &points[i], &points[i + 1]);
        if projection.offset_miles < best_offset {
            best_segment = i;
            best_fraction = projection.fraction;
            best_offset = projection.offset_miles;
        }
    }

    let segment_miles = cumulative[best_segment + 1] - cumulative[best_segment];
    let distance_traveled_miles = cumulative[best_segment] + best_fraction * segment_miles;
    let distance_remaining_miles = (total_distance_miles - distance_traveled_miles).max(0.0);
    let percent = ((distance_traveled_miles / total_distance_miles) * 100.0)
        .round()
        .clamp(0.0, 100.0) as u8;
    let eta_minutes = total_duration_minutes * (distance_remaining_miles / total_distance_miles);

    RouteProgress {
        distance_traveled_miles,
        distance_remaining_miles,
        percent,
        eta_minutes,
    }
}

/// One milestone per route leg. The final milestone carries the destination
/// label; ETAs use the same linear model as the overall progress.
pub fn milestones(
    legs: &[RouteLeg],
    destination_label: &str,
    progress: &RouteProgress,
    total_distance_miles: f64,
    total_duration_minutes: f64,
) -> Vec<Milestone> {
    if total_distance_miles <= 0.0 {
        return Vec::new();
    }

    let mut cumulative_meters = 0.0;
    let last = legs.len().saturating_sub(1);
    legs.iter()
        .enumerate()
        .map(|(i, leg)| {
            cumulative_meters += leg.distance_meters;
            let distance_from_origin_miles = cumulative_meters * MILES_PER_METER;
            let label = if i == last {
                destination_label.to_string()
            } else {
                leg.end_label
                    .clone()
                    .unwrap_or_else(|| format!("Waypoint {}", i + 1))
            };

            let miles_ahead = distance_from_origin_miles - progress.distance_traveled_miles;
            let reached = miles_ahead <= REACHED_TOLERANCE_MILES;
            let eta_minutes = if reached {
                0.0
            } else {
                total_duration_minutes * (miles_ahead / total_distance_miles)
            };

            Milestone {
                label,
                distance_from_origin_miles,
                eta_minutes,
                reached,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint { lat, lng }
    }

    fn equator_route() -> Vec<GeoPoint> {
        vec![point(0.0, 0.0), point(0.0, 1.0), point(0.0, 2.0)]
    }

    fn route_miles(points: &[GeoPoint]) -> f64 {
        points
            .windows(2)
            .map(|pair| geo::haversine_miles(&pair[0], &pair[1]))
            .sum()
    }

    #[test]
    fn position_at_origin_is_zero_percent() {
        let points = equator_route();
        let total = route_miles(&points);

        let progress = route_progress(&points, point(0.0, 0.0), total, 120.0);

        assert_eq!(progress.percent, 0);
        assert!(progress.distance_traveled_miles.abs() < 1e-9);
        assert!((progress.distance_remaining_miles - total).abs() < 1e-9);
        assert!((progress.eta_minutes - 120.0).abs() < 1e-9);
    }

    #[test]
    fn position_at_destination_is_one_hundred_percent() {
        let points = equator_route();
        let total = route_miles(&points);

        let progress = route_progress(&points, point(0.0, 2.0), total, 120.0);

        assert_eq!(progress.percent, 100);
        assert!(progress.distance_remaining_miles.abs() < 1e-9);
        assert!(progress.eta_minutes.abs() < 1e-9);
    }

    #[test]
    fn midpoint_is_half_way() {
        let points = equator_route();
        let total = route_miles(&points);

        let progress = route_progress(&points, point(0.0, 1.0), total, 120.0);

        assert_eq!(progress.percent, 50);
        assert!((progress.eta_minutes - 60.0).abs() < 1e-6);
    }

    #[test]
    fn off_route_position_projects_onto_nearest_segment() {
        let points = equator_route();
        let total = route_miles(&points);

        // A hair north of the second segment's midpoint.
        let progress = route_progress(&points, point(0.01, 1.5), total, 120.0);

        assert!((74..=76).contains(&progress.percent));
        assert!(progress.distance_traveled_miles > total * 0.70);
        assert!(progress.distance_traveled_miles < total * 0.80);
    }

    #[test]
    fn position_past_destination_reads_as_arrival() {
        let points = equator_route();
        let total = route_miles(&points);

        let progress = route_progress(&points, point(0.0, 2.5), total, 120.0);

        assert_eq!(progress.percent, 100);
        assert_eq!(progress.distance_remaining_miles, 0.0);
        assert_eq!(progress.eta_minutes, 0.0);
    }

    #[test]
    fn progress_is_monotonic_along_the_route() {
        let points = equator_route();
        let total = route_miles(&points);

        let mut last_traveled = -1.0;
        let mut last_eta = f64::INFINITY;
        for step in 0..=8 {
            let lng = 2.0 * (step as f64) / 8.0;
            let progress = route_progress(&points, point(0.0, lng), total, 120.0);
            assert!(progress.distance_traveled_miles >= last_traveled);
            assert!(progress.eta_minutes <= last_eta);
            last_traveled = progress.distance_traveled_miles;
            last_eta = progress.eta_minutes;
        }
    }

    #[test]
    fn degenerate_geometry_falls_back_to_start() {
        let progress = route_progress(&[point(0.0, 0.0)], point(0.0, 1.0), 10.0, 30.0);
        assert_eq!(progress.percent, 0);
        assert_eq!(progress.distance_traveled_miles, 0.0);

        let zero_total = route_progress(&equator_route(), point(0.0, 1.0), 0.0, 30.0);
        assert_eq!(zero_total.percent, 0);
        assert_eq!(zero_total.distance_remaining_miles, 0.0);
    }

    fn two_leg_route() -> (Vec<RouteLeg>, f64, f64) {
        let points = equator_route();
        let first = geo::haversine_miles(&points[0], &points[1]);
        let second = geo::haversine_miles(&points[1], &points[2]);
        let legs = vec![
            RouteLeg {
                distance_meters: first / MILES_PER_METER,
                duration_seconds: 3_600.0,
                end_label: Some("Transfer Point".to_string()),
            },
            RouteLeg {
                distance_meters: second / MILES_PER_METER,
                duration_seconds: 3_600.0,
                end_label: None,
            },
        ];
        (legs, first + second, 120.0)
    }

    #[test]
    fn milestones_label_legs_and_destination() {
        let (legs, total, duration) = two_leg_route();
        let progress = start_of_route(total, duration);

        let stops = milestones(&legs, "Harbor Rescue", &progress, total, duration);

        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].label, "Transfer Point");
        assert_eq!(stops[1].label, "Harbor Rescue");
        assert!(!stops[0].reached);
        assert!(!stops[1].reached);
        assert!(stops[0].eta_minutes < stops[1].eta_minutes);
        assert!((stops[1].eta_minutes - duration).abs() < 1e-6);
    }

    #[test]
    fn passed_milestones_read_reached_with_zero_eta() {
        let (legs, total, duration) = two_leg_route();
        let points = equator_route();

        let progress = route_progress(&points, point(0.0, 1.2), total, duration);
        let stops = milestones(&legs, "Harbor Rescue", &progress, total, duration);

        assert!(stops[0].reached);
        assert_eq!(stops[0].eta_minutes, 0.0);
        assert!(!stops[1].reached);
        assert!(stops[1].eta_minutes > 0.0);
        assert!(stops[1].eta_minutes < duration);
    }

    #[test]
    fn milestone_etas_shrink_as_the_driver_advances() {
        let (legs, total, duration) = two_leg_route();
        let points = equator_route();

        let early = route_progress(&points, point(0.0, 0.2), total, duration);
        let later = route_progress(&points, point(0.0, 0.8), total, duration);

        let early_stops = milestones(&legs, "Harbor Rescue", &early, total, duration);
        let later_stops = milestones(&legs, "Harbor Rescue", &later, total, duration);

        assert!(later_stops[0].eta_minutes < early_stops[0].eta_minutes);
        assert!(later_stops[1].eta_minutes < early_stops[1].eta_minutes);
    }

    #[test]
    fn unnamed_intermediate_legs_get_positional_labels() {
        let (mut legs, total, duration) = two_leg_route();
        legs[0].end_label = None;
        let progress = start_of_route(total, duration);

        let stops = milestones(&legs, "Harbor Rescue", &progress, total, duration);
        assert_eq!(stops[0].label, "Waypoint 1");
    }
}
