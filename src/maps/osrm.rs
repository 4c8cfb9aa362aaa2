use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::models::transport::GeoPoint;

use super::{ComputedLeg, ComputedRoute, DirectionsError, DirectionsProvider, TravelEstimate};

/// Directions provider backed by an OSRM HTTP instance.
pub struct OsrmDirections {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OsrmDirections {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    fn route_url(&self, origin: GeoPoint, destination: GeoPoint) -> String {
        format!(
            "{}/route/v1/driving/{};{}?overview=full&geometries=polyline&steps=false",
            self.base_url,
            format_coordinate(origin),
            format_coordinate(destination),
        )
    }

    fn table_url(&self, origin: GeoPoint, destination: GeoPoint) -> String {
        format!(
            "{}/table/v1/driving/{};{}?sources=0&destinations=1&annotations=duration,distance",
            self.base_url,
            format_coordinate(origin),
            format_coordinate(destination),
        )
    }

    fn nearest_url(&self, point: GeoPoint) -> String {
        format!(
            "{}/nearest/v1/driving/{}?number=1",
            self.base_url,
            format_coordinate(point),
        )
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, DirectionsError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        response
            .json::<T>()
            .await
            .map_err(|err| DirectionsError::Upstream(format!("malformed response body: {err}")))
    }

    fn classify(&self, err: reqwest::Error) -> DirectionsError {
        if err.is_timeout() {
            return DirectionsError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            };
        }
        match err.status() {
            Some(status) => DirectionsError::Upstream(format!("http status {status}")),
            None => DirectionsError::Upstream(format!("network error: {err}")),
        }
    }
}

#[async_trait]
impl DirectionsProvider for OsrmDirections {
    fn name(&self) -> &'static str {
        "osrm"
    }

    async fn compute_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<ComputedRoute, DirectionsError> {
        let url = self.route_url(origin, destination);
        debug!(%url, "requesting route");
        let response: RouteResponse = self.fetch(&url).await?;
        normalize_route(response)
    }

    async fn travel_estimate(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<TravelEstimate, DirectionsError> {
        let url = self.table_url(origin, destination);
        debug!(%url, "requesting travel estimate");
        let response: TableResponse = self.fetch(&url).await?;
        normalize_table(response)
    }

    async fn locate(&self, point: GeoPoint) -> bool {
        let url = self.nearest_url(point);
        match self.fetch::<NearestResponse>(&url).await {
            Ok(response) => response.is_ok(),
            Err(err) => {
                debug!(error = %err, "nearest lookup failed");
                false
            }
        }
    }
}

/// OSRM coordinates go on the wire as `longitude,latitude`.
fn format_coordinate(point: GeoPoint) -> String {
    format!("{},{}", point.lng, point.lat)
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
    #[serde(default)]
    waypoints: Vec<OsrmWaypoint>,
}

impl RouteResponse {
    fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: String,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmWaypoint {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableResponse {
    code: String,
    message: Option<String>,
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

impl TableResponse {
    fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

#[derive(Debug, Deserialize)]
struct NearestResponse {
    code: String,
}

impl NearestResponse {
    fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

fn normalize_route(response: RouteResponse) -> Result<ComputedRoute, DirectionsError> {
    if !response.is_ok() {
        return Err(upstream_failure(response.code, response.message));
    }
    let route = response.routes.into_iter().next().ok_or(DirectionsError::NoRoute)?;

    // Waypoint 0 is the origin; each leg i ends at waypoint i + 1.
    let legs = route
        .legs
        .into_iter()
        .enumerate()
        .map(|(i, leg)| ComputedLeg {
            distance_meters: leg.distance,
            duration_seconds: leg.duration,
            end_label: response
                .waypoints
                .get(i + 1)
                .and_then(|w| w.name.clone())
                .filter(|name| !name.is_empty()),
        })
        .collect();

    Ok(ComputedRoute {
        distance_meters: route.distance,
        duration_seconds: route.duration,
        encoded_polyline: route.geometry,
        legs,
    })
}

fn normalize_table(response: TableResponse) -> Result<TravelEstimate, DirectionsError> {
    if !response.is_ok() {
        return Err(upstream_failure(response.code, response.message));
    }
    let duration = first_cell(&response.durations);
    let distance = first_cell(&response.distances);
    match (distance, duration) {
        (Some(distance_meters), Some(duration_seconds)) => Ok(TravelEstimate {
            distance_meters,
            duration_seconds,
        }),
        _ => Err(DirectionsError::NoRoute),
    }
}

fn first_cell(matrix: &Option<Vec<Vec<Option<f64>>>>) -> Option<f64> {
    matrix.as_ref()?.first()?.first().copied().flatten()
}

fn upstream_failure(code: String, message: Option<String>) -> DirectionsError {
    if code == "NoRoute" {
        return DirectionsError::NoRoute;
    }
    match message {
        Some(message) => DirectionsError::Upstream(format!("{code}: {message}")),
        None => DirectionsError::Upstream(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OsrmDirections {
        OsrmDirections::new("http://osrm.local:5000/".to_string(), Duration::from_secs(5))
    }

    #[test]
    fn route_url_is_lng_lat_ordered() {
        let url = provider().route_url(
            GeoPoint { lat: 47.6, lng: -122.3 },
            GeoPoint { lat: 45.5, lng: -122.6 },
        );
        assert_eq!(
            url,
            "http://osrm.local:5000/route/v1/driving/-122.3,47.6;-122.6,45.5?overview=full&geometries=polyline&steps=false"
        );
    }

    #[test]
    fn normalize_route_extracts_first_route() {
        let raw = r#"{
            "code": "Ok",
            "routes": [{
                "distance": 16093.4,
                "duration": 1200.0,
                "geometry": "_p~iF~ps|U_ulLnnqC",
                "legs": [{"distance": 16093.4, "duration": 1200.0}]
            }],
            "waypoints": [{"name": "1st Ave"}, {"name": "Main St"}]
        }"#;
        let response: RouteResponse = serde_json::from_str(raw).unwrap();
        let route = normalize_route(response).unwrap();
        assert_eq!(route.distance_meters, 16093.4);
        assert_eq!(route.duration_seconds, 1200.0);
        assert_eq!(route.encoded_polyline, "_p~iF~ps|U_ulLnnqC");
        assert_eq!(route.legs.len(), 1);
        assert_eq!(route.legs[0].end_label.as_deref(), Some("Main St"));
    }

    #[test]
    fn normalize_route_without_routes_is_no_route() {
        let response: RouteResponse =
            serde_json::from_str(r#"{"code": "Ok", "routes": [], "waypoints": []}"#).unwrap();
        assert!(matches!(normalize_route(response), Err(DirectionsError::NoRoute)));
    }

    #[test]
    fn normalize_route_surfaces_error_code() {
        let response: RouteResponse =
            serde_json::from_str(r#"{"code": "NoRoute", "message": "Impossible route"}"#).unwrap();
        assert!(matches!(normalize_route(response), Err(DirectionsError::NoRoute)));
    }

    #[test]
    fn normalize_table_reads_first_cell() {
        let raw = r#"{
            "code": "Ok",
            "durations": [[842.5]],
            "distances": [[10230.0]]
        }"#;
        let response: TableResponse = serde_json::from_str(raw).unwrap();
        let estimate = normalize_table(response).unwrap();
        assert_eq!(estimate.distance_meters, 10230.0);
        assert_eq!(estimate.duration_seconds, 842.5);
    }

    #[test]
    fn normalize_table_with_unroutable_cell_is_no_route() {
        let raw = r#"{"code": "Ok", "durations": [[null]], "distances": [[null]]}"#;
        let response: TableResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(normalize_table(response), Err(DirectionsError::NoRoute)));
    }
}
