//! # Telemetry Bridge
//!
//! HTTP endpoints for the external visualizer page.
//!
//! This module handles:
//! - `GET /data`: the latest published snapshot as JSON (read-only,
//!   never blocks)
//! - `GET /override`: partial override updates via query parameters
//!   (write-only; the page re-polls `/data` for feedback)
//!
//! The server and the control loop share nothing but the state holder. A
//! bind failure disables the visualizer for the process lifetime and the
//! loop continues headless.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::TelemetryConfig;
use crate::serial::LinkMode;
use crate::state::{OverridePatch, SharedState};

/// JSON body served by `/data`.
#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub x: f64,
    pub y: f64,
    pub xi: i16,
    pub yi: i16,
    pub btn: u8,
    /// Human-readable frame bytes, e.g. `"AA 64 00 38 FF 01 9C"`
    pub frame: String,
    pub timestamp: f64,
    pub simulation_mode: bool,
}

/// Start the telemetry listener.
///
/// Returns the server task handle, or `None` if the port could not be
/// bound, in which case the visualizer is disabled and the caller keeps
/// running without it.
pub async fn start(config: &TelemetryConfig, state: Arc<SharedState>) -> Option<JoinHandle<()>> {
    let listener = match TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!(
                "Could not bind telemetry listener on {}: {}. Visualizer disabled, control loop continues",
                config.bind_addr, e
            );
            return None;
        }
    };

    info!("Telemetry endpoint listening on http://{}", config.bind_addr);

    let app = router(state);

    Some(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("Telemetry server error: {}", e);
        }
    }))
}

/// Build the telemetry router. Split out so tests can drive it directly.
pub fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/data", get(data_handler))
        .route("/override", get(override_handler))
        .with_state(state)
}

type CorsHeaders = [(header::HeaderName, &'static str); 1];

/// The visualizer page is hosted elsewhere, so its polling requests are
/// cross-origin; without this header the browser refuses the response.
fn cors_headers() -> CorsHeaders {
    [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")]
}

async fn data_handler(State(state): State<Arc<SharedState>>) -> (CorsHeaders, Json<DataResponse>) {
    let snapshot = state.snapshot();
    let body = DataResponse {
        x: snapshot.sample.x,
        y: snapshot.sample.y,
        xi: snapshot.sample.xi,
        yi: snapshot.sample.yi,
        btn: snapshot.sample.btn,
        frame: snapshot.frame.to_string(),
        timestamp: snapshot.sample.timestamp,
        simulation_mode: snapshot.link_mode != LinkMode::Open,
    };
    (cors_headers(), Json(body))
}

async fn override_handler(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (CorsHeaders, &'static str) {
    let patch = parse_override_params(&params);
    state.apply_override(&patch);
    (cors_headers(), "OK")
}

/// Parse override query parameters into a patch.
///
/// Validation is field-by-field: a malformed value drops that field only,
/// never the whole request. `btn` accepts any integer and coerces it to
/// 0/1; `enabled` accepts `true`/`false`/`1`/`0`.
pub fn parse_override_params(params: &HashMap<String, String>) -> OverridePatch {
    OverridePatch {
        x: params
            .get("x")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite()),
        y: params
            .get("y")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite()),
        btn: params
            .get("btn")
            .and_then(|v| v.parse::<i64>().ok())
            .map(|v| u8::from(v != 0)),
        enabled: params.get("enabled").and_then(|v| match v.as_str() {
            "1" => Some(true),
            "0" => Some(false),
            other => other.parse::<bool>().ok(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_full_override() {
        let patch = parse_override_params(&params(&[
            ("x", "0.25"),
            ("y", "-0.5"),
            ("btn", "1"),
            ("enabled", "true"),
        ]));
        assert_eq!(patch.x, Some(0.25));
        assert_eq!(patch.y, Some(-0.5));
        assert_eq!(patch.btn, Some(1));
        assert_eq!(patch.enabled, Some(true));
    }

    #[test]
    fn test_parse_partial_override() {
        let patch = parse_override_params(&params(&[("y", "0.75")]));
        assert_eq!(patch.x, None);
        assert_eq!(patch.y, Some(0.75));
        assert_eq!(patch.btn, None);
        assert_eq!(patch.enabled, None);
    }

    #[test]
    fn test_malformed_fields_dropped_individually() {
        // x is garbage, y is fine: only x is dropped
        let patch = parse_override_params(&params(&[("x", "banana"), ("y", "0.5")]));
        assert_eq!(patch.x, None);
        assert_eq!(patch.y, Some(0.5));
    }

    #[test]
    fn test_non_finite_axis_dropped() {
        let patch = parse_override_params(&params(&[("x", "NaN"), ("y", "inf")]));
        assert_eq!(patch.x, None);
        assert_eq!(patch.y, None);
    }

    #[test]
    fn test_btn_coerced_to_binary() {
        assert_eq!(parse_override_params(&params(&[("btn", "0")])).btn, Some(0));
        assert_eq!(parse_override_params(&params(&[("btn", "1")])).btn, Some(1));
        assert_eq!(parse_override_params(&params(&[("btn", "7")])).btn, Some(1));
        assert_eq!(parse_override_params(&params(&[("btn", "x")])).btn, None);
    }

    #[test]
    fn test_enabled_accepts_bool_and_numeric() {
        for (raw, expected) in [("true", true), ("false", false), ("1", true), ("0", false)] {
            assert_eq!(
                parse_override_params(&params(&[("enabled", raw)])).enabled,
                Some(expected),
                "enabled={}",
                raw
            );
        }
        assert_eq!(parse_override_params(&params(&[("enabled", "maybe")])).enabled, None);
    }

    #[test]
    fn test_empty_params_empty_patch() {
        assert_eq!(parse_override_params(&HashMap::new()), OverridePatch::default());
    }

    #[test]
    fn test_data_response_serializes_expected_fields() {
        let state = SharedState::new();
        let snapshot = state.snapshot();
        let body = DataResponse {
            x: snapshot.sample.x,
            y: snapshot.sample.y,
            xi: snapshot.sample.xi,
            yi: snapshot.sample.yi,
            btn: snapshot.sample.btn,
            frame: snapshot.frame.to_string(),
            timestamp: snapshot.sample.timestamp,
            simulation_mode: true,
        };

        let json = serde_json::to_value(&body).unwrap();
        for field in ["x", "y", "xi", "yi", "btn", "frame", "timestamp", "simulation_mode"] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(json["frame"], "AA 00 00 00 00 00 00");
        assert_eq!(json["simulation_mode"], true);
    }

    #[tokio::test]
    async fn test_override_endpoint_updates_state() {
        let state = SharedState::new();
        let query = params(&[("x", "0.5"), ("btn", "1")]);
        let (_, response) =
            override_handler(State(state.clone()), Query(query)).await;
        assert_eq!(response, "OK");

        let ov = state.override_state();
        assert!(ov.active);
        assert_eq!(ov.x, 0.5);
        assert_eq!(ov.btn, 1);
    }

    #[tokio::test]
    async fn test_data_endpoint_reflects_snapshot() {
        use crate::frame::encoder::encode_frame;
        use crate::state::{PublishedSnapshot, Sample};

        let state = SharedState::new();
        let sample = Sample::new(0.5, -0.5, 1);
        state.publish(PublishedSnapshot {
            frame: encode_frame(&sample),
            sample: sample.clone(),
            link_mode: LinkMode::Open,
        });

        let (_, Json(body)) = data_handler(State(state)).await;
        assert_eq!(body.xi, sample.xi);
        assert_eq!(body.yi, sample.yi);
        assert_eq!(body.btn, 1);
        assert!(!body.simulation_mode, "open link is not simulation");
    }

    #[tokio::test]
    async fn test_endpoints_allow_any_origin() {
        // The visualizer page lives on a different origin and polls /data;
        // browsers drop the response without this header
        let state = SharedState::new();

        let (headers, _) = data_handler(State(state.clone())).await;
        assert_eq!(headers, [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")]);

        let (headers, _) = override_handler(State(state), Query(HashMap::new())).await;
        assert_eq!(headers, [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")]);
    }
}
