use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::app_metrics::AppMetrics;
use crate::ble_notifier::{BleTopic, CharacteristicTable, NotificationSink};
use crate::command_intake::AutopilotCommand;
use crate::network_identity::{Endpoint, NetworkIdentity};
use crate::pipeline::SharedMetrics;
use crate::state_store::VesselStateStore;
use crate::stream_hub::StreamHub;
use crate::tcp_broadcaster::TcpBroadcaster;
use crate::vessel_state::{AisView, AutopilotReport, FullStateView, NavigationView, WindView};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<VesselStateStore>,
    pub hub: Arc<StreamHub>,
    pub table: Arc<CharacteristicTable>,
    pub broadcaster: Arc<TcpBroadcaster>,
    pub metrics: SharedMetrics,
    pub identity: Arc<dyn NetworkIdentity>,
    pub started_at: Instant,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(message),
        }
    }
}

pub async fn get_navigation(State(state): State<AppState>) -> Json<ApiResponse<NavigationView>> {
    debug!("GET /api/navigation called");
    Json(ApiResponse::ok(state.store.get_navigation()))
}

pub async fn get_wind(State(state): State<AppState>) -> Json<ApiResponse<WindView>> {
    debug!("GET /api/wind called");
    Json(ApiResponse::ok(state.store.get_wind()))
}

pub async fn get_ais(State(state): State<AppState>) -> Json<ApiResponse<AisView>> {
    debug!("GET /api/ais called");
    Json(ApiResponse::ok(state.store.get_ais()))
}

pub async fn get_state(State(state): State<AppState>) -> Json<ApiResponse<FullStateView>> {
    debug!("GET /api/state called");
    Json(ApiResponse::ok(state.store.get_full_state()))
}

#[derive(Debug, Serialize)]
pub struct ClientStatus {
    pub peer: String,
    pub sent: u64,
    pub skipped: u64,
    pub consecutive_failures: u32,
    pub connected_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub hostname: String,
    pub uptime_seconds: u64,
    pub endpoints: Vec<Endpoint>,
    pub tcp_clients: Vec<ClientStatus>,
    pub stream_subscribers: usize,
    pub ble_device: String,
    pub ble_subscribers: usize,
    pub command_pending: bool,
    pub ais_targets: usize,
    pub metrics: AppMetrics,
}

pub async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<StatusReport>> {
    let now = Instant::now();
    let tcp_clients = state
        .broadcaster
        .clients()
        .into_iter()
        .map(|c| ClientStatus {
            peer: c.peer,
            sent: c.record.total_sent,
            skipped: c.record.total_skipped,
            consecutive_failures: c.record.consecutive_failures,
            connected_seconds: now.saturating_duration_since(c.record.connected_at).as_secs(),
        })
        .collect();
    let metrics = *state.metrics.lock().unwrap_or_else(|p| p.into_inner());

    Json(ApiResponse::ok(StatusReport {
        hostname: state.identity.hostname(),
        uptime_seconds: now.saturating_duration_since(state.started_at).as_secs(),
        endpoints: state.identity.endpoints(),
        tcp_clients,
        stream_subscribers: state.hub.subscriber_count(),
        ble_device: state.table.device_name().to_string(),
        ble_subscribers: state.table.subscriber_count(),
        command_pending: state.table.command_pending(),
        ais_targets: state.store.ais_target_count(),
        metrics,
    }))
}

/// Last value notified on a topic.
pub async fn get_ble_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let Some(topic) = BleTopic::parse(&topic) else {
        return (StatusCode::NOT_FOUND, Json(ApiResponse::error(format!("Unknown topic '{}'", topic))));
    };
    let value = state
        .table
        .value(topic)
        .and_then(|payload| serde_json::from_str(&payload).ok());
    match value {
        Some(value) => (StatusCode::OK, Json(ApiResponse::ok(value))),
        None => (
            StatusCode::OK,
            Json(ApiResponse::error(format!("No {} notification yet", topic.as_str()))),
        ),
    }
}

/// Write to the autopilot command characteristic.
pub async fn post_autopilot_command(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse<AutopilotCommand>>) {
    match state.table.write_command(&body) {
        Ok(command) => {
            info!("Autopilot command '{}' received", command.as_str());
            (StatusCode::OK, Json(ApiResponse::ok(command)))
        }
        Err(e) => {
            warn!("Rejected autopilot command: {}", e);
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// Status pushed by the autopilot link; absent fields keep their last value.
pub async fn post_autopilot_status(
    State(state): State<AppState>,
    Json(report): Json<AutopilotReport>,
) -> Json<ApiResponse<String>> {
    debug!("POST /api/autopilot/status called: {:?}", report);
    state.store.apply_autopilot_report(&report, Instant::now());
    Json(ApiResponse::ok("applied".to_string()))
}

pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .route("/navigation", get(get_navigation))
        .route("/wind", get(get_wind))
        .route("/ais", get(get_ais))
        .route("/state", get(get_state))
        .route("/status", get(get_status))
        .route("/autopilot/status", post(post_autopilot_status))
        .route("/ble/autopilot/command", post(post_autopilot_command))
        .route("/ble/:topic", get(get_ble_topic))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::command_intake::CommandMailbox;
    use crate::config::StateConfig;
    use crate::network_identity::HostIdentity;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Mutex;
    use tower::ServiceExt;

    pub(crate) fn test_state() -> AppState {
        let mailbox = Arc::new(CommandMailbox::new());
        AppState {
            store: Arc::new(VesselStateStore::new(&StateConfig::default())),
            hub: Arc::new(StreamHub::new(16)),
            table: Arc::new(CharacteristicTable::new("MarineGateway", mailbox)),
            broadcaster: Arc::new(TcpBroadcaster::new(5)),
            metrics: Arc::new(Mutex::new(AppMetrics::default())),
            identity: Arc::new(HostIdentity::new()),
            started_at: Instant::now(),
        }
    }

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_wind_reports_nulls_when_stale() {
        let state = test_state();
        let (status, json) = call(create_api_router(state), get("/wind")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert!(json["data"]["apparent_speed"]["value"].is_null());
        assert_eq!(json["data"]["apparent_speed"]["unit"], "kn");
    }

    #[tokio::test]
    async fn test_navigation_reports_fresh_values() {
        let state = test_state();
        state.store.set_true_heading(274.07, Instant::now());
        let (_, json) = call(create_api_router(state), get("/navigation")).await;
        assert_eq!(json["data"]["heading_true"]["value"], 274.07);
    }

    #[tokio::test]
    async fn test_status_includes_metrics() {
        let state = test_state();
        state.metrics.lock().unwrap().sentences_valid = 42;
        let (_, json) = call(create_api_router(state), get("/status")).await;
        assert_eq!(json["data"]["metrics"]["sentences_valid"], 42);
        assert_eq!(json["data"]["ble_device"], "MarineGateway");
        assert_eq!(json["data"]["tcp_clients"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_ble_topic_lookup() {
        let state = test_state();
        let (status, _) = call(create_api_router(state.clone()), get("/ble/engine")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, json) = call(create_api_router(state.clone()), get("/ble/wind")).await;
        assert_eq!(json["status"], "error");

        state.table.publish(BleTopic::Wind, r#"{"aws":12.0}"#.to_string());
        let (_, json) = call(create_api_router(state), get("/ble/wind")).await;
        assert_eq!(json["data"]["aws"], 12.0);
    }

    #[tokio::test]
    async fn test_command_post() {
        let state = test_state();
        let post = |body: &'static str| {
            Request::builder()
                .method("POST")
                .uri("/ble/autopilot/command")
                .body(Body::from(body))
                .unwrap()
        };

        let (status, json) = call(create_api_router(state.clone()), post(r#"{"command":"adjust-10"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], "adjust-10");

        let (_, json) = call(create_api_router(state.clone()), get("/status")).await;
        assert_eq!(json["data"]["command_pending"], true);

        let (status, json) = call(create_api_router(state), post(r#"{"command":"reboot"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "unknown command 'reboot'");
    }

    #[tokio::test]
    async fn test_autopilot_status_post() {
        let state = test_state();
        let request = Request::builder()
            .method("POST")
            .uri("/autopilot/status")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"mode":"auto","status":"engaged","heading_target":180.5,"rudder_angle":-3.0}"#))
            .unwrap();
        let (status, json) = call(create_api_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");

        let autopilot = state.store.autopilot();
        assert_eq!(autopilot.mode, crate::vessel_state::AutopilotMode::Auto);
        assert_eq!(autopilot.status, "engaged");
        assert_eq!(autopilot.heading_target.value, 180.5);
        assert_eq!(autopilot.rudder_angle.value, -3.0);

        let request = Request::builder()
            .method("POST")
            .uri("/autopilot/status")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"mode":"auto","engine":"on"}"#))
            .unwrap();
        let response = create_api_router(state).oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
