use crate::host::HostClient;
use crate::metrics::Metrics;
use crate::poller::{now_unix, Sampler};
use crate::settings::{AppSettings, SettingsPatch, SettingsStore};
use crate::state::PanelState;
use crate::views::{self, ActiveView, DataSourceModel, ViewState};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Clone)]
pub struct HttpAppState {
    pub metrics: Arc<Metrics>,
    pub state: Arc<RwLock<PanelState>>,
    pub settings: SettingsStore,
    pub view: Arc<RwLock<ViewState>>,
    pub host: HostClient,
    pub sampler: Sampler,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiState {
    pub data_source: DataSourceModel,
    pub settings: AppSettings,
    pub active_view: ActiveView,
    pub selected_drive: usize,
    pub poll_total: u64,
    pub poll_errors: u64,
    pub started_at_unix: i64,
}

#[derive(Debug, Deserialize)]
struct SelectViewBody {
    view: ActiveView,
}

#[derive(Debug, Deserialize)]
struct SelectDriveBody {
    index: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LaunchResponse {
    launched: bool,
    message: Option<String>,
}

pub fn build_router(app_state: HttpAppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .route("/api/state", get(state_handler))
        .route("/api/refresh", post(refresh_handler))
        .route("/api/settings", get(settings_handler).post(update_settings_handler))
        .route("/api/view", post(select_view_handler))
        .route("/api/view/drive", post(select_drive_handler))
        .route("/api/view/overview", get(overview_handler))
        .route("/api/view/cpu", get(cpu_handler))
        .route("/api/view/gpu", get(gpu_handler))
        .route("/api/view/storage", get(storage_handler))
        .route("/api/view/system", get(system_handler))
        .route("/api/host/launch", post(launch_host_handler))
        .route("/api/debug/sensors", get(debug_sensors_handler))
        .with_state(app_state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics_handler(State(app): State<HttpAppState>) -> Response {
    app.metrics.inc_scrape_count();
    match app.metrics.encode_metrics() {
        Ok(encoded) => {
            let mut response = Response::new(Body::from(encoded));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("ошибка кодирования метрик: {err}"),
        )
            .into_response(),
    }
}

// Views are derived per request from the latest state, never cached.
async fn state_handler(State(app): State<HttpAppState>) -> impl IntoResponse {
    let state = app.state.read().await;
    let settings = app.settings.current().await;
    let view = app.view.read().await;
    let drive_count = state
        .snapshot
        .as_ref()
        .map(|s| s.drives.len())
        .unwrap_or(0);

    Json(ApiState {
        data_source: views::data_source_model(&state, &settings, now_unix()),
        settings,
        active_view: view.active,
        selected_drive: view.drive_for(drive_count),
        poll_total: state.poll_total,
        poll_errors: state.poll_errors,
        started_at_unix: state.started_at_unix,
    })
}

async fn refresh_handler(State(app): State<HttpAppState>) -> impl IntoResponse {
    app.sampler.fetch_once().await;

    let state = app.state.read().await;
    let settings = app.settings.current().await;
    Json(views::data_source_model(&state, &settings, now_unix()))
}

async fn settings_handler(State(app): State<HttpAppState>) -> impl IntoResponse {
    Json(app.settings.current().await)
}

async fn update_settings_handler(
    State(app): State<HttpAppState>,
    Json(patch): Json<SettingsPatch>,
) -> impl IntoResponse {
    // Optimistic: the merged record is current before persistence runs;
    // a persistence failure is logged and never rolled back.
    let merged = app.settings.apply_patch(&patch).await;

    let host = app.host.clone();
    let metrics = app.metrics.clone();
    let to_persist = merged.clone();
    tokio::spawn(async move {
        if let Err(err) = host.save_settings(&to_persist).await {
            metrics.inc_settings_persist_error();
            warn!(error = %err, "не удалось сохранить настройки на хосте");
        }
    });

    Json(merged)
}

async fn select_view_handler(
    State(app): State<HttpAppState>,
    Json(body): Json<SelectViewBody>,
) -> impl IntoResponse {
    let mut view = app.view.write().await;
    view.select_view(body.view);
    Json(serde_json::json!({ "activeView": view.active }))
}

async fn select_drive_handler(
    State(app): State<HttpAppState>,
    Json(body): Json<SelectDriveBody>,
) -> impl IntoResponse {
    let drive_count = {
        let state = app.state.read().await;
        state
            .snapshot
            .as_ref()
            .map(|s| s.drives.len())
            .unwrap_or(0)
    };

    let mut view = app.view.write().await;
    view.select_drive(body.index, drive_count);
    Json(serde_json::json!({ "selectedDrive": view.selected_drive }))
}

async fn overview_handler(State(app): State<HttpAppState>) -> impl IntoResponse {
    let state = app.state.read().await;
    Json(views::overview_model(&state))
}

async fn cpu_handler(State(app): State<HttpAppState>) -> impl IntoResponse {
    let state = app.state.read().await;
    Json(views::cpu_model(&state))
}

async fn gpu_handler(State(app): State<HttpAppState>) -> impl IntoResponse {
    let state = app.state.read().await;
    Json(views::gpu_model(&state))
}

async fn storage_handler(State(app): State<HttpAppState>) -> impl IntoResponse {
    let state = app.state.read().await;
    let view = app.view.read().await;
    Json(views::storage_model(&state, &view))
}

async fn system_handler(State(app): State<HttpAppState>) -> impl IntoResponse {
    let state = app.state.read().await;
    Json(views::system_model(&state))
}

async fn launch_host_handler(State(app): State<HttpAppState>) -> impl IntoResponse {
    let settings = app.settings.current().await;
    match app
        .host
        .launch_host(settings.host_path_override.as_deref())
        .await
    {
        Ok(()) => Json(LaunchResponse {
            launched: true,
            message: None,
        }),
        // Best-effort: only a transient message, never a failure status.
        Err(err) => {
            warn!(error = %err, "не удалось запустить хост-процесс");
            Json(LaunchResponse {
                launched: false,
                message: Some(err.to_string()),
            })
        }
    }
}

async fn debug_sensors_handler(State(app): State<HttpAppState>) -> Response {
    match app.host.debug_dump_sensors().await {
        Ok(dump) => Json(dump).into_response(),
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            format!("диагностический дамп недоступен: {err}"),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use crate::snapshot::{ConnStatus, DriveStat, SensorSnapshot};
    use axum::body::to_bytes;
    use axum::http::Request;
    use axum::routing::put;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    async fn spawn_fake_host(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("порт тестового хоста");
        let addr = listener.local_addr().expect("адрес тестового хоста");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    fn app_state_with_host(addr: SocketAddr, initial: AppSettings) -> HttpAppState {
        let metrics = Metrics::new().expect("инициализация метрик");
        let state = Arc::new(RwLock::new(PanelState::new(0)));
        let settings = SettingsStore::new(initial);
        let host = HostClient::new(&HostConfig {
            base_url: format!("http://{addr}"),
            request_timeout_ms: 2_000,
        });
        let sampler = Sampler::new(
            state.clone(),
            settings.clone(),
            host.clone(),
            metrics.clone(),
        );

        HttpAppState {
            metrics,
            state,
            settings,
            view: Arc::new(RwLock::new(ViewState::default())),
            host,
            sampler,
        }
    }

    async fn test_app_state() -> HttpAppState {
        let addr = spawn_fake_host(Router::new()).await;
        app_state_with_host(addr, AppSettings::default())
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("чтение тела ответа");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = build_router(test_app_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn metrics_contains_panel_gauges() {
        let app = build_router(test_app_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("panel_scrape_count_total"));
    }

    #[tokio::test]
    async fn api_state_reports_loading_before_first_poll() {
        let app = build_router(test_app_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/state")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("\"isLoading\":true"));
        assert!(text.contains("\"activeView\":\"overview\""));
    }

    #[tokio::test]
    async fn overview_renders_placeholders_without_snapshot() {
        let app = build_router(test_app_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/view/overview")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let text = body_text(response).await;
        assert!(text.contains("\"main\":\"—\""));
    }

    #[tokio::test]
    async fn empty_patch_persists_exactly_once_and_changes_nothing() {
        let saves = Arc::new(AtomicU64::new(0));
        let seen = saves.clone();
        let fake_host = Router::new().route(
            "/settings",
            put(move |Json(_): Json<AppSettings>| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    StatusCode::NO_CONTENT
                }
            }),
        );
        let addr = spawn_fake_host(fake_host).await;
        let initial = AppSettings {
            auto_launch_host: true,
            host_path_override: Some("/opt/host".to_string()),
            mock_mode: false,
        };
        let app_state = app_state_with_host(addr, initial.clone());
        let app = build_router(app_state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/settings")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(app_state.settings.current().await, initial);

        // Persistence is fire-and-forget; wait for the single call to land.
        for _ in 0..50 {
            if saves.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn settings_update_is_optimistic_when_persistence_fails() {
        // No /settings route on the fake host: every save fails.
        let app_state = test_app_state().await;
        let app = build_router(app_state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/settings")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"mockMode":true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // The in-memory record keeps the merge despite the failed save.
        assert!(app_state.settings.mock_mode().await);
    }

    #[tokio::test]
    async fn drive_selection_clamps_against_current_snapshot() {
        let app_state = test_app_state().await;
        {
            let mut snapshot = SensorSnapshot {
                status: ConnStatus::Connected,
                ..SensorSnapshot::default()
            };
            snapshot.drives = vec![DriveStat::default(), DriveStat::default()];
            app_state.state.write().await.apply_success(1, snapshot, 10);
        }
        let app = build_router(app_state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/view/drive")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"index":7}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("\"selectedDrive\":1"));
    }

    #[tokio::test]
    async fn view_selection_is_unrestricted() {
        let app_state = test_app_state().await;
        let app = build_router(app_state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/view")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"view":"gpu"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app_state.view.read().await.active, ActiveView::Gpu);
    }

    #[tokio::test]
    async fn refresh_in_mock_mode_fills_the_views() {
        let addr = spawn_fake_host(Router::new()).await;
        let app_state = app_state_with_host(
            addr,
            AppSettings {
                mock_mode: true,
                ..AppSettings::default()
            },
        );
        let app = build_router(app_state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("\"status\":\"connected\""));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/view/gpu")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let text = body_text(response).await;
        // The slot prefix from the host label must not reach the view.
        assert!(text.contains("NVIDIA GeForce RTX 4090"));
        assert!(!text.contains("GPU [#0]"));
    }

    #[tokio::test]
    async fn launch_failure_is_a_message_not_an_error_status() {
        let app = build_router(test_app_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/host/launch")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("\"launched\":false"));
    }
}
