use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::calendar::MonthBucket;
use crate::config::Config;
use crate::html;
use crate::progress::ProgressReport;
use crate::state::{Action, StudyState};
use crate::tracker::{ActionError, Tracker};
use crate::types::{MockExam, ScheduleEntry};

/// Application state shared across requests
pub struct AppState {
    pub tracker: RwLock<Tracker>,
}

impl AppState {
    pub fn new(tracker: Tracker) -> Arc<Self> {
        Arc::new(Self {
            tracker: RwLock::new(tracker),
        })
    }
}

/// Start the dashboard server on localhost
pub async fn serve(port: u16, config: Config) -> anyhow::Result<()> {
    let tracker = config.open_tracker()?;
    let app = router(AppState::new(tracker));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        url = %format!("http://{}", addr),
        data_dir = %config.data_dir.display(),
        "Server running, press Ctrl+C to stop"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/progress", get(progress_handler))
        .route("/api/schedule", get(schedule_handler))
        .route("/api/calendar", get(calendar_handler))
        .route("/api/mocks", get(mocks_handler))
        .route("/api/state", get(state_handler))
        .route("/api/actions", post(action_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Serve the dashboard page
async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let tracker = state.tracker.read().await;
    let markup = html::render_page(&tracker);
    Html(markup.into_string())
}

async fn progress_handler(State(state): State<Arc<AppState>>) -> Json<ProgressReport> {
    let tracker = state.tracker.read().await;
    Json(tracker.progress())
}

async fn schedule_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ScheduleEntry>> {
    let tracker = state.tracker.read().await;
    Json(tracker.schedule().to_vec())
}

async fn calendar_handler(State(state): State<Arc<AppState>>) -> Json<Vec<MonthBucket>> {
    let tracker = state.tracker.read().await;
    Json(tracker.calendar().to_vec())
}

async fn mocks_handler(State(state): State<Arc<AppState>>) -> Json<Vec<MockExam>> {
    let tracker = state.tracker.read().await;
    Json(tracker.mocks().to_vec())
}

async fn state_handler(State(state): State<Arc<AppState>>) -> Json<StudyState> {
    let tracker = state.tracker.read().await;
    Json(tracker.state().clone())
}

/// Apply one action; the write lock is held until the change is persisted
async fn action_handler(
    State(state): State<Arc<AppState>>,
    Json(action): Json<Action>,
) -> Result<Json<ProgressReport>, ActionError> {
    let mut tracker = state.tracker.write().await;
    tracker.dispatch(action).map(Json).inspect_err(|e| {
        warn!(error = %e, "Rejected action");
    })
}
