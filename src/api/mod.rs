mod auth;
mod error;
mod report;
mod roster;
mod upload;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::ApiError;

use crate::auth::SessionService;
use crate::db::Roster;
use crate::metrics::TierScales;

pub struct AppState {
    pub roster: Arc<dyn Roster>,
    pub sessions: SessionService,
    pub scales: TierScales,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/user", get(auth::current_user))
        .route("/api/players", get(roster::list_players))
        .route("/api/team/:id", get(roster::get_team))
        .route("/api/report", get(report::player_report))
        .route(
            "/api/uploads",
            post(upload::upload_video).layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
