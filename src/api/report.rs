use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::view::{build_view, PlayerView, ViewRequest};

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub player: String,
    pub metric: String,
    pub top: Option<usize>,
}

/// The reporting view for one player, built from the stored test sessions.
pub async fn player_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PlayerView>, ApiError> {
    let table = state.roster.fetch_records().await?;
    let request = ViewRequest {
        player: &query.player,
        metric: &query.metric,
        top: query.top,
    };

    let view = build_view(&table, &request, &state.scales)
        .map_err(|err| ApiError::NotFound(err.to_string()))?;
    Ok(Json(view))
}
