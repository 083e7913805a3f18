use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::models::{Player, Team};

#[derive(Debug, Deserialize)]
pub struct PlayersQuery {
    pub team: i32,
}

pub async fn list_players(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlayersQuery>,
) -> Result<Json<Vec<Player>>, ApiError> {
    let players = state.roster.fetch_players_by_team(query.team).await?;
    Ok(Json(players))
}

pub async fn get_team(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<i32>,
) -> Result<Json<Team>, ApiError> {
    state
        .roster
        .fetch_team(team_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Team {team_id} not found")))
}
