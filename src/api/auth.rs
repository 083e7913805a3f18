use std::sync::Arc;

use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::auth::{Claims, SESSION_COOKIE};
use crate::models::Coach;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: Coach,
}

/// Signs a session for a known coach email and sets it as a cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let email = req.email.trim();
    let coach = state
        .roster
        .find_coach_by_email(email)
        .await
        .map_err(ApiError::Login)?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    let token = state.sessions.issue(&coach)?;
    tracing::info!(coach_id = coach.id, "coach logged in");

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .http_only(true)
        .path("/");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            token,
            user: coach,
        }),
    ))
}

pub async fn current_user(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<Claims>, ApiError> {
    let cookie = jar
        .get(SESSION_COOKIE)
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;
    let claims = state.sessions.verify(cookie.value())?;
    Ok(Json(claims))
}
