//! Mini App endpoints. Identity arrives in headers set by the edge
//! proxy after initData verification, so handlers trust `x-user-id`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use clickrace_core::constants::DEFAULT_TOP_N;
use clickrace_core::counters::{default_username, is_valid_username};
use clickrace_core::LeaderboardEntry;

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn identity(headers: &HeaderMap) -> ApiResult<(i64, Option<&str>)> {
    let user_id = header_str(headers, "x-user-id")
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or_else(|| ApiError::bad_request("missing or malformed x-user-id header"))?;
    Ok((user_id, header_str(headers, "x-username")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeBlock {
    pub user_id: i64,
    pub username: String,
    pub total: u64,
}

/// Response shape shared by `/api/me` and `/api/click`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub me: MeBlock,
    pub global_total: u64,
    pub leaderboard: Vec<LeaderboardEntry>,
}

async fn snapshot(state: &AppState, me: MeBlock) -> ApiResult<SnapshotResponse> {
    let (global_total, leaderboard) = tokio::join!(
        state.counter_service.read_global_stable(),
        state.counter_service.get_top(DEFAULT_TOP_N)
    );
    Ok(SnapshotResponse {
        me,
        global_total: global_total?,
        leaderboard: leaderboard?,
    })
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<SnapshotResponse>> {
    let (user_id, username) = identity(&headers)?;
    let me = state
        .counter_service
        .get_or_create_user(user_id, username)
        .await?;
    let body = snapshot(
        &state,
        MeBlock {
            user_id: me.id,
            username: me.username,
            total: me.total,
        },
    )
    .await?;
    Ok(Json(body))
}

#[derive(Debug, Default, Deserialize)]
pub struct ClickRequest {
    #[serde(default)]
    pub delta: Option<i64>,
}

pub async fn click(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<ClickRequest>>,
) -> ApiResult<Json<SnapshotResponse>> {
    let (user_id, username) = identity(&headers)?;
    let delta = body.and_then(|Json(req)| req.delta).unwrap_or(1);
    let total = state.counter_service.increment(user_id, delta).await?;

    // The username is cosmetic here; no durable lookup on the hot path.
    let username = username
        .map(str::trim)
        .filter(|name| is_valid_username(name))
        .map(String::from)
        .unwrap_or_else(|| default_username(user_id));
    let body = snapshot(
        &state,
        MeBlock {
            user_id,
            username,
            total,
        },
    )
    .await?;
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct NameResponse {
    pub username: String,
}

pub async fn set_name(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NameRequest>,
) -> ApiResult<Json<NameResponse>> {
    let (user_id, _) = identity(&headers)?;
    let trimmed = body.username.trim();
    if !is_valid_username(trimmed) {
        return Err(ApiError::bad_request("username must be 3 to 32 characters"));
    }
    let me = state
        .counter_service
        .get_or_create_user(user_id, Some(trimmed))
        .await?;
    Ok(Json(NameResponse {
        username: me.username,
    }))
}
