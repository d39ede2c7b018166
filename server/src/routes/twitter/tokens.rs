use axum::{extract::State, Json};

use crate::{errors::ServerResult, state::AppState};

/// Revoke the current access token at Twitter
pub async fn revoke(State(state): State<AppState>) -> ServerResult<Json<serde_json::Value>> {
    let response = state.oauth.revoke_access_token().await?;

    Ok(Json(response))
}
