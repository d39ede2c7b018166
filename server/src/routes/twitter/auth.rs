use axum::{extract::State, response::Response};
use tracing::info;

use crate::{errors::ServerResult, routes::found, state::AppState};

/// Start the Twitter OAuth flow
pub async fn login(State(state): State<AppState>) -> ServerResult<Response> {
    let status = state.oauth.status().await;
    let url = state.oauth.generate_auth_url().await?;

    info!(?status, "Redirecting to Twitter for authorization");
    Ok(found(url.as_str()))
}
