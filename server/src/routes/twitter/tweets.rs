use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use color_eyre::eyre::eyre;
use serde::Deserialize;
use tracing::info;

use crate::{
    errors::{ServerResult, WithStatus as _},
    state::AppState,
    twitter::{ApiError, TimelineParams, TwitterClient},
};

#[derive(Debug, Deserialize)]
pub struct TweetsParams {
    /// Whose timeline to fetch; the logged in user when left out
    pub username: Option<String>,
}

/// Relay a user's timeline, without replies or retweets
pub async fn tweets(
    State(state): State<AppState>,
    Query(params): Query<TweetsParams>,
) -> ServerResult<Response> {
    let user_id = resolve_user_id(&state.twitter, params.username).await?;

    let payload = state
        .twitter
        .users_id_timeline(&user_id, &TimelineParams::original_posts())
        .await?;

    info!(%user_id, "Relaying timeline");
    Ok(([(header::CONTENT_TYPE, "application/json")], payload).into_response())
}

async fn resolve_user_id(twitter: &TwitterClient, username: Option<String>) -> ServerResult<String> {
    let username = match username {
        Some(username) => username,
        None => twitter
            .find_my_user()
            .await?
            .data
            .map(|me| me.username)
            .ok_or_else(|| eyre!("Authenticated user has no username"))
            .with_status(StatusCode::BAD_REQUEST)?,
    };

    let user = match twitter.find_user_by_username(&username).await {
        Ok(response) => response.data,
        Err(ApiError::Status { status, .. })
            if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST =>
        {
            None
        }
        Err(err) => return Err(err.into()),
    };

    user.map(|user| user.id)
        .ok_or_else(|| eyre!("No user found for username {username}"))
        .with_status(StatusCode::NOT_FOUND)
}
