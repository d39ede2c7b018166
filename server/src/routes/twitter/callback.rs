use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use color_eyre::eyre::eyre;
use serde::Deserialize;
use tracing::info;

use crate::{
    errors::{error_body, ServerError, ServerResult},
    routes::found,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Handle the OAuth callback
///
/// The state is checked before anything else, including an `error` sent back
/// by the authorization server.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ServerResult<Response> {
    let callback_state = params.state.as_deref().unwrap_or_default();

    if let Some(error) = params.error {
        state.oauth.cancel_authorization(callback_state).await?;

        let message = params.error_description.unwrap_or_else(|| error.clone());
        return Err(ServerError(
            eyre!("Authorization was not granted: {error}"),
            error_body(StatusCode::BAD_REQUEST, "authorization_denied", message),
        ));
    }

    let code = params.code.as_deref().unwrap_or_default();
    state
        .oauth
        .request_access_token(code, callback_state)
        .await?;

    info!("Authentication successful, redirecting to /tweets");
    Ok(found("/tweets"))
}
