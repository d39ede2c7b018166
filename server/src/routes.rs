use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::state::AppState;

pub mod twitter;

/// Build the application router with all routes
pub fn routes(app_state: AppState) -> axum::Router {
    axum::Router::new()
        // Twitter OAuth routes
        .route("/login", get(twitter::login))
        .route("/callback", get(twitter::callback))
        .route("/revoke", get(twitter::revoke))
        // API passthrough
        .route("/tweets", get(twitter::tweets))
        // Add trace layer for debugging
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app_state)
}

/// A plain `302 Found` redirect
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
