use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use color_eyre::Report;

use crate::oauth::OAuthError;
use crate::twitter::ApiError;

#[derive(Debug)]
pub struct ServerError<R: IntoResponse>(pub(crate) Report, pub(crate) R);

pub type ServerResult<S, F = Response> = Result<S, ServerError<F>>;

impl<R: IntoResponse> IntoResponse for ServerError<R> {
    fn into_response(self) -> axum::response::Response {
        let response = self.1.into_response();

        if response.status().is_server_error() {
            tracing::error!(error = ?self.0, status = %response.status(), "Request Error");
        } else {
            tracing::warn!(error = %self.0, status = %response.status(), "Request Rejected");
        }

        response
    }
}

/// JSON body used for every error we describe to the caller
pub(crate) fn error_body(status: StatusCode, error: &str, message: String) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message,
        })),
    )
        .into_response()
}

impl From<OAuthError> for ServerError<Response> {
    fn from(err: OAuthError) -> Self {
        let response = match &err {
            OAuthError::StateMismatch => {
                (StatusCode::INTERNAL_SERVER_ERROR, "State isn't matching").into_response()
            }
            OAuthError::NotAuthenticated => {
                error_body(StatusCode::UNAUTHORIZED, "not_authenticated", err.to_string())
            }
            OAuthError::InvalidUrl { .. } => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "misconfigured",
                err.to_string(),
            ),
            OAuthError::Request { .. } | OAuthError::Status { .. } => {
                error_body(StatusCode::BAD_GATEWAY, "remote_call_failed", err.to_string())
            }
        };

        ServerError(err.into(), response)
    }
}

impl From<ApiError> for ServerError<Response> {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(err) => err.into(),
            err => {
                let response =
                    error_body(StatusCode::BAD_GATEWAY, "remote_call_failed", err.to_string());
                ServerError(err.into(), response)
            }
        }
    }
}

pub(crate) trait WithStatus<T> {
    fn with_status(self, status: StatusCode) -> ServerResult<T>;
}

impl<T> WithStatus<T> for Result<T, Report> {
    fn with_status(self, status: StatusCode) -> ServerResult<T> {
        match self {
            Ok(val) => Ok(val),
            Err(err) => Err(ServerError(err, status.into_response())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mismatch_is_500() {
        let response = ServerError::from(OAuthError::StateMismatch).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_authenticated_is_401() {
        let response = ServerError::from(OAuthError::NotAuthenticated).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_remote_status_is_502() {
        let err = ApiError::Status {
            path: "/2/users/me".to_string(),
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "{}".to_string(),
        };

        let response = ServerError::from(err).into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_auth_errors_inside_api_errors_keep_their_status() {
        let err = ApiError::Auth(OAuthError::NotAuthenticated);

        let response = ServerError::from(err).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_with_status() {
        let result: Result<(), Report> = Err(color_eyre::eyre::eyre!("no such user"));

        let response = result
            .with_status(StatusCode::NOT_FOUND)
            .unwrap_err()
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
