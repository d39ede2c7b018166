//! Thin client for the Twitter v2 REST API
//! Only the user lookup and timeline calls the app needs are covered

mod params;

pub use params::*;

use std::sync::Arc;

use axum::body::Bytes;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::oauth::{OAuth2User, OAuthError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] OAuthError),
    #[error("request to {path} failed: {source}")]
    Request { path: String, source: reqwest::Error },
    #[error("{path} responded with {status}: {body}")]
    Status {
        path: String,
        status: StatusCode,
        body: String,
    },
}

/// Envelope every v2 endpoint responds with
///
/// Lookups that find nothing still answer 200, with `errors` set and no `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub verified: Option<bool>,
    pub public_metrics: Option<serde_json::Value>,
    pub entities: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    api_url: String,
    auth: Arc<OAuth2User>,
}

impl TwitterClient {
    pub fn new(http: reqwest::Client, api_url: String, auth: Arc<OAuth2User>) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// `GET /2/users/me`
    #[tracing::instrument(skip(self))]
    pub async fn find_my_user(&self) -> Result<ApiResponse<User>, ApiError> {
        let path = "/2/users/me".to_string();
        let response = self.get(&path, None).await?;
        decode(&path, response).await
    }

    /// `GET /2/users/by/username/:username`
    #[tracing::instrument(skip(self))]
    pub async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<ApiResponse<User>, ApiError> {
        let path = format!("/2/users/by/username/{}", urlencoding::encode(username));
        let response = self.get(&path, None).await?;
        decode(&path, response).await
    }

    /// `GET /2/users/:id/tweets`
    ///
    /// The payload is handed back untouched so it can be relayed as-is.
    #[tracing::instrument(skip(self, params))]
    pub async fn users_id_timeline(
        &self,
        id: &str,
        params: &TimelineParams,
    ) -> Result<Bytes, ApiError> {
        let path = format!("/2/users/{}/tweets", urlencoding::encode(id));
        let response = self.get(&path, Some(params)).await?;

        response.bytes().await.map_err(|source| ApiError::Request {
            path: path.clone(),
            source,
        })
    }

    async fn get(&self, path: &str, params: Option<&TimelineParams>) -> Result<Response, ApiError> {
        let token = self.auth.access_token().await?;

        let mut request = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(token);
        if let Some(params) = params {
            request = request.query(params);
        }

        debug!(path, "Calling Twitter API");
        let response = request.send().await.map_err(|source| ApiError::Request {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        tracing::error!(path, %status, %body, "Twitter API request failed");

        Err(ApiError::Status {
            path: path.to_string(),
            status,
            body,
        })
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    path: &str,
    response: Response,
) -> Result<ApiResponse<T>, ApiError> {
    response.json().await.map_err(|source| ApiError::Request {
        path: path.to_string(),
        source,
    })
}
